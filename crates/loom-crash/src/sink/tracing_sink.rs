// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use loom_crash_core::{ExceptionInfo, Severity};
use tracing::{error, info};

use crate::error::Result;
use crate::sink::LoggingSink;

/// Emits reports as `tracing` events under the `loom_crash::report` target.
///
/// Useful on its own for services whose log pipeline is the backend, and as
/// the default when no other sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

const TARGET: &str = "loom_crash::report";

#[async_trait]
impl LoggingSink for TracingSink {
	fn name(&self) -> &str {
		"tracing"
	}

	async fn record_exception(
		&self,
		exception: &ExceptionInfo,
		message: &str,
		severity: Severity,
	) -> Result<()> {
		error!(
			target: TARGET,
			severity = %severity,
			kind = %exception.kind,
			exception = %exception.render(),
			"{message}"
		);
		Ok(())
	}

	async fn log(&self, message: &str) -> Result<()> {
		info!(target: TARGET, "{message}");
		Ok(())
	}
}
