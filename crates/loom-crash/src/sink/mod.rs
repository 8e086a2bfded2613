// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Logging sinks: the narrow interface to a remote diagnostics backend.

pub mod tracing_sink;

use async_trait::async_trait;
use loom_crash_core::{ExceptionInfo, Severity};

use crate::error::Result;

pub use tracing_sink::TracingSink;

/// Destination for recovered and handled exceptions.
///
/// Both calls are best effort from the pipeline's point of view: an `Err`
/// means the sink did not accept the report, and the caller keeps whatever
/// it would otherwise have discarded.
#[async_trait]
pub trait LoggingSink: Send + Sync {
	/// Short name used in logs.
	fn name(&self) -> &str;

	async fn record_exception(
		&self,
		exception: &ExceptionInfo,
		message: &str,
		severity: Severity,
	) -> Result<()>;

	async fn log(&self, message: &str) -> Result<()>;
}
