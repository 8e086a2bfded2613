// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Detached task failures: the unobserved-task channel.
//!
//! Tokio has no global hook for a spawned task whose result nobody awaits,
//! so fire-and-forget work goes through [`TaskSource::spawn_detached`],
//! which observes the outcome on the caller's behalf.

use std::error::Error as StdError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use loom_crash_core::{CapturedError, ErrorOrigin, ExceptionInfo};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{CrashSdkError, Result};
use crate::hub::UnhandledExceptionHub;
use crate::source::{panic_payload_message, publish_contained, ExceptionSource};

/// Spawns detached tasks and reports the ones that fail.
///
/// Reporting does not depend on [`ExceptionSource::install`].
#[derive(Clone)]
pub struct TaskSource {
	hub: UnhandledExceptionHub,
	installed: Arc<AtomicBool>,
}

impl TaskSource {
	pub fn new(hub: UnhandledExceptionHub) -> Self {
		Self {
			hub,
			installed: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Spawns `fut` on the current runtime without the caller awaiting it.
	///
	/// An `Err` result or a panic is published as an unobserved-task error.
	/// The returned handle tracks the watcher and always completes with `()`.
	pub fn spawn_detached<F, E>(&self, name: impl Into<String>, fut: F) -> Result<JoinHandle<()>>
	where
		F: Future<Output = std::result::Result<(), E>> + Send + 'static,
		E: StdError + Send + Sync + 'static,
	{
		let handle = Handle::try_current().map_err(|e| CrashSdkError::NoRuntime(e.to_string()))?;
		let name = name.into();
		let hub = self.hub.clone();

		let task = handle.spawn(fut);
		let watcher = handle.spawn(async move {
			let exception = match task.await {
				Ok(Ok(())) => {
					debug!(task = %name, "detached task completed");
					return;
				}
				Ok(Err(e)) => ExceptionInfo::from_error(&e),
				Err(join_error) if join_error.is_panic() => {
					let payload = join_error.into_panic();
					ExceptionInfo::new("panic", panic_payload_message(payload.as_ref()))
				}
				Err(_) => {
					debug!(task = %name, "detached task cancelled");
					return;
				}
			};

			let error = CapturedError::new(
				ErrorOrigin::UnobservedTask,
				format!("{} '{name}'", ErrorOrigin::UnobservedTask),
				exception,
				true,
			);
			publish_contained(&hub, &error);
		});

		Ok(watcher)
	}
}

impl ExceptionSource for TaskSource {
	fn origin(&self) -> ErrorOrigin {
		ErrorOrigin::UnobservedTask
	}

	/// Marks the channel active. There is no runtime hook to register, so
	/// [`TaskSource::spawn_detached`] observes its tasks whether or not this
	/// was called.
	fn install(&self) -> Result<()> {
		if self.installed.swap(true, Ordering::SeqCst) {
			return Err(CrashSdkError::AlreadyInstalled(self.origin()));
		}
		info!("detached task observer installed");
		Ok(())
	}
}
