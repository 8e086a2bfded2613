// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Startup sweep that forwards records left behind by previous sessions.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use loom_crash_core::{ExceptionInfo, RecordId, Severity};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::sink::LoggingSink;
use crate::source::panic_payload_message;
use crate::store::ReportStore;

/// Pause between forwarding two records.
pub const DEFAULT_INTER_RECORD_PAUSE: Duration = Duration::from_millis(500);

/// Message attached to every forwarded record.
pub const PREVIOUS_SESSION_MESSAGE: &str = "CRASH detected from a previous session!";

/// Exception kind wrapping a forwarded record body.
pub const PREVIOUS_SESSION_KIND: &str = "PreviousSessionCrash";

/// Counts for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
	pub pending: usize,
	pub forwarded: usize,
	pub deleted: usize,
	pub read_failures: usize,
	pub forward_failures: usize,
	pub delete_failures: usize,
}

impl SweepSummary {
	/// True when every pending record was forwarded and removed.
	pub fn is_clean(&self) -> bool {
		self.deleted == self.pending
	}
}

/// Drains the report store into a logging sink.
pub struct CrashReportRecoveryService {
	store: Arc<dyn ReportStore>,
	sink: Arc<dyn LoggingSink>,
	inter_record_pause: Duration,
}

impl CrashReportRecoveryService {
	pub fn new(store: Arc<dyn ReportStore>, sink: Arc<dyn LoggingSink>) -> Self {
		Self {
			store,
			sink,
			inter_record_pause: DEFAULT_INTER_RECORD_PAUSE,
		}
	}

	pub fn with_inter_record_pause(mut self, pause: Duration) -> Self {
		self.inter_record_pause = pause;
		self
	}

	/// Runs the sweep on a background task.
	///
	/// Sink panics are contained per record by the sweep. Anything else that
	/// unwinds ends only the inner task, and the returned handle still
	/// resolves to a summary.
	pub fn spawn(self: Arc<Self>) -> JoinHandle<SweepSummary> {
		tokio::spawn(async move {
			match tokio::spawn(async move { self.sweep().await }).await {
				Ok(summary) => summary,
				Err(e) => {
					let reason = if e.is_panic() {
						panic_payload_message(e.into_panic().as_ref())
					} else {
						e.to_string()
					};
					error!(error = %reason, "crash report recovery aborted");
					SweepSummary::default()
				}
			}
		})
	}

	/// Forwards every pending record, oldest first.
	///
	/// Per-record failures, including a panicking sink, are counted and
	/// skipped. A record is deleted only after the sink accepted it; anything
	/// else stays for the next start.
	pub async fn sweep(&self) -> SweepSummary {
		let mut summary = SweepSummary::default();

		let store = Arc::clone(&self.store);
		let pending = match blocking(move || store.list_pending()).await {
			Ok(pending) => pending,
			Err(e) => {
				warn!(error = %e, "failed to list pending crash reports");
				return summary;
			}
		};

		if pending.is_empty() {
			debug!("no pending crash reports");
			return summary;
		}

		summary.pending = pending.len();
		info!(
			count = pending.len(),
			sink = self.sink.name(),
			"forwarding crash reports from previous session"
		);

		for (index, id) in pending.into_iter().enumerate() {
			if index > 0 && !self.inter_record_pause.is_zero() {
				tokio::time::sleep(self.inter_record_pause).await;
			}
			self.recover_one(id, &mut summary).await;
		}

		info!(
			forwarded = summary.forwarded,
			deleted = summary.deleted,
			read_failures = summary.read_failures,
			forward_failures = summary.forward_failures,
			delete_failures = summary.delete_failures,
			"crash report sweep finished"
		);
		summary
	}

	async fn recover_one(&self, id: RecordId, summary: &mut SweepSummary) {
		let store = Arc::clone(&self.store);
		let read_id = id.clone();
		let body = match blocking(move || store.read(&read_id)).await {
			Ok(body) => body,
			Err(e) => {
				summary.read_failures += 1;
				warn!(record_id = %id, error = %e, "failed to read crash report");
				self
					.log_to_sink(&format!("Failed to read crash report {id}: {e}"))
					.await;
				return;
			}
		};

		let exception = ExceptionInfo::new(PREVIOUS_SESSION_KIND, body);
		let forward = self
			.sink
			.record_exception(&exception, PREVIOUS_SESSION_MESSAGE, Severity::PreviousSession);
		match AssertUnwindSafe(forward).catch_unwind().await {
			Ok(Ok(())) => summary.forwarded += 1,
			Ok(Err(e)) => {
				summary.forward_failures += 1;
				warn!(
					record_id = %id,
					sink = self.sink.name(),
					error = %e,
					"failed to forward crash report"
				);
				return;
			}
			Err(payload) => {
				summary.forward_failures += 1;
				warn!(
					record_id = %id,
					sink = self.sink.name(),
					panic = %panic_payload_message(payload.as_ref()),
					"logging sink panicked while forwarding crash report"
				);
				return;
			}
		}

		let store = Arc::clone(&self.store);
		let delete_id = id.clone();
		match blocking(move || store.delete(&delete_id)).await {
			Ok(()) => {
				summary.deleted += 1;
				debug!(record_id = %id, "crash report forwarded");
			}
			Err(e) => {
				summary.delete_failures += 1;
				warn!(record_id = %id, error = %e, "failed to delete forwarded crash report");
				self
					.log_to_sink(&format!("Failed to delete crash report {id}: {e}"))
					.await;
			}
		}
	}

	async fn log_to_sink(&self, message: &str) {
		match AssertUnwindSafe(self.sink.log(message)).catch_unwind().await {
			Ok(Ok(())) => {}
			Ok(Err(e)) => {
				warn!(sink = self.sink.name(), error = %e, "logging sink rejected message");
			}
			Err(payload) => {
				warn!(
					sink = self.sink.name(),
					panic = %panic_payload_message(payload.as_ref()),
					"logging sink panicked while logging"
				);
			}
		}
	}
}

async fn blocking<T, F>(f: F) -> Result<T>
where
	F: FnOnce() -> Result<T> + Send + 'static,
	T: Send + 'static,
{
	tokio::task::spawn_blocking(f).await?
}
