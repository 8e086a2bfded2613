// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Top-level wiring of hub, adapters, store and recovery.

use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use loom_crash_core::{CapturedError, ExceptionInfo, Severity};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backtrace::capture_backtrace;
use crate::config::CrashConfig;
use crate::error::{CrashSdkError, Result};
use crate::hub::UnhandledExceptionHub;
use crate::recovery::{CrashReportRecoveryService, SweepSummary};
use crate::sink::{LoggingSink, TracingSink};
use crate::source::{
	ExceptionSource, NativeBridgeReporter, NativeBridgeSource, PanicSource, TaskSource,
};
use crate::store::{CrashReportStore, ReportStore};

/// Builder for constructing a [`CrashReporter`].
#[derive(Default)]
pub struct CrashReporterBuilder {
	config: Option<CrashConfig>,
	sink: Option<Arc<dyn LoggingSink>>,
	store: Option<Arc<dyn ReportStore>>,
	hub: Option<UnhandledExceptionHub>,
}

impl CrashReporterBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses `config` instead of [`CrashConfig::load`].
	pub fn config(mut self, config: CrashConfig) -> Self {
		self.config = Some(config);
		self
	}

	/// Sets the logging sink. Defaults to [`TracingSink`].
	pub fn sink(mut self, sink: Arc<dyn LoggingSink>) -> Self {
		self.sink = Some(sink);
		self
	}

	/// Replaces the file store rooted at `config.report_dir`.
	pub fn store(mut self, store: Arc<dyn ReportStore>) -> Self {
		self.store = Some(store);
		self
	}

	/// Shares an existing hub, e.g. one other subscribers already listen on.
	pub fn hub(mut self, hub: UnhandledExceptionHub) -> Self {
		self.hub = Some(hub);
		self
	}

	pub fn build(self) -> Result<CrashReporter> {
		let config = match self.config {
			Some(config) => config,
			None => CrashConfig::load()?,
		};

		let store = self
			.store
			.unwrap_or_else(|| Arc::new(CrashReportStore::new(config.report_dir.clone())));
		let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));

		debug!(
			report_dir = %config.report_dir.display(),
			sink = sink.name(),
			"crash reporter configured"
		);

		Ok(CrashReporter {
			hub: self.hub.unwrap_or_default(),
			store,
			sink,
			config,
			started: AtomicBool::new(false),
		})
	}
}

/// Handles returned by [`CrashReporter::start`].
pub struct StartedReporter {
	/// Spawns fire-and-forget tasks whose failures are captured.
	pub tasks: TaskSource,
	/// Present when `native_platform` is configured.
	pub native: Option<NativeBridgeReporter>,
	/// The startup sweep, when `recover_on_start` is set. Safe to drop.
	pub recovery: Option<JoinHandle<SweepSummary>>,
}

/// Crash capture and recovery for one process.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use loom_crash::{CrashConfig, CrashReporter, TracingSink};
///
/// let reporter = CrashReporter::builder()
///     .config(CrashConfig::load()?)
///     .sink(Arc::new(TracingSink))
///     .build()?;
///
/// let started = reporter.start()?;
/// started.tasks.spawn_detached("refresh", async { refresh().await })?;
/// ```
pub struct CrashReporter {
	hub: UnhandledExceptionHub,
	store: Arc<dyn ReportStore>,
	sink: Arc<dyn LoggingSink>,
	config: CrashConfig,
	started: AtomicBool,
}

impl CrashReporter {
	pub fn builder() -> CrashReporterBuilder {
		CrashReporterBuilder::new()
	}

	pub fn hub(&self) -> &UnhandledExceptionHub {
		&self.hub
	}

	pub fn store(&self) -> &Arc<dyn ReportStore> {
		&self.store
	}

	pub fn config(&self) -> &CrashConfig {
		&self.config
	}

	/// A recovery service over this reporter's store and sink.
	pub fn recovery(&self) -> CrashReportRecoveryService {
		CrashReportRecoveryService::new(Arc::clone(&self.store), Arc::clone(&self.sink))
			.with_inter_record_pause(self.config.inter_record_pause())
	}

	/// Subscribes the persist handler, installs the configured sources and
	/// spawns the recovery sweep.
	///
	/// Must be called from within a Tokio runtime. The persist handler is
	/// registered before recovery starts, so a crash during the sweep is
	/// still recorded.
	///
	/// A source that fails to install is logged and skipped. The reporter
	/// still starts with the remaining sources and runs recovery; only
	/// [`CrashSdkError::NoRuntime`] and [`CrashSdkError::AlreadyStarted`] are
	/// returned.
	pub fn start(&self) -> Result<StartedReporter> {
		Handle::try_current().map_err(|e| CrashSdkError::NoRuntime(e.to_string()))?;
		if self.started.swap(true, Ordering::SeqCst) {
			return Err(CrashSdkError::AlreadyStarted);
		}

		let store = Arc::clone(&self.store);
		self
			.hub
			.subscribe(move |error: &CapturedError| persist_captured(store.as_ref(), error));

		if self.config.install_panic_hook {
			install_or_warn(&PanicSource::new(self.hub.clone()));
		}

		let tasks = TaskSource::new(self.hub.clone());
		install_or_warn(&tasks);

		let native = match &self.config.native_platform {
			Some(platform) => {
				let source = NativeBridgeSource::new(self.hub.clone(), platform.clone());
				install_or_warn(&source).then(|| source.reporter())
			}
			None => None,
		};

		let recovery = if self.config.recover_on_start {
			Some(Arc::new(self.recovery()).spawn())
		} else {
			None
		};

		info!(
			report_dir = %self.config.report_dir.display(),
			panic_hook = self.config.install_panic_hook,
			native = native.is_some(),
			recovery = recovery.is_some(),
			"crash reporter started"
		);

		Ok(StartedReporter {
			tasks,
			native,
			recovery,
		})
	}

	/// Sends an error the application handled itself straight to the sink.
	pub async fn report_handled<E>(&self, error: &E, message: &str) -> Result<()>
	where
		E: StdError + ?Sized + 'static,
	{
		let exception = ExceptionInfo::from_error(error).with_stacktrace(capture_backtrace());
		self
			.sink
			.record_exception(&exception, message, Severity::Error)
			.await
	}
}

fn install_or_warn(source: &dyn ExceptionSource) -> bool {
	match source.install() {
		Ok(()) => true,
		Err(e) => {
			warn!(origin = %source.origin(), error = %e, "crash source not installed");
			false
		}
	}
}

/// The hub handler that makes captured errors durable.
///
/// May run inside the panic hook, so it only reports failures.
fn persist_captured(store: &dyn ReportStore, error: &CapturedError) -> Result<()> {
	match store.persist(error) {
		Ok(_) => Ok(()),
		Err(e) => {
			eprintln!("loom-crash: failed to persist crash report: {e}");
			error!(origin = %error.origin(), error = %e, "failed to persist crash report");
			Err(e)
		}
	}
}

impl std::fmt::Debug for CrashReporter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CrashReporter")
			.field("config", &self.config)
			.field("sink", &self.sink.name())
			.field("started", &self.started.load(Ordering::SeqCst))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use loom_crash_core::ErrorOrigin;
	use std::sync::Mutex;
	use std::time::Duration;
	use tempfile::TempDir;

	#[derive(Debug, thiserror::Error)]
	#[error("Testing UnobservedTaskException reporting")]
	struct TaskFailure;

	#[derive(Default)]
	struct RecordingSink {
		exceptions: Mutex<Vec<(ExceptionInfo, String, Severity)>>,
	}

	#[async_trait]
	impl LoggingSink for RecordingSink {
		fn name(&self) -> &str {
			"recording"
		}

		async fn record_exception(
			&self,
			exception: &ExceptionInfo,
			message: &str,
			severity: Severity,
		) -> Result<()> {
			self
				.exceptions
				.lock()
				.unwrap()
				.push((exception.clone(), message.to_string(), severity));
			Ok(())
		}

		async fn log(&self, _message: &str) -> Result<()> {
			Ok(())
		}
	}

	fn test_config(tmp: &TempDir) -> CrashConfig {
		CrashConfig {
			report_dir: tmp.path().join("reports"),
			inter_record_pause_ms: 0,
			recover_on_start: true,
			install_panic_hook: false,
			native_platform: None,
		}
	}

	#[tokio::test]
	async fn test_start_persists_published_errors() {
		let tmp = TempDir::new().unwrap();
		let reporter = CrashReporter::builder()
			.config(test_config(&tmp))
			.sink(Arc::new(RecordingSink::default()))
			.build()
			.unwrap();

		let started = reporter.start().unwrap();
		started.recovery.unwrap().await.unwrap();

		reporter.hub().publish(&CapturedError::new(
			ErrorOrigin::UnobservedTask,
			"unobserved-task 'sync'",
			ExceptionInfo::new("Error", "Testing UnobservedTaskException reporting"),
			true,
		));

		assert_eq!(reporter.store().list_pending().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_start_twice_fails() {
		let tmp = TempDir::new().unwrap();
		let reporter = CrashReporter::builder()
			.config(test_config(&tmp))
			.build()
			.unwrap();

		reporter.start().unwrap();
		assert!(matches!(reporter.start(), Err(CrashSdkError::AlreadyStarted)));
		assert_eq!(reporter.hub().subscriber_count(), 1);
	}

	#[test]
	fn test_start_outside_runtime_fails() {
		let tmp = TempDir::new().unwrap();
		let reporter = CrashReporter::builder()
			.config(test_config(&tmp))
			.build()
			.unwrap();

		assert!(matches!(reporter.start(), Err(CrashSdkError::NoRuntime(_))));
		assert_eq!(reporter.hub().subscriber_count(), 0);
	}

	#[tokio::test]
	async fn test_native_bridge_enabled_by_config() {
		let tmp = TempDir::new().unwrap();
		let reporter = CrashReporter::builder()
			.config(CrashConfig {
				native_platform: Some("ios".to_string()),
				recover_on_start: false,
				..test_config(&tmp)
			})
			.build()
			.unwrap();

		let started = reporter.start().unwrap();
		assert!(started.recovery.is_none());
		let native = started.native.unwrap();
		assert_eq!(native.origin(), &ErrorOrigin::native_bridge("ios"));
	}

	#[tokio::test]
	async fn test_native_install_failure_does_not_block_start() {
		let tmp = TempDir::new().unwrap();
		let reporter = CrashReporter::builder()
			.config(CrashConfig {
				native_platform: Some(String::new()),
				..test_config(&tmp)
			})
			.build()
			.unwrap();

		let started = reporter.start().unwrap();
		assert!(started.native.is_none());
		assert_eq!(reporter.hub().subscriber_count(), 1);
		let summary = started.recovery.unwrap().await.unwrap();
		assert_eq!(summary, SweepSummary::default());

		let failure = TaskFailure;
		started
			.tasks
			.spawn_detached("after-failed-native", async move { Err::<(), _>(failure) })
			.unwrap()
			.await
			.unwrap();
		assert_eq!(reporter.store().list_pending().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_report_handled_goes_straight_to_sink() {
		let tmp = TempDir::new().unwrap();
		let sink = Arc::new(RecordingSink::default());
		let reporter = CrashReporter::builder()
			.config(test_config(&tmp))
			.sink(sink.clone())
			.build()
			.unwrap();

		let error = std::io::Error::other("Testing exception logging");
		reporter
			.report_handled(&error, "handled error")
			.await
			.unwrap();

		let exceptions = sink.exceptions.lock().unwrap();
		assert_eq!(exceptions.len(), 1);
		assert_eq!(exceptions[0].0.message, "Testing exception logging");
		assert_eq!(exceptions[0].1, "handled error");
		assert_eq!(exceptions[0].2, Severity::Error);
		assert!(reporter.store().list_pending().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_recovery_uses_configured_pause() {
		let tmp = TempDir::new().unwrap();
		let reporter = CrashReporter::builder()
			.config(CrashConfig {
				inter_record_pause_ms: 250,
				..test_config(&tmp)
			})
			.build()
			.unwrap();

		let summary = reporter.recovery().sweep().await;
		assert_eq!(summary, SweepSummary::default());
		assert_eq!(reporter.config().inter_record_pause(), Duration::from_millis(250));
	}
}
