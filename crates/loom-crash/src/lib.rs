// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash capture and next-start recovery for Rust applications.
//!
//! Unhandled failures (panics, failed detached tasks, exceptions raised by a
//! host platform) are published to a process-wide hub, written synchronously
//! to a durable report directory, and forwarded to a logging sink the next
//! time the application starts.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use loom_crash::{CrashConfig, CrashReporter, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reporter = CrashReporter::builder()
//!         .config(CrashConfig::load()?)
//!         .sink(Arc::new(TracingSink))
//!         .build()?;
//!
//!     // Installs the panic hook and forwards last session's reports
//!     let started = reporter.start()?;
//!
//!     // Failures of fire-and-forget work are captured too
//!     started.tasks.spawn_detached("warm-cache", async {
//!         warm_cache().await
//!     })?;
//!
//!     // Handled errors can be sent straight to the sink
//!     if let Err(e) = risky_operation() {
//!         reporter.report_handled(&e, "risky operation failed").await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Panic Hook**: Captures every panic with a backtrace, then defers to the previous hook
//! - **Detached Tasks**: `spawn_detached` reports tasks that fail or panic with nobody awaiting them
//! - **Native Bridge**: FFI glue can hand platform exceptions to a `NativeBridgeReporter`
//! - **Durable Records**: Atomic, fsynced writes that survive the process dying right after
//! - **Recovery Sweep**: Pending records are forwarded oldest first and deleted once accepted

mod backtrace;
mod config;
mod error;
mod hub;
mod recovery;
mod reporter;
pub mod sink;
pub mod source;
mod store;

pub use backtrace::{capture_backtrace, parse_backtrace};
pub use config::{user_config_path, ConfigError, CrashConfig};
pub use error::{CrashSdkError, Result};
pub use hub::{ErrorHandler, PublishOutcome, UnhandledExceptionHub};
pub use recovery::{
	CrashReportRecoveryService, SweepSummary, DEFAULT_INTER_RECORD_PAUSE, PREVIOUS_SESSION_KIND,
	PREVIOUS_SESSION_MESSAGE,
};
pub use reporter::{CrashReporter, CrashReporterBuilder, StartedReporter};
pub use sink::{LoggingSink, TracingSink};
pub use source::{
	ExceptionSource, NativeBridgeReporter, NativeBridgeSource, NativeException, PanicSource,
	TaskSource,
};
pub use store::{CrashReportStore, ReportStore, STALE_TEMP_AGE};

// Re-export core types for convenience
pub use loom_crash_core::{
	CapturedError, ErrorOrigin, ExceptionInfo, Frame, RecordId, Severity, Stacktrace,
};
