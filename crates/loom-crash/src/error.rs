// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the crash SDK.
//!
//! Everything here is a pipeline error: a failure of capture, persistence or
//! recovery itself. None of them are allowed to escape into the host process
//! from a capture callback.

use std::path::PathBuf;

use loom_crash_core::{CrashError, ErrorOrigin};
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for crash operations.
pub type Result<T> = std::result::Result<T, CrashSdkError>;

/// Errors that can occur in the crash SDK.
#[derive(Debug, Error)]
pub enum CrashSdkError {
	/// Reading or writing a crash report file failed.
	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// A record name did not follow the naming convention.
	#[error(transparent)]
	Record(#[from] CrashError),

	/// An exception source was installed a second time.
	#[error("exception source {0} is already installed")]
	AlreadyInstalled(ErrorOrigin),

	/// A hub handler reported a failure.
	#[error("handler failed: {0}")]
	Handler(String),

	/// The logging sink could not accept the report.
	#[error("logging sink '{sink}' failed: {message}")]
	Sink { sink: String, message: String },

	/// A blocking store operation or background task did not complete.
	#[error("background task failed: {0}")]
	Join(#[from] tokio::task::JoinError),

	/// Configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// An async operation was requested outside a Tokio runtime.
	#[error("no tokio runtime available: {0}")]
	NoRuntime(String),

	/// `CrashReporter::start` was called more than once.
	#[error("crash reporter already started")]
	AlreadyStarted,
}

impl CrashSdkError {
	pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}

	/// Create a sink error
	pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Sink {
			sink: sink.into(),
			message: message.into(),
		}
	}
}
