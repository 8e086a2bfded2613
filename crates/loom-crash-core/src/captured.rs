// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The normalized value every source adapter publishes.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::exception::ExceptionInfo;
use crate::origin::ErrorOrigin;

/// A fatal or unobserved error, frozen at the moment it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedError {
	origin: ErrorOrigin,
	message: String,
	exception: ExceptionInfo,
	is_terminating: bool,
	captured_at: DateTime<Local>,
}

impl CapturedError {
	/// Captures now, using the local wall clock.
	pub fn new(
		origin: ErrorOrigin,
		message: impl Into<String>,
		exception: ExceptionInfo,
		is_terminating: bool,
	) -> Self {
		Self::at(origin, message, exception, is_terminating, Local::now())
	}

	pub fn at(
		origin: ErrorOrigin,
		message: impl Into<String>,
		exception: ExceptionInfo,
		is_terminating: bool,
		captured_at: DateTime<Local>,
	) -> Self {
		Self {
			origin,
			message: message.into(),
			exception,
			is_terminating,
			captured_at,
		}
	}

	pub fn origin(&self) -> &ErrorOrigin {
		&self.origin
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn exception(&self) -> &ExceptionInfo {
		&self.exception
	}

	/// Whether the channel expects the process to end right after this error.
	///
	/// Advisory only: no channel's value here is verified against the host.
	pub fn is_terminating(&self) -> bool {
		self.is_terminating
	}

	pub fn captured_at(&self) -> DateTime<Local> {
		self.captured_at
	}
}
