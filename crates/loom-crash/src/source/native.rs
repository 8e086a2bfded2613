// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Platform-native exceptions delivered over FFI glue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use loom_crash_core::{CapturedError, CrashError, ErrorOrigin, ExceptionInfo, Frame, Stacktrace};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CrashSdkError, Result};
use crate::hub::{PublishOutcome, UnhandledExceptionHub};
use crate::source::{publish_contained, ExceptionSource};

const MAX_NATIVE_FRAMES: usize = 128;

/// An exception raised by the host platform's runtime, as handed over by the
/// binding layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeException {
	pub name: String,
	pub reason: String,
	/// One symbolicated frame per entry, innermost first.
	#[serde(default)]
	pub call_stack_symbols: Vec<String>,
	/// Run loop or dispatch mode the exception surfaced in, if known.
	#[serde(default)]
	pub mode: Option<String>,
}

impl NativeException {
	pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			reason: reason.into(),
			call_stack_symbols: Vec::new(),
			mode: None,
		}
	}

	pub fn with_call_stack(mut self, symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.call_stack_symbols = symbols.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
		self.mode = Some(mode.into());
		self
	}

	fn to_exception_info(&self) -> ExceptionInfo {
		let frames = self
			.call_stack_symbols
			.iter()
			.map(|s| s.trim())
			.filter(|s| !s.is_empty())
			.take(MAX_NATIVE_FRAMES)
			.map(native_frame)
			.collect();

		ExceptionInfo::new("NativeException", format!("{}: {}", self.name, self.reason))
			.with_stacktrace(Stacktrace { frames })
	}
}

/// Symbol lines are opaque platform text; only Rust symbols are demangled.
fn native_frame(symbol: &str) -> Frame {
	let function = symbol
		.split_whitespace()
		.map(|token| match rustc_demangle::try_demangle(token) {
			Ok(d) => format!("{d:#}"),
			Err(_) => token.to_string(),
		})
		.collect::<Vec<_>>()
		.join(" ");

	Frame {
		function: Some(function),
		..Default::default()
	}
}

/// The native-bridge channel for one platform.
pub struct NativeBridgeSource {
	hub: UnhandledExceptionHub,
	platform: String,
	installed: AtomicBool,
}

impl NativeBridgeSource {
	pub fn new(hub: UnhandledExceptionHub, platform: impl Into<String>) -> Self {
		Self {
			hub,
			platform: platform.into(),
			installed: AtomicBool::new(false),
		}
	}

	pub fn platform(&self) -> &str {
		&self.platform
	}

	/// Handle for the binding layer to deliver exceptions through.
	pub fn reporter(&self) -> NativeBridgeReporter {
		NativeBridgeReporter {
			hub: self.hub.clone(),
			origin: Arc::new(self.origin()),
		}
	}
}

impl ExceptionSource for NativeBridgeSource {
	fn origin(&self) -> ErrorOrigin {
		ErrorOrigin::native_bridge(self.platform.clone())
	}

	fn install(&self) -> Result<()> {
		if self.platform.is_empty() {
			warn!("native bridge platform is empty");
			return Err(CrashError::InvalidOrigin(self.origin().to_string()).into());
		}
		if self.installed.swap(true, Ordering::SeqCst) {
			return Err(CrashSdkError::AlreadyInstalled(self.origin()));
		}
		info!(platform = %self.platform, "native bridge installed");
		Ok(())
	}
}

/// Cloneable entry point called by FFI glue when the platform raises.
#[derive(Clone)]
pub struct NativeBridgeReporter {
	hub: UnhandledExceptionHub,
	origin: Arc<ErrorOrigin>,
}

impl NativeBridgeReporter {
	pub fn origin(&self) -> &ErrorOrigin {
		&self.origin
	}

	/// Publishes the exception. Never fails back into the caller.
	pub fn report(&self, exception: NativeException) -> PublishOutcome {
		let message = match &exception.mode {
			Some(mode) => format!("{} ({mode})", self.origin),
			None => self.origin.to_string(),
		};

		let error = CapturedError::new(
			(*self.origin).clone(),
			message,
			exception.to_exception_info(),
			true,
		);
		publish_contained(&self.hub, &error)
	}
}

impl std::fmt::Debug for NativeBridgeReporter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NativeBridgeReporter")
			.field("origin", &self.origin)
			.finish()
	}
}
