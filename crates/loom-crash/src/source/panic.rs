// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Panic hook integration: the process-unhandled channel.

use std::backtrace::Backtrace;
use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicBool, Ordering};

use loom_crash_core::{CapturedError, ErrorOrigin, ExceptionInfo};
use tracing::info;

use crate::backtrace::parse_backtrace;
use crate::error::{CrashSdkError, Result};
use crate::hub::{is_publishing, UnhandledExceptionHub};
use crate::source::{panic_payload_message, publish_contained, ExceptionSource};

/// The panic hook is process-global, so installation is too.
static PANIC_HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Captures every panic through `std::panic::set_hook`.
///
/// The previously installed hook still runs afterwards, so the default
/// "thread panicked at" output and any other reporter are preserved.
pub struct PanicSource {
	hub: UnhandledExceptionHub,
}

impl PanicSource {
	pub fn new(hub: UnhandledExceptionHub) -> Self {
		Self { hub }
	}
}

impl ExceptionSource for PanicSource {
	fn origin(&self) -> ErrorOrigin {
		ErrorOrigin::ProcessUnhandled
	}

	fn install(&self) -> Result<()> {
		if PANIC_HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
			return Err(CrashSdkError::AlreadyInstalled(self.origin()));
		}

		let hub = self.hub.clone();
		let previous_hook = std::panic::take_hook();

		std::panic::set_hook(Box::new(move |info| {
			// A handler panicking mid-publish is contained by the hub; publishing
			// again from here would panic inside the hook and abort.
			if !is_publishing() {
				// Capture before anything else touches the stack
				let backtrace = Backtrace::force_capture();
				report_panic(&hub, info, &backtrace);
			}
			previous_hook(info);
		}));

		info!("panic hook installed");
		Ok(())
	}
}

fn report_panic(hub: &UnhandledExceptionHub, info: &PanicHookInfo<'_>, backtrace: &Backtrace) {
	let thread = std::thread::current();
	let thread_name = thread.name();

	let location = info
		.location()
		.map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));

	let message = match &location {
		Some(location) => format!(
			"{} in thread '{}' at {location}",
			ErrorOrigin::ProcessUnhandled,
			thread_name.unwrap_or("<unnamed>")
		),
		None => format!(
			"{} in thread '{}'",
			ErrorOrigin::ProcessUnhandled,
			thread_name.unwrap_or("<unnamed>")
		),
	};

	let exception = ExceptionInfo::new("panic", panic_payload_message(info.payload()))
		.with_stacktrace(parse_backtrace(backtrace));

	let error = CapturedError::new(
		ErrorOrigin::ProcessUnhandled,
		message,
		exception,
		panic_terminates(thread_name),
	);

	// Synchronous on purpose: nothing async completes once we return.
	publish_contained(hub, &error);
}

/// A panic ends the process when unwinding is disabled or it reaches the
/// top of the main thread. Worker-thread panics may still be survived.
fn panic_terminates(thread_name: Option<&str>) -> bool {
	cfg!(panic = "abort") || thread_name == Some("main")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_main_thread_panic_terminates() {
		assert!(panic_terminates(Some("main")));
	}

	#[test]
	fn test_worker_panic_terminates_only_with_abort() {
		assert_eq!(panic_terminates(Some("worker")), cfg!(panic = "abort"));
		assert_eq!(panic_terminates(None), cfg!(panic = "abort"));
	}

	#[test]
	fn test_origin() {
		let source = PanicSource::new(UnhandledExceptionHub::new());
		assert_eq!(source.origin(), ErrorOrigin::ProcessUnhandled);
	}
}
