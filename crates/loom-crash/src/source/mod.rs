// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exception source adapters.
//!
//! Each adapter listens to one runtime error channel, turns what it sees
//! into a [`CapturedError`] and publishes it to the hub. Adapters are
//! installed once at startup and stay active for the life of the process.

mod native;
mod panic;
mod task;

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use loom_crash_core::{CapturedError, ErrorOrigin};

use crate::error::Result;
use crate::hub::{PublishOutcome, UnhandledExceptionHub};

pub use native::{NativeBridgeReporter, NativeBridgeSource, NativeException};
pub use panic::PanicSource;
pub use task::TaskSource;

/// One runtime error channel feeding the hub.
pub trait ExceptionSource: Send + Sync {
	fn origin(&self) -> ErrorOrigin;

	/// Starts listening. A second call returns `AlreadyInstalled`.
	fn install(&self) -> Result<()>;
}

/// Publishes without letting anything escape into the host's callback.
pub(crate) fn publish_contained(
	hub: &UnhandledExceptionHub,
	error: &CapturedError,
) -> PublishOutcome {
	match catch_unwind(AssertUnwindSafe(|| hub.publish(error))) {
		Ok(outcome) => outcome,
		Err(_) => {
			eprintln!(
				"loom-crash: failed to publish captured error from {}",
				error.origin()
			);
			PublishOutcome::default()
		}
	}
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_payload_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}
