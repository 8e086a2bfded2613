// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-wide fan-out point for captured errors.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use loom_crash_core::CapturedError;
use tracing::{debug, warn};

use crate::error::Result;

thread_local! {
	static PUBLISHING: Cell<bool> = const { Cell::new(false) };
}

/// True while this thread is running hub handlers.
///
/// The panic hook checks this so a panicking handler is left to the hub's
/// own isolation instead of being published again from inside the hook.
pub(crate) fn is_publishing() -> bool {
	PUBLISHING.try_with(Cell::get).unwrap_or(false)
}

/// Marks the current thread as publishing until dropped.
struct PublishGuard {
	previous: bool,
}

impl PublishGuard {
	fn enter() -> Self {
		Self {
			previous: PUBLISHING.try_with(|p| p.replace(true)).unwrap_or(false),
		}
	}
}

impl Drop for PublishGuard {
	fn drop(&mut self) {
		let _ = PUBLISHING.try_with(|p| p.set(self.previous));
	}
}

/// Receives every error published to the hub after it subscribed.
///
/// Handlers run synchronously on the publishing thread, which may be inside
/// the panic hook. A handler that panics there aborts the process, so
/// handlers must report failure through their return value.
pub trait ErrorHandler: Send + Sync {
	fn handle(&self, error: &CapturedError) -> Result<()>;
}

impl<F> ErrorHandler for F
where
	F: Fn(&CapturedError) -> Result<()> + Send + Sync,
{
	fn handle(&self, error: &CapturedError) -> Result<()> {
		self(error)
	}
}

/// Outcome of a single publish, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
	pub delivered: usize,
	pub failed: usize,
}

/// Broadcast channel of [`CapturedError`].
///
/// Construct one at process start and hand clones to every adapter and
/// subscriber; clones share the same subscriber list. Subscriptions are
/// expected during startup only, so the registry is read-mostly.
#[derive(Clone, Default)]
pub struct UnhandledExceptionHub {
	handlers: Arc<RwLock<Vec<Arc<dyn ErrorHandler>>>>,
}

impl UnhandledExceptionHub {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a closure; it runs after every previously registered handler.
	pub fn subscribe<F>(&self, handler: F)
	where
		F: Fn(&CapturedError) -> Result<()> + Send + Sync + 'static,
	{
		self.subscribe_handler(Arc::new(handler));
	}

	pub fn subscribe_handler(&self, handler: Arc<dyn ErrorHandler>) {
		let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
		handlers.push(handler);
		debug!(subscribers = handlers.len(), "crash hub handler subscribed");
	}

	pub fn subscriber_count(&self) -> usize {
		self
			.handlers
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.len()
	}

	/// Runs every handler, in registration order, on the calling thread.
	///
	/// Failing or panicking handlers are logged and skipped; nothing is
	/// propagated to the publisher.
	pub fn publish(&self, error: &CapturedError) -> PublishOutcome {
		// Snapshot so handlers run without holding the lock.
		let handlers: Vec<Arc<dyn ErrorHandler>> = self
			.handlers
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone();

		let _guard = PublishGuard::enter();
		let mut outcome = PublishOutcome::default();
		for (index, handler) in handlers.iter().enumerate() {
			match catch_unwind(AssertUnwindSafe(|| handler.handle(error))) {
				Ok(Ok(())) => outcome.delivered += 1,
				Ok(Err(e)) => {
					outcome.failed += 1;
					warn!(
						handler = index,
						origin = %error.origin(),
						error = %e,
						"crash hub handler failed"
					);
				}
				Err(_) => {
					outcome.failed += 1;
					warn!(
						handler = index,
						origin = %error.origin(),
						"crash hub handler panicked"
					);
				}
			}
		}

		debug!(
			origin = %error.origin(),
			delivered = outcome.delivered,
			failed = outcome.failed,
			"published captured error"
		);
		outcome
	}
}

impl std::fmt::Debug for UnhandledExceptionHub {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("UnhandledExceptionHub")
			.field("subscribers", &self.subscriber_count())
			.finish()
	}
}
