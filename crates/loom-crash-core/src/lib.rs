// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom crash capture and recovery pipeline.
//!
//! This crate holds the I/O-free data model shared by the capture side and
//! the recovery side of `loom-crash`:
//!
//! - [`CapturedError`]: the normalized value every error source publishes
//! - [`ExceptionInfo`]: kind, message, cause chain and best-effort stack
//! - [`ErrorOrigin`]: which channel produced the capture
//! - [`RecordId`] and [`render_body`]: naming and layout of the on-disk record
//! - [`Severity`]: classification used when forwarding to a logging sink

pub mod captured;
pub mod error;
pub mod exception;
pub mod origin;
pub mod record;
pub mod severity;

pub use captured::CapturedError;
pub use error::{CrashError, Result};
pub use exception::{ExceptionInfo, Frame, Stacktrace};
pub use origin::ErrorOrigin;
pub use record::{render_body, RecordId, RECORD_SUFFIX, RECORD_TIMESTAMP_FORMAT};
pub use severity::Severity;
