// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for crash capture values.

use thiserror::Error;

/// Errors raised when parsing or validating crash capture values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrashError {
	#[error("invalid error origin: {0}")]
	InvalidOrigin(String),

	#[error("invalid severity: {0}")]
	InvalidSeverity(String),

	#[error("invalid crash report record id: {0}")]
	InvalidRecordId(String),
}

/// Result type for crash capture values.
pub type Result<T> = std::result::Result<T, CrashError>;
