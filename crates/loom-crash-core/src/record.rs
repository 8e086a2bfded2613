// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! At-rest form of a captured error: file naming and body layout.
//!
//! A record is named `{yyyyMMdd_HHmmss}_CrashReport.txt` after the local
//! capture time. Two captures in the same second share a name and the later
//! write wins.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::captured::CapturedError;
use crate::error::CrashError;

/// Suffix shared by every crash report file name.
pub const RECORD_SUFFIX: &str = "_CrashReport.txt";

/// chrono format of the timestamp stem.
pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Line separator used in record bodies.
const LINE_BREAK: &str = "\r\n";

/// File name of a crash report record.
///
/// Ordering is lexicographic on the name, which for the fixed-width stem is
/// chronological.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
	pub fn for_timestamp(captured_at: &DateTime<Local>) -> Self {
		Self(format!(
			"{}{RECORD_SUFFIX}",
			captured_at.format(RECORD_TIMESTAMP_FORMAT)
		))
	}

	pub fn for_error(error: &CapturedError) -> Self {
		Self::for_timestamp(&error.captured_at())
	}

	/// Returns true if `name` follows the record naming convention.
	pub fn matches(name: &str) -> bool {
		name.parse::<RecordId>().is_ok()
	}

	pub fn file_name(&self) -> &str {
		&self.0
	}

	/// The capture time encoded in the name, at second precision.
	pub fn timestamp(&self) -> NaiveDateTime {
		let stem = &self.0[..self.0.len() - RECORD_SUFFIX.len()];
		// Validated on construction.
		NaiveDateTime::parse_from_str(stem, RECORD_TIMESTAMP_FORMAT).unwrap_or_default()
	}
}

impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for RecordId {
	type Err = CrashError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let stem = s
			.strip_suffix(RECORD_SUFFIX)
			.ok_or_else(|| CrashError::InvalidRecordId(s.to_string()))?;
		// Reject anything chrono would accept that we would never write,
		// e.g. unpadded fields.
		if stem.len() != "yyyyMMdd_HHmmss".len() {
			return Err(CrashError::InvalidRecordId(s.to_string()));
		}
		NaiveDateTime::parse_from_str(stem, RECORD_TIMESTAMP_FORMAT)
			.map_err(|_| CrashError::InvalidRecordId(s.to_string()))?;
		Ok(Self(s.to_string()))
	}
}

impl TryFrom<String> for RecordId {
	type Error = CrashError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<RecordId> for String {
	fn from(id: RecordId) -> Self {
		id.0
	}
}

/// Renders the flattened text body written to disk.
///
/// Layout: `Time: {captured_at}`, `Error: Unhandled Exception`, the capture
/// message, then the rendered exception, separated by CRLF.
pub fn render_body(error: &CapturedError) -> String {
	format!(
		"Time: {}{LINE_BREAK}Error: Unhandled Exception{LINE_BREAK}{}{LINE_BREAK}{}",
		error.captured_at().to_rfc3339(),
		error.message(),
		error.exception().render(),
	)
}
