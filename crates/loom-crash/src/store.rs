// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable on-disk crash report records.
//!
//! Writes are synchronous and atomic: the body goes to a uniquely named
//! temp file, is flushed to the device, then renamed over the final name.
//! A reader either sees no record or a complete one.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use loom_crash_core::{render_body, CapturedError, RecordId};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CrashSdkError, Result};

/// Storage for pending crash report records.
///
/// Implementations must be callable from a panic hook: no async, no
/// panics, and `persist` returns only once the record is durable.
pub trait ReportStore: Send + Sync {
	fn persist(&self, error: &CapturedError) -> Result<RecordId>;

	/// Pending records, oldest first. A missing directory is an empty list.
	fn list_pending(&self) -> Result<Vec<RecordId>>;

	fn read(&self, id: &RecordId) -> Result<String>;

	/// Removing a record that is already gone succeeds.
	fn delete(&self, id: &RecordId) -> Result<()>;
}

/// Temp files older than this are left over from a write that never
/// finished and are removed while listing.
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(3600);

/// File-backed [`ReportStore`] over a single directory.
#[derive(Debug, Clone)]
pub struct CrashReportStore {
	report_dir: PathBuf,
	stale_temp_age: Duration,
}

impl CrashReportStore {
	pub fn new(report_dir: impl Into<PathBuf>) -> Self {
		Self {
			report_dir: report_dir.into(),
			stale_temp_age: STALE_TEMP_AGE,
		}
	}

	pub fn with_stale_temp_age(mut self, age: Duration) -> Self {
		self.stale_temp_age = age;
		self
	}

	pub fn report_dir(&self) -> &Path {
		&self.report_dir
	}

	fn record_path(&self, id: &RecordId) -> PathBuf {
		self.report_dir.join(id.file_name())
	}

	fn temp_path(&self, id: &RecordId) -> PathBuf {
		// Leading dot and .tmp suffix keep it out of list_pending.
		self
			.report_dir
			.join(format!(".{id}.{}.tmp", Uuid::now_v7().simple()))
	}

	/// Best effort; a temp file that cannot be inspected or removed stays.
	fn remove_if_stale(&self, path: &Path) {
		let modified = match fs::metadata(path).and_then(|m| m.modified()) {
			Ok(modified) => modified,
			Err(e) => {
				debug!(path = %path.display(), error = %e, "cannot stat crash report temp file");
				return;
			}
		};
		// An mtime in the future counts as fresh.
		let age = SystemTime::now()
			.duration_since(modified)
			.unwrap_or_default();
		if age < self.stale_temp_age {
			return;
		}

		match fs::remove_file(path) {
			Ok(()) => debug!(path = %path.display(), "removed stale crash report temp file"),
			Err(e) if e.kind() == ErrorKind::NotFound => {}
			Err(e) => warn!(
				path = %path.display(),
				error = %e,
				"failed to remove stale crash report temp file"
			),
		}
	}
}

impl ReportStore for CrashReportStore {
	fn persist(&self, error: &CapturedError) -> Result<RecordId> {
		let id = RecordId::for_error(error);
		let body = render_body(error);
		let path = self.record_path(&id);
		let tmp_path = self.temp_path(&id);

		fs::create_dir_all(&self.report_dir)
			.map_err(|e| CrashSdkError::io(&self.report_dir, e))?;

		if let Err(e) = write_synced(&tmp_path, body.as_bytes()) {
			let _ = fs::remove_file(&tmp_path);
			return Err(CrashSdkError::io(&tmp_path, e));
		}

		if let Err(e) = fs::rename(&tmp_path, &path) {
			let _ = fs::remove_file(&tmp_path);
			return Err(CrashSdkError::io(&path, e));
		}

		if let Err(e) = sync_dir(&self.report_dir) {
			// The rename is done; only its durability across power loss is in doubt.
			warn!(
				path = %self.report_dir.display(),
				error = %e,
				"failed to sync crash report directory"
			);
		}

		info!(
			record_id = %id,
			origin = %error.origin(),
			is_terminating = error.is_terminating(),
			"persisted crash report"
		);

		Ok(id)
	}

	fn list_pending(&self) -> Result<Vec<RecordId>> {
		let entries = match fs::read_dir(&self.report_dir) {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => {
				debug!(path = %self.report_dir.display(), "crash report directory does not exist");
				return Ok(Vec::new());
			}
			Err(e) => return Err(CrashSdkError::io(&self.report_dir, e)),
		};

		let mut ids = Vec::new();
		for entry in entries {
			let entry = entry.map_err(|e| CrashSdkError::io(&self.report_dir, e))?;

			let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
			if !is_file {
				continue;
			}

			let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
				continue;
			};

			if is_temp_name(&name) {
				self.remove_if_stale(&entry.path());
				continue;
			}

			if let Ok(id) = name.parse::<RecordId>() {
				ids.push(id);
			}
		}

		ids.sort();
		debug!(count = ids.len(), "listed pending crash reports");
		Ok(ids)
	}

	fn read(&self, id: &RecordId) -> Result<String> {
		let path = self.record_path(id);
		fs::read_to_string(&path).map_err(|e| CrashSdkError::io(path, e))
	}

	fn delete(&self, id: &RecordId) -> Result<()> {
		let path = self.record_path(id);
		match fs::remove_file(&path) {
			Ok(()) => {
				debug!(record_id = %id, "deleted crash report");
				Ok(())
			}
			Err(e) if e.kind() == ErrorKind::NotFound => {
				debug!(record_id = %id, "crash report already deleted");
				Ok(())
			}
			Err(e) => Err(CrashSdkError::io(path, e)),
		}
	}
}

fn is_temp_name(name: &str) -> bool {
	name.starts_with('.') && name.ends_with(".tmp")
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
	let mut file = File::create(path)?;
	file.write_all(bytes)?;
	file.sync_all()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
	File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
	Ok(())
}
