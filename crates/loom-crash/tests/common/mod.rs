// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures for the crash pipeline integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use loom_crash::{
	CapturedError, CrashConfig, CrashReportStore, CrashSdkError, ErrorOrigin, ExceptionInfo,
	LoggingSink, RecordId, ReportStore, Result, Severity,
};

/// A sink that remembers everything it was handed.
#[derive(Default)]
pub struct RecordingSink {
	pub exceptions: Mutex<Vec<(ExceptionInfo, String, Severity)>>,
	pub logs: Mutex<Vec<String>>,
}

impl RecordingSink {
	pub fn exception_count(&self) -> usize {
		self.exceptions.lock().unwrap().len()
	}

	pub fn bodies(&self) -> Vec<String> {
		self
			.exceptions
			.lock()
			.unwrap()
			.iter()
			.map(|(e, _, _)| e.message.clone())
			.collect()
	}
}

#[async_trait]
impl LoggingSink for RecordingSink {
	fn name(&self) -> &str {
		"recording"
	}

	async fn record_exception(
		&self,
		exception: &ExceptionInfo,
		message: &str,
		severity: Severity,
	) -> Result<()> {
		self
			.exceptions
			.lock()
			.unwrap()
			.push((exception.clone(), message.to_string(), severity));
		Ok(())
	}

	async fn log(&self, message: &str) -> Result<()> {
		self.logs.lock().unwrap().push(message.to_string());
		Ok(())
	}
}

/// File store with switchable read and delete failures.
pub struct FaultyStore {
	pub inner: CrashReportStore,
	pub fail_read: AtomicBool,
	pub fail_delete: AtomicBool,
}

impl FaultyStore {
	pub fn new(dir: impl AsRef<Path>) -> Self {
		Self {
			inner: CrashReportStore::new(dir.as_ref()),
			fail_read: AtomicBool::new(false),
			fail_delete: AtomicBool::new(false),
		}
	}

	fn injected(op: &str) -> CrashSdkError {
		CrashSdkError::Handler(format!("injected {op} failure"))
	}
}

impl ReportStore for FaultyStore {
	fn persist(&self, error: &CapturedError) -> Result<RecordId> {
		self.inner.persist(error)
	}

	fn list_pending(&self) -> Result<Vec<RecordId>> {
		self.inner.list_pending()
	}

	fn read(&self, id: &RecordId) -> Result<String> {
		if self.fail_read.load(Ordering::SeqCst) {
			return Err(Self::injected("read"));
		}
		self.inner.read(id)
	}

	fn delete(&self, id: &RecordId) -> Result<()> {
		if self.fail_delete.load(Ordering::SeqCst) {
			return Err(Self::injected("delete"));
		}
		self.inner.delete(id)
	}
}

pub fn at(minute: u32, second: u32) -> DateTime<Local> {
	Local
		.with_ymd_and_hms(2025, 6, 1, 10, minute, second)
		.single()
		.unwrap()
}

pub fn captured(message: &str, captured_at: DateTime<Local>) -> CapturedError {
	CapturedError::at(
		ErrorOrigin::ProcessUnhandled,
		"process-unhandled in thread 'main'",
		ExceptionInfo::new("panic", message),
		true,
		captured_at,
	)
}

/// Config rooted in `dir` with no pause and no panic hook.
pub fn test_config(dir: &Path) -> CrashConfig {
	CrashConfig {
		report_dir: dir.to_path_buf(),
		inter_record_pause_ms: 0,
		recover_on_start: true,
		install_panic_hook: false,
		native_platform: None,
	}
}

pub fn arc_sink() -> Arc<RecordingSink> {
	Arc::new(RecordingSink::default())
}
