// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for persisting and recovering crash reports.
//!
//! This test suite covers:
//! - Forwarding and removal of pending records
//! - Idempotent sweeps
//! - Retry after read, forward and delete failures
//! - Ordering across seconds
//! - Concurrent capture from independent sources

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{arc_sink, at, captured, test_config, FaultyStore};
use loom_crash::{
	CrashReportRecoveryService, CrashReportStore, CrashReporter, NativeException, ReportStore,
	Severity, PREVIOUS_SESSION_MESSAGE,
};
use tempfile::TempDir;

#[derive(Debug, thiserror::Error)]
#[error("Testing UnobservedTaskException reporting")]
struct BackgroundFailure;

fn service(
	store: Arc<dyn ReportStore>,
	sink: Arc<common::RecordingSink>,
) -> CrashReportRecoveryService {
	CrashReportRecoveryService::new(store, sink).with_inter_record_pause(Duration::ZERO)
}

/// Tests that a sweep forwards every record and then removes it.
///
/// Purpose: Verify the cold path end to end against the file store.
#[tokio::test]
async fn test_sweep_forwards_and_removes_records() {
	let tmp = TempDir::new().unwrap();
	let store = Arc::new(CrashReportStore::new(tmp.path()));
	store.persist(&captured("first crash", at(0, 1))).unwrap();
	store.persist(&captured("second crash", at(0, 2))).unwrap();

	let sink = arc_sink();
	let summary = service(store.clone(), sink.clone()).sweep().await;

	assert_eq!(summary.pending, 2);
	assert_eq!(summary.forwarded, 2);
	assert_eq!(summary.deleted, 2);
	assert!(store.list_pending().unwrap().is_empty());

	let exceptions = sink.exceptions.lock().unwrap();
	assert!(exceptions
		.iter()
		.all(|(_, m, s)| m == PREVIOUS_SESSION_MESSAGE && *s == Severity::PreviousSession));
}

/// Tests that sweeping twice forwards each record once.
///
/// Purpose: Verify a second start with nothing left makes no sink calls.
#[tokio::test]
async fn test_second_sweep_is_a_no_op() {
	let tmp = TempDir::new().unwrap();
	let store = Arc::new(CrashReportStore::new(tmp.path()));
	store.persist(&captured("only once", at(1, 0))).unwrap();

	let sink = arc_sink();
	service(store.clone(), sink.clone()).sweep().await;
	let second = service(store.clone(), sink.clone()).sweep().await;

	assert_eq!(second.pending, 0);
	assert_eq!(sink.exception_count(), 1);
	assert!(sink.logs.lock().unwrap().is_empty());
}

/// Tests that a failed delete leads to a duplicate forward next time.
///
/// Purpose: Verify at-least-once delivery when cleanup fails.
#[tokio::test]
async fn test_delete_failure_reforwards_on_next_sweep() {
	let tmp = TempDir::new().unwrap();
	let store = Arc::new(FaultyStore::new(tmp.path()));
	store.persist(&captured("sticky", at(2, 0))).unwrap();
	store.fail_delete.store(true, Ordering::SeqCst);

	let sink = arc_sink();
	let first = service(store.clone(), sink.clone()).sweep().await;
	assert_eq!(first.forwarded, 1);
	assert_eq!(first.delete_failures, 1);
	assert_eq!(store.list_pending().unwrap().len(), 1);
	assert_eq!(sink.logs.lock().unwrap().len(), 1);

	store.fail_delete.store(false, Ordering::SeqCst);
	let second = service(store.clone(), sink.clone()).sweep().await;
	assert_eq!(second.deleted, 1);
	assert!(store.list_pending().unwrap().is_empty());

	let bodies = sink.bodies();
	assert_eq!(bodies.len(), 2);
	assert_eq!(bodies[0], bodies[1]);
}

/// Tests that an unreadable record is reported and left in place.
///
/// Purpose: Verify per-record failure does not stop the sweep.
#[tokio::test]
async fn test_read_failure_is_logged_and_skipped() {
	let tmp = TempDir::new().unwrap();
	let store = Arc::new(FaultyStore::new(tmp.path()));
	store.persist(&captured("unreadable", at(3, 0))).unwrap();
	store.persist(&captured("also unreadable", at(3, 1))).unwrap();
	store.fail_read.store(true, Ordering::SeqCst);

	let sink = arc_sink();
	let summary = service(store.clone(), sink.clone()).sweep().await;

	assert_eq!(summary.read_failures, 2);
	assert_eq!(sink.exception_count(), 0);
	assert_eq!(sink.logs.lock().unwrap().len(), 2);
	assert_eq!(store.list_pending().unwrap().len(), 2);
}

/// Tests sweeping a directory that was never created.
///
/// Purpose: Verify a fresh install starts cleanly.
#[tokio::test]
async fn test_missing_directory_sweeps_nothing() {
	let tmp = TempDir::new().unwrap();
	let store = Arc::new(CrashReportStore::new(tmp.path().join("never-created")));

	let sink = arc_sink();
	let summary = service(store, sink.clone()).sweep().await;

	assert_eq!(summary.pending, 0);
	assert_eq!(sink.exception_count(), 0);
	assert!(sink.logs.lock().unwrap().is_empty());
}

/// Tests that records are forwarded oldest first.
///
/// Purpose: Verify ordering across seconds regardless of write order.
#[tokio::test]
async fn test_records_forwarded_in_capture_order() {
	let tmp = TempDir::new().unwrap();
	let store = Arc::new(CrashReportStore::new(tmp.path()));
	store.persist(&captured("third", at(5, 30))).unwrap();
	store.persist(&captured("first", at(4, 59))).unwrap();
	store.persist(&captured("second", at(5, 0))).unwrap();

	let sink = arc_sink();
	service(store, sink.clone()).sweep().await;

	let bodies = sink.bodies();
	let order: Vec<_> = ["first", "second", "third"]
		.iter()
		.map(|m| bodies.iter().position(|b| b.contains(&format!("panic: {m}"))).unwrap())
		.collect();
	assert_eq!(order, vec![0, 1, 2]);
}

/// Tests two sources firing at the same time.
///
/// Purpose: Verify concurrent capture leaves only complete records and
/// that every surviving record is forwarded and removed.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_sources_are_all_recovered() {
	let tmp = TempDir::new().unwrap();
	let reporter = CrashReporter::builder()
		.config(loom_crash::CrashConfig {
			native_platform: Some("ios".to_string()),
			recover_on_start: false,
			..test_config(tmp.path())
		})
		.sink(arc_sink())
		.build()
		.unwrap();
	let started = reporter.start().unwrap();

	let native = started.native.clone().unwrap();
	let native_thread = std::thread::spawn(move || {
		native.report(NativeException::new("NSGenericException", "Testing crash reporting"))
	});
	let task = started
		.tasks
		.spawn_detached("background", async { Err::<(), _>(BackgroundFailure) })
		.unwrap();

	assert_eq!(native_thread.join().unwrap().delivered, 1);
	task.await.unwrap();

	// Same-second captures collapse into one record.
	let pending = reporter.store().list_pending().unwrap();
	assert!((1..=2).contains(&pending.len()));
	for id in &pending {
		let body = reporter.store().read(id).unwrap();
		assert!(body.starts_with("Time: "));
		assert!(body.contains("Error: Unhandled Exception\r\n"));
	}

	let sink = arc_sink();
	let summary = service(reporter.store().clone(), sink.clone()).sweep().await;

	assert_eq!(summary.deleted, pending.len());
	assert_eq!(sink.exception_count(), pending.len());
	assert!(reporter.store().list_pending().unwrap().is_empty());
}

/// Tests that a brand new crash during the sweep is kept for next time.
///
/// Purpose: Verify hot capture and recovery share the store safely.
#[tokio::test]
async fn test_capture_during_sweep_is_not_lost() {
	let tmp = TempDir::new().unwrap();
	let store = Arc::new(CrashReportStore::new(tmp.path()));
	store.persist(&captured("old", at(6, 0))).unwrap();

	let sink = arc_sink();
	let pending = store.list_pending().unwrap();
	let summary = service(store.clone(), sink.clone()).sweep().await;
	store.persist(&captured("new", at(6, 1))).unwrap();

	assert_eq!(summary.deleted, pending.len());
	let remaining = store.list_pending().unwrap();
	assert_eq!(remaining.len(), 1);
	assert!(store.read(&remaining[0]).unwrap().contains("panic: new"));
}
