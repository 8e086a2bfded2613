// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: capture crashes and recover them on the next run.
//!
//! Run twice with:
//!   cargo run --example capture -p loom-crash
//!
//! The first run persists a worker panic and a failed background task; the
//! second run forwards both to the tracing sink and clears the directory.

use std::sync::Arc;
use std::time::Duration;

use loom_crash::{CrashConfig, CrashReporter, TracingSink};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
#[error("Testing UnobservedTaskException reporting")]
struct BackgroundError;

#[derive(Debug, thiserror::Error)]
#[error("Testing exception logging")]
struct HandledError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new("info,loom_crash=debug")),
		)
		.init();

	let config = CrashConfig::load()?;
	println!("Crash reports directory: {}", config.report_dir.display());

	let reporter = CrashReporter::builder()
		.config(config)
		.sink(Arc::new(TracingSink))
		.build()?;
	let started = reporter.start()?;

	if let Some(recovery) = started.recovery {
		let summary = recovery.await?;
		println!("Recovered {} report(s) from the previous run", summary.deleted);
	}

	println!("\nTesting crash reporting...");
	let worker = std::thread::Builder::new()
		.name("worker".to_string())
		.spawn(|| panic!("Testing crash reporting"))?;
	let _ = worker.join();

	// Keep the two records in different seconds.
	tokio::time::sleep(Duration::from_millis(1100)).await;

	println!("Testing UnobservedTaskException reporting...");
	started
		.tasks
		.spawn_detached("background", async { Err::<(), _>(BackgroundError) })?
		.await?;

	println!("Testing exception logging...");
	reporter
		.report_handled(&HandledError, "handled error from example")
		.await?;

	let pending = reporter.store().list_pending()?;
	println!("\n{} report(s) pending; run again to forward them", pending.len());

	Ok(())
}
