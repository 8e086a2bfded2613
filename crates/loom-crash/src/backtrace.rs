// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backtrace capture and parsing for panics and captured errors.

use loom_crash_core::{Frame, Stacktrace};
use rustc_demangle::demangle;
use std::backtrace::Backtrace;

/// Frames beyond this are dropped to keep crash report files small.
const MAX_FRAMES: usize = 128;

/// Parse a Rust backtrace into a Stacktrace.
pub fn parse_backtrace(backtrace: &Backtrace) -> Stacktrace {
	parse_backtrace_string(&backtrace.to_string())
}

/// Parse the `Display` output of a backtrace.
///
/// Frames look like `  3: my_app::main` optionally followed by a
/// `at src/main.rs:10:5` line that belongs to that frame.
pub(crate) fn parse_backtrace_string(bt_string: &str) -> Stacktrace {
	let mut frames: Vec<Frame> = Vec::new();

	for line in bt_string.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			if let Some(frame) = frames.last_mut() {
				apply_location(frame, location);
			}
			continue;
		}

		if frames.len() == MAX_FRAMES {
			break;
		}

		if let Some(frame) = parse_frame_line(line) {
			frames.push(frame);
		}
	}

	Stacktrace { frames }
}

/// Parse a single backtrace line into a Frame.
fn parse_frame_line(line: &str) -> Option<Frame> {
	let function_part = match line.split_once(':') {
		Some((prefix, rest)) if prefix.trim().parse::<u32>().is_ok() => rest.trim(),
		_ => line,
	};

	if function_part.is_empty() {
		return None;
	}

	let demangled = format!("{:#}", demangle(function_part));
	// e.g. "my_app::handlers::crash::capture" -> "my_app::handlers::crash"
	let module = demangled.rfind("::").map(|idx| demangled[..idx].to_string());
	let in_app = is_in_app_frame(&demangled);

	Some(Frame {
		function: Some(demangled),
		module,
		in_app,
		..Default::default()
	})
}

/// Fill filename/line/column from a `path:line:col` location.
fn apply_location(frame: &mut Frame, location: &str) {
	let mut parts = location.rsplitn(3, ':');
	let last = parts.next();
	let middle = parts.next();
	let rest = parts.next();

	match (rest, middle, last) {
		(Some(path), Some(line), Some(col)) => {
			frame.filename = Some(path.to_string());
			frame.lineno = line.parse().ok();
			frame.colno = col.parse().ok();
		}
		(None, Some(path), Some(line)) => {
			frame.filename = Some(path.to_string());
			frame.lineno = line.parse().ok();
		}
		_ => frame.filename = Some(location.to_string()),
	}
}

/// Determine if a frame is from user application code vs standard library.
fn is_in_app_frame(function: &str) -> bool {
	const SYSTEM_PREFIXES: &[&str] = &[
		"std::",
		"core::",
		"alloc::",
		"<std::",
		"<core::",
		"<alloc::",
		"tokio::",
		"<tokio::",
		"futures::",
		"<futures::",
		"tracing::",
		"<tracing::",
		"panic_unwind::",
		"rust_begin_unwind",
		"rust_panic",
		"__rust_",
		"_rust_",
		"loom_crash::",
		"<loom_crash::",
	];

	const SYSTEM_CONTAINS: &[&str] = &["::panicking::", "::rt::", "::sys_common::"];

	!SYSTEM_PREFIXES.iter().any(|p| function.starts_with(p))
		&& !SYSTEM_CONTAINS.iter().any(|c| function.contains(c))
}

/// Capture a fresh backtrace and parse it.
pub fn capture_backtrace() -> Stacktrace {
	let backtrace = Backtrace::force_capture();
	parse_backtrace(&backtrace)
}
