// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exception detail carried by a captured error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source chains longer than this are truncated when converting an error.
const MAX_CAUSE_DEPTH: usize = 32;

/// The underlying error of a capture: kind, message, cause chain and stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInfo {
	/// Type or category of the error, e.g. `panic` or `std::io::error::Error`.
	pub kind: String,
	pub message: String,
	pub cause: Option<Box<ExceptionInfo>>,
	/// Best effort; empty when no backtrace could be taken.
	#[serde(default)]
	pub stacktrace: Stacktrace,
}

impl ExceptionInfo {
	pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			message: message.into(),
			cause: None,
			stacktrace: Stacktrace::default(),
		}
	}

	pub fn with_cause(mut self, cause: ExceptionInfo) -> Self {
		self.cause = Some(Box::new(cause));
		self
	}

	pub fn with_stacktrace(mut self, stacktrace: Stacktrace) -> Self {
		self.stacktrace = stacktrace;
		self
	}

	/// Converts an error and its `source()` chain.
	///
	/// The outer kind is the static type name of `E`; sources are only known
	/// as trait objects and are recorded with kind `Error`.
	pub fn from_error<E>(error: &E) -> Self
	where
		E: std::error::Error + ?Sized + 'static,
	{
		let kind = std::any::type_name::<E>().trim_start_matches("dyn ");
		let mut causes = Vec::new();
		let mut next = error.source();
		while let Some(source) = next {
			if causes.len() == MAX_CAUSE_DEPTH {
				break;
			}
			causes.push(ExceptionInfo::new("Error", source.to_string()));
			next = source.source();
		}

		let cause = causes
			.into_iter()
			.rev()
			.fold(None, |inner: Option<ExceptionInfo>, mut outer| {
				outer.cause = inner.map(Box::new);
				Some(outer)
			});

		Self {
			kind: kind.to_string(),
			message: error.to_string(),
			cause: cause.map(Box::new),
			stacktrace: Stacktrace::default(),
		}
	}

	/// `kind: message`, the one-line form used when no message is supplied.
	pub fn summary(&self) -> String {
		format!("{}: {}", self.kind, self.message)
	}

	/// Iterates over the cause chain, starting with the direct cause.
	pub fn causes(&self) -> impl Iterator<Item = &ExceptionInfo> {
		std::iter::successors(self.cause.as_deref(), |c| c.cause.as_deref())
	}

	/// Flattened multi-line text: summary, ` ---> ` per cause, then frames.
	pub fn render(&self) -> String {
		let mut out = self.summary();
		for cause in self.causes() {
			out.push_str("\n ---> ");
			out.push_str(&cause.summary());
		}
		for frame in &self.stacktrace.frames {
			out.push_str("\n   ");
			out.push_str(&frame.to_string());
		}
		out
	}
}

impl fmt::Display for ExceptionInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.render())
	}
}

/// Stack trace containing multiple frames, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stacktrace {
	pub frames: Vec<Frame>,
}

/// A single stack frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
	/// Function/method name
	pub function: Option<String>,
	/// Module/crate/package
	pub module: Option<String>,
	pub filename: Option<String>,
	pub lineno: Option<u32>,
	pub colno: Option<u32>,
	/// User code vs dependency
	pub in_app: bool,
}

impl fmt::Display for Frame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "at {}", self.function.as_deref().unwrap_or("<unknown>"))?;
		if let Some(filename) = &self.filename {
			write!(f, " in {filename}")?;
			if let Some(lineno) = self.lineno {
				write!(f, ":{lineno}")?;
				if let Some(colno) = self.colno {
					write!(f, ":{colno}")?;
				}
			}
		}
		Ok(())
	}
}
