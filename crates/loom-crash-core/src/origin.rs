// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity of the channel an error was captured from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CrashError;

const PROCESS_UNHANDLED: &str = "process-unhandled";
const UNOBSERVED_TASK: &str = "unobserved-task";
const NATIVE_BRIDGE_PREFIX: &str = "native-bridge:";

/// Which source adapter produced a captured error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ErrorOrigin {
	/// A panic that unwound (or aborted) past every handler.
	ProcessUnhandled,
	/// A detached background task that failed and was never awaited by its owner.
	UnobservedTask,
	/// An exception marshalled across a native runtime bridge.
	NativeBridge { platform: String },
}

impl ErrorOrigin {
	pub fn native_bridge(platform: impl Into<String>) -> Self {
		Self::NativeBridge {
			platform: platform.into(),
		}
	}
}

impl fmt::Display for ErrorOrigin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ProcessUnhandled => write!(f, "{PROCESS_UNHANDLED}"),
			Self::UnobservedTask => write!(f, "{UNOBSERVED_TASK}"),
			Self::NativeBridge { platform } => write!(f, "{NATIVE_BRIDGE_PREFIX}{platform}"),
		}
	}
}

impl FromStr for ErrorOrigin {
	type Err = CrashError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			PROCESS_UNHANDLED => Ok(Self::ProcessUnhandled),
			UNOBSERVED_TASK => Ok(Self::UnobservedTask),
			_ => match s.strip_prefix(NATIVE_BRIDGE_PREFIX) {
				Some(platform) if !platform.is_empty() => Ok(Self::native_bridge(platform)),
				_ => Err(CrashError::InvalidOrigin(s.to_string())),
			},
		}
	}
}

impl TryFrom<String> for ErrorOrigin {
	type Error = CrashError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<ErrorOrigin> for String {
	fn from(origin: ErrorOrigin) -> Self {
		origin.to_string()
	}
}
