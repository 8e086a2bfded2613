// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash reporter configuration.
//!
//! Layering, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. TOML file (`$XDG_CONFIG_HOME/loom/crash.toml` or an explicit path)
//! 3. `LOOM_CRASH_*` environment variables

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::recovery::DEFAULT_INTER_RECORD_PAUSE;

pub const ENV_DIR: &str = "LOOM_CRASH_DIR";
pub const ENV_PAUSE_MS: &str = "LOOM_CRASH_PAUSE_MS";
pub const ENV_RECOVER_ON_START: &str = "LOOM_CRASH_RECOVER_ON_START";
pub const ENV_PANIC_HOOK: &str = "LOOM_CRASH_PANIC_HOOK";
pub const ENV_NATIVE_PLATFORM: &str = "LOOM_CRASH_NATIVE_PLATFORM";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// I/O error reading config file
	#[error("I/O error reading {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// TOML parsing error
	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	/// Invalid value
	#[error("Invalid value for {field}: {message}")]
	InvalidValue { field: String, message: String },
}

impl ConfigError {
	/// Create an invalid value error
	pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			field: field.into(),
			message: message.into(),
		}
	}
}

/// Settings for [`CrashReporter`](crate::CrashReporter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
	/// Directory holding pending crash report records.
	pub report_dir: PathBuf,
	pub inter_record_pause_ms: u64,
	/// Sweep pending records when the reporter starts.
	pub recover_on_start: bool,
	pub install_panic_hook: bool,
	/// Enables the native bridge for this platform name (e.g. `ios`).
	pub native_platform: Option<String>,
}

impl Default for CrashConfig {
	fn default() -> Self {
		Self {
			report_dir: default_report_dir(),
			inter_record_pause_ms: DEFAULT_INTER_RECORD_PAUSE.as_millis() as u64,
			recover_on_start: true,
			install_panic_hook: true,
			native_platform: None,
		}
	}
}

impl CrashConfig {
	/// Defaults, then the user config file if present, then the environment.
	pub fn load() -> Result<Self, ConfigError> {
		let mut config = match user_config_path() {
			Some(path) if path.is_file() => Self::from_file(&path)?,
			_ => Self::default(),
		};
		config.apply_env()?;
		Ok(config)
	}

	/// Parses a TOML file; missing keys take their defaults.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let config = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
			path: path.to_path_buf(),
			source,
		})?;
		debug!(path = %path.display(), "loaded crash config file");
		Ok(config)
	}

	pub fn apply_env(&mut self) -> Result<(), ConfigError> {
		self.apply_env_from(|key| std::env::var(key).ok())
	}

	/// Applies overrides from `lookup`, which maps a variable name to its value.
	pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(dir) = lookup(ENV_DIR).filter(|v| !v.is_empty()) {
			self.report_dir = PathBuf::from(dir);
		}

		if let Some(value) = lookup(ENV_PAUSE_MS) {
			self.inter_record_pause_ms = value
				.trim()
				.parse()
				.map_err(|e| ConfigError::invalid_value(ENV_PAUSE_MS, format!("{e}")))?;
		}

		if let Some(value) = lookup(ENV_RECOVER_ON_START) {
			self.recover_on_start = parse_bool(ENV_RECOVER_ON_START, &value)?;
		}

		if let Some(value) = lookup(ENV_PANIC_HOOK) {
			self.install_panic_hook = parse_bool(ENV_PANIC_HOOK, &value)?;
		}

		if let Some(platform) = lookup(ENV_NATIVE_PLATFORM) {
			let platform = platform.trim();
			self.native_platform = (!platform.is_empty()).then(|| platform.to_string());
		}

		Ok(())
	}

	pub fn inter_record_pause(&self) -> Duration {
		Duration::from_millis(self.inter_record_pause_ms)
	}
}

/// `$XDG_CONFIG_HOME/loom/crash.toml`, if a config directory is known.
pub fn user_config_path() -> Option<PathBuf> {
	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(dirs::config_dir)?;
	Some(config_home.join("loom/crash.toml"))
}

fn default_report_dir() -> PathBuf {
	dirs::cache_dir()
		.unwrap_or_else(std::env::temp_dir)
		.join("loom/crash-reports")
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		other => Err(ConfigError::invalid_value(
			field,
			format!("expected a boolean, got '{other}'"),
		)),
	}
}
