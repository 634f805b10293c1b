//! Configuration for the external tools and the scheduler.
//!
//! Loaded from TOML. Every field has a default, so an empty file is valid:
//!
//! ```toml
//! workspace_root = "/home/user/project"
//! max_concurrent_checks = 8
//!
//! [parser]
//! command = "./json_parser.exe"
//!
//! [verifier]
//! command = "./ceval.exe"
//! fast_flag = "--fast"
//! timeout_secs = 120
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scheduler::SchedulerConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluejayConfig {
	/// Working directory for the parser and verifier processes.
	pub workspace_root: Option<PathBuf>,
	/// Directory for in-memory document snapshots. Defaults to a temp subdirectory.
	pub snapshot_dir: Option<PathBuf>,
	/// Upper bound on concurrently running checks per document. Unbounded if unset.
	pub max_concurrent_checks: Option<usize>,
	/// Statement parser process.
	pub parser: ParserConfig,
	/// Statement verifier process.
	pub verifier: VerifierConfig,
}

/// Configuration for the parser process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
	/// Command to run. Receives the document path as its only extra argument.
	pub command: String,
	/// Arguments placed before the document path.
	pub args: Vec<String>,
	/// Environment variables to set.
	pub env: HashMap<String, String>,
}

impl Default for ParserConfig {
	fn default() -> Self {
		Self {
			command: "./json_parser.exe".into(),
			args: Vec::new(),
			env: HashMap::new(),
		}
	}
}

/// Configuration for the verifier process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
	/// Command to run.
	pub command: String,
	/// Arguments placed before the document path.
	pub args: Vec<String>,
	/// Environment variables to set.
	pub env: HashMap<String, String>,
	/// Flag selecting the statement to check, followed by its index.
	pub check_index_flag: String,
	/// Flag selecting fast (sound, incomplete) mode.
	pub fast_flag: String,
	/// Per-phase time limit in seconds. No limit if unset.
	pub timeout_secs: Option<u64>,
}

impl Default for VerifierConfig {
	fn default() -> Self {
		Self {
			command: "./ceval.exe".into(),
			args: Vec::new(),
			env: HashMap::new(),
			check_index_flag: "--check-index".into(),
			fast_flag: "--fast".into(),
			timeout_secs: None,
		}
	}
}

impl VerifierConfig {
	/// Per-phase time limit.
	pub fn timeout(&self) -> Option<Duration> {
		self.timeout_secs.map(Duration::from_secs)
	}
}

impl BluejayConfig {
	/// Parse a TOML string.
	pub fn parse(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	/// Load configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&content)
	}

	/// Scheduler settings derived from this configuration.
	pub fn scheduler_config(&self) -> SchedulerConfig {
		let mut config = SchedulerConfig::default();
		if let Some(dir) = &self.snapshot_dir {
			config.snapshot_dir = dir.clone();
		}
		config.max_concurrent_checks = self.max_concurrent_checks;
		config
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn empty_config_uses_defaults() {
		let config = BluejayConfig::parse("").unwrap();
		assert_eq!(config, BluejayConfig::default());
		assert_eq!(config.parser.command, "./json_parser.exe");
		assert_eq!(config.verifier.check_index_flag, "--check-index");
		assert_eq!(config.verifier.timeout(), None);
	}

	#[test]
	fn parses_overrides() {
		let config = BluejayConfig::parse(
			r#"
			workspace_root = "/work"
			max_concurrent_checks = 4

			[verifier]
			command = "ceval"
			fast_flag = "--sound"
			timeout_secs = 30
			env = { CEVAL_LOG = "1" }
			"#,
		)
		.unwrap();

		assert_eq!(config.workspace_root, Some(PathBuf::from("/work")));
		assert_eq!(config.verifier.command, "ceval");
		assert_eq!(config.verifier.fast_flag, "--sound");
		assert_eq!(config.verifier.check_index_flag, "--check-index");
		assert_eq!(config.verifier.timeout(), Some(Duration::from_secs(30)));
		assert_eq!(config.verifier.env.get("CEVAL_LOG").map(String::as_str), Some("1"));
		assert_eq!(config.scheduler_config().max_concurrent_checks, Some(4));
	}

	#[test]
	fn rejects_wrong_types() {
		assert!(matches!(BluejayConfig::parse("max_concurrent_checks = \"many\""), Err(ConfigError::Toml(_))));
	}

	#[test]
	fn load_reports_path_on_io_error() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("missing.toml");
		match BluejayConfig::load(&missing) {
			Err(ConfigError::Io { path, .. }) => assert_eq!(path, missing),
			other => panic!("expected I/O error, got {other:?}"),
		}

		let path = dir.path().join("bluejay.toml");
		let mut file = std::fs::File::create(&path).unwrap();
		writeln!(file, "snapshot_dir = \"/tmp/snaps\"").unwrap();
		let config = BluejayConfig::load(&path).unwrap();
		assert_eq!(config.scheduler_config().snapshot_dir, PathBuf::from("/tmp/snaps"));
	}
}
