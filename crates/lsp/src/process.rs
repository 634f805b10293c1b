//! Parser and verifier backed by external executables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bluejay_worker::CheckToken;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::config::{BluejayConfig, ParserConfig, VerifierConfig};
use crate::parser::{ParseError, StatementParser};
use crate::statement::Statement;
use crate::verifier::{CheckMode, StatementVerifier, VerifierError, VerifierOutput};

fn command(program: &str, args: &[String], env: &HashMap<String, String>, cwd: Option<&Path>) -> Command {
	let mut cmd = Command::new(program);
	cmd.args(args)
		.envs(env)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);
	if let Some(cwd) = cwd {
		cmd.current_dir(cwd);
	}
	cmd
}

/// Runs the parser executable and decodes its JSON statement list.
#[derive(Debug, Clone)]
pub struct ProcessParser {
	config: ParserConfig,
	cwd: Option<PathBuf>,
}

impl ProcessParser {
	/// Creates a parser from its configuration, run in `cwd` if given.
	pub fn new(config: ParserConfig, cwd: Option<PathBuf>) -> Self {
		Self { config, cwd }
	}

	/// Creates a parser from the top-level configuration.
	pub fn from_config(config: &BluejayConfig) -> Self {
		Self::new(config.parser.clone(), config.workspace_root.clone())
	}
}

#[async_trait]
impl StatementParser for ProcessParser {
	async fn parse(&self, path: &Path) -> Result<Vec<Statement>, ParseError> {
		let mut cmd = command(&self.config.command, &self.config.args, &self.config.env, self.cwd.as_deref());
		cmd.arg(path);
		trace!(command = %self.config.command, path = %path.display(), "parser.spawn");

		let output = cmd.output().await.map_err(|source| ParseError::Launch {
			command: self.config.command.clone(),
			source,
		})?;
		if !output.status.success() {
			return Err(ParseError::Exit {
				code: output.status.code(),
				stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
			});
		}

		let statements: Vec<Statement> = serde_json::from_slice(&output.stdout)?;
		debug!(path = %path.display(), count = statements.len(), "parsed statements");
		Ok(statements)
	}
}

/// Runs the verifier executable once per phase.
///
/// Invocation: `<command> <args..> <path> <check_index_flag> <index> [fast_flag]`.
#[derive(Debug, Clone)]
pub struct ProcessVerifier {
	config: VerifierConfig,
	cwd: Option<PathBuf>,
}

impl ProcessVerifier {
	/// Creates a verifier from its configuration, run in `cwd` if given.
	pub fn new(config: VerifierConfig, cwd: Option<PathBuf>) -> Self {
		Self { config, cwd }
	}

	/// Creates a verifier from the top-level configuration.
	pub fn from_config(config: &BluejayConfig) -> Self {
		Self::new(config.verifier.clone(), config.workspace_root.clone())
	}

	fn timeout(&self) -> Option<Duration> {
		self.config.timeout()
	}
}

#[async_trait]
impl StatementVerifier for ProcessVerifier {
	async fn check(&self, path: &Path, index: usize, mode: CheckMode, token: &CheckToken) -> Result<VerifierOutput, VerifierError> {
		let mut cmd = command(&self.config.command, &self.config.args, &self.config.env, self.cwd.as_deref());
		cmd.arg(path).arg(&self.config.check_index_flag).arg(index.to_string());
		if mode == CheckMode::Fast {
			cmd.arg(&self.config.fast_flag);
		}

		let child = cmd.spawn().map_err(|source| VerifierError::Launch {
			command: self.config.command.clone(),
			source,
		})?;
		trace!(index, phase = mode.as_str(), generation = token.generation(), pid = ?child.id(), "verifier.spawn");

		// Dropping the wait future drops the child, and `kill_on_drop` terminates it.
		let wait = child.wait_with_output();
		let output = match self.timeout() {
			Some(limit) => token
				.run_until_cancelled(tokio::time::timeout(limit, wait))
				.await
				.ok_or(VerifierError::Cancelled)?
				.map_err(|_| VerifierError::TimedOut(limit))??,
			None => token.run_until_cancelled(wait).await.ok_or(VerifierError::Cancelled)??,
		};

		let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
		text.push_str(&String::from_utf8_lossy(&output.stderr));
		Ok(VerifierOutput::new(text, output.status.code()))
	}
}
