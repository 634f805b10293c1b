//! Statement verifier boundary and the two-phase checking adapter.
//!
//! Each statement is first checked in fast mode (sound but incomplete). If
//! that run exhausts the search without finding an error state the statement
//! is valid and the exhaustive run is skipped; otherwise the verifier runs
//! again in exhaustive mode and that result decides the final status.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bluejay_worker::CheckToken;
use tracing::{debug, warn};

use crate::classify::{Classification, classify};
use crate::status::VerificationStatus;

/// Verifier speed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckMode {
	/// Sound but incomplete.
	Fast,
	/// Exhaustive search.
	Exhaustive,
}

impl CheckMode {
	/// Name used in logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Fast => "fast",
			Self::Exhaustive => "exhaustive",
		}
	}
}

/// Raw result of one verifier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierOutput {
	/// Standard output followed by standard error.
	pub output: String,
	/// Exit code, `None` if terminated by a signal.
	pub exit_code: Option<i32>,
}

impl VerifierOutput {
	/// Creates an output record.
	pub fn new(output: impl Into<String>, exit_code: Option<i32>) -> Self {
		Self {
			output: output.into(),
			exit_code,
		}
	}

	/// Classifies this output.
	pub fn classify(&self) -> Classification {
		classify(&self.output, self.exit_code)
	}
}

/// Reasons a verifier run produced no output.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
	/// The verifier process could not be started.
	#[error("failed to launch verifier {command}: {source}")]
	Launch {
		/// Command that failed to launch.
		command: String,
		/// The underlying I/O error.
		#[source]
		source: io::Error,
	},
	/// Waiting on the verifier process failed.
	#[error("verifier I/O error: {0}")]
	Io(#[from] io::Error),
	/// The check was cancelled.
	#[error("verification cancelled")]
	Cancelled,
	/// The verifier exceeded its time limit and was killed.
	#[error("verifier timed out after {0:?}")]
	TimedOut(Duration),
}

/// Checks one statement of a document.
#[async_trait]
pub trait StatementVerifier: Send + Sync {
	/// Runs the verifier on statement `index` of the file at `path`.
	///
	/// Implementations should stop early and return [`VerifierError::Cancelled`]
	/// once `token` is cancelled.
	async fn check(&self, path: &Path, index: usize, mode: CheckMode, token: &CheckToken) -> Result<VerifierOutput, VerifierError>;
}

/// Runs the fast phase, then the exhaustive phase when needed.
#[derive(Clone)]
pub struct TwoPhaseVerifier {
	verifier: Arc<dyn StatementVerifier>,
}

impl std::fmt::Debug for TwoPhaseVerifier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TwoPhaseVerifier").finish_non_exhaustive()
	}
}

impl TwoPhaseVerifier {
	/// Wraps a verifier.
	pub fn new(verifier: Arc<dyn StatementVerifier>) -> Self {
		Self { verifier }
	}

	/// Checks statement `index` and returns its final status.
	///
	/// Returns `None` if the check was cancelled. Failures are never
	/// propagated; they become a terminal status.
	pub async fn run(&self, path: &Path, index: usize, token: &CheckToken) -> Option<VerificationStatus> {
		let fast = match self.phase(path, index, CheckMode::Fast, token).await {
			Ok(class) => class,
			Err(interrupted) => return interrupted,
		};
		if fast == Classification::Exhausted {
			debug!(index, "fast check exhausted, skipping exhaustive check");
			return Some(VerificationStatus::Valid);
		}

		match self.phase(path, index, CheckMode::Exhaustive, token).await {
			Ok(class) => Some(class.final_status()),
			Err(interrupted) => interrupted,
		}
	}

	/// Runs one phase. `Err` carries the status to finish with instead,
	/// or `None` if cancelled.
	async fn phase(&self, path: &Path, index: usize, mode: CheckMode, token: &CheckToken) -> Result<Classification, Option<VerificationStatus>> {
		if token.is_cancelled() {
			return Err(None);
		}
		match self.verifier.check(path, index, mode, token).await {
			Ok(output) => {
				let class = output.classify();
				debug!(index, phase = mode.as_str(), class = ?class, exit_code = ?output.exit_code, "check phase finished");
				Ok(class)
			}
			Err(VerifierError::Cancelled) => Err(None),
			Err(VerifierError::TimedOut(after)) => {
				warn!(index, phase = mode.as_str(), ?after, "verifier timed out");
				Err(Some(VerificationStatus::Timeout))
			}
			Err(err) => {
				warn!(index, phase = mode.as_str(), error = %err, "verifier failed");
				Err(Some(VerificationStatus::Error))
			}
		}
	}
}
