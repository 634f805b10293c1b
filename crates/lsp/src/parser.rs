//! Statement parser boundary.

use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::statement::Statement;

/// Reasons a parse produced no statement list.
///
/// The scheduler treats every variant as an empty statement list.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
	/// The parser process could not be started.
	#[error("failed to launch parser {command}: {source}")]
	Launch {
		/// Command that failed to launch.
		command: String,
		/// The underlying I/O error.
		#[source]
		source: io::Error,
	},
	/// The parser exited unsuccessfully.
	#[error("parser exited with {code:?}: {stderr}")]
	Exit {
		/// Exit code, `None` if terminated by a signal.
		code: Option<i32>,
		/// Captured standard error.
		stderr: String,
	},
	/// The parser's output was not a statement list.
	#[error("parser output is not a statement list: {0}")]
	Decode(#[from] serde_json::Error),
}

/// Splits a document into its ordered top-level statements.
#[async_trait]
pub trait StatementParser: Send + Sync {
	/// Parses the document at `path`.
	async fn parse(&self, path: &Path) -> Result<Vec<Statement>, ParseError>;
}
