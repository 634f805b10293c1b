//! Incremental per-statement verification for live documents.
//!
//! A document is split into top-level statements by an external parser, and
//! each statement is checked by an external verifier process. When the
//! document is edited, only the statements at or after the earliest one the
//! edit could have affected are cancelled and rechecked; results for earlier
//! statements are kept.
//!
//! The pieces, leaves first:
//! - [`statement`]: parsed statements and position arithmetic.
//! - [`locate`]: maps an edit to the first affected statement.
//! - [`status`]: per-document verification status records.
//! - [`tasks`]: per-document registry of in-flight checks.
//! - [`classify`] / [`verifier`]: two-phase checking and output classification.
//! - [`scheduler`]: the orchestrator tying it all together.
//! - [`diagnostics`]: projection of status records into LSP diagnostics.
//!
//! The parser and verifier are reached through the [`StatementParser`] and
//! [`StatementVerifier`] traits; [`process`] provides the implementations
//! backed by external executables.
#![warn(missing_docs)]

use std::io;
use std::path::PathBuf;

/// Re-export of the [`lsp_types`] dependency of this crate.
pub use lsp_types;

pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod locate;
pub mod parser;
pub mod process;
pub mod scheduler;
pub mod snapshot;
pub mod statement;
pub mod status;
pub mod tasks;
pub mod verifier;

pub use classify::{Classification, classify};
pub use config::{BluejayConfig, ConfigError};
pub use diagnostics::{DiagnosticsReceiver, DiagnosticsSender, DiagnosticsSnapshot, project};
pub use locate::{AffectedScope, ContentChange, DocumentEdit, EditRegion, locate_affected};
pub use parser::{ParseError, StatementParser};
pub use process::{ProcessParser, ProcessVerifier};
pub use scheduler::{SchedulerConfig, VerificationScheduler};
pub use statement::{Statement, Statements, TextPosition};
pub use status::{StatusRecord, StatusStore, VerificationStatus};
pub use tasks::TaskRegistry;
pub use verifier::{CheckMode, StatementVerifier, TwoPhaseVerifier, VerifierError, VerifierOutput};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The document has not been opened, or was already closed.
	#[error("document is not open: {0}")]
	UnknownDocument(String),
	/// The in-memory snapshot of a document could not be written.
	#[error("failed to write document snapshot {path}: {source}")]
	Snapshot {
		/// Snapshot file path.
		path: PathBuf,
		/// The underlying I/O error.
		#[source]
		source: io::Error,
	},
}
