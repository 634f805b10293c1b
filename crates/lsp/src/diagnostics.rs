//! Projection of verification state into LSP diagnostics.

use lsp_types::{Diagnostic, DiagnosticSeverity, Uri};
use tokio::sync::mpsc;

use crate::statement::Statement;
use crate::status::{StatusStore, VerificationStatus};

/// `source` field of every produced diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "bluejay";

/// Complete diagnostic view of one document. Replaces any earlier snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsSnapshot {
	/// Document the diagnostics belong to.
	pub uri: Uri,
	/// Strictly increasing per document session.
	pub sequence: u64,
	/// All currently visible diagnostics.
	pub diagnostics: Vec<Diagnostic>,
}

/// Sender for diagnostic snapshots.
pub type DiagnosticsSender = mpsc::UnboundedSender<DiagnosticsSnapshot>;

/// Receiver for diagnostic snapshots.
pub type DiagnosticsReceiver = mpsc::UnboundedReceiver<DiagnosticsSnapshot>;

/// Severity shown for a status. `None` means the status is not shown.
///
/// Pending and running statements are hidden so that typing does not make
/// markers flicker.
pub const fn severity_for(status: VerificationStatus) -> Option<DiagnosticSeverity> {
	match status {
		VerificationStatus::Pending | VerificationStatus::Running => None,
		VerificationStatus::Valid => Some(DiagnosticSeverity::INFORMATION),
		VerificationStatus::Invalid | VerificationStatus::Error => Some(DiagnosticSeverity::ERROR),
		VerificationStatus::Timeout | VerificationStatus::Pruned => Some(DiagnosticSeverity::WARNING),
	}
}

/// Builds the diagnostic list for the current statements from the whole store.
///
/// Statements without a record, and records without a statement, produce nothing.
pub fn project(store: &StatusStore, statements: &[Statement]) -> Vec<Diagnostic> {
	statements
		.iter()
		.filter_map(|statement| {
			let record = store.get(statement.index)?;
			let severity = severity_for(record.status)?;
			Some(Diagnostic {
				range: statement.lsp_range(),
				severity: Some(severity),
				source: Some(DIAGNOSTIC_SOURCE.into()),
				message: format!("statement {}: {}", statement.index, record.status),
				..Diagnostic::default()
			})
		})
		.collect()
}
