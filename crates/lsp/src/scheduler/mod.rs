//! Incremental verification scheduler.
//!
//! On every edit the document is reparsed, the first affected statement `m`
//! is located, and then, atomically under the session lock:
//! 1. every in-flight check for an index `>= m` is cancelled,
//! 2. every status record for an index `>= m` is reset to pending,
//! 3. a diagnostic snapshot is published.
//!
//! Afterwards one independent check task is launched per statement `>= m`.
//! Each task marks its statement running, runs the two-phase check, records
//! the result and republishes a snapshot computed over the whole store, so
//! results for statements before `m` stay visible throughout.
//!
//! Checks are generation-stamped. A check whose registry entry was cancelled
//! or replaced by a newer launch can still finish, but its result is dropped.

mod session;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bluejay_worker::{CheckToken, ConcurrencyLimit, GenerationClock, TaskClass};
use lsp_types::{Diagnostic, Uri};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use self::session::DocumentSession;
use crate::diagnostics::{DiagnosticsReceiver, DiagnosticsSender, project};
use crate::locate::{AffectedScope, ContentChange, DocumentEdit, affected_scope, locate_affected};
use crate::parser::StatementParser;
use crate::snapshot::SnapshotStore;
use crate::statement::{Statements, no_statements};
use crate::status::{StatusRecord, VerificationStatus};
use crate::verifier::{StatementVerifier, TwoPhaseVerifier};
use crate::{Error, Result};

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
	/// Directory for in-memory document snapshots.
	pub snapshot_dir: PathBuf,
	/// Upper bound on concurrently running checks per document. Unbounded if `None`.
	pub max_concurrent_checks: Option<usize>,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			snapshot_dir: std::env::temp_dir().join("bluejay-lsp"),
			max_concurrent_checks: None,
		}
	}
}

/// Orchestrates verification for all open documents.
///
/// Documents are fully independent: each has its own status store, task
/// registry and lock.
pub struct VerificationScheduler {
	parser: Arc<dyn StatementParser>,
	checker: TwoPhaseVerifier,
	snapshots: SnapshotStore,
	sessions: RwLock<HashMap<String, Arc<DocumentSession>>>,
	clock: GenerationClock,
	max_concurrent_checks: Option<usize>,
	events: DiagnosticsSender,
}

impl std::fmt::Debug for VerificationScheduler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VerificationScheduler")
			.field("snapshot_dir", &self.snapshots.dir())
			.field("documents", &self.sessions.read().len())
			.field("max_concurrent_checks", &self.max_concurrent_checks)
			.finish()
	}
}

/// Decrements the in-progress edit count when an apply finishes or is dropped.
struct ApplyGuard<'a>(&'a DocumentSession);

impl<'a> ApplyGuard<'a> {
	fn enter(session: &'a DocumentSession) -> Self {
		session.state.lock().applying += 1;
		Self(session)
	}
}

impl Drop for ApplyGuard<'_> {
	fn drop(&mut self) {
		let mut state = self.0.state.lock();
		state.applying = state.applying.saturating_sub(1);
		self.0.notify_if_idle(&state);
	}
}

impl VerificationScheduler {
	/// Creates a scheduler and the receiver its diagnostic snapshots are sent to.
	pub fn new(
		parser: Arc<dyn StatementParser>,
		verifier: Arc<dyn StatementVerifier>,
		config: SchedulerConfig,
	) -> (Self, DiagnosticsReceiver) {
		let (events, receiver) = mpsc::unbounded_channel();
		let scheduler = Self {
			parser,
			checker: TwoPhaseVerifier::new(verifier),
			snapshots: SnapshotStore::new(config.snapshot_dir),
			sessions: RwLock::new(HashMap::new()),
			clock: GenerationClock::new(),
			max_concurrent_checks: config.max_concurrent_checks,
			events,
		};
		(scheduler, receiver)
	}

	/// Opens a document and checks every statement.
	///
	/// Opening an already open document discards its previous session.
	pub async fn open(&self, uri: Uri, text: impl Into<String>) -> Result<()> {
		let session = Arc::new(DocumentSession::new(
			uri.clone(),
			ConcurrencyLimit::new(self.max_concurrent_checks),
			self.events.clone(),
		));
		let previous = self.sessions.write().insert(uri.as_str().to_owned(), Arc::clone(&session));
		if let Some(previous) = previous {
			debug!(uri = uri.as_str(), "document reopened, discarding previous session");
			previous.shutdown();
		}
		info!(uri = uri.as_str(), "document opened");
		self.apply(&session, text.into(), ContentChange::Full).await
	}

	/// Applies an edit and rechecks the statements it may have affected.
	pub async fn edit(&self, uri: &Uri, edit: DocumentEdit) -> Result<()> {
		let session = self.session(uri)?;
		self.apply(&session, edit.text, edit.change).await
	}

	/// Handles a save: a fresh full recheck of the saved text.
	pub async fn save(&self, uri: &Uri, text: impl Into<String>) -> Result<()> {
		let session = self.session(uri)?;
		self.apply(&session, text.into(), ContentChange::Full).await
	}

	/// Closes a document: cancels all its checks, clears its state and
	/// publishes an empty snapshot.
	///
	/// Returns false if the document was not open.
	pub async fn close(&self, uri: &Uri) -> bool {
		let Some(session) = self.sessions.write().remove(uri.as_str()) else {
			return false;
		};
		session.shutdown();
		info!(uri = uri.as_str(), "document closed");

		// Wait out an edit still writing the snapshot before removing it.
		let _edits = session.edits.lock().await;
		self.snapshots.remove(uri.as_str()).await;
		true
	}

	/// Returns true if the document is open.
	pub fn is_open(&self, uri: &Uri) -> bool {
		self.sessions.read().contains_key(uri.as_str())
	}

	/// Current diagnostics of a document.
	pub fn diagnostics(&self, uri: &Uri) -> Option<Vec<Diagnostic>> {
		let session = self.session(uri).ok()?;
		let state = session.state.lock();
		Some(project(&state.store, &state.statements))
	}

	/// Current status records of a document, in index order.
	pub fn records(&self, uri: &Uri) -> Option<Vec<StatusRecord>> {
		let session = self.session(uri).ok()?;
		let records = session.state.lock().store.records();
		Some(records)
	}

	/// Statements of the latest parse of a document.
	pub fn statements(&self, uri: &Uri) -> Option<Statements> {
		let session = self.session(uri).ok()?;
		let statements = Arc::clone(&session.state.lock().statements);
		Some(statements)
	}

	/// Statement indices with a check in flight.
	pub fn in_flight(&self, uri: &Uri) -> Option<Vec<usize>> {
		let session = self.session(uri).ok()?;
		let indices = session.state.lock().tasks.indices();
		Some(indices)
	}

	/// Resolves once the document has no check in flight and no edit being
	/// applied, or immediately if it is not open.
	pub async fn settled(&self, uri: &Uri) {
		if let Ok(session) = self.session(uri) {
			session.settled().await;
		}
	}

	fn session(&self, uri: &Uri) -> Result<Arc<DocumentSession>> {
		self.sessions
			.read()
			.get(uri.as_str())
			.cloned()
			.ok_or_else(|| Error::UnknownDocument(uri.as_str().to_owned()))
	}

	async fn apply(&self, session: &Arc<DocumentSession>, text: String, change: ContentChange) -> Result<()> {
		let _applying = ApplyGuard::enter(session);
		let _edits = session.edits.lock().await;
		let uri = session.uri.as_str();

		let path = self.snapshots.write(uri, &text).await?;
		let statements: Statements = match self.parser.parse(&path).await {
			Ok(statements) => statements.into(),
			Err(err) => {
				warn!(uri, error = %err, "parse failed, treating document as empty");
				no_statements()
			}
		};

		let launches = {
			let mut state = session.state.lock();
			if state.closed {
				return Ok(());
			}
			let scope = affected_scope(&change, state.text.as_deref(), &text);
			state.text = Some(text);
			state.statements = Arc::clone(&statements);

			let from = match scope {
				AffectedScope::Unchanged => {
					debug!(uri, "text unchanged, republishing");
					session.publish(&mut state);
					return Ok(());
				}
				AffectedScope::All => 0,
				AffectedScope::From(region) => {
					let from = locate_affected(&region, &statements).unwrap_or(0);
					debug!(uri, line = region.line, column = region.column, edit_end = ?change.post_edit_end(), from, "located edit");
					from
				}
			};

			let cancelled = state.tasks.cancel_from(from);
			if scope == AffectedScope::All {
				state.store.clear();
			}
			state.store.reset_from(from, statements.iter().map(|s| s.index));
			debug!(uri, from, cancelled, statements = statements.len(), "invalidated statements");
			session.publish(&mut state);

			statements.iter().map(|s| s.index).filter(|&index| index >= from).collect::<Vec<_>>()
		};

		for index in launches {
			self.launch(session, &path, index);
		}
		Ok(())
	}

	/// Registers, marks running and spawns the check for one statement.
	fn launch(&self, session: &Arc<DocumentSession>, path: &Path, index: usize) {
		let token = CheckToken::new(self.clock.next());
		{
			let mut state = session.state.lock();
			if state.closed {
				return;
			}
			state.tasks.insert(index, token.clone());
			state.store.set(index, VerificationStatus::Running);
			session.publish(&mut state);
		}
		debug!(uri = session.uri.as_str(), index, generation = token.generation(), "launching check");

		let session = Arc::clone(session);
		let checker = self.checker.clone();
		let path = path.to_path_buf();
		bluejay_worker::spawn(TaskClass::Check, async move {
			let status = match token.run_until_cancelled(session.limit.acquire()).await {
				Some(_permit) => token.run_until_cancelled(checker.run(&path, index, &token)).await.flatten(),
				None => None,
			};
			session.finish(index, &token, status);
		});
	}
}
