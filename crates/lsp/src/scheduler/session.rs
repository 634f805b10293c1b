//! Per-document verification state.

use bluejay_worker::{CheckToken, ConcurrencyLimit};
use lsp_types::Uri;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::diagnostics::{DiagnosticsSender, DiagnosticsSnapshot, project};
use crate::statement::{Statements, no_statements};
use crate::status::{StatusStore, VerificationStatus};
use crate::tasks::TaskRegistry;

/// State of one open document.
///
/// The status store and task registry live under a single lock so that every
/// transition (reset, launch, completion) is atomic with respect to the others.
/// The lock is never held across an `.await`.
pub(crate) struct DocumentSession {
	pub(super) uri: Uri,
	/// Serializes edits, held across the reparse.
	pub(super) edits: tokio::sync::Mutex<()>,
	pub(super) state: Mutex<SessionState>,
	pub(super) limit: ConcurrencyLimit,
	idle: Notify,
	events: DiagnosticsSender,
}

pub(crate) struct SessionState {
	/// Last applied text, `None` until the first edit is applied.
	pub(super) text: Option<String>,
	pub(super) statements: Statements,
	pub(super) store: StatusStore,
	pub(super) tasks: TaskRegistry,
	/// Edits accepted but not yet fully applied.
	pub(super) applying: usize,
	pub(super) closed: bool,
	sequence: u64,
}

impl DocumentSession {
	pub(super) fn new(uri: Uri, limit: ConcurrencyLimit, events: DiagnosticsSender) -> Self {
		Self {
			uri,
			edits: tokio::sync::Mutex::new(()),
			state: Mutex::new(SessionState {
				text: None,
				statements: no_statements(),
				store: StatusStore::new(),
				tasks: TaskRegistry::new(),
				applying: 0,
				closed: false,
				sequence: 0,
			}),
			limit,
			idle: Notify::new(),
			events,
		}
	}

	/// Sends a snapshot computed over the whole store.
	///
	/// Called with the state lock held so that channel order matches state order.
	pub(super) fn publish(&self, state: &mut SessionState) {
		state.sequence += 1;
		let snapshot = DiagnosticsSnapshot {
			uri: self.uri.clone(),
			sequence: state.sequence,
			diagnostics: project(&state.store, &state.statements),
		};
		// A dropped receiver only means nobody is listening.
		let _ = self.events.send(snapshot);
	}

	/// Wakes `settled` waiters if nothing is in flight.
	pub(super) fn notify_if_idle(&self, state: &SessionState) {
		if is_idle(state) {
			self.idle.notify_waiters();
		}
	}

	/// Records the outcome of a check launched with `token`.
	///
	/// A result from a superseded or cancelled launch is dropped: only the
	/// registered generation may write the statement's status.
	pub(super) fn finish(&self, index: usize, token: &CheckToken, status: Option<VerificationStatus>) {
		let mut state = self.state.lock();
		if !state.tasks.complete(index, token.generation()) {
			debug!(uri = self.uri.as_str(), index, generation = token.generation(), "dropping superseded check result");
			return;
		}
		if let Some(status) = status {
			state.store.set(index, status);
			debug!(uri = self.uri.as_str(), index, status = status.as_str(), "statement checked");
		}
		self.publish(&mut state);
		self.notify_if_idle(&state);
	}

	/// Cancels everything, clears all state and publishes an empty snapshot.
	pub(super) fn shutdown(&self) {
		let mut state = self.state.lock();
		let cancelled = state.tasks.cancel_all();
		state.store.clear();
		state.statements = no_statements();
		state.text = None;
		state.closed = true;
		debug!(uri = self.uri.as_str(), cancelled, "document session closed");
		self.publish(&mut state);
		self.idle.notify_waiters();
	}

	/// Resolves once no check is in flight and no edit is being applied.
	pub(super) async fn settled(&self) {
		loop {
			let notified = self.idle.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();
			{
				let state = self.state.lock();
				if state.closed || is_idle(&state) {
					return;
				}
			}
			notified.await;
		}
	}
}

fn is_idle(state: &SessionState) -> bool {
	state.applying == 0 && state.tasks.is_empty()
}
