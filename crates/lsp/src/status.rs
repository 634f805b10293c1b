//! Per-document verification status records.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

/// Verification state of one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationStatus {
	/// Scheduled but not started, or reset by an edit.
	Pending,
	/// A check is in flight.
	Running,
	/// The statement was proven correct.
	Valid,
	/// The verifier found an error state.
	Invalid,
	/// The verifier failed or produced unrecognized output.
	Error,
	/// The verifier gave up on time.
	Timeout,
	/// The exhaustive search completed over a pruned tree.
	Pruned,
}

impl VerificationStatus {
	/// Lowercase name used in logs and diagnostic messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Running => "running",
			Self::Valid => "valid",
			Self::Invalid => "invalid",
			Self::Error => "error",
			Self::Timeout => "timeout",
			Self::Pruned => "pruned",
		}
	}
}

impl fmt::Display for VerificationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Status of one statement at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRecord {
	/// Statement index within the current parse.
	pub statement_index: usize,
	/// Current status.
	pub status: VerificationStatus,
	/// When the status last changed.
	pub last_updated: Instant,
}

/// Map from statement index to status record for one document.
///
/// Records are never removed one by one; the store is only cleared as a whole.
#[derive(Debug, Default)]
pub struct StatusStore {
	records: BTreeMap<usize, StatusRecord>,
}

impl StatusStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the record for `index`, if any.
	pub fn get(&self, index: usize) -> Option<&StatusRecord> {
		self.records.get(&index)
	}

	/// Sets the status for `index` with a fresh timestamp.
	pub fn set(&mut self, index: usize, status: VerificationStatus) -> StatusRecord {
		let record = StatusRecord {
			statement_index: index,
			status,
			last_updated: Instant::now(),
		};
		self.records.insert(index, record);
		record
	}

	/// Resets every record at or after `from` to pending, and creates pending
	/// records for any of `indices` at or after `from` that have none yet.
	///
	/// Records before `from` are left untouched.
	pub fn reset_from(&mut self, from: usize, indices: impl IntoIterator<Item = usize>) {
		let now = Instant::now();
		for record in self.records.range_mut(from..).map(|(_, r)| r) {
			record.status = VerificationStatus::Pending;
			record.last_updated = now;
		}
		for index in indices.into_iter().filter(|&i| i >= from) {
			self.records.entry(index).or_insert(StatusRecord {
				statement_index: index,
				status: VerificationStatus::Pending,
				last_updated: now,
			});
		}
	}

	/// Removes all records.
	pub fn clear(&mut self) {
		self.records.clear();
	}

	/// Returns all records in index order.
	pub fn records(&self) -> Vec<StatusRecord> {
		self.records.values().copied().collect()
	}

	/// Number of records.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns true if there are no records.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}
