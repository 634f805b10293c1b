//! Per-document registry of in-flight statement checks.
//!
//! At most one live handle exists per statement index. Registering a new
//! handle for an index cancels the one it replaces.

use std::collections::BTreeMap;

use bluejay_worker::CheckToken;

/// Map from statement index to the handle of its in-flight check.
#[derive(Debug, Default)]
pub struct TaskRegistry {
	handles: BTreeMap<usize, CheckToken>,
}

impl TaskRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `token` for `index`, cancelling any handle it replaces.
	pub fn insert(&mut self, index: usize, token: CheckToken) {
		if let Some(previous) = self.handles.insert(index, token) {
			previous.cancel();
		}
	}

	/// Cancels and removes every handle at or after `from`.
	///
	/// Returns the number of handles removed. Safe to call with nothing registered.
	pub fn cancel_from(&mut self, from: usize) -> usize {
		let cancelled = self.handles.split_off(&from);
		for token in cancelled.values() {
			token.cancel();
		}
		cancelled.len()
	}

	/// Cancels and removes every handle.
	pub fn cancel_all(&mut self) -> usize {
		self.cancel_from(0)
	}

	/// Returns true if `generation` is the live handle for `index`.
	pub fn is_current(&self, index: usize, generation: u64) -> bool {
		self.handles.get(&index).is_some_and(|t| t.generation() == generation)
	}

	/// Removes the handle for `index` if it belongs to `generation`.
	///
	/// Returns false when the handle was already superseded or cancelled.
	pub fn complete(&mut self, index: usize, generation: u64) -> bool {
		if !self.is_current(index, generation) {
			return false;
		}
		self.handles.remove(&index);
		true
	}

	/// Indices with a live handle, in order.
	pub fn indices(&self) -> Vec<usize> {
		self.handles.keys().copied().collect()
	}

	/// Number of live handles.
	pub fn len(&self) -> usize {
		self.handles.len()
	}

	/// Returns true if nothing is in flight.
	pub fn is_empty(&self) -> bool {
		self.handles.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cancel_from_only_touches_later_indices() {
		let mut registry = TaskRegistry::new();
		let tokens: Vec<_> = (0..3).map(|i| CheckToken::new(i + 1)).collect();
		for (i, token) in tokens.iter().enumerate() {
			registry.insert(i, token.clone());
		}

		assert_eq!(registry.cancel_from(1), 2);
		assert!(!tokens[0].is_cancelled());
		assert!(tokens[1].is_cancelled());
		assert!(tokens[2].is_cancelled());
		assert_eq!(registry.indices(), vec![0]);
	}

	#[test]
	fn cancel_is_idempotent_and_safe_when_empty() {
		let mut registry = TaskRegistry::new();
		assert_eq!(registry.cancel_from(0), 0);
		assert_eq!(registry.cancel_all(), 0);
		assert!(registry.is_empty());
	}

	#[test]
	fn insert_replaces_and_cancels_previous() {
		let mut registry = TaskRegistry::new();
		let old = CheckToken::new(1);
		let new = CheckToken::new(2);
		registry.insert(0, old.clone());
		registry.insert(0, new.clone());

		assert!(old.is_cancelled());
		assert!(!new.is_cancelled());
		assert_eq!(registry.len(), 1);
		assert!(registry.is_current(0, 2));
	}

	#[test]
	fn complete_rejects_stale_generation() {
		let mut registry = TaskRegistry::new();
		registry.insert(0, CheckToken::new(1));
		registry.insert(0, CheckToken::new(2));

		assert!(!registry.complete(0, 1));
		assert!(registry.complete(0, 2));
		assert!(registry.is_empty());
		assert!(!registry.complete(0, 2));
	}
}
