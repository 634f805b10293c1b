use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Optional cap on how many checks may run at once.
///
/// An unlimited instance hands out permits immediately.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyLimit {
	semaphore: Option<Arc<Semaphore>>,
}

/// Permit held for the duration of one check. Released on drop.
#[derive(Debug)]
pub struct LimitPermit {
	_permit: Option<OwnedSemaphorePermit>,
}

impl ConcurrencyLimit {
	/// Creates a limit of `max` concurrent permits, or no limit for `None`.
	///
	/// A limit of zero is treated as one so that checks can still make progress.
	pub fn new(max: Option<usize>) -> Self {
		Self {
			semaphore: max.map(|max| Arc::new(Semaphore::new(max.max(1)))),
		}
	}

	#[cfg(test)]
	fn available(&self) -> Option<usize> {
		self.semaphore.as_ref().map(|s| s.available_permits())
	}

	/// Waits for a permit.
	pub async fn acquire(&self) -> LimitPermit {
		let permit = match &self.semaphore {
			// The semaphore is never closed, so acquisition only fails if that changes.
			Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
			None => None,
		};
		LimitPermit { _permit: permit }
	}
}
