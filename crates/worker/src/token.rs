use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic generation clock for statement check tasks.
///
/// Clones share the same counter.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	next: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a new generation clock starting at generation 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next generation ID.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Cancellation handle for one in-flight statement check.
///
/// The generation identifies which launch the handle belongs to; a completion
/// carrying an older generation than the registered one is stale.
#[derive(Debug, Clone)]
pub struct CheckToken {
	generation: u64,
	cancel: CancellationToken,
}

impl CheckToken {
	/// Creates a fresh, uncancelled token for the given generation.
	pub fn new(generation: u64) -> Self {
		Self {
			generation,
			cancel: CancellationToken::new(),
		}
	}

	/// Returns generation ID.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation. Idempotent.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Drives `fut` until it finishes or the token is cancelled.
	///
	/// Returns `None` on cancellation; `fut` is dropped at that point, which is
	/// how child processes spawned with `kill_on_drop` get terminated.
	pub async fn run_until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
		tokio::select! {
			biased;
			() = self.cancel.cancelled() => None,
			out = fut => Some(out),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn clock_is_monotonic_across_clones() {
		let clock = GenerationClock::new();
		let other = clock.clone();
		assert_eq!(clock.next(), 1);
		assert_eq!(other.next(), 2);
		assert_eq!(clock.next(), 3);
	}

	#[tokio::test]
	async fn run_until_cancelled_returns_output() {
		let token = CheckToken::new(1);
		assert_eq!(token.run_until_cancelled(async { 7 }).await, Some(7));
	}

	#[tokio::test]
	async fn run_until_cancelled_stops_on_cancel() {
		let token = CheckToken::new(4);
		let remote = token.clone();
		let task = tokio::spawn(async move { token.run_until_cancelled(tokio::time::sleep(Duration::from_secs(60))).await });
		remote.cancel();
		assert_eq!(task.await.unwrap(), None);
		assert!(remote.is_cancelled());
		assert_eq!(remote.generation(), 4);
	}
}
