//! Worker primitives shared by the statement verification pipeline.
//!
//! Every per-statement check runs as its own Tokio task. This crate provides
//! the pieces those tasks are built from:
//! - [`spawn`]: task spawning tagged with a [`TaskClass`] for tracing.
//! - [`GenerationClock`] / [`CheckToken`]: generation-stamped cancellation
//!   handles, so a superseded task can be told apart from its replacement.
//! - [`ConcurrencyLimit`]: an optional cap on simultaneously running checks.

mod class;
mod limiter;
mod spawn;
mod token;

pub use class::TaskClass;
pub use limiter::{ConcurrencyLimit, LimitPermit};
pub use spawn::spawn;
pub use token::{CheckToken, GenerationClock};
