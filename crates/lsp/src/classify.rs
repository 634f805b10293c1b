//! Classification of verifier output.
//!
//! The verifier's output is an unstructured token stream. It is scanned for
//! known tokens in a fixed priority order; the first token present wins.
//! Matching is case-insensitive substring matching, except that an
//! occurrence lying inside a longer known token (`TIMEOUT` within
//! `UNKNOWN_DUE_TO_SOLVER_TIMEOUT`) only counts as the longer token.

use crate::status::VerificationStatus;

/// Outcome of one verifier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
	/// An abort state is reachable.
	FoundAbort,
	/// A type mismatch was found.
	TypeMismatch,
	/// A variable is used without being bound.
	UnboundVariable,
	/// The verifier ran out of time.
	Timeout,
	/// Search finished over a pruned tree.
	ExhaustedPrunedTree,
	/// Search finished without finding an error state.
	Exhausted,
	/// The underlying solver timed out, so the result is unknown.
	UnknownDueToSolverTimeout,
	/// Non-zero exit with no recognized token.
	Error,
	/// Zero exit with no recognized token.
	Unfinished,
}

/// Tokens in priority order. `EXHAUSTED_PRUNED_TREE` must precede `EXHAUSTED`.
const TOKENS: [(&str, Classification); 7] = [
	("FOUND_ABORT", Classification::FoundAbort),
	("TYPE_MISMATCH", Classification::TypeMismatch),
	("UNBOUND_VARIABLE", Classification::UnboundVariable),
	("TIMEOUT", Classification::Timeout),
	("EXHAUSTED_PRUNED_TREE", Classification::ExhaustedPrunedTree),
	("EXHAUSTED", Classification::Exhausted),
	("UNKNOWN_DUE_TO_SOLVER_TIMEOUT", Classification::UnknownDueToSolverTimeout),
];

/// Classifies combined verifier output.
///
/// `exit_code` is `None` when the process was terminated by a signal, which
/// counts as a non-zero exit.
pub fn classify(output: &str, exit_code: Option<i32>) -> Classification {
	let upper = output.to_ascii_uppercase();
	if let Some(&(_, class)) = TOKENS.iter().find(|(token, _)| contains_token(&upper, token)) {
		return class;
	}
	if exit_code == Some(0) { Classification::Unfinished } else { Classification::Error }
}

fn contains_token(haystack: &str, token: &str) -> bool {
	haystack.match_indices(token).any(|(at, _)| !inside_longer_token(haystack, at, token))
}

fn inside_longer_token(haystack: &str, at: usize, token: &str) -> bool {
	TOKENS.iter().any(|(longer, _)| {
		longer.len() > token.len()
			&& longer.find(token).is_some_and(|k| {
				at.checked_sub(k)
					.and_then(|start| haystack.get(start..))
					.is_some_and(|rest| rest.starts_with(longer))
			})
	})
}

impl Classification {
	/// Final statement status for an exhaustive-mode classification.
	pub const fn final_status(self) -> VerificationStatus {
		match self {
			Self::Exhausted => VerificationStatus::Valid,
			Self::ExhaustedPrunedTree => VerificationStatus::Pruned,
			Self::Unfinished => VerificationStatus::Pending,
			Self::FoundAbort | Self::TypeMismatch | Self::UnboundVariable => VerificationStatus::Invalid,
			Self::Timeout => VerificationStatus::Timeout,
			Self::UnknownDueToSolverTimeout | Self::Error => VerificationStatus::Error,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn priority_is_fixed() {
		assert_eq!(classify("TIMEOUT then FOUND_ABORT", Some(0)), Classification::FoundAbort);
		assert_eq!(classify("EXHAUSTED_PRUNED_TREE", Some(0)), Classification::ExhaustedPrunedTree);
	}

	#[test]
	fn nested_tokens_count_as_the_longer_token() {
		assert_eq!(classify("UNKNOWN_DUE_TO_SOLVER_TIMEOUT", Some(0)), Classification::UnknownDueToSolverTimeout);
		assert_eq!(classify("unknown_due_to_solver_timeout; TIMEOUT", Some(0)), Classification::Timeout);
		assert_eq!(classify("unknown_due_to_solver_timeout EXHAUSTED", Some(0)), Classification::Exhausted);
	}

	#[test]
	fn matching_is_case_insensitive() {
		assert_eq!(classify("result: exhausted\n", Some(0)), Classification::Exhausted);
		assert_eq!(classify("Type_Mismatch at 3:4", Some(1)), Classification::TypeMismatch);
	}

	#[test]
	fn unrecognized_output_depends_on_exit_code() {
		assert_eq!(classify("segfault", Some(139)), Classification::Error);
		assert_eq!(classify("", None), Classification::Error);
		assert_eq!(classify("still thinking", Some(0)), Classification::Unfinished);
	}

	#[test]
	fn final_status_table() {
		assert_eq!(Classification::Exhausted.final_status(), VerificationStatus::Valid);
		assert_eq!(Classification::ExhaustedPrunedTree.final_status(), VerificationStatus::Pruned);
		assert_eq!(Classification::Unfinished.final_status(), VerificationStatus::Pending);
		assert_eq!(Classification::UnboundVariable.final_status(), VerificationStatus::Invalid);
		assert_eq!(Classification::Timeout.final_status(), VerificationStatus::Timeout);
		assert_eq!(Classification::UnknownDueToSolverTimeout.final_status(), VerificationStatus::Error);
		assert_eq!(Classification::Error.final_status(), VerificationStatus::Error);
	}
}
