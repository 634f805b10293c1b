//! Mapping an edit to the earliest statement it could have invalidated.
//!
//! A statement's verdict depends only on its own text and the statements
//! before it, so an edit never invalidates anything before the matched
//! statement. The locator only needs a lower bound: the match is made against
//! the first position the edit touched, so a statement whose text was
//! shortened or extended by the edit is always included.

use lsp_types::TextDocumentContentChangeEvent;

use crate::statement::{Statement, TextPosition};

/// What changed in a document edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentChange {
	/// A pre-edit range was replaced by `text`.
	Range {
		/// Pre-edit start of the replaced range.
		start: TextPosition,
		/// Pre-edit end of the replaced range.
		end: TextPosition,
		/// Replacement text.
		text: String,
	},
	/// The whole document was replaced.
	Full,
	/// The caller supplied no range; it is derived from the previous text.
	Unknown,
}

impl ContentChange {
	/// Post-edit end of a range replacement.
	///
	/// Returns `None` for changes without a range.
	pub fn post_edit_end(&self) -> Option<TextPosition> {
		match self {
			Self::Range { start, text, .. } => Some(post_edit_end(*start, text)),
			Self::Full | Self::Unknown => None,
		}
	}
}

/// One edit event: the full post-edit text plus a description of the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEdit {
	/// Full document text after the edit.
	pub text: String,
	/// What changed.
	pub change: ContentChange,
}

impl DocumentEdit {
	/// An edit replacing `start..end` with `replacement`.
	pub fn range(text: impl Into<String>, start: TextPosition, end: TextPosition, replacement: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			change: ContentChange::Range {
				start,
				end,
				text: replacement.into(),
			},
		}
	}

	/// A whole-document replacement.
	pub fn full(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			change: ContentChange::Full,
		}
	}

	/// An edit with no range information.
	pub fn unknown(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			change: ContentChange::Unknown,
		}
	}

	/// Builds an edit from an LSP content change event.
	///
	/// `text` is the document text after the change has been applied. Text
	/// before the range start is unchanged by the edit, so the start converts
	/// exactly; the pre-edit end is converted against the same text and is
	/// approximate when the edit changed its line.
	pub fn from_lsp(text: impl Into<String>, event: &TextDocumentContentChangeEvent) -> Self {
		let text = text.into();
		match event.range {
			Some(range) => {
				let start = TextPosition::from_lsp(&text, range.start);
				let end = TextPosition::from_lsp(&text, range.end);
				Self::range(text, start, end, event.text.clone())
			}
			None => Self::full(text),
		}
	}
}

/// The first position an edit touched, in post-edit coordinates.
///
/// Text before this position is identical before and after the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditRegion {
	/// 1-based line.
	pub line: u32,
	/// 0-based column.
	pub column: u32,
}

impl EditRegion {
	/// Region of a range replacement starting at `start`.
	pub const fn for_range(start: TextPosition) -> Self {
		Self {
			line: start.line,
			column: start.column,
		}
	}

	/// Region derived by comparing the previous and current full text.
	///
	/// Starts at the first diverging char. Whatever follows the divergence is
	/// treated as changed, whether the edit inserted or deleted text.
	pub fn from_divergence(previous: &str, current: &str) -> Self {
		let divergence = previous.chars().zip(current.chars()).take_while(|(a, b)| a == b).count();
		let position = TextPosition::from_offset(current, divergence);
		Self {
			line: position.line,
			column: position.column,
		}
	}
}

/// How much of a document an edit invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffectedScope {
	/// Everything: a full replace, or the previous content is unknown.
	All,
	/// From the first statement matching the region onward.
	From(EditRegion),
	/// The text is identical to the previous text.
	Unchanged,
}

/// Determines the scope of an edit.
///
/// `previous` is the text before the edit, if known.
pub fn affected_scope(change: &ContentChange, previous: Option<&str>, current: &str) -> AffectedScope {
	match change {
		ContentChange::Full => AffectedScope::All,
		ContentChange::Range { start, .. } => AffectedScope::From(EditRegion::for_range(*start)),
		ContentChange::Unknown => match previous {
			None => AffectedScope::All,
			Some(previous) if previous == current => AffectedScope::Unchanged,
			Some(previous) => AffectedScope::From(EditRegion::from_divergence(previous, current)),
		},
	}
}

/// Returns the index of the first statement affected by `region`.
///
/// The first statement whose end lies at or after the region start wins. If
/// none does, the edit happened after everything and the last statement is
/// returned. Returns `None` only for an empty sequence.
pub fn locate_affected(region: &EditRegion, statements: &[Statement]) -> Option<usize> {
	let last = statements.last()?;
	let matched = statements
		.iter()
		.find(|s| s.end.line > region.line || (s.end.line == region.line && s.end.column >= region.column));
	Some(matched.unwrap_or(last).index)
}

fn post_edit_end(start: TextPosition, text: &str) -> TextPosition {
	let len = text.chars().count();
	let newlines = text.chars().filter(|&c| c == '\n').count();
	if newlines == 0 {
		return TextPosition::new(start.line, start.column.saturating_add(saturate(len)), start.offset + len);
	}
	let last_newline = text.chars().enumerate().filter(|&(_, c)| c == '\n').last().map_or(0, |(i, _)| i);
	TextPosition::new(
		start.line.saturating_add(saturate(newlines)),
		saturate(len - (last_newline + 1)),
		start.offset + len,
	)
}

fn saturate(n: usize) -> u32 {
	u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
	use lsp_types::{Position, Range};

	use super::*;

	fn stmt(index: usize, start: (u32, u32), end: (u32, u32)) -> Statement {
		Statement {
			index,
			kind: "let".into(),
			identifiers: Vec::new(),
			start: TextPosition::new(start.0, start.1, 0),
			end: TextPosition::new(end.0, end.1, 0),
		}
	}

	/// `let x = 1 let y = 2\nlet z = 3`
	fn sample() -> Vec<Statement> {
		vec![stmt(0, (1, 0), (1, 9)), stmt(1, (1, 10), (1, 19)), stmt(2, (2, 0), (2, 9))]
	}

	#[test]
	fn post_edit_end_single_line() {
		let change = ContentChange::Range {
			start: TextPosition::new(3, 4, 20),
			end: TextPosition::new(3, 4, 20),
			text: "abc".into(),
		};
		assert_eq!(change.post_edit_end(), Some(TextPosition::new(3, 7, 23)));
	}

	#[test]
	fn post_edit_end_multi_line() {
		let change = ContentChange::Range {
			start: TextPosition::new(3, 4, 20),
			end: TextPosition::new(3, 4, 20),
			text: "ab\ncd\nefg".into(),
		};
		assert_eq!(change.post_edit_end(), Some(TextPosition::new(5, 3, 29)));
		assert_eq!(ContentChange::Full.post_edit_end(), None);
	}

	#[test]
	fn full_edit_rechecks_everything() {
		assert_eq!(affected_scope(&ContentChange::Full, Some("a"), "b"), AffectedScope::All);
	}

	#[test]
	fn unknown_edit_without_previous_rechecks_everything() {
		assert_eq!(affected_scope(&ContentChange::Unknown, None, "b"), AffectedScope::All);
		assert_eq!(affected_scope(&ContentChange::Unknown, Some("b"), "b"), AffectedScope::Unchanged);
	}

	#[test]
	fn edit_inside_statement_matches_it() {
		let region = EditRegion::for_range(TextPosition::new(1, 16, 16));
		assert_eq!(region, EditRegion { line: 1, column: 16 });
		assert_eq!(locate_affected(&region, &sample()), Some(1));
	}

	#[test]
	fn edit_in_first_statement_matches_zero() {
		let region = EditRegion::for_range(TextPosition::new(1, 4, 4));
		assert_eq!(locate_affected(&region, &sample()), Some(0));
	}

	#[test]
	fn multi_line_replacement_matches_on_start_line() {
		let region = EditRegion::for_range(TextPosition::new(2, 2, 22));
		assert_eq!(locate_affected(&region, &sample()), Some(2));
	}

	#[test]
	fn edit_after_everything_matches_last() {
		let region = EditRegion { line: 9, column: 0 };
		assert_eq!(locate_affected(&region, &sample()), Some(2));
	}

	#[test]
	fn empty_sequence_has_no_affected_statement() {
		let region = EditRegion { line: 1, column: 0 };
		assert_eq!(locate_affected(&region, &[]), None);
	}

	#[test]
	fn divergence_region_starts_at_first_difference() {
		let previous = "let x = 1 let y = 2\nlet z = 3";
		let current = "let x = 1 let y = 200\nlet z = 3";
		let region = EditRegion::from_divergence(previous, current);

		assert_eq!(region, EditRegion { line: 1, column: 19 });
		// Statement 1 ends at column 21 after the edit.
		let statements = vec![stmt(0, (1, 0), (1, 9)), stmt(1, (1, 10), (1, 21)), stmt(2, (2, 0), (2, 9))];
		assert_eq!(locate_affected(&region, &statements), Some(1));
	}

	#[test]
	fn deletion_at_statement_end_matches_it() {
		let region = EditRegion::from_divergence("let x = 12\nlet y = 2", "let x = 1\nlet y = 2");
		assert_eq!(region, EditRegion { line: 1, column: 9 });

		let statements = vec![stmt(0, (1, 0), (1, 9)), stmt(1, (2, 0), (2, 9))];
		assert_eq!(locate_affected(&region, &statements), Some(0));
	}

	#[test]
	fn insertion_extending_statement_matches_it() {
		// `let x = ` + `1 let w = 2`: statement 0 now ends inside the inserted text.
		let region = EditRegion::for_range(TextPosition::new(1, 8, 8));
		let statements = vec![stmt(0, (1, 0), (1, 9)), stmt(1, (1, 10), (1, 19))];
		assert_eq!(locate_affected(&region, &statements), Some(0));
	}

	#[test]
	fn divergence_on_later_line() {
		let region = EditRegion::from_divergence("a\nbc", "a\nbXc");
		assert_eq!(region, EditRegion { line: 2, column: 1 });
	}

	#[test]
	fn from_lsp_converts_lines() {
		let event = TextDocumentContentChangeEvent {
			range: Some(Range::new(Position::new(0, 16), Position::new(0, 17))),
			range_length: None,
			text: "5".into(),
		};
		let edit = DocumentEdit::from_lsp("let x = 1 let y = 5", &event);
		assert_eq!(
			edit.change,
			ContentChange::Range {
				start: TextPosition::new(1, 16, 16),
				end: TextPosition::new(1, 17, 17),
				text: "5".into(),
			}
		);

		let full = TextDocumentContentChangeEvent {
			range: None,
			range_length: None,
			text: "x".into(),
		};
		assert_eq!(DocumentEdit::from_lsp("x", &full).change, ContentChange::Full);
	}
}
