//! Parsed statements and position arithmetic.
//!
//! A statement list is produced wholesale on every reparse. Indices are only
//! meaningful within the parse that produced them; two lists from different
//! parses are related purely by position.

use std::sync::Arc;

use lsp_types::{Position, Range};
use serde::{Deserialize, Serialize};

/// A position inside the document text.
///
/// Lines are 1-based, columns are 0-based and counted in chars. `offset` is
/// the absolute char offset from the start of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TextPosition {
	/// 1-based line number.
	pub line: u32,
	/// 0-based column.
	#[serde(rename = "col")]
	pub column: u32,
	/// Absolute char offset.
	#[serde(default)]
	pub offset: usize,
}

impl TextPosition {
	/// Creates a position.
	pub const fn new(line: u32, column: u32, offset: usize) -> Self {
		Self { line, column, offset }
	}

	/// Converts a char offset into `text` to a position.
	///
	/// Offsets past the end of the text clamp to the end.
	pub fn from_offset(text: &str, offset: usize) -> Self {
		let mut line = 1u32;
		let mut column = 0u32;
		let mut consumed = 0usize;
		for ch in text.chars().take(offset) {
			consumed += 1;
			if ch == '\n' {
				line += 1;
				column = 0;
			} else {
				column += 1;
			}
		}
		Self::new(line, column, consumed)
	}

	/// Converts to an LSP position (0-based line).
	///
	/// The char column is passed through as the UTF-16 `character`, which is
	/// exact for lines without characters outside the Basic Multilingual Plane.
	pub fn to_lsp(self) -> Position {
		Position::new(self.line.saturating_sub(1), self.column)
	}

	/// Converts an LSP position into `text` to a position.
	///
	/// LSP columns count UTF-16 code units; they are mapped to chars using the
	/// line's text. Positions past the end of a line or of the text clamp.
	pub fn from_lsp(text: &str, position: Position) -> Self {
		let mut chars = text.chars();
		let mut offset = 0usize;
		let mut line = 0u32;
		while line < position.line {
			match chars.next() {
				Some('\n') => line += 1,
				Some(_) => {}
				None => break,
			}
			offset += 1;
		}

		let mut units = 0u32;
		let mut column = 0u32;
		for ch in chars {
			if ch == '\n' || units >= position.character {
				break;
			}
			units += ch.len_utf16() as u32;
			column += 1;
		}
		Self::new(line + 1, column, offset + column as usize)
	}
}

/// One top-level parsed unit of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
	/// Ordinal within the parse that produced this statement.
	pub index: usize,
	/// Syntactic category tag reported by the parser.
	pub kind: String,
	/// Names introduced or referenced, in source order.
	#[serde(rename = "ids", default)]
	pub identifiers: Vec<String>,
	/// Start of the statement's source range.
	pub start: TextPosition,
	/// End of the statement's source range.
	pub end: TextPosition,
}

impl Statement {
	/// Source range of the statement as an LSP range.
	pub fn lsp_range(&self) -> Range {
		Range::new(self.start.to_lsp(), self.end.to_lsp())
	}
}

/// One parse's statement sequence, in document order.
pub type Statements = Arc<[Statement]>;

/// Returns an empty statement sequence.
pub fn no_statements() -> Statements {
	Arc::from(Vec::new())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_offset_tracks_lines_and_columns() {
		let text = "let x = 1\nlet y = 2";
		assert_eq!(TextPosition::from_offset(text, 0), TextPosition::new(1, 0, 0));
		assert_eq!(TextPosition::from_offset(text, 4), TextPosition::new(1, 4, 4));
		assert_eq!(TextPosition::from_offset(text, 10), TextPosition::new(2, 0, 10));
		assert_eq!(TextPosition::from_offset(text, 13), TextPosition::new(2, 3, 13));
	}

	#[test]
	fn from_lsp_counts_utf16_units() {
		let text = "let x = 1\nlet \u{1F600} = 2";
		assert_eq!(TextPosition::from_lsp(text, Position::new(0, 4)), TextPosition::new(1, 4, 4));
		// The emoji is two UTF-16 units but one char.
		assert_eq!(TextPosition::from_lsp(text, Position::new(1, 7)), TextPosition::new(2, 6, 16));
		assert_eq!(TextPosition::from_lsp(text, Position::new(1, 99)), TextPosition::new(2, 10, 20));
	}

	#[test]
	fn from_offset_clamps_past_end() {
		assert_eq!(TextPosition::from_offset("ab", 10), TextPosition::new(1, 2, 2));
	}

	#[test]
	fn deserializes_parser_output() {
		let json = r#"[{"index":0,"kind":"let","ids":["x"],"start":{"line":1,"col":0,"offset":0},"end":{"line":1,"col":9,"offset":9}}]"#;
		let statements: Vec<Statement> = serde_json::from_str(json).unwrap();

		assert_eq!(statements.len(), 1);
		assert_eq!(statements[0].identifiers, vec!["x"]);
		assert_eq!(statements[0].end, TextPosition::new(1, 9, 9));
		assert_eq!(statements[0].lsp_range(), Range::new(Position::new(0, 0), Position::new(0, 9)));
	}
}
