//! Line/column conversion for a single source line's text.
//!
//! The [`crate::source`] module owns the chain of [`crate::source::SourceLine`]
//! records; this type converts a byte offset *within one line* to a column,
//! which is what diagnostics need once a phase has already located the
//! owning line.

use text_size::TextSize;

/// A 0-indexed line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl LineCol {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// Maps byte offsets within a single line's text to columns, accounting for
/// multi-byte UTF-8 sequences (columns are counted in `char`s, not bytes).
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each char, plus a sentinel at the end.
    char_offsets: Vec<TextSize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut char_offsets: Vec<TextSize> = text
            .char_indices()
            .map(|(i, _)| TextSize::try_from(i).unwrap())
            .collect();
        char_offsets.push(TextSize::try_from(text.len()).unwrap());
        Self { char_offsets }
    }

    /// Column (in chars) of the given byte offset within the line.
    pub fn col_at(&self, offset: TextSize) -> u32 {
        match self.char_offsets.binary_search(&offset) {
            Ok(idx) => idx as u32,
            Err(idx) => idx.saturating_sub(1) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_columns() {
        let idx = LineIndex::new("BEGIN print(1) END");
        assert_eq!(idx.col_at(TextSize::from(0)), 0);
        assert_eq!(idx.col_at(TextSize::from(6)), 6);
    }

    #[test]
    fn multibyte_columns_count_chars_not_bytes() {
        // "é" is 2 bytes in UTF-8 but one char.
        let text = "é := 1";
        let idx = LineIndex::new(text);
        // offset 2 is the byte right after "é"
        assert_eq!(idx.col_at(TextSize::from(2)), 1);
    }
}
