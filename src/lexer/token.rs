use text_size::TextRange;

use crate::base::Name;
use crate::kind::SyntaxKind;

/// A scanned token — the token-list half of the node kind shared with the
/// syntax tree. Converted into a tree leaf node once bracket/keyword
/// matching builds the top-down frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub spelling: Name,
    pub range: TextRange,
    /// Source line index (into the flattened [`crate::source::LineChain`])
    /// this token starts on, so diagnostics can be attached to the owning
    /// line without re-deriving it from the byte offset.
    pub line: u32,
    /// A pending pragmat/comment attaches to the following real token as its
    /// "pragment" rather than being discarded, so later phases can still
    /// recover and re-emit it (e.g. when reconstructing a source line).
    pub pragment_of: Option<Name>,
}

impl Token {
    pub fn new(kind: SyntaxKind, spelling: Name, range: TextRange, line: u32) -> Self {
        Self {
            kind,
            spelling,
            range,
            line,
            pragment_of: None,
        }
    }
}
