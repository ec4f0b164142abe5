//! Parenthesis matching, framing, declaration pre-scan, and bottom-up
//! reduction (components D–G). Realized as a single recursive-descent pass
//! over the (already refined) token list rather than four separate
//! multi-pass sweeps over a mutable token list — the arena tree lets every
//! production build its result bottom-up as it recognizes it, so framing
//! (introducing a range) and reducing (collapsing matched tokens into a
//! node) happen in the same descent instead of successive rewrites of a
//! shared token buffer. See `DESIGN.md` for the open-question writeup.

mod brackets;
mod framer;
mod prescan;
mod reduce;

use text_size::TextRange;

use crate::base::Interner;
use crate::diag::{Diagnostic, DiagnosticSink, ErrorCode};
use crate::kind::SyntaxKind;
use crate::lexer::Token;
use crate::tree::{NodeId, RangeArena, RangeId, Tag, TagArena, TagId, TagKind, Tree};

pub use brackets::check as check_brackets;

/// Everything component D–G produces: the tree, the range/tag arenas, and
/// the root node. Handed to `mode`/`bind`/`victal`/`check`/`scopecheck` as
/// one bundle.
pub struct ParseResult {
    pub tree: Tree,
    pub ranges: RangeArena,
    pub tags: TagArena,
    pub root: NodeId,
    pub top_range: RangeId,
}

/// Parses an already-refined, already-bracket-checked token list. Callers
/// should run [`check_brackets`] first and skip parsing entirely on
/// failure, mirroring the reference's longjmp-out-of-phase discipline.
///
/// Opens its own standalone top range with no standard environ underneath
/// it; used directly by tests and by anything that wants bare-language
/// semantics. [`Program`](crate::program::Program) instead calls
/// [`parse_with_environ`] so every program range chains up through the
/// standard environ's identifiers and operators.
pub fn parse(tokens: &[Token], interner: &mut Interner, sink: &mut DiagnosticSink) -> ParseResult {
    parse_with_environ(tokens, interner, sink, RangeArena::new(), TagArena::new(), None)
}

/// Parses into a caller-supplied `RangeArena`/`TagArena` pair, opening the
/// program's top range as a child of `std_range` (the standard environ's
/// own range, already populated by [`crate::stdenv::build`]) so that every
/// applied occurrence in the program can resolve up through the environ's
/// `previous` chain without a second, disconnected arena ever existing.
pub fn parse_with_environ(
    tokens: &[Token],
    interner: &mut Interner,
    sink: &mut DiagnosticSink,
    ranges: RangeArena,
    tags: TagArena,
    std_range: Option<RangeId>,
) -> ParseResult {
    let mut parser = Parser::seeded(tokens, interner, sink, ranges, tags);
    let top_range = parser.ranges.push(std_range, std_range);
    let root = framer::parse_program(&mut parser, top_range);
    ParseResult {
        tree: parser.tree,
        ranges: parser.ranges,
        tags: parser.tags,
        root,
        top_range,
    }
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    tree: Tree,
    ranges: RangeArena,
    tags: TagArena,
    interner: &'a mut Interner,
    sink: &'a mut DiagnosticSink,
}

impl<'a> Parser<'a> {
    fn seeded(
        tokens: &'a [Token],
        interner: &'a mut Interner,
        sink: &'a mut DiagnosticSink,
        ranges: RangeArena,
        tags: TagArena,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            tree: Tree::new(),
            ranges,
            tags,
            interner,
            sink,
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> SyntaxKind {
        self.current().map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    fn current_range(&self) -> TextRange {
        self.current()
            .map(|t| t.range)
            .unwrap_or_else(|| TextRange::empty(0.into()))
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.current_kind() == kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        kinds.contains(&self.current_kind())
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Lookahead `n` tokens past the current one.
    fn nth_kind(&self, n: usize) -> SyntaxKind {
        self.tokens.get(self.pos + n).map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    /// Consumes the current token as a tree leaf, advancing past it.
    fn bump(&mut self) -> NodeId {
        let token = self.tokens[self.pos];
        self.pos += 1;
        self.tree.push_leaf(token.kind, Some(token.spelling), token.range)
    }

    fn eat(&mut self, kind: SyntaxKind) -> Option<NodeId> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    /// Consumes `kind`, or reports `MissingKeyword` and synthesizes an
    /// empty `ERROR` leaf at the current position so callers can keep a
    /// uniform child list without special-casing the failure.
    fn expect(&mut self, kind: SyntaxKind) -> NodeId {
        if let Some(id) = self.eat(kind) {
            return id;
        }
        self.sink.report(Diagnostic::error(ErrorCode::MissingKeyword, self.current_range()));
        self.tree.push_leaf(SyntaxKind::ERROR, None, self.current_range())
    }

    /// Recovery: consumes tokens (at least one, to guarantee progress)
    /// until one of `recovery` is seen or EOF, wrapping them in one `ERROR`
    /// node.
    fn recover_until(&mut self, recovery: &[SyntaxKind]) -> NodeId {
        let start_range = self.current_range();
        let mut consumed = Vec::new();
        while !self.at_eof() && !self.at_any(recovery) {
            consumed.push(self.bump());
        }
        if consumed.is_empty() {
            if self.at_eof() {
                return self.tree.push_leaf(SyntaxKind::ERROR, None, start_range);
            }
            consumed.push(self.bump());
        }
        self.tree.wrap(SyntaxKind::ERROR, &consumed)
    }

    fn report(&mut self, code: ErrorCode, range: TextRange) {
        self.sink.report(Diagnostic::error(code, range));
    }

    /// Declares `name` of `kind` in `range`, reporting `MultiplyDeclaredTag`
    /// on a clash (operators are the one namespace allowed to overload, so
    /// this is never called for `TagKind::Op`; see `declare_operator`).
    fn declare(&mut self, range: RangeId, kind: TagKind, name: crate::base::Name, node: NodeId) -> TagId {
        let tag = Tag::new(kind, name, node, range);
        let tag_id = self.tags.push(tag);
        let table = self.ranges.get_mut(range);
        let slot = match kind {
            TagKind::Identifier => &mut table.identifiers,
            TagKind::Indicant => &mut table.indicants,
            TagKind::Label => &mut table.labels,
            TagKind::Prio => &mut table.priorities,
            TagKind::Op | TagKind::Anonymous => unreachable!("use declare_operator/declare_anonymous"),
        };
        if let Some(&existing) = slot.get(&name) {
            self.report(ErrorCode::MultiplyDeclaredTag, self.tree.node(node).range);
            return existing;
        }
        slot.insert(name, tag_id);
        self.tree.node_mut(node).tag = Some(tag_id);
        tag_id
    }

    fn declare_operator(&mut self, range: RangeId, name: crate::base::Name, node: NodeId) -> TagId {
        let tag = Tag::new(TagKind::Op, name, node, range);
        let tag_id = self.tags.push(tag);
        self.ranges.get_mut(range).operators.entry(name).or_default().push(tag_id);
        self.tree.node_mut(node).tag = Some(tag_id);
        tag_id
    }

    #[allow(dead_code)]
    fn declare_anonymous(&mut self, range: RangeId, node: NodeId) -> TagId {
        let anon_name = self.interner.intern("");
        let tag = Tag::new(TagKind::Anonymous, anon_name, node, range);
        let tag_id = self.tags.push(tag);
        self.ranges.get_mut(range).anonymous.push(tag_id);
        self.tree.node_mut(node).tag = Some(tag_id);
        tag_id
    }
}
