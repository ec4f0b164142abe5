//! Symbol tables ("ranges"): one per lexical level (routine text, specifier,
//! or any clause that opens a scope). A parent-linked arena entry with a
//! name-keyed lookup map, generalized to Algol 68's five tag namespaces
//! (identifiers, indicants, labels, operators, priorities) plus an
//! anonymous-tag list and the frame offset increment.

use rustc_hash::FxHashMap;

use crate::base::Name;

use super::tag::TagId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeId(u32);

impl RangeId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One lexical scope. Operators are stored as a `Vec<TagId>` per name since
/// Algol 68 allows several overloads of the same operator spelling in one
/// range (distinguished by operand mode at bind time); every other
/// namespace holds at most one tag per name per range (a second declaration
/// is a `MultiplyDeclaredTag` error, checked by the declaration pre-scan).
#[derive(Debug)]
pub struct SymbolTable {
    /// Nesting depth; `level(previous(t)) < level(t)` for every range `t`.
    pub level: i32,
    /// Sequential index among ranges opened at the same level, for stable
    /// iteration order independent of arena insertion order.
    pub nest: u32,
    pub previous: Option<RangeId>,
    /// The enclosing routine's table; may skip serial-clause levels that do
    /// not themselves open a routine/format text.
    pub outer: Option<RangeId>,

    pub identifiers: FxHashMap<Name, TagId>,
    pub indicants: FxHashMap<Name, TagId>,
    pub labels: FxHashMap<Name, TagId>,
    pub operators: FxHashMap<Name, Vec<TagId>>,
    pub priorities: FxHashMap<Name, TagId>,
    pub anonymous: Vec<TagId>,

    /// Mode slots (raw, like `Tag::mode`) declared directly in this range —
    /// populated by the mode collector so the equivalencer can walk "every
    /// known mode" range by range without a separate global index.
    pub modes: Vec<u32>,

    /// Aligned sum of `size(t)` over every tag in `identifiers ∪ operators ∪
    /// anonymous`, assigned by the tag binder (component J).
    pub ap_increment: u32,
}

impl SymbolTable {
    pub fn new(level: i32, nest: u32, previous: Option<RangeId>, outer: Option<RangeId>) -> Self {
        Self {
            level,
            nest,
            previous,
            outer,
            identifiers: FxHashMap::default(),
            indicants: FxHashMap::default(),
            labels: FxHashMap::default(),
            operators: FxHashMap::default(),
            priorities: FxHashMap::default(),
            anonymous: Vec::new(),
            modes: Vec::new(),
            ap_increment: 0,
        }
    }
}

/// Arena owning every [`SymbolTable`] for the whole program.
#[derive(Debug, Default)]
pub struct RangeArena {
    ranges: Vec<SymbolTable>,
}

impl RangeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the top-level range (the standard environ's child, or the
    /// standard environ itself if `previous`/`outer` are both `None`).
    pub fn push(&mut self, previous: Option<RangeId>, outer: Option<RangeId>) -> RangeId {
        let level = match previous {
            Some(p) => self.get(p).level + 1,
            None => 0,
        };
        let nest = self
            .ranges
            .iter()
            .filter(|r| r.level == level)
            .count() as u32;
        let id = RangeId::new(self.ranges.len());
        self.ranges.push(SymbolTable::new(level, nest, previous, outer));
        id
    }

    pub fn get(&self, id: RangeId) -> &SymbolTable {
        &self.ranges[id.index()]
    }

    pub fn get_mut(&mut self, id: RangeId) -> &mut SymbolTable {
        &mut self.ranges[id.index()]
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Looks up `name` in `start`'s identifier namespace, then its `previous`
    /// chain — the lookup every applied-identifier bind performs.
    pub fn lookup_identifier(&self, start: RangeId, name: Name) -> Option<TagId> {
        self.lookup_in(start, name, |r| &r.identifiers)
    }

    pub fn lookup_indicant(&self, start: RangeId, name: Name) -> Option<TagId> {
        self.lookup_in(start, name, |r| &r.indicants)
    }

    pub fn lookup_label(&self, start: RangeId, name: Name) -> Option<TagId> {
        self.lookup_in(start, name, |r| &r.labels)
    }

    fn lookup_in(
        &self,
        start: RangeId,
        name: Name,
        select: impl Fn(&SymbolTable) -> &FxHashMap<Name, TagId>,
    ) -> Option<TagId> {
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            let range = self.get(id);
            if let Some(tag) = select(range).get(&name) {
                return Some(*tag);
            }
            cursor = range.previous;
        }
        None
    }

    /// All operator overloads reachable from `start`'s chain with spelling
    /// `name`, nearest range first — the order component L's operator
    /// lookup searches in.
    pub fn lookup_operators(&self, start: RangeId, name: Name) -> Vec<TagId> {
        let mut out = Vec::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            let range = self.get(id);
            if let Some(tags) = range.operators.get(&name) {
                out.extend(tags.iter().copied());
            }
            cursor = range.previous;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_increases_with_nesting() {
        let mut arena = RangeArena::new();
        let top = arena.push(None, None);
        let inner = arena.push(Some(top), Some(top));
        assert!(arena.get(inner).level > arena.get(top).level);
        assert_eq!(arena.get(inner).previous, Some(top));
    }

    #[test]
    fn identifier_lookup_walks_previous_chain() {
        use crate::base::Interner;
        use crate::kind::SyntaxKind;
        use crate::tree::arena::Tree;
        use crate::tree::tag::{Tag, TagKind};
        use text_size::TextRange;

        let mut arena = RangeArena::new();
        let top = arena.push(None, None);
        let inner = arena.push(Some(top), Some(top));

        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let node = tree.push_leaf(SyntaxKind::IDENTIFIER, None, TextRange::empty(0.into()));
        let name = interner.intern("x");

        let mut tags = super::super::tag::TagArena::new();
        let tag_id = tags.push(Tag::new(TagKind::Identifier, name, node, top));
        arena.get_mut(top).identifiers.insert(name, tag_id);

        assert_eq!(arena.lookup_identifier(inner, name), Some(tag_id));
        assert_eq!(arena.lookup_identifier(inner, interner.intern("y")), None);
    }
}
