//! Tags: named declarations inside a [`super::SymbolTable`] (range).
//!
//! A tag is created once, at its defining occurrence, by the declaration
//! pre-scan (component F) or the bottom-up reducer, and is never removed —
//! later phases only mutate its `mode`/`scope`/`offset`/`used` fields as they
//! settle facts about it.

use crate::base::Name;

use super::arena::NodeId;
use super::range::RangeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(u32);

impl TagId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What kind of declaration a tag represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Identifier,
    Indicant,
    Label,
    Op,
    Prio,
    Anonymous,
}

/// `LOC` (frame-local) vs `HEAP` storage for a generator or a variable's
/// implicit generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heap {
    Loc,
    Heap,
}

/// A named (or anonymous) declaration. `mode` is a raw arena slot (like
/// [`super::Node::mode_slot`]) rather than a `mode::ModeId`, so `tree` is
/// never forced to depend on `mode`, which instead depends on it.
#[derive(Debug, Clone)]
pub struct Tag {
    pub kind: TagKind,
    pub spelling: Name,
    /// The defining occurrence (an IDENTIFIER/INDICANT/OPERATOR leaf, a
    /// declarer, or a routine text) this tag was created from.
    pub node: NodeId,
    /// The range this tag is declared in.
    pub table: RangeId,
    pub mode: Option<u32>,
    /// Priority (1..=MAX_PRIORITY) for `TagKind::Prio` and dyadic `TagKind::Op`.
    pub priority: Option<u8>,
    pub heap: Heap,
    /// Youngest environ level this tag's value can be safely stored at, per
    /// component M. `None` until the scope checker (or, for `PROC`
    /// identities, §4.M's "procedure identity declarations assign the
    /// body's youngest environ") assigns it.
    pub scope: Option<i32>,
    pub scope_assigned: bool,
    /// Set for an identifier tag introduced by `PROC f = …`.
    pub in_proc: bool,
    pub used: bool,
    /// Frame offset within `table`, assigned by the tag binder (component J).
    pub offset: u32,
    pub size: u32,
}

impl Tag {
    pub fn new(kind: TagKind, spelling: Name, node: NodeId, table: RangeId) -> Self {
        Self {
            kind,
            spelling,
            node,
            table,
            mode: None,
            priority: None,
            heap: Heap::Loc,
            scope: None,
            scope_assigned: false,
            in_proc: false,
            used: false,
            offset: 0,
            size: 0,
        }
    }
}

/// Arena owning every [`Tag`] for the whole program; tags are appended and
/// never removed.
#[derive(Debug, Default)]
pub struct TagArena {
    tags: Vec<Tag>,
}

impl TagArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: Tag) -> TagId {
        let id = TagId::new(self.tags.len());
        self.tags.push(tag);
        id
    }

    pub fn get(&self, id: TagId) -> &Tag {
        &self.tags[id.index()]
    }

    pub fn get_mut(&mut self, id: TagId) -> &mut Tag {
        &mut self.tags[id.index()]
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::super::arena::Tree;
    use super::*;
    use crate::base::Interner;
    use crate::kind::SyntaxKind;
    use text_size::TextRange;

    #[test]
    fn pushed_tags_keep_stable_ids() {
        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let node = tree.push_leaf(SyntaxKind::IDENTIFIER, None, TextRange::empty(0.into()));
        let table = RangeId::new(0);
        let mut arena = TagArena::new();
        let a = arena.push(Tag::new(TagKind::Identifier, interner.intern("x"), node, table));
        let b = arena.push(Tag::new(TagKind::Op, interner.intern("+"), node, table));
        assert_ne!(a, b);
        assert_eq!(arena.get(a).kind, TagKind::Identifier);
    }
}
