//! Node arena: every tree node lives in one growable `Vec<Node>`, addressed
//! by an index (`NodeId`) rather than by pointer, so a phase that rewrites
//! the tree in place (reparenting, splicing in a coercion node) never has to
//! fight a borrow checker over shared ownership the way a pointer-linked
//! tree would.

use text_size::TextRange;

use crate::base::Name;
use crate::diag::NodeRef;
use crate::kind::SyntaxKind;

use super::range::RangeId;
use super::tag::TagId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        NodeRef(id.0)
    }
}

bitflags::bitflags! {
    /// Per-node status bits, mutated in place as later phases settle facts
    /// about a node (e.g. a scope violation already reported here should not
    /// be reported again).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeStatus: u32 {
        const SCOPE_ERROR    = 1 << 0;
        const MASK_ERROR     = 1 << 1;
        const TRANSIENT      = 1 << 2;
        const OPTIMIZED      = 1 << 3;
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: SyntaxKind,
    pub spelling: Option<Name>,
    pub range: TextRange,

    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub previous_sibling: Option<NodeId>,

    pub status: NodeStatus,
    /// The range (symbol table) this node opens, for nodes that introduce
    /// one (ROUTINE_TEXT, FORMAT_TEXT, every bracketed clause).
    pub owns_range: Option<RangeId>,
    /// The tag this node resolves to, for IDENTIFIER/INDICANT/OPERATOR
    /// applied occurrences, filled in by the tag binder.
    pub tag: Option<TagId>,
    /// Mode index assigned by the mode collector/equivalencer. Left untyped
    /// (a raw arena slot rather than a `mode::ModeId`) so this module is
    /// never forced to depend on `mode`, which instead depends on it.
    pub mode_slot: Option<u32>,
}

impl Node {
    fn leaf(kind: SyntaxKind, spelling: Option<Name>, range: TextRange) -> Self {
        Self {
            kind,
            spelling,
            range,
            parent: None,
            first_child: None,
            next_sibling: None,
            previous_sibling: None,
            status: NodeStatus::empty(),
            owns_range: None,
            tag: None,
            mode_slot: None,
        }
    }
}

/// The tree arena. One per [`crate::program::Program`]; never individually
/// frees a node, matching the bump-allocate-and-drop-en-bloc resource model.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_leaf(&mut self, kind: SyntaxKind, spelling: Option<Name>, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::leaf(kind, spelling, range));
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Wraps `children` (a contiguous run of top-level siblings, already
    /// unlinked from whatever list held them) into one new node of `kind`,
    /// spanning their combined range. This is the primitive every
    /// bracket-matching/framing/reducing step in `parser` builds on.
    pub fn wrap(&mut self, kind: SyntaxKind, children: &[NodeId]) -> NodeId {
        assert!(!children.is_empty(), "wrap requires at least one child");
        let start = self.node(children[0]).range.start();
        let end = self.node(*children.last().unwrap()).range.end();
        let range = TextRange::new(start, end);
        let parent_id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::leaf(kind, None, range));

        for (i, &child) in children.iter().enumerate() {
            self.node_mut(child).parent = Some(parent_id);
            self.node_mut(child).previous_sibling = if i == 0 { None } else { Some(children[i - 1]) };
            self.node_mut(child).next_sibling = children.get(i + 1).copied();
        }
        self.node_mut(parent_id).first_child = Some(children[0]);
        parent_id
    }

    /// Records that `id` opens `range` — the lexical scope whose body is
    /// this node's subtree. Set once, at the point a range-opening
    /// construct (a routine/format text, an enclosed clause, a loop, the
    /// program itself) finishes parsing; never moved afterward.
    pub fn set_owns_range(&mut self, id: NodeId, range: RangeId) {
        self.node_mut(id).owns_range = Some(range);
    }

    /// The nearest range `id` (or one of its ancestors) owns, falling back to
    /// `fallback` if none of them do (only the root has no such ancestor).
    /// Every phase from the tag binder onward needs "what range is this
    /// position in" and derives it the same way: walk up until `owns_range`
    /// is set.
    pub fn enclosing_range(&self, mut id: NodeId, fallback: RangeId) -> RangeId {
        loop {
            if let Some(range) = self.node(id).owns_range {
                return range;
            }
            match self.node(id).parent {
                Some(parent) => id = parent,
                None => return fallback,
            }
        }
    }

    /// Children of `id`, in order, by walking `first_child`/`next_sibling`.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.node(id).first_child;
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.node(child).next_sibling;
        }
        out
    }

    /// Replaces the contiguous sibling run `old` (all children of the same
    /// parent) with a single new node of `result_kind`, relinking the
    /// parent's `first_child` and the run's former neighbors. This realizes
    /// the bottom-up reducer's `reduce(...)` rewrite-a-matched-prefix
    /// primitive.
    pub fn reduce_siblings(&mut self, parent: NodeId, old: &[NodeId], result_kind: SyntaxKind) -> NodeId {
        assert!(!old.is_empty());
        let before = self.node(old[0]).previous_sibling;
        let after = self.node(*old.last().unwrap()).next_sibling;

        let start = self.node(old[0]).range.start();
        let end = self.node(*old.last().unwrap()).range.end();
        let new_id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::leaf(result_kind, None, TextRange::new(start, end)));
        self.node_mut(new_id).parent = Some(parent);
        self.node_mut(new_id).first_child = Some(old[0]);
        self.node_mut(new_id).previous_sibling = before;
        self.node_mut(new_id).next_sibling = after;

        for (i, &child) in old.iter().enumerate() {
            self.node_mut(child).parent = Some(new_id);
            self.node_mut(child).previous_sibling = if i == 0 { None } else { Some(old[i - 1]) };
            self.node_mut(child).next_sibling = old.get(i + 1).copied();
        }

        if let Some(before) = before {
            self.node_mut(before).next_sibling = Some(new_id);
        } else {
            self.node_mut(parent).first_child = Some(new_id);
        }
        if let Some(after) = after {
            self.node_mut(after).previous_sibling = Some(new_id);
        }
        new_id
    }

    /// Inserts `coercion` as the sole child of `target`'s current position,
    /// with `target` reparented underneath it — realizes phase L's
    /// DEREFERENCING/WIDENING/... insertion without disturbing `target`'s
    /// former neighbors.
    pub fn insert_coercion_above(&mut self, target: NodeId, coercion_kind: SyntaxKind) -> NodeId {
        let parent = self.node(target).parent;
        let previous_sibling = self.node(target).previous_sibling;
        let next_sibling = self.node(target).next_sibling;
        let range = self.node(target).range;

        let coercion_id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::leaf(coercion_kind, None, range));
        self.node_mut(coercion_id).parent = parent;
        self.node_mut(coercion_id).previous_sibling = previous_sibling;
        self.node_mut(coercion_id).next_sibling = next_sibling;
        self.node_mut(coercion_id).first_child = Some(target);

        self.node_mut(target).parent = Some(coercion_id);
        self.node_mut(target).previous_sibling = None;
        self.node_mut(target).next_sibling = None;

        if let Some(previous_sibling) = previous_sibling {
            self.node_mut(previous_sibling).next_sibling = Some(coercion_id);
        } else if let Some(parent) = parent {
            self.node_mut(parent).first_child = Some(coercion_id);
        }
        if let Some(next_sibling) = next_sibling {
            self.node_mut(next_sibling).previous_sibling = Some(coercion_id);
        }
        coercion_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tree: &mut Tree, kind: SyntaxKind) -> NodeId {
        tree.push_leaf(kind, None, TextRange::empty(0.into()))
    }

    #[test]
    fn wrap_links_children_and_parent() {
        let mut tree = Tree::new();
        let a = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let b = leaf(&mut tree, SyntaxKind::OPERATOR);
        let c = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let formula = tree.wrap(SyntaxKind::DYADIC_FORMULA, &[a, b, c]);
        assert_eq!(tree.children(formula), vec![a, b, c]);
        assert_eq!(tree.node(a).parent, Some(formula));
        assert_eq!(tree.node(b).previous_sibling, Some(a));
        assert_eq!(tree.node(b).next_sibling, Some(c));
    }

    #[test]
    fn sub_null_or_previous_sub_null_invariant() {
        let mut tree = Tree::new();
        let a = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let b = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let parent = tree.wrap(SyntaxKind::SERIAL_CLAUSE, &[a, b]);
        let sub = tree.node(parent).first_child;
        if let Some(sub) = sub {
            assert_eq!(tree.node(sub).previous_sibling, None);
        }
    }

    #[test]
    fn reduce_siblings_preserves_outer_links() {
        let mut tree = Tree::new();
        let a = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let b = leaf(&mut tree, SyntaxKind::OPERATOR);
        let c = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let d = leaf(&mut tree, SyntaxKind::SEMI);
        let parent = tree.wrap(SyntaxKind::SERIAL_CLAUSE, &[a, b, c, d]);
        let formula = tree.reduce_siblings(parent, &[a, b, c], SyntaxKind::DYADIC_FORMULA);
        assert_eq!(tree.children(parent), vec![formula, d]);
        assert_eq!(tree.node(d).previous_sibling, Some(formula));
    }

    #[test]
    fn enclosing_range_walks_up_to_nearest_owner() {
        let mut tree = Tree::new();
        let id_node = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let unit = tree.wrap(SyntaxKind::ASSIGNATION, &[id_node]);
        let closed = tree.wrap(SyntaxKind::CLOSED_CLAUSE, &[unit]);
        let fallback = RangeId::new(99);
        let owned = RangeId::new(3);
        tree.set_owns_range(closed, owned);
        assert_eq!(tree.enclosing_range(id_node, fallback), owned);
        assert_eq!(tree.enclosing_range(closed, fallback), owned);
    }

    #[test]
    fn insert_coercion_above_reparents_without_disturbing_neighbors() {
        let mut tree = Tree::new();
        let a = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let b = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let parent = tree.wrap(SyntaxKind::ARGUMENT_LIST, &[a, b]);
        let coerced = tree.insert_coercion_above(a, SyntaxKind::DEREFERENCING);
        assert_eq!(tree.children(parent), vec![coerced, b]);
        assert_eq!(tree.node(coerced).first_child, Some(a));
        assert_eq!(tree.node(a).parent, Some(coerced));
    }
}
