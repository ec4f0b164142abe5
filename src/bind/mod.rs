//! Tag binder and frame-offset assigner (component J).
//!
//! Reduction (components D-G) only binds *defining* occurrences — a
//! declaration, a prescanned MODE/PRIO/OP name, a label — since those have
//! to be in the range's symbol table before the range's own left-to-right
//! walk can resolve anything against it. Every *applied* IDENTIFIER or
//! BOLD_TAG leaf reduction built is left with `tag: None`; finding its
//! declaration is this module's job, one whole-tree walk after reduction
//! has produced every range's final symbol table.
//!
//! Operator applied occurrences are deliberately left unbound here: which
//! overload a spelling resolves to depends on its operand modes, which this
//! module has no access to (mode collection/equivalence is component H/I,
//! already run, but operator *selection* needs coercion, which is
//! component L's job). `check` binds `OPERATOR` leaves itself once operand
//! modes are in hand.

use tracing::instrument;

use crate::base::{Interner, Name};
use crate::diag::{Diagnostic, DiagnosticSink, ErrorCode};
use crate::kind::SyntaxKind;
use crate::mode::ModeTable;
use crate::tree::{NodeId, RangeArena, RangeId, TagArena, TagId, TagKind, Tree};

/// Binds every applied identifier/indicant occurrence reachable from `root`
/// and assigns frame offsets to every tag. `top_range` is the fallback range
/// for nodes with no owning ancestor (only `root` itself).
#[instrument(level = "debug", skip_all, name = "phase_j_bind")]
pub fn bind(
    tree: &mut Tree,
    ranges: &RangeArena,
    tags: &mut TagArena,
    interner: &mut Interner,
    sink: &mut DiagnosticSink,
    root: NodeId,
    top_range: RangeId,
) {
    sink.begin_phase();
    walk(tree, ranges, tags, interner, sink, root, top_range);
}

fn walk(
    tree: &mut Tree,
    ranges: &RangeArena,
    tags: &mut TagArena,
    interner: &mut Interner,
    sink: &mut DiagnosticSink,
    node: NodeId,
    enclosing: RangeId,
) {
    let range = tree.node(node).owns_range.unwrap_or(enclosing);
    let kind = tree.node(node).kind;

    if tree.node(node).tag.is_none() {
        match kind {
            SyntaxKind::IDENTIFIER => bind_identifier(tree, ranges, tags, interner, sink, node, range),
            SyntaxKind::BOLD_TAG => bind_indicant(tree, ranges, tags, interner, sink, node, range),
            _ => {}
        }
    }

    for child in tree.children(node) {
        walk(tree, ranges, tags, interner, sink, child, range);
    }
}

/// An applied `IDENTIFIER` with no bound tag yet is resolved, in order:
/// against the identifier namespace, against the label namespace (a
/// goto-less jump, rewritten to `JUMP` in place), and finally retried under
/// the lengthety courtesy heuristic before giving up.
fn bind_identifier(
    tree: &mut Tree,
    ranges: &RangeArena,
    tags: &mut TagArena,
    interner: &mut Interner,
    sink: &mut DiagnosticSink,
    node: NodeId,
    range: RangeId,
) {
    let Some(name) = tree.node(node).spelling else { return };

    if let Some(tag_id) = ranges.lookup_identifier(range, name) {
        tags.get_mut(tag_id).used = true;
        tree.node_mut(node).tag = Some(tag_id);
        return;
    }

    if let Some(tag_id) = ranges.lookup_label(range, name) {
        tags.get_mut(tag_id).used = true;
        tree.node_mut(node).tag = Some(tag_id);
        tree.node_mut(node).kind = SyntaxKind::JUMP;
        return;
    }

    if let Some(tag_id) = lengthety_retry(ranges, interner, name, range) {
        tags.get_mut(tag_id).used = true;
        tree.node_mut(node).tag = Some(tag_id);
        return;
    }

    sink.report(Diagnostic::error(ErrorCode::UndeclaredTag, tree.node(node).range).with_arg(interner.resolve(name)));
}

fn bind_indicant(
    tree: &mut Tree,
    ranges: &RangeArena,
    tags: &mut TagArena,
    interner: &mut Interner,
    sink: &mut DiagnosticSink,
    node: NodeId,
    range: RangeId,
) {
    let Some(name) = tree.node(node).spelling else { return };
    if let Some(tag_id) = ranges.lookup_indicant(range, name) {
        tags.get_mut(tag_id).used = true;
        tree.node_mut(node).tag = Some(tag_id);
        return;
    }
    sink.report(Diagnostic::error(ErrorCode::UndeclaredTag, tree.node(node).range).with_arg(interner.resolve(name)));
}

/// Strips a run of leading `long`/`short` from `name`'s spelling and
/// re-resolves the shortened spelling, the courtesy that lets a caller
/// write `longsin`/`longlongsin` even when only `sin` (or one fewer `long`)
/// is actually declared. Purely textual — this is a second lookup of a
/// *different* name, never a mode widening, so it is tried only after the
/// exact spelling has failed outright.
fn lengthety_retry(ranges: &RangeArena, interner: &mut Interner, name: Name, range: RangeId) -> Option<TagId> {
    let spelling = interner.resolve(name).to_string();
    let mut rest = spelling.as_str();
    let mut stripped_any = false;
    loop {
        if let Some(tail) = rest.strip_prefix("long") {
            rest = tail;
            stripped_any = true;
        } else if let Some(tail) = rest.strip_prefix("short") {
            rest = tail;
            stripped_any = true;
        } else {
            break;
        }
        if rest.is_empty() {
            return None;
        }
        let candidate = interner.intern(rest);
        if let Some(tag_id) = ranges.lookup_identifier(range, candidate) {
            return Some(tag_id);
        }
    }
    let _ = stripped_any;
    None
}

/// Minimum alignment (bytes) for every tag's frame slot, matching the
/// pointer-sized granularity `mode::table`'s `REF`/row sizes already use.
const FRAME_ALIGNMENT: u32 = 8;

fn align_up(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// Assigns every range's tags a frame offset: identifiers first, then
/// operators, then anonymous tags, each aligned to [`FRAME_ALIGNMENT`] and
/// sized from its mode — offsets assigned in declaration order, realized
/// here as three passes over the tag arena (which already holds tags in
/// declaration order) bucketed by `table` and `kind` rather than sorted,
/// so declaration order within a bucket is preserved.
pub fn assign_offsets(ranges: &mut RangeArena, tags: &mut TagArena, modes: &ModeTable) {
    for range_index in 0..ranges.len() {
        let range_id = RangeId::new(range_index);
        let mut identifiers = Vec::new();
        let mut operators = Vec::new();
        let mut anonymous = Vec::new();
        for tag_index in 0..tags.len() {
            let tag_id = TagId::new(tag_index);
            let tag = tags.get(tag_id);
            if tag.table != range_id {
                continue;
            }
            match tag.kind {
                TagKind::Identifier => identifiers.push(tag_id),
                TagKind::Op => operators.push(tag_id),
                TagKind::Anonymous => anonymous.push(tag_id),
                TagKind::Indicant | TagKind::Label | TagKind::Prio => {}
            }
        }

        let mut offset = 0u32;
        for tag_id in identifiers.into_iter().chain(operators).chain(anonymous) {
            let size = tags
                .get(tag_id)
                .mode
                .map(|slot| modes.get(crate::mode::ModeId::new(slot as usize)).size)
                .unwrap_or(0);
            offset = align_up(offset, FRAME_ALIGNMENT);
            let tag = tags.get_mut(tag_id);
            tag.offset = offset;
            tag.size = size;
            offset += size;
        }
        ranges.get_mut(range_id).ap_increment = align_up(offset, FRAME_ALIGNMENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tag;
    use text_size::TextRange;

    fn leaf(tree: &mut Tree, kind: SyntaxKind, spelling: Option<Name>) -> NodeId {
        tree.push_leaf(kind, spelling, TextRange::empty(0.into()))
    }

    #[test]
    fn applied_identifier_binds_to_declaration() {
        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let mut ranges = RangeArena::new();
        let mut tags = TagArena::new();
        let mut sink = DiagnosticSink::new();

        let top = ranges.push(None, None);
        let name = interner.intern("x");
        let decl_node = leaf(&mut tree, SyntaxKind::IDENTIFIER, Some(name));
        let tag_id = tags.push(Tag::new(TagKind::Identifier, name, decl_node, top));
        ranges.get_mut(top).identifiers.insert(name, tag_id);

        let applied = leaf(&mut tree, SyntaxKind::IDENTIFIER, Some(name));
        bind(&mut tree, &ranges, &mut tags, &mut interner, &mut sink, applied, top);

        assert_eq!(tree.node(applied).tag, Some(tag_id));
        assert!(tags.get(tag_id).used);
        assert!(!sink.has_errors());
    }

    #[test]
    fn unresolved_identifier_reports_undeclared_tag() {
        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let mut ranges = RangeArena::new();
        let mut tags = TagArena::new();
        let mut sink = DiagnosticSink::new();
        let top = ranges.push(None, None);

        let name = interner.intern("mystery");
        let applied = leaf(&mut tree, SyntaxKind::IDENTIFIER, Some(name));
        bind(&mut tree, &ranges, &mut tags, &mut interner, &mut sink, applied, top);

        assert!(tree.node(applied).tag.is_none());
        assert!(sink.has_errors());
    }

    #[test]
    fn bare_identifier_resolving_to_label_becomes_goto_less_jump() {
        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let mut ranges = RangeArena::new();
        let mut tags = TagArena::new();
        let mut sink = DiagnosticSink::new();

        let top = ranges.push(None, None);
        let name = interner.intern("loop");
        let label_decl = leaf(&mut tree, SyntaxKind::LABEL, Some(name));
        let tag_id = tags.push(Tag::new(TagKind::Label, name, label_decl, top));
        ranges.get_mut(top).labels.insert(name, tag_id);

        let applied = leaf(&mut tree, SyntaxKind::IDENTIFIER, Some(name));
        bind(&mut tree, &ranges, &mut tags, &mut interner, &mut sink, applied, top);

        assert_eq!(tree.node(applied).kind, SyntaxKind::JUMP);
        assert_eq!(tree.node(applied).tag, Some(tag_id));
    }

    #[test]
    fn lengthety_heuristic_strips_long_prefix() {
        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let mut ranges = RangeArena::new();
        let mut tags = TagArena::new();
        let mut sink = DiagnosticSink::new();

        let top = ranges.push(None, None);
        let sin_name = interner.intern("sin");
        let decl_node = leaf(&mut tree, SyntaxKind::IDENTIFIER, Some(sin_name));
        let tag_id = tags.push(Tag::new(TagKind::Identifier, sin_name, decl_node, top));
        ranges.get_mut(top).identifiers.insert(sin_name, tag_id);

        let longsin_name = interner.intern("longsin");
        let applied = leaf(&mut tree, SyntaxKind::IDENTIFIER, Some(longsin_name));
        bind(&mut tree, &ranges, &mut tags, &mut interner, &mut sink, applied, top);

        assert_eq!(tree.node(applied).tag, Some(tag_id));
        assert!(!sink.has_errors());
    }

    #[test]
    fn offsets_are_aligned_and_grouped_identifiers_then_operators() {
        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let mut ranges = RangeArena::new();
        let mut tags = TagArena::new();
        let mut modes = ModeTable::new();
        let int_mode = modes.standard(crate::mode::StandardKind::Int, 0);

        let top = ranges.push(None, None);
        let a_name = interner.intern("a");
        let node_a = leaf(&mut tree, SyntaxKind::IDENTIFIER, Some(a_name));
        let tag_a = tags.push(Tag::new(TagKind::Identifier, a_name, node_a, top));
        tags.get_mut(tag_a).mode = Some(int_mode.index() as u32);
        ranges.get_mut(top).identifiers.insert(a_name, tag_a);

        let op_name = interner.intern("+++");
        let node_op = leaf(&mut tree, SyntaxKind::OPERATOR, Some(op_name));
        let tag_op = tags.push(Tag::new(TagKind::Op, op_name, node_op, top));
        ranges.get_mut(top).operators.entry(op_name).or_default().push(tag_op);

        assign_offsets(&mut ranges, &mut tags, &modes);

        assert_eq!(tags.get(tag_a).offset, 0);
        assert_eq!(tags.get(tag_a).size, 4);
        assert!(tags.get(tag_op).offset >= 8);
        assert_eq!(ranges.get(top).ap_increment % FRAME_ALIGNMENT, 0);
    }
}
