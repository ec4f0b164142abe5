//! Static scope checker (component M). Two passes: environ computation
//! (the youngest outside level a routine/format text's body reaches past),
//! then statement scoping (per-assignation/declaration escape checks).
//! Grounded on the reference-tracking shape of a dependency-graph walk —
//! "what does this subtree reach outside its own frame" — generalized here
//! from a module/file graph to Algol 68's nested lexical frames.

use rustc_hash::FxHashMap;
use tracing::instrument;

use crate::diag::{Diagnostic, DiagnosticSink, ErrorCode};
use crate::kind::SyntaxKind;
use crate::mode::{ModeAttribute, ModeId, ModeTable};
use crate::tree::{NodeId, NodeStatus, RangeArena, RangeId, TagArena, Tree};

/// A contributed scope tuple, collapsed to its worst case per node (the
/// maximum level and the disjunction of transience across every
/// sub-expression a node's value is built from).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScopeInfo {
    level: i32,
    transient: bool,
}

/// A value with no frame of its own: a denotation, `NIHIL`, `SKIP`, or
/// anything heap-allocated. Always an acceptable destination, never a
/// violation source.
fn primal() -> ScopeInfo {
    ScopeInfo { level: i32::MIN, transient: false }
}

/// Checks every assignation and initialized declaration reachable from
/// `root`'s program body against the scope of its source expression.
#[instrument(level = "debug", skip_all, name = "phase_m_scopecheck")]
pub fn check(
    tree: &mut Tree,
    modes: &ModeTable,
    ranges: &RangeArena,
    tags: &mut TagArena,
    sink: &mut DiagnosticSink,
    root: NodeId,
    top_range: RangeId,
) {
    sink.begin_phase();
    let environs = compute_environs(tree, ranges, tags, root);
    assign_proc_identity_scopes(tree, tags, &environs, root);
    walk(tree, modes, ranges, tags, sink, &environs, root, top_range);
}

/// For every `ROUTINE_TEXT`/`FORMAT_TEXT`, the maximum level strictly less
/// than its own that an applied identifier/operator occurrence reachable
/// from it resolves to — the text's `youngest_environ`. Texts nested inside
/// other texts get their own independent entry; an outer text's entry still
/// counts references made from inside a nested text, since the outer
/// frame must stay alive for as long as anything inside it needs it to.
fn compute_environs(tree: &Tree, ranges: &RangeArena, tags: &TagArena, root: NodeId) -> FxHashMap<NodeId, i32> {
    let mut out = FxHashMap::default();
    collect_environs(tree, ranges, tags, root, &mut out);
    out
}

fn collect_environs(tree: &Tree, ranges: &RangeArena, tags: &TagArena, node: NodeId, out: &mut FxHashMap<NodeId, i32>) {
    if matches!(tree.node(node).kind, SyntaxKind::ROUTINE_TEXT | SyntaxKind::FORMAT_TEXT) {
        if let Some(own_range) = tree.node(node).owns_range {
            let own_level = ranges.get(own_range).level;
            let mut youngest = i32::MIN;
            collect_outside_refs(tree, ranges, tags, node, own_level, &mut youngest);
            out.insert(node, youngest);
        }
    }
    for child in tree.children(node) {
        collect_environs(tree, ranges, tags, child, out);
    }
}

fn collect_outside_refs(tree: &Tree, ranges: &RangeArena, tags: &TagArena, node: NodeId, own_level: i32, youngest: &mut i32) {
    if matches!(tree.node(node).kind, SyntaxKind::IDENTIFIER | SyntaxKind::OPERATOR) {
        if let Some(tag_id) = tree.node(node).tag {
            let tag_level = ranges.get(tags.get(tag_id).table).level;
            if tag_level < own_level && tag_level > *youngest {
                *youngest = tag_level;
            }
        }
    }
    for child in tree.children(node) {
        collect_outside_refs(tree, ranges, tags, child, own_level, youngest);
    }
}

/// A procedure identity declaration's tag never goes through the ordinary
/// escape check — its scope *is* its body's youngest environ, assigned
/// outright.
fn assign_proc_identity_scopes(tree: &Tree, tags: &mut TagArena, environs: &FxHashMap<NodeId, i32>, node: NodeId) {
    if tree.node(node).kind == SyntaxKind::PROC_IDENTITY_DECLARATION {
        let children = tree.children(node);
        let name = children[0];
        let routine_text = children[2];
        if let Some(tag_id) = tree.node(name).tag {
            let youngest = environs.get(&routine_text).copied().unwrap_or(i32::MIN);
            let tag = tags.get_mut(tag_id);
            tag.scope = Some(youngest);
            tag.scope_assigned = true;
        }
    }
    for child in tree.children(node) {
        assign_proc_identity_scopes(tree, tags, environs, child);
    }
}

fn walk(
    tree: &mut Tree,
    modes: &ModeTable,
    ranges: &RangeArena,
    tags: &TagArena,
    sink: &mut DiagnosticSink,
    environs: &FxHashMap<NodeId, i32>,
    node: NodeId,
    enclosing: RangeId,
) {
    let range = tree.node(node).owns_range.unwrap_or(enclosing);
    let kind = tree.node(node).kind;

    match kind {
        SyntaxKind::ASSIGNATION => {
            let children = tree.children(node);
            let dest = scope_of(tree, modes, ranges, tags, environs, children[0], range);
            let rhs = *children.last().unwrap();
            let source = scope_of(tree, modes, ranges, tags, environs, rhs, range);
            report_if_violating(tree, sink, node, dest.level, source);
        }
        SyntaxKind::IDENTITY_DECLARATION => {
            let children = tree.children(node);
            let unit = children[3];
            let dest_level = ranges.get(range).level;
            let source = scope_of(tree, modes, ranges, tags, environs, unit, range);
            report_if_violating(tree, sink, node, dest_level, source);
        }
        SyntaxKind::VARIABLE_DECLARATION => {
            let children = tree.children(node);
            if children.len() == 4 {
                let unit = children[3];
                let dest_level = ranges.get(range).level;
                let source = scope_of(tree, modes, ranges, tags, environs, unit, range);
                report_if_violating(tree, sink, node, dest_level, source);
            }
        }
        _ => {}
    }

    for child in tree.children(node) {
        walk(tree, modes, ranges, tags, sink, environs, child, range);
    }
}

fn report_if_violating(tree: &mut Tree, sink: &mut DiagnosticSink, node: NodeId, dest_level: i32, source: ScopeInfo) {
    if tree.node(node).status.contains(NodeStatus::SCOPE_ERROR) {
        return;
    }
    let range_span = tree.node(node).range;
    let mut reported = false;
    if source.level > dest_level {
        sink.report(Diagnostic::warning(ErrorCode::ValueEscapesScope, range_span));
        reported = true;
    }
    if source.transient {
        sink.report(Diagnostic::error(ErrorCode::TransientNameStored, range_span));
        reported = true;
    }
    if reported {
        tree.node_mut(node).status.insert(NodeStatus::SCOPE_ERROR);
    }
}

/// The scope tuple a node's value is built from. Mirrors `check`'s
/// shape-driven recursion: most node kinds delegate to a fixed rule
/// (generator, identifier, denotation, coercion passthrough); anything else
/// falls back to combining every child's contribution, which is always
/// sound (if imprecise) since primal contributions never raise the result.
fn scope_of(
    tree: &Tree,
    modes: &ModeTable,
    ranges: &RangeArena,
    tags: &TagArena,
    environs: &FxHashMap<NodeId, i32>,
    node: NodeId,
    enclosing: RangeId,
) -> ScopeInfo {
    let kind = tree.node(node).kind;
    if kind.is_denotation() {
        return primal();
    }
    match kind {
        SyntaxKind::NIHIL | SyntaxKind::SKIP | SyntaxKind::EMPTY_SYM | SyntaxKind::JUMP => primal(),

        SyntaxKind::GENERATOR => {
            let children = tree.children(node);
            match tree.node(children[0]).kind {
                SyntaxKind::LOC_SYM => ScopeInfo { level: ranges.get(enclosing).level, transient: false },
                _ => primal(),
            }
        }

        SyntaxKind::IDENTIFIER => {
            let Some(tag_id) = tree.node(node).tag else { return primal() };
            let tag = tags.get(tag_id);
            if tag.scope_assigned {
                return ScopeInfo { level: tag.scope.unwrap_or(i32::MIN), transient: false };
            }
            let decl_level = ranges.get(tag.table).level;
            let is_parameter = tree
                .node(tag.node)
                .parent
                .map(|p| tree.node(p).kind == SyntaxKind::FORMAL_PARAMETER)
                .unwrap_or(false);
            let level = if is_parameter { decl_level - 1 } else { decl_level };
            ScopeInfo { level, transient: false }
        }

        SyntaxKind::ASSIGNATION => {
            let children = tree.children(node);
            scope_of(tree, modes, ranges, tags, environs, children[0], enclosing)
        }

        SyntaxKind::SERIAL_CLAUSE => {
            let children = tree.children(node);
            let last = *children.last().expect("serial clause has at least one item");
            scope_of(tree, modes, ranges, tags, environs, last, enclosing)
        }

        SyntaxKind::CLOSED_CLAUSE | SyntaxKind::ENCLOSED_CLAUSE | SyntaxKind::CAST => {
            let children = tree.children(node);
            let last = *children.last().expect("has an inner clause/unit");
            scope_of(tree, modes, ranges, tags, environs, last, enclosing)
        }

        SyntaxKind::DEREFERENCING
        | SyntaxKind::DEPROCEDURING
        | SyntaxKind::WIDENING
        | SyntaxKind::UNITING
        | SyntaxKind::VOIDING => {
            let children = tree.children(node);
            scope_of(tree, modes, ranges, tags, environs, children[0], enclosing)
        }

        SyntaxKind::ROWING => {
            let children = tree.children(node);
            let inner = scope_of(tree, modes, ranges, tags, environs, children[0], enclosing);
            ScopeInfo { level: inner.level, transient: true }
        }

        SyntaxKind::SLICE => {
            let children = tree.children(node);
            let base = scope_of(tree, modes, ranges, tags, environs, children[0], enclosing);
            let flex = mode_of(tree, children[0]).is_some_and(|m| modes.get(modes.resolve(m)).attribute == ModeAttribute::Flex);
            ScopeInfo { level: base.level, transient: base.transient || flex }
        }

        SyntaxKind::ROUTINE_TEXT | SyntaxKind::OPERATOR_PLAN | SyntaxKind::CALL => primal(),

        _ => {
            let mut result = primal();
            for child in tree.children(node) {
                let s = scope_of(tree, modes, ranges, tags, environs, child, enclosing);
                if s.level > result.level {
                    result.level = s.level;
                }
                result.transient |= s.transient;
            }
            result
        }
    }
}

fn mode_of(tree: &Tree, node: NodeId) -> Option<ModeId> {
    tree.node(node).mode_slot.map(|slot| ModeId::new(slot as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Interner;
    use crate::kind::SyntaxKind;
    use crate::mode::ModeTable;
    use crate::tree::{Tag, TagKind};
    use text_size::TextRange;

    fn leaf(tree: &mut Tree, kind: SyntaxKind) -> NodeId {
        tree.push_leaf(kind, None, TextRange::empty(0.into()))
    }

    #[test]
    fn loc_generator_escaping_to_an_outer_declaration_is_flagged() {
        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let mut ranges = RangeArena::new();
        let mut tags = TagArena::new();
        let modes = ModeTable::new();
        let mut sink = DiagnosticSink::new();

        let top = ranges.push(None, None);
        let inner = ranges.push(Some(top), Some(top));

        let name = interner.intern("r");
        let decl_node = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let tag_id = tags.push(Tag::new(TagKind::Identifier, name, decl_node, top));
        tree.node_mut(decl_node).tag = Some(tag_id);

        let lhs = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        tree.node_mut(lhs).tag = Some(tag_id);
        let becomes = leaf(&mut tree, SyntaxKind::BECOMES_SYM);
        let loc_kw = leaf(&mut tree, SyntaxKind::LOC_SYM);
        let declarer = leaf(&mut tree, SyntaxKind::INT_SYM);
        let generator = tree.wrap(SyntaxKind::GENERATOR, &[loc_kw, declarer]);
        let assignation = tree.wrap(SyntaxKind::ASSIGNATION, &[lhs, becomes, generator]);
        tree.set_owns_range(assignation, inner);

        check(&mut tree, &modes, &ranges, &mut tags, &mut sink, assignation, inner);

        assert!(sink.diagnostics().iter().any(|d| d.code == ErrorCode::ValueEscapesScope));
    }

    #[test]
    fn heap_generator_never_escapes() {
        let mut tree = Tree::new();
        let mut interner = Interner::new();
        let mut ranges = RangeArena::new();
        let mut tags = TagArena::new();
        let modes = ModeTable::new();
        let mut sink = DiagnosticSink::new();

        let top = ranges.push(None, None);
        let inner = ranges.push(Some(top), Some(top));

        let name = interner.intern("r");
        let decl_node = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        let tag_id = tags.push(Tag::new(TagKind::Identifier, name, decl_node, top));

        let lhs = leaf(&mut tree, SyntaxKind::IDENTIFIER);
        tree.node_mut(lhs).tag = Some(tag_id);
        let becomes = leaf(&mut tree, SyntaxKind::BECOMES_SYM);
        let heap_kw = leaf(&mut tree, SyntaxKind::HEAP_SYM);
        let declarer = leaf(&mut tree, SyntaxKind::INT_SYM);
        let generator = tree.wrap(SyntaxKind::GENERATOR, &[heap_kw, declarer]);
        let assignation = tree.wrap(SyntaxKind::ASSIGNATION, &[lhs, becomes, generator]);
        tree.set_owns_range(assignation, inner);

        check(&mut tree, &modes, &ranges, &mut tags, &mut sink, assignation, inner);

        assert!(!sink.diagnostics().iter().any(|d| d.code == ErrorCode::ValueEscapesScope));
    }
}
