//! Mode collector (component H): a tree walk that, for every DECLARER /
//! ROUTINE_TEXT / OPERATOR_PLAN / denotation node, constructs the
//! corresponding mode via mutually recursive helpers.

use tracing::instrument;

use crate::base::Interner;
use crate::diag::{Diagnostic, DiagnosticSink, ErrorCode};
use crate::kind::SyntaxKind;
use crate::tree::{NodeId, TagArena, Tree};

use super::table::{ModeId, ModeTable, PackEntry, StandardKind};

/// Whole-tree driver: walks every declaration, routine text, generator,
/// cast, and denotation reachable from `root`, collecting each one's mode
/// via [`collect_declarer`]/[`denotation_mode`] and attaching it to the
/// declaring tag's `mode` (for named declarations) or the node's own
/// `mode_slot` (for anything consulted by position rather than by tag —
/// a cast, a generator, a denotation). Runs once per program, between
/// reduction (components D–G) and the equivalencer (component I), mirroring
/// the reference's "coerce and assign modes" tree walk.
#[instrument(level = "debug", skip_all, name = "phase_h_mode_collect")]
pub fn collect(
    tree: &mut Tree,
    interner: &Interner,
    modes: &mut ModeTable,
    tags: &mut TagArena,
    sink: &mut DiagnosticSink,
    root: NodeId,
) {
    let mut overflow = Vec::new();
    walk(tree, interner, modes, tags, root, &mut overflow);
    for node in overflow {
        let range = tree.node(node).range;
        sink.report(Diagnostic::warning(ErrorCode::TagNotPortable, range));
    }
}

fn tag_mode(modes_slot: ModeId) -> u32 {
    modes_slot.index() as u32
}

fn walk(tree: &mut Tree, interner: &Interner, modes: &mut ModeTable, tags: &mut TagArena, node: NodeId, overflow: &mut Vec<NodeId>) {
    let kind = tree.node(node).kind;
    match kind {
        SyntaxKind::MODE_DECLARATION => {
            let children = tree.children(node);
            if let (Some(&name_node), Some(&declarer)) = (children.first(), children.get(2)) {
                let mode = collect_declarer_mut(tree, interner, modes, declarer, overflow);
                if let Some(tag_id) = tree.node(name_node).tag {
                    tags.get_mut(tag_id).mode = Some(tag_mode(mode));
                }
            }
        }
        SyntaxKind::IDENTITY_DECLARATION => {
            let children = tree.children(node);
            if let (Some(&declarer), Some(&name_node)) = (children.first(), children.get(1)) {
                let mode = collect_declarer_mut(tree, interner, modes, declarer, overflow);
                if let Some(tag_id) = tree.node(name_node).tag {
                    tags.get_mut(tag_id).mode = Some(tag_mode(mode));
                }
                tree.node_mut(node).mode_slot = Some(tag_mode(mode));
            }
        }
        // A variable declaration's identifier names a location, not a
        // value: `M x` binds `x` to `REF M` ("Variables
        // `M x` yield a REF M"), unlike an identity declaration's `x` which
        // is bound directly to `M`.
        SyntaxKind::VARIABLE_DECLARATION => {
            let children = tree.children(node);
            if let (Some(&declarer), Some(&name_node)) = (children.first(), children.get(1)) {
                let mode = collect_declarer_mut(tree, interner, modes, declarer, overflow);
                let ref_mode = modes.reff(mode);
                if let Some(tag_id) = tree.node(name_node).tag {
                    tags.get_mut(tag_id).mode = Some(tag_mode(ref_mode));
                }
                tree.node_mut(node).mode_slot = Some(tag_mode(ref_mode));
            }
        }
        SyntaxKind::PROC_IDENTITY_DECLARATION => {
            let children = tree.children(node);
            if let (Some(&name_node), Some(&routine_text)) = (children.first(), children.get(2)) {
                let mode = collect_routine_plan(tree, interner, modes, routine_text, overflow);
                if let Some(tag_id) = tree.node(name_node).tag {
                    tags.get_mut(tag_id).mode = Some(tag_mode(mode));
                }
            }
        }
        // `PROC p := ...` binds `p` to `REF PROC ...`, the variable-form
        // counterpart of `PROC_IDENTITY_DECLARATION` above.
        SyntaxKind::PROC_VARIABLE_DECLARATION => {
            let children = tree.children(node);
            if let (Some(&name_node), Some(&routine_text)) = (children.first(), children.get(2)) {
                let mode = collect_routine_plan(tree, interner, modes, routine_text, overflow);
                let ref_mode = modes.reff(mode);
                if let Some(tag_id) = tree.node(name_node).tag {
                    tags.get_mut(tag_id).mode = Some(tag_mode(ref_mode));
                }
            }
        }
        SyntaxKind::OPERATOR_DECLARATION => {
            let children = tree.children(node);
            if let (Some(&name_node), Some(&plan)) = (children.first(), children.get(2)) {
                let mode = collect_routine_plan(tree, interner, modes, plan, overflow);
                if let Some(tag_id) = tree.node(name_node).tag {
                    tags.get_mut(tag_id).mode = Some(tag_mode(mode));
                }
            }
        }
        SyntaxKind::ROUTINE_TEXT | SyntaxKind::OPERATOR_PLAN => {
            let mode = collect_routine_plan(tree, interner, modes, node, overflow);
            tree.node_mut(node).mode_slot = Some(tag_mode(mode));
        }
        SyntaxKind::GENERATOR => {
            let children = tree.children(node);
            if let Some(&declarer) = children.get(1) {
                let mode = collect_declarer_mut(tree, interner, modes, declarer, overflow);
                tree.node_mut(node).mode_slot = Some(tag_mode(mode));
            }
        }
        SyntaxKind::CAST => {
            let children = tree.children(node);
            if let Some(&declarer) = children.first() {
                let mode = collect_declarer_mut(tree, interner, modes, declarer, overflow);
                tree.node_mut(node).mode_slot = Some(tag_mode(mode));
            }
        }
        k if k.is_denotation() => {
            let mode = denotation_mode(modes, k);
            tree.node_mut(node).mode_slot = Some(tag_mode(mode));
        }
        SyntaxKind::SKIP => {
            let mode = modes.hip();
            tree.node_mut(node).mode_slot = Some(tag_mode(mode));
        }
        SyntaxKind::NIHIL => {
            let mode = modes.undefined();
            tree.node_mut(node).mode_slot = Some(tag_mode(mode));
        }
        _ => {}
    }

    // ROUTINE_TEXT/OPERATOR_PLAN's declarer subtrees were already collected
    // above as part of `collect_routine_plan`; still recurse into their
    // body unit (and every other node's children) so nested declarations
    // are found.
    for child in tree.children(node) {
        walk(tree, interner, modes, tags, child, overflow);
    }
}

/// `collect_declarer` takes `&Tree`; this wraps it so callers holding
/// `&mut Tree` (the driver) don't have to juggle two borrows by hand.
fn collect_declarer_mut(
    tree: &mut Tree,
    interner: &Interner,
    modes: &mut ModeTable,
    node: NodeId,
    overflow: &mut Vec<NodeId>,
) -> ModeId {
    let tree_ref: &Tree = tree;
    collect_declarer(tree_ref, interner, modes, node, &mut |n| overflow.push(n))
}

/// A `ROUTINE_TEXT`/`OPERATOR_PLAN`'s mode: its `FORMAL_PARAMETER` pack plus
/// whatever declarer sits right before its `COLON` (absent for a routine
/// text with no explicit result declarer, which yields `VOID`).
fn collect_routine_plan(tree: &mut Tree, interner: &Interner, modes: &mut ModeTable, node: NodeId, overflow: &mut Vec<NodeId>) -> ModeId {
    let children = tree.children(node);
    let colon_idx = children.iter().position(|&c| tree.node(c).kind == SyntaxKind::COLON);
    let result = match colon_idx {
        Some(idx) if idx > 0 && tree.node(children[idx - 1]).kind != SyntaxKind::CLOSE_PAREN => {
            collect_declarer_mut(tree, interner, modes, children[idx - 1], overflow)
        }
        _ => modes.void(),
    };
    let tree_ref: &Tree = tree;
    let pack = collect_formal_pack(tree_ref, interner, modes, node, &mut |n| overflow.push(n));
    modes.proc_mode(Some(node), pack, result)
}

/// Longety/shortety counted while walking a `LONG`/`SHORT`-prefixed
/// declarer; clamped to the two extra precisions allowed, with a
/// caller-supplied callback for the port-check warning on overflow.
#[derive(Debug, Clone, Copy, Default)]
struct Longety(i32);

impl Longety {
    fn clamp(self) -> (i32, bool) {
        if self.0 > 2 {
            (2, true)
        } else if self.0 < -1 {
            (-1, true)
        } else {
            (self.0, false)
        }
    }
}

/// Walks `node` (expected to be a DECLARER subtree) and returns its mode.
/// `on_overflow` is called once per `LONG LONG LONG ...` clamp so the
/// caller can raise a port-check warning.
pub fn collect_declarer(
    tree: &Tree,
    interner: &Interner,
    modes: &mut ModeTable,
    node: NodeId,
    on_overflow: &mut dyn FnMut(NodeId),
) -> ModeId {
    let kind = tree.node(node).kind;
    match kind {
        SyntaxKind::VOID_SYM => modes.void(),
        SyntaxKind::STANDARD_DECLARER => collect_standard(tree, interner, modes, node, on_overflow),
        SyntaxKind::REF_DECLARER => {
            let children = tree.children(node);
            let inner = children
                .last()
                .copied()
                .unwrap_or(node);
            let sub = collect_declarer(tree, interner, modes, inner, on_overflow);
            modes.reff(sub)
        }
        SyntaxKind::FLEX_DECLARER => {
            let children = tree.children(node);
            let inner = children.last().copied().unwrap_or(node);
            let sub = collect_declarer(tree, interner, modes, inner, on_overflow);
            modes.flex(sub)
        }
        SyntaxKind::ROW_DECLARER => {
            let children = tree.children(node);
            // One BOUND child per dimension, whether or not it carries an
            // explicit bound (`[]INT` is one empty BOUND, `[,]INT` is two);
            // commas are pure separators and never counted.
            let dim = children
                .iter()
                .filter(|&&c| tree.node(c).kind == SyntaxKind::BOUND)
                .count()
                .max(1) as i32;
            let inner = children.last().copied().unwrap_or(node);
            let sub = collect_declarer(tree, interner, modes, inner, on_overflow);
            modes.row(dim, sub)
        }
        SyntaxKind::STRUCT_DECLARER => {
            let pack = collect_pack(tree, interner, modes, node, on_overflow);
            modes.struct_mode(node, pack)
        }
        SyntaxKind::UNION_DECLARER => {
            let pack = collect_pack(tree, interner, modes, node, on_overflow);
            modes.union_mode(node, pack)
        }
        SyntaxKind::PROC_DECLARER => {
            let children = tree.children(node);
            let pack = collect_formal_pack(tree, interner, modes, node, on_overflow);
            let result = children
                .last()
                .map(|&c| collect_declarer(tree, interner, modes, c, on_overflow))
                .unwrap_or_else(|| modes.void());
            modes.proc_mode(Some(node), pack, result)
        }
        SyntaxKind::INDICANT | SyntaxKind::BOLD_TAG => {
            // Left to the tag binder (component J): an applied indicant
            // occurrence's mode is its defining MODE declaration's mode,
            // which may not exist yet at collection time. The collector
            // registers a placeholder that equivalence resolves.
            modes.fresh_indicant(node)
        }
        _ => modes.error(),
    }
}

/// A standard (possibly `LONG`/`SHORT`-qualified) declarer: `INT`,
/// `LONG REAL`, `SHORT SHORT INT`, …
fn collect_standard(
    tree: &Tree,
    interner: &Interner,
    modes: &mut ModeTable,
    node: NodeId,
    on_overflow: &mut dyn FnMut(NodeId),
) -> ModeId {
    let children = tree.children(node);
    let mut longety = Longety::default();
    let mut standard_kind = None;
    for child in &children {
        match tree.node(*child).kind {
            SyntaxKind::LONG_SYM => longety.0 += 1,
            SyntaxKind::SHORT_SYM => longety.0 -= 1,
            SyntaxKind::INT_SYM => standard_kind = Some(StandardKind::Int),
            SyntaxKind::REAL_SYM => standard_kind = Some(StandardKind::Real),
            SyntaxKind::COMPLEX_SYM => standard_kind = Some(StandardKind::Complex),
            SyntaxKind::BOOL_SYM => standard_kind = Some(StandardKind::Bool),
            SyntaxKind::CHAR_SYM => standard_kind = Some(StandardKind::Char),
            SyntaxKind::BITS_SYM => standard_kind = Some(StandardKind::Bits),
            SyntaxKind::BYTES_SYM => standard_kind = Some(StandardKind::Bytes),
            SyntaxKind::STRING_SYM => standard_kind = Some(StandardKind::String),
            SyntaxKind::FORMAT_SYM => standard_kind = Some(StandardKind::Format),
            SyntaxKind::FILE_SYM => standard_kind = Some(StandardKind::File),
            _ => {}
        }
    }
    let (clamped, overflowed) = longety.clamp();
    if overflowed {
        on_overflow(node);
    }
    let kind = standard_kind.unwrap_or(StandardKind::Int);
    let _ = interner;
    modes.standard(kind, clamped)
}

fn collect_pack(
    tree: &Tree,
    interner: &Interner,
    modes: &mut ModeTable,
    node: NodeId,
    on_overflow: &mut dyn FnMut(NodeId),
) -> Vec<PackEntry> {
    let mut out = Vec::new();
    for field in tree.children(node) {
        if tree.node(field).kind != SyntaxKind::FIELD {
            continue;
        }
        let field_children = tree.children(field);
        let Some(&declarer) = field_children.first() else { continue };
        let mode = collect_declarer(tree, interner, modes, declarer, on_overflow);
        let names: Vec<NodeId> = field_children[1..]
            .iter()
            .copied()
            .filter(|&n| tree.node(n).kind == SyntaxKind::IDENTIFIER)
            .collect();
        if names.is_empty() {
            // UNION members are conventionally unnamed; STRUCT fields never
            // are, so an empty name list only happens for a union.
            out.push(PackEntry {
                mode,
                field_name: None,
                defining_node: Some(field),
            });
        } else {
            for name_node in names {
                out.push(PackEntry {
                    mode,
                    field_name: tree.node(name_node).spelling,
                    defining_node: Some(name_node),
                });
            }
        }
    }
    out
}

fn collect_formal_pack(
    tree: &Tree,
    interner: &Interner,
    modes: &mut ModeTable,
    node: NodeId,
    on_overflow: &mut dyn FnMut(NodeId),
) -> Vec<PackEntry> {
    let mut out = Vec::new();
    for param in tree.children(node) {
        if tree.node(param).kind != SyntaxKind::FORMAL_PARAMETER {
            continue;
        }
        let param_children = tree.children(param);
        let Some(&declarer) = param_children.first() else { continue };
        let mode = collect_declarer(tree, interner, modes, declarer, on_overflow);
        out.push(PackEntry {
            mode,
            field_name: None,
            defining_node: Some(param),
        });
    }
    out
}

/// Mode of a denotation literal, from its `SyntaxKind` alone (longety is
/// folded into the spelling by the lexer for radix/exponent forms, so a
/// denotation never needs a declarer walk).
pub fn denotation_mode(modes: &mut ModeTable, kind: SyntaxKind) -> ModeId {
    match kind {
        SyntaxKind::INT_DENOTATION => modes.standard(StandardKind::Int, 0),
        SyntaxKind::REAL_DENOTATION => modes.standard(StandardKind::Real, 0),
        SyntaxKind::BITS_DENOTATION => modes.standard(StandardKind::Bits, 0),
        SyntaxKind::STRING_DENOTATION => modes.standard(StandardKind::String, 0),
        _ => modes.error(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::DiagnosticSink;
    use text_size::TextRange;

    fn leaf(tree: &mut Tree, kind: SyntaxKind) -> NodeId {
        tree.push_leaf(kind, None, TextRange::empty(0.into()))
    }

    #[test]
    fn standard_int_declarer() {
        let mut tree = Tree::new();
        let int_sym = leaf(&mut tree, SyntaxKind::INT_SYM);
        let declarer = tree.wrap(SyntaxKind::STANDARD_DECLARER, &[int_sym]);
        let interner = Interner::new();
        let mut modes = ModeTable::new();
        let mode = collect_declarer(&tree, &interner, &mut modes, declarer, &mut |_| {});
        assert_eq!(modes.get(mode).standard, Some(StandardKind::Int));
        assert_eq!(modes.get(mode).dim, 0);
    }

    #[test]
    fn long_real_declarer() {
        let mut tree = Tree::new();
        let long_sym = leaf(&mut tree, SyntaxKind::LONG_SYM);
        let real_sym = leaf(&mut tree, SyntaxKind::REAL_SYM);
        let declarer = tree.wrap(SyntaxKind::STANDARD_DECLARER, &[long_sym, real_sym]);
        let interner = Interner::new();
        let mut modes = ModeTable::new();
        let mode = collect_declarer(&tree, &interner, &mut modes, declarer, &mut |_| {});
        assert_eq!(modes.get(mode).standard, Some(StandardKind::Real));
        assert_eq!(modes.get(mode).dim, 1);
    }

    #[test]
    fn triple_long_clamps_and_warns() {
        let mut tree = Tree::new();
        let l1 = leaf(&mut tree, SyntaxKind::LONG_SYM);
        let l2 = leaf(&mut tree, SyntaxKind::LONG_SYM);
        let l3 = leaf(&mut tree, SyntaxKind::LONG_SYM);
        let int_sym = leaf(&mut tree, SyntaxKind::INT_SYM);
        let declarer = tree.wrap(SyntaxKind::STANDARD_DECLARER, &[l1, l2, l3, int_sym]);
        let interner = Interner::new();
        let mut modes = ModeTable::new();
        let mut overflowed = false;
        let mode = collect_declarer(&tree, &interner, &mut modes, declarer, &mut |_| overflowed = true);
        assert!(overflowed);
        assert_eq!(modes.get(mode).dim, 2);
        let _ = DiagnosticSink::new();
    }

    #[test]
    fn ref_of_standard() {
        let mut tree = Tree::new();
        let int_sym = leaf(&mut tree, SyntaxKind::INT_SYM);
        let declarer = tree.wrap(SyntaxKind::STANDARD_DECLARER, &[int_sym]);
        let ref_declarer = tree.wrap(SyntaxKind::REF_DECLARER, &[declarer]);
        let interner = Interner::new();
        let mut modes = ModeTable::new();
        let mode = collect_declarer(&tree, &interner, &mut modes, ref_declarer, &mut |_| {});
        assert_eq!(modes.get(mode).attribute, super::super::table::ModeAttribute::Ref);
    }
}
