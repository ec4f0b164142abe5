//! VICTAL checker (component K): which `BOUND` shapes are legal depends on
//! where a declarer sits. A formal-parameter declarer (a `PROC` pack entry,
//! named or not) may only name a row's dimension, never its bounds — so
//! `ROW_DECLARER`'s `BOUND` children must be empty there, unlike everywhere
//! else a declarer can appear.
//!
//! Dispatches per `SyntaxKind` and recurses into children explicitly rather
//! than blindly; the context-sensitive bound check below switches context
//! exactly at `FORMAL_PARAMETER` boundaries.

use tracing::instrument;

use crate::diag::{Diagnostic, DiagnosticSink, ErrorCode};
use crate::kind::SyntaxKind;
use crate::tree::{NodeId, Tree};

/// Which of VICTAL's three declarer positions a `BOUND` was found in.
/// `Virtual` (a specifier's declarer, bounds restricted to empty-or-upper)
/// has no producing position in this grammar's conformity clause, which
/// takes plain units rather than `declarer identifier` specifiers — kept
/// here for the arity the name promises, matched exhaustively below, never
/// constructed by `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Actual,
    Formal,
    Virtual,
}

/// Walks every declarer reachable from `root`, reporting
/// [`ErrorCode::DeclarerShapeMismatch`] wherever a `BOUND`'s shape does not
/// fit its context.
#[instrument(level = "debug", skip_all, name = "phase_k_victal")]
pub fn check(tree: &Tree, sink: &mut DiagnosticSink, root: NodeId) {
    sink.begin_phase();
    walk(tree, sink, root, Context::Actual);
}

fn walk(tree: &Tree, sink: &mut DiagnosticSink, node: NodeId, context: Context) {
    let kind = tree.node(node).kind;

    if kind == SyntaxKind::FORMAL_PARAMETER {
        if let Some(declarer) = tree.children(node).first().copied() {
            walk(tree, sink, declarer, Context::Formal);
        }
        return; // the name child, if any, is not a declarer
    }

    if kind == SyntaxKind::ROW_DECLARER {
        for child in tree.children(node) {
            if tree.node(child).kind == SyntaxKind::BOUND {
                check_bound(tree, sink, child, context);
            }
        }
    }

    for child in tree.children(node) {
        walk(tree, sink, child, context);
    }
}

fn check_bound(tree: &Tree, sink: &mut DiagnosticSink, bound: NodeId, context: Context) {
    let arity = tree.children(bound).len();
    let offending = match context {
        Context::Actual => false,
        Context::Formal => arity != 0,
        Context::Virtual => arity == 3,
    };
    if offending {
        sink.report(Diagnostic::error(ErrorCode::DeclarerShapeMismatch, tree.node(bound).range));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_size::TextRange;

    fn leaf(tree: &mut Tree, kind: SyntaxKind) -> NodeId {
        tree.push_leaf(kind, None, TextRange::empty(0.into()))
    }

    fn bound_with_children(tree: &mut Tree, n: usize) -> NodeId {
        if n == 0 {
            return leaf(tree, SyntaxKind::BOUND);
        }
        let children: Vec<NodeId> = (0..n).map(|_| leaf(tree, SyntaxKind::INT_DENOTATION)).collect();
        tree.wrap(SyntaxKind::BOUND, &children)
    }

    #[test]
    fn actual_context_accepts_any_bound_shape() {
        let mut tree = Tree::new();
        let bound = bound_with_children(&mut tree, 3);
        let int_sym = leaf(&mut tree, SyntaxKind::INT_SYM);
        let declarer = tree.wrap(SyntaxKind::STANDARD_DECLARER, &[int_sym]);
        let row = tree.wrap(SyntaxKind::ROW_DECLARER, &[bound, declarer]);
        let mut sink = DiagnosticSink::new();
        check(&tree, &mut sink, row);
        assert!(!sink.has_errors());
    }

    #[test]
    fn formal_context_rejects_non_empty_bound() {
        let mut tree = Tree::new();
        let bound = bound_with_children(&mut tree, 1);
        let int_sym = leaf(&mut tree, SyntaxKind::INT_SYM);
        let declarer = tree.wrap(SyntaxKind::STANDARD_DECLARER, &[int_sym]);
        let row = tree.wrap(SyntaxKind::ROW_DECLARER, &[bound, declarer]);
        let param = tree.wrap(SyntaxKind::FORMAL_PARAMETER, &[row]);
        let mut sink = DiagnosticSink::new();
        check(&tree, &mut sink, param);
        assert!(sink.has_errors());
    }

    #[test]
    fn formal_context_accepts_empty_bound() {
        let mut tree = Tree::new();
        let bound = bound_with_children(&mut tree, 0);
        let int_sym = leaf(&mut tree, SyntaxKind::INT_SYM);
        let declarer = tree.wrap(SyntaxKind::STANDARD_DECLARER, &[int_sym]);
        let row = tree.wrap(SyntaxKind::ROW_DECLARER, &[bound, declarer]);
        let param = tree.wrap(SyntaxKind::FORMAL_PARAMETER, &[row]);
        let mut sink = DiagnosticSink::new();
        check(&tree, &mut sink, param);
        assert!(!sink.has_errors());
    }

    #[test]
    fn nested_formal_parameter_inside_actual_context_still_restricted() {
        // `REF PROC(INT)INT x`: the outer REF_DECLARER is Actual context,
        // but its PROC_DECLARER's own FORMAL_PARAMETER pack is still Formal.
        let mut tree = Tree::new();
        let bound = bound_with_children(&mut tree, 1);
        let int_sym = leaf(&mut tree, SyntaxKind::INT_SYM);
        let row_declarer_inner = tree.wrap(SyntaxKind::STANDARD_DECLARER, &[int_sym]);
        let row = tree.wrap(SyntaxKind::ROW_DECLARER, &[bound, row_declarer_inner]);
        let param = tree.wrap(SyntaxKind::FORMAL_PARAMETER, &[row]);
        let result_int = leaf(&mut tree, SyntaxKind::INT_SYM);
        let result_declarer = tree.wrap(SyntaxKind::STANDARD_DECLARER, &[result_int]);
        let proc_declarer = tree.wrap(SyntaxKind::PROC_DECLARER, &[param, result_declarer]);
        let ref_declarer = tree.wrap(SyntaxKind::REF_DECLARER, &[proc_declarer]);

        let mut sink = DiagnosticSink::new();
        check(&tree, &mut sink, ref_declarer);
        assert!(sink.has_errors());
    }
}
