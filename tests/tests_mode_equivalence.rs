//! Mode table / equivalencer properties (component I), exercised directly
//! against the mode arena rather than through a full compilation.

use a68f::diag::DiagnosticSink;
use a68f::kind::SyntaxKind;
use a68f::mode::{is_equivalent, run_equivalence, ModeTable, PackEntry, StandardKind};
use a68f::tree::Tree;
use text_size::TextRange;

#[test]
fn equivalencer_is_idempotent() {
    let mut table = ModeTable::new();
    let int_mode = table.standard(StandardKind::Int, 0);
    let row = table.row(1, int_mode);
    let _ = table.reff(row);

    let mut sink = DiagnosticSink::new();
    run_equivalence(&mut table, &mut sink);
    let len_after_first = table.len();

    run_equivalence(&mut table, &mut sink);
    assert_eq!(table.len(), len_after_first, "second equivalence pass discovered new modes");
}

#[test]
fn two_isomorphic_cyclic_structs_are_equivalent_without_hanging() {
    // Two independently-registered copies of MODE L = STRUCT (INT v, REF L n);
    // forces the recursive comparison to revisit the pair through REF before
    // the postulate set lets it stop instead of looping forever.
    let mut table = ModeTable::new();
    let int_mode = table.standard(StandardKind::Int, 0);
    let mut tree = Tree::new();
    let node = tree.push_leaf(SyntaxKind::INDICANT, None, TextRange::empty(0.into()));

    let build_cycle = |table: &mut ModeTable| {
        let l = table.fresh_indicant(node);
        let ref_l = table.reff(l);
        let pack = vec![
            PackEntry { mode: int_mode, field_name: None, defining_node: None },
            PackEntry { mode: ref_l, field_name: None, defining_node: None },
        ];
        let s = table.struct_mode(node, pack);
        table.get_mut(l).sub = Some(s);
        s
    };
    let s1 = build_cycle(&mut table);
    let s2 = build_cycle(&mut table);

    let mut postulates = Vec::new();
    assert!(is_equivalent(&table, s1, s2, &mut postulates));
    assert!(postulates.is_empty(), "postulate stack must be popped back to empty");
}

#[test]
fn distinct_standard_modes_are_never_equivalent() {
    let mut table = ModeTable::new();
    let int_mode = table.standard(StandardKind::Int, 0);
    let real_mode = table.standard(StandardKind::Real, 0);

    let mut postulates = Vec::new();
    assert!(!is_equivalent(&table, int_mode, real_mode, &mut postulates));
}
