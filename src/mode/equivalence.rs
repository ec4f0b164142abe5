//! Mode equivalencer (component I): absorbs/contracts unions, derives
//! REF/ROW/FLEX/NAME/MULTIPLE/DEFLEXED/TRIM relationships, resolves
//! indicants, tests structural equivalence of potentially cyclic mode
//! graphs under Koster's co-induction, and checks well-formedness.
//!
//! The postulate stack is pushed on entry to [`is_equivalent`] and popped on
//! return regardless of outcome, so the co-inductive test
//! itself terminates on a cyclic graph without ever hashing the graph
//! structurally, since a REF/STRUCT pair can refer back to itself.

use rustc_hash::FxHashSet;
use tracing::instrument;

use crate::diag::{Diagnostic, DiagnosticSink, ErrorCode};

use super::table::{Deflexing, ModeAttribute, ModeId, ModeTable};

const MAX_ITERATIONS: usize = 64;

/// Runs the equivalencer to a fixed point: absorb/contract unions, derive
/// the REF/ROW/FLEX/NAME/MULTIPLE/TRIM relationships, resolve indicants,
/// collapse structurally-equivalent modes, then check well-formedness.
/// Idempotent: calling this twice in a row on an already-stable table
/// discovers no new equivalents.
#[instrument(level = "debug", skip_all, name = "phase_i_mode_equivalence")]
pub fn run(table: &mut ModeTable, sink: &mut DiagnosticSink) {
    let mut iteration = 0;
    loop {
        iteration += 1;
        let before = table.len();

        absorb_and_contract_unions(table, sink);
        derive_relationships(table);
        resolve_indicants(table, sink);
        let collapsed = collapse_equivalent_pairs(table);

        let stable = table.len() == before && !collapsed;
        if stable || iteration >= MAX_ITERATIONS {
            break;
        }
    }
    check_well_formedness(table, sink);
}

/// UNIONs absorb nested UNIONs (no UNION inside UNION) and contract
/// duplicate members; a UNION left with exactly one member is replaced by
/// that member via `equivalent`.
fn absorb_and_contract_unions(table: &mut ModeTable, sink: &mut DiagnosticSink) {
    let union_ids: Vec<ModeId> = table
        .iter_ids()
        .filter(|&id| table.get(id).attribute == ModeAttribute::Union && table.get(id).equivalent.is_none())
        .collect();

    for id in union_ids {
        let mut members: Vec<ModeId> = Vec::new();
        let pack = table.get(id).pack.clone();
        for entry in &pack {
            let resolved = table.resolve(entry.mode);
            if table.get(resolved).attribute == ModeAttribute::Union {
                for inner in table.get(resolved).pack.clone() {
                    push_unique(table, &mut members, table.resolve(inner.mode));
                }
            } else {
                push_unique(table, &mut members, resolved);
            }
        }

        if members.len() == 1 {
            table.get_mut(id).equivalent = Some(members[0]);
            continue;
        }

        if members.iter().any(|&m| is_firmly_related_to_any(table, m, &members)) {
            sink.report(Diagnostic::error(
                ErrorCode::UnionComponentRelation,
                text_size::TextRange::empty(0.into()),
            ));
        }

        table.get_mut(id).pack = members
            .into_iter()
            .map(|m| super::table::PackEntry {
                mode: m,
                field_name: None,
                defining_node: None,
            })
            .collect();
    }
}

fn push_unique(table: &ModeTable, members: &mut Vec<ModeId>, candidate: ModeId) {
    if !members.iter().any(|&m| m == candidate) {
        members.push(candidate);
        let _ = table;
    }
}

fn is_firmly_related_to_any(table: &ModeTable, m: ModeId, members: &[ModeId]) -> bool {
    for &other in members {
        if other == m {
            continue;
        }
        if firmly_related(table, m, other) {
            return true;
        }
    }
    false
}

/// Two modes are "firmly related" if one derefs-to-the-other under FIRM
/// coercion (e.g. `REF INT` and `INT` inside the same UNION), or one is a
/// REF to a subset union containing the other.
fn firmly_related(table: &ModeTable, a: ModeId, b: ModeId) -> bool {
    let mut depref = a;
    loop {
        if depref == b {
            return true;
        }
        let m = table.get(depref);
        match m.attribute {
            ModeAttribute::Ref => depref = m.sub.unwrap(),
            _ => break,
        }
    }
    let mut depref = b;
    loop {
        if depref == a {
            return true;
        }
        let m = table.get(depref);
        match m.attribute {
            ModeAttribute::Ref => depref = m.sub.unwrap(),
            _ => break,
        }
    }
    false
}

/// Computes `deflexed`, `name`, `multiple`, `rowed`, `trim` for every mode
/// that needs them.
fn derive_relationships(table: &mut ModeTable) {
    let ids: Vec<ModeId> = table.iter_ids().collect();
    for id in ids {
        let attribute = table.get(id).attribute;
        match attribute {
            ModeAttribute::Flex => {
                let sub = table.get(id).sub.unwrap();
                table.get_mut(id).deflexed = Some(sub);
                table.get_mut(id).trim = Some(sub);
            }
            ModeAttribute::Ref => {
                let sub = table.get(id).sub.unwrap();
                let sub_resolved = table.resolve(sub);
                let sub_attribute = table.get(sub_resolved).attribute;
                match sub_attribute {
                    ModeAttribute::Flex => {
                        let inner = table.get(sub_resolved).sub.unwrap();
                        let deflexed_ref = table.reff(inner);
                        table.get_mut(id).deflexed = Some(deflexed_ref);
                        table.get_mut(id).trim = Some(deflexed_ref);
                    }
                    ModeAttribute::Struct => {
                        table.get_mut(id).name = Some(id);
                    }
                    ModeAttribute::Row => {
                        table.get_mut(id).trim = Some(id);
                    }
                    _ => {}
                }
            }
            ModeAttribute::Struct => {
                // `multiple`: the row-of-struct inverse, if one was ever
                // requested (derived lazily by `mode::collector` when a
                // `[...] STRUCT(...)` declarer is collected); left `None`
                // until that happens.
            }
            ModeAttribute::Row => {
                let sub = table.get(id).sub.unwrap();
                let sub_resolved = table.resolve(sub);
                if table.get(sub_resolved).attribute == ModeAttribute::Struct {
                    table.get_mut(sub_resolved).multiple = Some(id);
                }
            }
            _ => {}
        }
    }
}

/// Resolves every `Indicant` mode to its declarer's mode by repeatedly
/// following `equivalent`; reports `UnresolvedIndicant` for one that never
/// settles (a `MODE` declared but never given a right-hand declarer).
fn resolve_indicants(table: &mut ModeTable, sink: &mut DiagnosticSink) {
    let indicant_ids: Vec<ModeId> = table
        .iter_ids()
        .filter(|&id| table.get(id).attribute == ModeAttribute::Indicant)
        .collect();
    for id in indicant_ids {
        if table.get(id).equivalent.is_none() && table.get(id).sub.is_some() {
            let sub = table.get(id).sub.unwrap();
            table.get_mut(id).equivalent = Some(sub);
        }
        if table.get(id).equivalent.is_none() {
            sink.report(Diagnostic::error(
                ErrorCode::UnresolvedIndicant,
                text_size::TextRange::empty(0.into()),
            ));
        }
    }
}

/// Pairwise-tests every not-yet-collapsed STRUCT/UNION/PROC mode against
/// every other of the same attribute; a matching pair collapses the older
/// representative's `equivalent` onto the newer. Returns whether any new
/// collapse happened this call, so `run`'s fixed-point loop can detect
/// convergence.
fn collapse_equivalent_pairs(table: &mut ModeTable) -> bool {
    let candidates: Vec<ModeId> = table
        .iter_ids()
        .filter(|&id| {
            matches!(
                table.get(id).attribute,
                ModeAttribute::Struct | ModeAttribute::Union | ModeAttribute::Proc
            ) && table.get(id).equivalent.is_none()
        })
        .collect();

    let mut changed = false;
    for i in 0..candidates.len() {
        let a = candidates[i];
        if table.get(a).equivalent.is_some() {
            continue;
        }
        for &b in &candidates[i + 1..] {
            if table.get(b).equivalent.is_some() || table.get(a).attribute != table.get(b).attribute {
                continue;
            }
            let mut postulates = Vec::new();
            if is_equivalent(table, a, b, &mut postulates) {
                table.get_mut(b).equivalent = Some(a);
                changed = true;
            }
        }
    }
    changed
}

/// Co-inductive structural equivalence test: pushes the assumption `(a, b)`
/// before recursing into sub-modes and pops it on every return path, so a
/// cyclic graph (e.g. `STRUCT(INT v, REF L n)` where `L = STRUCT(...)`)
/// terminates instead of looping — if the recursion re-enters comparing `a`
/// and `b` again, the postulate already on the stack settles it as equal
/// without re-descending.
pub fn is_equivalent(table: &ModeTable, a: ModeId, b: ModeId, postulates: &mut Vec<(ModeId, ModeId)>) -> bool {
    let a = table.resolve(a);
    let b = table.resolve(b);
    if a == b {
        return true;
    }
    if postulates.contains(&(a, b)) || postulates.contains(&(b, a)) {
        return true;
    }

    let ma = table.get(a);
    let mb = table.get(b);
    if ma.attribute != mb.attribute {
        return false;
    }

    postulates.push((a, b));
    let result = match ma.attribute {
        ModeAttribute::Standard => ma.standard == mb.standard && ma.dim == mb.dim,
        ModeAttribute::Void | ModeAttribute::Hip | ModeAttribute::Undefined | ModeAttribute::Error | ModeAttribute::Rows => {
            true
        }
        ModeAttribute::Ref | ModeAttribute::Flex => {
            is_equivalent(table, ma.sub.unwrap(), mb.sub.unwrap(), postulates)
        }
        ModeAttribute::Row => ma.dim == mb.dim && is_equivalent(table, ma.sub.unwrap(), mb.sub.unwrap(), postulates),
        ModeAttribute::Struct => {
            ma.pack.len() == mb.pack.len()
                && ma
                    .pack
                    .iter()
                    .zip(mb.pack.iter())
                    .all(|(pa, pb)| pa.field_name == pb.field_name && is_equivalent(table, pa.mode, pb.mode, postulates))
        }
        ModeAttribute::Union => {
            ma.pack.len() == mb.pack.len()
                && ma.pack.iter().all(|pa| {
                    mb.pack
                        .iter()
                        .any(|pb| is_equivalent(table, pa.mode, pb.mode, postulates))
                })
                && mb.pack.iter().all(|pb| {
                    ma.pack
                        .iter()
                        .any(|pa| is_equivalent(table, pa.mode, pb.mode, postulates))
                })
        }
        ModeAttribute::Proc => {
            ma.pack.len() == mb.pack.len()
                && ma
                    .pack
                    .iter()
                    .zip(mb.pack.iter())
                    .all(|(pa, pb)| is_equivalent(table, pa.mode, pb.mode, postulates))
                && is_equivalent(table, ma.sub.unwrap(), mb.sub.unwrap(), postulates)
        }
        ModeAttribute::Indicant => true, // unresolved indicants only reach here pre-resolution; treated as opaque
        ModeAttribute::SeriesMode | ModeAttribute::StowedMode => {
            ma.pack.len() == mb.pack.len()
                && ma
                    .pack
                    .iter()
                    .zip(mb.pack.iter())
                    .all(|(pa, pb)| is_equivalent(table, pa.mode, pb.mode, postulates))
        }
    };
    postulates.pop();
    result
}

/// YIN/YANG well-formedness: a mode must not be a VOID-reachable cycle
/// through only YIN (REF) or only YANG (PROC-with-nonempty-pack)
/// constructors. Traverses every registered STRUCT/indicant chain looking
/// for a cycle that never alternates.
fn check_well_formedness(table: &ModeTable, sink: &mut DiagnosticSink) {
    let ids: Vec<ModeId> = table.iter_ids().collect();
    for id in ids {
        if table.get(id).equivalent.is_some() {
            continue;
        }
        let mut visiting = FxHashSet::default();
        if let Some(polarity) = starting_polarity(table, id) {
            if has_monotone_cycle(table, id, polarity, &mut visiting) {
                sink.report(Diagnostic::error(
                    ErrorCode::ModeNotWellFormed,
                    text_size::TextRange::empty(0.into()),
                ));
            }
        }
        if table.get(id).attribute == ModeAttribute::Flex {
            let sub = table.resolve(table.get(id).sub.unwrap());
            if !matches!(table.get(sub).attribute, ModeAttribute::Row) {
                sink.report(Diagnostic::error(
                    ErrorCode::FlexOverNonRow,
                    text_size::TextRange::empty(0.into()),
                ));
            }
        }
        if table.get(id).attribute == ModeAttribute::Struct {
            check_duplicate_fields(table, id, sink);
        }
        if table.get(id).attribute == ModeAttribute::Union {
            check_union_members(table, id, sink);
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Yin, // through REF
    Yang, // through PROC with non-empty pack
}

fn starting_polarity(table: &ModeTable, id: ModeId) -> Option<Polarity> {
    match table.get(id).attribute {
        ModeAttribute::Ref => Some(Polarity::Yin),
        ModeAttribute::Proc if !table.get(id).pack.is_empty() => Some(Polarity::Yang),
        _ => None,
    }
}

/// Walks a chain of same-polarity constructors; flags a cycle that returns
/// to `start` (or reaches VOID) without ever flipping polarity.
fn has_monotone_cycle(table: &ModeTable, start: ModeId, polarity: Polarity, visiting: &mut FxHashSet<ModeId>) -> bool {
    // A chain that terminates (hits a non-REF / non-PROC-with-pack mode,
    // including VOID) after finitely many same-polarity steps is well
    // formed — `REF VOID` is a legitimate, complete mode. Only a chain that
    // revisits a node it has already walked, without ever terminating, is
    // the infinite-regress case this guards against.
    let mut cursor = start;
    loop {
        if !visiting.insert(cursor) {
            return true;
        }
        let m = table.get(cursor);
        let next = match (polarity, m.attribute) {
            (Polarity::Yin, ModeAttribute::Ref) => m.sub,
            (Polarity::Yang, ModeAttribute::Proc) if !m.pack.is_empty() => m.sub,
            _ => None,
        };
        match next {
            Some(n) => cursor = table.resolve(n),
            None => return false,
        }
    }
}

fn check_duplicate_fields(table: &ModeTable, id: ModeId, sink: &mut DiagnosticSink) {
    let mut seen = FxHashSet::default();
    for entry in &table.get(id).pack {
        if let Some(name) = entry.field_name {
            if !seen.insert(name) {
                sink.report(Diagnostic::error(
                    ErrorCode::DuplicateStructField,
                    text_size::TextRange::empty(0.into()),
                ));
            }
        }
    }
}

fn check_union_members(table: &ModeTable, id: ModeId, sink: &mut DiagnosticSink) {
    let members: Vec<ModeId> = table.get(id).pack.iter().map(|p| table.resolve(p.mode)).collect();
    if members.len() < 2 {
        sink.report(Diagnostic::error(
            ErrorCode::NoComponentInUnion,
            text_size::TextRange::empty(0.into()),
        ));
        return;
    }
    for &m in &members {
        if let ModeAttribute::Ref = table.get(m).attribute {
            let sub = table.resolve(table.get(m).sub.unwrap());
            if table.get(sub).attribute == ModeAttribute::Union {
                let sub_members: FxHashSet<ModeId> =
                    table.get(sub).pack.iter().map(|p| table.resolve(p.mode)).collect();
                let outer: FxHashSet<ModeId> = members.iter().copied().collect();
                if sub_members.is_subset(&outer) {
                    sink.report(Diagnostic::error(
                        ErrorCode::UnionComponentRelation,
                        text_size::TextRange::empty(0.into()),
                    ));
                }
            }
        }
    }
}

/// Default deflexing regime used when component L has no narrower context.
pub const DEFAULT_DEFLEXING: Deflexing = Deflexing::Safe;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::DiagnosticSink;
    use crate::mode::table::StandardKind;

    #[test]
    fn identical_standard_modes_equivalent_with_empty_postulates() {
        let mut table = ModeTable::new();
        let int_a = table.standard(StandardKind::Int, 0);
        let mut postulates = Vec::new();
        assert!(is_equivalent(&table, int_a, int_a, &mut postulates));
        assert!(postulates.is_empty());
    }

    #[test]
    fn single_member_union_collapses() {
        let mut table = ModeTable::new();
        let int_mode = table.standard(StandardKind::Int, 0);
        let node = crate::tree::Tree::new().push_leaf(
            crate::kind::SyntaxKind::UNION_DECLARER,
            None,
            text_size::TextRange::empty(0.into()),
        );
        let union = table.union_mode(
            node,
            vec![super::super::table::PackEntry {
                mode: int_mode,
                field_name: None,
                defining_node: None,
            }],
        );
        let mut sink = DiagnosticSink::new();
        run(&mut table, &mut sink);
        assert_eq!(table.resolve(union), int_mode);
    }

    #[test]
    fn cyclic_ref_struct_is_well_formed() {
        // MODE L = STRUCT (INT v, REF L n) -- REF flips YIN so this is fine.
        let mut table = ModeTable::new();
        let mut tree = crate::tree::Tree::new();
        let node = tree.push_leaf(crate::kind::SyntaxKind::STRUCT_DECLARER, None, text_size::TextRange::empty(0.into()));
        let int_mode = table.standard(StandardKind::Int, 0);
        let l_indicant = table.fresh_indicant(node);
        let ref_l = table.reff(l_indicant);
        let struct_mode = table.struct_mode(
            node,
            vec![
                super::super::table::PackEntry {
                    mode: int_mode,
                    field_name: None,
                    defining_node: None,
                },
                super::super::table::PackEntry {
                    mode: ref_l,
                    field_name: None,
                    defining_node: None,
                },
            ],
        );
        table.get_mut(l_indicant).sub = Some(struct_mode);

        let mut sink = DiagnosticSink::new();
        run(&mut table, &mut sink);
        assert!(!sink.has_errors());
    }

    #[test]
    fn ref_void_terminates_and_is_well_formed() {
        // REF VOID is a complete mode (used for jump-target unions); it
        // must not be flagged just because it terminates at VOID.
        let mut table = ModeTable::new();
        let void_mode = table.void();
        let ref_void = table.reff(void_mode);
        let mut sink = DiagnosticSink::new();
        run(&mut table, &mut sink);
        let _ = ref_void;
        assert!(!sink.has_errors());
    }

    #[test]
    fn pure_yin_self_cycle_is_rejected() {
        // MODE A = REF A -- infinite regress through REF alone, never
        // terminating, is ill formed.
        let mut table = ModeTable::new();
        let indicant = table.fresh_indicant(
            crate::tree::Tree::new().push_leaf(crate::kind::SyntaxKind::INDICANT, None, text_size::TextRange::empty(0.into())),
        );
        let ref_a = table.reff(indicant);
        table.get_mut(indicant).sub = Some(ref_a);
        let mut sink = DiagnosticSink::new();
        run(&mut table, &mut sink);
        assert!(sink.has_errors());
    }

    #[test]
    fn idempotent_second_run_adds_no_equivalents() {
        let mut table = ModeTable::new();
        let int_mode = table.standard(StandardKind::Int, 0);
        let _ref_int = table.reff(int_mode);
        let mut sink = DiagnosticSink::new();
        run(&mut table, &mut sink);
        let before = table.len();
        run(&mut table, &mut sink);
        assert_eq!(table.len(), before);
    }
}
