//! Coercion insertion. Each of the six coercions the grammar can produce
//! (`DEREFERENCING`, `DEPROCEDURING`, `UNITING`, `WIDENING`, `ROWING`,
//! `VOIDING`) is available only at or above a minimum [`Sort`]; `PROCEDURING`
//! is declared in `kind::SyntaxKind` for completeness but, like
//! `victal::Context::Virtual`, has no producing position in this checker.
//!
//! A target mode equal to `modes.error()` is a wildcard: "settle as far as
//! this sort allows, there is nothing further to match against". Used where
//! a unit's mode has to be inferred rather than checked — the base of a
//! `SPECIFICATION`/`SELECTION`, an operand before its operator is chosen.

use crate::diag::ErrorCode;
use crate::kind::SyntaxKind;
use crate::mode::{is_equivalent, ModeAttribute, ModeId, ModeTable};
use crate::tree::NodeId;

use super::{Checker, Sort, Soid};

impl<'a> Checker<'a> {
    /// Fully applies the deproceduring chain (parameterless `PROC M` down to
    /// `M`, repeated), then the dereferencing chain (`REF M` down to `M`,
    /// repeated), as far as `sort` allows. Returns the settled mode and the
    /// (possibly coercion-wrapped) node to use as the settled value's site.
    fn settle(&mut self, mut node: NodeId, mut current: ModeId, sort: Sort) -> (ModeId, NodeId) {
        if sort.at_least(Sort::Soft) {
            loop {
                let resolved = self.modes.resolve(current);
                let m = self.modes.get(resolved);
                if m.attribute == ModeAttribute::Proc && m.pack.is_empty() {
                    let result = m.sub.unwrap();
                    node = self.tree.insert_coercion_above(node, SyntaxKind::DEPROCEDURING);
                    self.set_mode(node, result);
                    current = result;
                } else {
                    break;
                }
            }
        }
        if sort.at_least(Sort::Weak) {
            loop {
                let resolved = self.modes.resolve(current);
                let m = self.modes.get(resolved);
                if m.attribute == ModeAttribute::Ref {
                    let sub = m.sub.unwrap();
                    node = self.tree.insert_coercion_above(node, SyntaxKind::DEREFERENCING);
                    self.set_mode(node, sub);
                    current = sub;
                } else {
                    break;
                }
            }
        }
        (current, node)
    }

    /// Coerces `node`, whose already-computed natural mode is `natural`, to
    /// `target`, inserting whatever coercion nodes are required. Returns the
    /// mode the site now carries (`target.mode` on success; best-effort on
    /// failure, so callers can keep checking without short-circuiting the
    /// whole pass).
    pub(super) fn coerce_to(&mut self, node: NodeId, natural: ModeId, target: Soid) -> ModeId {
        let natural = self.modes.resolve(natural);
        if is_polymorphic(self.modes, natural) {
            return target.mode;
        }

        let (current, site) = self.settle(node, natural, target.sort);
        let wildcard = self.modes.resolve(target.mode) == self.modes.error();
        if wildcard {
            return current;
        }

        let target_mode = self.modes.resolve(target.mode);
        if current == target_mode || is_equivalent(self.modes, current, target_mode, &mut Vec::new()) {
            return target_mode;
        }

        if target_mode == self.modes.rows() && target.sort.at_least(Sort::Firm) {
            let resolved = self.modes.get(current);
            if matches!(resolved.attribute, ModeAttribute::Row | ModeAttribute::Flex) {
                return current;
            }
            // A scalar actual against a row-shaped formal (print/read's
            // ROWS-sentinel parameter) widens into a one-element row, the
            // same way a bare actual widens into `[]SIMPLOUT`/`[]SIMPLIN`
            // in the full transput grammar this sentinel stands in for.
            let node = self.tree.insert_coercion_above(site, SyntaxKind::ROWING);
            self.set_mode(node, current);
            return current;
        }

        if target.sort.at_least(Sort::Firm) {
            let target_resolved = self.modes.get(target_mode);
            if target_resolved.attribute == ModeAttribute::Union {
                let rows = self.modes.rows();
                let member = target_resolved.pack.iter().any(|entry| {
                    let entry_mode = self.modes.resolve(entry.mode);
                    if entry_mode == rows {
                        matches!(
                            self.modes.get(current).attribute,
                            ModeAttribute::Row | ModeAttribute::Flex
                        )
                    } else {
                        entry_mode == current || is_equivalent(self.modes, entry_mode, current, &mut Vec::new())
                    }
                });
                if member {
                    let node = self.tree.insert_coercion_above(site, SyntaxKind::UNITING);
                    self.set_mode(node, target_mode);
                    return target_mode;
                }
            }
        }

        if target.sort.at_least(Sort::Strong) {
            if widens_to(self.modes, current, target_mode) {
                let node = self.tree.insert_coercion_above(site, SyntaxKind::WIDENING);
                self.set_mode(node, target_mode);
                return target_mode;
            }

            let target_resolved = self.modes.get(target_mode);
            if matches!(target_resolved.attribute, ModeAttribute::Row | ModeAttribute::Flex) {
                let elem = row_element(self.modes, target_mode);
                if is_equivalent(self.modes, current, elem, &mut Vec::new()) {
                    let node = self.tree.insert_coercion_above(site, SyntaxKind::ROWING);
                    self.set_mode(node, target_mode);
                    return target_mode;
                }
            }

            if target_mode == self.modes.void() {
                self.warn(ErrorCode::VoidedValueDiscarded, site);
                let node = self.tree.insert_coercion_above(site, SyntaxKind::VOIDING);
                self.set_mode(node, target_mode);
                return target_mode;
            }
        }

        self.report(ErrorCode::CannotCoerce, site);
        target_mode
    }
}

fn is_polymorphic(modes: &ModeTable, mode: ModeId) -> bool {
    matches!(
        modes.get(mode).attribute,
        ModeAttribute::Hip | ModeAttribute::Undefined | ModeAttribute::Error
    )
}

/// Row modes widen within a `StandardKind` by precision alone (`INT` up
/// through `LONG LONG INT`); across kinds, `INT -> REAL -> COMPLEX` and
/// `CHAR -> STRING` are the only implicit widenings.
pub(super) fn widens_to(modes: &ModeTable, from: ModeId, to: ModeId) -> bool {
    let from = modes.get(from);
    let to = modes.get(to);
    if from.attribute != ModeAttribute::Standard || to.attribute != ModeAttribute::Standard {
        return false;
    }
    let (Some(fk), Some(tk)) = (from.standard, to.standard) else {
        return false;
    };
    use crate::mode::StandardKind::*;
    match (fk, tk) {
        (Char, String) => true,
        (a, b) if a == b => to.dim >= from.dim,
        (Int, Real) | (Int, Complex) | (Real, Complex) => to.dim >= from.dim,
        _ => false,
    }
}

pub(super) fn row_element(modes: &ModeTable, mode: ModeId) -> ModeId {
    let m = modes.get(mode);
    if m.attribute == ModeAttribute::Flex {
        let inner = modes.resolve(m.sub.unwrap());
        return modes.get(inner).sub.unwrap();
    }
    m.sub.unwrap()
}
