//! Operator overload resolution, the `SPECIFICATION` CALL/SLICE
//! disambiguation its own doc comment anticipates, and struct selection.
//! All three share the same shape: settle the operand(s) to a bare mode
//! under a wildcard context, then decide what to do from the attribute that
//! settles out.

use crate::diag::ErrorCode;
use crate::kind::SyntaxKind;
use crate::mode::{is_equivalent, ModeAttribute, ModeId};
use crate::tree::NodeId;

use super::coerce::widens_to;
use super::{Checker, Sort, Soid};

/// Whether `operand`'s mode matches a parameter's, exactly or (when
/// `allow_widening`) by the same standard widenings `coerce_to` applies to a
/// STRONG actual parameter. Mirrors the operator-resolution escalation an
/// applied-operand search performs: try every candidate for an exact match
/// first, and only allow a wider one in if nothing matched exactly.
fn operand_matches(modes: &crate::mode::ModeTable, param: ModeId, operand: ModeId, allow_widening: bool) -> bool {
    is_equivalent(modes, param, operand, &mut Vec::new()) || (allow_widening && widens_to(modes, operand, param))
}

impl<'a> Checker<'a> {
    pub(super) fn check_monadic_formula(&mut self, node: NodeId) -> ModeId {
        let children = self.tree.children(node);
        let op_node = children[0];
        let error = self.modes.error();
        let operand = self.check_unit(children[1], Soid::new(Sort::Firm, error));

        let Some(spelling) = self.tree.node(op_node).spelling else {
            return self.modes.error();
        };
        let range = self.tree.enclosing_range(node, self.top_range);
        let candidates = self.ranges.lookup_operators(range, spelling);
        for allow_widening in [false, true] {
            for &tag_id in &candidates {
                let Some(slot) = self.tags.get(tag_id).mode else {
                    continue;
                };
                let proc_mode = ModeId::new(slot as usize);
                let resolved = self.modes.resolve(proc_mode);
                let (matches, result) = {
                    let proc = self.modes.get(resolved);
                    if proc.pack.len() == 1 {
                        (operand_matches(self.modes, proc.pack[0].mode, operand, allow_widening), proc.sub)
                    } else {
                        (false, None)
                    }
                };
                if matches {
                    self.tree.node_mut(op_node).tag = Some(tag_id);
                    let result = result.unwrap();
                    self.set_mode(node, result);
                    return result;
                }
            }
        }
        self.report(ErrorCode::NoMatchingOperator, op_node);
        self.modes.error()
    }

    pub(super) fn check_dyadic_formula(&mut self, node: NodeId) -> ModeId {
        let children = self.tree.children(node);
        let op_node = children[1];
        let error = self.modes.error();
        let lhs = self.check_unit(children[0], Soid::new(Sort::Firm, error));
        let rhs = self.check_unit(children[2], Soid::new(Sort::Firm, error));

        let Some(spelling) = self.tree.node(op_node).spelling else {
            return self.modes.error();
        };
        let range = self.tree.enclosing_range(node, self.top_range);
        let candidates = self.ranges.lookup_operators(range, spelling);
        // Pass one: exact match. Pass two: the same candidates again, but a
        // cross-term like `REAL * INT` is now allowed to match a same-mode
        // tag (`REAL * REAL`, `INT * INT`) by widening whichever operand
        // falls short, the series-of-operands retry an overload search falls
        // back to once no exact tag covers the pair as given.
        for allow_widening in [false, true] {
            for &tag_id in &candidates {
                let Some(slot) = self.tags.get(tag_id).mode else {
                    continue;
                };
                let proc_mode = ModeId::new(slot as usize);
                let resolved = self.modes.resolve(proc_mode);
                let (matches, result) = {
                    let proc = self.modes.get(resolved);
                    if proc.pack.len() == 2 {
                        let lhs_ok = operand_matches(self.modes, proc.pack[0].mode, lhs, allow_widening);
                        let rhs_ok = operand_matches(self.modes, proc.pack[1].mode, rhs, allow_widening);
                        (lhs_ok && rhs_ok, proc.sub)
                    } else {
                        (false, None)
                    }
                };
                if matches {
                    self.tree.node_mut(op_node).tag = Some(tag_id);
                    let result = result.unwrap();
                    self.set_mode(node, result);
                    return result;
                }
            }
        }
        self.report(ErrorCode::NoMatchingOperator, op_node);
        self.modes.error()
    }

    /// The struct/row base of a `SELECTION`; determined by the operand's
    /// mode once settled, same as a `SPECIFICATION`'s atom.
    pub(super) fn check_selection(&mut self, node: NodeId) -> ModeId {
        let children = self.tree.children(node);
        let selector = children[0];
        let operand = children[2];

        let error = self.modes.error();
        let natural = self.check_unit(operand, Soid::new(Sort::Meek, error));
        let resolved = self.modes.resolve(natural);
        let was_ref = self.modes.get(resolved).attribute == ModeAttribute::Ref;
        let base = if was_ref {
            self.modes.resolve(self.modes.get(resolved).sub.unwrap())
        } else {
            resolved
        };

        let Some(&ident) = self.tree.children(selector).first() else {
            return self.modes.error();
        };
        let Some(field_name) = self.tree.node(ident).spelling else {
            return self.modes.error();
        };

        if self.modes.get(base).attribute != ModeAttribute::Struct {
            self.report(ErrorCode::CannotCoerce, node);
            return self.modes.error();
        }
        let field_mode = self
            .modes
            .get(base)
            .pack
            .iter()
            .find(|entry| entry.field_name == Some(field_name))
            .map(|entry| entry.mode);
        let Some(field_mode) = field_mode else {
            self.report(ErrorCode::CannotCoerce, node);
            return self.modes.error();
        };
        let result = if was_ref { self.modes.reff(field_mode) } else { field_mode };
        self.set_mode(node, result);
        result
    }

    /// Relabels the unified `SPECIFICATION` node to `CALL` or `SLICE` in
    /// place once the atom's settled mode reveals which one it is.
    pub(super) fn check_specification(&mut self, node: NodeId) -> ModeId {
        let children = self.tree.children(node);
        let atom = children[0];
        let arg_container = children[2];

        let error = self.modes.error();
        let natural = self.check_unit(atom, Soid::new(Sort::Firm, error));
        let resolved = self.modes.resolve(natural);
        let was_ref = self.modes.get(resolved).attribute == ModeAttribute::Ref;
        let base = if was_ref {
            self.modes.resolve(self.modes.get(resolved).sub.unwrap())
        } else {
            resolved
        };

        let result = match self.modes.get(base).attribute {
            ModeAttribute::Proc => self.check_call(node, arg_container, base),
            ModeAttribute::Row | ModeAttribute::Flex => self.check_slice(node, arg_container, base, was_ref),
            _ => {
                self.report(ErrorCode::CannotCoerce, atom);
                self.modes.error()
            }
        };
        self.set_mode(node, result);
        result
    }

    fn check_call(&mut self, node: NodeId, arglist: NodeId, proc_mode: ModeId) -> ModeId {
        self.tree.node_mut(node).kind = SyntaxKind::CALL;
        let pack = self.modes.get(proc_mode).pack.clone();
        let args = self.tree.children(arglist);
        for (i, &arg) in args.iter().enumerate() {
            let param_mode = pack.get(i).map(|p| p.mode).unwrap_or_else(|| self.modes.error());
            self.check_unit(arg, Soid::new(Sort::Strong, param_mode));
        }
        if args.len() != pack.len() {
            self.report(ErrorCode::ArgumentCountMismatch, node);
        }
        self.modes.get(proc_mode).sub.unwrap()
    }

    fn check_slice(&mut self, node: NodeId, garg: NodeId, row_mode: ModeId, was_ref: bool) -> ModeId {
        self.tree.node_mut(node).kind = SyntaxKind::SLICE;
        let (dim, elem) = if self.modes.get(row_mode).attribute == ModeAttribute::Flex {
            let inner = self.modes.resolve(self.modes.get(row_mode).sub.unwrap());
            (self.modes.get(inner).dim, self.modes.get(inner).sub.unwrap())
        } else {
            (self.modes.get(row_mode).dim, self.modes.get(row_mode).sub.unwrap())
        };

        let entries = self.tree.children(garg);
        let mut index_count = 0i32;
        for &entry in &entries {
            if self.check_generic_argument_entry(entry) {
                index_count += 1;
            }
        }
        if entries.len() as i32 != dim {
            self.report(ErrorCode::IndexerCountMismatch, node);
        }

        let remaining = (dim - index_count).max(0);
        let bare = if remaining == 0 {
            elem
        } else {
            self.modes.row(remaining, elem)
        };
        if was_ref {
            self.modes.reff(bare)
        } else {
            bare
        }
    }

    /// Checks one `[...]` entry, returning `true` if it's an index
    /// (consumes a dimension) or `false` if it's a trim (keeps one).
    fn check_generic_argument_entry(&mut self, entry: NodeId) -> bool {
        let int_mode = self.modes.standard(crate::mode::StandardKind::Int, 0);
        let error = self.modes.error();
        if self.tree.node(entry).kind != SyntaxKind::BOUND {
            self.check_unit(entry, Soid::new(Sort::Meek, int_mode));
            return true;
        }
        let children = self.tree.children(entry);
        if children.is_empty() {
            return false;
        }
        self.check_unit(children[0], Soid::new(Sort::Meek, int_mode));
        if children.len() < 2 {
            return true;
        }
        let is_trim = self.tree.node(children[1]).kind == SyntaxKind::UPTO_SYM;
        if is_trim {
            if children.len() >= 3 {
                self.check_unit(children[2], Soid::new(Sort::Meek, int_mode));
            }
            if children.len() == 5 {
                self.check_unit(children[4], Soid::new(Sort::Meek, error));
            }
            false
        } else {
            if children.len() >= 3 {
                self.check_unit(children[2], Soid::new(Sort::Meek, error));
            }
            true
        }
    }
}
