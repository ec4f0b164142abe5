//! Declarations, generators, casts, assignations, and the two boolean
//! binary units (`IS`/`ISNT`, `ANDF`/`ORF`). Each declaration checks its own
//! initializer/body against its already-collected mode (`mode::collect` set
//! both the tag's mode and, for everything but a bare `MODE`/`PROC`
//! declaration, the declaring node's own `mode_slot`).

use crate::diag::ErrorCode;
use crate::kind::SyntaxKind;
use crate::mode::{ModeAttribute, ModeId, StandardKind};
use crate::tree::NodeId;

use super::{Checker, Sort, Soid};

impl<'a> Checker<'a> {
    pub(super) fn check_identity_declaration(&mut self, node: NodeId) {
        let children = self.tree.children(node);
        self.check_declarer_bounds(children[0]);
        let declared = self.mode_of(node);
        self.check_unintended_assignation_initializer(children[3]);
        self.check_unit(children[3], Soid::new(Sort::Strong, declared));
    }

    /// `x = LOC M := v` declares `x` as a name to a generator that is
    /// immediately assigned into and then never named again — almost always
    /// a slip for `x := v` (a variable declaration) or `REF M x = ...`
    /// naming something else. Flags the generator itself, the part of the
    /// initializer a reader's eye actually lands on.
    fn check_unintended_assignation_initializer(&mut self, initializer: NodeId) {
        if self.tree.node(initializer).kind != SyntaxKind::ASSIGNATION {
            return;
        }
        let Some(&dest) = self.tree.children(initializer).first() else {
            return;
        };
        if self.tree.node(dest).kind == SyntaxKind::GENERATOR {
            self.warn(ErrorCode::UnintendedDeclarationShape, dest);
        }
    }

    pub(super) fn check_variable_declaration(&mut self, node: NodeId) {
        let children = self.tree.children(node);
        self.check_declarer_bounds(children[0]);
        let ref_mode = self.mode_of(node);
        if children.len() == 4 {
            let resolved = self.modes.resolve(ref_mode);
            let bare = self.modes.get(resolved).sub.unwrap();
            self.check_unit(children[3], Soid::new(Sort::Strong, bare));
        }
    }

    /// `PROC_IDENTITY_DECLARATION` and `PROC_VARIABLE_DECLARATION` share a
    /// shape: `[name, eq-or-becomes, routine_text]`. Checked with a
    /// wildcard target since a bare `ROUTINE_TEXT`'s own declared mode is
    /// already authoritative; there's nothing to coerce it against.
    pub(super) fn check_proc_declaration(&mut self, node: NodeId) {
        let children = self.tree.children(node);
        let error = self.modes.error();
        self.check_unit(children[2], Soid::new(Sort::Strong, error));
    }

    pub(super) fn check_operator_declaration(&mut self, node: NodeId) {
        let children = self.tree.children(node);
        let error = self.modes.error();
        self.check_unit(children[2], Soid::new(Sort::Strong, error));
    }

    /// Shared by `ROUTINE_TEXT` and `OPERATOR_PLAN` — same child shape
    /// (`[open?, FORMAL_PARAMETER*, close?, result_declarer?, COLON, unit]`),
    /// different `SyntaxKind`. `mode::collect`'s generic recursion always
    /// gives this node its own `mode_slot`, whether or not it was reached
    /// through a `PROC_IDENTITY_DECLARATION`-style special case first.
    pub(super) fn check_routine_or_operator_plan(&mut self, node: NodeId) -> ModeId {
        let proc_mode = self.mode_of(node);
        let resolved = self.modes.resolve(proc_mode);
        let result_mode = self.modes.get(resolved).sub.unwrap();

        let children = self.tree.children(node);
        for &child in &children {
            if self.tree.node(child).kind == SyntaxKind::FORMAL_PARAMETER {
                if let Some(&declarer) = self.tree.children(child).first() {
                    self.check_declarer_bounds(declarer);
                }
            }
        }
        if let Some(colon_idx) = children.iter().position(|&c| self.tree.node(c).kind == SyntaxKind::COLON) {
            if colon_idx > 0 {
                let candidate = children[colon_idx - 1];
                let ckind = self.tree.node(candidate).kind;
                if ckind != SyntaxKind::CLOSE_PAREN && ckind != SyntaxKind::FORMAL_PARAMETER {
                    self.check_declarer_bounds(candidate);
                }
            }
            let body = children[children.len() - 1];
            self.check_unit(body, Soid::new(Sort::Strong, result_mode));
        }
        proc_mode
    }

    /// `GENERATOR`'s `mode_slot` holds the bare declared mode from
    /// `mode::collect`; the generator's *value* is a name to it, so this is
    /// the one place that rewrites a collected `mode_slot` into the mode the
    /// node actually yields.
    pub(super) fn check_generator(&mut self, node: NodeId) -> ModeId {
        let children = self.tree.children(node);
        self.check_declarer_bounds(children[1]);
        let declared = self.mode_of(node);
        let value_mode = self.modes.reff(declared);
        self.set_mode(node, value_mode);
        value_mode
    }

    pub(super) fn check_cast(&mut self, node: NodeId) -> ModeId {
        let children = self.tree.children(node);
        self.check_declarer_bounds(children[0]);
        let declared = self.mode_of(node);
        let last = *children.last().unwrap();
        self.check_unit(last, Soid::new(Sort::Strong, declared));
        declared
    }

    /// An assignation's own mode is the destination's `REF M`, not `M` —
    /// `x := y := 3` chains because each assignation yields a name in turn.
    pub(super) fn check_assignation(&mut self, node: NodeId) -> ModeId {
        let children = self.tree.children(node);
        let error = self.modes.error();
        let lhs_natural = self.check_unit(children[0], Soid::new(Sort::Soft, error));
        let resolved = self.modes.resolve(lhs_natural);
        if self.modes.get(resolved).attribute != ModeAttribute::Ref {
            self.report(ErrorCode::NonNameDestination, children[0]);
            return self.modes.error();
        }
        let dest_mode = self.modes.get(resolved).sub.unwrap();
        let rhs = *children.last().unwrap();
        self.check_unit(rhs, Soid::new(Sort::Strong, dest_mode));
        self.set_mode(node, resolved);
        resolved
    }

    pub(super) fn check_identity_relation(&mut self, node: NodeId) -> ModeId {
        let children = self.tree.children(node);
        let error = self.modes.error();
        let rhs = *children.last().unwrap();
        for &operand in &[children[0], rhs] {
            let natural = self.check_unit(operand, Soid::new(Sort::Meek, error));
            let resolved = self.modes.resolve(natural);
            if self.modes.get(resolved).attribute != ModeAttribute::Ref {
                self.report(ErrorCode::NonRefOperand, operand);
            }
        }
        self.modes.standard(StandardKind::Bool, 0)
    }

    pub(super) fn check_and_or(&mut self, node: NodeId) -> ModeId {
        let children = self.tree.children(node);
        let bool_mode = self.modes.standard(StandardKind::Bool, 0);
        let rhs = *children.last().unwrap();
        self.check_unit(children[0], Soid::new(Sort::Strong, bool_mode));
        self.check_unit(rhs, Soid::new(Sort::Strong, bool_mode));
        bool_mode
    }

    /// Walks every descendant of a declarer looking for `BOUND` nodes,
    /// checking whichever unit children they carry as `INT`. `BOUND` itself
    /// has no nested declarer, so recursion stops there.
    pub(super) fn check_declarer_bounds(&mut self, node: NodeId) {
        if self.tree.node(node).kind == SyntaxKind::BOUND {
            let kids = self.tree.children(node);
            let int_mode = self.modes.standard(StandardKind::Int, 0);
            match kids.len() {
                1 => {
                    self.check_unit(kids[0], Soid::new(Sort::Meek, int_mode));
                }
                3 => {
                    self.check_unit(kids[0], Soid::new(Sort::Meek, int_mode));
                    self.check_unit(kids[2], Soid::new(Sort::Meek, int_mode));
                }
                _ => {}
            }
            return;
        }
        for child in self.tree.children(node) {
            self.check_declarer_bounds(child);
        }
    }
}
