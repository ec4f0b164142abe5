//! Balanced clauses: every branch gets the same target [`Soid`] pushed down
//! into it individually, rather than each branch's natural mode being
//! inferred and then balanced against its siblings afterward — valid since
//! by the time a balanced clause is reached from `check_unit`, the caller
//! already knows the mode it wants out (an assignment's source, a cast's
//! target, a routine's declared result, or the program's own `VOID`).

use crate::diag::ErrorCode;
use crate::kind::SyntaxKind;
use crate::mode::{ModeAttribute, ModeId};
use crate::tree::NodeId;

use super::{Checker, Sort, Soid};

impl<'a> Checker<'a> {
    pub(super) fn check_conditional(&mut self, node: NodeId, target: Soid) -> ModeId {
        let children = self.tree.children(node);
        let bool_mode = self.modes.standard(crate::mode::StandardKind::Bool, 0);
        let mut i = 0;
        while i < children.len() {
            match self.tree.node(children[i]).kind {
                SyntaxKind::IF_SYM | SyntaxKind::ELIF_SYM => {
                    let enquiry = children[i + 1];
                    self.check_serial_like(enquiry, Soid::new(Sort::Meek, bool_mode));
                    i += 2;
                }
                SyntaxKind::THEN_SYM | SyntaxKind::ELSE_SYM => {
                    let branch = children[i + 1];
                    self.check_serial_like(branch, target);
                    i += 2;
                }
                _ => i += 1,
            }
        }
        self.set_mode(node, target.mode);
        target.mode
    }

    pub(super) fn check_case(&mut self, node: NodeId, target: Soid) -> ModeId {
        let children = self.tree.children(node);
        let int_mode = self.modes.standard(crate::mode::StandardKind::Int, 0);
        let mut i = 0;
        while i < children.len() {
            match self.tree.node(children[i]).kind {
                SyntaxKind::CASE_SYM | SyntaxKind::OUSE_SYM => {
                    let enquiry = children[i + 1];
                    self.check_serial_like(enquiry, Soid::new(Sort::Meek, int_mode));
                    i += 2;
                }
                SyntaxKind::IN_SYM => {
                    let part = children[i + 1];
                    for unit in self.tree.children(part) {
                        self.check_unit(unit, target);
                    }
                    i += 2;
                }
                SyntaxKind::OUT_SYM => {
                    let branch = children[i + 1];
                    self.check_serial_like(branch, target);
                    i += 2;
                }
                _ => i += 1,
            }
        }
        self.set_mode(node, target.mode);
        target.mode
    }

    pub(super) fn check_loop(&mut self, node: NodeId) {
        let children = self.tree.children(node);
        let int_mode = self.modes.standard(crate::mode::StandardKind::Int, 0);
        let bool_mode = self.modes.standard(crate::mode::StandardKind::Bool, 0);
        let void = self.modes.void();
        let mut i = 0;
        while i < children.len() {
            match self.tree.node(children[i]).kind {
                SyntaxKind::FOR_SYM => {
                    let ident = children[i + 1];
                    if let Some(tag_id) = self.tree.node(ident).tag {
                        self.tags.get_mut(tag_id).mode = Some(int_mode.index() as u32);
                    }
                    i += 2;
                }
                SyntaxKind::FROM_SYM | SyntaxKind::BY_SYM | SyntaxKind::TO_SYM | SyntaxKind::DOWNTO_SYM => {
                    let unit = children[i + 1];
                    self.check_unit(unit, Soid::new(Sort::Strong, int_mode));
                    i += 2;
                }
                SyntaxKind::WHILE_SYM => {
                    let enquiry = children[i + 1];
                    self.check_serial_like(enquiry, Soid::new(Sort::Meek, bool_mode));
                    i += 2;
                }
                SyntaxKind::DO_SYM => {
                    let body = children[i + 1];
                    self.check_serial_like(body, Soid::new(Sort::Strong, void));
                    i += 2;
                }
                _ => i += 1,
            }
        }
    }

    pub(super) fn check_collateral(&mut self, node: NodeId, target: Soid) -> ModeId {
        let units = self.tree.children(node);
        self.check_stowed(node, &units, target)
    }

    /// Shared by `COLLATERAL_CLAUSE`, `BRIEF_ROW_DISPLAY`, and
    /// `BRIEF_STRUCTURE_DISPLAY` — all three are a comma-separated unit list
    /// matched element-wise (row display) or field-wise (struct display)
    /// against the target mode.
    pub(super) fn check_stowed(&mut self, node: NodeId, units: &[NodeId], target: Soid) -> ModeId {
        let resolved = self.modes.resolve(target.mode);
        match self.modes.get(resolved).attribute {
            ModeAttribute::Struct => {
                let pack = self.modes.get(resolved).pack.clone();
                for (i, &unit) in units.iter().enumerate() {
                    let field_mode = pack.get(i).map(|p| p.mode).unwrap_or_else(|| self.modes.error());
                    self.check_unit(unit, Soid::new(Sort::Strong, field_mode));
                }
                if units.len() != pack.len() {
                    self.report(ErrorCode::ArgumentCountMismatch, node);
                }
            }
            ModeAttribute::Row | ModeAttribute::Flex => {
                let elem = super::coerce::row_element(self.modes, resolved);
                for &unit in units {
                    self.check_unit(unit, Soid::new(Sort::Strong, elem));
                }
            }
            _ if units.is_empty() && target.sort.at_least(Sort::Strong) => {
                // `()` under a STRONG expectation that isn't a ROW (a ROW
                // target is handled above, and already settles to itself
                // with no units to check) has no mode to balance against at
                // all: the result is UNDEFINED, not the echoed target.
                let undefined = self.modes.undefined();
                self.set_mode(node, undefined);
                return undefined;
            }
            _ => {
                // No struct/row context to balance against (an unadorned
                // collateral clause with no determining cast, generator, or
                // declarer around it); check each unit against the
                // unconstrained context so the pass still completes.
                let error = self.modes.error();
                for &unit in units {
                    self.check_unit(unit, Soid::new(Sort::Strong, error));
                }
            }
        }
        self.set_mode(node, target.mode);
        target.mode
    }
}
