//! Mode checker and coercer (component L). Walks the annotated tree by
//! recursive descent driven by each unit's own grammar shape, rather than a
//! blind whole-tree walk like `bind`/`mode::collect` — a balanced clause
//! (`IF`/`CASE`/collateral display) needs its context's target mode pushed
//! down into each branch individually, which only a shape-aware descent can
//! do: "infer, then coerce, inserting a coercion node for every implicit
//! conversion the context allows".
//!
//! A unit is checked in a *context* — a [`Sort`] (how hard the checker is
//! allowed to work to make the value fit) paired with a target [`ModeId`].
//! `Sort::rank` orders the five context sorts from weakest to strongest;
//! each stronger sort allows everything a weaker one does, plus one more
//! category of coercion (see `coerce` for the exact table).

mod clauses;
mod coerce;
mod declare;
mod resolve;

use tracing::instrument;

use crate::base::Interner;
use crate::diag::{Diagnostic, DiagnosticSink, ErrorCode};
use crate::kind::SyntaxKind;
use crate::mode::{ModeId, ModeTable, PackEntry, StandardKind};
use crate::tree::{NodeId, RangeArena, RangeId, TagArena, Tree};

/// How hard a context is allowed to work to accept a value. Ordered weakest
/// to strongest; see [`rank`](Sort::rank).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sort {
    Soft,
    Weak,
    Meek,
    Firm,
    Strong,
}

impl Sort {
    fn rank(self) -> u8 {
        match self {
            Sort::Soft => 0,
            Sort::Weak => 1,
            Sort::Meek => 2,
            Sort::Firm => 3,
            Sort::Strong => 4,
        }
    }

    fn at_least(self, other: Sort) -> bool {
        self.rank() >= other.rank()
    }
}

/// A context: the sort a unit is checked under, and the mode it should end
/// up as once every implicit coercion the sort allows has been applied.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Soid {
    pub(crate) sort: Sort,
    pub(crate) mode: ModeId,
}

impl Soid {
    fn new(sort: Sort, mode: ModeId) -> Self {
        Self { sort, mode }
    }
}

pub(crate) struct Checker<'a> {
    tree: &'a mut Tree,
    modes: &'a mut ModeTable,
    tags: &'a mut TagArena,
    ranges: &'a RangeArena,
    #[allow(dead_code)]
    interner: &'a Interner,
    sink: &'a mut DiagnosticSink,
    top_range: RangeId,
}

/// Checks and coerces every unit reachable from `root`'s program body,
/// inserting `DEREFERENCING`/`DEPROCEDURING`/`UNITING`/`WIDENING`/`ROWING`/
/// `VOIDING` nodes wherever an implicit conversion is required and legal.
#[instrument(level = "debug", skip_all, name = "phase_l_check")]
pub fn check(
    tree: &mut Tree,
    modes: &mut ModeTable,
    tags: &mut TagArena,
    ranges: &RangeArena,
    interner: &Interner,
    sink: &mut DiagnosticSink,
    root: NodeId,
    top_range: RangeId,
) {
    sink.begin_phase();
    let mut checker = Checker {
        tree,
        modes,
        tags,
        ranges,
        interner,
        sink,
        top_range,
    };
    let Some(body) = checker.tree.children(root).first().copied() else {
        return;
    };
    let void = checker.modes.void();
    checker.check_serial_like(body, Soid::new(Sort::Strong, void));
}

/// Transput acceptor modes: `SIMPLIN`/`SIMPLOUT` are synthetic unions over
/// every scalar standard mode (built once by `stdenv::build` via
/// [`ModeTable::synthetic_union`], named here since `synthetic_union`'s own
/// doc comment points at this function as the caller); `ROW_SIMPLIN`/
/// `ROW_SIMPLOUT` are the bare ROWS sentinel (and its `REF`) rather than a
/// union wrapping it, see the field comments on [`TransputModes`].
pub(crate) fn stdenv_modes(modes: &mut ModeTable) -> TransputModes {
    let rows = modes.rows();
    let int = modes.standard(StandardKind::Int, 0);
    let real = modes.standard(StandardKind::Real, 0);
    let bool_ = modes.standard(StandardKind::Bool, 0);
    let char_ = modes.standard(StandardKind::Char, 0);
    let string = modes.standard(StandardKind::String, 0);
    let bits = modes.standard(StandardKind::Bits, 0);

    let scalar_entry = |mode: ModeId| PackEntry {
        mode,
        field_name: None,
        defining_node: None,
    };
    let simplin_pack = vec![
        scalar_entry(modes.reff(int)),
        scalar_entry(modes.reff(real)),
        scalar_entry(modes.reff(bool_)),
        scalar_entry(modes.reff(char_)),
        scalar_entry(modes.reff(string)),
        scalar_entry(modes.reff(bits)),
    ];
    let simplout_pack = vec![
        scalar_entry(int),
        scalar_entry(real),
        scalar_entry(bool_),
        scalar_entry(char_),
        scalar_entry(string),
        scalar_entry(bits),
    ];
    TransputModes {
        simplin: modes.synthetic_union(simplin_pack),
        simplout: modes.synthetic_union(simplout_pack),
        // Not run through `synthetic_union`: a single-member union is
        // unconditionally collapsed to its sole member by
        // `mode::equivalence::absorb_and_contract_unions`, which would
        // silently turn this back into the bare `rows` sentinel anyway.
        // `coerce_to`'s ROWS-sentinel branch is written against that
        // sentinel directly, so build it that way from the start.
        row_simplin: modes.reff(rows),
        row_simplout: rows,
    }
}

pub(crate) struct TransputModes {
    pub(crate) simplin: ModeId,
    pub(crate) simplout: ModeId,
    pub(crate) row_simplin: ModeId,
    pub(crate) row_simplout: ModeId,
}

impl<'a> Checker<'a> {
    fn mode_of(&self, node: NodeId) -> ModeId {
        let slot = self.tree.node(node).mode_slot.expect("node has no mode_slot");
        ModeId::new(slot as usize)
    }

    fn set_mode(&mut self, node: NodeId, mode: ModeId) {
        self.tree.node_mut(node).mode_slot = Some(mode.index() as u32);
    }

    fn report(&mut self, code: ErrorCode, node: NodeId) {
        let range = self.tree.node(node).range;
        self.sink.report(Diagnostic::error(code, range));
    }

    fn warn(&mut self, code: ErrorCode, node: NodeId) {
        let range = self.tree.node(node).range;
        self.sink.report(Diagnostic::warning(code, range));
    }

    /// A serial clause's final item is checked under `target`; every earlier
    /// item is checked void (discarding its value, warning if it wasn't
    /// already void). `node` may itself not be a `SERIAL_CLAUSE` — the
    /// single-statement passthrough in `parser::reduce::parse_serial_clause`
    /// means a one-statement serial clause is never wrapped.
    fn check_serial_like(&mut self, node: NodeId, target: Soid) -> ModeId {
        if self.tree.node(node).kind != SyntaxKind::SERIAL_CLAUSE {
            return self.check_statement(node, target);
        }
        let children = self.tree.children(node);
        let last = children.len().saturating_sub(1);
        let mut result = self.modes.void();
        for (i, child) in children.into_iter().enumerate() {
            let void = self.modes.void();
            let item_target = if i == last { target } else { Soid::new(Sort::Strong, void) };
            result = self.check_statement(child, item_target);
        }
        result
    }

    /// A single serial-clause item: a declaration (void, but its
    /// initializer/body still has to check), a label (void, no coercion),
    /// or a plain unit.
    fn check_statement(&mut self, node: NodeId, target: Soid) -> ModeId {
        let kind = self.tree.node(node).kind;
        let natural = match kind {
            SyntaxKind::LABEL => self.modes.void(),
            SyntaxKind::MODE_DECLARATION => {
                self.check_mode_declaration(node);
                self.modes.void()
            }
            SyntaxKind::PRIORITY_DECLARATION => self.modes.void(),
            SyntaxKind::DECLARATION_LIST => {
                for child in self.tree.children(node) {
                    let void = self.modes.void();
                    self.check_statement(child, Soid::new(Sort::Strong, void));
                }
                self.modes.void()
            }
            SyntaxKind::IDENTITY_DECLARATION => {
                self.check_identity_declaration(node);
                self.modes.void()
            }
            SyntaxKind::VARIABLE_DECLARATION => {
                self.check_variable_declaration(node);
                self.modes.void()
            }
            SyntaxKind::PROC_IDENTITY_DECLARATION | SyntaxKind::PROC_VARIABLE_DECLARATION => {
                self.check_proc_declaration(node);
                self.modes.void()
            }
            SyntaxKind::OPERATOR_DECLARATION => {
                self.check_operator_declaration(node);
                self.modes.void()
            }
            _ => return self.check_unit(node, target),
        };
        self.coerce_to(node, natural, target)
    }

    /// Dispatches a unit to its natural-mode computation, then coerces the
    /// result to `target`. Balanced clauses push `target` into each branch
    /// themselves and return an already-coerced mode, so they're handled
    /// here rather than in `check_value`.
    fn check_unit(&mut self, node: NodeId, target: Soid) -> ModeId {
        match self.tree.node(node).kind {
            SyntaxKind::CLOSED_CLAUSE => {
                let serial = self.tree.children(node)[0];
                self.check_serial_like(serial, target)
            }
            SyntaxKind::ENCLOSED_CLAUSE => {
                let inner = self.tree.children(node)[0];
                self.check_unit(inner, target)
            }
            SyntaxKind::COLLATERAL_CLAUSE => self.check_collateral(node, target),
            SyntaxKind::CONDITIONAL_CLAUSE => self.check_conditional(node, target),
            SyntaxKind::CASE_CLAUSE => self.check_case(node, target),
            SyntaxKind::LOOP_CLAUSE => {
                self.check_loop(node);
                let void = self.modes.void();
                self.coerce_to(node, void, target)
            }
            SyntaxKind::CODE_CLAUSE => {
                let serial = self.tree.children(node)[1];
                let void = self.modes.void();
                self.check_serial_like(serial, Soid::new(Sort::Strong, void));
                self.coerce_to(node, void, target)
            }
            SyntaxKind::BRIEF_ROW_DISPLAY => {
                let children = self.tree.children(node);
                let units = children[1..children.len() - 1].to_vec();
                self.check_stowed(node, &units, target)
            }
            SyntaxKind::BRIEF_STRUCTURE_DISPLAY => {
                let children = self.tree.children(node);
                let units = children[1..children.len() - 1].to_vec();
                self.check_stowed(node, &units, target)
            }
            SyntaxKind::ROUTINE_TEXT | SyntaxKind::OPERATOR_PLAN => {
                let natural = self.check_routine_or_operator_plan(node);
                self.coerce_to(node, natural, target)
            }
            SyntaxKind::GENERATOR => {
                let natural = self.check_generator(node);
                self.coerce_to(node, natural, target)
            }
            SyntaxKind::CAST => {
                let natural = self.check_cast(node);
                self.coerce_to(node, natural, target)
            }
            SyntaxKind::ASSIGNATION => {
                let natural = self.check_assignation(node);
                self.coerce_to(node, natural, target)
            }
            SyntaxKind::IDENTITY_RELATION => {
                let natural = self.check_identity_relation(node);
                self.coerce_to(node, natural, target)
            }
            SyntaxKind::AND_FUNCTION | SyntaxKind::OR_FUNCTION => {
                let natural = self.check_and_or(node);
                self.coerce_to(node, natural, target)
            }
            SyntaxKind::MONADIC_FORMULA => {
                let natural = self.check_monadic_formula(node);
                self.coerce_to(node, natural, target)
            }
            SyntaxKind::DYADIC_FORMULA => {
                let natural = self.check_dyadic_formula(node);
                self.coerce_to(node, natural, target)
            }
            SyntaxKind::SPECIFICATION => {
                let natural = self.check_specification(node);
                self.coerce_to(node, natural, target)
            }
            SyntaxKind::SELECTION => {
                let natural = self.check_selection(node);
                self.coerce_to(node, natural, target)
            }
            _ => {
                let natural = self.check_value(node);
                self.coerce_to(node, natural, target)
            }
        }
    }

    /// Natural mode of an atomic unit — one with no branch structure of its
    /// own and nothing left to check underneath it.
    fn check_value(&mut self, node: NodeId) -> ModeId {
        let kind = self.tree.node(node).kind;
        if kind.is_denotation() {
            return self.mode_of(node);
        }
        match kind {
            SyntaxKind::TRUE_SYM | SyntaxKind::FALSE_SYM => self.modes.standard(StandardKind::Bool, 0),
            SyntaxKind::EMPTY_SYM => self.modes.void(),
            SyntaxKind::IDENTIFIER => {
                let Some(tag_id) = self.tree.node(node).tag else {
                    return self.modes.error();
                };
                let Some(slot) = self.tags.get(tag_id).mode else {
                    return self.modes.error();
                };
                ModeId::new(slot as usize)
            }
            SyntaxKind::JUMP => self.modes.hip(),
            SyntaxKind::SKIP | SyntaxKind::NIHIL => self.mode_of(node),
            SyntaxKind::FORMAT_TEXT => self.modes.standard(StandardKind::Format, 0),
            _ => self.modes.error(),
        }
    }

    fn check_mode_declaration(&mut self, node: NodeId) {
        let children = self.tree.children(node);
        self.check_declarer_bounds(children[2]);
    }
}
