//! Top-down framing (component E): recognizes the clause structure that
//! opens a new range — closed clauses, conditional/case/loop clauses
//! (their enquiry and in-parts share the enclosing range, but the
//! consequent/alternative serial clauses are ordinary nested code, not
//! fresh scopes, matching Algol 68's rule that only a *declarative* serial
//! clause or a routine text opens a range) — and routine texts, which do.
//!
//! Declaration pre-scan (component F) runs once per opened range, bounded
//! by [`find_matching_end`] over that range's own token span, immediately
//! before the range's body is walked.

use crate::kind::SyntaxKind;
use crate::tree::{NodeId, RangeId};

use super::brackets::find_matching_end;
use super::prescan;
use super::reduce;
use super::Parser;

/// Entry point: the whole token stream is one program. A source starting
/// with `BEGIN` is a closed clause in the top-level range; anything else is
/// treated as a bare serial clause directly in the top-level range, the
/// shorthand most Algol 68 implementations accept for a one-clause source.
pub(crate) fn parse_program(p: &mut Parser, top_range: RangeId) -> NodeId {
    let start = p.pos;
    let end = if p.at(SyntaxKind::BEGIN_SYM) {
        find_matching_end(p.tokens, start)
    } else {
        p.tokens.len().saturating_sub(1)
    };
    prescan::scan(p, top_range, start, end);

    let body = if p.at(SyntaxKind::BEGIN_SYM) {
        let begin = p.bump();
        let serial = reduce::parse_serial_clause(p, top_range);
        let end_tok = p.expect(SyntaxKind::END_SYM);
        let closed = p.tree.wrap(SyntaxKind::CLOSED_CLAUSE, &[begin, serial, end_tok]);
        p.tree.set_owns_range(closed, top_range);
        closed
    } else {
        reduce::parse_serial_clause(p, top_range)
    };
    let program = p.tree.wrap(SyntaxKind::PROGRAM, &[body]);
    p.tree.set_owns_range(program, top_range);
    program
}

/// Opens a fresh child range, pre-scans it, and dispatches on the token
/// that introduces an enclosed clause. Returns `None` if the current token
/// cannot start one, so callers (the unit parser's primary fallback) can
/// try something else without consuming input.
pub(crate) fn try_parse_enclosed_clause(p: &mut Parser, parent: RangeId) -> Option<NodeId> {
    match p.current_kind() {
        SyntaxKind::BEGIN_SYM | SyntaxKind::OPEN_PAREN => Some(parse_closed_or_collateral(p, parent)),
        SyntaxKind::IF_SYM => Some(parse_conditional_clause(p, parent)),
        SyntaxKind::CASE_SYM => Some(parse_case_clause(p, parent)),
        SyntaxKind::FOR_SYM | SyntaxKind::FROM_SYM | SyntaxKind::BY_SYM | SyntaxKind::TO_SYM | SyntaxKind::WHILE_SYM | SyntaxKind::DO_SYM => {
            Some(parse_loop_clause(p, parent))
        }
        SyntaxKind::CODE_SYM => Some(parse_code_clause(p, parent)),
        _ => None,
    }
}

/// A new range for a bracketed clause body, pre-scanned over its own
/// token span so forward-referencing `MODE`/`OP`/`PRIO`/label declarations
/// inside it resolve before the body is walked left to right.
fn open_range(p: &mut Parser, parent: RangeId) -> RangeId {
    let range = p.ranges.push(Some(parent), Some(parent));
    let start = p.pos;
    let end = find_matching_end(p.tokens, start);
    prescan::scan(p, range, start, end);
    range
}

/// `BEGIN serial-clause END` or `( serial-clause )` is a closed clause; the
/// same delimiters with comma-separated units instead form a collateral
/// clause (a structure or array display, or the argument list of a
/// parallel clause). Both open one range.
fn parse_closed_or_collateral(p: &mut Parser, parent: RangeId) -> NodeId {
    let range = open_range(p, parent);
    let uses_parens = p.at(SyntaxKind::OPEN_PAREN);
    let open = if uses_parens {
        p.bump()
    } else {
        p.expect(SyntaxKind::BEGIN_SYM)
    };
    let closing = if uses_parens { SyntaxKind::CLOSE_PAREN } else { SyntaxKind::END_SYM };

    if is_collateral_lookahead(p) {
        let mut units = vec![reduce::parse_unit(p, range)];
        while p.eat(SyntaxKind::COMMA).is_some() {
            units.push(reduce::parse_unit(p, range));
        }
        let close = p.expect(closing);
        let collateral = p.tree.wrap(SyntaxKind::COLLATERAL_CLAUSE, &units);
        let enclosed = p.tree.wrap(SyntaxKind::ENCLOSED_CLAUSE, &[open, collateral, close]);
        p.tree.set_owns_range(enclosed, range);
        return enclosed;
    }

    let serial = reduce::parse_serial_clause(p, range);
    let close = p.expect(closing);
    let closed = p.tree.wrap(SyntaxKind::CLOSED_CLAUSE, &[open, serial, close]);
    p.tree.set_owns_range(closed, range);
    closed
}

/// A shallow forward scan (bracket-depth aware, not consuming) deciding
/// whether this bracketed body is comma-separated (collateral) rather than
/// semicolon/declaration separated (serial) — Algol 68's grammar is
/// ambiguous here only at the lexical level; a single top-level comma
/// before the matching closer settles it.
fn is_collateral_lookahead(p: &Parser) -> bool {
    let mut depth = 0i32;
    for token in &p.tokens[p.pos..] {
        match super::brackets::opener(token.kind) {
            Some(_) => {
                depth += 1;
                continue;
            }
            None => {}
        }
        if super::brackets::closer(token.kind).is_some() {
            if depth == 0 {
                return false;
            }
            depth -= 1;
            continue;
        }
        if depth == 0 && token.kind == SyntaxKind::COMMA {
            return true;
        }
        if depth == 0 && token.kind == SyntaxKind::SEMI {
            return false;
        }
    }
    false
}

fn parse_conditional_clause(p: &mut Parser, parent: RangeId) -> NodeId {
    let mut children = Vec::new();
    children.push(p.expect(SyntaxKind::IF_SYM));
    let enquiry_range = open_range(p, parent);
    children.push(reduce::parse_serial_clause(p, enquiry_range));
    children.push(p.expect(SyntaxKind::THEN_SYM));
    let then_range = p.ranges.push(Some(enquiry_range), Some(parent));
    children.push(reduce::parse_serial_clause(p, then_range));

    while p.at(SyntaxKind::ELIF_SYM) {
        children.push(p.bump());
        let elif_enquiry = open_range(p, parent);
        children.push(reduce::parse_serial_clause(p, elif_enquiry));
        children.push(p.expect(SyntaxKind::THEN_SYM));
        let elif_then = p.ranges.push(Some(elif_enquiry), Some(parent));
        children.push(reduce::parse_serial_clause(p, elif_then));
    }
    if p.at(SyntaxKind::ELSE_SYM) {
        children.push(p.bump());
        let else_range = p.ranges.push(Some(parent), Some(parent));
        children.push(reduce::parse_serial_clause(p, else_range));
    }
    children.push(p.expect(SyntaxKind::FI_SYM));
    p.tree.wrap(SyntaxKind::CONDITIONAL_CLAUSE, &children)
}

fn parse_case_clause(p: &mut Parser, parent: RangeId) -> NodeId {
    let mut children = Vec::new();
    children.push(p.expect(SyntaxKind::CASE_SYM));
    let enquiry_range = open_range(p, parent);
    children.push(reduce::parse_serial_clause(p, enquiry_range));
    children.push(p.expect(SyntaxKind::IN_SYM));
    children.push(parse_case_part_units(p, enquiry_range));

    while p.at(SyntaxKind::OUSE_SYM) {
        children.push(p.bump());
        let ouse_enquiry = open_range(p, parent);
        children.push(reduce::parse_serial_clause(p, ouse_enquiry));
        children.push(p.expect(SyntaxKind::IN_SYM));
        children.push(parse_case_part_units(p, ouse_enquiry));
    }
    if p.at(SyntaxKind::OUT_SYM) {
        children.push(p.bump());
        let out_range = p.ranges.push(Some(parent), Some(parent));
        children.push(reduce::parse_serial_clause(p, out_range));
    }
    children.push(p.expect(SyntaxKind::ESAC_SYM));
    p.tree.wrap(SyntaxKind::CASE_CLAUSE, &children)
}

fn parse_case_part_units(p: &mut Parser, conformity_range: RangeId) -> NodeId {
    let mut units = vec![reduce::parse_unit(p, conformity_range)];
    while p.eat(SyntaxKind::COMMA).is_some() {
        units.push(reduce::parse_unit(p, conformity_range));
    }
    p.tree.wrap(SyntaxKind::CASE_PART, &units)
}

fn parse_loop_clause(p: &mut Parser, parent: RangeId) -> NodeId {
    let range = p.ranges.push(Some(parent), Some(parent));
    let mut children = Vec::new();

    if p.at(SyntaxKind::FOR_SYM) {
        children.push(p.bump());
        let index_node = p.expect(SyntaxKind::IDENTIFIER);
        if let Some(name) = p.tree.node(index_node).spelling {
            p.declare(range, crate::tree::TagKind::Identifier, name, index_node);
        }
        children.push(index_node);
    }
    if p.at(SyntaxKind::FROM_SYM) {
        children.push(p.bump());
        children.push(reduce::parse_unit(p, range));
    }
    if p.at(SyntaxKind::BY_SYM) {
        children.push(p.bump());
        children.push(reduce::parse_unit(p, range));
    }
    if p.at(SyntaxKind::TO_SYM) || p.at(SyntaxKind::DOWNTO_SYM) {
        children.push(p.bump());
        children.push(reduce::parse_unit(p, range));
    }
    if p.at(SyntaxKind::WHILE_SYM) {
        children.push(p.bump());
        children.push(reduce::parse_serial_clause(p, range));
    }
    children.push(p.expect(SyntaxKind::DO_SYM));
    let body_range = p.ranges.push(Some(range), Some(parent));
    children.push(reduce::parse_serial_clause(p, body_range));
    children.push(p.expect(SyntaxKind::OD_SYM));
    let loop_clause = p.tree.wrap(SyntaxKind::LOOP_CLAUSE, &children);
    p.tree.set_owns_range(loop_clause, range);
    loop_clause
}

fn parse_code_clause(p: &mut Parser, parent: RangeId) -> NodeId {
    let code = p.expect(SyntaxKind::CODE_SYM);
    let range = p.ranges.push(Some(parent), Some(parent));
    let serial = reduce::parse_serial_clause(p, range);
    let edoc = p.expect(SyntaxKind::EDOC_SYM);
    let code_clause = p.tree.wrap(SyntaxKind::CODE_CLAUSE, &[code, serial, edoc]);
    p.tree.set_owns_range(code_clause, range);
    code_clause
}

/// `( formal-params ) declarer? : unit` — the one production that always
/// opens a range regardless of how it is reached (directly after `PROC`, or
/// as a generator/cast's operand).
pub(crate) fn parse_routine_text(p: &mut Parser, parent: RangeId) -> NodeId {
    let range = p.ranges.push(Some(parent), Some(parent));
    let mut children = Vec::new();

    if p.at(SyntaxKind::OPEN_PAREN) {
        children.push(p.bump());
        if !p.at(SyntaxKind::CLOSE_PAREN) {
            children.push(parse_formal_parameter(p, range));
            while p.eat(SyntaxKind::COMMA).is_some() {
                children.push(parse_formal_parameter(p, range));
            }
        }
        children.push(p.expect(SyntaxKind::CLOSE_PAREN));
    }
    if reduce::at_declarer_start(p) {
        children.push(reduce::parse_declarer(p, range));
    }
    children.push(p.expect(SyntaxKind::COLON));
    children.push(reduce::parse_unit(p, range));
    let routine_text = p.tree.wrap(SyntaxKind::ROUTINE_TEXT, &children);
    p.tree.set_owns_range(routine_text, range);
    routine_text
}

fn parse_formal_parameter(p: &mut Parser, range: RangeId) -> NodeId {
    let declarer = reduce::parse_declarer(p, range);
    let name_node = p.expect(SyntaxKind::IDENTIFIER);
    if let Some(name) = p.tree.node(name_node).spelling {
        p.declare(range, crate::tree::TagKind::Identifier, name, name_node);
    }
    p.tree.wrap(SyntaxKind::FORMAL_PARAMETER, &[declarer, name_node])
}
