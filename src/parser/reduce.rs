//! Bottom-up reduction (component G): the recursive-descent grammar proper.
//! Declarations, units, and the declarer sublanguage all live here; framing
//! (component E, the enclosed clauses that open a range) stays in
//! `framer`, which calls back into this module for every declarer and unit
//! it needs. The split mirrors Algol 68's own grammar: "declarer" and
//! "unit" are each entire sublanguages referenced from dozens of
//! productions, so they get one dispatcher apiece instead of being inlined
//! at every call site.
//!
//! Binding (component J) is deferred entirely: an applied IDENTIFIER,
//! BOLD_TAG, or OPERATOR leaf built here carries only its spelling, not a
//! resolved tag. The one exception is declaring occurrences — a
//! MODE/PRIO/OP name, a label, or an identifier's own declaration — which
//! must be bound here so the range's symbol table is complete by the time
//! this range's reduction finishes. MODE, PRIO, and label names were
//! already pre-declared by `prescan`, so their defining occurrence here
//! *rebinds* the existing tag rather than re-declaring (an operator name has
//! no such step: `TagKind::Op` allows overloading, so declaring it fresh
//! here is always safe, leaving `prescan`'s own phantom entry as an inert,
//! mode-less duplicate that later phases simply skip).

use crate::base::Name;
use crate::diag::{Diagnostic, ErrorCode};
use crate::kind::SyntaxKind;
use crate::tree::{NodeId, RangeId, TagKind};

use super::framer;
use super::Parser;

// ===================================================================
// Units — assignation > tertiary > formula (priority-climbing) > monadic
// > secondary (generator/selection) > primary.
// ===================================================================

pub(crate) fn parse_unit(p: &mut Parser, range: RangeId) -> NodeId {
    parse_assignation(p, range)
}

fn parse_assignation(p: &mut Parser, range: RangeId) -> NodeId {
    let lhs = parse_tertiary(p, range);
    if let Some(becomes) = p.eat(SyntaxKind::BECOMES) {
        let rhs = parse_unit(p, range); // right-associative
        return p.tree.wrap(SyntaxKind::ASSIGNATION, &[lhs, becomes, rhs]);
    }
    lhs
}

fn parse_tertiary(p: &mut Parser, range: RangeId) -> NodeId {
    let lhs = parse_formula(p, range, 1);
    if p.at(SyntaxKind::IS_SYM) || p.at(SyntaxKind::ISNT_SYM) {
        let op = p.bump();
        let rhs = parse_formula(p, range, 1);
        return p.tree.wrap(SyntaxKind::IDENTITY_RELATION, &[lhs, op, rhs]);
    }
    if p.at(SyntaxKind::ANDF_SYM) {
        let op = p.bump();
        let rhs = parse_formula(p, range, 1);
        return p.tree.wrap(SyntaxKind::AND_FUNCTION, &[lhs, op, rhs]);
    }
    if p.at(SyntaxKind::ORF_SYM) {
        let op = p.bump();
        let rhs = parse_formula(p, range, 1);
        return p.tree.wrap(SyntaxKind::OR_FUNCTION, &[lhs, op, rhs]);
    }
    lhs
}

/// Operator-precedence (priority-climbing) parse of dyadic formulae. A
/// standard-environ range will eventually make every standard operator's
/// priority visible through `current_operator_priority`'s range-chain
/// lookup; until `stdenv` wires that range in as every program's ancestor,
/// `standard_priority` supplies the same numbers directly as a bootstrap
/// fallback (see DESIGN.md).
fn parse_formula(p: &mut Parser, range: RangeId, min_priority: u8) -> NodeId {
    let mut lhs = parse_monadic(p, range);
    loop {
        let Some((_name, prio)) = current_operator_priority(p, range) else {
            break;
        };
        if prio < min_priority {
            break;
        }
        let op_node = p.bump();
        let rhs = parse_formula(p, range, prio + 1);
        lhs = p.tree.wrap(SyntaxKind::DYADIC_FORMULA, &[lhs, op_node, rhs]);
    }
    lhs
}

fn parse_monadic(p: &mut Parser, range: RangeId) -> NodeId {
    if p.at(SyntaxKind::OPERATOR) {
        let op = p.bump();
        let operand = parse_monadic(p, range);
        return p.tree.wrap(SyntaxKind::MONADIC_FORMULA, &[op, operand]);
    }
    parse_secondary(p, range)
}

fn current_operator_priority(p: &Parser, range: RangeId) -> Option<(Name, u8)> {
    if !p.at(SyntaxKind::OPERATOR) {
        return None;
    }
    let name = p.current_token_spelling()?;
    for tag_id in p.ranges_lookup_operators(range, name) {
        if let Some(prio) = p.tag_priority(tag_id) {
            return Some((name, prio));
        }
    }
    standard_priority(p.interner_resolve(name)).map(|prio| (name, prio))
}

fn standard_priority(spelling: &str) -> Option<u8> {
    Some(match spelling {
        "**" | "SHL" | "SHR" | "UP" | "DOWN" => 9,
        "*" | "/" | "OVER" | "MOD" | "ELEM" => 8,
        "+" | "-" => 7,
        "<" | "<=" | ">" | ">=" => 6,
        "=" | "/=" => 5,
        "&" | "AND" => 4,
        "OR" => 3,
        _ => return None,
    })
}

fn parse_secondary(p: &mut Parser, range: RangeId) -> NodeId {
    if at_generator_start(p) {
        return parse_generator(p, range);
    }
    if p.at(SyntaxKind::IDENTIFIER) && p.nth_kind(1) == SyntaxKind::OF_SYM {
        let selector_leaf = p.bump();
        let selector = p.tree.wrap(SyntaxKind::SELECTOR, &[selector_leaf]);
        let of_tok = p.bump();
        let operand = parse_secondary(p, range);
        return p.tree.wrap(SyntaxKind::SELECTION, &[selector, of_tok, operand]);
    }
    let atom = parse_primary(p, range);
    apply_postfix(p, range, atom)
}

fn at_generator_start(p: &Parser) -> bool {
    matches!(p.current_kind(), SyntaxKind::LOC_SYM | SyntaxKind::HEAP_SYM | SyntaxKind::NEW_SYM)
}

fn parse_generator(p: &mut Parser, range: RangeId) -> NodeId {
    let kw = p.bump();
    let declarer = parse_declarer(p, range);
    p.tree.wrap(SyntaxKind::GENERATOR, &[kw, declarer])
}

/// Postfix `(args)`/`[args]` is built as one unified `SPECIFICATION` node
/// regardless of whether it turns out to be a call or a slice — component L
/// relabels `node.kind` to `CALL`/`SLICE` in place once the operand's mode is
/// known, since that is the only point at which the two are distinguishable.
fn apply_postfix(p: &mut Parser, range: RangeId, mut atom: NodeId) -> NodeId {
    loop {
        if p.at(SyntaxKind::OPEN_PAREN) {
            let open = p.bump();
            let mut args = Vec::new();
            if !p.at(SyntaxKind::CLOSE_PAREN) {
                args.push(parse_unit(p, range));
                while p.eat(SyntaxKind::COMMA).is_some() {
                    args.push(parse_unit(p, range));
                }
            }
            let arglist = if args.is_empty() {
                p.tree.push_leaf(SyntaxKind::ARGUMENT_LIST, None, p.current_range())
            } else {
                p.tree.wrap(SyntaxKind::ARGUMENT_LIST, &args)
            };
            let close = p.expect(SyntaxKind::CLOSE_PAREN);
            atom = p.tree.wrap(SyntaxKind::SPECIFICATION, &[atom, open, arglist, close]);
            continue;
        }
        if p.at(SyntaxKind::OPEN_BRACKET) {
            let open = p.bump();
            let mut args = vec![parse_generic_argument_entry(p, range)];
            while p.eat(SyntaxKind::COMMA).is_some() {
                args.push(parse_generic_argument_entry(p, range));
            }
            let garg = p.tree.wrap(SyntaxKind::GENERIC_ARGUMENT, &args);
            let close = p.expect(SyntaxKind::CLOSE_BRACKET);
            atom = p.tree.wrap(SyntaxKind::SPECIFICATION, &[atom, open, garg, close]);
            continue;
        }
        break;
    }
    atom
}

/// One entry of a `[...]` generic argument: a plain unit (an index) or a
/// trimmer `lower:upper[@base]` (wrapped as `BOUND`, reusing the same node
/// kind a row declarer's bound uses — component L tells the two apart by
/// position, not shape). An omitted entry (`a[, 3]`) is an empty `BOUND`.
fn parse_generic_argument_entry(p: &mut Parser, range: RangeId) -> NodeId {
    if p.at_any(&[SyntaxKind::COMMA, SyntaxKind::CLOSE_BRACKET]) {
        return p.tree.push_leaf(SyntaxKind::BOUND, None, p.current_range());
    }
    let first = parse_unit(p, range);
    let mut children = vec![first];
    if p.at(SyntaxKind::UPTO_SYM) {
        children.push(p.bump());
        children.push(parse_unit(p, range));
    }
    if p.at(SyntaxKind::AT) {
        children.push(p.bump());
        children.push(parse_unit(p, range));
    }
    if children.len() == 1 {
        return children.into_iter().next().unwrap();
    }
    p.tree.wrap(SyntaxKind::BOUND, &children)
}

fn parse_primary(p: &mut Parser, range: RangeId) -> NodeId {
    let kind = p.current_kind();
    if kind.is_denotation() {
        return p.bump();
    }
    match kind {
        SyntaxKind::NIL_SYM => {
            let t = p.bump();
            p.tree.wrap(SyntaxKind::NIHIL, &[t])
        }
        SyntaxKind::SKIP_SYM => {
            let t = p.bump();
            p.tree.wrap(SyntaxKind::SKIP, &[t])
        }
        SyntaxKind::EMPTY_SYM => p.bump(),
        SyntaxKind::TRUE_SYM | SyntaxKind::FALSE_SYM => p.bump(),
        SyntaxKind::GOTO_SYM | SyntaxKind::GO_SYM => parse_jump(p, range),
        SyntaxKind::IDENTIFIER => p.bump(),
        SyntaxKind::OPEN_BRACKET => parse_brief_row_display(p, range),
        SyntaxKind::OPEN_BRACE => parse_brief_structure_display(p, range),
        SyntaxKind::DOLLAR => parse_format_text(p, range),
        k if is_declarer_start_kind(k) => parse_cast(p, range),
        _ => {
            if kind == SyntaxKind::OPEN_PAREN && looks_like_routine_text(p) {
                return framer::parse_routine_text(p, range);
            }
            if let Some(enclosed) = framer::try_parse_enclosed_clause(p, range) {
                return enclosed;
            }
            p.report(ErrorCode::InvalidSequence, p.current_range());
            p.recover_until(&[
                SyntaxKind::SEMI,
                SyntaxKind::END_SYM,
                SyntaxKind::FI_SYM,
                SyntaxKind::ESAC_SYM,
                SyntaxKind::OD_SYM,
                SyntaxKind::CLOSE_PAREN,
                SyntaxKind::COMMA,
                SyntaxKind::EDOC_SYM,
            ])
        }
    }
}

/// `(` starts a routine-text value (`(formals) declarer? : unit`) rather
/// than a closed/collateral clause exactly when the token right after it
/// begins a declarer, or immediately closes an empty formal-parameter pack.
fn looks_like_routine_text(p: &Parser) -> bool {
    if p.current_kind() != SyntaxKind::OPEN_PAREN {
        return false;
    }
    match p.nth_kind(1) {
        SyntaxKind::CLOSE_PAREN => true,
        k => is_declarer_start_kind(k),
    }
}

fn parse_cast(p: &mut Parser, range: RangeId) -> NodeId {
    let declarer = parse_declarer(p, range);
    if p.at(SyntaxKind::OPEN_PAREN) {
        let open = p.bump();
        let unit = parse_unit(p, range);
        let close = p.expect(SyntaxKind::CLOSE_PAREN);
        return p.tree.wrap(SyntaxKind::CAST, &[declarer, open, unit, close]);
    }
    if let Some(enclosed) = framer::try_parse_enclosed_clause(p, range) {
        return p.tree.wrap(SyntaxKind::CAST, &[declarer, enclosed]);
    }
    p.report(ErrorCode::InvalidSequence, p.tree.node(declarer).range);
    declarer
}

fn parse_jump(p: &mut Parser, range: RangeId) -> NodeId {
    let _ = range;
    if p.at(SyntaxKind::GOTO_SYM) {
        let goto = p.bump();
        let label = p.expect(SyntaxKind::IDENTIFIER);
        return p.tree.wrap(SyntaxKind::JUMP, &[goto, label]);
    }
    let go = p.bump();
    let to = p.expect(SyntaxKind::TO_SYM);
    let label = p.expect(SyntaxKind::IDENTIFIER);
    p.tree.wrap(SyntaxKind::JUMP, &[go, to, label])
}

fn parse_brief_row_display(p: &mut Parser, range: RangeId) -> NodeId {
    let open = p.bump();
    let mut children = vec![open];
    if !p.at(SyntaxKind::CLOSE_BRACKET) {
        children.push(parse_unit(p, range));
        while p.eat(SyntaxKind::COMMA).is_some() {
            children.push(parse_unit(p, range));
        }
    }
    children.push(p.expect(SyntaxKind::CLOSE_BRACKET));
    p.tree.wrap(SyntaxKind::BRIEF_ROW_DISPLAY, &children)
}

fn parse_brief_structure_display(p: &mut Parser, range: RangeId) -> NodeId {
    let open = p.bump();
    let mut children = vec![open];
    if !p.at(SyntaxKind::CLOSE_BRACE) {
        children.push(parse_unit(p, range));
        while p.eat(SyntaxKind::COMMA).is_some() {
            children.push(parse_unit(p, range));
        }
    }
    children.push(p.expect(SyntaxKind::CLOSE_BRACE));
    p.tree.wrap(SyntaxKind::BRIEF_STRUCTURE_DISPLAY, &children)
}

/// A `$...$` format text. Pictures are not structurally parsed (no
/// replicator/insertion/pattern breakdown): every token between the
/// delimiters is collected flat into one `PICTURE_LIST`, since nothing
/// downstream of reduction currently interprets picture shape. A future
/// formatted-transput checker would need to replace this with a real
/// picture grammar.
fn parse_format_text(p: &mut Parser, range: RangeId) -> NodeId {
    let _ = range;
    let open = p.bump();
    let mut items = Vec::new();
    while !p.at(SyntaxKind::DOLLAR) && !p.at_eof() {
        items.push(p.bump());
    }
    let close = p.expect(SyntaxKind::DOLLAR);
    let mut children = vec![open];
    if !items.is_empty() {
        children.push(p.tree.wrap(SyntaxKind::PICTURE_LIST, &items));
    }
    children.push(close);
    p.tree.wrap(SyntaxKind::FORMAT_TEXT, &children)
}

// ===================================================================
// Declarers
// ===================================================================

fn is_declarer_start_kind(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::VOID_SYM
            | SyntaxKind::LONG_SYM
            | SyntaxKind::SHORT_SYM
            | SyntaxKind::INT_SYM
            | SyntaxKind::REAL_SYM
            | SyntaxKind::COMPLEX_SYM
            | SyntaxKind::BOOL_SYM
            | SyntaxKind::CHAR_SYM
            | SyntaxKind::BITS_SYM
            | SyntaxKind::BYTES_SYM
            | SyntaxKind::STRING_SYM
            | SyntaxKind::FORMAT_SYM
            | SyntaxKind::FILE_SYM
            | SyntaxKind::REF_SYM
            | SyntaxKind::FLEX_SYM
            | SyntaxKind::OPEN_BRACKET
            | SyntaxKind::STRUCT_SYM
            | SyntaxKind::UNION_SYM
            | SyntaxKind::PROC_SYM
            | SyntaxKind::BOLD_TAG
    )
}

pub(crate) fn at_declarer_start(p: &Parser) -> bool {
    is_declarer_start_kind(p.current_kind())
}

pub(crate) fn parse_declarer(p: &mut Parser, range: RangeId) -> NodeId {
    match p.current_kind() {
        SyntaxKind::VOID_SYM => p.bump(),
        SyntaxKind::LONG_SYM
        | SyntaxKind::SHORT_SYM
        | SyntaxKind::INT_SYM
        | SyntaxKind::REAL_SYM
        | SyntaxKind::COMPLEX_SYM
        | SyntaxKind::BOOL_SYM
        | SyntaxKind::CHAR_SYM
        | SyntaxKind::BITS_SYM
        | SyntaxKind::BYTES_SYM
        | SyntaxKind::STRING_SYM
        | SyntaxKind::FORMAT_SYM
        | SyntaxKind::FILE_SYM => parse_standard_declarer(p),
        SyntaxKind::REF_SYM => parse_ref_declarer(p, range),
        SyntaxKind::FLEX_SYM => parse_flex_declarer(p, range),
        SyntaxKind::OPEN_BRACKET => parse_row_declarer(p, range),
        SyntaxKind::STRUCT_SYM => parse_struct_declarer(p, range),
        SyntaxKind::UNION_SYM => parse_union_declarer(p, range),
        SyntaxKind::PROC_SYM => parse_proc_declarer(p, range),
        SyntaxKind::BOLD_TAG => p.bump(),
        _ => {
            p.report(ErrorCode::InvalidSequence, p.current_range());
            p.tree.push_leaf(SyntaxKind::ERROR, None, p.current_range())
        }
    }
}

fn parse_standard_declarer(p: &mut Parser) -> NodeId {
    let mut children = Vec::new();
    while matches!(p.current_kind(), SyntaxKind::LONG_SYM | SyntaxKind::SHORT_SYM) {
        children.push(p.bump());
    }
    children.push(p.bump());
    p.tree.wrap(SyntaxKind::STANDARD_DECLARER, &children)
}

fn parse_ref_declarer(p: &mut Parser, range: RangeId) -> NodeId {
    let ref_kw = p.bump();
    let inner = parse_declarer(p, range);
    p.tree.wrap(SyntaxKind::REF_DECLARER, &[ref_kw, inner])
}

fn parse_flex_declarer(p: &mut Parser, range: RangeId) -> NodeId {
    let flex_kw = p.bump();
    let inner = parse_declarer(p, range);
    p.tree.wrap(SyntaxKind::FLEX_DECLARER, &[flex_kw, inner])
}

fn parse_row_declarer(p: &mut Parser, range: RangeId) -> NodeId {
    let open = p.bump();
    let mut children = vec![open];
    children.push(parse_bound(p, range));
    while p.eat(SyntaxKind::COMMA).is_some() {
        children.push(parse_bound(p, range));
    }
    children.push(p.expect(SyntaxKind::CLOSE_BRACKET));
    children.push(parse_declarer(p, range));
    p.tree.wrap(SyntaxKind::ROW_DECLARER, &children)
}

/// A bound is `unit` (lower defaults to 1) or `unit : unit`; empty (between
/// two commas, or immediately before the closing bracket) for an
/// unspecified-bound row declarer (`FLEX[]INT`, `[,]INT`).
fn parse_bound(p: &mut Parser, range: RangeId) -> NodeId {
    if p.at_any(&[SyntaxKind::COMMA, SyntaxKind::CLOSE_BRACKET]) {
        return p.tree.push_leaf(SyntaxKind::BOUND, None, p.current_range());
    }
    let first = parse_unit(p, range);
    if p.at(SyntaxKind::UPTO_SYM) {
        let colon = p.bump();
        let upper = parse_unit(p, range);
        return p.tree.wrap(SyntaxKind::BOUND, &[first, colon, upper]);
    }
    p.tree.wrap(SyntaxKind::BOUND, &[first])
}

fn parse_struct_declarer(p: &mut Parser, range: RangeId) -> NodeId {
    let struct_kw = p.bump();
    let open = p.expect(SyntaxKind::OPEN_PAREN);
    let mut children = vec![struct_kw, open];
    children.push(parse_field(p, range));
    while p.eat(SyntaxKind::COMMA).is_some() {
        children.push(parse_field(p, range));
    }
    children.push(p.expect(SyntaxKind::CLOSE_PAREN));
    p.tree.wrap(SyntaxKind::STRUCT_DECLARER, &children)
}

/// One `declarer name, name, ...` group; several names after one declarer
/// share its mode (`STRUCT(INT a, b, REAL c)`). Only consumes a further
/// `, name` when the token right after the comma really is a bare
/// identifier — a declarer keyword there means a new field is starting.
fn parse_field(p: &mut Parser, range: RangeId) -> NodeId {
    let declarer = parse_declarer(p, range);
    let mut children = vec![declarer, p.expect(SyntaxKind::IDENTIFIER)];
    while p.at(SyntaxKind::COMMA) && p.nth_kind(1) == SyntaxKind::IDENTIFIER {
        children.push(p.bump());
        children.push(p.bump());
    }
    p.tree.wrap(SyntaxKind::FIELD, &children)
}

fn parse_union_declarer(p: &mut Parser, range: RangeId) -> NodeId {
    let union_kw = p.bump();
    let open = p.expect(SyntaxKind::OPEN_PAREN);
    let mut children = vec![union_kw, open];
    children.push(parse_union_member(p, range));
    while p.eat(SyntaxKind::COMMA).is_some() {
        children.push(parse_union_member(p, range));
    }
    children.push(p.expect(SyntaxKind::CLOSE_PAREN));
    p.tree.wrap(SyntaxKind::UNION_DECLARER, &children)
}

/// Union members are unnamed: one `FIELD` wrapping a lone declarer.
fn parse_union_member(p: &mut Parser, range: RangeId) -> NodeId {
    let declarer = parse_declarer(p, range);
    p.tree.wrap(SyntaxKind::FIELD, &[declarer])
}

fn parse_proc_declarer(p: &mut Parser, range: RangeId) -> NodeId {
    let proc_kw = p.bump();
    let mut children = vec![proc_kw];
    if p.at(SyntaxKind::OPEN_PAREN) {
        children.push(p.bump());
        if !p.at(SyntaxKind::CLOSE_PAREN) {
            children.push(parse_formal_declarer(p, range));
            while p.eat(SyntaxKind::COMMA).is_some() {
                children.push(parse_formal_declarer(p, range));
            }
        }
        children.push(p.expect(SyntaxKind::CLOSE_PAREN));
    }
    // The result declarer is always pushed last, real or synthetic, so the
    // collector's `children.last()` never mistakes a formal parameter for it.
    if at_declarer_start(p) {
        children.push(parse_declarer(p, range));
    } else {
        children.push(p.tree.push_leaf(SyntaxKind::VOID_SYM, None, p.current_range()));
    }
    p.tree.wrap(SyntaxKind::PROC_DECLARER, &children)
}

fn parse_formal_declarer(p: &mut Parser, range: RangeId) -> NodeId {
    let declarer = parse_declarer(p, range);
    p.tree.wrap(SyntaxKind::FORMAL_PARAMETER, &[declarer])
}

// ===================================================================
// Statements: declarations dispatch before falling back to a plain unit.
// ===================================================================

fn parse_statement(p: &mut Parser, range: RangeId) -> NodeId {
    match p.current_kind() {
        SyntaxKind::MODE_SYM => parse_mode_declaration(p, range),
        SyntaxKind::PRIO_SYM => parse_priority_declaration(p, range),
        SyntaxKind::OP_SYM => parse_operator_declaration(p, range),
        SyntaxKind::PROC_SYM if is_proc_declaration_lookahead(p) => parse_proc_declaration(p, range),
        k if is_declarer_start_kind(k) => parse_declarer_led(p, range),
        _ => parse_unit(p, range),
    }
}

fn is_declaration_start(p: &Parser) -> bool {
    matches!(p.current_kind(), SyntaxKind::MODE_SYM | SyntaxKind::PRIO_SYM | SyntaxKind::OP_SYM)
        || (p.current_kind() == SyntaxKind::PROC_SYM && is_proc_declaration_lookahead(p))
}

fn is_proc_declaration_lookahead(p: &Parser) -> bool {
    p.nth_kind(1) == SyntaxKind::IDENTIFIER && is_assign_like(p, 2)
}

fn is_assign_like(p: &Parser, n: usize) -> bool {
    match p.nth_kind(n) {
        SyntaxKind::BECOMES | SyntaxKind::COLON_BECOMES => true,
        SyntaxKind::OPERATOR => p.nth_token_is_equals(n),
        _ => false,
    }
}

fn expect_equals_operator(p: &mut Parser) -> NodeId {
    if is_equals_operator(p) {
        return p.bump();
    }
    p.report(ErrorCode::MissingKeyword, p.current_range());
    p.tree.push_leaf(SyntaxKind::ERROR, None, p.current_range())
}

fn is_equals_operator(p: &Parser) -> bool {
    p.at(SyntaxKind::OPERATOR) && p.nth_token_is_equals(0)
}

/// A declarer already started the statement: either a declaration
/// (`declarer name (= | :=) ...`, possibly comma-separated) or a cast used
/// as a bare value statement.
fn parse_declarer_led(p: &mut Parser, range: RangeId) -> NodeId {
    let declarer = parse_declarer(p, range);
    if p.at(SyntaxKind::IDENTIFIER) && is_assign_like(p, 1) {
        return parse_declaration_list(p, range, declarer);
    }
    let atom = if p.at(SyntaxKind::OPEN_PAREN) {
        let open = p.bump();
        let unit = parse_unit(p, range);
        let close = p.expect(SyntaxKind::CLOSE_PAREN);
        p.tree.wrap(SyntaxKind::CAST, &[declarer, open, unit, close])
    } else if let Some(enclosed) = framer::try_parse_enclosed_clause(p, range) {
        p.tree.wrap(SyntaxKind::CAST, &[declarer, enclosed])
    } else {
        p.report(ErrorCode::InvalidSequence, p.tree.node(declarer).range);
        declarer
    };
    apply_postfix(p, range, atom)
}

/// `declarer name1 [= | :=] unit1, name2 [= | :=] unit2, ...`. Every name
/// after the first needs its own physical copy of `declarer`'s subtree —
/// the arena's first-child/next-sibling links give a node exactly one
/// parent, so the same `NodeId` can never be wrapped into two declarations.
fn parse_declaration_list(p: &mut Parser, range: RangeId, declarer: NodeId) -> NodeId {
    let mut decls = vec![parse_one_declaration(p, range, declarer)];
    while p.eat(SyntaxKind::COMMA).is_some() {
        let cloned = clone_node_tree(p, declarer);
        decls.push(parse_one_declaration(p, range, cloned));
    }
    if decls.len() == 1 {
        return decls.into_iter().next().unwrap();
    }
    p.tree.wrap(SyntaxKind::DECLARATION_LIST, &decls)
}

fn parse_one_declaration(p: &mut Parser, range: RangeId, declarer: NodeId) -> NodeId {
    let name_node = p.expect(SyntaxKind::IDENTIFIER);
    if let Some(name) = p.tree.node(name_node).spelling {
        p.declare_identifier(range, name, name_node);
    }
    if let Some(becomes) = p.eat(SyntaxKind::BECOMES) {
        let unit = parse_unit(p, range);
        return p.tree.wrap(SyntaxKind::VARIABLE_DECLARATION, &[declarer, name_node, becomes, unit]);
    }
    if is_equals_operator(p) {
        let eq = p.bump();
        let unit = parse_unit(p, range);
        return p.tree.wrap(SyntaxKind::IDENTITY_DECLARATION, &[declarer, name_node, eq, unit]);
    }
    p.tree.wrap(SyntaxKind::VARIABLE_DECLARATION, &[declarer, name_node])
}

/// Deep-copies `source`'s subtree into fresh arena nodes so it can be reused
/// as a second (or third, ...) declaration's declarer without violating the
/// one-parent-per-node invariant.
fn clone_node_tree(p: &mut Parser, source: NodeId) -> NodeId {
    let node = p.tree.node(source).clone();
    let children = p.tree.children(source);
    if children.is_empty() {
        p.tree.push_leaf(node.kind, node.spelling, node.range)
    } else {
        let new_children: Vec<NodeId> = children.iter().map(|&c| clone_node_tree(p, c)).collect();
        p.tree.wrap(node.kind, &new_children)
    }
}

fn rebind_prescanned_tag(p: &mut Parser, range: RangeId, kind: TagKind, name: Name, node: NodeId) {
    if let Some(tag_id) = p.lookup_prescanned(range, kind, name) {
        p.rebind_tag(tag_id, node);
        return;
    }
    p.declare_and_tag(range, kind, name, node);
}

fn parse_mode_declaration(p: &mut Parser, range: RangeId) -> NodeId {
    let mode_kw = p.bump();
    let mut children = vec![mode_kw];
    loop {
        let name_node = p.expect(SyntaxKind::BOLD_TAG);
        if let Some(name) = p.tree.node(name_node).spelling {
            rebind_prescanned_tag(p, range, TagKind::Indicant, name, name_node);
        }
        let eq = expect_equals_operator(p);
        let declarer = parse_declarer(p, range);
        children.push(p.tree.wrap(SyntaxKind::MODE_DECLARATION, &[name_node, eq, declarer]));
        if p.eat(SyntaxKind::COMMA).is_some() {
            continue;
        }
        break;
    }
    if children.len() == 2 {
        return children.into_iter().nth(1).unwrap();
    }
    p.tree.wrap(SyntaxKind::DECLARATION_LIST, &children)
}

fn parse_priority_declaration(p: &mut Parser, range: RangeId) -> NodeId {
    let prio_kw = p.bump();
    let mut children = vec![prio_kw];
    loop {
        let name_node = if p.at(SyntaxKind::OPERATOR) || p.at(SyntaxKind::IDENTIFIER) {
            p.bump()
        } else {
            p.report(ErrorCode::InvalidOperatorTag, p.current_range());
            p.tree.push_leaf(SyntaxKind::ERROR, None, p.current_range())
        };
        if let Some(name) = p.tree.node(name_node).spelling {
            rebind_prescanned_tag(p, range, TagKind::Prio, name, name_node);
        }
        let eq = expect_equals_operator(p);
        let prio_value = p.expect(SyntaxKind::INT_DENOTATION);
        apply_priority_value(p, range, name_node, prio_value);
        children.push(p.tree.wrap(SyntaxKind::PRIORITY_DECLARATION, &[name_node, eq, prio_value]));
        if p.eat(SyntaxKind::COMMA).is_some() {
            continue;
        }
        break;
    }
    if children.len() == 2 {
        return children.into_iter().nth(1).unwrap();
    }
    p.tree.wrap(SyntaxKind::DECLARATION_LIST, &children)
}

fn apply_priority_value(p: &mut Parser, range: RangeId, name_node: NodeId, prio_value: NodeId) {
    let Some(name) = p.tree.node(name_node).spelling else { return };
    let Some(spelling) = p.tree.node(prio_value).spelling else { return };
    let text = p.interner_resolve(spelling).to_string();
    let Ok(value) = text.parse::<i64>() else { return };
    if !(1..=9).contains(&value) {
        p.report(ErrorCode::InvalidPriority, p.tree.node(prio_value).range);
    }
    let clamped = value.clamp(1, 9) as u8;
    if let Some(tag_id) = p.lookup_prescanned(range, TagKind::Prio, name) {
        p.set_priority(tag_id, clamped);
    }
}

fn parse_operator_declaration(p: &mut Parser, range: RangeId) -> NodeId {
    let op_kw = p.bump();
    let mut children = vec![op_kw];
    loop {
        let name_node = if p.at(SyntaxKind::OPERATOR) || p.at(SyntaxKind::IDENTIFIER) {
            p.bump()
        } else {
            p.report(ErrorCode::InvalidOperatorTag, p.current_range());
            p.tree.push_leaf(SyntaxKind::ERROR, None, p.current_range())
        };
        let eq = expect_equals_operator(p);
        let plan = parse_operator_plan(p, range);
        if let Some(name) = p.tree.node(name_node).spelling {
            let tag_id = p.declare_operator_tag(range, name, name_node);
            if let Some(prio_tag) = p.lookup_prescanned(range, TagKind::Prio, name) {
                if let Some(prio) = p.tag_priority(prio_tag) {
                    p.set_priority(tag_id, prio);
                }
            }
        }
        children.push(p.tree.wrap(SyntaxKind::OPERATOR_DECLARATION, &[name_node, eq, plan]));
        if p.eat(SyntaxKind::COMMA).is_some() {
            continue;
        }
        break;
    }
    if children.len() == 2 {
        return children.into_iter().nth(1).unwrap();
    }
    p.tree.wrap(SyntaxKind::DECLARATION_LIST, &children)
}

/// Same shape as a routine text (`(formals) declarer? : unit`), tagged
/// `OPERATOR_PLAN` instead of `ROUTINE_TEXT` so the mode collector treats an
/// operator's defining plan distinctly from a `PROC`-moded value.
fn parse_operator_plan(p: &mut Parser, range: RangeId) -> NodeId {
    let inner_range = p.push_range(range);
    let mut children = Vec::new();
    if p.at(SyntaxKind::OPEN_PAREN) {
        children.push(p.bump());
        if !p.at(SyntaxKind::CLOSE_PAREN) {
            children.push(parse_operator_formal_parameter(p, inner_range));
            while p.eat(SyntaxKind::COMMA).is_some() {
                children.push(parse_operator_formal_parameter(p, inner_range));
            }
        }
        children.push(p.expect(SyntaxKind::CLOSE_PAREN));
    }
    if at_declarer_start(p) {
        children.push(parse_declarer(p, inner_range));
    }
    children.push(p.expect(SyntaxKind::COLON));
    children.push(parse_unit(p, inner_range));
    p.tree.wrap(SyntaxKind::OPERATOR_PLAN, &children)
}

fn parse_operator_formal_parameter(p: &mut Parser, range: RangeId) -> NodeId {
    let declarer = parse_declarer(p, range);
    let name_node = p.expect(SyntaxKind::IDENTIFIER);
    if let Some(name) = p.tree.node(name_node).spelling {
        p.declare_identifier(range, name, name_node);
    }
    p.tree.wrap(SyntaxKind::FORMAL_PARAMETER, &[declarer, name_node])
}

/// `PROC f = (params) result: body` — the bare `PROC` keyword stands for
/// the declarer; the real mode comes from the routine text body, which is
/// why this has its own node kinds rather than reusing
/// IDENTITY/VARIABLE_DECLARATION with a `PROC_DECLARER` child.
fn parse_proc_declaration(p: &mut Parser, range: RangeId) -> NodeId {
    let proc_kw = p.bump();
    let mut children = vec![proc_kw];
    loop {
        let name_node = p.expect(SyntaxKind::IDENTIFIER);
        if let Some(name) = p.tree.node(name_node).spelling {
            let tag_id = p.declare_identifier(range, name, name_node);
            p.mark_in_proc(tag_id);
        }
        if let Some(becomes) = p.eat(SyntaxKind::BECOMES) {
            let routine = framer::parse_routine_text(p, range);
            children.push(p.tree.wrap(SyntaxKind::PROC_VARIABLE_DECLARATION, &[name_node, becomes, routine]));
        } else {
            let eq = expect_equals_operator(p);
            let routine = framer::parse_routine_text(p, range);
            children.push(p.tree.wrap(SyntaxKind::PROC_IDENTITY_DECLARATION, &[name_node, eq, routine]));
        }
        if p.eat(SyntaxKind::COMMA).is_some() {
            continue;
        }
        break;
    }
    if children.len() == 2 {
        return children.into_iter().nth(1).unwrap();
    }
    p.tree.wrap(SyntaxKind::DECLARATION_LIST, &children)
}

// ===================================================================
// Serial clause: the statement/label sequence shared by every range body.
// ===================================================================

pub(crate) fn parse_serial_clause(p: &mut Parser, range: RangeId) -> NodeId {
    let mut statements = Vec::new();
    loop {
        if p.at(SyntaxKind::IDENTIFIER) && p.nth_kind(1) == SyntaxKind::COLON {
            let ident = p.bump();
            let colon = p.bump();
            if let Some(name) = p.tree.node(ident).spelling {
                rebind_prescanned_tag(p, range, TagKind::Label, name, ident);
            }
            if is_declaration_start(p) {
                p.report(ErrorCode::LabelBeforeDeclaration, p.tree.node(ident).range);
            }
            statements.push(p.tree.wrap(SyntaxKind::LABEL, &[ident, colon]));
            if p.eat(SyntaxKind::SEMI).is_some() {
                if at_serial_clause_end(p) {
                    break;
                }
                continue;
            }
            if at_serial_clause_end(p) {
                break;
            }
            continue;
        }

        let statement = parse_statement(p, range);
        let statement_range = p.tree.node(statement).range;
        statements.push(statement);
        if p.eat(SyntaxKind::SEMI).is_some() {
            if at_serial_clause_end(p) {
                p.report_warning(ErrorCode::SuperfluousSemicolon, statement_range);
            }
            continue;
        }
        break;
    }
    let result = if statements.len() == 1 {
        statements.into_iter().next().unwrap()
    } else {
        p.tree.wrap(SyntaxKind::SERIAL_CLAUSE, &statements)
    };
    p.tree.set_owns_range(result, range);
    result
}

fn at_serial_clause_end(p: &Parser) -> bool {
    p.at_eof()
        || matches!(
            p.current_kind(),
            SyntaxKind::END_SYM
                | SyntaxKind::FI_SYM
                | SyntaxKind::ESAC_SYM
                | SyntaxKind::OD_SYM
                | SyntaxKind::CLOSE_PAREN
                | SyntaxKind::THEN_SYM
                | SyntaxKind::ELSE_SYM
                | SyntaxKind::ELIF_SYM
                | SyntaxKind::IN_SYM
                | SyntaxKind::OUT_SYM
                | SyntaxKind::OUSE_SYM
                | SyntaxKind::EDOC_SYM
        )
}

// ===================================================================
// Parser helpers that need direct field access (private `Parser` fields are
// visible to this whole module tree, but are centralized here rather than
// reached into ad hoc from every production above).
// ===================================================================

impl<'a> Parser<'a> {
    fn current_token_spelling(&self) -> Option<Name> {
        self.current().map(|t| t.spelling)
    }

    fn nth_token_is_equals(&self, n: usize) -> bool {
        match (self.tokens.get(self.pos + n).map(|t| t.spelling), self.interner.get("=")) {
            (Some(cur), Some(eq)) => cur == eq,
            _ => false,
        }
    }

    fn interner_resolve(&self, name: Name) -> &str {
        self.interner.resolve(name)
    }

    fn ranges_lookup_operators(&self, range: RangeId, name: Name) -> Vec<TagId> {
        self.ranges.lookup_operators(range, name)
    }

    fn tag_priority(&self, tag_id: TagId) -> Option<u8> {
        self.tags.get(tag_id).priority
    }

    fn set_priority(&mut self, tag_id: TagId, priority: u8) {
        self.tags.get_mut(tag_id).priority = Some(priority);
    }

    fn mark_in_proc(&mut self, tag_id: TagId) {
        self.tags.get_mut(tag_id).in_proc = true;
    }

    fn declare_identifier(&mut self, range: RangeId, name: Name, node: NodeId) -> TagId {
        self.declare(range, TagKind::Identifier, name, node)
    }

    fn declare_operator_tag(&mut self, range: RangeId, name: Name, node: NodeId) -> TagId {
        self.declare_operator(range, name, node)
    }

    fn push_range(&mut self, parent: RangeId) -> RangeId {
        self.ranges.push(Some(parent), Some(parent))
    }

    /// Looks up a name pre-declared by `prescan` in `range`'s own table
    /// (never its ancestors — a forward reference is only meaningful within
    /// the one range the declaration belongs to).
    fn lookup_prescanned(&self, range: RangeId, kind: TagKind, name: Name) -> Option<TagId> {
        let table = self.ranges.get(range);
        match kind {
            TagKind::Indicant => table.indicants.get(&name).copied(),
            TagKind::Prio => table.priorities.get(&name).copied(),
            TagKind::Label => table.labels.get(&name).copied(),
            _ => None,
        }
    }

    fn rebind_tag(&mut self, tag_id: TagId, node: NodeId) {
        self.tags.get_mut(tag_id).node = node;
        self.tree.node_mut(node).tag = Some(tag_id);
    }

    fn declare_and_tag(&mut self, range: RangeId, kind: TagKind, name: Name, node: NodeId) {
        let tag_id = self.declare(range, kind, name, node);
        self.tree.node_mut(node).tag = Some(tag_id);
    }

    fn report_warning(&mut self, code: ErrorCode, range: text_size::TextRange) {
        self.sink.report(Diagnostic::warning(code, range));
    }
}

use crate::tree::TagId;
