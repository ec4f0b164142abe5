//! Declaration pre-scan (component F): before a range's body is reduced
//! token-by-token, walk its immediate (bracket-depth-0) declarations once to
//! register MODE/PRIO/OP names and labels, so a later declaration in the
//! same range can forward-reference an earlier-or-later one (`MODE A = REF
//! B, B = REF A`, mutually recursive `PROC`s, a `GOTO` to a label declared
//! further down the same serial clause).
//!
//! Identity/variable declarations of ordinary values are deliberately left
//! to ordinary left-to-right reduction: Algol 68 elaborates them in
//! sequence, so nothing downstream needs to see one before its own
//! declaration is reached.

use rustc_hash::FxHashMap;

use crate::base::Name;
use crate::kind::SyntaxKind;
use crate::lexer::Token;
use crate::tree::{NodeId, RangeId, Tag, TagArena, TagId, TagKind};

use super::brackets::{closer, opener};
use super::Parser;

/// Forward-declared tags discovered by the pre-scan, keyed by name, so the
/// main reduction can reuse the same [`TagId`] (updating its `node` to the
/// real defining occurrence) instead of re-declaring and tripping a
/// spurious `MultiplyDeclaredTag`.
#[derive(Debug, Default)]
pub(crate) struct PrescanResult {
    pub indicants: FxHashMap<Name, TagId>,
    pub priorities: FxHashMap<Name, TagId>,
    pub operators: FxHashMap<Name, Vec<TagId>>,
    pub labels: FxHashMap<Name, TagId>,
}

/// Scans `tokens[start..=end]` (a range's full token span, including its
/// opening/closing delimiters) at bracket depth 0 and pre-declares every
/// `MODE`/`PRIO`/`OP` name and label found, in `range`. Does not touch
/// `self.pos`; the main reduction still walks this same span token by
/// token afterward.
pub(crate) fn scan(p: &mut Parser, range: RangeId, start: usize, end: usize) -> PrescanResult {
    let mut result = PrescanResult::default();
    let tokens = p.tokens;
    let mut i = start;
    let mut depth = 0i32;
    let mut at_statement_start = true;

    while i <= end && i < tokens.len() {
        let kind = tokens[i].kind;
        if let Some(open_kind) = opener(kind) {
            depth += 1;
            let _ = open_kind;
            i += 1;
            continue;
        }
        if closer(kind).is_some() {
            depth -= 1;
            i += 1;
            continue;
        }
        if depth != 1 {
            // depth 1 is "directly inside this range's own delimiters";
            // depth 0 only happens on the delimiters themselves, handled
            // above.
            i += 1;
            continue;
        }

        match kind {
            SyntaxKind::MODE_SYM => {
                i = scan_mode_declarations(p, range, tokens, i, &mut result);
                at_statement_start = true;
                continue;
            }
            SyntaxKind::PRIO_SYM => {
                i = scan_priority_declarations(p, range, tokens, i, &mut result);
                at_statement_start = true;
                continue;
            }
            SyntaxKind::OP_SYM => {
                i = scan_operator_declarations(p, range, tokens, i, &mut result);
                at_statement_start = true;
                continue;
            }
            SyntaxKind::IDENTIFIER if at_statement_start && tokens.get(i + 1).map(|t| t.kind) == Some(SyntaxKind::COLON) => {
                declare_label(p, range, tokens[i], &mut result);
                at_statement_start = false;
                i += 2;
                continue;
            }
            SyntaxKind::SEMI => {
                at_statement_start = true;
                i += 1;
                continue;
            }
            _ => {
                at_statement_start = false;
                i += 1;
            }
        }
    }

    result
}

fn phantom(p: &mut Parser, token: Token) -> NodeId {
    p.tree.push_leaf(token.kind, Some(token.spelling), token.range)
}

fn scan_mode_declarations(p: &mut Parser, range: RangeId, tokens: &[Token], mut i: usize, result: &mut PrescanResult) -> usize {
    i += 1; // past MODE_SYM
    loop {
        // Mode indicants are bold words (`BOLD_TAG`); a lowercase run never
        // denotes one.
        if tokens.get(i).map(|t| t.kind) != Some(SyntaxKind::BOLD_TAG) {
            break;
        }
        let name_token = tokens[i];
        let node = phantom(p, name_token);
        if !result.indicants.contains_key(&name_token.spelling) {
            let tag = Tag::new(TagKind::Indicant, name_token.spelling, node, range);
            let id = p.tags.push(tag);
            p.ranges.get_mut(range).indicants.insert(name_token.spelling, id);
            result.indicants.insert(name_token.spelling, id);
        }
        i += 1;
        // skip past `=` and the right-hand declarer, to the next comma or semicolon at this depth
        i = skip_to_boundary(tokens, i);
        if tokens.get(i).map(|t| t.kind) == Some(SyntaxKind::COMMA) {
            i += 1;
            continue;
        }
        break;
    }
    i
}

fn scan_priority_declarations(p: &mut Parser, range: RangeId, tokens: &[Token], mut i: usize, result: &mut PrescanResult) -> usize {
    i += 1;
    loop {
        let is_op_name = matches!(tokens.get(i).map(|t| t.kind), Some(SyntaxKind::OPERATOR) | Some(SyntaxKind::IDENTIFIER));
        if !is_op_name {
            break;
        }
        let name_token = tokens[i];
        let node = phantom(p, name_token);
        let tag = Tag::new(TagKind::Prio, name_token.spelling, node, range);
        let id = p.tags.push(tag);
        p.ranges.get_mut(range).priorities.insert(name_token.spelling, id);
        result.priorities.insert(name_token.spelling, id);
        i += 1;
        i = skip_to_boundary(tokens, i);
        if tokens.get(i).map(|t| t.kind) == Some(SyntaxKind::COMMA) {
            i += 1;
            continue;
        }
        break;
    }
    i
}

fn scan_operator_declarations(p: &mut Parser, range: RangeId, tokens: &[Token], mut i: usize, result: &mut PrescanResult) -> usize {
    i += 1;
    // An optional priority-less `OP` declarator list precedes `=`; the
    // operator name itself is whatever OPERATOR/IDENTIFIER token sits right
    // before the declarer/`=`.
    loop {
        let is_op_name = matches!(tokens.get(i).map(|t| t.kind), Some(SyntaxKind::OPERATOR) | Some(SyntaxKind::IDENTIFIER));
        if !is_op_name {
            break;
        }
        let name_token = tokens[i];
        let node = phantom(p, name_token);
        let tag = Tag::new(TagKind::Op, name_token.spelling, node, range);
        let id = p.tags.push(tag);
        p.ranges.get_mut(range).operators.entry(name_token.spelling).or_default().push(id);
        result.operators.entry(name_token.spelling).or_default().push(id);
        i += 1;
        i = skip_to_boundary(tokens, i);
        if tokens.get(i).map(|t| t.kind) == Some(SyntaxKind::COMMA) {
            i += 1;
            continue;
        }
        break;
    }
    i
}

fn declare_label(p: &mut Parser, range: RangeId, name_token: Token, result: &mut PrescanResult) {
    if result.labels.contains_key(&name_token.spelling) {
        return;
    }
    let node = phantom(p, name_token);
    let tag = Tag::new(TagKind::Label, name_token.spelling, node, range);
    let id = p.tags.push(tag);
    p.ranges.get_mut(range).labels.insert(name_token.spelling, id);
    result.labels.insert(name_token.spelling, id);
}

/// Advances past a declaration's right-hand side to the next `,` or `;` at
/// the current bracket depth (nested brackets inside the declarer/plan are
/// skipped whole).
fn skip_to_boundary(tokens: &[Token], mut i: usize) -> usize {
    let mut depth = 0i32;
    while i < tokens.len() {
        let kind = tokens[i].kind;
        if opener(kind).is_some() {
            depth += 1;
        } else if closer(kind).is_some() {
            if depth == 0 {
                break;
            }
            depth -= 1;
        } else if depth == 0 && matches!(kind, SyntaxKind::COMMA | SyntaxKind::SEMI) {
            break;
        }
        i += 1;
    }
    i
}

#[allow(dead_code)]
pub(crate) fn unused(_: &TagArena) {}
