//! Refinement preprocessor (component C): collects `name: …units…. ` tails
//! defined after the main program body's closing `END` and splices each
//! applied occurrence of a refinement name, inside the body, with the
//! definition's own token subrange — at most once per refinement.
//!
//! Runs directly on the token list, before bracket matching (component D)
//! or any tree exists, so a [`Refinement`] record here carries source
//! ranges rather than `NodeId`s; nothing downstream re-derives a
//! `defining_node`/`begin_node`/`end_node` for it, since by the time the
//! tree exists the refinement's body has already been spliced into the
//! ordinary token stream and carries no separate identity.

use rustc_hash::FxHashMap;
use text_size::TextRange;

use tracing::instrument;

use crate::base::Name;
use crate::diag::{Diagnostic, DiagnosticSink, ErrorCode};
use crate::kind::SyntaxKind;
use crate::lexer::Token;

/// One refinement's bookkeeping, tracked across collection and splicing.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub name: Name,
    pub defined_range: TextRange,
    pub defined_line: u32,
    pub applied_line: Option<u32>,
    pub applications: u32,
}

/// Collects trailing refinement definitions and splices their single
/// permitted application into the main body. Returns the rewritten token
/// list (with definitions removed from the tail and applications replaced
/// in place) plus the refinement ledger, in definition order.
#[instrument(level = "debug", skip_all, name = "phase_c_refine")]
pub fn preprocess(tokens: Vec<Token>, sink: &mut DiagnosticSink) -> (Vec<Token>, Vec<Refinement>) {
    let Some((begin_idx, end_idx)) = find_main_body(&tokens) else {
        return (tokens, Vec::new());
    };

    let (definitions, defs_by_name) = collect_definitions(&tokens[end_idx + 1..], sink);

    let mut body: Vec<Token> = Vec::with_capacity(end_idx - begin_idx + 1);
    let mut applied: FxHashMap<Name, bool> = FxHashMap::default();
    let mut ledger: Vec<Refinement> = definitions
        .iter()
        .map(|(name, range, line, def_tokens)| {
            let _ = def_tokens;
            Refinement {
                name: *name,
                defined_range: *range,
                defined_line: *line,
                applied_line: None,
                applications: 0,
            }
        })
        .collect();

    for token in &tokens[begin_idx..=end_idx] {
        if token.kind == SyntaxKind::IDENTIFIER {
            if let Some(&def_index) = defs_by_name.get(&token.spelling) {
                let already = *applied.get(&token.spelling).unwrap_or(&false);
                if already {
                    sink.report(Diagnostic::error(ErrorCode::RefinementReapplication, token.range));
                    ledger[def_index].applications += 1;
                    body.push(*token);
                    continue;
                }
                applied.insert(token.spelling, true);
                ledger[def_index].applications += 1;
                ledger[def_index].applied_line = Some(token.line);
                body.extend(definitions[def_index].3.iter().copied());
                continue;
            }
        }
        body.push(*token);
    }

    for refinement in &ledger {
        if refinement.applications == 0 {
            sink.report(Diagnostic::warning(ErrorCode::UnappliedRefinement, refinement.defined_range));
        }
    }

    // Definitions and their trailing point separators are consumed
    // entirely by `collect_definitions`; nothing after the main body's
    // `END` is carried forward, matching "the point-separator terminates
    // both definitions and the body."
    let mut out = Vec::with_capacity(begin_idx + body.len());
    out.extend_from_slice(&tokens[..begin_idx]);
    out.extend(body);

    (out, ledger)
}

/// Finds the outermost `BEGIN .. END` pair, tracked independently of every
/// other bracket kind — refinement collection only needs the program
/// body's extent, and `BEGIN`/`END` nesting is self-contained regardless of
/// whether `(`/`)`/`[`/`]` happen to be unbalanced elsewhere (bracket
/// matching itself is component D's job, run after this one).
fn find_main_body(tokens: &[Token]) -> Option<(usize, usize)> {
    let begin_idx = tokens.iter().position(|t| t.kind == SyntaxKind::BEGIN_SYM)?;
    let mut depth = 0i32;
    for (offset, token) in tokens[begin_idx..].iter().enumerate() {
        match token.kind {
            SyntaxKind::BEGIN_SYM => depth += 1,
            SyntaxKind::END_SYM => {
                depth -= 1;
                if depth == 0 {
                    return Some((begin_idx, begin_idx + offset));
                }
            }
            _ => {}
        }
    }
    None
}

type DefinitionsByName = FxHashMap<Name, usize>;
type Definition = (Name, TextRange, u32, Vec<Token>);

/// Parses the `name: …units…. name2: …units…. ` tail following the main
/// body's `END`. A malformed entry (no `IDENTIFIER COLON` at the current
/// position) stops collection; anything left over is the postlude and not
/// our concern.
fn collect_definitions(tail: &[Token], sink: &mut DiagnosticSink) -> (Vec<Definition>, DefinitionsByName) {
    let mut definitions = Vec::new();
    let mut by_name = FxHashMap::default();

    let mut i = 0;
    while i + 1 < tail.len() {
        if tail[i].kind != SyntaxKind::IDENTIFIER || tail[i + 1].kind != SyntaxKind::COLON {
            break;
        }
        let name = tail[i].spelling;
        let name_range = tail[i].range;
        let line = tail[i].line;
        let mut j = i + 2;
        let body_start = j;
        while j < tail.len() && tail[j].kind != SyntaxKind::DOT {
            j += 1;
        }
        let body = tail[body_start..j].to_vec();
        let full_range = TextRange::new(name_range.start(), tail.get(j).map(|t| t.range.end()).unwrap_or(name_range.end()));

        if by_name.contains_key(&name) {
            sink.report(Diagnostic::error(ErrorCode::RefinementRedefinition, name_range));
        } else {
            by_name.insert(name, definitions.len());
            definitions.push((name, full_range, line, body));
        }

        i = if j < tail.len() { j + 1 } else { j };
    }

    (definitions, by_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Interner;

    fn tok(interner: &mut Interner, kind: SyntaxKind, spelling: &str, line: u32) -> Token {
        let name = interner.intern(spelling);
        Token::new(kind, name, TextRange::empty(0.into()), line)
    }

    #[test]
    fn splices_single_application() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        let tokens = vec![
            tok(&mut interner, SyntaxKind::BEGIN_SYM, "begin", 1),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "part1", 1),
            tok(&mut interner, SyntaxKind::END_SYM, "end", 1),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "part1", 2),
            tok(&mut interner, SyntaxKind::COLON, ":", 2),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "x", 2),
            tok(&mut interner, SyntaxKind::DOT, ".", 2),
        ];
        let (out, ledger) = preprocess(tokens, &mut sink);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].applications, 1);
        assert!(!sink.has_errors());
        let kinds: Vec<_> = out.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![SyntaxKind::BEGIN_SYM, SyntaxKind::IDENTIFIER, SyntaxKind::END_SYM]
        );
        assert_eq!(out[1].spelling, interner.intern("x"));
    }

    #[test]
    fn reapplication_is_rejected() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        let tokens = vec![
            tok(&mut interner, SyntaxKind::BEGIN_SYM, "begin", 1),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "part1", 1),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "part1", 1),
            tok(&mut interner, SyntaxKind::END_SYM, "end", 1),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "part1", 2),
            tok(&mut interner, SyntaxKind::COLON, ":", 2),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "x", 2),
            tok(&mut interner, SyntaxKind::DOT, ".", 2),
        ];
        let (_out, ledger) = preprocess(tokens, &mut sink);
        assert_eq!(ledger[0].applications, 2);
        assert!(sink.has_errors());
    }

    #[test]
    fn unapplied_refinement_warns() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        let tokens = vec![
            tok(&mut interner, SyntaxKind::BEGIN_SYM, "begin", 1),
            tok(&mut interner, SyntaxKind::END_SYM, "end", 1),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "unused", 2),
            tok(&mut interner, SyntaxKind::COLON, ":", 2),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "x", 2),
            tok(&mut interner, SyntaxKind::DOT, ".", 2),
        ];
        let (_out, ledger) = preprocess(tokens, &mut sink);
        assert_eq!(ledger[0].applications, 0);
        assert!(!sink.has_errors());
    }

    #[test]
    fn redefinition_is_rejected() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        let tokens = vec![
            tok(&mut interner, SyntaxKind::BEGIN_SYM, "begin", 1),
            tok(&mut interner, SyntaxKind::END_SYM, "end", 1),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "dup", 2),
            tok(&mut interner, SyntaxKind::COLON, ":", 2),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "x", 2),
            tok(&mut interner, SyntaxKind::DOT, ".", 2),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "dup", 3),
            tok(&mut interner, SyntaxKind::COLON, ":", 3),
            tok(&mut interner, SyntaxKind::IDENTIFIER, "y", 3),
            tok(&mut interner, SyntaxKind::DOT, ".", 3),
        ];
        let (_out, _ledger) = preprocess(tokens, &mut sink);
        assert!(sink.has_errors());
    }
}
