//! Parenthesis/keyword matcher (component D): a validation-only pass over
//! the token list counting every bracket-like pair — `(`/`)`, `[`/`]`,
//! `{`/`}`, `BEGIN`/`END`, `IF`/`FI`, `CASE`/`ESAC`, `DO`/`OD`, `$`/`$` — and
//! reporting the first mismatch with the locality of both the offending
//! closer and the opener it failed to match. A clean match is a
//! precondition the framer (component E) relies on; this phase never
//! rewrites the token list, only validates it.

use text_size::TextRange;
use tracing::instrument;

use crate::diag::{Diagnostic, DiagnosticSink, ErrorCode};
use crate::kind::SyntaxKind;
use crate::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BracketKind {
    Paren,
    Bracket,
    Brace,
    BeginEnd,
    IfFi,
    CaseEsac,
    DoOd,
    Format,
}

pub(crate) fn opener(kind: SyntaxKind) -> Option<BracketKind> {
    match kind {
        SyntaxKind::OPEN_PAREN => Some(BracketKind::Paren),
        SyntaxKind::OPEN_BRACKET => Some(BracketKind::Bracket),
        SyntaxKind::OPEN_BRACE => Some(BracketKind::Brace),
        SyntaxKind::BEGIN_SYM => Some(BracketKind::BeginEnd),
        SyntaxKind::IF_SYM => Some(BracketKind::IfFi),
        SyntaxKind::CASE_SYM => Some(BracketKind::CaseEsac),
        SyntaxKind::DO_SYM => Some(BracketKind::DoOd),
        SyntaxKind::DOLLAR => Some(BracketKind::Format),
        _ => None,
    }
}

pub(crate) fn closer(kind: SyntaxKind) -> Option<BracketKind> {
    match kind {
        SyntaxKind::CLOSE_PAREN => Some(BracketKind::Paren),
        SyntaxKind::CLOSE_BRACKET => Some(BracketKind::Bracket),
        SyntaxKind::CLOSE_BRACE => Some(BracketKind::Brace),
        SyntaxKind::END_SYM => Some(BracketKind::BeginEnd),
        SyntaxKind::FI_SYM => Some(BracketKind::IfFi),
        SyntaxKind::ESAC_SYM => Some(BracketKind::CaseEsac),
        SyntaxKind::OD_SYM => Some(BracketKind::DoOd),
        SyntaxKind::DOLLAR => Some(BracketKind::Format),
        _ => None,
    }
}

/// Verifies every bracket-like pair nests correctly. Reports at most one
/// `ParenMismatch` (the first one found) and returns whether the token list
/// is well-bracketed — later phases should not run on a token list that
/// fails this check, matching the reference's longjmp-out-of-phase
/// discipline via an early `Result`-style return at the call site.
#[instrument(level = "debug", skip_all, name = "phase_d_brackets")]
pub fn check(tokens: &[Token], sink: &mut DiagnosticSink) -> bool {
    let mut stack: Vec<(BracketKind, TextRange)> = Vec::new();

    for token in tokens {
        if let Some(open_kind) = opener(token.kind) {
            if open_kind == BracketKind::Format && stack.last().map(|(k, _)| *k) == Some(BracketKind::Format) {
                // `$` both opens and closes; a second `$` while one is open
                // closes it instead of opening a nested one.
                stack.pop();
                continue;
            }
            stack.push((open_kind, token.range));
            continue;
        }
        if let Some(close_kind) = closer(token.kind) {
            match stack.pop() {
                Some((open_kind, _)) if open_kind == close_kind => {}
                Some((_, open_range)) => {
                    sink.report(Diagnostic::error(ErrorCode::ParenMismatch, open_range));
                    sink.report(Diagnostic::error(ErrorCode::ParenMismatch, token.range));
                    return false;
                }
                None => {
                    sink.report(Diagnostic::error(ErrorCode::ParenMismatch, token.range));
                    return false;
                }
            }
        }
    }

    if let Some((_, open_range)) = stack.first() {
        sink.report(Diagnostic::error(ErrorCode::ParenMismatch, *open_range));
        return false;
    }
    true
}

/// Given `tokens[start]` is an opener, returns the index of its matching
/// closer. Assumes [`check`] already passed over this token list — the
/// framer and declaration pre-scan use this to bound a range's token span
/// without re-validating nesting.
pub(crate) fn find_matching_end(tokens: &[Token], start: usize) -> usize {
    let Some(open_kind) = opener(tokens[start].kind) else {
        return start;
    };
    let mut depth = 0i32;
    for (offset, token) in tokens[start..].iter().enumerate() {
        if opener(token.kind) == Some(open_kind) {
            depth += 1;
        } else if closer(token.kind) == Some(open_kind) {
            depth -= 1;
            if depth == 0 {
                return start + offset;
            }
        }
    }
    tokens.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Interner;

    fn tok(interner: &mut Interner, kind: SyntaxKind) -> Token {
        let name = interner.intern("t");
        Token::new(kind, name, TextRange::empty(0.into()), 1)
    }

    #[test]
    fn balanced_begin_end_passes() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        let tokens = vec![
            tok(&mut interner, SyntaxKind::BEGIN_SYM),
            tok(&mut interner, SyntaxKind::END_SYM),
        ];
        assert!(check(&tokens, &mut sink));
        assert!(!sink.has_errors());
    }

    #[test]
    fn unmatched_if_reports_mismatch() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        let tokens = vec![
            tok(&mut interner, SyntaxKind::BEGIN_SYM),
            tok(&mut interner, SyntaxKind::IF_SYM),
            tok(&mut interner, SyntaxKind::END_SYM),
        ];
        assert!(!check(&tokens, &mut sink));
        assert!(sink.has_errors());
    }

    #[test]
    fn nested_parens_and_brackets_pass() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        let tokens = vec![
            tok(&mut interner, SyntaxKind::OPEN_PAREN),
            tok(&mut interner, SyntaxKind::OPEN_BRACKET),
            tok(&mut interner, SyntaxKind::CLOSE_BRACKET),
            tok(&mut interner, SyntaxKind::CLOSE_PAREN),
        ];
        assert!(check(&tokens, &mut sink));
    }

    #[test]
    fn crossed_brackets_fail() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        let tokens = vec![
            tok(&mut interner, SyntaxKind::OPEN_PAREN),
            tok(&mut interner, SyntaxKind::OPEN_BRACKET),
            tok(&mut interner, SyntaxKind::CLOSE_PAREN),
            tok(&mut interner, SyntaxKind::CLOSE_BRACKET),
        ];
        assert!(!check(&tokens, &mut sink));
    }
}
