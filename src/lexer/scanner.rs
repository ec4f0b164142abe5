//! Stateful scanning driver.
//!
//! Wraps a [`logos::Lexer`] over [`super::logos_token::LogosToken`] and adds
//! everything a context-free token regex cannot express: stropping-aware
//! bold tag / keyword recognition, nested comments and pragmats (where the
//! *opening* spelling — `CO`, `COMMENT`, `#`, `PR`, `PRAGMAT` — determines
//! the required *closing* spelling), string denotations with `""`
//! escaping, a recursive format-text sub-mode, `GO TO` merging into a
//! single `GOTO` token, and the operator-becomes forms (`:=`, `::=`,
//! `+:=`, `=:`, `==:`).

use logos::Logos;
use text_size::{TextRange, TextSize};
use tracing::instrument;

use crate::base::{Interner, Name, Stropping};
use crate::diag::{Diagnostic, DiagnosticSink, ErrorCode, PhaseOutcome};
use crate::kind::SyntaxKind;

use super::keywords::lookup_keyword;
use super::logos_token::LogosToken;
use super::token::Token;

pub struct Scanner<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    source: &'a str,
    stropping: Stropping,
    interner: &'a mut Interner,
    sink: &'a mut DiagnosticSink,
    tokens: Vec<Token>,
    /// Nesting depth of `$ ... $` format-text sub-mode; single letters and
    /// digit runs are classified as format items/replicators while this is
    /// above zero.
    format_depth: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(
        source: &'a str,
        stropping: Stropping,
        interner: &'a mut Interner,
        sink: &'a mut DiagnosticSink,
    ) -> Self {
        Self {
            inner: LogosToken::lexer(source),
            source,
            stropping,
            interner,
            sink,
            tokens: Vec::new(),
            format_depth: 0,
        }
    }

    #[instrument(level = "debug", skip(self), name = "phase_b_lexer")]
    pub fn run(mut self) -> Vec<Token> {
        let mut pending_pragment: Option<Name> = None;
        loop {
            let Some(result) = self.inner.next() else {
                break;
            };
            let span = self.inner.span();
            let range = TextRange::new(
                TextSize::try_from(span.start).unwrap(),
                TextSize::try_from(span.end).unwrap(),
            );
            let lex_tok = match result {
                Ok(t) => t,
                Err(()) => {
                    self.report(ErrorCode::UnworthyCharacter, range);
                    continue;
                }
            };

            match lex_tok {
                LogosToken::Whitespace => continue,

                LogosToken::Hash => {
                    let (text, terminated) = self.scan_delimited_comment("#");
                    if !terminated {
                        self.report(ErrorCode::UnterminatedComment, range);
                    }
                    pending_pragment = Some(self.interner.intern(&text));
                    continue;
                }

                LogosToken::UpperRun => {
                    let spelling = &self.source[span.clone()];
                    if spelling == "CO" || spelling == "COMMENT" {
                        let (text, terminated) = self.scan_delimited_comment(spelling);
                        if !terminated {
                            self.report(ErrorCode::UnterminatedComment, range);
                        }
                        pending_pragment = Some(self.interner.intern(&text));
                        continue;
                    }
                    if spelling == "PR" || spelling == "PRAGMAT" {
                        let (text, terminated) = self.scan_delimited_pragmat(spelling);
                        if !terminated {
                            self.report(ErrorCode::UnterminatedPragmat, range);
                        }
                        pending_pragment = Some(self.interner.intern(&text));
                        continue;
                    }
                    self.emit_bold_tag(spelling, range, &mut pending_pragment);
                }

                LogosToken::QuotedWord => {
                    let raw = &self.source[span.clone()];
                    let spelling = &raw[1..raw.len() - 1];
                    self.emit_bold_tag(spelling, range, &mut pending_pragment);
                }

                LogosToken::LowerRun => {
                    let spelling = self.source[span.clone()].to_string();
                    if self.format_depth > 0 && spelling.chars().count() == 1 {
                        let name = self.interner.intern(&spelling);
                        self.push(SyntaxKind::FORMAT_ITEM, name, range, pending_pragment.take());
                        continue;
                    }
                    if spelling.ends_with('_') {
                        self.report(ErrorCode::UnintendedDeclarationShape, range);
                    }
                    let name = self.interner.intern(&spelling);
                    self.push(SyntaxKind::IDENTIFIER, name, range, pending_pragment.take());
                }

                LogosToken::Digits => {
                    let (kind, text, end) = self.scan_denotation(span.start, span.end);
                    let full_range =
                        TextRange::new(TextSize::try_from(span.start).unwrap(), TextSize::try_from(end).unwrap());
                    if self.format_depth > 0 && kind == SyntaxKind::INT_DENOTATION {
                        let name = self.interner.intern(&text);
                        self.push(
                            SyntaxKind::STATIC_REPLICATOR,
                            name,
                            full_range,
                            pending_pragment.take(),
                        );
                        continue;
                    }
                    let name = self.interner.intern(&text);
                    self.push(kind, name, full_range, pending_pragment.take());
                }

                LogosToken::DoubleQuote => {
                    let (text, end, terminated) = self.scan_string(span.end);
                    if !terminated {
                        self.report(ErrorCode::UnterminatedString, range);
                    }
                    let full_range =
                        TextRange::new(TextSize::try_from(span.start).unwrap(), TextSize::try_from(end).unwrap());
                    let name = self.interner.intern(&text);
                    self.push(
                        SyntaxKind::STRING_DENOTATION,
                        name,
                        full_range,
                        pending_pragment.take(),
                    );
                }

                LogosToken::Dollar => {
                    if self.format_depth > 0 {
                        self.format_depth -= 1;
                    } else {
                        self.format_depth += 1;
                    }
                    let name = self.interner.intern("$");
                    self.push(SyntaxKind::DOLLAR, name, range, pending_pragment.take());
                }

                LogosToken::ColonColonEquals => {
                    self.emit_punct(SyntaxKind::COLON_BECOMES, "::=", range, &mut pending_pragment)
                }
                LogosToken::ColonEquals => {
                    self.emit_punct(SyntaxKind::BECOMES, ":=", range, &mut pending_pragment)
                }
                LogosToken::EqEqColon => {
                    self.emit_punct(SyntaxKind::ALT_EQUALS, "==:", range, &mut pending_pragment)
                }
                LogosToken::EqColon => {
                    self.emit_punct(SyntaxKind::ALT_EQUALS, "=:", range, &mut pending_pragment)
                }
                LogosToken::DotDot => {
                    self.emit_punct(SyntaxKind::DOTDOT, "..", range, &mut pending_pragment)
                }
                LogosToken::Dot => self.emit_punct(SyntaxKind::DOT, ".", range, &mut pending_pragment),
                LogosToken::LParen => {
                    self.emit_punct(SyntaxKind::OPEN_PAREN, "(", range, &mut pending_pragment)
                }
                LogosToken::RParen => {
                    self.emit_punct(SyntaxKind::CLOSE_PAREN, ")", range, &mut pending_pragment)
                }
                LogosToken::LBracket => {
                    self.emit_punct(SyntaxKind::OPEN_BRACKET, "[", range, &mut pending_pragment)
                }
                LogosToken::RBracket => {
                    self.emit_punct(SyntaxKind::CLOSE_BRACKET, "]", range, &mut pending_pragment)
                }
                LogosToken::LBrace => {
                    self.emit_punct(SyntaxKind::OPEN_BRACE, "{", range, &mut pending_pragment)
                }
                LogosToken::RBrace => {
                    self.emit_punct(SyntaxKind::CLOSE_BRACE, "}", range, &mut pending_pragment)
                }
                LogosToken::Semi => self.emit_punct(SyntaxKind::SEMI, ";", range, &mut pending_pragment),
                LogosToken::Comma => self.emit_punct(SyntaxKind::COMMA, ",", range, &mut pending_pragment),
                LogosToken::Colon => self.emit_punct(SyntaxKind::COLON, ":", range, &mut pending_pragment),
                LogosToken::BarColon => {
                    self.emit_punct(SyntaxKind::BAR_COLON, "|:", range, &mut pending_pragment)
                }
                LogosToken::Bar | LogosToken::Bang => {
                    self.emit_punct(SyntaxKind::BAR, "|", range, &mut pending_pragment)
                }
                LogosToken::At => self.emit_punct(SyntaxKind::AT, "@", range, &mut pending_pragment),

                LogosToken::OperatorChars => {
                    let mut text = self.source[span.clone()].to_string();
                    let mut end = span.end;
                    // OP +:= / -:= / *:= ... : an operator run immediately
                    // followed by `:=` is a single operator-becomes form.
                    let remainder = self.inner.remainder();
                    if remainder.starts_with(":=") {
                        text.push_str(":=");
                        self.inner.bump(2);
                        end += 2;
                        let full_range = TextRange::new(
                            TextSize::try_from(span.start).unwrap(),
                            TextSize::try_from(end).unwrap(),
                        );
                        let name = self.interner.intern(&text);
                        self.push(SyntaxKind::OPERATOR, name, full_range, pending_pragment.take());
                    } else if text.len() >= 2 && text.ends_with("==") {
                        // Split a trailing `=` off so `OP <= = ...` is not
                        // swallowed into the declared operator's own name.
                        text.pop();
                        end -= 1;
                        let trimmed_range = TextRange::new(
                            TextSize::try_from(span.start).unwrap(),
                            TextSize::try_from(end).unwrap(),
                        );
                        let name = self.interner.intern(&text);
                        self.push(SyntaxKind::OPERATOR, name, trimmed_range, pending_pragment.take());
                        let eq_range = TextRange::new(
                            TextSize::try_from(end).unwrap(),
                            TextSize::try_from(span.end).unwrap(),
                        );
                        let eq_name = self.interner.intern("=");
                        self.push(SyntaxKind::OPERATOR, eq_name, eq_range, None);
                    } else {
                        let full_range = TextRange::new(
                            TextSize::try_from(span.start).unwrap(),
                            TextSize::try_from(end).unwrap(),
                        );
                        let name = self.interner.intern(&text);
                        self.push(SyntaxKind::OPERATOR, name, full_range, pending_pragment.take());
                    }
                }
            }
        }
        self.merge_goto();
        self.tokens
    }

    fn emit_punct(
        &mut self,
        kind: SyntaxKind,
        spelling: &str,
        range: TextRange,
        pending_pragment: &mut Option<Name>,
    ) {
        let name = self.interner.intern(spelling);
        self.push(kind, name, range, pending_pragment.take());
    }

    fn emit_bold_tag(&mut self, spelling: &str, range: TextRange, pending_pragment: &mut Option<Name>) {
        if let Some(kind) = lookup_keyword(spelling) {
            let name = self.interner.intern(spelling);
            self.push(kind, name, range, pending_pragment.take());
        } else {
            let name = self.interner.intern(spelling);
            self.push(SyntaxKind::BOLD_TAG, name, range, pending_pragment.take());
        }
    }

    fn push(&mut self, kind: SyntaxKind, spelling: Name, range: TextRange, pragment_of: Option<Name>) {
        let line = 0; // assigned by the caller once line offsets are known
        let mut token = Token::new(kind, spelling, range, line);
        token.pragment_of = pragment_of;
        self.tokens.push(token);
    }

    fn report(&mut self, code: ErrorCode, range: TextRange) -> PhaseOutcome {
        self.sink.report(Diagnostic::error(code, range))
    }

    /// Scans to the next occurrence of `close` (a whole-word match, since
    /// `CO`/`COMMENT` both start with the same letters) or end of input.
    /// Returns the comment's inner text and whether a closing marker was
    /// found.
    fn scan_delimited_comment(&mut self, open: &str) -> (String, bool) {
        let close = open;
        let remainder = self.inner.remainder();
        match find_word(remainder, close) {
            Some(idx) => {
                let text = remainder[..idx].to_string();
                self.inner.bump(idx + close.len());
                (text, true)
            }
            None => {
                let text = remainder.to_string();
                self.inner.bump(remainder.len());
                (text, false)
            }
        }
    }

    /// Like [`Self::scan_delimited_comment`] but a quoted string inside the
    /// pragmat does not count toward a premature close, so
    /// `PR include "with PR inside" PR` still scans correctly.
    fn scan_delimited_pragmat(&mut self, open: &str) -> (String, bool) {
        let close = open;
        let remainder = self.inner.remainder();
        let bytes = remainder.as_bytes();
        let mut i = 0usize;
        let mut in_string = false;
        while i < bytes.len() {
            if bytes[i] == b'"' {
                in_string = !in_string;
                i += 1;
                continue;
            }
            if !in_string && word_matches_at(remainder, i, close) {
                let text = remainder[..i].to_string();
                self.inner.bump(i + close.len());
                return (text, true);
            }
            i += 1;
        }
        let text = remainder.to_string();
        self.inner.bump(remainder.len());
        (text, false)
    }

    /// Scans a string denotation's body, un-escaping doubled quotes (`""`
    /// becomes a single embedded `"`). `quote_start` is the byte offset of
    /// the opening quote's end (i.e. the body's start).
    fn scan_string(&mut self, quote_start: usize) -> (String, usize, bool) {
        let remainder = self.inner.remainder();
        let bytes = remainder.as_bytes();
        let mut out = String::new();
        let mut i = 0usize;
        while i < bytes.len() {
            if bytes[i] == b'"' {
                if i + 1 < bytes.len() && bytes[i + 1] == b'"' {
                    out.push('"');
                    i += 2;
                    continue;
                }
                self.inner.bump(i + 1);
                return (out, quote_start + i + 1, true);
            }
            if bytes[i] == b'\n' {
                break;
            }
            let ch = remainder[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
        self.inner.bump(i);
        (out, quote_start + i, false)
    }

    /// Scans digits already consumed by `logos` plus any radix marker
    /// (`r`, e.g. `16r1A2B`), fraction (`.`), and exponent (`e`/`\`)
    /// extensions, classifying the result as `INT`, `REAL`, or `BITS`.
    fn scan_denotation(&mut self, start: usize, digits_end: usize) -> (SyntaxKind, String, usize) {
        let mut text = self.source[start..digits_end].to_string();
        let mut end = digits_end;
        let mut kind = SyntaxKind::INT_DENOTATION;

        let remainder = self.inner.remainder();
        if let Some(rest) = remainder.strip_prefix('r') {
            let radix_digits: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            if !radix_digits.is_empty() {
                text.push('r');
                text.push_str(&radix_digits);
                let consumed = 1 + radix_digits.len();
                self.inner.bump(consumed);
                end += consumed;
                kind = SyntaxKind::BITS_DENOTATION;
                return (kind, text, end);
            }
        }

        if remainder.starts_with('.') && remainder[1..].starts_with(|c: char| c.is_ascii_digit()) {
            let frac: String = remainder[1..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            text.push('.');
            text.push_str(&frac);
            let consumed = 1 + frac.len();
            self.inner.bump(consumed);
            end += consumed;
            kind = SyntaxKind::REAL_DENOTATION;
        }

        let remainder = self.inner.remainder();
        if remainder.starts_with(['e', 'E', '\\']) {
            let rest = &remainder[1..];
            let sign_len = if rest.starts_with(['+', '-']) { 1 } else { 0 };
            let exp_digits: String = rest[sign_len..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !exp_digits.is_empty() {
                let marker = &remainder[..1];
                text.push_str(marker);
                text.push_str(&rest[..sign_len]);
                text.push_str(&exp_digits);
                let consumed = 1 + sign_len + exp_digits.len();
                self.inner.bump(consumed);
                end += consumed;
                kind = SyntaxKind::REAL_DENOTATION;
            }
        }

        (kind, text, end)
    }

    /// `GO TO` (possibly with intervening whitespace/comments already
    /// emitted) merges into a single `GOTO` token.
    fn merge_goto(&mut self) {
        let mut i = 0;
        while i < self.tokens.len() {
            if self.tokens[i].kind == SyntaxKind::GO_SYM {
                if let Some(next) = self.tokens.get(i + 1) {
                    if next.kind == SyntaxKind::TO_SYM {
                        let merged_range = TextRange::new(self.tokens[i].range.start(), next.range.end());
                        self.tokens[i].kind = SyntaxKind::GOTO_SYM;
                        self.tokens[i].range = merged_range;
                        self.tokens.remove(i + 1);
                    }
                }
            }
            i += 1;
        }
    }
}

fn find_word(haystack: &str, word: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = haystack[from..].find(word) {
        let idx = from + rel;
        if word_matches_at(haystack, idx, word) {
            return Some(idx);
        }
        from = idx + 1;
    }
    None
}

fn word_matches_at(haystack: &str, idx: usize, word: &str) -> bool {
    if !haystack[idx..].starts_with(word) {
        return false;
    }
    let before_ok = haystack[..idx]
        .chars()
        .next_back()
        .map(|c| !c.is_ascii_alphanumeric())
        .unwrap_or(true);
    let after_ok = haystack[idx + word.len()..]
        .chars()
        .next()
        .map(|c| !c.is_ascii_alphanumeric())
        .unwrap_or(true);
    before_ok && after_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Vec<Token> {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        Scanner::new(source, Stropping::Upper, &mut interner, &mut sink).run()
    }

    #[test]
    fn scans_plain_keywords_and_identifiers() {
        let tokens = scan("BEGIN x END");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![SyntaxKind::BEGIN_SYM, SyntaxKind::IDENTIFIER, SyntaxKind::END_SYM]
        );
    }

    #[test]
    fn scans_int_denotation() {
        let tokens = scan("123");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, SyntaxKind::INT_DENOTATION);
    }

    #[test]
    fn scans_real_denotation_with_exponent() {
        let tokens = scan("1.5e10");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, SyntaxKind::REAL_DENOTATION);
    }

    #[test]
    fn scans_radix_denotation() {
        let tokens = scan("16r1A2B");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, SyntaxKind::BITS_DENOTATION);
    }

    #[test]
    fn scans_string_with_doubled_quote_escape() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        let tokens = Scanner::new(r#""he said ""hi""""#, Stropping::Upper, &mut interner, &mut sink).run();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, SyntaxKind::STRING_DENOTATION);
        assert_eq!(interner.resolve(tokens[0].spelling), r#"he said "hi""#);
    }

    #[test]
    fn skips_hash_comment() {
        let tokens = scan("INT # a comment # x");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![SyntaxKind::INT_SYM, SyntaxKind::IDENTIFIER]);
    }

    #[test]
    fn skips_co_comment_as_whole_word() {
        // "COLOR" must not be mistaken for a "CO ... CO" comment open.
        let tokens = scan("COLOR x");
        assert_eq!(tokens[0].kind, SyntaxKind::BOLD_TAG);
    }

    #[test]
    fn merges_go_to_into_goto() {
        let tokens = scan("GO TO lab");
        assert_eq!(tokens[0].kind, SyntaxKind::GOTO_SYM);
    }

    #[test]
    fn recognizes_becomes_forms() {
        let tokens = scan("x := 1");
        assert_eq!(tokens[1].kind, SyntaxKind::BECOMES);
    }

    #[test]
    fn quote_stropping_bold_tag() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        let tokens = Scanner::new("'begin' x 'end'", Stropping::Quote, &mut interner, &mut sink).run();
        assert_eq!(tokens[0].kind, SyntaxKind::BEGIN_SYM);
    }

    #[test]
    fn unterminated_string_reports_diagnostic() {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new();
        Scanner::new("\"never closed", Stropping::Upper, &mut interner, &mut sink).run();
        assert!(sink.has_errors());
    }
}
