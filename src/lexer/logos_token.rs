//! Flat lexical classes, recognized with `logos`. The stateful parts —
//! nested comments/pragmats, strings, and recursive format-text sub-mode —
//! are layered on top by [`super::scanner::Scanner`] using
//! `logos::Lexer::bump`/`remainder` to hand-scan past delimiter pairs the
//! regex engine cannot express on its own (matching *open* delimiter text
//! determines the required *close* spelling, e.g. `CO … CO` vs
//! `COMMENT … COMMENT`).

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"")]
pub enum LogosToken {
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    /// An upper-case run: a bold tag in `UPPER` stropping, or a reserved
    /// word (`CO`, `COMMENT`, `PR`, `PRAGMAT`) regardless of stropping.
    #[regex(r"[A-Z][A-Z_]*")]
    UpperRun,

    /// `'NAME'` — a bold tag in `QUOTE` stropping.
    #[regex(r"'[A-Za-z_][A-Za-z0-9_]*'")]
    QuotedWord,

    #[regex(r"[a-z][a-z0-9_]*")]
    LowerRun,

    #[regex(r"[0-9]+")]
    Digits,

    #[token("\"")]
    DoubleQuote,

    #[token("#")]
    Hash,

    #[token("$")]
    Dollar,

    #[token("::=")]
    ColonColonEquals,
    #[token(":=")]
    ColonEquals,
    #[token("==:")]
    EqEqColon,
    #[token("=:")]
    EqColon,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("|:")]
    BarColon,
    #[token("|")]
    Bar,
    #[token("!")]
    Bang,
    #[token("@")]
    At,

    /// A run of Algol 68 operator characters — collapsed into one
    /// `OPERATOR` token; `Scanner` splits a trailing `=` off the run when
    /// it ends in `==`, so an operator-defining `=` is never swallowed
    /// into the declared operator's own name (e.g. `<==` becomes the
    /// operator `<=` followed by a plain `=`).
    #[regex(r"[+\-*/=<>~^&%?\\]+")]
    OperatorChars,
}
