/// The stropping regime in force for a source buffer.
///
/// `UPPER` recognizes bold tags as uppercase runs (`BEGIN`); `QUOTE`
/// recognizes them as quoted words (`'begin'`) so identifiers can use any
/// case freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stropping {
    #[default]
    Upper,
    Quote,
}

impl Stropping {
    /// The prelude text prepended so the parser always sees a single
    /// enclosing `BEGIN … END`.
    pub fn prelude(self) -> &'static str {
        match self {
            Stropping::Upper => "BEGIN ",
            Stropping::Quote => "'begin' ",
        }
    }

    pub fn postlude(self) -> &'static str {
        match self {
            Stropping::Upper => " END",
            Stropping::Quote => " 'end'",
        }
    }
}
