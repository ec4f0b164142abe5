//! Categorized diagnostic codes, grouped by the phase that raises them:
//! Lexical / Syntactic / Modal / Coercion / Scope / Pragmatic.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // ---- Lexical ----
    UnterminatedString,
    UnterminatedComment,
    UnterminatedPragmat,
    UnworthyCharacter,
    IncorrectFilename,
    IncludeControlCharacter,

    // ---- Syntactic ----
    ParenMismatch,
    MissingKeyword,
    InvalidSequence,
    MultiplyDeclaredTag,
    RedefinedKeyword,
    InvalidOperatorTag,
    InvalidPriority,
    RefinementRedefinition,
    RefinementReapplication,
    UnappliedRefinement, // warning
    LabelBeforeDeclaration,
    SuperfluousSemicolon, // warning
    UndeclaredTag,
    DeclarerShapeMismatch,

    // ---- Modal ----
    ModeNotWellFormed,
    UnionComponentRelation,
    DuplicateStructField,
    FlexOverNonRow,
    UnresolvedIndicant,
    NoUniqueBalancingMode,
    NoComponentInUnion,

    // ---- Coercion ----
    CannotCoerce,
    NoMatchingOperator,
    ArgumentCountMismatch,
    IndexerCountMismatch,
    NonNameDestination,
    NonRefOperand,

    // ---- Scope ----
    TransientNameStored,
    ValueEscapesScope, // warning for REF/PROC/FORMAT/UNION carriers

    // ---- Pragmatic warnings ----
    UnusedTag,
    TagNotPortable,
    WideningNotPortable,
    HidesName,
    VoidedValueDiscarded,
    UnintendedDeclarationShape,
}

impl ErrorCode {
    /// Default severity for codes that are always a warning, regardless of
    /// the call site.
    pub fn default_severity(self) -> super::Severity {
        use super::Severity;
        match self {
            ErrorCode::SuperfluousSemicolon
            | ErrorCode::UnappliedRefinement
            | ErrorCode::ValueEscapesScope
            | ErrorCode::UnusedTag
            | ErrorCode::TagNotPortable
            | ErrorCode::WideningNotPortable
            | ErrorCode::HidesName
            | ErrorCode::VoidedValueDiscarded
            | ErrorCode::UnintendedDeclarationShape => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::UnterminatedString => "unterminated string denotation",
            ErrorCode::UnterminatedComment => "unterminated comment",
            ErrorCode::UnterminatedPragmat => "unterminated pragmat",
            ErrorCode::UnworthyCharacter => "unworthy character",
            ErrorCode::IncorrectFilename => "incorrect filename in include/read pragmat",
            ErrorCode::IncludeControlCharacter => "control character in included file",
            ErrorCode::ParenMismatch => "mismatched parenthesis or keyword pair",
            ErrorCode::MissingKeyword => "missing expected keyword",
            ErrorCode::InvalidSequence => "invalid sequence of symbols",
            ErrorCode::MultiplyDeclaredTag => "tag is declared more than once in this range",
            ErrorCode::RedefinedKeyword => "a reserved keyword cannot be redefined",
            ErrorCode::InvalidOperatorTag => "invalid operator tag",
            ErrorCode::InvalidPriority => "priority is out of range",
            ErrorCode::RefinementRedefinition => "refinement is defined more than once",
            ErrorCode::RefinementReapplication => "refinement is applied more than once",
            ErrorCode::UnappliedRefinement => "refinement is defined but never applied",
            ErrorCode::LabelBeforeDeclaration => "label precedes a declaration in the same serial clause",
            ErrorCode::SuperfluousSemicolon => "superfluous semicolon",
            ErrorCode::UndeclaredTag => "applied occurrence does not resolve to any declaration in scope",
            ErrorCode::DeclarerShapeMismatch => "declarer bounds do not match the actual, formal, or virtual shape this position requires",
            ErrorCode::ModeNotWellFormed => "mode is not well formed",
            ErrorCode::UnionComponentRelation => "union contains firmly related or subset-related components",
            ErrorCode::DuplicateStructField => "struct has a duplicate field name",
            ErrorCode::FlexOverNonRow => "flex applied to a non-row mode",
            ErrorCode::UnresolvedIndicant => "indicant does not resolve to a mode",
            ErrorCode::NoUniqueBalancingMode => "clause branches do not balance to a unique mode",
            ErrorCode::NoComponentInUnion => "union has no component accepting this mode",
            ErrorCode::CannotCoerce => "mode cannot be coerced in this context",
            ErrorCode::NoMatchingOperator => "no operator matches these operand modes",
            ErrorCode::ArgumentCountMismatch => "argument count does not match the procedure's parameter pack",
            ErrorCode::IndexerCountMismatch => "indexer count does not match the row's dimension",
            ErrorCode::NonNameDestination => "destination of assignation is not a name",
            ErrorCode::NonRefOperand => "operand of IS/ISNT is not a name",
            ErrorCode::TransientNameStored => "a transient name is stored past its lifetime",
            ErrorCode::ValueEscapesScope => "value's scope does not outlive its destination",
            ErrorCode::UnusedTag => "tag is declared but never used",
            ErrorCode::TagNotPortable => "tag is not portable",
            ErrorCode::WideningNotPortable => "implicit widening is not portable",
            ErrorCode::HidesName => "declaration hides a name from an enclosing range",
            ErrorCode::VoidedValueDiscarded => "value is voided and discarded",
            ErrorCode::UnintendedDeclarationShape => "declaration shape is likely unintended",
        }
    }
}
