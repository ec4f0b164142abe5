//! [`SyntaxKind`] — the single attribute tag shared by tokens (lexing and
//! reduction) and tree nodes (everything from bracket/keyword matching
//! onward): one node kind serves both the linear token list and the syntax
//! tree, so a token can be promoted into a tree leaf without retagging.
//!
//! Grouped the conventional `rowan`-style way: trivia, literals,
//! punctuation, keywords, then nonterminal (tree-node-only) attributes for
//! every construct the grammar below builds.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // ===== TRIVIA =====
    WHITESPACE = 0,
    COMMENT,
    PRAGMAT,

    // ===== LITERAL TOKENS =====
    IDENTIFIER,
    BOLD_TAG,
    INT_DENOTATION,
    REAL_DENOTATION,
    BITS_DENOTATION,
    STRING_DENOTATION,
    OPERATOR,

    // ===== PUNCTUATION TOKENS =====
    OPEN_PAREN,
    CLOSE_PAREN,
    OPEN_BRACKET,
    CLOSE_BRACKET,
    OPEN_BRACE,
    CLOSE_BRACE,
    SEMI,
    COMMA,
    COLON,
    DOT,
    DOTDOT,
    POINT,
    BECOMES,       // :=
    COLON_BECOMES, // ::=
    ALT_EQUALS,    // =: / ==:
    BAR,
    BAR_COLON,
    DOLLAR,
    AT,
    SUB_SYM,  // `[` used specifically for slicing, disambiguated post-reduce
    UPTO_SYM, // `:` used inside bounds

    // ===== KEYWORDS =====
    BEGIN_SYM,
    END_SYM,
    IF_SYM,
    THEN_SYM,
    ELIF_SYM,
    ELSE_SYM,
    FI_SYM,
    CASE_SYM,
    IN_SYM,
    OUT_SYM,
    OUSE_SYM,
    ESAC_SYM,
    FOR_SYM,
    FROM_SYM,
    BY_SYM,
    TO_SYM,
    DOWNTO_SYM,
    WHILE_SYM,
    UNTIL_SYM,
    DO_SYM,
    OD_SYM,
    PROC_SYM,
    MODE_SYM,
    OP_SYM,
    PRIO_SYM,
    REF_SYM,
    FLEX_SYM,
    STRUCT_SYM,
    UNION_SYM,
    LOC_SYM,
    HEAP_SYM,
    NEW_SYM,
    LONG_SYM,
    SHORT_SYM,
    SKIP_SYM,
    GOTO_SYM,
    GO_SYM,
    IS_SYM,
    ISNT_SYM,
    OF_SYM,
    ANDF_SYM,
    ORF_SYM,
    TRUE_SYM,
    FALSE_SYM,
    NIL_SYM,
    EMPTY_SYM,
    CODE_SYM,
    EDOC_SYM,
    AT_SYM, // the `@` "at" used in ROWED array generators — kept distinct from AT token

    // ===== STANDARD INDICANT KEYWORDS =====
    VOID_SYM,
    INT_SYM,
    REAL_SYM,
    COMPLEX_SYM,
    BOOL_SYM,
    CHAR_SYM,
    BITS_SYM,
    BYTES_SYM,
    STRING_SYM,
    FORMAT_SYM,
    FILE_SYM,

    // ===== FORMAT ITEMS (within `$ ... $`) =====
    FORMAT_ITEM,
    STATIC_REPLICATOR,
    DYNAMIC_REPLICATOR_OPEN,

    // ===== NONTERMINALS (tree nodes only, built from phase G onward) =====
    PROGRAM,
    REFINEMENT,
    REFINEMENT_LIST,

    DECLARER,
    STANDARD_DECLARER,
    INDICANT,
    REF_DECLARER,
    FLEX_DECLARER,
    ROW_DECLARER,
    STRUCT_DECLARER,
    UNION_DECLARER,
    PROC_DECLARER,
    FIELD,
    FORMAL_PARAMETER,

    MODE_DECLARATION,
    PRIORITY_DECLARATION,
    OPERATOR_DECLARATION,
    OPERATOR_PLAN,
    IDENTITY_DECLARATION,
    VARIABLE_DECLARATION,
    PROC_IDENTITY_DECLARATION,
    PROC_VARIABLE_DECLARATION,
    DECLARATION_LIST,
    LABEL,
    GENERATOR,

    ROUTINE_TEXT,

    CALL,
    SLICE,
    SPECIFICATION,
    SELECTION,
    SELECTOR,
    CAST,
    ASSERTION,
    DENOTATION,
    NIHIL,
    SKIP,
    JUMP,
    CODE_CLAUSE,

    MONADIC_FORMULA,
    DYADIC_FORMULA,
    FORMULA,

    IDENTITY_RELATION,
    AND_FUNCTION,
    OR_FUNCTION,
    ASSIGNATION,

    GENERIC_ARGUMENT,
    BOUND,
    BOUNDS_LIST,
    ARGUMENT_LIST,

    SERIAL_CLAUSE,
    ENQUIRY_CLAUSE,
    COLLATERAL_CLAUSE,
    CONFORMITY_CLAUSE,
    CASE_PART,
    CASE_CLAUSE,
    CONDITIONAL_CLAUSE,
    LOOP_CLAUSE,
    CLOSED_CLAUSE,
    ENCLOSED_CLAUSE,
    BRIEF_ROW_DISPLAY,
    BRIEF_STRUCTURE_DISPLAY,

    FORMAT_TEXT,
    FORMAT_PATTERN,
    PICTURE_LIST,

    // ===== INSERTED COERCION NODES (phase L) =====
    DEREFERENCING,
    DEPROCEDURING,
    WIDENING,
    UNITING,
    ROWING,
    VOIDING,
    PROCEDURING,

    ERROR,
    __LAST,
}

impl SyntaxKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::WHITESPACE | Self::COMMENT | Self::PRAGMAT)
    }

    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::BEGIN_SYM as u16) && (self as u16) <= (Self::FILE_SYM as u16)
    }

    pub fn is_coercion(self) -> bool {
        matches!(
            self,
            Self::DEREFERENCING
                | Self::DEPROCEDURING
                | Self::WIDENING
                | Self::UNITING
                | Self::ROWING
                | Self::VOIDING
                | Self::PROCEDURING
        )
    }

    pub fn is_denotation(self) -> bool {
        matches!(
            self,
            Self::INT_DENOTATION
                | Self::REAL_DENOTATION
                | Self::BITS_DENOTATION
                | Self::STRING_DENOTATION
        )
    }
}
