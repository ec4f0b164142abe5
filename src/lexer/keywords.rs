//! Keyword table. A bold tag whose spelling names a reserved word has its
//! attribute replaced by that keyword's own kind.
//!
//! Lookup is case-insensitive on the *canonical* spelling: in `UPPER`
//! stropping a bold tag arrives as an uppercase run (`BEGIN`); in `QUOTE`
//! stropping it arrives lower-case from inside quotes (`'begin'`, already
//! stripped of quotes by the scanner). Either way the table is keyed on the
//! upper-case form.

use crate::kind::SyntaxKind;

pub fn lookup_keyword(spelling: &str) -> Option<SyntaxKind> {
    let upper = spelling.to_ascii_uppercase();
    Some(match upper.as_str() {
        "BEGIN" => SyntaxKind::BEGIN_SYM,
        "END" => SyntaxKind::END_SYM,
        "IF" => SyntaxKind::IF_SYM,
        "THEN" => SyntaxKind::THEN_SYM,
        "ELIF" => SyntaxKind::ELIF_SYM,
        "ELSE" => SyntaxKind::ELSE_SYM,
        "FI" => SyntaxKind::FI_SYM,
        "CASE" => SyntaxKind::CASE_SYM,
        "IN" => SyntaxKind::IN_SYM,
        "OUT" => SyntaxKind::OUT_SYM,
        "OUSE" => SyntaxKind::OUSE_SYM,
        "ESAC" => SyntaxKind::ESAC_SYM,
        "FOR" => SyntaxKind::FOR_SYM,
        "FROM" => SyntaxKind::FROM_SYM,
        "BY" => SyntaxKind::BY_SYM,
        "TO" => SyntaxKind::TO_SYM,
        "DOWNTO" => SyntaxKind::DOWNTO_SYM,
        "WHILE" => SyntaxKind::WHILE_SYM,
        "UNTIL" => SyntaxKind::UNTIL_SYM,
        "DO" => SyntaxKind::DO_SYM,
        "OD" => SyntaxKind::OD_SYM,
        "PROC" => SyntaxKind::PROC_SYM,
        "MODE" => SyntaxKind::MODE_SYM,
        "OP" => SyntaxKind::OP_SYM,
        "PRIO" => SyntaxKind::PRIO_SYM,
        "REF" => SyntaxKind::REF_SYM,
        "FLEX" => SyntaxKind::FLEX_SYM,
        "STRUCT" => SyntaxKind::STRUCT_SYM,
        "UNION" => SyntaxKind::UNION_SYM,
        "LOC" => SyntaxKind::LOC_SYM,
        "HEAP" => SyntaxKind::HEAP_SYM,
        "NEW" => SyntaxKind::NEW_SYM,
        "LONG" => SyntaxKind::LONG_SYM,
        "SHORT" => SyntaxKind::SHORT_SYM,
        "SKIP" => SyntaxKind::SKIP_SYM,
        "GOTO" => SyntaxKind::GOTO_SYM,
        "GO" => SyntaxKind::GO_SYM,
        "IS" => SyntaxKind::IS_SYM,
        "ISNT" => SyntaxKind::ISNT_SYM,
        "OF" => SyntaxKind::OF_SYM,
        "ANDF" => SyntaxKind::ANDF_SYM,
        "ORF" => SyntaxKind::ORF_SYM,
        "TRUE" => SyntaxKind::TRUE_SYM,
        "FALSE" => SyntaxKind::FALSE_SYM,
        "NIL" => SyntaxKind::NIL_SYM,
        "EMPTY" => SyntaxKind::EMPTY_SYM,
        "CODE" => SyntaxKind::CODE_SYM,
        "EDOC" => SyntaxKind::EDOC_SYM,
        "VOID" => SyntaxKind::VOID_SYM,
        "INT" => SyntaxKind::INT_SYM,
        "REAL" => SyntaxKind::REAL_SYM,
        "COMPLEX" => SyntaxKind::COMPLEX_SYM,
        "BOOL" => SyntaxKind::BOOL_SYM,
        "CHAR" => SyntaxKind::CHAR_SYM,
        "BITS" => SyntaxKind::BITS_SYM,
        "BYTES" => SyntaxKind::BYTES_SYM,
        "STRING" => SyntaxKind::STRING_SYM,
        "FORMAT" => SyntaxKind::FORMAT_SYM,
        "FILE" => SyntaxKind::FILE_SYM,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_upper_and_quote_spellings() {
        assert_eq!(lookup_keyword("BEGIN"), Some(SyntaxKind::BEGIN_SYM));
        assert_eq!(lookup_keyword("begin"), Some(SyntaxKind::BEGIN_SYM));
    }

    #[test]
    fn rejects_non_keywords() {
        assert_eq!(lookup_keyword("frobnicate"), None);
    }
}
