//! End-to-end checks driving the whole pipeline through `Program::check`.

use a68f::diag::{ErrorCode, Severity};
use a68f::source::FileResolver;
use a68f::{Config, Program};

struct NoIncludes;
impl FileResolver for NoIncludes {
    fn read(&self, _name: &str) -> Option<String> {
        None
    }
}

fn all_diagnostics(outcome: &a68f::program::Outcome) -> Vec<a68f::diag::Diagnostic> {
    outcome
        .lines
        .lines()
        .iter()
        .flat_map(|line| line.diagnostics.iter().cloned())
        .collect()
}

#[test]
fn arithmetic_and_print_has_no_diagnostics() {
    let mut program = Program::new(Config::default());
    let outcome = program.check("BEGIN INT i = 1, j = 2; print (i + j) END", "t.a68", &NoIncludes);
    let diags = all_diagnostics(&outcome);
    assert!(outcome.success, "unexpected diagnostics: {diags:?}");
    assert_eq!(outcome.error_count, 0);
}

#[test]
fn string_concatenation_has_no_diagnostics() {
    let mut program = Program::new(Config::default());
    let outcome = program.check(r#"BEGIN STRING s = "a" + "b" + "c" END"#, "t.a68", &NoIncludes);
    let diags = all_diagnostics(&outcome);
    assert!(outcome.success, "unexpected diagnostics: {diags:?}");
}

#[test]
fn slicing_a_declared_row_does_not_escape_scope() {
    let mut program = Program::new(Config::default());
    let outcome = program.check(
        "BEGIN PROC p = (REF INT x) VOID: x := 0; [10] INT v; p (v [1]) END",
        "t.a68",
        &NoIncludes,
    );
    let diags = all_diagnostics(&outcome);
    assert!(outcome.success, "unexpected diagnostics: {diags:?}");
}

#[test]
fn conformity_clause_over_a_union_has_no_balancing_error() {
    let mut program = Program::new(Config::default());
    let outcome = program.check(
        "BEGIN UNION (INT, REAL) u := 1; CASE u IN (INT i): print (i), (REAL r): print (r) ESAC END",
        "t.a68",
        &NoIncludes,
    );
    let diags = all_diagnostics(&outcome);
    assert!(
        !diags.iter().any(|d| d.code == ErrorCode::NoUniqueBalancingMode),
        "unexpected balancing error: {diags:?}"
    );
}

#[test]
fn mismatched_brackets_stop_the_pipeline_before_parsing() {
    let mut program = Program::new(Config::default());
    let outcome = program.check("IF TRUE THEN print (1) OD", "t.a68", &NoIncludes);
    assert!(!outcome.success);
    assert!(outcome.tree.is_none());
    let diags = all_diagnostics(&outcome);
    assert!(diags.iter().any(|d| d.code == ErrorCode::ParenMismatch));
}

#[test]
fn undeclared_identifier_is_reported_as_an_error() {
    let mut program = Program::new(Config::default());
    let outcome = program.check("BEGIN INT x := y END", "t.a68", &NoIncludes);
    assert!(!outcome.success);
    let diags = all_diagnostics(&outcome);
    assert!(diags.iter().any(|d| d.code == ErrorCode::UndeclaredTag && d.severity == Severity::Error));
}

#[test]
fn dyadic_operator_resolves_across_widened_operand_modes() {
    let mut program = Program::new(Config::default());
    let outcome = program.check("BEGIN REAL x := 1.0; INT y := 2; REAL z := x * y END", "t.a68", &NoIncludes);
    let diags = all_diagnostics(&outcome);
    assert!(
        !diags.iter().any(|d| d.code == ErrorCode::NoMatchingOperator),
        "REAL * INT should resolve by widening INT to REAL, got: {diags:?}"
    );
}

#[test]
fn assignation_inside_identity_declaration_initializer_is_flagged_as_unintended() {
    let mut program = Program::new(Config::default());
    let outcome = program.check("BEGIN REF INT k = LOC INT := 0 END", "t.a68", &NoIncludes);
    let diags = all_diagnostics(&outcome);
    assert!(
        diags.iter().any(|d| d.code == ErrorCode::UnintendedDeclarationShape),
        "expected a semantic-pitfall warning on the LOC generator, got: {diags:?}"
    );
}

#[test]
fn a_generator_assigned_to_a_name_declared_outside_its_block_is_flagged() {
    // the LOC generator lives only as long as the inner BEGIN..END block;
    // `r`, declared one range further out, outlives it.
    let mut program = Program::new(Config::default());
    let outcome = program.check("BEGIN REF INT r; BEGIN r := LOC INT END END", "t.a68", &NoIncludes);
    let diags = all_diagnostics(&outcome);
    assert!(
        diags.iter().any(|d| d.code == ErrorCode::ValueEscapesScope),
        "expected a scope-escape diagnostic, got: {diags:?}"
    );
}
