//! Boundary behaviors from the mode collector's longety clamp, driven end
//! to end through `Program::check` rather than against the collector
//! directly (see `mode::collector`'s own unit tests for the direct version).

use a68f::diag::ErrorCode;
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
fn triple_long_int_clamps_to_the_greatest_available_precision_and_warns() {
    let mut program = Program::new(Config::default());
    let outcome = program.check("BEGIN LONG LONG LONG INT x := 0 END", "t.a68", &NoIncludes);
    let diags = all_diagnostics(&outcome);
    assert!(
        diags.iter().any(|d| d.code == ErrorCode::TagNotPortable),
        "expected a portability warning for the clamped precision, got: {diags:?}"
    );
    assert!(!diags.iter().any(|d| d.severity.is_error()), "clamping must not itself be an error: {diags:?}");
}

#[test]
fn empty_row_display_under_a_row_target_settles_without_error() {
    let mut program = Program::new(Config::default());
    let outcome = program.check("BEGIN [10] INT v := [] END", "t.a68", &NoIncludes);
    let diags = all_diagnostics(&outcome);
    assert!(outcome.success, "empty display against a ROW target should not report: {diags:?}");
}

#[test]
fn empty_row_display_under_a_non_row_target_settles_to_undefined_not_the_target() {
    use a68f::mode::ModeAttribute;

    let mut program = Program::new(Config::default());
    let outcome = program.check("BEGIN INT x = [] END", "t.a68", &NoIncludes);
    let tree = outcome.tree.as_ref().expect("parse succeeded");
    let modes = outcome.modes.as_ref().expect("modes collected");

    let display = find_kind(tree, outcome.root.unwrap(), a68f::kind::SyntaxKind::BRIEF_ROW_DISPLAY)
        .expect("empty row display node present");
    let slot = tree.node(display).mode_slot.expect("display was visited by the checker");
    let mode = modes.get(a68f::mode::ModeId::new(slot as usize));
    assert_eq!(
        mode.attribute,
        ModeAttribute::Undefined,
        "empty display under a non-ROW STRONG target must settle to UNDEFINED, not echo the target mode"
    );
}

fn find_kind(tree: &a68f::tree::Tree, node: a68f::tree::NodeId, kind: a68f::kind::SyntaxKind) -> Option<a68f::tree::NodeId> {
    if tree.node(node).kind == kind {
        return Some(node);
    }
    tree.children(node).into_iter().find_map(|child| find_kind(tree, child, kind))
}
