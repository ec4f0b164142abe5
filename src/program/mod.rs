//! Program record and phase driver (A→N orchestration).
//!
//! Collapses the whole pipeline's otherwise-global state into one record
//! that owns a configuration and drives each phase of a compilation in
//! order. There is exactly one `Program` per compilation, and `check`
//! takes `&mut self`: a single run owns the interner for its whole
//! duration, matching a one-shot batch front end rather than an
//! incrementally-reused, multi-file analysis host. Callers wanting
//! concurrent compilations build one `Program` per thread rather than
//! sharing one.

use rustc_hash::FxHashMap;

use crate::base::{Interner, Stropping};
use crate::diag::{Diagnostic, DiagnosticSink};
use crate::lexer::Scanner;
use crate::mode::ModeTable;
use crate::refine::{self, Refinement};
use crate::source::{FileResolver, LineChain};
use crate::tree::{NodeId, NodeStatus, RangeArena, RangeId, TagArena, Tree};
use crate::{bind, check, mode, parser, scopecheck, stdenv, victal};

/// Default per-node status bits a fresh program's `node_mask_defaults`
/// seeds every listing-relevant node with. Reuses [`NodeStatus`] itself —
/// the configuration's mask and a node's own status bitset are the same
/// bit space, so no separate flag type is needed.
pub type NodeMask = NodeStatus;

/// Program configuration, consumed (not owned) by [`Program::check`].
/// Listing/cross-reference output itself is out of this crate's scope, but
/// the flags that would drive it are still carried through so an embedder
/// can act on them.
#[derive(Debug, Clone)]
pub struct Config {
    pub stropping: Stropping,
    pub portcheck: bool,
    pub brackets: bool,
    pub cross_reference: bool,
    pub tree_listing: bool,
    pub moid_listing: bool,
    pub standard_prelude_listing: bool,
    pub run_script: bool,
    pub node_mask_defaults: NodeMask,
    pub pragmat_options: FxHashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stropping: Stropping::Upper,
            portcheck: false,
            brackets: true,
            cross_reference: false,
            tree_listing: false,
            moid_listing: false,
            standard_prelude_listing: false,
            run_script: false,
            node_mask_defaults: NodeMask::empty(),
            pragmat_options: FxHashMap::default(),
        }
    }
}

/// Everything a compilation produces: the annotated tree, its owning
/// arenas, the refinement ledger, and the source chain with every
/// diagnostic appended to the line that raised it.
pub struct Outcome {
    pub tree: Option<Tree>,
    pub ranges: Option<RangeArena>,
    pub tags: Option<TagArena>,
    pub modes: Option<ModeTable>,
    pub root: Option<NodeId>,
    pub top_range: Option<RangeId>,
    pub std_range: Option<RangeId>,
    pub refinements: Vec<Refinement>,
    pub lines: LineChain,
    pub success: bool,
    pub error_count: usize,
}

/// Owns the interner and configuration for one compilation and drives
/// components A through M in order, stopping early wherever a phase's own
/// contract says downstream phases should not run on its output (a
/// bracket-mismatched token list, per `parser::check_brackets`'s doc
/// comment).
pub struct Program {
    config: Config,
    interner: Interner,
}

impl Program {
    pub fn new(config: Config) -> Self {
        Self { config, interner: Interner::new() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Runs the whole pipeline over one in-memory source buffer.
    pub fn check(&mut self, source: &str, filename: &str, resolver: &dyn FileResolver) -> Outcome {
        let mut sink = DiagnosticSink::new();

        let mut lines = LineChain::build(source, filename, self.config.stropping, resolver);
        let flat = lines.flat_text();

        let tokens = Scanner::new(&flat, self.config.stropping, &mut self.interner, &mut sink).run();
        let (tokens, refinements) = refine::preprocess(tokens, &mut sink);

        if !parser::check_brackets(&tokens, &mut sink) {
            distribute_diagnostics(&mut lines, &sink);
            return Outcome {
                tree: None,
                ranges: None,
                tags: None,
                modes: None,
                root: None,
                top_range: None,
                std_range: None,
                refinements,
                lines,
                success: false,
                error_count: sink.error_count(),
            };
        }

        let mut modes = ModeTable::new();
        let env = stdenv::build(&mut self.interner, &mut modes);
        let std_range = env.range;

        let parsed = parser::parse_with_environ(&tokens, &mut self.interner, &mut sink, env.ranges, env.tags, Some(std_range));
        let mut tree = parsed.tree;
        let mut ranges = parsed.ranges;
        let mut tags = parsed.tags;
        let root = parsed.root;
        let top_range = parsed.top_range;

        mode::collect(&mut tree, &self.interner, &mut modes, &mut tags, &mut sink, root);
        mode::run_equivalence(&mut modes, &mut sink);

        bind::bind(&mut tree, &ranges, &mut tags, &mut self.interner, &mut sink, root, top_range);
        bind::assign_offsets(&mut ranges, &mut tags, &modes);

        victal::check(&tree, &mut sink, root);
        check::check(&mut tree, &mut modes, &mut tags, &ranges, &self.interner, &mut sink, root, top_range);
        scopecheck::check(&mut tree, &modes, &ranges, &mut tags, &mut sink, root, top_range);

        distribute_diagnostics(&mut lines, &sink);

        Outcome {
            tree: Some(tree),
            ranges: Some(ranges),
            tags: Some(tags),
            modes: Some(modes),
            root: Some(root),
            top_range: Some(top_range),
            std_range: Some(std_range),
            refinements,
            lines,
            success: !sink.has_errors(),
            error_count: sink.error_count(),
        }
    }
}

/// Appends every diagnostic to the `SourceLine` whose byte range in the
/// flattened buffer contains it, mirroring `flat_text`'s own `\n`-joined
/// offset accounting so the mapping back is exact.
fn distribute_diagnostics(lines: &mut LineChain, sink: &DiagnosticSink) {
    let mut starts = Vec::with_capacity(lines.lines().len());
    let mut offset = 0u32;
    for line in lines.lines() {
        starts.push(offset);
        offset += line.text.len() as u32 + 1; // +1 for the `\n` joiner
    }

    for diagnostic in sink.diagnostics() {
        let pos: u32 = diagnostic.range.start().into();
        let line_index = match starts.binary_search(&pos) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        if let Some(line) = lines.lines_mut().get_mut(line_index) {
            line.push_diagnostic(diagnostic.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoIncludes;
    impl FileResolver for NoIncludes {
        fn read(&self, _name: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn clean_program_reports_no_errors() {
        let mut program = Program::new(Config::default());
        let outcome = program.check("print((1, 2))", "t.a68", &NoIncludes);
        assert!(outcome.success, "{:?}", outcome.lines.lines().iter().flat_map(|l| &l.diagnostics).collect::<Vec<_>>());
        assert_eq!(outcome.error_count, 0);
    }

    #[test]
    fn bracket_mismatch_skips_parsing_entirely() {
        let mut program = Program::new(Config::default());
        let outcome = program.check("IF TRUE THEN print(1) OD", "t.a68", &NoIncludes);
        assert!(!outcome.success);
        assert!(outcome.tree.is_none());
    }

    #[test]
    fn undeclared_identifier_is_flagged_on_its_own_line() {
        let mut program = Program::new(Config::default());
        let outcome = program.check("INT x := y", "t.a68", &NoIncludes);
        assert!(!outcome.success);
        let has_diag = outcome.lines.lines().iter().any(|l| !l.diagnostics.is_empty());
        assert!(has_diag);
    }
}
