//! Line chain construction: continuation folding, prelude/postlude, and
//! include/read pragmat splicing.

use rustc_hash::FxHashSet;
use tracing::instrument;

use crate::base::Stropping;

use super::line::SourceLine;

/// A read-only view a caller must supply to resolve `include`/`read`
/// pragmats; kept as a trait rather than a concrete filesystem type since
/// this crate has no opinion on where source files live — it reads whatever
/// buffers the embedder hands it.
pub trait FileResolver {
    /// Returns the contents of `name`, or `None` if it cannot be read.
    fn read(&self, name: &str) -> Option<String>;
}

/// A chain of [`SourceLine`]s, doubly linked in spirit but realized as a
/// `Vec` since nothing downstream needs to splice outside of construction
/// time; all splicing (refinements, includes) happens here, before the
/// vector is frozen.
#[derive(Debug, Default)]
pub struct LineChain {
    lines: Vec<SourceLine>,
}

impl LineChain {
    /// Build a chain from a single in-memory buffer: fold continuations,
    /// resolve include/read pragmats, and wrap in the stropping prelude and
    /// postlude.
    #[instrument(level = "debug", skip_all, name = "phase_a_source")]
    pub fn build(
        text: &str,
        filename: &str,
        stropping: Stropping,
        resolver: &dyn FileResolver,
    ) -> Self {
        let folded = fold_continuations(text);
        let mut lines = Vec::with_capacity(folded.len() + 2);
        lines.push(SourceLine::new(
            stropping.prelude().to_string(),
            filename,
            0,
        ));

        let mut already_included: FxHashSet<String> = FxHashSet::default();
        already_included.insert(normalize_name(filename));
        splice_includes(&folded, filename, resolver, &mut already_included, &mut lines);

        lines.push(SourceLine::new(
            stropping.postlude().to_string(),
            filename,
            folded.len() as u32 + 1,
        ));

        Self { lines }
    }

    /// Reconstruct a previously-saved source from a run-script header block:
    /// repeated `filename\nline_number\n<original line text>\n` records.
    pub fn from_run_script(script: &str) -> Self {
        let mut lines = Vec::new();
        let mut rest = script.lines();
        loop {
            let Some(filename) = rest.next() else { break };
            let Some(line_number) = rest.next() else { break };
            let Some(text) = rest.next() else { break };
            let line_number: u32 = line_number.trim().parse().unwrap_or(0);
            lines.push(SourceLine::new(text.to_string(), filename, line_number));
        }
        Self { lines }
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut [SourceLine] {
        &mut self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Concatenate every line's text with `\n` separators — the flat buffer
    /// the tokenizer scans over the whole chain at once, not line by line,
    /// since tokens and format texts can span lines.
    pub fn flat_text(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&line.text);
        }
        out
    }
}

/// Fold lines ending in `\` into the following line, working bottom-up so a
/// chain of several continued lines accretes correctly.
fn fold_continuations(text: &str) -> Vec<String> {
    let raw: Vec<&str> = text.split('\n').collect();
    let mut folded: Vec<String> = raw.iter().map(|s| s.to_string()).collect();

    let mut i = folded.len();
    while i > 0 {
        i -= 1;
        if i == 0 {
            break;
        }
        if let Some(stripped) = folded[i - 1].strip_suffix('\\') {
            let continuation = folded.remove(i);
            folded[i - 1] = format!("{stripped}{continuation}");
        }
    }
    folded
}

fn normalize_name(name: &str) -> String {
    name.trim().to_string()
}

/// Recognize `PR/PRAGMAT include "file" PR/PRAGMAT` and
/// `PR/PRAGMAT read "file" PR/PRAGMAT` pragmats at the start of a folded
/// line's (trimmed) text and splice the referenced file's lines in place,
/// preserving the including pragmat's line number for diagnostics. A file
/// already present in the chain is silently skipped to break recursion.
fn splice_includes(
    folded: &[String],
    filename: &str,
    resolver: &dyn FileResolver,
    already_included: &mut FxHashSet<String>,
    out: &mut Vec<SourceLine>,
) {
    for (i, text) in folded.iter().enumerate() {
        let line_number = i as u32 + 1;
        if let Some(target) = parse_include_pragmat(text) {
            let normalized = normalize_name(&target);
            if already_included.contains(&normalized) {
                out.push(SourceLine::new(text.clone(), filename, line_number));
                continue;
            }
            already_included.insert(normalized.clone());
            match resolver.read(&target) {
                Some(contents) => {
                    let nested = fold_continuations(&contents);
                    splice_includes(&nested, &target, resolver, already_included, out);
                }
                None => {
                    let mut line = SourceLine::new(text.clone(), filename, line_number);
                    line.push_diagnostic(crate::diag::Diagnostic::error(
                        crate::diag::ErrorCode::IncorrectFilename,
                        text_size::TextRange::empty(text_size::TextSize::from(0)),
                    ));
                    out.push(line);
                }
            }
        } else {
            out.push(SourceLine::new(text.clone(), filename, line_number));
        }
    }
}

fn parse_include_pragmat(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("PRAGMAT")
        .or_else(|| trimmed.strip_prefix("PR"))?
        .trim();
    let body = body
        .strip_prefix("include")
        .or_else(|| body.strip_prefix("read"))?
        .trim();
    let quote_start = body.find('"')?;
    let rest = &body[quote_start + 1..];
    let quote_end = rest.find('"')?;
    Some(rest[..quote_end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoFiles;
    impl FileResolver for NoFiles {
        fn read(&self, _name: &str) -> Option<String> {
            None
        }
    }

    struct MapResolver(std::collections::HashMap<&'static str, &'static str>);
    impl FileResolver for MapResolver {
        fn read(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|s| s.to_string())
        }
    }

    #[test]
    fn folds_single_continuation() {
        let folded = fold_continuations("INT i =\\\n1;");
        assert_eq!(folded, vec!["INT i =1;".to_string()]);
    }

    #[test]
    fn folds_multiple_continuations_bottom_up() {
        let folded = fold_continuations("a\\\nb\\\nc\nd");
        assert_eq!(folded, vec!["abc".to_string(), "d".to_string()]);
    }

    #[test]
    fn wraps_prelude_and_postlude() {
        let chain = LineChain::build("print(1)", "t.a68", Stropping::Upper, &NoFiles);
        assert_eq!(chain.lines().first().unwrap().text, "BEGIN ");
        assert_eq!(chain.lines().last().unwrap().text, " END");
    }

    #[test]
    fn splices_include_once() {
        let mut files = std::collections::HashMap::new();
        files.insert("lib.a68", "INT x = 1;");
        let resolver = MapResolver(files);
        let chain = LineChain::build(
            "PR include \"lib.a68\" PR\nprint(x)",
            "main.a68",
            Stropping::Upper,
            &resolver,
        );
        let flat = chain.flat_text();
        assert!(flat.contains("INT x = 1;"));
        assert!(flat.contains("print(x)"));
    }

    #[test]
    fn breaks_recursive_include() {
        let mut files = std::collections::HashMap::new();
        files.insert("a.a68", "PR include \"a.a68\" PR\nINT x = 1;");
        let resolver = MapResolver(files);
        // Should terminate rather than recurse forever.
        let chain = LineChain::build(
            "PR include \"a.a68\" PR",
            "main.a68",
            Stropping::Upper,
            &resolver,
        );
        assert!(chain.len() < 10);
    }

    #[test]
    fn missing_include_reports_diagnostic() {
        let chain = LineChain::build(
            "PR include \"missing.a68\" PR",
            "main.a68",
            Stropping::Upper,
            &NoFiles,
        );
        let has_diag = chain
            .lines()
            .iter()
            .any(|l| !l.diagnostics.is_empty());
        assert!(has_diag);
    }

    #[test]
    fn run_script_round_trip() {
        let script = "a.a68\n3\nINT i = 1;\na.a68\n4\nprint(i)\n";
        let chain = LineChain::from_run_script(script);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.lines()[0].line_number, 3);
        assert_eq!(chain.lines()[1].text, "print(i)");
    }
}
