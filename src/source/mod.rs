//! Source buffer & line chain.
//!
//! Reads a whole source buffer, folds backslash-continued lines, wraps the
//! result in a stropping-specific prelude/postlude so later phases always
//! see a single enclosing `BEGIN … END`, and splices `include`/`read`
//! pragmats in place while guarding against re-inclusion.

mod chain;
mod line;

pub use chain::{FileResolver, LineChain};
pub use line::{PrintStatus, SourceLine};
