//! Diagnostic sink.
//!
//! Every phase reports through a [`DiagnosticSink`]. Diagnostics are
//! attached to the owning [`crate::source::SourceLine`] (not collected in
//! one flat list) so a listing collaborator can interleave them in line
//! order.

mod codes;
mod diagnostic;
mod sink;

pub use codes::ErrorCode;
pub use diagnostic::{Diagnostic, Severity};
pub use sink::{DiagnosticSink, PhaseOutcome};
