use text_size::TextRange;

use super::codes::ErrorCode;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
    SyntaxError,
}

impl Severity {
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error | Severity::SyntaxError)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::SyntaxError => "syntax error",
        }
    }
}

/// A lightweight, tree-independent handle to the node a diagnostic is
/// anchored to. `tree::NodeId` converts into this via `From` so `diag` does
/// not need to depend on `tree` (which instead depends on `diag`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub u32);

/// A single diagnostic, attached to the source line it was raised against.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub range: TextRange,
    pub node: Option<NodeRef>,
    /// Interpolated mode/attribute names, kept alongside `message` for
    /// listing collaborators that want to re-render with different wording.
    pub args: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: ErrorCode, range: TextRange) -> Self {
        Self {
            severity,
            code,
            message: code.default_message().to_string(),
            range,
            node: None,
            args: Vec::new(),
        }
    }

    pub fn error(code: ErrorCode, range: TextRange) -> Self {
        Self::new(Severity::Error, code, range)
    }

    pub fn warning(code: ErrorCode, range: TextRange) -> Self {
        Self::new(Severity::Warning, code, range)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_node(mut self, node: impl Into<NodeRef>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}
