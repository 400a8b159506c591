use std::fmt;

use interpy_lexer::Position;

use crate::tags::Unterminated;

/// Classifies a non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// An opening tag without a closing brace; the tag text stays literal.
    UnterminatedTag(Unterminated),
    /// A rewritten literal did not tokenize; the literal stays as written.
    MalformedInterpolation,
    /// The whole unit could not be processed; it is returned unchanged.
    TransformFailed,
}

impl DiagnosticKind {
    /// Short kebab-case name, stable for machine consumption.
    pub fn name(self) -> &'static str {
        match self {
            Self::UnterminatedTag(_) => "unterminated-tag",
            Self::MalformedInterpolation => "malformed-interpolation",
            Self::TransformFailed => "transform-failed",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A problem found while rewriting that did not stop the rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, position: Position, message: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            message: message.into(),
        }
    }

    /// Move the diagnostic down by `rows`, for units processed without
    /// their leading lines.
    pub fn offset_rows(mut self, rows: usize) -> Self {
        self.position.row += rows;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.position.row, self.position.col, self.kind, self.message
        )
    }
}
