//! interpy Core
//!
//! Expands `#{expr}` interpolation inside double-quoted Python string
//! literals by rewriting the token stream of a source unit:
//!
//! ```text
//! x = "pre#{var1}post"   →   x = ("pre"+str(var1)+"post")
//! ```
//!
//! The pipeline per literal is tag scanning (`tags`), rewriting into a
//! concatenation expression (`literal`), re-tokenizing that expression at the
//! literal's position (`retokenize`); the stream driver (`driver`) walks the
//! unit and splices the results in. Rewriting never fails a unit: malformed
//! markup is left as written and reported as a [`Diagnostic`].
//!
//! # Example
//!
//! ```
//! let result = interpy_core::transform(b"x = \"pre#{var1}post\"\n");
//! assert_eq!(result.output, b"x = (\"pre\"+str(var1)+\"post\")\n");
//! assert!(result.changed);
//! ```

pub mod config;
pub mod diagnostic;
pub mod driver;
pub mod host;
pub mod literal;
pub mod retokenize;
pub mod tags;

pub use config::RewriteOptions;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use driver::{Preprocessor, StreamState};
pub use host::{HostTokenizer, PythonHost, TokenStream};
pub use literal::{rewrite_literal, Delimiter, QuoteStyle, RewriteError};
pub use retokenize::{retokenize, try_retokenize, RetokenizeError, RewriteResult};
pub use tags::{scan_tags, AbandonedTag, TagScan, TagSpan, Unterminated};

use interpy_lexer::{LexerError, Position, Token, UntokenizeError};

/// The outcome of transforming one source unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub output: Vec<u8>,
    /// `false` when `output` is the input, byte for byte.
    pub changed: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl Transformed {
    fn unchanged(source: &[u8], diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            output: source.to_vec(),
            changed: false,
            diagnostics,
        }
    }
}

/// A failure of the whole pass, as opposed to one literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Untokenize(#[from] UntokenizeError),
}

impl TransformError {
    /// Where in the unit the failure was detected.
    pub fn position(&self) -> Position {
        match self {
            Self::Lexer(err) => Position::new(err.line, err.column),
            Self::Untokenize(UntokenizeError::OutOfOrder { row, col, .. }) => {
                Position::new(*row, *col)
            }
            Self::Untokenize(UntokenizeError::UnsupportedEncoding(_)) => Position::default(),
        }
    }
}

/// Run the stream driver over a whole unit, collecting its tokens.
pub fn preprocess(
    source: &[u8],
    host: &dyn HostTokenizer,
    options: &RewriteOptions,
) -> Result<(Vec<Token>, bool, Vec<Diagnostic>), LexerError> {
    let mut preprocessor = Preprocessor::new(host, source, options)?;
    let tokens = preprocessor.by_ref().collect::<Result<Vec<_>, _>>()?;
    let changed = preprocessor.changed();
    Ok((tokens, changed, preprocessor.into_diagnostics()))
}

/// Transform a unit, reporting a failure of the whole pass as an error.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn try_transform(
    source: &[u8],
    host: &dyn HostTokenizer,
    options: &RewriteOptions,
) -> Result<Transformed, TransformError> {
    let (tokens, changed, diagnostics) = preprocess(source, host, options)?;
    if !changed {
        return Ok(Transformed::unchanged(source, diagnostics));
    }

    Ok(Transformed {
        output: host.untokenize(&tokens)?,
        changed,
        diagnostics,
    })
}

/// Transform a unit with the given host and options.
///
/// Never fails: when the unit cannot be processed at all the input is
/// returned unchanged with a [`DiagnosticKind::TransformFailed`] diagnostic.
pub fn transform_with(
    source: &[u8],
    host: &dyn HostTokenizer,
    options: &RewriteOptions,
) -> Transformed {
    match try_transform(source, host, options) {
        Ok(transformed) => transformed,
        Err(err) => {
            tracing::debug!(%err, "interpolation pass failed, unit left unchanged");
            let diagnostic = Diagnostic::new(
                DiagnosticKind::TransformFailed,
                err.position(),
                err.to_string(),
            );
            Transformed::unchanged(source, vec![diagnostic])
        }
    }
}

/// Transform a Python 3 unit with default options.
pub fn transform(source: &[u8]) -> Transformed {
    transform_with(source, &PythonHost::default(), &RewriteOptions::default())
}
