//! Tokenizing a rewritten literal and placing its tokens where the literal
//! was.

use interpy_lexer::{LexerError, Position, Token, TokenKind};

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::host::HostTokenizer;

/// Replacement tokens for one literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub tokens: Vec<Token>,
    /// Columns gained on the literal's last row.
    pub column_delta: isize,
    /// `false` when the original literal was kept.
    pub rewritten: bool,
}

impl RewriteResult {
    /// The literal itself, unchanged.
    pub fn unchanged(literal: &Token) -> Self {
        Self {
            tokens: vec![literal.clone()],
            column_delta: 0,
            rewritten: false,
        }
    }
}

/// Why a rewritten literal could not be tokenized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetokenizeError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error("unexpected {text:?} at line {line}, column {column}")]
    ErrorToken {
        text: String,
        line: usize,
        column: usize,
    },
}

/// Tokenize `fragment` and remap it onto `literal`'s position.
pub fn try_retokenize(
    host: &dyn HostTokenizer,
    fragment: &str,
    literal: &Token,
) -> Result<RewriteResult, RetokenizeError> {
    let mut tokens = Vec::new();
    for token in host.tokenize(fragment.as_bytes())? {
        let token = token?;
        match token.kind {
            TokenKind::Encoding | TokenKind::EndMarker => {}
            TokenKind::ErrorToken => {
                return Err(RetokenizeError::ErrorToken {
                    text: token.text,
                    line: token.start.row,
                    column: token.start.col,
                });
            }
            _ => tokens.push(token),
        }
    }

    // A fragment has no line terminator of its own.
    if tokens
        .last()
        .is_some_and(|t| t.kind == TokenKind::Newline && t.text.is_empty())
    {
        tokens.pop();
    }

    for token in &mut tokens {
        token.start = remap(token.start, literal.start);
        token.end = remap(token.end, literal.start);
    }

    let column_delta = tokens.last().map_or(0, |last| {
        last.end.col as isize - literal.end.col as isize
    });

    Ok(RewriteResult {
        tokens,
        column_delta,
        rewritten: true,
    })
}

/// Like [`try_retokenize`], but keeps the original literal when the fragment
/// does not tokenize, recording why in `diagnostics`.
pub fn retokenize(
    host: &dyn HostTokenizer,
    fragment: &str,
    literal: &Token,
    diagnostics: &mut Vec<Diagnostic>,
) -> RewriteResult {
    match try_retokenize(host, fragment, literal) {
        Ok(result) => result,
        Err(err) => {
            let diagnostic = Diagnostic::new(
                DiagnosticKind::MalformedInterpolation,
                literal.start,
                format!("interpolation left as written: {err}"),
            );
            tracing::debug!(%diagnostic, "invalid markup inside string");
            diagnostics.push(diagnostic);
            RewriteResult::unchanged(literal)
        }
    }
}

/// Fragment rows start at 1; only the first row continues the literal's
/// first row, later rows keep their own columns.
fn remap(at: Position, origin: Position) -> Position {
    let col = if at.row == 1 { at.col + origin.col } else { at.col };
    Position::new(at.row - 1 + origin.row, col)
}
