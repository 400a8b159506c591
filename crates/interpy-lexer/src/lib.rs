//! interpy Lexer
//!
//! Tokenizes Python source units into a stream of positioned tokens and
//! renders token streams back into source bytes. Positions follow the
//! conventions of Python's own `tokenize` module: rows are 1-based,
//! columns are 0-based character offsets within a row.
//!
//! # Example
//!
//! ```
//! use interpy_lexer::{Dialect, Scanner, TokenKind};
//!
//! let tokens = Scanner::tokenize("x = 1\n", Dialect::Python3).unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::Name);
//! assert_eq!(tokens.last().unwrap().kind, TokenKind::EndMarker);
//! ```

pub mod dialect;
pub mod encoding;
pub mod scanner;
pub mod token;
pub mod untokenize;

pub use dialect::Dialect;
pub use encoding::{decode_source, detect_encoding, EncodingDeclaration};
pub use scanner::Scanner;
pub use token::{Position, Token, TokenKind};
pub use untokenize::{untokenize, UntokenizeError};

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexerErrorKind {
    #[error("EOF in multi-line string")]
    EofInString,
    #[error("EOF in multi-line statement")]
    EofInStatement,
    #[error("unindent does not match any outer indentation level")]
    Dedent,
    #[error("source is not valid UTF-8")]
    InvalidUtf8,
    #[error("unsupported source encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("encoding problem: {0} with BOM")]
    EncodingMismatch(String),
}

/// Lexer error with position information.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Lexer error at line {line}, column {column}: {kind}")]
pub struct LexerError {
    pub kind: LexerErrorKind,
    pub line: usize,
    pub column: usize,
}

impl LexerError {
    pub fn new(kind: LexerErrorKind, at: Position) -> Self {
        Self {
            kind,
            line: at.row,
            column: at.col,
        }
    }
}
