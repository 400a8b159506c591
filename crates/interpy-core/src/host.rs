//! The host language's tokenizer, seen through the three capabilities the
//! rewriter needs.

use interpy_lexer::{
    Dialect, EncodingDeclaration, LexerError, Scanner, Token, UntokenizeError,
};

/// A lazily produced token stream borrowing its source.
pub type TokenStream<'s> = Box<dyn Iterator<Item = Result<Token, LexerError>> + 's>;

/// Tokenizer capabilities of a host language version.
pub trait HostTokenizer {
    /// Tokenize a complete source unit.
    fn tokenize<'s>(&self, source: &'s [u8]) -> Result<TokenStream<'s>, LexerError>;

    /// Render tokens back into source bytes.
    fn untokenize(&self, tokens: &[Token]) -> Result<Vec<u8>, UntokenizeError>;

    /// Read the encoding a unit declares.
    fn detect_encoding(&self, source: &[u8]) -> Result<EncodingDeclaration, LexerError>;

    /// Name of the callable converting any value to text.
    fn text_type(&self) -> &str;
}

/// Python, through the bundled scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PythonHost {
    pub dialect: Dialect,
}

impl PythonHost {
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }
}

impl HostTokenizer for PythonHost {
    fn tokenize<'s>(&self, source: &'s [u8]) -> Result<TokenStream<'s>, LexerError> {
        Ok(Box::new(Scanner::from_bytes(source, self.dialect)?))
    }

    fn untokenize(&self, tokens: &[Token]) -> Result<Vec<u8>, UntokenizeError> {
        interpy_lexer::untokenize(tokens)
    }

    fn detect_encoding(&self, source: &[u8]) -> Result<EncodingDeclaration, LexerError> {
        interpy_lexer::detect_encoding(source)
    }

    fn text_type(&self) -> &str {
        self.dialect.text_type()
    }
}
