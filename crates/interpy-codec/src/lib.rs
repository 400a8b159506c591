//! interpy Codec
//!
//! The `utf8-interpy` source encoding. A unit declaring
//!
//! ```text
//! # coding: utf8-interpy
//! ```
//!
//! is decoded as UTF-8 after the interpolation rewrite has been applied to
//! it. Encoding is plain UTF-8.
//!
//! The rewrite has to tokenize the unit, and tokenizing a unit that names
//! this encoding would recurse into decoding it. The declaring header lines
//! are therefore cut off before the rewrite and put back afterwards.

use std::io::{self, BufRead, Cursor, Read};

use interpy_core::{HostTokenizer, PythonHost, RewriteOptions, Transformed};
use interpy_lexer::{LexerError, LexerErrorKind, Position, Scanner, Token, TokenKind};

pub const ENCODING_NAME: &str = "utf8-interpy";
pub const ENCODING_ALIASES: &[&str] = &["utf8_interpy", "utf8interpy"];
pub const BASE_ENCODING: &str = "utf-8";

/// Whether `name` refers to this encoding.
pub fn is_interpy_encoding(name: &str) -> bool {
    std::iter::once(ENCODING_NAME)
        .chain(ENCODING_ALIASES.iter().copied())
        .any(|known| known.eq_ignore_ascii_case(name))
}

/// How undecodable bytes are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorMode {
    #[default]
    Strict,
    /// Substitute U+FFFD for each invalid sequence.
    Replace,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("'utf-8' codec can't decode byte 0x{byte:02x} in position {offset}")]
    InvalidUtf8 { offset: usize, byte: u8 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The `utf8-interpy` codec.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    host: PythonHost,
    options: RewriteOptions,
}

impl Codec {
    pub fn new(host: PythonHost, options: RewriteOptions) -> Self {
        Self { host, options }
    }

    /// Resolve an encoding name to this codec.
    pub fn lookup(name: &str) -> Option<Self> {
        is_interpy_encoding(name).then(Self::default)
    }

    pub fn name(&self) -> &'static str {
        ENCODING_NAME
    }

    /// Apply the rewrite to a whole unit, honoring its encoding declaration.
    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    pub fn transform(&self, source: &[u8]) -> Transformed {
        let declaration = match self.host.detect_encoding(source) {
            Ok(declaration) => declaration,
            Err(err) => {
                tracing::debug!(%err, "encoding detection failed");
                return self.transform_unit(source);
            }
        };

        if !is_interpy_encoding(&declaration.encoding) {
            return self.transform_unit(source);
        }

        let (header, body) = source.split_at(declaration.bom_len() + declaration.header_len);
        let rows = header.iter().filter(|b| **b == b'\n').count();
        tracing::debug!(rows, "transforming below the encoding declaration");

        let result = self.transform_unit(body);
        let mut output = header.to_vec();
        output.extend_from_slice(&result.output);

        Transformed {
            output,
            changed: result.changed,
            diagnostics: result
                .diagnostics
                .into_iter()
                .map(|d| d.offset_rows(rows))
                .collect(),
        }
    }

    fn transform_unit(&self, source: &[u8]) -> Transformed {
        interpy_core::transform_with(source, &self.host, &self.options)
    }

    /// Tokenize a whole unit, before or after the rewrite.
    ///
    /// A unit declaring this encoding is tokenized below its declaration;
    /// the header lines come back as their comment and line break tokens,
    /// and every other token keeps its row within the full unit.
    pub fn tokenize(&self, source: &[u8], rewritten: bool) -> Result<Vec<Token>, LexerError> {
        let declaration = self.host.detect_encoding(source)?;
        if !is_interpy_encoding(&declaration.encoding) {
            return self.tokenize_unit(source, rewritten);
        }

        let split = declaration.bom_len() + declaration.header_len;
        let header = std::str::from_utf8(&source[declaration.bom_len()..split])
            .map_err(|_| LexerError::new(LexerErrorKind::InvalidUtf8, Position::new(1, 0)))?;
        let rows = header.matches('\n').count();

        let mut body = self
            .tokenize_unit(&source[split..], rewritten)
            .map_err(|mut err| {
                err.line += rows;
                err
            })?
            .into_iter()
            .peekable();
        let mut tokens = Vec::new();
        while let Some(token) = body.next_if(|t| t.kind == TokenKind::Encoding) {
            tokens.push(token);
        }
        for token in Scanner::new(header, self.host.dialect) {
            let token = token?;
            if matches!(token.kind, TokenKind::Comment | TokenKind::Nl) {
                tokens.push(token);
            }
        }
        tokens.extend(body.map(|mut token| {
            token.start = Position::new(token.start.row + rows, token.start.col);
            token.end = Position::new(token.end.row + rows, token.end.col);
            token
        }));
        Ok(tokens)
    }

    fn tokenize_unit(&self, source: &[u8], rewritten: bool) -> Result<Vec<Token>, LexerError> {
        if rewritten {
            Ok(interpy_core::preprocess(source, &self.host, &self.options)?.0)
        } else {
            self.host.tokenize(source)?.collect()
        }
    }

    /// Rewrite and decode a complete unit.
    pub fn decode(&self, input: &[u8], errors: ErrorMode) -> Result<String, CodecError> {
        decode_utf8(self.transform(input).output, errors)
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        text.as_bytes().to_vec()
    }

    pub fn incremental_decoder(&self, errors: ErrorMode) -> IncrementalDecoder {
        IncrementalDecoder {
            codec: self.clone(),
            errors,
            buffer: Vec::new(),
        }
    }

    /// Read `reader` to the end and serve its decoded rewrite.
    pub fn stream_reader<R: Read>(
        &self,
        mut reader: R,
        errors: ErrorMode,
    ) -> Result<StreamReader, CodecError> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        let text = self.decode(&input, errors)?;
        Ok(StreamReader {
            inner: Cursor::new(text.into_bytes()),
        })
    }
}

fn decode_utf8(bytes: Vec<u8>, errors: ErrorMode) -> Result<String, CodecError> {
    match errors {
        ErrorMode::Replace => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        ErrorMode::Strict => String::from_utf8(bytes).map_err(|e| {
            let offset = e.utf8_error().valid_up_to();
            CodecError::InvalidUtf8 {
                offset,
                byte: e.as_bytes().get(offset).copied().unwrap_or_default(),
            }
        }),
    }
}

/// Decoder fed in chunks.
///
/// A unit can only be tokenized whole, so nothing is produced until the
/// final chunk arrives.
#[derive(Debug, Clone)]
pub struct IncrementalDecoder {
    codec: Codec,
    errors: ErrorMode,
    buffer: Vec<u8>,
}

impl IncrementalDecoder {
    pub fn decode(&mut self, input: &[u8], is_final: bool) -> Result<String, CodecError> {
        self.buffer.extend_from_slice(input);
        if !is_final {
            return Ok(String::new());
        }
        let unit = std::mem::take(&mut self.buffer);
        self.codec.decode(&unit, self.errors)
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Reader over the decoded rewrite of a whole stream.
#[derive(Debug, Clone)]
pub struct StreamReader {
    inner: Cursor<Vec<u8>>,
}

impl Read for StreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for StreamReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
    }
}
