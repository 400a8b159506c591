//! Rendering token streams back into source bytes.
//!
//! Tokens are laid out at their recorded positions: the gap between one
//! token's end and the next token's start is filled with spaces on the same
//! row, or with backslash continuations when rows are skipped. A stream
//! produced by the scanner renders back to the exact source it came from.

use crate::token::{Token, TokenKind};

/// Error rendering a token stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UntokenizeError {
    #[error("start ({row},{col}) precedes previous end ({prev_row},{prev_col})")]
    OutOfOrder {
        row: usize,
        col: usize,
        prev_row: usize,
        prev_col: usize,
    },
    #[error("cannot encode output as {0}")]
    UnsupportedEncoding(String),
}

#[derive(Default)]
struct Untokenizer {
    out: String,
    prev_row: usize,
    prev_col: usize,
    encoding: Option<String>,
}

impl Untokenizer {
    fn add_whitespace(&mut self, token: &Token) -> Result<(), UntokenizeError> {
        let (row, col) = (token.start.row, token.start.col);
        if row < self.prev_row || (row == self.prev_row && col < self.prev_col) {
            return Err(UntokenizeError::OutOfOrder {
                row,
                col,
                prev_row: self.prev_row,
                prev_col: self.prev_col,
            });
        }

        let row_offset = row - self.prev_row;
        if row_offset > 0 {
            self.out.push_str(&"\\\n".repeat(row_offset));
            self.prev_col = 0;
        }
        if col > self.prev_col {
            self.out.push_str(&" ".repeat(col - self.prev_col));
        }
        Ok(())
    }

    fn render<'t>(
        mut self,
        tokens: impl IntoIterator<Item = &'t Token>,
    ) -> Result<Vec<u8>, UntokenizeError> {
        let mut indents: Vec<&str> = Vec::new();
        let mut startline = false;

        for token in tokens {
            match token.kind {
                TokenKind::Encoding => {
                    self.encoding = Some(token.text.clone());
                    continue;
                }
                TokenKind::EndMarker => break,
                TokenKind::Indent => {
                    indents.push(&token.text);
                    continue;
                }
                TokenKind::Dedent => {
                    indents.pop();
                    self.prev_row = token.end.row;
                    self.prev_col = token.end.col;
                    continue;
                }
                TokenKind::Newline | TokenKind::Nl => startline = true,
                _ => {
                    if let (true, Some(indent)) = (startline, indents.last()) {
                        let width = indent.chars().count();
                        if token.start.col >= width {
                            self.out.push_str(indent);
                            self.prev_col = width;
                        }
                        startline = false;
                    }
                }
            }

            self.add_whitespace(token)?;
            self.out.push_str(&token.text);
            self.prev_row = token.end.row;
            self.prev_col = token.end.col;
            if matches!(token.kind, TokenKind::Newline | TokenKind::Nl) {
                self.prev_row += 1;
                self.prev_col = 0;
            }
        }

        encode(self.out, self.encoding.as_deref())
    }
}

fn encode(text: String, encoding: Option<&str>) -> Result<Vec<u8>, UntokenizeError> {
    match encoding.map(str::to_ascii_lowercase).as_deref() {
        None | Some("utf-8" | "utf8") => Ok(text.into_bytes()),
        Some("utf-8-sig") => {
            let mut out = b"\xEF\xBB\xBF".to_vec();
            out.extend_from_slice(text.as_bytes());
            Ok(out)
        }
        Some("ascii" | "us-ascii") if text.is_ascii() => Ok(text.into_bytes()),
        Some(other) => Err(UntokenizeError::UnsupportedEncoding(other.to_string())),
    }
}

/// Render a token stream as source bytes.
///
/// A leading `ENCODING` token selects the output encoding (UTF-8 when
/// absent); rendering stops at `ENDMARKER`.
pub fn untokenize<'t>(
    tokens: impl IntoIterator<Item = &'t Token>,
) -> Result<Vec<u8>, UntokenizeError> {
    Untokenizer {
        prev_row: 1,
        ..Untokenizer::default()
    }
    .render(tokens)
}
