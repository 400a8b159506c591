//! The stream driver.
//!
//! Walks a unit's token stream once, replacing every interpolating literal
//! with its rewritten tokens and shifting the tokens that follow on the same
//! row so that positions stay consistent for untokenizing.

use std::collections::VecDeque;

use interpy_lexer::{LexerError, Position, Token, TokenKind};

use crate::config::RewriteOptions;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::host::{HostTokenizer, TokenStream};
use crate::literal::{rewrite_literal, QuoteStyle};
use crate::retokenize::{retokenize, RewriteResult};
use crate::tags::{scan_tags, AbandonedTag, TagSpan};

/// Per-unit driver state. Created with the driver and dropped with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    /// Row on which later tokens need shifting.
    pub last_interpolated_row: Option<usize>,
    /// Columns to shift tokens on `last_interpolated_row` by.
    pub pending_offset: isize,
    pub previous_kind: Option<TokenKind>,
    /// Kind of the last token that is not a comment or a non-logical line
    /// break.
    pub last_significant_kind: Option<TokenKind>,
    /// Whether the most recent string literal was replaced by a
    /// parenthesized expression.
    pub previous_literal_wrapped: bool,
}

impl StreamState {
    /// Whether a literal now would be implicitly concatenated with the
    /// previous one. Comments and blank lines between them do not count.
    fn follows_literal(&self) -> bool {
        self.last_significant_kind == Some(TokenKind::String)
    }

    fn offset_for(&mut self, row: usize) -> isize {
        if self.last_interpolated_row != Some(row) {
            self.pending_offset = 0;
        }
        self.pending_offset
    }

    fn record(&mut self, kind: TokenKind) {
        self.previous_kind = Some(kind);
        if !matches!(kind, TokenKind::Comment | TokenKind::Nl) {
            self.last_significant_kind = Some(kind);
        }
    }
}

/// Rewrites one unit's token stream, lazily.
///
/// Yields the corrected tokens in order. A lexer error from the underlying
/// stream is passed through and ends the usable output.
pub struct Preprocessor<'a> {
    host: &'a dyn HostTokenizer,
    stringify: String,
    tokens: TokenStream<'a>,
    state: StreamState,
    queue: VecDeque<Token>,
    diagnostics: Vec<Diagnostic>,
    changed: bool,
}

impl<'a> Preprocessor<'a> {
    pub fn new(
        host: &'a dyn HostTokenizer,
        source: &'a [u8],
        options: &RewriteOptions,
    ) -> Result<Self, LexerError> {
        Ok(Self {
            host,
            stringify: options.stringify_for(host).to_string(),
            tokens: host.tokenize(source)?,
            state: StreamState::default(),
            queue: VecDeque::new(),
            diagnostics: Vec::new(),
            changed: false,
        })
    }

    /// Whether any token has been rewritten or inserted so far.
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    fn process(&mut self, mut token: Token) {
        let multiline = token.is_multiline();
        let offset = self.state.offset_for(token.start.row);
        shift(&mut token, offset);

        let style = if token.kind == TokenKind::String {
            QuoteStyle::of(&token.text)
        } else {
            None
        };
        let eligible = style.is_some_and(|style| {
            style.is_interpolatable() && !self.is_docstring(&token, style)
        });

        let spans = if eligible {
            let chars: Vec<char> = token.text.chars().collect();
            let scan = scan_tags(&chars);
            for tag in &scan.abandoned {
                self.report_abandoned(&token, &chars, tag);
            }
            scan.spans
        } else {
            Vec::new()
        };
        let wraps = !spans.is_empty();

        let needs_plus = self.state.follows_literal()
            && (wraps || (token.kind == TokenKind::String && self.state.previous_literal_wrapped));
        if needs_plus {
            let at = token.start;
            self.queue.push_back(Token::new(
                TokenKind::Op,
                "+",
                at,
                at.shifted(1),
                token.line.clone(),
            ));
            shift(&mut token, 1);
            self.state.pending_offset += 1;
            self.changed = true;
        }

        self.state.record(token.kind);

        if !wraps {
            if needs_plus {
                self.state.last_interpolated_row = Some(token.end.row);
                if multiline {
                    self.state.pending_offset = 0;
                }
            }
            if token.kind == TokenKind::String {
                self.state.previous_literal_wrapped = false;
            }
            self.queue.push_back(token);
            return;
        }

        let result = self.rewrite(&token, &spans);
        if result.rewritten {
            self.changed = true;
            tracing::debug!(
                row = token.start.row,
                col = token.start.col,
                spans = spans.len(),
                delta = result.column_delta,
                "rewrote literal"
            );
        }

        self.state.last_interpolated_row = Some(token.end.row);
        if multiline {
            self.state.pending_offset = result.column_delta;
        } else {
            self.state.pending_offset += result.column_delta;
        }
        self.state.previous_literal_wrapped = result.rewritten;
        self.queue.extend(result.tokens);
    }

    fn rewrite(&mut self, token: &Token, spans: &[TagSpan]) -> RewriteResult {
        match rewrite_literal(&token.text, spans, &self.stringify) {
            Ok(fragment) => retokenize(self.host, &fragment, token, &mut self.diagnostics),
            Err(err) => {
                self.report(Diagnostic::new(
                    DiagnosticKind::MalformedInterpolation,
                    token.start,
                    err.to_string(),
                ));
                RewriteResult::unchanged(token)
            }
        }
    }

    /// A triple-quoted literal opening a block, or starting a row, documents
    /// something and keeps its text.
    fn is_docstring(&self, token: &Token, style: QuoteStyle) -> bool {
        style.delimiter().is_triple()
            && (self.state.previous_kind == Some(TokenKind::Indent) || token.start.col == 0)
    }

    fn report_abandoned(&mut self, token: &Token, chars: &[char], tag: &AbandonedTag) {
        let before = &chars[..tag.offset.min(chars.len())];
        let position = match before.iter().rposition(|&c| c == '\n') {
            Some(newline) => Position::new(
                token.start.row + before.iter().filter(|&&c| c == '\n').count(),
                tag.offset - newline - 1,
            ),
            None => Position::new(token.start.row, token.start.col + tag.offset),
        };

        self.report(Diagnostic::new(
            DiagnosticKind::UnterminatedTag(tag.reason),
            position,
            format!("interpolation tag has {}", tag.reason.describe()),
        ));
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, "interpolation tag left as written");
        self.diagnostics.push(diagnostic);
    }
}

impl Iterator for Preprocessor<'_> {
    type Item = Result<Token, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(Ok(token));
            }
            match self.tokens.next()? {
                Ok(token) => self.process(token),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Shift a token right; the end moves too unless the token ends on a later
/// row.
fn shift(token: &mut Token, delta: isize) {
    if delta == 0 {
        return;
    }
    token.start = token.start.shifted(delta);
    if !token.is_multiline() {
        token.end = token.end.shifted(delta);
    }
}
