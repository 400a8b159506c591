//! WASM bindings for the interpy rewriter.
//!
//! Exposes `transform()` and `tokenize()` to JavaScript via wasm-bindgen.
//! Results are plain JS objects serialized with serde-wasm-bindgen.

use interpy_codec::Codec;
use interpy_core::{Diagnostic, Transformed};
use interpy_lexer::{LexerError, Token};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Result of transforming a unit, as seen from JavaScript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformView {
    pub output: String,
    pub changed: bool,
    pub diagnostics: Vec<DiagnosticView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticView {
    pub kind: &'static str,
    pub row: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenView {
    pub kind: &'static str,
    pub text: String,
    pub start: [usize; 2],
    pub end: [usize; 2],
}

impl From<&Diagnostic> for DiagnosticView {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            kind: diagnostic.kind.name(),
            row: diagnostic.position.row,
            column: diagnostic.position.col,
            message: diagnostic.message.clone(),
        }
    }
}

impl From<&Token> for TokenView {
    fn from(token: &Token) -> Self {
        Self {
            kind: token.kind.name(),
            text: token.text.clone(),
            start: [token.start.row, token.start.col],
            end: [token.end.row, token.end.col],
        }
    }
}

impl From<Transformed> for TransformView {
    fn from(result: Transformed) -> Self {
        Self {
            output: String::from_utf8_lossy(&result.output).into_owned(),
            changed: result.changed,
            diagnostics: result.diagnostics.iter().map(DiagnosticView::from).collect(),
        }
    }
}

fn transform_view(source: &str) -> TransformView {
    Codec::default().transform(source.as_bytes()).into()
}

fn token_views(source: &str, rewritten: bool) -> Result<Vec<TokenView>, LexerError> {
    let tokens = Codec::default().tokenize(source.as_bytes(), rewritten)?;
    Ok(tokens.iter().map(TokenView::from).collect())
}

/// Rewrite `#{}` interpolation in a Python unit.
///
/// Returns `{ output, changed, diagnostics: [{ kind, row, column, message }] }`.
/// A unit declaring `# coding: utf8-interpy` keeps its declaration.
#[wasm_bindgen]
pub fn transform(source: &str) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(&transform_view(source)).map_err(|e| JsError::new(&e.to_string()))
}

/// Tokenize a Python unit, optionally after the rewrite.
///
/// Returns `[{ kind, text, start: [row, col], end: [row, col] }]`.
/// Throws a JS error if the unit does not tokenize.
#[wasm_bindgen]
pub fn tokenize(source: &str, rewritten: bool) -> Result<JsValue, JsError> {
    let tokens = token_views(source, rewritten).map_err(|e| JsError::new(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&tokens).map_err(|e| JsError::new(&e.to_string()))
}

/// Get the rewriter version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
