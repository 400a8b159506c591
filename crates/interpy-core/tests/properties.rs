//! Property-based tests with proptest.
//!
//! Generate small Python units around string literals and check what the
//! rewriter may and may not touch.

use interpy_core::{preprocess, transform, HostTokenizer, PythonHost, RewriteOptions};
use interpy_lexer::{Position, Token, TokenKind};
use proptest::prelude::*;

// -- Leaf strategies --

/// Identifier usable as an interpolated expression.
fn identifier() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,8}"
}

/// Literal body with no quotes, backslashes or tag markup.
fn plain_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:;_-]{0,16}"
}

/// Literal body containing one interpolation tag.
fn tagged_text() -> impl Strategy<Value = (String, String, String)> {
    (plain_text(), identifier(), plain_text())
}

/// A double-quoted literal with zero, one or two tags.
fn literal() -> impl Strategy<Value = String> {
    prop_oneof![
        plain_text().prop_map(|body| format!("\"{body}\"")),
        tagged_text().prop_map(|(pre, name, post)| format!("\"{pre}#{{{name}}}{post}\"")),
        (tagged_text(), identifier(), plain_text()).prop_map(|((pre, a, mid), b, post)| {
            format!("\"{pre}#{{{a}}}{mid}#{{{b}}}{post}\"")
        }),
    ]
}

/// One statement using literals in the shapes that move later tokens.
fn statement() -> impl Strategy<Value = String> {
    (literal(), literal(), 0..5u8).prop_map(|(first, second, shape)| match shape {
        0 => format!("x = {first}\n"),
        1 => format!("f({first}, {second})\n"),
        2 => format!("s = {first} {second}\n"),
        3 => format!("s = ({first}  # note\n     {second})\n"),
        _ => format!("s = {first} + y\n"),
    })
}

/// Printable ASCII without `#`, so no tag can form.
fn tagless_source() -> impl Strategy<Value = String> {
    "[ -\"$-~\n\t]{0,80}"
}

fn spans(tokens: &[Token]) -> Vec<(TokenKind, String, Position, Position)> {
    tokens
        .iter()
        .map(|t| (t.kind, t.text.clone(), t.start, t.end))
        .collect()
}

proptest! {
    /// A literal without tags comes back byte for byte.
    #[test]
    fn plain_literal_unchanged(body in plain_text()) {
        let source = format!("x = \"{body}\"\n");
        let result = transform(source.as_bytes());
        prop_assert!(!result.changed);
        prop_assert_eq!(result.output, source.into_bytes());
    }

    /// Arbitrary tag-free input is returned unchanged, including input the
    /// tokenizer rejects.
    #[test]
    fn tagless_source_unchanged(source in tagless_source()) {
        let result = transform(source.as_bytes());
        prop_assert!(!result.changed);
        prop_assert_eq!(result.output, source.into_bytes());
    }

    /// Single-quoted and raw literals are never interpolated.
    #[test]
    fn non_interpolating_literals_unchanged(
        (pre, name, post) in tagged_text(),
        open in prop_oneof![Just("'"), Just("r\""), Just("b\""), Just("f\"")],
    ) {
        let close = if open == "'" { "'" } else { "\"" };
        let source = format!("x = {open}{pre}#{{{name}}}{post}{close}\n");
        let result = transform(source.as_bytes());
        prop_assert!(!result.changed);
        prop_assert_eq!(result.output, source.into_bytes());
    }

    /// Docstrings keep their tags.
    #[test]
    fn docstrings_unchanged((pre, name, post) in tagged_text(), indented in any::<bool>()) {
        let source = if indented {
            format!("def f():\n    \"\"\"{pre}#{{{name}}}{post}\"\"\"\n")
        } else {
            format!("\"\"\"{pre}#{{{name}}}{post}\"\"\"\nx = 1\n")
        };
        let result = transform(source.as_bytes());
        prop_assert!(!result.changed);
        prop_assert_eq!(result.output, source.into_bytes());
    }

    /// One tag becomes a parenthesized concatenation around `str(...)`.
    #[test]
    fn single_tag_rewritten((pre, name, post) in tagged_text()) {
        let source = format!("x = \"{pre}#{{{name}}}{post}\"\n");
        let result = transform(source.as_bytes());
        prop_assert!(result.changed);
        prop_assert!(result.diagnostics.is_empty());

        let output = String::from_utf8(result.output)
            .map_err(|e| TestCaseError::fail(std::format!("output is not UTF-8: {e}")))?;
        prop_assert_eq!(output, format!("x = (\"{pre}\"+str({name})+\"{post}\")\n"));
    }

    /// Rewriting is idempotent: the output has no tags left.
    #[test]
    fn rewrite_idempotent((pre, name, post) in tagged_text()) {
        let source = format!("y = f(\"{pre}#{{{name}}}{post}\", 1)\n");
        let first = transform(source.as_bytes());
        let second = transform(&first.output);
        prop_assert!(!second.changed);
        prop_assert_eq!(second.output, first.output);
    }

    /// The rewritten stream carries the positions its own output tokenizes
    /// to.
    #[test]
    fn positions_match_rescanned_output(statements in prop::collection::vec(statement(), 1..4)) {
        let source = statements.concat();
        let host = PythonHost::default();
        let (tokens, _, diagnostics) = preprocess(source.as_bytes(), &host, &RewriteOptions::default())
            .map_err(|e| TestCaseError::fail(std::format!("source does not tokenize: {e}")))?;
        prop_assert!(diagnostics.is_empty());

        let output = transform(source.as_bytes()).output;
        let rescanned = host
            .tokenize(&output)
            .and_then(|stream| stream.collect::<Result<Vec<_>, _>>())
            .map_err(|e| TestCaseError::fail(std::format!("output does not tokenize: {e}")))?;
        prop_assert_eq!(spans(&tokens), spans(&rescanned));
    }
}
