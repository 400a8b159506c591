//! Literal classification and rewriting.

use crate::tags::{TagSpan, OPEN_TAG};

/// The quote characters delimiting a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    Single,
    Double,
    TripleSingle,
    TripleDouble,
}

impl Delimiter {
    pub fn quotes(self) -> &'static str {
        match self {
            Self::Single => "'",
            Self::Double => "\"",
            Self::TripleSingle => "'''",
            Self::TripleDouble => "\"\"\"",
        }
    }

    pub fn is_triple(self) -> bool {
        matches!(self, Self::TripleSingle | Self::TripleDouble)
    }
}

/// How a string literal is written.
///
/// Only plain double-quoted literals take part in interpolation; raw and
/// otherwise prefixed literals (`b`, `u`, `f`) pass through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteStyle {
    Plain(Delimiter),
    Raw(Delimiter),
    Prefixed(Delimiter),
}

impl QuoteStyle {
    /// Classify a `STRING` token's text. `None` if it is not a complete
    /// string literal.
    pub fn of(text: &str) -> Option<Self> {
        let body_start = text.find(|c: char| c == '\'' || c == '"')?;
        let (prefix, body) = text.split_at(body_start);

        let delimiter = [
            Delimiter::TripleDouble,
            Delimiter::TripleSingle,
            Delimiter::Double,
            Delimiter::Single,
        ]
        .into_iter()
        .find(|d| {
            let quotes = d.quotes();
            body.len() >= 2 * quotes.len() && body.starts_with(quotes) && body.ends_with(quotes)
        })?;

        Some(if prefix.is_empty() {
            Self::Plain(delimiter)
        } else if prefix.contains(|c: char| c == 'r' || c == 'R') {
            Self::Raw(delimiter)
        } else {
            Self::Prefixed(delimiter)
        })
    }

    pub fn delimiter(self) -> Delimiter {
        match self {
            Self::Plain(d) | Self::Raw(d) | Self::Prefixed(d) => d,
        }
    }

    pub fn is_interpolatable(self) -> bool {
        matches!(
            self,
            Self::Plain(Delimiter::Double | Delimiter::TripleDouble)
        )
    }
}

/// Error rewriting a literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    #[error("not a double-quoted literal: {0}")]
    NotDoubleQuoted(String),
    #[error("tag span {begin}..{end} does not fit the literal")]
    SpanOutOfRange { begin: usize, end: usize },
}

/// Rewrite a double-quoted literal into a parenthesized concatenation.
///
/// Each span is replaced by closing the string, appending
/// `+stringify(<interior>)+` and reopening the string with the same
/// quotes: `"pre#{x}post"` becomes `("pre"+str(x)+"post")`.
pub fn rewrite_literal(
    text: &str,
    spans: &[TagSpan],
    stringify: &str,
) -> Result<String, RewriteError> {
    let chars: Vec<char> = text.chars().collect();
    let triple = Delimiter::TripleDouble.quotes();
    let single = Delimiter::Double.quotes();

    let quotes = if chars.len() >= 7 && text.starts_with(triple) && text.ends_with(triple) {
        triple
    } else if chars.len() >= 2 && text.starts_with(single) && text.ends_with(single) {
        single
    } else {
        return Err(RewriteError::NotDoubleQuoted(text.to_string()));
    };

    let mut out = String::with_capacity(text.len() + spans.len() * (stringify.len() + 8) + 2);
    out.push('(');

    let mut pos = 0;
    for span in spans {
        if span.begin < pos || span.end > chars.len() || span.end < span.begin + OPEN_TAG.len() + 1
        {
            return Err(RewriteError::SpanOutOfRange {
                begin: span.begin,
                end: span.end,
            });
        }
        out.extend(&chars[pos..span.begin]);
        out.push_str(quotes);
        out.push('+');
        out.push_str(stringify);
        out.push('(');
        out.extend(&chars[span.interior()]);
        out.push_str(")+");
        out.push_str(quotes);
        pos = span.end;
    }
    out.extend(&chars[pos..]);
    out.push(')');

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::scan_tags;
    use pretty_assertions::assert_eq;

    fn rewrite(text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let scan = scan_tags(&chars);
        rewrite_literal(text, &scan.spans, "str").unwrap()
    }

    // ========================================================================
    // Quote styles
    // ========================================================================

    #[test]
    fn test_quote_style_plain() {
        assert_eq!(
            QuoteStyle::of("\"a\""),
            Some(QuoteStyle::Plain(Delimiter::Double))
        );
        assert_eq!(
            QuoteStyle::of("'a'"),
            Some(QuoteStyle::Plain(Delimiter::Single))
        );
        assert_eq!(
            QuoteStyle::of("\"\"\"a\"\"\""),
            Some(QuoteStyle::Plain(Delimiter::TripleDouble))
        );
        assert_eq!(
            QuoteStyle::of("'''a'''"),
            Some(QuoteStyle::Plain(Delimiter::TripleSingle))
        );
    }

    #[test]
    fn test_quote_style_empty_literals() {
        assert_eq!(
            QuoteStyle::of("\"\""),
            Some(QuoteStyle::Plain(Delimiter::Double))
        );
        assert_eq!(
            QuoteStyle::of("\"\"\"\"\"\""),
            Some(QuoteStyle::Plain(Delimiter::TripleDouble))
        );
    }

    #[test]
    fn test_quote_style_prefixes() {
        assert_eq!(
            QuoteStyle::of("r\"a\""),
            Some(QuoteStyle::Raw(Delimiter::Double))
        );
        assert_eq!(
            QuoteStyle::of("Rb'''a'''"),
            Some(QuoteStyle::Raw(Delimiter::TripleSingle))
        );
        assert_eq!(
            QuoteStyle::of("f\"a\""),
            Some(QuoteStyle::Prefixed(Delimiter::Double))
        );
        assert_eq!(
            QuoteStyle::of("u\"a\""),
            Some(QuoteStyle::Prefixed(Delimiter::Double))
        );
    }

    #[test]
    fn test_quote_style_rejects_non_literals() {
        assert_eq!(QuoteStyle::of("abc"), None);
        assert_eq!(QuoteStyle::of("\"abc"), None);
    }

    #[test]
    fn test_only_plain_double_is_interpolatable() {
        assert!(QuoteStyle::Plain(Delimiter::Double).is_interpolatable());
        assert!(QuoteStyle::Plain(Delimiter::TripleDouble).is_interpolatable());
        assert!(!QuoteStyle::Plain(Delimiter::Single).is_interpolatable());
        assert!(!QuoteStyle::Plain(Delimiter::TripleSingle).is_interpolatable());
        assert!(!QuoteStyle::Raw(Delimiter::Double).is_interpolatable());
        assert!(!QuoteStyle::Prefixed(Delimiter::TripleDouble).is_interpolatable());
    }

    // ========================================================================
    // Rewriting
    // ========================================================================

    #[test]
    fn test_rewrite_single_tag() {
        assert_eq!(rewrite("\"pre#{var1}post\""), "(\"pre\"+str(var1)+\"post\")");
    }

    #[test]
    fn test_rewrite_tag_only() {
        assert_eq!(rewrite("\"#{a}\""), "(\"\"+str(a)+\"\")");
    }

    #[test]
    fn test_rewrite_adjacent_tags() {
        assert_eq!(
            rewrite("\"#{a}#{b}\""),
            "(\"\"+str(a)+\"\"+str(b)+\"\")"
        );
    }

    #[test]
    fn test_rewrite_without_spans_only_wraps() {
        assert_eq!(rewrite("\"plain\""), "(\"plain\")");
    }

    #[test]
    fn test_rewrite_triple_quoted() {
        assert_eq!(
            rewrite("\"\"\"#{a}\n#{b}\"\"\""),
            "(\"\"\"\"\"\"+str(a)+\"\"\"\n\"\"\"+str(b)+\"\"\"\"\"\")"
        );
    }

    #[test]
    fn test_rewrite_keeps_interior_verbatim() {
        assert_eq!(
            rewrite("\"#{ d['k'] }\""),
            "(\"\"+str( d['k'] )+\"\")"
        );
    }

    #[test]
    fn test_rewrite_custom_stringify() {
        let chars: Vec<char> = "\"#{a}\"".chars().collect();
        let spans = scan_tags(&chars).spans;
        assert_eq!(
            rewrite_literal("\"#{a}\"", &spans, "unicode").unwrap(),
            "(\"\"+unicode(a)+\"\")"
        );
    }

    #[test]
    fn test_rewrite_rejects_single_quotes() {
        assert_eq!(
            rewrite_literal("'#{a}'", &[TagSpan::new(1, 5)], "str"),
            Err(RewriteError::NotDoubleQuoted("'#{a}'".to_string()))
        );
    }

    #[test]
    fn test_rewrite_rejects_bad_span() {
        assert_eq!(
            rewrite_literal("\"#{a}\"", &[TagSpan::new(1, 40)], "str"),
            Err(RewriteError::SpanOutOfRange { begin: 1, end: 40 })
        );
    }
}
