//! Interpolation tag scanning.
//!
//! A tag opens with `#{` and closes at the `}` that brings the brace depth
//! back to zero. Offsets are character offsets into the literal's raw text,
//! delimiters included.

use std::ops::Range;

pub const OPEN_TAG: &str = "#{";
pub const CLOSE_TAG: char = '}';

/// One matched `#{ ... }` occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagSpan {
    /// Offset of the `#`.
    pub begin: usize,
    /// Offset just past the closing brace.
    pub end: usize,
}

impl TagSpan {
    pub const fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    /// Offsets of the expression between the braces.
    pub fn interior(self) -> Range<usize> {
        self.begin + OPEN_TAG.len()..self.end - 1
    }
}

/// Why an opened tag was given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unterminated {
    /// A line break came before the closing brace. Scanning resumes at the
    /// line break.
    LineBreak,
    /// The text ended before the closing brace. Scanning stops.
    EndOfText,
}

impl Unterminated {
    pub fn describe(self) -> &'static str {
        match self {
            Self::LineBreak => "no closing brace before the line break",
            Self::EndOfText => "no closing brace before the end of the literal",
        }
    }
}

/// An opening tag that never closed; its text stays literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbandonedTag {
    pub offset: usize,
    pub reason: Unterminated,
}

/// Result of scanning one literal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagScan {
    /// Matched spans, non-overlapping and in increasing order.
    pub spans: Vec<TagSpan>,
    pub abandoned: Vec<AbandonedTag>,
}

/// Find every interpolation tag in a literal's text.
///
/// Braces are counted without regard to quoting, so `#{#{x}}` is one span
/// whose interior is `#{x}`.
pub fn scan_tags(text: &[char]) -> TagScan {
    let mut scan = TagScan::default();
    let mut pos = 0;

    while let Some(begin) = find_open(text, pos) {
        let mut depth = 1usize;
        pos = begin + OPEN_TAG.len();

        while pos < text.len() {
            match text[pos] {
                '{' => depth += 1,
                CLOSE_TAG => {
                    depth -= 1;
                    if depth == 0 {
                        scan.spans.push(TagSpan::new(begin, pos + 1));
                        break;
                    }
                }
                '\n' => {
                    scan.abandoned.push(AbandonedTag {
                        offset: begin,
                        reason: Unterminated::LineBreak,
                    });
                    break;
                }
                _ => {}
            }
            pos += 1;
        }

        if pos >= text.len() {
            scan.abandoned.push(AbandonedTag {
                offset: begin,
                reason: Unterminated::EndOfText,
            });
            break;
        }
    }

    scan
}

fn find_open(text: &[char], from: usize) -> Option<usize> {
    (from..text.len().saturating_sub(1)).find(|&i| text[i] == '#' && text[i + 1] == '{')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(text: &str) -> TagScan {
        let chars: Vec<char> = text.chars().collect();
        scan_tags(&chars)
    }

    fn spans(text: &str) -> Vec<(usize, usize)> {
        scan(text).spans.iter().map(|s| (s.begin, s.end)).collect()
    }

    #[test]
    fn test_no_tags() {
        assert_eq!(scan("\"plain\""), TagScan::default());
    }

    #[test]
    fn test_single_tag() {
        assert_eq!(spans("\"pre#{var1}post\""), vec![(4, 11)]);
    }

    #[test]
    fn test_interior_range() {
        let span = TagSpan::new(4, 11);
        assert_eq!(span.interior(), 6..10);
    }

    #[test]
    fn test_multiple_tags() {
        assert_eq!(spans("\"#{a}#{b}\""), vec![(1, 5), (5, 9)]);
    }

    #[test]
    fn test_nested_braces_counted() {
        assert_eq!(spans("\"#{ {'k': 1}['k'] }\""), vec![(1, 19)]);
    }

    #[test]
    fn test_nested_tag_is_one_span() {
        assert_eq!(spans("\"#{#{var}}\""), vec![(1, 10)]);
    }

    #[test]
    fn test_lone_hash_and_brace_are_inert() {
        assert_eq!(spans("\"# {x} #x {y}\""), vec![]);
    }

    #[test]
    fn test_end_of_text_abandon() {
        let result = scan("\"#{\"");
        assert_eq!(result.spans, vec![]);
        assert_eq!(
            result.abandoned,
            vec![AbandonedTag {
                offset: 1,
                reason: Unterminated::EndOfText
            }]
        );
    }

    #[test]
    fn test_end_of_text_abandon_stops_scanning() {
        let result = scan("\"#{a}#{b");
        assert_eq!(result.spans, vec![TagSpan::new(1, 5)]);
        assert_eq!(result.abandoned.len(), 1);
        assert_eq!(result.abandoned[0].reason, Unterminated::EndOfText);
    }

    #[test]
    fn test_line_break_abandon() {
        let result = scan("\"\"\"#{\n}\"\"\"");
        assert_eq!(result.spans, vec![]);
        assert_eq!(
            result.abandoned,
            vec![AbandonedTag {
                offset: 3,
                reason: Unterminated::LineBreak
            }]
        );
    }

    #[test]
    fn test_line_break_abandon_resumes_scanning() {
        let result = scan("\"\"\"#{a\n#{b}\"\"\"");
        assert_eq!(result.spans, vec![TagSpan::new(7, 11)]);
        assert_eq!(result.abandoned[0].reason, Unterminated::LineBreak);
    }

    #[test]
    fn test_tags_across_lines() {
        assert_eq!(spans("\"\"\"#{a}\n#{b}\"\"\""), vec![(3, 7), (8, 12)]);
    }

    #[test]
    fn test_offsets_are_characters() {
        assert_eq!(spans("\"ü#{x}\""), vec![(2, 6)]);
    }
}
