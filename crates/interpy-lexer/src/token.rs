use std::fmt;

/// A position in a source unit.
///
/// Rows are 1-based; row 0 is reserved for the `ENCODING` token.
/// Columns are 0-based character offsets within the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Shift the column by a signed amount, clamping at column 0.
    pub fn shifted(self, delta: isize) -> Self {
        Self {
            row: self.row,
            col: self.col.saturating_add_signed(delta),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// Token classification, mirroring the token types of Python's `tokenize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Source encoding, always the first token of a Python 3 byte stream.
    Encoding,
    Name,
    Number,
    /// String literal, text includes prefix and delimiters.
    String,
    Op,
    /// End of a logical line.
    Newline,
    /// Non-logical line break (blank line, comment line, inside brackets).
    Nl,
    Comment,
    Indent,
    Dedent,
    EndMarker,
    /// Character that cannot start any token.
    ErrorToken,
}

impl TokenKind {
    /// The conventional upper-case name (`NAME`, `STRING`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Encoding => "ENCODING",
            Self::Name => "NAME",
            Self::Number => "NUMBER",
            Self::String => "STRING",
            Self::Op => "OP",
            Self::Newline => "NEWLINE",
            Self::Nl => "NL",
            Self::Comment => "COMMENT",
            Self::Indent => "INDENT",
            Self::Dedent => "DEDENT",
            Self::EndMarker => "ENDMARKER",
            Self::ErrorToken => "ERRORTOKEN",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A token produced by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: Position,
    pub end: Position,
    /// The physical source line(s) the token was found on.
    pub line: String,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        start: Position,
        end: Position,
        line: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            end,
            line: line.into(),
        }
    }

    /// Whether the token spans more than one source row.
    pub fn is_multiline(&self) -> bool {
        self.start.row != self.end.row
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = format!("{}-{}:", self.start, self.end);
        write!(f, "{span:<20}{:<15}{:?}", self.kind.name(), self.text)
    }
}
