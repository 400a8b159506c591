use std::collections::VecDeque;

use crate::encoding::decode_source;
use crate::token::{Position, Token, TokenKind};
use crate::{Dialect, LexerError, LexerErrorKind};

const TAB_SIZE: usize = 8;

/// Python source scanner.
///
/// Produces the same token stream as Python's `tokenize` module, one
/// physical line at a time:
/// - Stack-based indentation tracking with 8-column tab stops
/// - Bracket depth decides between `NEWLINE` and `NL`
/// - Triple-quoted and backslash-continued strings span lines
/// - Characters that start no token become `ERRORTOKEN`s
///
/// The scanner is an iterator; a lexer error ends the stream after every
/// token scanned before it has been yielded.
pub struct Scanner<'a> {
    lines: std::str::SplitInclusive<'a, char>,
    dialect: Dialect,
    queue: VecDeque<Token>,
    line: &'a str,
    last_line: &'a str,
    lnum: usize,
    parenlev: isize,
    continued: bool,
    indents: Vec<usize>,
    contstr: Option<ContinuedString>,
    error: Option<LexerError>,
    done: bool,
}

/// A string literal whose closing quote has not been reached yet.
struct ContinuedString {
    text: String,
    start: Position,
    quote: char,
    triple: bool,
    line: String,
    /// Single-quoted strings only continue across a trailing backslash.
    needs_backslash: bool,
}

/// Which alternative of the pseudo-token grammar matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pseudo {
    EndOfLine,
    LineContinuation,
    Comment,
    TripleQuote(char),
    Number,
    LineBreak,
    Operator,
    Quoted,
    Word,
}

impl<'a> Scanner<'a> {
    /// Create a scanner over already decoded source text.
    ///
    /// No `ENCODING` token is produced.
    pub fn new(source: &'a str, dialect: Dialect) -> Self {
        Self {
            lines: source.split_inclusive('\n'),
            dialect,
            queue: VecDeque::new(),
            line: "",
            last_line: "",
            lnum: 0,
            parenlev: 0,
            continued: false,
            indents: vec![0],
            contstr: None,
            error: None,
            done: false,
        }
    }

    /// Create a scanner over a source unit's bytes.
    ///
    /// The encoding is detected first; Python 3 streams then start with an
    /// `ENCODING` token at (0, 0).
    pub fn from_bytes(source: &'a [u8], dialect: Dialect) -> Result<Self, LexerError> {
        let (text, encoding) = decode_source(source)?;
        let mut scanner = Self::new(text, dialect);
        if dialect.emits_encoding_token() {
            let origin = Position::new(0, 0);
            scanner
                .queue
                .push_back(Token::new(TokenKind::Encoding, encoding, origin, origin, ""));
        }
        Ok(scanner)
    }

    /// Tokenize decoded source text into a vector of tokens.
    pub fn tokenize(source: &str, dialect: Dialect) -> Result<Vec<Token>, LexerError> {
        Scanner::new(source, dialect).collect()
    }

    /// Read the next physical line and queue its tokens.
    fn scan_line(&mut self) -> Result<(), LexerError> {
        self.last_line = self.line;
        self.line = self.lines.next().unwrap_or("");
        self.lnum += 1;

        let line: Vec<char> = self.line.chars().collect();
        let mut pos = 0;

        if let Some(mut cont) = self.contstr.take() {
            if line.is_empty() {
                return Err(LexerError::new(LexerErrorKind::EofInString, cont.start));
            }

            match find_closing(&line, 0, cont.quote, cont.triple) {
                Some(end) => {
                    cont.text.extend(&line[..end]);
                    cont.line.push_str(self.line);
                    self.emit(
                        TokenKind::String,
                        cont.text,
                        cont.start,
                        Position::new(self.lnum, end),
                        cont.line,
                    );
                    pos = end;
                }
                None if cont.needs_backslash
                    && !self.line.ends_with("\\\n")
                    && !self.line.ends_with("\\\r\n") =>
                {
                    cont.text.push_str(self.line);
                    self.emit(
                        TokenKind::ErrorToken,
                        cont.text,
                        cont.start,
                        Position::new(self.lnum, line.len()),
                        cont.line,
                    );
                    return Ok(());
                }
                None => {
                    cont.text.push_str(self.line);
                    cont.line.push_str(self.line);
                    self.contstr = Some(cont);
                    return Ok(());
                }
            }
        } else if self.parenlev == 0 && !self.continued {
            if line.is_empty() {
                self.finish();
                return Ok(());
            }

            let mut column = 0;
            while pos < line.len() {
                match line[pos] {
                    ' ' => column += 1,
                    '\t' => column = (column / TAB_SIZE + 1) * TAB_SIZE,
                    '\x0c' => column = 0,
                    _ => break,
                }
                pos += 1;
            }
            if pos == line.len() {
                self.finish();
                return Ok(());
            }

            if matches!(line[pos], '#' | '\r' | '\n') {
                if line[pos] == '#' {
                    let mut end = line.len();
                    while end > pos && matches!(line[end - 1], '\r' | '\n') {
                        end -= 1;
                    }
                    self.emit_span(TokenKind::Comment, &line, pos, end);
                    pos = end;
                }
                self.emit_span(TokenKind::Nl, &line, pos, line.len());
                return Ok(());
            }

            if column > self.current_indent() {
                self.indents.push(column);
                self.emit_span(TokenKind::Indent, &line, 0, pos);
            }
            while column < self.current_indent() {
                if !self.indents.contains(&column) {
                    return Err(LexerError::new(
                        LexerErrorKind::Dedent,
                        Position::new(self.lnum, pos),
                    ));
                }
                self.indents.pop();
                self.emit_span(TokenKind::Dedent, &line, pos, pos);
            }
        } else {
            if line.is_empty() {
                return Err(LexerError::new(
                    LexerErrorKind::EofInStatement,
                    Position::new(self.lnum, 0),
                ));
            }
            self.continued = false;
        }

        while pos < line.len() {
            let mut start = pos;
            while start < line.len() && matches!(line[start], ' ' | '\t' | '\x0c') {
                start += 1;
            }

            let Some((pseudo, end)) = self.pseudo_token(&line, start) else {
                self.emit_span(TokenKind::ErrorToken, &line, pos, pos + 1);
                pos += 1;
                continue;
            };
            pos = end;

            match pseudo {
                Pseudo::EndOfLine => {}
                Pseudo::LineContinuation => self.continued = true,
                Pseudo::Comment => self.emit_span(TokenKind::Comment, &line, start, end),
                Pseudo::Number => self.emit_span(TokenKind::Number, &line, start, end),
                Pseudo::LineBreak => {
                    let kind = if self.parenlev > 0 {
                        TokenKind::Nl
                    } else {
                        TokenKind::Newline
                    };
                    self.emit_span(kind, &line, start, end);
                }
                Pseudo::Operator => {
                    match line[start] {
                        '(' | '[' | '{' => self.parenlev += 1,
                        ')' | ']' | '}' => self.parenlev -= 1,
                        _ => {}
                    }
                    self.emit_span(TokenKind::Op, &line, start, end);
                }
                Pseudo::TripleQuote(quote) => match find_closing(&line, end, quote, true) {
                    Some(close) => {
                        self.emit_span(TokenKind::String, &line, start, close);
                        pos = close;
                    }
                    None => {
                        self.contstr = Some(self.continued_string(&line, start, quote, true));
                        break;
                    }
                },
                Pseudo::Quoted => {
                    if line[end - 1] == '\n' {
                        let quote = line[start..]
                            .iter()
                            .copied()
                            .find(|c| matches!(c, '\'' | '"'))
                            .unwrap_or('"');
                        self.contstr = Some(self.continued_string(&line, start, quote, false));
                        break;
                    }
                    self.emit_span(TokenKind::String, &line, start, end);
                }
                Pseudo::Word => {
                    let kind = if is_identifier_start(line[start]) {
                        TokenKind::Name
                    } else {
                        TokenKind::Op
                    };
                    self.emit_span(kind, &line, start, end);
                }
            }
        }

        Ok(())
    }

    /// Match the pseudo-token grammar at `start`, returning what matched and
    /// where it ends.
    fn pseudo_token(&self, line: &[char], start: usize) -> Option<(Pseudo, usize)> {
        let Some(&c) = line.get(start) else {
            return Some((Pseudo::EndOfLine, start));
        };

        if c == '\\' {
            match (line.get(start + 1), line.get(start + 2)) {
                (Some('\n'), _) => return Some((Pseudo::LineContinuation, start + 2)),
                (Some('\r'), Some('\n')) => return Some((Pseudo::LineContinuation, start + 3)),
                _ => {}
            }
        }

        if c == '#' {
            let end = (start..line.len())
                .find(|&i| matches!(line[i], '\r' | '\n'))
                .unwrap_or(line.len());
            return Some((Pseudo::Comment, end));
        }

        let prefix = self.string_prefix_len(line, start);
        if let Some(prefix) = prefix {
            let open = start + prefix;
            let quote = line[open];
            if line.get(open + 1) == Some(&quote) && line.get(open + 2) == Some(&quote) {
                return Some((Pseudo::TripleQuote(quote), open + 3));
            }
        }

        if let Some(len) = self.number_len(line, start) {
            return Some((Pseudo::Number, start + len));
        }

        match (c, line.get(start + 1)) {
            ('\n', _) => return Some((Pseudo::LineBreak, start + 1)),
            ('\r', Some('\n')) => return Some((Pseudo::LineBreak, start + 2)),
            _ => {}
        }

        if let Some(len) = self.dialect.operator_len(line, start) {
            return Some((Pseudo::Operator, start + len));
        }

        if let Some(end) = prefix.and_then(|prefix| quoted_end(line, start + prefix)) {
            return Some((Pseudo::Quoted, end));
        }

        if is_word(c) {
            let end = (start..line.len())
                .find(|&i| !is_word(line[i]))
                .unwrap_or(line.len());
            return Some((Pseudo::Word, end));
        }

        None
    }

    /// Length of a string prefix at `start` that is directly followed by a
    /// quote, if there is one. The empty prefix counts.
    fn string_prefix_len(&self, line: &[char], start: usize) -> Option<usize> {
        let len = line[start..]
            .iter()
            .take_while(|c| c.is_ascii_alphabetic())
            .count();
        let quote = line.get(start + len)?;
        if !matches!(quote, '\'' | '"') {
            return None;
        }

        let prefix: String = line[start..start + len].iter().collect();
        self.dialect.is_string_prefix(&prefix).then_some(len)
    }

    /// Length of a numeric literal at `start`.
    ///
    /// Alternatives are tried in order (imaginary, float, integer) and the
    /// first that matches wins, not the longest.
    fn number_len(&self, line: &[char], start: usize) -> Option<usize> {
        let is_imaginary = |i: usize| matches!(line.get(i), Some('j' | 'J'));

        let digits = digit_run(line, start, |c| c.is_ascii_digit());
        if digits > 0 && is_imaginary(start + digits) {
            return Some(digits + 1);
        }

        if let Some(len) = float_len(line, start) {
            return Some(if is_imaginary(start + len) { len + 1 } else { len });
        }

        let len = self.int_len(line, start)?;
        if line
            .get(start + len)
            .is_some_and(|&c| self.dialect.is_long_suffix(c))
        {
            return Some(len + 1);
        }
        Some(len)
    }

    fn int_len(&self, line: &[char], start: usize) -> Option<usize> {
        let first = *line.get(start)?;

        if first == '0' {
            let radix = match line.get(start + 1) {
                Some('x' | 'X') => Some(16),
                Some('b' | 'B') => Some(2),
                Some('o' | 'O') => Some(8),
                _ => None,
            };
            if let Some(radix) = radix {
                let len = underscored_run(line, start + 2, |c| c.is_digit(radix));
                if len > 0 {
                    return Some(2 + len);
                }
            }

            if self.dialect == Dialect::Python2 {
                let octal = line[start + 1..]
                    .iter()
                    .take_while(|c| matches!(c, '0'..='7'))
                    .count();
                return Some(1 + octal);
            }
            return Some(1 + underscored_run(line, start + 1, |c| c == '0'));
        }

        if matches!(first, '1'..='9') {
            return Some(1 + underscored_run(line, start + 1, |c| c.is_ascii_digit()));
        }

        None
    }

    fn continued_string(
        &self,
        line: &[char],
        start: usize,
        quote: char,
        triple: bool,
    ) -> ContinuedString {
        ContinuedString {
            text: line[start..].iter().collect(),
            start: Position::new(self.lnum, start),
            quote,
            triple,
            line: self.line.to_string(),
            needs_backslash: !triple,
        }
    }

    /// Queue the trailing tokens once the source is exhausted.
    fn finish(&mut self) {
        let last = self.last_line;
        if !last.is_empty()
            && !last.ends_with(|c: char| c == '\r' || c == '\n')
            && !last.trim().starts_with('#')
        {
            let len = last.chars().count();
            self.emit(
                TokenKind::Newline,
                String::new(),
                Position::new(self.lnum - 1, len),
                Position::new(self.lnum - 1, len + 1),
                String::new(),
            );
        }

        let at = Position::new(self.lnum, 0);
        for _ in 1..self.indents.len() {
            self.emit(TokenKind::Dedent, String::new(), at, at, String::new());
        }
        self.emit(TokenKind::EndMarker, String::new(), at, at, String::new());
        self.done = true;
    }

    // --- Helpers ---

    fn current_indent(&self) -> usize {
        self.indents.last().copied().unwrap_or(0)
    }

    fn emit(
        &mut self,
        kind: TokenKind,
        text: String,
        start: Position,
        end: Position,
        line: String,
    ) {
        self.queue.push_back(Token::new(kind, text, start, end, line));
    }

    /// Queue a token covering `line[start..end]` on the current row.
    fn emit_span(&mut self, kind: TokenKind, line: &[char], start: usize, end: usize) {
        let text: String = line[start..end].iter().collect();
        self.emit(
            kind,
            text,
            Position::new(self.lnum, start),
            Position::new(self.lnum, end),
            self.line.to_string(),
        );
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(Ok(token));
            }
            if let Some(error) = self.error.take() {
                return Some(Err(error));
            }
            if self.done {
                return None;
            }
            if let Err(error) = self.scan_line() {
                self.error = Some(error);
                self.done = true;
            }
        }
    }
}

/// Find the end of a string body starting at `from`, up to and including
/// the closing delimiter. A backslash before the line break means the body
/// continues on the next line, so there is no match on this one.
fn find_closing(line: &[char], from: usize, quote: char, triple: bool) -> Option<usize> {
    let mut i = from;
    while let Some(&c) = line.get(i) {
        if c == '\\' {
            match line.get(i + 1) {
                Some(&next) if next != '\n' => i += 2,
                _ => return None,
            }
        } else if c == quote {
            if !triple {
                return Some(i + 1);
            }
            if line.get(i + 1) == Some(&quote) && line.get(i + 2) == Some(&quote) {
                return Some(i + 3);
            }
            i += 1;
        } else {
            i += 1;
        }
    }
    None
}

/// End of a single-quoted string opened at `open`, or of its first line if
/// it is continued with a trailing backslash.
fn quoted_end(line: &[char], open: usize) -> Option<usize> {
    let quote = line[open];
    let mut i = open + 1;
    loop {
        match *line.get(i)? {
            '\n' => return None,
            '\\' => match (line.get(i + 1), line.get(i + 2)) {
                (None, _) => return None,
                (Some('\n'), _) => return Some(i + 2),
                (Some('\r'), Some('\n')) => return Some(i + 3),
                _ => i += 2,
            },
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
}

/// `(?:_?d)*`
fn underscored_run(line: &[char], start: usize, is_digit: impl Fn(char) -> bool) -> usize {
    let mut i = start;
    loop {
        match (line.get(i), line.get(i + 1)) {
            (Some(&c), _) if is_digit(c) => i += 1,
            (Some('_'), Some(&c)) if is_digit(c) => i += 2,
            _ => return i - start,
        }
    }
}

/// `d(?:_?d)*`
fn digit_run(line: &[char], start: usize, is_digit: impl Fn(char) -> bool) -> usize {
    match line.get(start) {
        Some(&c) if is_digit(c) => 1 + underscored_run(line, start + 1, is_digit),
        _ => 0,
    }
}

fn exponent_len(line: &[char], start: usize) -> usize {
    if !matches!(line.get(start), Some('e' | 'E')) {
        return 0;
    }
    let sign = usize::from(matches!(line.get(start + 1), Some('+' | '-')));
    let digits = digit_run(line, start + 1 + sign, |c| c.is_ascii_digit());
    if digits == 0 {
        0
    } else {
        1 + sign + digits
    }
}

fn float_len(line: &[char], start: usize) -> Option<usize> {
    let is_digit = |c: char| c.is_ascii_digit();
    let digits = digit_run(line, start, is_digit);

    if digits > 0 && line.get(start + digits) == Some(&'.') {
        let mut len = digits + 1;
        len += digit_run(line, start + len, is_digit);
        len += exponent_len(line, start + len);
        return Some(len);
    }

    if digits == 0 && line.get(start) == Some(&'.') {
        let fraction = digit_run(line, start + 1, is_digit);
        if fraction > 0 {
            let len = 1 + fraction;
            return Some(len + exponent_len(line, start + len));
        }
        return None;
    }

    let exponent = exponent_len(line, start + digits);
    (digits > 0 && exponent > 0).then_some(digits + exponent)
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}
