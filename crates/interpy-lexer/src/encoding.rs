//! Source encoding declarations.
//!
//! A unit may start with a UTF-8 byte order mark and may declare its
//! encoding in a `coding[:=]name` comment on its first line, or on its
//! second line when the first is blank or a comment.

use crate::{LexerError, LexerErrorKind, Position};

const BOM_UTF8: &[u8] = b"\xEF\xBB\xBF";
const DEFAULT_ENCODING: &str = "utf-8";

/// The encoding a unit declares, and how much of the unit declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingDeclaration {
    /// Normalized encoding name; `utf-8-sig` when a BOM was found.
    pub encoding: String,
    /// The encoding name exactly as written in the cookie, if any.
    pub cookie: Option<String>,
    pub bom: bool,
    /// Length in bytes of the lines read while looking for a cookie,
    /// not counting the BOM.
    pub header_len: usize,
}

impl EncodingDeclaration {
    fn implicit(bom: bool, header_len: usize) -> Self {
        Self {
            encoding: if bom { "utf-8-sig" } else { DEFAULT_ENCODING }.to_string(),
            cookie: None,
            bom,
            header_len,
        }
    }

    pub fn bom_len(&self) -> usize {
        if self.bom {
            BOM_UTF8.len()
        } else {
            0
        }
    }
}

/// Detect the encoding of a unit from its BOM and encoding cookie.
pub fn detect_encoding(source: &[u8]) -> Result<EncodingDeclaration, LexerError> {
    let (bom, body) = match source.strip_prefix(BOM_UTF8) {
        Some(rest) => (true, rest),
        None => (false, source),
    };

    let mut lines = body.split_inclusive(|b| *b == b'\n');

    let Some(first) = lines.next() else {
        return Ok(EncodingDeclaration::implicit(bom, 0));
    };
    if let Some(cookie) = find_cookie(first, 1)? {
        return declared(cookie, bom, first.len(), 1);
    }
    if !is_blank(first) {
        return Ok(EncodingDeclaration::implicit(bom, first.len()));
    }

    let Some(second) = lines.next() else {
        return Ok(EncodingDeclaration::implicit(bom, first.len()));
    };
    let header_len = first.len() + second.len();
    match find_cookie(second, 2)? {
        Some(cookie) => declared(cookie, bom, header_len, 2),
        None => Ok(EncodingDeclaration::implicit(bom, header_len)),
    }
}

/// Decode a unit for scanning.
///
/// Returns the source text with any BOM removed, together with the
/// encoding name to report in the `ENCODING` token. The BOM has already
/// been stripped from the text, so a `utf-8-sig` unit reports `utf-8`.
/// Only UTF-8 and ASCII units can be decoded.
pub fn decode_source(source: &[u8]) -> Result<(&str, String), LexerError> {
    let declaration = detect_encoding(source)?;
    let body = &source[declaration.bom_len()..];

    match declaration.encoding.as_str() {
        "utf-8" | "utf-8-sig" => {}
        "ascii" | "us-ascii" => {
            if let Some(offset) = body.iter().position(|b| !b.is_ascii()) {
                return Err(invalid_utf8_at(body, offset));
            }
        }
        other => {
            return Err(LexerError::new(
                LexerErrorKind::UnsupportedEncoding(other.to_string()),
                Position::new(1, 0),
            ));
        }
    }

    let text = std::str::from_utf8(body).map_err(|e| invalid_utf8_at(body, e.valid_up_to()))?;
    let encoding = if declaration.bom {
        DEFAULT_ENCODING.to_string()
    } else {
        declaration.encoding
    };
    Ok((text, encoding))
}

fn declared(
    cookie: String,
    bom: bool,
    header_len: usize,
    row: usize,
) -> Result<EncodingDeclaration, LexerError> {
    let mut encoding = normal_name(&cookie);
    if bom {
        if encoding != DEFAULT_ENCODING {
            return Err(LexerError::new(
                LexerErrorKind::EncodingMismatch(cookie),
                Position::new(row, 0),
            ));
        }
        encoding = "utf-8-sig".to_string();
    }

    Ok(EncodingDeclaration {
        encoding,
        cookie: Some(cookie),
        bom,
        header_len,
    })
}

/// Find a `coding[:=]name` declaration in a comment line.
fn find_cookie(line: &[u8], row: usize) -> Result<Option<String>, LexerError> {
    let Ok(line) = std::str::from_utf8(line) else {
        return Err(LexerError::new(
            LexerErrorKind::InvalidUtf8,
            Position::new(row, 0),
        ));
    };

    let trimmed = line.trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\x0c'));
    let Some(mut rest) = trimmed.strip_prefix('#') else {
        return Ok(None);
    };

    while let Some(idx) = rest.find("coding") {
        let after = &rest[idx + "coding".len()..];
        if let Some(value) = after.strip_prefix(|c: char| c == ':' || c == '=') {
            let name: String = value
                .trim_start_matches(|c: char| c == ' ' || c == '\t')
                .chars()
                .take_while(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
                .collect();
            if !name.is_empty() {
                return Ok(Some(name));
            }
        }
        rest = after;
    }

    Ok(None)
}

fn is_blank(line: &[u8]) -> bool {
    let start = line
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t' | b'\x0c'))
        .unwrap_or(line.len());
    matches!(line.get(start), None | Some(b'#' | b'\r' | b'\n'))
}

/// Canonical spelling for the utf-8 and latin-1 families.
fn normal_name(name: &str) -> String {
    let enc = name
        .chars()
        .take(12)
        .collect::<String>()
        .to_lowercase()
        .replace('_', "-");

    if enc == "utf-8" || enc == "utf8" || enc.starts_with("utf-8-") {
        return DEFAULT_ENCODING.to_string();
    }

    let latin = ["latin-1", "iso-8859-1", "iso-latin-1"];
    if latin
        .iter()
        .any(|l| enc == *l || enc.starts_with(&format!("{l}-")))
    {
        return "iso-8859-1".to_string();
    }

    name.to_string()
}

fn invalid_utf8_at(body: &[u8], offset: usize) -> LexerError {
    let prefix = &body[..offset];
    let row = prefix.iter().filter(|b| **b == b'\n').count() + 1;
    let line_start = prefix
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);
    let col = String::from_utf8_lossy(&prefix[line_start..]).chars().count();
    LexerError::new(LexerErrorKind::InvalidUtf8, Position::new(row, col))
}
