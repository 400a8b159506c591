//! Host language versions.
//!
//! The tokenizer surface differs slightly between Python 2 and Python 3:
//! which string prefixes exist, a handful of operators, whether a byte
//! stream starts with an `ENCODING` token, and the name of the canonical
//! text conversion callable. Everything version-specific is answered here
//! so the scanner and the rewriter never branch on versions themselves.

/// Python language version the scanner emulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    Python2,
    #[default]
    Python3,
}

const OPERATORS_3: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];

const OPERATORS_2: &[&str] = &[
    "!=", "%=", "&=", "**", "*=", "+=", "-=", "->", "//", "/=", ":=", "<<", "<=", "==", ">=",
    ">>", "@=", "^=", "|=",
];

const OPERATORS_1: &str = "%&()*+,-./:;<=>@[]^{|}~";

impl Dialect {
    /// Whether tokenizing a byte stream yields a leading `ENCODING` token.
    pub fn emits_encoding_token(self) -> bool {
        matches!(self, Self::Python3)
    }

    /// Name of the builtin converting any value to text.
    pub fn text_type(self) -> &'static str {
        match self {
            Self::Python2 => "unicode",
            Self::Python3 => "str",
        }
    }

    /// Check whether `prefix` may precede a string literal's opening quote.
    pub fn is_string_prefix(self, prefix: &str) -> bool {
        let lower = prefix.to_ascii_lowercase();
        match self {
            Self::Python2 => matches!(lower.as_str(), "" | "b" | "r" | "u" | "ur" | "br"),
            Self::Python3 => matches!(
                lower.as_str(),
                "" | "b" | "r" | "u" | "f" | "br" | "rb" | "fr" | "rf"
            ),
        }
    }

    /// Length of the operator starting at `chars[start]`, longest match first.
    pub fn operator_len(self, chars: &[char], start: usize) -> Option<usize> {
        let rest = &chars[start..];
        let starts_with =
            |op: &str| rest.len() >= op.len() && op.chars().zip(rest).all(|(a, b)| a == *b);

        if OPERATORS_3.iter().any(|op| starts_with(op)) {
            return Some(3);
        }
        if OPERATORS_2.iter().any(|op| starts_with(op)) {
            return Some(2);
        }
        if self == Self::Python2 && starts_with("<>") {
            return Some(2);
        }

        let first = *rest.first()?;
        if OPERATORS_1.contains(first) || (self == Self::Python2 && first == '`') {
            Some(1)
        } else {
            None
        }
    }

    /// Whether `c` may terminate an integer literal (Python 2 long suffix).
    pub fn is_long_suffix(self, c: char) -> bool {
        self == Self::Python2 && matches!(c, 'l' | 'L')
    }
}
