use crate::host::HostTokenizer;

/// Options controlling how literals are rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Callable wrapped around each interpolated expression. Defaults to
    /// the host's text type (`str`, or `unicode` on Python 2).
    pub stringify: Option<String>,
}

impl RewriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stringify(mut self, name: impl Into<String>) -> Self {
        self.stringify = Some(name.into());
        self
    }

    /// The stringify callable to use with `host`.
    pub fn stringify_for<'a>(&'a self, host: &'a dyn HostTokenizer) -> &'a str {
        self.stringify
            .as_deref()
            .unwrap_or_else(|| host.text_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::PythonHost;
    use interpy_lexer::Dialect;

    #[test]
    fn test_stringify_defaults_to_host_text_type() {
        let options = RewriteOptions::new();
        assert_eq!(options.stringify_for(&PythonHost::default()), "str");
        assert_eq!(
            options.stringify_for(&PythonHost::new(Dialect::Python2)),
            "unicode"
        );
    }

    #[test]
    fn test_stringify_override() {
        let options = RewriteOptions::new().with_stringify("repr");
        assert_eq!(options.stringify_for(&PythonHost::default()), "repr");
    }
}
