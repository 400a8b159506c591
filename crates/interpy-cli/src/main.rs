use clap::{ArgAction, Parser, Subcommand};
use interpy_codec::Codec;
use interpy_core::{Diagnostic, PythonHost, RewriteOptions};
use interpy_lexer::{Dialect, LexerError};
use std::io::Write;
use std::path::Path;

#[derive(Parser)]
#[command(name = "interpy")]
#[command(about = "interpy: #{} string interpolation for Python source")]
#[command(version)]
struct Cli {
    /// Treat sources as Python 2 (stringify with `unicode`)
    #[arg(long, global = true)]
    python2: bool,

    /// Callable wrapped around each interpolated expression
    #[arg(long, global = true, value_name = "NAME")]
    stringify: Option<String>,

    /// Log more (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite a Python file and print or write the result
    Transform {
        /// Input .py file
        path: String,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Report interpolation problems without writing anything
    Check {
        /// Input .py file
        path: String,
    },

    /// Dump the token stream of a Python file
    Tokens {
        /// Input .py file
        path: String,

        /// Dump the tokens after the rewrite
        #[arg(long)]
        rewritten: bool,
    },
}

impl Cli {
    fn host(&self) -> PythonHost {
        if self.python2 {
            PythonHost::new(Dialect::Python2)
        } else {
            PythonHost::default()
        }
    }

    fn options(&self) -> RewriteOptions {
        match &self.stringify {
            Some(name) => RewriteOptions::new().with_stringify(name),
            None => RewriteOptions::new(),
        }
    }

    fn codec(&self) -> Codec {
        Codec::new(self.host(), self.options())
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Transform { path, output } => cmd_transform(&cli, path, output.as_deref()),
        Command::Check { path } => cmd_check(&cli, path),
        Command::Tokens { path, rewritten } => cmd_tokens(&cli, path, *rewritten),
    }
}

/// `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

fn read_source(path: &str) -> Vec<u8> {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_transform(cli: &Cli, path: &str, output: Option<&str>) {
    let source = read_source(path);
    let result = cli.codec().transform(&source);
    for line in diagnostic_lines(path, &result.diagnostics) {
        eprintln!("{line}");
    }

    match output {
        Some(out) => {
            if let Err(e) = std::fs::write(out, &result.output) {
                eprintln!("Error writing {out}: {e}");
                std::process::exit(1);
            }
            eprintln!("Wrote: {out}");
        }
        None => {
            if let Err(e) = std::io::stdout().write_all(&result.output) {
                eprintln!("Error writing output: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn cmd_check(cli: &Cli, path: &str) {
    let source = read_source(path);
    let result = cli.codec().transform(&source);

    if !result.diagnostics.is_empty() {
        for line in diagnostic_lines(path, &result.diagnostics) {
            eprintln!("{line}");
        }
        std::process::exit(1);
    }

    eprintln!("OK: {path}");
}

fn cmd_tokens(cli: &Cli, path: &str, rewritten: bool) {
    let source = read_source(path);

    match token_lines(&cli.codec(), &source, rewritten) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
        }
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    }
}

fn diagnostic_lines(path: &str, diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| format!("{path}:{d}")).collect()
}

fn token_lines(codec: &Codec, source: &[u8], rewritten: bool) -> Result<Vec<String>, LexerError> {
    let tokens = codec.tokenize(source, rewritten)?;
    Ok(tokens.iter().map(ToString::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpy_core::DiagnosticKind;
    use interpy_lexer::Position;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["interpy", "transform", "a.py", "--python2", "-vv"]);
        assert!(cli.python2);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.host().dialect, Dialect::Python2);
        assert!(matches!(
            cli.command,
            Command::Transform { ref path, output: None } if path == "a.py"
        ));
    }

    #[test]
    fn test_stringify_option() {
        let cli = parse(&["interpy", "--stringify", "repr", "check", "a.py"]);
        assert_eq!(cli.options().stringify.as_deref(), Some("repr"));
        let result = cli.codec().transform(b"x = \"#{a}\"\n");
        assert_eq!(result.output, b"x = (\"\"+repr(a)+\"\")\n".to_vec());
    }

    #[test]
    fn test_tokens_subcommand() {
        let cli = parse(&["interpy", "tokens", "--rewritten", "a.py"]);
        assert!(matches!(cli.command, Command::Tokens { rewritten: true, .. }));
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(0), "warn");
        assert_eq!(default_filter(1), "debug");
        assert_eq!(default_filter(5), "trace");
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logged_while_transforming(filter: &str, source: &[u8]) -> (String, usize) {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(move || writer.clone()).with_ansi(false))
            .with(EnvFilter::new(filter));
        let result = tracing::subscriber::with_default(subscriber, || {
            Codec::default().transform(source)
        });
        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        (log, result.diagnostics.len())
    }

    #[test]
    fn test_diagnostics_not_logged_at_default_level() {
        let (log, diagnostics) = logged_while_transforming(default_filter(0), b"x = \"#{#{v}}\"\n");
        assert_eq!(diagnostics, 1);
        assert_eq!(log, "");

        let (log, _) = logged_while_transforming(default_filter(0), b"x = (\"#{a}\"\n");
        assert_eq!(log, "");
    }

    #[test]
    fn test_diagnostics_logged_when_verbose() {
        let (log, diagnostics) = logged_while_transforming(default_filter(1), b"x = \"#{#{v}}\"\n");
        assert_eq!(diagnostics, 1);
        assert!(log.contains("invalid markup inside string"));
    }

    #[test]
    fn test_diagnostic_lines() {
        let diagnostics = vec![Diagnostic::new(
            DiagnosticKind::MalformedInterpolation,
            Position::new(3, 4),
            "interpolation left as written",
        )];
        assert_eq!(
            diagnostic_lines("a.py", &diagnostics),
            vec!["a.py:3:4: malformed-interpolation: interpolation left as written".to_string()]
        );
    }

    #[test]
    fn test_token_lines() {
        let lines = token_lines(&Codec::default(), b"x\n", false).unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("1,0-1,1:"));
        assert!(lines[1].contains("NAME"));
    }

    #[test]
    fn test_rewritten_token_lines() {
        let lines = token_lines(&Codec::default(), b"x = \"#{a}\"\n", true).unwrap();
        assert!(lines.iter().any(|l| l.contains("\"str\"")));
    }

    #[test]
    fn test_token_lines_below_cookie() {
        let source = b"# coding: utf8-interpy\nx = \"#{a}\"\n";
        let codec = Codec::default();

        let lines = token_lines(&codec, source, false).unwrap();
        assert!(lines[1].starts_with("1,0-1,22:"));
        assert!(lines[1].contains("COMMENT"));
        assert!(lines[3].starts_with("2,0-2,1:"));

        let lines = token_lines(&codec, source, true).unwrap();
        assert!(lines
            .iter()
            .any(|l| l.starts_with("2,8-2,11:") && l.contains("\"str\"")));
    }
}
