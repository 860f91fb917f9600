// Error reporting for the btrc transpiler.
// Every compile-time failure (lexer, parser, resolver) goes through
// Diagnostic so the CLI prints one consistent caret-style message.

use colored::Colorize;
use std::fmt;

/// Source code location (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Build a span from a byte offset into `source`.
    pub fn from_offset(file: &str, source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(pos) => before.len() - pos,
            None => before.len() + 1,
        };
        Self {
            file: file.to_string(),
            line,
            column,
        }
    }

    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Level::Error => write!(f, "{}", "error".red().bold()),
            Level::Warning => write!(f, "{}", "warning".yellow().bold()),
            Level::Note => write!(f, "{}", "note".cyan().bold()),
        }
    }
}

/// A single compiler message with location and optional help line.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            span,
            help: None,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render with source context:
    ///
    /// ```text
    /// error: <message>
    ///   --> <file>:<line>:<col>
    ///    |
    ///  42 |     <source line>
    ///    |     ^
    /// ```
    pub fn render(&self, source: &str) -> String {
        let mut out = format!("{}: {}\n", self.level, self.message);

        let line = self.span.line;
        let lines: Vec<&str> = source.split('\n').collect();
        if line < 1 || line > lines.len() {
            out.push_str(&format!(" --> {}\n", self.span));
            return out;
        }

        let source_line = lines[line - 1];
        let width = line.to_string().len();
        let pad = " ".repeat(width);
        let caret_offset = self.span.column.saturating_sub(1);
        let caret = format!("{}^", " ".repeat(caret_offset));

        out.push_str(&format!(" {}{} {}\n", pad, "-->".cyan().bold(), self.span));
        out.push_str(&format!(" {} |\n", pad));
        out.push_str(&format!(" {} | {}\n", line, source_line));
        out.push_str(&format!(" {} | {}\n", pad, caret));

        if let Some(help) = &self.help {
            out.push_str(&format!(" {} = {}: {}\n", pad, "help".green().bold(), help));
        }

        out
    }
}

/// Find the candidate most similar to `name`, for "did you mean" help.
/// Returns None when nothing is close enough to be useful.
pub fn closest_match<'a, I>(name: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, f64)> = None;
    for cand in candidates {
        let score = strsim::jaro_winkler(name, cand);
        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((cand, score));
        }
    }
    match best {
        Some((cand, score)) if score >= 0.8 => Some(cand),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_from_offset() {
        let source = "int x;\nint y;\nint z;";
        let span = Span::from_offset("test.btrc", source, 7);
        assert_eq!(span.line, 2);
        assert_eq!(span.column, 1);

        let span = Span::from_offset("test.btrc", source, 11);
        assert_eq!(span.line, 2);
        assert_eq!(span.column, 5);
    }

    #[test]
    fn test_render_caret_position() {
        colored::control::set_override(false);
        let source = "int main() {\n    retrn 0;\n}";
        let diag = Diagnostic::error(
            "unknown identifier 'retrn'",
            Span::new("main.btrc", 2, 5),
        );
        let rendered = diag.render(source);
        assert!(rendered.starts_with("error: unknown identifier 'retrn'"));
        assert!(rendered.contains("--> main.btrc:2:5"));
        assert!(rendered.contains(" 2 |     retrn 0;"));
        // Caret under column 5
        assert!(rendered.contains(" |     ^"));
    }

    #[test]
    fn test_render_out_of_range_line() {
        colored::control::set_override(false);
        let diag = Diagnostic::error("oops", Span::new("a.btrc", 99, 1));
        let rendered = diag.render("one line only");
        assert!(rendered.contains("--> a.btrc:99:1"));
    }

    #[test]
    fn test_closest_match() {
        let names = ["counter", "count", "printf"];
        assert_eq!(closest_match("contre", names.iter().copied()), Some("counter"));
        assert_eq!(closest_match("zzz", names.iter().copied()), None);
    }
}
