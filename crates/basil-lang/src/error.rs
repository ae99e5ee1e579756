//! Error kinds and the rendering contract: every error prints its headline,
//! the file/line it came from, and a caret-underlined source excerpt;
//! runtime errors prepend a traceback walked root-first down to the error
//! site. The rendered text is part of the public interface — tools parse it.

use std::fmt;
use std::rc::Rc;

use thiserror::Error as ThisError;

use crate::syntax::position::Position;

/// Every way a source unit can fail, phase-ordered: lex, parse, runtime.
/// The `Display` text is the rendered headline; all runtime kinds share the
/// `Runtime Error` headline but stay distinguishable on the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum ErrorKind {
    #[error("Illegal Character")]
    IllegalCharacter,
    #[error("Expected Character")]
    ExpectedCharacter,
    #[error("Invalid Syntax")]
    InvalidSyntax,
    #[error("Runtime Error")]
    Runtime,
    #[error("Runtime Error")]
    DivisionByZero,
    #[error("Runtime Error")]
    IndexOutOfBounds,
    #[error("Runtime Error")]
    NameError,
    #[error("Runtime Error")]
    ArgumentCount,
    #[error("Runtime Error")]
    IllegalOperation,
}

impl ErrorKind {
    pub fn is_runtime(self) -> bool {
        matches!(
            self,
            Self::Runtime
                | Self::DivisionByZero
                | Self::IndexOutOfBounds
                | Self::NameError
                | Self::ArgumentCount
                | Self::IllegalOperation
        )
    }
}

/// One call-stack entry of a runtime error's traceback.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    pub source_name: Rc<str>,
    /// 0-based; rendered 1-based.
    pub line: usize,
    pub scope: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub details: String,
    pub start: Position,
    pub end: Position,
    /// Root-first call frames; empty for lex/parse errors.
    pub trace: Vec<TraceFrame>,
}

impl Error {
    pub fn new(kind: ErrorKind, start: Position, end: Position, details: impl Into<String>) -> Self {
        Self { kind, details: details.into(), start, end, trace: Vec::new() }
    }

    pub fn with_trace(mut self, trace: Vec<TraceFrame>) -> Self {
        self.trace = trace;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_runtime() {
            writeln!(f, "Traceback (most recent call last):")?;
            for frame in &self.trace {
                writeln!(
                    f,
                    "  File {}, line {}, in {}",
                    frame.source_name,
                    frame.line + 1,
                    frame.scope
                )?;
            }
            writeln!(f, "{}: {}", self.kind, self.details)?;
        } else {
            writeln!(f, "{}: {}", self.kind, self.details)?;
            writeln!(f, "File {}, line {}", self.start.source_name, self.start.line + 1)?;
        }
        write!(f, "\n{}", underline_span(&self.start, &self.end))
    }
}

/// The offending source line(s), each followed by a marker line with `^`
/// under the part inside the span. Tabs are stripped from the output.
fn underline_span(start: &Position, end: &Position) -> String {
    let chars: Vec<char> = start.source.chars().collect();
    let mut result = String::new();

    let mut line_start = chars[..start.index.min(chars.len())]
        .iter()
        .rposition(|&c| c == '\n')
        .map_or(0, |i| i + 1);
    let line_count = end.line.saturating_sub(start.line) + 1;

    for i in 0..line_count {
        let line_end = chars[line_start..]
            .iter()
            .position(|&c| c == '\n')
            .map_or(chars.len(), |j| line_start + j);
        let line: String = chars[line_start..line_end].iter().collect();
        let width = line_end - line_start;

        let col_start = if i == 0 { start.column.min(width) } else { 0 };
        let col_end = if i + 1 == line_count { end.column.min(width.max(col_start + 1)) } else { width };

        result.push_str(&line);
        result.push('\n');
        result.push_str(&" ".repeat(col_start));
        result.push_str(&"^".repeat(col_end.saturating_sub(col_start).max(1)));
        if i + 1 < line_count {
            result.push('\n');
        }
        line_start = line_end + 1;
    }

    result.replace('\t', "")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(src: &str, from: usize, to: usize) -> (Position, Position) {
        let mut start = Position::start("<test>".into(), src.into());
        let chars: Vec<char> = src.chars().collect();
        for &c in &chars[..from] {
            start.advance(Some(c));
        }
        let mut end = start.clone();
        for &c in &chars[from..to] {
            end.advance(Some(c));
        }
        (start, end)
    }

    #[test]
    fn lex_error_rendering() {
        let (start, end) = positions("VAR x = @", 8, 9);
        let err = Error::new(ErrorKind::IllegalCharacter, start, end, "'@'");
        assert_eq!(
            err.to_string(),
            "Illegal Character: '@'\nFile <test>, line 1\n\nVAR x = @\n        ^"
        );
    }

    #[test]
    fn caret_width_matches_span() {
        let (start, end) = positions("oops + 1", 0, 4);
        let err = Error::new(ErrorKind::InvalidSyntax, start, end, "Expected something");
        assert!(err.to_string().ends_with("oops + 1\n^^^^"));
    }

    #[test]
    fn runtime_error_rendering_with_trace() {
        let (start, end) = positions("10 / 0", 5, 6);
        let err = Error::new(ErrorKind::DivisionByZero, start, end, "Division by zero")
            .with_trace(vec![
                TraceFrame { source_name: "<test>".into(), line: 0, scope: "<program>".into() },
                TraceFrame { source_name: "<test>".into(), line: 0, scope: "boom".into() },
            ]);
        assert_eq!(
            err.to_string(),
            "Traceback (most recent call last):\n\
             \x20 File <test>, line 1, in <program>\n\
             \x20 File <test>, line 1, in boom\n\
             Runtime Error: Division by zero\n\n10 / 0\n     ^"
        );
    }

    #[test]
    fn multi_line_span() {
        let (start, end) = positions("ab\ncd", 1, 4);
        let err = Error::new(ErrorKind::InvalidSyntax, start, end, "span");
        let rendered = err.to_string();
        assert!(rendered.contains("ab\n ^\ncd\n^"), "got:\n{rendered}");
    }

    #[test]
    fn runtime_headline_is_shared() {
        assert_eq!(ErrorKind::DivisionByZero.to_string(), "Runtime Error");
        assert_eq!(ErrorKind::NameError.to_string(), "Runtime Error");
        assert!(ErrorKind::NameError.is_runtime());
        assert!(!ErrorKind::InvalidSyntax.is_runtime());
    }
}
