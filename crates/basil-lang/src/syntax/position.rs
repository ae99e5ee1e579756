use std::rc::Rc;

/// A point in a source unit, tracked per character. The unit's name and
/// full text ride along (shared, cheap to clone) so any position can be
/// rendered into a caret-underlined excerpt on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub index: usize,
    /// 0-based; rendered 1-based.
    pub line: usize,
    /// 0-based column within the line.
    pub column: usize,
    pub source_name: Rc<str>,
    pub source: Rc<str>,
}

impl Position {
    pub fn start(source_name: Rc<str>, source: Rc<str>) -> Self {
        Self { index: 0, line: 0, column: 0, source_name, source }
    }

    /// Fallback for values that were never tagged with a source location.
    pub fn unknown() -> Self {
        Self::start("<unknown>".into(), "".into())
    }

    /// Move past `current`, the character being consumed. The only mutator:
    /// a newline bumps the line and resets the column.
    pub fn advance(&mut self, current: Option<char>) {
        self.index += 1;
        self.column += 1;
        if current == Some('\n') {
            self.line += 1;
            self.column = 0;
        }
    }
}
