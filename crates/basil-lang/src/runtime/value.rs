use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, ErrorKind};
use crate::runtime::builtins::Builtin;
use crate::runtime::env::{Context, SymbolTable};
use crate::syntax::ast::{Node, Span};
use crate::syntax::position::Position;

/// A user-defined function: parameter names and the parsed body, bundled
/// with the scope it was defined in (lexical capture, by reference).
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<Node>,
    pub auto_return: bool,
    pub scope: Rc<RefCell<SymbolTable>>,
}

impl Function {
    /// Rendered name, `<function foo>` style, used in error details.
    pub fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!("<function {name}>"),
            None => "<function <anonymous>>".to_string(),
        }
    }
}

// The captured scope can contain the function itself; don't walk it.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("auto_return", &self.auto_return)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Number(f64),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    Builtin(Builtin),
}

/// A runtime value plus the position/context tags used to attribute errors
/// to the operand that produced them. Cloning is the language's `duplicate`
/// operation: shallow — a cloned List shares its element storage.
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub span: Option<Span>,
    pub ctx: Option<Rc<Context>>,
}

impl Value {
    pub fn number(value: f64) -> Self {
        Self { kind: ValueKind::Number(value), span: None, ctx: None }
    }

    pub fn null() -> Self {
        Self::number(0.0)
    }

    pub fn bool(value: bool) -> Self {
        Self::number(if value { 1.0 } else { 0.0 })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self { kind: ValueKind::Str(value.into()), span: None, ctx: None }
    }

    pub fn list(elements: Vec<Value>) -> Self {
        Self { kind: ValueKind::List(Rc::new(RefCell::new(elements))), span: None, ctx: None }
    }

    pub fn builtin(builtin: Builtin) -> Self {
        Self { kind: ValueKind::Builtin(builtin), span: None, ctx: None }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_ctx(mut self, ctx: Rc<Context>) -> Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ValueKind::Number(_)   => "number",
            ValueKind::Str(_)      => "string",
            ValueKind::List(_)     => "list",
            ValueKind::Function(_) => "function",
            ValueKind::Builtin(_)  => "built-in function",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match &self.kind {
            ValueKind::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Str(s) => Some(s),
            _ => None,
        }
    }

    // ─── Arithmetic ──────────────────────────────────────────────────────────

    pub fn add(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::number(a + b)),
            (ValueKind::Str(a), ValueKind::Str(b)) => Ok(Value::string(format!("{a}{b}"))),
            (ValueKind::List(items), _) => {
                // a new List value aliasing the same storage, operand appended
                items.borrow_mut().push(other.clone());
                Ok(Value {
                    kind: ValueKind::List(Rc::clone(items)),
                    span: None,
                    ctx: self.ctx.clone(),
                })
            }
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn sub(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::number(a - b)),
            (ValueKind::List(items), ValueKind::Number(index)) => {
                let len = items.borrow().len();
                match resolve_index(*index, len) {
                    Some(i) => {
                        items.borrow_mut().remove(i);
                        Ok(Value {
                            kind: ValueKind::List(Rc::clone(items)),
                            span: None,
                            ctx: self.ctx.clone(),
                        })
                    }
                    None => Err(other.runtime_error(
                        ErrorKind::IndexOutOfBounds,
                        "Element at this index could not be removed from list because index is \
                         out of bounds",
                    )),
                }
            }
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn mul(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::number(a * b)),
            (ValueKind::Str(s), ValueKind::Number(n)) => {
                // repetition count truncates toward zero; negative yields ""
                let count = if *n < 0.0 { 0 } else { *n as usize };
                Ok(Value::string(s.repeat(count)))
            }
            (ValueKind::List(a), ValueKind::List(b)) => {
                let extra = b.borrow().clone();
                a.borrow_mut().extend(extra);
                Ok(Value {
                    kind: ValueKind::List(Rc::clone(a)),
                    span: None,
                    ctx: self.ctx.clone(),
                })
            }
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn div(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => {
                if *b == 0.0 {
                    Err(other.runtime_error(ErrorKind::DivisionByZero, "Division by zero"))
                } else {
                    Ok(Value::number(a / b))
                }
            }
            (ValueKind::Str(s), ValueKind::Number(index)) => {
                let chars: Vec<char> = s.chars().collect();
                match resolve_index(*index, chars.len()) {
                    Some(i) => Ok(Value::string(chars[i].to_string())),
                    None => Err(other.runtime_error(
                        ErrorKind::IndexOutOfBounds,
                        "Element at this index could not be retrieved from string because index \
                         is out of bounds",
                    )),
                }
            }
            (ValueKind::List(items), ValueKind::Number(index)) => {
                let items = items.borrow();
                match resolve_index(*index, items.len()) {
                    Some(i) => Ok(items[i].clone()),
                    None => Err(other.runtime_error(
                        ErrorKind::IndexOutOfBounds,
                        "Element at this index could not be retrieved from list because index \
                         is out of bounds",
                    )),
                }
            }
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn pow(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::number(a.powf(*b))),
            _ => Err(self.illegal_operation(other)),
        }
    }

    // ─── Comparison ──────────────────────────────────────────────────────────

    pub fn cmp_eq(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::bool(a == b)),
            (ValueKind::Str(a), ValueKind::Str(b)) => Ok(Value::bool(a == b)),
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn cmp_ne(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::bool(a != b)),
            (ValueKind::Str(a), ValueKind::Str(b)) => Ok(Value::bool(a != b)),
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn cmp_lt(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::bool(a < b)),
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn cmp_gt(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::bool(a > b)),
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn cmp_lte(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::bool(a <= b)),
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn cmp_gte(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::bool(a >= b)),
            _ => Err(self.illegal_operation(other)),
        }
    }

    // ─── Logic ───────────────────────────────────────────────────────────────

    pub fn and(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => {
                Ok(Value::bool(*a != 0.0 && *b != 0.0))
            }
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn or(&self, other: &Value) -> Result<Value, Error> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => {
                Ok(Value::bool(*a != 0.0 || *b != 0.0))
            }
            _ => Err(self.illegal_operation(other)),
        }
    }

    pub fn not(&self) -> Result<Value, Error> {
        match &self.kind {
            ValueKind::Number(n) => Ok(Value::bool(*n == 0.0)),
            _ => Err(self.illegal_operation(self)),
        }
    }

    pub fn is_true(&self) -> bool {
        match &self.kind {
            ValueKind::Number(n) => *n != 0.0,
            ValueKind::Str(s) => !s.is_empty(),
            _ => false,
        }
    }

    // ─── Stringification ─────────────────────────────────────────────────────

    /// The quoting form shown by the REPL: strings quoted, lists bracketed.
    pub fn repr(&self) -> String {
        match &self.kind {
            ValueKind::Str(s) => format!("\"{s}\""),
            ValueKind::List(items) => {
                let parts: Vec<String> = items.borrow().iter().map(Value::repr).collect();
                format!("[{}]", parts.join(", "))
            }
            _ => self.to_string(),
        }
    }

    // ─── Error attribution ───────────────────────────────────────────────────

    fn blame_span(&self) -> Span {
        self.span
            .clone()
            .unwrap_or_else(|| Span::new(Position::unknown(), Position::unknown()))
    }

    fn illegal_operation(&self, other: &Value) -> Error {
        let start = self.blame_span().start;
        let end = other.blame_span().end;
        let trace = self
            .ctx
            .as_ref()
            .map(|ctx| ctx.traceback(&start))
            .unwrap_or_default();
        Error::new(ErrorKind::IllegalOperation, start, end, "Illegal operation").with_trace(trace)
    }

    /// Runtime error blamed on this value's own span.
    pub fn runtime_error(&self, kind: ErrorKind, details: impl Into<String>) -> Error {
        let span = self.blame_span();
        let trace = self
            .ctx
            .as_ref()
            .map(|ctx| ctx.traceback(&span.start))
            .unwrap_or_default();
        Error::new(kind, span.start, span.end, details).with_trace(trace)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Number(n) => write!(f, "{}", format_number(*n)),
            ValueKind::Str(s) => write!(f, "{s}"),
            ValueKind::List(items) => {
                let parts: Vec<String> = items.borrow().iter().map(Value::to_string).collect();
                write!(f, "{}", parts.join(", "))
            }
            ValueKind::Function(func) => write!(f, "{}", func.describe()),
            ValueKind::Builtin(b) => write!(f, "<built-in function {}>", b.name()),
        }
    }
}

/// Integer-valued numbers print without a decimal point.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Python-style index resolution: negative counts from the back; anything
/// out of range or non-integral is rejected. Shared with the `pop` builtin.
pub(crate) fn resolve_index(index: f64, len: usize) -> Option<usize> {
    if index.fract() != 0.0 || !index.is_finite() {
        return None;
    }
    let index = index as i64;
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        None
    } else {
        Some(resolved as usize)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
