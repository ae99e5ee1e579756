pub mod syntax;
pub mod runtime;
pub mod error;

pub use error::{Error, ErrorKind, TraceFrame};
pub use runtime::host::Host;
pub use runtime::interpreter::{Flow, Interpreter};
pub use runtime::value::{Function, Value, ValueKind};
pub use syntax::token::{Token, TokenKind};

use std::cell::RefCell;
use std::rc::Rc;

use runtime::builtins::Builtin;
use runtime::env::{Context, Environment, SymbolTable};
use syntax::lexer::Lexer;
use syntax::parser::Parser;

// ─── Public API ───────────────────────────────────────────────────────────────

/// A long-lived interpreter session. One global environment is created up
/// front and mutated by every `run` call — including scripts pulled in
/// through the `run` builtin, which evaluate against the same globals.
pub struct Session {
    globals: Environment,
    host: Box<dyn Host>,
}

impl Session {
    pub fn new(host: Box<dyn Host>) -> Self {
        let mut table = SymbolTable::new();
        table.set("NULL", Value::null());
        table.set("FALSE", Value::number(0.0));
        table.set("TRUE", Value::number(1.0));
        table.set("MATH_PI", Value::number(std::f64::consts::PI));
        for &(name, builtin) in Builtin::all() {
            table.set(name, Value::builtin(builtin));
        }

        let globals = Environment::new(
            Rc::new(RefCell::new(table)),
            Context::root("<program>"),
        );
        Self { globals, host }
    }

    /// Entry point: tokenize, parse, and evaluate one source unit against
    /// the session's global environment. Exactly one of value/error comes
    /// back, as the `Result`.
    pub fn run(&mut self, source_name: &str, source: &str) -> Result<Value, Error> {
        let tokens = Lexer::new(source_name, source).tokenize()?;
        let ast = Parser::new(tokens).parse()?;
        let globals = self.globals.clone();
        let mut interpreter = Interpreter::new(&mut *self.host, globals.clone());
        interpreter.eval_program(&ast, &globals)
    }
}
