//! Tree-walking evaluator. Every recursive step yields `Result<Flow, Error>`:
//! errors travel through `Err`, while return/break/continue travel as `Flow`
//! variants that callers forward untouched — except loops, which consume
//! Break/Continue, and call boundaries, which consume Return.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, ErrorKind};
use crate::runtime::builtins::Builtin;
use crate::runtime::env::{Context, Environment, SymbolTable};
use crate::runtime::host::Host;
use crate::runtime::value::{Function, Value, ValueKind, resolve_index};
use crate::syntax::ast::{BinOp, ElseCase, IfCase, Node, Span, UnOp};
use crate::syntax::lexer::Lexer;
use crate::syntax::parser::Parser;

/// Outcome of one evaluation step: a plain value, or one of the three
/// non-error control signals.
#[derive(Debug, Clone)]
pub enum Flow {
    Value(Value),
    Return(Value),
    Break,
    Continue,
}

pub type EvalResult = Result<Flow, Error>;

/// Unwrap a sub-evaluation to its value, forwarding any control signal to
/// the caller unchanged.
macro_rules! value_of {
    ($self:ident, $node:expr, $env:expr) => {
        match $self.eval($node, $env)? {
            Flow::Value(value) => value,
            signal => return Ok(signal),
        }
    };
}

pub struct Interpreter<'h> {
    host: &'h mut dyn Host,
    /// The session-wide global environment; the `run` builtin evaluates
    /// loaded scripts against it.
    globals: Environment,
}

impl<'h> Interpreter<'h> {
    pub fn new(host: &'h mut dyn Host, globals: Environment) -> Self {
        Self { host, globals }
    }

    /// Evaluate a whole source unit. A loop signal surviving to the top is
    /// a diagnosed error, not a silent no-op; a top-level RETURN just ends
    /// the unit with its value.
    pub fn eval_program(&mut self, ast: &Node, env: &Environment) -> Result<Value, Error> {
        match self.eval(ast, env)? {
            Flow::Value(value) | Flow::Return(value) => Ok(value),
            Flow::Break => Err(self.signal_error("BREAK", ast.span(), env)),
            Flow::Continue => Err(self.signal_error("CONTINUE", ast.span(), env)),
        }
    }

    pub fn eval(&mut self, node: &Node, env: &Environment) -> EvalResult {
        match node {
            Node::Number { value, span } => Ok(Flow::Value(
                Value::number(*value)
                    .with_span(span.clone())
                    .with_ctx(Rc::clone(&env.context)),
            )),

            Node::Str { value, span } => Ok(Flow::Value(
                Value::string(value.clone())
                    .with_span(span.clone())
                    .with_ctx(Rc::clone(&env.context)),
            )),

            Node::List { elements, span } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(value_of!(self, element, env));
                }
                Ok(Flow::Value(
                    Value::list(items)
                        .with_span(span.clone())
                        .with_ctx(Rc::clone(&env.context)),
                ))
            }

            Node::VarAccess { name, span } => {
                let Some(value) = env.symbols.borrow().get(name) else {
                    return Err(Error::new(
                        ErrorKind::NameError,
                        span.start.clone(),
                        span.end.clone(),
                        format!("'{name}' is not defined"),
                    )
                    .with_trace(env.context.traceback(&span.start)));
                };
                // the lookup clone is the duplicate operation; re-tag it to
                // the access site
                Ok(Flow::Value(
                    value.with_span(span.clone()).with_ctx(Rc::clone(&env.context)),
                ))
            }

            Node::VarAssign { name, value, span: _ } => {
                let value = value_of!(self, value, env);
                env.symbols.borrow_mut().set(name.clone(), value.clone());
                Ok(Flow::Value(value))
            }

            Node::BinOp { op, left, right, span } => {
                let lhs = value_of!(self, left, env);
                let rhs = value_of!(self, right, env);
                let result = match op {
                    BinOp::Add  => lhs.add(&rhs),
                    BinOp::Sub  => lhs.sub(&rhs),
                    BinOp::Mul  => lhs.mul(&rhs),
                    BinOp::Div  => lhs.div(&rhs),
                    BinOp::Pow  => lhs.pow(&rhs),
                    BinOp::Eq   => lhs.cmp_eq(&rhs),
                    BinOp::Ne   => lhs.cmp_ne(&rhs),
                    BinOp::Lt   => lhs.cmp_lt(&rhs),
                    BinOp::Gt   => lhs.cmp_gt(&rhs),
                    BinOp::LtEq => lhs.cmp_lte(&rhs),
                    BinOp::GtEq => lhs.cmp_gte(&rhs),
                    BinOp::And  => lhs.and(&rhs),
                    BinOp::Or   => lhs.or(&rhs),
                }?;
                Ok(Flow::Value(
                    result.with_span(span.clone()).with_ctx(Rc::clone(&env.context)),
                ))
            }

            Node::UnaryOp { op, operand, span } => {
                let value = value_of!(self, operand, env);
                let result = match op {
                    UnOp::Neg => value.mul(&Value::number(-1.0)),
                    UnOp::Not => value.not(),
                }?;
                Ok(Flow::Value(
                    result.with_span(span.clone()).with_ctx(Rc::clone(&env.context)),
                ))
            }

            Node::If { cases, else_case, span } => self.eval_if(cases, else_case.as_deref(), span, env),

            Node::For { var, start, end, step, body, yields_null, span } => {
                self.eval_for(var, start, end, step.as_deref(), body, *yields_null, span, env)
            }

            Node::While { condition, body, yields_null, span } => {
                self.eval_while(condition, body, *yields_null, span, env)
            }

            Node::FuncDef { name, params, body, auto_return, span } => {
                let function = Value {
                    kind: ValueKind::Function(Rc::new(Function {
                        name: name.clone(),
                        params: params.clone(),
                        body: Rc::clone(body),
                        auto_return: *auto_return,
                        scope: Rc::clone(&env.symbols),
                    })),
                    span: Some(span.clone()),
                    ctx: Some(Rc::clone(&env.context)),
                };
                if let Some(name) = name {
                    env.symbols.borrow_mut().set(name.clone(), function.clone());
                }
                Ok(Flow::Value(function))
            }

            Node::Call { callee, args, span } => {
                let callee = value_of!(self, callee, env)
                    .with_span(span.clone())
                    .with_ctx(Rc::clone(&env.context));
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(value_of!(self, arg, env));
                }

                let result = match &callee.kind {
                    ValueKind::Function(function) => {
                        let function = Rc::clone(function);
                        self.call_function(&function, &arg_values, span, env)?
                    }
                    ValueKind::Builtin(builtin) => {
                        self.call_builtin(*builtin, &arg_values, span, env)?
                    }
                    _ => return Err(callee.runtime_error(
                        ErrorKind::IllegalOperation,
                        "Illegal operation",
                    )),
                };
                Ok(Flow::Value(
                    result.with_span(span.clone()).with_ctx(Rc::clone(&env.context)),
                ))
            }

            Node::Return { value, span } => {
                let value = match value {
                    Some(node) => value_of!(self, node, env),
                    None => Value::null()
                        .with_span(span.clone())
                        .with_ctx(Rc::clone(&env.context)),
                };
                Ok(Flow::Return(value))
            }

            Node::Continue { .. } => Ok(Flow::Continue),
            Node::Break { .. } => Ok(Flow::Break),
        }
    }

    // ─── Conditionals ────────────────────────────────────────────────────────

    fn eval_if(
        &mut self,
        cases: &[IfCase],
        else_case: Option<&ElseCase>,
        span: &Span,
        env: &Environment,
    ) -> EvalResult {
        for case in cases {
            let condition = value_of!(self, &case.condition, env);
            if condition.is_true() {
                let value = value_of!(self, &case.body, env);
                return Ok(Flow::Value(if case.yields_null {
                    self.null_at(span, env)
                } else {
                    value
                }));
            }
        }

        if let Some(else_case) = else_case {
            let value = value_of!(self, &else_case.body, env);
            return Ok(Flow::Value(if else_case.yields_null {
                self.null_at(span, env)
            } else {
                value
            }));
        }

        Ok(Flow::Value(self.null_at(span, env)))
    }

    // ─── Loops ───────────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn eval_for(
        &mut self,
        var: &str,
        start: &Node,
        end: &Node,
        step: Option<&Node>,
        body: &Node,
        yields_null: bool,
        span: &Span,
        env: &Environment,
    ) -> EvalResult {
        let start_value = value_of!(self, start, env);
        let end_value = value_of!(self, end, env);
        let step_value = match step {
            Some(node) => value_of!(self, node, env),
            None => Value::number(1.0),
        };

        let mut i = self.loop_bound(&start_value, "FOR start value must be a number")?;
        let end_n = self.loop_bound(&end_value, "FOR end value must be a number")?;
        let step_n = self.loop_bound(&step_value, "FOR step value must be a number")?;

        let mut elements = Vec::new();
        loop {
            let more = if step_n >= 0.0 { i < end_n } else { i > end_n };
            if !more {
                break;
            }
            env.symbols.borrow_mut().set(var.to_string(), Value::number(i));
            i += step_n;

            match self.eval(body, env)? {
                Flow::Value(value) => elements.push(value),
                Flow::Continue => continue,
                Flow::Break => break,
                signal @ Flow::Return(_) => return Ok(signal),
            }
        }

        Ok(Flow::Value(if yields_null {
            self.null_at(span, env)
        } else {
            Value::list(elements)
                .with_span(span.clone())
                .with_ctx(Rc::clone(&env.context))
        }))
    }

    fn eval_while(
        &mut self,
        condition: &Node,
        body: &Node,
        yields_null: bool,
        span: &Span,
        env: &Environment,
    ) -> EvalResult {
        let mut elements = Vec::new();
        loop {
            let decision = value_of!(self, condition, env);
            if !decision.is_true() {
                break;
            }
            match self.eval(body, env)? {
                Flow::Value(value) => elements.push(value),
                Flow::Continue => continue,
                Flow::Break => break,
                signal @ Flow::Return(_) => return Ok(signal),
            }
        }

        Ok(Flow::Value(if yields_null {
            self.null_at(span, env)
        } else {
            Value::list(elements)
                .with_span(span.clone())
                .with_ctx(Rc::clone(&env.context))
        }))
    }

    // ─── Calls ───────────────────────────────────────────────────────────────

    fn call_function(
        &mut self,
        function: &Function,
        args: &[Value],
        span: &Span,
        env: &Environment,
    ) -> Result<Value, Error> {
        self.check_arity(function.params.len(), args.len(), &function.describe(), span, env)?;

        // lexical scope hangs off the defining table; the call stack hangs
        // off the caller
        let display_name = function.name.clone().unwrap_or_else(|| "<anonymous>".to_string());
        let call_env = Environment::new(
            Rc::new(RefCell::new(SymbolTable::with_parent(Rc::clone(&function.scope)))),
            env.context.child(display_name, span.start.clone()),
        );

        for (param, arg) in function.params.iter().zip(args) {
            let arg = arg.clone().with_ctx(Rc::clone(&call_env.context));
            call_env.symbols.borrow_mut().set(param.clone(), arg);
        }

        match self.eval(&function.body, &call_env)? {
            Flow::Value(value) => Ok(if function.auto_return { value } else { Value::null() }),
            Flow::Return(value) => Ok(value),
            Flow::Break => Err(self.signal_error("BREAK", span, env)),
            Flow::Continue => Err(self.signal_error("CONTINUE", span, env)),
        }
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: &[Value],
        span: &Span,
        env: &Environment,
    ) -> Result<Value, Error> {
        let described = format!("<built-in function {}>", builtin.name());
        self.check_arity(builtin.params().len(), args.len(), &described, span, env)?;

        match builtin {
            Builtin::Print => {
                self.host.print(&args[0].to_string());
                Ok(Value::null())
            }
            Builtin::PrintRet => Ok(Value::string(args[0].to_string())),
            Builtin::Input => Ok(Value::string(self.host.read_line())),
            Builtin::InputInt => Ok(Value::number(self.host.read_int() as f64)),
            Builtin::Clear => {
                self.host.clear();
                Ok(Value::null())
            }

            Builtin::IsNumber => Ok(Value::bool(matches!(args[0].kind, ValueKind::Number(_)))),
            Builtin::IsString => Ok(Value::bool(matches!(args[0].kind, ValueKind::Str(_)))),
            Builtin::IsList => Ok(Value::bool(matches!(args[0].kind, ValueKind::List(_)))),
            Builtin::IsFunction => Ok(Value::bool(matches!(
                args[0].kind,
                ValueKind::Function(_) | ValueKind::Builtin(_)
            ))),

            Builtin::Append => {
                let ValueKind::List(items) = &args[0].kind else {
                    return Err(self.runtime_error("First argument must be list", span, env));
                };
                items.borrow_mut().push(args[1].clone());
                Ok(Value::null())
            }

            Builtin::Pop => {
                let ValueKind::List(items) = &args[0].kind else {
                    return Err(self.runtime_error("First argument must be list", span, env));
                };
                let ValueKind::Number(index) = &args[1].kind else {
                    return Err(self.runtime_error("Second argument must be number", span, env));
                };
                let len = items.borrow().len();
                match resolve_index(*index, len) {
                    Some(i) => Ok(items.borrow_mut().remove(i)),
                    None => Err(Error::new(
                        ErrorKind::IndexOutOfBounds,
                        span.start.clone(),
                        span.end.clone(),
                        "Element at this index could not be removed from list because index is \
                         out of bounds",
                    )
                    .with_trace(env.context.traceback(&span.start))),
                }
            }

            Builtin::Extend => {
                let ValueKind::List(a) = &args[0].kind else {
                    return Err(self.runtime_error("First argument must be list", span, env));
                };
                let ValueKind::List(b) = &args[1].kind else {
                    return Err(self.runtime_error("Second argument must be list", span, env));
                };
                let extra = b.borrow().clone();
                a.borrow_mut().extend(extra);
                Ok(Value::null())
            }

            Builtin::Len => match &args[0].kind {
                ValueKind::List(items) => Ok(Value::number(items.borrow().len() as f64)),
                ValueKind::Str(s) => Ok(Value::number(s.chars().count() as f64)),
                _ => Err(self.runtime_error("Argument must be list or string", span, env)),
            },

            Builtin::Run => self.run_script(&args[0], span, env),
        }
    }

    /// The `run` builtin: load a script through the host and evaluate it
    /// with a fresh lexer/parser/context — but against the session's global
    /// environment, so its state intentionally leaks into the caller's.
    fn run_script(&mut self, path: &Value, span: &Span, env: &Environment) -> Result<Value, Error> {
        let ValueKind::Str(path) = &path.kind else {
            return Err(self.runtime_error("First argument must be string", span, env));
        };
        let path = path.clone();

        let source = match self.host.read_file(&path) {
            Ok(source) => source,
            Err(reason) => {
                return Err(self.runtime_error(
                    format!("Failed to load script \"{path}\"\n{reason}"),
                    span,
                    env,
                ));
            }
        };

        let result = Lexer::new(&path, &source)
            .tokenize()
            .and_then(|tokens| Parser::new(tokens).parse())
            .and_then(|ast| {
                let script_env = Environment::new(
                    Rc::clone(&self.globals.symbols),
                    Context::root("<program>"),
                );
                self.eval_program(&ast, &script_env)
            });

        match result {
            Ok(_) => Ok(Value::null()),
            Err(error) => Err(self.runtime_error(
                format!("Failed to finish executing script \"{path}\"\n{error}"),
                span,
                env,
            )),
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    fn check_arity(
        &self,
        expected: usize,
        given: usize,
        described: &str,
        span: &Span,
        env: &Environment,
    ) -> Result<(), Error> {
        if given == expected {
            return Ok(());
        }
        let delta = given as i64 - expected as i64;
        Err(Error::new(
            ErrorKind::ArgumentCount,
            span.start.clone(),
            span.end.clone(),
            format!("{delta:+} args passed into {described}"),
        )
        .with_trace(env.context.traceback(&span.start)))
    }

    fn loop_bound(&self, value: &Value, details: &str) -> Result<f64, Error> {
        value
            .as_number()
            .ok_or_else(|| value.runtime_error(ErrorKind::IllegalOperation, details))
    }

    fn null_at(&self, span: &Span, env: &Environment) -> Value {
        Value::null()
            .with_span(span.clone())
            .with_ctx(Rc::clone(&env.context))
    }

    fn runtime_error(
        &self,
        details: impl Into<String>,
        span: &Span,
        env: &Environment,
    ) -> Error {
        Error::new(ErrorKind::Runtime, span.start.clone(), span.end.clone(), details)
            .with_trace(env.context.traceback(&span.start))
    }

    fn signal_error(&self, keyword: &str, span: &Span, env: &Environment) -> Error {
        self.runtime_error(format!("'{keyword}' outside of a loop"), span, env)
    }
}
