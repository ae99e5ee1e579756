use std::rc::Rc;

use crate::error::{Error, ErrorKind};
use crate::syntax::ast::{BinOp, ElseCase, IfCase, Node, Span, UnOp};
use crate::syntax::position::Position;
use crate::syntax::token::{Token, TokenKind};

/// Recursive descent over a single cursor. Ambiguity is resolved by bounded
/// speculation: an attempt that fails rewinds the cursor by exactly the
/// tokens it consumed and the caller tries the alternative. Once a
/// production commits, a downstream error is fatal to the whole parse.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, Error>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(mut self) -> Result<Node, Error> {
        let node = self.statements()?;
        if !self.is_at_end() {
            return Err(self.invalid_syntax("Token cannot appear after previous tokens"));
        }
        Ok(node)
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn statements(&mut self) -> PResult<Node> {
        let start = self.peek().start.clone();
        let mut stmts = Vec::new();

        while self.check(&TokenKind::Newline) {
            self.advance();
        }
        stmts.push(self.statement()?);

        loop {
            let mut separators = 0;
            while self.check(&TokenKind::Newline) {
                self.advance();
                separators += 1;
            }
            if separators == 0 {
                break;
            }
            // speculative: a failed attempt rewinds and ends the sequence,
            // leaving its tokens for the enclosing production
            match self.speculate(Self::statement) {
                Some(stmt) => stmts.push(stmt),
                None => break,
            }
        }

        let end = self.peek().end.clone();
        Ok(Node::List { elements: stmts, span: Span::new(start, end) })
    }

    fn statement(&mut self) -> PResult<Node> {
        let start = self.peek().start.clone();

        if self.matches(&TokenKind::Return) {
            // the operand is optional; rewind to a bare RETURN on failure
            let value = self.speculate(Self::expr).map(Box::new);
            let end = self.peek().start.clone();
            return Ok(Node::Return { value, span: Span::new(start, end) });
        }
        if self.matches(&TokenKind::Continue) {
            let end = self.peek().start.clone();
            return Ok(Node::Continue { span: Span::new(start, end) });
        }
        if self.matches(&TokenKind::Break) {
            let end = self.peek().start.clone();
            return Ok(Node::Break { span: Span::new(start, end) });
        }

        let before = self.pos;
        self.expr().map_err(|e| {
            self.widen_if_stuck(
                e,
                before,
                "Expected 'RETURN', 'CONTINUE', 'BREAK', 'VAR', 'IF', 'FOR', 'WHILE', 'FUN', \
                 int, float, identifier, '+', '-', '(', '[' or 'NOT'",
            )
        })
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    fn expr(&mut self) -> PResult<Node> {
        if self.check(&TokenKind::Var) {
            let start = self.peek().start.clone();
            self.advance();
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Eq, "Expected '='")?;
            let value = self.expr()?;
            let span = Span::new(start, value.span().end.clone());
            return Ok(Node::VarAssign { name, value: Box::new(value), span });
        }

        let before = self.pos;
        self.binop(
            Self::comp_expr,
            &[(TokenKind::And, BinOp::And), (TokenKind::Or, BinOp::Or)],
        )
        .map_err(|e| {
            self.widen_if_stuck(
                e,
                before,
                "Expected 'VAR', 'IF', 'FOR', 'WHILE', 'FUN', int, float, identifier, \
                 '+', '-', '(', '[' or 'NOT'",
            )
        })
    }

    fn comp_expr(&mut self) -> PResult<Node> {
        if self.check(&TokenKind::Not) {
            let start = self.peek().start.clone();
            self.advance();
            let operand = self.comp_expr()?;
            let span = Span::new(start, operand.span().end.clone());
            return Ok(Node::UnaryOp { op: UnOp::Not, operand: Box::new(operand), span });
        }

        let before = self.pos;
        self.binop(
            Self::arith_expr,
            &[
                (TokenKind::EqEq, BinOp::Eq),
                (TokenKind::BangEq, BinOp::Ne),
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::LtEq, BinOp::LtEq),
                (TokenKind::GtEq, BinOp::GtEq),
            ],
        )
        .map_err(|e| {
            self.widen_if_stuck(
                e,
                before,
                "Expected int, float, identifier, '+', '-', '(', '[', 'IF', 'FOR', 'WHILE', \
                 'FUN' or 'NOT'",
            )
        })
    }

    fn arith_expr(&mut self) -> PResult<Node> {
        self.binop(
            Self::term,
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
        )
    }

    fn term(&mut self) -> PResult<Node> {
        self.binop(
            Self::factor,
            &[(TokenKind::Star, BinOp::Mul), (TokenKind::Slash, BinOp::Div)],
        )
    }

    fn factor(&mut self) -> PResult<Node> {
        if self.check(&TokenKind::Plus) {
            // unary plus is the identity
            self.advance();
            return self.factor();
        }
        if self.check(&TokenKind::Minus) {
            let start = self.peek().start.clone();
            self.advance();
            let operand = self.factor()?;
            let span = Span::new(start, operand.span().end.clone());
            return Ok(Node::UnaryOp { op: UnOp::Neg, operand: Box::new(operand), span });
        }
        self.power()
    }

    /// `^` folds strictly left: `2 ^ 3 ^ 2` is `(2 ^ 3) ^ 2`. The right
    /// operand is a sign-prefixed call, so the chain cannot re-enter this
    /// level from the right.
    fn power(&mut self) -> PResult<Node> {
        let mut left = self.call()?;
        while self.check(&TokenKind::Caret) {
            self.advance();
            let right = self.pow_operand()?;
            let span = Span::new(left.span().start.clone(), right.span().end.clone());
            left = Node::BinOp { op: BinOp::Pow, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn pow_operand(&mut self) -> PResult<Node> {
        if self.check(&TokenKind::Plus) {
            self.advance();
            return self.pow_operand();
        }
        if self.check(&TokenKind::Minus) {
            let start = self.peek().start.clone();
            self.advance();
            let operand = self.pow_operand()?;
            let span = Span::new(start, operand.span().end.clone());
            return Ok(Node::UnaryOp { op: UnOp::Neg, operand: Box::new(operand), span });
        }
        self.call()
    }

    fn call(&mut self) -> PResult<Node> {
        let atom = self.atom()?;

        if self.check(&TokenKind::LParen) {
            self.advance();
            let mut args = Vec::new();

            if self.check(&TokenKind::RParen) {
                self.advance();
            } else {
                let before = self.pos;
                args.push(self.expr().map_err(|e| {
                    self.widen_if_stuck(
                        e,
                        before,
                        "Expected ')', 'VAR', 'IF', 'FOR', 'WHILE', 'FUN', int, float, \
                         identifier, '+', '-', '(', '[' or 'NOT'",
                    )
                })?);
                while self.matches(&TokenKind::Comma) {
                    args.push(self.expr()?);
                }
                self.expect(&TokenKind::RParen, "Expected ',' or ')'")?;
            }

            let end = args
                .last()
                .map(|a| a.span().end.clone())
                .unwrap_or_else(|| atom.span().end.clone());
            let span = Span::new(atom.span().start.clone(), end);
            return Ok(Node::Call { callee: Box::new(atom), args, span });
        }

        Ok(atom)
    }

    fn atom(&mut self) -> PResult<Node> {
        let tok = self.peek().clone();
        let span = Span::new(tok.start.clone(), tok.end.clone());

        match &tok.kind {
            TokenKind::Int(v) => {
                self.advance();
                Ok(Node::Number { value: *v as f64, span })
            }
            TokenKind::Float(v) => {
                self.advance();
                Ok(Node::Number { value: *v, span })
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Node::Str { value: s.clone(), span })
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Node::VarAccess { name: name.clone(), span })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.expr()?;
                self.expect(&TokenKind::RParen, "Expected ')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.list_expr(),
            TokenKind::If => self.if_expr(),
            TokenKind::For => self.for_expr(),
            TokenKind::While => self.while_expr(),
            TokenKind::Fun => self.func_def(),
            _ => Err(self.invalid_syntax(
                "Expected int, float, identifier, '+', '-', '(', '[', 'IF', 'FOR', 'WHILE' or 'FUN'",
            )),
        }
    }

    fn list_expr(&mut self) -> PResult<Node> {
        let start = self.peek().start.clone();
        self.expect(&TokenKind::LBracket, "Expected '['")?;
        let mut elements = Vec::new();

        if self.check(&TokenKind::RBracket) {
            self.advance();
        } else {
            let before = self.pos;
            elements.push(self.expr().map_err(|e| {
                self.widen_if_stuck(
                    e,
                    before,
                    "Expected ']', 'VAR', 'IF', 'FOR', 'WHILE', 'FUN', int, float, identifier, \
                     '+', '-', '(', '[' or 'NOT'",
                )
            })?);
            while self.matches(&TokenKind::Comma) {
                elements.push(self.expr()?);
            }
            self.expect(&TokenKind::RBracket, "Expected ',' or ']'")?;
        }

        Ok(Node::List { elements, span: Span::new(start, self.prev_end()) })
    }

    // ─── If / loops / functions ──────────────────────────────────────────────

    fn if_expr(&mut self) -> PResult<Node> {
        let start = self.peek().start.clone();
        let (cases, else_case) = self.if_cases(&TokenKind::If, "Expected 'IF'")?;
        let span = Span::new(start, self.prev_end());
        Ok(Node::If { cases, else_case, span })
    }

    /// Shared by `IF` and `ELIF`: `<kw> condition THEN body`, then the
    /// trailing ELIF/ELSE chain. One `END` closes the whole block chain,
    /// consumed by whichever arm comes last.
    fn if_cases(
        &mut self,
        keyword: &TokenKind,
        expected: &str,
    ) -> PResult<(Vec<IfCase>, Option<Box<ElseCase>>)> {
        let mut cases = Vec::new();
        self.expect(keyword, expected)?;
        let condition = self.expr()?;
        self.expect(&TokenKind::Then, "Expected 'THEN'")?;

        if self.check(&TokenKind::Newline) {
            self.advance();
            let body = self.statements()?;
            cases.push(IfCase { condition, body, yields_null: true });

            if self.matches(&TokenKind::End) {
                return Ok((cases, None));
            }
            if self.check(&TokenKind::Elif) || self.check(&TokenKind::Else) {
                let (more, else_case) = self.elif_or_else()?;
                cases.extend(more);
                return Ok((cases, else_case));
            }
            Err(self.invalid_syntax("Expected 'END', 'ELIF' or 'ELSE'"))
        } else {
            let body = self.statement()?;
            cases.push(IfCase { condition, body, yields_null: false });
            let (more, else_case) = self.elif_or_else()?;
            cases.extend(more);
            Ok((cases, else_case))
        }
    }

    fn elif_or_else(&mut self) -> PResult<(Vec<IfCase>, Option<Box<ElseCase>>)> {
        if self.check(&TokenKind::Elif) {
            self.if_cases(&TokenKind::Elif, "Expected 'ELIF'")
        } else {
            Ok((Vec::new(), self.else_case()?))
        }
    }

    fn else_case(&mut self) -> PResult<Option<Box<ElseCase>>> {
        if !self.matches(&TokenKind::Else) {
            return Ok(None);
        }
        if self.check(&TokenKind::Newline) {
            self.advance();
            let body = self.statements()?;
            self.expect(&TokenKind::End, "Expected 'END'")?;
            Ok(Some(Box::new(ElseCase { body, yields_null: true })))
        } else {
            let body = self.statement()?;
            Ok(Some(Box::new(ElseCase { body, yields_null: false })))
        }
    }

    fn for_expr(&mut self) -> PResult<Node> {
        let kw_start = self.peek().start.clone();
        self.expect(&TokenKind::For, "Expected 'FOR'")?;
        let var = self.expect_ident()?;
        self.expect(&TokenKind::Eq, "Expected '='")?;
        let start = Box::new(self.expr()?);
        self.expect(&TokenKind::To, "Expected 'TO'")?;
        let end = Box::new(self.expr()?);
        let step = if self.matches(&TokenKind::Step) {
            Some(Box::new(self.expr()?))
        } else {
            None
        };
        self.expect(&TokenKind::Then, "Expected 'THEN'")?;

        if self.check(&TokenKind::Newline) {
            self.advance();
            let body = Box::new(self.statements()?);
            self.expect(&TokenKind::End, "Expected 'END'")?;
            let span = Span::new(kw_start, self.prev_end());
            Ok(Node::For { var, start, end, step, body, yields_null: true, span })
        } else {
            let body = Box::new(self.statement()?);
            let span = Span::new(kw_start, body.span().end.clone());
            Ok(Node::For { var, start, end, step, body, yields_null: false, span })
        }
    }

    fn while_expr(&mut self) -> PResult<Node> {
        let kw_start = self.peek().start.clone();
        self.expect(&TokenKind::While, "Expected 'WHILE'")?;
        let condition = Box::new(self.expr()?);
        self.expect(&TokenKind::Then, "Expected 'THEN'")?;

        if self.check(&TokenKind::Newline) {
            self.advance();
            let body = Box::new(self.statements()?);
            self.expect(&TokenKind::End, "Expected 'END'")?;
            let span = Span::new(kw_start, self.prev_end());
            Ok(Node::While { condition, body, yields_null: true, span })
        } else {
            let body = Box::new(self.statement()?);
            let span = Span::new(kw_start, body.span().end.clone());
            Ok(Node::While { condition, body, yields_null: false, span })
        }
    }

    fn func_def(&mut self) -> PResult<Node> {
        let kw_start = self.peek().start.clone();
        self.expect(&TokenKind::Fun, "Expected 'FUN'")?;

        let name = if matches!(self.peek().kind, TokenKind::Ident(_)) {
            let name = self.expect_ident()?;
            self.expect(&TokenKind::LParen, "Expected '('")?;
            Some(name)
        } else {
            self.expect(&TokenKind::LParen, "Expected identifier or '('")?;
            None
        };

        let mut params = Vec::new();
        if matches!(self.peek().kind, TokenKind::Ident(_)) {
            params.push(self.expect_ident()?);
            while self.matches(&TokenKind::Comma) {
                params.push(self.expect_ident()?);
            }
            self.expect(&TokenKind::RParen, "Expected ',' or ')'")?;
        } else {
            self.expect(&TokenKind::RParen, "Expected identifier or ')'")?;
        }

        if self.matches(&TokenKind::Arrow) {
            let body = self.expr()?;
            let span = Span::new(kw_start, body.span().end.clone());
            return Ok(Node::FuncDef { name, params, body: Rc::new(body), auto_return: true, span });
        }

        self.expect(&TokenKind::Newline, "Expected '->' or a new line")?;
        let body = self.statements()?;
        self.expect(&TokenKind::End, "Expected 'END'")?;
        let span = Span::new(kw_start, self.prev_end());
        Ok(Node::FuncDef { name, params, body: Rc::new(body), auto_return: false, span })
    }

    // ─── Combinators ─────────────────────────────────────────────────────────

    /// Left-associative fold over `sub` separated by any of `ops`.
    fn binop(
        &mut self,
        sub: fn(&mut Self) -> PResult<Node>,
        ops: &[(TokenKind, BinOp)],
    ) -> PResult<Node> {
        let mut left = sub(self)?;
        loop {
            let Some(&(_, op)) = ops.iter().find(|(kind, _)| self.check(kind)) else {
                break;
            };
            self.advance();
            let right = sub(self)?;
            let span = Span::new(left.span().start.clone(), right.span().end.clone());
            left = Node::BinOp { op, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    /// Run a sub-parse; on failure rewind the cursor by exactly the tokens
    /// the attempt consumed and discard its error.
    fn speculate<T>(&mut self, attempt: fn(&mut Self) -> PResult<T>) -> Option<T> {
        let saved = self.pos;
        match attempt(self) {
            Ok(node) => Some(node),
            Err(_) => {
                self.pos = saved;
                None
            }
        }
    }

    /// Furthest-progress wins: when the failing sub-parse consumed no
    /// tokens, replace its error with the caller's broader expectation;
    /// any progress keeps the deeper, more specific error.
    fn widen_if_stuck(&self, err: Error, before: usize, expected: &str) -> Error {
        if self.pos == before {
            self.invalid_syntax(expected)
        } else {
            err
        }
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn prev_end(&self) -> Position {
        self.tokens[self.pos.saturating_sub(1)].end.clone()
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.invalid_syntax(expected))
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.invalid_syntax("Expected identifier"))
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn invalid_syntax(&self, details: &str) -> Error {
        let tok = self.peek();
        Error::new(ErrorKind::InvalidSyntax, tok.start.clone(), tok.end.clone(), details)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;

    fn parse(src: &str) -> Node {
        let tokens = Lexer::new("<test>", src).tokenize().expect("lex failed");
        Parser::new(tokens).parse().expect("parse failed")
    }

    fn parse_err(src: &str) -> Error {
        let tokens = Lexer::new("<test>", src).tokenize().expect("lex failed");
        Parser::new(tokens).parse().expect_err("expected parse error")
    }

    /// The single statement of a one-statement program.
    fn stmt(src: &str) -> Node {
        match parse(src) {
            Node::List { mut elements, .. } => {
                assert_eq!(elements.len(), 1, "expected exactly one statement");
                elements.remove(0)
            }
            other => panic!("top level should be a statement list, got {other:?}"),
        }
    }

    // ── literals and precedence ──────────────────────────────────────────────

    #[test]
    fn number_literals() {
        assert!(matches!(stmt("42"), Node::Number { value, .. } if value == 42.0));
        assert!(matches!(stmt("2.5"), Node::Number { value, .. } if value == 2.5));
    }

    #[test]
    fn mul_binds_tighter_than_add() {
        let Node::BinOp { op: BinOp::Add, left, right, .. } = stmt("1 + 2 * 3") else {
            panic!("expected Add at the top");
        };
        assert!(matches!(*left, Node::Number { value, .. } if value == 1.0));
        assert!(matches!(*right, Node::BinOp { op: BinOp::Mul, .. }));
    }

    #[test]
    fn power_is_left_associative() {
        // (2 ^ 3) ^ 2, not 2 ^ (3 ^ 2)
        let Node::BinOp { op: BinOp::Pow, left, right, .. } = stmt("2 ^ 3 ^ 2") else {
            panic!("expected Pow at the top");
        };
        assert!(matches!(*left, Node::BinOp { op: BinOp::Pow, .. }));
        assert!(matches!(*right, Node::Number { value, .. } if value == 2.0));
    }

    #[test]
    fn power_right_operand_takes_a_sign() {
        let Node::BinOp { op: BinOp::Pow, right, .. } = stmt("2 ^ -3") else {
            panic!("expected Pow");
        };
        assert!(matches!(*right, Node::UnaryOp { op: UnOp::Neg, .. }));
    }

    #[test]
    fn unary_minus_wraps_power() {
        // -2 ^ 2 parses as -(2 ^ 2)
        let Node::UnaryOp { op: UnOp::Neg, operand, .. } = stmt("-2 ^ 2") else {
            panic!("expected Neg at the top");
        };
        assert!(matches!(*operand, Node::BinOp { op: BinOp::Pow, .. }));
    }

    #[test]
    fn unary_plus_is_identity() {
        assert!(matches!(stmt("+5"), Node::Number { value, .. } if value == 5.0));
    }

    #[test]
    fn comparison_and_logic_levels() {
        let Node::BinOp { op: BinOp::And, left, .. } = stmt("1 < 2 AND 3 > 4") else {
            panic!("expected And at the top");
        };
        assert!(matches!(*left, Node::BinOp { op: BinOp::Lt, .. }));
    }

    #[test]
    fn not_binds_below_comparison() {
        let Node::UnaryOp { op: UnOp::Not, operand, .. } = stmt("NOT 1 == 2") else {
            panic!("expected Not at the top");
        };
        assert!(matches!(*operand, Node::BinOp { op: BinOp::Eq, .. }));
    }

    #[test]
    fn parenthesised_grouping() {
        let Node::BinOp { op: BinOp::Mul, left, .. } = stmt("(1 + 2) * 3") else {
            panic!("expected Mul at the top");
        };
        assert!(matches!(*left, Node::BinOp { op: BinOp::Add, .. }));
    }

    // ── statements ───────────────────────────────────────────────────────────

    #[test]
    fn var_assignment() {
        let Node::VarAssign { name, value, .. } = stmt("VAR x = 1 + 2") else {
            panic!("expected VarAssign");
        };
        assert_eq!(name, "x");
        assert!(matches!(*value, Node::BinOp { op: BinOp::Add, .. }));
    }

    #[test]
    fn var_requires_identifier() {
        assert_eq!(parse_err("VAR 5 = 3").details, "Expected identifier");
    }

    #[test]
    fn var_requires_equals() {
        assert_eq!(parse_err("VAR x 3").details, "Expected '='");
    }

    #[test]
    fn statements_split_on_separators() {
        let Node::List { elements, .. } = parse("VAR a = 1; VAR b = 2\na + b") else {
            panic!("expected statement list");
        };
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn leading_and_trailing_separators() {
        let Node::List { elements, .. } = parse("\n\n1 + 1\n\n") else {
            panic!("expected statement list");
        };
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn bare_return() {
        assert!(matches!(stmt("RETURN"), Node::Return { value: None, .. }));
    }

    #[test]
    fn return_with_value() {
        let Node::Return { value: Some(value), .. } = stmt("RETURN 1 + 2") else {
            panic!("expected Return with operand");
        };
        assert!(matches!(*value, Node::BinOp { op: BinOp::Add, .. }));
    }

    #[test]
    fn continue_and_break() {
        assert!(matches!(stmt("CONTINUE"), Node::Continue { .. }));
        assert!(matches!(stmt("BREAK"), Node::Break { .. }));
    }

    // ── lists ────────────────────────────────────────────────────────────────

    #[test]
    fn list_literal() {
        let Node::List { elements, .. } = stmt("[1, 2, 3]") else {
            panic!("expected List");
        };
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn empty_list() {
        let Node::List { elements, .. } = stmt("[]") else {
            panic!("expected List");
        };
        assert!(elements.is_empty());
    }

    #[test]
    fn unclosed_list() {
        assert_eq!(parse_err("[1, 2").details, "Expected ',' or ']'");
    }

    // ── if ───────────────────────────────────────────────────────────────────

    #[test]
    fn single_line_if_is_an_expression() {
        let Node::If { cases, else_case, .. } = stmt("IF 1 THEN 2 ELSE 3") else {
            panic!("expected If");
        };
        assert_eq!(cases.len(), 1);
        assert!(!cases[0].yields_null);
        assert!(!else_case.expect("else case").yields_null);
    }

    #[test]
    fn elif_chain() {
        let Node::If { cases, else_case, .. } = stmt("IF a THEN 1 ELIF b THEN 2 ELIF c THEN 3 ELSE 4")
        else {
            panic!("expected If");
        };
        assert_eq!(cases.len(), 3);
        assert!(else_case.is_some());
    }

    #[test]
    fn block_if_discards_value() {
        let Node::If { cases, .. } = stmt("IF 1 THEN\n2\nEND") else {
            panic!("expected If");
        };
        assert!(cases[0].yields_null);
    }

    #[test]
    fn block_if_with_block_else() {
        let Node::If { cases, else_case, .. } = stmt("IF 1 THEN\n2\nELSE\n3\nEND") else {
            panic!("expected If");
        };
        assert!(cases[0].yields_null);
        assert!(else_case.expect("else case").yields_null);
    }

    #[test]
    fn block_if_requires_end() {
        assert_eq!(parse_err("IF 1 THEN\n2").details, "Expected 'END', 'ELIF' or 'ELSE'");
    }

    #[test]
    fn if_requires_then() {
        assert_eq!(parse_err("IF 1 2").details, "Expected 'THEN'");
    }

    // ── loops ────────────────────────────────────────────────────────────────

    #[test]
    fn single_line_for() {
        let Node::For { var, step, yields_null, .. } = stmt("FOR i = 1 TO 5 THEN i") else {
            panic!("expected For");
        };
        assert_eq!(var, "i");
        assert!(step.is_none());
        assert!(!yields_null);
    }

    #[test]
    fn for_with_step_block_form() {
        let Node::For { step, yields_null, .. } = stmt("FOR i = 10 TO 0 STEP -2 THEN\ni\nEND")
        else {
            panic!("expected For");
        };
        assert!(step.is_some());
        assert!(yields_null);
    }

    #[test]
    fn for_requires_to() {
        assert_eq!(parse_err("FOR i = 1 THEN i").details, "Expected 'TO'");
    }

    #[test]
    fn block_for_requires_end() {
        assert_eq!(parse_err("FOR i = 1 TO 3 THEN\ni").details, "Expected 'END'");
    }

    #[test]
    fn single_line_while() {
        let Node::While { yields_null, .. } = stmt("WHILE x < 3 THEN VAR x = x + 1") else {
            panic!("expected While");
        };
        assert!(!yields_null);
    }

    #[test]
    fn block_while() {
        let Node::While { yields_null, .. } = stmt("WHILE 1 THEN\nBREAK\nEND") else {
            panic!("expected While");
        };
        assert!(yields_null);
    }

    // ── functions ────────────────────────────────────────────────────────────

    #[test]
    fn arrow_function_auto_returns() {
        let Node::FuncDef { name, params, auto_return, .. } = stmt("FUN add(a, b) -> a + b")
        else {
            panic!("expected FuncDef");
        };
        assert_eq!(name.as_deref(), Some("add"));
        assert_eq!(params, vec!["a", "b"]);
        assert!(auto_return);
    }

    #[test]
    fn block_function() {
        let Node::FuncDef { auto_return, .. } = stmt("FUN f()\nRETURN 1\nEND") else {
            panic!("expected FuncDef");
        };
        assert!(!auto_return);
    }

    #[test]
    fn anonymous_function() {
        let Node::FuncDef { name, .. } = stmt("FUN (x) -> x") else {
            panic!("expected FuncDef");
        };
        assert!(name.is_none());
    }

    #[test]
    fn func_def_requires_paren() {
        assert_eq!(parse_err("FUN f -> 1").details, "Expected '('");
        assert_eq!(parse_err("FUN -> 1").details, "Expected identifier or '('");
    }

    #[test]
    fn call_with_arguments() {
        let Node::Call { callee, args, .. } = stmt("f(1, 2, 3)") else {
            panic!("expected Call");
        };
        assert!(matches!(*callee, Node::VarAccess { .. }));
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn call_without_arguments() {
        let Node::Call { args, .. } = stmt("f()") else {
            panic!("expected Call");
        };
        assert!(args.is_empty());
    }

    #[test]
    fn unclosed_call() {
        assert_eq!(parse_err("f(1, 2").details, "Expected ',' or ')'");
    }

    // ── errors ───────────────────────────────────────────────────────────────

    #[test]
    fn trailing_tokens_rejected() {
        let err = parse_err("1 + 2 3");
        assert_eq!(err.details, "Token cannot appear after previous tokens");
    }

    #[test]
    fn empty_expression_error_is_widened() {
        // the atom-level failure consumed nothing, so the statement-level
        // expectation wins
        let err = parse_err("*");
        assert!(err.details.starts_with("Expected 'RETURN'"), "got: {}", err.details);
    }

    #[test]
    fn deep_error_survives_progress() {
        // `1 +` fails inside the addition after consuming tokens, so the
        // specific atom-level message is kept
        let err = parse_err("1 +");
        assert!(err.details.starts_with("Expected int, float"), "got: {}", err.details);
    }

    #[test]
    fn unclosed_paren() {
        assert_eq!(parse_err("(1 + 2").details, "Expected ')'");
    }

    #[test]
    fn error_kind_is_invalid_syntax() {
        assert_eq!(parse_err("*").kind, ErrorKind::InvalidSyntax);
    }
}
