pub mod ast;
pub mod cursor;

use std::cell::Cell;

use tracing::{debug, trace};

use crate::error::Diagnostic;
use crate::lexer::{Keyword, Position, Source, Span, Token, TokenKind};
use ast::*;
use cursor::{Cursor, Failure, ParseResult, Parsed};

const STATEMENT_EXPECTED: &str = "Expected 'RETURN', 'CONTINUE', 'BREAK', 'VAR', 'IF', 'FOR', 'WHILE', 'FUN', int, float, string, identifier, '+', '-', '(', '[' or 'NOT'";
const EXPR_EXPECTED: &str =
    "Expected 'VAR', 'IF', 'FOR', 'WHILE', 'FUN', int, float, string, identifier, '+', '-', '(', '[' or 'NOT'";
const COMP_EXPR_EXPECTED: &str =
    "Expected int, float, string, identifier, '+', '-', '(', '[', 'IF', 'FOR', 'WHILE', 'FUN' or 'NOT'";
const ATOM_EXPECTED: &str = "Expected int, float, string, identifier, '+', '-', '(', '[', 'IF', 'FOR', 'WHILE' or 'FUN'";
const ARGUMENT_EXPECTED: &str =
    "Expected ')', 'VAR', 'IF', 'FOR', 'WHILE', 'FUN', int, float, string, identifier, '+', '-', '(', '[' or 'NOT'";
const ELEMENT_EXPECTED: &str =
    "Expected ']', 'VAR', 'IF', 'FOR', 'WHILE', 'FUN', int, float, string, identifier, '+', '-', '(', '[' or 'NOT'";

const LOGICAL_OPS: [TokenKind; 2] = [TokenKind::Keyword(Keyword::And), TokenKind::Keyword(Keyword::Or)];
const COMPARISON_OPS: [TokenKind; 6] = [
    TokenKind::Ee,
    TokenKind::Ne,
    TokenKind::Lt,
    TokenKind::Gt,
    TokenKind::Lte,
    TokenKind::Gte,
];
const ADDITIVE_OPS: [TokenKind; 2] = [TokenKind::Plus, TokenKind::Minus];
const MULTIPLICATIVE_OPS: [TokenKind; 2] = [TokenKind::Mul, TokenKind::Div];
const POWER_OPS: [TokenKind; 1] = [TokenKind::Pow];

/// Guarded rule entries (`expr`, `comp_expr`, `factor`) allowed on the call
/// stack at once. One level of parentheses costs three.
const MAX_NESTING_DEPTH: usize = 600;

/// Remaining stack below which a guarded rule continues on a fresh segment.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_SEGMENT_SIZE: usize = 1024 * 1024;

/// A grammar rule usable as an operand of [`Parser::binary_op`].
type Rule = fn(&Parser, Cursor) -> ParseResult<Node>;

pub struct Parser {
    tokens: Vec<Token>,
    depth: Cell<usize>,
}

/// Leaves one nesting level when dropped, on success and failure alike.
struct NestingGuard<'a>(&'a Cell<usize>);

impl Drop for NestingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        // Rules rely on an EOF token being present past every other token.
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::Eof) {
            let end = tokens
                .last()
                .map(|token| token.span.end.clone())
                .unwrap_or_else(|| Position::start_of(Source::new("<unknown>", "")));
            tokens.push(Token::new(TokenKind::Eof, Span::point(end)));
        }

        Self {
            tokens,
            depth: Cell::new(0),
        }
    }

    /// Parses the whole token stream as a statement block ending at EOF.
    pub fn parse_program(&self) -> Result<Node, Diagnostic> {
        let parsed = self.statements(Cursor::START).map_err(|failure| failure.error)?;

        let token = self.token(parsed.cursor);
        if token.kind != TokenKind::Eof {
            return Err(Diagnostic::invalid_syntax(
                "Token cannot appear after previous tokens",
                token.span.clone(),
            ));
        }

        Ok(parsed.value)
    }

    fn statements(&self, at: Cursor) -> ParseResult<Node> {
        let (at, _) = self.skip_newlines(at);
        let first = self.statement(at)?;

        let start = first.value.span.clone();
        let mut statements = vec![first.value];
        let mut cursor = first.cursor;

        loop {
            let (after_newlines, newline_count) = self.skip_newlines(cursor);
            if newline_count == 0 {
                break;
            }
            cursor = after_newlines;

            match self.statement(cursor) {
                Ok(parsed) => {
                    statements.push(parsed.value);
                    cursor = parsed.cursor;
                }
                Err(failure) => {
                    // Not another statement: give back what the attempt consumed.
                    trace!(
                        at = cursor.index(),
                        consumed = failure.cursor.since(cursor),
                        "statement rolled back"
                    );
                    break;
                }
            }
        }

        let span = Span::cover(&start, &self.token(cursor).span);
        Ok(Parsed::new(Node::new(NodeKind::Statements(statements), span), cursor))
    }

    fn statement(&self, at: Cursor) -> ParseResult<Node> {
        let token = self.token(at);

        if token.is_keyword(Keyword::Return) {
            let after = at.next();
            let (value, cursor) = match self.expr(after) {
                Ok(parsed) => (Some(Box::new(parsed.value)), parsed.cursor),
                Err(_) => (None, after),
            };
            return Ok(self.node(NodeKind::Return(value), at, cursor));
        }

        if token.is_keyword(Keyword::Continue) {
            return Ok(self.node(NodeKind::Continue, at, at.next()));
        }

        if token.is_keyword(Keyword::Break) {
            return Ok(self.node(NodeKind::Break, at, at.next()));
        }

        self.expr(at)
            .map_err(|failure| failure.or_else_expected(at, self.expected(STATEMENT_EXPECTED)))
    }

    fn expr(&self, at: Cursor) -> ParseResult<Node> {
        self.nested(at, || {
            if self.token(at).is_keyword(Keyword::Var) {
                let name = self.identifier(at.next(), "Expected identifier")?;
                let after_eq = self.expect_kind(name.cursor, &TokenKind::Eq, "Expected '='")?;
                let value = self.expr(after_eq)?;

                let kind = NodeKind::VarAssign {
                    name: name.value,
                    value: Box::new(value.value),
                };
                return Ok(self.node(kind, at, value.cursor));
            }

            self.binary_op(at, Parser::comp_expr, &LOGICAL_OPS, Parser::comp_expr)
                .map_err(|failure| failure.or_else_expected(at, self.expected(EXPR_EXPECTED)))
        })
    }

    fn comp_expr(&self, at: Cursor) -> ParseResult<Node> {
        self.nested(at, || {
            if self.token(at).is_keyword(Keyword::Not) {
                let operand = self.comp_expr(at.next())?;
                let kind = NodeKind::UnaryOp {
                    op: UnaryOperator::Not,
                    operand: Box::new(operand.value),
                };
                return Ok(self.node(kind, at, operand.cursor));
            }

            self.binary_op(at, Parser::arith_expr, &COMPARISON_OPS, Parser::arith_expr)
                .map_err(|failure| failure.or_else_expected(at, self.expected(COMP_EXPR_EXPECTED)))
        })
    }

    fn arith_expr(&self, at: Cursor) -> ParseResult<Node> {
        self.binary_op(at, Parser::term, &ADDITIVE_OPS, Parser::term)
    }

    fn term(&self, at: Cursor) -> ParseResult<Node> {
        self.binary_op(at, Parser::factor, &MULTIPLICATIVE_OPS, Parser::factor)
    }

    fn factor(&self, at: Cursor) -> ParseResult<Node> {
        self.nested(at, || {
            let op = match self.token(at).kind {
                TokenKind::Plus => UnaryOperator::Plus,
                TokenKind::Minus => UnaryOperator::Negate,
                _ => return self.power(at),
            };

            let operand = self.factor(at.next())?;
            let kind = NodeKind::UnaryOp {
                op,
                operand: Box::new(operand.value),
            };
            Ok(self.node(kind, at, operand.cursor))
        })
    }

    /// `^` binds tighter than unary minus on its left and recurses through
    /// `factor` on its right, which makes it right-associative.
    fn power(&self, at: Cursor) -> ParseResult<Node> {
        self.binary_op(at, Parser::call, &POWER_OPS, Parser::factor)
    }

    fn call(&self, at: Cursor) -> ParseResult<Node> {
        let atom = self.atom(at)?;
        if self.token(atom.cursor).kind != TokenKind::LParen {
            return Ok(atom);
        }

        let mut cursor = atom.cursor.next();
        let mut args = Vec::new();

        if self.token(cursor).kind == TokenKind::RParen {
            cursor = cursor.next();
        } else {
            let start = cursor;
            let first = self
                .expr(start)
                .map_err(|failure| failure.or_else_expected(start, self.expected(ARGUMENT_EXPECTED)))?;
            args.push(first.value);
            cursor = first.cursor;

            while self.token(cursor).kind == TokenKind::Comma {
                let arg = self.expr(cursor.next())?;
                args.push(arg.value);
                cursor = arg.cursor;
            }

            cursor = self.expect_kind(cursor, &TokenKind::RParen, "Expected ',' or ')'")?;
        }

        let kind = NodeKind::Call {
            callee: Box::new(atom.value),
            args,
        };
        Ok(self.node(kind, at, cursor))
    }

    fn atom(&self, at: Cursor) -> ParseResult<Node> {
        let token = self.token(at);

        let kind = match &token.kind {
            TokenKind::Int(n) => NodeKind::Number(Number::Int(*n)),
            TokenKind::Float(x) => NodeKind::Number(Number::Float(*x)),
            TokenKind::String(s) => NodeKind::String(s.clone()),
            TokenKind::Identifier(name) => NodeKind::VarAccess(name.clone()),
            TokenKind::LParen => {
                let inner = self.expr(at.next())?;
                let cursor = self.expect_kind(inner.cursor, &TokenKind::RParen, "Expected ')'")?;
                return Ok(Parsed::new(inner.value, cursor));
            }
            TokenKind::LSquare => return self.list_expr(at),
            TokenKind::Keyword(Keyword::If) => return self.if_expr(at),
            TokenKind::Keyword(Keyword::For) => return self.for_expr(at),
            TokenKind::Keyword(Keyword::While) => return self.while_expr(at),
            TokenKind::Keyword(Keyword::Fun) => return self.func_def(at),
            _ => return self.fail(at, ATOM_EXPECTED),
        };

        Ok(self.node(kind, at, at.next()))
    }

    fn list_expr(&self, at: Cursor) -> ParseResult<Node> {
        let mut cursor = self.expect_kind(at, &TokenKind::LSquare, "Expected '['")?;
        let mut elements = Vec::new();

        if self.token(cursor).kind == TokenKind::RSquare {
            cursor = cursor.next();
        } else {
            let start = cursor;
            let first = self
                .expr(start)
                .map_err(|failure| failure.or_else_expected(start, self.expected(ELEMENT_EXPECTED)))?;
            elements.push(first.value);
            cursor = first.cursor;

            while self.token(cursor).kind == TokenKind::Comma {
                let element = self.expr(cursor.next())?;
                elements.push(element.value);
                cursor = element.cursor;
            }

            cursor = self.expect_kind(cursor, &TokenKind::RSquare, "Expected ',' or ']'")?;
        }

        Ok(self.node(NodeKind::List(elements), at, cursor))
    }

    /// `IF cond THEN body`, any number of `ELIF cond THEN body`, then an
    /// optional `ELSE body`. A multi-line clause is either the last one and
    /// closed by `END`, or followed directly by `ELIF`/`ELSE`.
    fn if_expr(&self, at: Cursor) -> ParseResult<Node> {
        let mut cases = Vec::new();
        let mut keyword = Keyword::If;
        let mut cursor = at;

        let else_case = loop {
            cursor = self.expect_keyword(cursor, keyword)?;
            let condition = self.expr(cursor)?;
            cursor = self.expect_keyword(condition.cursor, Keyword::Then)?;

            let body = self.clause_body(cursor)?;
            cursor = body.cursor;
            let (body, is_block) = body.value;
            cases.push(IfCase {
                condition: condition.value,
                body,
                should_return_null: is_block,
            });

            let next = self.token(cursor);
            if is_block && next.is_keyword(Keyword::End) {
                cursor = cursor.next();
                break None;
            }
            if next.is_keyword(Keyword::Elif) {
                keyword = Keyword::Elif;
                continue;
            }
            if next.is_keyword(Keyword::Else) {
                let body = self.closed_body(cursor.next())?;
                cursor = body.cursor;
                let (body, is_block) = body.value;
                break Some(ElseCase {
                    body: Box::new(body),
                    should_return_null: is_block,
                });
            }
            if is_block {
                return self.fail(cursor, "Expected 'END', 'ELIF' or 'ELSE'");
            }
            break None;
        };

        Ok(self.node(NodeKind::If { cases, else_case }, at, cursor))
    }

    fn for_expr(&self, at: Cursor) -> ParseResult<Node> {
        let cursor = self.expect_keyword(at, Keyword::For)?;
        let var_name = self.identifier(cursor, "Expected identifier")?;
        let cursor = self.expect_kind(var_name.cursor, &TokenKind::Eq, "Expected '='")?;
        let start = self.expr(cursor)?;
        let cursor = self.expect_keyword(start.cursor, Keyword::To)?;
        let end = self.expr(cursor)?;

        let (step, cursor) = if self.token(end.cursor).is_keyword(Keyword::Step) {
            let step = self.expr(end.cursor.next())?;
            (Some(Box::new(step.value)), step.cursor)
        } else {
            (None, end.cursor)
        };

        let cursor = self.expect_keyword(cursor, Keyword::Then)?;
        let body = self.closed_body(cursor)?;
        let (body_node, should_return_null) = body.value;

        let kind = NodeKind::For {
            var_name: var_name.value,
            start: Box::new(start.value),
            end: Box::new(end.value),
            step,
            body: Box::new(body_node),
            should_return_null,
        };
        Ok(self.node(kind, at, body.cursor))
    }

    fn while_expr(&self, at: Cursor) -> ParseResult<Node> {
        let cursor = self.expect_keyword(at, Keyword::While)?;
        let condition = self.expr(cursor)?;
        let cursor = self.expect_keyword(condition.cursor, Keyword::Then)?;
        let body = self.closed_body(cursor)?;
        let (body_node, should_return_null) = body.value;

        let kind = NodeKind::While {
            condition: Box::new(condition.value),
            body: Box::new(body_node),
            should_return_null,
        };
        Ok(self.node(kind, at, body.cursor))
    }

    fn func_def(&self, at: Cursor) -> ParseResult<Node> {
        let mut cursor = self.expect_keyword(at, Keyword::Fun)?;

        let name = match &self.token(cursor).kind {
            TokenKind::Identifier(_) => {
                let name = self.identifier(cursor, "Expected identifier")?;
                cursor = self.expect_kind(name.cursor, &TokenKind::LParen, "Expected '('")?;
                Some(name.value)
            }
            _ => {
                cursor = self.expect_kind(cursor, &TokenKind::LParen, "Expected identifier or '('")?;
                None
            }
        };

        let mut params = Vec::new();
        if let TokenKind::Identifier(_) = self.token(cursor).kind {
            let first = self.identifier(cursor, "Expected identifier")?;
            params.push(first.value);
            cursor = first.cursor;

            while self.token(cursor).kind == TokenKind::Comma {
                let param = self.identifier(cursor.next(), "Expected identifier")?;
                params.push(param.value);
                cursor = param.cursor;
            }

            cursor = self.expect_kind(cursor, &TokenKind::RParen, "Expected ',' or ')'")?;
        } else {
            cursor = self.expect_kind(cursor, &TokenKind::RParen, "Expected identifier or ')'")?;
        }

        let (body, auto_return, cursor) = if self.token(cursor).kind == TokenKind::Arrow {
            let body = self.expr(cursor.next())?;
            (body.value, true, body.cursor)
        } else {
            let cursor = self.expect_kind(cursor, &TokenKind::Newline, "Expected '->' or NEWLINE")?;
            let body = self.statements(cursor)?;
            let cursor = self.expect_keyword(body.cursor, Keyword::End)?;
            (body.value, false, cursor)
        };

        let kind = NodeKind::FuncDef {
            name,
            params,
            body: Box::new(body),
            auto_return,
        };
        Ok(self.node(kind, at, cursor))
    }

    /// A clause body: NEWLINE then a statement block (`true`), or a single
    /// statement on the same line (`false`). A block's `END` is left unconsumed.
    fn clause_body(&self, at: Cursor) -> ParseResult<(Node, bool)> {
        if self.token(at).kind == TokenKind::Newline {
            let block = self.statements(at.next())?;
            Ok(block.map(|node| (node, true)))
        } else {
            let statement = self.statement(at)?;
            Ok(statement.map(|node| (node, false)))
        }
    }

    /// Like [`Parser::clause_body`], but a block must be closed by `END`.
    fn closed_body(&self, at: Cursor) -> ParseResult<(Node, bool)> {
        let body = self.clause_body(at)?;
        if !body.value.1 {
            return Ok(body);
        }

        let cursor = self.expect_keyword(body.cursor, Keyword::End)?;
        Ok(Parsed::new(body.value, cursor))
    }

    /// Runs `rule` one nesting level deeper, on a fresh stack segment when the
    /// current one runs low. Past [`MAX_NESTING_DEPTH`] it fails at `at`.
    fn nested<T>(&self, at: Cursor, rule: impl FnOnce() -> ParseResult<T>) -> ParseResult<T> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || {
            let depth = self.depth.get() + 1;
            if depth > MAX_NESTING_DEPTH {
                trace!(at = at.index(), depth, "nesting limit reached");
                return self.fail(at, "Expression nesting is too deep");
            }

            self.depth.set(depth);
            let _guard = NestingGuard(&self.depth);
            rule()
        })
    }

    /// Parses `left (op right)*` for any operator in `ops`, folding to the left.
    fn binary_op(&self, at: Cursor, left_rule: Rule, ops: &[TokenKind], right_rule: Rule) -> ParseResult<Node> {
        let Parsed {
            value: mut left,
            mut cursor,
        } = left_rule(self, at)?;

        while let Some(op) = self.binary_operator(cursor, ops) {
            let right = right_rule(self, cursor.next())?;
            cursor = right.cursor;

            let span = Span::cover(&left.span, &right.value.span);
            let kind = NodeKind::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right.value),
            };
            left = Node::new(kind, span);
        }

        Ok(Parsed::new(left, cursor))
    }

    fn binary_operator(&self, at: Cursor, ops: &[TokenKind]) -> Option<BinaryOperator> {
        let kind = &self.token(at).kind;
        if !ops.contains(kind) {
            return None;
        }

        match kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Subtract),
            TokenKind::Mul => Some(BinaryOperator::Multiply),
            TokenKind::Div => Some(BinaryOperator::Divide),
            TokenKind::Pow => Some(BinaryOperator::Power),
            TokenKind::Ee => Some(BinaryOperator::Equal),
            TokenKind::Ne => Some(BinaryOperator::NotEqual),
            TokenKind::Lt => Some(BinaryOperator::LessThan),
            TokenKind::Gt => Some(BinaryOperator::GreaterThan),
            TokenKind::Lte => Some(BinaryOperator::LessThanOrEqual),
            TokenKind::Gte => Some(BinaryOperator::GreaterThanOrEqual),
            TokenKind::Keyword(Keyword::And) => Some(BinaryOperator::And),
            TokenKind::Keyword(Keyword::Or) => Some(BinaryOperator::Or),
            _ => None,
        }
    }

    fn identifier(&self, at: Cursor, message: &'static str) -> ParseResult<Ident> {
        let token = self.token(at);
        match &token.kind {
            TokenKind::Identifier(name) => Ok(Parsed::new(
                Ident {
                    name: name.clone(),
                    span: token.span.clone(),
                },
                at.next(),
            )),
            _ => self.fail(at, message),
        }
    }

    fn expect_kind(&self, at: Cursor, kind: &TokenKind, message: &'static str) -> Result<Cursor, Failure> {
        if &self.token(at).kind == kind {
            Ok(at.next())
        } else {
            Err(self.failure(at, message))
        }
    }

    fn expect_keyword(&self, at: Cursor, keyword: Keyword) -> Result<Cursor, Failure> {
        if self.token(at).is_keyword(keyword) {
            Ok(at.next())
        } else {
            let message = format!("Expected '{}'", keyword);
            Err(Failure::new(
                Diagnostic::invalid_syntax(message, self.token(at).span.clone()),
                at,
            ))
        }
    }

    fn skip_newlines(&self, mut at: Cursor) -> (Cursor, usize) {
        let mut count = 0;
        while self.token(at).kind == TokenKind::Newline {
            at = at.next();
            count += 1;
        }
        (at, count)
    }

    /// A node spanning the tokens from `first` up to (not including) `after_last`.
    fn node(&self, kind: NodeKind, first: Cursor, after_last: Cursor) -> Parsed<Node> {
        let last = after_last.prev().max(first);
        let span = Span::cover(&self.token(first).span, &self.token(last).span);
        Parsed::new(Node::new(kind, span), after_last)
    }

    fn token(&self, at: Cursor) -> &Token {
        // The final token is always EOF, so reads past the end stay on it.
        let index = at.index().min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn failure(&self, at: Cursor, message: &'static str) -> Failure {
        Failure::new(
            Diagnostic::invalid_syntax(message, self.token(at).span.clone()),
            at,
        )
    }

    fn fail<T>(&self, at: Cursor, message: &'static str) -> ParseResult<T> {
        Err(self.failure(at, message))
    }

    fn expected(&self, message: &'static str) -> impl FnOnce(Cursor) -> Diagnostic + '_ {
        move |at| Diagnostic::invalid_syntax(message, self.token(at).span.clone())
    }
}

/// Parses a token stream produced by the lexer into a statement block.
pub fn parse(tokens: Vec<Token>) -> Result<Node, Diagnostic> {
    let parser = Parser::new(tokens);
    match parser.parse_program() {
        Ok(program) => {
            debug!(statements = statement_count(&program), "parsed");
            Ok(program)
        }
        Err(err) => {
            debug!(kind = err.kind(), line = err.position().line + 1, "parse failed");
            Err(err)
        }
    }
}

fn statement_count(program: &Node) -> usize {
    match &program.kind {
        NodeKind::Statements(statements) => statements.len(),
        _ => 1,
    }
}
