/*!
Recursive‑descent parser: tokens → [`Stmt`] list.

Time & Space
------------
* **n** = number of tokens (including the sole EOF).
* Each token is consumed once via `advance()`; error recovery in
  `synchronize()` only discards tokens up to the next statement boundary,
  so parsing is **Θ(n)**. The AST owns clones of the tokens it keeps, which
  lets it outlive the token buffer (closures created in one REPL line are
  called from later ones).

Logging Policy
--------------

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| Error paths                  | `debug`| Context before recording the error.       |

Grammar
-------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" ( "class"? function )* "}" ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | printStmt | block | ifStmt | whileStmt
               | forStmt | breakStmt | returnStmt ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
breakStmt      → "break" ";" ;
returnStmt     → "return" expression? ";" ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | ternary ;
ternary        → logic_or ( "?" ternary ":" ternary )? ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" | "fun" "(" parameters? ")" block ;
```

`for` has no node of its own: it is desugared here into `block` + `while`.
*/

use std::rc::Rc;

use crate::ast::{Expr, ExprKind, FunctionDecl, FunctionType, NodeIds, Stmt, StmtKind};
use crate::error::ParseError;
use crate::token::{Literal, Token, TokenType};

use log::{debug, info};

type PResult<T> = Result<T, ParseError>;

const MAX_ARITY: usize = 255;

/// Parser over a token slice that ends with `EOF`, as produced by the
/// scanner.
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    ids: &'a mut NodeIds,
    errors: Vec<ParseError>,
    loop_depth: usize,
}

impl<'a> Parser<'a> {
    /// Construct a new parser. Node ids are drawn from `ids`.
    pub fn new(tokens: &'a [Token], ids: &'a mut NodeIds) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            ids,
            errors: Vec::new(),
            loop_depth: 0,
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program. Statements that failed to parse are left
    /// out; every error is returned alongside the ones that succeeded.
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<ParseError>) {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        info!(
            "Parsed {} statements with {} error(s)",
            statements.len(),
            self.errors.len()
        );

        (statements, self.errors)
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Option<Stmt> {
        debug!("Entering declaration at line {}", self.peek().line);

        let result = if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.check(TokenType::FUN) && self.check_next(TokenType::IDENTIFIER) {
            self.advance();
            let line = self.previous().line;
            self.function(FunctionType::Function)
                .map(|decl| self.stmt(line, StmtKind::Function(decl)))
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                debug!("Parse error, synchronizing: {}", e);

                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expected class name.")?;

        let superclass: Option<Expr> = if self.matches(TokenType::LESS) {
            let super_name = self.consume(TokenType::IDENTIFIER, "Expected superclass name.")?;
            Some(self.expr(super_name.line, ExprKind::Variable(super_name)))
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();
        let mut static_methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if self.matches(TokenType::CLASS) {
                static_methods.push(self.function(FunctionType::Method)?);
            } else {
                methods.push(self.function(FunctionType::Method)?);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body.")?;

        debug!(
            "Parsed class '{}' with {} methods and {} static methods",
            name.lexeme,
            methods.len(),
            static_methods.len()
        );

        Ok(self.stmt(
            name.line,
            StmtKind::Class {
                name,
                superclass,
                methods,
                static_methods,
            },
        ))
    }

    /// Shared production for named functions, methods and lambdas. The
    /// `fun` keyword, if any, has already been consumed.
    fn function(&mut self, kind: FunctionType) -> PResult<Rc<FunctionDecl>> {
        let what = match kind {
            FunctionType::Function => "function",
            FunctionType::Method => "method",
            FunctionType::Lambda => "lambda",
        };

        let name: Option<Token> = match kind {
            FunctionType::Lambda => None,
            _ => Some(self.consume(TokenType::IDENTIFIER, &format!("Expected {} name.", what))?),
        };

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expected '(' after {} name.", what),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARITY {
                    self.errors.push(ParseError::TooManyParameters {
                        line: self.peek().line,
                    });
                }

                params.push(self.consume(TokenType::IDENTIFIER, "Expected parameter name.")?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters.")?;
        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expected '{{' before {} body.", what),
        )?;

        // `break` never crosses a function boundary.
        let enclosing_loops = std::mem::take(&mut self.loop_depth);
        let body = self.block();
        self.loop_depth = enclosing_loops;

        Ok(Rc::new(FunctionDecl {
            name,
            params,
            body: body?,
            kind,
        }))
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expected variable name.")?;

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration.",
        )?;

        Ok(self.stmt(name.line, StmtKind::Var { name, initializer }))
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> PResult<Stmt> {
        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::BREAK) {
            self.break_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            let line = self.previous().line;
            let statements = self.block()?;
            Ok(self.stmt(line, StmtKind::Block(statements)))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        let line = self.previous().line;

        debug!("Desugaring for loop at line {}", line);

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses.")?;

        let mut body: Stmt = self.loop_body()?;

        if let Some(increment) = increment {
            let increment_line = increment.line;
            let increment = self.stmt(increment_line, StmtKind::Expression(increment));
            body = self.stmt(line, StmtKind::Block(vec![body, increment]));
        }

        let condition: Expr = match condition {
            Some(condition) => condition,
            None => self.expr(line, ExprKind::Literal(Literal::Keyword("true".into()))),
        };

        let mut desugared = self.stmt(
            line,
            StmtKind::While {
                condition,
                body: Box::new(body),
            },
        );

        if let Some(initializer) = initializer {
            desugared = self.stmt(line, StmtKind::Block(vec![initializer, desugared]));
        }

        Ok(desugared)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        let line = self.previous().line;

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after if condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(self.stmt(
            line,
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
        ))
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        let line = self.previous().line;

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition.")?;

        let body: Box<Stmt> = Box::new(self.loop_body()?);

        Ok(self.stmt(line, StmtKind::While { condition, body }))
    }

    fn loop_body(&mut self) -> PResult<Stmt> {
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;

        body
    }

    fn break_statement(&mut self) -> PResult<Stmt> {
        let keyword: Token = self.previous().clone();

        self.consume(TokenType::SEMICOLON, "Expected ';' after 'break'.")?;

        if self.loop_depth == 0 {
            debug!("'break' outside loop at line {}", keyword.line);

            self.errors.push(ParseError::BreakStatementOutsideLoop { line: keyword.line });
        }

        Ok(self.stmt(keyword.line, StmtKind::Break(keyword)))
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword: Token = self.previous().clone();

        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value.")?;

        Ok(self.stmt(keyword.line, StmtKind::Return { keyword, value }))
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let line = self.previous().line;
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after value.")?;

        Ok(self.stmt(line, StmtKind::Print(value)))
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after expression.")?;

        Ok(self.stmt(expr.line, StmtKind::Expression(expr)))
    }

    /// Declarations up to the closing `}`. The `{` was already consumed.
    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block.")?;

        Ok(statements)
    }

    // ───────────────────────── expression rules ───────────────────

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr: Expr = self.ternary()?;

        if !self.matches(TokenType::EQUAL) {
            return Ok(expr);
        }

        let equals_line = self.previous().line;
        let value: Box<Expr> = Box::new(self.assignment()?);

        match expr.kind {
            ExprKind::Variable(name) => Ok(self.expr(
                name.line,
                ExprKind::Assignment { name, value },
            )),

            ExprKind::Getter { object, name } => Ok(self.expr(
                name.line,
                ExprKind::Setter {
                    object,
                    name,
                    value,
                },
            )),

            // Reported, but no need to unwind: the parser is not confused.
            kind => {
                debug!("Invalid assignment target at line {}", equals_line);

                self.errors
                    .push(ParseError::InvalidAssignmentTarget { line: equals_line });

                Ok(Expr {
                    id: expr.id,
                    line: expr.line,
                    kind,
                })
            }
        }
    }

    fn ternary(&mut self) -> PResult<Expr> {
        let condition: Expr = self.logical_or()?;

        if !self.matches(TokenType::QUESTION_MARK) {
            return Ok(condition);
        }

        let then_branch: Expr = self.ternary()?;

        self.consume(
            TokenType::COLON,
            "Expected ':' after then branch of ternary expression.",
        )?;

        let else_branch: Expr = self.ternary()?;

        Ok(self.expr(
            condition.line,
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
        ))
    }

    fn logical_or(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = self.expr(
                operator.line,
                ExprKind::Logical {
                    left: Box::new(expr),
                    operator,
                    right: Box::new(right),
                },
            );
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = self.expr(
                operator.line,
                ExprKind::Logical {
                    left: Box::new(expr),
                    operator,
                    right: Box::new(right),
                },
            );
        }

        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        self.binary(
            &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> PResult<Expr> {
        self.binary(
            &[
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> PResult<Expr> {
        self.binary(&[TokenType::MINUS, TokenType::PLUS], Self::factor)
    }

    fn factor(&mut self) -> PResult<Expr> {
        self.binary(&[TokenType::SLASH, TokenType::STAR], Self::unary)
    }

    /// One left‑associative binary precedence level.
    fn binary(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> PResult<Expr>,
    ) -> PResult<Expr> {
        let mut expr: Expr = operand(self)?;

        while self.matches_any(operators) {
            let operator: Token = self.previous().clone();
            let right: Expr = operand(self)?;

            expr = self.expr(
                operator.line,
                ExprKind::Binary {
                    left: Box::new(expr),
                    operator,
                    right: Box::new(right),
                },
            );
        }

        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.matches_any(&[TokenType::BANG, TokenType::MINUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(self.expr(
                operator.line,
                ExprKind::Unary {
                    operator,
                    right: Box::new(right),
                },
            ));
        }

        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token =
                    self.consume(TokenType::IDENTIFIER, "Expected property name after '.'.")?;

                expr = self.expr(
                    name.line,
                    ExprKind::Getter {
                        object: Box::new(expr),
                        name,
                    },
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    self.errors.push(ParseError::TooManyArguments {
                        line: self.peek().line,
                    });
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments.")?;

        Ok(self.expr(
            paren.line,
            ExprKind::Call {
                callee: Box::new(callee),
                paren,
                arguments,
            },
        ))
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token: Token = self.peek().clone();

        match token.token_type {
            TokenType::FALSE
            | TokenType::TRUE
            | TokenType::NIL
            | TokenType::NUMBER
            | TokenType::STRING => {
                self.advance();

                let literal = token
                    .literal
                    .unwrap_or_else(|| Literal::Keyword(token.lexeme.clone()));

                Ok(self.expr(token.line, ExprKind::Literal(literal)))
            }

            TokenType::IDENTIFIER => {
                self.advance();
                Ok(self.expr(token.line, ExprKind::Variable(token)))
            }

            TokenType::THIS => {
                self.advance();
                Ok(self.expr(token.line, ExprKind::This(token)))
            }

            TokenType::LEFT_PAREN => {
                self.advance();

                let inner: Expr = self.expression()?;
                self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression.")?;

                Ok(self.expr(token.line, ExprKind::Grouping(Box::new(inner))))
            }

            TokenType::FUN => {
                self.advance();

                let decl = self.function(FunctionType::Lambda)?;
                Ok(self.expr(token.line, ExprKind::Function(decl)))
            }

            TokenType::SUPER => Err(ParseError::InvalidToken {
                line: token.line,
                found: describe(&token),
                message: "'super' is reserved and can't be used here.".to_string(),
            }),

            tt if tt.is_binary_operator() => {
                self.advance();

                debug!("Binary operator '{}' without left operand", token.lexeme);

                // Swallow the right operand so recovery starts after it.
                let _ = self.factor();

                Err(ParseError::MissingLeftOperand {
                    line: token.line,
                    operator: token.lexeme,
                })
            }

            _ => Err(ParseError::ExpectedExpression {
                line: token.line,
                found: describe(&token),
            }),
        }
    }

    // ────────────────────── utility helpers ───────────────────────

    fn expr(&mut self, line: usize, kind: ExprKind) -> Expr {
        Expr {
            id: self.ids.next_id(),
            line,
            kind,
        }
    }

    fn stmt(&mut self, line: usize, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.ids.next_id(),
            line,
            kind,
        }
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn matches_any(&mut self, ttypes: &[TokenType]) -> bool {
        ttypes.iter().any(|&ttype| self.matches(ttype))
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> PResult<Token> {
        if self.check(ttype) {
            return Ok(self.advance().clone());
        }

        let found = self.peek();

        debug!("Expected {:?}, found {:?}", ttype, found.token_type);

        Err(ParseError::InvalidToken {
            line: found.line,
            found: describe(found),
            message: message.to_string(),
        })
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn check_next(&self, ttype: TokenType) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|token| token.token_type == ttype)
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}

/// How a token is named in error messages.
fn describe(token: &Token) -> String {
    match token.token_type {
        TokenType::EOF => "end".to_string(),
        _ => format!("'{}'", token.lexeme),
    }
}
