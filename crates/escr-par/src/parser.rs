//! Recursive-descent parser with backtracking marks (§4.3).
//!
//! Tokens are pulled lazily from a [`Tokenizer`] into an internal buffer so a
//! [`Mark`] can be taken before a tentative parse and the cursor rewound with
//! [`Parser::reset`] if it turns out not to apply. Parsing aborts on the
//! first error — there is no recovery (§4.3.2).

use escr_lex::{Token, TokenKind, Tokenizer};
use escr_util::{FileId, Handler, Span, Symbol};

use crate::ast::*;

/// A syntax error with the span it occurred at. Reported to the `Handler`
/// and also returned so the caller can abort immediately.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// A saved token-buffer cursor. Pass it to [`Parser::reset`] to backtrack.
#[derive(Clone, Copy, Debug)]
pub struct Mark(usize);

pub struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    tokens: Vec<Token>,
    pos: usize,
    next_node_id: u32,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, file: FileId) -> Self {
        Self {
            tokenizer: Tokenizer::new(source, file),
            tokens: Vec::new(),
            pos: 0,
            next_node_id: 0,
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn fill_to(&mut self, index: usize, handler: &mut Handler) {
        while self.tokens.len() <= index {
            let at_eof = self.tokens.last().map(Token::is_eof).unwrap_or(false);
            if at_eof {
                break;
            }
            self.tokens.push(self.tokenizer.next_token(handler));
        }
    }

    fn peek_n(&mut self, n: usize, handler: &mut Handler) -> Token {
        self.fill_to(self.pos + n, handler);
        self.tokens
            .get(self.pos + n)
            .copied()
            .unwrap_or_else(|| *self.tokens.last().expect("token buffer always has Eof"))
    }

    fn peek(&mut self, handler: &mut Handler) -> Token {
        self.peek_n(0, handler)
    }

    fn bump(&mut self, handler: &mut Handler) -> Token {
        let tok = self.peek(handler);
        if !tok.is_eof() {
            self.pos += 1;
        }
        tok
    }

    /// Record the current cursor position. Backtrack to it with [`Self::reset`].
    pub fn mark(&self) -> Mark {
        Mark(self.pos)
    }

    /// Rewind the cursor to a previously taken mark.
    pub fn reset(&mut self, mark: Mark) {
        self.pos = mark.0;
    }

    fn error(&self, span: Span, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            span,
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str, handler: &mut Handler) -> ParseResult<Token> {
        let tok = self.peek(handler);
        if std::mem::discriminant(&tok.kind) == std::mem::discriminant(&kind) {
            Ok(self.bump(handler))
        } else {
            Err(self.error(tok.span, format!("Expected {} {}", describe(&kind), context)))
        }
    }

    fn expect_ident(&mut self, context: &str, handler: &mut Handler) -> ParseResult<(Symbol, Span)> {
        let tok = self.peek(handler);
        match tok.kind {
            TokenKind::Ident(sym) => {
                self.bump(handler);
                Ok((sym, tok.span))
            }
            _ => Err(self.error(tok.span, format!("Expected identifier {}", context))),
        }
    }

    fn at(&mut self, kind: TokenKind, handler: &mut Handler) -> bool {
        std::mem::discriminant(&self.peek(handler).kind) == std::mem::discriminant(&kind)
    }

    fn eat(&mut self, kind: TokenKind, handler: &mut Handler) -> bool {
        if self.at(kind, handler) {
            self.bump(handler);
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Entry point
    // ------------------------------------------------------------------

    pub fn parse_program(&mut self, handler: &mut Handler) -> ParseResult<Program> {
        let start = self.peek(handler).span;
        let mut statements = Vec::new();
        while !self.at(TokenKind::Eof, handler) {
            statements.push(self.parse_statement(handler)?);
        }
        let end = self.peek(handler).span;
        Ok(Program {
            statements,
            span: start.merge(end),
        })
    }

    // ------------------------------------------------------------------
    // Statements (§4.3.2)
    // ------------------------------------------------------------------

    fn parse_statement(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let tok = self.peek(handler);
        match tok.kind {
            TokenKind::LBrace => self.parse_block(handler),
            TokenKind::If => self.parse_if(handler),
            TokenKind::While => self.parse_while(handler),
            TokenKind::Do => self.parse_do(handler),
            TokenKind::For => self.parse_for(handler),
            TokenKind::Switch => self.parse_switch(handler),
            TokenKind::Try => self.parse_try(handler),
            TokenKind::Return => self.parse_return(handler),
            TokenKind::Throw => self.parse_throw(handler),
            TokenKind::Yield => self.parse_yield(handler),
            TokenKind::Break => {
                self.bump(handler);
                let semi = self.expect(TokenKind::Semicolon, "after 'break'", handler)?;
                Ok(Stmt {
                    kind: StmtKind::Break,
                    span: tok.span.merge(semi.span),
                })
            }
            TokenKind::Continue => {
                self.bump(handler);
                let semi = self.expect(TokenKind::Semicolon, "after 'continue'", handler)?;
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    span: tok.span.merge(semi.span),
                })
            }
            TokenKind::Var => self.parse_var_declaration(handler),
            // `type Name = ...;` (a typedef) and `type(value);`/`type.of(value);`
            // (the runtime-type-name builtin, §4.5.6) both start with the
            // `type` keyword; only the former is followed by an identifier
            // naming the alias, so that's what distinguishes them.
            TokenKind::Type if matches!(self.peek_n(1, handler).kind, TokenKind::Ident(_)) => self.parse_typedef(handler),
            TokenKind::Type => self.parse_expr_statement(handler),
            _ if self.starts_type(handler) => self.parse_typed_statement(handler),
            _ => self.parse_expr_statement(handler),
        }
    }

    fn parse_block(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let open = self.expect(TokenKind::LBrace, "to start a block", handler)?;
        let mut statements = Vec::new();
        while !self.at(TokenKind::RBrace, handler) && !self.at(TokenKind::Eof, handler) {
            statements.push(self.parse_statement(handler)?);
        }
        let close = self.expect(TokenKind::RBrace, "to close a block", handler)?;
        Ok(Stmt {
            kind: StmtKind::Block(statements),
            span: open.span.merge(close.span),
        })
    }

    /// A block is required wherever the grammar says `block`; bodies are
    /// never bare statements (§4.3.2 only ever mentions `block` as a body).
    fn parse_required_block(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        self.parse_block(handler)
    }

    fn is_type_keyword(kind: &TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Int_
                | TokenKind::Float_
                | TokenKind::Bool
                | TokenKind::String_
                | TokenKind::Object
                | TokenKind::Any
                | TokenKind::Void
        )
    }

    /// True if the current token can begin a `TypeRef` (used to disambiguate
    /// a declaration/function-def from an expression statement, since both
    /// can start with an identifier).
    fn starts_type(&mut self, handler: &mut Handler) -> bool {
        let tok = self.peek(handler);
        if Self::is_type_keyword(&tok.kind) {
            return true;
        }
        if let TokenKind::Ident(_) = tok.kind {
            // A named type is only unambiguous when followed by another
            // identifier (the declared name) or a pointer/array marker.
            let next = self.peek_n(1, handler);
            return matches!(next.kind, TokenKind::Ident(_) | TokenKind::Star | TokenKind::DotDotDot);
        }
        false
    }

    fn parse_type_ref(&mut self, handler: &mut Handler) -> ParseResult<TypeRef> {
        let tok = self.peek(handler);
        let kind = match tok.kind {
            TokenKind::Void => {
                self.bump(handler);
                TypeRefKind::Void
            }
            TokenKind::Bool => {
                self.bump(handler);
                TypeRefKind::Bool
            }
            TokenKind::Int_ => {
                self.bump(handler);
                TypeRefKind::Int
            }
            TokenKind::Float_ => {
                self.bump(handler);
                TypeRefKind::Float
            }
            TokenKind::String_ => {
                self.bump(handler);
                TypeRefKind::String
            }
            TokenKind::Object => {
                self.bump(handler);
                TypeRefKind::Object
            }
            TokenKind::Any => {
                self.bump(handler);
                TypeRefKind::Any
            }
            TokenKind::Var => {
                self.bump(handler);
                TypeRefKind::Var
            }
            TokenKind::Ident(sym) => {
                self.bump(handler);
                TypeRefKind::Named(sym)
            }
            _ => return Err(self.error(tok.span, "Expected a type")),
        };
        let mut ty = TypeRef { kind, span: tok.span };
        loop {
            let next = self.peek(handler);
            match next.kind {
                TokenKind::Star if next.contiguous => {
                    self.bump(handler);
                    ty = TypeRef {
                        span: ty.span.merge(next.span),
                        kind: TypeRefKind::Pointer(Box::new(ty)),
                    };
                }
                TokenKind::Question if next.contiguous => {
                    self.bump(handler);
                    ty = TypeRef {
                        span: ty.span.merge(next.span),
                        kind: TypeRefKind::Nullable(Box::new(ty)),
                    };
                }
                _ => break,
            }
        }
        Ok(ty)
    }

    fn parse_params(&mut self, handler: &mut Handler) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.at(TokenKind::RParen, handler) {
            return Ok(params);
        }
        loop {
            let ty = self.parse_type_ref(handler)?;
            let (name, name_span) = self.expect_ident("in parameter list", handler)?;
            params.push(Param {
                span: ty.span.merge(name_span),
                ty,
                name,
            });
            if !self.eat(TokenKind::Comma, handler) {
                break;
            }
        }
        Ok(params)
    }

    /// A type-led statement: `type id = expr;`, `type id(params) block`
    /// (function-def), or `type '...' id(params) block` (generator-def).
    fn parse_typed_statement(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.peek(handler).span;
        let ty = self.parse_type_ref(handler)?;
        if self.eat(TokenKind::DotDotDot, handler) {
            let (name, _) = self.expect_ident("in generator definition", handler)?;
            self.expect(TokenKind::LParen, "to start generator parameters", handler)?;
            let params = self.parse_params(handler)?;
            self.expect(TokenKind::RParen, "at end of generator parameter list", handler)?;
            let body = Box::new(self.parse_required_block(handler)?);
            let span = start.merge(body.span);
            return Ok(Stmt {
                kind: StmtKind::GeneratorDef {
                    yield_ty: ty,
                    name,
                    params,
                    body,
                },
                span,
            });
        }
        let (name, _) = self.expect_ident("after type in declaration", handler)?;
        if self.eat(TokenKind::LParen, handler) {
            let params = self.parse_params(handler)?;
            self.expect(TokenKind::RParen, "at end of function call parameter list", handler)?;
            let body = Box::new(self.parse_required_block(handler)?);
            let span = start.merge(body.span);
            return Ok(Stmt {
                kind: StmtKind::FunctionDef {
                    ret: ty,
                    name,
                    params,
                    body,
                },
                span,
            });
        }
        let init = if self.eat(TokenKind::Assign, handler) {
            Some(self.parse_expr(handler)?)
        } else {
            None
        };
        let semi = self.expect(TokenKind::Semicolon, "after declaration", handler)?;
        Ok(Stmt {
            kind: StmtKind::Declare {
                ty: Some(ty),
                name,
                init,
            },
            span: start.merge(semi.span),
        })
    }

    fn parse_var_declaration(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Var, "to start a declaration", handler)?;
        let (name, _) = self.expect_ident("after 'var'", handler)?;
        self.expect(TokenKind::Assign, "in 'var' declaration (an initializer is required)", handler)?;
        let init = self.parse_expr(handler)?;
        let semi = self.expect(TokenKind::Semicolon, "after declaration", handler)?;
        Ok(Stmt {
            kind: StmtKind::Declare {
                ty: None,
                name,
                init: Some(init),
            },
            span: start.span.merge(semi.span),
        })
    }

    fn parse_typedef(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Type, "to start a type definition", handler)?;
        let (name, _) = self.expect_ident("after 'type'", handler)?;
        self.expect(TokenKind::Assign, "in type definition", handler)?;
        let ty = self.parse_type_ref(handler)?;
        let semi = self.expect(TokenKind::Semicolon, "after type definition", handler)?;
        Ok(Stmt {
            kind: StmtKind::TypeDef { name, ty },
            span: start.span.merge(semi.span),
        })
    }

    /// `expr-or-guard` in `if`/`while`/`switch` heads (§4.3.2): either a
    /// plain expression or `type id = expr`.
    fn parse_condition(&mut self, handler: &mut Handler) -> ParseResult<Condition> {
        if self.starts_type(handler) {
            let mark = self.mark();
            let ty = self.parse_type_ref(handler)?;
            if let TokenKind::Ident(_) = self.peek(handler).kind {
                let (name, _) = self.expect_ident("in guard", handler)?;
                if self.eat(TokenKind::Assign, handler) {
                    let init = self.parse_expr(handler)?;
                    return Ok(Condition::Guard { ty, name, init });
                }
            }
            self.reset(mark);
        }
        Ok(Condition::Expr(self.parse_expr(handler)?))
    }

    fn parse_if(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::If, "to start an 'if' statement", handler)?;
        self.expect(TokenKind::LParen, "after 'if'", handler)?;
        let cond = self.parse_condition(handler)?;
        self.expect(TokenKind::RParen, "after 'if' condition", handler)?;
        let then_branch = Box::new(self.parse_required_block(handler)?);
        let (else_branch, end_span) = if self.eat(TokenKind::Else, handler) {
            let branch = if self.at(TokenKind::If, handler) {
                self.parse_if(handler)?
            } else {
                self.parse_required_block(handler)?
            };
            let span = branch.span;
            (Some(Box::new(branch)), span)
        } else {
            (None, then_branch.span)
        };
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span: start.span.merge(end_span),
        })
    }

    fn parse_while(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::While, "to start a 'while' loop", handler)?;
        self.expect(TokenKind::LParen, "after 'while'", handler)?;
        let cond = self.parse_condition(handler)?;
        self.expect(TokenKind::RParen, "after 'while' condition", handler)?;
        let body = Box::new(self.parse_required_block(handler)?);
        let span = start.span.merge(body.span);
        Ok(Stmt {
            kind: StmtKind::While { cond, body },
            span,
        })
    }

    fn parse_do(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Do, "to start a 'do' loop", handler)?;
        let body = Box::new(self.parse_required_block(handler)?);
        self.expect(TokenKind::While, "after 'do' block", handler)?;
        self.expect(TokenKind::LParen, "after 'while' in 'do' loop", handler)?;
        let cond = self.parse_expr(handler)?;
        self.expect(TokenKind::RParen, "after 'do...while' condition", handler)?;
        let semi = self.expect(TokenKind::Semicolon, "after 'do...while' loop", handler)?;
        Ok(Stmt {
            kind: StmtKind::Do { body, cond },
            span: start.span.merge(semi.span),
        })
    }

    /// `for (init; cond; step) block` or `for (type? id : expr) block`.
    fn parse_for(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::For, "to start a 'for' loop", handler)?;
        self.expect(TokenKind::LParen, "after 'for'", handler)?;

        if let Some(stmt) = self.try_parse_foreach(handler)? {
            let body = Box::new(self.parse_required_block(handler)?);
            let span = start.span.merge(body.span);
            let StmtKind::ForEach { ty, name, iter, .. } = stmt else {
                unreachable!()
            };
            return Ok(Stmt {
                kind: StmtKind::ForEach { ty, name, iter, body },
                span,
            });
        }

        let init = if self.at(TokenKind::Semicolon, handler) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement(handler)?))
        };
        self.expect(TokenKind::Semicolon, "after 'for' initializer", handler)?;
        let cond = if self.at(TokenKind::Semicolon, handler) {
            None
        } else {
            Some(self.parse_expr(handler)?)
        };
        self.expect(TokenKind::Semicolon, "after 'for' condition", handler)?;
        let step = if self.at(TokenKind::RParen, handler) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement_no_semi(handler)?))
        };
        self.expect(TokenKind::RParen, "after 'for' clauses", handler)?;
        let body = Box::new(self.parse_required_block(handler)?);
        let span = start.span.merge(body.span);
        Ok(Stmt {
            kind: StmtKind::For { init, cond, step, body },
            span,
        })
    }

    /// Tries the `(type? id : expr)` foreach shape; backtracks and returns
    /// `None` if it doesn't match so `parse_for` can fall back to the
    /// C-style three-clause form.
    fn try_parse_foreach(&mut self, handler: &mut Handler) -> ParseResult<Option<StmtKind>> {
        let mark = self.mark();
        let ty = if self.starts_type(handler) {
            Some(self.parse_type_ref(handler)?)
        } else {
            None
        };
        if let TokenKind::Ident(name) = self.peek(handler).kind {
            self.bump(handler);
            if self.eat(TokenKind::Colon, handler) {
                let iter = self.parse_expr(handler)?;
                self.expect(TokenKind::RParen, "after 'foreach' iterable", handler)?;
                return Ok(Some(StmtKind::ForEach {
                    ty,
                    name,
                    iter,
                    body: Box::new(Stmt {
                        kind: StmtKind::Block(Vec::new()),
                        span: Span::DUMMY,
                    }),
                }));
            }
        }
        self.reset(mark);
        Ok(None)
    }

    /// A statement usable in `for(init; ...)` position: declaration,
    /// assignment, mutation, or a bare expression — never a block.
    fn parse_simple_statement(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        if self.at(TokenKind::Var, handler) {
            return self.parse_var_declaration_no_semi(handler);
        }
        if self.starts_type(handler) {
            return self.parse_declaration_no_semi(handler);
        }
        self.parse_assignment_or_expr_no_semi(handler)
    }

    fn parse_simple_statement_no_semi(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        self.parse_simple_statement(handler)
    }

    fn parse_var_declaration_no_semi(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Var, "to start a declaration", handler)?;
        let (name, _) = self.expect_ident("after 'var'", handler)?;
        self.expect(TokenKind::Assign, "in 'var' declaration (an initializer is required)", handler)?;
        let init = self.parse_expr(handler)?;
        Ok(Stmt {
            kind: StmtKind::Declare {
                ty: None,
                name,
                init: Some(init),
            },
            span: start.span.merge(init_span_or(&init, start.span)),
        })
    }

    fn parse_declaration_no_semi(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.peek(handler).span;
        let ty = self.parse_type_ref(handler)?;
        let (name, name_span) = self.expect_ident("after type in declaration", handler)?;
        let init = if self.eat(TokenKind::Assign, handler) {
            Some(self.parse_expr(handler)?)
        } else {
            None
        };
        let end = init.as_ref().map(|e| e.span).unwrap_or(name_span);
        Ok(Stmt {
            kind: StmtKind::Declare {
                ty: Some(ty),
                name,
                init,
            },
            span: start.merge(end),
        })
    }

    fn parse_assignment_or_expr_no_semi(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let target = self.parse_expr(handler)?;
        self.finish_assignment_or_expr(target, handler)
    }

    fn finish_assignment_or_expr(&mut self, target: Expr, handler: &mut Handler) -> ParseResult<Stmt> {
        let tok = self.peek(handler);
        if let Some(op) = compound_assign_op(&tok.kind) {
            self.bump(handler);
            let value = self.parse_expr(handler)?;
            let span = target.span.merge(value.span);
            return Ok(Stmt {
                kind: StmtKind::Mutate { target, op, value },
                span,
            });
        }
        if matches!(tok.kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            self.bump(handler);
            let op = if tok.kind == TokenKind::PlusPlus { BinOp::Add } else { BinOp::Sub };
            let one = Expr::new(ExprKind::Int(1), tok.span, self.fresh_id());
            let span = target.span.merge(tok.span);
            return Ok(Stmt {
                kind: StmtKind::Mutate { target, op, value: one },
                span,
            });
        }
        if self.eat(TokenKind::Assign, handler) {
            let value = self.parse_expr(handler)?;
            let span = target.span.merge(value.span);
            return Ok(Stmt {
                kind: StmtKind::Assign { target, value },
                span,
            });
        }
        let span = target.span;
        Ok(Stmt {
            kind: StmtKind::Expr(target),
            span,
        })
    }

    fn parse_expr_statement(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let target = self.parse_expr(handler)?;
        let stmt = self.finish_assignment_or_expr(target, handler)?;
        let semi = self.expect(TokenKind::Semicolon, "after statement", handler)?;
        Ok(Stmt {
            span: stmt.span.merge(semi.span),
            ..stmt
        })
    }

    fn parse_switch(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Switch, "to start a 'switch' statement", handler)?;
        self.expect(TokenKind::LParen, "after 'switch'", handler)?;
        let subject = self.parse_condition(handler)?;
        self.expect(TokenKind::RParen, "after 'switch' subject", handler)?;
        self.expect(TokenKind::LBrace, "to start 'switch' body", handler)?;
        let mut clauses = Vec::new();
        let mut seen_default = false;
        while !self.at(TokenKind::RBrace, handler) && !self.at(TokenKind::Eof, handler) {
            let clause_start = self.peek(handler).span;
            let mut labels = Vec::new();
            loop {
                if self.eat(TokenKind::Case, handler) {
                    let e = self.parse_expr(handler)?;
                    self.expect(TokenKind::Colon, "after 'case' label", handler)?;
                    labels.push(CaseLabel::Case(e));
                } else if self.at(TokenKind::Default, handler) {
                    let tok = self.bump(handler);
                    if seen_default {
                        return Err(self.error(tok.span, "'default' may appear at most once in a 'switch'"));
                    }
                    seen_default = true;
                    self.expect(TokenKind::Colon, "after 'default' label", handler)?;
                    labels.push(CaseLabel::Default);
                } else {
                    break;
                }
            }
            if labels.is_empty() {
                let tok = self.peek(handler);
                return Err(self.error(tok.span, "Expected 'case' or 'default' in 'switch' body"));
            }
            let mut body = Vec::new();
            while !matches!(self.peek(handler).kind, TokenKind::Case | TokenKind::Default | TokenKind::RBrace) {
                body.push(self.parse_statement(handler)?);
            }
            let clause_end = body.last().map(|s| s.span).unwrap_or(clause_start);
            clauses.push(Clause {
                labels,
                body,
                span: clause_start.merge(clause_end),
            });
        }
        let close = self.expect(TokenKind::RBrace, "to close 'switch' body", handler)?;
        Ok(Stmt {
            kind: StmtKind::Switch { subject, clauses },
            span: start.span.merge(close.span),
        })
    }

    fn parse_try(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Try, "to start a 'try' statement", handler)?;
        let body = Box::new(self.parse_required_block(handler)?);
        let mut catches = Vec::new();
        while self.at(TokenKind::Catch, handler) {
            let catch_start = self.bump(handler).span;
            self.expect(TokenKind::LParen, "after 'catch'", handler)?;
            let ty = self.parse_type_ref(handler)?;
            let (name, _) = self.expect_ident("in 'catch' clause", handler)?;
            self.expect(TokenKind::RParen, "after 'catch' parameter", handler)?;
            let catch_body = Box::new(self.parse_required_block(handler)?);
            catches.push(Catch {
                span: catch_start.merge(catch_body.span),
                ty,
                name,
                body: catch_body,
            });
        }
        let finally = if self.eat(TokenKind::Finally, handler) {
            Some(Box::new(self.parse_required_block(handler)?))
        } else {
            None
        };
        let end = finally
            .as_ref()
            .map(|f| f.span)
            .or_else(|| catches.last().map(|c| c.span))
            .unwrap_or(body.span);
        Ok(Stmt {
            kind: StmtKind::Try { body, catches, finally },
            span: start.span.merge(end),
        })
    }

    fn parse_return(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Return, "to start a 'return' statement", handler)?;
        let value = if self.at(TokenKind::Semicolon, handler) {
            None
        } else {
            Some(self.parse_expr(handler)?)
        };
        let semi = self.expect(TokenKind::Semicolon, "after 'return'", handler)?;
        Ok(Stmt {
            kind: StmtKind::Return(value),
            span: start.span.merge(semi.span),
        })
    }

    fn parse_throw(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Throw, "to start a 'throw' statement", handler)?;
        let value = self.parse_expr(handler)?;
        let semi = self.expect(TokenKind::Semicolon, "after 'throw'", handler)?;
        Ok(Stmt {
            kind: StmtKind::Throw(value),
            span: start.span.merge(semi.span),
        })
    }

    fn parse_yield(&mut self, handler: &mut Handler) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Yield, "to start a 'yield' statement", handler)?;
        let value = self.parse_expr(handler)?;
        let semi = self.expect(TokenKind::Semicolon, "after 'yield'", handler)?;
        Ok(Stmt {
            kind: StmtKind::Yield(value),
            span: start.span.merge(semi.span),
        })
    }

    // ------------------------------------------------------------------
    // Expressions (§4.3.1), lowest to highest precedence
    // ------------------------------------------------------------------

    pub fn parse_expr(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        self.parse_ternary(handler)
    }

    fn parse_ternary(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let cond = self.parse_null_coalesce(handler)?;
        if self.eat(TokenKind::Question, handler) {
            let then_expr = self.parse_ternary(handler)?;
            self.expect(TokenKind::Colon, "in ternary expression", handler)?;
            let else_expr = self.parse_ternary(handler)?;
            let span = cond.span.merge(else_expr.span);
            let id = self.fresh_id();
            return Ok(Expr::new(
                ExprKind::Ternary {
                    cond: Box::new(cond),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                span,
                id,
            ));
        }
        Ok(cond)
    }

    fn parse_null_coalesce(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        self.parse_left_assoc_binary(handler, &[(TokenKind::QuestionQuestion, BinOp::NullCoalesce)], Self::parse_or)
    }

    fn parse_or(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        self.parse_left_assoc_binary(handler, &[(TokenKind::PipePipe, BinOp::Or)], Self::parse_and)
    }

    fn parse_and(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        self.parse_left_assoc_binary(handler, &[(TokenKind::AmpAmp, BinOp::And)], Self::parse_bit_or)
    }

    fn parse_bit_or(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        self.parse_left_assoc_binary(handler, &[(TokenKind::Pipe, BinOp::BitOr)], Self::parse_bit_xor)
    }

    fn parse_bit_xor(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        self.parse_left_assoc_binary(handler, &[(TokenKind::Caret, BinOp::BitXor)], Self::parse_bit_and)
    }

    fn parse_bit_and(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        self.parse_left_assoc_binary(handler, &[(TokenKind::Amp, BinOp::BitAnd)], Self::parse_equality)
    }

    fn parse_equality(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let lhs = self.parse_relational(handler)?;
        let tok = self.peek(handler);
        let op = match tok.kind {
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::NotEq => BinOp::NotEq,
            _ => return Ok(lhs),
        };
        self.bump(handler);
        let rhs = self.parse_relational(handler)?;
        let span = lhs.span.merge(rhs.span);
        let id = self.fresh_id();
        let cmp = Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
            id,
        );
        // Wrapped so the preparer can recognize a top-level comparison for
        // `assert`'s predicate-promotion rule (§4.5.6).
        let pred_id = self.fresh_id();
        Ok(Expr::new(ExprKind::Predicate(Box::new(cmp)), span, pred_id))
    }

    fn parse_relational(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let lhs = self.parse_shift(handler)?;
        let tok = self.peek(handler);
        let op = match tok.kind {
            TokenKind::Lt => BinOp::Lt,
            TokenKind::LtEq => BinOp::LtEq,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::GtEq => BinOp::GtEq,
            _ => return Ok(lhs),
        };
        self.bump(handler);
        let rhs = self.parse_shift(handler)?;
        let span = lhs.span.merge(rhs.span);
        let id = self.fresh_id();
        let cmp = Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
            id,
        );
        let pred_id = self.fresh_id();
        Ok(Expr::new(ExprKind::Predicate(Box::new(cmp)), span, pred_id))
    }

    fn parse_shift(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        self.parse_left_assoc_binary(
            handler,
            &[
                (TokenKind::Shl, BinOp::Shl),
                (TokenKind::Shr, BinOp::Shr),
                (TokenKind::Shr3, BinOp::Shr3),
            ],
            Self::parse_additive,
        )
    }

    /// `+`/`-`, with the vexatious case: maximal munch already swallowed a
    /// lone `--` between two operands into one `MinusMinus` token even
    /// though there's no postfix decrement *expression* in this grammar.
    /// `a--b` is `a - (-b)`; the tokenizer's `--` supplies both minus signs,
    /// so we consume it once and wrap the next operand in a negation
    /// without reading an extra token. Symmetrically `a++b` is just `a+b`.
    fn parse_additive(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let mut lhs = self.parse_multiplicative(handler)?;
        loop {
            let tok = self.peek(handler);
            match tok.kind {
                TokenKind::Plus => {
                    self.bump(handler);
                    let rhs = self.parse_multiplicative(handler)?;
                    let span = lhs.span.merge(rhs.span);
                    let id = self.fresh_id();
                    lhs = Expr::new(
                        ExprKind::Binary {
                            op: BinOp::Add,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        },
                        span,
                        id,
                    );
                }
                TokenKind::Minus => {
                    self.bump(handler);
                    let rhs = self.parse_multiplicative(handler)?;
                    let span = lhs.span.merge(rhs.span);
                    let id = self.fresh_id();
                    lhs = Expr::new(
                        ExprKind::Binary {
                            op: BinOp::Sub,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        },
                        span,
                        id,
                    );
                }
                TokenKind::PlusPlus => {
                    self.bump(handler);
                    let rhs = self.parse_multiplicative(handler)?;
                    let span = lhs.span.merge(rhs.span);
                    let id = self.fresh_id();
                    lhs = Expr::new(
                        ExprKind::Binary {
                            op: BinOp::Add,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        },
                        span,
                        id,
                    );
                }
                TokenKind::MinusMinus => {
                    self.bump(handler);
                    let operand = self.parse_multiplicative(handler)?;
                    let neg_span = operand.span;
                    let neg_id = self.fresh_id();
                    let rhs = Expr::new(ExprKind::Unary { op: UnaryOp::Neg, operand: Box::new(operand) }, neg_span, neg_id);
                    let span = lhs.span.merge(rhs.span);
                    let id = self.fresh_id();
                    lhs = Expr::new(
                        ExprKind::Binary {
                            op: BinOp::Sub,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        },
                        span,
                        id,
                    );
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        self.parse_left_assoc_binary(
            handler,
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::Percent, BinOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_left_assoc_binary(
        &mut self,
        handler: &mut Handler,
        ops: &[(TokenKind, BinOp)],
        mut next: impl FnMut(&mut Self, &mut Handler) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut lhs = next(self, handler)?;
        loop {
            let tok = self.peek(handler);
            let matched = ops.iter().find(|(kind, _)| {
                std::mem::discriminant(kind) == std::mem::discriminant(&tok.kind)
            });
            let Some((_, op)) = matched else { break };
            self.bump(handler);
            let rhs = next(self, handler)?;
            let span = lhs.span.merge(rhs.span);
            let id = self.fresh_id();
            lhs = Expr::new(
                ExprKind::Binary {
                    op: *op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
                id,
            );
        }
        Ok(lhs)
    }

    /// Unary `! & * - ~ ...`, with negative-literal folding (§4.3.3): a
    /// contiguous `-` directly in front of an integer or float literal
    /// folds into the literal's value instead of wrapping it in `Unary`,
    /// which is what lets `-9223372036854775808` round-trip.
    fn parse_unary(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let tok = self.peek(handler);
        let op = match tok.kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Amp => UnaryOp::AddressOf,
            TokenKind::Star => UnaryOp::Deref,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::DotDotDot => UnaryOp::Spread,
            TokenKind::Minus => {
                self.bump(handler);
                let next = self.peek(handler);
                if next.contiguous {
                    match next.kind {
                        TokenKind::Int(v) => {
                            self.bump(handler);
                            let value = fold_negative_int(v)
                                .ok_or_else(|| self.error(tok.span.merge(next.span), "Integer literal out of range"))?;
                            let id = self.fresh_id();
                            return Ok(Expr::new(ExprKind::Int(value), tok.span.merge(next.span), id));
                        }
                        TokenKind::Float(v) => {
                            self.bump(handler);
                            let id = self.fresh_id();
                            return Ok(Expr::new(ExprKind::Float(-v), tok.span.merge(next.span), id));
                        }
                        _ => {}
                    }
                }
                let operand = self.parse_unary(handler)?;
                let span = tok.span.merge(operand.span);
                let id = self.fresh_id();
                return Ok(Expr::new(ExprKind::Unary { op: UnaryOp::Neg, operand: Box::new(operand) }, span, id));
            }
            _ => return self.parse_postfix(handler),
        };
        self.bump(handler);
        let operand = self.parse_unary(handler)?;
        let span = tok.span.merge(operand.span);
        let id = self.fresh_id();
        Ok(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, span, id))
    }

    /// Postfix `[index]`, `(args)`, `.id`, `?.id`.
    fn parse_postfix(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let mut expr = self.parse_primary(handler)?;
        loop {
            let tok = self.peek(handler);
            match tok.kind {
                TokenKind::LBracket if tok.contiguous => {
                    self.bump(handler);
                    let index = self.parse_expr(handler)?;
                    let close = self.expect(TokenKind::RBracket, "to close index expression", handler)?;
                    let span = expr.span.merge(close.span);
                    let id = self.fresh_id();
                    expr = Expr::new(
                        ExprKind::Index { target: Box::new(expr), index: Box::new(index) },
                        span,
                        id,
                    );
                }
                TokenKind::LParen if tok.contiguous => {
                    self.bump(handler);
                    let args = self.parse_call_args(handler)?;
                    let close = self.expect(TokenKind::RParen, "at end of function call parameter list", handler)?;
                    let span = expr.span.merge(close.span);
                    let id = self.fresh_id();
                    expr = Expr::new(
                        ExprKind::Call { callee: Box::new(expr), args },
                        span,
                        id,
                    );
                }
                TokenKind::Dot => {
                    self.bump(handler);
                    let (name, name_span) = self.expect_ident("after '.'", handler)?;
                    let span = expr.span.merge(name_span);
                    let id = self.fresh_id();
                    expr = Expr::new(
                        ExprKind::Dot { target: Box::new(expr), name, optional: false },
                        span,
                        id,
                    );
                }
                TokenKind::QuestionDot => {
                    self.bump(handler);
                    let (name, name_span) = self.expect_ident("after '?.'", handler)?;
                    let span = expr.span.merge(name_span);
                    let id = self.fresh_id();
                    expr = Expr::new(
                        ExprKind::Dot { target: Box::new(expr), name, optional: true },
                        span,
                        id,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self, handler: &mut Handler) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.at(TokenKind::RParen, handler) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_call_arg(handler)?);
            if !self.eat(TokenKind::Comma, handler) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_call_arg(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        if let TokenKind::Ident(name) = self.peek(handler).kind {
            let mark = self.mark();
            let name_tok = self.bump(handler);
            if self.eat(TokenKind::Colon, handler) {
                let value = self.parse_expr(handler)?;
                let span = name_tok.span.merge(value.span);
                let id = self.fresh_id();
                return Ok(Expr::new(ExprKind::NamedArg(name, Box::new(value)), span, id));
            }
            self.reset(mark);
        }
        self.parse_expr(handler)
    }

    /// Primaries: literals, identifiers, `(expr)`, array/object literals,
    /// and casts written as `keyword(args)` or `keyword.id`.
    fn parse_primary(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let tok = self.peek(handler);
        match tok.kind {
            TokenKind::Int(v) => {
                self.bump(handler);
                if v > i64::MAX as u64 {
                    return Err(self.error(tok.span, "Integer literal out of range"));
                }
                let id = self.fresh_id();
                Ok(Expr::new(ExprKind::Int(v as i64), tok.span, id))
            }
            TokenKind::Float(v) => {
                self.bump(handler);
                let id = self.fresh_id();
                Ok(Expr::new(ExprKind::Float(v), tok.span, id))
            }
            TokenKind::Str(sym) => {
                self.bump(handler);
                let id = self.fresh_id();
                Ok(Expr::new(ExprKind::Str(sym), tok.span, id))
            }
            TokenKind::True => {
                self.bump(handler);
                let id = self.fresh_id();
                Ok(Expr::new(ExprKind::Bool(true), tok.span, id))
            }
            TokenKind::False => {
                self.bump(handler);
                let id = self.fresh_id();
                Ok(Expr::new(ExprKind::Bool(false), tok.span, id))
            }
            TokenKind::Null => {
                self.bump(handler);
                let id = self.fresh_id();
                Ok(Expr::new(ExprKind::Null, tok.span, id))
            }
            TokenKind::Ident(sym) => {
                self.bump(handler);
                let id = self.fresh_id();
                Ok(Expr::new(ExprKind::Ident(sym), tok.span, id))
            }
            TokenKind::LParen => {
                self.bump(handler);
                let inner = self.parse_expr(handler)?;
                self.expect(TokenKind::RParen, "to close parenthesized expression", handler)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array_literal(handler),
            TokenKind::LBrace => self.parse_object_literal(handler),
            // `string(...)` is the one type keyword that takes a variadic
            // argument list (§4.5.6) rather than casting a single value, so
            // it gets its own path instead of going through `parse_cast`.
            TokenKind::String_ => self.parse_string_builtin(handler),
            TokenKind::Type => self.parse_type_builtin(handler),
            _ if Self::is_type_keyword(&tok.kind) => self.parse_cast(handler),
            _ => Err(self.error(tok.span, "Expected an expression")),
        }
    }

    /// `type(value)` / `type.of(value)` (§4.5.6): the runtime-type-name
    /// builtin. Parsed the same shape as `parse_cast`'s two forms, but
    /// `type` names a builtin function rather than a `TypeRef`, so it
    /// synthesizes an `Ident("type")` callee instead of a `Cast` node -
    /// exactly how `parse_cast` already synthesizes `Ident("string")` for
    /// `string.from`.
    fn parse_type_builtin(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let start = self.expect(TokenKind::Type, "in expression", handler)?;
        let callee_id = self.fresh_id();
        let callee = Expr::new(ExprKind::Ident(Symbol::intern("type")), start.span, callee_id);
        if self.eat(TokenKind::Dot, handler) {
            let (name, name_span) = self.expect_ident("after '.' in 'type' expression", handler)?;
            let span = start.span.merge(name_span);
            let id = self.fresh_id();
            return Ok(Expr::new(ExprKind::Dot { target: Box::new(callee), name, optional: false }, span, id));
        }
        Ok(callee)
    }

    /// `string(...any)`: variadic, concatenating every argument's string
    /// form (§4.5.6), unlike the single-value cast the other type keywords
    /// get from `parse_cast`. Synthesizes an `Ident("string")` callee so it
    /// dispatches the same way `string.from(...)` already does.
    fn parse_string_builtin(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let start = self.expect(TokenKind::String_, "in expression", handler)?;
        let callee_id = self.fresh_id();
        let callee = Expr::new(ExprKind::Ident(Symbol::intern("string")), start.span, callee_id);
        if self.eat(TokenKind::Dot, handler) {
            let (name, name_span) = self.expect_ident("after '.' in 'string' expression", handler)?;
            let span = start.span.merge(name_span);
            let id = self.fresh_id();
            return Ok(Expr::new(ExprKind::Dot { target: Box::new(callee), name, optional: false }, span, id));
        }
        Ok(callee)
    }

    fn parse_cast(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let ty = self.parse_type_ref(handler)?;
        if self.eat(TokenKind::LParen, handler) {
            let inner = self.parse_expr(handler)?;
            let close = self.expect(TokenKind::RParen, "to close cast expression", handler)?;
            let span = ty.span.merge(close.span);
            let id = self.fresh_id();
            return Ok(Expr::new(ExprKind::Cast { ty, expr: Box::new(inner) }, span, id));
        }
        let dot = self.expect(TokenKind::Dot, "after type in cast expression", handler)?;
        let (name, name_span) = self.expect_ident("after '.' in cast expression", handler)?;
        let target_span = ty.span.merge(dot.span);
        let target_id = self.fresh_id();
        let target = Expr::new(ExprKind::Ident(Symbol::intern(type_ref_name(&ty))), target_span, target_id);
        let span = ty.span.merge(name_span);
        let id = self.fresh_id();
        Ok(Expr::new(
            ExprKind::Dot { target: Box::new(target), name, optional: false },
            span,
            id,
        ))
    }

    fn parse_array_literal(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let open = self.expect(TokenKind::LBracket, "to start array literal", handler)?;
        let mut elements = Vec::new();
        if !self.at(TokenKind::RBracket, handler) {
            loop {
                elements.push(self.parse_expr(handler)?);
                if !self.eat(TokenKind::Comma, handler) {
                    break;
                }
                if self.at(TokenKind::RBracket, handler) {
                    let tok = self.peek(handler);
                    return Err(self.error(tok.span, "Trailing comma is not allowed in array literal"));
                }
            }
        }
        let close = self.expect(TokenKind::RBracket, "to close array literal", handler)?;
        let id = self.fresh_id();
        Ok(Expr::new(ExprKind::Array(elements), open.span.merge(close.span), id))
    }

    fn parse_object_literal(&mut self, handler: &mut Handler) -> ParseResult<Expr> {
        let open = self.expect(TokenKind::LBrace, "to start object literal", handler)?;
        let mut fields: Vec<(Symbol, Expr)> = Vec::new();
        if !self.at(TokenKind::RBrace, handler) {
            loop {
                let (name, name_span) = self.expect_ident("as object literal key", handler)?;
                if fields.iter().any(|(existing, _)| *existing == name) {
                    return Err(self.error(name_span, format!("Duplicate object literal key '{}'", name)));
                }
                self.expect(TokenKind::Colon, "after object literal key", handler)?;
                let value = self.parse_expr(handler)?;
                fields.push((name, value));
                if !self.eat(TokenKind::Comma, handler) {
                    break;
                }
                if self.at(TokenKind::RBrace, handler) {
                    let tok = self.peek(handler);
                    return Err(self.error(tok.span, "Trailing comma is not allowed in object literal"));
                }
            }
        }
        let close = self.expect(TokenKind::RBrace, "to close object literal", handler)?;
        let id = self.fresh_id();
        Ok(Expr::new(ExprKind::Object(fields), open.span.merge(close.span), id))
    }
}

fn init_span_or(expr: &Expr, fallback: Span) -> Span {
    if expr.span.is_unknown() {
        fallback
    } else {
        expr.span
    }
}

fn type_ref_name(ty: &TypeRef) -> &str {
    match &ty.kind {
        TypeRefKind::Void => "void",
        TypeRefKind::Bool => "bool",
        TypeRefKind::Int => "int",
        TypeRefKind::Float => "float",
        TypeRefKind::String => "string",
        TypeRefKind::Object => "object",
        TypeRefKind::Any => "any",
        TypeRefKind::Var => "var",
        TypeRefKind::Named(sym) => sym.as_str(),
        TypeRefKind::Pointer(inner) | TypeRefKind::Nullable(inner) => type_ref_name(inner),
    }
}

fn compound_assign_op(kind: &TokenKind) -> Option<BinOp> {
    Some(match kind {
        TokenKind::PlusEq => BinOp::Add,
        TokenKind::MinusEq => BinOp::Sub,
        TokenKind::StarEq => BinOp::Mul,
        TokenKind::SlashEq => BinOp::Div,
        TokenKind::PercentEq => BinOp::Mod,
        TokenKind::AmpEq => BinOp::BitAnd,
        TokenKind::PipeEq => BinOp::BitOr,
        TokenKind::CaretEq => BinOp::BitXor,
        TokenKind::ShlEq => BinOp::Shl,
        TokenKind::ShrEq => BinOp::Shr,
        TokenKind::Shr3Eq => BinOp::Shr3,
        TokenKind::AmpAmpEq => BinOp::And,
        TokenKind::PipePipeEq => BinOp::Or,
        TokenKind::QuestionQuestionEq => BinOp::NullCoalesce,
        _ => return None,
    })
}

/// Negate a lexed `u64` magnitude into an `i64`, handling the one value
/// (`i64::MIN`'s magnitude) that doesn't fit in `i64` when positive.
fn fold_negative_int(magnitude: u64) -> Option<i64> {
    if magnitude == i64::MIN.unsigned_abs() {
        Some(i64::MIN)
    } else if magnitude <= i64::MAX as u64 {
        Some(-(magnitude as i64))
    } else {
        None
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::Semicolon => "';'".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Assign => "'='".to_string(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escr_util::span::FileId;

    fn parse(source: &str) -> ParseResult<Program> {
        let mut handler = Handler::new();
        let mut parser = Parser::new(source, FileId::DUMMY);
        parser.parse_program(&mut handler)
    }

    #[test]
    fn parses_hello_world_call() {
        let program = parse("print(\"hi\");").unwrap();
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].kind {
            StmtKind::Expr(Expr { kind: ExprKind::Call { args, .. }, .. }) => {
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected call statement, got {other:?}"),
        }
    }

    #[test]
    fn negative_literal_folds_contiguous_minus() {
        let program = parse("var x = -1;").unwrap();
        match &program.statements[0].kind {
            StmtKind::Declare { init: Some(Expr { kind: ExprKind::Int(-1), .. }), .. } => {}
            other => panic!("expected folded Int(-1), got {other:?}"),
        }
    }

    #[test]
    fn negative_literal_min_i64_round_trips() {
        let program = parse("var x = -9223372036854775808;").unwrap();
        match &program.statements[0].kind {
            StmtKind::Declare {
                init: Some(Expr { kind: ExprKind::Int(v), .. }),
                ..
            } => assert_eq!(*v, i64::MIN),
            other => panic!("expected Int(i64::MIN), got {other:?}"),
        }
    }

    #[test]
    fn spaced_minus_does_not_fold() {
        let program = parse("var x = - 1;").unwrap();
        match &program.statements[0].kind {
            StmtKind::Declare {
                init: Some(Expr { kind: ExprKind::Unary { op: UnaryOp::Neg, .. }, .. }),
                ..
            } => {}
            other => panic!("expected Unary(Neg, Int(1)), got {other:?}"),
        }
    }

    #[test]
    fn vexatious_double_minus_splits_into_sub_and_neg() {
        let program = parse("var x = a--b;").unwrap();
        match &program.statements[0].kind {
            StmtKind::Declare {
                init: Some(Expr {
                    kind: ExprKind::Binary { op: BinOp::Sub, rhs, .. },
                    ..
                }),
                ..
            } => {
                assert!(matches!(rhs.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
            }
            other => panic!("expected a - (-b), got {other:?}"),
        }
    }

    #[test]
    fn precedence_orders_mul_before_add() {
        let program = parse("var x = 1 + 2 * 3;").unwrap();
        match &program.statements[0].kind {
            StmtKind::Declare {
                init: Some(Expr {
                    kind: ExprKind::Binary { op: BinOp::Add, rhs, .. },
                    ..
                }),
                ..
            } => {
                assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected 1 + (2 * 3), got {other:?}"),
        }
    }

    #[test]
    fn ternary_is_right_associative() {
        let program = parse("var x = a ? b : c ? d : e;").unwrap();
        match &program.statements[0].kind {
            StmtKind::Declare {
                init: Some(Expr { kind: ExprKind::Ternary { else_expr, .. }, .. }),
                ..
            } => {
                assert!(matches!(else_expr.kind, ExprKind::Ternary { .. }));
            }
            other => panic!("expected right-nested ternary, got {other:?}"),
        }
    }

    #[test]
    fn parses_if_with_guard() {
        let program = parse("if (int x = f()) { print(x); }").unwrap();
        match &program.statements[0].kind {
            StmtKind::If { cond: Condition::Guard { .. }, .. } => {}
            other => panic!("expected guarded if, got {other:?}"),
        }
    }

    #[test]
    fn parses_foreach_loop() {
        let program = parse("for (int x : xs) { print(x); }").unwrap();
        match &program.statements[0].kind {
            StmtKind::ForEach { ty: Some(_), .. } => {}
            other => panic!("expected foreach, got {other:?}"),
        }
    }

    #[test]
    fn parses_classic_for_loop() {
        let program = parse("for (int i = 0; i < 10; i++) { print(i); }").unwrap();
        match &program.statements[0].kind {
            StmtKind::For { init: Some(_), cond: Some(_), step: Some(_), .. } => {}
            other => panic!("expected classic for, got {other:?}"),
        }
    }

    #[test]
    fn parses_function_definition() {
        let program = parse("int add(int a, int b) { return a + b; }").unwrap();
        match &program.statements[0].kind {
            StmtKind::FunctionDef { params, .. } => assert_eq!(params.len(), 2),
            other => panic!("expected function def, got {other:?}"),
        }
    }

    #[test]
    fn parses_generator_definition() {
        let program = parse("int...gen() { yield 1; }").unwrap();
        match &program.statements[0].kind {
            StmtKind::GeneratorDef { .. } => {}
            other => panic!("expected generator def, got {other:?}"),
        }
    }

    #[test]
    fn parses_switch_with_default() {
        let program = parse("switch (x) { case 1: break; default: break; }").unwrap();
        match &program.statements[0].kind {
            StmtKind::Switch { clauses, .. } => assert_eq!(clauses.len(), 2),
            other => panic!("expected switch, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_default_is_an_error() {
        let err = parse("switch (x) { default: break; default: break; }").unwrap_err();
        assert!(err.message.contains("default"));
    }

    #[test]
    fn parses_try_catch_finally() {
        let program = parse("try { f(); } catch (Error e) { g(); } finally { h(); }").unwrap();
        match &program.statements[0].kind {
            StmtKind::Try { catches, finally: Some(_), .. } => assert_eq!(catches.len(), 1),
            other => panic!("expected try/catch/finally, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_call_reports_span_and_message() {
        let err = parse("print(\"hi\";").unwrap_err();
        assert!(err.message.contains("function call parameter list"));
    }

    #[test]
    fn array_literal_rejects_trailing_comma() {
        let err = parse("var x = [1, 2,];").unwrap_err();
        assert!(err.message.contains("Trailing comma"));
    }

    #[test]
    fn object_literal_rejects_duplicate_keys() {
        let err = parse("var x = {a: 1, a: 2};").unwrap_err();
        assert!(err.message.contains("Duplicate"));
    }

    #[test]
    fn named_call_argument_parses() {
        let program = parse("f(x: 1);").unwrap();
        match &program.statements[0].kind {
            StmtKind::Expr(Expr { kind: ExprKind::Call { args, .. }, .. }) => {
                assert!(matches!(args[0].kind, ExprKind::NamedArg(_, _)));
            }
            other => panic!("expected named arg call, got {other:?}"),
        }
    }

    #[test]
    fn compound_assignment_desugars_to_mutate() {
        let program = parse("x += 1;").unwrap();
        match &program.statements[0].kind {
            StmtKind::Mutate { op: BinOp::Add, .. } => {}
            other => panic!("expected mutate, got {other:?}"),
        }
    }
}
