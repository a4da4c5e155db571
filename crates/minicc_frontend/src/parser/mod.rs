#[cfg(test)]
mod tests;

mod expr;

use std::collections::HashMap;

use minicc_ir::Ty;
use minicc_session::diagnostics::prelude::*;
use minicc_session::{Interner, InternedStr};
use minicc_utils::peek::Peek;

use crate::ast::*;
use crate::lexer::TokenIter;
use crate::token::{Keyword, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Expected {
        expected: String,
        found: &'static str,
        span: Span,
    },
    BadStructDef {
        span: Span,
    },
    IncompleteType {
        tag: InternedStr,
        span: Span,
    },
}

impl IntoDiagnostic for ParseError {
    fn into_diagnostic(self, source_id: SourceId, interner: &Interner) -> Diagnostic {
        match self {
            ParseError::Expected {
                expected,
                found,
                span,
            } => Diagnostic::error()
                .with_message(format!("{expected} expected, but got {found}"))
                .at(source_id, span),

            ParseError::BadStructDef { span } => Diagnostic::error()
                .with_message("bad struct definition")
                .at(source_id, span),

            ParseError::IncompleteType { tag, span } => Diagnostic::error()
                .with_message(format!("incomplete type `{}`", interner.resolve(&tag)))
                .at(source_id, span),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: TokenIter,
    errors: Vec<ParseError>,

    /// Struct tag scopes, innermost last.
    tags: Vec<HashMap<InternedStr, Ty>>,
}

impl Parser {
    pub fn new(tokens: TokenIter) -> Self {
        Self {
            tokens,
            errors: vec![],
            tags: vec![HashMap::new()],
        }
    }

    pub fn parse(mut self) -> (Program, Vec<ParseError>) {
        let mut items = vec![];

        while !self.tokens.at_end() {
            match self.parse_toplevel() {
                Ok(item) => items.push(item),
                Err(err) => {
                    self.report(err);
                    self.seek_toplevel();
                }
            }
        }

        (Program { items }, self.errors)
    }

    fn parse_toplevel(&mut self) -> ParseResult<Item> {
        let is_extern = self.eat_keyword(Keyword::Extern);
        let ty = self.parse_type()?;
        let (name, span) = self.parse_ident()?;

        if self.eat_kind(TokenKind::LParen) {
            return self.parse_func_rest(name, span, ty).map(Item::Func);
        }

        let ty = self.read_array(ty)?;
        self.expect(TokenKind::Semicolon)?;

        Ok(Item::Global(GlobalDecl {
            name,
            span,
            ty,
            is_extern,
        }))
    }

    fn parse_func_rest(
        &mut self,
        name: InternedStr,
        span: Span,
        ret_ty: Ty,
    ) -> ParseResult<FuncDecl> {
        let mut params = vec![];
        if !self.eat_kind(TokenKind::RParen) {
            params.push(self.parse_param()?);
            while self.eat_kind(TokenKind::Comma) {
                params.push(self.parse_param()?);
            }
            self.expect(TokenKind::RParen)?;
        }

        self.expect(TokenKind::LBrace)?;
        let body = self.parse_block_rest()?;

        Ok(FuncDecl {
            name,
            span,
            ret_ty,
            params,
            body,
            stacksize: 0,
        })
    }

    /// Parse statements up to and including the closing `}`.
    fn parse_block_rest(&mut self) -> ParseResult<Stmt> {
        self.tags.push(HashMap::new());

        let mut statements = vec![];
        loop {
            if self.eat_kind(TokenKind::RBrace) {
                break;
            }
            if self.tokens.at_end() {
                self.tags.pop();
                return Err(self.error_expected_kind(TokenKind::RBrace, None));
            }
            statements.push(self.parse_stmt_or_recover());
        }

        self.tags.pop();
        Ok(Stmt::Block(statements))
    }

    fn parse_stmt_or_recover(&mut self) -> Stmt {
        match self.parse_stmt() {
            Ok(stmt) => stmt,
            Err(err) => {
                self.report(err);
                self.seek_stmt_end();
                Stmt::Null
            }
        }
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        if self.at_typename() {
            return self.parse_decl().map(Stmt::VarDef);
        }

        let token = match self.tokens.peek() {
            Some(token) => token,
            None => return Err(self.error_expected("a statement", None)),
        };

        match token.kind {
            TokenKind::Keyword(Keyword::If) => {
                self.tokens.next();
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;

                let then = Box::new(self.parse_stmt()?);
                let els = if self.eat_keyword(Keyword::Else) {
                    Some(Box::new(self.parse_stmt()?))
                } else {
                    None
                };

                Ok(Stmt::If { cond, then, els })
            }

            TokenKind::Keyword(Keyword::For) => {
                self.tokens.next();
                self.expect(TokenKind::LParen)?;

                let init = if self.eat_kind(TokenKind::Semicolon) {
                    Stmt::Null
                } else if self.at_typename() {
                    self.parse_decl().map(Stmt::VarDef)?
                } else {
                    let expr = self.parse_expr()?;
                    self.expect(TokenKind::Semicolon)?;
                    Stmt::Expr(expr)
                };

                let cond = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;

                let inc = if self.at_kind(TokenKind::RParen) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::RParen)?;

                let body = Box::new(self.parse_stmt()?);

                Ok(Stmt::For {
                    init: Box::new(init),
                    cond,
                    inc,
                    body,
                })
            }

            TokenKind::Keyword(Keyword::While) => {
                self.tokens.next();
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let body = Box::new(self.parse_stmt()?);

                // `while (c) s` is a `for` loop with empty init and inc
                Ok(Stmt::For {
                    init: Box::new(Stmt::Null),
                    cond,
                    inc: None,
                    body,
                })
            }

            TokenKind::Keyword(Keyword::Do) => {
                self.tokens.next();
                let body = Box::new(self.parse_stmt()?);
                self.expect(TokenKind::Keyword(Keyword::While))?;
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semicolon)?;

                Ok(Stmt::DoWhile { body, cond })
            }

            TokenKind::Keyword(Keyword::Return) => {
                self.tokens.next();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return(expr))
            }

            TokenKind::LBrace => {
                self.tokens.next();
                self.parse_block_rest()
            }

            TokenKind::Semicolon => {
                self.tokens.next();
                Ok(Stmt::Null)
            }

            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_decl(&mut self) -> ParseResult<VarDecl> {
        let ty = self.parse_type()?;
        let (name, span) = self.parse_ident()?;
        let ty = self.read_array(ty)?;

        let init = if self.eat_kind(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;

        Ok(VarDecl {
            name,
            span,
            ty,
            init,
            offset: 0,
        })
    }

    fn parse_param(&mut self) -> ParseResult<VarDecl> {
        let ty = self.parse_type()?;
        let (name, span) = self.parse_ident()?;

        Ok(VarDecl {
            name,
            span,
            ty,
            init: None,
            offset: 0,
        })
    }

    /// Trailing array dimensions of a declarator, e.g. `[3][5]`.
    fn read_array(&mut self, mut ty: Ty) -> ParseResult<Ty> {
        let mut lens = vec![];
        while self.eat_kind(TokenKind::LBracket) {
            let len = match self.tokens.next() {
                Some(Token {
                    kind: TokenKind::Num(n),
                    ..
                }) => n,
                other => return Err(self.error_expected("an array length", other)),
            };
            self.expect(TokenKind::RBracket)?;
            lens.push(len);
        }

        for len in lens.into_iter().rev() {
            ty = Ty::array_of(ty, len as usize);
        }
        Ok(ty)
    }

    fn parse_type(&mut self) -> ParseResult<Ty> {
        let mut ty = self.parse_base_type()?;
        while self.eat_kind(TokenKind::Mul) {
            ty = Ty::ptr_to(ty);
        }
        Ok(ty)
    }

    fn parse_base_type(&mut self) -> ParseResult<Ty> {
        match self.tokens.next() {
            Some(t) if t.kind == TokenKind::Keyword(Keyword::Int) => Ok(Ty::int_ty()),
            Some(t) if t.kind == TokenKind::Keyword(Keyword::Char) => Ok(Ty::char_ty()),
            Some(t) if t.kind == TokenKind::Keyword(Keyword::Struct) => {
                self.parse_struct_spec(t.span)
            }
            other => Err(self.error_expected("a type name", other)),
        }
    }

    fn parse_struct_spec(&mut self, struct_span: Span) -> ParseResult<Ty> {
        let tag = match self.tokens.peek() {
            Some(Token {
                kind: TokenKind::Ident(tag),
                ..
            }) => {
                self.tokens.next();
                Some(tag)
            }
            _ => None,
        };

        let members = if self.eat_kind(TokenKind::LBrace) {
            let mut members = vec![];
            while !self.eat_kind(TokenKind::RBrace) {
                let decl = self.parse_decl()?;
                members.push((decl.name, decl.ty));
            }
            Some(members)
        } else {
            None
        };

        match (tag, members) {
            (None, None) => Err(ParseError::BadStructDef { span: struct_span }),
            (tag, Some(members)) => {
                let ty = Ty::struct_of(members);
                if let Some(tag) = tag {
                    self.declare_tag(tag, ty.clone());
                }
                Ok(ty)
            }
            (Some(tag), None) => self.lookup_tag(tag).ok_or(ParseError::IncompleteType {
                tag,
                span: struct_span,
            }),
        }
    }

    fn declare_tag(&mut self, tag: InternedStr, ty: Ty) {
        if let Some(scope) = self.tags.last_mut() {
            scope.insert(tag, ty);
        }
    }

    fn lookup_tag(&self, tag: InternedStr) -> Option<Ty> {
        self.tags
            .iter()
            .rev()
            .find_map(|scope| scope.get(&tag).cloned())
    }

    fn at_typename(&self) -> bool {
        matches!(
            self.tokens.peek().map(|t| t.kind),
            Some(TokenKind::Keyword(
                Keyword::Int | Keyword::Char | Keyword::Struct
            ))
        )
    }

    fn parse_ident(&mut self) -> ParseResult<(InternedStr, Span)> {
        match self.tokens.next() {
            Some(Token {
                kind: TokenKind::Ident(name),
                span,
            }) => Ok((name, span)),
            other => Err(self.error_expected("an identifier", other)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        match self.tokens.peek() {
            Some(t) if t.kind == kind => {
                self.tokens.next();
                Ok(t)
            }
            other => Err(self.error_expected_kind(kind, other)),
        }
    }

    fn eat_kind(&mut self, kind: TokenKind) -> bool {
        match self.tokens.peek() {
            Some(t) if t.kind == kind => {
                self.tokens.next();
                true
            }
            _ => false,
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat_kind(TokenKind::Keyword(keyword))
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.tokens.peek().is_some_and(|t| t.kind == kind)
    }

    /// Skip to just past the next `;` at this nesting depth, or stop
    /// before a closing `}`.
    fn seek_stmt_end(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.tokens.peek().map(|t| t.kind) {
                None => return,
                Some(TokenKind::Semicolon) if depth == 0 => {
                    self.tokens.next();
                    return;
                }
                Some(TokenKind::RBrace) if depth == 0 => return,
                Some(TokenKind::LBrace) => {
                    depth += 1;
                    self.tokens.next();
                }
                Some(TokenKind::RBrace) => {
                    depth -= 1;
                    self.tokens.next();
                }
                Some(_) => {
                    self.tokens.next();
                }
            }
        }
    }

    /// Skip to the end of the current top-level item.
    fn seek_toplevel(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.tokens.next() {
            match token.kind {
                TokenKind::Semicolon if depth == 0 => return,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    if depth <= 1 {
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    }

    fn report(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    fn error_expected_kind(&self, kind: TokenKind, found: Option<Token>) -> ParseError {
        self.error_expected(kind.token_name(), found)
    }

    fn error_expected(&self, expected: impl Into<String>, found: Option<Token>) -> ParseError {
        match found {
            Some(token) => ParseError::Expected {
                expected: expected.into(),
                found: token.kind.token_name(),
                span: token.span,
            },
            None => ParseError::Expected {
                expected: expected.into(),
                found: "end of input",
                span: self.tokens.eof_span(),
            },
        }
    }
}
