use minicc_ir::BinOp;
use minicc_utils::peek::Peek;

use super::{ParseResult, Parser};
use crate::ast::*;
use crate::token::{Keyword, Token, TokenKind};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest,

    LogicalOr,
    LogicalAnd,

    Equality,
    Comparison,

    Term,
    Factor,
}

#[derive(Clone, Copy)]
enum InfixOp {
    Bin(BinOp),
    /// `a > b` is parsed as `b < a`; `>=` and `<=` do not exist.
    Swapped(BinOp),
    LogAnd,
    LogOr,
}

fn infix_prec(op: InfixOp) -> Prec {
    match op {
        InfixOp::LogOr => Prec::LogicalOr,
        InfixOp::LogAnd => Prec::LogicalAnd,
        InfixOp::Swapped(_) => Prec::Comparison,
        InfixOp::Bin(BinOp::Eq | BinOp::Ne) => Prec::Equality,
        InfixOp::Bin(BinOp::Lt) => Prec::Comparison,
        InfixOp::Bin(BinOp::Add | BinOp::Sub) => Prec::Term,
        InfixOp::Bin(BinOp::Mul | BinOp::Div) => Prec::Factor,
    }
}

impl Parser {
    /// Full expression. Assignment is the lowest-precedence level and is
    /// right-associative.
    pub(crate) fn parse_expr(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_prec(Prec::Lowest)?;

        if self.eat_kind(TokenKind::Assign) {
            let rhs = self.parse_expr()?;
            let span = lhs.span.union(rhs.span);
            return Ok(Expr::new(
                ExprKind::Assign {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            ));
        }

        Ok(lhs)
    }

    fn parse_prec(&mut self, in_prec: Prec) -> ParseResult<Expr> {
        let mut expr = self.parse_unary()?;

        while let Some(op) = self.peek_infix_op(in_prec) {
            self.tokens.next();

            let rhs = self.parse_prec(infix_prec(op))?;
            let span = expr.span.union(rhs.span);

            let kind = match op {
                InfixOp::Bin(op) => ExprKind::BinOp {
                    op,
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                },
                InfixOp::Swapped(op) => ExprKind::BinOp {
                    op,
                    lhs: Box::new(rhs),
                    rhs: Box::new(expr),
                },
                InfixOp::LogAnd => ExprKind::LogAnd {
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                },
                InfixOp::LogOr => ExprKind::LogOr {
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                },
            };
            expr = Expr::new(kind, span);
        }

        Ok(expr)
    }

    fn peek_infix_op(&self, in_prec: Prec) -> Option<InfixOp> {
        let op = match self.tokens.peek().map(|t| t.kind)? {
            TokenKind::OrOr => InfixOp::LogOr,
            TokenKind::AndAnd => InfixOp::LogAnd,

            TokenKind::EqEq => InfixOp::Bin(BinOp::Eq),
            TokenKind::NotEq => InfixOp::Bin(BinOp::Ne),

            TokenKind::Lt => InfixOp::Bin(BinOp::Lt),
            TokenKind::Gt => InfixOp::Swapped(BinOp::Lt),

            TokenKind::Add => InfixOp::Bin(BinOp::Add),
            TokenKind::Sub => InfixOp::Bin(BinOp::Sub),
            TokenKind::Mul => InfixOp::Bin(BinOp::Mul),
            TokenKind::Div => InfixOp::Bin(BinOp::Div),

            _ => return None,
        };

        (infix_prec(op) > in_prec).then_some(op)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let token = match self.tokens.peek() {
            Some(token) => token,
            None => return self.parse_postfix(),
        };

        match token.kind {
            TokenKind::Mul => {
                self.tokens.next();
                let expr = self.parse_prec(Prec::Term)?;
                let span = token.span.union(expr.span);
                Ok(Expr::new(ExprKind::Deref(Box::new(expr)), span))
            }

            TokenKind::Amp => {
                self.tokens.next();
                let expr = self.parse_prec(Prec::Term)?;
                let span = token.span.union(expr.span);
                Ok(Expr::new(ExprKind::Addr(Box::new(expr)), span))
            }

            TokenKind::Keyword(Keyword::Sizeof) => {
                self.tokens.next();
                let expr = self.parse_unary()?;
                let span = token.span.union(expr.span);
                Ok(Expr::new(ExprKind::SizeOf(Box::new(expr)), span))
            }

            TokenKind::Keyword(Keyword::Alignof) => {
                self.tokens.next();
                let expr = self.parse_unary()?;
                let span = token.span.union(expr.span);
                Ok(Expr::new(ExprKind::AlignOf(Box::new(expr)), span))
            }

            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.eat_kind(TokenKind::Dot) {
                let (member, member_span) = self.parse_ident()?;
                let span = expr.span.union(member_span);
                expr = Expr::new(
                    ExprKind::Dot {
                        expr: Box::new(expr),
                        member,
                    },
                    span,
                );
            } else if self.eat_kind(TokenKind::Arrow) {
                // `a->m` is `(*a).m`
                let (member, member_span) = self.parse_ident()?;
                let span = expr.span.union(member_span);
                let deref = Expr::new(ExprKind::Deref(Box::new(expr)), span);
                expr = Expr::new(
                    ExprKind::Dot {
                        expr: Box::new(deref),
                        member,
                    },
                    span,
                );
            } else if self.eat_kind(TokenKind::LBracket) {
                // `a[i]` is `*(a + i)`
                let index = self.parse_expr()?;
                let close = self.expect(TokenKind::RBracket)?;
                let span = expr.span.union(close.span);
                let sum = Expr::new(
                    ExprKind::BinOp {
                        op: BinOp::Add,
                        lhs: Box::new(expr),
                        rhs: Box::new(index),
                    },
                    span,
                );
                expr = Expr::new(ExprKind::Deref(Box::new(sum)), span);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.tokens.next() {
            Some(t) if t.kind == TokenKind::LParen => {
                // GNU statement expression
                if self.eat_kind(TokenKind::LBrace) {
                    let body = self.parse_block_rest()?;
                    let close = self.expect(TokenKind::RParen)?;
                    let span = t.span.union(close.span);
                    return Ok(Expr::new(ExprKind::StmtExpr(Box::new(body)), span));
                }

                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }

            Some(Token {
                kind: TokenKind::Num(n),
                span,
            }) => Ok(Expr::new(ExprKind::Num(n), span)),

            Some(Token {
                kind: TokenKind::Str(s),
                span,
            }) => Ok(Expr::new(ExprKind::Str(s), span)),

            Some(Token {
                kind: TokenKind::Ident(name),
                span,
            }) => {
                if !self.eat_kind(TokenKind::LParen) {
                    return Ok(Expr::new(ExprKind::Ident(name), span));
                }

                let mut args = vec![];
                if !self.eat_kind(TokenKind::RParen) {
                    args.push(self.parse_expr()?);
                    while self.eat_kind(TokenKind::Comma) {
                        args.push(self.parse_expr()?);
                    }
                    self.expect(TokenKind::RParen)?;
                }

                Ok(Expr::new(ExprKind::Call { name, args }, span))
            }

            other => Err(self.error_expected("an expression", other)),
        }
    }
}
