//! Semantic analysis: resolves names, attaches types, folds `sizeof` and
//! `_Alignof`, and lays out stack frames.
//!
//! The pass rewrites the AST in place: `Ident` nodes become `Lvar` or
//! `Gvar`, array-typed values decay to pointers, and every expression
//! gets its type attached. Frame offsets and the 16-byte-aligned
//! `stacksize` are assigned here; lowering only reads them.

use std::collections::HashMap;

use minicc_frontend::ast::*;
use minicc_ir::{align_to, BinOp, Ty, TyKind};
use minicc_session::diagnostics::prelude::*;
use minicc_session::{Interner, InternedStr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemaError {
    UnknownIdent { name: InternedStr, span: Span },
    NotAPointer { span: Span },
    NotAStruct { span: Span },
    UnknownMember { name: InternedStr, span: Span },
    TooManyArgs { span: Span },
    TooManyParams { span: Span },
}

impl IntoDiagnostic for SemaError {
    fn into_diagnostic(self, source_id: SourceId, interner: &Interner) -> Diagnostic {
        let (message, span) = match self {
            SemaError::UnknownIdent { name, span } => (
                format!("unknown identifier `{}`", interner.resolve(&name)),
                span,
            ),
            SemaError::NotAPointer { span } => ("operand must be a pointer".to_string(), span),
            SemaError::NotAStruct { span } => {
                ("member access on a non-struct value".to_string(), span)
            }
            SemaError::UnknownMember { name, span } => (
                format!("struct has no member `{}`", interner.resolve(&name)),
                span,
            ),
            SemaError::TooManyArgs { span } => (
                "more than 6 call arguments are not supported".to_string(),
                span,
            ),
            SemaError::TooManyParams { span } => (
                "more than 6 parameters are not supported".to_string(),
                span,
            ),
        };

        Diagnostic::error().with_message(message).at(source_id, span)
    }
}

#[derive(Clone)]
struct Var {
    ty: Ty,
    kind: VarKind,
}

#[derive(Clone, Copy)]
enum VarKind {
    Local { offset: usize },
    Global,
}

pub struct TypeChecker<'a> {
    interner: &'a Interner,

    globals: HashMap<InternedStr, Ty>,
    /// Lexical scopes of the current function, innermost last.
    scopes: Vec<HashMap<InternedStr, Var>>,
    /// Frame cursor of the current function.
    offset: usize,

    errors: Vec<SemaError>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            interner,

            globals: HashMap::new(),
            scopes: vec![],
            offset: 0,

            errors: vec![],
        }
    }

    pub fn run(mut self, program: &mut Program) -> Vec<SemaError> {
        for item in &mut program.items {
            match item {
                Item::Global(global) => {
                    self.globals.insert(global.name, global.ty.clone());
                }
                Item::Func(func) => self.check_func(func),
            }
        }

        self.errors
    }

    fn check_func(&mut self, func: &mut FuncDecl) {
        self.offset = 0;
        self.scopes.clear();
        self.scopes.push(HashMap::new());

        if func.params.len() > 6 {
            self.errors.push(SemaError::TooManyParams { span: func.span });
        }
        for param in &mut func.params {
            self.declare_local(param);
        }

        self.check_stmt(&mut func.body);

        func.stacksize = align_to(self.offset, 16);
        self.scopes.clear();
    }

    fn declare_local(&mut self, decl: &mut VarDecl) {
        self.offset = align_to(self.offset + decl.ty.size, decl.ty.align);
        decl.offset = self.offset;

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                decl.name,
                Var {
                    ty: decl.ty.clone(),
                    kind: VarKind::Local {
                        offset: decl.offset,
                    },
                },
            );
        }
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::VarDef(decl) => {
                // the variable is visible in its own initializer
                self.declare_local(decl);
                if let Some(init) = &mut decl.init {
                    self.check_expr(init, true);
                }
            }

            Stmt::If { cond, then, els } => {
                self.check_expr(cond, true);
                self.check_stmt(then);
                if let Some(els) = els {
                    self.check_stmt(els);
                }
            }

            Stmt::For {
                init,
                cond,
                inc,
                body,
            } => {
                self.check_stmt(init);
                self.check_expr(cond, true);
                if let Some(inc) = inc {
                    self.check_expr(inc, true);
                }
                self.check_stmt(body);
            }

            Stmt::DoWhile { body, cond } => {
                self.check_stmt(body);
                self.check_expr(cond, true);
            }

            Stmt::Return(expr) | Stmt::Expr(expr) => self.check_expr(expr, true),

            Stmt::Block(stmts) => {
                self.scopes.push(HashMap::new());
                for stmt in stmts {
                    self.check_stmt(stmt);
                }
                self.scopes.pop();
            }

            Stmt::Null => {}
        }
    }

    fn check_expr(&mut self, expr: &mut Expr, decay: bool) {
        // `sizeof`/`_Alignof` fold to integer constants here, so lowering
        // never sees them.
        if let ExprKind::SizeOf(inner) = &mut expr.kind {
            self.check_expr(inner, false);
            let size = inner.ty.as_ref().map_or(0, |ty| ty.size);
            expr.kind = ExprKind::Num(size as i64);
            expr.ty = Some(Ty::int_ty());
            return;
        }
        if let ExprKind::AlignOf(inner) = &mut expr.kind {
            self.check_expr(inner, false);
            let align = inner.ty.as_ref().map_or(0, |ty| ty.align);
            expr.kind = ExprKind::Num(align as i64);
            expr.ty = Some(Ty::int_ty());
            return;
        }

        if let ExprKind::Ident(name) = &expr.kind {
            let name = *name;
            match self.lookup(name) {
                Some(Var {
                    ty,
                    kind: VarKind::Local { offset },
                }) => {
                    expr.kind = ExprKind::Lvar { offset };
                    expr.ty = Some(ty);
                }
                Some(Var {
                    ty,
                    kind: VarKind::Global,
                }) => {
                    expr.kind = ExprKind::Gvar(name);
                    expr.ty = Some(ty);
                }
                None => {
                    self.errors.push(SemaError::UnknownIdent {
                        name,
                        span: expr.span,
                    });
                    expr.ty = Some(Ty::int_ty());
                }
            }

            if decay {
                Self::maybe_decay(expr);
            }
            return;
        }

        let ty = match &mut expr.kind {
            ExprKind::Num(_) => Some(Ty::int_ty()),

            ExprKind::Str(s) => {
                let len = self.interner.resolve(s).len() + 1;
                Some(Ty::array_of(Ty::char_ty(), len))
            }

            // already resolved
            ExprKind::Lvar { .. } | ExprKind::Gvar(_) => expr.ty.clone(),

            ExprKind::BinOp { op, lhs, rhs } => {
                self.check_expr(lhs, true);
                self.check_expr(rhs, true);
                match op {
                    BinOp::Lt | BinOp::Eq | BinOp::Ne => Some(Ty::int_ty()),
                    _ => lhs.ty.clone(),
                }
            }

            ExprKind::Assign { lhs, rhs } => {
                self.check_expr(lhs, false);
                self.check_expr(rhs, true);
                lhs.ty.clone()
            }

            ExprKind::LogAnd { lhs, rhs } | ExprKind::LogOr { lhs, rhs } => {
                self.check_expr(lhs, true);
                self.check_expr(rhs, true);
                Some(Ty::int_ty())
            }

            ExprKind::Call { args, .. } => {
                for arg in args.iter_mut() {
                    self.check_expr(arg, true);
                }
                if args.len() > 6 {
                    self.errors.push(SemaError::TooManyArgs { span: expr.span });
                }
                Some(Ty::int_ty())
            }

            ExprKind::Addr(inner) => {
                self.check_expr(inner, false);
                inner.ty.clone().map(Ty::ptr_to)
            }

            ExprKind::Deref(inner) => {
                self.check_expr(inner, true);
                match inner.ty.as_ref().map(|ty| &ty.kind) {
                    Some(TyKind::Ptr(base)) => Some((**base).clone()),
                    _ => {
                        self.errors.push(SemaError::NotAPointer { span: expr.span });
                        Some(Ty::int_ty())
                    }
                }
            }

            ExprKind::Dot { expr: base, member } => {
                self.check_expr(base, true);
                let member = *member;

                match base.ty.as_ref().map(|ty| &ty.kind) {
                    Some(TyKind::Struct(members)) => {
                        match members.iter().find(|m| m.name == member) {
                            Some(m) => Some(m.ty.clone()),
                            None => {
                                self.errors.push(SemaError::UnknownMember {
                                    name: member,
                                    span: expr.span,
                                });
                                Some(Ty::int_ty())
                            }
                        }
                    }
                    _ => {
                        self.errors.push(SemaError::NotAStruct { span: expr.span });
                        Some(Ty::int_ty())
                    }
                }
            }

            ExprKind::StmtExpr(body) => {
                self.check_stmt(body);
                Some(Ty::int_ty())
            }

            // handled before the match
            ExprKind::Ident(_) | ExprKind::SizeOf(_) | ExprKind::AlignOf(_) => return,
        };

        expr.ty = ty;

        if decay {
            Self::maybe_decay(expr);
        }
    }

    /// In value contexts an array turns into a pointer to its first
    /// element. This is what makes `a[i]` pointer arithmetic work.
    fn maybe_decay(expr: &mut Expr) {
        if !matches!(
            expr.kind,
            ExprKind::Lvar { .. } | ExprKind::Gvar(_) | ExprKind::Dot { .. }
        ) {
            return;
        }

        let Some(ty) = &expr.ty else { return };
        let TyKind::Array(base, _) = &ty.kind else {
            return;
        };

        let ptr_ty = Ty::ptr_to((**base).clone());
        let span = expr.span;
        let inner = std::mem::replace(expr, Expr::new(ExprKind::Num(0), span));
        *expr = Expr {
            kind: ExprKind::Addr(Box::new(inner)),
            span,
            ty: Some(ptr_ty),
        };
    }

    fn lookup(&self, name: InternedStr) -> Option<Var> {
        for scope in self.scopes.iter().rev() {
            if let Some(var) = scope.get(&name) {
                return Some(var.clone());
            }
        }

        self.globals.get(&name).map(|ty| Var {
            ty: ty.clone(),
            kind: VarKind::Global,
        })
    }
}
