use minicc_ir::{BinOp, Ty};
use minicc_session::span::Span;
use minicc_session::InternedStr;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Func(FuncDecl),
    Global(GlobalDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: InternedStr,
    pub span: Span,

    pub ret_ty: Ty,
    pub params: Vec<VarDecl>,
    pub body: Stmt,

    /// Frame size in bytes, filled in by semantic analysis.
    pub stacksize: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDecl {
    pub name: InternedStr,
    pub span: Span,
    pub ty: Ty,
    pub is_extern: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: InternedStr,
    pub span: Span,
    pub ty: Ty,
    pub init: Option<Expr>,

    /// Frame offset below the base pointer, filled in by semantic
    /// analysis.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDef(VarDecl),
    If {
        cond: Expr,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    For {
        init: Box<Stmt>,
        cond: Expr,
        inc: Option<Expr>,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    Return(Expr),
    Expr(Expr),
    Block(Vec<Stmt>),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,

    /// Attached by semantic analysis.
    pub ty: Option<Ty>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Num(i64),
    Str(InternedStr),

    /// An unresolved name; rewritten to `Lvar` or `Gvar` by semantic
    /// analysis.
    Ident(InternedStr),
    Lvar {
        offset: usize,
    },
    Gvar(InternedStr),

    BinOp {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    LogAnd {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    LogOr {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Call {
        name: InternedStr,
        args: Vec<Expr>,
    },

    Addr(Box<Expr>),
    Deref(Box<Expr>),
    Dot {
        expr: Box<Expr>,
        member: InternedStr,
    },

    SizeOf(Box<Expr>),
    AlignOf(Box<Expr>),

    StmtExpr(Box<Stmt>),
}
