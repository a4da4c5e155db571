use minicc_ir::{BinOp, TyKind};
use minicc_session::Interner;

use super::{ParseError, Parser};
use crate::ast::*;
use crate::lexer::Lexer;

fn parse_with(source: &str, interner: &mut Interner) -> (Program, Vec<ParseError>) {
    let lexer = Lexer::new(source, interner);
    let (tokens, lexer_errors) = lexer.lex();
    assert!(
        lexer_errors.is_empty(),
        "lexer errors in parser tests: {lexer_errors:?}"
    );

    Parser::new(tokens).parse()
}

fn parse_ok(source: &str) -> Program {
    let mut interner = Interner::new();
    let (program, errors) = parse_with(source, &mut interner);
    assert!(errors.is_empty(), "parse errors: {errors:?}");
    program
}

fn parse_errors(source: &str) -> Vec<ParseError> {
    let mut interner = Interner::new();
    let (_, errors) = parse_with(source, &mut interner);
    errors
}

fn first_func(program: &Program) -> &FuncDecl {
    program
        .items
        .iter()
        .find_map(|item| match item {
            Item::Func(func) => Some(func),
            Item::Global(_) => None,
        })
        .expect("no function in program")
}

fn body_stmts(program: &Program) -> &[Stmt] {
    match &first_func(program).body {
        Stmt::Block(stmts) => stmts,
        other => panic!("function body is not a block: {other:?}"),
    }
}

#[test]
fn return_integer() {
    let program = parse_ok("int main() { return 42; }");
    let stmts = body_stmts(&program);

    assert!(matches!(
        &stmts[..],
        [Stmt::Return(Expr {
            kind: ExprKind::Num(42),
            ..
        })]
    ));
}

#[test]
fn precedence() {
    let program = parse_ok("int main() { return 1+2*3; }");
    let [Stmt::Return(expr)] = body_stmts(&program) else {
        panic!("expected a single return");
    };

    let ExprKind::BinOp {
        op: BinOp::Add,
        lhs,
        rhs,
    } = &expr.kind
    else {
        panic!("expected addition at the top: {expr:?}");
    };
    assert!(matches!(lhs.kind, ExprKind::Num(1)));
    assert!(matches!(
        &rhs.kind,
        ExprKind::BinOp {
            op: BinOp::Mul,
            ..
        }
    ));
}

#[test]
fn greater_than_swaps_operands() {
    let program = parse_ok("int main() { return 2>1; }");
    let [Stmt::Return(expr)] = body_stmts(&program) else {
        panic!("expected a single return");
    };

    let ExprKind::BinOp {
        op: BinOp::Lt,
        lhs,
        rhs,
    } = &expr.kind
    else {
        panic!("`>` should become `<`: {expr:?}");
    };
    assert!(matches!(lhs.kind, ExprKind::Num(1)));
    assert!(matches!(rhs.kind, ExprKind::Num(2)));
}

#[test]
fn assignment_is_right_associative() {
    let program = parse_ok("int main() { a=b=1; }");
    let [Stmt::Expr(expr)] = body_stmts(&program) else {
        panic!("expected a single expression statement");
    };

    let ExprKind::Assign { lhs, rhs } = &expr.kind else {
        panic!("expected assignment: {expr:?}");
    };
    assert!(matches!(lhs.kind, ExprKind::Ident(_)));
    assert!(matches!(rhs.kind, ExprKind::Assign { .. }));
}

#[test]
fn while_desugars_to_for() {
    let program = parse_ok("int main() { while (1) return 0; }");
    let stmts = body_stmts(&program);

    let [Stmt::For {
        init, cond, inc, ..
    }] = stmts
    else {
        panic!("expected a for loop: {stmts:?}");
    };
    assert!(matches!(**init, Stmt::Null));
    assert!(matches!(cond.kind, ExprKind::Num(1)));
    assert!(inc.is_none());
}

#[test]
fn do_while() {
    let program = parse_ok("int main() { do 1; while (0); }");
    let stmts = body_stmts(&program);
    assert!(matches!(&stmts[..], [Stmt::DoWhile { .. }]));
}

#[test]
fn if_else() {
    let program = parse_ok("int main() { if (1) return 2; else return 3; }");
    let stmts = body_stmts(&program);

    let [Stmt::If { els, .. }] = stmts else {
        panic!("expected an if: {stmts:?}");
    };
    assert!(els.is_some());
}

#[test]
fn index_desugars_to_deref() {
    let program = parse_ok("int main() { return a[1]; }");
    let [Stmt::Return(expr)] = body_stmts(&program) else {
        panic!("expected a single return");
    };

    let ExprKind::Deref(inner) = &expr.kind else {
        panic!("`a[1]` should become `*(a + 1)`: {expr:?}");
    };
    assert!(matches!(
        &inner.kind,
        ExprKind::BinOp {
            op: BinOp::Add,
            ..
        }
    ));
}

#[test]
fn arrow_desugars_to_deref_dot() {
    let program = parse_ok("int main() { return p->x; }");
    let [Stmt::Return(expr)] = body_stmts(&program) else {
        panic!("expected a single return");
    };

    let ExprKind::Dot { expr: base, .. } = &expr.kind else {
        panic!("expected member access: {expr:?}");
    };
    assert!(matches!(base.kind, ExprKind::Deref(_)));
}

#[test]
fn statement_expression() {
    let program = parse_ok("int main() { return ({ 1; 2; }); }");
    let [Stmt::Return(expr)] = body_stmts(&program) else {
        panic!("expected a single return");
    };
    assert!(matches!(expr.kind, ExprKind::StmtExpr(_)));
}

#[test]
fn pointer_declaration() {
    let program = parse_ok("int main() { int *p; }");
    let [Stmt::VarDef(decl)] = body_stmts(&program) else {
        panic!("expected a declaration");
    };
    assert!(decl.ty.is_ptr());
    assert_eq!(decl.ty.size, 8);
}

#[test]
fn array_declaration() {
    let program = parse_ok("int a[2][3];");
    let [Item::Global(global)] = &program.items[..] else {
        panic!("expected a global");
    };

    // outer dimension first
    let TyKind::Array(inner, 2) = &global.ty.kind else {
        panic!("expected an array of 2: {:?}", global.ty);
    };
    assert!(matches!(inner.kind, TyKind::Array(_, 3)));
    assert_eq!(global.ty.size, 24);
}

#[test]
fn struct_definition() {
    let program = parse_ok("int main() { struct pair { int x; int y; } p; p.x = 1; }");
    let stmts = body_stmts(&program);

    let Stmt::VarDef(decl) = &stmts[0] else {
        panic!("expected a declaration: {stmts:?}");
    };
    let TyKind::Struct(members) = &decl.ty.kind else {
        panic!("expected a struct type: {:?}", decl.ty);
    };
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].offset, 0);
    assert_eq!(members[1].offset, 4);
    assert_eq!(decl.ty.size, 8);
}

#[test]
fn struct_tag_reference() {
    let program = parse_ok("int main() { struct pair { int x; int y; } a; struct pair b; }");
    let stmts = body_stmts(&program);

    let (Stmt::VarDef(a), Stmt::VarDef(b)) = (&stmts[0], &stmts[1]) else {
        panic!("expected two declarations: {stmts:?}");
    };
    assert_eq!(a.ty, b.ty);
}

#[test]
fn incomplete_struct_type() {
    let errors = parse_errors("int main() { struct nope x; }");
    assert!(errors
        .iter()
        .any(|err| matches!(err, ParseError::IncompleteType { .. })));
}

#[test]
fn bad_struct_definition() {
    let errors = parse_errors("int main() { struct *p; }");
    assert!(errors
        .iter()
        .any(|err| matches!(err, ParseError::BadStructDef { .. })));
}

#[test]
fn globals_and_extern() {
    let program = parse_ok("extern int g; int h; int main() { return 0; }");

    let [Item::Global(g), Item::Global(h), Item::Func(_)] = &program.items[..] else {
        panic!("unexpected items: {:?}", program.items);
    };
    assert!(g.is_extern);
    assert!(!h.is_extern);
}

#[test]
fn function_parameters() {
    let program = parse_ok("int f(int a, int *b) { return 0; }");
    let func = first_func(&program);

    assert_eq!(func.params.len(), 2);
    assert!(!func.params[0].ty.is_ptr());
    assert!(func.params[1].ty.is_ptr());
}

#[test]
fn call_arguments() {
    let program = parse_ok("int main() { return f(1, 2, 3); }");
    let [Stmt::Return(expr)] = body_stmts(&program) else {
        panic!("expected a single return");
    };

    let ExprKind::Call { args, .. } = &expr.kind else {
        panic!("expected a call: {expr:?}");
    };
    assert_eq!(args.len(), 3);
}

#[test]
fn missing_semicolon() {
    let errors = parse_errors("int main() { return 0 }");
    assert!(errors
        .iter()
        .any(|err| matches!(err, ParseError::Expected { expected, .. } if expected == "`;`")));
}

#[test]
fn missing_paren() {
    let errors = parse_errors("int main( { return 0; }");
    assert!(!errors.is_empty());
}

#[test]
fn recovers_and_reports_multiple_errors() {
    let errors = parse_errors("int main() { return 0 ; return ; return 1; }");
    // the malformed middle statement must not hide the good ones
    assert_eq!(errors.len(), 1);
}
