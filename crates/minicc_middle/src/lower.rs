//! Lowering from the analyzed AST to the three-address IR.
//!
//! Each function is lowered with a fresh virtual register counter
//! (starting at 1), while the label counter is shared across the whole
//! program so labels are globally unique. Every virtual register is
//! explicitly killed after its last use; the register allocator relies
//! on these kill markers instead of a liveness analysis.

use minicc_frontend::ast::*;
use minicc_ir::ir::{Function, Inst, Label, Reg};
use minicc_ir::{BinOp, TyKind};
use minicc_session::diagnostics::prelude::*;
use minicc_session::Interner;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    #[error("not an lvalue")]
    NotAnLvalue { span: Span },

    #[error("{construct} are not supported in code generation")]
    Unsupported {
        construct: &'static str,
        span: Span,
    },
}

impl LowerError {
    fn span(&self) -> Span {
        match self {
            LowerError::NotAnLvalue { span } | LowerError::Unsupported { span, .. } => *span,
        }
    }
}

impl IntoDiagnostic for LowerError {
    fn into_diagnostic(self, source_id: SourceId, _interner: &Interner) -> Diagnostic {
        let span = self.span();
        Diagnostic::error()
            .with_message(self.to_string())
            .at(source_id, span)
    }
}

pub type LowerResult<T> = Result<T, LowerError>;

/// Lower every function of the program.
pub fn lower(program: &Program) -> LowerResult<Vec<Function>> {
    let mut nlabel = 0;
    let mut functions = vec![];

    for item in &program.items {
        let Item::Func(func) = item else { continue };
        functions.push(Lowerer::new(&mut nlabel).run(func)?);
    }

    Ok(functions)
}

struct Lowerer<'a> {
    code: Vec<Inst>,
    nreg: u32,
    nlabel: &'a mut u32,
}

impl<'a> Lowerer<'a> {
    fn new(nlabel: &'a mut u32) -> Self {
        Self {
            code: vec![],
            nreg: 1,
            nlabel,
        }
    }

    fn run(mut self, func: &FuncDecl) -> LowerResult<Function> {
        for (index, param) in func.params.iter().enumerate() {
            let inst = if param.ty.is_ptr() {
                Inst::Store64Arg {
                    offset: param.offset,
                    index,
                }
            } else {
                Inst::Store32Arg {
                    offset: param.offset,
                    index,
                }
            };
            self.add(inst);
        }

        self.gen_stmt(&func.body)?;

        Ok(Function {
            name: func.name,
            stacksize: func.stacksize,
            ir: self.code,
            nreg: self.nreg,
        })
    }

    fn new_reg(&mut self) -> Reg {
        let reg = Reg(self.nreg);
        self.nreg += 1;
        reg
    }

    fn new_label(&mut self) -> Label {
        let label = Label(*self.nlabel);
        *self.nlabel += 1;
        label
    }

    fn add(&mut self, inst: Inst) {
        self.code.push(inst);
    }

    fn kill(&mut self, reg: Reg) {
        self.add(Inst::Kill(reg));
    }

    fn label(&mut self, label: Label) {
        self.add(Inst::Label(label));
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> LowerResult<()> {
        match stmt {
            Stmt::VarDef(decl) => {
                let Some(init) = &decl.init else {
                    return Ok(());
                };

                let rhs = self.gen_expr(init)?;
                let lhs = self.new_reg();
                self.add(Inst::LoadBase(lhs));
                self.add(Inst::SubImm(lhs, decl.offset as i64));
                if decl.ty.is_ptr() {
                    self.add(Inst::Store64(lhs, rhs));
                } else {
                    self.add(Inst::Store32(lhs, rhs));
                }
                self.kill(lhs);
                self.kill(rhs);
                Ok(())
            }

            Stmt::If { cond, then, els } => {
                if let Some(els) = els {
                    let x = self.new_label();
                    let y = self.new_label();

                    let r = self.gen_expr(cond)?;
                    self.add(Inst::Unless(r, x));
                    self.kill(r);

                    self.gen_stmt(then)?;
                    self.add(Inst::Jmp(y));

                    self.label(x);
                    self.gen_stmt(els)?;
                    self.label(y);
                    return Ok(());
                }

                let x = self.new_label();
                let r = self.gen_expr(cond)?;
                self.add(Inst::Unless(r, x));
                self.kill(r);
                self.gen_stmt(then)?;
                self.label(x);
                Ok(())
            }

            Stmt::For {
                init,
                cond,
                inc,
                body,
            } => {
                let x = self.new_label();
                let y = self.new_label();

                self.gen_stmt(init)?;
                self.label(x);

                let r = self.gen_expr(cond)?;
                self.add(Inst::Unless(r, y));
                self.kill(r);

                self.gen_stmt(body)?;

                if let Some(inc) = inc {
                    let r = self.gen_expr(inc)?;
                    self.kill(r);
                }

                self.add(Inst::Jmp(x));
                self.label(y);
                Ok(())
            }

            Stmt::DoWhile { body, cond } => {
                let x = self.new_label();
                let y = self.new_label();

                self.label(x);
                self.gen_stmt(body)?;

                let r = self.gen_expr(cond)?;
                self.add(Inst::Unless(r, y));
                self.kill(r);
                self.add(Inst::Jmp(x));
                self.label(y);
                Ok(())
            }

            Stmt::Return(expr) => {
                let r = self.gen_expr(expr)?;
                self.add(Inst::Return(r));
                self.kill(r);
                Ok(())
            }

            Stmt::Expr(expr) => {
                let r = self.gen_expr(expr)?;
                self.kill(r);
                Ok(())
            }

            Stmt::Block(stmts) => {
                for stmt in stmts {
                    self.gen_stmt(stmt)?;
                }
                Ok(())
            }

            Stmt::Null => Ok(()),
        }
    }

    fn gen_expr(&mut self, expr: &Expr) -> LowerResult<Reg> {
        match &expr.kind {
            ExprKind::Num(val) => {
                let r = self.new_reg();
                self.add(Inst::Imm(r, *val));
                Ok(r)
            }

            ExprKind::LogAnd { lhs, rhs } => {
                let x = self.new_label();

                let r1 = self.gen_expr(lhs)?;
                self.add(Inst::Unless(r1, x));

                let r2 = self.gen_expr(rhs)?;
                self.add(Inst::Mov(r1, r2));
                self.kill(r2);
                self.add(Inst::Unless(r1, x));
                self.add(Inst::Imm(r1, 1));

                self.label(x);
                Ok(r1)
            }

            ExprKind::LogOr { lhs, rhs } => {
                let x = self.new_label();
                let y = self.new_label();

                let r1 = self.gen_expr(lhs)?;
                self.add(Inst::Unless(r1, x));
                self.add(Inst::Imm(r1, 1));
                self.add(Inst::Jmp(y));

                self.label(x);
                let r2 = self.gen_expr(rhs)?;
                self.add(Inst::Mov(r1, r2));
                self.kill(r2);
                self.add(Inst::Unless(r1, y));
                self.add(Inst::Imm(r1, 1));

                self.label(y);
                Ok(r1)
            }

            ExprKind::Lvar { .. } => {
                let r = self.gen_lval(expr)?;
                if ty_is_ptr(expr) {
                    self.add(Inst::Load64(r, r));
                } else {
                    self.add(Inst::Load32(r, r));
                }
                Ok(r)
            }

            ExprKind::Call { name, args } => {
                let mut arg_regs = Vec::with_capacity(args.len());
                for arg in args {
                    arg_regs.push(self.gen_expr(arg)?);
                }

                let dst = self.new_reg();
                self.add(Inst::Call {
                    dst,
                    name: *name,
                    args: arg_regs.clone(),
                });

                for reg in arg_regs {
                    self.kill(reg);
                }
                Ok(dst)
            }

            ExprKind::Addr(inner) => self.gen_lval(inner),

            ExprKind::Deref(inner) => {
                let r = self.gen_expr(inner)?;
                self.add(Inst::Load64(r, r));
                Ok(r)
            }

            ExprKind::Assign { lhs, rhs } => {
                let rhs_reg = self.gen_expr(rhs)?;
                let lhs_reg = self.gen_lval(lhs)?;
                if ty_is_ptr(lhs) {
                    self.add(Inst::Store64(lhs_reg, rhs_reg));
                } else {
                    self.add(Inst::Store32(lhs_reg, rhs_reg));
                }
                self.kill(rhs_reg);
                // the value of an assignment is the address register
                Ok(lhs_reg)
            }

            ExprKind::BinOp {
                op: op @ (BinOp::Add | BinOp::Sub),
                lhs,
                rhs,
            } => {
                if !ty_is_ptr(lhs) {
                    return self.gen_binop(*op, lhs, rhs);
                }

                // pointer arithmetic: scale the integer operand by the
                // pointee size
                let rhs_reg = self.gen_expr(rhs)?;
                let scale = self.new_reg();
                self.add(Inst::Imm(scale, pointee_size(lhs) as i64));
                self.add(Inst::Mul(rhs_reg, scale));
                self.kill(scale);

                let lhs_reg = self.gen_expr(lhs)?;
                self.add(binop_inst(*op, lhs_reg, rhs_reg));
                self.kill(rhs_reg);
                Ok(lhs_reg)
            }

            ExprKind::BinOp {
                op: op @ (BinOp::Mul | BinOp::Div | BinOp::Lt),
                lhs,
                rhs,
            } => self.gen_binop(*op, lhs, rhs),

            ExprKind::BinOp {
                op: BinOp::Eq | BinOp::Ne,
                ..
            } => Err(LowerError::Unsupported {
                construct: "equality operators",
                span: expr.span,
            }),

            ExprKind::Str(_) => Err(LowerError::Unsupported {
                construct: "string literals",
                span: expr.span,
            }),

            ExprKind::Gvar(_) => Err(LowerError::Unsupported {
                construct: "global variables",
                span: expr.span,
            }),

            ExprKind::Dot { .. } => Err(LowerError::Unsupported {
                construct: "struct member accesses",
                span: expr.span,
            }),

            ExprKind::StmtExpr(_) => Err(LowerError::Unsupported {
                construct: "statement expressions",
                span: expr.span,
            }),

            ExprKind::Ident(_) | ExprKind::SizeOf(_) | ExprKind::AlignOf(_) => {
                Err(LowerError::Unsupported {
                    construct: "unanalyzed expressions",
                    span: expr.span,
                })
            }
        }
    }

    /// `r1 = op(r1, r2)`; the right operand's register is released.
    fn gen_binop(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> LowerResult<Reg> {
        let r1 = self.gen_expr(lhs)?;
        let r2 = self.gen_expr(rhs)?;
        self.add(binop_inst(op, r1, r2));
        self.kill(r2);
        Ok(r1)
    }

    /// The address of an lvalue, in a fresh register.
    fn gen_lval(&mut self, expr: &Expr) -> LowerResult<Reg> {
        match &expr.kind {
            ExprKind::Deref(inner) => self.gen_expr(inner),

            ExprKind::Lvar { offset } => {
                let r = self.new_reg();
                self.add(Inst::LoadBase(r));
                self.add(Inst::SubImm(r, *offset as i64));
                Ok(r)
            }

            ExprKind::Gvar(_) => Err(LowerError::Unsupported {
                construct: "global variables",
                span: expr.span,
            }),

            ExprKind::Dot { .. } => Err(LowerError::Unsupported {
                construct: "struct member accesses",
                span: expr.span,
            }),

            _ => Err(LowerError::NotAnLvalue { span: expr.span }),
        }
    }
}

fn binop_inst(op: BinOp, lhs: Reg, rhs: Reg) -> Inst {
    match op {
        BinOp::Add => Inst::Add(lhs, rhs),
        BinOp::Sub => Inst::Sub(lhs, rhs),
        BinOp::Mul => Inst::Mul(lhs, rhs),
        BinOp::Div => Inst::Div(lhs, rhs),
        BinOp::Lt => Inst::Lt(lhs, rhs),
        // rejected before reaching here
        BinOp::Eq | BinOp::Ne => Inst::Nop,
    }
}

fn ty_is_ptr(expr: &Expr) -> bool {
    matches!(&expr.ty, Some(ty) if ty.is_ptr())
}

fn pointee_size(expr: &Expr) -> usize {
    match expr.ty.as_ref().map(|ty| &ty.kind) {
        Some(TyKind::Ptr(base)) => base.size,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use minicc_session::Interner;

    use super::*;
    use crate::type_check::TypeChecker;

    fn lower_source(source: &str) -> LowerResult<Vec<Function>> {
        let mut interner = Interner::new();
        let (tokens, lexer_errors) = minicc_frontend::lex(source, &mut interner);
        assert!(lexer_errors.is_empty(), "lexer errors: {lexer_errors:?}");

        let (mut program, parse_errors) = minicc_frontend::parse(tokens);
        assert!(parse_errors.is_empty(), "parse errors: {parse_errors:?}");

        let sema_errors = TypeChecker::new(&interner).run(&mut program);
        assert!(sema_errors.is_empty(), "sema errors: {sema_errors:?}");

        lower(&program)
    }

    fn lower_one(source: &str) -> Function {
        let mut functions = lower_source(source).expect("lowering failed");
        assert_eq!(functions.len(), 1);
        functions.remove(0)
    }

    #[test]
    fn constant_return() {
        let func = lower_one("int main() { return 42; }");

        assert_eq!(
            func.ir,
            vec![
                Inst::Imm(Reg(1), 42),
                Inst::Return(Reg(1)),
                Inst::Kill(Reg(1)),
            ]
        );
        assert_eq!(func.nreg, 2);
        assert_eq!(func.stacksize, 0);
    }

    #[test]
    fn binop_registers_and_kills() {
        let func = lower_one("int main() { return 1+2*3; }");

        // the multiplicand's register dies before the addition
        assert_eq!(
            func.ir,
            vec![
                Inst::Imm(Reg(1), 1),
                Inst::Imm(Reg(2), 2),
                Inst::Imm(Reg(3), 3),
                Inst::Mul(Reg(2), Reg(3)),
                Inst::Kill(Reg(3)),
                Inst::Add(Reg(1), Reg(2)),
                Inst::Kill(Reg(2)),
                Inst::Return(Reg(1)),
                Inst::Kill(Reg(1)),
            ]
        );
        assert_eq!(func.nreg, 4);
    }

    #[test]
    fn local_variables() {
        let func = lower_one("int main() { int a=3; int b=5; return a+b; }");

        let stores: Vec<_> = func
            .ir
            .iter()
            .filter(|inst| matches!(inst, Inst::Store32(..)))
            .collect();
        assert_eq!(stores.len(), 2);

        let sub_imms: Vec<i64> = func
            .ir
            .iter()
            .filter_map(|inst| match inst {
                Inst::SubImm(_, offset) => Some(*offset),
                _ => None,
            })
            .collect();
        // two distinct slots, each addressed twice (store + load)
        assert_eq!(sub_imms, vec![4, 8, 4, 8]);

        let loads = func
            .ir
            .iter()
            .filter(|inst| matches!(inst, Inst::Load32(..)))
            .count();
        assert_eq!(loads, 2);
        assert_eq!(func.stacksize, 16);
    }

    #[test]
    fn pointer_variable_uses_64_bit_moves() {
        let func = lower_one("int main() { int a=3; int *p=&a; return *p; }");

        assert!(func.ir.iter().any(|inst| matches!(inst, Inst::Store64(..))));
        assert!(func.ir.iter().any(|inst| matches!(inst, Inst::Load64(..))));
    }

    #[test]
    fn if_statement() {
        let func = lower_one("int main() { if (1<2) return 3; return 4; }");

        let unlesses = func
            .ir
            .iter()
            .filter(|inst| matches!(inst, Inst::Unless(..)))
            .count();
        let labels = func
            .ir
            .iter()
            .filter(|inst| matches!(inst, Inst::Label(_)))
            .count();
        assert_eq!(unlesses, 1);
        assert_eq!(labels, 1);

        // the branch is emitted before its target label
        let unless_pos = func
            .ir
            .iter()
            .position(|inst| matches!(inst, Inst::Unless(..)))
            .expect("no unless");
        let label_pos = func
            .ir
            .iter()
            .position(|inst| matches!(inst, Inst::Label(_)))
            .expect("no label");
        assert!(unless_pos < label_pos);
    }

    #[test]
    fn if_else_statement() {
        let func = lower_one("int main() { if (1) return 2; else return 3; }");

        assert_eq!(
            func.ir
                .iter()
                .filter(|inst| matches!(inst, Inst::Label(_)))
                .count(),
            2
        );
        assert_eq!(
            func.ir
                .iter()
                .filter(|inst| matches!(inst, Inst::Jmp(_)))
                .count(),
            1
        );
        // the condition is evaluated exactly once
        assert_eq!(
            func.ir
                .iter()
                .filter(|inst| matches!(inst, Inst::Unless(..)))
                .count(),
            1
        );
    }

    #[test]
    fn for_loop() {
        let func =
            lower_one("int main() { int i=0; int s=0; for (i=0; i<10; i=i+1) s=s+i; return s; }");

        // head and exit labels, a conditional exit and a back jump
        assert_eq!(
            func.ir
                .iter()
                .filter(|inst| matches!(inst, Inst::Label(_)))
                .count(),
            2
        );
        assert_eq!(
            func.ir
                .iter()
                .filter(|inst| matches!(inst, Inst::Unless(_, Label(1))))
                .count(),
            1
        );
        assert_eq!(
            func.ir
                .iter()
                .filter(|inst| matches!(inst, Inst::Jmp(Label(0))))
                .count(),
            1
        );

        // head label comes before the condition's branch
        let head = func
            .ir
            .iter()
            .position(|inst| matches!(inst, Inst::Label(Label(0))))
            .expect("no head label");
        let unless = func
            .ir
            .iter()
            .position(|inst| matches!(inst, Inst::Unless(..)))
            .expect("no unless");
        assert!(head < unless);
    }

    #[test]
    fn do_while_loops_back() {
        let func = lower_one("int main() { int i=0; do i=i+1; while (i<3); return i; }");

        let body_label = func
            .ir
            .iter()
            .position(|inst| matches!(inst, Inst::Label(Label(0))))
            .expect("no body label");
        let back_jump = func
            .ir
            .iter()
            .position(|inst| matches!(inst, Inst::Jmp(Label(0))))
            .expect("no back jump");
        assert!(body_label < back_jump);

        // the exit branch tests the condition, not the body
        assert!(func
            .ir
            .iter()
            .any(|inst| matches!(inst, Inst::Unless(_, Label(1)))));
    }

    #[test]
    fn argument_homing() {
        let functions =
            lower_source("int f(int a, int b, int *p) { return a; } int main() { return 0; }")
                .expect("lowering failed");
        let f = &functions[0];

        assert_eq!(
            f.ir[..3],
            [
                Inst::Store32Arg {
                    offset: 4,
                    index: 0
                },
                Inst::Store32Arg {
                    offset: 8,
                    index: 1
                },
                Inst::Store64Arg {
                    offset: 16,
                    index: 2
                },
            ]
        );
    }

    #[test]
    fn call_with_arguments() {
        let func = lower_one("int main() { return f(1, 2, 3); }");

        let call = func
            .ir
            .iter()
            .find_map(|inst| match inst {
                Inst::Call { dst, args, .. } => Some((dst, args)),
                _ => None,
            })
            .expect("no call");

        assert_eq!(call.1, &vec![Reg(1), Reg(2), Reg(3)]);
        assert_eq!(*call.0, Reg(4));

        // every argument register is killed after the call
        let call_pos = func
            .ir
            .iter()
            .position(|inst| matches!(inst, Inst::Call { .. }))
            .expect("no call");
        for reg in [Reg(1), Reg(2), Reg(3)] {
            let kill_pos = func
                .ir
                .iter()
                .position(|inst| *inst == Inst::Kill(reg))
                .expect("argument not killed");
            assert!(kill_pos > call_pos);
        }
    }

    #[test]
    fn pointer_arithmetic_scales_by_pointee_size() {
        let func = lower_one("int main() { int a[2]; return *(a+1); }");

        // the index is multiplied by sizeof(int)
        let imm4 = func
            .ir
            .iter()
            .position(|inst| matches!(inst, Inst::Imm(_, 4)))
            .expect("no scale constant");
        let mul = func
            .ir
            .iter()
            .position(|inst| matches!(inst, Inst::Mul(..)))
            .expect("no multiply");
        assert!(imm4 < mul);
    }

    #[test]
    fn logical_and_short_circuits() {
        let func = lower_one("int main() { return 1 && 2; }");

        assert_eq!(
            func.ir
                .iter()
                .filter(|inst| matches!(inst, Inst::Unless(..)))
                .count(),
            2
        );
        assert_eq!(
            func.ir
                .iter()
                .filter(|inst| matches!(inst, Inst::Label(_)))
                .count(),
            1
        );
        assert!(func.ir.iter().any(|inst| matches!(inst, Inst::Mov(..))));
    }

    #[test]
    fn logical_or_short_circuits() {
        let func = lower_one("int main() { return 0 || 2; }");

        assert_eq!(
            func.ir
                .iter()
                .filter(|inst| matches!(inst, Inst::Label(_)))
                .count(),
            2
        );
        assert_eq!(
            func.ir
                .iter()
                .filter(|inst| matches!(inst, Inst::Jmp(_)))
                .count(),
            1
        );
    }

    #[test]
    fn labels_are_unique_across_functions() {
        let functions = lower_source(
            "int f() { if (1) return 2; return 3; } int main() { if (1) return 4; return 5; }",
        )
        .expect("lowering failed");

        let mut labels = vec![];
        for func in &functions {
            for inst in &func.ir {
                if let Inst::Label(label) = inst {
                    labels.push(*label);
                }
            }
        }

        assert_eq!(labels, vec![Label(0), Label(1)]);
    }

    #[test]
    fn branch_targets_are_defined_locally() {
        let functions = lower_source(
            "int f(int n) { for (n=0; n<3; n=n+1) if (n) n=n; return n; } \
             int main() { do 1; while (0); return 1 || 0; }",
        )
        .expect("lowering failed");

        for func in &functions {
            let defined: Vec<Label> = func
                .ir
                .iter()
                .filter_map(|inst| match inst {
                    Inst::Label(label) => Some(*label),
                    _ => None,
                })
                .collect();

            for inst in &func.ir {
                let target = match inst {
                    Inst::Jmp(label) | Inst::Unless(_, label) => *label,
                    _ => continue,
                };
                assert!(
                    defined.contains(&target),
                    "branch to {target} has no label in the same function"
                );
            }
        }
    }

    #[test]
    fn assignment_value_is_the_address_register() {
        let func = lower_one("int main() { int a; a = 1; return a; }");

        // the store writes the constant through the address register, and
        // the statement kills both registers afterwards
        let store = func
            .ir
            .iter()
            .position(|inst| matches!(inst, Inst::Store32(..)))
            .expect("no store");
        assert!(matches!(func.ir[store], Inst::Store32(Reg(2), Reg(1))));
        assert_eq!(func.ir[store + 1], Inst::Kill(Reg(1)));
        assert_eq!(func.ir[store + 2], Inst::Kill(Reg(2)));
    }

    #[test]
    fn equality_is_rejected() {
        let err = lower_source("int main() { return 1 == 2; }").unwrap_err();
        assert!(matches!(err, LowerError::Unsupported { .. }));
    }

    #[test]
    fn global_access_is_rejected() {
        let err = lower_source("int g; int main() { return g; }").unwrap_err();
        assert!(matches!(
            err,
            LowerError::Unsupported {
                construct: "global variables",
                ..
            }
        ));
    }

    #[test]
    fn number_is_not_an_lvalue() {
        let err = lower_source("int main() { &1; return 0; }").unwrap_err();
        assert!(matches!(err, LowerError::NotAnLvalue { .. }));
    }
}
