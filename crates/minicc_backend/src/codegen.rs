//! Rendering allocated IR as x86-64 assembly, GAS Intel syntax.

use minicc_ir::ir::{Function, Inst, Reg};
use minicc_session::Interner;

use crate::registers::{Register, ARG_REGS};

pub struct CodeGenerator<'a> {
    interner: &'a Interner,
    output: String,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            output: String::new(),
        }
    }

    pub fn run(mut self, functions: &[Function]) -> String {
        self.push_line(0, ".intel_syntax noprefix");

        for (index, func) in functions.iter().enumerate() {
            self.gen_func(index, func);
        }

        self.output
    }

    fn gen_func(&mut self, index: usize, func: &Function) {
        let name = self.interner.resolve(&func.name);

        self.push_line(0, format!(".global {name}"));
        self.push_line(0, format!("{name}:"));

        // prologue; the frame size is already 16-byte aligned
        self.push_line(1, "push rbp");
        self.push_line(1, "mov rbp, rsp");
        self.push_line(1, format!("sub rsp, {}", func.stacksize));

        for inst in &func.ir {
            self.gen_inst(index, inst);
        }

        // only `Return` jumps here; execution never falls through
        self.push_line(0, format!(".Lend{index}:"));
        self.push_line(1, "mov rsp, rbp");
        self.push_line(1, "pop rbp");
        self.push_line(1, "ret");
    }

    fn gen_inst(&mut self, fn_index: usize, inst: &Inst) {
        match inst {
            Inst::Imm(r, val) => self.push_line(1, format!("mov {}, {val}", phys(*r))),

            Inst::Mov(dst, src) => {
                if dst != src {
                    self.push_line(1, format!("mov {}, {}", phys(*dst), phys(*src)));
                }
            }

            Inst::LoadBase(r) => self.push_line(1, format!("mov {}, rbp", phys(*r))),

            Inst::SubImm(r, val) => self.push_line(1, format!("sub {}, {val}", phys(*r))),

            Inst::Add(lhs, rhs) => {
                self.push_line(1, format!("add {}, {}", phys(*lhs), phys(*rhs)));
            }
            Inst::Sub(lhs, rhs) => {
                self.push_line(1, format!("sub {}, {}", phys(*lhs), phys(*rhs)));
            }
            Inst::Mul(lhs, rhs) => {
                self.push_line(1, format!("imul {}, {}", phys(*lhs), phys(*rhs)));
            }

            Inst::Div(lhs, rhs) => {
                self.push_line(1, format!("mov rax, {}", phys(*lhs)));
                self.push_line(1, "cqo");
                self.push_line(1, format!("idiv {}", phys(*rhs)));
                self.push_line(1, format!("mov {}, rax", phys(*lhs)));
            }

            Inst::Lt(lhs, rhs) => {
                let lhs = phys(*lhs);
                self.push_line(1, format!("cmp {lhs}, {}", phys(*rhs)));
                self.push_line(1, format!("setl {}", lhs.name8()));
                self.push_line(1, format!("movzb {lhs}, {}", lhs.name8()));
            }

            Inst::Load32(dst, addr) => {
                self.push_line(1, format!("mov {}, [{}]", phys(*dst).name32(), phys(*addr)));
            }
            Inst::Load64(dst, addr) => {
                self.push_line(1, format!("mov {}, [{}]", phys(*dst), phys(*addr)));
            }
            Inst::Store32(addr, src) => {
                self.push_line(1, format!("mov [{}], {}", phys(*addr), phys(*src).name32()));
            }
            Inst::Store64(addr, src) => {
                self.push_line(1, format!("mov [{}], {}", phys(*addr), phys(*src)));
            }

            Inst::Store32Arg { offset, index } => {
                self.push_line(
                    1,
                    format!("mov [rbp-{offset}], {}", ARG_REGS[*index].name32()),
                );
            }
            Inst::Store64Arg { offset, index } => {
                self.push_line(1, format!("mov [rbp-{offset}], {}", ARG_REGS[*index]));
            }

            Inst::Label(label) => self.push_line(0, format!("{label}:")),

            Inst::Jmp(label) => self.push_line(1, format!("jmp {label}")),

            Inst::Unless(r, label) => {
                self.push_line(1, format!("cmp {}, 0", phys(*r)));
                self.push_line(1, format!("je {label}"));
            }

            Inst::Call { dst, name, args } => {
                for (index, arg) in args.iter().enumerate() {
                    let arg = phys(*arg);
                    if ARG_REGS[index] != arg {
                        self.push_line(1, format!("mov {}, {arg}", ARG_REGS[index]));
                    }
                }

                self.push_line(1, "mov rax, 0");
                self.push_line(1, format!("call {}", self.interner.resolve(name)));
                self.push_line(1, format!("mov {}, rax", phys(*dst)));
            }

            Inst::Return(r) => {
                self.push_line(1, format!("mov rax, {}", phys(*r)));
                self.push_line(1, format!("jmp .Lend{fn_index}"));
            }

            Inst::Nop => {}

            Inst::Kill(_) => unreachable!("kill instructions are erased by register allocation"),
        }
    }

    fn push_line(&mut self, indent: u8, line: impl AsRef<str>) {
        const INDENT: &str = "    ";

        for _ in 0..indent {
            self.output.push_str(INDENT);
        }

        self.output.push_str(line.as_ref());
        self.output.push('\n');
    }
}

/// Physical register for an allocated operand.
fn phys(reg: Reg) -> Register {
    match Register::n(reg.0 as u8) {
        Some(register) => register,
        None => unreachable!("register operand was not allocated"),
    }
}
