//! The linear three-address IR sitting between the AST and the emitter.
//!
//! Lowering produces instructions over an unbounded virtual register
//! namespace (ids starting at 1 per function); register allocation then
//! rewrites every register operand in place to an index into the physical
//! register pool. `Kill` marks the end of a register's live range and is
//! erased (rewritten to `Nop`) by the allocator.

use std::fmt;

use minicc_session::{Interner, InternedStr};

/// A register operand: a virtual register id before allocation, a
/// physical register index after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg(pub u32);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, ".L{}", self.0)
    }
}

/// Operand shape of an instruction. The shape decides which operands are
/// register operands, which is all the register allocator needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    NoArg,
    Reg,
    Imm,
    Jmp,
    Label,
    RegReg,
    RegImm,
    ImmImm,
    RegLabel,
    Call,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    Add(Reg, Reg),
    Sub(Reg, Reg),
    Mul(Reg, Reg),
    Div(Reg, Reg),

    /// `lhs = (lhs < rhs)`, as 0 or 1.
    Lt(Reg, Reg),

    Mov(Reg, Reg),

    /// Load the frame base pointer. Together with a following `SubImm`
    /// this forms the address of a stack slot.
    LoadBase(Reg),

    Imm(Reg, i64),
    SubImm(Reg, i64),

    Load32(Reg, Reg),
    Load64(Reg, Reg),
    Store32(Reg, Reg),
    Store64(Reg, Reg),

    /// Home the `index`-th incoming argument register into the frame
    /// slot at `offset` below the base pointer.
    Store32Arg { offset: usize, index: usize },
    Store64Arg { offset: usize, index: usize },

    Label(Label),
    Jmp(Label),

    /// Branch to the label if the register is zero.
    Unless(Reg, Label),

    Return(Reg),

    /// End of the register's live range. Erased by allocation.
    Kill(Reg),

    Call {
        dst: Reg,
        name: InternedStr,
        args: Vec<Reg>,
    },

    Nop,
}

impl Inst {
    pub fn shape(&self) -> Shape {
        match self {
            Inst::Nop => Shape::NoArg,
            Inst::LoadBase(_) | Inst::Return(_) | Inst::Kill(_) => Shape::Reg,
            Inst::Jmp(_) => Shape::Jmp,
            Inst::Label(_) => Shape::Label,
            Inst::Add(..)
            | Inst::Sub(..)
            | Inst::Mul(..)
            | Inst::Div(..)
            | Inst::Lt(..)
            | Inst::Mov(..)
            | Inst::Load32(..)
            | Inst::Load64(..)
            | Inst::Store32(..)
            | Inst::Store64(..) => Shape::RegReg,
            Inst::Imm(..) | Inst::SubImm(..) => Shape::RegImm,
            Inst::Store32Arg { .. } | Inst::Store64Arg { .. } => Shape::ImmImm,
            Inst::Unless(..) => Shape::RegLabel,
            Inst::Call { .. } => Shape::Call,
        }
    }

    /// All register operands, destination first.
    pub fn regs(&self) -> Vec<Reg> {
        match self {
            Inst::LoadBase(r) | Inst::Return(r) | Inst::Kill(r) => vec![*r],
            Inst::Imm(r, _) | Inst::SubImm(r, _) | Inst::Unless(r, _) => vec![*r],
            Inst::Add(a, b)
            | Inst::Sub(a, b)
            | Inst::Mul(a, b)
            | Inst::Div(a, b)
            | Inst::Lt(a, b)
            | Inst::Mov(a, b)
            | Inst::Load32(a, b)
            | Inst::Load64(a, b)
            | Inst::Store32(a, b)
            | Inst::Store64(a, b) => vec![*a, *b],
            Inst::Call { dst, args, .. } => {
                let mut regs = vec![*dst];
                regs.extend_from_slice(args);
                regs
            }
            Inst::Nop
            | Inst::Label(_)
            | Inst::Jmp(_)
            | Inst::Store32Arg { .. }
            | Inst::Store64Arg { .. } => vec![],
        }
    }
}

/// One compiled function: a name, the frame size computed by layout, and
/// the instruction sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: InternedStr,
    pub stacksize: usize,
    pub ir: Vec<Inst>,

    /// One past the highest virtual register id used; sizes the
    /// allocator's register map.
    pub nreg: u32,
}

fn tostr(inst: &Inst, interner: &Interner) -> String {
    fn reg_reg(name: &str, a: Reg, b: Reg) -> String {
        format!("\t{name} {a}, {b}")
    }

    match inst {
        Inst::Add(a, b) => reg_reg("ADD", *a, *b),
        Inst::Sub(a, b) => reg_reg("SUB", *a, *b),
        Inst::Mul(a, b) => reg_reg("MUL", *a, *b),
        Inst::Div(a, b) => reg_reg("DIV", *a, *b),
        Inst::Lt(a, b) => reg_reg("LT", *a, *b),
        Inst::Mov(a, b) => reg_reg("MOV", *a, *b),
        Inst::Load32(a, b) => reg_reg("LOAD32", *a, *b),
        Inst::Load64(a, b) => reg_reg("LOAD64", *a, *b),
        Inst::Store32(a, b) => reg_reg("STORE32", *a, *b),
        Inst::Store64(a, b) => reg_reg("STORE64", *a, *b),
        Inst::LoadBase(r) => format!("\tMOV {r}, rbp"),
        Inst::Imm(r, v) => format!("\tMOV {r}, {v}"),
        Inst::SubImm(r, v) => format!("\tSUB {r}, {v}"),
        Inst::Store32Arg { offset, index } => format!("\tSTORE32_ARG {offset}, {index}"),
        Inst::Store64Arg { offset, index } => format!("\tSTORE64_ARG {offset}, {index}"),
        Inst::Label(l) => format!("{l}:"),
        Inst::Jmp(l) => format!("\tJMP {l}"),
        Inst::Unless(r, l) => format!("\tUNLESS {r}, {l}"),
        Inst::Return(r) => format!("\tRET {r}"),
        Inst::Kill(r) => format!("\tKILL {r}"),
        Inst::Call { dst, name, args } => {
            let args = args
                .iter()
                .map(|arg| arg.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("\t{dst} = {}({args})", interner.resolve(name))
        }
        Inst::Nop => "\tNOP".to_string(),
    }
}

/// Render the IR of a whole program, one block per function.
pub fn dump(functions: &[Function], interner: &Interner) -> String {
    let mut out = String::new();

    for func in functions {
        out.push_str(interner.resolve(&func.name));
        out.push_str("():\n");
        for inst in &func.ir {
            out.push_str(&tostr(inst, interner));
            out.push('\n');
        }
    }

    out
}
