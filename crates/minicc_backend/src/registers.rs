use std::fmt;

/// The x86-64 integer registers the backend works with.
///
/// The first eight discriminants are the allocatable pool, in allocation
/// order; `Register::n` maps a physical register index straight to its
/// register. The rest only appear in fixed roles during emission.
#[derive(enumn::N, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Rdi = 0,
    Rsi = 1,
    R10 = 2,
    R11 = 3,
    R12 = 4,
    R13 = 5,
    R14 = 6,
    R15 = 7,

    Rax = 8,
    Rdx = 9,
    Rcx = 10,
    R8 = 11,
    R9 = 12,
    Rbp = 13,
    Rsp = 14,
}

/// Number of registers available to the allocator.
pub const NUM_ALLOCATABLE: usize = 8;

/// Integer argument registers, in System V order.
pub const ARG_REGS: [Register; 6] = [
    Register::Rdi,
    Register::Rsi,
    Register::Rdx,
    Register::Rcx,
    Register::R8,
    Register::R9,
];

impl Register {
    /// 64-bit name.
    pub fn name(self) -> &'static str {
        match self {
            Register::Rdi => "rdi",
            Register::Rsi => "rsi",
            Register::R10 => "r10",
            Register::R11 => "r11",
            Register::R12 => "r12",
            Register::R13 => "r13",
            Register::R14 => "r14",
            Register::R15 => "r15",
            Register::Rax => "rax",
            Register::Rdx => "rdx",
            Register::Rcx => "rcx",
            Register::R8 => "r8",
            Register::R9 => "r9",
            Register::Rbp => "rbp",
            Register::Rsp => "rsp",
        }
    }

    /// 32-bit name.
    pub fn name32(self) -> &'static str {
        match self {
            Register::Rdi => "edi",
            Register::Rsi => "esi",
            Register::R10 => "r10d",
            Register::R11 => "r11d",
            Register::R12 => "r12d",
            Register::R13 => "r13d",
            Register::R14 => "r14d",
            Register::R15 => "r15d",
            Register::Rax => "eax",
            Register::Rdx => "edx",
            Register::Rcx => "ecx",
            Register::R8 => "r8d",
            Register::R9 => "r9d",
            Register::Rbp => "ebp",
            Register::Rsp => "esp",
        }
    }

    /// Low-byte name.
    pub fn name8(self) -> &'static str {
        match self {
            Register::Rdi => "dil",
            Register::Rsi => "sil",
            Register::R10 => "r10b",
            Register::R11 => "r11b",
            Register::R12 => "r12b",
            Register::R13 => "r13b",
            Register::R14 => "r14b",
            Register::R15 => "r15b",
            Register::Rax => "al",
            Register::Rdx => "dl",
            Register::Rcx => "cl",
            Register::R8 => "r8b",
            Register::R9 => "r9b",
            Register::Rbp => "bpl",
            Register::Rsp => "spl",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_order() {
        assert_eq!(Register::n(0), Some(Register::Rdi));
        assert_eq!(Register::n(1), Some(Register::Rsi));
        assert_eq!(Register::n(2), Some(Register::R10));
        assert_eq!(Register::n(7), Some(Register::R15));
    }

    #[test]
    fn names() {
        assert_eq!(Register::Rdi.name(), "rdi");
        assert_eq!(Register::Rdi.name32(), "edi");
        assert_eq!(Register::Rdi.name8(), "dil");
        assert_eq!(Register::R10.name32(), "r10d");
        assert_eq!(Register::R10.name8(), "r10b");
    }
}
