//! The x86-64 backend: register allocation and assembly emission.

mod codegen;
pub mod regalloc;
pub mod registers;

use codegen::CodeGenerator;
use minicc_ir::ir::Function;
use minicc_session::diagnostics::DiagnosticEmitter;
use minicc_session::Session;
use target_lexicon::{Architecture, Triple};

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("unsupported architecture: {0}")]
    UnsupportedArch(Architecture),

    #[error("register exhausted")]
    RegisterExhausted,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Allocate registers in place and render the program as assembly text.
pub fn run_backend<D: DiagnosticEmitter>(
    session: &Session<D>,
    functions: &mut [Function],
) -> BackendResult<String> {
    check_target(&session.target)?;

    regalloc::alloc_regs(functions)?;

    let code_generator = CodeGenerator::new(&session.interner);
    Ok(code_generator.run(functions))
}

fn check_target(target: &Triple) -> BackendResult<()> {
    match target.architecture {
        Architecture::X86_64 => Ok(()),
        other => Err(BackendError::UnsupportedArch(other)),
    }
}
