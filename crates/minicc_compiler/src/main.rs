mod cli;
mod compilation;

use std::str::FromStr;

use clap::Parser as _;
use cli::Cli;
use minicc_session::diagnostics::PrettyDiagnosticEmitter;
use minicc_session::sourcemap::Source;
use minicc_session::{HadErrors, Session};
use target_lexicon::Triple;

use crate::compilation::{compile_source, CompileOptions};

#[derive(thiserror::Error, Debug)]
enum CompilerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Backend(#[from] minicc_backend::BackendError),

    #[error(transparent)]
    InvalidTarget(#[from] target_lexicon::ParseError),

    #[error("errors while compiling")]
    HadErrors,
}

impl From<HadErrors> for CompilerError {
    fn from(_: HadErrors) -> Self {
        Self::HadErrors
    }
}

type CompilerResult<T> = Result<T, CompilerError>;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> CompilerResult<()> {
    let cli = Cli::parse();

    let target = match &cli.target {
        Some(target) => Triple::from_str(target)?,
        None => Triple::host(),
    };

    let mut session = Session::new(target, PrettyDiagnosticEmitter::default());
    let source_id = session.sources.insert(Source::new("<code>", cli.code));

    let options = CompileOptions {
        debug: cli.debug,
        emit_ast: cli.emit_ast,
    };
    let asm = compile_source(&mut session, source_id, &options)?;

    match &cli.output {
        Some(path) => std::fs::write(path, asm)?,
        None => print!("{asm}"),
    }

    Ok(())
}
