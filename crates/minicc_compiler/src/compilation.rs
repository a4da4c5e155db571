use std::path::PathBuf;

use minicc_frontend::token::{Token, TokenKind};
use minicc_ir::ir;
use minicc_middle::lower;
use minicc_middle::type_check::TypeChecker;
use minicc_session::diagnostics::DiagnosticEmitter;
use minicc_session::sourcemap::SourceId;
use minicc_session::{Interner, Session};

use crate::{CompilerError, CompilerResult};

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Dump tokens and the IR to stdout.
    pub debug: bool,
    /// Write the analyzed syntax tree to this file.
    pub emit_ast: Option<PathBuf>,
}

/// Run the whole pipeline on one source and return the assembly text.
pub fn compile_source<D: DiagnosticEmitter>(
    session: &mut Session<D>,
    source_id: SourceId,
    options: &CompileOptions,
) -> CompilerResult<String> {
    let (tokens, lexer_errors) = {
        let Session {
            sources, interner, ..
        } = session;
        let source = sources.get(source_id).expect("source id not in sources");
        minicc_frontend::lex(&source.source, interner)
    };

    if options.debug {
        println!("-- tokens info --");
        print!("{}", dump_tokens(tokens.remaining(), &session.interner));
        println!();
    }

    let mut had_errors = false;
    had_errors |= session.report_all(lexer_errors, source_id).is_err();

    let (mut program, parse_errors) = minicc_frontend::parse(tokens);
    had_errors |= session.report_all(parse_errors, source_id).is_err();

    if had_errors {
        return Err(CompilerError::HadErrors);
    }

    let sema_errors = TypeChecker::new(&session.interner).run(&mut program);
    session.report_all(sema_errors, source_id)?;

    if let Some(path) = &options.emit_ast {
        std::fs::write(path, format!("{program:#?}"))?;
    }

    let mut functions = lower::lower(&program).map_err(|err| {
        let _ = session.report(err, source_id);
        CompilerError::HadErrors
    })?;

    if options.debug {
        println!("-- intermediate reprensetations --");
        print!("{}", ir::dump(&functions, &session.interner));
        println!();
    }

    let asm = minicc_backend::run_backend(session, &mut functions)?;
    Ok(asm)
}

fn dump_tokens(tokens: &[Token], interner: &Interner) -> String {
    let mut out = String::new();

    for (i, token) in tokens.iter().enumerate() {
        let desc = match token.kind {
            TokenKind::Ident(name) => format!("identifier `{}`", interner.resolve(&name)),
            TokenKind::Num(val) => format!("number {val}"),
            TokenKind::Str(s) => format!("string literal {:?}", interner.resolve(&s)),
            kind => kind.token_name().to_string(),
        };
        out.push_str(&format!("[{i:02}] {desc}\n"));
    }

    out
}
