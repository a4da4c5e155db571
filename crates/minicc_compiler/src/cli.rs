use std::path::PathBuf;

use clap::Parser;

/// A small C compiler for x86-64.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The source code to compile.
    pub code: String,

    /// The output file. If not specified, prints assembly to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// The target triple. Only x86-64 targets are supported.
    #[arg(long)]
    pub target: Option<String>,

    /// Dump tokens and the intermediate representation to stdout.
    #[arg(long)]
    pub debug: bool,

    /// Write the analyzed syntax tree to a file.
    #[arg(long, value_name = "FILE")]
    pub emit_ast: Option<PathBuf>,
}
