//! Tokenizer and recursive-descent parser for the C subset.

pub mod ast;
pub mod token;

mod lexer;
mod parser;

pub use lexer::{LexerError, LexerErrorKind, LexerResult, TokenIter};
pub use parser::{ParseError, ParseResult};

use minicc_session::Interner;

pub fn lex(source: &str, interner: &mut Interner) -> (TokenIter, Vec<LexerError>) {
    lexer::Lexer::new(source, interner).lex()
}

pub fn parse(tokens: TokenIter) -> (ast::Program, Vec<ParseError>) {
    parser::Parser::new(tokens).parse()
}
