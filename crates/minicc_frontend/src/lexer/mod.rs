
use std::str::Chars;

use minicc_session::diagnostics::prelude::*;
use minicc_session::Interner;
use minicc_utils::peek::Peek;

use crate::token::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerError {
    pub kind: LexerErrorKind,
    pub span: Span,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerErrorKind {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),

    #[error("integer overflow")]
    IntegerOverflow,

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unknown escape sequence `\\{0}`")]
    UnknownEscape(char),
}

impl IntoDiagnostic for LexerError {
    fn into_diagnostic(self, source_id: SourceId, _interner: &Interner) -> Diagnostic {
        Diagnostic::error()
            .with_message(self.kind.to_string())
            .at(source_id, self.span)
    }
}

pub type LexerResult<T> = Result<T, LexerErrorKind>;

pub struct Lexer<'sess> {
    interner: &'sess mut Interner,
    errors: Vec<LexerError>,

    all: &'sess str,
    chars: Chars<'sess>,

    token_start: usize,
}

impl<'sess> Lexer<'sess> {
    pub fn new(source: &'sess str, interner: &'sess mut Interner) -> Self {
        Self {
            interner,
            errors: vec![],

            all: source,
            chars: source.chars(),

            token_start: 0,
        }
    }

    pub fn lex(mut self) -> (TokenIter, Vec<LexerError>) {
        let mut tokens = vec![];
        while let Some(token) = self.lex_token() {
            tokens.push(token);
        }

        let iter = TokenIter {
            tokens: tokens.into_iter(),
            eof_span: Span::empty(self.all.len()),
        };

        (iter, self.errors)
    }

    fn lex_token(&mut self) -> Option<Token> {
        loop {
            macro_rules! try_lex {
                ($e:expr) => {{
                    match $e {
                        Ok(token) => token,
                        Err(err) => {
                            self.report_error(err);
                            continue;
                        }
                    }
                }};
            }

            self.token_start = self.byte_pos();

            let kind = match self.chars.next()? {
                // comment
                '/' if self.chars.eat('/') => {
                    while !matches!(self.chars.next(), Some('\n') | None) {}
                    continue;
                }

                ch if ch.is_ascii_whitespace() => continue,

                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,

                ';' => TokenKind::Semicolon,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                '-' if self.chars.eat('>') => TokenKind::Arrow,

                '+' => TokenKind::Add,
                '-' => TokenKind::Sub,
                '*' => TokenKind::Mul,
                '/' => TokenKind::Div,

                '<' => TokenKind::Lt,
                '>' => TokenKind::Gt,

                '=' if self.chars.eat('=') => TokenKind::EqEq,
                '=' => TokenKind::Assign,

                '&' if self.chars.eat('&') => TokenKind::AndAnd,
                '&' => TokenKind::Amp,

                '!' if self.chars.eat('=') => TokenKind::NotEq,
                '|' if self.chars.eat('|') => TokenKind::OrOr,

                '"' => try_lex!(self.lex_string()),

                ch @ '0'..='9' => try_lex!(self.lex_integer(ch as i64 - 48)),

                ch if is_ident_start(ch) => self.lex_alpha(),

                ch => {
                    self.report_error(LexerErrorKind::UnexpectedChar(ch));
                    continue;
                }
            };

            let token = Token {
                kind,
                span: Span::new(self.token_start, self.byte_pos()),
            };

            return Some(token);
        }
    }

    fn lex_integer(&mut self, start: i64) -> LexerResult<TokenKind> {
        let mut n = Some(start);

        while let Some(ch @ '0'..='9') = self.chars.peek() {
            self.chars.next();

            let digit = ch as i64 - 48;
            n = n.and_then(|n| n.checked_mul(10));
            n = n.and_then(|n| n.checked_add(digit));
        }

        n.map(TokenKind::Num).ok_or(LexerErrorKind::IntegerOverflow)
    }

    fn lex_string(&mut self) -> LexerResult<TokenKind> {
        let mut s = String::new();

        loop {
            match self.chars.next() {
                None => return Err(LexerErrorKind::UnterminatedString),
                Some('"') => break,
                Some('\\') => {
                    let escaped = match self.chars.next() {
                        None => return Err(LexerErrorKind::UnterminatedString),
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some(ch @ ('\\' | '"')) => ch,
                        Some(ch) => return Err(LexerErrorKind::UnknownEscape(ch)),
                    };
                    s.push(escaped);
                }
                Some(ch) => s.push(ch),
            }
        }

        Ok(TokenKind::Str(self.interner.get_or_intern(s)))
    }

    fn lex_alpha(&mut self) -> TokenKind {
        self.chars.eat_while(|&ch| is_ident(ch));

        let s = &self.all[self.token_start..self.byte_pos()];

        match s {
            "int" => TokenKind::Keyword(Keyword::Int),
            "char" => TokenKind::Keyword(Keyword::Char),
            "struct" => TokenKind::Keyword(Keyword::Struct),
            "if" => TokenKind::Keyword(Keyword::If),
            "else" => TokenKind::Keyword(Keyword::Else),
            "for" => TokenKind::Keyword(Keyword::For),
            "while" => TokenKind::Keyword(Keyword::While),
            "do" => TokenKind::Keyword(Keyword::Do),
            "return" => TokenKind::Keyword(Keyword::Return),
            "sizeof" => TokenKind::Keyword(Keyword::Sizeof),
            "_Alignof" => TokenKind::Keyword(Keyword::Alignof),
            "extern" => TokenKind::Keyword(Keyword::Extern),
            _ => TokenKind::Ident(self.interner.get_or_intern(s)),
        }
    }

    fn byte_pos(&self) -> usize {
        self.all.len() - self.chars.as_str().len()
    }

    fn report_error(&mut self, kind: LexerErrorKind) {
        let span = Span::new(self.token_start, self.byte_pos());
        self.errors.push(LexerError { kind, span });
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

pub struct TokenIter {
    tokens: std::vec::IntoIter<Token>,
    eof_span: Span,
}

impl TokenIter {
    pub fn eof_span(&self) -> Span {
        self.eof_span
    }

    /// The tokens not yet consumed.
    pub fn remaining(&self) -> &[Token] {
        self.tokens.as_slice()
    }
}

impl Iterator for TokenIter {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.tokens.next()
    }
}

impl Peek for TokenIter {
    fn peek(&self) -> Option<Self::Item> {
        self.tokens.as_slice().first().copied()
    }
}
