use minicc_session::span::Span;
use minicc_session::InternedStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident(InternedStr),
    Num(i64),
    Str(InternedStr),

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Semicolon,
    Comma,
    Dot,
    Arrow,

    Add,
    Sub,
    Mul,
    Div,

    Lt,
    Gt,

    Assign,
    Amp,

    EqEq,
    NotEq,
    AndAnd,
    OrOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Int,
    Char,
    Struct,

    If,
    Else,
    For,
    While,
    Do,
    Return,

    Sizeof,
    Alignof,
    Extern,
}

impl TokenKind {
    /// Human-readable name for error messages.
    pub fn token_name(&self) -> &'static str {
        match self {
            TokenKind::Keyword(kw) => match kw {
                Keyword::Int => "keyword `int`",
                Keyword::Char => "keyword `char`",
                Keyword::Struct => "keyword `struct`",
                Keyword::If => "keyword `if`",
                Keyword::Else => "keyword `else`",
                Keyword::For => "keyword `for`",
                Keyword::While => "keyword `while`",
                Keyword::Do => "keyword `do`",
                Keyword::Return => "keyword `return`",
                Keyword::Sizeof => "keyword `sizeof`",
                Keyword::Alignof => "keyword `_Alignof`",
                Keyword::Extern => "keyword `extern`",
            },
            TokenKind::Ident(_) => "identifier",
            TokenKind::Num(_) => "number",
            TokenKind::Str(_) => "string literal",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Comma => "`,`",
            TokenKind::Dot => "`.`",
            TokenKind::Arrow => "`->`",
            TokenKind::Add => "`+`",
            TokenKind::Sub => "`-`",
            TokenKind::Mul => "`*`",
            TokenKind::Div => "`/`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::Assign => "`=`",
            TokenKind::Amp => "`&`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::AndAnd => "`&&`",
            TokenKind::OrOr => "`||`",
        }
    }
}
