//! Tokens and the token-source capability consumed by the parser

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a token in the expression text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Byte offset from the start of the expression.
    pub offset: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

impl SourceLocation {
    pub const fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Lexical categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Eof,
    Unknown,
    Identifier,
    NumericConstant,

    // Keywords
    KwTrue,
    KwFalse,
    KwConst,
    KwVolatile,
    KwVoid,
    KwBool,
    KwChar,
    KwShort,
    KwInt,
    KwLong,
    KwSigned,
    KwUnsigned,
    KwFloat,
    KwDouble,
    KwStruct,
    KwClass,
    KwUnion,
    KwEnum,

    // Punctuation
    LParen,       // (
    RParen,       // )
    LSquare,      // [
    RSquare,      // ]
    Period,       // .
    Arrow,        // ->
    ColonColon,   // ::
    Colon,        // :
    Question,     // ?
    Comma,        // ,
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Percent,      // %
    Amp,          // &
    AmpAmp,       // &&
    Pipe,         // |
    PipePipe,     // ||
    Caret,        // ^
    Tilde,        // ~
    Exclaim,      // !
    Less,         // <
    LessEqual,    // <=
    LessLess,     // <<
    Greater,      // >
    GreaterEqual, // >=
    GreaterGreater, // >>
    EqualEqual,   // ==
    ExclaimEqual, // !=

    // Side-effecting operators, lexed so the parser can reject them precisely
    Equal,               // =
    PlusEqual,           // +=
    MinusEqual,          // -=
    StarEqual,           // *=
    SlashEqual,          // /=
    PercentEqual,        // %=
    AmpEqual,            // &=
    PipeEqual,           // |=
    CaretEqual,          // ^=
    LessLessEqual,       // <<=
    GreaterGreaterEqual, // >>=
    PlusPlus,            // ++
    MinusMinus,          // --
}

impl TokenKind {
    /// Diagnostic name of the token kind.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Eof => "eof",
            TokenKind::Unknown => "unknown",
            TokenKind::Identifier => "identifier",
            TokenKind::NumericConstant => "numeric_constant",
            TokenKind::KwTrue => "kw_true",
            TokenKind::KwFalse => "kw_false",
            TokenKind::KwConst => "kw_const",
            TokenKind::KwVolatile => "kw_volatile",
            TokenKind::KwVoid => "kw_void",
            TokenKind::KwBool => "kw_bool",
            TokenKind::KwChar => "kw_char",
            TokenKind::KwShort => "kw_short",
            TokenKind::KwInt => "kw_int",
            TokenKind::KwLong => "kw_long",
            TokenKind::KwSigned => "kw_signed",
            TokenKind::KwUnsigned => "kw_unsigned",
            TokenKind::KwFloat => "kw_float",
            TokenKind::KwDouble => "kw_double",
            TokenKind::KwStruct => "kw_struct",
            TokenKind::KwClass => "kw_class",
            TokenKind::KwUnion => "kw_union",
            TokenKind::KwEnum => "kw_enum",
            TokenKind::LParen => "l_paren",
            TokenKind::RParen => "r_paren",
            TokenKind::LSquare => "l_square",
            TokenKind::RSquare => "r_square",
            TokenKind::Period => "period",
            TokenKind::Arrow => "arrow",
            TokenKind::ColonColon => "coloncolon",
            TokenKind::Colon => "colon",
            TokenKind::Question => "question",
            TokenKind::Comma => "comma",
            TokenKind::Plus => "plus",
            TokenKind::Minus => "minus",
            TokenKind::Star => "star",
            TokenKind::Slash => "slash",
            TokenKind::Percent => "percent",
            TokenKind::Amp => "amp",
            TokenKind::AmpAmp => "ampamp",
            TokenKind::Pipe => "pipe",
            TokenKind::PipePipe => "pipepipe",
            TokenKind::Caret => "caret",
            TokenKind::Tilde => "tilde",
            TokenKind::Exclaim => "exclaim",
            TokenKind::Less => "less",
            TokenKind::LessEqual => "lessequal",
            TokenKind::LessLess => "lessless",
            TokenKind::Greater => "greater",
            TokenKind::GreaterEqual => "greaterequal",
            TokenKind::GreaterGreater => "greatergreater",
            TokenKind::EqualEqual => "equalequal",
            TokenKind::ExclaimEqual => "exclaimequal",
            TokenKind::Equal => "equal",
            TokenKind::PlusEqual => "plusequal",
            TokenKind::MinusEqual => "minusequal",
            TokenKind::StarEqual => "starequal",
            TokenKind::SlashEqual => "slashequal",
            TokenKind::PercentEqual => "percentequal",
            TokenKind::AmpEqual => "ampequal",
            TokenKind::PipeEqual => "pipeequal",
            TokenKind::CaretEqual => "caretequal",
            TokenKind::LessLessEqual => "lesslessequal",
            TokenKind::GreaterGreaterEqual => "greatergreaterequal",
            TokenKind::PlusPlus => "plusplus",
            TokenKind::MinusMinus => "minusminus",
        }
    }

    /// Keyword lookup for an identifier-shaped spelling.
    pub fn keyword(spelling: &str) -> Option<TokenKind> {
        let kind = match spelling {
            "true" => TokenKind::KwTrue,
            "false" => TokenKind::KwFalse,
            "const" => TokenKind::KwConst,
            "volatile" => TokenKind::KwVolatile,
            "void" => TokenKind::KwVoid,
            "bool" => TokenKind::KwBool,
            "char" => TokenKind::KwChar,
            "short" => TokenKind::KwShort,
            "int" => TokenKind::KwInt,
            "long" => TokenKind::KwLong,
            "signed" => TokenKind::KwSigned,
            "unsigned" => TokenKind::KwUnsigned,
            "float" => TokenKind::KwFloat,
            "double" => TokenKind::KwDouble,
            "struct" => TokenKind::KwStruct,
            "class" => TokenKind::KwClass,
            "union" => TokenKind::KwUnion,
            "enum" => TokenKind::KwEnum,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            TokenKind::Equal
                | TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::SlashEqual
                | TokenKind::PercentEqual
                | TokenKind::AmpEqual
                | TokenKind::PipeEqual
                | TokenKind::CaretEqual
                | TokenKind::LessLessEqual
                | TokenKind::GreaterGreaterEqual
        )
    }
}

/// A lexical token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub spelling: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, spelling: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            location,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_one_of(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<'{}' ({})>", self.spelling, self.kind.name())
    }
}

/// Saved token-source position, handed back to [`TokenSource::reset`] or
/// [`TokenSource::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

impl Mark {
    pub const fn new(position: usize) -> Self {
        Self(position)
    }

    pub fn position(&self) -> usize {
        self.0
    }
}

/// A backtracking token stream.
///
/// The current token is always valid; once the end of input is reached the
/// source keeps returning an [`TokenKind::Eof`] token.
pub trait TokenSource {
    fn current(&self) -> &Token;

    fn advance(&mut self);

    /// Starts a region that may later be rolled back.
    fn mark(&mut self) -> Mark;

    /// Restores the position captured by `mark`.
    fn reset(&mut self, mark: Mark);

    /// Drops a mark without moving.
    fn commit(&mut self, _mark: Mark) {}
}
