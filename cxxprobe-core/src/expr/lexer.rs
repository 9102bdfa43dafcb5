//! Tokenizer for C++ expressions
//!
//! Turns expression text into a flat token vector terminated by an `Eof`
//! token. Characters that start no known token become `Unknown` tokens so the
//! parser can report them with a location. Numeric constants are lexed as
//! preprocessing numbers and validated later by the parser.

use super::token::{Mark, SourceLocation, Token, TokenKind, TokenSource};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    index: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            index: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let token = self.next_token();
            let done = token.is(TokenKind::Eof);
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).map(|&(_, c)| c)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.index + n).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.index)
            .map(|&(o, _)| o)
            .unwrap_or(self.input.len())
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.offset(), self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn next_token(&mut self) -> Token {
        let start = self.location();
        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, "", start);
        };

        if c.is_ascii_alphabetic() || c == '_' {
            return self.lex_identifier(start);
        }
        if c.is_ascii_digit() || (c == '.' && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()))
        {
            return self.lex_number(start);
        }
        self.lex_punctuator(start)
    }

    fn lex_identifier(&mut self, start: SourceLocation) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        let spelling = &self.input[start.offset..self.offset()];
        let kind = TokenKind::keyword(spelling).unwrap_or(TokenKind::Identifier);
        Token::new(kind, spelling, start)
    }

    fn lex_number(&mut self, start: SourceLocation) -> Token {
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign =
                (c == '+' || c == '-') && matches!(prev, 'e' | 'E' | 'p' | 'P');
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
                prev = c;
                self.bump();
            } else {
                break;
            }
        }
        let spelling = &self.input[start.offset..self.offset()];
        Token::new(TokenKind::NumericConstant, spelling, start)
    }

    fn lex_punctuator(&mut self, start: SourceLocation) -> Token {
        const PUNCTUATORS: &[(&str, TokenKind)] = &[
            ("<<=", TokenKind::LessLessEqual),
            (">>=", TokenKind::GreaterGreaterEqual),
            ("->", TokenKind::Arrow),
            ("::", TokenKind::ColonColon),
            ("&&", TokenKind::AmpAmp),
            ("||", TokenKind::PipePipe),
            ("<=", TokenKind::LessEqual),
            (">=", TokenKind::GreaterEqual),
            ("<<", TokenKind::LessLess),
            (">>", TokenKind::GreaterGreater),
            ("==", TokenKind::EqualEqual),
            ("!=", TokenKind::ExclaimEqual),
            ("+=", TokenKind::PlusEqual),
            ("-=", TokenKind::MinusEqual),
            ("*=", TokenKind::StarEqual),
            ("/=", TokenKind::SlashEqual),
            ("%=", TokenKind::PercentEqual),
            ("&=", TokenKind::AmpEqual),
            ("|=", TokenKind::PipeEqual),
            ("^=", TokenKind::CaretEqual),
            ("++", TokenKind::PlusPlus),
            ("--", TokenKind::MinusMinus),
            ("(", TokenKind::LParen),
            (")", TokenKind::RParen),
            ("[", TokenKind::LSquare),
            ("]", TokenKind::RSquare),
            (".", TokenKind::Period),
            (":", TokenKind::Colon),
            ("?", TokenKind::Question),
            (",", TokenKind::Comma),
            ("+", TokenKind::Plus),
            ("-", TokenKind::Minus),
            ("*", TokenKind::Star),
            ("/", TokenKind::Slash),
            ("%", TokenKind::Percent),
            ("&", TokenKind::Amp),
            ("|", TokenKind::Pipe),
            ("^", TokenKind::Caret),
            ("~", TokenKind::Tilde),
            ("!", TokenKind::Exclaim),
            ("<", TokenKind::Less),
            (">", TokenKind::Greater),
            ("=", TokenKind::Equal),
        ];

        let rest = &self.input[start.offset..];
        for (text, kind) in PUNCTUATORS {
            if rest.starts_with(text) {
                for _ in 0..text.chars().count() {
                    self.bump();
                }
                return Token::new(*kind, *text, start);
            }
        }

        let c = self.bump().unwrap_or_default();
        Token::new(TokenKind::Unknown, c.to_string(), start)
    }
}

/// Vector-backed token source with unlimited backtracking.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenStream {
    pub fn new(input: &str) -> Self {
        Self::from_tokens(Lexer::new(input).tokenize())
    }

    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(|t| t.is(TokenKind::Eof)) {
            let location = tokens
                .last()
                .map(|t| {
                    SourceLocation::new(
                        t.location.offset + t.spelling.len(),
                        t.location.line,
                        t.location.column + t.spelling.chars().count(),
                    )
                })
                .unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", location));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl TokenSource for TokenStream {
    fn current(&self) -> &Token {
        // from_tokens guarantees a trailing Eof and advance never moves past it
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn mark(&mut self) -> Mark {
        Mark::new(self.position)
    }

    fn reset(&mut self, mark: Mark) {
        self.position = mark.position().min(self.tokens.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_cast_expression() {
        assert_eq!(
            kinds("(const char*)p->name"),
            vec![
                TokenKind::LParen,
                TokenKind::KwConst,
                TokenKind::KwChar,
                TokenKind::Star,
                TokenKind::RParen,
                TokenKind::Identifier,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_numbers() {
        let tokens = Lexer::new("0x1Fu 1.5e-3f .5 10ULL").tokenize();
        let spellings: Vec<&str> = tokens.iter().map(|t| t.spelling.as_str()).collect();
        assert_eq!(spellings, vec!["0x1Fu", "1.5e-3f", ".5", "10ULL", ""]);
        assert!(tokens[..4].iter().all(|t| t.is(TokenKind::NumericConstant)));
    }

    #[test]
    fn test_lex_longest_match() {
        assert_eq!(
            kinds("a<<=b>>c::d"),
            vec![
                TokenKind::Identifier,
                TokenKind::LessLessEqual,
                TokenKind::Identifier,
                TokenKind::GreaterGreater,
                TokenKind::Identifier,
                TokenKind::ColonColon,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_locations() {
        let tokens = Lexer::new("a +\n  b").tokenize();
        assert_eq!(tokens[1].location, SourceLocation::new(2, 1, 3));
        assert_eq!(tokens[2].location, SourceLocation::new(6, 2, 3));
    }

    #[test]
    fn test_unknown_character() {
        let tokens = Lexer::new("a @ b").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].spelling, "@");
    }

    #[test]
    fn test_stream_backtracking() {
        let mut stream = TokenStream::new("a + b");
        let mark = stream.mark();
        stream.advance();
        stream.advance();
        assert_eq!(stream.current().spelling, "b");
        stream.reset(mark);
        assert_eq!(stream.current().spelling, "a");

        for _ in 0..10 {
            stream.advance();
        }
        assert!(stream.current().is(TokenKind::Eof));
    }
}
