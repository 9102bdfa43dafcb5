//! Recursive descent parser for C++-like expressions
//!
//! One function per precedence level, from assignment (rejected) down to
//! primary expressions. `(` is ambiguous between a C-style cast and a
//! parenthesized expression; the cast interpretation is tried first inside a
//! [`TentativeParse`] and rolled back when the contents do not name a type.
//!
//! Grammar summary:
//!
//! ```text
//! expression        = assignment ;
//! assignment        = conditional [ assignment-op ... ]      (not implemented)
//! conditional       = logical-or [ "?" expression ":" assignment ] ;
//! logical-or ... multiplicative                              (left assoc)
//! cast              = "(" type-id ")" cast | unary ;
//! unary             = ( "+" | "-" | "!" | "~" | "*" | "&" ) cast | postfix ;
//! postfix           = primary { "[" expression "]" | ( "." | "->" ) identifier } ;
//! primary           = numeric | "true" | "false" | "(" expression ")" | id-expression ;
//! id-expression     = [ "::" ] { identifier [ template-args ] "::" } identifier ;
//! type-id           = type-specifier-seq { ptr-operator } ;
//! ptr-operator      = "*" { cv-qualifier } | "&" ;
//! ```
//!
//! Template argument lists are skipped as balanced text, not parsed.

use log::debug;

use super::ast::{AstNode, BinOp, MemberAccess, UnaryOp};
use super::context::DebugContext;
use super::decl::{BuiltinSpecifier, PtrOperator, TypeDeclaration};
use super::error::{EvalErrorCode, ParseError};
use super::lexer::TokenStream;
use super::scalar::Scalar;
use super::tentative::TentativeParse;
use super::token::{SourceLocation, Token, TokenKind, TokenSource};
use super::types::{CvQualifiers, QualType, ScalarKind};

pub type ParseResult<T> = Result<T, ParseError>;

type BinaryLevel = &'static [(TokenKind, BinOp)];

/// Left-associative binary operator levels, loosest first.
const BINARY_LEVELS: &[BinaryLevel] = &[
    &[(TokenKind::PipePipe, BinOp::LogicalOr)],
    &[(TokenKind::AmpAmp, BinOp::LogicalAnd)],
    &[(TokenKind::Pipe, BinOp::BitOr)],
    &[(TokenKind::Caret, BinOp::BitXor)],
    &[(TokenKind::Amp, BinOp::BitAnd)],
    &[
        (TokenKind::EqualEqual, BinOp::Eq),
        (TokenKind::ExclaimEqual, BinOp::Ne),
    ],
    &[
        (TokenKind::Less, BinOp::Lt),
        (TokenKind::Greater, BinOp::Gt),
        (TokenKind::LessEqual, BinOp::Le),
        (TokenKind::GreaterEqual, BinOp::Ge),
    ],
    &[
        (TokenKind::LessLess, BinOp::Shl),
        (TokenKind::GreaterGreater, BinOp::Shr),
    ],
    &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
    &[
        (TokenKind::Star, BinOp::Mul),
        (TokenKind::Slash, BinOp::Div),
        (TokenKind::Percent, BinOp::Rem),
    ],
];

/// Parse a complete expression.
pub fn parse(input: &str, ctx: &dyn DebugContext) -> ParseResult<AstNode> {
    Parser::new(input, ctx).run()
}

/// Parse a type-id, optionally followed by array bounds (`char*[2]`).
pub fn parse_type(input: &str, ctx: &dyn DebugContext) -> ParseResult<QualType> {
    Parser::new(input, ctx).run_type()
}

/// Expression parser over any backtracking token source.
///
/// Each instance parses one expression. Type names are resolved through the
/// debug context while parsing, since that is what separates a cast from a
/// parenthesized expression.
pub struct Parser<'c, S: TokenSource = TokenStream> {
    tokens: S,
    ctx: &'c dyn DebugContext,
}

impl<'c> Parser<'c, TokenStream> {
    pub fn new(input: &str, ctx: &'c dyn DebugContext) -> Self {
        Self::with_source(TokenStream::new(input), ctx)
    }
}

impl<'c, S: TokenSource> Parser<'c, S> {
    pub fn with_source(tokens: S, ctx: &'c dyn DebugContext) -> Self {
        Self { tokens, ctx }
    }

    pub fn tokens(&self) -> &S {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut S {
        &mut self.tokens
    }

    /// Opens a speculative region at the current token.
    pub fn tentative(&mut self) -> TentativeParse<'_, 'c, S> {
        TentativeParse::new(self)
    }

    /// Parses the whole token stream as one expression.
    pub fn run(&mut self) -> ParseResult<AstNode> {
        let result = self.parse_expression().and_then(|expr| {
            self.expect(TokenKind::Eof)?;
            Ok(expr)
        });
        if let Err(err) = &result {
            debug!("parse failed: {}", err);
        }
        result
    }

    /// Parses the whole token stream as a type-id with optional array bounds.
    pub fn run_type(&mut self) -> ParseResult<QualType> {
        let location = self.location();
        let decl = self.parse_type_id()?;
        let mut ty = self.resolve(&decl, location)?;

        let mut bounds = Vec::new();
        while self.token().is(TokenKind::LSquare) {
            self.consume();
            let token = self.expect(TokenKind::NumericConstant)?;
            let len = parse_numeric_constant(&token.spelling)
                .ok()
                .filter(|value| value.kind().is_integral())
                .map(|value| value.as_u64())
                .ok_or_else(|| {
                    ParseError::syntax(
                        format!("invalid array bound '{}'", token.spelling),
                        token.location,
                    )
                })?;
            self.expect(TokenKind::RSquare)?;
            bounds.push(len);
        }
        for len in bounds.into_iter().rev() {
            ty = ty.array_of(len);
        }

        self.expect(TokenKind::Eof)?;
        Ok(ty)
    }

    // Token helpers

    fn token(&self) -> &Token {
        self.tokens.current()
    }

    fn kind(&self) -> TokenKind {
        self.token().kind
    }

    fn location(&self) -> SourceLocation {
        self.token().location
    }

    fn consume(&mut self) -> Token {
        let token = self.token().clone();
        self.tokens.advance();
        token
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if !self.token().is(kind) {
            return Err(ParseError::syntax(
                format!("expected '{}', got: {}", kind.name(), self.token()),
                self.location(),
            ));
        }
        Ok(self.consume())
    }

    fn not_implemented<T>(&self, what: &str) -> ParseResult<T> {
        Err(ParseError::with_code(
            EvalErrorCode::NotImplemented,
            format!("{} are not supported", what),
            self.location(),
        ))
    }

    fn resolve(&self, decl: &TypeDeclaration, location: SourceLocation) -> ParseResult<QualType> {
        decl.resolve(self.ctx)
            .map_err(|err| ParseError::with_code(err.code(), err.message(), location))
    }

    // Expressions

    fn parse_expression(&mut self) -> ParseResult<AstNode> {
        self.parse_assignment_expression()
    }

    fn parse_assignment_expression(&mut self) -> ParseResult<AstNode> {
        let lhs = self.parse_conditional_expression()?;
        if self.kind().is_assignment() {
            return self.not_implemented("assignment operators");
        }
        Ok(lhs)
    }

    fn parse_conditional_expression(&mut self) -> ParseResult<AstNode> {
        let cond = self.parse_binary_level(0)?;
        if !self.token().is(TokenKind::Question) {
            return Ok(cond);
        }
        self.consume();
        let lhs = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let rhs = self.parse_assignment_expression()?;
        Ok(AstNode::ternary(cond, lhs, rhs))
    }

    /// Parses the binary level at `depth` in [`BINARY_LEVELS`]; past the
    /// last level come cast expressions.
    fn parse_binary_level(&mut self, depth: usize) -> ParseResult<AstNode> {
        let Some(level) = BINARY_LEVELS.get(depth) else {
            return self.parse_cast_expression();
        };
        let mut lhs = self.parse_binary_level(depth + 1)?;
        while let Some(op) = level
            .iter()
            .find(|(kind, _)| self.token().is(*kind))
            .map(|(_, op)| *op)
        {
            self.consume();
            let rhs = self.parse_binary_level(depth + 1)?;
            lhs = AstNode::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn parse_cast_expression(&mut self) -> ParseResult<AstNode> {
        if !self.token().is(TokenKind::LParen) {
            return self.parse_unary_expression();
        }

        let mut attempt = self.tentative();
        attempt.consume();
        let location = attempt.location();
        // a keyword can only start a type, so there is nothing to fall back to
        let must_be_type = attempt.at_type_keyword();
        let parsed = match attempt.parse_type_id() {
            Ok(decl) => attempt.expect(TokenKind::RParen).map(|_| decl),
            Err(err) => Err(err),
        };
        let resolved = parsed.and_then(|decl| attempt.resolve(&decl, location));

        match resolved {
            Ok(ty) => {
                attempt.commit();
                let expr = self.parse_cast_expression()?;
                Ok(AstNode::cast(ty, expr))
            }
            Err(err) if must_be_type => {
                attempt.commit();
                Err(err)
            }
            Err(_) => {
                attempt.rollback();
                self.parse_unary_expression()
            }
        }
    }

    fn parse_unary_expression(&mut self) -> ParseResult<AstNode> {
        let op = match self.kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Exclaim => UnaryOp::LogicalNot,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Star => UnaryOp::Deref,
            TokenKind::Amp => UnaryOp::AddressOf,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                return self.not_implemented("increment and decrement operators")
            }
            _ => return self.parse_postfix_expression(),
        };
        self.consume();
        let operand = self.parse_cast_expression()?;
        Ok(AstNode::unary(op, operand))
    }

    fn parse_postfix_expression(&mut self) -> ParseResult<AstNode> {
        let mut expr = self.parse_primary_expression()?;
        loop {
            match self.kind() {
                TokenKind::LSquare => {
                    self.consume();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RSquare)?;
                    expr = AstNode::binary(expr, BinOp::Subscript, index);
                }
                TokenKind::Period | TokenKind::Arrow => {
                    let access = if self.consume().is(TokenKind::Period) {
                        MemberAccess::Dot
                    } else {
                        MemberAccess::Arrow
                    };
                    let member = self.expect(TokenKind::Identifier)?;
                    expr = AstNode::member(expr, access, member.spelling);
                }
                TokenKind::LParen => return self.not_implemented("function calls"),
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    return self.not_implemented("increment and decrement operators")
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary_expression(&mut self) -> ParseResult<AstNode> {
        match self.kind() {
            TokenKind::NumericConstant => self.parse_numeric_literal(),
            TokenKind::KwTrue | TokenKind::KwFalse => {
                let token = self.consume();
                Ok(AstNode::BooleanLiteral(token.is(TokenKind::KwTrue)))
            }
            TokenKind::LParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Identifier | TokenKind::ColonColon => {
                let name = self.parse_id_expression()?;
                Ok(AstNode::Identifier(name))
            }
            _ => Err(ParseError::syntax(
                format!("Unexpected token: {}", self.token()),
                self.location(),
            )),
        }
    }

    fn parse_id_expression(&mut self) -> ParseResult<String> {
        let mut name = String::new();
        if self.token().is(TokenKind::ColonColon) {
            self.consume();
            name.push_str("::");
        }
        name.push_str(&self.parse_nested_name_specifier());
        name.push_str(&self.expect(TokenKind::Identifier)?.spelling);
        Ok(name)
    }

    /// Consumes `{ identifier [ template-args ] "::" }` and returns its text.
    ///
    /// Each component is parsed speculatively: `a < b` stays a comparison
    /// because no `::` follows the would-be template argument list.
    fn parse_nested_name_specifier(&mut self) -> String {
        let mut specifier = String::new();
        while self.token().is(TokenKind::Identifier) {
            let mut attempt = self.tentative();
            let mut component = attempt.consume().spelling;
            if attempt.token().is(TokenKind::Less) {
                match attempt.parse_template_argument_list() {
                    Ok(args) => component.push_str(&args),
                    Err(_) => {
                        attempt.rollback();
                        break;
                    }
                }
            }
            if !attempt.token().is(TokenKind::ColonColon) {
                attempt.rollback();
                break;
            }
            attempt.consume();
            attempt.commit();
            specifier.push_str(&component);
            specifier.push_str("::");
        }
        specifier
    }

    /// Skips a balanced `<...>` list and returns its canonical spelling:
    /// tokens joined without spaces, except between two words and after a
    /// comma.
    fn parse_template_argument_list(&mut self) -> ParseResult<String> {
        self.expect(TokenKind::Less)?;
        let mut text = String::from("<");
        let mut angles = 1usize;
        let mut parens = 0usize;
        let mut previous_word = false;

        while angles > 0 {
            let token = self.token().clone();
            match token.kind {
                TokenKind::Eof => {
                    return Err(ParseError::syntax(
                        format!("expected '{}', got: {}", TokenKind::Greater.name(), token),
                        token.location,
                    ))
                }
                TokenKind::LParen => parens += 1,
                TokenKind::RParen if parens == 0 => {
                    return Err(ParseError::syntax(
                        format!("unbalanced template argument list, got: {}", token),
                        token.location,
                    ))
                }
                TokenKind::RParen => parens -= 1,
                TokenKind::Less if parens == 0 => angles += 1,
                TokenKind::Greater if parens == 0 => angles -= 1,
                TokenKind::GreaterGreater if parens == 0 => {
                    if angles < 2 {
                        return Err(ParseError::syntax(
                            format!("unbalanced template argument list, got: {}", token),
                            token.location,
                        ));
                    }
                    angles -= 2;
                }
                _ => {}
            }

            let word = is_word(&token);
            if word && previous_word {
                text.push(' ');
            }
            text.push_str(&token.spelling);
            if token.is(TokenKind::Comma) {
                text.push(' ');
            }
            previous_word = word;
            self.consume();
        }
        Ok(text)
    }

    fn parse_numeric_literal(&mut self) -> ParseResult<AstNode> {
        let token = self.consume();
        let value = parse_numeric_constant(&token.spelling)
            .map_err(|(code, message)| ParseError::with_code(code, message, token.location))?;
        Ok(AstNode::NumericLiteral {
            value,
            spelling: token.spelling,
        })
    }

    // Type-ids

    fn at_type_keyword(&self) -> bool {
        builtin_specifier(self.kind()).is_some()
            || self.token().is_one_of(&[
                TokenKind::KwConst,
                TokenKind::KwVolatile,
                TokenKind::KwStruct,
                TokenKind::KwClass,
                TokenKind::KwUnion,
                TokenKind::KwEnum,
            ])
    }

    fn parse_type_id(&mut self) -> ParseResult<TypeDeclaration> {
        let mut decl = TypeDeclaration::default();
        while self.parse_type_specifier(&mut decl)? {}
        if !decl.has_type_specifier() {
            return Err(ParseError::syntax(
                format!("expected a type, got: {}", self.token()),
                self.location(),
            ));
        }
        while self
            .token()
            .is_one_of(&[TokenKind::Star, TokenKind::Amp, TokenKind::AmpAmp])
        {
            self.parse_ptr_operator(&mut decl);
        }
        Ok(decl)
    }

    /// Consumes one type specifier; `false` when the current token is not one.
    fn parse_type_specifier(&mut self, decl: &mut TypeDeclaration) -> ParseResult<bool> {
        if let Some(builtin) = builtin_specifier(self.kind()) {
            if decl.type_name.is_some() {
                decl.is_invalid = true;
            }
            decl.builtins.push(builtin);
            self.consume();
            return Ok(true);
        }

        match self.kind() {
            TokenKind::KwConst => {
                decl.is_invalid |= decl.cv.is_const;
                decl.cv.is_const = true;
                self.consume();
            }
            TokenKind::KwVolatile => {
                decl.is_invalid |= decl.cv.is_volatile;
                decl.cv.is_volatile = true;
                self.consume();
            }
            TokenKind::KwStruct | TokenKind::KwClass | TokenKind::KwUnion | TokenKind::KwEnum => {
                self.consume();
                decl.is_invalid |= decl.has_type_specifier();
                decl.type_name = Some(self.parse_type_name()?);
            }
            TokenKind::Identifier | TokenKind::ColonColon if !decl.has_type_specifier() => {
                decl.type_name = Some(self.parse_type_name()?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn parse_type_name(&mut self) -> ParseResult<String> {
        let mut name = String::new();
        if self.token().is(TokenKind::ColonColon) {
            self.consume();
            name.push_str("::");
        }
        name.push_str(&self.parse_nested_name_specifier());
        name.push_str(&self.expect(TokenKind::Identifier)?.spelling);
        if self.token().is(TokenKind::Less) {
            name.push_str(&self.parse_template_argument_list()?);
        }
        Ok(name)
    }

    fn parse_ptr_operator(&mut self, decl: &mut TypeDeclaration) {
        let after_reference = decl.ptr_operators.last() == Some(&PtrOperator::Reference);
        match self.consume().kind {
            TokenKind::Star => {
                let mut cv = CvQualifiers::NONE;
                while let Some(qualifier) = match self.kind() {
                    TokenKind::KwConst => Some(CvQualifiers::CONST),
                    TokenKind::KwVolatile => Some(CvQualifiers::VOLATILE),
                    _ => None,
                } {
                    cv = cv | qualifier;
                    self.consume();
                }
                decl.is_invalid |= after_reference;
                decl.ptr_operators.push(PtrOperator::Pointer(cv));
            }
            TokenKind::Amp => {
                decl.is_invalid |= after_reference;
                decl.ptr_operators.push(PtrOperator::Reference);
            }
            // rvalue references
            _ => decl.is_invalid = true,
        }
    }
}

fn builtin_specifier(kind: TokenKind) -> Option<BuiltinSpecifier> {
    let specifier = match kind {
        TokenKind::KwVoid => BuiltinSpecifier::Void,
        TokenKind::KwBool => BuiltinSpecifier::Bool,
        TokenKind::KwChar => BuiltinSpecifier::Char,
        TokenKind::KwShort => BuiltinSpecifier::Short,
        TokenKind::KwInt => BuiltinSpecifier::Int,
        TokenKind::KwLong => BuiltinSpecifier::Long,
        TokenKind::KwSigned => BuiltinSpecifier::Signed,
        TokenKind::KwUnsigned => BuiltinSpecifier::Unsigned,
        TokenKind::KwFloat => BuiltinSpecifier::Float,
        TokenKind::KwDouble => BuiltinSpecifier::Double,
        _ => return None,
    };
    Some(specifier)
}

fn is_word(token: &Token) -> bool {
    token.is_one_of(&[TokenKind::Identifier, TokenKind::NumericConstant])
        || TokenKind::keyword(&token.spelling).is_some()
}

// Numeric literals

type LiteralError = (EvalErrorCode, String);

fn invalid_literal(message: String) -> LiteralError {
    (EvalErrorCode::InvalidExpressionSyntax, message)
}

/// Classifies a numeric constant and picks its type from the suffix and
/// magnitude, following the C++ literal rules for LP64.
pub fn parse_numeric_constant(spelling: &str) -> Result<Scalar, LiteralError> {
    let lower = spelling.to_ascii_lowercase();
    let is_hex = lower.starts_with("0x");
    let is_binary = lower.starts_with("0b");

    if is_hex && lower.contains('p') {
        return Err((
            EvalErrorCode::NotImplemented,
            "hexadecimal floating literals are not supported".to_string(),
        ));
    }
    if !is_hex && !is_binary && (lower.contains('.') || lower.contains('e')) {
        return parse_floating_literal(spelling);
    }
    parse_integer_literal(spelling, is_hex, is_binary)
}

fn parse_floating_literal(spelling: &str) -> Result<Scalar, LiteralError> {
    let (body, kind) = match spelling.chars().last() {
        Some('f' | 'F') => (&spelling[..spelling.len() - 1], ScalarKind::Float),
        // long double is evaluated as double
        Some('l' | 'L') => (&spelling[..spelling.len() - 1], ScalarKind::Double),
        _ => (spelling, ScalarKind::Double),
    };
    let value: f64 = body
        .parse()
        .map_err(|_| invalid_literal(format!("invalid floating literal '{}'", spelling)))?;
    Ok(Scalar::from_float(kind, value))
}

fn parse_integer_literal(
    spelling: &str,
    is_hex: bool,
    is_binary: bool,
) -> Result<Scalar, LiteralError> {
    let (radix, digits_start) = if is_hex {
        (16, 2)
    } else if is_binary {
        (2, 2)
    } else if spelling.len() > 1 && spelling.starts_with('0') {
        // the leading zero is itself an octal digit
        (8, 0)
    } else {
        (10, 0)
    };

    let rest = &spelling[digits_start..];
    let digits_len = rest
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(rest.len());
    let (digits, suffix) = rest.split_at(digits_len);

    if radix == 8 && suffix.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid_literal(format!(
            "invalid digit '{}' in octal constant",
            &suffix[..1]
        )));
    }
    let (is_unsigned, longs) = integer_suffix(suffix).ok_or_else(|| {
        invalid_literal(format!("invalid suffix '{}' on integer constant", suffix))
    })?;
    if digits.is_empty() {
        let message = format!("invalid suffix '{}' on integer constant", &spelling[1..]);
        return Err(invalid_literal(message));
    }

    let too_large = || {
        invalid_literal("integer literal is too large to be represented in any integer type".to_string())
    };
    let value = u128::from_str_radix(digits, radix).map_err(|_| too_large())?;
    if value > u64::MAX as u128 {
        return Err(too_large());
    }

    use ScalarKind::*;
    let candidates: &[ScalarKind] = match (is_unsigned, radix == 10) {
        (true, _) => &[UnsignedInt, UnsignedLong, UnsignedLongLong],
        (false, true) => &[Int, Long, LongLong],
        (false, false) => &[Int, UnsignedInt, Long, UnsignedLong, LongLong, UnsignedLongLong],
    };
    let kind = candidates
        .iter()
        .copied()
        .filter(|kind| match longs {
            0 => true,
            1 => !matches!(kind, Int | UnsignedInt),
            _ => matches!(kind, LongLong | UnsignedLongLong),
        })
        .find(|kind| fits(*kind, value))
        // too big for any signed candidate
        .unwrap_or(UnsignedLongLong);

    Ok(Scalar::from_int(kind, value as i128))
}

/// Returns `(unsigned, number of 'l')` for a valid integer suffix.
fn integer_suffix(suffix: &str) -> Option<(bool, u8)> {
    let is_u = |c: char| c == 'u' || c == 'U';
    let (mut is_unsigned, rest) = match suffix.strip_prefix(is_u) {
        Some(rest) => (true, rest),
        None => (false, suffix),
    };
    let (longs, mut rest) = if rest.starts_with("ll") || rest.starts_with("LL") {
        (2, &rest[2..])
    } else if rest.starts_with(|c: char| c == 'l' || c == 'L') {
        (1, &rest[1..])
    } else {
        (0, rest)
    };
    if !is_unsigned {
        if let Some(tail) = rest.strip_prefix(is_u) {
            is_unsigned = true;
            rest = tail;
        }
    }
    rest.is_empty().then_some((is_unsigned, longs))
}

fn fits(kind: ScalarKind, value: u128) -> bool {
    let bits = kind.bit_width();
    let max = if kind.is_signed() {
        (1u128 << (bits - 1)) - 1
    } else {
        (1u128 << bits) - 1
    };
    value <= max
}
