//! Expression error types

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::token::SourceLocation;

/// Error categories reported to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvalErrorCode {
    #[default]
    Ok,
    InvalidExpressionSyntax,
    InvalidOperandType,
    UndeclaredIdentifier,
    NotImplemented,
    Unknown,
}

impl EvalErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalErrorCode::Ok => "OK",
            EvalErrorCode::InvalidExpressionSyntax => "INVALID_EXPRESSION_SYNTAX",
            EvalErrorCode::InvalidOperandType => "INVALID_OPERAND_TYPE",
            EvalErrorCode::UndeclaredIdentifier => "UNDECLARED_IDENTIFIER",
            EvalErrorCode::NotImplemented => "NOT_IMPLEMENTED",
            EvalErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EvalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluation error: a code plus a human-readable message.
///
/// `EvalError::default()` is the "no error" state (`Ok` code, empty message).
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct EvalError {
    code: EvalErrorCode,
    message: String,
}

impl EvalError {
    pub fn new(code: EvalErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_syntax(message: impl Into<String>) -> Self {
        Self::new(EvalErrorCode::InvalidExpressionSyntax, message)
    }

    pub fn invalid_operand(message: impl Into<String>) -> Self {
        Self::new(EvalErrorCode::InvalidOperandType, message)
    }

    pub fn undeclared(message: impl Into<String>) -> Self {
        Self::new(EvalErrorCode::UndeclaredIdentifier, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(EvalErrorCode::NotImplemented, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(EvalErrorCode::Unknown, message)
    }

    pub fn set(&mut self, code: EvalErrorCode, message: impl Into<String>) {
        self.code = code;
        self.message = message.into();
    }

    pub fn clear(&mut self) {
        self.code = EvalErrorCode::Ok;
        self.message.clear();
    }

    pub fn code(&self) -> EvalErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when an error is present.
    pub fn is_error(&self) -> bool {
        self.code != EvalErrorCode::Ok
    }
}

/// Error raised while parsing; the first one aborts the parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{location}: {message}")]
pub struct ParseError {
    pub code: EvalErrorCode,
    pub message: String,
    pub location: SourceLocation,
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            code: EvalErrorCode::InvalidExpressionSyntax,
            message: message.into(),
            location,
        }
    }

    pub fn with_code(
        code: EvalErrorCode,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            location,
        }
    }
}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        EvalError::new(err.code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ok() {
        let err = EvalError::default();
        assert!(!err.is_error());
        assert_eq!(err.code(), EvalErrorCode::Ok);
        assert!(err.message().is_empty());
    }

    #[test]
    fn test_set_and_clear() {
        let mut err = EvalError::default();
        err.set(EvalErrorCode::UndeclaredIdentifier, "use of undeclared identifier 'x'");
        assert!(err.is_error());
        assert_eq!(err.to_string(), "use of undeclared identifier 'x'");

        err.clear();
        assert_eq!(err, EvalError::default());
    }

    #[test]
    fn test_parse_error_keeps_location() {
        let err = ParseError::syntax("expected ')'", SourceLocation::new(4, 1, 5));
        let eval: EvalError = err.into();
        assert_eq!(eval.code(), EvalErrorCode::InvalidExpressionSyntax);
        assert_eq!(eval.message(), "1:5: expected ')'");
    }

    #[test]
    fn test_code_serde() {
        let json = serde_json::to_string(&EvalErrorCode::InvalidOperandType).unwrap();
        assert_eq!(json, "\"INVALID_OPERAND_TYPE\"");
    }
}
