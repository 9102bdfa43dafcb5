//! Expression parsing and evaluation
//!
//! Parses C++ expressions against a [`DebugContext`] and evaluates the
//! resulting tree with C value semantics.

pub mod ast;
pub mod context;
pub mod decl;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod pointer;
pub mod scalar;
pub mod tentative;
pub mod token;
pub mod types;
pub mod value;

pub use ast::{AstNode, BinOp, MemberAccess, UnaryOp};
pub use context::{DebugContext, Field, Variable};
pub use error::{EvalError, EvalErrorCode, ParseError};
pub use eval::Interpreter;
pub use lexer::{Lexer, TokenStream};
pub use parser::{parse, parse_type, Parser};
pub use pointer::Pointer;
pub use scalar::Scalar;
pub use token::{SourceLocation, Token, TokenKind, TokenSource};
pub use types::{CvQualifiers, QualType, ScalarKind, TaggedType, Type};
pub use value::Value;
