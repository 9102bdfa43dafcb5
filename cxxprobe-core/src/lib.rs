//! cxxprobe core library
//!
//! Debugger-side evaluation of C++ expressions:
//! - Tokenizing and parsing with tentative (backtracking) parsing
//! - Type-id resolution against the debuggee's types
//! - Tree-walking evaluation with C arithmetic and pointer semantics
//! - An in-memory frame context loadable from JSON snapshots

pub mod expr;
pub mod snapshot;

pub use expr::{
    parse, AstNode, DebugContext, EvalError, EvalErrorCode, Interpreter, ParseError, QualType,
    Value,
};
pub use snapshot::{FrameSnapshot, SnapshotContext};

/// Parses and evaluates `input` in one step.
pub fn evaluate(input: &str, ctx: &dyn DebugContext) -> Result<Value, EvalError> {
    let ast = parse(input, ctx)?;
    Interpreter::new(ctx).eval(&ast)
}
