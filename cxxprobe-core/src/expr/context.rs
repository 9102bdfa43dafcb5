//! Capability interface onto the inspected program

use serde::{Deserialize, Serialize};

use super::types::{QualType, TaggedType, Type};

/// A variable visible from the current frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub ty: QualType,
    pub address: u64,
}

/// A data member of a struct or class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: QualType,
    /// Byte offset from the start of the enclosing object.
    pub offset: u64,
}

/// Everything the parser and interpreter need from a debugger.
///
/// Calls are synchronous and may block (for example on memory reads from a
/// stopped process). Implementations that are not safe for concurrent use
/// must be serialized by the caller.
pub trait DebugContext {
    /// Resolves a possibly qualified identifier, innermost scope first.
    fn lookup_variable(&self, name: &str) -> Option<Variable>;

    /// Resolves a possibly qualified type name (`ns::Foo`, `Bar<int>`).
    fn lookup_type(&self, name: &str) -> Option<Type>;

    fn find_field(&self, record: &TaggedType, name: &str) -> Option<Field>;

    /// Reads `size` bytes at `address`; `None` if any byte is unreadable.
    fn read_memory(&self, address: u64, size: usize) -> Option<Vec<u8>>;
}
