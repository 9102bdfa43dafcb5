//! Value types for expression evaluation
//!
//! Represents the result of evaluating an expression.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::pointer::Pointer;
use super::scalar::Scalar;
use super::types::{QualType, ScalarKind};

/// A struct or array object living in the inspected program's memory.
///
/// Only used to dispatch member access and subscripting; its contents are
/// read on demand through the debug context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub ty: QualType,
    pub address: u64,
}

impl Aggregate {
    pub fn new(ty: QualType, address: u64) -> Self {
        Self { ty, address }
    }
}

/// Runtime value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Produced only alongside an error.
    #[default]
    Invalid,
    Scalar(Scalar),
    Pointer(Pointer),
    Aggregate(Aggregate),
}

impl Value {
    pub fn int(value: i32) -> Self {
        Value::Scalar(Scalar::from_int(ScalarKind::Int, value as i128))
    }

    pub fn bool(value: bool) -> Self {
        Value::Scalar(Scalar::from_bool(value))
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Invalid)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&Pointer> {
        match self {
            Value::Pointer(p) => Some(p),
            _ => None,
        }
    }

    /// Static type of the value; `None` for `Invalid`.
    pub fn qual_type(&self) -> Option<QualType> {
        match self {
            Value::Invalid => None,
            Value::Scalar(s) => Some(QualType::scalar(s.kind())),
            Value::Pointer(p) => Some(p.qual_type()),
            Value::Aggregate(a) => Some(a.ty.clone()),
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> String {
        self.qual_type()
            .map(|ty| ty.to_string())
            .unwrap_or_else(|| "<invalid>".to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Invalid => write!(f, "<invalid>"),
            Value::Scalar(s) => write!(f, "{}", s),
            Value::Pointer(p) => write!(f, "{}", p),
            Value::Aggregate(a) => write!(f, "{{{} @ 0x{:x}}}", a.ty, a.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::int(42).type_name(), "int");
        assert_eq!(Value::bool(true).type_name(), "bool");
        let ptr = Value::Pointer(Pointer::new(0x10, QualType::scalar(ScalarKind::Char)));
        assert_eq!(ptr.type_name(), "char*");
        assert_eq!(Value::Invalid.type_name(), "<invalid>");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::int(42)), "42");
        assert_eq!(format!("{}", Value::bool(false)), "false");
        let ptr = Value::Pointer(Pointer::new(0x10, QualType::scalar(ScalarKind::Char)));
        assert_eq!(format!("{}", ptr), "0x0000000000000010");
        let agg = Value::Aggregate(Aggregate::new(QualType::tagged("Point", 8), 0x2000));
        assert_eq!(format!("{}", agg), "{Point @ 0x2000}");
    }

    #[test]
    fn test_default_is_invalid() {
        assert!(!Value::default().is_valid());
    }
}
