//! Typed pointer values

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::EvalError;
use super::types::QualType;

/// An address together with the type it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    addr: u64,
    pointee: QualType,
}

impl Pointer {
    pub fn new(addr: u64, pointee: QualType) -> Self {
        Self { addr, pointee }
    }

    pub fn addr(&self) -> u64 {
        self.addr
    }

    pub fn pointee(&self) -> &QualType {
        &self.pointee
    }

    /// The pointer's own type (`pointee*`).
    pub fn qual_type(&self) -> QualType {
        self.pointee.clone().pointer_to()
    }

    pub fn is_pointer_to_void(&self) -> bool {
        self.pointee.is_void()
    }

    pub fn as_bool(&self) -> bool {
        self.addr != 0
    }

    /// Size of the pointee, rejecting `void` and other unsized pointees.
    pub fn pointee_size(&self) -> Result<u64, EvalError> {
        match self.pointee.byte_size() {
            Some(size) if size > 0 => Ok(size),
            _ => Err(EvalError::invalid_operand(format!(
                "arithmetic on a pointer to an incomplete type '{}'",
                self.pointee
            ))),
        }
    }

    /// Advances the address by `offset` elements of the pointee type.
    pub fn add(&self, offset: i64) -> Result<Pointer, EvalError> {
        let size = self.pointee_size()?;
        let delta = (offset as i128).wrapping_mul(size as i128);
        let addr = (self.addr as i128).wrapping_add(delta) as u64;
        Ok(Pointer::new(addr, self.pointee.clone()))
    }

    /// Element distance `(self - other) / sizeof(pointee)`.
    pub fn difference(&self, other: &Pointer) -> Result<i64, EvalError> {
        if !self.pointee.same_unqualified(&other.pointee) {
            return Err(EvalError::invalid_operand(format!(
                "'{}' and '{}' are not pointers to compatible types",
                self.qual_type(),
                other.qual_type()
            )));
        }
        let size = self.pointee_size()?;
        let bytes = self.addr.wrapping_sub(other.addr) as i64;
        Ok(bytes / size as i64)
    }

    /// Reinterprets the address as pointing to another type.
    pub fn cast(&self, pointee: QualType) -> Pointer {
        Pointer::new(self.addr, pointee)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::error::EvalErrorCode;
    use crate::expr::types::ScalarKind;

    fn int_ptr(addr: u64) -> Pointer {
        Pointer::new(addr, QualType::scalar(ScalarKind::Int))
    }

    #[test]
    fn test_add_scales_by_pointee_size() {
        let p = int_ptr(0x1000);
        assert_eq!(p.add(3).unwrap().addr(), 0x100c);
        assert_eq!(p.add(-1).unwrap().addr(), 0x0ffc);

        let s = Pointer::new(0x2000, QualType::tagged("Point", 24));
        assert_eq!(s.add(2).unwrap().addr(), 0x2030);
    }

    #[test]
    fn test_void_pointer_arithmetic_rejected() {
        let p = Pointer::new(0x1000, QualType::scalar(ScalarKind::Void));
        assert!(p.is_pointer_to_void());
        let err = p.add(1).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::InvalidOperandType);
    }

    #[test]
    fn test_difference() {
        assert_eq!(int_ptr(0x1010).difference(&int_ptr(0x1000)).unwrap(), 4);
        assert_eq!(int_ptr(0x1000).difference(&int_ptr(0x1010)).unwrap(), -4);

        let c = Pointer::new(0x1000, QualType::scalar(ScalarKind::Char));
        assert!(int_ptr(0x1000).difference(&c).is_err());
    }

    #[test]
    fn test_as_bool() {
        assert!(!int_ptr(0).as_bool());
        assert!(int_ptr(8).as_bool());
    }
}
