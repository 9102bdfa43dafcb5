//! Scalar values with C conversion semantics

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::ScalarKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScalarData {
    Int(i128),
    Float(f64),
}

/// A primitive value tagged with its kind.
///
/// Integer payloads are always stored already truncated to the kind's width
/// and sign-extended or zero-extended according to its signedness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scalar {
    kind: ScalarKind,
    data: ScalarData,
}

fn wrap_int(kind: ScalarKind, value: i128) -> i128 {
    if kind == ScalarKind::Bool {
        return (value != 0) as i128;
    }
    let bits = kind.bit_width();
    if bits == 0 || bits >= 128 {
        return value;
    }
    let mask = (1i128 << bits) - 1;
    let truncated = value & mask;
    if kind.is_signed() && truncated & (1i128 << (bits - 1)) != 0 {
        truncated - (1i128 << bits)
    } else {
        truncated
    }
}

fn float_to_int(value: f64) -> i128 {
    // `as` saturates and maps NaN to zero
    value.trunc() as i128
}

impl Scalar {
    pub fn from_int(kind: ScalarKind, value: i128) -> Self {
        debug_assert!(!kind.is_void(), "void has no scalar values");
        let data = match kind {
            ScalarKind::Float => ScalarData::Float(value as f32 as f64),
            ScalarKind::Double => ScalarData::Float(value as f64),
            _ => ScalarData::Int(wrap_int(kind, value)),
        };
        Self { kind, data }
    }

    pub fn from_float(kind: ScalarKind, value: f64) -> Self {
        debug_assert!(!kind.is_void(), "void has no scalar values");
        let data = match kind {
            ScalarKind::Float => ScalarData::Float(value as f32 as f64),
            ScalarKind::Double => ScalarData::Float(value),
            ScalarKind::Bool => ScalarData::Int((value != 0.0) as i128),
            _ => ScalarData::Int(wrap_int(kind, float_to_int(value))),
        };
        Self { kind, data }
    }

    pub fn from_bool(value: bool) -> Self {
        Self::from_int(ScalarKind::Bool, value as i128)
    }

    /// Decodes a little-endian object representation.
    pub fn from_bytes(kind: ScalarKind, bytes: &[u8]) -> Option<Self> {
        let size = kind.byte_size()? as usize;
        let bytes = bytes.get(..size)?;
        let scalar = match kind {
            ScalarKind::Float => {
                let raw: [u8; 4] = bytes.try_into().ok()?;
                Self::from_float(kind, f32::from_le_bytes(raw) as f64)
            }
            ScalarKind::Double => {
                let raw: [u8; 8] = bytes.try_into().ok()?;
                Self::from_float(kind, f64::from_le_bytes(raw))
            }
            _ => {
                let mut raw = [0u8; 16];
                raw[..size].copy_from_slice(bytes);
                Self::from_int(kind, i128::from_le_bytes(raw))
            }
        };
        Some(scalar)
    }

    /// Little-endian object representation, `byte_size` bytes long.
    pub fn to_bytes(&self) -> Vec<u8> {
        match (self.kind, self.data) {
            (ScalarKind::Float, ScalarData::Float(v)) => (v as f32).to_le_bytes().to_vec(),
            (_, ScalarData::Float(v)) => v.to_le_bytes().to_vec(),
            (kind, ScalarData::Int(v)) => {
                let size = kind.byte_size().unwrap_or(0) as usize;
                v.to_le_bytes()[..size].to_vec()
            }
        }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn data(&self) -> ScalarData {
        self.data
    }

    pub fn as_i128(&self) -> i128 {
        match self.data {
            ScalarData::Int(v) => v,
            ScalarData::Float(v) => float_to_int(v),
        }
    }

    /// The value's bit pattern reinterpreted as an unsigned 64-bit integer.
    pub fn as_u64(&self) -> u64 {
        self.as_i128() as u64
    }

    pub fn as_f64(&self) -> f64 {
        match self.data {
            ScalarData::Int(v) => v as f64,
            ScalarData::Float(v) => v,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self.data {
            ScalarData::Int(v) => v == 0,
            ScalarData::Float(v) => v == 0.0,
        }
    }

    pub fn as_bool(&self) -> bool {
        !self.is_zero()
    }

    /// Converts the value to another kind as a C cast would.
    pub fn convert(&self, kind: ScalarKind) -> Scalar {
        match self.data {
            ScalarData::Int(v) => Scalar::from_int(kind, v),
            ScalarData::Float(v) => Scalar::from_float(kind, v),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.data) {
            (ScalarKind::Bool, data) => {
                let truth = !matches!(data, ScalarData::Int(0));
                write!(f, "{}", truth)
            }
            (ScalarKind::Char | ScalarKind::SignedChar | ScalarKind::UnsignedChar, ScalarData::Int(v)) => {
                match u8::try_from(v).ok().filter(|b| b.is_ascii_graphic() || *b == b' ') {
                    Some(b) => write!(f, "{} '{}'", v, b as char),
                    None => write!(f, "{}", v),
                }
            }
            (ScalarKind::Float, ScalarData::Float(v)) => write!(f, "{}", v as f32),
            (_, ScalarData::Float(v)) => write!(f, "{}", v),
            (_, ScalarData::Int(v)) => write!(f, "{}", v),
        }
    }
}
