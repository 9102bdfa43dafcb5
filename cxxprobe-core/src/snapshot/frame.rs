//! Serialized frame description
//!
//! A `FrameSnapshot` captures what the evaluator needs from a stopped
//! process: visible variables, the struct layouts they use and the bytes of
//! memory they live in. Type text uses the same grammar as casts, with
//! optional array bounds (`"Node*"`, `"char[16]"`).

use serde::{Deserialize, Serialize};

/// Stack frame information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Function name
    pub function: String,
    /// Source file path
    #[serde(default)]
    pub file: Option<String>,
    /// Line number
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub typedefs: Vec<TypedefDef>,
    #[serde(default)]
    pub globals: Vec<VariableDef>,
    /// Block scopes of the frame, outermost first.
    #[serde(default)]
    pub scopes: Vec<Vec<VariableDef>>,
    #[serde(default)]
    pub memory: Vec<MemoryRegion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedefDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub address: u64,
    /// Written to `address` when the snapshot is loaded.
    #[serde(default)]
    pub value: Option<InitialValue>,
}

/// Shorthand for a scalar or pointer variable's contents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// Bytes of target memory starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub address: u64,
    pub bytes: Vec<u8>,
}

impl MemoryRegion {
    pub fn new(address: u64, bytes: Vec<u8>) -> Self {
        Self { address, bytes }
    }

    /// The `size` bytes at `address`, if they all lie inside this region.
    pub fn read(&self, address: u64, size: usize) -> Option<&[u8]> {
        let start = usize::try_from(address.checked_sub(self.address)?).ok()?;
        let end = start.checked_add(size)?;
        self.bytes.get(start..end)
    }

    /// The byte at `address`, if this region covers it.
    pub fn byte(&self, address: u64) -> Option<u8> {
        let offset = usize::try_from(address.checked_sub(self.address)?).ok()?;
        self.bytes.get(offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_bounds() {
        let region = MemoryRegion::new(0x100, vec![1, 2, 3, 4]);
        assert_eq!(region.read(0x101, 2), Some(&[2u8, 3][..]));
        assert_eq!(region.read(0x100, 4), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(region.read(0x102, 4), None);
        assert_eq!(region.read(0xff, 1), None);
        assert_eq!(region.byte(0x103), Some(4));
        assert_eq!(region.byte(0x104), None);
    }

    #[test]
    fn test_initial_value_forms() {
        let values: Vec<InitialValue> = serde_json::from_str("[true, -3, 18446744073709551615, 2.5]").unwrap();
        assert_eq!(
            values,
            vec![
                InitialValue::Bool(true),
                InitialValue::Int(-3),
                InitialValue::UInt(u64::MAX),
                InitialValue::Float(2.5),
            ]
        );
    }

    #[test]
    fn test_optional_sections_default() {
        let frame: FrameSnapshot = serde_json::from_str(r#"{"function": "main"}"#).unwrap();
        assert_eq!(frame.function, "main");
        assert!(frame.scopes.is_empty());
        assert!(frame.file.is_none());
    }
}
