//! In-memory debug context
//!
//! `SnapshotContext` answers variable, type, field and memory queries from
//! data held in memory. It is built either programmatically or from a
//! [`FrameSnapshot`] JSON document, which makes it usable for offline
//! evaluation and for tests.

mod frame;

pub use frame::{
    FieldDef, FrameSnapshot, InitialValue, MemoryRegion, StructDef, TypedefDef, VariableDef,
};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::debug;

use crate::expr::context::{DebugContext, Field, Variable};
use crate::expr::parser::parse_type;
use crate::expr::scalar::Scalar;
use crate::expr::types::{QualType, TaggedType, Type};

#[derive(Debug, Clone, Default)]
pub struct SnapshotContext {
    function: String,
    /// Innermost scope last.
    scopes: Vec<HashMap<String, Variable>>,
    globals: HashMap<String, Variable>,
    types: HashMap<String, Type>,
    fields: HashMap<String, Vec<Field>>,
    /// Later regions shadow earlier ones.
    memory: Vec<MemoryRegion>,
}

impl SnapshotContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let frame: FrameSnapshot =
            serde_json::from_str(json).context("Failed to parse frame snapshot JSON")?;
        Self::from_frame(&frame)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read frame snapshot {:?}", path))?;
        Self::from_json(&json).with_context(|| format!("Invalid frame snapshot {:?}", path))
    }

    pub fn from_frame(frame: &FrameSnapshot) -> Result<Self> {
        let mut ctx = SnapshotContext::new();
        ctx.function = frame.function.clone();

        // Register every struct before parsing field types, so that
        // structs may refer to each other.
        let records: Vec<TaggedType> = frame
            .structs
            .iter()
            .map(|def| ctx.add_struct(def.name.clone(), def.size, Vec::new()))
            .collect();

        for def in &frame.typedefs {
            let ty = parse_type(&def.type_name, &ctx)
                .with_context(|| format!("typedef '{}'", def.name))?;
            ctx.add_type(def.name.clone(), ty.ty);
        }

        let mut fields = Vec::new();
        for (def, record) in frame.structs.iter().zip(&records) {
            for field in &def.fields {
                let ty = parse_type(&field.type_name, &ctx).with_context(|| {
                    format!("field '{}' of struct '{}'", field.name, def.name)
                })?;
                fields.push((record, Field {
                    name: field.name.clone(),
                    ty,
                    offset: field.offset,
                }));
            }
        }
        for (record, field) in fields {
            ctx.fields.entry(record.name.clone()).or_default().push(field);
        }

        ctx.memory.extend(frame.memory.iter().cloned());

        for def in &frame.globals {
            let var = ctx.load_variable(def)?;
            ctx.globals.insert(var.name.clone(), var);
        }
        for scope in &frame.scopes {
            ctx.push_scope();
            for def in scope {
                let var = ctx.load_variable(def)?;
                ctx.insert_local(var);
            }
        }

        debug!(
            "loaded frame '{}': {} globals, {} scopes, {} types",
            ctx.function,
            ctx.globals.len(),
            ctx.scopes.len(),
            ctx.types.len()
        );
        Ok(ctx)
    }

    fn load_variable(&mut self, def: &VariableDef) -> Result<Variable> {
        let ty = parse_type(&def.type_name, &*self)
            .with_context(|| format!("variable '{}'", def.name))?;
        if let Some(value) = def.value {
            let bytes = encode(value, &ty)
                .with_context(|| format!("initial value of variable '{}'", def.name))?;
            self.write_memory(def.address, bytes);
        }
        Ok(Variable {
            name: def.name.clone(),
            ty,
            address: def.address,
        })
    }

    /// Name of the function the frame belongs to.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Opens a nested block scope; later locals shadow earlier ones.
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn insert_local(&mut self, var: Variable) {
        if self.scopes.is_empty() {
            self.push_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(var.name.clone(), var);
        }
    }

    pub fn add_local(&mut self, name: impl Into<String>, ty: QualType, address: u64) {
        self.insert_local(Variable {
            name: name.into(),
            ty,
            address,
        });
    }

    pub fn add_global(&mut self, name: impl Into<String>, ty: QualType, address: u64) {
        let name = name.into();
        self.globals.insert(
            name.clone(),
            Variable {
                name,
                ty,
                address,
            },
        );
    }

    /// Declares a struct type and returns its handle.
    pub fn add_struct(
        &mut self,
        name: impl Into<String>,
        size: u64,
        fields: Vec<Field>,
    ) -> TaggedType {
        let record = TaggedType::new(name, size);
        self.types
            .insert(record.name.clone(), Type::Tagged(record.clone()));
        self.fields.insert(record.name.clone(), fields);
        record
    }

    pub fn add_field(
        &mut self,
        record: &TaggedType,
        name: impl Into<String>,
        ty: QualType,
        offset: u64,
    ) {
        self.fields.entry(record.name.clone()).or_default().push(Field {
            name: name.into(),
            ty,
            offset,
        });
    }

    /// Makes `name` an alias of `ty`.
    pub fn add_type(&mut self, name: impl Into<String>, ty: Type) {
        self.types.insert(name.into(), ty);
    }

    pub fn write_memory(&mut self, address: u64, bytes: impl Into<Vec<u8>>) {
        self.memory.push(MemoryRegion::new(address, bytes.into()));
    }

    pub fn write_scalar(&mut self, address: u64, value: Scalar) {
        self.write_memory(address, value.to_bytes());
    }

    pub fn write_pointer(&mut self, address: u64, target: u64) {
        self.write_memory(address, target.to_le_bytes());
    }
}

/// Object representation of an initial value for a variable of type `ty`.
fn encode(value: InitialValue, ty: &QualType) -> Result<Vec<u8>> {
    match &ty.ty {
        Type::Scalar(kind) if !kind.is_void() => {
            let scalar = match value {
                InitialValue::Bool(b) => Scalar::from_bool(b).convert(*kind),
                InitialValue::Int(i) => Scalar::from_int(*kind, i as i128),
                InitialValue::UInt(u) => Scalar::from_int(*kind, u as i128),
                InitialValue::Float(f) => Scalar::from_float(*kind, f),
            };
            Ok(scalar.to_bytes())
        }
        Type::Pointer(_) | Type::Reference(_) => match value {
            InitialValue::Int(addr) => Ok((addr as u64).to_le_bytes().to_vec()),
            InitialValue::UInt(addr) => Ok(addr.to_le_bytes().to_vec()),
            other => bail!("expected an address for type '{}', got {:?}", ty, other),
        },
        _ => bail!("type '{}' cannot be initialized from a value", ty),
    }
}

impl DebugContext for SnapshotContext {
    fn lookup_variable(&self, name: &str) -> Option<Variable> {
        if let Some(global) = name.strip_prefix("::") {
            return self.globals.get(global).cloned();
        }
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.globals.get(name))
            .cloned()
    }

    fn lookup_type(&self, name: &str) -> Option<Type> {
        let name = name.strip_prefix("::").unwrap_or(name);
        self.types.get(name).cloned()
    }

    fn find_field(&self, record: &TaggedType, name: &str) -> Option<Field> {
        self.fields
            .get(&record.name)?
            .iter()
            .find(|field| field.name == name)
            .cloned()
    }

    fn read_memory(&self, address: u64, size: usize) -> Option<Vec<u8>> {
        if let Some(bytes) = self.memory.last().and_then(|r| r.read(address, size)) {
            return Some(bytes.to_vec());
        }
        (0..size as u64)
            .map(|i| {
                let addr = address.checked_add(i)?;
                self.memory.iter().rev().find_map(|region| region.byte(addr))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::types::ScalarKind;
    use crate::expr::value::Value;
    use std::io::Write;

    fn frame_json() -> String {
        serde_json::json!({
            "function": "list_sum",
            "file": "list.cc",
            "line": 12,
            "structs": [
                {
                    "name": "Node",
                    "size": 16,
                    "fields": [
                        { "name": "value", "type": "int", "offset": 0 },
                        { "name": "next", "type": "Node*", "offset": 8 }
                    ]
                }
            ],
            "typedefs": [
                { "name": "node_ptr", "type": "Node*" }
            ],
            "globals": [
                { "name": "limit", "type": "unsigned int", "address": 256, "value": 10 }
            ],
            "scopes": [
                [
                    { "name": "head", "type": "Node*", "address": 512, "value": 4096 },
                    { "name": "i", "type": "int", "address": 520, "value": 1 }
                ],
                [
                    { "name": "i", "type": "short", "address": 528, "value": -2 },
                    { "name": "buf", "type": "char[4]", "address": 536 }
                ]
            ],
            "memory": [
                { "address": 4096, "bytes": [5, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0] },
                { "address": 536, "bytes": [104, 105, 0, 0] }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_load_from_json() {
        let ctx = SnapshotContext::from_json(&frame_json()).unwrap();
        assert_eq!(ctx.function(), "list_sum");

        let head = ctx.lookup_variable("head").unwrap();
        assert_eq!(head.ty.to_string(), "Node*");
        assert_eq!(ctx.read_memory(512, 8).unwrap(), 4096u64.to_le_bytes());

        let node = match ctx.lookup_type("Node").unwrap() {
            Type::Tagged(node) => node,
            other => panic!("unexpected type {:?}", other),
        };
        let next = ctx.find_field(&node, "next").unwrap();
        assert_eq!(next.offset, 8);
        assert_eq!(next.ty.to_string(), "Node*");
        assert_eq!(ctx.lookup_type("::node_ptr"), Some(next.ty.ty));
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let ctx = SnapshotContext::from_json(&frame_json()).unwrap();
        let i = ctx.lookup_variable("i").unwrap();
        assert_eq!(i.ty, QualType::scalar(ScalarKind::Short));
        assert_eq!(ctx.lookup_variable("limit").unwrap().address, 256);
        assert_eq!(ctx.lookup_variable("::limit").unwrap().address, 256);
        assert!(ctx.lookup_variable("::i").is_none());
        assert!(ctx.lookup_variable("missing").is_none());
    }

    #[test]
    fn test_evaluate_against_snapshot() {
        let ctx = SnapshotContext::from_json(&frame_json()).unwrap();
        let value = crate::evaluate("head->value + i", &ctx).unwrap();
        assert_eq!(value.as_scalar().unwrap().as_i128(), 3);

        let value = crate::evaluate("buf[1]", &ctx).unwrap();
        assert_eq!(value.to_string(), "105 'i'");

        let value = crate::evaluate("limit - 11", &ctx).unwrap();
        assert_eq!(value.type_name(), "unsigned int");
        assert_eq!(value.as_scalar().unwrap().as_i128(), u32::MAX as i128);

        let value = crate::evaluate("(node_ptr)0", &ctx).unwrap();
        assert!(matches!(value, Value::Pointer(ref p) if p.addr() == 0));

        // head->next is zero-filled, reading through it fails
        let err = crate::evaluate("head->next->value", &ctx).unwrap_err();
        assert_eq!(err.code(), crate::EvalErrorCode::Unknown);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(frame_json().as_bytes()).unwrap();
        let ctx = SnapshotContext::from_file(file.path()).unwrap();
        assert!(ctx.lookup_variable("head").is_some());

        let missing = file.path().with_extension("missing");
        let err = SnapshotContext::from_file(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read frame snapshot"));
    }

    #[test]
    fn test_bad_type_text_is_reported() {
        let json = serde_json::json!({
            "function": "f",
            "scopes": [[{ "name": "x", "type": "Missing*", "address": 0 }]]
        })
        .to_string();
        let err = SnapshotContext::from_json(&json).unwrap_err();
        assert!(format!("{:#}", err).contains("variable 'x'"));
        assert!(format!("{:#}", err).contains("unknown type name 'Missing'"));
    }

    #[test]
    fn test_later_writes_shadow_earlier_ones() {
        let mut ctx = SnapshotContext::new();
        ctx.write_memory(0x10, vec![1, 2, 3, 4]);
        ctx.write_memory(0x12, vec![9]);
        assert_eq!(ctx.read_memory(0x12, 1).unwrap(), vec![9]);
        assert_eq!(ctx.read_memory(0x10, 2).unwrap(), vec![1, 2]);
        assert_eq!(ctx.read_memory(0x11, 3).unwrap(), vec![2, 9, 4]);
        assert!(ctx.read_memory(0x13, 2).is_none());
    }

    #[test]
    fn test_partial_overwrite_is_visible_to_loads() {
        let mut ctx = SnapshotContext::new();
        ctx.add_local("n", QualType::scalar(ScalarKind::Int), 0x100);
        ctx.write_scalar(0x100, Scalar::from_int(ScalarKind::Int, 0x0102_0304));
        ctx.write_memory(0x101, vec![0xff]);
        let value = crate::evaluate("n", &ctx).unwrap();
        assert_eq!(value.as_scalar().unwrap().as_i128(), 0x0102_ff04);
    }

    #[test]
    fn test_oversized_array_arithmetic_is_an_error() {
        let json = serde_json::json!({
            "function": "f",
            "scopes": [[{ "name": "a", "type": "long[4611686018427387904]", "address": 4096 }]]
        })
        .to_string();
        let ctx = SnapshotContext::from_json(&json).unwrap();
        let err = crate::evaluate("&a + 1", &ctx).unwrap_err();
        assert_eq!(err.code(), crate::EvalErrorCode::InvalidOperandType);
    }
}
