//! Concrete type model shared by the parser, interpreter and contexts
//!
//! Sizes follow the LP64 data model: `char` is signed, `long` and pointers
//! are eight bytes wide.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Size of a pointer or reference in the inspected program.
pub const POINTER_SIZE: u64 = 8;

/// Primitive types, `void` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Void => "void",
            ScalarKind::Bool => "bool",
            ScalarKind::Char => "char",
            ScalarKind::SignedChar => "signed char",
            ScalarKind::UnsignedChar => "unsigned char",
            ScalarKind::Short => "short",
            ScalarKind::UnsignedShort => "unsigned short",
            ScalarKind::Int => "int",
            ScalarKind::UnsignedInt => "unsigned int",
            ScalarKind::Long => "long",
            ScalarKind::UnsignedLong => "unsigned long",
            ScalarKind::LongLong => "long long",
            ScalarKind::UnsignedLongLong => "unsigned long long",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
        }
    }

    /// Size in bytes; `None` for `void`.
    pub fn byte_size(&self) -> Option<u64> {
        let size = match self {
            ScalarKind::Void => return None,
            ScalarKind::Bool
            | ScalarKind::Char
            | ScalarKind::SignedChar
            | ScalarKind::UnsignedChar => 1,
            ScalarKind::Short | ScalarKind::UnsignedShort => 2,
            ScalarKind::Int | ScalarKind::UnsignedInt | ScalarKind::Float => 4,
            ScalarKind::Long
            | ScalarKind::UnsignedLong
            | ScalarKind::LongLong
            | ScalarKind::UnsignedLongLong
            | ScalarKind::Double => 8,
        };
        Some(size)
    }

    pub fn bit_width(&self) -> u32 {
        self.byte_size().map(|s| s as u32 * 8).unwrap_or(0)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, ScalarKind::Void)
    }

    pub fn is_integral(&self) -> bool {
        !matches!(
            self,
            ScalarKind::Void | ScalarKind::Float | ScalarKind::Double
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, ScalarKind::Float | ScalarKind::Double)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            ScalarKind::Char
                | ScalarKind::SignedChar
                | ScalarKind::Short
                | ScalarKind::Int
                | ScalarKind::Long
                | ScalarKind::LongLong
                | ScalarKind::Float
                | ScalarKind::Double
        )
    }

    /// Integer conversion rank; meaningless for floating kinds.
    fn rank(&self) -> u8 {
        match self {
            ScalarKind::Void | ScalarKind::Float | ScalarKind::Double => 0,
            ScalarKind::Bool => 1,
            ScalarKind::Char | ScalarKind::SignedChar | ScalarKind::UnsignedChar => 2,
            ScalarKind::Short | ScalarKind::UnsignedShort => 3,
            ScalarKind::Int | ScalarKind::UnsignedInt => 4,
            ScalarKind::Long | ScalarKind::UnsignedLong => 5,
            ScalarKind::LongLong | ScalarKind::UnsignedLongLong => 6,
        }
    }

    /// Integral promotion: everything narrower than `int` becomes `int`.
    pub fn promote(self) -> ScalarKind {
        if self.is_integral() && self.rank() < ScalarKind::Int.rank() {
            ScalarKind::Int
        } else {
            self
        }
    }

    pub fn to_unsigned(self) -> ScalarKind {
        match self {
            ScalarKind::Char | ScalarKind::SignedChar => ScalarKind::UnsignedChar,
            ScalarKind::Short => ScalarKind::UnsignedShort,
            ScalarKind::Int => ScalarKind::UnsignedInt,
            ScalarKind::Long => ScalarKind::UnsignedLong,
            ScalarKind::LongLong => ScalarKind::UnsignedLongLong,
            other => other,
        }
    }

    /// Usual arithmetic conversions: the common kind of a binary operation.
    pub fn common(lhs: ScalarKind, rhs: ScalarKind) -> ScalarKind {
        if lhs == ScalarKind::Double || rhs == ScalarKind::Double {
            return ScalarKind::Double;
        }
        if lhs == ScalarKind::Float || rhs == ScalarKind::Float {
            return ScalarKind::Float;
        }

        let (lhs, rhs) = (lhs.promote(), rhs.promote());
        if lhs == rhs {
            return lhs;
        }
        if lhs.is_signed() == rhs.is_signed() {
            return if lhs.rank() >= rhs.rank() { lhs } else { rhs };
        }

        let (signed, unsigned) = if lhs.is_signed() { (lhs, rhs) } else { (rhs, lhs) };
        if unsigned.rank() >= signed.rank() {
            unsigned
        } else if signed.bit_width() > unsigned.bit_width() {
            signed
        } else {
            signed.to_unsigned()
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `const` / `volatile` qualifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CvQualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
}

impl CvQualifiers {
    pub const NONE: CvQualifiers = CvQualifiers {
        is_const: false,
        is_volatile: false,
    };
    pub const CONST: CvQualifiers = CvQualifiers {
        is_const: true,
        is_volatile: false,
    };
    pub const VOLATILE: CvQualifiers = CvQualifiers {
        is_const: false,
        is_volatile: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.is_const && !self.is_volatile
    }
}

impl BitOr for CvQualifiers {
    type Output = CvQualifiers;

    fn bitor(self, rhs: CvQualifiers) -> CvQualifiers {
        CvQualifiers {
            is_const: self.is_const || rhs.is_const,
            is_volatile: self.is_volatile || rhs.is_volatile,
        }
    }
}

impl fmt::Display for CvQualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_const, self.is_volatile) {
            (true, true) => f.write_str("const volatile"),
            (true, false) => f.write_str("const"),
            (false, true) => f.write_str("volatile"),
            (false, false) => Ok(()),
        }
    }
}

/// A struct, class or union known to the debug context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedType {
    pub name: String,
    pub size: u64,
}

impl TaggedType {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Scalar(ScalarKind),
    Tagged(TaggedType),
    Pointer(Box<QualType>),
    Reference(Box<QualType>),
    Array { element: Box<QualType>, len: u64 },
}

impl Type {
    /// Size in bytes; `None` for `void` and types containing it by value.
    pub fn byte_size(&self) -> Option<u64> {
        match self {
            Type::Scalar(kind) => kind.byte_size(),
            Type::Tagged(tagged) => Some(tagged.size),
            Type::Pointer(_) | Type::Reference(_) => Some(POINTER_SIZE),
            Type::Array { element, len } => element.ty.byte_size()?.checked_mul(*len),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Scalar(ScalarKind::Void))
    }

    pub fn as_scalar(&self) -> Option<ScalarKind> {
        match self {
            Type::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// A type together with its top-level cv-qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualType {
    pub ty: Type,
    pub cv: CvQualifiers,
}

impl QualType {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            cv: CvQualifiers::NONE,
        }
    }

    pub fn with_cv(ty: Type, cv: CvQualifiers) -> Self {
        Self { ty, cv }
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self::new(Type::Scalar(kind))
    }

    pub fn tagged(name: impl Into<String>, size: u64) -> Self {
        Self::new(Type::Tagged(TaggedType::new(name, size)))
    }

    pub fn pointer_to(self) -> QualType {
        QualType::new(Type::Pointer(Box::new(self)))
    }

    pub fn reference_to(self) -> QualType {
        QualType::new(Type::Reference(Box::new(self)))
    }

    pub fn array_of(self, len: u64) -> QualType {
        QualType::new(Type::Array {
            element: Box::new(self),
            len,
        })
    }

    pub fn qualified(mut self, cv: CvQualifiers) -> QualType {
        self.cv = self.cv | cv;
        self
    }

    pub fn unqualified(&self) -> QualType {
        QualType::new(self.ty.clone())
    }

    /// Equality ignoring top-level cv-qualifiers.
    pub fn same_unqualified(&self, other: &QualType) -> bool {
        self.ty == other.ty
    }

    pub fn byte_size(&self) -> Option<u64> {
        self.ty.byte_size()
    }

    pub fn is_void(&self) -> bool {
        self.ty.is_void()
    }

    fn named(&self, name: &str, inner: &str) -> String {
        let mut out = if self.cv.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", self.cv, name)
        };
        if inner.starts_with('(') {
            out.push(' ');
        }
        out.push_str(inner);
        out
    }

    /// Builds the C declarator spelling, `inner` being the part already
    /// produced for the enclosing type.
    fn declarator(&self, inner: String) -> String {
        match &self.ty {
            Type::Scalar(kind) => self.named(kind.name(), &inner),
            Type::Tagged(tagged) => self.named(&tagged.name, &inner),
            Type::Pointer(pointee) => {
                let mut ptr = String::from("*");
                if !self.cv.is_empty() {
                    ptr.push(' ');
                    ptr.push_str(&self.cv.to_string());
                }
                ptr.push_str(&inner);
                pointee.declarator(ptr)
            }
            Type::Reference(referent) => referent.declarator(format!("&{}", inner)),
            Type::Array { element, len } => {
                let inner = if inner.starts_with('*') || inner.starts_with('&') {
                    format!("({})", inner)
                } else {
                    inner
                };
                element.declarator(format!("{}[{}]", inner, len))
            }
        }
    }
}

impl fmt::Display for QualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declarator(String::new()))
    }
}
