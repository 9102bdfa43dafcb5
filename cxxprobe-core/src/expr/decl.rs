//! Parsed type-ids and their resolution against the debug context

use super::context::DebugContext;
use super::error::EvalError;
use super::types::{CvQualifiers, QualType, ScalarKind, Type};

/// Keywords allowed in a simple type specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinSpecifier {
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    Signed,
    Unsigned,
    Float,
    Double,
}

impl BuiltinSpecifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinSpecifier::Void => "void",
            BuiltinSpecifier::Bool => "bool",
            BuiltinSpecifier::Char => "char",
            BuiltinSpecifier::Short => "short",
            BuiltinSpecifier::Int => "int",
            BuiltinSpecifier::Long => "long",
            BuiltinSpecifier::Signed => "signed",
            BuiltinSpecifier::Unsigned => "unsigned",
            BuiltinSpecifier::Float => "float",
            BuiltinSpecifier::Double => "double",
        }
    }
}

/// One element of the declarator chain, in parse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtrOperator {
    /// `*` followed by the cv-qualifiers that apply to the pointer itself
    Pointer(CvQualifiers),
    /// `&`
    Reference,
}

/// A type-id as written, before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDeclaration {
    pub builtins: Vec<BuiltinSpecifier>,
    /// User type name, possibly qualified and with template arguments.
    pub type_name: Option<String>,
    /// Qualifiers of the base type.
    pub cv: CvQualifiers,
    pub ptr_operators: Vec<PtrOperator>,
    /// Set when the specifier sequence is ill-formed.
    pub is_invalid: bool,
}

impl TypeDeclaration {
    pub fn has_type_specifier(&self) -> bool {
        !self.builtins.is_empty() || self.type_name.is_some()
    }

    fn spelling(&self) -> String {
        let mut words: Vec<&str> = Vec::new();
        if self.cv.is_const {
            words.push("const");
        }
        if self.cv.is_volatile {
            words.push("volatile");
        }
        words.extend(self.builtins.iter().map(|b| b.as_str()));
        if let Some(name) = &self.type_name {
            words.push(name);
        }
        words.join(" ")
    }

    /// Resolves to exactly one concrete type, or fails without partial results.
    pub fn resolve(&self, ctx: &dyn DebugContext) -> Result<QualType, EvalError> {
        if self.is_invalid || !self.has_type_specifier() {
            return Err(EvalError::invalid_syntax(format!(
                "'{}' is not a valid type",
                self.spelling()
            )));
        }

        let base = match &self.type_name {
            Some(name) => ctx
                .lookup_type(name)
                .ok_or_else(|| EvalError::undeclared(format!("unknown type name '{}'", name)))?,
            None => Type::Scalar(builtin_kind(&self.builtins).ok_or_else(|| {
                EvalError::invalid_syntax(format!("'{}' is not a valid type", self.spelling()))
            })?),
        };

        let mut ty = QualType::with_cv(base, self.cv);
        for op in &self.ptr_operators {
            ty = match op {
                PtrOperator::Pointer(cv) => ty.pointer_to().qualified(*cv),
                PtrOperator::Reference => {
                    if ty.is_void() {
                        return Err(EvalError::invalid_operand(
                            "cannot form a reference to 'void'",
                        ));
                    }
                    if matches!(ty.ty, Type::Reference(_)) {
                        return Err(EvalError::invalid_syntax(
                            "'&' cannot be applied to a reference type",
                        ));
                    }
                    ty.reference_to()
                }
            };
        }

        if ty.is_void() {
            return Err(EvalError::invalid_operand(format!(
                "'{}' cannot be used as a value type",
                ty
            )));
        }
        Ok(ty)
    }
}

/// Maps a builtin specifier combination such as `unsigned long int` to its
/// scalar kind.
pub fn builtin_kind(specifiers: &[BuiltinSpecifier]) -> Option<ScalarKind> {
    let count = |s: BuiltinSpecifier| specifiers.iter().filter(|&&x| x == s).count();
    let signed = count(BuiltinSpecifier::Signed);
    let unsigned = count(BuiltinSpecifier::Unsigned);
    let short = count(BuiltinSpecifier::Short);
    let long = count(BuiltinSpecifier::Long);

    let mut bases = specifiers.iter().filter(|s| {
        !matches!(
            s,
            BuiltinSpecifier::Signed
                | BuiltinSpecifier::Unsigned
                | BuiltinSpecifier::Short
                | BuiltinSpecifier::Long
        )
    });
    let base = bases.next().copied();
    if bases.next().is_some() || signed + unsigned > 1 || (short > 0 && long > 0) || short > 1 {
        return None;
    }

    let sign_or_size = signed + unsigned + short + long > 0;
    match base {
        Some(BuiltinSpecifier::Void) if !sign_or_size => Some(ScalarKind::Void),
        Some(BuiltinSpecifier::Bool) if !sign_or_size => Some(ScalarKind::Bool),
        Some(BuiltinSpecifier::Float) if !sign_or_size => Some(ScalarKind::Float),
        Some(BuiltinSpecifier::Double) if !sign_or_size => Some(ScalarKind::Double),
        Some(BuiltinSpecifier::Char) if short + long == 0 => Some(if signed > 0 {
            ScalarKind::SignedChar
        } else if unsigned > 0 {
            ScalarKind::UnsignedChar
        } else {
            ScalarKind::Char
        }),
        Some(BuiltinSpecifier::Int) | None => {
            let kind = match (short, long) {
                (1, 0) => ScalarKind::Short,
                (0, 0) => ScalarKind::Int,
                (0, 1) => ScalarKind::Long,
                (0, 2) => ScalarKind::LongLong,
                _ => return None,
            };
            // a lone sign or size keyword still needs something to qualify
            if base.is_none() && !sign_or_size {
                return None;
            }
            Some(if unsigned > 0 { kind.to_unsigned() } else { kind })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::error::EvalErrorCode;
    use crate::snapshot::SnapshotContext;
    use BuiltinSpecifier::*;

    #[test]
    fn test_builtin_combinations() {
        assert_eq!(builtin_kind(&[Unsigned]), Some(ScalarKind::UnsignedInt));
        assert_eq!(builtin_kind(&[Long, Unsigned, Long, Int]), Some(ScalarKind::UnsignedLongLong));
        assert_eq!(builtin_kind(&[Signed, Char]), Some(ScalarKind::SignedChar));
        assert_eq!(builtin_kind(&[Short]), Some(ScalarKind::Short));
        assert_eq!(builtin_kind(&[Char]), Some(ScalarKind::Char));
        assert_eq!(builtin_kind(&[Signed, Float]), None);
        assert_eq!(builtin_kind(&[Long, Long, Long]), None);
        assert_eq!(builtin_kind(&[Int, Char]), None);
        assert_eq!(builtin_kind(&[Signed, Unsigned]), None);
        assert_eq!(builtin_kind(&[]), None);
    }

    #[test]
    fn test_declarator_order() {
        let ctx = SnapshotContext::new();
        // const char* const*
        let decl = TypeDeclaration {
            builtins: vec![Char],
            cv: CvQualifiers::CONST,
            ptr_operators: vec![
                PtrOperator::Pointer(CvQualifiers::CONST),
                PtrOperator::Pointer(CvQualifiers::NONE),
            ],
            ..Default::default()
        };
        let ty = decl.resolve(&ctx).unwrap();
        assert_eq!(ty.to_string(), "const char* const*");
    }

    #[test]
    fn test_void_requires_indirection() {
        let ctx = SnapshotContext::new();
        let mut decl = TypeDeclaration {
            builtins: vec![Void],
            ..Default::default()
        };
        let err = decl.resolve(&ctx).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::InvalidOperandType);

        decl.ptr_operators.push(PtrOperator::Pointer(CvQualifiers::NONE));
        assert_eq!(decl.resolve(&ctx).unwrap().to_string(), "void*");
    }

    #[test]
    fn test_unknown_type_name() {
        let ctx = SnapshotContext::new();
        let decl = TypeDeclaration {
            type_name: Some("ns::Missing".to_string()),
            ..Default::default()
        };
        let err = decl.resolve(&ctx).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::UndeclaredIdentifier);
        assert_eq!(err.message(), "unknown type name 'ns::Missing'");
    }
}
