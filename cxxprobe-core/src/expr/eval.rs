//! Expression evaluator
//!
//! Walks a parsed AST once against a [`DebugContext`]. Lvalue expressions
//! (identifiers, member access, subscripts, dereferences) are first reduced
//! to a typed address and then loaded, which is also what `&` builds on.

use log::trace;

use super::ast::{AstNode, BinOp, MemberAccess, UnaryOp};
use super::context::{DebugContext, Variable};
use super::error::{EvalError, EvalErrorCode};
use super::ops;
use super::pointer::Pointer;
use super::scalar::Scalar;
use super::types::{QualType, ScalarKind, Type, POINTER_SIZE};
use super::value::{Aggregate, Value};

/// A typed object location in the inspected program.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Place {
    ty: QualType,
    address: u64,
}

/// Tree-walking interpreter
pub struct Interpreter<'a> {
    ctx: &'a dyn DebugContext,
}

impl<'a> Interpreter<'a> {
    pub fn new(ctx: &'a dyn DebugContext) -> Self {
        Self { ctx }
    }

    /// Evaluates `node`, reporting failures through `error`.
    ///
    /// Returns `Value::Invalid` exactly when `error` is set.
    pub fn eval_into(&self, node: &AstNode, error: &mut EvalError) -> Value {
        match self.eval(node) {
            Ok(value) => {
                error.clear();
                value
            }
            Err(err) => {
                *error = err;
                Value::Invalid
            }
        }
    }

    /// Evaluate an expression
    pub fn eval(&self, node: &AstNode) -> Result<Value, EvalError> {
        trace!("eval `{}`", node);
        match node {
            AstNode::Error(err) => Err(err.clone()),
            AstNode::BooleanLiteral(value) => Ok(Value::bool(*value)),
            AstNode::NumericLiteral { value, .. } => Ok(Value::Scalar(*value)),

            AstNode::Identifier(_)
            | AstNode::MemberOf { .. }
            | AstNode::BinaryOp {
                op: BinOp::Subscript,
                ..
            }
            | AstNode::UnaryOp {
                op: UnaryOp::Deref,
                ..
            } => {
                let place = self.place(node)?;
                self.load(&place)
            }

            AstNode::UnaryOp {
                op: UnaryOp::AddressOf,
                expr,
            } => {
                let place = self.address_of(expr)?;
                Ok(Value::Pointer(Pointer::new(place.address, place.ty)))
            }
            AstNode::UnaryOp { op, expr } => {
                let value = self.eval_rvalue(expr)?;
                ops::unary(*op, value)
            }

            AstNode::BinaryOp { op, lhs, rhs } => {
                // left to right, no short-circuit
                let lhs = self.eval_rvalue(lhs)?;
                let rhs = self.eval_rvalue(rhs)?;
                ops::binary(*op, lhs, rhs)
            }

            AstNode::CStyleCast { ty, expr } => {
                let value = self.eval_rvalue(expr)?;
                ops::cast(value, ty)
            }

            AstNode::TernaryOp { cond, lhs, rhs } => {
                let cond = self.eval_rvalue(cond)?;
                let (selected, other) = if ops::as_bool(&cond)? {
                    (lhs, rhs)
                } else {
                    (rhs, lhs)
                };
                let value = self.eval_rvalue(selected)?;
                self.resolve_names(other)?;
                match self.static_type(other) {
                    Ok(other_ty) => Ok(ops::conditional_result(value, &decay_type(other_ty))),
                    Err(err) if err.code() == EvalErrorCode::UndeclaredIdentifier => Err(err),
                    // operand types of the unselected branch are not checked
                    Err(_) => Ok(value),
                }
            }
        }
    }

    /// Evaluates and applies array-to-pointer decay.
    fn eval_rvalue(&self, node: &AstNode) -> Result<Value, EvalError> {
        let value = self.eval(node)?;
        Ok(match value {
            Value::Aggregate(Aggregate {
                ty:
                    QualType {
                        ty: Type::Array { element, .. },
                        ..
                    },
                address,
            }) => Value::Pointer(Pointer::new(address, *element)),
            value => value,
        })
    }

    /// Resolves every identifier in `node` without typing or reading it.
    fn resolve_names(&self, node: &AstNode) -> Result<(), EvalError> {
        match node {
            AstNode::Error(err) => Err(err.clone()),
            AstNode::BooleanLiteral(_) | AstNode::NumericLiteral { .. } => Ok(()),
            AstNode::Identifier(name) => self.lookup(name).map(|_| ()),
            AstNode::CStyleCast { expr, .. } | AstNode::UnaryOp { expr, .. } => {
                self.resolve_names(expr)
            }
            AstNode::MemberOf { base, .. } => self.resolve_names(base),
            AstNode::BinaryOp { lhs, rhs, .. } => {
                self.resolve_names(lhs)?;
                self.resolve_names(rhs)
            }
            AstNode::TernaryOp { cond, lhs, rhs } => {
                self.resolve_names(cond)?;
                self.resolve_names(lhs)?;
                self.resolve_names(rhs)
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Variable, EvalError> {
        self.ctx
            .lookup_variable(name)
            .ok_or_else(|| EvalError::undeclared(format!("use of undeclared identifier '{}'", name)))
    }

    fn read(&self, address: u64, size: u64) -> Result<Vec<u8>, EvalError> {
        trace!("read {} bytes at 0x{:x}", size, address);
        self.ctx
            .read_memory(address, size as usize)
            .filter(|bytes| bytes.len() as u64 == size)
            .ok_or_else(|| EvalError::unknown(format!("cannot read memory at 0x{:x}", address)))
    }

    fn read_address(&self, address: u64) -> Result<u64, EvalError> {
        let bytes = self.read(address, POINTER_SIZE)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Loads the object stored at `place`.
    fn load(&self, place: &Place) -> Result<Value, EvalError> {
        match &place.ty.ty {
            Type::Scalar(kind) => {
                let size = kind.byte_size().ok_or_else(|| {
                    EvalError::invalid_operand("cannot load a value of type 'void'")
                })?;
                let bytes = self.read(place.address, size)?;
                Scalar::from_bytes(*kind, &bytes)
                    .map(Value::Scalar)
                    .ok_or_else(|| EvalError::unknown("malformed scalar object"))
            }
            Type::Pointer(pointee) => {
                let address = self.read_address(place.address)?;
                Ok(Value::Pointer(Pointer::new(address, (**pointee).clone())))
            }
            Type::Reference(_) => {
                let target = self.follow_reference(place.clone())?;
                self.load(&target)
            }
            Type::Tagged(_) | Type::Array { .. } => Ok(Value::Aggregate(Aggregate::new(
                place.ty.clone(),
                place.address,
            ))),
        }
    }

    /// A reference behaves as the object it refers to.
    fn follow_reference(&self, place: Place) -> Result<Place, EvalError> {
        match place.ty.ty {
            Type::Reference(referent) => Ok(Place {
                address: self.read_address(place.address)?,
                ty: *referent,
            }),
            _ => Ok(place),
        }
    }

    /// Reduces an lvalue expression to the object it designates.
    fn place(&self, node: &AstNode) -> Result<Place, EvalError> {
        let place = match node {
            AstNode::Identifier(name) => {
                let var = self.lookup(name)?;
                Place {
                    ty: var.ty,
                    address: var.address,
                }
            }
            AstNode::MemberOf {
                base,
                member,
                access,
            } => self.member_place(base, member, *access)?,
            AstNode::BinaryOp {
                op: BinOp::Subscript,
                lhs,
                rhs,
            } => self.subscript_place(lhs, rhs)?,
            AstNode::UnaryOp {
                op: UnaryOp::Deref,
                expr,
            } => match self.eval_rvalue(expr)? {
                Value::Pointer(p) if p.is_pointer_to_void() => {
                    return Err(EvalError::invalid_operand(format!(
                        "indirection not permitted on operand of type '{}'",
                        p.qual_type()
                    )))
                }
                Value::Pointer(p) => Place {
                    ty: p.pointee().clone(),
                    address: p.addr(),
                },
                other => {
                    return Err(EvalError::invalid_operand(format!(
                        "indirection requires pointer operand ('{}' invalid)",
                        other.type_name()
                    )))
                }
            },
            _ => {
                return Err(EvalError::not_implemented(format!(
                    "'{}' does not designate an object",
                    node
                )))
            }
        };
        self.follow_reference(place)
    }

    fn address_of(&self, node: &AstNode) -> Result<Place, EvalError> {
        match node {
            AstNode::Identifier(_)
            | AstNode::MemberOf { .. }
            | AstNode::BinaryOp {
                op: BinOp::Subscript,
                ..
            }
            | AstNode::UnaryOp {
                op: UnaryOp::Deref,
                ..
            } => self.place(node),
            _ => {
                let value = self.eval(node)?;
                Err(EvalError::invalid_operand(format!(
                    "cannot take the address of an rvalue of type '{}'",
                    value.type_name()
                )))
            }
        }
    }

    fn member_place(
        &self,
        base: &AstNode,
        member: &str,
        access: MemberAccess,
    ) -> Result<Place, EvalError> {
        let (record, address) = match access {
            MemberAccess::Dot => match self.eval(base)? {
                Value::Aggregate(agg) => (agg.ty, agg.address),
                other => {
                    return Err(EvalError::invalid_operand(format!(
                        "member reference base type '{}' is not a structure or union",
                        other.type_name()
                    )))
                }
            },
            MemberAccess::Arrow => match self.eval_rvalue(base)? {
                Value::Pointer(p) => (p.pointee().clone(), p.addr()),
                other => {
                    return Err(EvalError::invalid_operand(format!(
                        "member reference type '{}' is not a pointer",
                        other.type_name()
                    )))
                }
            },
        };

        let field = match &record.ty {
            Type::Tagged(tagged) => self.ctx.find_field(tagged, member).ok_or_else(|| {
                EvalError::undeclared(format!("no member named '{}' in '{}'", member, tagged.name))
            })?,
            _ => {
                return Err(EvalError::invalid_operand(format!(
                    "member reference base type '{}' is not a structure or union",
                    record
                )))
            }
        };

        // members of a const object are const
        let ty = match field.ty.ty {
            Type::Reference(_) => field.ty,
            _ => field.ty.qualified(record.cv),
        };
        Ok(Place {
            ty,
            address: address.wrapping_add(field.offset),
        })
    }

    fn subscript_place(&self, lhs: &AstNode, rhs: &AstNode) -> Result<Place, EvalError> {
        let base = self.eval_rvalue(lhs)?;
        let index = self.eval_rvalue(rhs)?;
        let (pointer, index) = match (&base, &index) {
            (Value::Pointer(p), Value::Scalar(i)) | (Value::Scalar(i), Value::Pointer(p))
                if i.kind().is_integral() =>
            {
                (p, i)
            }
            (Value::Pointer(_), _) | (_, Value::Pointer(_)) => {
                return Err(EvalError::invalid_operand("array subscript is not an integer"))
            }
            _ => {
                return Err(EvalError::invalid_operand(format!(
                    "subscripted value is not an array or pointer ('{}')",
                    base.type_name()
                )))
            }
        };
        if pointer.is_pointer_to_void() {
            return Err(EvalError::invalid_operand(
                "subscript of pointer to incomplete type 'void'",
            ));
        }
        let element = pointer.add(index.as_i128() as i64)?;
        Ok(Place {
            ty: element.pointee().clone(),
            address: element.addr(),
        })
    }

    /// Type of an expression without reading memory.
    ///
    /// Used for the branch of a conditional that is not evaluated; name
    /// resolution errors are still reported.
    pub fn static_type(&self, node: &AstNode) -> Result<QualType, EvalError> {
        let ty = match node {
            AstNode::Error(err) => return Err(err.clone()),
            AstNode::BooleanLiteral(_) => QualType::scalar(ScalarKind::Bool),
            AstNode::NumericLiteral { value, .. } => QualType::scalar(value.kind()),
            AstNode::Identifier(name) => self.lookup(name)?.ty,
            AstNode::CStyleCast { ty, expr } => {
                self.static_type(expr)?;
                ty.unqualified()
            }
            AstNode::MemberOf {
                base,
                member,
                access,
            } => {
                let base_ty = decay_reference(self.static_type(base)?);
                let cv = base_ty.cv;
                let record = match (access, base_ty.ty) {
                    (MemberAccess::Dot, ty) => QualType::with_cv(ty, cv),
                    (MemberAccess::Arrow, Type::Pointer(pointee)) => *pointee,
                    (MemberAccess::Arrow, Type::Array { element, .. }) => *element,
                    (MemberAccess::Arrow, ty) => {
                        return Err(EvalError::invalid_operand(format!(
                            "member reference type '{}' is not a pointer",
                            QualType::new(ty)
                        )))
                    }
                };
                match &record.ty {
                    Type::Tagged(tagged) => self
                        .ctx
                        .find_field(tagged, member)
                        .map(|field| field.ty)
                        .ok_or_else(|| {
                            EvalError::undeclared(format!(
                                "no member named '{}' in '{}'",
                                member, tagged.name
                            ))
                        })?,
                    _ => {
                        return Err(EvalError::invalid_operand(format!(
                            "member reference base type '{}' is not a structure or union",
                            record
                        )))
                    }
                }
            }
            AstNode::BinaryOp {
                op: BinOp::Subscript,
                lhs,
                rhs,
            } => {
                let lhs = decay_type(self.static_type(lhs)?);
                let rhs = decay_type(self.static_type(rhs)?);
                match (lhs.ty, rhs.ty) {
                    (Type::Pointer(pointee), _) | (_, Type::Pointer(pointee)) => *pointee,
                    (ty, _) => {
                        return Err(EvalError::invalid_operand(format!(
                            "subscripted value is not an array or pointer ('{}')",
                            QualType::new(ty)
                        )))
                    }
                }
            }
            AstNode::BinaryOp { op, lhs, rhs } => {
                let lhs = decay_type(self.static_type(lhs)?);
                let rhs = decay_type(self.static_type(rhs)?);
                ops::binary_type(*op, &lhs, &rhs)?
            }
            AstNode::UnaryOp { op, expr } => {
                let operand = decay_reference(self.static_type(expr)?);
                match op {
                    UnaryOp::AddressOf => operand.pointer_to(),
                    UnaryOp::Deref => match decay_type(operand).ty {
                        Type::Pointer(pointee) => *pointee,
                        ty => {
                            return Err(EvalError::invalid_operand(format!(
                                "indirection requires pointer operand ('{}' invalid)",
                                QualType::new(ty)
                            )))
                        }
                    },
                    UnaryOp::LogicalNot => QualType::scalar(ScalarKind::Bool),
                    UnaryOp::Plus | UnaryOp::Neg | UnaryOp::BitNot => match operand.ty {
                        Type::Scalar(kind) => QualType::scalar(kind.promote()),
                        ty => QualType::new(ty),
                    },
                }
            }
            AstNode::TernaryOp { cond, lhs, rhs } => {
                self.static_type(cond)?;
                let lhs = decay_type(self.static_type(lhs)?);
                let rhs = decay_type(self.static_type(rhs)?);
                match (lhs.ty.as_scalar(), rhs.ty.as_scalar()) {
                    (Some(a), Some(b)) if a != b => QualType::scalar(ScalarKind::common(a, b)),
                    _ => lhs,
                }
            }
        };
        Ok(decay_reference(ty))
    }
}

fn decay_reference(ty: QualType) -> QualType {
    match ty.ty {
        Type::Reference(referent) => *referent,
        _ => ty,
    }
}

/// Array-to-pointer decay at the type level.
fn decay_type(ty: QualType) -> QualType {
    match decay_reference(ty) {
        QualType {
            ty: Type::Array { element, .. },
            ..
        } => element.pointer_to(),
        ty => ty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::error::EvalErrorCode;
    use crate::expr::parser::parse;
    use crate::expr::types::CvQualifiers;
    use crate::snapshot::SnapshotContext;

    /// struct Point { int x; int y; };
    /// struct Node { int value; Node* next; };
    fn context() -> SnapshotContext {
        let mut ctx = SnapshotContext::new();
        let int = QualType::scalar(ScalarKind::Int);

        let point = ctx.add_struct("Point", 8, Vec::new());
        ctx.add_field(&point, "x", int.clone(), 0);
        ctx.add_field(&point, "y", int.clone(), 4);
        let node = ctx.add_struct("Node", 16, Vec::new());
        ctx.add_field(&node, "value", int.clone(), 0);
        ctx.add_field(&node, "next", QualType::new(Type::Tagged(node.clone())).pointer_to(), 8);

        let point_ty = QualType::new(Type::Tagged(point));
        let node_ty = QualType::new(Type::Tagged(node));

        ctx.add_global("counter", int.clone(), 0x500);
        ctx.write_scalar(0x500, Scalar::from_int(ScalarKind::Int, 7));

        ctx.add_local("x", int.clone(), 0x1000);
        ctx.write_scalar(0x1000, Scalar::from_int(ScalarKind::Int, 42));
        ctx.add_local("c", QualType::scalar(ScalarKind::Char), 0x1004);
        ctx.write_scalar(0x1004, Scalar::from_int(ScalarKind::Char, 97));
        ctx.add_local("u", QualType::scalar(ScalarKind::UnsignedInt), 0x1008);
        ctx.write_scalar(0x1008, Scalar::from_int(ScalarKind::UnsignedInt, 1));
        ctx.add_local("d", QualType::scalar(ScalarKind::Double), 0x1010);
        ctx.write_scalar(0x1010, Scalar::from_float(ScalarKind::Double, 2.5));

        ctx.add_local("arr", int.clone().array_of(4), 0x2000);
        for i in 0..4 {
            ctx.write_scalar(0x2000 + 4 * i, Scalar::from_int(ScalarKind::Int, (i as i128 + 1) * 10));
        }
        ctx.add_local("p", int.clone().pointer_to(), 0x1018);
        ctx.write_pointer(0x1018, 0x2000);
        ctx.add_local("vp", QualType::scalar(ScalarKind::Void).pointer_to(), 0x1020);
        ctx.write_pointer(0x1020, 0x2000);

        ctx.add_local("pt", point_ty.clone(), 0x3000);
        ctx.write_scalar(0x3000, Scalar::from_int(ScalarKind::Int, 3));
        ctx.write_scalar(0x3004, Scalar::from_int(ScalarKind::Int, 4));
        ctx.add_local("cpt", point_ty.clone().qualified(CvQualifiers::CONST).pointer_to(), 0x1028);
        ctx.write_pointer(0x1028, 0x3000);
        ctx.add_local("ref", int.clone().reference_to(), 0x1030);
        ctx.write_pointer(0x1030, 0x1000);

        // head -> second -> null
        ctx.add_local("head", node_ty.clone().pointer_to(), 0x1038);
        ctx.write_pointer(0x1038, 0x4000);
        ctx.write_scalar(0x4000, Scalar::from_int(ScalarKind::Int, 1));
        ctx.write_pointer(0x4008, 0x4010);
        ctx.write_scalar(0x4010, Scalar::from_int(ScalarKind::Int, 2));
        ctx.write_pointer(0x4018, 0);

        ctx.add_local("wild", int.pointer_to(), 0x1040);
        ctx.write_pointer(0x1040, 0xdead_0000);
        ctx
    }

    fn eval(input: &str) -> Result<Value, EvalError> {
        let ctx = context();
        let ast = parse(input, &ctx).map_err(EvalError::from)?;
        Interpreter::new(&ctx).eval(&ast)
    }

    fn eval_int(input: &str) -> i128 {
        match eval(input) {
            Ok(Value::Scalar(s)) => s.as_i128(),
            other => panic!("{} evaluated to {:?}", input, other),
        }
    }

    fn eval_code(input: &str) -> EvalErrorCode {
        eval(input).unwrap_err().code()
    }

    #[test]
    fn test_literals_and_arithmetic() {
        assert_eq!(eval_int("1 + 2 * 3"), 7);
        assert_eq!(eval_int("(1 + 2) * 3"), 9);
        assert_eq!(eval_int("10 - 4 - 3"), 3);
        assert_eq!(eval_int("-7 / 2"), -3);
        assert_eq!(eval_int("-7 % 3"), -1);
        assert_eq!(eval_int("1 << 4 | 3"), 19);
        assert_eq!(eval("true").unwrap(), Value::bool(true));
        assert_eq!(eval("2.5 * 2").unwrap().type_name(), "double");
    }

    #[test]
    fn test_variables() {
        assert_eq!(eval_int("x"), 42);
        assert_eq!(eval_int("x + counter"), 49);
        assert_eq!(eval_int("::counter"), 7);
        assert_eq!(eval("c").unwrap().to_string(), "97 'a'");
        assert_eq!(eval("c + 1").unwrap().type_name(), "int");
        assert_eq!(eval_int("ref + 1"), 43);
        assert_eq!(eval("ref").unwrap().type_name(), "int");
    }

    #[test]
    fn test_undeclared_identifier_anywhere() {
        for input in ["nope", "1 + nope", "-(x * nope)", "pt.missing", "x ? nope : 1"] {
            let ctx = context();
            let ast = parse(input, &ctx).unwrap();
            let mut error = EvalError::default();
            let value = Interpreter::new(&ctx).eval_into(&ast, &mut error);
            assert_eq!(error.code(), EvalErrorCode::UndeclaredIdentifier, "{}", input);
            assert!(!value.is_valid());
        }
    }

    #[test]
    fn test_eval_into_clears_error_on_success() {
        let ctx = context();
        let ast = parse("x", &ctx).unwrap();
        let mut error = EvalError::unknown("stale");
        let value = Interpreter::new(&ctx).eval_into(&ast, &mut error);
        assert!(!error.is_error());
        assert_eq!(value.as_scalar().unwrap().as_i128(), 42);
    }

    #[test]
    fn test_error_node_poisons_evaluation() {
        let ctx = context();
        let ast = AstNode::binary(
            AstNode::int(1),
            BinOp::Add,
            AstNode::Error(EvalError::invalid_syntax("bad operand")),
        );
        let err = Interpreter::new(&ctx).eval(&ast).unwrap_err();
        assert_eq!(err.code(), EvalErrorCode::InvalidExpressionSyntax);
        assert_eq!(err.message(), "bad operand");
    }

    #[test]
    fn test_arrays_and_pointers() {
        assert_eq!(eval("arr").unwrap().type_name(), "int[4]");
        assert_eq!(eval_int("arr[2]"), 30);
        assert_eq!(eval_int("2[arr]"), 30);
        assert_eq!(eval_int("*(arr + 3)"), 40);
        assert_eq!(eval_int("p[1]"), 20);
        assert_eq!(eval_int("*p"), 10);
        assert_eq!(eval_int("&arr[3] - p"), 3);
        assert_eq!(eval("p + 2").unwrap().as_pointer().unwrap().addr(), 0x2008);
        assert_eq!(eval("&x").unwrap().type_name(), "int*");
        assert_eq!(eval_int("*&x"), 42);
        assert_eq!(eval("p == arr").unwrap(), Value::bool(true));
        assert_eq!(eval("vp == p").unwrap(), Value::bool(true));
    }

    #[test]
    fn test_member_access() {
        assert_eq!(eval_int("pt.x + pt.y"), 7);
        assert_eq!(eval_int("cpt->y"), 4);
        assert_eq!(eval("&cpt->y").unwrap().type_name(), "const int*");
        assert_eq!(eval_int("head->next->value"), 2);
        assert_eq!(eval("head->next->next").unwrap().as_pointer().unwrap().addr(), 0);
        assert_eq!(eval_int("(*head).value"), 1);
        assert_eq!(eval_code("pt->x"), EvalErrorCode::InvalidOperandType);
        assert_eq!(eval_code("x.y"), EvalErrorCode::InvalidOperandType);
        assert_eq!(eval_code("head->missing"), EvalErrorCode::UndeclaredIdentifier);
    }

    #[test]
    fn test_casts() {
        assert_eq!(eval_int("(char)300"), 44);
        assert_eq!(eval_int("(unsigned char)-1"), 255);
        assert_eq!(eval_int("(int)d"), 2);
        assert_eq!(eval_int("*(int*)vp"), 10);
        assert_eq!(eval_int("((Point*)cpt)->x"), 3);
        assert_eq!(eval_int("(long)p"), 0x2000);
        assert_eq!(eval("(char*)p + 1").unwrap().as_pointer().unwrap().addr(), 0x2001);
        assert_eq!(eval_code("(Point)x"), EvalErrorCode::InvalidOperandType);
        assert_eq!(eval_code("(int&)x"), EvalErrorCode::NotImplemented);
    }

    #[test]
    fn test_invalid_operands() {
        assert_eq!(eval_code("*vp"), EvalErrorCode::InvalidOperandType);
        assert_eq!(eval_code("vp + 1"), EvalErrorCode::InvalidOperandType);
        assert_eq!(eval_code("*x"), EvalErrorCode::InvalidOperandType);
        assert_eq!(eval_code("&1"), EvalErrorCode::InvalidOperandType);
        assert_eq!(eval_code("pt && 1"), EvalErrorCode::InvalidOperandType);
        assert_eq!(eval_code("p < 1.5"), EvalErrorCode::InvalidOperandType);
        assert_eq!(eval_code("~d"), EvalErrorCode::InvalidOperandType);
        assert_eq!(eval_code("x / 0"), EvalErrorCode::Unknown);
        assert_eq!(eval_code("*wild"), EvalErrorCode::Unknown);
    }

    #[test]
    fn test_comparisons_use_common_type() {
        assert_eq!(eval("-1 < u").unwrap(), Value::bool(false));
        assert_eq!(eval("-1 < 1").unwrap(), Value::bool(true));
        assert_eq!(eval("d > x").unwrap(), Value::bool(false));
        assert_eq!(eval("x == 42 && d != 0").unwrap(), Value::bool(true));
    }

    #[test]
    fn test_conditional() {
        assert_eq!(eval_int("x > 0 ? 1 : 2"), 1);
        assert_eq!(eval_int("0 ? 1 : 2"), 2);
        let value = eval("1 ? x : d").unwrap();
        assert_eq!(value.type_name(), "double");
        assert_eq!(value.as_scalar().unwrap().as_f64(), 42.0);
        // the unselected branch is not read
        assert_eq!(eval_int("head ? head->value : *wild"), 1);
        assert_eq!(eval("p ? p : arr").unwrap().type_name(), "int*");
        assert_eq!(eval_code("pt ? 1 : 2"), EvalErrorCode::InvalidOperandType);
    }

    #[test]
    fn test_unselected_branch_operand_types_unchecked() {
        assert_eq!(eval_int("1 ? 2 : pt + 1"), 2);
        assert_eq!(eval_int("0 ? *x : 3"), 3);
        assert_eq!(eval_code("1 ? 2 : (pt + 1) + nope"), EvalErrorCode::UndeclaredIdentifier);
        assert_eq!(eval_code("1 ? 2 : pt.missing"), EvalErrorCode::UndeclaredIdentifier);
    }

    #[test]
    fn test_static_type() {
        let ctx = context();
        let interp = Interpreter::new(&ctx);
        let ty = |input: &str| interp.static_type(&parse(input, &ctx).unwrap()).unwrap().to_string();
        assert_eq!(ty("head->next"), "Node*");
        assert_eq!(ty("arr[1] + c"), "int");
        assert_eq!(ty("&pt"), "Point*");
        assert_eq!(ty("x < d"), "bool");
        assert_eq!(ty("(unsigned long)x << 1"), "unsigned long");
        assert_eq!(ty("ref"), "int");
    }
}
