//! AST definitions for supported expressions

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::EvalError;
use super::scalar::Scalar;
use super::types::{QualType, ScalarKind};

/// Precedence of primary expressions (literals, identifiers).
const PRIMARY_PRECEDENCE: u8 = 0;
const POSTFIX_PRECEDENCE: u8 = 2;
const UNARY_PRECEDENCE: u8 = 3;
const CONDITIONAL_PRECEDENCE: u8 = 16;

/// Supported expression AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstNode {
    /// Poisoned subtree; evaluating it yields the carried error.
    Error(EvalError),

    /// `true`, `false`
    BooleanLiteral(bool),

    /// `42`, `0x10ul`, `1.5f`; the spelling is kept for printing.
    NumericLiteral { value: Scalar, spelling: String },

    /// `x`, `ns::x`, `::x`
    Identifier(String),

    /// `(type) expr`
    CStyleCast { ty: QualType, expr: Box<AstNode> },

    /// `base.member`, `base->member`
    MemberOf {
        base: Box<AstNode>,
        member: String,
        access: MemberAccess,
    },

    /// `lhs op rhs`, `lhs[rhs]`
    BinaryOp {
        op: BinOp,
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
    },

    /// `op expr`
    UnaryOp { op: UnaryOp, expr: Box<AstNode> },

    /// `cond ? lhs : rhs`
    TernaryOp {
        cond: Box<AstNode>,
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MemberAccess {
    Dot,   // .
    Arrow, // ->
}

impl MemberAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberAccess::Dot => ".",
            MemberAccess::Arrow => "->",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Rem, // %

    // Shift
    Shl, // <<
    Shr, // >>

    // Comparison
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
    Eq, // ==
    Ne, // !=

    // Bitwise
    BitAnd, // &
    BitXor, // ^
    BitOr,  // |

    // Logical
    LogicalAnd, // &&
    LogicalOr,  // ||

    // Postfix
    Subscript, // []
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::BitAnd => "&",
            BinOp::BitXor => "^",
            BinOp::BitOr => "|",
            BinOp::LogicalAnd => "&&",
            BinOp::LogicalOr => "||",
            BinOp::Subscript => "[]",
        }
    }

    /// C++ precedence; lower binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinOp::Subscript => POSTFIX_PRECEDENCE,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 5,
            BinOp::Add | BinOp::Sub => 6,
            BinOp::Shl | BinOp::Shr => 7,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 9,
            BinOp::Eq | BinOp::Ne => 10,
            BinOp::BitAnd => 11,
            BinOp::BitXor => 12,
            BinOp::BitOr => 13,
            BinOp::LogicalAnd => 14,
            BinOp::LogicalOr => 15,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,       // +
    Neg,        // -
    LogicalNot, // !
    BitNot,     // ~
    Deref,      // *
    AddressOf,  // &
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::LogicalNot => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Deref => "*",
            UnaryOp::AddressOf => "&",
        }
    }
}

impl AstNode {
    /// Integer literal; a negative value becomes negation of its magnitude,
    /// the way the parser reads `-5`.
    pub fn int(value: i32) -> AstNode {
        let magnitude = value.unsigned_abs();
        let kind = if magnitude > i32::MAX as u32 {
            ScalarKind::Long
        } else {
            ScalarKind::Int
        };
        let literal = AstNode::NumericLiteral {
            value: Scalar::from_int(kind, magnitude as i128),
            spelling: magnitude.to_string(),
        };
        if value < 0 {
            AstNode::unary(UnaryOp::Neg, literal)
        } else {
            literal
        }
    }

    pub fn ident(name: impl Into<String>) -> AstNode {
        AstNode::Identifier(name.into())
    }

    pub fn binary(lhs: AstNode, op: BinOp, rhs: AstNode) -> AstNode {
        AstNode::BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnaryOp, expr: AstNode) -> AstNode {
        AstNode::UnaryOp {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn cast(ty: QualType, expr: AstNode) -> AstNode {
        AstNode::CStyleCast {
            ty,
            expr: Box::new(expr),
        }
    }

    pub fn member(base: AstNode, access: MemberAccess, member: impl Into<String>) -> AstNode {
        AstNode::MemberOf {
            base: Box::new(base),
            member: member.into(),
            access,
        }
    }

    pub fn ternary(cond: AstNode, lhs: AstNode, rhs: AstNode) -> AstNode {
        AstNode::TernaryOp {
            cond: Box::new(cond),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AstNode::Error(_))
    }

    pub fn precedence(&self) -> u8 {
        match self {
            AstNode::Error(_)
            | AstNode::BooleanLiteral(_)
            | AstNode::NumericLiteral { .. }
            | AstNode::Identifier(_) => PRIMARY_PRECEDENCE,
            AstNode::MemberOf { .. } => POSTFIX_PRECEDENCE,
            AstNode::BinaryOp { op, .. } => op.precedence(),
            AstNode::UnaryOp { .. } | AstNode::CStyleCast { .. } => UNARY_PRECEDENCE,
            AstNode::TernaryOp { .. } => CONDITIONAL_PRECEDENCE,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, node: &AstNode, parenthesize: bool) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}

/// Prints the expression with the minimal parentheses needed to parse back
/// into the same tree.
impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Error(err) => write!(f, "<error: {}>", err.message()),
            AstNode::BooleanLiteral(value) => write!(f, "{}", value),
            AstNode::NumericLiteral { spelling, .. } => f.write_str(spelling),
            AstNode::Identifier(name) => f.write_str(name),
            AstNode::CStyleCast { ty, expr } => {
                write!(f, "({})", ty)?;
                write_operand(f, expr, expr.precedence() > UNARY_PRECEDENCE)
            }
            AstNode::MemberOf {
                base,
                member,
                access,
            } => {
                // `1.x` would lex as a single numeric constant
                let parenthesize = base.precedence() > POSTFIX_PRECEDENCE
                    || matches!(**base, AstNode::NumericLiteral { .. });
                write_operand(f, base, parenthesize)?;
                write!(f, "{}{}", access.as_str(), member)
            }
            AstNode::BinaryOp {
                op: BinOp::Subscript,
                lhs,
                rhs,
            } => {
                write_operand(f, lhs, lhs.precedence() > POSTFIX_PRECEDENCE)?;
                write!(f, "[{}]", rhs)
            }
            AstNode::BinaryOp { op, lhs, rhs } => {
                let precedence = op.precedence();
                write_operand(f, lhs, lhs.precedence() > precedence)?;
                write!(f, " {} ", op.as_str())?;
                write_operand(f, rhs, rhs.precedence() >= precedence)
            }
            AstNode::UnaryOp { op, expr } => {
                let operand = if expr.precedence() > UNARY_PRECEDENCE {
                    format!("({})", expr)
                } else {
                    expr.to_string()
                };
                let symbol = op.as_str();
                f.write_str(symbol)?;
                // keep `- -x` from becoming `--x`
                if matches!(op, UnaryOp::Plus | UnaryOp::Neg | UnaryOp::AddressOf)
                    && operand.starts_with(symbol)
                {
                    f.write_str(" ")?;
                }
                f.write_str(&operand)
            }
            AstNode::TernaryOp { cond, lhs, rhs } => {
                write_operand(f, cond, cond.precedence() >= CONDITIONAL_PRECEDENCE)?;
                write!(f, " ? {} : ", lhs)?;
                write_operand(f, rhs, rhs.precedence() > CONDITIONAL_PRECEDENCE)
            }
        }
    }
}
