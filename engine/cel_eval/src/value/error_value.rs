//! Error values.
//!
//! CEL errors are absorbing *values*, not raised conditions: any operation
//! observing an error operand yields that error (outside the logical
//! short-circuits). Every error records its kind, a message, and the id of
//! the expression that produced it.

use cel_ir::ExprId;
use std::fmt;
use thiserror::Error;

/// Classification of an error value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("undeclared variable")]
    UndeclaredVariable,
    #[error("no such field")]
    NoSuchField,
    #[error("no such key")]
    NoSuchKey,
    #[error("type mismatch")]
    TypeMismatch,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("overflow")]
    Overflow,
    #[error("divide by zero")]
    DivideByZero,
    #[error("unknown overload")]
    UnknownOverload,
    #[error("error")]
    Generic,
}

/// The payload of an `Error` value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorValue {
    pub kind: ErrorKind,
    pub message: String,
    /// The expression the error originated at.
    pub id: ExprId,
}

impl ErrorValue {
    /// Create an error value.
    pub fn new(kind: ErrorKind, message: impl Into<String>, id: ExprId) -> Self {
        ErrorValue {
            kind,
            message: message.into(),
            id,
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
