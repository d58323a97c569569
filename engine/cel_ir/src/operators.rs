//! CEL operator tokens.
//!
//! The parser emits operators as calls to mangled internal names; this
//! module is the fixed table between those names, the executable node the
//! planner lowers them to, and the human-readable symbol used in error
//! messages.

/// Internal function name of logical AND.
pub const LOGICAL_AND: &str = "_&&_";
/// Internal function name of logical OR.
pub const LOGICAL_OR: &str = "_||_";
/// Internal function name of logical NOT.
pub const LOGICAL_NOT: &str = "!_";
/// Internal function name of arithmetic negation.
pub const NEGATE: &str = "-_";
/// Internal function name of the ternary conditional.
pub const CONDITIONAL: &str = "_?_:_";
/// Internal function name of the comprehension loop guard.
pub const NOT_STRICTLY_FALSE: &str = "@not_strictly_false";
/// Internal function name of indexing.
pub const INDEX: &str = "_[_]";
/// Internal function name of optional indexing.
pub const OPT_INDEX: &str = "_[?_]";
/// Internal function name of membership.
pub const IN: &str = "@in";
/// Function name of the block binding intrinsic.
pub const BLOCK: &str = "cel.@block";

pub const EQUALS: &str = "_==_";
pub const NOT_EQUALS: &str = "_!=_";
pub const LESS: &str = "_<_";
pub const LESS_EQUALS: &str = "_<=_";
pub const GREATER: &str = "_>_";
pub const GREATER_EQUALS: &str = "_>=_";
pub const ADD: &str = "_+_";
pub const SUBTRACT: &str = "_-_";
pub const MULTIPLY: &str = "_*_";
pub const DIVIDE: &str = "_/_";
pub const MODULO: &str = "_%_";

/// Binary operators that lower to a dedicated executable node.
///
/// Logical AND/OR are not here: they lower to short-circuit nodes, not
/// strict binary evaluation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    In,
}

impl BinaryOp {
    /// Map an internal operator name to its binary operator.
    pub fn from_function(function: &str) -> Option<BinaryOp> {
        match function {
            EQUALS => Some(BinaryOp::Eq),
            NOT_EQUALS => Some(BinaryOp::NotEq),
            LESS => Some(BinaryOp::Lt),
            LESS_EQUALS => Some(BinaryOp::LtEq),
            GREATER => Some(BinaryOp::Gt),
            GREATER_EQUALS => Some(BinaryOp::GtEq),
            ADD => Some(BinaryOp::Add),
            SUBTRACT => Some(BinaryOp::Sub),
            MULTIPLY => Some(BinaryOp::Mul),
            DIVIDE => Some(BinaryOp::Div),
            MODULO => Some(BinaryOp::Mod),
            IN => Some(BinaryOp::In),
            _ => None,
        }
    }

    /// Returns the source-level symbol for this operator.
    ///
    /// Used in error messages to show the exact operator that failed.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::In => "in",
        }
    }
}

/// The human-readable symbol for any internal operator name.
pub fn display_name(function: &str) -> Option<&'static str> {
    if let Some(op) = BinaryOp::from_function(function) {
        return Some(op.as_symbol());
    }
    match function {
        LOGICAL_AND => Some("&&"),
        LOGICAL_OR => Some("||"),
        LOGICAL_NOT => Some("!"),
        NEGATE => Some("-"),
        CONDITIONAL => Some("?:"),
        INDEX | OPT_INDEX => Some("[]"),
        _ => None,
    }
}
