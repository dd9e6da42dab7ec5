use serde::{Deserialize, Serialize};

/// A compile-time constant in a program's literal pool.
///
/// Literals are untyped in the bytecode: the instruction that references a
/// slot decides how it is read. The verifier checks that each reference asks
/// for the kind the slot actually holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    /// Raw text, used for string objects and method names.
    Str(String),

    /// Raw 64-bit signed integer.
    Number(i64),
}

impl Literal {
    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::Str(_) => LiteralKind::Str,
            Literal::Number(_) => LiteralKind::Number,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            Literal::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Literal::Number(n) => Some(*n),
            Literal::Str(_) => None,
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Str(s)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Number(n)
    }
}

impl std::fmt::Display for Literal {
    /// Format a literal the way the disassembler shows it.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Str,
    Number,
}

impl std::fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralKind::Str => write!(f, "string"),
            LiteralKind::Number => write!(f, "number"),
        }
    }
}
