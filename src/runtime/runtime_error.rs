use thiserror::Error;

use crate::bytecode::{DecodeError, VerifyError};

/// Failures reported by an object runtime.
///
/// The interpreter never inspects these; a failed dispatch ends the run and
/// the error is handed back to the caller unchanged.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("undefined method '{method}' for {class}")]
    MethodNotFound { class: String, method: String },

    #[error("wrong number of arguments for '{method}' (given {got}, expected {expected})")]
    Arity {
        method: String,
        expected: usize,
        got: usize,
    },

    #[error("type error: expected {expected}, got {got}")]
    TypeError { expected: &'static str, got: String },

    #[error("integer overflow in {0}")]
    Overflow(&'static str),

    #[error("output failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ObjectError {
    pub fn type_error(expected: &'static str, got: impl Into<String>) -> Self {
        ObjectError::TypeError {
            expected,
            got: got.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum VmError {
    #[error("malformed bytecode: {0}")]
    Decode(#[from] DecodeError),

    #[error("rejected bytecode: {0}")]
    Verify(#[from] VerifyError),

    #[error("runtime error at offset {offset}: {source}")]
    Object {
        offset: usize,
        #[source]
        source: ObjectError,
    },

    #[error("stack overflow at offset {offset} (limit {limit})")]
    StackOverflow { offset: usize, limit: usize },

    #[error("stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },

    #[error("local slot {slot} read at offset {offset} is empty")]
    EmptyLocal { offset: usize, slot: u8 },

    #[error("call at offset {offset} passes {argc} arguments (limit {limit})")]
    TooManyArguments {
        offset: usize,
        argc: usize,
        limit: usize,
    },

    #[error("jump at offset {offset} has no instruction at its target")]
    InvalidJump { offset: usize },

    #[error("execution step limit exceeded ({0})")]
    StepLimit(usize),
}

impl VmError {
    /// The object runtime error behind this failure, if there is one.
    pub fn object_error(&self) -> Option<&ObjectError> {
        match self {
            VmError::Object { source, .. } => Some(source),
            _ => None,
        }
    }
}
