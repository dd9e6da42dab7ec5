//! # Program constants
//!
//! The literal pool shared by every instruction stream. Literals are produced
//! by whatever builds the program (the assembler, a loaded program file) and
//! are read-only for the lifetime of a run.

pub mod literal;

pub use literal::{Literal, LiteralKind};
