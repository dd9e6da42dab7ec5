//! # pebble
//!
//! A small stack-based bytecode interpreter for a dynamically typed,
//! object-oriented language.
//!
//! A [`Program`] is a literal pool plus a flat instruction stream of one-byte
//! opcodes, each followed by a fixed number of one-byte operands. The
//! [`Vm`] decodes and verifies a program once, then executes it against an
//! operand stack and a fixed set of local slots, handing object construction
//! and method dispatch to an [`ObjectRuntime`].
//!
//! ## Ownership
//!
//! Runtime handles are reference counted through `Clone` and `Drop`. The
//! operand stack and the locals array each own one reference per occupied
//! slot; everything still held when a run ends (by `RETURN` or by an error)
//! is released exactly once.
//!
//! ## Documentation conventions
//!
//! - Stack effects are written as `( before -- after )`, top of stack rightmost.
//! - Jump offsets are measured from the byte after the offset operand.

pub mod bytecode;
pub mod demo;
pub mod lang;
pub mod runtime;

use std::io::Write;

pub use bytecode::{Assembler, Op, Opcode, Program};
pub use lang::Literal;
pub use runtime::{Heap, ObjectError, ObjectRuntime, Vm, VmConfig, VmError};

/// Run `program` on a fresh [`Heap`] whose `print` output goes to `out`.
///
/// The heap is created before the run and torn down after it, whether the
/// run succeeds or not.
pub fn run_program<W: Write>(program: &Program, config: VmConfig, out: W) -> Result<(), VmError> {
    let mut heap = Heap::new(out);
    Vm::with_config(config).run(&mut heap, program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_program_writes_output() {
        let mut out = Vec::new();
        run_program(&demo::answer_program(), VmConfig::default(), &mut out).unwrap();
        assert_eq!(out, b"the answer is:\n");
    }

    #[test]
    fn test_run_program_reports_rejection() {
        let program = Program::new(vec![], vec![0x07, 0x0A]);
        let err = run_program(&program, VmConfig::default(), Vec::new()).unwrap_err();
        assert!(err.to_string().starts_with("rejected bytecode: stack underflow"));
    }
}
