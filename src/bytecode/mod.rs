pub mod decode;
pub mod disasm;
pub mod encode;
pub mod ir;
pub mod op;
pub mod verify;

pub use decode::DecodeError;
pub use encode::Assembler;
pub use ir::{CodeObject, Instruction, Program, ProgramFileError};
pub use op::{Op, Opcode};
pub use verify::VerifyError;
