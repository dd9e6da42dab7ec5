use crate::bytecode::Op;
use crate::lang::Literal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// A bytecode program: literal pool plus a raw instruction stream.
///
/// This is the form programs are stored and loaded in. It is not trusted;
/// `Vm::run` decodes and verifies it before executing anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Constants referenced by `PUSH_STRING`, `PUSH_NUMBER` and `CALL`.
    pub literals: Vec<Literal>,

    /// Encoded instructions. Execution starts at byte 0.
    pub code: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ProgramFileError {
    #[error("failed to access program file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed program file: {0}")]
    Format(postcard::Error),
}

impl From<postcard::Error> for ProgramFileError {
    fn from(e: postcard::Error) -> Self {
        ProgramFileError::Format(e)
    }
}

impl Program {
    pub fn new(literals: Vec<Literal>, code: Vec<u8>) -> Self {
        Self { literals, code }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ProgramFileError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProgramFileError> {
        Ok(postcard::from_bytes(bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ProgramFileError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ProgramFileError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

/// One decoded instruction and the byte offset of its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub at: usize,
    pub op: Op,
}

impl Instruction {
    /// Offset of the byte following this instruction.
    pub fn next(&self) -> usize {
        self.at + self.op.width()
    }
}

/// A decoded instruction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeObject {
    pub instructions: Vec<Instruction>,

    /// Length of the encoded stream in bytes.
    pub len: usize,
}

impl CodeObject {
    /// Index of the instruction whose tag sits at byte `at`, if any.
    pub fn index_at(&self, at: usize) -> Option<usize> {
        self.instructions.binary_search_by_key(&at, |i| i.at).ok()
    }

    /// Byte offset a `JUMP_UNLESS` at `index` lands on when it is taken.
    pub fn jump_target(&self, index: usize) -> Option<usize> {
        let instruction = self.instructions.get(index)?;
        match instruction.op {
            Op::JumpUnless(offset) => Some(instruction.next() + offset as usize),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::decode::decode;

    fn sample() -> Program {
        Program::new(
            vec![Literal::from("hello"), Literal::from("print"), Literal::from(7)],
            vec![0x00, 0x03, 0x00, 0x08, 0x01, 0x01, 0x0A],
        )
    }

    #[test]
    fn test_program_bytes_round_trip() {
        let program = sample();
        let bytes = program.to_bytes().unwrap();
        assert_eq!(Program::from_bytes(&bytes).unwrap(), program);
    }

    #[test]
    fn test_program_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.pbc");

        let program = sample();
        program.save(&path).unwrap();

        assert_eq!(Program::load(&path).unwrap(), program);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Program::load(&dir.path().join("nope.pbc")).unwrap_err();
        assert!(matches!(err, ProgramFileError::Io(_)));
    }

    #[test]
    fn test_garbage_is_format_error() {
        let err = Program::from_bytes(&[0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, ProgramFileError::Format(_)));
    }

    #[test]
    fn test_index_at_and_jump_target() {
        // PUSH_BOOL 0, JUMP_UNLESS 1, PUSH_NIL, RETURN
        let code = decode(&[0x02, 0x00, 0x09, 0x01, 0x01, 0x0A]).unwrap();
        assert_eq!(code.index_at(2), Some(1));
        assert_eq!(code.index_at(3), None);
        assert_eq!(code.jump_target(1), Some(5));
        assert_eq!(code.index_at(5), Some(3));
        assert_eq!(code.jump_target(0), None);
    }
}
