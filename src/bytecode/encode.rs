use crate::bytecode::{Op, Program};
use crate::lang::Literal;

/// Builds a `Program` from typed ops.
///
/// Literals are interned: adding the same constant twice returns the same
/// pool index.
#[derive(Debug, Default)]
pub struct Assembler {
    literals: Vec<Literal>,
    code: Vec<u8>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool index for `literal`, adding it if not already present.
    ///
    /// # Panics
    /// Panics if the pool grows past 256 entries, since operands are one byte.
    pub fn literal(&mut self, literal: impl Into<Literal>) -> u8 {
        let literal = literal.into();
        let index = match self.literals.iter().position(|l| *l == literal) {
            Some(index) => index,
            None => {
                self.literals.push(literal);
                self.literals.len() - 1
            }
        };
        u8::try_from(index).expect("literal pool is limited to 256 entries")
    }

    /// Current byte offset, i.e. where the next op will be placed.
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    pub fn op(&mut self, op: Op) -> &mut Self {
        op.encode(&mut self.code);
        self
    }

    pub fn push_string(&mut self, text: &str) -> &mut Self {
        let index = self.literal(text);
        self.op(Op::PushString(index))
    }

    pub fn push_number(&mut self, value: i64) -> &mut Self {
        let index = self.literal(value);
        self.op(Op::PushNumber(index))
    }

    pub fn call(&mut self, method: &str, argc: u8) -> &mut Self {
        let method = self.literal(method);
        self.op(Op::Call { method, argc })
    }

    /// Emit a `JUMP_UNLESS` whose offset is filled in by `patch_jump`.
    /// Returns the offset of the operand byte.
    pub fn jump_unless(&mut self) -> usize {
        self.op(Op::JumpUnless(0));
        self.code.len() - 1
    }

    /// Point a pending jump at the current offset.
    ///
    /// # Panics
    /// Panics if the skipped span is longer than 255 bytes.
    pub fn patch_jump(&mut self, operand_at: usize) {
        let skip = self.code.len() - (operand_at + 1);
        self.code[operand_at] = u8::try_from(skip).expect("jump distance exceeds 255 bytes");
    }

    pub fn finish(self) -> Program {
        Program::new(self.literals, self.code)
    }
}
