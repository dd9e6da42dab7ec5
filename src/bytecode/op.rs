// =============================================================================
// OP - Bytecode instructions
// =============================================================================

/// One-byte opcode tags as they appear in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    PushSelf = 0x00,
    PushNil = 0x01,
    PushBool = 0x02,
    PushString = 0x03,
    PushNumber = 0x04,
    GetLocal = 0x05,
    SetLocal = 0x06,
    Add = 0x07,
    Call = 0x08,
    JumpUnless = 0x09,
    Return = 0x0A,
}

impl Opcode {
    pub fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => Opcode::PushSelf,
            0x01 => Opcode::PushNil,
            0x02 => Opcode::PushBool,
            0x03 => Opcode::PushString,
            0x04 => Opcode::PushNumber,
            0x05 => Opcode::GetLocal,
            0x06 => Opcode::SetLocal,
            0x07 => Opcode::Add,
            0x08 => Opcode::Call,
            0x09 => Opcode::JumpUnless,
            0x0A => Opcode::Return,
            _ => return None,
        })
    }

    /// Number of one-byte operands following the tag.
    pub fn arity(self) -> usize {
        match self {
            Opcode::PushSelf | Opcode::PushNil | Opcode::Add | Opcode::Return => 0,
            Opcode::PushBool
            | Opcode::PushString
            | Opcode::PushNumber
            | Opcode::GetLocal
            | Opcode::SetLocal
            | Opcode::JumpUnless => 1,
            Opcode::Call => 2,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::PushSelf => "PUSH_SELF",
            Opcode::PushNil => "PUSH_NIL",
            Opcode::PushBool => "PUSH_BOOL",
            Opcode::PushString => "PUSH_STRING",
            Opcode::PushNumber => "PUSH_NUMBER",
            Opcode::GetLocal => "GET_LOCAL",
            Opcode::SetLocal => "SET_LOCAL",
            Opcode::Add => "ADD",
            Opcode::Call => "CALL",
            Opcode::JumpUnless => "JUMP_UNLESS",
            Opcode::Return => "RETURN",
        }
    }
}

/// A decoded instruction with its typed operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // literals
    PushSelf,
    PushNil,
    PushBool(bool),
    /// Literal pool index of the text.
    PushString(u8),
    /// Literal pool index of the integer.
    PushNumber(u8),

    // locals
    GetLocal(u8),
    SetLocal(u8),

    // arithmetic
    Add,

    /// Dispatch the method named by a literal on a receiver.
    /// ( recv a1..aN -- result )
    Call { method: u8, argc: u8 },

    /// Pop condition, skip `offset` bytes forward unless it is truthy.
    /// The offset is measured from the byte after the operand.
    JumpUnless(u8),

    Return,
}

impl Op {
    pub fn opcode(&self) -> Opcode {
        match self {
            Op::PushSelf => Opcode::PushSelf,
            Op::PushNil => Opcode::PushNil,
            Op::PushBool(_) => Opcode::PushBool,
            Op::PushString(_) => Opcode::PushString,
            Op::PushNumber(_) => Opcode::PushNumber,
            Op::GetLocal(_) => Opcode::GetLocal,
            Op::SetLocal(_) => Opcode::SetLocal,
            Op::Add => Opcode::Add,
            Op::Call { .. } => Opcode::Call,
            Op::JumpUnless(_) => Opcode::JumpUnless,
            Op::Return => Opcode::Return,
        }
    }

    /// Encoded size in bytes, tag included.
    pub fn width(&self) -> usize {
        1 + self.opcode().arity()
    }

    /// Build an op from its tag and exactly `arity` operand bytes.
    pub(crate) fn from_parts(opcode: Opcode, operands: &[u8]) -> Self {
        let arg = |i: usize| operands.get(i).copied().unwrap_or(0);
        match opcode {
            Opcode::PushSelf => Op::PushSelf,
            Opcode::PushNil => Op::PushNil,
            Opcode::PushBool => Op::PushBool(arg(0) != 0),
            Opcode::PushString => Op::PushString(arg(0)),
            Opcode::PushNumber => Op::PushNumber(arg(0)),
            Opcode::GetLocal => Op::GetLocal(arg(0)),
            Opcode::SetLocal => Op::SetLocal(arg(0)),
            Opcode::Add => Op::Add,
            Opcode::Call => Op::Call {
                method: arg(0),
                argc: arg(1),
            },
            Opcode::JumpUnless => Op::JumpUnless(arg(0)),
            Opcode::Return => Op::Return,
        }
    }

    /// Append the encoded bytes of this op.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode() as u8);
        match *self {
            Op::PushSelf | Op::PushNil | Op::Add | Op::Return => {}
            Op::PushBool(b) => out.push(b as u8),
            Op::PushString(i) | Op::PushNumber(i) => out.push(i),
            Op::GetLocal(slot) | Op::SetLocal(slot) => out.push(slot),
            Op::Call { method, argc } => {
                out.push(method);
                out.push(argc);
            }
            Op::JumpUnless(offset) => out.push(offset),
        }
    }

    /// Stack effect as (pops, pushes).
    pub fn effect(&self) -> (usize, usize) {
        match self {
            Op::PushSelf
            | Op::PushNil
            | Op::PushBool(_)
            | Op::PushString(_)
            | Op::PushNumber(_)
            | Op::GetLocal(_) => (0, 1),
            Op::SetLocal(_) => (1, 0),
            Op::Add => (2, 1),
            Op::Call { argc, .. } => (*argc as usize + 1, 1),
            Op::JumpUnless(_) => (1, 0),
            Op::Return => (0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tag_round_trips_through_from_u8() {
        for byte in 0x00..=0x0A {
            let opcode = Opcode::from_u8(byte).expect("known tag");
            assert_eq!(opcode as u8, byte);
        }
        assert_eq!(Opcode::from_u8(0x0B), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn test_width_matches_encoding() {
        let ops = [
            Op::PushSelf,
            Op::PushBool(true),
            Op::Call { method: 1, argc: 2 },
            Op::JumpUnless(6),
            Op::Return,
        ];
        for op in ops {
            let mut bytes = Vec::new();
            op.encode(&mut bytes);
            assert_eq!(bytes.len(), op.width(), "{:?}", op);
        }
    }

    #[test]
    fn test_push_bool_nonzero_is_true() {
        assert_eq!(Op::from_parts(Opcode::PushBool, &[0]), Op::PushBool(false));
        assert_eq!(Op::from_parts(Opcode::PushBool, &[1]), Op::PushBool(true));
        assert_eq!(Op::from_parts(Opcode::PushBool, &[42]), Op::PushBool(true));
    }

    #[test]
    fn test_call_effect_counts_receiver() {
        assert_eq!(Op::Call { method: 0, argc: 3 }.effect(), (4, 1));
        assert_eq!(Op::Add.effect(), (2, 1));
    }
}
