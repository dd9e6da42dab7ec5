//! Raw instruction stream to typed ops.

use thiserror::Error;

use crate::bytecode::ir::{CodeObject, Instruction};
use crate::bytecode::op::{Op, Opcode};

/// Errors produced while splitting a byte stream into instructions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("{mnemonic} at offset {offset} is missing operands (needs {needed}, found {found})")]
    Truncated {
        mnemonic: &'static str,
        offset: usize,
        needed: usize,
        found: usize,
    },
}

/// Decode a complete instruction stream.
///
/// Every byte must belong to exactly one instruction; a trailing partial
/// instruction is an error rather than being ignored.
pub fn decode(code: &[u8]) -> Result<CodeObject, DecodeError> {
    let mut instructions = Vec::new();
    let mut at = 0;

    while at < code.len() {
        let tag = code[at];
        let opcode = Opcode::from_u8(tag).ok_or(DecodeError::UnknownOpcode {
            opcode: tag,
            offset: at,
        })?;

        let start = at + 1;
        let end = start + opcode.arity();
        if end > code.len() {
            return Err(DecodeError::Truncated {
                mnemonic: opcode.mnemonic(),
                offset: at,
                needed: opcode.arity(),
                found: code.len() - start,
            });
        }

        let op = Op::from_parts(opcode, &code[start..end]);
        instructions.push(Instruction { at, op });
        at = end;
    }

    Ok(CodeObject {
        instructions,
        len: code.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_mixed_widths() {
        let code = [0x00, 0x03, 0x00, 0x08, 0x01, 0x01, 0x0A];
        let decoded = decode(&code).unwrap();

        let ops: Vec<_> = decoded.instructions.iter().map(|i| (i.at, i.op)).collect();
        assert_eq!(
            ops,
            vec![
                (0, Op::PushSelf),
                (1, Op::PushString(0)),
                (3, Op::Call { method: 1, argc: 1 }),
                (6, Op::Return),
            ]
        );
        assert_eq!(decoded.len, 7);
    }

    #[test]
    fn test_unknown_opcode_reports_offset() {
        let err = decode(&[0x00, 0x01, 0x7F]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownOpcode {
                opcode: 0x7F,
                offset: 2
            }
        );
    }

    #[test]
    fn test_truncated_call() {
        let err = decode(&[0x08, 0x01]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated {
                mnemonic: "CALL",
                offset: 0,
                needed: 2,
                found: 1
            }
        ));
        assert!(err.to_string().contains("missing operands"));
    }

    #[test]
    fn test_empty_stream_decodes_to_nothing() {
        let decoded = decode(&[]).unwrap();
        assert!(decoded.instructions.is_empty());
    }
}
