//! Load-time checks over a decoded instruction stream.
//!
//! Jumps only go forward, so a single in-order pass sees every predecessor of
//! an instruction before the instruction itself. Each reachable instruction
//! gets an entry state (stack height, which locals are definitely set) merged
//! from the fall-through edge and any jumps landing on it.

use thiserror::Error;

use crate::bytecode::Op;
use crate::bytecode::ir::CodeObject;
use crate::lang::{Literal, LiteralKind};
use crate::runtime::vm::VmConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("stack underflow at offset {offset}: {mnemonic} needs {needed} values, stack has {depth}")]
    StackUnderflow {
        offset: usize,
        mnemonic: &'static str,
        needed: usize,
        depth: usize,
    },

    #[error("stack overflow at offset {offset}: depth {depth} exceeds limit {limit}")]
    StackOverflow {
        offset: usize,
        depth: usize,
        limit: usize,
    },

    #[error("literal index {index} at offset {offset} is out of range (pool has {len})")]
    LiteralOutOfRange {
        offset: usize,
        index: u8,
        len: usize,
    },

    #[error("literal {index} at offset {offset} is a {found}, expected a {expected}")]
    LiteralKind {
        offset: usize,
        index: u8,
        expected: LiteralKind,
        found: LiteralKind,
    },

    #[error("local slot {slot} at offset {offset} is out of range (limit {limit})")]
    LocalOutOfRange { offset: usize, slot: u8, limit: usize },

    #[error("local slot {slot} read at offset {offset} may not be set")]
    UninitializedLocal { offset: usize, slot: u8 },

    #[error("call at offset {offset} passes {argc} arguments (limit {limit})")]
    TooManyArguments {
        offset: usize,
        argc: usize,
        limit: usize,
    },

    #[error("jump at offset {offset} lands on {target}, which is not an instruction")]
    InvalidJumpTarget { offset: usize, target: usize },

    #[error("stack height mismatch at offset {offset}: {expected} on one path, {found} on another")]
    StackMismatch {
        offset: usize,
        expected: usize,
        found: usize,
    },

    #[error("execution runs off the end of the stream after offset {offset}")]
    FallOffEnd { offset: usize },
}

#[derive(Debug, Clone)]
struct State {
    height: usize,
    locals: Vec<bool>,
}

/// Check a decoded stream against the literal pool and the VM limits.
pub fn verify(
    code: &CodeObject,
    literals: &[Literal],
    config: &VmConfig,
) -> Result<(), VerifyError> {
    if code.instructions.is_empty() {
        return Err(VerifyError::FallOffEnd { offset: 0 });
    }

    let mut states: Vec<Option<State>> = vec![None; code.instructions.len()];
    states[0] = Some(State {
        height: 0,
        locals: vec![false; config.locals_max],
    });

    for (index, instruction) in code.instructions.iter().enumerate() {
        // Nothing reaches this instruction.
        let Some(mut state) = states[index].take() else {
            continue;
        };
        let offset = instruction.at;
        let op = instruction.op;

        match op {
            Op::PushString(i) => {
                literal_str(literals, offset, i)?;
            }
            Op::PushNumber(i) => {
                literal_number(literals, offset, i)?;
            }
            Op::Call { method, argc } => {
                literal_str(literals, offset, method)?;
                if argc as usize > config.max_args {
                    return Err(VerifyError::TooManyArguments {
                        offset,
                        argc: argc as usize,
                        limit: config.max_args,
                    });
                }
            }
            Op::GetLocal(slot) => {
                check_slot(offset, slot, config.locals_max)?;
                if !state.locals[slot as usize] {
                    return Err(VerifyError::UninitializedLocal { offset, slot });
                }
            }
            Op::SetLocal(slot) => check_slot(offset, slot, config.locals_max)?,
            _ => {}
        }

        let (pops, pushes) = op.effect();
        if pops > state.height {
            return Err(VerifyError::StackUnderflow {
                offset,
                mnemonic: op.opcode().mnemonic(),
                needed: pops,
                depth: state.height,
            });
        }
        state.height = state.height - pops + pushes;
        if state.height > config.stack_max {
            return Err(VerifyError::StackOverflow {
                offset,
                depth: state.height,
                limit: config.stack_max,
            });
        }

        if let Op::SetLocal(slot) = op {
            state.locals[slot as usize] = true;
        }

        match op {
            Op::Return => continue,
            Op::JumpUnless(skip) => {
                let target = instruction.next() + skip as usize;
                let target_index = code
                    .index_at(target)
                    .ok_or(VerifyError::InvalidJumpTarget { offset, target })?;
                merge(&mut states[target_index], state.clone(), target)?;
            }
            _ => {}
        }

        match states.get_mut(index + 1) {
            Some(next) => merge(next, state, instruction.next())?,
            None => return Err(VerifyError::FallOffEnd { offset }),
        }
    }

    Ok(())
}

fn check_literal(
    literals: &[Literal],
    offset: usize,
    index: u8,
    expected: LiteralKind,
) -> Result<&Literal, VerifyError> {
    let literal = literals
        .get(index as usize)
        .ok_or(VerifyError::LiteralOutOfRange {
            offset,
            index,
            len: literals.len(),
        })?;

    let found = literal.kind();
    if found != expected {
        return Err(VerifyError::LiteralKind {
            offset,
            index,
            expected,
            found,
        });
    }
    Ok(literal)
}

/// Text of a string literal referenced at `offset`.
pub(crate) fn literal_str(literals: &[Literal], offset: usize, index: u8) -> Result<&str, VerifyError> {
    let literal = check_literal(literals, offset, index, LiteralKind::Str)?;
    Ok(literal.as_str().unwrap_or_default())
}

/// Value of a number literal referenced at `offset`.
pub(crate) fn literal_number(literals: &[Literal], offset: usize, index: u8) -> Result<i64, VerifyError> {
    let literal = check_literal(literals, offset, index, LiteralKind::Number)?;
    Ok(literal.as_number().unwrap_or_default())
}

fn check_slot(offset: usize, slot: u8, limit: usize) -> Result<(), VerifyError> {
    if slot as usize >= limit {
        return Err(VerifyError::LocalOutOfRange {
            offset,
            slot,
            limit,
        });
    }
    Ok(())
}

fn merge(entry: &mut Option<State>, incoming: State, offset: usize) -> Result<(), VerifyError> {
    match entry {
        None => *entry = Some(incoming),
        Some(existing) => {
            if existing.height != incoming.height {
                return Err(VerifyError::StackMismatch {
                    offset,
                    expected: existing.height,
                    found: incoming.height,
                });
            }
            // A local is only definitely set if every path sets it.
            for (set, other) in existing.locals.iter_mut().zip(incoming.locals) {
                *set = *set && other;
            }
        }
    }
    Ok(())
}
