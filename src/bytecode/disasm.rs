use crate::bytecode::decode::{DecodeError, decode};
use crate::bytecode::ir::CodeObject;
use crate::bytecode::{Op, Program};
use crate::lang::Literal;
use std::fmt::Write;

/// Print disassembly of a bytecode program
pub fn print_bc(program: &Program) -> Result<(), DecodeError> {
    print!("{}", disassemble(program)?);
    Ok(())
}

/// Render a program as a listing, one instruction per line.
pub fn disassemble(program: &Program) -> Result<String, DecodeError> {
    let code = decode(&program.code)?;
    let mut out = String::new();

    let _ = writeln!(out, "════════════════════════════════════════");
    let _ = writeln!(
        out,
        " {} literals, {} instructions, {} bytes",
        program.literals.len(),
        code.instructions.len(),
        code.len
    );
    let _ = writeln!(out, "════════════════════════════════════════");

    for (i, literal) in program.literals.iter().enumerate() {
        let _ = writeln!(out, "  #{:<3} {}", i, literal);
    }
    if !program.literals.is_empty() {
        let _ = writeln!(out);
    }

    disassemble_code(&mut out, &code, &program.literals);
    Ok(out)
}

fn disassemble_code(out: &mut String, code: &CodeObject, literals: &[Literal]) {
    let jump_targets = collect_jump_targets(code);

    for (index, instruction) in code.instructions.iter().enumerate() {
        let is_target = jump_targets.contains(&instruction.at);
        if is_target {
            let _ = writeln!(out, "      ┌──────────────────────────────────");
        }

        let marker = if is_target { "► " } else { "  " };
        let _ = write!(out, "{:04} {}", instruction.at, marker);
        let _ = writeln!(out, "{}", format_op(&instruction.op, code, index, literals));
    }
}

fn collect_jump_targets(code: &CodeObject) -> Vec<usize> {
    let mut targets = Vec::new();

    for index in 0..code.instructions.len() {
        if let Some(target) = code.jump_target(index) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    targets
}

fn format_op(op: &Op, code: &CodeObject, index: usize, literals: &[Literal]) -> String {
    let name = op.opcode().mnemonic();

    match *op {
        Op::PushSelf | Op::PushNil | Op::Add | Op::Return => name.to_string(),
        Op::PushBool(b) => format!("{:<12}{:<8}; {}", name, b as u8, b),
        Op::PushString(i) | Op::PushNumber(i) => {
            format!("{:<12}{:<8}; {}", name, i, describe_literal(literals, i))
        }
        Op::GetLocal(slot) | Op::SetLocal(slot) => format!("{:<12}{}", name, slot),
        Op::Call { method, argc } => format!(
            "{:<12}{:<8}; {} ({} args)",
            name,
            format!("{}, {}", method, argc),
            describe_literal(literals, method),
            argc
        ),
        Op::JumpUnless(skip) => match code.jump_target(index) {
            Some(target) => format!("{:<12}{:<8}; ↓ (→ {:04})", name, skip, target),
            None => format!("{:<12}{}", name, skip),
        },
    }
}

fn describe_literal(literals: &[Literal], index: u8) -> String {
    literals
        .get(index as usize)
        .map(|l| l.to_string())
        .unwrap_or_else(|| "<out of range>".to_string())
}
