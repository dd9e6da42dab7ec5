//! The built-in sample program.

use crate::bytecode::{Assembler, Op, Program};

/// Prints "the answer is:", computes 30 + 2 into local 0, then skips the
/// second print because the condition is false.
///
/// ```text
/// PUSH_SELF
/// PUSH_STRING  0      ; "the answer is:"
/// CALL         1, 1   ; print
/// PUSH_NUMBER  2      ; 30
/// PUSH_NUMBER  3      ; 2
/// ADD
/// SET_LOCAL    0
/// PUSH_BOOL    0
/// JUMP_UNLESS  6
/// PUSH_SELF
/// GET_LOCAL    0
/// CALL         1, 1   ; print
/// RETURN
/// ```
pub fn answer_program() -> Program {
    let mut asm = Assembler::new();

    asm.op(Op::PushSelf)
        .push_string("the answer is:")
        .call("print", 1)
        .push_number(30)
        .push_number(2)
        .op(Op::Add)
        .op(Op::SetLocal(0))
        .op(Op::PushBool(false));

    let skip = asm.jump_unless();
    asm.op(Op::PushSelf).op(Op::GetLocal(0)).call("print", 1);
    asm.patch_jump(skip);

    asm.op(Op::Return);
    asm.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Literal;

    #[test]
    fn test_answer_program_layout() {
        let program = answer_program();

        assert_eq!(
            program.literals,
            vec![
                Literal::from("the answer is:"),
                Literal::from("print"),
                Literal::from(30),
                Literal::from(2),
            ]
        );
        assert_eq!(
            program.code,
            vec![
                0x00, // PUSH_SELF
                0x03, 0, // PUSH_STRING 0
                0x08, 1, 1, // CALL 1 1
                0x04, 2, // PUSH_NUMBER 2
                0x04, 3, // PUSH_NUMBER 3
                0x07, // ADD
                0x06, 0, // SET_LOCAL 0
                0x02, 0, // PUSH_BOOL 0
                0x09, 6, // JUMP_UNLESS 6
                0x00, // PUSH_SELF
                0x05, 0, // GET_LOCAL 0
                0x08, 1, 1, // CALL 1 1
                0x0A, // RETURN
            ]
        );
    }
}
