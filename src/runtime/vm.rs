use log::{debug, trace};

use crate::bytecode::decode::decode;
use crate::bytecode::ir::CodeObject;
use crate::bytecode::verify::{literal_number, literal_str, verify};
use crate::bytecode::{Op, Program, VerifyError};
use crate::lang::Literal;
use crate::runtime::object_runtime::ObjectRuntime;
use crate::runtime::runtime_error::{ObjectError, VmError};

/// Capacity of the operand stack, the locals array and a call's argument
/// list in the default configuration.
pub const STACK_MAX: usize = 10;

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub stack_max: usize,
    pub locals_max: usize,
    pub max_args: usize,
    pub max_steps: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_max: STACK_MAX,
            locals_max: STACK_MAX,
            max_args: STACK_MAX,
            max_steps: None,
        }
    }
}

/// Outcome of executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Returned,
}

pub struct Vm {
    config: VmConfig,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Decode, verify and run `program` until it returns.
    pub fn run<R: ObjectRuntime>(&self, runtime: &mut R, program: &Program) -> Result<(), VmError> {
        self.start(runtime, program)?.run_to_end()
    }

    /// Decode and verify `program` and set up a run without executing it.
    ///
    /// Nothing is allocated in the runtime if the program is rejected.
    pub fn start<'a, R: ObjectRuntime>(
        &'a self,
        runtime: &'a mut R,
        program: &'a Program,
    ) -> Result<Execution<'a, R>, VmError> {
        let code = decode(&program.code)?;
        verify(&code, &program.literals, &self.config)?;

        debug!(
            "starting run: {} instructions, {} literals",
            code.instructions.len(),
            program.literals.len()
        );

        let frame = Frame::new(runtime.new_self(), &self.config);
        Ok(Execution {
            runtime,
            literals: &program.literals,
            config: &self.config,
            code,
            frame: Some(frame),
            pc: 0,
            steps: 0,
        })
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the interpreter holds references to during a run.
///
/// Each stack slot and each populated local owns one strong reference.
/// Dropping the frame releases self, then the locals, then the stack.
struct Frame<H> {
    receiver: H,
    locals: Vec<Option<H>>,
    stack: Vec<H>,
    stack_max: usize,
}

impl<H> Frame<H> {
    fn new(receiver: H, config: &VmConfig) -> Self {
        let mut locals = Vec::with_capacity(config.locals_max);
        locals.resize_with(config.locals_max, || None);
        Self {
            receiver,
            locals,
            stack: Vec::with_capacity(config.stack_max),
            stack_max: config.stack_max,
        }
    }

    fn push(&mut self, value: H, offset: usize) -> Result<(), VmError> {
        if self.stack.len() >= self.stack_max {
            return Err(VmError::StackOverflow {
                offset,
                limit: self.stack_max,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, offset: usize) -> Result<H, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow { offset })
    }
}

/// A run in progress.
///
/// Dropping an execution before it returns still releases everything it holds.
pub struct Execution<'a, R: ObjectRuntime> {
    runtime: &'a mut R,
    literals: &'a [Literal],
    config: &'a VmConfig,
    code: CodeObject,
    frame: Option<Frame<R::Handle>>,
    pc: usize,
    steps: usize,
}

impl<'a, R: ObjectRuntime> Execution<'a, R> {
    pub fn is_finished(&self) -> bool {
        self.frame.is_none()
    }

    /// Values on the operand stack, bottom first.
    pub fn stack(&self) -> &[R::Handle] {
        self.frame
            .as_ref()
            .map(|f| f.stack.as_slice())
            .unwrap_or(&[])
    }

    pub fn local(&self, slot: usize) -> Option<&R::Handle> {
        self.frame.as_ref()?.locals.get(slot)?.as_ref()
    }

    /// Byte offset of the next instruction to execute.
    pub fn offset(&self) -> Option<usize> {
        self.frame.as_ref()?;
        self.code.instructions.get(self.pc).map(|i| i.at)
    }

    pub fn run_to_end(mut self) -> Result<(), VmError> {
        while self.step()? == Step::Continue {}
        Ok(())
    }

    /// Execute one instruction.
    ///
    /// After `RETURN` or an error the frame is torn down and further calls
    /// report `Step::Returned`.
    pub fn step(&mut self) -> Result<Step, VmError> {
        if self.frame.is_none() {
            return Ok(Step::Returned);
        }

        let result = self.execute_next();
        if !matches!(result, Ok(Step::Continue)) {
            self.finish();
        }
        result
    }

    fn finish(&mut self) {
        if let Some(frame) = self.frame.take() {
            debug!(
                "run finished after {} steps, releasing {} stack values",
                self.steps,
                frame.stack.len()
            );
        }
    }

    fn check_limits(&mut self) -> Result<(), VmError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(VmError::StepLimit(max));
            }
        }

        Ok(())
    }

    fn execute_next(&mut self) -> Result<Step, VmError> {
        self.check_limits()?;

        let instruction = *self
            .code
            .instructions
            .get(self.pc)
            .ok_or(VerifyError::FallOffEnd {
                offset: self.code.len,
            })?;
        let Some(frame) = self.frame.as_mut() else {
            return Ok(Step::Returned);
        };
        let runtime = &mut *self.runtime;
        let literals = self.literals;

        let at = instruction.at;
        let object_error = move |source: ObjectError| VmError::Object { offset: at, source };

        trace!("{:04} {:?} (depth {})", at, instruction.op, frame.stack.len());
        self.pc += 1;

        match instruction.op {
            Op::PushSelf => {
                let receiver = frame.receiver.clone();
                frame.push(receiver, at)?;
            }
            Op::PushNil => frame.push(runtime.nil(), at)?,
            Op::PushBool(value) => frame.push(runtime.boolean(value), at)?,
            Op::PushString(index) => {
                let text = literal_str(literals, at, index)?;
                frame.push(runtime.new_string(text), at)?;
            }
            Op::PushNumber(index) => {
                let value = literal_number(literals, at, index)?;
                frame.push(runtime.new_number(value), at)?;
            }

            Op::GetLocal(slot) => {
                let value = frame
                    .locals
                    .get(slot as usize)
                    .and_then(Option::as_ref)
                    .cloned()
                    .ok_or(VmError::EmptyLocal { offset: at, slot })?;
                frame.push(value, at)?;
            }
            Op::SetLocal(slot) => {
                let value = frame.pop(at)?;
                let limit = frame.locals.len();
                let entry = frame
                    .locals
                    .get_mut(slot as usize)
                    .ok_or(VerifyError::LocalOutOfRange {
                        offset: at,
                        slot,
                        limit,
                    })?;
                // Replacing the slot releases the previous occupant.
                *entry = Some(value);
            }

            Op::Add => {
                let a = frame.pop(at)?;
                let b = frame.pop(at)?;
                let lhs = runtime.number_value(&b).map_err(object_error)?;
                let rhs = runtime.number_value(&a).map_err(object_error)?;
                let sum = lhs
                    .checked_add(rhs)
                    .ok_or(ObjectError::Overflow("ADD"))
                    .map_err(object_error)?;
                frame.push(runtime.new_number(sum), at)?;
            }

            Op::Call { method, argc } => {
                let name = literal_str(literals, at, method)?;
                let argc = argc as usize;
                if argc > self.config.max_args {
                    return Err(VmError::TooManyArguments {
                        offset: at,
                        argc,
                        limit: self.config.max_args,
                    });
                }

                // Arguments end up in pop order: args[0] was pushed last.
                let mut args = Vec::with_capacity(argc);
                for _ in 0..argc {
                    args.push(frame.pop(at)?);
                }
                let receiver = frame.pop(at)?;

                let result = runtime
                    .call(&receiver, name, &args)
                    .map_err(object_error)?;
                frame.push(result, at)?;
            }

            Op::JumpUnless(skip) => {
                let condition = frame.pop(at)?;
                if !runtime.is_true(&condition) {
                    let target = instruction.next() + skip as usize;
                    self.pc = self
                        .code
                        .index_at(target)
                        .ok_or(VmError::InvalidJump { offset: at })?;
                }
            }

            Op::Return => return Ok(Step::Returned),
        }

        Ok(Step::Continue)
    }
}
