use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use pebble::bytecode::disasm::print_bc;
use pebble::demo::answer_program;
use pebble::{Program, VmConfig, run_program};

#[derive(Parser)]
#[command(name = "pebble", version, about = "Stack-based bytecode interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a compiled program file
    Run {
        file: PathBuf,

        #[command(flatten)]
        limits: Limits,
    },

    /// Print a listing of a compiled program file
    Disasm { file: PathBuf },

    /// Run the built-in sample program, or write it to a file
    Demo {
        #[arg(long, value_name = "FILE")]
        emit: Option<PathBuf>,

        #[command(flatten)]
        limits: Limits,
    },
}

#[derive(Args)]
struct Limits {
    /// Operand stack capacity
    #[arg(long, default_value_t = pebble::runtime::STACK_MAX)]
    stack_max: usize,

    /// Number of local slots
    #[arg(long, default_value_t = pebble::runtime::STACK_MAX)]
    locals: usize,

    /// Most arguments a single call may pass
    #[arg(long, default_value_t = pebble::runtime::STACK_MAX)]
    max_args: usize,

    /// Stop after this many instructions
    #[arg(long)]
    max_steps: Option<usize>,
}

impl From<Limits> for VmConfig {
    fn from(limits: Limits) -> Self {
        VmConfig {
            stack_max: limits.stack_max,
            locals_max: limits.locals,
            max_args: limits.max_args,
            max_steps: limits.max_steps,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match dispatch(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run { file, limits } => {
            let program = load(&file)?;
            execute(&program, limits.into())
        }
        Command::Disasm { file } => {
            let program = load(&file)?;
            print_bc(&program).with_context(|| format!("cannot disassemble {}", file.display()))
        }
        Command::Demo { emit, limits } => {
            let program = answer_program();
            match emit {
                Some(path) => {
                    program
                        .save(&path)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    println!("wrote {}", path.display());
                    Ok(())
                }
                None => execute(&program, limits.into()),
            }
        }
    }
}

fn load(path: &Path) -> anyhow::Result<Program> {
    Program::load(path).with_context(|| format!("cannot load {}", path.display()))
}

fn execute(program: &Program, config: VmConfig) -> anyhow::Result<()> {
    run_program(program, config, std::io::stdout().lock())?;
    Ok(())
}
