//! CLI front door (§6.4): `decode`, `disassemble`, `emulate`.
//!
//! Grounded in the teacher's `main.rs` logger setup
//! (`SimpleLogger::new().init()`), generalized to a `clap`-derived
//! subcommand dispatcher in place of the teacher's single hardcoded ROM
//! load, and to `anyhow` at the process boundary so every fallible step
//! downstream can keep using its own concrete error type.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use emulate::arch::i386::I386;
use emulate::arch::i8086::I8086;
use emulate::arch::rv64i::Rv64I;
use emulate::arch::{Architecture, StepMode};
use emulate::memory::{Memory, MEMORY_SIZE, PROGRAM_START};
use emulate::pipeline::{DisasmBuffer, Pipeline, PipelineState};

#[derive(Parser)]
#[command(
    name = "emulate",
    about = "Multi-architecture instruction decoder, disassembler, and emulator"
)]
struct Cli {
    #[arg(long, value_enum, default_value_t = Verbosity::Warn)]
    verbosity: Verbosity,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Verbosity {
    Error,
    Warn,
    Info,
    Debug,
}

impl From<Verbosity> for LevelFilter {
    fn from(v: Verbosity) -> Self {
        match v {
            Verbosity::Error => LevelFilter::Error,
            Verbosity::Warn => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Arch {
    I8086,
    I386,
    Rv64i,
}

#[derive(Subcommand)]
enum Command {
    /// Decodes an 8086 program and prints one tag per instruction.
    Decode { file: PathBuf },
    /// Disassembles a program into NASM-style assembly text.
    Disassemble {
        #[arg(long, value_enum, default_value_t = Arch::I8086)]
        arch: Arch,
        file: PathBuf,
    },
    /// Loads a program and runs it to completion.
    Emulate {
        #[arg(long, value_enum, default_value_t = Arch::I8086)]
        arch: Arch,
        file: PathBuf,
    },
}

fn make_arch(arch: Arch) -> Box<dyn Architecture> {
    match arch {
        Arch::I8086 => Box::new(I8086::new()),
        Arch::I386 => Box::new(I386),
        Arch::Rv64i => Box::new(Rv64I),
    }
}

fn load_memory(file: &PathBuf) -> Result<Memory> {
    let program =
        fs::read(file).with_context(|| format!("reading program file {}", file.display()))?;
    let mut memory = Memory::new(MEMORY_SIZE);
    memory.load_program(&program);
    Ok(memory)
}

fn run_decode(file: &PathBuf) -> Result<()> {
    let mut memory = load_memory(file)?;
    let mut arch = I8086::new();
    let mut ip = PROGRAM_START;
    loop {
        if memory.get(ip) == Some(0) && memory.get(ip.wrapping_add(1)) == Some(0) {
            break;
        }
        let outcome = arch.step(&mut memory, &mut ip, StepMode::Decode)?;
        if let Some(text) = outcome.text {
            println!("{}", text);
        }
    }
    Ok(())
}

fn run_disassemble(arch_choice: Arch, file: &PathBuf) -> Result<()> {
    let mut memory = load_memory(file)?;
    let mut arch = make_arch(arch_choice);
    let mut buffer = DisasmBuffer::new(100_000);
    let mut pipeline = Pipeline::new(&mut *arch, &mut memory, PROGRAM_START);
    pipeline.run_disassemble(&mut buffer)?;
    for line in buffer.lines() {
        println!("{}", line);
    }
    if buffer.truncated() {
        log::warn!("disassembly output truncated at buffer capacity");
    }
    Ok(())
}

fn run_emulate(arch_choice: Arch, file: &PathBuf) -> Result<PipelineState> {
    let mut memory = load_memory(file)?;
    let mut arch = make_arch(arch_choice);
    let mut pipeline = Pipeline::new(&mut *arch, &mut memory, PROGRAM_START);
    pipeline.run_emulate(1_000_000)?;
    Ok(pipeline.state())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    simple_logger::SimpleLogger::new()
        .with_level(cli.verbosity.into())
        .init()
        .expect("logger can only be initialized once");

    let result = match &cli.command {
        Command::Decode { file } => run_decode(file),
        Command::Disassemble { arch, file } => run_disassemble(*arch, file),
        Command::Emulate { arch, file } => run_emulate(*arch, file).map(|_| ()),
    };

    match result {
        Ok(()) => {
            log::info!("done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
