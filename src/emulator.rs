//! Emulator lifecycle (§3): owns the flat memory and a concrete
//! `Architecture`, loads a program at `PROGRAM_START`, and hands off to
//! the pipeline driver for disassembly or execution.

use crate::arch::Architecture;
use crate::error::EmulatorResult;
use crate::memory::{Memory, MEMORY_SIZE, PROGRAM_START};
use crate::pipeline::{DisasmBuffer, Pipeline, PipelineState};

/// Runaway-program guards, not part of the 8086 architecture itself
/// (§4.6 Design Notes). `max_disasm_lines` bounds `disassemble`'s output
/// buffer; `max_instructions` bounds `emulate`'s step count.
#[derive(Debug, Clone, Copy)]
pub struct EmulatorConfig {
    pub max_instructions: u64,
    pub max_disasm_lines: usize,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            max_instructions: 1_000_000,
            max_disasm_lines: 100_000,
        }
    }
}

pub struct Emulator<A: Architecture> {
    memory: Memory,
    arch: A,
    config: EmulatorConfig,
}

impl<A: Architecture + Default> Emulator<A> {
    pub fn new(config: EmulatorConfig) -> Self {
        Emulator {
            memory: Memory::new(MEMORY_SIZE),
            arch: A::default(),
            config,
        }
    }

    pub fn load_program(&mut self, program: &[u8]) {
        self.memory.load_program(program);
    }

    pub fn architecture_name(&self) -> &'static str {
        self.arch.name()
    }

    pub fn run_emulate(&mut self) -> EmulatorResult<PipelineState> {
        let mut pipeline = Pipeline::new(&mut self.arch, &mut self.memory, PROGRAM_START);
        pipeline.run_emulate(self.config.max_instructions)?;
        Ok(pipeline.state())
    }

    pub fn run_disassemble(&mut self) -> EmulatorResult<DisasmBuffer> {
        let mut buffer = DisasmBuffer::new(self.config.max_disasm_lines);
        let mut pipeline = Pipeline::new(&mut self.arch, &mut self.memory, PROGRAM_START);
        pipeline.run_disassemble(&mut buffer)?;
        Ok(buffer)
    }

    pub fn arch(&self) -> &A {
        &self.arch
    }
}
