//! RV64I stub (§2 Non-goals: only i8086 gets a full pipeline in this
//! crate). Registered in the `Architecture` dispatch table so
//! `--arch rv64i` produces a clean `UnimplementedArchitecture` error
//! instead of a panic.

use crate::arch::{Architecture, StepMode, StepOutcome};
use crate::error::{EmulatorError, EmulatorResult};
use crate::memory::Memory;

#[derive(Debug, Default)]
pub struct Rv64I;

impl Architecture for Rv64I {
    fn name(&self) -> &'static str {
        "rv64i"
    }

    fn step(
        &mut self,
        _memory: &mut Memory,
        _ip: &mut u16,
        _mode: StepMode,
    ) -> EmulatorResult<StepOutcome> {
        Err(EmulatorError::UnimplementedArchitecture { arch: "rv64i" })
    }
}
