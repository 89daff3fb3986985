//! i386 stub (§2 Non-goals: only i8086 gets a full pipeline in this crate).
//! Registered in the `Architecture` dispatch table so `--arch i386`
//! produces a clean `UnimplementedArchitecture` error instead of a panic.

use crate::arch::{Architecture, StepMode, StepOutcome};
use crate::error::{EmulatorError, EmulatorResult};
use crate::memory::Memory;

#[derive(Debug, Default)]
pub struct I386;

impl Architecture for I386 {
    fn name(&self) -> &'static str {
        "i386"
    }

    fn step(
        &mut self,
        _memory: &mut Memory,
        _ip: &mut u16,
        _mode: StepMode,
    ) -> EmulatorResult<StepOutcome> {
        Err(EmulatorError::UnimplementedArchitecture { arch: "i386" })
    }
}
