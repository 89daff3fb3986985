//! Pipeline Driver (C6, §4.6). Steps a decoded architecture instruction
//! at a time, in either disassemble or emulate mode, until it halts.
//!
//! Grounded in the teacher's `clock_tick`-driven test loops (`cpu/cpu.rs`
//! `#[cfg(test)]`): a single step function called in a loop by the caller,
//! rather than the driver owning its own thread or timer.

use log::{info, warn};

use crate::arch::{Architecture, StepMode};
use crate::error::{EmulatorError, EmulatorResult};
use crate::memory::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    HaltedOk,
    HaltedErr,
}

/// Why a run reached `HaltedOk`, for callers that want to distinguish a
/// clean program exit from the runaway-loop safety net firing (§4.6 step
/// 4, §5). Not an error: both are successful completions of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Hit the `0x00` end-of-program sentinel (§4.6 step 1).
    Sentinel,
    /// `instructions_run` reached the configured cap before a sentinel.
    RunawayCap,
    /// Disassembly output buffer filled; decode stopped early (§7).
    BufferFull,
    /// Cursor ran past the end of memory with no sentinel byte in sight
    /// (disassemble/decode mode only — emulate mode treats this as an
    /// error via `OutOfBounds` instead).
    EndOfMemory,
}

/// A capped line buffer for disassembly output (§4.6 Design Notes): a
/// pathological or corrupt program shouldn't make `disassemble` print
/// gigabytes of text, so collection stops at `max_lines` and the caller
/// is told the output was truncated rather than silently losing lines.
pub struct DisasmBuffer {
    lines: Vec<String>,
    max_lines: usize,
    truncated: bool,
}

impl DisasmBuffer {
    pub fn new(max_lines: usize) -> Self {
        DisasmBuffer {
            lines: Vec::new(),
            max_lines,
            truncated: false,
        }
    }

    /// Returns `false` once the buffer is full, so the driver knows to
    /// stop stepping.
    fn push(&mut self, line: String) -> bool {
        if self.lines.len() >= self.max_lines {
            self.truncated = true;
            return false;
        }
        self.lines.push(line);
        self.lines.len() < self.max_lines
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

/// Drives one `Architecture` over a flat `Memory`, owning only the cursor
/// position (`ip`) and run state; register/flag state lives inside the
/// `Architecture` implementation.
pub struct Pipeline<'a, A: Architecture + ?Sized> {
    arch: &'a mut A,
    memory: &'a mut Memory,
    ip: u16,
    instructions_run: u64,
    state: PipelineState,
    halt_reason: Option<HaltReason>,
}

/// A zero byte at `ip` marks the end of a loaded program (§4.6 step 1):
/// memory past the program is zero-filled, and `0x00` would otherwise
/// decode as a legitimate (if useless) `add` — the driver treats it as a
/// halt instead of looping forever. Consumes the sentinel byte (advances
/// `ip` by 1) the way a real byte1 fetch would, matching the scenario-1
/// expectation that halted IP is `PROGRAM_START + program_len + 1`.
fn check_sentinel(memory: &Memory, ip: &mut u16) -> bool {
    if memory.get(*ip) == Some(0) {
        *ip = ip.wrapping_add(1);
        true
    } else {
        false
    }
}

impl<'a, A: Architecture + ?Sized> Pipeline<'a, A> {
    pub fn new(arch: &'a mut A, memory: &'a mut Memory, entry_ip: u16) -> Self {
        Pipeline {
            arch,
            memory,
            ip: entry_ip,
            instructions_run: 0,
            state: PipelineState::Running,
            halt_reason: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Why the run halted, once `state()` is no longer `Running`. `None`
    /// while still running, or if the run ended in `HaltedErr` (the error
    /// value returned by `run_emulate`/`run_disassemble` already carries
    /// that reason).
    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt_reason
    }

    pub fn instructions_run(&self) -> u64 {
        self.instructions_run
    }

    pub fn ip(&self) -> u16 {
        self.ip
    }

    /// Runs until halted, a fetch/decode error, or `max_instructions` is
    /// reached (a runaway-program guard, not a spec'd architectural
    /// limit).
    pub fn run_emulate(&mut self, max_instructions: u64) -> EmulatorResult<()> {
        while self.instructions_run < max_instructions {
            if check_sentinel(self.memory, &mut self.ip) {
                self.state = PipelineState::HaltedOk;
                self.halt_reason = Some(HaltReason::Sentinel);
                info!("halted at end-of-program sentinel, ip={:#06x}", self.ip);
                return Ok(());
            }
            match self.arch.step(self.memory, &mut self.ip, StepMode::Emulate) {
                Ok(_) => self.instructions_run += 1,
                Err(e) => {
                    self.state = PipelineState::HaltedErr;
                    warn!("halted on error at ip={:#06x}: {}", self.ip, e);
                    return Err(e);
                }
            }
        }
        self.state = PipelineState::HaltedOk;
        self.halt_reason = Some(HaltReason::RunawayCap);
        warn!(
            "runaway loop guard: instruction cap {} reached at ip={:#06x}",
            max_instructions, self.ip
        );
        Ok(())
    }

    /// Disassembles instructions into `buffer` until the sentinel, an
    /// error, or the buffer fills.
    pub fn run_disassemble(&mut self, buffer: &mut DisasmBuffer) -> EmulatorResult<()> {
        self.run_textual(StepMode::Disassemble, buffer)
    }

    /// Same loop as `run_disassemble`, keyed by `mode` so `decode` (tag
    /// debug form) and `disassemble` (NASM text) share one driver path.
    pub fn run_textual(&mut self, mode: StepMode, buffer: &mut DisasmBuffer) -> EmulatorResult<()> {
        loop {
            if check_sentinel(self.memory, &mut self.ip) {
                self.state = PipelineState::HaltedOk;
                self.halt_reason = Some(HaltReason::Sentinel);
                return Ok(());
            }
            let outcome = match self.arch.step(self.memory, &mut self.ip, mode) {
                Ok(outcome) => outcome,
                Err(EmulatorError::OutOfBounds { .. }) => {
                    self.state = PipelineState::HaltedOk;
                    self.halt_reason = Some(HaltReason::EndOfMemory);
                    return Ok(());
                }
                Err(e) => {
                    self.state = PipelineState::HaltedErr;
                    return Err(e);
                }
            };
            self.instructions_run += 1;
            if let Some(text) = outcome.text {
                if !buffer.push(text) {
                    self.state = PipelineState::HaltedOk;
                    self.halt_reason = Some(HaltReason::BufferFull);
                    return Ok(());
                }
            }
        }
    }
}
