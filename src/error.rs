use thiserror::Error;

use crate::arch::i8086::tag::Tag;

/// All failures the core pipeline can report. Structural failures (§7):
/// the driver aborts the run and leaves emulator state as it was when the
/// error occurred. There is no rollback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmulatorError {
    #[error("cursor ran past end of memory at IP {ip:#06X}")]
    OutOfBounds { ip: u16 },

    #[error("unknown opcode: byte1={byte1:#04X} byte2={byte2:#04X}")]
    UnknownOpcode { byte1: u8, byte2: u8 },

    #[error("no handler registered for instruction tag {tag:?}")]
    UnimplementedInstruction { tag: Tag },

    #[error("architecture {arch} is not implemented")]
    UnimplementedArchitecture { arch: &'static str },
}

pub type EmulatorResult<T> = Result<T, EmulatorError>;

/// Mirrors the distilled spec's SUCCESS/FAILURE contract (§6.3) for callers
/// that want a two-valued status instead of the full error enum. The CLI
/// binary uses this to pick a process exit code; the library itself never
/// returns this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    Failure,
}

impl From<&EmulatorResult<()>> for ResultCode {
    fn from(result: &EmulatorResult<()>) -> Self {
        match result {
            Ok(()) => ResultCode::Success,
            Err(_) => ResultCode::Failure,
        }
    }
}
