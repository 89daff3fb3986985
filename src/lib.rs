pub mod arch;
pub mod cursor;
pub mod emulator;
pub mod error;
pub mod memory;
pub mod pipeline;

pub use emulator::{Emulator, EmulatorConfig};
pub use error::{EmulatorError, EmulatorResult, ResultCode};
