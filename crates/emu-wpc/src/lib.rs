//! Williams WPC pinball machine emulator (DMD generation).
//!
//! Two MC6809 boards: the CPU board with the WPC ASIC (display, switch
//! matrix, lamps, solenoids, timers) and the sound board with a YM2151
//! FM synthesizer and an 8-bit DAC. Everything is driven from the 2 MHz
//! CPU tick count; there are no wall-clock dependencies, so runs are
//! deterministic and the whole machine state serializes with serde.
//!
//! ```no_run
//! use emu_wpc::{GameConfig, RomSet, WpcEmu};
//!
//! let roms = RomSet {
//!     u06: std::fs::read("game.u6")?,
//!     u18: std::fs::read("sound.u18")?,
//!     ..RomSet::default()
//! };
//! let mut machine = WpcEmu::initialise(roms, GameConfig::default())?;
//! // one 60 Hz frame
//! machine.execute_cycles(2_000_000 / 60, 32)?;
//! let state = machine.get_ui_state();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod cpu_board;
pub mod dmd;
pub mod external_io;
pub mod lamp_matrix;
pub mod mapper;
pub mod memory_protect;
pub mod rom;
pub mod snapshot;
pub mod solenoid_matrix;
pub mod sound_board;
pub mod switch_matrix;
pub mod timing;
pub mod wpc;

pub use config::{CPU_CLOCK_HZ, GameConfig, WpcGeneration};
pub use mapper::BankError;
pub use rom::{RomLoadError, RomSet};
pub use snapshot::UiState;
pub use wpc::{StepError, WpcEmu};
