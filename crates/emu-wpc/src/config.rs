//! Machine configuration and clock constants.

use serde::{Deserialize, Serialize};

/// Main and sound board CPU clock (both boards run MC6809s at 2 MHz).
pub const CPU_CLOCK_HZ: u32 = 2_000_000;

/// Default audio output rate for the sound board's downsampled mix.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 11_000;

/// Default period of the sound CPU's software FIRQ, in sound-CPU ticks.
/// Approximates the YM2151 timer interrupt rate (~2.4 kHz); a tuning
/// constant, not an architectural one.
pub const DEFAULT_SOUND_FIRQ_TICKS: u32 = 833;

/// WPC hardware generation.
///
/// Only the DMD generation (pre security-PIC) is modeled; the enum
/// leaves room for the later WPC-S/WPC-95 variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WpcGeneration {
    #[default]
    WpcDmd,
}

impl WpcGeneration {
    #[must_use]
    pub const fn cpu_clock_hz(self) -> u32 {
        match self {
            Self::WpcDmd => CPU_CLOCK_HZ,
        }
    }
}

/// Per-game configuration handed to `WpcEmu::initialise`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Game name, surfaced in the UI snapshot only.
    pub name: String,
    pub generation: WpcGeneration,
    /// Audio output sample rate in Hz.
    pub sample_rate: u32,
    /// Sound-CPU ticks between software FIRQ assertions.
    pub sound_firq_ticks: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            generation: WpcGeneration::WpcDmd,
            sample_rate: DEFAULT_SAMPLE_RATE_HZ,
            sound_firq_ticks: DEFAULT_SOUND_FIRQ_TICKS,
        }
    }
}
