//! The machine: both boards, the ASIC timers and the wiring between
//! them.
//!
//! `WpcEmu` owns the CPU board and the sound board and advances them in
//! lockstep: the main CPU runs a slice of instructions, then the timers,
//! the display scanline and the sound board catch up on the same tick
//! budget. Cross-board traffic (sound commands, the reply latch, the
//! reset line) is drained from the buses between slices, so neither
//! board ever calls into the other.
//!
//! The whole machine serializes with serde; restoring a state resumes
//! execution exactly where it left off. The audio consumer is not part
//! of the state and must be registered again after a restore.

use core::fmt;

use emu_core::Ticks;
use motorola_6809::CpuError;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::cpu_board::CpuBoard;
use crate::mapper::BankError;
use crate::rom::{self, RomLoadError, RomSet};
use crate::snapshot::{CpuSnapshot, Diagnostics, DmdSnapshot, SoundSnapshot, UiState};
use crate::sound_board::SoundBoard;
use crate::timing::TimingController;

/// Fatal execution fault. The machine is left in the state it faulted
/// in, so it can be inspected or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    /// A CPU hit an undefined opcode.
    Cpu(CpuError),
    /// The sound program selected a bank that enables no ROM chip.
    SoundBank(BankError),
}

impl From<CpuError> for StepError {
    fn from(err: CpuError) -> Self {
        Self::Cpu(err)
    }
}

impl From<BankError> for StepError {
    fn from(err: BankError) -> Self {
        Self::SoundBank(err)
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu(err) => write!(f, "cpu fault: {err}"),
            Self::SoundBank(err) => write!(f, "sound board fault: {err}"),
        }
    }
}

impl std::error::Error for StepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cpu(err) => Some(err),
            Self::SoundBank(err) => Some(err),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct WpcEmu {
    config: GameConfig,
    cpu_board: CpuBoard,
    sound_board: SoundBoard,
    timing: TimingController,
    master_ticks: Ticks,
}

impl WpcEmu {
    /// Validate the ROM set, build both boards and run the reset
    /// sequence.
    pub fn initialise(roms: RomSet, config: GameConfig) -> Result<Self, RomLoadError> {
        let loaded = rom::load(roms)?;
        let cpu_board = CpuBoard::new(loaded.game, loaded.bank_count);
        let sound_board = SoundBoard::new(
            loaded.sound_system,
            loaded.sound_banked,
            config.sound_firq_ticks,
            config.sample_rate,
        );
        let mut machine = Self {
            config,
            cpu_board,
            sound_board,
            timing: TimingController::new(),
            master_ticks: Ticks::ZERO,
        };
        machine.reset();
        Ok(machine)
    }

    /// Pull the reset line on both boards. The tick counter keeps
    /// running; telemetry survives a reset.
    pub fn reset(&mut self) {
        self.cpu_board.reset();
        self.sound_board.reset();
        self.timing.reset();
    }

    #[must_use]
    pub fn ticks(&self) -> Ticks {
        self.master_ticks
    }

    /// Run the machine for at least `ticks` main-CPU ticks, draining
    /// cross-board events every `ticks_per_step` ticks. Returns the
    /// ticks actually executed; the overshoot is at most one
    /// instruction per slice.
    pub fn execute_cycles(&mut self, ticks: u32, ticks_per_step: u32) -> Result<u32, StepError> {
        let slice = ticks_per_step.max(1);
        let mut executed = 0;
        while executed < ticks {
            let budget = slice.min(ticks - executed);
            let ran = self.cpu_board.cpu.steps(&mut self.cpu_board.bus, budget)?;
            executed += ran;
            self.master_ticks += Ticks::from(ran);
            self.cpu_board.bus.set_tick_count(self.master_ticks.get());

            let events = self.timing.advance(ran);
            for _ in 0..events.irqs {
                self.cpu_board.cpu.irq();
            }
            if events.zero_cross {
                self.cpu_board.bus.set_zero_cross();
            }
            if self.cpu_board.bus.take_watchdog_service() {
                self.timing.service_watchdog();
            }
            if self.cpu_board.bus.dmd.advance(ran) {
                self.cpu_board.cpu.firq();
            }

            if let Some(command) = self.cpu_board.bus.take_sound_command() {
                self.sound_board.write_command(command);
            }
            if self.cpu_board.bus.take_sound_control_reset() {
                self.sound_board.reset();
            }

            self.sound_board.execute(ran)?;

            if let Some(reply) = self.sound_board.take_reply() {
                self.cpu_board.bus.set_sound_reply(reply);
                self.cpu_board.cpu.firq();
            }
        }
        Ok(executed)
    }

    /// Replace the closed-switch byte for one switch matrix column
    /// (0-7).
    pub fn set_direct_input(&mut self, column: u8, value: u8) {
        self.cpu_board.bus.switches.set_input(column, value);
    }

    /// Latch momentary cabinet switch bits (coin door, service
    /// buttons). Cleared when game code reads them.
    pub fn set_cabinet_input(&mut self, mask: u8) {
        self.cpu_board.bus.switches.set_cabinet(mask);
    }

    /// Set the fliptronics flipper switch inputs (1 = pressed; the
    /// hardware reads them active low).
    pub fn set_fliptronics_input(&mut self, value: u8) {
        self.cpu_board.bus.switches.set_fliptronics(value);
    }

    /// Audio samples from the sound board are pushed to the consumer as
    /// they are produced, in the range -1.0..=1.0.
    pub fn register_audio_consumer(&mut self, consumer: impl FnMut(f32) + 'static) {
        self.sound_board.register_audio_consumer(Box::new(consumer));
    }

    /// Cloned, serializable snapshot of everything a front end renders.
    #[must_use]
    pub fn get_ui_state(&self) -> UiState {
        UiState {
            game_name: self.config.name.clone(),
            ticks: self.master_ticks.get(),
            cpu: CpuSnapshot::from(&self.cpu_board.cpu),
            sound: SoundSnapshot {
                cpu: CpuSnapshot::from(&self.sound_board.cpu),
                command_latch: self.sound_board.bus.latch(),
                command_pending: self.sound_board.bus.latch_ready(),
                volume: self.sound_board.bus.volume,
                samples_produced: self.sound_board.samples_produced,
                ym_status: self.sound_board.bus.ym.status(),
            },
            dmd: DmdSnapshot::from(&self.cpu_board.bus.dmd),
            ram: self.cpu_board.ram().to_vec(),
            lamps: self.cpu_board.bus.lamps.lamps().to_vec(),
            solenoids: self.cpu_board.bus.solenoids.outputs().to_vec(),
            gi: self.cpu_board.bus.solenoids.gi().to_vec(),
            diag_led: self.cpu_board.bus.diag_led,
            diagnostics: Diagnostics::collect(
                &self.timing,
                &self.cpu_board.bus,
                &self.sound_board.bus,
            ),
        }
    }
}
