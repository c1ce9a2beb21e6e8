//! UI state snapshot.
//!
//! A cloned, serializable view of everything a front end renders:
//! display frame, lamps, solenoids, CPU telemetry and the diagnostics
//! counters. Snapshots are plain data; serializing two of them from
//! machines fed identical inputs must yield identical bytes, which is
//! what the determinism tests check.

use motorola_6809::{Mc6809, Registers};
use serde::{Deserialize, Serialize};

use crate::dmd::Dmd;
use crate::timing::{TimingController, WatchdogState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub regs: Registers,
    pub tick_count: u64,
    pub irq_count: u64,
    pub firq_count: u64,
    pub nmi_count: u64,
    pub missed_irq: u64,
    pub missed_firq: u64,
}

impl From<&Mc6809> for CpuSnapshot {
    fn from(cpu: &Mc6809) -> Self {
        Self {
            regs: cpu.regs,
            tick_count: cpu.tick_count,
            irq_count: cpu.irq_count,
            firq_count: cpu.firq_count,
            nmi_count: cpu.nmi_count,
            missed_irq: cpu.missed_irq,
            missed_firq: cpu.missed_firq,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmdSnapshot {
    pub active_page: u8,
    /// The 512-byte page being scanned out (128x32, one bit per dot).
    pub frame: Vec<u8>,
    pub firq_count: u64,
}

impl From<&Dmd> for DmdSnapshot {
    fn from(dmd: &Dmd) -> Self {
        Self {
            active_page: dmd.active_page(),
            frame: dmd.active_frame().to_vec(),
            firq_count: dmd.firq_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundSnapshot {
    pub cpu: CpuSnapshot,
    pub command_latch: u8,
    pub command_pending: bool,
    pub volume: u8,
    pub samples_produced: u64,
    pub ym_status: u8,
}

/// Counters surfaced for debugging, not gameplay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub irq_count: u64,
    pub zero_cross_count: u64,
    pub watchdog_state: WatchdogState,
    pub watchdog_expired_count: u64,
    pub blocked_ram_writes: u64,
    pub diag_led_toggles: u64,
    pub external_io_unhandled_reads: u64,
    pub external_io_unhandled_writes: u64,
    pub expansion_reads: u64,
    pub expansion_writes: u64,
    pub sound_unhandled_reads: u64,
    pub sound_unhandled_writes: u64,
    pub hc55516_writes: u64,
}

impl Diagnostics {
    pub(crate) fn collect(
        timing: &TimingController,
        cpu_bus: &crate::cpu_board::CpuBus,
        sound_bus: &crate::sound_board::SoundBus,
    ) -> Self {
        Self {
            irq_count: timing.irq_count,
            zero_cross_count: timing.zero_cross_count,
            watchdog_state: timing.watchdog_state,
            watchdog_expired_count: timing.watchdog_expired_count,
            blocked_ram_writes: cpu_bus.protect.blocked_writes,
            diag_led_toggles: cpu_bus.diag_led_toggles,
            external_io_unhandled_reads: cpu_bus.external_io.unhandled_reads,
            external_io_unhandled_writes: cpu_bus.external_io.unhandled_writes,
            expansion_reads: cpu_bus.expansion_reads,
            expansion_writes: cpu_bus.expansion_writes,
            sound_unhandled_reads: sound_bus.unhandled_reads,
            sound_unhandled_writes: sound_bus.unhandled_writes,
            hc55516_writes: sound_bus.hc55516_writes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    pub game_name: String,
    pub ticks: u64,
    pub cpu: CpuSnapshot,
    pub sound: SoundSnapshot,
    pub dmd: DmdSnapshot,
    pub ram: Vec<u8>,
    pub lamps: Vec<u8>,
    pub solenoids: Vec<u8>,
    pub gi: Vec<u8>,
    pub diag_led: u8,
    pub diagnostics: Diagnostics,
}
