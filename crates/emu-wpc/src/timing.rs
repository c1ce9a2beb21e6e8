//! ASIC timers: periodic IRQ, mains zero-cross detect and the CPU
//! watchdog.
//!
//! All three are driven from the main CPU tick count. The periodic IRQ
//! fires every 2048 ticks (~977 Hz); the zero-cross flag follows the
//! rectified 60 Hz mains and is sampled by game code at 0x3FFF. The
//! watchdog must be serviced by the IRQ handler; an expiry is fatal to
//! the game program but not to the emulator, so it is counted and the
//! timer rearmed.

use serde::{Deserialize, Serialize};

/// Ticks between periodic IRQ assertions (2 MHz / 2048 = ~977 Hz).
pub const IRQ_INTERVAL_TICKS: u32 = 2048;

/// Ticks between mains zero crossings (120 Hz on 60 Hz mains).
pub const ZERO_CROSS_INTERVAL_TICKS: u32 = 16_667;

/// Ticks the watchdog runs without service before it expires (~0.5 s).
pub const WATCHDOG_TIMEOUT_TICKS: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WatchdogState {
    #[default]
    Idle,
    Armed,
    Expired,
}

/// Events produced by one timing advance.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingEvents {
    /// Periodic IRQ assertions due in this slice.
    pub irqs: u32,
    /// A zero crossing occurred in this slice.
    pub zero_cross: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingController {
    irq_accum: u32,
    zero_cross_accum: u32,
    watchdog_remaining: u32,
    pub watchdog_state: WatchdogState,
    pub irq_count: u64,
    pub zero_cross_count: u64,
    pub watchdog_expired_count: u64,
}

impl Default for TimingController {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            irq_accum: 0,
            zero_cross_accum: 0,
            watchdog_remaining: WATCHDOG_TIMEOUT_TICKS,
            watchdog_state: WatchdogState::Armed,
            irq_count: 0,
            zero_cross_count: 0,
            watchdog_expired_count: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance by a slice of CPU ticks and report the events due.
    pub fn advance(&mut self, ticks: u32) -> TimingEvents {
        let mut events = TimingEvents::default();

        self.irq_accum += ticks;
        while self.irq_accum >= IRQ_INTERVAL_TICKS {
            self.irq_accum -= IRQ_INTERVAL_TICKS;
            events.irqs += 1;
            self.irq_count += 1;
        }

        self.zero_cross_accum += ticks;
        while self.zero_cross_accum >= ZERO_CROSS_INTERVAL_TICKS {
            self.zero_cross_accum -= ZERO_CROSS_INTERVAL_TICKS;
            events.zero_cross = true;
            self.zero_cross_count += 1;
        }

        if self.watchdog_state == WatchdogState::Armed {
            if self.watchdog_remaining > ticks {
                self.watchdog_remaining -= ticks;
            } else {
                self.watchdog_state = WatchdogState::Expired;
                self.watchdog_expired_count += 1;
            }
        }

        events
    }

    /// Game code kicked the watchdog (write to 0x3FFF).
    pub fn service_watchdog(&mut self) {
        self.watchdog_state = WatchdogState::Armed;
        self.watchdog_remaining = WATCHDOG_TIMEOUT_TICKS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irq_cadence() {
        let mut timing = TimingController::new();
        let events = timing.advance(IRQ_INTERVAL_TICKS - 1);
        assert_eq!(events.irqs, 0);
        let events = timing.advance(1);
        assert_eq!(events.irqs, 1);
        // a large slice yields every IRQ due, not just one
        let events = timing.advance(IRQ_INTERVAL_TICKS * 3);
        assert_eq!(events.irqs, 3);
        assert_eq!(timing.irq_count, 4);
    }

    #[test]
    fn zero_cross_cadence() {
        let mut timing = TimingController::new();
        assert!(!timing.advance(ZERO_CROSS_INTERVAL_TICKS - 1).zero_cross);
        assert!(timing.advance(1).zero_cross);
        assert_eq!(timing.zero_cross_count, 1);
    }

    #[test]
    fn watchdog_expires_without_service() {
        let mut timing = TimingController::new();
        timing.advance(WATCHDOG_TIMEOUT_TICKS);
        assert_eq!(timing.watchdog_state, WatchdogState::Expired);
        assert_eq!(timing.watchdog_expired_count, 1);
        // expired is sticky until serviced
        timing.advance(WATCHDOG_TIMEOUT_TICKS);
        assert_eq!(timing.watchdog_expired_count, 1);
    }

    #[test]
    fn watchdog_service_rearms() {
        let mut timing = TimingController::new();
        timing.advance(WATCHDOG_TIMEOUT_TICKS - 1);
        timing.service_watchdog();
        timing.advance(WATCHDOG_TIMEOUT_TICKS - 1);
        assert_eq!(timing.watchdog_state, WatchdogState::Armed);
        timing.advance(1);
        assert_eq!(timing.watchdog_state, WatchdogState::Expired);
        timing.service_watchdog();
        assert_eq!(timing.watchdog_state, WatchdogState::Armed);
    }
}
