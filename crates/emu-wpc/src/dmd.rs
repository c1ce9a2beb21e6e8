//! Dot matrix display controller.
//!
//! 16 pages of 512 bytes of video RAM (128x32, one bit per dot). Two
//! movable windows map pages into the CPU address space; a third
//! register selects the page the display hardware scans out. A scanline
//! counter advances every 512 ticks and raises FIRQ when it matches the
//! programmed row, which is how game code paces page flips.

use serde::{Deserialize, Serialize};

pub const PAGE_SIZE: usize = 0x200;
pub const PAGE_COUNT: usize = 16;
pub const ROWS: u8 = 32;

/// Ticks per scanline (2048 ticks per 4-row group in the real ASIC;
/// modeled as one row per 512 ticks).
pub const SCANLINE_INTERVAL_TICKS: u32 = 512;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dmd {
    video_ram: Vec<u8>,
    low_page: u8,
    high_page: u8,
    active_page: u8,
    firq_row: u8,
    scanline: u8,
    scanline_accum: u32,
    /// FIRQ raised and not yet acknowledged via 0x3FF8.
    firq_pending: bool,
    pub firq_count: u64,
}

impl Default for Dmd {
    fn default() -> Self {
        Self::new()
    }
}

impl Dmd {
    #[must_use]
    pub fn new() -> Self {
        Self {
            video_ram: vec![0; PAGE_SIZE * PAGE_COUNT],
            low_page: 0,
            high_page: 0,
            active_page: 0,
            firq_row: 0,
            scanline: 0,
            scanline_accum: 0,
            firq_pending: false,
            firq_count: 0,
        }
    }

    pub fn set_low_page(&mut self, value: u8) {
        self.low_page = value & 0x0F;
    }

    pub fn set_high_page(&mut self, value: u8) {
        self.high_page = value & 0x0F;
    }

    pub fn set_active_page(&mut self, value: u8) {
        self.active_page = value & 0x0F;
    }

    pub fn set_firq_row(&mut self, value: u8) {
        self.firq_row = value & (ROWS - 1);
    }

    #[must_use]
    pub fn active_page(&self) -> u8 {
        self.active_page
    }

    #[must_use]
    pub fn read_low(&self, offset: u16) -> u8 {
        self.video_ram[usize::from(self.low_page) * PAGE_SIZE + usize::from(offset)]
    }

    pub fn write_low(&mut self, offset: u16, value: u8) {
        self.video_ram[usize::from(self.low_page) * PAGE_SIZE + usize::from(offset)] = value;
    }

    #[must_use]
    pub fn read_high(&self, offset: u16) -> u8 {
        self.video_ram[usize::from(self.high_page) * PAGE_SIZE + usize::from(offset)]
    }

    pub fn write_high(&mut self, offset: u16, value: u8) {
        self.video_ram[usize::from(self.high_page) * PAGE_SIZE + usize::from(offset)] = value;
    }

    /// Advance the scanline counter; returns true when FIRQ should be
    /// asserted (scanline reached the programmed row).
    pub fn advance(&mut self, ticks: u32) -> bool {
        let mut request = false;
        self.scanline_accum += ticks;
        while self.scanline_accum >= SCANLINE_INTERVAL_TICKS {
            self.scanline_accum -= SCANLINE_INTERVAL_TICKS;
            self.scanline = (self.scanline + 1) & (ROWS - 1);
            if self.scanline == self.firq_row {
                self.firq_pending = true;
                self.firq_count += 1;
                request = true;
            }
        }
        request
    }

    #[must_use]
    pub fn firq_pending(&self) -> bool {
        self.firq_pending
    }

    /// Acknowledge the scanline FIRQ (write to 0x3FF8).
    pub fn clear_firq(&mut self) {
        self.firq_pending = false;
    }

    /// The frame currently being scanned out.
    #[must_use]
    pub fn active_frame(&self) -> &[u8] {
        let base = usize::from(self.active_page) * PAGE_SIZE;
        &self.video_ram[base..base + PAGE_SIZE]
    }
}
