//! Switch matrix, cabinet switches and fliptronics inputs.
//!
//! Playfield switches form an 8x8 matrix: game code strobes a column
//! mask at 0x3FE9 and reads the row byte at 0x3FEA. Cabinet switches
//! (coin door, service buttons) are direct inputs latched until read.
//! Fliptronics flipper switches are direct inputs read active low.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchMatrix {
    /// Closed-switch bits per column.
    columns: [u8; 8],
    column_strobe: u8,
    /// Momentary cabinet bits, cleared when read.
    cabinet: u8,
    fliptronics: u8,
    pub cabinet_reads: u64,
}

impl SwitchMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the closed-switch byte for one matrix column (0-7).
    pub fn set_input(&mut self, column: u8, value: u8) {
        self.columns[usize::from(column & 0x07)] = value;
    }

    pub fn write_column_strobe(&mut self, value: u8) {
        self.column_strobe = value;
    }

    /// Row byte for the strobed columns. Several strobed columns OR
    /// together, as the diode matrix does.
    #[must_use]
    pub fn read_rows(&self) -> u8 {
        let mut rows = 0;
        for (index, &column) in self.columns.iter().enumerate() {
            if self.column_strobe & (1 << index) != 0 {
                rows |= column;
            }
        }
        rows
    }

    /// Latch momentary cabinet switch bits (OR-ed into the pending set).
    pub fn set_cabinet(&mut self, mask: u8) {
        self.cabinet |= mask;
    }

    /// Read and clear the pending cabinet switch bits.
    pub fn read_cabinet(&mut self) -> u8 {
        self.cabinet_reads += 1;
        std::mem::take(&mut self.cabinet)
    }

    pub fn set_fliptronics(&mut self, value: u8) {
        self.fliptronics = value;
    }

    /// Fliptronics inputs are wired active low.
    #[must_use]
    pub fn read_fliptronics(&self) -> u8 {
        !self.fliptronics
    }
}
