//! Lamp matrix driver.
//!
//! 64 lamps in an 8x8 matrix. Game code strobes one column at 0x3FE5
//! and writes the row byte at 0x3FE4; the strobe cycles fast enough
//! that all lamps appear lit at once. Lamp state is kept per lamp as
//! 0x00 (off) or 0xFF (on) so a UI can render it directly.

use serde::{Deserialize, Serialize};

pub const LAMP_COUNT: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LampMatrix {
    row_output: u8,
    column_strobe: u8,
    lamps: Vec<u8>,
}

impl Default for LampMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl LampMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self {
            row_output: 0,
            column_strobe: 0,
            lamps: vec![0; LAMP_COUNT],
        }
    }

    pub fn write_row(&mut self, value: u8) {
        self.row_output = value;
        self.refresh();
    }

    pub fn write_column(&mut self, value: u8) {
        self.column_strobe = value;
        self.refresh();
    }

    /// Latch the row outputs into every strobed column.
    fn refresh(&mut self) {
        for column in 0..8 {
            if self.column_strobe & (1 << column) == 0 {
                continue;
            }
            for row in 0..8 {
                let lit = self.row_output & (1 << row) != 0;
                self.lamps[column * 8 + row] = if lit { 0xFF } else { 0x00 };
            }
        }
    }

    #[must_use]
    pub fn lamps(&self) -> &[u8] {
        &self.lamps
    }
}
