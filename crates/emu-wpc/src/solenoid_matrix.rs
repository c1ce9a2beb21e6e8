//! Solenoid drivers and general illumination triacs.
//!
//! Four banks of eight solenoid outputs at 0x3FE0-0x3FE3 (flashers,
//! low-power and high-power coils); five GI strings switched by triacs
//! at 0x3FE6. State is kept as 0x00/0xFF per output for direct UI use.

use serde::{Deserialize, Serialize};

pub const SOLENOID_COUNT: usize = 32;
pub const GI_STRING_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solenoids {
    outputs: [u8; SOLENOID_COUNT],
    gi: [u8; GI_STRING_COUNT],
}

impl Default for Solenoids {
    fn default() -> Self {
        Self::new()
    }
}

impl Solenoids {
    #[must_use]
    pub fn new() -> Self {
        Self {
            outputs: [0; SOLENOID_COUNT],
            gi: [0; GI_STRING_COUNT],
        }
    }

    /// Latch one bank of eight outputs (bank 0-3).
    pub fn write_bank(&mut self, bank: u8, value: u8) {
        let base = usize::from(bank & 0x03) * 8;
        for bit in 0..8 {
            self.outputs[base + bit] = if value & (1 << bit) != 0 { 0xFF } else { 0x00 };
        }
    }

    pub fn write_gi(&mut self, value: u8) {
        for (index, string) in self.gi.iter_mut().enumerate() {
            *string = if value & (1 << index) != 0 { 0xFF } else { 0x00 };
        }
    }

    #[must_use]
    pub fn outputs(&self) -> &[u8; SOLENOID_COUNT] {
        &self.outputs
    }

    #[must_use]
    pub fn gi(&self) -> &[u8; GI_STRING_COUNT] {
        &self.gi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banks_are_independent() {
        let mut sol = Solenoids::new();
        sol.write_bank(0, 0x01);
        sol.write_bank(2, 0x80);
        assert_eq!(sol.outputs()[0], 0xFF);
        assert_eq!(sol.outputs()[23], 0xFF);
        assert_eq!(sol.outputs()[8], 0x00);

        // rewriting a bank drops outputs no longer set
        sol.write_bank(0, 0x02);
        assert_eq!(sol.outputs()[0], 0x00);
        assert_eq!(sol.outputs()[1], 0xFF);
    }

    #[test]
    fn gi_strings_follow_low_bits() {
        let mut sol = Solenoids::new();
        sol.write_gi(0b0001_0101);
        assert_eq!(sol.gi(), &[0xFF, 0x00, 0xFF, 0x00, 0xFF]);
    }
}
