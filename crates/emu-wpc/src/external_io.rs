//! External I/O register block (0x3FC0-0x3FDF).
//!
//! Printer parallel port, serial port and ticket dispenser. None of
//! these peripherals are attached, so the block is a register file:
//! writes land in backing storage, reads return the last value written.
//! Accesses to offsets no peripheral claims are counted as diagnostics.
//!
//! The fliptronics port (0x3FD4) and the sound interface (0x3FDC,
//! 0x3FDD) live in this block too but are routed by the CPU board.

use serde::{Deserialize, Serialize};

pub const EXTERNAL_IO_BASE: u16 = 0x3FC0;
pub const EXTERNAL_IO_END: u16 = 0x3FDF;

pub const PARALLEL_STATUS_PORT: u16 = 0x3FC0;
pub const PARALLEL_DATA_PORT: u16 = 0x3FC1;
pub const PARALLEL_STROBE_PORT: u16 = 0x3FC2;
pub const SERIAL_DATA_OUTPUT: u16 = 0x3FC3;
pub const SERIAL_CONTROL_OUTPUT: u16 = 0x3FC4;
pub const SERIAL_BAUD_SELECT: u16 = 0x3FC5;
pub const TICKET_DISPENSE: u16 = 0x3FC6;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalIo {
    backing: [u8; 0x20],
    pub unhandled_reads: u64,
    pub unhandled_writes: u64,
}

impl ExternalIo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn claimed(addr: u16) -> bool {
        matches!(
            addr,
            PARALLEL_STATUS_PORT
                | PARALLEL_DATA_PORT
                | PARALLEL_STROBE_PORT
                | SERIAL_DATA_OUTPUT
                | SERIAL_CONTROL_OUTPUT
                | SERIAL_BAUD_SELECT
                | TICKET_DISPENSE
        )
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        debug_assert!((EXTERNAL_IO_BASE..=EXTERNAL_IO_END).contains(&addr));
        if !Self::claimed(addr) {
            self.unhandled_writes += 1;
        }
        self.backing[usize::from(addr - EXTERNAL_IO_BASE)] = value;
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        debug_assert!((EXTERNAL_IO_BASE..=EXTERNAL_IO_END).contains(&addr));
        if !Self::claimed(addr) {
            self.unhandled_reads += 1;
        }
        self.backing[usize::from(addr - EXTERNAL_IO_BASE)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_return_last_written() {
        let mut io = ExternalIo::new();
        io.write(PARALLEL_DATA_PORT, 0x42);
        assert_eq!(io.read(PARALLEL_DATA_PORT), 0x42);
        assert_eq!(io.unhandled_reads, 0);
        assert_eq!(io.unhandled_writes, 0);
    }

    #[test]
    fn unclaimed_offsets_are_counted() {
        let mut io = ExternalIo::new();
        io.write(0x3FC9, 0x99);
        assert_eq!(io.read(0x3FC9), 0x99);
        assert_eq!(io.unhandled_writes, 1);
        assert_eq!(io.unhandled_reads, 1);
    }
}
