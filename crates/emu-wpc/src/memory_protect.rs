//! Battery-backed RAM write protection.
//!
//! The ASIC protects the top of the 8 KiB RAM (game adjustments and
//! audits) from stray writes. Writing 0xB4 to the lock register opens
//! the window; anything else closes it. The lock-size register selects
//! how much of the top is covered. Blocked writes are counted and
//! dropped.

use serde::{Deserialize, Serialize};

/// Magic value that disables write protection.
pub const PROTECTION_DISARM: u8 = 0xB4;

pub const RAM_SIZE: usize = 0x2000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryProtect {
    lock: u8,
    lock_size: u8,
    pub blocked_writes: u64,
}

impl MemoryProtect {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_lock(&mut self, value: u8) {
        self.lock = value;
    }

    pub fn write_lock_size(&mut self, value: u8) {
        self.lock_size = value;
    }

    #[must_use]
    pub fn locked(&self) -> bool {
        self.lock != PROTECTION_DISARM
    }

    /// Bytes protected at the top of RAM for the current lock size.
    #[must_use]
    pub fn protected_bytes(&self) -> usize {
        match self.lock_size & 0x0F {
            0x0F => 0x1000,
            0x07 => 0x800,
            0x03 => 0x400,
            0x01 => 0x200,
            _ => 0x100,
        }
    }

    /// Whether a write to the given RAM offset may proceed. Counts the
    /// write when it is blocked.
    pub fn write_allowed(&mut self, offset: u16) -> bool {
        if !self.locked() {
            return true;
        }
        let boundary = RAM_SIZE - self.protected_bytes();
        if usize::from(offset) >= boundary {
            self.blocked_writes += 1;
            false
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlocked_allows_everything() {
        let mut protect = MemoryProtect::new();
        protect.write_lock(PROTECTION_DISARM);
        assert!(protect.write_allowed(0x1FFF));
        assert_eq!(protect.blocked_writes, 0);
    }

    #[test]
    fn locked_blocks_top_of_ram() {
        let mut protect = MemoryProtect::new();
        protect.write_lock(0x00);
        protect.write_lock_size(0x0F);
        assert!(!protect.write_allowed(0x1FFF));
        assert!(!protect.write_allowed(0x1000));
        assert!(protect.write_allowed(0x0FFF));
        assert_eq!(protect.blocked_writes, 2);
    }

    #[test]
    fn lock_size_selects_window() {
        let mut protect = MemoryProtect::new();
        protect.write_lock(0x00);
        protect.write_lock_size(0x01);
        assert!(protect.write_allowed(0x1DFF));
        assert!(!protect.write_allowed(0x1E00));
        protect.write_lock_size(0x00);
        assert!(protect.write_allowed(0x1EFF));
        assert!(!protect.write_allowed(0x1F00));
    }

    #[test]
    fn relocking_after_disarm() {
        let mut protect = MemoryProtect::new();
        protect.write_lock(PROTECTION_DISARM);
        assert!(!protect.locked());
        protect.write_lock(0xFF);
        assert!(protect.locked());
    }
}
