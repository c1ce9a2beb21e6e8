//! MC6809 register set.

/// MC6809 registers snapshot for observation.
///
/// | Register | Size | Purpose                                    |
/// |----------|------|--------------------------------------------|
/// | A, B     | 8    | Accumulators; pair up as D (A high, B low) |
/// | X, Y     | 16   | Index registers                            |
/// | U        | 16   | User stack pointer                         |
/// | S        | 16   | Hardware stack pointer (interrupt frames)  |
/// | PC       | 16   | Program counter                            |
/// | DP       | 8    | Direct page (high byte of direct-mode EAs) |
/// | CC       | 8    | Condition codes E F H I N Z V C            |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Registers {
    pub a: u8,
    pub b: u8,
    pub dp: u8,
    pub cc: u8,
    pub x: u16,
    pub y: u16,
    pub u: u16,
    pub s: u16,
    pub pc: u16,
}

impl Registers {
    /// Get the D accumulator (A:B, big-endian pair).
    #[must_use]
    pub const fn d(&self) -> u16 {
        (self.a as u16) << 8 | self.b as u16
    }

    /// Set the D accumulator.
    pub const fn set_d(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.b = value as u8;
    }

    /// True if every bit of `mask` is set in CC.
    #[must_use]
    pub const fn flag(&self, mask: u8) -> bool {
        self.cc & mask == mask
    }

    /// Set or clear the CC bits in `mask`.
    pub const fn set_flag(&mut self, mask: u8, value: bool) {
        if value {
            self.cc |= mask;
        } else {
            self.cc &= !mask;
        }
    }
}
