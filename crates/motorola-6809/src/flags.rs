//! MC6809 condition code register bits.

/// Entire flag (bit 7) - set when the full register set was stacked.
///
/// RTI uses this to decide between a full restore (IRQ/NMI/SWI frames)
/// and a fast PC+CC restore (FIRQ frames).
pub const EF: u8 = 0b1000_0000;

/// FIRQ mask (bit 6) - fast interrupt requests are ignored while set.
pub const FF: u8 = 0b0100_0000;

/// Half-carry flag (bit 5) - carry from bit 3 to bit 4 in 8-bit adds.
pub const HF: u8 = 0b0010_0000;

/// IRQ mask (bit 4) - interrupt requests are ignored while set.
pub const IF: u8 = 0b0001_0000;

/// Negative flag (bit 3) - set if result bit 7 (or 15) is set.
pub const NF: u8 = 0b0000_1000;

/// Zero flag (bit 2) - set if result is zero.
pub const ZF: u8 = 0b0000_0100;

/// Overflow flag (bit 1) - set on signed overflow.
pub const VF: u8 = 0b0000_0010;

/// Carry flag (bit 0) - carry out of bit 7, or borrow.
pub const CF: u8 = 0b0000_0001;

/// Build N and Z bits for an 8-bit result.
#[must_use]
pub const fn nz8(value: u8) -> u8 {
    let mut f = 0;
    if value == 0 {
        f |= ZF;
    }
    if value & 0x80 != 0 {
        f |= NF;
    }
    f
}

/// Build N and Z bits for a 16-bit result.
#[must_use]
pub const fn nz16(value: u16) -> u8 {
    let mut f = 0;
    if value == 0 {
        f |= ZF;
    }
    if value & 0x8000 != 0 {
        f |= NF;
    }
    f
}
