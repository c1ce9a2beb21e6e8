//! ALU operations for the MC6809.
//!
//! Pure functions: each takes its operands plus the current condition
//! codes and returns the result together with the updated condition
//! codes. Bits an operation does not affect pass through unchanged,
//! which is how the 6809 differs from recomputing the whole register.

use crate::flags::{CF, HF, NF, VF, ZF, nz8, nz16};

/// Result of an 8-bit ALU operation with updated condition codes.
#[derive(Debug, Clone, Copy)]
pub struct AluResult {
    pub value: u8,
    pub cc: u8,
}

/// Result of a 16-bit ALU operation with updated condition codes.
#[derive(Debug, Clone, Copy)]
pub struct AluResult16 {
    pub value: u16,
    pub cc: u8,
}

/// Add two bytes with optional carry-in. Updates H, N, Z, V, C.
#[must_use]
pub fn add8(a: u8, m: u8, carry: bool, cc: u8) -> AluResult {
    let c = u8::from(carry);
    let sum = u16::from(a) + u16::from(m) + u16::from(c);
    let value = sum as u8;

    let mut cc = (cc & !(HF | NF | ZF | VF | CF)) | nz8(value);
    if (a & 0x0F) + (m & 0x0F) + c > 0x0F {
        cc |= HF;
    }
    if (a ^ m) & 0x80 == 0 && (a ^ value) & 0x80 != 0 {
        cc |= VF;
    }
    if sum > 0xFF {
        cc |= CF;
    }

    AluResult { value, cc }
}

/// Subtract with optional borrow-in. Updates N, Z, V, C; H is left
/// alone (architecturally undefined after subtracts).
#[must_use]
pub fn sub8(a: u8, m: u8, borrow: bool, cc: u8) -> AluResult {
    let c = u8::from(borrow);
    let value = a.wrapping_sub(m).wrapping_sub(c);

    let mut cc = (cc & !(NF | ZF | VF | CF)) | nz8(value);
    if (a ^ m) & 0x80 != 0 && (a ^ value) & 0x80 != 0 {
        cc |= VF;
    }
    if u16::from(a) < u16::from(m) + u16::from(c) {
        cc |= CF;
    }

    AluResult { value, cc }
}

/// 16-bit add (ADDD). Updates N, Z, V, C.
#[must_use]
pub fn add16(a: u16, m: u16, cc: u8) -> AluResult16 {
    let sum = u32::from(a) + u32::from(m);
    let value = sum as u16;

    let mut cc = (cc & !(NF | ZF | VF | CF)) | nz16(value);
    if (a ^ m) & 0x8000 == 0 && (a ^ value) & 0x8000 != 0 {
        cc |= VF;
    }
    if sum > 0xFFFF {
        cc |= CF;
    }

    AluResult16 { value, cc }
}

/// 16-bit subtract (SUBD and the CMP16 family). Updates N, Z, V, C.
#[must_use]
pub fn sub16(a: u16, m: u16, cc: u8) -> AluResult16 {
    let value = a.wrapping_sub(m);

    let mut cc = (cc & !(NF | ZF | VF | CF)) | nz16(value);
    if (a ^ m) & 0x8000 != 0 && (a ^ value) & 0x8000 != 0 {
        cc |= VF;
    }
    if a < m {
        cc |= CF;
    }

    AluResult16 { value, cc }
}

/// Bitwise AND (also BIT when the value is discarded). Updates N, Z; clears V.
#[must_use]
pub fn and8(a: u8, m: u8, cc: u8) -> AluResult {
    let value = a & m;
    AluResult {
        value,
        cc: (cc & !(NF | ZF | VF)) | nz8(value),
    }
}

/// Bitwise OR. Updates N, Z; clears V.
#[must_use]
pub fn or8(a: u8, m: u8, cc: u8) -> AluResult {
    let value = a | m;
    AluResult {
        value,
        cc: (cc & !(NF | ZF | VF)) | nz8(value),
    }
}

/// Bitwise exclusive OR. Updates N, Z; clears V.
#[must_use]
pub fn eor8(a: u8, m: u8, cc: u8) -> AluResult {
    let value = a ^ m;
    AluResult {
        value,
        cc: (cc & !(NF | ZF | VF)) | nz8(value),
    }
}

/// Condition codes after an 8-bit load, store or TST. Updates N, Z; clears V.
#[must_use]
pub const fn test8(value: u8, cc: u8) -> u8 {
    (cc & !(NF | ZF | VF)) | nz8(value)
}

/// Condition codes after a 16-bit load or store. Updates N, Z; clears V.
#[must_use]
pub const fn test16(value: u16, cc: u8) -> u8 {
    (cc & !(NF | ZF | VF)) | nz16(value)
}

/// Arithmetic/logical shift left. V = N xor C after the shift.
#[must_use]
pub fn asl8(a: u8, cc: u8) -> AluResult {
    let carry = a & 0x80 != 0;
    let value = a << 1;
    AluResult {
        value,
        cc: shift_left_cc(value, carry, cc),
    }
}

/// Rotate left through carry. V = N xor C after the rotate.
#[must_use]
pub fn rol8(a: u8, cc: u8) -> AluResult {
    let carry = a & 0x80 != 0;
    let value = (a << 1) | u8::from(cc & CF != 0);
    AluResult {
        value,
        cc: shift_left_cc(value, carry, cc),
    }
}

/// Arithmetic shift right, sign preserved. V is not affected.
#[must_use]
pub fn asr8(a: u8, cc: u8) -> AluResult {
    let carry = a & 0x01 != 0;
    let value = (a >> 1) | (a & 0x80);
    AluResult {
        value,
        cc: shift_right_cc(value, carry, cc),
    }
}

/// Logical shift right, zero fill. V is not affected.
#[must_use]
pub fn lsr8(a: u8, cc: u8) -> AluResult {
    let carry = a & 0x01 != 0;
    let value = a >> 1;
    AluResult {
        value,
        cc: shift_right_cc(value, carry, cc),
    }
}

/// Rotate right through carry. V is not affected.
#[must_use]
pub fn ror8(a: u8, cc: u8) -> AluResult {
    let carry = a & 0x01 != 0;
    let value = (a >> 1) | (u8::from(cc & CF != 0) << 7);
    AluResult {
        value,
        cc: shift_right_cc(value, carry, cc),
    }
}

fn shift_left_cc(value: u8, carry: bool, cc: u8) -> u8 {
    let mut cc = (cc & !(NF | ZF | VF | CF)) | nz8(value);
    if carry {
        cc |= CF;
    }
    // V mirrors a sign change through the shift
    if (value & 0x80 != 0) != carry {
        cc |= VF;
    }
    cc
}

fn shift_right_cc(value: u8, carry: bool, cc: u8) -> u8 {
    let mut cc = (cc & !(NF | ZF | CF)) | nz8(value);
    if carry {
        cc |= CF;
    }
    cc
}

/// Increment. V set when incrementing 0x7F; C is not affected.
#[must_use]
pub fn inc8(a: u8, cc: u8) -> AluResult {
    let value = a.wrapping_add(1);
    let mut cc = (cc & !(NF | ZF | VF)) | nz8(value);
    if a == 0x7F {
        cc |= VF;
    }
    AluResult { value, cc }
}

/// Decrement. V set when decrementing 0x80; C is not affected.
#[must_use]
pub fn dec8(a: u8, cc: u8) -> AluResult {
    let value = a.wrapping_sub(1);
    let mut cc = (cc & !(NF | ZF | VF)) | nz8(value);
    if a == 0x80 {
        cc |= VF;
    }
    AluResult { value, cc }
}

/// Two's complement negate. V set for 0x80, C set for any non-zero operand.
#[must_use]
pub fn neg8(a: u8, cc: u8) -> AluResult {
    let value = 0u8.wrapping_sub(a);
    let mut cc = (cc & !(NF | ZF | VF | CF)) | nz8(value);
    if a == 0x80 {
        cc |= VF;
    }
    if a != 0 {
        cc |= CF;
    }
    AluResult { value, cc }
}

/// One's complement. Clears V, sets C.
#[must_use]
pub fn com8(a: u8, cc: u8) -> AluResult {
    let value = !a;
    AluResult {
        value,
        cc: (cc & !(NF | ZF | VF)) | nz8(value) | CF,
    }
}

/// Clear. Fixed flags: N=0, Z=1, V=0, C=0.
#[must_use]
pub const fn clr8(cc: u8) -> AluResult {
    AluResult {
        value: 0,
        cc: (cc & !(NF | VF | CF)) | ZF,
    }
}

/// Decimal adjust A after BCD addition. Updates N, Z, C (sticky); clears V.
#[must_use]
pub fn daa(a: u8, cc: u8) -> AluResult {
    let mut correction = 0u8;
    let mut carry = cc & CF != 0;

    if a & 0x0F > 0x09 || cc & HF != 0 {
        correction |= 0x06;
    }
    if a & 0xF0 > 0x90 || carry || (a & 0xF0 > 0x80 && a & 0x0F > 0x09) {
        correction |= 0x60;
        carry = true;
    }

    let value = a.wrapping_add(correction);
    let mut cc = (cc & !(NF | ZF | VF | CF)) | nz8(value);
    if carry {
        cc |= CF;
    }
    AluResult { value, cc }
}

/// Unsigned 8x8 multiply into D. Z from the 16-bit product, C from bit 7
/// of the low byte (rounding aid for MSB-only products).
#[must_use]
pub fn mul(a: u8, b: u8, cc: u8) -> AluResult16 {
    let value = u16::from(a) * u16::from(b);
    let mut cc = cc & !(ZF | CF);
    if value == 0 {
        cc |= ZF;
    }
    if value & 0x0080 != 0 {
        cc |= CF;
    }
    AluResult16 { value, cc }
}
