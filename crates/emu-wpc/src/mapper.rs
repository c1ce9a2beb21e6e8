//! Address decoding for both boards, plus bank-select arithmetic.
//!
//! The decoders are pure functions from a CPU address to a region and an
//! offset within that region; the boards own the backing storage. For
//! the hardware region the offset is the absolute address, so register
//! constants can be matched directly.

use std::fmt;

/// What a CPU address resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Ram,
    Rom,
    BankSwitched,
    Hardware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub region: Region,
    pub offset: u16,
}

/// Bank-select failure on the sound board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BankError {
    /// Sound bank value selected no chip (none of the chip-select bits
    /// were active). Treated as fatal: the program has lost its way.
    InvalidEncoding(u8),
}

impl fmt::Display for BankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEncoding(value) => {
                write!(f, "invalid sound bank encoding: {value:#04x}")
            }
        }
    }
}

impl std::error::Error for BankError {}

/// CPU board map: 8 KiB RAM, hardware window, 16 KiB bank window,
/// 32 KiB fixed ROM.
#[must_use]
pub fn decode_cpu_board(addr: u16) -> Decoded {
    match addr {
        0x0000..=0x1FFF => Decoded {
            region: Region::Ram,
            offset: addr,
        },
        0x2000..=0x3FFF => Decoded {
            region: Region::Hardware,
            offset: addr,
        },
        0x4000..=0x7FFF => Decoded {
            region: Region::BankSwitched,
            offset: addr - 0x4000,
        },
        0x8000..=0xFFFF => Decoded {
            region: Region::Rom,
            offset: addr - 0x8000,
        },
    }
}

/// Sound board map: 8 KiB RAM, hardware window, 32 KiB bank window,
/// 16 KiB fixed ROM (tail of U18).
#[must_use]
pub fn decode_sound_board(addr: u16) -> Decoded {
    match addr {
        0x0000..=0x1FFF => Decoded {
            region: Region::Ram,
            offset: addr,
        },
        0x2000..=0x3FFF => Decoded {
            region: Region::Hardware,
            offset: addr,
        },
        0x4000..=0xBFFF => Decoded {
            region: Region::BankSwitched,
            offset: addr - 0x4000,
        },
        0xC000..=0xFFFF => Decoded {
            region: Region::Rom,
            offset: addr - 0xC000,
        },
    }
}

/// Byte offset into the game ROM for a bank-select write. Out-of-range
/// bank numbers wrap to the installed ROM size.
#[must_use]
pub fn cpu_bank_offset(value: u8, bank_count: u8) -> usize {
    let bank = value & bank_count.wrapping_sub(1);
    usize::from(bank) * crate::rom::GAME_BANK_SIZE
}

/// Byte offset into the concatenated sound image for a sound bank-select
/// write.
///
/// The register packs a chip select in the inverted top bits and a
/// 32 KiB bank number in the low nibble: bit 7 low selects U18, bit 6
/// low U15, bit 5 low U14. All three high means no chip is enabled.
pub fn sound_bank_offset(value: u8) -> Result<usize, BankError> {
    let base = value & 0x0F;
    let chip = (!value) & 0xE0;
    let slot = if chip & 0x80 != 0 {
        0x00
    } else if chip & 0x40 != 0 {
        0x10
    } else if chip & 0x20 != 0 {
        0x20
    } else {
        return Err(BankError::InvalidEncoding(value));
    };
    Ok(usize::from(base | slot) << 15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_board_regions() {
        assert_eq!(decode_cpu_board(0x0000).region, Region::Ram);
        assert_eq!(decode_cpu_board(0x1FFF).region, Region::Ram);
        assert_eq!(decode_cpu_board(0x2000).region, Region::Hardware);
        assert_eq!(decode_cpu_board(0x3FFF).offset, 0x3FFF);
        assert_eq!(
            decode_cpu_board(0x4001),
            Decoded {
                region: Region::BankSwitched,
                offset: 0x0001
            }
        );
        assert_eq!(
            decode_cpu_board(0x8000),
            Decoded {
                region: Region::Rom,
                offset: 0x0000
            }
        );
        assert_eq!(decode_cpu_board(0xFFFF).offset, 0x7FFF);
    }

    #[test]
    fn sound_board_regions() {
        assert_eq!(decode_sound_board(0x1234).region, Region::Ram);
        assert_eq!(decode_sound_board(0x2400).region, Region::Hardware);
        assert_eq!(
            decode_sound_board(0xBFFF),
            Decoded {
                region: Region::BankSwitched,
                offset: 0x7FFF
            }
        );
        assert_eq!(
            decode_sound_board(0xC000),
            Decoded {
                region: Region::Rom,
                offset: 0x0000
            }
        );
    }

    #[test]
    fn cpu_bank_wraps_to_installed_size() {
        // 8 banks installed: bank 9 aliases bank 1
        assert_eq!(cpu_bank_offset(9, 8), 0x4000);
        assert_eq!(cpu_bank_offset(7, 8), 7 * 0x4000);
        assert_eq!(cpu_bank_offset(0, 8), 0);
    }

    #[test]
    fn sound_bank_chip_selects() {
        // bit 7 low: U18 slot
        assert_eq!(sound_bank_offset(0x7D).unwrap(), 0x0D << 15);
        // bit 6 low: U15 slot
        assert_eq!(sound_bank_offset(0xBD).unwrap(), 0x1D << 15);
        // bit 5 low: U14 slot
        assert_eq!(sound_bank_offset(0xDD).unwrap(), 0x2D << 15);
        // U18 wins when several chip selects are active
        assert_eq!(sound_bank_offset(0x00).unwrap(), 0);
    }

    #[test]
    fn sound_bank_no_chip_is_fatal() {
        assert_eq!(
            sound_bank_offset(0xE3),
            Err(BankError::InvalidEncoding(0xE3))
        );
        assert_eq!(
            sound_bank_offset(0xFF),
            Err(BankError::InvalidEncoding(0xFF))
        );
    }
}
