//! ROM image validation and layout.
//!
//! A WPC game ships a single game ROM (U6 on the CPU board) and up to
//! three sound ROMs (U18, U15, U14 on the sound board). The game ROM is
//! banked into the CPU address space 16 KiB at a time; the sound ROMs
//! are concatenated into one banked image with a fixed 512 KiB slot per
//! chip.

use std::fmt;

/// Game ROM bank window size (0x4000, mapped at 0x4000-0x7FFF).
pub const GAME_BANK_SIZE: usize = 0x4000;

/// Size of the fixed game ROM region at 0x8000-0xFFFF.
pub const GAME_FIXED_SIZE: usize = 0x8000;

/// Sound ROM bank window size (0x8000, mapped at 0x4000-0xBFFF).
pub const SOUND_BANK_SIZE: usize = 0x8000;

/// Per-chip slot size in the concatenated sound image.
pub const SOUND_SLOT_SIZE: usize = 0x80000;

/// Total size of the concatenated sound image (U18 + U15 + U14 slots).
pub const SOUND_BANKED_SIZE: usize = 3 * SOUND_SLOT_SIZE;

/// Size of the fixed sound ROM region at 0xC000-0xFFFF, taken from the
/// tail of U18.
pub const SOUND_SYSTEM_SIZE: usize = 0x4000;

const KIB: usize = 1024;

/// Raw ROM images as loaded from disk. U18 is mandatory (it holds the
/// sound CPU vectors); U15 and U14 are optional.
#[derive(Debug, Clone, Default)]
pub struct RomSet {
    pub u06: Vec<u8>,
    pub u18: Vec<u8>,
    pub u15: Option<Vec<u8>>,
    pub u14: Option<Vec<u8>>,
}

/// ROM validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RomLoadError {
    /// Game ROM is not 128, 256, 512 or 1024 KiB.
    GameRomSize(usize),
    /// A sound ROM is empty, not a power of two, or larger than its
    /// 512 KiB slot.
    SoundRomSize { chip: &'static str, size: usize },
}

impl fmt::Display for RomLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GameRomSize(size) => {
                write!(f, "invalid game ROM size: {size} bytes")
            }
            Self::SoundRomSize { chip, size } => {
                write!(f, "invalid sound ROM size for {chip}: {size} bytes")
            }
        }
    }
}

impl std::error::Error for RomLoadError {}

/// Validated ROM images arranged the way the address decoders see them.
#[derive(Debug, Clone)]
pub struct LoadedRoms {
    /// Full game ROM, bank-addressable in 16 KiB units.
    pub game: Vec<u8>,
    /// Number of 16 KiB banks in the game ROM (power of two).
    pub bank_count: u8,
    /// Last 16 KiB of U18, fixed at 0xC000-0xFFFF on the sound board.
    pub sound_system: Vec<u8>,
    /// Concatenated sound image: U18 at 0x00000, U15 at 0x80000, U14 at
    /// 0x100000, each mirrored to fill its slot.
    pub sound_banked: Vec<u8>,
}

/// Validate a ROM set and build the loaded layout.
pub fn load(set: RomSet) -> Result<LoadedRoms, RomLoadError> {
    let game_size = set.u06.len();
    if !matches!(game_size / KIB, 128 | 256 | 512 | 1024) || game_size % KIB != 0 {
        return Err(RomLoadError::GameRomSize(game_size));
    }
    // largest game ROM is 64 banks
    let bank_count = (game_size / GAME_BANK_SIZE) as u8;

    validate_sound_rom("u18", &set.u18)?;
    if let Some(u15) = &set.u15 {
        validate_sound_rom("u15", u15)?;
    }
    if let Some(u14) = &set.u14 {
        validate_sound_rom("u14", u14)?;
    }

    let sound_system = set.u18[set.u18.len() - SOUND_SYSTEM_SIZE..].to_vec();

    let mut sound_banked = vec![0xFF; SOUND_BANKED_SIZE];
    mirror_into(&mut sound_banked[..SOUND_SLOT_SIZE], &set.u18);
    if let Some(u15) = &set.u15 {
        mirror_into(&mut sound_banked[SOUND_SLOT_SIZE..2 * SOUND_SLOT_SIZE], u15);
    }
    if let Some(u14) = &set.u14 {
        mirror_into(&mut sound_banked[2 * SOUND_SLOT_SIZE..], u14);
    }

    Ok(LoadedRoms {
        game: set.u06,
        bank_count,
        sound_system,
        sound_banked,
    })
}

fn validate_sound_rom(chip: &'static str, image: &[u8]) -> Result<(), RomLoadError> {
    let size = image.len();
    if size < SOUND_SYSTEM_SIZE || size > SOUND_SLOT_SIZE || !size.is_power_of_two() {
        return Err(RomLoadError::SoundRomSize { chip, size });
    }
    Ok(())
}

/// Repeat a chip image to fill its slot, so reads of any bank number
/// within the slot land on real data (undersized chips alias).
fn mirror_into(slot: &mut [u8], image: &[u8]) {
    for chunk in slot.chunks_mut(image.len()) {
        chunk.copy_from_slice(&image[..chunk.len()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(len: usize, value: u8) -> Vec<u8> {
        vec![value; len]
    }

    #[test]
    fn accepts_standard_sizes() {
        for kib in [128, 256, 512, 1024] {
            let set = RomSet {
                u06: filled(kib * KIB, 0x11),
                u18: filled(128 * KIB, 0x22),
                ..RomSet::default()
            };
            let loaded = load(set).unwrap();
            assert_eq!(usize::from(loaded.bank_count), kib * KIB / GAME_BANK_SIZE);
        }
    }

    #[test]
    fn rejects_odd_game_rom() {
        let set = RomSet {
            u06: filled(96 * KIB, 0),
            u18: filled(128 * KIB, 0),
            ..RomSet::default()
        };
        assert_eq!(load(set).unwrap_err(), RomLoadError::GameRomSize(96 * KIB));
    }

    #[test]
    fn rejects_oversized_sound_rom() {
        let set = RomSet {
            u06: filled(128 * KIB, 0),
            u18: filled(1024 * KIB, 0),
            ..RomSet::default()
        };
        assert!(matches!(
            load(set),
            Err(RomLoadError::SoundRomSize { chip: "u18", .. })
        ));
    }

    #[test]
    fn sound_system_is_tail_of_u18() {
        let mut u18 = filled(128 * KIB, 0x00);
        let tail = u18.len() - SOUND_SYSTEM_SIZE;
        u18[tail] = 0xAB;
        let set = RomSet {
            u06: filled(128 * KIB, 0),
            u18,
            ..RomSet::default()
        };
        let loaded = load(set).unwrap();
        assert_eq!(loaded.sound_system.len(), SOUND_SYSTEM_SIZE);
        assert_eq!(loaded.sound_system[0], 0xAB);
    }

    #[test]
    fn undersized_chips_mirror_within_slot() {
        let set = RomSet {
            u06: filled(128 * KIB, 0),
            u18: filled(128 * KIB, 0x18),
            u15: Some(filled(256 * KIB, 0x15)),
            ..RomSet::default()
        };
        let loaded = load(set).unwrap();
        // U18 repeats every 128 KiB within its slot
        assert_eq!(loaded.sound_banked[0], 0x18);
        assert_eq!(loaded.sound_banked[SOUND_SLOT_SIZE - 1], 0x18);
        assert_eq!(loaded.sound_banked[SOUND_SLOT_SIZE], 0x15);
        // missing U14 slot reads as open bus
        assert_eq!(loaded.sound_banked[2 * SOUND_SLOT_SIZE], 0xFF);
    }
}
