//! Synthetic ROM builders for the integration tests.
//!
//! Game ROM: 128 KiB, main program at $8000, IRQ handler at $9000,
//! FIRQ handler at $9100. Sound ROM: 128 KiB U18, main program at
//! $C000, IRQ handler at $C100, FIRQ handler at $C180. Unused bytes
//! are NOP ($12).

#![allow(dead_code)]

use emu_wpc::{GameConfig, RomSet, WpcEmu};

pub const GAME_ROM_SIZE: usize = 128 * 1024;
const FIXED_BASE: usize = GAME_ROM_SIZE - 0x8000;

/// RTI, for handlers a test does not care about.
pub const RTI: &[u8] = &[0x3B];

pub fn game_rom(main: &[u8], irq: &[u8], firq: &[u8]) -> Vec<u8> {
    let mut rom = vec![0x12; GAME_ROM_SIZE];
    rom[FIXED_BASE..FIXED_BASE + main.len()].copy_from_slice(main);
    rom[FIXED_BASE + 0x1000..FIXED_BASE + 0x1000 + irq.len()].copy_from_slice(irq);
    rom[FIXED_BASE + 0x1100..FIXED_BASE + 0x1100 + firq.len()].copy_from_slice(firq);
    // FIRQ $FFF6, IRQ $FFF8, RESET $FFFE
    rom[FIXED_BASE + 0x7FF6] = 0x91;
    rom[FIXED_BASE + 0x7FF7] = 0x00;
    rom[FIXED_BASE + 0x7FF8] = 0x90;
    rom[FIXED_BASE + 0x7FF9] = 0x00;
    rom[FIXED_BASE + 0x7FFE] = 0x80;
    rom[FIXED_BASE + 0x7FFF] = 0x00;
    rom
}

pub fn sound_rom(main: &[u8], irq: &[u8], firq: &[u8]) -> Vec<u8> {
    let mut rom = vec![0x12; 128 * 1024];
    let system = rom.len() - 0x4000; // maps to $C000
    rom[system..system + main.len()].copy_from_slice(main);
    rom[system + 0x100..system + 0x100 + irq.len()].copy_from_slice(irq);
    rom[system + 0x180..system + 0x180 + firq.len()].copy_from_slice(firq);
    rom[system + 0x3FF6] = 0xC1;
    rom[system + 0x3FF7] = 0x80;
    rom[system + 0x3FF8] = 0xC1;
    rom[system + 0x3FF9] = 0x00;
    rom[system + 0x3FFE] = 0xC0;
    rom[system + 0x3FFF] = 0x00;
    rom
}

pub fn machine(game: Vec<u8>, u18: Vec<u8>) -> WpcEmu {
    let roms = RomSet {
        u06: game,
        u18,
        ..RomSet::default()
    };
    let config = GameConfig {
        name: "test".into(),
        ..GameConfig::default()
    };
    WpcEmu::initialise(roms, config).unwrap()
}
