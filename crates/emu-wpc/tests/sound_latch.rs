//! Main-to-sound command traffic through the latch pair.

mod common;

use common::{RTI, game_rom, machine, sound_rom};

/// Sound IRQ handler: read the command, reply with command + 1.
const SOUND_ECHO_IRQ: &[u8] = &[
    0xB6, 0x34, 0x00, // LDA $3400   read command latch
    0x8B, 0x01, // ADDA #$01
    0xB7, 0x3C, 0x00, // STA $3C00   reply to the main board
    0x3B, // RTI
];

/// Main FIRQ handler: store the reply latch.
const MAIN_REPLY_FIRQ: &[u8] = &[
    0xB6, 0x3F, 0xDC, // LDA $3FDC   read reply latch
    0xB7, 0x03, 0x00, // STA $0300
    0xB7, 0x3F, 0xF8, // STA $3FF8   acknowledge
    0x3B, // RTI
];

#[test]
fn command_roundtrip_with_reply() {
    let main = [
        0x1C, 0xBF, // ANDCC #$BF   unmask FIRQ
        0x86, 0x37, // LDA #$37
        0xB7, 0x3F, 0xDC, // STA $3FDC   send command
        0x20, 0xFE, // BRA *
    ];
    let sound = [
        0x1C, 0xEF, // ANDCC #$EF   unmask IRQ
        0x20, 0xFE, // BRA *
    ];
    let mut m = machine(
        game_rom(&main, RTI, MAIN_REPLY_FIRQ),
        sound_rom(&sound, SOUND_ECHO_IRQ, RTI),
    );

    m.execute_cycles(5_000, 32).unwrap();

    let ui = m.get_ui_state();
    assert_eq!(ui.ram[0x300], 0x38);
    assert_eq!(ui.sound.command_latch, 0x37);
    assert!(ui.sound.command_pending);
    assert_eq!(ui.sound.cpu.irq_count, 1);
    assert!(ui.cpu.firq_count >= 1);
}

#[test]
fn second_command_replaces_the_first() {
    let main = [
        0x1C, 0xBF, // ANDCC #$BF
        0x86, 0x37, // LDA #$37
        0xB7, 0x3F, 0xDC, // STA $3FDC
        0x8E, 0x01, 0x00, // LDX #$0100  delay so the first is handled
        0x30, 0x1F, // LEAX -1,X
        0x26, 0xFC, // BNE *-2
        0x86, 0x40, // LDA #$40
        0xB7, 0x3F, 0xDC, // STA $3FDC
        0x20, 0xFE, // BRA *
    ];
    let sound = [
        0x1C, 0xEF, // ANDCC #$EF
        0x20, 0xFE, // BRA *
    ];
    let mut m = machine(
        game_rom(&main, RTI, MAIN_REPLY_FIRQ),
        sound_rom(&sound, SOUND_ECHO_IRQ, RTI),
    );

    m.execute_cycles(8_000, 32).unwrap();

    let ui = m.get_ui_state();
    assert_eq!(ui.ram[0x300], 0x41);
    assert_eq!(ui.sound.command_latch, 0x40);
    assert_eq!(ui.sound.cpu.irq_count, 2);
}

#[test]
fn latch_read_unmasks_the_sound_irq() {
    // the sound program never executes ANDCC: reading the latch at boot
    // is what re-enables IRQ
    let sound = [
        0xB6, 0x34, 0x00, // LDA $3400   stale read, returns $00
        0x20, 0xFE, // BRA *
    ];
    let main = [
        0x1C, 0xBF, // ANDCC #$BF
        0x86, 0x55, // LDA #$55
        0xB7, 0x3F, 0xDC, // STA $3FDC
        0x20, 0xFE, // BRA *
    ];
    let mut m = machine(
        game_rom(&main, RTI, MAIN_REPLY_FIRQ),
        sound_rom(&sound, SOUND_ECHO_IRQ, RTI),
    );

    // before any command the latch is idle
    assert!(!m.get_ui_state().sound.command_pending);

    m.execute_cycles(5_000, 32).unwrap();

    let ui = m.get_ui_state();
    assert_eq!(ui.ram[0x300], 0x56);
    assert!(ui.sound.command_pending);
    assert_eq!(ui.sound.cpu.irq_count, 1);
}

#[test]
fn control_write_resets_the_sound_cpu() {
    // the sound program steps the volume up once per boot
    let sound = [
        0x86, 0x01, // LDA #$01
        0xB7, 0x38, 0x00, // STA $3800   volume step up
        0x20, 0xFE, // BRA *
    ];
    let main = [
        0x8E, 0x01, 0x00, // LDX #$0100  let the sound CPU boot first
        0x30, 0x1F, // LEAX -1,X
        0x26, 0xFC, // BNE *-2
        0xB7, 0x3F, 0xDD, // STA $3FDD   pull the sound reset line
        0x20, 0xFE, // BRA *
    ];
    let mut m = machine(game_rom(&main, RTI, RTI), sound_rom(&sound, RTI, RTI));

    m.execute_cycles(8_000, 32).unwrap();

    // booted twice: once at power-on, once from the control write
    assert_eq!(m.get_ui_state().sound.volume, 2);
}
