//! Sound board: second MC6809, YM2151 FM chip, 8-bit DAC and the
//! command latch to the main board.
//!
//! The board runs at the same 2 MHz as the main CPU; the YM2151 runs
//! from its own 3.579545 MHz crystal and is advanced by a scaled cycle
//! count with a remainder carry so no cycles are lost. The main board
//! talks to it only through the command latch and the reset line; the
//! board replies through its own latch, which raises FIRQ on the main
//! CPU.

use emu_core::Bus;
use motorola_6809::Mc6809;
use serde::{Deserialize, Serialize};

use crate::config::CPU_CLOCK_HZ;
use crate::mapper::{self, BankError, Region};
use crate::wpc::StepError;
use yamaha_ym2151::Ym2151;

/// YM2151 crystal frequency.
pub const YM_CLOCK_HZ: u32 = 3_579_545;

const RAM_SIZE: usize = 0x2000;

// hardware window, decoded in 1 KiB blocks
const REG_ROM_BANK: u16 = 0x2000;
const REG_YM2151: u16 = 0x2400;
const REG_DAC: u16 = 0x2800;
const REG_HC55516_CLOCK: u16 = 0x2C00;
const REG_HC55516_DIGIT: u16 = 0x3000;
const REG_LATCH: u16 = 0x3400;
const REG_VOLUME: u16 = 0x3800;
const REG_REPLY: u16 = 0x3C00;

/// Sound board bus: RAM, fixed and banked ROM, YM2151 and the latches.
#[derive(Serialize, Deserialize)]
pub struct SoundBus {
    ram: Vec<u8>,
    /// Last 16 KiB of U18, fixed at 0xC000 (holds the vectors).
    system_rom: Vec<u8>,
    /// Concatenated U18/U15/U14 image behind the bank window.
    banked_rom: Vec<u8>,
    bank_offset: usize,

    pub ym: Ym2151,

    /// Command latch from the main board. Reads do not clear
    /// `latch_ready`; a stale read returns the previous byte.
    latch: u8,
    latch_ready: bool,
    /// Master volume, driven by the up/down stepper at 0x3800.
    pub volume: u8,

    /// DAC samples produced this slice, drained by the board.
    dac_pending: Vec<f32>,
    /// Reply byte for the main board (raises main FIRQ).
    reply: Option<u8>,
    /// Reading the latch re-enables IRQ; applied between instructions.
    unmask_irq: bool,
    bank_fault: Option<BankError>,

    pub hc55516_writes: u64,
    pub unhandled_reads: u64,
    pub unhandled_writes: u64,
}

impl SoundBus {
    #[must_use]
    pub fn new(system_rom: Vec<u8>, banked_rom: Vec<u8>, sample_rate: u32) -> Self {
        Self {
            ram: vec![0; RAM_SIZE],
            system_rom,
            banked_rom,
            bank_offset: 0,
            ym: Ym2151::new(YM_CLOCK_HZ, sample_rate),
            latch: 0,
            latch_ready: false,
            volume: 0,
            dac_pending: Vec::new(),
            reply: None,
            unmask_irq: false,
            bank_fault: None,
            hc55516_writes: 0,
            unhandled_reads: 0,
            unhandled_writes: 0,
        }
    }

    #[must_use]
    pub fn latch(&self) -> u8 {
        self.latch
    }

    #[must_use]
    pub fn latch_ready(&self) -> bool {
        self.latch_ready
    }

    pub fn set_latch(&mut self, value: u8) {
        self.latch = value;
        self.latch_ready = true;
    }

    pub fn take_unmask_irq(&mut self) -> bool {
        std::mem::take(&mut self.unmask_irq)
    }

    pub fn take_bank_fault(&mut self) -> Option<BankError> {
        self.bank_fault.take()
    }

    pub fn take_reply(&mut self) -> Option<u8> {
        self.reply.take()
    }

    fn read_hardware(&mut self, addr: u16) -> u8 {
        match addr & 0xFC00 {
            REG_YM2151 => {
                if addr & 1 == 0 {
                    // register-select port reads as open bus
                    0xFF
                } else {
                    self.ym.status()
                }
            }
            REG_LATCH => {
                self.unmask_irq = true;
                self.latch
            }
            _ => {
                self.unhandled_reads += 1;
                0
            }
        }
    }

    fn write_hardware(&mut self, addr: u16, value: u8) {
        match addr & 0xFC00 {
            REG_ROM_BANK => match mapper::sound_bank_offset(value) {
                Ok(offset) => self.bank_offset = offset,
                Err(fault) => self.bank_fault = Some(fault),
            },
            REG_YM2151 => {
                if addr & 1 == 0 {
                    self.ym.select_register(value);
                } else {
                    self.ym.write_data(value);
                }
            }
            REG_DAC => {
                self.dac_pending.push(f32::from(value) / 127.5 - 1.0);
            }
            REG_HC55516_CLOCK | REG_HC55516_DIGIT => self.hc55516_writes += 1,
            REG_VOLUME => {
                // up/down stepper: bit 0 clocks a step, bit 1 selects down
                if value & 0x01 != 0 {
                    if value & 0x02 != 0 {
                        self.volume = self.volume.saturating_sub(1);
                    } else {
                        self.volume = self.volume.saturating_add(1);
                    }
                }
            }
            REG_REPLY => self.reply = Some(value),
            _ => self.unhandled_writes += 1,
        }
    }
}

impl Bus for SoundBus {
    fn read(&mut self, address: u16) -> u8 {
        let decoded = mapper::decode_sound_board(address);
        match decoded.region {
            Region::Ram => self.ram[usize::from(decoded.offset)],
            Region::Hardware => self.read_hardware(decoded.offset),
            Region::BankSwitched => self.banked_rom[self.bank_offset + usize::from(decoded.offset)],
            Region::Rom => self.system_rom[usize::from(decoded.offset)],
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        let decoded = mapper::decode_sound_board(address);
        match decoded.region {
            Region::Ram => self.ram[usize::from(decoded.offset)] = value,
            Region::Hardware => self.write_hardware(decoded.offset, value),
            Region::BankSwitched | Region::Rom => {}
        }
    }
}

/// The sound board: CPU, bus and the pacing state around them.
#[derive(Serialize, Deserialize)]
pub struct SoundBoard {
    pub cpu: Mc6809,
    pub bus: SoundBus,

    /// Software FIRQ pacing, in sound-CPU ticks.
    firq_interval: u32,
    firq_accum: u32,
    /// YM cycle scaling remainder (ticks * YM_CLOCK_HZ % CPU_CLOCK_HZ).
    ym_remainder: u64,
    /// Tick debt: overshoot from whole instructions carries over so the
    /// board stays in lockstep with the main CPU.
    pending_ticks: i64,

    pub samples_produced: u64,

    #[serde(skip)]
    consumer: Option<Box<dyn FnMut(f32)>>,
}

impl SoundBoard {
    #[must_use]
    pub fn new(
        system_rom: Vec<u8>,
        banked_rom: Vec<u8>,
        firq_interval: u32,
        sample_rate: u32,
    ) -> Self {
        Self {
            cpu: Mc6809::new(),
            bus: SoundBus::new(system_rom, banked_rom, sample_rate),
            firq_interval: firq_interval.max(1),
            firq_accum: 0,
            ym_remainder: 0,
            pending_ticks: 0,
            samples_produced: 0,
            consumer: None,
        }
    }

    /// Reset line from the main board (write to 0x3FDD), also used at
    /// power-on. In-flight latches and pending samples are discarded.
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        self.bus.ym.reset();
        self.bus.latch = 0;
        self.bus.latch_ready = false;
        self.bus.reply = None;
        self.bus.unmask_irq = false;
        self.bus.bank_fault = None;
        self.bus.bank_offset = 0;
        self.bus.dac_pending.clear();
        self.firq_accum = 0;
        self.ym_remainder = 0;
        self.pending_ticks = 0;
    }

    /// Command latch write from the main board (0x3FDC): latch the byte
    /// and assert IRQ.
    pub fn write_command(&mut self, value: u8) {
        self.bus.set_latch(value);
        self.cpu.irq();
    }

    /// Reply byte pending for the main board, if any.
    pub fn take_reply(&mut self) -> Option<u8> {
        self.bus.take_reply()
    }

    pub fn register_audio_consumer(&mut self, consumer: Box<dyn FnMut(f32)>) {
        self.consumer = Some(consumer);
    }

    /// Run the board for at least `ticks` CPU ticks (instruction
    /// granular; the overshoot is carried into the next call).
    pub fn execute(&mut self, ticks: u32) -> Result<(), StepError> {
        self.pending_ticks += i64::from(ticks);
        while self.pending_ticks > 0 {
            let executed = self.cpu.step(&mut self.bus)?;
            self.pending_ticks -= i64::from(executed);

            if self.bus.take_unmask_irq() {
                self.cpu.clear_irq_masking();
            }
            if let Some(fault) = self.bus.take_bank_fault() {
                return Err(StepError::SoundBank(fault));
            }

            self.firq_accum += executed;
            while self.firq_accum >= self.firq_interval {
                self.firq_accum -= self.firq_interval;
                self.cpu.firq();
            }

            // scale CPU ticks to YM cycles without losing the remainder
            let scaled = self.ym_remainder + u64::from(executed) * u64::from(YM_CLOCK_HZ);
            let cycles = (scaled / u64::from(CPU_CLOCK_HZ)) as u32;
            self.ym_remainder = scaled % u64::from(CPU_CLOCK_HZ);
            self.bus.ym.advance(cycles);

            self.drain_samples();
        }
        Ok(())
    }

    /// Push FM output then DAC output, in production order.
    fn drain_samples(&mut self) {
        if self.bus.ym.buffer_len() == 0 && self.bus.dac_pending.is_empty() {
            return;
        }
        let fm = self.bus.ym.take_buffer();
        let dac = std::mem::take(&mut self.bus.dac_pending);
        self.samples_produced += (fm.len() + dac.len()) as u64;
        if let Some(consumer) = self.consumer.as_mut() {
            for sample in fm.into_iter().chain(dac) {
                consumer(sample);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Build a board whose fixed ROM holds `program` at 0xC000 and the
    /// reset/IRQ/FIRQ vectors pointing at 0xC000/0xC020/0xC040.
    fn test_board(program: &[u8], irq_handler: &[u8]) -> SoundBoard {
        let mut system_rom = vec![0x12; crate::rom::SOUND_SYSTEM_SIZE]; // NOP filler
        system_rom[..program.len()].copy_from_slice(program);
        system_rom[0x20..0x20 + irq_handler.len()].copy_from_slice(irq_handler);
        system_rom[0x40] = 0x3B; // RTI (FIRQ handler)
        // vectors: FIRQ $FFF6, IRQ $FFF8, RESET $FFFE
        system_rom[0x3FF6] = 0xC0;
        system_rom[0x3FF7] = 0x40;
        system_rom[0x3FF8] = 0xC0;
        system_rom[0x3FF9] = 0x20;
        system_rom[0x3FFE] = 0xC0;
        system_rom[0x3FFF] = 0x00;

        let banked_rom = vec![0xEE; crate::rom::SOUND_BANKED_SIZE];
        let mut board = SoundBoard::new(system_rom, banked_rom, 833, 11_000);
        board.reset();
        board
    }

    const IDLE: &[u8] = &[
        0x1C, 0xEF, // ANDCC #$EF   unmask IRQ
        0x20, 0xFE, // BRA *
    ];

    #[test]
    fn command_latch_raises_irq_and_handler_reads_it() {
        let board_irq_handler = [
            0xB6, 0x34, 0x00, // LDA $3400   read the command latch
            0xB7, 0x00, 0x10, // STA $0010
            0x3B, // RTI
        ];
        let mut board = test_board(IDLE, &board_irq_handler);
        board.execute(4).unwrap();

        board.write_command(0x79);
        board.execute(64).unwrap();

        assert_eq!(board.bus.read(0x0010), 0x79);
        assert_eq!(board.cpu.irq_count, 1);
        // latch stays readable after the read
        assert!(board.bus.latch_ready());
        assert_eq!(board.bus.latch(), 0x79);
    }

    #[test]
    fn command_while_masked_is_missed() {
        // program never unmasks
        let mut board = test_board(&[0x20, 0xFE], &[0x3B]);
        board.write_command(0x11);
        board.execute(100).unwrap();
        assert_eq!(board.cpu.irq_count, 0);
        assert_eq!(board.cpu.missed_irq, 1);
    }

    #[test]
    fn firq_pacing_counts_missed_while_masked() {
        let mut board = test_board(&[0x20, 0xFE], &[0x3B]);
        // FIRQ stays masked after reset; ten intervals means ten misses
        board.execute(8330).unwrap();
        assert_eq!(board.cpu.missed_firq + board.cpu.firq_count, 10);
    }

    #[test]
    fn firq_serviced_when_unmasked() {
        let program = [
            0x1C, 0xAF, // ANDCC #$AF   unmask FIRQ (and IRQ)
            0x20, 0xFE, // BRA *
        ];
        let mut board = test_board(&program, &[0x3B]);
        board.execute(2500).unwrap();
        assert!(board.cpu.firq_count >= 2);
    }

    #[test]
    fn bank_select_moves_window() {
        let mut board = test_board(IDLE, &[0x3B]);
        let mut banked = vec![0x00; crate::rom::SOUND_BANKED_SIZE];
        banked[0x1D << 15] = 0xAB; // U15 chip, bank 13
        board.bus.banked_rom = banked;

        board.bus.write(0x2000, 0xBD);
        assert_eq!(board.bus.read(0x4000), 0xAB);
    }

    #[test]
    fn invalid_bank_encoding_is_fatal() {
        let mut board = test_board(IDLE, &[0x3B]);
        board.bus.write(0x2000, 0xFF);
        let err = board.execute(10).unwrap_err();
        assert!(matches!(
            err,
            StepError::SoundBank(BankError::InvalidEncoding(0xFF))
        ));
    }

    #[test]
    fn dac_write_reaches_consumer() {
        let program = [
            0x86, 0xFF, // LDA #$FF
            0xB7, 0x28, 0x00, // STA $2800
            0x20, 0xFE, // BRA *
        ];
        let mut board = test_board(&program, &[0x3B]);
        let sink: Rc<RefCell<Vec<f32>>> = Rc::default();
        let tap = Rc::clone(&sink);
        board.register_audio_consumer(Box::new(move |s| tap.borrow_mut().push(s)));

        board.execute(16).unwrap();
        let samples = sink.borrow();
        assert!(samples.iter().any(|&s| s > 0.99));
        assert!(board.samples_produced >= 1);
    }

    #[test]
    fn volume_stepper() {
        let mut board = test_board(IDLE, &[0x3B]);
        for _ in 0..3 {
            board.bus.write(0x3800, 0x01);
        }
        assert_eq!(board.bus.volume, 3);
        board.bus.write(0x3800, 0x03);
        assert_eq!(board.bus.volume, 2);
        // bit 0 clear: no step
        board.bus.write(0x3800, 0x02);
        assert_eq!(board.bus.volume, 2);
    }

    #[test]
    fn reply_latch_is_an_event() {
        let program = [
            0x86, 0x5A, // LDA #$5A
            0xB7, 0x3C, 0x00, // STA $3C00
            0x20, 0xFE, // BRA *
        ];
        let mut board = test_board(&program, &[0x3B]);
        board.execute(16).unwrap();
        assert_eq!(board.take_reply(), Some(0x5A));
        assert_eq!(board.take_reply(), None);
    }

    #[test]
    fn ym_status_readable_from_program() {
        let mut board = test_board(IDLE, &[0x3B]);
        // register-select port reads open bus, data port reads status
        assert_eq!(board.bus.read(0x2400), 0xFF);
        assert_eq!(board.bus.read(0x2401) & 0x03, 0x00);
    }

    #[test]
    fn overshoot_carries_between_calls() {
        let mut board = test_board(IDLE, &[0x3B]);
        let before = board.cpu.tick_count;
        for _ in 0..100 {
            board.execute(3).unwrap();
        }
        let ran = board.cpu.tick_count - before;
        // stays within one instruction of the requested budget
        assert!((300..=320).contains(&ran), "ran {ran} ticks");
    }
}
