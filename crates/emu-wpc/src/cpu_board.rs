//! CPU board: main MC6809, 8 KiB RAM, banked game ROM and the ASIC
//! register file.
//!
//! The bus decodes addresses with `mapper::decode_cpu_board` and routes
//! the hardware window to the ASIC peripherals. Writes that need to
//! reach another board (sound commands, watchdog service) are recorded
//! as events; the machine drains them after each CPU slice. No
//! peripheral calls back into a CPU.

use emu_core::Bus;
use motorola_6809::Mc6809;
use serde::{Deserialize, Serialize};

use crate::config::CPU_CLOCK_HZ;
use crate::dmd::Dmd;
use crate::external_io::{EXTERNAL_IO_BASE, EXTERNAL_IO_END, ExternalIo};
use crate::lamp_matrix::LampMatrix;
use crate::mapper::{self, Region};
use crate::memory_protect::{MemoryProtect, RAM_SIZE};
use crate::solenoid_matrix::Solenoids;
use crate::switch_matrix::SwitchMatrix;

// DMD page windows and control registers
const DMD_LOW_WINDOW: u16 = 0x3800;
const DMD_LOW_WINDOW_END: u16 = 0x39FF;
const DMD_HIGH_WINDOW: u16 = 0x3A00;
const DMD_HIGH_WINDOW_END: u16 = 0x3BFF;
const WPC_DMD_HIGH_PAGE: u16 = 0x3FBC;
const WPC_DMD_FIRQ_ROW: u16 = 0x3FBD;
const WPC_DMD_LOW_PAGE: u16 = 0x3FBE;
const WPC_DMD_ACTIVE_PAGE: u16 = 0x3FBF;

// Sound interface, inside the external I/O block
const WPC_FLIPTRONICS_PORT: u16 = 0x3FD4;
const WPC_SOUND_DATA: u16 = 0x3FDC;
const WPC_SOUND_CONTROL: u16 = 0x3FDD;

// Driver board
const WPC_SOLENOID_BANK_BASE: u16 = 0x3FE0;
const WPC_SOLENOID_BANK_END: u16 = 0x3FE3;
const WPC_LAMP_ROW_OUTPUT: u16 = 0x3FE4;
const WPC_LAMP_COLUMN_STROBE: u16 = 0x3FE5;
const WPC_GI_TRIAC: u16 = 0x3FE6;
const WPC_JUMPER_INPUT: u16 = 0x3FE7;
const WPC_CABINET_INPUT: u16 = 0x3FE8;
const WPC_SWITCH_COLUMN_STROBE: u16 = 0x3FE9;
const WPC_SWITCH_ROW_INPUT: u16 = 0x3FEA;

// ASIC misc
const WPC_DIAG_LED: u16 = 0x3FF2;
const WPC_SHIFT_ADDR_HIGH: u16 = 0x3FF4;
const WPC_SHIFT_ADDR_LOW: u16 = 0x3FF5;
const WPC_SHIFT_BIT: u16 = 0x3FF6;
const WPC_SHIFT_BIT2: u16 = 0x3FF7;
const WPC_PERIPHERAL_FIRQ_CLEAR: u16 = 0x3FF8;
const WPC_CLOCK_HOURS: u16 = 0x3FFA;
const WPC_CLOCK_MINUTES: u16 = 0x3FFB;
const WPC_ROM_BANK: u16 = 0x3FFC;
const WPC_RAM_LOCK: u16 = 0x3FFD;
const WPC_RAM_LOCK_SIZE: u16 = 0x3FFE;
const WPC_ZERO_CROSS_WATCHDOG: u16 = 0x3FFF;

const EXPANSION_BASE: u16 = 0x2000;
const EXPANSION_SIZE: usize = 0x1800;

/// Main board bus: RAM, ROM windows and the ASIC peripherals.
#[derive(Serialize, Deserialize)]
pub struct CpuBus {
    ram: Vec<u8>,
    rom: Vec<u8>,
    bank_count: u8,
    bank_offset: usize,

    pub dmd: Dmd,
    pub switches: SwitchMatrix,
    pub lamps: LampMatrix,
    pub solenoids: Solenoids,
    pub external_io: ExternalIo,
    pub protect: MemoryProtect,

    /// Expansion space 0x2000-0x37FF: register file semantics, counted.
    expansion: Vec<u8>,
    pub expansion_reads: u64,
    pub expansion_writes: u64,

    /// Country/jumper DIP inputs read at 0x3FE7.
    pub jumper_input: u8,
    pub diag_led: u8,
    pub diag_led_toggles: u64,

    // hardware bit shifter
    shift_addr: u16,
    shift_bit: u8,
    shift_bit2: u8,

    // time of day, derived from the tick counter
    tod_base_minutes: u32,
    tod_set_tick: u64,
    tick_count: u64,

    zero_cross_flag: bool,

    // reply latch from the sound board
    sound_reply: u8,

    // events drained by the machine after each slice
    sound_command: Option<u8>,
    sound_control_reset: bool,
    watchdog_serviced: bool,
}

impl CpuBus {
    #[must_use]
    pub fn new(rom: Vec<u8>, bank_count: u8) -> Self {
        Self {
            ram: vec![0; RAM_SIZE],
            rom,
            bank_count,
            bank_offset: 0,
            dmd: Dmd::new(),
            switches: SwitchMatrix::new(),
            lamps: LampMatrix::new(),
            solenoids: Solenoids::new(),
            external_io: ExternalIo::new(),
            protect: MemoryProtect::new(),
            expansion: vec![0; EXPANSION_SIZE],
            expansion_reads: 0,
            expansion_writes: 0,
            jumper_input: 0x00,
            diag_led: 0,
            diag_led_toggles: 0,
            shift_addr: 0,
            shift_bit: 0,
            shift_bit2: 0,
            tod_base_minutes: 0,
            tod_set_tick: 0,
            tick_count: 0,
            zero_cross_flag: false,
            sound_reply: 0,
            sound_command: None,
            sound_control_reset: false,
            watchdog_serviced: false,
        }
    }

    /// Fixed ROM region base: the last 32 KiB of the game ROM.
    fn fixed_rom_base(&self) -> usize {
        self.rom.len() - crate::rom::GAME_FIXED_SIZE
    }

    pub fn set_zero_cross(&mut self) {
        self.zero_cross_flag = true;
    }

    pub fn set_tick_count(&mut self, ticks: u64) {
        self.tick_count = ticks;
    }

    pub fn set_sound_reply(&mut self, value: u8) {
        self.sound_reply = value;
    }

    pub fn take_sound_command(&mut self) -> Option<u8> {
        self.sound_command.take()
    }

    pub fn take_sound_control_reset(&mut self) -> bool {
        std::mem::take(&mut self.sound_control_reset)
    }

    pub fn take_watchdog_service(&mut self) -> bool {
        std::mem::take(&mut self.watchdog_serviced)
    }

    fn tod_total_minutes(&self) -> u32 {
        let elapsed = self.tick_count.saturating_sub(self.tod_set_tick);
        let elapsed_minutes = (elapsed / (u64::from(CPU_CLOCK_HZ) * 60)) as u32;
        self.tod_base_minutes + elapsed_minutes
    }

    fn read_hardware(&mut self, addr: u16) -> u8 {
        match addr {
            DMD_LOW_WINDOW..=DMD_LOW_WINDOW_END => self.dmd.read_low(addr - DMD_LOW_WINDOW),
            DMD_HIGH_WINDOW..=DMD_HIGH_WINDOW_END => self.dmd.read_high(addr - DMD_HIGH_WINDOW),
            WPC_FLIPTRONICS_PORT => self.switches.read_fliptronics(),
            WPC_SOUND_DATA => self.sound_reply,
            WPC_SOUND_CONTROL => 0xFF,
            EXTERNAL_IO_BASE..=EXTERNAL_IO_END => self.external_io.read(addr),
            WPC_JUMPER_INPUT => self.jumper_input,
            WPC_CABINET_INPUT => self.switches.read_cabinet(),
            WPC_SWITCH_ROW_INPUT => self.switches.read_rows(),
            WPC_DIAG_LED => self.diag_led,
            WPC_SHIFT_ADDR_HIGH => {
                (self.shift_addr.wrapping_add(u16::from(self.shift_bit) >> 3) >> 8) as u8
            }
            WPC_SHIFT_ADDR_LOW => {
                (self.shift_addr.wrapping_add(u16::from(self.shift_bit) >> 3) & 0xFF) as u8
            }
            WPC_SHIFT_BIT => 1 << (self.shift_bit & 0x07),
            WPC_SHIFT_BIT2 => 1 << (self.shift_bit2 & 0x07),
            WPC_PERIPHERAL_FIRQ_CLEAR => u8::from(self.dmd.firq_pending()) << 7,
            WPC_CLOCK_HOURS => ((self.tod_total_minutes() / 60) % 24) as u8,
            WPC_CLOCK_MINUTES => (self.tod_total_minutes() % 60) as u8,
            WPC_ZERO_CROSS_WATCHDOG => {
                let flag = u8::from(self.zero_cross_flag) << 7;
                self.zero_cross_flag = false;
                flag
            }
            EXPANSION_BASE..=0x37FF => {
                self.expansion_reads += 1;
                self.expansion[usize::from(addr - EXPANSION_BASE)]
            }
            _ => {
                self.expansion_reads += 1;
                0
            }
        }
    }

    fn write_hardware(&mut self, addr: u16, value: u8) {
        match addr {
            DMD_LOW_WINDOW..=DMD_LOW_WINDOW_END => self.dmd.write_low(addr - DMD_LOW_WINDOW, value),
            DMD_HIGH_WINDOW..=DMD_HIGH_WINDOW_END => {
                self.dmd.write_high(addr - DMD_HIGH_WINDOW, value);
            }
            WPC_DMD_HIGH_PAGE => self.dmd.set_high_page(value),
            WPC_DMD_FIRQ_ROW => self.dmd.set_firq_row(value),
            WPC_DMD_LOW_PAGE => self.dmd.set_low_page(value),
            WPC_DMD_ACTIVE_PAGE => self.dmd.set_active_page(value),
            WPC_SOUND_DATA => self.sound_command = Some(value),
            WPC_SOUND_CONTROL => self.sound_control_reset = true,
            EXTERNAL_IO_BASE..=EXTERNAL_IO_END => self.external_io.write(addr, value),
            WPC_SOLENOID_BANK_BASE..=WPC_SOLENOID_BANK_END => {
                self.solenoids
                    .write_bank((addr - WPC_SOLENOID_BANK_BASE) as u8, value);
            }
            WPC_LAMP_ROW_OUTPUT => self.lamps.write_row(value),
            WPC_LAMP_COLUMN_STROBE => self.lamps.write_column(value),
            WPC_GI_TRIAC => self.solenoids.write_gi(value),
            WPC_SWITCH_COLUMN_STROBE => self.switches.write_column_strobe(value),
            WPC_DIAG_LED => {
                if (self.diag_led ^ value) & 0x80 != 0 {
                    self.diag_led_toggles += 1;
                }
                self.diag_led = value;
            }
            WPC_SHIFT_ADDR_HIGH => {
                self.shift_addr = (self.shift_addr & 0x00FF) | (u16::from(value) << 8);
            }
            WPC_SHIFT_ADDR_LOW => {
                self.shift_addr = (self.shift_addr & 0xFF00) | u16::from(value);
            }
            WPC_SHIFT_BIT => self.shift_bit = value,
            WPC_SHIFT_BIT2 => self.shift_bit2 = value,
            WPC_PERIPHERAL_FIRQ_CLEAR => self.dmd.clear_firq(),
            WPC_CLOCK_HOURS => {
                let minutes = self.tod_total_minutes() % 60;
                self.tod_base_minutes = u32::from(value % 24) * 60 + minutes;
                self.tod_set_tick = self.tick_count;
            }
            WPC_CLOCK_MINUTES => {
                let hours = (self.tod_total_minutes() / 60) % 24;
                self.tod_base_minutes = hours * 60 + u32::from(value % 60);
                self.tod_set_tick = self.tick_count;
            }
            WPC_ROM_BANK => {
                self.bank_offset = mapper::cpu_bank_offset(value, self.bank_count);
            }
            WPC_RAM_LOCK => self.protect.write_lock(value),
            WPC_RAM_LOCK_SIZE => self.protect.write_lock_size(value),
            WPC_ZERO_CROSS_WATCHDOG => self.watchdog_serviced = true,
            EXPANSION_BASE..=0x37FF => {
                self.expansion_writes += 1;
                self.expansion[usize::from(addr - EXPANSION_BASE)] = value;
            }
            _ => self.expansion_writes += 1,
        }
    }
}

impl Bus for CpuBus {
    fn read(&mut self, address: u16) -> u8 {
        let decoded = mapper::decode_cpu_board(address);
        match decoded.region {
            Region::Ram => self.ram[usize::from(decoded.offset)],
            Region::Hardware => self.read_hardware(decoded.offset),
            Region::BankSwitched => self.rom[self.bank_offset + usize::from(decoded.offset)],
            Region::Rom => self.rom[self.fixed_rom_base() + usize::from(decoded.offset)],
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        let decoded = mapper::decode_cpu_board(address);
        match decoded.region {
            Region::Ram => {
                if self.protect.write_allowed(decoded.offset) {
                    self.ram[usize::from(decoded.offset)] = value;
                }
            }
            Region::Hardware => self.write_hardware(decoded.offset, value),
            // ROM writes are dropped
            Region::BankSwitched | Region::Rom => {}
        }
    }
}

/// The main board: CPU plus its bus.
#[derive(Serialize, Deserialize)]
pub struct CpuBoard {
    pub cpu: Mc6809,
    pub bus: CpuBus,
}

impl CpuBoard {
    #[must_use]
    pub fn new(rom: Vec<u8>, bank_count: u8) -> Self {
        Self {
            cpu: Mc6809::new(),
            bus: CpuBus::new(rom, bank_count),
        }
    }

    /// Fetch the reset vector and restart execution, discarding
    /// in-flight cross-board events.
    pub fn reset(&mut self) {
        self.bus.sound_command = None;
        self.bus.sound_control_reset = false;
        self.bus.watchdog_serviced = false;
        self.bus.sound_reply = 0;
        self.bus.zero_cross_flag = false;
        self.cpu.reset(&mut self.bus);
    }

    /// Expose RAM for UI snapshots.
    #[must_use]
    pub fn ram(&self) -> &[u8] {
        &self.bus.ram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_board() -> CpuBoard {
        // 128 KiB ROM, marked per bank so bank switching is observable
        let mut rom = vec![0u8; 128 * 1024];
        for (bank, chunk) in rom.chunks_mut(crate::rom::GAME_BANK_SIZE).enumerate() {
            chunk.fill(bank as u8);
        }
        CpuBoard::new(rom, 8)
    }

    #[test]
    fn fixed_rom_is_last_32_kib() {
        let mut board = test_board();
        // banks 6 and 7 occupy the fixed region
        assert_eq!(board.bus.read(0x8000), 6);
        assert_eq!(board.bus.read(0xC000), 7);
        assert_eq!(board.bus.read(0xFFFF), 7);
    }

    #[test]
    fn bank_window_follows_select() {
        let mut board = test_board();
        assert_eq!(board.bus.read(0x4000), 0);
        board.bus.write(0x3FFC, 3);
        assert_eq!(board.bus.read(0x4000), 3);
        // out-of-range bank aliases installed size
        board.bus.write(0x3FFC, 9);
        assert_eq!(board.bus.read(0x4000), 1);
    }

    #[test]
    fn ram_protection_blocks_top() {
        let mut board = test_board();
        board.bus.write(0x3FFE, 0x0F);
        board.bus.write(0x3FFD, 0x00);
        board.bus.write(0x1FFF, 0xAA);
        assert_eq!(board.bus.read(0x1FFF), 0x00);
        assert_eq!(board.bus.protect.blocked_writes, 1);

        board.bus.write(0x3FFD, 0xB4);
        board.bus.write(0x1FFF, 0xAA);
        assert_eq!(board.bus.read(0x1FFF), 0xAA);
    }

    #[test]
    fn dmd_window_and_page_registers() {
        let mut board = test_board();
        board.bus.write(0x3FBE, 4);
        board.bus.write(0x3800, 0x12);
        board.bus.write(0x3FBC, 4);
        assert_eq!(board.bus.read(0x3A00), 0x12);
    }

    #[test]
    fn sound_writes_become_events() {
        let mut board = test_board();
        board.bus.write(0x3FDC, 0x79);
        assert_eq!(board.bus.take_sound_command(), Some(0x79));
        assert_eq!(board.bus.take_sound_command(), None);

        board.bus.write(0x3FDD, 0x00);
        assert!(board.bus.take_sound_control_reset());
        assert!(!board.bus.take_sound_control_reset());

        // reply latch reads do not consume
        board.bus.set_sound_reply(0x5A);
        assert_eq!(board.bus.read(0x3FDC), 0x5A);
        assert_eq!(board.bus.read(0x3FDC), 0x5A);
    }

    #[test]
    fn zero_cross_read_clears_flag() {
        let mut board = test_board();
        assert_eq!(board.bus.read(0x3FFF), 0x00);
        board.bus.set_zero_cross();
        assert_eq!(board.bus.read(0x3FFF), 0x80);
        assert_eq!(board.bus.read(0x3FFF), 0x00);
    }

    #[test]
    fn watchdog_write_is_an_event() {
        let mut board = test_board();
        board.bus.write(0x3FFF, 0x80);
        assert!(board.bus.take_watchdog_service());
        assert!(!board.bus.take_watchdog_service());
    }

    #[test]
    fn time_of_day_advances_with_ticks() {
        let mut board = test_board();
        board.bus.write(0x3FFA, 13);
        board.bus.write(0x3FFB, 59);
        assert_eq!(board.bus.read(0x3FFA), 13);
        assert_eq!(board.bus.read(0x3FFB), 59);

        // one minute of ticks rolls the hour
        board.bus.set_tick_count(u64::from(CPU_CLOCK_HZ) * 60);
        assert_eq!(board.bus.read(0x3FFA), 14);
        assert_eq!(board.bus.read(0x3FFB), 0);
    }

    #[test]
    fn shifter_computes_bit_address() {
        let mut board = test_board();
        board.bus.write(0x3FF4, 0x12);
        board.bus.write(0x3FF5, 0x34);
        board.bus.write(0x3FF6, 0x0B);
        // 0x1234 + 11/8 = 0x1235, bit 11 & 7 = 3
        assert_eq!(board.bus.read(0x3FF4), 0x12);
        assert_eq!(board.bus.read(0x3FF5), 0x35);
        assert_eq!(board.bus.read(0x3FF6), 0b0000_1000);
    }

    #[test]
    fn switch_matrix_via_registers() {
        let mut board = test_board();
        board.bus.switches.set_input(1, 0x40);
        board.bus.write(0x3FE9, 0x02);
        assert_eq!(board.bus.read(0x3FEA), 0x40);
    }
}
