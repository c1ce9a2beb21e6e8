//! MC6809 CPU state, interrupt machinery and addressing helpers.

use core::fmt;

use emu_core::Bus;

use crate::flags::{EF, FF, IF};
use crate::registers::Registers;

mod execute;

/// Architectural interrupt vector addresses.
pub(crate) const VECTOR_SWI3: u16 = 0xFFF2;
pub(crate) const VECTOR_SWI2: u16 = 0xFFF4;
pub(crate) const VECTOR_FIRQ: u16 = 0xFFF6;
pub(crate) const VECTOR_IRQ: u16 = 0xFFF8;
pub(crate) const VECTOR_SWI: u16 = 0xFFFA;
pub(crate) const VECTOR_NMI: u16 = 0xFFFC;
pub(crate) const VECTOR_RESET: u16 = 0xFFFE;

/// Fatal CPU fault. Execution cannot continue safely past one of these;
/// the caller must halt or reset the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    /// Undefined opcode (page prefix included in `opcode` for pages 2/3),
    /// or an undefined indexed-mode postbyte.
    InvalidOpcode { opcode: u16, pc: u16 },
}

impl fmt::Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOpcode { opcode, pc } => {
                write!(f, "invalid opcode {opcode:#06X} at {pc:#06X}")
            }
        }
    }
}

impl std::error::Error for CpuError {}

/// Wait state entered by SYNC and CWAI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum Wait {
    #[default]
    None,
    /// SYNC: stopped until any interrupt line is asserted (masked or not).
    Sync,
    /// CWAI: registers already stacked, stopped until an unmasked interrupt.
    Cwai,
}

/// Motorola MC6809 CPU.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mc6809 {
    pub regs: Registers,

    pending_irq: bool,
    pending_firq: bool,
    pending_nmi: bool,
    wait: Wait,

    /// Cumulative executed cycles.
    pub tick_count: u64,
    /// Serviced interrupt counts.
    pub irq_count: u64,
    pub firq_count: u64,
    pub nmi_count: u64,
    /// Assertions that arrived while the corresponding CC mask bit was
    /// set. The latch is not set in that case; the game ROM lost the
    /// interrupt, exactly as on real hardware.
    pub missed_irq: u64,
    pub missed_firq: u64,
}

impl Default for Mc6809 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mc6809 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers {
                cc: IF | FF,
                ..Registers::default()
            },
            pending_irq: false,
            pending_firq: false,
            pending_nmi: false,
            wait: Wait::None,
            tick_count: 0,
            irq_count: 0,
            firq_count: 0,
            nmi_count: 0,
            missed_irq: 0,
            missed_firq: 0,
        }
    }

    /// Power-on reset: clear registers, mask both interrupt lines and
    /// load PC from the reset vector. Diagnostic counters survive so a
    /// soft reset does not erase telemetry.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.regs = Registers {
            cc: IF | FF,
            ..Registers::default()
        };
        self.pending_irq = false;
        self.pending_firq = false;
        self.pending_nmi = false;
        self.wait = Wait::None;
        self.regs.pc = bus.read_word(VECTOR_RESET);
    }

    /// Assert the IRQ line. If the CC IRQ mask is set the request is
    /// lost and counted, never latched.
    pub fn irq(&mut self) {
        if self.regs.flag(IF) {
            self.missed_irq += 1;
            // SYNC wakes on any line, masked or not
            if self.wait == Wait::Sync {
                self.wait = Wait::None;
            }
            return;
        }
        self.pending_irq = true;
    }

    /// Assert the FIRQ line, subject to the CC FIRQ mask.
    pub fn firq(&mut self) {
        if self.regs.flag(FF) {
            self.missed_firq += 1;
            if self.wait == Wait::Sync {
                self.wait = Wait::None;
            }
            return;
        }
        self.pending_firq = true;
    }

    /// Assert the NMI line. Never masked.
    pub fn nmi(&mut self) {
        self.pending_nmi = true;
    }

    /// Clear the CC IRQ mask without a full RTI sequence. The WPC sound
    /// board's latch-read protocol uses this as the unmask path.
    pub fn clear_irq_masking(&mut self) {
        self.regs.set_flag(IF, false);
    }

    /// True if the CPU is stopped in SYNC or CWAI.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.wait != Wait::None
    }

    /// Execute one instruction, or service one pending interrupt, and
    /// return the cycles consumed.
    pub fn step(&mut self, bus: &mut impl Bus) -> Result<u32, CpuError> {
        if self.wait == Wait::Sync
            && (self.pending_irq || self.pending_firq || self.pending_nmi)
        {
            self.wait = Wait::None;
        }

        if self.wait == Wait::None {
            if let Some(cycles) = self.poll_interrupts(bus) {
                self.tick_count += u64::from(cycles);
                return Ok(cycles);
            }
        } else if self.wait == Wait::Cwai {
            if let Some(cycles) = self.poll_interrupts(bus) {
                self.tick_count += u64::from(cycles);
                return Ok(cycles);
            }
            self.tick_count += 1;
            return Ok(1);
        } else {
            // SYNC with no line asserted: idle one cycle
            self.tick_count += 1;
            return Ok(1);
        }

        let opcode = self.fetch8(bus);
        let cycles = self.execute(opcode, bus)?;
        self.tick_count += u64::from(cycles);
        Ok(cycles)
    }

    /// Execute instructions until at least `n` cycles have elapsed.
    /// Returns the exact count consumed; the overshoot is less than one
    /// instruction.
    pub fn steps(&mut self, bus: &mut impl Bus, n: u32) -> Result<u32, CpuError> {
        let mut executed = 0;
        while executed < n {
            executed += self.step(bus)?;
        }
        Ok(executed)
    }

    /// Service the highest-priority pending, unmasked interrupt.
    /// NMI before FIRQ before IRQ.
    fn poll_interrupts(&mut self, bus: &mut impl Bus) -> Option<u32> {
        if self.pending_nmi {
            self.pending_nmi = false;
            self.nmi_count += 1;
            return Some(self.service(bus, VECTOR_NMI, true, IF | FF));
        }
        if self.pending_firq && !self.regs.flag(FF) {
            self.pending_firq = false;
            self.firq_count += 1;
            return Some(self.service(bus, VECTOR_FIRQ, false, IF | FF));
        }
        if self.pending_irq && !self.regs.flag(IF) {
            self.pending_irq = false;
            self.irq_count += 1;
            return Some(self.service(bus, VECTOR_IRQ, true, IF));
        }
        None
    }

    /// Stack state (unless CWAI already did), apply the mask bits and
    /// vector. `full` selects the entire-state frame over the fast
    /// PC+CC frame.
    fn service(&mut self, bus: &mut impl Bus, vector: u16, full: bool, mask: u8) -> u32 {
        let from_cwai = self.wait == Wait::Cwai;
        self.wait = Wait::None;

        let cycles = if from_cwai {
            // CWAI stacked everything up front; only the vector remains
            3
        } else if full {
            self.regs.set_flag(EF, true);
            self.push_all(bus);
            19
        } else {
            self.regs.set_flag(EF, false);
            self.push16_s(bus, self.regs.pc);
            self.push8_s(bus, self.regs.cc);
            10
        };

        self.regs.cc |= mask;
        self.regs.pc = bus.read_word(vector);
        cycles
    }

    // ---- fetch helpers ----

    pub(crate) fn fetch8(&mut self, bus: &mut impl Bus) -> u8 {
        let byte = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        byte
    }

    pub(crate) fn fetch16(&mut self, bus: &mut impl Bus) -> u16 {
        let high = self.fetch8(bus);
        let low = self.fetch8(bus);
        u16::from(high) << 8 | u16::from(low)
    }

    // ---- effective-address helpers ----

    /// Direct mode: DP forms the high byte of the effective address.
    pub(crate) fn ea_direct(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.fetch8(bus);
        u16::from(self.regs.dp) << 8 | u16::from(low)
    }

    /// Extended mode: a 16-bit absolute address follows the opcode.
    pub(crate) fn ea_extended(&mut self, bus: &mut impl Bus) -> u16 {
        self.fetch16(bus)
    }

    /// Indexed mode: decode the postbyte into an effective address plus
    /// the mode's additional cycle cost.
    pub(crate) fn ea_indexed(&mut self, bus: &mut impl Bus) -> Result<(u16, u32), CpuError> {
        let post = self.fetch8(bus);
        let base = self.index_reg((post >> 5) & 0x03);

        // 0RRnnnnn: 5-bit signed offset, never indirect
        if post & 0x80 == 0 {
            let offset = i16::from(((post & 0x1F) as i8) << 3 >> 3);
            return Ok((base.wrapping_add(offset as u16), 1));
        }

        let indirect = post & 0x10 != 0;
        // ,R+ and ,-R have no indirect forms; only the double
        // increment/decrement variants do
        if indirect && matches!(post & 0x0F, 0x00 | 0x02) {
            return Err(CpuError::InvalidOpcode {
                opcode: u16::from(post),
                pc: self.regs.pc.wrapping_sub(1),
            });
        }
        let (mut ea, mut extra) = match post & 0x0F {
            0x00 => {
                // ,R+
                self.bump_index_reg((post >> 5) & 0x03, 1);
                (base, 2)
            }
            0x01 => {
                // ,R++
                self.bump_index_reg((post >> 5) & 0x03, 2);
                (base, 3)
            }
            0x02 => {
                // ,-R
                let ea = self.bump_index_reg((post >> 5) & 0x03, -1);
                (ea, 2)
            }
            0x03 => {
                // ,--R
                let ea = self.bump_index_reg((post >> 5) & 0x03, -2);
                (ea, 3)
            }
            0x04 => (base, 0),
            0x05 => (base.wrapping_add(i16::from(self.regs.b as i8) as u16), 1),
            0x06 => (base.wrapping_add(i16::from(self.regs.a as i8) as u16), 1),
            0x08 => {
                let offset = i16::from(self.fetch8(bus) as i8);
                (base.wrapping_add(offset as u16), 1)
            }
            0x09 => {
                let offset = self.fetch16(bus);
                (base.wrapping_add(offset), 4)
            }
            0x0B => (base.wrapping_add(self.regs.d()), 4),
            0x0C => {
                let offset = i16::from(self.fetch8(bus) as i8);
                (self.regs.pc.wrapping_add(offset as u16), 1)
            }
            0x0D => {
                let offset = self.fetch16(bus);
                (self.regs.pc.wrapping_add(offset), 5)
            }
            0x0F => {
                // [n16] extended indirect
                (self.fetch16(bus), 2)
            }
            _ => {
                return Err(CpuError::InvalidOpcode {
                    opcode: u16::from(post),
                    pc: self.regs.pc.wrapping_sub(1),
                });
            }
        };

        if indirect {
            ea = bus.read_word(ea);
            extra += 3;
        }
        Ok((ea, extra))
    }

    fn index_reg(&self, code: u8) -> u16 {
        match code {
            0 => self.regs.x,
            1 => self.regs.y,
            2 => self.regs.u,
            _ => self.regs.s,
        }
    }

    /// Post-increment / pre-decrement an index register. Returns the
    /// updated value (used as the EA for the decrement forms).
    fn bump_index_reg(&mut self, code: u8, delta: i16) -> u16 {
        let reg = match code {
            0 => &mut self.regs.x,
            1 => &mut self.regs.y,
            2 => &mut self.regs.u,
            _ => &mut self.regs.s,
        };
        *reg = reg.wrapping_add(delta as u16);
        *reg
    }

    // ---- stack helpers ----

    pub(crate) fn push8_s(&mut self, bus: &mut impl Bus, value: u8) {
        self.regs.s = self.regs.s.wrapping_sub(1);
        bus.write(self.regs.s, value);
    }

    pub(crate) fn push16_s(&mut self, bus: &mut impl Bus, value: u16) {
        self.push8_s(bus, value as u8);
        self.push8_s(bus, (value >> 8) as u8);
    }

    pub(crate) fn pull8_s(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.regs.s);
        self.regs.s = self.regs.s.wrapping_add(1);
        value
    }

    pub(crate) fn pull16_s(&mut self, bus: &mut impl Bus) -> u16 {
        let high = self.pull8_s(bus);
        let low = self.pull8_s(bus);
        u16::from(high) << 8 | u16::from(low)
    }

    pub(crate) fn push8_u(&mut self, bus: &mut impl Bus, value: u8) {
        self.regs.u = self.regs.u.wrapping_sub(1);
        bus.write(self.regs.u, value);
    }

    pub(crate) fn push16_u(&mut self, bus: &mut impl Bus, value: u16) {
        self.push8_u(bus, value as u8);
        self.push8_u(bus, (value >> 8) as u8);
    }

    pub(crate) fn pull8_u(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.regs.u);
        self.regs.u = self.regs.u.wrapping_add(1);
        value
    }

    pub(crate) fn pull16_u(&mut self, bus: &mut impl Bus) -> u16 {
        let high = self.pull8_u(bus);
        let low = self.pull8_u(bus);
        u16::from(high) << 8 | u16::from(low)
    }

    /// Push the entire register set onto S (IRQ/NMI/SWI/CWAI frame).
    /// Memory layout from low address: CC A B DP X Y U PC.
    pub(crate) fn push_all(&mut self, bus: &mut impl Bus) {
        self.push16_s(bus, self.regs.pc);
        self.push16_s(bus, self.regs.u);
        self.push16_s(bus, self.regs.y);
        self.push16_s(bus, self.regs.x);
        self.push8_s(bus, self.regs.dp);
        self.push8_s(bus, self.regs.b);
        self.push8_s(bus, self.regs.a);
        self.push8_s(bus, self.regs.cc);
    }

    /// Pull the entire register set except CC (RTI with E set).
    pub(crate) fn pull_all_but_cc(&mut self, bus: &mut impl Bus) {
        self.regs.a = self.pull8_s(bus);
        self.regs.b = self.pull8_s(bus);
        self.regs.dp = self.pull8_s(bus);
        self.regs.x = self.pull16_s(bus);
        self.regs.y = self.pull16_s(bus);
        self.regs.u = self.pull16_s(bus);
        self.regs.pc = self.pull16_s(bus);
    }

    /// Enter the CWAI wait state with registers already stacked.
    pub(crate) fn enter_cwai(&mut self) {
        self.wait = Wait::Cwai;
    }

    /// Enter the SYNC wait state.
    pub(crate) fn enter_sync(&mut self) {
        self.wait = Wait::Sync;
    }
}
