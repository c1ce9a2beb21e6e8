//! Instruction execution for the MC6809.
//!
//! One match arm per opcode (grouped by addressing mode). Each arm
//! returns the documented base cycle count; indexed modes add the
//! postbyte penalty computed by the addressing decoder.

use emu_core::Bus;

use crate::alu;
use crate::flags::{CF, EF, FF, IF, NF, VF, ZF, nz16};
use crate::registers::Registers;

use super::{CpuError, Mc6809, VECTOR_SWI, VECTOR_SWI2, VECTOR_SWI3};

impl Mc6809 {
    pub(super) fn execute(&mut self, opcode: u8, bus: &mut impl Bus) -> Result<u32, CpuError> {
        let cycles = match opcode {
            0x10 => return self.execute_page2(bus),
            0x11 => return self.execute_page3(bus),

            // ---- direct-mode read-modify-write ----
            0x00 => {
                let ea = self.ea_direct(bus);
                self.rmw_mem(bus, ea, alu::neg8);
                6
            }
            0x03 => {
                let ea = self.ea_direct(bus);
                self.rmw_mem(bus, ea, alu::com8);
                6
            }
            0x04 => {
                let ea = self.ea_direct(bus);
                self.rmw_mem(bus, ea, alu::lsr8);
                6
            }
            0x06 => {
                let ea = self.ea_direct(bus);
                self.rmw_mem(bus, ea, alu::ror8);
                6
            }
            0x07 => {
                let ea = self.ea_direct(bus);
                self.rmw_mem(bus, ea, alu::asr8);
                6
            }
            0x08 => {
                let ea = self.ea_direct(bus);
                self.rmw_mem(bus, ea, alu::asl8);
                6
            }
            0x09 => {
                let ea = self.ea_direct(bus);
                self.rmw_mem(bus, ea, alu::rol8);
                6
            }
            0x0A => {
                let ea = self.ea_direct(bus);
                self.rmw_mem(bus, ea, alu::dec8);
                6
            }
            0x0C => {
                let ea = self.ea_direct(bus);
                self.rmw_mem(bus, ea, alu::inc8);
                6
            }
            0x0D => {
                let ea = self.ea_direct(bus);
                let m = bus.read(ea);
                self.regs.cc = alu::test8(m, self.regs.cc);
                6
            }
            0x0E => {
                self.regs.pc = self.ea_direct(bus);
                3
            }
            0x0F => {
                let ea = self.ea_direct(bus);
                let r = alu::clr8(self.regs.cc);
                self.regs.cc = r.cc;
                bus.write(ea, r.value);
                6
            }

            // ---- inherent / immediate control ----
            0x12 => 2, // NOP
            0x13 => {
                self.enter_sync();
                2
            }
            0x16 => {
                let offset = self.fetch16(bus);
                self.regs.pc = self.regs.pc.wrapping_add(offset);
                5
            }
            0x17 => {
                let offset = self.fetch16(bus);
                self.push16_s(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(offset);
                9
            }
            0x19 => {
                let r = alu::daa(self.regs.a, self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                2
            }
            0x1A => {
                let m = self.fetch8(bus);
                self.regs.cc |= m;
                3
            }
            0x1C => {
                let m = self.fetch8(bus);
                self.regs.cc &= m;
                3
            }
            0x1D => {
                // SEX: sign-extend B into A; N and Z from D, V untouched
                self.regs.a = if self.regs.b & 0x80 != 0 { 0xFF } else { 0x00 };
                self.regs.cc = (self.regs.cc & !(NF | ZF)) | nz16(self.regs.d());
                2
            }
            0x1E => {
                let post = self.fetch8(bus);
                let a = self.tfr_get(post >> 4);
                let b = self.tfr_get(post & 0x0F);
                self.tfr_set(post >> 4, b);
                self.tfr_set(post & 0x0F, a);
                8
            }
            0x1F => {
                let post = self.fetch8(bus);
                let value = self.tfr_get(post >> 4);
                self.tfr_set(post & 0x0F, value);
                6
            }

            // ---- short branches ----
            0x20..=0x2F => {
                let take = self.cond(opcode & 0x0F);
                let offset = i16::from(self.fetch8(bus) as i8);
                if take {
                    self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
                }
                3
            }

            // ---- LEA / stack ops ----
            0x30 => {
                let (ea, extra) = self.ea_indexed(bus)?;
                self.regs.x = ea;
                self.regs.set_flag(ZF, ea == 0);
                4 + extra
            }
            0x31 => {
                let (ea, extra) = self.ea_indexed(bus)?;
                self.regs.y = ea;
                self.regs.set_flag(ZF, ea == 0);
                4 + extra
            }
            0x32 => {
                let (ea, extra) = self.ea_indexed(bus)?;
                self.regs.s = ea;
                4 + extra
            }
            0x33 => {
                let (ea, extra) = self.ea_indexed(bus)?;
                self.regs.u = ea;
                4 + extra
            }
            0x34 => {
                let mask = self.fetch8(bus);
                5 + self.push_set_s(bus, mask)
            }
            0x35 => {
                let mask = self.fetch8(bus);
                5 + self.pull_set_s(bus, mask)
            }
            0x36 => {
                let mask = self.fetch8(bus);
                5 + self.push_set_u(bus, mask)
            }
            0x37 => {
                let mask = self.fetch8(bus);
                5 + self.pull_set_u(bus, mask)
            }
            0x39 => {
                self.regs.pc = self.pull16_s(bus);
                5
            }
            0x3A => {
                self.regs.x = self.regs.x.wrapping_add(u16::from(self.regs.b));
                3
            }
            0x3B => {
                // RTI: frame size depends on the stacked E flag
                self.regs.cc = self.pull8_s(bus);
                if self.regs.flag(EF) {
                    self.pull_all_but_cc(bus);
                    15
                } else {
                    self.regs.pc = self.pull16_s(bus);
                    6
                }
            }
            0x3C => {
                // CWAI: and the mask into CC, stack everything, wait
                let m = self.fetch8(bus);
                self.regs.cc &= m;
                self.regs.set_flag(EF, true);
                self.push_all(bus);
                self.enter_cwai();
                20
            }
            0x3D => {
                let r = alu::mul(self.regs.a, self.regs.b, self.regs.cc);
                self.regs.set_d(r.value);
                self.regs.cc = r.cc;
                11
            }
            0x3F => {
                self.regs.set_flag(EF, true);
                self.push_all(bus);
                self.regs.cc |= IF | FF;
                self.regs.pc = bus.read_word(VECTOR_SWI);
                19
            }

            // ---- inherent A ----
            0x40 => {
                self.rmw_a(alu::neg8);
                2
            }
            0x43 => {
                self.rmw_a(alu::com8);
                2
            }
            0x44 => {
                self.rmw_a(alu::lsr8);
                2
            }
            0x46 => {
                self.rmw_a(alu::ror8);
                2
            }
            0x47 => {
                self.rmw_a(alu::asr8);
                2
            }
            0x48 => {
                self.rmw_a(alu::asl8);
                2
            }
            0x49 => {
                self.rmw_a(alu::rol8);
                2
            }
            0x4A => {
                self.rmw_a(alu::dec8);
                2
            }
            0x4C => {
                self.rmw_a(alu::inc8);
                2
            }
            0x4D => {
                self.regs.cc = alu::test8(self.regs.a, self.regs.cc);
                2
            }
            0x4F => {
                let r = alu::clr8(self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                2
            }

            // ---- inherent B ----
            0x50 => {
                self.rmw_b(alu::neg8);
                2
            }
            0x53 => {
                self.rmw_b(alu::com8);
                2
            }
            0x54 => {
                self.rmw_b(alu::lsr8);
                2
            }
            0x56 => {
                self.rmw_b(alu::ror8);
                2
            }
            0x57 => {
                self.rmw_b(alu::asr8);
                2
            }
            0x58 => {
                self.rmw_b(alu::asl8);
                2
            }
            0x59 => {
                self.rmw_b(alu::rol8);
                2
            }
            0x5A => {
                self.rmw_b(alu::dec8);
                2
            }
            0x5C => {
                self.rmw_b(alu::inc8);
                2
            }
            0x5D => {
                self.regs.cc = alu::test8(self.regs.b, self.regs.cc);
                2
            }
            0x5F => {
                let r = alu::clr8(self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                2
            }

            // ---- indexed read-modify-write ----
            0x60 => self.rmw_indexed(bus, alu::neg8)?,
            0x63 => self.rmw_indexed(bus, alu::com8)?,
            0x64 => self.rmw_indexed(bus, alu::lsr8)?,
            0x66 => self.rmw_indexed(bus, alu::ror8)?,
            0x67 => self.rmw_indexed(bus, alu::asr8)?,
            0x68 => self.rmw_indexed(bus, alu::asl8)?,
            0x69 => self.rmw_indexed(bus, alu::rol8)?,
            0x6A => self.rmw_indexed(bus, alu::dec8)?,
            0x6C => self.rmw_indexed(bus, alu::inc8)?,
            0x6D => {
                let (ea, extra) = self.ea_indexed(bus)?;
                let m = bus.read(ea);
                self.regs.cc = alu::test8(m, self.regs.cc);
                6 + extra
            }
            0x6E => {
                let (ea, extra) = self.ea_indexed(bus)?;
                self.regs.pc = ea;
                3 + extra
            }
            0x6F => {
                let (ea, extra) = self.ea_indexed(bus)?;
                let r = alu::clr8(self.regs.cc);
                self.regs.cc = r.cc;
                bus.write(ea, r.value);
                6 + extra
            }

            // ---- extended read-modify-write ----
            0x70 => {
                let ea = self.ea_extended(bus);
                self.rmw_mem(bus, ea, alu::neg8);
                7
            }
            0x73 => {
                let ea = self.ea_extended(bus);
                self.rmw_mem(bus, ea, alu::com8);
                7
            }
            0x74 => {
                let ea = self.ea_extended(bus);
                self.rmw_mem(bus, ea, alu::lsr8);
                7
            }
            0x76 => {
                let ea = self.ea_extended(bus);
                self.rmw_mem(bus, ea, alu::ror8);
                7
            }
            0x77 => {
                let ea = self.ea_extended(bus);
                self.rmw_mem(bus, ea, alu::asr8);
                7
            }
            0x78 => {
                let ea = self.ea_extended(bus);
                self.rmw_mem(bus, ea, alu::asl8);
                7
            }
            0x79 => {
                let ea = self.ea_extended(bus);
                self.rmw_mem(bus, ea, alu::rol8);
                7
            }
            0x7A => {
                let ea = self.ea_extended(bus);
                self.rmw_mem(bus, ea, alu::dec8);
                7
            }
            0x7C => {
                let ea = self.ea_extended(bus);
                self.rmw_mem(bus, ea, alu::inc8);
                7
            }
            0x7D => {
                let ea = self.ea_extended(bus);
                let m = bus.read(ea);
                self.regs.cc = alu::test8(m, self.regs.cc);
                7
            }
            0x7E => {
                self.regs.pc = self.ea_extended(bus);
                4
            }
            0x7F => {
                let ea = self.ea_extended(bus);
                let r = alu::clr8(self.regs.cc);
                self.regs.cc = r.cc;
                bus.write(ea, r.value);
                7
            }

            // ---- A / 16-bit: immediate ----
            0x80 => {
                let m = self.fetch8(bus);
                self.regs.a = self.sub_cc(self.regs.a, m);
                2
            }
            0x81 => {
                let m = self.fetch8(bus);
                self.sub_cc(self.regs.a, m);
                2
            }
            0x82 => {
                let m = self.fetch8(bus);
                let r = alu::sub8(self.regs.a, m, self.regs.flag(CF), self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                2
            }
            0x83 => {
                let m = self.fetch16(bus);
                let r = alu::sub16(self.regs.d(), m, self.regs.cc);
                self.regs.set_d(r.value);
                self.regs.cc = r.cc;
                4
            }
            0x84 => {
                let m = self.fetch8(bus);
                let r = alu::and8(self.regs.a, m, self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                2
            }
            0x85 => {
                let m = self.fetch8(bus);
                self.regs.cc = alu::and8(self.regs.a, m, self.regs.cc).cc;
                2
            }
            0x86 => {
                let m = self.fetch8(bus);
                self.regs.a = m;
                self.regs.cc = alu::test8(m, self.regs.cc);
                2
            }
            0x88 => {
                let m = self.fetch8(bus);
                let r = alu::eor8(self.regs.a, m, self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                2
            }
            0x89 => {
                let m = self.fetch8(bus);
                let r = alu::add8(self.regs.a, m, self.regs.flag(CF), self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                2
            }
            0x8A => {
                let m = self.fetch8(bus);
                let r = alu::or8(self.regs.a, m, self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                2
            }
            0x8B => {
                let m = self.fetch8(bus);
                let r = alu::add8(self.regs.a, m, false, self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                2
            }
            0x8C => {
                let m = self.fetch16(bus);
                self.regs.cc = alu::sub16(self.regs.x, m, self.regs.cc).cc;
                4
            }
            0x8D => {
                let offset = i16::from(self.fetch8(bus) as i8);
                self.push16_s(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
                7
            }
            0x8E => {
                let m = self.fetch16(bus);
                self.regs.x = m;
                self.regs.cc = alu::test16(m, self.regs.cc);
                3
            }

            // ---- A / 16-bit: direct ----
            0x90..=0x9F => {
                let ea = self.ea_direct(bus);
                self.alu_group_a(bus, opcode, ea)
            }
            // ---- A / 16-bit: indexed ----
            0xA0..=0xAF => {
                let (ea, extra) = self.ea_indexed(bus)?;
                self.alu_group_a(bus, opcode, ea) + extra
            }
            // ---- A / 16-bit: extended ----
            0xB0..=0xBF => {
                let ea = self.ea_extended(bus);
                self.alu_group_a(bus, opcode, ea) + 1
            }

            // ---- B / 16-bit: immediate ----
            0xC0 => {
                let m = self.fetch8(bus);
                self.regs.b = self.sub_cc(self.regs.b, m);
                2
            }
            0xC1 => {
                let m = self.fetch8(bus);
                self.sub_cc(self.regs.b, m);
                2
            }
            0xC2 => {
                let m = self.fetch8(bus);
                let r = alu::sub8(self.regs.b, m, self.regs.flag(CF), self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                2
            }
            0xC3 => {
                let m = self.fetch16(bus);
                let r = alu::add16(self.regs.d(), m, self.regs.cc);
                self.regs.set_d(r.value);
                self.regs.cc = r.cc;
                4
            }
            0xC4 => {
                let m = self.fetch8(bus);
                let r = alu::and8(self.regs.b, m, self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                2
            }
            0xC5 => {
                let m = self.fetch8(bus);
                self.regs.cc = alu::and8(self.regs.b, m, self.regs.cc).cc;
                2
            }
            0xC6 => {
                let m = self.fetch8(bus);
                self.regs.b = m;
                self.regs.cc = alu::test8(m, self.regs.cc);
                2
            }
            0xC8 => {
                let m = self.fetch8(bus);
                let r = alu::eor8(self.regs.b, m, self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                2
            }
            0xC9 => {
                let m = self.fetch8(bus);
                let r = alu::add8(self.regs.b, m, self.regs.flag(CF), self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                2
            }
            0xCA => {
                let m = self.fetch8(bus);
                let r = alu::or8(self.regs.b, m, self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                2
            }
            0xCB => {
                let m = self.fetch8(bus);
                let r = alu::add8(self.regs.b, m, false, self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                2
            }
            0xCC => {
                let m = self.fetch16(bus);
                self.regs.set_d(m);
                self.regs.cc = alu::test16(m, self.regs.cc);
                3
            }
            0xCE => {
                let m = self.fetch16(bus);
                self.regs.u = m;
                self.regs.cc = alu::test16(m, self.regs.cc);
                3
            }

            // ---- B / 16-bit: direct ----
            0xD0..=0xDF => {
                let ea = self.ea_direct(bus);
                self.alu_group_b(bus, opcode, ea)
            }
            // ---- B / 16-bit: indexed ----
            0xE0..=0xEF => {
                let (ea, extra) = self.ea_indexed(bus)?;
                self.alu_group_b(bus, opcode, ea) + extra
            }
            // ---- B / 16-bit: extended ----
            0xF0..=0xFF => {
                let ea = self.ea_extended(bus);
                self.alu_group_b(bus, opcode, ea) + 1
            }

            _ => {
                return Err(CpuError::InvalidOpcode {
                    opcode: u16::from(opcode),
                    pc: self.regs.pc.wrapping_sub(1),
                });
            }
        };

        Ok(cycles)
    }

    /// Page 2 (0x10 prefix): long branches, SWI2, D/Y/S operations.
    fn execute_page2(&mut self, bus: &mut impl Bus) -> Result<u32, CpuError> {
        let opcode = self.fetch8(bus);
        let cycles = match opcode {
            0x21..=0x2F => {
                let take = self.cond(opcode & 0x0F);
                let offset = self.fetch16(bus);
                if take {
                    self.regs.pc = self.regs.pc.wrapping_add(offset);
                    6
                } else {
                    5
                }
            }
            0x3F => {
                // SWI2: full frame, no mask change
                self.regs.set_flag(EF, true);
                self.push_all(bus);
                self.regs.pc = bus.read_word(VECTOR_SWI2);
                20
            }

            0x83 => {
                let m = self.fetch16(bus);
                self.regs.cc = alu::sub16(self.regs.d(), m, self.regs.cc).cc;
                5
            }
            0x8C => {
                let m = self.fetch16(bus);
                self.regs.cc = alu::sub16(self.regs.y, m, self.regs.cc).cc;
                5
            }
            0x8E => {
                let m = self.fetch16(bus);
                self.regs.y = m;
                self.regs.cc = alu::test16(m, self.regs.cc);
                4
            }
            0xCE => {
                let m = self.fetch16(bus);
                self.regs.s = m;
                self.regs.cc = alu::test16(m, self.regs.cc);
                4
            }

            0x93 | 0xA3 | 0xB3 | 0x9C | 0xAC | 0xBC | 0x9E | 0xAE | 0xBE | 0x9F | 0xAF
            | 0xBF | 0xDE | 0xEE | 0xFE | 0xDF | 0xEF | 0xFF => {
                let (ea, extra) = match opcode & 0xF0 {
                    0x90 | 0xD0 => (self.ea_direct(bus), 0),
                    0xA0 | 0xE0 => self.ea_indexed(bus)?,
                    _ => (self.ea_extended(bus), 1),
                };
                let base = match opcode & 0x0F {
                    0x03 => {
                        let m = bus.read_word(ea);
                        self.regs.cc = alu::sub16(self.regs.d(), m, self.regs.cc).cc;
                        7
                    }
                    0x0C => {
                        let m = bus.read_word(ea);
                        self.regs.cc = alu::sub16(self.regs.y, m, self.regs.cc).cc;
                        7
                    }
                    0x0E => {
                        let m = bus.read_word(ea);
                        let reg = if opcode & 0x40 != 0 {
                            &mut self.regs.s
                        } else {
                            &mut self.regs.y
                        };
                        *reg = m;
                        self.regs.cc = alu::test16(m, self.regs.cc);
                        6
                    }
                    _ => {
                        let m = if opcode & 0x40 != 0 {
                            self.regs.s
                        } else {
                            self.regs.y
                        };
                        bus.write(ea, (m >> 8) as u8);
                        bus.write(ea.wrapping_add(1), m as u8);
                        self.regs.cc = alu::test16(m, self.regs.cc);
                        6
                    }
                };
                base + extra
            }

            _ => {
                return Err(CpuError::InvalidOpcode {
                    opcode: 0x1000 | u16::from(opcode),
                    pc: self.regs.pc.wrapping_sub(1),
                });
            }
        };
        Ok(cycles)
    }

    /// Page 3 (0x11 prefix): SWI3 and the U/S compares.
    fn execute_page3(&mut self, bus: &mut impl Bus) -> Result<u32, CpuError> {
        let opcode = self.fetch8(bus);
        let cycles = match opcode {
            0x3F => {
                self.regs.set_flag(EF, true);
                self.push_all(bus);
                self.regs.pc = bus.read_word(VECTOR_SWI3);
                20
            }
            0x83 => {
                let m = self.fetch16(bus);
                self.regs.cc = alu::sub16(self.regs.u, m, self.regs.cc).cc;
                5
            }
            0x8C => {
                let m = self.fetch16(bus);
                self.regs.cc = alu::sub16(self.regs.s, m, self.regs.cc).cc;
                5
            }
            0x93 | 0xA3 | 0xB3 | 0x9C | 0xAC | 0xBC => {
                let (ea, extra) = match opcode & 0xF0 {
                    0x90 => (self.ea_direct(bus), 0),
                    0xA0 => self.ea_indexed(bus)?,
                    _ => (self.ea_extended(bus), 1),
                };
                let m = bus.read_word(ea);
                let reg = if opcode & 0x0F == 0x03 {
                    self.regs.u
                } else {
                    self.regs.s
                };
                self.regs.cc = alu::sub16(reg, m, self.regs.cc).cc;
                7 + extra
            }
            _ => {
                return Err(CpuError::InvalidOpcode {
                    opcode: 0x1100 | u16::from(opcode),
                    pc: self.regs.pc.wrapping_sub(1),
                });
            }
        };
        Ok(cycles)
    }

    /// Memory-operand group 0x_0-0x_F for the A accumulator and the
    /// X/D 16-bit operations (low-nibble dispatch shared by direct,
    /// indexed and extended modes). Returns direct-mode base cycles;
    /// extended adds one.
    fn alu_group_a(&mut self, bus: &mut impl Bus, opcode: u8, ea: u16) -> u32 {
        match opcode & 0x0F {
            0x00 => {
                let m = bus.read(ea);
                self.regs.a = self.sub_cc(self.regs.a, m);
                4
            }
            0x01 => {
                let m = bus.read(ea);
                self.sub_cc(self.regs.a, m);
                4
            }
            0x02 => {
                let m = bus.read(ea);
                let r = alu::sub8(self.regs.a, m, self.regs.flag(CF), self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x03 => {
                let m = bus.read_word(ea);
                let r = alu::sub16(self.regs.d(), m, self.regs.cc);
                self.regs.set_d(r.value);
                self.regs.cc = r.cc;
                6
            }
            0x04 => {
                let m = bus.read(ea);
                let r = alu::and8(self.regs.a, m, self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x05 => {
                let m = bus.read(ea);
                self.regs.cc = alu::and8(self.regs.a, m, self.regs.cc).cc;
                4
            }
            0x06 => {
                let m = bus.read(ea);
                self.regs.a = m;
                self.regs.cc = alu::test8(m, self.regs.cc);
                4
            }
            0x07 => {
                bus.write(ea, self.regs.a);
                self.regs.cc = alu::test8(self.regs.a, self.regs.cc);
                4
            }
            0x08 => {
                let m = bus.read(ea);
                let r = alu::eor8(self.regs.a, m, self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x09 => {
                let m = bus.read(ea);
                let r = alu::add8(self.regs.a, m, self.regs.flag(CF), self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x0A => {
                let m = bus.read(ea);
                let r = alu::or8(self.regs.a, m, self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x0B => {
                let m = bus.read(ea);
                let r = alu::add8(self.regs.a, m, false, self.regs.cc);
                self.regs.a = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x0C => {
                let m = bus.read_word(ea);
                self.regs.cc = alu::sub16(self.regs.x, m, self.regs.cc).cc;
                6
            }
            0x0D => {
                self.push16_s(bus, self.regs.pc);
                self.regs.pc = ea;
                7
            }
            0x0E => {
                let m = bus.read_word(ea);
                self.regs.x = m;
                self.regs.cc = alu::test16(m, self.regs.cc);
                5
            }
            _ => {
                bus.write(ea, (self.regs.x >> 8) as u8);
                bus.write(ea.wrapping_add(1), self.regs.x as u8);
                self.regs.cc = alu::test16(self.regs.x, self.regs.cc);
                5
            }
        }
    }

    /// Memory-operand group 0x_0-0x_F for the B accumulator and the
    /// D/U 16-bit operations.
    fn alu_group_b(&mut self, bus: &mut impl Bus, opcode: u8, ea: u16) -> u32 {
        match opcode & 0x0F {
            0x00 => {
                let m = bus.read(ea);
                self.regs.b = self.sub_cc(self.regs.b, m);
                4
            }
            0x01 => {
                let m = bus.read(ea);
                self.sub_cc(self.regs.b, m);
                4
            }
            0x02 => {
                let m = bus.read(ea);
                let r = alu::sub8(self.regs.b, m, self.regs.flag(CF), self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x03 => {
                let m = bus.read_word(ea);
                let r = alu::add16(self.regs.d(), m, self.regs.cc);
                self.regs.set_d(r.value);
                self.regs.cc = r.cc;
                6
            }
            0x04 => {
                let m = bus.read(ea);
                let r = alu::and8(self.regs.b, m, self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x05 => {
                let m = bus.read(ea);
                self.regs.cc = alu::and8(self.regs.b, m, self.regs.cc).cc;
                4
            }
            0x06 => {
                let m = bus.read(ea);
                self.regs.b = m;
                self.regs.cc = alu::test8(m, self.regs.cc);
                4
            }
            0x07 => {
                bus.write(ea, self.regs.b);
                self.regs.cc = alu::test8(self.regs.b, self.regs.cc);
                4
            }
            0x08 => {
                let m = bus.read(ea);
                let r = alu::eor8(self.regs.b, m, self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x09 => {
                let m = bus.read(ea);
                let r = alu::add8(self.regs.b, m, self.regs.flag(CF), self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x0A => {
                let m = bus.read(ea);
                let r = alu::or8(self.regs.b, m, self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x0B => {
                let m = bus.read(ea);
                let r = alu::add8(self.regs.b, m, false, self.regs.cc);
                self.regs.b = r.value;
                self.regs.cc = r.cc;
                4
            }
            0x0C => {
                let m = bus.read_word(ea);
                self.regs.set_d(m);
                self.regs.cc = alu::test16(m, self.regs.cc);
                5
            }
            0x0D => {
                let d = self.regs.d();
                bus.write(ea, (d >> 8) as u8);
                bus.write(ea.wrapping_add(1), d as u8);
                self.regs.cc = alu::test16(d, self.regs.cc);
                5
            }
            0x0E => {
                let m = bus.read_word(ea);
                self.regs.u = m;
                self.regs.cc = alu::test16(m, self.regs.cc);
                5
            }
            _ => {
                bus.write(ea, (self.regs.u >> 8) as u8);
                bus.write(ea.wrapping_add(1), self.regs.u as u8);
                self.regs.cc = alu::test16(self.regs.u, self.regs.cc);
                5
            }
        }
    }

    // ---- small shared helpers ----

    /// SUB/CMP: returns the difference, leaving flags in CC.
    fn sub_cc(&mut self, a: u8, m: u8) -> u8 {
        let r = alu::sub8(a, m, false, self.regs.cc);
        self.regs.cc = r.cc;
        r.value
    }

    fn rmw_mem(&mut self, bus: &mut impl Bus, ea: u16, op: fn(u8, u8) -> alu::AluResult) {
        let m = bus.read(ea);
        let r = op(m, self.regs.cc);
        self.regs.cc = r.cc;
        bus.write(ea, r.value);
    }

    fn rmw_indexed(
        &mut self,
        bus: &mut impl Bus,
        op: fn(u8, u8) -> alu::AluResult,
    ) -> Result<u32, CpuError> {
        let (ea, extra) = self.ea_indexed(bus)?;
        self.rmw_mem(bus, ea, op);
        Ok(6 + extra)
    }

    fn rmw_a(&mut self, op: fn(u8, u8) -> alu::AluResult) {
        let r = op(self.regs.a, self.regs.cc);
        self.regs.a = r.value;
        self.regs.cc = r.cc;
    }

    fn rmw_b(&mut self, op: fn(u8, u8) -> alu::AluResult) {
        let r = op(self.regs.b, self.regs.cc);
        self.regs.b = r.value;
        self.regs.cc = r.cc;
    }

    /// Branch condition for the low nibble of Bcc/LBcc opcodes.
    fn cond(&self, code: u8) -> bool {
        let Registers { cc, .. } = self.regs;
        let c = cc & CF != 0;
        let z = cc & ZF != 0;
        let n = cc & NF != 0;
        let v = cc & VF != 0;
        match code {
            0x00 => true,       // BRA
            0x01 => false,      // BRN
            0x02 => !(c || z),  // BHI
            0x03 => c || z,     // BLS
            0x04 => !c,         // BCC/BHS
            0x05 => c,          // BCS/BLO
            0x06 => !z,         // BNE
            0x07 => z,          // BEQ
            0x08 => !v,         // BVC
            0x09 => v,          // BVS
            0x0A => !n,         // BPL
            0x0B => n,          // BMI
            0x0C => n == v,     // BGE
            0x0D => n != v,     // BLT
            0x0E => !z && n == v, // BGT
            _ => z || n != v,   // BLE
        }
    }

    /// TFR/EXG source read. 8-bit registers present as 0xFF in the
    /// unused half, matching hardware behavior for cross-size moves.
    fn tfr_get(&self, code: u8) -> u16 {
        match code {
            0x00 => self.regs.d(),
            0x01 => self.regs.x,
            0x02 => self.regs.y,
            0x03 => self.regs.u,
            0x04 => self.regs.s,
            0x05 => self.regs.pc,
            0x08 => 0xFF00 | u16::from(self.regs.a),
            0x09 => 0xFF00 | u16::from(self.regs.b),
            0x0A => 0xFF00 | u16::from(self.regs.cc),
            0x0B => 0xFF00 | u16::from(self.regs.dp),
            _ => 0xFFFF,
        }
    }

    fn tfr_set(&mut self, code: u8, value: u16) {
        match code {
            0x00 => self.regs.set_d(value),
            0x01 => self.regs.x = value,
            0x02 => self.regs.y = value,
            0x03 => self.regs.u = value,
            0x04 => self.regs.s = value,
            0x05 => self.regs.pc = value,
            0x08 => self.regs.a = value as u8,
            0x09 => self.regs.b = value as u8,
            0x0A => self.regs.cc = value as u8,
            0x0B => self.regs.dp = value as u8,
            _ => {}
        }
    }

    /// PSHS: push the registers named in `mask` (bit 7 = PC ... bit 0 =
    /// CC) onto the hardware stack. Returns the byte count (one cycle
    /// each).
    fn push_set_s(&mut self, bus: &mut impl Bus, mask: u8) -> u32 {
        let mut bytes = 0;
        if mask & 0x80 != 0 {
            self.push16_s(bus, self.regs.pc);
            bytes += 2;
        }
        if mask & 0x40 != 0 {
            self.push16_s(bus, self.regs.u);
            bytes += 2;
        }
        if mask & 0x20 != 0 {
            self.push16_s(bus, self.regs.y);
            bytes += 2;
        }
        if mask & 0x10 != 0 {
            self.push16_s(bus, self.regs.x);
            bytes += 2;
        }
        if mask & 0x08 != 0 {
            self.push8_s(bus, self.regs.dp);
            bytes += 1;
        }
        if mask & 0x04 != 0 {
            self.push8_s(bus, self.regs.b);
            bytes += 1;
        }
        if mask & 0x02 != 0 {
            self.push8_s(bus, self.regs.a);
            bytes += 1;
        }
        if mask & 0x01 != 0 {
            self.push8_s(bus, self.regs.cc);
            bytes += 1;
        }
        bytes
    }

    fn pull_set_s(&mut self, bus: &mut impl Bus, mask: u8) -> u32 {
        let mut bytes = 0;
        if mask & 0x01 != 0 {
            self.regs.cc = self.pull8_s(bus);
            bytes += 1;
        }
        if mask & 0x02 != 0 {
            self.regs.a = self.pull8_s(bus);
            bytes += 1;
        }
        if mask & 0x04 != 0 {
            self.regs.b = self.pull8_s(bus);
            bytes += 1;
        }
        if mask & 0x08 != 0 {
            self.regs.dp = self.pull8_s(bus);
            bytes += 1;
        }
        if mask & 0x10 != 0 {
            self.regs.x = self.pull16_s(bus);
            bytes += 2;
        }
        if mask & 0x20 != 0 {
            self.regs.y = self.pull16_s(bus);
            bytes += 2;
        }
        if mask & 0x40 != 0 {
            self.regs.u = self.pull16_s(bus);
            bytes += 2;
        }
        if mask & 0x80 != 0 {
            self.regs.pc = self.pull16_s(bus);
            bytes += 2;
        }
        bytes
    }

    /// PSHU/PULU mirror PSHS/PULS with the stacks swapped: bit 6 moves
    /// the hardware stack pointer S.
    fn push_set_u(&mut self, bus: &mut impl Bus, mask: u8) -> u32 {
        let mut bytes = 0;
        if mask & 0x80 != 0 {
            self.push16_u(bus, self.regs.pc);
            bytes += 2;
        }
        if mask & 0x40 != 0 {
            self.push16_u(bus, self.regs.s);
            bytes += 2;
        }
        if mask & 0x20 != 0 {
            self.push16_u(bus, self.regs.y);
            bytes += 2;
        }
        if mask & 0x10 != 0 {
            self.push16_u(bus, self.regs.x);
            bytes += 2;
        }
        if mask & 0x08 != 0 {
            self.push8_u(bus, self.regs.dp);
            bytes += 1;
        }
        if mask & 0x04 != 0 {
            self.push8_u(bus, self.regs.b);
            bytes += 1;
        }
        if mask & 0x02 != 0 {
            self.push8_u(bus, self.regs.a);
            bytes += 1;
        }
        if mask & 0x01 != 0 {
            self.push8_u(bus, self.regs.cc);
            bytes += 1;
        }
        bytes
    }

    fn pull_set_u(&mut self, bus: &mut impl Bus, mask: u8) -> u32 {
        let mut bytes = 0;
        if mask & 0x01 != 0 {
            self.regs.cc = self.pull8_u(bus);
            bytes += 1;
        }
        if mask & 0x02 != 0 {
            self.regs.a = self.pull8_u(bus);
            bytes += 1;
        }
        if mask & 0x04 != 0 {
            self.regs.b = self.pull8_u(bus);
            bytes += 1;
        }
        if mask & 0x08 != 0 {
            self.regs.dp = self.pull8_u(bus);
            bytes += 1;
        }
        if mask & 0x10 != 0 {
            self.regs.x = self.pull16_u(bus);
            bytes += 2;
        }
        if mask & 0x20 != 0 {
            self.regs.y = self.pull16_u(bus);
            bytes += 2;
        }
        if mask & 0x40 != 0 {
            self.regs.s = self.pull16_u(bus);
            bytes += 2;
        }
        if mask & 0x80 != 0 {
            self.regs.pc = self.pull16_u(bus);
            bytes += 2;
        }
        bytes
    }
}
