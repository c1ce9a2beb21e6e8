//! Instruction-stepped Motorola MC6809 CPU emulator.
//!
//! Each call to `step()` executes one whole instruction (or services one
//! pending interrupt) and returns the documented cycle count. Instructions
//! are never split mid-opcode; `steps(n)` runs until at least `n` cycles
//! have elapsed and reports the exact count consumed.
//!
//! The CPU knows nothing about what is mapped where: all memory traffic
//! goes through the `emu_core::Bus` the caller passes in.

mod alu;
mod cpu;
mod flags;
mod registers;

pub use cpu::{CpuError, Mc6809};
pub use flags::{CF, EF, FF, HF, IF, NF, VF, ZF};
pub use registers::Registers;
