//! Core traits and types shared by the CPU and machine crates.
//!
//! Everything counts time in CPU clock ticks. All component timing
//! derives from the tick budgets the host passes in. No exceptions.

mod bus;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use ticks::Ticks;
