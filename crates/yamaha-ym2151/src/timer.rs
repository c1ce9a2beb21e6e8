//! YM2151 hardware timers A and B.
//!
//! Timer A is a 10-bit up counter clocked every 64 chip cycles; timer B
//! is 8-bit clocked every 1024. Both reload on overflow and set their
//! status flag; the flag raises the chip IRQ line when enabled via the
//! control register ($14).

/// The two YM2151 timers plus their control state.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timers {
    /// Timer A period (10-bit, $10 high / $11 low). Counts (1024 - n)
    /// steps of 64 chip cycles.
    pub period_a: u16,
    /// Timer B period (8-bit, $12). Counts (256 - n) steps of 1024
    /// chip cycles.
    pub period_b: u8,

    /// Overflow flags, readable in the status register.
    pub flag_a: bool,
    pub flag_b: bool,

    running_a: bool,
    running_b: bool,
    irq_enable_a: bool,
    irq_enable_b: bool,

    /// Remaining chip cycles until the next overflow.
    counter_a: u32,
    counter_b: u32,
}

impl Timers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reload_a(&self) -> u32 {
        (1024 - u32::from(self.period_a & 0x3FF)) * 64
    }

    fn reload_b(&self) -> u32 {
        (256 - u32::from(self.period_b)) * 1024
    }

    /// Control register $14: bits 0/1 start timers, bits 2/3 enable
    /// their IRQ, bits 4/5 clear the overflow flags.
    pub fn write_control(&mut self, value: u8) {
        if value & 0x01 != 0 {
            if !self.running_a {
                self.counter_a = self.reload_a();
            }
            self.running_a = true;
        } else {
            self.running_a = false;
        }
        if value & 0x02 != 0 {
            if !self.running_b {
                self.counter_b = self.reload_b();
            }
            self.running_b = true;
        } else {
            self.running_b = false;
        }

        self.irq_enable_a = value & 0x04 != 0;
        self.irq_enable_b = value & 0x08 != 0;

        if value & 0x10 != 0 {
            self.flag_a = false;
        }
        if value & 0x20 != 0 {
            self.flag_b = false;
        }
    }

    /// Advance both timers by `cycles` chip cycles.
    pub fn advance(&mut self, cycles: u32) {
        if self.running_a {
            let mut remaining = cycles;
            while remaining >= self.counter_a {
                remaining -= self.counter_a;
                self.flag_a = true;
                self.counter_a = self.reload_a();
            }
            self.counter_a -= remaining;
        }
        if self.running_b {
            let mut remaining = cycles;
            while remaining >= self.counter_b {
                remaining -= self.counter_b;
                self.flag_b = true;
                self.counter_b = self.reload_b();
            }
            self.counter_b -= remaining;
        }
    }

    /// Status register bits: bit 0 = timer A overflow, bit 1 = timer B.
    #[must_use]
    pub fn status_bits(&self) -> u8 {
        u8::from(self.flag_a) | u8::from(self.flag_b) << 1
    }

    /// True when an enabled timer has overflowed (the chip IRQ line).
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        (self.flag_a && self.irq_enable_a) || (self.flag_b && self.irq_enable_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_a_overflows_after_period() {
        let mut t = Timers::new();
        t.period_a = 1023; // shortest period: 1 step of 64 cycles
        t.write_control(0x05); // start A, enable A IRQ

        t.advance(63);
        assert!(!t.flag_a);
        t.advance(1);
        assert!(t.flag_a);
        assert!(t.irq_pending());
    }

    #[test]
    fn flag_clears_via_control_write() {
        let mut t = Timers::new();
        t.period_a = 1023;
        t.write_control(0x01);
        t.advance(64);
        assert!(t.flag_a);

        t.write_control(0x11); // keep running, clear flag A
        assert!(!t.flag_a);
        assert_eq!(t.status_bits(), 0);
    }

    #[test]
    fn timer_b_uses_1024_prescale() {
        let mut t = Timers::new();
        t.period_b = 255;
        t.write_control(0x02);

        t.advance(1023);
        assert!(!t.flag_b);
        t.advance(1);
        assert!(t.flag_b);
        assert_eq!(t.status_bits(), 0x02);
    }

    #[test]
    fn disabled_timer_never_fires() {
        let mut t = Timers::new();
        t.period_a = 1023;
        t.advance(1_000_000);
        assert!(!t.flag_a);
    }
}
