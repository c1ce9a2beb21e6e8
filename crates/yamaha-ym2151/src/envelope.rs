//! FM operator envelope generator.
//!
//! Four-stage attenuation stepper: Attack ramps attenuation down to 0,
//! Decay1 raises it to the D1L sustain level, Decay2 creeps toward
//! silence, Release runs after key-off. Attenuation is a 10-bit value
//! (0 = full level, 1023 = silent), clocked once per chip-rate sample.
//! Integer state only, so two runs step identically.

/// Envelope stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    Attack,
    Decay1,
    Decay2,
    #[default]
    Release,
}

/// Maximum (silent) attenuation.
pub const SILENT: u16 = 1023;

/// Envelope clocks between steps for a 5-bit rate. Rate 0 disables the
/// stage; each rate pair halves the period down to every clock.
fn rate_period(rate: u8) -> u32 {
    if rate == 0 {
        return 0;
    }
    (8192 >> (rate / 2).min(13)).max(1)
}

/// ADSR envelope for one FM operator.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    pub stage: Stage,
    /// Current attenuation, 0..=1023.
    pub attenuation: u16,
    counter: u32,
    keyed: bool,

    /// 5-bit rates decoded from the operator registers.
    pub attack_rate: u8,
    pub decay1_rate: u8,
    pub decay2_rate: u8,
    pub release_rate: u8,
    /// Decay1 target attenuation (D1L nibble scaled; 15 means silent).
    pub decay1_level: u16,
}

/// Power-on state: released at full attenuation, so an operator is
/// inaudible until it is keyed on.
impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: Stage::Release,
            attenuation: SILENT,
            counter: 0,
            keyed: false,
            attack_rate: 0,
            decay1_rate: 0,
            decay2_rate: 0,
            release_rate: 0,
            decay1_level: 0,
        }
    }

    /// D1L register nibble to target attenuation. Level 15 jumps to
    /// full silence per the datasheet.
    pub fn set_decay1_level(&mut self, nibble: u8) {
        self.decay1_level = if nibble == 15 {
            SILENT
        } else {
            u16::from(nibble) << 5
        };
    }

    pub fn key_on(&mut self) {
        if !self.keyed {
            self.keyed = true;
            self.stage = Stage::Attack;
            self.counter = 0;
        }
    }

    pub fn key_off(&mut self) {
        if self.keyed {
            self.keyed = false;
            self.stage = Stage::Release;
            self.counter = 0;
        }
    }

    /// Current output level, 0..=1023 (inverse of attenuation).
    #[must_use]
    pub fn level(&self) -> u16 {
        SILENT - self.attenuation
    }

    /// Clock the envelope once per chip-rate sample.
    pub fn clock(&mut self) {
        let rate = match self.stage {
            Stage::Attack => self.attack_rate,
            Stage::Decay1 => self.decay1_rate,
            Stage::Decay2 => self.decay2_rate,
            Stage::Release => self.release_rate,
        };
        let period = rate_period(rate);
        if period == 0 {
            return;
        }

        self.counter += 1;
        if self.counter < period {
            return;
        }
        self.counter = 0;

        match self.stage {
            Stage::Attack => {
                // Exponential approach: big steps far from full level
                let step = (self.attenuation >> 3) + 1;
                self.attenuation = self.attenuation.saturating_sub(step);
                if self.attenuation == 0 {
                    self.stage = Stage::Decay1;
                }
            }
            Stage::Decay1 => {
                self.attenuation = (self.attenuation + 8).min(SILENT);
                if self.attenuation >= self.decay1_level {
                    self.stage = Stage::Decay2;
                }
            }
            Stage::Decay2 => {
                self.attenuation = (self.attenuation + 1).min(SILENT);
            }
            Stage::Release => {
                self.attenuation = (self.attenuation + 8).min(SILENT);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_reaches_full_level() {
        let mut env = Envelope::new();
        env.attack_rate = 31;
        env.decay1_rate = 0;
        env.set_decay1_level(4);
        env.key_on();

        for _ in 0..200 {
            env.clock();
        }

        assert_eq!(env.level(), SILENT);
        assert_eq!(env.stage, Stage::Decay1);
    }

    #[test]
    fn decay1_stops_at_sustain_level() {
        let mut env = Envelope::new();
        env.attack_rate = 31;
        env.decay1_rate = 31;
        env.decay2_rate = 0;
        env.set_decay1_level(4); // attenuation target 128
        env.key_on();

        for _ in 0..2000 {
            env.clock();
        }

        assert_eq!(env.stage, Stage::Decay2);
        assert!(env.attenuation >= 128);
        assert!(env.attenuation < 160, "decay2 disabled holds near D1L");
    }

    #[test]
    fn release_fades_to_silence() {
        let mut env = Envelope::new();
        env.attack_rate = 31;
        env.release_rate = 31;
        env.key_on();
        for _ in 0..200 {
            env.clock();
        }
        assert!(env.level() > 0);

        env.key_off();
        for _ in 0..2000 {
            env.clock();
        }

        assert_eq!(env.level(), 0);
        assert_eq!(env.stage, Stage::Release);
    }

    #[test]
    fn powers_on_silent() {
        let env = Envelope::default();
        assert_eq!(env.attenuation, SILENT);
        assert_eq!(env.stage, Stage::Release);
        assert_eq!(env.level(), 0);
    }

    #[test]
    fn zero_rate_holds_state() {
        let mut env = Envelope::new();
        env.attack_rate = 0;
        env.key_on();
        for _ in 0..1000 {
            env.clock();
        }
        assert_eq!(env.attenuation, SILENT, "rate 0 never steps");
    }
}
