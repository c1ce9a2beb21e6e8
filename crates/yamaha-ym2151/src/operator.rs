//! FM operator: phase generator plus envelope.
//!
//! The phase accumulator is 10.22 fixed point: the top ten bits index
//! the sine table, modulation inputs add in index units. Frequency is
//! derived from the channel key code (KC/KF) and the operator's
//! DT1/DT2/MUL parameters at register-write time.

use crate::envelope::{Envelope, SILENT};

/// DT2 gross-detune frequency multipliers.
const DT2_FACTOR: [f64; 4] = [1.0, 1.41, 1.57, 1.73];

/// One of the four operators in an FM channel.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Operator {
    /// Phase accumulator (10.22 fixed point).
    pub phase: u32,
    /// Per-sample phase increment.
    pub phase_inc: u32,

    /// Fine detune ($40-$5F bits 4-6): bit 2 is the sign.
    pub dt1: u8,
    /// Phase multiply ($40-$5F bits 0-3): 0 acts as 0.5.
    pub mul: u8,
    /// Total level ($60-$7F): 7-bit attenuation, 0 loudest.
    pub total_level: u8,
    /// Key scaling ($80-$9F bits 6-7). Stored, not applied to rates.
    pub key_scale: u8,
    /// Gross detune ($C0-$DF bits 6-7).
    pub dt2: u8,

    pub env: Envelope,
}

impl Operator {
    /// Recompute the phase increment from the channel key code and this
    /// operator's detune/multiply parameters.
    ///
    /// KC packs octave (bits 4-6) and note (bits 0-3, every fourth code
    /// a repeat); KF is a 6-bit fraction of a semitone. KC $4A is
    /// concert A (440 Hz) at the nominal 3.579545 MHz clock.
    pub fn set_frequency(&mut self, kc: u8, kf: u8, clock_hz: u32) {
        let octave = f64::from((kc >> 4) & 0x07);
        let note = kc & 0x0F;
        let semitone = f64::from(note - note / 4);
        let fraction = f64::from(kf >> 2) / 64.0;

        // semitone index relative to KC $4A (octave 4, semitone 8)
        let index = octave * 12.0 + semitone + fraction - 56.0;
        let mut freq = 440.0 * (index / 12.0).exp2();

        freq *= DT2_FACTOR[usize::from(self.dt2 & 0x03)];
        freq *= if self.mul == 0 {
            0.5
        } else {
            f64::from(self.mul)
        };
        // DT1: a few cents up or down
        let detune = f64::from(self.dt1 & 0x03) * 0.0006;
        freq *= if self.dt1 & 0x04 != 0 {
            1.0 - detune
        } else {
            1.0 + detune
        };

        // chip sample rate = clock / 64; scale to the nominal crystal
        let sample_rate = f64::from(clock_hz) / 64.0;
        self.phase_inc = (freq / sample_rate * f64::from(1u32 << 22) * 1024.0) as u32;
    }

    /// Advance the phase by one chip-rate sample.
    pub fn step_phase(&mut self) {
        self.phase = self.phase.wrapping_add(self.phase_inc);
    }

    /// Operator output for this sample given a phase-modulation input
    /// (in sine-table index units), scaled by envelope and total level.
    #[must_use]
    pub fn output(&self, modulation: i32, sine: &[f32; 1024]) -> f32 {
        let index = ((self.phase >> 22) as i32 + modulation) & 0x3FF;
        let level = f32::from(self.env.level()) / f32::from(SILENT);
        let tl = f32::from(127 - (self.total_level & 0x7F)) / 127.0;
        sine[index as usize] * level * tl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concert_a_phase_increment() {
        let mut op = Operator {
            mul: 1,
            ..Operator::default()
        };
        op.set_frequency(0x4A, 0, 3_579_545);

        // 440 Hz at a ~55930 Hz sample rate: ~8 table steps per sample
        let steps_per_sample =
            f64::from(op.phase_inc) / f64::from(1u32 << 22);
        let freq = steps_per_sample / 1024.0 * (3_579_545.0 / 64.0);
        assert!((freq - 440.0).abs() < 1.0, "expected ~440 Hz, got {freq}");
    }

    #[test]
    fn octave_doubles_frequency() {
        let mut low = Operator {
            mul: 1,
            ..Operator::default()
        };
        let mut high = low.clone();
        low.set_frequency(0x3A, 0, 3_579_545);
        high.set_frequency(0x4A, 0, 3_579_545);

        let ratio = f64::from(high.phase_inc) / f64::from(low.phase_inc);
        assert!((ratio - 2.0).abs() < 0.01);
    }

    #[test]
    fn mul_zero_halves() {
        let mut whole = Operator {
            mul: 1,
            ..Operator::default()
        };
        let mut half = Operator {
            mul: 0,
            ..Operator::default()
        };
        whole.set_frequency(0x4A, 0, 3_579_545);
        half.set_frequency(0x4A, 0, 3_579_545);

        let ratio = f64::from(whole.phase_inc) / f64::from(half.phase_inc);
        assert!((ratio - 2.0).abs() < 0.001);
    }
}
