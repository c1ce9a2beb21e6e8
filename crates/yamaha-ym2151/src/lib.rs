//! Yamaha YM2151 (OPM) FM synthesis chip emulator.
//!
//! Eight channels of four operators each, two hardware timers, and a
//! register-select/data write port. The chip runs at its own crystal
//! rate (nominally 3.579545 MHz); `advance(cycles)` drives everything,
//! producing one internal sample every 64 chip cycles and downsampling
//! into an output buffer the owner drains with `take_buffer()`.
//!
//! The FM core is a straightforward phase-modulation model: exact
//! per-die envelope curves, LFO and noise are simplified (LFO and
//! noise registers are stored but do not modulate), which is plenty
//! for the sound-board protocol and timer behavior games depend on.
//!
//! # Register map (selected via the address port)
//!
//! | Reg       | Function                                    |
//! |-----------|---------------------------------------------|
//! | $08       | Key on/off: op mask bits 6-3, channel 2-0   |
//! | $0F       | Noise enable/frequency                      |
//! | $10/$11   | Timer A period (10 bit)                     |
//! | $12       | Timer B period (8 bit)                      |
//! | $14       | Timer control: run, IRQ enable, flag reset  |
//! | $18-$1B   | LFO (stored only)                           |
//! | $20-$27   | Per channel: RL, feedback, algorithm        |
//! | $28-$2F   | Key code (octave + note)                    |
//! | $30-$37   | Key fraction                                |
//! | $38-$3F   | PMS/AMS (stored only)                       |
//! | $40-$5F   | Per op: DT1/MUL                             |
//! | $60-$7F   | Per op: total level                         |
//! | $80-$9F   | Per op: KS/attack rate                      |
//! | $A0-$BF   | Per op: AMS-EN/decay-1 rate                 |
//! | $C0-$DF   | Per op: DT2/decay-2 rate                    |
//! | $E0-$FF   | Per op: D1L/release rate                    |

use std::sync::OnceLock;

mod envelope;
mod operator;
mod timer;

pub use envelope::{Envelope, SILENT, Stage};
pub use operator::Operator;
pub use timer::Timers;

/// Nominal OPM crystal on the WPC sound board.
pub const YM2151_CLOCK_HZ: u32 = 3_579_545;

/// Chip cycles per internal FM sample.
const CYCLES_PER_SAMPLE: u32 = 64;

/// Chip cycles the busy flag stays up after a data write.
const BUSY_CYCLES: u32 = 64;

fn sine_table() -> &'static [f32; 1024] {
    static TABLE: OnceLock<[f32; 1024]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0f32; 1024];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = (i as f32 / 1024.0 * core::f32::consts::TAU).sin();
        }
        table
    })
}

/// One FM channel: four operators in register-bank order M1 M2 C1 C2.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Channel {
    key_code: u8,
    key_fraction: u8,
    algorithm: u8,
    feedback: u8,
    /// RL output-enable bits ($20 bits 6-7). Mono mix, stored only.
    rl: u8,
    /// PMS/AMS sensitivity, stored only.
    pms_ams: u8,
    ops: [Operator; 4],
    /// Last two M1 outputs for the feedback path.
    fb_prev: [f32; 2],
}

impl Channel {
    fn refresh_frequencies(&mut self, clock_hz: u32) {
        for op in &mut self.ops {
            op.set_frequency(self.key_code, self.key_fraction, clock_hz);
        }
    }

    /// Produce one chip-rate sample for this channel.
    fn sample(&mut self, sine: &[f32; 1024]) -> f32 {
        for op in &mut self.ops {
            op.step_phase();
            op.env.clock();
        }

        // phase-modulation depth in sine-table index units
        let pm = |x: f32| (x * 512.0) as i32;

        let fb_in = if self.feedback == 0 {
            0
        } else {
            let avg = (self.fb_prev[0] + self.fb_prev[1]) * 0.5;
            pm(avg * f32::from(1u8 << (self.feedback - 1)) / 16.0)
        };

        let m1 = self.ops[0].output(fb_in, sine);
        self.fb_prev = [self.fb_prev[1], m1];

        let m2 = &self.ops[1];
        let c1 = &self.ops[2];
        let c2 = &self.ops[3];

        match self.algorithm & 0x07 {
            0 => {
                let c1o = c1.output(pm(m1), sine);
                let m2o = m2.output(pm(c1o), sine);
                c2.output(pm(m2o), sine)
            }
            1 => {
                let c1o = c1.output(0, sine);
                let m2o = m2.output(pm(m1 + c1o), sine);
                c2.output(pm(m2o), sine)
            }
            2 => {
                let c1o = c1.output(0, sine);
                let m2o = m2.output(pm(c1o), sine);
                c2.output(pm(m1 + m2o), sine)
            }
            3 => {
                let c1o = c1.output(pm(m1), sine);
                let m2o = m2.output(0, sine);
                c2.output(pm(c1o + m2o), sine)
            }
            4 => c1.output(pm(m1), sine) + c2.output(pm(m2.output(0, sine)), sine),
            5 => {
                c1.output(pm(m1), sine)
                    + m2.output(pm(m1), sine)
                    + c2.output(pm(m1), sine)
            }
            6 => c1.output(pm(m1), sine) + m2.output(0, sine) + c2.output(0, sine),
            _ => m1 + c1.output(0, sine) + m2.output(0, sine) + c2.output(0, sine),
        }
    }
}

/// Yamaha YM2151.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ym2151 {
    clock_hz: u32,
    /// Register index latched by the address port.
    selected: u8,
    channels: [Channel; 8],
    pub timers: Timers,
    /// Chip cycles until the busy flag drops.
    busy: u32,

    /// Noise and LFO registers, stored for readback/diagnostics.
    noise: u8,
    lfo_frequency: u8,
    lfo_depth: u8,
    lfo_waveform: u8,

    // Downsampling state
    cycle_accum: u32,
    accumulator: f32,
    accum_count: f32,
    chip_samples_per_output: f32,
    buffer: Vec<f32>,
}

impl Ym2151 {
    /// Create a chip running at `clock_hz`, downsampling its internal
    /// chip-rate output (clock/64) to `sample_rate` Hz.
    #[must_use]
    pub fn new(clock_hz: u32, sample_rate: u32) -> Self {
        Self {
            clock_hz,
            selected: 0,
            channels: Default::default(),
            timers: Timers::new(),
            busy: 0,
            noise: 0,
            lfo_frequency: 0,
            lfo_depth: 0,
            lfo_waveform: 0,
            cycle_accum: 0,
            accumulator: 0.0,
            accum_count: 0.0,
            chip_samples_per_output: (clock_hz as f32 / 64.0) / sample_rate as f32,
            buffer: Vec::new(),
        }
    }

    /// Reset to power-on state. The output sample rate is retained.
    pub fn reset(&mut self) {
        let rate = self.chip_samples_per_output;
        let clock = self.clock_hz;
        *self = Self::new(clock, 1);
        self.chip_samples_per_output = rate;
    }

    /// Address port write: latch the register index for `write_data`.
    pub fn select_register(&mut self, index: u8) {
        self.selected = index;
    }

    /// Data port write to the latched register. Raises the busy flag
    /// for 64 chip cycles.
    pub fn write_data(&mut self, value: u8) {
        self.apply(self.selected, value);
        self.busy = BUSY_CYCLES;
    }

    /// Status register: bit 0 timer A, bit 1 timer B, bit 7 busy.
    #[must_use]
    pub fn status(&self) -> u8 {
        self.timers.status_bits() | if self.busy > 0 { 0x80 } else { 0 }
    }

    /// True when an enabled timer overflow is pending (the chip's IRQ
    /// pin).
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.timers.irq_pending()
    }

    /// Drain the output buffer.
    pub fn take_buffer(&mut self) -> Vec<f32> {
        core::mem::take(&mut self.buffer)
    }

    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Advance the chip by `cycles` chip-clock cycles: timers, busy
    /// countdown, FM synthesis and downsampling.
    pub fn advance(&mut self, cycles: u32) {
        self.timers.advance(cycles);
        self.busy = self.busy.saturating_sub(cycles);

        self.cycle_accum += cycles;
        let sine = sine_table();
        while self.cycle_accum >= CYCLES_PER_SAMPLE {
            self.cycle_accum -= CYCLES_PER_SAMPLE;

            let mut mix = 0.0;
            for channel in &mut self.channels {
                mix += channel.sample(sine);
            }
            let sample = (mix / 8.0).clamp(-1.0, 1.0);

            self.accumulator += sample;
            self.accum_count += 1.0;
            if self.accum_count >= self.chip_samples_per_output {
                self.buffer.push(self.accumulator / self.accum_count);
                self.accumulator = 0.0;
                self.accum_count -= self.chip_samples_per_output;
            }
        }
    }

    fn apply(&mut self, reg: u8, value: u8) {
        match reg {
            0x01 => {} // test register
            0x08 => {
                let channel = &mut self.channels[usize::from(value & 0x07)];
                // op mask in M1 C1 M2 C2 bit order; ops stored M1 M2 C1 C2
                for (bit, op) in [(3u8, 0usize), (4, 2), (5, 1), (6, 3)] {
                    if value & (1 << bit) != 0 {
                        channel.ops[op].env.key_on();
                    } else {
                        channel.ops[op].env.key_off();
                    }
                }
            }
            0x0F => self.noise = value,
            0x10 => {
                self.timers.period_a = (self.timers.period_a & 0x003)
                    | (u16::from(value) << 2);
            }
            0x11 => {
                self.timers.period_a =
                    (self.timers.period_a & 0x3FC) | u16::from(value & 0x03);
            }
            0x12 => self.timers.period_b = value,
            0x14 => self.timers.write_control(value),
            0x18 => self.lfo_frequency = value,
            0x19 => self.lfo_depth = value,
            0x1B => self.lfo_waveform = value,

            0x20..=0x27 => {
                let channel = &mut self.channels[usize::from(reg & 0x07)];
                channel.algorithm = value & 0x07;
                channel.feedback = (value >> 3) & 0x07;
                channel.rl = value >> 6;
            }
            0x28..=0x2F => {
                let channel = &mut self.channels[usize::from(reg & 0x07)];
                channel.key_code = value & 0x7F;
                channel.refresh_frequencies(self.clock_hz);
            }
            0x30..=0x37 => {
                let channel = &mut self.channels[usize::from(reg & 0x07)];
                channel.key_fraction = value;
                channel.refresh_frequencies(self.clock_hz);
            }
            0x38..=0x3F => {
                self.channels[usize::from(reg & 0x07)].pms_ams = value;
            }

            0x40..=0xFF => {
                let ch = usize::from(reg & 0x07);
                let slot = usize::from((reg >> 3) & 0x03);
                let clock = self.clock_hz;
                let channel = &mut self.channels[ch];
                let kc = channel.key_code;
                let kf = channel.key_fraction;
                let op = &mut channel.ops[slot];
                match reg & 0xE0 {
                    0x40 => {
                        op.dt1 = (value >> 4) & 0x07;
                        op.mul = value & 0x0F;
                        op.set_frequency(kc, kf, clock);
                    }
                    0x60 => op.total_level = value & 0x7F,
                    0x80 => {
                        op.key_scale = value >> 6;
                        op.env.attack_rate = value & 0x1F;
                    }
                    0xA0 => op.env.decay1_rate = value & 0x1F,
                    0xC0 => {
                        op.dt2 = value >> 6;
                        op.env.decay2_rate = value & 0x1F;
                        op.set_frequency(kc, kf, clock);
                    }
                    _ => {
                        op.env.set_decay1_level(value >> 4);
                        op.env.release_rate = (value & 0x0F) * 2 + 1;
                    }
                }
            }

            _ => {} // $00, $02-$07, $09-$0E, $13, $15-$17, $1A, $1C-$1F
        }
    }
}
