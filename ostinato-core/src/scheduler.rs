//! Scheduler state and the per-tick timing/humanization math.
//!
//! The functions here are pure apart from their random draws; the
//! [`Arpeggiator`](crate::Arpeggiator) sequences them in a fixed order:
//! jitter, drunk walk, probability, random octave, velocity, gate.

use ostinato_types::ArpeggiatorConfig;

use crate::random::RandomSource;
use crate::timer::TimerHandle;

/// Floor for the delay until the next tick.
pub const MIN_TICK_MS: f64 = 10.0;
/// Floor for a humanized gate.
pub const MIN_GATE_MS: f64 = 10.0;

const DRUNK_STEP_SCALE: f64 = 0.3;
const DRUNK_DECAY: f64 = 0.95;

#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    pub running: bool,
    pub current_step: usize,
    pub drunk_accumulator_ms: f64,
    /// The one outstanding tick while running.
    pub(crate) tick: Option<TimerHandle>,
}

impl SchedulerState {
    pub(crate) fn reset(&mut self) {
        self.current_step = 0;
        self.drunk_accumulator_ms = 0.0;
    }
}

/// Timing of one tick, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTiming {
    pub step_ms: f64,
    pub swing_offset_ms: f64,
    pub jitter_ms: f64,
}

impl StepTiming {
    pub fn next_delay_ms(&self) -> f64 {
        (self.step_ms + self.swing_offset_ms + self.jitter_ms).max(MIN_TICK_MS)
    }
}

/// Swing pushes odd steps by up to half a step.
pub fn swing_offset_ms(step_ms: f64, step: usize, swing_percent: f32) -> f64 {
    if step % 2 == 1 && swing_percent != 0.0 {
        step_ms * (swing_percent as f64 / 100.0) * 0.5
    } else {
        0.0
    }
}

/// Step duration plus swing and humanized jitter for `step`.
///
/// With `drunk` on, the accumulator performs a decaying random walk whose
/// value is added on top of the independent Gaussian jitter.
pub fn step_timing<R: RandomSource + ?Sized>(
    config: &ArpeggiatorConfig,
    bpm: f32,
    step: usize,
    drunk_accumulator_ms: &mut f64,
    rng: &mut R,
) -> StepTiming {
    let step_ms = config.rate.step_ms(bpm);
    let swing_offset_ms = swing_offset_ms(step_ms, step, config.swing_percent);
    let jitter_range = config.timing_jitter_ms as f64;

    let mut jitter_ms = 0.0;
    if jitter_range > 0.0 {
        jitter_ms = rng.gaussian() * jitter_range * 0.5;
    }
    if config.drunk {
        *drunk_accumulator_ms += rng.uniform(-0.5, 0.5) * jitter_range * DRUNK_STEP_SCALE;
        *drunk_accumulator_ms *= DRUNK_DECAY;
        jitter_ms += *drunk_accumulator_ms;
    }

    StepTiming {
        step_ms,
        swing_offset_ms,
        jitter_ms,
    }
}

/// Probability gate. At 100% no draw is consumed.
pub fn should_play<R: RandomSource + ?Sized>(probability_percent: f32, rng: &mut R) -> bool {
    if probability_percent >= 100.0 {
        return true;
    }
    rng.percent() < probability_percent as f64
}

/// Random octave displacement: 0, or one of -12/0/+12 chosen uniformly when
/// the chance roll succeeds.
pub fn octave_shift<R: RandomSource + ?Sized>(chance_percent: f32, rng: &mut R) -> i16 {
    if chance_percent <= 0.0 {
        return 0;
    }
    if rng.percent() < chance_percent as f64 {
        [-12, 0, 12][rng.index(3)]
    } else {
        0
    }
}

pub fn humanized_velocity<R: RandomSource + ?Sized>(base: u8, spread_percent: f32, rng: &mut R) -> u8 {
    if spread_percent <= 0.0 {
        return base.clamp(1, 127);
    }
    let base_f = base as f64;
    let varied = base_f + rng.bipolar() * (spread_percent as f64 / 100.0) * base_f;
    varied.round().clamp(1.0, 127.0) as u8
}

/// Gate length for one note. Spread is applied around the nominal gate and
/// clamped to `[MIN_GATE_MS, 2 * step_ms]`.
pub fn gate_ms<R: RandomSource + ?Sized>(
    step_ms: f64,
    gate_percent: f32,
    spread_percent: f32,
    rng: &mut R,
) -> f64 {
    let gate = step_ms * (gate_percent as f64 / 100.0);
    if spread_percent <= 0.0 {
        return gate;
    }
    let varied = gate + rng.bipolar() * (spread_percent as f64 / 100.0) * gate;
    varied.clamp(MIN_GATE_MS, step_ms * 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use ostinato_types::ArpRate;

    fn eighths() -> ArpeggiatorConfig {
        ArpeggiatorConfig {
            rate: ArpRate::Eighth,
            ..Default::default()
        }
    }

    #[test]
    fn plain_timing_is_one_step() {
        let mut rng = ScriptedRandom::constant(0.3);
        let mut drunk = 0.0;
        let t = step_timing(&eighths(), 120.0, 0, &mut drunk, &mut rng);
        assert_eq!(t.step_ms, 250.0);
        assert_eq!(t.next_delay_ms(), 250.0);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn swing_only_on_odd_steps() {
        assert_eq!(swing_offset_ms(250.0, 0, 50.0), 0.0);
        assert_eq!(swing_offset_ms(250.0, 1, 50.0), 62.5);
        assert_eq!(swing_offset_ms(250.0, 3, -50.0), -62.5);
        assert_eq!(swing_offset_ms(250.0, 1, 0.0), 0.0);
    }

    #[test]
    fn jitter_scales_gaussian_by_half_range() {
        let config = ArpeggiatorConfig {
            timing_jitter_ms: 20.0,
            ..eighths()
        };
        // gaussian = 1.0 for u1 = e^-0.5, u2 = 0.
        let mut rng = ScriptedRandom::new(vec![(-0.5f64).exp(), 0.0]);
        let mut drunk = 0.0;
        let t = step_timing(&config, 120.0, 0, &mut drunk, &mut rng);
        assert!((t.jitter_ms - 10.0).abs() < 1e-9);
        assert_eq!(rng.draws(), 2);
    }

    #[test]
    fn drunk_walk_accumulates_and_decays() {
        let config = ArpeggiatorConfig {
            timing_jitter_ms: 10.0,
            drunk: true,
            ..eighths()
        };
        // Each tick: two gaussian draws (u2 = 0.25 gives 0), then one drunk draw of 1.0.
        let mut rng = ScriptedRandom::new(vec![0.5, 0.25, 1.0]);
        let mut drunk = 0.0;
        let first = step_timing(&config, 120.0, 0, &mut drunk, &mut rng);
        let step = (0.5 - f64::EPSILON) * 10.0 * 0.3;
        assert!((drunk - step * 0.95).abs() < 1e-9);
        assert!((first.jitter_ms - drunk).abs() < 1e-9);

        let _ = step_timing(&config, 120.0, 1, &mut drunk, &mut rng);
        assert!((drunk - (step * 0.95 + step) * 0.95).abs() < 1e-9);
    }

    #[test]
    fn delay_has_a_floor() {
        let t = StepTiming {
            step_ms: 20.0,
            swing_offset_ms: -5.0,
            jitter_ms: -40.0,
        };
        assert_eq!(t.next_delay_ms(), MIN_TICK_MS);
    }

    #[test]
    fn probability_extremes() {
        let mut rng = ScriptedRandom::constant(0.0);
        assert!(!should_play(0.0, &mut rng));
        assert!(should_play(100.0, &mut rng));
        assert_eq!(rng.draws(), 1);
        let mut rng = ScriptedRandom::constant(0.49);
        assert!(should_play(50.0, &mut rng));
        let mut rng = ScriptedRandom::constant(0.51);
        assert!(!should_play(50.0, &mut rng));
    }

    #[test]
    fn octave_shift_choices() {
        let mut rng = ScriptedRandom::new(vec![0.0, 0.0]);
        assert_eq!(octave_shift(50.0, &mut rng), -12);
        let mut rng = ScriptedRandom::new(vec![0.0, 0.9]);
        assert_eq!(octave_shift(50.0, &mut rng), 12);
        let mut rng = ScriptedRandom::new(vec![0.9]);
        assert_eq!(octave_shift(50.0, &mut rng), 0);
        assert_eq!(rng.draws(), 1);
        assert_eq!(octave_shift(0.0, &mut rng), 0);
        assert_eq!(rng.draws(), 1);
    }

    #[test]
    fn velocity_spread_and_clamp() {
        let mut rng = ScriptedRandom::constant(0.75); // bipolar 0.5
        assert_eq!(humanized_velocity(100, 20.0, &mut rng), 110);
        let mut rng = ScriptedRandom::constant(0.0); // bipolar -1
        assert_eq!(humanized_velocity(100, 50.0, &mut rng), 50);
        let mut rng = ScriptedRandom::constant(1.0);
        assert_eq!(humanized_velocity(120, 50.0, &mut rng), 127);
        assert_eq!(humanized_velocity(90, 0.0, &mut rng), 90);
    }

    #[test]
    fn gate_nominal_and_spread() {
        let mut rng = ScriptedRandom::constant(0.0);
        assert_eq!(gate_ms(250.0, 100.0, 0.0, &mut rng), 250.0);
        assert_eq!(rng.draws(), 0);
        assert_eq!(gate_ms(250.0, 100.0, 50.0, &mut rng), 125.0);
        let mut rng = ScriptedRandom::constant(1.0);
        assert!((gate_ms(250.0, 200.0, 50.0, &mut rng) - 500.0).abs() < 1e-6);
        let mut rng = ScriptedRandom::constant(0.0);
        assert_eq!(gate_ms(20.0, 10.0, 50.0, &mut rng), MIN_GATE_MS);
    }
}
