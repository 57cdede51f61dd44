//! The arpeggiator: parameter surface, transport API and the tick scheduler.
//!
//! Everything runs on the caller's thread. Deferred work (future ticks,
//! pending note-offs) lives in a [`TimerQueue`] on a virtual millisecond
//! clock that the host drives with [`Arpeggiator::advance_to`].
//!
//! Invariants:
//! - at most one tick timer is pending, and only while running;
//! - at most one note-off timer is pending per sounding note;
//! - leaving the running state cancels every timer and sends a note-off for
//!   every sounding note.

use ostinato_types::{
    clamp_bpm, clamp_octaves, clamp_to, ArpMode, ArpRate, ArpeggiatorConfig, ArpeggiatorPatch,
    HeldNote, OctaveMode, DEFAULT_BPM, GATE_RANGE, PERCENT_RANGE, SPREAD_RANGE, SWING_RANGE,
    TIMING_JITTER_RANGE,
};

use crate::active_notes::ActiveNotes;
use crate::held_notes::HeldNotes;
use crate::pattern::{self, transpose};
use crate::random::{RandomSource, StdRandom};
use crate::scheduler::{self, SchedulerState};
use crate::sink::{NoteSink, StepObserver};
use crate::timer::TimerQueue;

/// Velocity used if the active set is somehow empty during a tick.
const FALLBACK_VELOCITY: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArpTimer {
    Tick,
    NoteOff(u8),
}

pub struct Arpeggiator<S: NoteSink, R: RandomSource = StdRandom> {
    config: ArpeggiatorConfig,
    bpm: f32,
    notes: HeldNotes,
    pattern: Vec<u8>,
    scheduler: SchedulerState,
    active: ActiveNotes,
    timers: TimerQueue<ArpTimer>,
    sink: S,
    observer: Option<Box<dyn StepObserver + Send>>,
    rng: R,
    now_ms: f64,
}

impl<S: NoteSink> Arpeggiator<S, StdRandom> {
    /// Arpeggiator with an entropy-seeded random source.
    pub fn with_sink(config: ArpeggiatorConfig, sink: S) -> Self {
        Self::new(config, sink, StdRandom::from_entropy())
    }
}

impl<S: NoteSink, R: RandomSource> Arpeggiator<S, R> {
    pub fn new(config: ArpeggiatorConfig, sink: S, rng: R) -> Self {
        let config = config.sanitized();
        let mut notes = HeldNotes::new();
        notes.set_latch(config.latch);
        Self {
            config,
            bpm: DEFAULT_BPM,
            notes,
            pattern: Vec::new(),
            scheduler: SchedulerState::default(),
            active: ActiveNotes::new(),
            timers: TimerQueue::new(),
            sink,
            observer: None,
            rng,
            now_ms: 0.0,
        }
    }

    pub fn set_step_observer(&mut self, observer: Option<Box<dyn StepObserver + Send>>) {
        self.observer = observer;
    }

    // ---- transport ------------------------------------------------------

    pub fn note_on(&mut self, note: u8, velocity: u8) {
        if note > 127 {
            log::warn!(target: "arp", "ignoring note-on for out-of-range note {}", note);
            return;
        }
        let press = self.notes.press(note, velocity);
        if press.first && self.config.sync {
            self.scheduler.current_step = 0;
        }
        if press.changed {
            self.regenerate();
        }
        self.reconcile();
    }

    pub fn note_off(&mut self, note: u8) {
        if note > 127 {
            log::warn!(target: "arp", "ignoring note-off for out-of-range note {}", note);
            return;
        }
        if self.notes.release(note) {
            self.regenerate();
        }
        self.reconcile();
    }

    pub fn toggle_latch(&mut self) {
        let on = !self.config.latch;
        self.config.latch = on;
        log::debug!(target: "arp", "latch {}", if on { "on" } else { "off" });
        if self.notes.set_latch(on) {
            self.regenerate();
        }
        self.reconcile();
    }

    pub fn set_latch(&mut self, on: bool) {
        if on != self.config.latch {
            self.toggle_latch();
        }
    }

    /// Silence everything and forget all held and latched notes.
    pub fn panic(&mut self) {
        log::info!(target: "arp", "panic: {} sounding notes released", self.active.len());
        self.enter_idle();
        self.notes.clear();
        self.pattern.clear();
    }

    // ---- clock ----------------------------------------------------------

    /// Run every timer due at or before `now_ms`, in deadline order.
    /// The clock never moves backwards.
    pub fn advance_to(&mut self, now_ms: f64) {
        let target = now_ms.max(self.now_ms);
        while let Some(due) = self.timers.pop_due(target) {
            self.now_ms = due.at_ms.max(self.now_ms);
            match due.event {
                ArpTimer::Tick => {
                    if self.scheduler.tick == Some(due.handle) {
                        self.scheduler.tick = None;
                        self.tick();
                    }
                }
                ArpTimer::NoteOff(note) => {
                    if self.active.release(note, due.handle) {
                        self.sink.note_off(note);
                    }
                }
            }
        }
        self.now_ms = target;
    }

    pub fn advance_by(&mut self, ms: f64) {
        self.advance_to(self.now_ms + ms.max(0.0));
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Deadline of the earliest pending tick or note-off.
    pub fn next_deadline_ms(&self) -> Option<f64> {
        self.timers.next_deadline()
    }

    pub fn pending_timer_count(&self) -> usize {
        self.timers.len()
    }

    // ---- parameters -----------------------------------------------------

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        self.reconcile();
    }

    pub fn set_mode(&mut self, mode: ArpMode) {
        self.config.mode = mode;
        self.regenerate();
    }

    pub fn set_octaves(&mut self, octaves: u8) {
        self.config.octaves = clamp_octaves(octaves);
        self.regenerate();
    }

    pub fn set_octave_mode(&mut self, octave_mode: OctaveMode) {
        self.config.octave_mode = octave_mode;
        self.regenerate();
    }

    pub fn set_rate(&mut self, rate: ArpRate) {
        self.config.rate = rate;
    }

    pub fn set_gate_percent(&mut self, gate: f32) {
        self.config.gate_percent = clamp_to(gate, &GATE_RANGE);
    }

    pub fn set_swing_percent(&mut self, swing: f32) {
        self.config.swing_percent = clamp_to(swing, &SWING_RANGE);
    }

    pub fn set_timing_jitter_ms(&mut self, jitter: f32) {
        self.config.timing_jitter_ms = clamp_to(jitter, &TIMING_JITTER_RANGE);
    }

    pub fn set_velocity_spread_percent(&mut self, spread: f32) {
        self.config.velocity_spread_percent = clamp_to(spread, &SPREAD_RANGE);
    }

    pub fn set_gate_spread_percent(&mut self, spread: f32) {
        self.config.gate_spread_percent = clamp_to(spread, &SPREAD_RANGE);
    }

    pub fn set_drunk(&mut self, drunk: bool) {
        self.config.drunk = drunk;
    }

    pub fn set_probability_percent(&mut self, probability: f32) {
        self.config.probability_percent = clamp_to(probability, &PERCENT_RANGE);
    }

    pub fn set_random_octave_chance_percent(&mut self, chance: f32) {
        self.config.random_octave_chance_percent = clamp_to(chance, &PERCENT_RANGE);
    }

    /// Takes effect at the next regeneration.
    pub fn set_shuffle_percent(&mut self, shuffle: f32) {
        self.config.shuffle_percent = clamp_to(shuffle, &PERCENT_RANGE);
    }

    pub fn set_sync(&mut self, sync: bool) {
        self.config.sync = sync;
    }

    /// Tempo used from the next tick on.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = clamp_bpm(bpm);
    }

    /// Apply every field present in `patch` through its setter.
    pub fn apply_patch(&mut self, patch: &ArpeggiatorPatch) {
        if let Some(v) = patch.rate {
            self.set_rate(v);
        }
        if let Some(v) = patch.gate_percent {
            self.set_gate_percent(v);
        }
        if let Some(v) = patch.swing_percent {
            self.set_swing_percent(v);
        }
        if let Some(v) = patch.timing_jitter_ms {
            self.set_timing_jitter_ms(v);
        }
        if let Some(v) = patch.velocity_spread_percent {
            self.set_velocity_spread_percent(v);
        }
        if let Some(v) = patch.gate_spread_percent {
            self.set_gate_spread_percent(v);
        }
        if let Some(v) = patch.drunk {
            self.set_drunk(v);
        }
        if let Some(v) = patch.probability_percent {
            self.set_probability_percent(v);
        }
        if let Some(v) = patch.random_octave_chance_percent {
            self.set_random_octave_chance_percent(v);
        }
        if let Some(v) = patch.shuffle_percent {
            self.set_shuffle_percent(v);
        }
        if let Some(v) = patch.sync {
            self.set_sync(v);
        }
        if let Some(v) = patch.mode {
            self.set_mode(v);
        }
        if let Some(v) = patch.octaves {
            self.set_octaves(v);
        }
        if let Some(v) = patch.octave_mode {
            self.set_octave_mode(v);
        }
        if let Some(v) = patch.latch {
            self.set_latch(v);
        }
        if let Some(v) = patch.enabled {
            self.set_enabled(v);
        }
    }

    // ---- accessors ------------------------------------------------------

    pub fn config(&self) -> &ArpeggiatorConfig {
        &self.config
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn current_step(&self) -> usize {
        self.scheduler.current_step
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// Keys currently held down, in arrival order.
    pub fn held_notes(&self) -> &[HeldNote] {
        self.notes.held()
    }

    pub fn latched_notes(&self) -> &[HeldNote] {
        self.notes.latched()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.running
    }

    /// Arpeggiated notes currently sounding.
    pub fn active_notes(&self) -> Vec<u8> {
        self.active.notes()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ---- internals ------------------------------------------------------

    fn regenerate(&mut self) {
        self.pattern = pattern::generate(self.notes.active(), &self.config, &mut self.rng);
        if self.scheduler.current_step >= self.pattern.len() {
            self.scheduler.current_step = 0;
        }
        log::debug!(target: "arp", "pattern ({:?}): {:?}", self.config.mode, self.pattern);
    }

    /// Bring the Idle/Running state in line with `enabled` and the pattern.
    fn reconcile(&mut self) {
        let should_run = self.config.enabled && !self.pattern.is_empty();
        if should_run && !self.scheduler.running {
            self.start();
        } else if !should_run && self.scheduler.running {
            self.enter_idle();
        }
    }

    fn start(&mut self) {
        log::debug!(target: "arp", "running at {:.1} ms", self.now_ms);
        self.scheduler.running = true;
        self.scheduler.reset();
        self.tick();
    }

    fn enter_idle(&mut self) {
        if let Some(handle) = self.scheduler.tick.take() {
            self.timers.cancel(handle);
        }
        for (note, handle) in self.active.drain() {
            self.timers.cancel(handle);
            self.sink.note_off(note);
        }
        if self.scheduler.running {
            log::debug!(target: "arp", "idle at {:.1} ms", self.now_ms);
        }
        self.scheduler.running = false;
        self.scheduler.reset();
    }

    fn tick(&mut self) {
        if !self.scheduler.running {
            return;
        }
        if self.pattern.is_empty() {
            self.enter_idle();
            return;
        }

        let len = self.pattern.len();
        let step = self.scheduler.current_step.min(len - 1);
        let timing = scheduler::step_timing(
            &self.config,
            self.bpm,
            step,
            &mut self.scheduler.drunk_accumulator_ms,
            &mut self.rng,
        );

        if scheduler::should_play(self.config.probability_percent, &mut self.rng) {
            let to_sound: Vec<u8> = if self.config.mode == ArpMode::Chord {
                self.pattern.clone()
            } else {
                let base = self.pattern[step];
                let shift =
                    scheduler::octave_shift(self.config.random_octave_chance_percent, &mut self.rng);
                vec![transpose(base, shift).unwrap_or(base)]
            };
            let velocity = scheduler::humanized_velocity(
                self.notes.base_velocity().unwrap_or(FALLBACK_VELOCITY),
                self.config.velocity_spread_percent,
                &mut self.rng,
            );
            let gate = scheduler::gate_ms(
                timing.step_ms,
                self.config.gate_percent,
                self.config.gate_spread_percent,
                &mut self.rng,
            );
            for note in to_sound {
                self.trigger(note, velocity, gate);
            }
        }

        if let Some(observer) = self.observer.as_mut() {
            observer.on_step_change(step, &self.pattern);
        }

        let next = (step + 1) % len;
        self.scheduler.current_step = next;
        if next == 0 && self.config.mode == ArpMode::Random {
            self.regenerate();
        }

        let at = self.now_ms + timing.next_delay_ms();
        log::trace!(target: "arp", "step {} at {:.1} ms, next at {:.1} ms", step, self.now_ms, at);
        self.scheduler.tick = Some(self.timers.schedule(at, ArpTimer::Tick));
    }

    /// Sound `note`, cutting off any earlier instance of the same pitch first.
    fn trigger(&mut self, note: u8, velocity: u8, gate_ms: f64) {
        if let Some(previous) = self.active.take(note) {
            self.timers.cancel(previous);
            self.sink.note_off(note);
        }
        self.sink.note_on(note, velocity);
        let handle = self
            .timers
            .schedule(self.now_ms + gate_ms, ArpTimer::NoteOff(note));
        let replaced = self.active.insert(note, handle);
        debug_assert!(replaced.is_none(), "note {} had two pending note-offs", note);
    }
}

impl<S: NoteSink, R: RandomSource> Drop for Arpeggiator<S, R> {
    fn drop(&mut self) {
        for (note, _) in self.active.drain() {
            self.sink.note_off(note);
        }
    }
}
