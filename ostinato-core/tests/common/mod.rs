#![allow(dead_code)]
//! Shared helpers for ostinato-core scenario tests.

use std::sync::{Arc, Mutex};

use ostinato_core::{Arpeggiator, ScriptedRandom};
use ostinato_types::{ArpeggiatorConfig, NoteEvent};

pub type TestArp = Arpeggiator<Vec<NoteEvent>, ScriptedRandom>;

/// 120 BPM with 1/8 steps: one tick every 250 ms.
pub const STEP_MS: f64 = 250.0;

pub fn enabled() -> ArpeggiatorConfig {
    ArpeggiatorConfig {
        enabled: true,
        ..Default::default()
    }
}

pub fn arp(config: ArpeggiatorConfig) -> TestArp {
    arp_with(config, ScriptedRandom::constant(0.5))
}

pub fn arp_with(config: ArpeggiatorConfig, rng: ScriptedRandom) -> TestArp {
    Arpeggiator::new(config, Vec::new(), rng)
}

pub fn note_ons(events: &[NoteEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            NoteEvent::NoteOn { note, .. } => Some(*note),
            NoteEvent::NoteOff { .. } => None,
        })
        .collect()
}

pub fn note_offs(events: &[NoteEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            NoteEvent::NoteOff { note } => Some(*note),
            NoteEvent::NoteOn { .. } => None,
        })
        .collect()
}

pub fn velocities(events: &[NoteEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            NoteEvent::NoteOn { velocity, .. } => Some(*velocity),
            NoteEvent::NoteOff { .. } => None,
        })
        .collect()
}

/// Step observer that records every `(step, pattern)` callback.
pub fn record_steps(arp: &mut TestArp) -> Arc<Mutex<Vec<(usize, Vec<u8>)>>> {
    let steps = Arc::new(Mutex::new(Vec::new()));
    let sink = steps.clone();
    arp.set_step_observer(Some(Box::new(move |step: usize, pattern: &[u8]| {
        sink.lock().unwrap().push((step, pattern.to_vec()));
    })));
    steps
}

/// For every pitch, note-on and note-off must strictly alternate.
pub fn assert_no_overlaps(events: &[NoteEvent]) {
    let mut sounding = [false; 128];
    for event in events {
        match *event {
            NoteEvent::NoteOn { note, .. } => {
                assert!(!sounding[note as usize], "note {} triggered twice without note-off", note);
                sounding[note as usize] = true;
            }
            NoteEvent::NoteOff { note } => {
                assert!(sounding[note as usize], "note-off for silent note {}", note);
                sounding[note as usize] = false;
            }
        }
    }
}
