//! # ostinato-core
//!
//! Performance arpeggiator engine: turns a live set of held notes into a
//! tempo-locked, optionally humanized stream of note-on/note-off events.
//!
//! ## Quick Start
//!
//! ```rust
//! use ostinato_core::{Arpeggiator, ScriptedRandom};
//! use ostinato_types::{ArpeggiatorConfig, NoteEvent};
//!
//! let config = ArpeggiatorConfig { enabled: true, ..Default::default() };
//! let mut arp = Arpeggiator::new(config, Vec::<NoteEvent>::new(), ScriptedRandom::default());
//!
//! arp.note_on(60, 100);
//! arp.note_on(64, 100);
//! arp.advance_to(1000.0); // 120 BPM, 1/8 steps: four more ticks
//!
//! assert_eq!(arp.pattern(), &[60, 64]);
//! assert!(arp.sink().iter().filter(|e| e.is_note_on()).count() >= 5);
//! ```
//!
//! ## Module Overview
//!
//! - [`arpeggiator`]: `Arpeggiator`: parameter setters, transport
//!   (`note_on`, `note_off`, `toggle_latch`, `panic`) and the tick scheduler
//! - [`pattern`]: pattern generation for every `ArpMode`
//! - [`scheduler`]: per-tick timing, swing, jitter, drunk walk and humanization
//! - [`held_notes`]: held-note registry and latch snapshot
//! - [`active_notes`]: sounding notes and their pending note-offs
//! - [`timer`]: one-shot cancellable timers on a virtual clock
//! - [`random`]: injectable random source (`StdRandom`, `ScriptedRandom`)
//! - [`sink`]: `NoteSink` / `StepObserver` boundary traits
//! - [`runtime`]: `ArpHandle`: the arpeggiator on its own thread, driven by wall time
//! - [`config`]: TOML configuration loading (embedded defaults + user override)

pub mod active_notes;
pub mod arpeggiator;
pub mod config;
pub mod held_notes;
pub mod pattern;
pub mod random;
pub mod runtime;
pub mod scheduler;
pub mod sink;
pub mod timer;

pub use arpeggiator::Arpeggiator;
pub use random::{RandomSource, ScriptedRandom, StdRandom};
pub use runtime::{ArpCmd, ArpFeedback, ArpHandle, ArpSender};
pub use sink::{NoteSink, StepObserver};
pub use timer::{TimerHandle, TimerQueue};
