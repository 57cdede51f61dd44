//! Outbound boundary: where arpeggiated notes and step changes go.

use ostinato_types::NoteEvent;

/// Receiver of arpeggiated notes, typically a synth voice allocator or a MIDI output.
pub trait NoteSink {
    fn note_on(&mut self, note: u8, velocity: u8);
    fn note_off(&mut self, note: u8);
}

/// Records every event in order.
impl NoteSink for Vec<NoteEvent> {
    fn note_on(&mut self, note: u8, velocity: u8) {
        self.push(NoteEvent::NoteOn { note, velocity });
    }

    fn note_off(&mut self, note: u8) {
        self.push(NoteEvent::NoteOff { note });
    }
}

impl NoteSink for crossbeam_channel::Sender<NoteEvent> {
    fn note_on(&mut self, note: u8, velocity: u8) {
        if self.send(NoteEvent::NoteOn { note, velocity }).is_err() {
            log::warn!(target: "arp", "note sink disconnected, note-on {} dropped", note);
        }
    }

    fn note_off(&mut self, note: u8) {
        if self.send(NoteEvent::NoteOff { note }).is_err() {
            log::warn!(target: "arp", "note sink disconnected, note-off {} dropped", note);
        }
    }
}

impl<S: NoteSink + ?Sized> NoteSink for Box<S> {
    fn note_on(&mut self, note: u8, velocity: u8) {
        (**self).note_on(note, velocity)
    }

    fn note_off(&mut self, note: u8) {
        (**self).note_off(note)
    }
}

/// Informational callback fired once per tick, played or not.
pub trait StepObserver {
    fn on_step_change(&mut self, step: usize, pattern: &[u8]);
}

impl<F> StepObserver for F
where
    F: FnMut(usize, &[u8]),
{
    fn on_step_change(&mut self, step: usize, pattern: &[u8]) {
        self(step, pattern)
    }
}
