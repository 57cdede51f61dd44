//! Sounding arpeggiated notes and their pending note-off timers.

use std::collections::BTreeMap;

use crate::timer::TimerHandle;

/// At most one entry per note number. Re-triggering a note must go through
/// [`ActiveNotes::insert`], which hands back the previous handle so the
/// caller can cancel it.
#[derive(Debug, Clone, Default)]
pub struct ActiveNotes {
    entries: BTreeMap<u8, TimerHandle>,
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `note`, returning the handle it replaced.
    pub fn insert(&mut self, note: u8, handle: TimerHandle) -> Option<TimerHandle> {
        self.entries.insert(note, handle)
    }

    pub fn take(&mut self, note: u8) -> Option<TimerHandle> {
        self.entries.remove(&note)
    }

    /// Remove `note` only if it is still owned by `handle`.
    pub fn release(&mut self, note: u8, handle: TimerHandle) -> bool {
        if self.entries.get(&note) == Some(&handle) {
            self.entries.remove(&note);
            true
        } else {
            false
        }
    }

    /// Empty the tracker, yielding every (note, handle) pair in note order.
    pub fn drain(&mut self) -> Vec<(u8, TimerHandle)> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }

    pub fn notes(&self) -> Vec<u8> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
