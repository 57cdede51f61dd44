//! Held-note registry with latch snapshot.

use ostinato_types::HeldNote;

/// Result of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Press {
    /// The active note set changed and the pattern must be rebuilt.
    pub changed: bool,
    /// No key was down before this press.
    pub first: bool,
}

/// Tracks physically held keys and, while latch is on, the latched snapshot
/// that stands in for them.
///
/// Both lists stay in arrival order.
#[derive(Debug, Clone, Default)]
pub struct HeldNotes {
    held: Vec<HeldNote>,
    latched: Vec<HeldNote>,
    latch: bool,
    next_order: u64,
}

impl HeldNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, note: u8, velocity: u8) -> Press {
        if self.held.iter().any(|n| n.note == note) {
            return Press {
                changed: false,
                first: false,
            };
        }
        let first = self.held.is_empty();
        let entry = HeldNote {
            note,
            velocity: velocity.clamp(1, 127),
            arrival_order: self.next_order,
        };
        self.next_order += 1;
        self.held.push(entry);

        if !self.latch {
            return Press { changed: true, first };
        }

        // A press after every key was let go starts a fresh latched chord.
        if first {
            self.latched.clear();
            self.latched.push(entry);
            return Press { changed: true, first };
        }
        if self.latched.iter().any(|n| n.note == note) {
            return Press {
                changed: false,
                first,
            };
        }
        self.latched.push(entry);
        Press { changed: true, first }
    }

    /// Returns true if the active set changed.
    pub fn release(&mut self, note: u8) -> bool {
        let before = self.held.len();
        self.held.retain(|n| n.note != note);
        !self.latch && self.held.len() != before
    }

    /// Returns true if the active set changed.
    pub fn set_latch(&mut self, on: bool) -> bool {
        if on == self.latch {
            return false;
        }
        self.latch = on;
        if on {
            self.latched = self.held.clone();
            false
        } else {
            let changed = self.latched != self.held;
            self.latched.clear();
            changed
        }
    }

    /// Notes feeding the pattern: the latched snapshot while latch is on,
    /// otherwise the live held keys.
    pub fn active(&self) -> &[HeldNote] {
        if self.latch {
            &self.latched
        } else {
            &self.held
        }
    }

    pub fn held(&self) -> &[HeldNote] {
        &self.held
    }

    pub fn latched(&self) -> &[HeldNote] {
        &self.latched
    }

    /// Velocity of the earliest active note.
    pub fn base_velocity(&self) -> Option<u8> {
        self.active()
            .iter()
            .min_by_key(|n| n.arrival_order)
            .map(|n| n.velocity)
    }

    /// Drop every held and latched note. The latch flag itself is kept.
    pub fn clear(&mut self) {
        self.held.clear();
        self.latched.clear();
    }
}
