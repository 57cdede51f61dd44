use ostinato_types::ArpeggiatorPatch;

/// Commands sent from the host to the arpeggiator thread.
#[derive(Debug, Clone)]
pub enum ArpCmd {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    ToggleLatch,
    Panic,
    SetBpm(f32),
    ApplyPatch(ArpeggiatorPatch),
    Shutdown,
}

impl ArpCmd {
    /// Commands that decide which notes feed the pattern share one ordered
    /// channel ahead of plain parameter changes. Latch and enable must stay in
    /// order with key presses, so patches carrying them go there too.
    pub fn is_priority(&self) -> bool {
        match self {
            ArpCmd::NoteOn { .. }
            | ArpCmd::NoteOff { .. }
            | ArpCmd::ToggleLatch
            | ArpCmd::Panic
            | ArpCmd::Shutdown => true,
            ArpCmd::ApplyPatch(patch) => patch.latch.is_some() || patch.enabled.is_some(),
            ArpCmd::SetBpm(_) => false,
        }
    }
}

/// Messages from the arpeggiator thread back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ArpFeedback {
    Step { step: usize, pattern: Vec<u8> },
    Running(bool),
}
