//! ArpHandle: host-side interface to the arpeggiator thread.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use ostinato_types::{ArpeggiatorConfig, ArpeggiatorPatch};

use super::arp_thread::ArpThread;
use super::commands::{ArpCmd, ArpFeedback};
use crate::sink::NoteSink;

/// Most feedback messages held for the host. Step updates beyond this are
/// dropped until [`ArpHandle::drain_feedback`] is called.
pub const FEEDBACK_CAPACITY: usize = 64;

/// Cloneable command sender, safe to move into MIDI input callbacks.
#[derive(Clone)]
pub struct ArpSender {
    /// Priority commands: key presses, panic
    priority_tx: Sender<ArpCmd>,
    /// Normal commands: parameter and tempo changes
    normal_tx: Sender<ArpCmd>,
}

impl ArpSender {
    /// Send a command, routing to the priority or normal channel.
    pub fn send_cmd(&self, cmd: ArpCmd) -> Result<(), String> {
        let tx = if cmd.is_priority() {
            &self.priority_tx
        } else {
            &self.normal_tx
        };
        tx.send(cmd)
            .map_err(|_| "Arpeggiator thread disconnected".to_string())
    }

    /// Fire-and-forget: send a command and log if the thread is gone.
    fn send(&self, cmd: ArpCmd) {
        if let Err(e) = self.send_cmd(cmd) {
            log::warn!(target: "arp::runtime", "command dropped: {}", e);
        }
    }

    pub fn note_on(&self, note: u8, velocity: u8) {
        self.send(ArpCmd::NoteOn { note, velocity });
    }

    pub fn note_off(&self, note: u8) {
        self.send(ArpCmd::NoteOff { note });
    }

    pub fn toggle_latch(&self) {
        self.send(ArpCmd::ToggleLatch);
    }

    pub fn panic(&self) {
        self.send(ArpCmd::Panic);
    }

    pub fn set_bpm(&self, bpm: f32) {
        self.send(ArpCmd::SetBpm(bpm));
    }

    pub fn apply_patch(&self, patch: ArpeggiatorPatch) {
        if patch.is_empty() {
            return;
        }
        self.send(ArpCmd::ApplyPatch(patch));
    }
}

/// Owns the arpeggiator thread. Dropping the handle shuts the thread down,
/// which releases every sounding note.
pub struct ArpHandle {
    sender: ArpSender,
    feedback_rx: Receiver<ArpFeedback>,
    running: bool,
    current_step: usize,
    pattern: Vec<u8>,
    join_handle: Option<JoinHandle<()>>,
}

impl ArpHandle {
    pub fn spawn<S>(config: ArpeggiatorConfig, bpm: f32, sink: S) -> Self
    where
        S: NoteSink + Send + 'static,
    {
        let (priority_tx, priority_rx) = crossbeam_channel::unbounded();
        let (normal_tx, normal_rx) = crossbeam_channel::unbounded();
        let (feedback_tx, feedback_rx) = crossbeam_channel::bounded(FEEDBACK_CAPACITY);

        let join_handle = thread::Builder::new()
            .name("ostinato-arp".into())
            .spawn(move || {
                let thread =
                    ArpThread::new(config, bpm, sink, priority_rx, normal_rx, feedback_tx);
                thread.run();
            })
            .map_err(|e| log::error!(target: "arp::runtime", "failed to spawn arpeggiator thread: {}", e))
            .ok();

        Self {
            sender: ArpSender {
                priority_tx,
                normal_tx,
            },
            feedback_rx,
            running: false,
            current_step: 0,
            pattern: Vec::new(),
            join_handle,
        }
    }

    pub fn sender(&self) -> ArpSender {
        self.sender.clone()
    }

    pub fn note_on(&self, note: u8, velocity: u8) {
        self.sender.note_on(note, velocity);
    }

    pub fn note_off(&self, note: u8) {
        self.sender.note_off(note);
    }

    pub fn toggle_latch(&self) {
        self.sender.toggle_latch();
    }

    pub fn panic(&self) {
        self.sender.panic();
    }

    pub fn set_bpm(&self, bpm: f32) {
        self.sender.set_bpm(bpm);
    }

    pub fn apply_patch(&self, patch: ArpeggiatorPatch) {
        self.sender.apply_patch(patch);
    }

    /// Collect pending feedback, updating the cached read state.
    pub fn drain_feedback(&mut self) -> Vec<ArpFeedback> {
        let mut out = Vec::new();
        while let Ok(msg) = self.feedback_rx.try_recv() {
            self.apply_feedback(&msg);
            out.push(msg);
        }
        out
    }

    fn apply_feedback(&mut self, feedback: &ArpFeedback) {
        match feedback {
            ArpFeedback::Step { step, pattern } => {
                self.current_step = *step;
                self.pattern.clone_from(pattern);
            }
            ArpFeedback::Running(running) => {
                self.running = *running;
                if !running {
                    self.current_step = 0;
                }
            }
        }
    }

    /// Last reported running state (as of the last [`ArpHandle::drain_feedback`]).
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// Stop the thread and wait for it to release its notes.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.sender.send_cmd(ArpCmd::Shutdown);
            if handle.join().is_err() {
                log::error!(target: "arp::runtime", "arpeggiator thread panicked");
            }
        }
    }
}

impl Drop for ArpHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
