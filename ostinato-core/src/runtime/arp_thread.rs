use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use ostinato_types::ArpeggiatorConfig;

use super::commands::{ArpCmd, ArpFeedback};
use crate::arpeggiator::Arpeggiator;
use crate::random::StdRandom;
use crate::sink::NoteSink;

/// Sleep used when no timer is pending (arpeggiator idle).
const IDLE_WAIT: Duration = Duration::from_millis(50);

pub(crate) struct ArpThread<S: NoteSink> {
    arp: Arpeggiator<S, StdRandom>,
    priority_rx: Receiver<ArpCmd>,
    normal_rx: Receiver<ArpCmd>,
    feedback_tx: Sender<ArpFeedback>,
    epoch: Instant,
    was_running: bool,
    /// The last Running change has not fit into the feedback queue yet.
    running_unsent: bool,
}

impl<S: NoteSink> ArpThread<S> {
    pub(crate) fn new(
        config: ArpeggiatorConfig,
        bpm: f32,
        sink: S,
        priority_rx: Receiver<ArpCmd>,
        normal_rx: Receiver<ArpCmd>,
        feedback_tx: Sender<ArpFeedback>,
    ) -> Self {
        let mut arp = Arpeggiator::with_sink(config, sink);
        arp.set_bpm(bpm);
        let step_tx = feedback_tx.clone();
        arp.set_step_observer(Some(Box::new(move |step: usize, pattern: &[u8]| {
            // Step updates are dropped while the host is not draining.
            let _ = step_tx.try_send(ArpFeedback::Step {
                step,
                pattern: pattern.to_vec(),
            });
        })));
        Self {
            arp,
            priority_rx,
            normal_rx,
            feedback_tx,
            epoch: Instant::now(),
            was_running: false,
            running_unsent: false,
        }
    }

    pub(crate) fn run(mut self) {
        loop {
            let timeout = self.time_to_next_deadline();

            crossbeam_channel::select! {
                recv(self.priority_rx) -> result => {
                    match result {
                        Ok(cmd) => {
                            if self.handle_cmd(cmd) {
                                break;
                            }
                        }
                        Err(_) => break, // Disconnected
                    }
                }
                recv(self.normal_rx) -> result => {
                    match result {
                        Ok(cmd) => {
                            if self.handle_cmd(cmd) {
                                break;
                            }
                        }
                        Err(_) => break, // Disconnected
                    }
                }
                default(timeout) => {}
            }

            if self.drain(true) || self.drain(false) {
                break;
            }

            self.arp.advance_to(self.elapsed_ms());
            self.report_running();
        }

        self.arp.panic();
        self.report_running();
        log::debug!(target: "arp::runtime", "arpeggiator thread exiting");
    }

    fn elapsed_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    fn time_to_next_deadline(&self) -> Duration {
        match self.arp.next_deadline_ms() {
            Some(deadline) => {
                let remaining = (deadline - self.elapsed_ms()).max(0.0);
                Duration::from_secs_f64(remaining / 1000.0)
            }
            None => IDLE_WAIT,
        }
    }

    /// Handle whatever is already queued. Returns true on shutdown or disconnect.
    fn drain(&mut self, priority: bool) -> bool {
        const MAX_COUNT: usize = 128;

        for _ in 0..MAX_COUNT {
            let next = if priority {
                self.priority_rx.try_recv()
            } else {
                self.normal_rx.try_recv()
            };
            match next {
                Ok(cmd) => {
                    if self.handle_cmd(cmd) {
                        return true;
                    }
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
        false
    }

    /// Returns true when the thread should stop.
    fn handle_cmd(&mut self, cmd: ArpCmd) -> bool {
        // Catch up first so the mutation lands at the right musical time.
        self.arp.advance_to(self.elapsed_ms());
        match cmd {
            ArpCmd::NoteOn { note, velocity } => self.arp.note_on(note, velocity),
            ArpCmd::NoteOff { note } => self.arp.note_off(note),
            ArpCmd::ToggleLatch => self.arp.toggle_latch(),
            ArpCmd::Panic => self.arp.panic(),
            ArpCmd::SetBpm(bpm) => self.arp.set_bpm(bpm),
            ArpCmd::ApplyPatch(patch) => self.arp.apply_patch(&patch),
            ArpCmd::Shutdown => return true,
        }
        self.report_running();
        false
    }

    /// Queue a Running change. If the queue is full the change is retried on
    /// later loop passes, so the host always ends up with the latest state.
    fn report_running(&mut self) {
        let running = self.arp.is_running();
        if running != self.was_running {
            self.was_running = running;
            self.running_unsent = true;
        }
        if !self.running_unsent {
            return;
        }
        match self.feedback_tx.try_send(ArpFeedback::Running(self.was_running)) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => self.running_unsent = false,
            Err(TrySendError::Full(_)) => {}
        }
    }
}
