use std::time::{Duration, Instant};

use ostinato_core::runtime::FEEDBACK_CAPACITY;
use ostinato_core::{ArpFeedback, ArpHandle, NoteSink};
use ostinato_types::{ArpRate, ArpeggiatorConfig, ArpeggiatorPatch, NoteEvent};

/// Channel sink that stalls the arpeggiator thread on every note-on, so
/// later commands pile up in the queues.
struct SlowSink(crossbeam_channel::Sender<NoteEvent>);

impl NoteSink for SlowSink {
    fn note_on(&mut self, note: u8, velocity: u8) {
        std::thread::sleep(Duration::from_millis(30));
        self.0.note_on(note, velocity);
    }

    fn note_off(&mut self, note: u8) {
        self.0.note_off(note);
    }
}

fn wait_for(handle: &mut ArpHandle, timeout: Duration, pred: impl Fn(&ArpHandle) -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        handle.drain_feedback();
        if pred(handle) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn fast_config() -> ArpeggiatorConfig {
    ArpeggiatorConfig {
        enabled: true,
        rate: ArpRate::ThirtySecond,
        ..Default::default()
    }
}

fn recv_until(
    rx: &crossbeam_channel::Receiver<NoteEvent>,
    timeout: Duration,
    pred: impl Fn(&NoteEvent) -> bool,
) -> Option<NoteEvent> {
    let deadline = Instant::now() + timeout;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(event) if pred(&event) => return Some(event),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

#[test]
fn test_thread_plays_and_reports_steps() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut handle = ArpHandle::spawn(fast_config(), 300.0, tx);

    handle.note_on(60, 100);
    handle.note_on(64, 100);

    let first = recv_until(&rx, Duration::from_secs(2), |e| e.is_note_on());
    assert_eq!(first, Some(NoteEvent::NoteOn { note: 60, velocity: 100 }));
    assert!(recv_until(&rx, Duration::from_secs(2), |e| *e == NoteEvent::NoteOn { note: 64, velocity: 100 }).is_some());

    let feedback = handle.drain_feedback();
    assert!(feedback.contains(&ArpFeedback::Running(true)));
    assert!(feedback.iter().any(|f| matches!(f, ArpFeedback::Step { .. })));
    assert!(handle.is_running());

    handle.shutdown();
}

#[test]
fn test_shutdown_releases_sounding_notes() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let config = ArpeggiatorConfig {
        gate_percent: 200.0,
        ..fast_config()
    };
    let handle = ArpHandle::spawn(config, 120.0, tx);
    handle.note_on(60, 100);
    assert!(recv_until(&rx, Duration::from_secs(2), |e| e.is_note_on()).is_some());

    drop(handle);

    let events: Vec<NoteEvent> = rx.try_iter().collect();
    assert_eq!(events.last(), Some(&NoteEvent::NoteOff { note: 60 }));
}

#[test]
fn test_patch_disables_through_sender() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut handle = ArpHandle::spawn(fast_config(), 300.0, tx);
    let sender = handle.sender();

    std::thread::spawn(move || sender.note_on(67, 90))
        .join()
        .unwrap();
    assert!(recv_until(&rx, Duration::from_secs(2), |e| e.is_note_on()).is_some());

    handle.apply_patch(ArpeggiatorPatch {
        enabled: Some(false),
        ..Default::default()
    });
    assert!(recv_until(&rx, Duration::from_secs(2), |e| *e == NoteEvent::NoteOff { note: 67 }).is_some());

    let deadline = Instant::now() + Duration::from_secs(2);
    while handle.is_running() && Instant::now() < deadline {
        handle.drain_feedback();
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!handle.is_running());
}

#[test]
fn test_latch_then_release_keeps_order_while_thread_is_busy() {
    let (tx, _rx) = crossbeam_channel::unbounded();
    let config = ArpeggiatorConfig {
        enabled: true,
        ..Default::default()
    };
    let mut handle = ArpHandle::spawn(config, 120.0, SlowSink(tx));

    handle.note_on(60, 100);
    // The thread is now inside the slow note-on; both commands queue up.
    std::thread::sleep(Duration::from_millis(5));
    handle.toggle_latch();
    handle.note_off(60);

    std::thread::sleep(Duration::from_millis(200));
    handle.drain_feedback();
    assert!(handle.is_running());
    assert_eq!(handle.pattern(), &[60]);

    handle.shutdown();
}

#[test]
fn test_latch_patch_keeps_order_with_key_release() {
    let (tx, _rx) = crossbeam_channel::unbounded();
    let config = ArpeggiatorConfig {
        enabled: true,
        ..Default::default()
    };
    let mut handle = ArpHandle::spawn(config, 120.0, SlowSink(tx));

    handle.note_on(60, 100);
    std::thread::sleep(Duration::from_millis(5));
    handle.apply_patch(ArpeggiatorPatch {
        latch: Some(true),
        ..Default::default()
    });
    handle.note_off(60);

    std::thread::sleep(Duration::from_millis(200));
    handle.drain_feedback();
    assert!(handle.is_running());

    handle.shutdown();
}

#[test]
fn test_undrained_feedback_is_bounded_and_running_still_arrives() {
    let (tx, _rx) = crossbeam_channel::unbounded();
    let mut handle = ArpHandle::spawn(fast_config(), 300.0, tx);
    handle.note_on(60, 100);

    // 25 ms steps: far more ticks than the queue holds.
    std::thread::sleep(Duration::from_millis(25 * (FEEDBACK_CAPACITY as u64 + 40)));
    handle.apply_patch(ArpeggiatorPatch {
        enabled: Some(false),
        ..Default::default()
    });
    std::thread::sleep(Duration::from_millis(100));

    let queued = handle.drain_feedback();
    assert!(queued.len() <= FEEDBACK_CAPACITY);
    assert!(queued.contains(&ArpFeedback::Running(true)));

    // The stop happened while the queue was full; it is delivered once there is room.
    assert!(wait_for(&mut handle, Duration::from_secs(2), |h| !h.is_running()));

    handle.shutdown();
}
