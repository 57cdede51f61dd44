//! One-shot cancellable timers on a virtual millisecond clock.

/// Handle returned by [`TimerQueue::schedule`]; never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct PendingTimer<E> {
    handle: TimerHandle,
    at_ms: f64,
    event: E,
}

/// A fired timer.
#[derive(Debug, Clone, PartialEq)]
pub struct Due<E> {
    pub handle: TimerHandle,
    pub at_ms: f64,
    pub event: E,
}

/// Pending deferred events. Only a handful are ever outstanding (one tick plus
/// one note-off per sounding note), so a flat list is scanned on pop.
#[derive(Debug, Clone)]
pub struct TimerQueue<E> {
    pending: Vec<PendingTimer<E>>,
    next_handle: u64,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_handle: 1,
        }
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at_ms: f64, event: E) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push(PendingTimer {
            handle,
            at_ms,
            event,
        });
        handle
    }

    /// Remove a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        self.pending.len() != before
    }

    /// Earliest timer due at or before `now_ms`. Equal deadlines fire in
    /// scheduling order.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<Due<E>> {
        let idx = self.earliest()?;
        if self.pending[idx].at_ms > now_ms {
            return None;
        }
        let timer = self.pending.remove(idx);
        Some(Due {
            handle: timer.handle,
            at_ms: timer.at_ms,
            event: timer.event,
        })
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.earliest().map(|idx| self.pending[idx].at_ms)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn earliest(&self) -> Option<usize> {
        self.pending
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.at_ms
                    .total_cmp(&b.at_ms)
                    .then_with(|| a.handle.cmp(&b.handle))
            })
            .map(|(idx, _)| idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(30.0, "c");
        q.schedule(10.0, "a");
        q.schedule(20.0, "b");
        assert_eq!(q.next_deadline(), Some(10.0));
        assert_eq!(q.pop_due(100.0).map(|d| d.event), Some("a"));
        assert_eq!(q.pop_due(100.0).map(|d| d.event), Some("b"));
        assert_eq!(q.pop_due(100.0).map(|d| d.event), Some("c"));
        assert!(q.pop_due(100.0).is_none());
    }

    #[test]
    fn nothing_due_before_deadline() {
        let mut q = TimerQueue::new();
        q.schedule(50.0, ());
        assert!(q.pop_due(49.9).is_none());
        assert!(q.pop_due(50.0).is_some());
    }

    #[test]
    fn ties_fire_in_scheduling_order() {
        let mut q = TimerQueue::new();
        q.schedule(10.0, 1);
        q.schedule(10.0, 2);
        assert_eq!(q.pop_due(10.0).map(|d| d.event), Some(1));
        assert_eq!(q.pop_due(10.0).map(|d| d.event), Some(2));
    }

    #[test]
    fn cancel_removes_once() {
        let mut q = TimerQueue::new();
        let h = q.schedule(10.0, ());
        assert_eq!(q.len(), 1);
        assert!(q.cancel(h));
        assert!(!q.cancel(h));
        assert!(q.is_empty());
    }

    #[test]
    fn handles_are_unique() {
        let mut q = TimerQueue::new();
        let a = q.schedule(1.0, ());
        q.pop_due(1.0);
        let b = q.schedule(1.0, ());
        assert_ne!(a, b);
    }
}
