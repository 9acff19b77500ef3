//! Completion tracking for dispatched words.
//!
//! The producer counts every word it hands to the workers and waits for the
//! count to drain before closing the work channel. A [`CompletionTicket`]
//! travels with each word and releases its unit when dropped, so every `add`
//! is matched by exactly one `done` on every path, including failures.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Counter of outstanding work with a blocking wait for zero.
#[derive(Default)]
pub struct CompletionTracker {
    count: Mutex<usize>,
    drained: Condvar,
}

impl CompletionTracker {
    /// Creates a tracker with nothing outstanding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `n` more units of outstanding work.
    pub fn add(&self, n: usize) {
        *self.count.lock() += n;
    }

    /// Marks one unit of work as finished.
    ///
    /// # Panics
    ///
    /// Panics if nothing is outstanding.
    pub fn done(&self) {
        let mut count = self.count.lock();
        assert!(*count > 0, "CompletionTracker::done called with no outstanding work");
        *count -= 1;
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    /// Blocks until no work is outstanding.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }

    /// Number of units currently outstanding.
    pub fn pending(&self) -> usize {
        *self.count.lock()
    }

    /// Registers one unit and returns the ticket that will release it.
    pub fn ticket(self: &Arc<Self>) -> CompletionTicket {
        self.add(1);
        CompletionTicket {
            tracker: Arc::clone(self),
        }
    }
}

/// One unit of outstanding work; calls [`CompletionTracker::done`] on drop.
#[must_use = "dropping a ticket immediately marks its work as done"]
pub struct CompletionTicket {
    tracker: Arc<CompletionTracker>,
}

impl Drop for CompletionTicket {
    fn drop(&mut self) {
        self.tracker.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_immediately_when_idle() {
        let tracker = CompletionTracker::new();
        tracker.wait();
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn test_add_done_balance() {
        let tracker = CompletionTracker::new();
        tracker.add(3);
        assert_eq!(tracker.pending(), 3);
        tracker.done();
        tracker.done();
        assert_eq!(tracker.pending(), 1);
        tracker.done();
        tracker.wait();
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    #[should_panic(expected = "no outstanding work")]
    fn test_done_without_add_panics() {
        CompletionTracker::new().done();
    }

    #[test]
    fn test_ticket_releases_on_drop() {
        let tracker = Arc::new(CompletionTracker::new());
        let a = tracker.ticket();
        let b = tracker.ticket();
        assert_eq!(tracker.pending(), 2);
        drop(a);
        assert_eq!(tracker.pending(), 1);
        drop(b);
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn test_concurrent_done() {
        let tracker = Arc::new(CompletionTracker::new());
        let tickets: Vec<_> = (0..800).map(|_| tracker.ticket()).collect();
        let mut chunks: Vec<Vec<CompletionTicket>> = (0..8).map(|_| Vec::new()).collect();
        for (i, ticket) in tickets.into_iter().enumerate() {
            chunks[i % 8].push(ticket);
        }

        let handles: Vec<_> = chunks
            .into_iter()
            .map(|chunk| thread::spawn(move || drop(chunk)))
            .collect();
        tracker.wait();
        assert_eq!(tracker.pending(), 0);
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_wait_blocks_until_work_finishes() {
        let tracker = Arc::new(CompletionTracker::new());
        let finished = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ticket = tracker.ticket();
                let finished = Arc::clone(&finished);
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(20));
                    finished.fetch_add(1, Ordering::SeqCst);
                    drop(ticket);
                })
            })
            .collect();

        tracker.wait();
        assert_eq!(finished.load(Ordering::SeqCst), 4);
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
