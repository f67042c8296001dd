use crate::ports::ProgressPort;

/// Notify the progress port after this many paths.
pub const DEFAULT_CADENCE: u64 = 64;

/// Counts dequeued paths. Purely observational: it never sees the digests.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    processed: u64,
    cadence: u64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_cadence(DEFAULT_CADENCE)
    }

    pub fn with_cadence(cadence: u64) -> Self {
        Self {
            processed: 0,
            cadence: cadence.max(1),
        }
    }

    pub fn record<P: ProgressPort + ?Sized>(&mut self, port: &P) {
        self.processed += 1;
        if self.processed % self.cadence == 0 {
            port.update(self.processed);
        }
    }

    pub fn finish<P: ProgressPort + ?Sized>(&self, port: &P) {
        port.finish(self.processed);
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        updates: RefCell<Vec<u64>>,
        finished: RefCell<Option<u64>>,
    }

    impl ProgressPort for Recorder {
        fn start(&self, _total: Option<u64>) {}

        fn update(&self, processed: u64) {
            self.updates.borrow_mut().push(processed);
        }

        fn finish(&self, processed: u64) {
            *self.finished.borrow_mut() = Some(processed);
        }
    }

    #[test]
    fn reports_at_fixed_cadence_and_on_finish() {
        let port = Recorder::default();
        let mut tracker = ProgressTracker::with_cadence(3);
        for _ in 0..7 {
            tracker.record(&port);
        }
        tracker.finish(&port);

        assert_eq!(*port.updates.borrow(), vec![3, 6]);
        assert_eq!(*port.finished.borrow(), Some(7));
        assert_eq!(tracker.processed(), 7);
    }

    #[test]
    fn zero_cadence_is_treated_as_every_path() {
        let port = Recorder::default();
        let mut tracker = ProgressTracker::with_cadence(0);
        tracker.record(&port);
        tracker.record(&port);
        assert_eq!(*port.updates.borrow(), vec![1, 2]);
    }
}
