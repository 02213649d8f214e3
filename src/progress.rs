use crate::domain::FailureReason;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub completed: usize,
    pub total: usize,
}

impl ProgressState {
    pub fn is_done(&self) -> bool {
        self.completed == self.total
    }
}

/// Advisory notice for one failed item, surfaced while the run is going.
#[derive(Debug, Clone)]
pub struct FailureNotice<'a> {
    pub row_index: u64,
    pub name: &'a str,
    pub reason: &'a FailureReason,
}

pub trait ProgressSink {
    fn progress(&self, state: ProgressState);

    fn warn(&self, _notice: &FailureNotice<'_>) {}
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&self, _state: ProgressState) {}
}

/// Run-scoped counter that only moves forward one outcome at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTracker {
    state: ProgressState,
}

impl ProgressTracker {
    pub fn reset(&mut self, total: usize) {
        self.state = ProgressState {
            completed: 0,
            total,
        };
    }

    /// Returns `None` once `completed` has reached `total`.
    pub fn advance(&mut self) -> Option<ProgressState> {
        if self.state.is_done() {
            return None;
        }
        self.state.completed += 1;
        Some(self.state)
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_stops_at_total() {
        let mut tracker = ProgressTracker::default();
        tracker.reset(2);
        assert_eq!(tracker.advance().map(|s| s.completed), Some(1));
        assert_eq!(tracker.advance().map(|s| s.completed), Some(2));
        assert_eq!(tracker.advance(), None);
        assert!(tracker.state().is_done());
    }

    #[test]
    fn empty_run_counts_as_done() {
        let mut tracker = ProgressTracker::default();
        tracker.reset(0);
        assert!(tracker.state().is_done());
        assert_eq!(tracker.advance(), None);
    }
}
