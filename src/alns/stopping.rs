//! Stopping criterion of the search loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Iteration budget, time budget and cooperative cancellation.
///
/// The flag is shared: cancelling one clone stops every search polling it.
///
/// # Examples
///
/// ```
/// use trsp_alns::alns::StoppingCriterion;
///
/// let mut stop = StoppingCriterion::new(Some(2), None);
/// stop.start();
/// assert!(!stop.is_met());
/// stop.update();
/// stop.update();
/// assert!(stop.is_met());
///
/// let mut stop = StoppingCriterion::new(None, None);
/// stop.start();
/// stop.cancel_handle().store(true, std::sync::atomic::Ordering::Relaxed);
/// assert!(stop.is_met());
/// assert!(stop.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct StoppingCriterion {
    max_iterations: Option<usize>,
    max_time: Option<Duration>,
    cancel: Arc<AtomicBool>,
    iterations: usize,
    started: Option<Instant>,
}

impl StoppingCriterion {
    pub fn new(max_iterations: Option<usize>, max_time: Option<Duration>) -> Self {
        Self {
            max_iterations,
            max_time,
            cancel: Arc::new(AtomicBool::new(false)),
            iterations: 0,
            started: None,
        }
    }

    /// Polls `flag` in addition to the budgets.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }

    pub fn max_time(&self) -> Option<Duration> {
        self.max_time
    }

    /// Resets the counters and starts the clock.
    pub fn start(&mut self) {
        self.iterations = 0;
        self.started = Some(Instant::now());
    }

    /// Counts one iteration.
    pub fn update(&mut self) {
        self.iterations += 1;
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Returns `true` once a budget is exhausted or the flag is raised.
    pub fn is_met(&self) -> bool {
        self.is_cancelled()
            || self.max_iterations.is_some_and(|max| self.iterations >= max)
            || self.max_time.is_some_and(|max| self.elapsed() >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_budget() {
        let mut stop = StoppingCriterion::new(None, Some(Duration::ZERO));
        stop.start();
        assert!(stop.is_met());
        assert!(!stop.is_cancelled());
    }

    #[test]
    fn test_start_resets_iterations() {
        let mut stop = StoppingCriterion::new(Some(1), None);
        stop.start();
        stop.update();
        assert!(stop.is_met());
        stop.start();
        assert_eq!(stop.iterations(), 0);
        assert!(!stop.is_met());
    }

    #[test]
    fn test_shared_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let a = StoppingCriterion::new(None, None).with_cancel_flag(Arc::clone(&flag));
        let b = a.clone();
        flag.store(true, Ordering::Relaxed);
        assert!(a.is_met() && b.is_met());
    }
}
