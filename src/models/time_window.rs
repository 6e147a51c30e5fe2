//! Service time windows of nodes and working hours of technicians.

use serde::{Deserialize, Serialize};

/// Interval `[start, end]` in which service may begin.
///
/// Arriving early means waiting until `start`; arriving after `end` is
/// infeasible. Homes and their duplicates use the technician's working
/// hours, requests without an explicit window use the main depot's.
///
/// # Examples
///
/// ```
/// use trsp_alns::models::TimeWindow;
///
/// let shift = TimeWindow::new(480.0, 960.0).unwrap();
/// assert_eq!(shift.earliest_start(450.0), 480.0);
/// assert_eq!(shift.waiting_time(450.0), 30.0);
/// assert_eq!(shift.slack(900.0), 60.0);
/// assert!(shift.is_violated(961.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: f64,
    end: f64,
}

impl TimeWindow {
    /// `None` unless both bounds are finite and `start <= end`.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        (start.is_finite() && end.is_finite() && start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Idle time before service when arriving at `arrival`.
    pub fn waiting_time(&self, arrival: f64) -> f64 {
        (self.start - arrival).max(0.0)
    }

    pub fn earliest_start(&self, arrival: f64) -> f64 {
        arrival.max(self.start)
    }

    /// How much `arrival` may still be delayed; negative once violated.
    pub fn slack(&self, arrival: f64) -> f64 {
        self.end - arrival
    }

    pub fn is_violated(&self, arrival: f64) -> bool {
        arrival > self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_windows() {
        assert!(TimeWindow::new(20.0, 10.0).is_none());
        assert!(TimeWindow::new(f64::NAN, 10.0).is_none());
        assert!(TimeWindow::new(0.0, f64::INFINITY).is_none());
        assert!(TimeWindow::new(5.0, 5.0).is_some());
    }

    #[test]
    fn test_early_arrival_waits() {
        let tw = TimeWindow::new(10.0, 20.0).expect("valid");
        assert_eq!(tw.waiting_time(4.0), 6.0);
        assert_eq!(tw.waiting_time(15.0), 0.0);
        assert_eq!(tw.earliest_start(4.0), 10.0);
        assert_eq!(tw.earliest_start(12.0), 12.0);
    }

    #[test]
    fn test_late_arrival_is_violated() {
        let tw = TimeWindow::new(10.0, 20.0).expect("valid");
        assert!(!tw.is_violated(20.0));
        assert_eq!(tw.slack(20.0), 0.0);
        assert!(tw.is_violated(20.5));
        assert!(tw.slack(20.5) < 0.0);
    }
}
