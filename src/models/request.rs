//! Service requests.

use serde::{Deserialize, Serialize};

use super::{AttributeSet, TimeWindow};

/// A job at a customer location.
///
/// A request needs a technician holding all its skills, carrying all its
/// tools (possibly picked up at the main depot) and enough spare parts.
///
/// # Examples
///
/// ```
/// use trsp_alns::models::{AttributeSet, Request, TimeWindow};
///
/// let r = Request::new(3.0, 4.0, 15.0)
///     .with_time_window(TimeWindow::new(60.0, 120.0).unwrap())
///     .with_skills(AttributeSet::from_ids(&[2]).unwrap())
///     .with_spare_parts(vec![1]);
/// assert_eq!(r.service_time(), 15.0);
/// assert_eq!(r.spare_part(0), 1);
/// assert_eq!(r.spare_part(5), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    x: f64,
    y: f64,
    service_time: f64,
    time_window: Option<TimeWindow>,
    skills: AttributeSet,
    tools: AttributeSet,
    spare_parts: Vec<u32>,
}

impl Request {
    /// Creates a request at `(x, y)` with the given service duration.
    ///
    /// Without an explicit time window the request inherits the main depot's.
    pub fn new(x: f64, y: f64, service_time: f64) -> Self {
        Self {
            x,
            y,
            service_time,
            time_window: None,
            skills: AttributeSet::empty(),
            tools: AttributeSet::empty(),
            spare_parts: Vec::new(),
        }
    }

    /// Sets a time window for this request.
    pub fn with_time_window(mut self, tw: TimeWindow) -> Self {
        self.time_window = Some(tw);
        self
    }

    /// Sets the required skills.
    pub fn with_skills(mut self, skills: AttributeSet) -> Self {
        self.skills = skills;
        self
    }

    /// Sets the required tools.
    pub fn with_tools(mut self, tools: AttributeSet) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the required spare parts, one entry per part type.
    pub fn with_spare_parts(mut self, spare_parts: Vec<u32>) -> Self {
        self.spare_parts = spare_parts;
        self
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn service_time(&self) -> f64 {
        self.service_time
    }

    /// Explicit time window, if any.
    pub fn time_window(&self) -> Option<TimeWindow> {
        self.time_window
    }

    pub fn skills(&self) -> AttributeSet {
        self.skills
    }

    pub fn tools(&self) -> AttributeSet {
        self.tools
    }

    /// Required quantity per part type.
    pub fn spare_parts(&self) -> &[u32] {
        &self.spare_parts
    }

    /// Required quantity of one part type (zero if unspecified).
    pub fn spare_part(&self, part: usize) -> u32 {
        self.spare_parts.get(part).copied().unwrap_or(0)
    }
}

/// The main depot where technicians pick up tools and refill spare parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depot {
    x: f64,
    y: f64,
    time_window: TimeWindow,
    service_time: f64,
}

impl Depot {
    /// Creates a depot at `(x, y)` open during `time_window`.
    pub fn new(x: f64, y: f64, time_window: TimeWindow) -> Self {
        Self {
            x,
            y,
            time_window,
            service_time: 0.0,
        }
    }

    /// Sets the time spent at the depot to reload.
    pub fn with_service_time(mut self, service_time: f64) -> Self {
        self.service_time = service_time;
        self
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn time_window(&self) -> TimeWindow {
        self.time_window
    }

    pub fn service_time(&self) -> f64 {
        self.service_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let r = Request::new(1.0, 2.0, 5.0);
        assert!(r.time_window().is_none());
        assert!(r.skills().is_empty());
        assert!(r.tools().is_empty());
        assert!(r.spare_parts().is_empty());
    }

    #[test]
    fn test_depot() {
        let tw = TimeWindow::new(0.0, 500.0).expect("valid");
        let d = Depot::new(0.0, 0.0, tw).with_service_time(10.0);
        assert_eq!(d.service_time(), 10.0);
        assert_eq!(d.time_window().end(), 500.0);
    }
}
