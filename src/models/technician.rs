//! Technicians: home location, working hours and carried resources.

use serde::{Deserialize, Serialize};

use super::{AttributeSet, TimeWindow};

/// A technician who leaves home, serves requests and returns home.
///
/// # Examples
///
/// ```
/// use trsp_alns::models::{AttributeSet, Technician, TimeWindow};
///
/// let hours = TimeWindow::new(0.0, 480.0).unwrap();
/// let t = Technician::new(10.0, 20.0, hours)
///     .with_skills(AttributeSet::from_ids(&[0, 1]).unwrap())
///     .with_spare_parts(vec![2, 0]);
/// assert_eq!(t.spare_parts(), &[2, 0]);
/// assert!(t.skills().contains(1));
/// assert!(t.tools().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    x: f64,
    y: f64,
    working_hours: TimeWindow,
    skills: AttributeSet,
    tools: AttributeSet,
    spare_parts: Vec<u32>,
}

impl Technician {
    /// Creates a technician living at `(x, y)` with the given working hours.
    ///
    /// Default: no skill, no tool, no spare part.
    pub fn new(x: f64, y: f64, working_hours: TimeWindow) -> Self {
        Self {
            x,
            y,
            working_hours,
            skills: AttributeSet::empty(),
            tools: AttributeSet::empty(),
            spare_parts: Vec::new(),
        }
    }

    /// Sets the skills held by the technician.
    pub fn with_skills(mut self, skills: AttributeSet) -> Self {
        self.skills = skills;
        self
    }

    /// Sets the tools carried from home.
    pub fn with_tools(mut self, tools: AttributeSet) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the spare-part capacity, one entry per part type.
    pub fn with_spare_parts(mut self, spare_parts: Vec<u32>) -> Self {
        self.spare_parts = spare_parts;
        self
    }

    /// X-coordinate of the home.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Y-coordinate of the home.
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Working hours; the tour starts and ends within them.
    pub fn working_hours(&self) -> TimeWindow {
        self.working_hours
    }

    pub fn skills(&self) -> AttributeSet {
        self.skills
    }

    pub fn tools(&self) -> AttributeSet {
        self.tools
    }

    /// Spare-part capacity per part type.
    pub fn spare_parts(&self) -> &[u32] {
        &self.spare_parts
    }

    /// Capacity for one part type (zero if the type is unknown).
    pub fn spare_part(&self, part: usize) -> u32 {
        self.spare_parts.get(part).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours() -> TimeWindow {
        TimeWindow::new(0.0, 100.0).expect("valid")
    }

    #[test]
    fn test_defaults() {
        let t = Technician::new(1.0, 2.0, hours());
        assert_eq!(t.x(), 1.0);
        assert_eq!(t.y(), 2.0);
        assert!(t.skills().is_empty());
        assert_eq!(t.spare_part(3), 0);
    }

    #[test]
    fn test_builder() {
        let tools = AttributeSet::from_ids(&[2]).expect("valid");
        let t = Technician::new(0.0, 0.0, hours())
            .with_tools(tools)
            .with_spare_parts(vec![1, 4]);
        assert!(t.tools().contains(2));
        assert_eq!(t.spare_part(1), 4);
    }
}
