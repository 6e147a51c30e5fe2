//! Statistics record of a complete run.
//!
//! A run goes through up to three stages (initial solution, ALNS,
//! post-optimization). Each recorded stage keeps its wall time, objective,
//! number of unserved requests and the consistency report of the checker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrspError};
use crate::evaluation::SolutionChecker;
use crate::models::Instance;
use crate::solution::Solution;

/// Outcome of one stage of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    /// Wall time in seconds.
    pub time: f64,
    pub objective: f64,
    pub unserved: usize,
    /// Checker report, empty when the solution is consistent.
    pub check: String,
}

impl StageStats {
    pub fn new(solution: &Solution, time: Duration, checker: &SolutionChecker) -> Self {
        Self {
            time: time.as_secs_f64(),
            objective: solution.objective(),
            unserved: solution.unserved_count(),
            check: checker.check_solution(solution).join("; "),
        }
    }
}

/// Flat record describing a run, serializable to JSON.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::evaluation::SolutionChecker;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::solution::Solution;
/// use trsp_alns::stats::RunStatistics;
///
/// let day = TimeWindow::new(0.0, 100.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day)],
///         vec![Request::new(3.0, 4.0, 0.0)],
///     )
///     .unwrap(),
/// );
/// let solution = Solution::from_routes(
///     Arc::clone(&instance),
///     Arc::new(TravelDistance::new()),
///     &[vec![1, 2, 3]],
/// )
/// .unwrap();
///
/// let checker = SolutionChecker::new(&instance);
/// let mut stats = RunStatistics::new(1, &instance).with_best_known(8.0);
/// stats.record_initial(&solution, Duration::from_millis(5), &checker);
/// stats.finish(&solution, &checker);
///
/// assert_eq!(stats.routes, "t0:1,2,3");
/// assert!((stats.gap().unwrap() - 0.25).abs() < 1e-12);
/// assert!(stats.to_json().unwrap().contains("\"instance\":\"doc\""));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunStatistics {
    pub run_id: u64,
    pub instance: String,
    /// Instance family, for grouping benchmark results.
    pub group: String,
    /// Number of requests.
    pub size: usize,
    pub technicians: usize,
    pub seeds: Vec<u64>,
    pub initial: Option<StageStats>,
    pub alns: Option<StageStats>,
    pub postopt: Option<StageStats>,
    /// Stage of the returned solution.
    pub final_stage: Option<StageStats>,
    /// Sum of the stage times, in seconds.
    pub total_time: f64,
    pub best_known: Option<f64>,
    /// Compact encoding of the final routes, see [`encode_routes`].
    pub routes: String,
}

impl RunStatistics {
    pub fn new(run_id: u64, instance: &Instance) -> Self {
        Self {
            run_id,
            instance: instance.name().to_string(),
            size: instance.request_count(),
            technicians: instance.technician_count(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<u64>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn with_best_known(mut self, value: f64) -> Self {
        self.best_known = Some(value);
        self
    }

    pub fn record_initial(&mut self, solution: &Solution, time: Duration, checker: &SolutionChecker) {
        self.initial = Some(StageStats::new(solution, time, checker));
    }

    pub fn record_alns(&mut self, solution: &Solution, time: Duration, checker: &SolutionChecker) {
        self.alns = Some(StageStats::new(solution, time, checker));
    }

    pub fn record_postopt(&mut self, solution: &Solution, time: Duration, checker: &SolutionChecker) {
        self.postopt = Some(StageStats::new(solution, time, checker));
    }

    /// Records the returned solution and the total time.
    pub fn finish(&mut self, solution: &Solution, checker: &SolutionChecker) {
        self.total_time = [&self.initial, &self.alns, &self.postopt]
            .into_iter()
            .flatten()
            .map(|s| s.time)
            .sum();
        self.final_stage = Some(StageStats::new(
            solution,
            Duration::from_secs_f64(self.total_time),
            checker,
        ));
        self.routes = encode_routes(solution);
    }

    /// Relative gap of the final objective to the best known value.
    pub fn gap(&self) -> Option<f64> {
        let best = self.best_known?;
        let value = self.final_stage.as_ref()?.objective;
        if best == 0.0 {
            return None;
        }
        Some((value - best) / best)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Encodes the tours as `t<id>:<n1>,<n2>,...` joined by `;`.
pub fn encode_routes(solution: &Solution) -> String {
    solution
        .tours()
        .iter()
        .map(|tour| {
            let nodes: Vec<String> = tour.iter().map(|n| n.to_string()).collect();
            format!("t{}:{}", tour.technician(), nodes.join(","))
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Decodes [`encode_routes`] output into routes indexed by technician.
pub fn decode_routes(encoded: &str) -> Result<Vec<Vec<usize>>> {
    let invalid = |part: &str| TrspError::InvalidParameter {
        name: "routes",
        reason: format!("cannot parse `{part}`"),
    };
    let mut routes: Vec<Vec<usize>> = Vec::new();
    for part in encoded.split(';').filter(|p| !p.is_empty()) {
        let (tech, nodes) = part
            .strip_prefix('t')
            .and_then(|p| p.split_once(':'))
            .ok_or_else(|| invalid(part))?;
        let tech: usize = tech.parse().map_err(|_| invalid(part))?;
        let nodes = nodes
            .split(',')
            .filter(|n| !n.is_empty())
            .map(|n| n.parse().map_err(|_| invalid(part)))
            .collect::<Result<Vec<usize>>>()?;
        if routes.len() <= tech {
            routes.resize(tech + 1, Vec::new());
        }
        routes[tech] = nodes;
    }
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cost::TravelDistance;
    use crate::models::{Depot, Request, Technician, TimeWindow};

    fn solution() -> Solution {
        let day = TimeWindow::new(0.0, 100.0).expect("valid");
        let instance = Arc::new(
            Instance::new(
                "stats",
                Depot::new(0.0, 0.0, day),
                vec![Technician::new(0.0, 0.0, day), Technician::new(5.0, 0.0, day)],
                vec![Request::new(1.0, 0.0, 0.0), Request::new(4.0, 0.0, 0.0)],
            )
            .expect("valid instance"),
        );
        Solution::from_routes(
            instance,
            Arc::new(TravelDistance::new()),
            &[vec![1, 3, 5], vec![2, 4, 6]],
        )
        .expect("valid routes")
    }

    #[test]
    fn test_routes_encoding() {
        let s = solution();
        let encoded = encode_routes(&s);
        assert_eq!(encoded, "t0:1,3,5;t1:2,4,6");
        assert_eq!(decode_routes(&encoded).expect("valid"), s.to_routes());
        assert!(decode_routes("x0:1").is_err());
        assert!(decode_routes("t0:1,a").is_err());
    }

    #[test]
    fn test_stage_times_add_up() {
        let s = solution();
        let checker = SolutionChecker::new(s.instance());
        let mut stats = RunStatistics::new(7, s.instance())
            .with_group("line")
            .with_seeds(vec![1, 2]);
        stats.record_initial(&s, Duration::from_millis(250), &checker);
        stats.record_alns(&s, Duration::from_millis(750), &checker);
        stats.finish(&s, &checker);

        assert!((stats.total_time - 1.0).abs() < 1e-9);
        let last = stats.final_stage.as_ref().expect("finished");
        assert!(last.check.is_empty());
        assert_eq!(last.unserved, 0);
        assert_eq!(stats.gap(), None);
        assert!(stats.postopt.is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let s = solution();
        let checker = SolutionChecker::new(s.instance());
        let mut stats = RunStatistics::new(3, s.instance()).with_best_known(2.0);
        stats.finish(&s, &checker);
        let back = RunStatistics::from_json(&stats.to_json_pretty().expect("json")).expect("parse");
        assert_eq!(back, stats);
        assert_eq!(back.size, 2);
        assert_eq!(back.technicians, 2);
    }
}
