//! Headless invariant audit: run the flock for N ticks, check every agent each
//! tick, and summarize the run as a JSON report.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::environment::EnvironmentQuery;
use crate::error::ReportError;
use crate::flock::FlockRegistry;
use crate::reporting::{MetricSeries, MetricSummary};
use crate::simulation::SimState;
use crate::stats::FlockMetrics;

/// Fraction of agent samples allowed outside the boundary volume.
const MAX_OUTSIDE_RATIO: f64 = 0.05;
/// Step time considered real-time at 60 Hz.
const FRAME_BUDGET_MS: f64 = 1000.0 / 60.0;

#[derive(Debug, Clone, Serialize)]
pub struct AuditCheck {
    pub name: String,
    pub passed: bool,
    pub details: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub seed: u64,
    pub initial_agents: usize,
    pub final_agents: usize,
    pub ticks: u64,
    pub update_order: String,
    pub neighbor_strategy: String,
    pub overall_status: String,
    pub checks: Vec<AuditCheck>,
    pub metrics: Vec<MetricSummary>,
}

impl AuditReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.metric == name)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Accumulates per-tick observations of a flock.
pub struct FlockAudit {
    samples: u64,
    speed_violations: u64,
    non_finite_samples: u64,
    non_unit_forward_samples: u64,
    outside_boundary_samples: u64,
    avg_speed: MetricSeries,
    polarization: MetricSeries,
    avg_neighbors: MetricSeries,
    step_ms: MetricSeries,
}

impl Default for FlockAudit {
    fn default() -> Self {
        Self::new()
    }
}

impl FlockAudit {
    pub fn new() -> Self {
        Self {
            samples: 0,
            speed_violations: 0,
            non_finite_samples: 0,
            non_unit_forward_samples: 0,
            outside_boundary_samples: 0,
            avg_speed: MetricSeries::new("avg_speed"),
            polarization: MetricSeries::new("polarization"),
            avg_neighbors: MetricSeries::new("avg_neighbors"),
            step_ms: MetricSeries::with_budget("step_ms", FRAME_BUDGET_MS),
        }
    }

    pub fn observe(&mut self, flock: &FlockRegistry) {
        let cfg = flock.config();
        let speed_limit = cfg.max_speed * (1.0 + 1.0e-4);
        for (_, agent) in flock.all_agents() {
            self.samples += 1;
            if !agent.position.is_finite() || !agent.velocity.is_finite() {
                self.non_finite_samples += 1;
                continue;
            }
            if agent.speed() > speed_limit {
                self.speed_violations += 1;
            }
            if (agent.forward.length() - 1.0).abs() > 1.0e-3 {
                self.non_unit_forward_samples += 1;
            }
            if !cfg.boundary.contains(agent.position) {
                self.outside_boundary_samples += 1;
            }
        }

        let m = FlockMetrics::measure(flock);
        self.avg_speed.push(m.avg_speed as f64);
        self.polarization.push(m.polarization as f64);
        self.avg_neighbors.push(m.avg_neighbors as f64);
    }

    pub fn record_step_time(&mut self, ms: f64) {
        self.step_ms.push(ms);
    }

    pub fn checks(&self) -> Vec<AuditCheck> {
        let outside_ratio = if self.samples > 0 {
            self.outside_boundary_samples as f64 / self.samples as f64
        } else {
            0.0
        };
        vec![
            AuditCheck {
                name: "speed_within_max_speed".to_string(),
                passed: self.speed_violations == 0,
                details: format!("speed_violations={}", self.speed_violations),
            },
            AuditCheck {
                name: "agent_state_is_finite".to_string(),
                passed: self.non_finite_samples == 0,
                details: format!("non_finite_samples={}", self.non_finite_samples),
            },
            AuditCheck {
                name: "forward_is_unit_length".to_string(),
                passed: self.non_unit_forward_samples == 0,
                details: format!("non_unit_forward_samples={}", self.non_unit_forward_samples),
            },
            AuditCheck {
                name: "flock_stays_near_boundary".to_string(),
                passed: outside_ratio <= MAX_OUTSIDE_RATIO,
                details: format!(
                    "outside_samples={}, samples={}, ratio={:.4}",
                    self.outside_boundary_samples, self.samples, outside_ratio
                ),
            },
        ]
    }

    pub fn report<E>(&self, sim: &SimState<E>, initial_agents: usize, ticks: u64) -> AuditReport {
        let checks = self.checks();
        let all_passed = checks.iter().all(|c| c.passed);
        AuditReport {
            seed: sim.seed,
            initial_agents,
            final_agents: sim.flock.len(),
            ticks,
            update_order: format!("{:?}", sim.update_order),
            neighbor_strategy: sim.neighbor_strategy().label().to_string(),
            overall_status: if all_passed { "PASS" } else { "FAIL" }.to_string(),
            checks,
            metrics: [
                &self.avg_speed,
                &self.polarization,
                &self.avg_neighbors,
                &self.step_ms,
            ]
            .into_iter()
            .map(MetricSeries::summary)
            .collect(),
        }
    }
}

/// Tick `sim` `ticks` times, observing the flock after every step.
pub fn run<E: EnvironmentQuery>(sim: &mut SimState<E>, ticks: u64) -> AuditReport {
    let initial_agents = sim.flock.len();
    let mut audit = FlockAudit::new();
    info!(ticks, agents = initial_agents, "audit started");

    for _ in 0..ticks {
        let start = Instant::now();
        sim.tick();
        audit.record_step_time(start.elapsed().as_secs_f64() * 1000.0);
        audit.observe(&sim.flock);
    }

    let report = audit.report(sim, initial_agents, ticks);
    for check in report.checks.iter().filter(|c| !c.passed) {
        warn!(check = %check.name, details = %check.details, "audit check failed");
    }
    info!(status = %report.overall_status, "audit finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::config::FlockConfig;
    use crate::environment::OpenSky;
    use macroquad::prelude::{vec3, Vec3};

    #[test]
    fn seeded_world_passes_core_checks() {
        let mut sim = SimState::new(60, 11);
        let report = run(&mut sim, 90);
        assert_eq!(report.ticks, 90);
        assert_eq!(report.initial_agents, 60);
        let step_ms = report.metric("step_ms").unwrap();
        assert_eq!(step_ms.samples, 90);
        assert!(step_ms.within_budget_pct.is_some());
        assert_eq!(report.metric("polarization").unwrap().samples, 90);
        assert!(report.metric("avg_speed").unwrap().within_budget_pct.is_none());
        for name in [
            "speed_within_max_speed",
            "agent_state_is_finite",
            "forward_is_unit_length",
        ] {
            let check = report.checks.iter().find(|c| c.name == name).unwrap();
            assert!(check.passed, "{name}: {}", check.details);
        }
    }

    #[test]
    fn speeding_agent_fails_report() {
        let mut flock = FlockRegistry::new(FlockConfig::default()).unwrap();
        let max = flock.config().max_speed;
        flock.add_agent(Agent::new(Vec3::ZERO, vec3(max * 2.0, 0.0, 0.0)));
        let sim = SimState::with_environment(flock, OpenSky, 3);

        let mut audit = FlockAudit::new();
        audit.observe(&sim.flock);
        let report = audit.report(&sim, 1, 0);
        assert!(!report.passed());
        assert_eq!(report.overall_status, "FAIL");
    }

    #[test]
    fn report_serializes_to_json() {
        let mut sim = SimState::with_environment(FlockRegistry::default(), OpenSky, 5);
        let report = run(&mut sim, 3);
        let path = std::env::temp_dir().join("murmuration_audit_test.json");
        report.write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["ticks"], 3);
        assert_eq!(value["overall_status"], "PASS");
        assert_eq!(value["metrics"][3]["metric"], "step_ms");
        let _ = std::fs::remove_file(path);
    }
}
