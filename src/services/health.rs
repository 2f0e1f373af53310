//! Weighted composite health classification
//!
//! CPU, memory and disk utilisation are converted to headroom scores
//! (`100 - utilisation`, floored at zero); the running-services percentage
//! is already "higher is better" and is used as is.

use serde::Serialize;

use super::round2;

pub const HEALTHY_SCORE: f64 = 80.0;
pub const WARNING_SCORE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthWeights {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub services: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            cpu: 0.25,
            memory: 0.25,
            disk: 0.25,
            services: 0.25,
        }
    }
}

/// Raw percentages sampled at one point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observations {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub services_running: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthScore {
    pub score: f64,
    pub status: HealthStatus,
    pub weights: HealthWeights,
}

pub fn headroom(utilisation: f64) -> f64 {
    (100.0 - utilisation).max(0.0)
}

pub fn weighted_score(obs: &Observations, weights: &HealthWeights) -> f64 {
    headroom(obs.cpu_usage) * weights.cpu
        + headroom(obs.memory_usage) * weights.memory
        + headroom(obs.disk_usage) * weights.disk
        + obs.services_running * weights.services
}

pub fn classify(score: f64) -> HealthStatus {
    if score >= HEALTHY_SCORE {
        HealthStatus::Healthy
    } else if score >= WARNING_SCORE {
        HealthStatus::Warning
    } else {
        HealthStatus::Critical
    }
}

/// Classification happens on the unrounded score; only the published
/// value is rounded.
pub fn evaluate(obs: &Observations) -> HealthScore {
    let weights = HealthWeights::default();
    let score = weighted_score(obs, &weights);
    HealthScore {
        score: round2(score),
        status: classify(score),
        weights,
    }
}

fn utilisation_status(usage: f64, critical_above: f64, warning_above: f64) -> HealthStatus {
    if usage > critical_above {
        HealthStatus::Critical
    } else if usage > warning_above {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

pub fn cpu_status(usage: f64) -> HealthStatus {
    utilisation_status(usage, 95.0, 80.0)
}

pub fn memory_status(usage: f64) -> HealthStatus {
    utilisation_status(usage, 95.0, 80.0)
}

pub fn disk_status(usage: f64) -> HealthStatus {
    utilisation_status(usage, 90.0, 80.0)
}

pub fn services_status(running_percentage: f64) -> HealthStatus {
    if running_percentage >= 100.0 {
        HealthStatus::Healthy
    } else {
        HealthStatus::Warning
    }
}
