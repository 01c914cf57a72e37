//! Resource fitness calculation for one site.
//!
//! Evaluates how much cpu and memory the site still has free:
//! - **Allocation**: allocatable capacity summed over schedulable nodes
//! - **Usage**: pod requests, counting init containers at their peak
//! - **Score**: available capacity mapped linearly onto `[-100, 100]`

use rcs_state::{Node, Pod, PodSpec};

use crate::error::{ScoreError, ScoreResult};

pub const MAX_SCORE: f64 = 100.0;
pub const MIN_SCORE: f64 = -100.0;

pub const CPU: &str = "cpu";
pub const MEMORY: &str = "memory";

pub const ENV_MAX_CPU_COUNT: &str = "MAX_CPU_COUNT";
pub const ENV_MIN_CPU_COUNT: &str = "MIN_CPU_COUNT";
pub const ENV_MAX_MEMORY_BYTES: &str = "MAX_MEMORY_BYTES";
pub const ENV_MIN_MEMORY_BYTES: &str = "MIN_MEMORY_BYTES";

/// Normalization range for each resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBounds {
    /// Cores.
    pub max_cpu: f64,
    pub min_cpu: f64,
    /// Bytes.
    pub max_memory: f64,
    pub min_memory: f64,
}

impl Default for ScoreBounds {
    fn default() -> Self {
        Self {
            max_cpu: 100.0,
            min_cpu: 0.0,
            max_memory: 1_099_511_627_776.0,
            min_memory: 0.0,
        }
    }
}

impl ScoreBounds {
    /// Bounds from `MAX_CPU_COUNT`, `MIN_CPU_COUNT`, `MAX_MEMORY_BYTES` and
    /// `MIN_MEMORY_BYTES`, each falling back to its default when unset or empty.
    pub fn from_env() -> ScoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ScoreResult<Self> {
        let defaults = Self::default();
        let read = |name: &'static str, default: f64| -> ScoreResult<f64> {
            match lookup(name) {
                Some(raw) if !raw.trim().is_empty() => {
                    raw.trim().parse().map_err(|_| ScoreError::InvalidBound {
                        name,
                        value: raw.clone(),
                    })
                }
                _ => Ok(default),
            }
        };

        let bounds = Self {
            max_cpu: read(ENV_MAX_CPU_COUNT, defaults.max_cpu)?,
            min_cpu: read(ENV_MIN_CPU_COUNT, defaults.min_cpu)?,
            max_memory: read(ENV_MAX_MEMORY_BYTES, defaults.max_memory)?,
            min_memory: read(ENV_MIN_MEMORY_BYTES, defaults.min_memory)?,
        };
        if bounds.max_cpu <= bounds.min_cpu {
            return Err(ScoreError::EmptyRange {
                max_name: ENV_MAX_CPU_COUNT,
                min_name: ENV_MIN_CPU_COUNT,
            });
        }
        if bounds.max_memory <= bounds.min_memory {
            return Err(ScoreError::EmptyRange {
                max_name: ENV_MAX_MEMORY_BYTES,
                min_name: ENV_MIN_MEMORY_BYTES,
            });
        }
        Ok(bounds)
    }
}

/// Allocatable `resource` summed over nodes that accept new pods.
pub fn cluster_allocatable(nodes: &[Node], resource: &str) -> f64 {
    nodes
        .iter()
        .filter(|n| !n.spec.unschedulable)
        .filter_map(|n| n.status.allocatable.get(resource))
        .map(|q| q.as_f64())
        .sum()
}

/// Effective request of one pod.
///
/// Init containers run before the app containers, so the pod needs whichever
/// is larger: all app containers together, or its biggest init container.
pub fn pod_request(spec: &PodSpec, resource: &str, with_overhead: bool) -> f64 {
    let request = |c: &rcs_state::Container| {
        c.resources
            .requests
            .get(resource)
            .map_or(0.0, |q| q.as_f64())
    };

    let running: f64 = spec.containers.iter().map(request).sum();
    let peak = spec.init_containers.iter().map(request).fold(running, f64::max);

    let overhead = if with_overhead {
        spec.overhead.get(resource).map_or(0.0, |q| q.as_f64())
    } else {
        0.0
    };
    peak + overhead
}

/// Total requested `resource` across all pods.
pub fn pod_requests(pods: &[Pod], resource: &str, with_overhead: bool) -> f64 {
    pods.iter()
        .map(|p| pod_request(&p.spec, resource, with_overhead))
        .sum()
}

/// Map `available` onto `[-100, 100]` between `min` and `max`, truncating.
pub fn normalize(available: f64, max: f64, min: f64) -> i32 {
    let score = if available >= max {
        MAX_SCORE
    } else if available <= min {
        MIN_SCORE
    } else {
        (MAX_SCORE - MIN_SCORE) * (available - min) / (max - min) + MIN_SCORE
    };
    score.trunc() as i32
}

/// Normalized cpu and memory scores for one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceScores {
    pub cpu: i32,
    pub memory: i32,
}

/// Score the site described by `nodes` and `pods`.
pub fn score(
    nodes: &[Node],
    pods: &[Pod],
    bounds: &ScoreBounds,
    with_overhead: bool,
) -> ResourceScores {
    let available = |resource: &str| {
        cluster_allocatable(nodes, resource) - pod_requests(pods, resource, with_overhead)
    };
    ResourceScores {
        cpu: normalize(available(CPU), bounds.max_cpu, bounds.min_cpu),
        memory: normalize(available(MEMORY), bounds.max_memory, bounds.min_memory),
    }
}
