//! Detection targets and per-target result types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Default per-attempt timeout when neither target nor group specifies one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Classified failure of a single probe attempt.
///
/// These are ordinary result values, not run-aborting errors. The chain
/// records them per attempt and keeps degrading to the next strategy.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeError {
    /// The attempt exceeded its allotted timeout.
    #[error("timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The target could not be contacted or did not respond as expected.
    #[error("unreachable: {reason}")]
    Unreachable { reason: String },

    /// The strategy's prerequisites are unmet (e.g. a required binary or
    /// model file is missing), discovered only at detect time.
    #[error("capability missing: {reason}")]
    Capability { reason: String },
}

/// One configured strategy entry on a target: which strategy to try, at
/// what priority, with what parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyDescriptor {
    /// Strategy name; must match a registered implementation to be used.
    pub name: String,

    /// Higher priorities are tried first.
    pub priority: i32,

    /// Disabled descriptors are excluded at chain construction time.
    pub enabled: bool,

    /// Opaque parameter bundle passed through to the strategy.
    pub params: serde_json::Value,
}

impl StrategyDescriptor {
    /// Create an enabled descriptor with the given name and priority.
    pub fn new(name: &str, priority: i32, params: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            priority,
            enabled: true,
            params,
        }
    }
}

/// One concrete thing to probe: a URL, a repository, an installed tool.
///
/// Immutable once resolved for a run; cloned into worker threads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    /// Unique within its group.
    pub id: String,

    /// Human-readable name for the report.
    pub display_name: String,

    /// Tag identifying which family of strategies apply
    /// (e.g. "reachability", "dependency").
    pub kind: String,

    /// Ordered strategy parameter bundles for this target.
    pub strategies: Vec<StrategyDescriptor>,

    /// For CONDITIONAL groups: this target's failure forces group failure.
    pub required: bool,

    /// Relative weight for report ordering.
    pub weight: f64,

    /// Per-attempt timeout.
    #[serde(skip)]
    pub timeout: Duration,

    /// Total attempts per strategy before falling back (min 1).
    pub retry_count: u32,

    /// Delay between retries of the same strategy.
    #[serde(skip)]
    pub retry_delay: Duration,
}

impl Target {
    /// Create a target with default timing settings.
    pub fn new(id: &str, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
            kind: kind.to_string(),
            strategies: Vec::new(),
            required: false,
            weight: 1.0,
            timeout: DEFAULT_TIMEOUT,
            retry_count: 1,
            retry_delay: Duration::ZERO,
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = name.to_string();
        self
    }

    /// Append a strategy descriptor.
    pub fn with_strategy(mut self, descriptor: StrategyDescriptor) -> Self {
        self.strategies.push(descriptor);
        self
    }

    /// Mark this target as required for its group.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the relative weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retry behavior: total attempts per strategy and delay between them.
    pub fn with_retries(mut self, count: u32, delay: Duration) -> Self {
        self.retry_count = count;
        self.retry_delay = delay;
        self
    }

    /// The parameter bundle for a named strategy, if configured.
    pub fn params_for(&self, strategy_name: &str) -> Option<&serde_json::Value> {
        self.strategies
            .iter()
            .find(|s| s.name == strategy_name && s.enabled)
            .map(|s| &s.params)
    }
}

/// Result of one strategy attempt against one target.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyResult {
    pub strategy_name: String,
    pub success: bool,

    /// Opaque payload from the probe, passed through unmodified.
    pub payload: Option<serde_json::Value>,

    pub error: Option<ProbeError>,

    /// Wall-clock time of the attempt.
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,

    pub timestamp: DateTime<Utc>,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl StrategyResult {
    /// Record a successful attempt.
    pub fn success(strategy_name: &str, payload: serde_json::Value, elapsed: Duration) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            success: true,
            payload: Some(payload),
            error: None,
            elapsed,
            timestamp: Utc::now(),
        }
    }

    /// Record a failed attempt with its classified error.
    pub fn failure(strategy_name: &str, error: ProbeError, elapsed: Duration) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            success: false,
            payload: None,
            error: Some(error),
            elapsed,
            timestamp: Utc::now(),
        }
    }
}

/// The full outcome for one target: every attempt, in the order tried.
#[derive(Debug, Clone, Serialize)]
pub struct TargetResult {
    pub target_id: String,
    pub display_name: String,

    /// Whether this target was required for its group.
    pub required: bool,

    /// Relative weight carried from the target; the report lists heavier
    /// targets first.
    pub weight: f64,

    /// One entry per strategy attempt, in the order tried. Preserved in
    /// full so the report can show fallback narratives.
    pub attempts: Vec<StrategyResult>,

    pub final_success: bool,

    /// Name of the strategy that produced the final success, if any.
    pub strategy_used: Option<String>,

    /// Representative error when no strategy succeeded: the last attempt's
    /// error. Later strategies are the more permissive fallbacks, so their
    /// failure is the most diagnostic.
    pub error: Option<ProbeError>,
}

impl TargetResult {
    /// Build a result from the recorded attempts.
    pub fn from_attempts(target: &Target, attempts: Vec<StrategyResult>) -> Self {
        let last_success = attempts.iter().rev().find(|a| a.success);
        let final_success = last_success.is_some();
        let strategy_used = last_success.map(|a| a.strategy_name.clone());
        let error = if final_success {
            None
        } else {
            attempts.last().and_then(|a| a.error.clone())
        };

        Self {
            target_id: target.id.clone(),
            display_name: target.display_name.clone(),
            required: target.required,
            weight: target.weight,
            attempts,
            final_success,
            strategy_used,
            error,
        }
    }
}
