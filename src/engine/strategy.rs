//! The strategy capability trait and the registry of implementations.
//!
//! A strategy is one technique for probing a target (an HTTP request, a
//! `git ls-remote`, a tool version check, a UI-recognition backend). The
//! engine depends only on this trait; concrete probes live in
//! [`crate::probes`] or are registered by an embedder.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::target::{ProbeError, Target};

/// Health of a single strategy, reported without touching any real target.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub strategy_name: String,
    pub healthy: bool,

    /// Why the strategy is unhealthy, when it is.
    pub message: Option<String>,
}

impl HealthReport {
    /// A healthy strategy.
    pub fn healthy(strategy_name: &str) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            healthy: true,
            message: None,
        }
    }

    /// An unhealthy strategy with a reason.
    pub fn unhealthy(strategy_name: &str, message: &str) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            healthy: false,
            message: Some(message.to_string()),
        }
    }
}

/// A pluggable detection technique.
///
/// Implementations are stateless per invocation but may cache expensive
/// initialization (an HTTP client, a loaded model) behind `&self`; such
/// caches must be safe for concurrent access, since the same instance may
/// serve multiple targets in parallel.
pub trait Strategy: Send + Sync {
    /// The name this strategy is registered and configured under.
    fn name(&self) -> &str;

    /// Whether this strategy applies to the target. The default checks for
    /// an enabled descriptor matching the strategy's own name; the engine
    /// never calls [`Strategy::detect`] when this returns false.
    fn can_handle(&self, target: &Target) -> bool {
        target.params_for(self.name()).is_some()
    }

    /// Probe the target. `params` is the opaque bundle from the target's
    /// matching descriptor. `Ok` carries the payload passed through to the
    /// report; `Err` is a classified, recoverable failure.
    fn detect(
        &self,
        target: &Target,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ProbeError>;

    /// Report whether this strategy could work at all right now, without
    /// probing a real target. Used to pick a recommended strategy up front.
    fn health_check(&self) -> HealthReport {
        HealthReport::healthy(self.name())
    }
}

/// Named set of registered strategy implementations.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in probes.
    pub fn with_builtin_probes() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::probes::HttpProbe::new()));
        registry.register(Arc::new(crate::probes::GitProbe::new()));
        registry.register(Arc::new(crate::probes::CommandProbe::new()));
        registry
    }

    /// Register a strategy under its own name, replacing any previous
    /// registration with the same name.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    /// Look up a strategy by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Strategy>> {
        self.strategies.get(name).cloned()
    }

    /// Registered strategy names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.strategies.keys().cloned().collect()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}
