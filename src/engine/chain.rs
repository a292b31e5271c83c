//! Priority-ordered strategy fallback for a single target.
//!
//! A chain tries strategies from highest to lowest priority until one
//! succeeds. Each strategy gets its own retry budget before the chain
//! falls back, and each attempt is bounded by the target's timeout: the
//! detect call runs on a helper thread and is abandoned (not awaited) when
//! the timeout fires, recorded as a [`ProbeError::Timeout`] attempt.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::coordinator::CancellationToken;
use super::strategy::{HealthReport, Strategy, StrategyRegistry};
use super::target::{ProbeError, StrategyDescriptor, StrategyResult, Target, TargetResult};

/// Aggregated health of every chain member, plus the strategy a caller
/// should reach for first.
#[derive(Debug, Clone, Serialize)]
pub struct ChainHealth {
    pub reports: Vec<HealthReport>,

    /// Highest-priority member whose health check passed.
    pub recommended: Option<String>,
}

struct ChainEntry {
    priority: i32,
    strategy: Arc<dyn Strategy>,
}

/// The ordered set of strategies tried for one target.
///
/// Read-only after construction apart from [`StrategyChain::switch_to`];
/// `run` takes `&self` so one chain may serve concurrent targets.
pub struct StrategyChain {
    entries: Vec<ChainEntry>,
    preferred: Option<String>,
}

impl StrategyChain {
    /// Build a chain from descriptors, resolving each against the registry.
    ///
    /// Disabled descriptors are excluded here, not at call time. A
    /// descriptor naming an unregistered strategy is skipped with a
    /// warning; the config may mention strategies an embedder chose not to
    /// register for this run.
    pub fn new(registry: &StrategyRegistry, descriptors: &[StrategyDescriptor]) -> Self {
        let mut entries: Vec<ChainEntry> = Vec::new();
        for descriptor in descriptors {
            if !descriptor.enabled {
                continue;
            }
            match registry.get(&descriptor.name) {
                Some(strategy) => entries.push(ChainEntry {
                    priority: descriptor.priority,
                    strategy,
                }),
                None => {
                    tracing::warn!(
                        strategy = %descriptor.name,
                        "skipping descriptor for unregistered strategy"
                    );
                }
            }
        }

        // Stable sort keeps declaration order for equal priorities.
        entries.sort_by_key(|e| std::cmp::Reverse(e.priority));

        Self {
            entries,
            preferred: None,
        }
    }

    /// Build a chain for a target from its own descriptors.
    pub fn for_target(registry: &StrategyRegistry, target: &Target) -> Self {
        Self::new(registry, &target.strategies)
    }

    /// Number of usable strategies in this chain.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain has no usable strategies.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pin a named strategy to be attempted first on subsequent runs.
    ///
    /// The other strategies remain as fallbacks in their priority order;
    /// this is a per-session hint, not a priority rewrite. Returns false if
    /// the chain has no member with that name.
    pub fn switch_to(&mut self, strategy_name: &str) -> bool {
        if self.entries.iter().any(|e| e.strategy.name() == strategy_name) {
            self.preferred = Some(strategy_name.to_string());
            true
        } else {
            false
        }
    }

    /// Member strategies in effective order: the pinned one first, then the
    /// rest by descending priority.
    fn ordered(&self) -> Vec<&ChainEntry> {
        match &self.preferred {
            Some(name) => {
                let mut ordered: Vec<&ChainEntry> = self
                    .entries
                    .iter()
                    .filter(|e| e.strategy.name() == name)
                    .collect();
                ordered.extend(self.entries.iter().filter(|e| e.strategy.name() != name));
                ordered
            }
            None => self.entries.iter().collect(),
        }
    }

    /// Try strategies in order until one succeeds.
    ///
    /// Strategies whose `can_handle` rejects the target are skipped without
    /// an attempt entry. Every attempt made is recorded, so a fully failed
    /// target still shows the whole fallback story.
    pub fn run(&self, target: &Target, cancel: &CancellationToken) -> TargetResult {
        let mut attempts: Vec<StrategyResult> = Vec::new();
        let retries = target.retry_count.max(1);

        'strategies: for entry in self.ordered() {
            if !entry.strategy.can_handle(target) {
                continue;
            }
            let params = target
                .params_for(entry.strategy.name())
                .cloned()
                .unwrap_or(serde_json::Value::Null);

            for attempt_no in 1..=retries {
                if cancel.is_cancelled() {
                    tracing::debug!(target = %target.id, "run cancelled, abandoning target");
                    break 'strategies;
                }

                let result = attempt_with_timeout(
                    Arc::clone(&entry.strategy),
                    target.clone(),
                    params.clone(),
                    target.timeout,
                );
                let succeeded = result.success;
                tracing::debug!(
                    target = %target.id,
                    strategy = %result.strategy_name,
                    attempt = attempt_no,
                    success = succeeded,
                    "strategy attempt finished"
                );
                attempts.push(result);

                if succeeded {
                    break 'strategies;
                }
                if attempt_no < retries {
                    thread::sleep(target.retry_delay);
                }
            }
        }

        TargetResult::from_attempts(target, attempts)
    }

    /// Health of every member plus the recommended strategy: the
    /// highest-priority member that reports healthy. Lets callers
    /// short-circuit known-broken strategies before the first real attempt.
    pub fn health_check(&self) -> ChainHealth {
        let reports: Vec<HealthReport> = self
            .entries
            .iter()
            .map(|e| e.strategy.health_check())
            .collect();
        let recommended = reports
            .iter()
            .find(|r| r.healthy)
            .map(|r| r.strategy_name.clone());

        ChainHealth {
            reports,
            recommended,
        }
    }
}

impl std::fmt::Debug for StrategyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|e| e.strategy.name()).collect();
        f.debug_struct("StrategyChain")
            .field("strategies", &names)
            .field("preferred", &self.preferred)
            .finish()
    }
}

/// Run one detect call on a helper thread, bounded by `timeout`.
///
/// On timeout the helper thread is left to finish on its own; its result
/// is discarded. A helper that dies without answering (a panicking probe)
/// is recorded as an unreachable attempt rather than poisoning the run.
fn attempt_with_timeout(
    strategy: Arc<dyn Strategy>,
    target: Target,
    params: serde_json::Value,
    timeout: Duration,
) -> StrategyResult {
    let name = strategy.name().to_string();
    let started = Instant::now();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let outcome = strategy.detect(&target, &params);
        let _ = tx.send(outcome);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(payload)) => StrategyResult::success(&name, payload, started.elapsed()),
        Ok(Err(error)) => StrategyResult::failure(&name, error, started.elapsed()),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            let elapsed = started.elapsed();
            StrategyResult::failure(
                &name,
                ProbeError::Timeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                },
                elapsed,
            )
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => StrategyResult::failure(
            &name,
            ProbeError::Unreachable {
                reason: "probe terminated without producing a result".to_string(),
            },
            started.elapsed(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::strategy::test_support::ScriptedStrategy;
    use serde_json::json;

    fn registry_of(strategies: Vec<Arc<ScriptedStrategy>>) -> StrategyRegistry {
        let mut registry = StrategyRegistry::new();
        for s in strategies {
            registry.register(s);
        }
        registry
    }

    fn descriptor(name: &str, priority: i32) -> StrategyDescriptor {
        StrategyDescriptor::new(name, priority, json!({}))
    }

    fn target_with(names: &[(&str, i32)]) -> Target {
        let mut target = Target::new("t", "reachability");
        for (name, priority) in names {
            target = target.with_strategy(descriptor(name, *priority));
        }
        target
    }

    #[test]
    fn falls_back_in_descending_priority_order() {
        let high = Arc::new(ScriptedStrategy::failing(
            "high",
            ProbeError::Unreachable { reason: "a".into() },
        ));
        let mid = Arc::new(ScriptedStrategy::failing(
            "mid",
            ProbeError::Unreachable { reason: "b".into() },
        ));
        let low = Arc::new(ScriptedStrategy::succeeding("low"));
        let registry = registry_of(vec![high, mid, low]);

        // Declared out of order; chain must sort by priority.
        let target = target_with(&[("low", 1), ("high", 10), ("mid", 5)]);
        let chain = StrategyChain::for_target(&registry, &target);

        let result = chain.run(&target, &CancellationToken::new());

        assert!(result.final_success);
        assert_eq!(result.strategy_used.as_deref(), Some("low"));
        let tried: Vec<&str> = result
            .attempts
            .iter()
            .map(|a| a.strategy_name.as_str())
            .collect();
        assert_eq!(tried, vec!["high", "mid", "low"]);
    }

    #[test]
    fn stops_at_first_success() {
        let first = Arc::new(ScriptedStrategy::succeeding("first"));
        let second = Arc::new(ScriptedStrategy::succeeding("second"));
        let registry = registry_of(vec![Arc::clone(&first), Arc::clone(&second)]);

        let target = target_with(&[("first", 10), ("second", 5)]);
        let chain = StrategyChain::for_target(&registry, &target);

        let result = chain.run(&target, &CancellationToken::new());

        assert_eq!(result.attempts.len(), 1);
        assert_eq!(result.strategy_used.as_deref(), Some("first"));
        assert_eq!(second.calls(), 0);
    }

    #[test]
    fn never_detects_when_can_handle_is_false() {
        let configured = Arc::new(ScriptedStrategy::succeeding("configured"));
        let stranger = Arc::new(ScriptedStrategy::succeeding("stranger"));
        let registry = registry_of(vec![Arc::clone(&configured), Arc::clone(&stranger)]);

        // "stranger" is registered but the target has no descriptor for it,
        // so its can_handle rejects the target.
        let target = target_with(&[("configured", 1)]);
        let chain = StrategyChain::new(
            &registry,
            &[descriptor("stranger", 10), descriptor("configured", 1)],
        );

        let result = chain.run(&target, &CancellationToken::new());

        assert!(result.final_success);
        assert_eq!(stranger.calls(), 0);
        assert_eq!(configured.calls(), 1);
    }

    #[test]
    fn disabled_descriptors_are_excluded_at_construction() {
        let a = Arc::new(ScriptedStrategy::succeeding("a"));
        let registry = registry_of(vec![a]);

        let mut off = descriptor("a", 10);
        off.enabled = false;
        let chain = StrategyChain::new(&registry, &[off]);

        assert!(chain.is_empty());
    }

    #[test]
    fn unregistered_descriptors_are_skipped() {
        let a = Arc::new(ScriptedStrategy::succeeding("a"));
        let registry = registry_of(vec![a]);

        let chain = StrategyChain::new(&registry, &[descriptor("a", 1), descriptor("ocr", 10)]);

        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn retries_per_strategy_before_falling_back() {
        let flaky = Arc::new(ScriptedStrategy::failing(
            "flaky",
            ProbeError::Unreachable {
                reason: "reset".into(),
            },
        ));
        let backup = Arc::new(ScriptedStrategy::succeeding("backup"));
        let registry = registry_of(vec![Arc::clone(&flaky), backup]);

        let target = target_with(&[("flaky", 10), ("backup", 1)])
            .with_retries(3, Duration::ZERO);
        let chain = StrategyChain::for_target(&registry, &target);

        let result = chain.run(&target, &CancellationToken::new());

        assert!(result.final_success);
        assert_eq!(flaky.calls(), 3);
        assert_eq!(result.attempts.len(), 4);
        assert_eq!(result.strategy_used.as_deref(), Some("backup"));
    }

    #[test]
    fn timeout_attempts_are_recorded_and_chain_falls_back() {
        let stuck = Arc::new(
            ScriptedStrategy::succeeding("stuck").slow(Duration::from_millis(300)),
        );
        let quick = Arc::new(ScriptedStrategy::succeeding("quick"));
        let registry = registry_of(vec![stuck, quick]);

        let target = target_with(&[("stuck", 10), ("quick", 1)])
            .with_timeout(Duration::from_millis(30));
        let chain = StrategyChain::for_target(&registry, &target);

        let result = chain.run(&target, &CancellationToken::new());

        assert!(result.final_success);
        assert_eq!(result.strategy_used.as_deref(), Some("quick"));
        assert!(matches!(
            result.attempts[0].error,
            Some(ProbeError::Timeout { .. })
        ));
    }

    #[test]
    fn timeout_retry_bound_logs_exact_attempt_count() {
        let stuck = Arc::new(
            ScriptedStrategy::succeeding("stuck").slow(Duration::from_millis(500)),
        );
        let registry = registry_of(vec![Arc::clone(&stuck)]);

        let timeout = Duration::from_millis(40);
        let delay = Duration::from_millis(20);
        let target = target_with(&[("stuck", 10)])
            .with_timeout(timeout)
            .with_retries(2, delay);
        let chain = StrategyChain::for_target(&registry, &target);

        let started = Instant::now();
        let result = chain.run(&target, &CancellationToken::new());
        let elapsed = started.elapsed();

        assert!(!result.final_success);
        assert_eq!(result.attempts.len(), 2);
        assert!(result
            .attempts
            .iter()
            .all(|a| matches!(a.error, Some(ProbeError::Timeout { .. }))));
        // Two timed-out attempts with one delay between them.
        assert!(elapsed >= timeout * 2 + delay);
    }

    #[test]
    fn all_failing_surfaces_last_error() {
        let first = Arc::new(ScriptedStrategy::failing(
            "first",
            ProbeError::Timeout { elapsed_ms: 10 },
        ));
        let last = Arc::new(ScriptedStrategy::failing(
            "last",
            ProbeError::Capability {
                reason: "model file missing".into(),
            },
        ));
        let registry = registry_of(vec![first, last]);

        let target = target_with(&[("first", 10), ("last", 1)]);
        let chain = StrategyChain::for_target(&registry, &target);

        let result = chain.run(&target, &CancellationToken::new());

        assert!(!result.final_success);
        assert_eq!(
            result.error,
            Some(ProbeError::Capability {
                reason: "model file missing".into()
            })
        );
    }

    #[test]
    fn switch_to_pins_strategy_without_dropping_fallbacks() {
        let primary = Arc::new(ScriptedStrategy::failing(
            "primary",
            ProbeError::Unreachable { reason: "x".into() },
        ));
        let secondary = Arc::new(ScriptedStrategy::failing(
            "secondary",
            ProbeError::Unreachable { reason: "y".into() },
        ));
        let registry = registry_of(vec![primary, secondary]);

        let target = target_with(&[("primary", 10), ("secondary", 1)]);
        let mut chain = StrategyChain::for_target(&registry, &target);
        assert!(chain.switch_to("secondary"));

        let result = chain.run(&target, &CancellationToken::new());

        let tried: Vec<&str> = result
            .attempts
            .iter()
            .map(|a| a.strategy_name.as_str())
            .collect();
        assert_eq!(tried, vec!["secondary", "primary"]);
    }

    #[test]
    fn switch_to_unknown_name_is_rejected() {
        let a = Arc::new(ScriptedStrategy::succeeding("a"));
        let registry = registry_of(vec![a]);
        let mut chain = StrategyChain::new(&registry, &[descriptor("a", 1)]);

        assert!(!chain.switch_to("nope"));
    }

    #[test]
    fn health_check_recommends_highest_priority_healthy() {
        let broken = Arc::new(ScriptedStrategy::succeeding("broken").unhealthy());
        let working = Arc::new(ScriptedStrategy::succeeding("working"));
        let registry = registry_of(vec![broken, working]);

        let chain = StrategyChain::new(
            &registry,
            &[descriptor("broken", 10), descriptor("working", 5)],
        );

        let health = chain.health_check();
        assert_eq!(health.reports.len(), 2);
        assert!(!health.reports[0].healthy);
        assert_eq!(health.recommended.as_deref(), Some("working"));
    }

    #[test]
    fn health_check_with_no_healthy_member_recommends_nothing() {
        let broken = Arc::new(ScriptedStrategy::succeeding("broken").unhealthy());
        let registry = registry_of(vec![broken]);
        let chain = StrategyChain::new(&registry, &[descriptor("broken", 1)]);

        assert!(chain.health_check().recommended.is_none());
    }

    #[test]
    fn cancelled_run_makes_no_attempts() {
        let a = Arc::new(ScriptedStrategy::succeeding("a"));
        let registry = registry_of(vec![Arc::clone(&a)]);
        let target = target_with(&[("a", 1)]);
        let chain = StrategyChain::for_target(&registry, &target);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = chain.run(&target, &cancel);

        assert!(!result.final_success);
        assert!(result.attempts.is_empty());
        assert_eq!(a.calls(), 0);
    }
}
