//! Run-level scheduling of groups and targets.
//!
//! Groups execute on a bounded worker pool; within a group, targets run
//! fully parallel or strictly one at a time depending on the group's
//! execution mode. All per-run state is passed explicitly; the coordinator
//! holds only the strategy registry.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use super::chain::StrategyChain;
use super::group::{ExecutionMode, GroupConfig, GroupEvaluator, GroupResult};
use super::strategy::StrategyRegistry;
use super::target::TargetResult;

/// Run-level cancellation signal, shared across all in-flight workers.
///
/// Cancellation is cooperative: pending targets are not started, and the
/// per-attempt timeout wrapper already abandons anything past its window.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every holder of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Schedules group and target execution and collects results.
pub struct ExecutionCoordinator {
    registry: StrategyRegistry,
}

impl ExecutionCoordinator {
    /// Create a coordinator over a set of registered strategies.
    pub fn new(registry: StrategyRegistry) -> Self {
        Self { registry }
    }

    /// The registry this coordinator resolves strategy names against.
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Run every group, at most `concurrency_limit` groups in flight.
    pub fn run(&self, groups: &[GroupConfig], concurrency_limit: usize) -> Vec<GroupResult> {
        self.run_with_cancel(groups, concurrency_limit, &CancellationToken::new())
    }

    /// Run every group with an externally controlled cancellation token.
    ///
    /// Results come back in the input group order regardless of completion
    /// order; the evaluator never depends on which target finished first.
    pub fn run_with_cancel(
        &self,
        groups: &[GroupConfig],
        concurrency_limit: usize,
        cancel: &CancellationToken,
    ) -> Vec<GroupResult> {
        if groups.is_empty() {
            return Vec::new();
        }

        let workers = concurrency_limit.max(1).min(groups.len());
        let queue: Mutex<VecDeque<usize>> = Mutex::new((0..groups.len()).collect());
        let slots: Mutex<Vec<Option<GroupResult>>> = Mutex::new(vec![None; groups.len()]);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = {
                        let mut pending = queue.lock().expect("group queue poisoned");
                        pending.pop_front()
                    };
                    let Some(index) = index else { break };

                    let group = &groups[index];
                    tracing::debug!(group = %group.id, "starting group");
                    let result = self.run_group(group, cancel);
                    slots.lock().expect("result slots poisoned")[index] = Some(result);
                });
            }
        });

        slots
            .into_inner()
            .expect("result slots poisoned")
            .into_iter()
            .map(|slot| slot.expect("every group produces a result"))
            .collect()
    }

    /// Execute one group's targets and evaluate the verdict.
    ///
    /// An aggregation failure is scoped here: the group comes back FAILed
    /// with the message attached, and other groups are unaffected.
    fn run_group(&self, group: &GroupConfig, cancel: &CancellationToken) -> GroupResult {
        let results = match group.execution_mode {
            ExecutionMode::Parallel => self.run_targets_parallel(group, cancel),
            ExecutionMode::Sequential => self.run_targets_sequential(group, cancel),
        };

        match GroupEvaluator::evaluate(group, results) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(group = %group.id, error = %err, "group evaluation failed");
                GroupResult::aggregation_failure(group, &err.to_string())
            }
        }
    }

    /// All targets at once, one scoped thread each; no extra limit beyond
    /// the group-level worker bound.
    fn run_targets_parallel(
        &self,
        group: &GroupConfig,
        cancel: &CancellationToken,
    ) -> Vec<TargetResult> {
        let slots: Mutex<Vec<Option<TargetResult>>> = Mutex::new(vec![None; group.targets.len()]);

        thread::scope(|scope| {
            for (index, target) in group.targets.iter().enumerate() {
                let slots = &slots;
                scope.spawn(move || {
                    let chain = StrategyChain::for_target(&self.registry, target);
                    let result = chain.run(target, cancel);
                    slots.lock().expect("target slots poisoned")[index] = Some(result);
                });
            }
        });

        slots
            .into_inner()
            .expect("target slots poisoned")
            .into_iter()
            .map(|slot| slot.expect("every target produces a result"))
            .collect()
    }

    /// Targets one at a time, in declared order.
    fn run_targets_sequential(
        &self,
        group: &GroupConfig,
        cancel: &CancellationToken,
    ) -> Vec<TargetResult> {
        group
            .targets
            .iter()
            .map(|target| {
                let chain = StrategyChain::for_target(&self.registry, target);
                chain.run(target, cancel)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::group::{GroupStatus, SuccessCondition};
    use crate::engine::strategy::test_support::ScriptedStrategy;
    use crate::engine::target::{ProbeError, StrategyDescriptor, Target};
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn registry_with(strategies: Vec<Arc<ScriptedStrategy>>) -> StrategyRegistry {
        let mut registry = StrategyRegistry::new();
        for s in strategies {
            registry.register(s);
        }
        registry
    }

    fn target_using(id: &str, strategy: &str) -> Target {
        Target::new(id, "reachability")
            .with_strategy(StrategyDescriptor::new(strategy, 10, json!({})))
    }

    fn group_using(id: &str, strategy: &str, targets: usize, mode: ExecutionMode) -> GroupConfig {
        let mut group = GroupConfig::new(id, "network").with_mode(mode);
        for i in 0..targets {
            group = group.with_target(target_using(&format!("{id}-t{i}"), strategy));
        }
        group
    }

    #[test]
    fn results_follow_input_group_order() {
        let slow = Arc::new(ScriptedStrategy::succeeding("ok").slow(Duration::from_millis(50)));
        let registry = registry_with(vec![slow]);
        let coordinator = ExecutionCoordinator::new(registry);

        // First group is slow, second is not; output order must still match.
        let groups = vec![
            group_using("slow", "ok", 2, ExecutionMode::Sequential),
            group_using("fast", "ok", 1, ExecutionMode::Parallel),
        ];

        let results = coordinator.run(&groups, 2);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].group_id, "slow");
        assert_eq!(results[1].group_id, "fast");
        assert!(results.iter().all(|r| r.status == GroupStatus::Pass));
    }

    #[test]
    fn parallel_group_overlaps_target_execution() {
        let slow = Arc::new(ScriptedStrategy::succeeding("ok").slow(Duration::from_millis(80)));
        let registry = registry_with(vec![slow]);
        let coordinator = ExecutionCoordinator::new(registry);

        let groups = vec![group_using("g", "ok", 4, ExecutionMode::Parallel)];

        let started = Instant::now();
        let results = coordinator.run(&groups, 1);
        let elapsed = started.elapsed();

        assert_eq!(results[0].success_count, 4);
        // Four 80ms targets in parallel finish well under the serial 320ms.
        assert!(elapsed < Duration::from_millis(300));
    }

    #[test]
    fn sequential_group_runs_targets_in_declared_order() {
        let ok = Arc::new(ScriptedStrategy::succeeding("ok"));
        let registry = registry_with(vec![ok]);
        let coordinator = ExecutionCoordinator::new(registry);

        let groups = vec![group_using("g", "ok", 3, ExecutionMode::Sequential)];
        let results = coordinator.run(&groups, 1);

        let ids: Vec<&str> = results[0]
            .target_results
            .iter()
            .map(|t| t.target_id.as_str())
            .collect();
        assert_eq!(ids, vec!["g-t0", "g-t1", "g-t2"]);
    }

    #[test]
    fn concurrency_limit_of_one_still_completes_all_groups() {
        let ok = Arc::new(ScriptedStrategy::succeeding("ok"));
        let registry = registry_with(vec![ok]);
        let coordinator = ExecutionCoordinator::new(registry);

        let groups: Vec<GroupConfig> = (0..5)
            .map(|i| group_using(&format!("g{i}"), "ok", 1, ExecutionMode::Parallel))
            .collect();

        let results = coordinator.run(&groups, 1);
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.status == GroupStatus::Pass));
    }

    #[test]
    fn zero_concurrency_is_clamped_to_one() {
        let ok = Arc::new(ScriptedStrategy::succeeding("ok"));
        let registry = registry_with(vec![ok]);
        let coordinator = ExecutionCoordinator::new(registry);

        let groups = vec![group_using("g", "ok", 1, ExecutionMode::Parallel)];
        let results = coordinator.run(&groups, 0);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn empty_group_fails_without_aborting_others() {
        let ok = Arc::new(ScriptedStrategy::succeeding("ok"));
        let registry = registry_with(vec![ok]);
        let coordinator = ExecutionCoordinator::new(registry);

        let groups = vec![
            GroupConfig::new("empty", "network"),
            group_using("healthy", "ok", 2, ExecutionMode::Parallel),
        ];

        let results = coordinator.run(&groups, 2);

        assert_eq!(results[0].status, GroupStatus::Fail);
        assert!(results[0].error.as_deref().unwrap().contains("no targets"));
        assert_eq!(results[1].status, GroupStatus::Pass);
    }

    #[test]
    fn failed_targets_flow_through_to_group_status() {
        let down = Arc::new(ScriptedStrategy::failing(
            "down",
            ProbeError::Unreachable {
                reason: "connection refused".into(),
            },
        ));
        let registry = registry_with(vec![down]);
        let coordinator = ExecutionCoordinator::new(registry);

        let groups = vec![
            group_using("g", "down", 2, ExecutionMode::Parallel)
                .with_condition(SuccessCondition::Any),
        ];

        let results = coordinator.run(&groups, 1);
        assert_eq!(results[0].status, GroupStatus::Fail);
        assert_eq!(results[0].success_count, 0);
    }

    #[test]
    fn cancelled_run_skips_pending_targets() {
        let ok = Arc::new(ScriptedStrategy::succeeding("ok"));
        let registry = registry_with(vec![Arc::clone(&ok)]);
        let coordinator = ExecutionCoordinator::new(registry);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let groups = vec![group_using("g", "ok", 3, ExecutionMode::Sequential)];
        let results = coordinator.run_with_cancel(&groups, 1, &cancel);

        assert_eq!(results[0].status, GroupStatus::Fail);
        assert_eq!(ok.calls(), 0);
        assert!(results[0]
            .target_results
            .iter()
            .all(|t| t.attempts.is_empty()));
    }

    #[test]
    fn empty_run_returns_no_results() {
        let coordinator = ExecutionCoordinator::new(StrategyRegistry::new());
        assert!(coordinator.run(&[], 4).is_empty());
    }
}
