//! Named groups of targets and the group-level verdict logic.

use serde::{Deserialize, Serialize};

use crate::error::{PreflightError, Result};

use super::target::{Target, TargetResult};

/// How a group's target results combine into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuccessCondition {
    /// Every target must succeed.
    #[default]
    All,

    /// One working target is enough (equivalent mirrors).
    Any,

    /// A strict majority of targets must succeed; ties fail.
    Majority,

    /// Required targets must all succeed; among the optional rest, any
    /// success passes and zero successes is a warning, not a failure.
    Conditional,
}

/// Whether a group's targets run at once or one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Parallel,
    Sequential,
}

/// Group verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupStatus {
    Pass,
    Fail,
    /// Degraded but usable.
    Warn,
}

/// A named collection of targets evaluated together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupConfig {
    pub id: String,
    pub display_name: String,

    /// Check category this group belongs to (e.g. "network",
    /// "environment"); profiles enable or disable whole categories.
    pub category: String,

    pub success_condition: SuccessCondition,
    pub execution_mode: ExecutionMode,
    pub targets: Vec<Target>,
}

impl GroupConfig {
    /// Create a parallel ALL group.
    pub fn new(id: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
            category: category.to_string(),
            success_condition: SuccessCondition::All,
            execution_mode: ExecutionMode::Parallel,
            targets: Vec::new(),
        }
    }

    /// Set the success condition.
    pub fn with_condition(mut self, condition: SuccessCondition) -> Self {
        self.success_condition = condition;
        self
    }

    /// Set the execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    /// Append a target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }
}

/// The evaluated outcome of one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupResult {
    pub group_id: String,
    pub display_name: String,
    pub category: String,
    pub status: GroupStatus,

    /// Number of targets (never attempts) that succeeded.
    pub success_count: usize,

    /// Number of targets (never attempts) evaluated.
    pub total_count: usize,

    pub target_results: Vec<TargetResult>,

    /// Set when evaluation itself failed for this group.
    pub error: Option<String>,
}

impl GroupResult {
    /// A result representing an evaluation failure, scoped to this group.
    pub fn aggregation_failure(group: &GroupConfig, message: &str) -> Self {
        Self {
            group_id: group.id.clone(),
            display_name: group.display_name.clone(),
            category: group.category.clone(),
            status: GroupStatus::Fail,
            success_count: 0,
            total_count: group.targets.len(),
            target_results: Vec::new(),
            error: Some(message.to_string()),
        }
    }
}

/// Aggregates target results into a group verdict.
pub struct GroupEvaluator;

impl GroupEvaluator {
    /// Evaluate a group's results against its success condition.
    ///
    /// Counts are per target: a target that needed three fallback attempts
    /// still contributes exactly one unit to the tally.
    pub fn evaluate(group: &GroupConfig, results: Vec<TargetResult>) -> Result<GroupResult> {
        if group.targets.is_empty() {
            return Err(PreflightError::Aggregation {
                group: group.id.clone(),
                message: "group has no targets".to_string(),
            });
        }
        if results.len() != group.targets.len() {
            return Err(PreflightError::Aggregation {
                group: group.id.clone(),
                message: format!(
                    "expected {} target results, got {}",
                    group.targets.len(),
                    results.len()
                ),
            });
        }

        let total_count = results.len();
        let success_count = results.iter().filter(|r| r.final_success).count();

        let status = match group.success_condition {
            SuccessCondition::All => {
                if success_count == total_count {
                    GroupStatus::Pass
                } else {
                    GroupStatus::Fail
                }
            }
            SuccessCondition::Any => {
                if success_count > 0 {
                    GroupStatus::Pass
                } else {
                    GroupStatus::Fail
                }
            }
            SuccessCondition::Majority => {
                // Strict majority; an even split fails.
                if success_count * 2 > total_count {
                    GroupStatus::Pass
                } else {
                    GroupStatus::Fail
                }
            }
            SuccessCondition::Conditional => Self::evaluate_conditional(&results),
        };

        Ok(GroupResult {
            group_id: group.id.clone(),
            display_name: group.display_name.clone(),
            category: group.category.clone(),
            status,
            success_count,
            total_count,
            target_results: results,
            error: None,
        })
    }

    /// Required targets must all succeed. Among the optional rest, any
    /// success passes; zero successes is WARN, distinguishing "degraded but
    /// usable" from "broken". A group with no optional targets behaves
    /// like ALL.
    fn evaluate_conditional(results: &[TargetResult]) -> GroupStatus {
        let required_failed = results.iter().any(|r| r.required && !r.final_success);
        if required_failed {
            return GroupStatus::Fail;
        }

        let optional: Vec<&TargetResult> = results.iter().filter(|r| !r.required).collect();
        if optional.is_empty() {
            return GroupStatus::Pass;
        }
        if optional.iter().any(|r| r.final_success) {
            GroupStatus::Pass
        } else {
            GroupStatus::Warn
        }
    }
}
