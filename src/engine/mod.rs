//! The multi-strategy detection engine.
//!
//! Reusable machinery behind every check family: a target is probed by a
//! priority-ordered chain of interchangeable strategies, targets are
//! aggregated into group verdicts, and a coordinator schedules the whole
//! run. Concrete probes live in [`crate::probes`]; resolved configuration
//! comes from [`crate::config`].

pub mod chain;
pub mod coordinator;
pub mod group;
pub mod strategy;
pub mod target;

pub use chain::{ChainHealth, StrategyChain};
pub use coordinator::{CancellationToken, ExecutionCoordinator};
pub use group::{
    ExecutionMode, GroupConfig, GroupEvaluator, GroupResult, GroupStatus, SuccessCondition,
};
pub use strategy::{HealthReport, Strategy, StrategyRegistry};
pub use target::{ProbeError, StrategyDescriptor, StrategyResult, Target, TargetResult};
