//! Layer merging: defaults + project overrides + profile overlay.
//!
//! # Merge Rules
//!
//! - Target lists are appended: default entries first, then project
//!   entries. A group key listed in the project's `disable_defaults`
//!   drops the default entries for that key before appending.
//! - Scalar and structured keys (conditions, modes, timeouts, strategy
//!   sets) are replaced: the project value wins when present.
//! - The active profile is applied last and always wins: it forces whole
//!   check categories on or off regardless of the other layers.
//!
//! `resolve` is a pure function of its inputs — no filesystem, network,
//! clock, or randomness — so identical inputs produce `==` outputs.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::engine::{GroupConfig, StrategyDescriptor, SuccessCondition, Target};
use crate::error::{PreflightError, Result};

use super::schema::{
    DefaultsLayer, GroupSpec, ProfileLayer, ProjectLayer, StrategySpec, TargetSpec,
};

/// Fully merged configuration for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub project: String,
    pub profile: Option<String>,
    pub groups: Vec<GroupConfig>,
}

/// Merge the three configuration layers into engine-ready groups.
///
/// Groups disabled by any layer, and groups left with zero targets, are
/// omitted from the output. Referencing an unknown profile is fatal and
/// aborts before any probing starts.
pub fn resolve(
    defaults: &DefaultsLayer,
    project: &ProjectLayer,
    profiles: &BTreeMap<String, ProfileLayer>,
    active_profile: Option<&str>,
) -> Result<ResolvedConfig> {
    let profile = match active_profile {
        Some(name) => Some(profiles.get(name).ok_or_else(|| {
            PreflightError::UnknownProfile {
                name: name.to_string(),
                available: profiles.keys().cloned().collect::<Vec<_>>().join(", "),
            }
        })?),
        None => None,
    };

    let mut keys: Vec<&String> = defaults.groups.keys().collect();
    for key in project.groups.keys() {
        if !defaults.groups.contains_key(key) {
            keys.push(key);
        }
    }

    let mut groups = Vec::new();
    for key in keys {
        let default_spec = defaults.groups.get(key);
        let project_spec = project.groups.get(key);
        let defaults_disabled = project.disable_defaults.iter().any(|k| k == key);

        if let Some(group) =
            merge_group(key, default_spec, project_spec, defaults_disabled, profile)
        {
            groups.push(group);
        }
    }

    Ok(ResolvedConfig {
        project: project.project.name.clone(),
        profile: active_profile.map(|s| s.to_string()),
        groups,
    })
}

fn merge_group(
    key: &str,
    default_spec: Option<&GroupSpec>,
    project_spec: Option<&GroupSpec>,
    defaults_disabled: bool,
    profile: Option<&ProfileLayer>,
) -> Option<GroupConfig> {
    let category = pick_scalar(project_spec, default_spec, |s| s.category.clone())
        .unwrap_or_else(|| "general".to_string());

    // Project replaces default for the enabled flag; the profile overlay
    // has the final word per category.
    let mut enabled =
        pick_scalar(project_spec, default_spec, |s| s.enabled).unwrap_or(true);
    if let Some(profile) = profile {
        if let Some(&forced) = profile.categories.get(&category) {
            enabled = forced;
        }
    }
    if !enabled {
        return None;
    }

    let display_name = pick_scalar(project_spec, default_spec, |s| s.display_name.clone())
        .unwrap_or_else(|| key.to_string());
    let success_condition = pick_scalar(project_spec, default_spec, |s| s.success_condition)
        .unwrap_or(SuccessCondition::All);
    let execution_mode =
        pick_scalar(project_spec, default_spec, |s| s.execution_mode).unwrap_or_default();
    let timeout_secs = pick_scalar(project_spec, default_spec, |s| s.timeout_secs);
    let retry_count = pick_scalar(project_spec, default_spec, |s| s.retry_count);
    let retry_delay_ms = pick_scalar(project_spec, default_spec, |s| s.retry_delay_ms);
    let group_strategies =
        pick_scalar(project_spec, default_spec, |s| s.strategies.clone()).unwrap_or_default();

    // List-valued key: append, with defaults optionally dropped.
    let mut target_specs: Vec<&TargetSpec> = Vec::new();
    if !defaults_disabled {
        if let Some(spec) = default_spec {
            target_specs.extend(spec.targets.iter());
        }
    }
    if let Some(spec) = project_spec {
        target_specs.extend(spec.targets.iter());
    }
    if target_specs.is_empty() {
        return None;
    }

    let targets = target_specs
        .iter()
        .map(|spec| {
            build_target(
                spec,
                &group_strategies,
                timeout_secs,
                retry_count,
                retry_delay_ms,
            )
        })
        .collect();

    Some(GroupConfig {
        id: key.to_string(),
        display_name,
        category,
        success_condition,
        execution_mode,
        targets,
    })
}

/// Scalar merge: project value replaces the default when present.
fn pick_scalar<T>(
    project: Option<&GroupSpec>,
    default: Option<&GroupSpec>,
    get: impl Fn(&GroupSpec) -> Option<T>,
) -> Option<T> {
    project.and_then(&get).or_else(|| default.and_then(&get))
}

fn build_target(
    spec: &TargetSpec,
    group_strategies: &[StrategySpec],
    group_timeout_secs: Option<u64>,
    group_retry_count: Option<u32>,
    group_retry_delay_ms: Option<u64>,
) -> Target {
    let strategy_specs: &[StrategySpec] = spec
        .strategies
        .as_deref()
        .unwrap_or(group_strategies);

    let strategies = strategy_specs
        .iter()
        .map(|s| StrategyDescriptor {
            name: s.name.clone(),
            priority: s.priority,
            enabled: s.enabled,
            params: deep_merge(&s.params, &spec.params),
        })
        .collect();

    let timeout_secs = spec.timeout_secs.or(group_timeout_secs);
    let retry_count = spec.retry_count.or(group_retry_count).unwrap_or(1);
    let retry_delay_ms = spec.retry_delay_ms.or(group_retry_delay_ms).unwrap_or(0);

    Target {
        id: spec.id.clone(),
        display_name: spec.display_name.clone().unwrap_or_else(|| spec.id.clone()),
        kind: spec
            .kind
            .clone()
            .unwrap_or_else(|| "reachability".to_string()),
        strategies,
        required: spec.required,
        weight: spec.weight.unwrap_or(1.0),
        timeout: timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(crate::engine::target::DEFAULT_TIMEOUT),
        retry_count,
        retry_delay: Duration::from_millis(retry_delay_ms),
    }
}

/// Deep merge two JSON values; the overlay wins at the point of conflict.
///
/// Objects merge recursively, everything else is replaced. A null overlay
/// leaves the base untouched, so targets without params inherit the
/// group strategy's params unchanged.
pub fn deep_merge(base: &serde_json::Value, overlay: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match (base, overlay) {
        (_, Value::Null) => base.clone(),
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut result = base_map.clone();
            for (key, overlay_value) in overlay_map {
                match base_map.get(key) {
                    Some(base_value) => {
                        result.insert(key.clone(), deep_merge(base_value, overlay_value));
                    }
                    None => {
                        result.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
            Value::Object(result)
        }
        (_, overlay) => overlay.clone(),
    }
}
