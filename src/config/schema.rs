//! Raw configuration layer types.
//!
//! Three layers feed the resolver: built-in defaults (always present),
//! a project layer (appends targets, overrides scalars), and an optional
//! named profile (forces whole check categories on or off). These structs
//! are the parsed shape of the YAML files; the resolver merges them into
//! engine types.
//!
//! All maps are `BTreeMap` so layer iteration, and therefore resolution,
//! is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::{ExecutionMode, SuccessCondition};

/// One configured strategy: technique name, priority, parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySpec {
    pub name: String,

    /// Higher priorities are tried first.
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Opaque parameters handed to the strategy implementation.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// One target entry in a group's target list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub id: String,

    pub display_name: Option<String>,

    /// Strategy family tag; defaults to "reachability".
    pub kind: Option<String>,

    /// For conditional groups: this target's failure fails the group.
    #[serde(default)]
    pub required: bool,

    pub weight: Option<f64>,

    pub timeout_secs: Option<u64>,
    pub retry_count: Option<u32>,
    pub retry_delay_ms: Option<u64>,

    /// Target-specific strategy list. When absent, the group's strategy
    /// set applies with this target's `params` merged in.
    pub strategies: Option<Vec<StrategySpec>>,

    /// Target-level parameters (a URL, a command) merged over each
    /// group-level strategy's params.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// One group of targets in the defaults or project layer.
///
/// Every field except `targets` is a scalar key: the project value
/// replaces the default value when present. `targets` is list-valued:
/// project entries append to default entries unless the group key is in
/// the project's `disable_defaults`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupSpec {
    pub display_name: Option<String>,

    /// Check category ("network", "environment", ...); profiles toggle
    /// whole categories.
    pub category: Option<String>,

    pub enabled: Option<bool>,

    pub success_condition: Option<SuccessCondition>,
    pub execution_mode: Option<ExecutionMode>,

    pub timeout_secs: Option<u64>,
    pub retry_count: Option<u32>,
    pub retry_delay_ms: Option<u64>,

    /// Group-level strategy set, used by targets without their own.
    pub strategies: Option<Vec<StrategySpec>>,

    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

/// The built-in defaults layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DefaultsLayer {
    #[serde(default)]
    pub groups: BTreeMap<String, GroupSpec>,
}

/// Descriptive project metadata, carried into the report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

/// A project's configuration layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectLayer {
    #[serde(default)]
    pub project: ProjectInfo,

    /// Group keys whose default target entries should be dropped before
    /// this project's entries are applied.
    #[serde(default)]
    pub disable_defaults: Vec<String>,

    #[serde(default)]
    pub groups: BTreeMap<String, GroupSpec>,
}

/// A named profile: the final overlay, forcing categories on or off.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileLayer {
    pub description: Option<String>,

    /// category -> enabled. Wins over defaults and project.
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
}

/// Shape of the `profiles.yml` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileLayer>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_spec_parses_from_yaml() {
        let yaml = r#"
category: network
success_condition: any
execution_mode: parallel
timeout_secs: 5
strategies:
  - name: http
    priority: 10
  - name: git
    priority: 5
    params:
      depth: 1
targets:
  - id: github
    display_name: GitHub
    params:
      url: https://github.com
"#;
        let spec: GroupSpec = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(spec.category.as_deref(), Some("network"));
        assert_eq!(spec.success_condition, Some(SuccessCondition::Any));
        assert_eq!(spec.timeout_secs, Some(5));
        let strategies = spec.strategies.unwrap();
        assert_eq!(strategies.len(), 2);
        assert!(strategies[0].enabled);
        assert_eq!(strategies[1].params["depth"], 1);
        assert_eq!(spec.targets[0].params["url"], "https://github.com");
    }

    #[test]
    fn target_spec_defaults_are_minimal() {
        let spec: TargetSpec = serde_yaml::from_str("id: pypi").unwrap();

        assert_eq!(spec.id, "pypi");
        assert!(!spec.required);
        assert!(spec.strategies.is_none());
        assert!(spec.params.is_null());
    }

    #[test]
    fn project_layer_parses_disable_defaults() {
        let yaml = r#"
project:
  name: demo
disable_defaults:
  - mirrors
groups:
  mirrors:
    targets:
      - id: internal
        params:
          url: https://mirror.internal
"#;
        let layer: ProjectLayer = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(layer.project.name, "demo");
        assert_eq!(layer.disable_defaults, vec!["mirrors"]);
        assert_eq!(layer.groups["mirrors"].targets.len(), 1);
    }

    #[test]
    fn profiles_file_parses_category_map() {
        let yaml = r#"
profiles:
  offline:
    description: Skip everything that needs the network
    categories:
      network: false
      environment: true
"#;
        let file: ProfilesFile = serde_yaml::from_str(yaml).unwrap();

        let offline = &file.profiles["offline"];
        assert_eq!(offline.categories["network"], false);
        assert_eq!(offline.categories["environment"], true);
    }

    #[test]
    fn condition_and_mode_names_are_snake_case() {
        let spec: GroupSpec =
            serde_yaml::from_str("success_condition: majority\nexecution_mode: sequential")
                .unwrap();
        assert_eq!(spec.success_condition, Some(SuccessCondition::Majority));
        assert_eq!(spec.execution_mode, Some(ExecutionMode::Sequential));
    }
}
