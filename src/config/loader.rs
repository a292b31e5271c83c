//! Configuration file discovery and loading.
//!
//! The resolver consumes already-parsed layers; this module is the only
//! place that touches the filesystem. A config directory looks like:
//!
//! ```text
//! <config-dir>/
//!   defaults.yml        optional; built-in defaults used when absent
//!   profiles.yml        optional; named profiles
//!   projects/
//!     <id>.yml          one project layer per file
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{PreflightError, Result};

use super::schema::{DefaultsLayer, ProfileLayer, ProfilesFile, ProjectLayer};

/// Built-in defaults, used when the config dir has no `defaults.yml`.
///
/// Mirrors the common case: the forges and package mirrors most automation
/// scripts pull from, plus the tooling they invoke.
const BUILTIN_DEFAULTS: &str = r#"
groups:
  forges:
    display_name: Code forges
    category: network
    success_condition: any
    timeout_secs: 10
    strategies:
      - name: http
        priority: 10
      - name: git
        priority: 5
    targets:
      - id: github
        display_name: GitHub
        params:
          url: https://github.com
  package-mirrors:
    display_name: Package mirrors
    category: network
    success_condition: any
    timeout_secs: 10
    strategies:
      - name: http
        priority: 10
    targets:
      - id: crates-io
        display_name: crates.io
        params:
          url: https://crates.io
      - id: pypi
        display_name: PyPI
        params:
          url: https://pypi.org/simple/
  tooling:
    display_name: Required tooling
    category: environment
    success_condition: all
    execution_mode: sequential
    strategies:
      - name: command
        priority: 10
    targets:
      - id: git
        kind: dependency
        params:
          command: git --version
"#;

/// Handle on a preflight configuration directory.
#[derive(Debug, Clone)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// Wrap a config directory path. The directory need not exist yet;
    /// missing optional files fall back to built-ins.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this loader reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load `defaults.yml`, or the built-in defaults when absent.
    pub fn load_defaults(&self) -> Result<DefaultsLayer> {
        let path = self.root.join("defaults.yml");
        if path.exists() {
            read_yaml(&path)
        } else {
            tracing::debug!("no defaults.yml, using built-in defaults");
            Ok(builtin_defaults())
        }
    }

    /// Load one project layer from `projects/<name>.yml`.
    pub fn load_project(&self, name: &str) -> Result<ProjectLayer> {
        let path = self.root.join("projects").join(format!("{name}.yml"));
        if !path.exists() {
            return Err(PreflightError::UnknownProject {
                name: name.to_string(),
            });
        }
        let mut layer: ProjectLayer = read_yaml(&path)?;
        if layer.project.name.is_empty() {
            layer.project.name = name.to_string();
        }
        Ok(layer)
    }

    /// Load the named profiles, empty when `profiles.yml` is absent.
    pub fn load_profiles(&self) -> Result<BTreeMap<String, ProfileLayer>> {
        let path = self.root.join("profiles.yml");
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let file: ProfilesFile = read_yaml(&path)?;
        Ok(file.profiles)
    }

    /// Project ids with a config file, sorted.
    pub fn list_projects(&self) -> Result<Vec<String>> {
        let dir = self.root.join("projects");
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// The compiled-in defaults layer.
pub fn builtin_defaults() -> DefaultsLayer {
    serde_yaml::from_str(BUILTIN_DEFAULTS).expect("built-in defaults must parse")
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PreflightError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PreflightError::Io(e)
        }
    })?;

    serde_yaml::from_str(&contents).map_err(|e| PreflightError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
