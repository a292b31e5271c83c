//! Installed-tool probe.

use std::process::Command;

use serde_json::{json, Value};

use crate::engine::{ProbeError, Strategy, Target};

/// Probes for an installed tool by running a command and optionally
/// checking the version it reports.
///
/// Parameters:
/// - `command` (required): the command line to run (e.g. `"git --version"`).
/// - `min_version` (optional): minimum acceptable version, compared
///   component-wise on the dotted numeric prefix.
#[derive(Debug, Default)]
pub struct CommandProbe;

impl CommandProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for CommandProbe {
    fn name(&self) -> &str {
        "command"
    }

    fn detect(&self, _target: &Target, params: &Value) -> Result<Value, ProbeError> {
        let command_line = params
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| ProbeError::Capability {
                reason: "missing 'command' parameter".to_string(),
            })?;

        let parts: Vec<&str> = command_line.split_whitespace().collect();
        let Some((program, args)) = parts.split_first() else {
            return Err(ProbeError::Capability {
                reason: "'command' parameter is empty".to_string(),
            });
        };

        let output = Command::new(program).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProbeError::Capability {
                    reason: format!("{program} is not installed"),
                }
            } else {
                ProbeError::Unreachable {
                    reason: e.to_string(),
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::Unreachable {
                reason: format!(
                    "{program} exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = extract_version(&stdout);

        if let Some(min) = params.get("min_version").and_then(Value::as_str) {
            let Some(found) = version.as_deref() else {
                return Err(ProbeError::Capability {
                    reason: format!("{program}: could not determine version (need >= {min})"),
                });
            };
            if !version_at_least(found, min) {
                return Err(ProbeError::Capability {
                    reason: format!("{program} {found} is below required {min}"),
                });
            }
        }

        Ok(json!({
            "command": command_line,
            "version": version,
        }))
    }
}

/// Pull a version number out of command output.
fn extract_version(output: &str) -> Option<String> {
    let patterns = [r"(\d+\.\d+\.\d+)", r"version\s+(\d+\.\d+)", r"v(\d+\.\d+)"];

    for pattern in &patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            if let Some(caps) = re.captures(output) {
                if let Some(m) = caps.get(1) {
                    return Some(m.as_str().to_string());
                }
            }
        }
    }

    None
}

/// Component-wise comparison of dotted numeric versions; missing
/// components count as zero.
fn version_at_least(found: &str, min: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.parse().unwrap_or(0))
            .collect()
    };
    let found = parse(found);
    let min = parse(min);

    for i in 0..found.len().max(min.len()) {
        let f = found.get(i).copied().unwrap_or(0);
        let m = min.get(i).copied().unwrap_or(0);
        if f != m {
            return f > m;
        }
    }
    true
}
