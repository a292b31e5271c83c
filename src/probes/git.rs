//! Git remote reachability probe.
//!
//! Listing remote refs exercises the full clone path (DNS, TLS or SSH,
//! auth) without transferring objects, which catches proxy and credential
//! problems a plain HTTP GET misses.

use std::process::Command;
use std::time::Instant;

use serde_json::{json, Value};

use crate::engine::{HealthReport, ProbeError, Strategy, Target};

/// Probes a target by running `git ls-remote` against its repository URL.
///
/// Parameters:
/// - `url` (required): the repository URL.
#[derive(Debug, Default)]
pub struct GitProbe;

impl GitProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for GitProbe {
    fn name(&self) -> &str {
        "git"
    }

    fn detect(&self, _target: &Target, params: &Value) -> Result<Value, ProbeError> {
        let url = params
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ProbeError::Capability {
                reason: "missing 'url' parameter".to_string(),
            })?;

        let started = Instant::now();
        let output = Command::new("git")
            .args(["ls-remote", "--exit-code", url, "HEAD"])
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::Capability {
                        reason: "git is not installed".to_string(),
                    }
                } else {
                    ProbeError::Unreachable {
                        reason: e.to_string(),
                    }
                }
            })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::Unreachable {
                reason: stderr.trim().to_string(),
            });
        }

        let refs = String::from_utf8_lossy(&output.stdout).lines().count();
        Ok(json!({
            "url": url,
            "refs": refs,
            "response_ms": elapsed_ms,
        }))
    }

    fn health_check(&self) -> HealthReport {
        match Command::new("git").arg("--version").output() {
            Ok(output) if output.status.success() => HealthReport::healthy(self.name()),
            Ok(_) => HealthReport::unhealthy(self.name(), "git --version failed"),
            Err(_) => HealthReport::unhealthy(self.name(), "git is not installed"),
        }
    }
}
