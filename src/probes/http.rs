//! HTTP reachability probe.

use std::time::Instant;

use serde_json::{json, Value};

use crate::engine::{ProbeError, Strategy, Target};

/// Probes a target by issuing a GET request and checking the status code.
///
/// Parameters:
/// - `url` (required): the URL to request.
/// - `expected_status` (optional, default 200): the status treated as success.
///
/// One client serves every target; the per-attempt timeout is applied per
/// request, so connection pools survive across probes.
#[derive(Debug, Default)]
pub struct HttpProbe {
    client: reqwest::blocking::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for HttpProbe {
    fn name(&self) -> &str {
        "http"
    }

    fn detect(&self, target: &Target, params: &Value) -> Result<Value, ProbeError> {
        let url = params
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ProbeError::Capability {
                reason: "missing 'url' parameter".to_string(),
            })?;
        let expected = params
            .get("expected_status")
            .and_then(Value::as_u64)
            .unwrap_or(200) as u16;

        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .timeout(target.timeout)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    }
                } else {
                    ProbeError::Unreachable {
                        reason: e.to_string(),
                    }
                }
            })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let status = response.status().as_u16();
        if status != expected {
            return Err(ProbeError::Unreachable {
                reason: format!("unexpected status {status} (wanted {expected})"),
            });
        }

        Ok(json!({
            "url": url,
            "status": status,
            "response_ms": elapsed_ms,
        }))
    }

    // Nothing to verify without a target: holding `self` means the shared
    // client already constructed, and the network itself is what the probe
    // exists to test. The default healthy report applies.
}
