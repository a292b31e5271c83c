//! Diagnostic report assembly and rendering.
//!
//! The engine produces group results; this module turns them into the two
//! output surfaces: a styled terminal rendering and a JSON document for
//! tooling. Issue extraction walks failed and degraded results so the
//! summary can tell the user what to fix, not just what broke.

use std::time::Duration;

use chrono::{DateTime, Utc};
use console::Style;
use serde::Serialize;

use crate::engine::{GroupResult, GroupStatus, TargetResult};

/// Styles for the terminal rendering.
#[derive(Debug, Clone)]
pub struct ReportTheme {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub dim: Style,
    pub highlight: Style,
    pub header: Style,
}

impl ReportTheme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().magenta(),
        }
    }

    /// A theme without colors (non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
        }
    }
}

impl Default for ReportTheme {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    console::Term::stdout().is_term()
}

/// How serious an extracted issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One actionable finding pulled out of the results.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub group_id: String,
    pub target_id: Option<String>,
    pub message: String,

    /// What to do about it, when the failure kind implies a fix.
    pub suggestion: Option<String>,
}

/// Roll-up counts across the whole run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub groups_total: usize,
    pub groups_passed: usize,
    pub groups_warned: usize,
    pub groups_failed: usize,
    pub targets_total: usize,
    pub targets_succeeded: usize,
    pub duration_ms: u64,
}

/// The complete outcome of one diagnostic run.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub project: String,
    pub profile: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub issues: Vec<Issue>,
    pub groups: Vec<GroupResult>,
}

impl DiagnosticReport {
    /// Assemble a report from the evaluated group results.
    pub fn from_groups(
        project: &str,
        profile: Option<&str>,
        groups: Vec<GroupResult>,
        duration: Duration,
    ) -> Self {
        let summary = summarize(&groups, duration);
        let issues = extract_issues(&groups);

        Self {
            project: project.to_string(),
            profile: profile.map(str::to_string),
            generated_at: Utc::now(),
            summary,
            issues,
            groups,
        }
    }

    /// Whether the run is acceptable: warnings pass, failures do not.
    pub fn passed(&self) -> bool {
        self.groups.iter().all(|g| g.status != GroupStatus::Fail)
    }

    /// Serialize the full report for machine consumption.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::PreflightError::Other(anyhow::anyhow!(e)))
    }

    /// Render the report for a terminal.
    pub fn render_text(&self, theme: &ReportTheme) -> String {
        let mut out = String::new();

        let title = match &self.profile {
            Some(profile) => format!("Pre-flight: {} ({profile})", self.project),
            None => format!("Pre-flight: {}", self.project),
        };
        out.push_str(&format!("{}\n\n", theme.header.apply_to(title)));

        for group in &self.groups {
            let icon = status_icon(group.status, theme);
            out.push_str(&format!(
                "{icon} {} {}\n",
                theme.highlight.apply_to(&group.display_name),
                theme
                    .dim
                    .apply_to(format!("({}/{})", group.success_count, group.total_count)),
            ));

            if let Some(error) = &group.error {
                out.push_str(&format!("    {}\n", theme.error.apply_to(error)));
            }

            // Heavier targets first; stable, so equal weights keep
            // execution order.
            let mut targets: Vec<&TargetResult> = group.target_results.iter().collect();
            targets.sort_by(|a, b| b.weight.total_cmp(&a.weight));
            for target in targets {
                out.push_str(&render_target(target, theme));
            }
            out.push('\n');
        }

        out.push_str(&self.render_issues(theme));
        out.push_str(&self.render_summary(theme));
        out
    }

    fn render_issues(&self, theme: &ReportTheme) -> String {
        if self.issues.is_empty() {
            return String::new();
        }

        let mut out = format!("{}\n", theme.highlight.apply_to("Issues"));
        for issue in &self.issues {
            let line = match &issue.target_id {
                Some(target) => format!("{}/{}: {}", issue.group_id, target, issue.message),
                None => format!("{}: {}", issue.group_id, issue.message),
            };
            let styled = match issue.severity {
                Severity::Error => theme.error.apply_to(format!("✗ {line}")),
                Severity::Warning => theme.warning.apply_to(format!("⚠ {line}")),
            };
            out.push_str(&format!("  {styled}\n"));
            if let Some(suggestion) = &issue.suggestion {
                out.push_str(&format!("    {}\n", theme.dim.apply_to(suggestion)));
            }
        }
        out.push('\n');
        out
    }

    fn render_summary(&self, theme: &ReportTheme) -> String {
        let s = &self.summary;
        let verdict = if self.passed() {
            theme.success.apply_to("✓ ready").to_string()
        } else {
            theme.error.apply_to("✗ not ready").to_string()
        };
        format!(
            "{verdict} {}\n",
            theme.dim.apply_to(format!(
                "{} passed, {} warned, {} failed of {} groups in {}ms",
                s.groups_passed, s.groups_warned, s.groups_failed, s.groups_total, s.duration_ms
            ))
        )
    }
}

fn status_icon(status: GroupStatus, theme: &ReportTheme) -> String {
    match status {
        GroupStatus::Pass => theme.success.apply_to("✓").to_string(),
        GroupStatus::Warn => theme.warning.apply_to("⚠").to_string(),
        GroupStatus::Fail => theme.error.apply_to("✗").to_string(),
    }
}

fn render_target(target: &TargetResult, theme: &ReportTheme) -> String {
    if target.final_success {
        let mut line = format!("    {} {}", theme.success.apply_to("✓"), target.display_name);
        if let Some(narrative) = fallback_narrative(target) {
            line.push_str(&format!(" {}", theme.dim.apply_to(narrative)));
        } else if let Some(strategy) = &target.strategy_used {
            line.push_str(&format!(" {}", theme.dim.apply_to(format!("via {strategy}"))));
        }
        line.push('\n');
        line
    } else {
        let reason = target
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "not attempted".to_string());
        format!(
            "    {} {} {}\n",
            theme.error.apply_to("✗"),
            target.display_name,
            theme.dim.apply_to(reason)
        )
    }
}

/// Describe a degraded success, e.g. "via git after http failed".
fn fallback_narrative(target: &TargetResult) -> Option<String> {
    let used = target.strategy_used.as_deref()?;
    let mut failed: Vec<&str> = Vec::new();
    for attempt in &target.attempts {
        if attempt.success {
            break;
        }
        if !failed.contains(&attempt.strategy_name.as_str()) {
            failed.push(&attempt.strategy_name);
        }
    }
    if failed.is_empty() {
        return None;
    }
    Some(format!("via {used} after {} failed", failed.join(", ")))
}

/// Map a failure kind to a next step.
fn suggest_fix(error: &crate::engine::ProbeError) -> String {
    use crate::engine::ProbeError;
    match error {
        ProbeError::Timeout { .. } => {
            "check your connection, or raise timeout_secs for this target".to_string()
        }
        ProbeError::Unreachable { .. } => {
            "verify the URL or service and that it is reachable from this machine".to_string()
        }
        ProbeError::Capability { reason } => format!("resolve the missing prerequisite: {reason}"),
    }
}

fn summarize(groups: &[GroupResult], duration: Duration) -> Summary {
    let count_status =
        |status: GroupStatus| groups.iter().filter(|g| g.status == status).count();

    Summary {
        groups_total: groups.len(),
        groups_passed: count_status(GroupStatus::Pass),
        groups_warned: count_status(GroupStatus::Warn),
        groups_failed: count_status(GroupStatus::Fail),
        targets_total: groups.iter().map(|g| g.total_count).sum(),
        targets_succeeded: groups.iter().map(|g| g.success_count).sum(),
        duration_ms: duration.as_millis() as u64,
    }
}

fn extract_issues(groups: &[GroupResult]) -> Vec<Issue> {
    let mut issues = Vec::new();

    for group in groups {
        let severity = match group.status {
            GroupStatus::Pass => continue,
            GroupStatus::Warn => Severity::Warning,
            GroupStatus::Fail => Severity::Error,
        };

        if let Some(error) = &group.error {
            issues.push(Issue {
                severity,
                group_id: group.group_id.clone(),
                target_id: None,
                message: error.clone(),
                suggestion: None,
            });
        }

        for target in &group.target_results {
            if target.final_success {
                continue;
            }
            let message = target
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "not attempted".to_string());
            issues.push(Issue {
                severity,
                group_id: group.group_id.clone(),
                target_id: Some(target.target_id.clone()),
                message,
                suggestion: target.error.as_ref().map(suggest_fix),
            });
        }
    }

    issues
}
