//! Run command implementation.
//!
//! The `preflight run` command resolves configuration for each selected
//! project, executes the detection engine, and renders a report per
//! project. The process exit code reflects the combined verdict: warnings
//! are acceptable, failures are not.

use std::time::Instant;

use crate::config::{resolve, ConfigDir, ProjectLayer};
use crate::engine::{ExecutionCoordinator, StrategyRegistry};
use crate::error::Result;
use crate::report::{DiagnosticReport, ReportTheme};

use super::args::{OutputFormat, RunArgs};
use super::CommandResult;

/// The run command implementation.
pub struct RunCommand {
    config_dir: ConfigDir,
    args: RunArgs,
    quiet: bool,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(config_dir: ConfigDir, args: RunArgs, quiet: bool) -> Self {
        Self {
            config_dir,
            args,
            quiet,
        }
    }

    /// Execute diagnostics and print reports to stdout.
    pub fn execute(&self, theme: &ReportTheme) -> Result<CommandResult> {
        let reports = self.run_diagnostics()?;
        let all_passed = reports.iter().all(DiagnosticReport::passed);

        match self.args.format {
            OutputFormat::Json => {
                if let [report] = reports.as_slice() {
                    println!("{}", report.to_json()?);
                } else {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&reports)
                            .map_err(|e| crate::PreflightError::Other(anyhow::anyhow!(e)))?
                    );
                }
            }
            OutputFormat::Text => {
                for report in &reports {
                    if self.quiet {
                        let verdict = if report.passed() {
                            theme.success.apply_to("ready").to_string()
                        } else {
                            theme.error.apply_to("not ready").to_string()
                        };
                        println!("{}: {verdict}", report.project);
                    } else {
                        print!("{}", report.render_text(theme));
                    }
                }
            }
        }

        if all_passed {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }

    /// Resolve and run every selected project, in order.
    pub fn run_diagnostics(&self) -> Result<Vec<DiagnosticReport>> {
        let defaults = self.config_dir.load_defaults()?;
        let profiles = self.config_dir.load_profiles()?;
        let profile = self.args.profile.as_deref();

        let layers = self.project_layers()?;

        let registry = StrategyRegistry::with_builtin_probes();
        let coordinator = ExecutionCoordinator::new(registry);

        let mut reports = Vec::with_capacity(layers.len());
        for layer in &layers {
            let resolved = resolve(&defaults, layer, &profiles, profile)?;
            tracing::info!(
                project = %resolved.project,
                groups = resolved.groups.len(),
                "running diagnostics"
            );

            let started = Instant::now();
            let results = coordinator.run(&resolved.groups, self.args.concurrency);
            reports.push(DiagnosticReport::from_groups(
                &resolved.project,
                profile,
                results,
                started.elapsed(),
            ));
        }

        Ok(reports)
    }

    /// The project layers to diagnose: the requested projects, every
    /// configured project, or the bare defaults when nothing is configured.
    fn project_layers(&self) -> Result<Vec<ProjectLayer>> {
        let names = if self.args.projects.is_empty() {
            self.config_dir.list_projects()?
        } else {
            self.args.projects.clone()
        };

        if names.is_empty() {
            let mut layer = ProjectLayer::default();
            layer.project.name = "defaults".to_string();
            return Ok(vec![layer]);
        }

        names
            .iter()
            .map(|name| self.config_dir.load_project(name))
            .collect()
    }
}
