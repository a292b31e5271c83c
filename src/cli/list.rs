//! List command implementation.
//!
//! The `preflight list` command shows what a run would have to work with:
//! configured projects, available profiles, and the check groups the
//! defaults layer provides.

use serde_json::json;

use crate::config::ConfigDir;
use crate::error::Result;
use crate::report::ReportTheme;

use super::args::ListArgs;
use super::CommandResult;

/// The list command implementation.
pub struct ListCommand {
    config_dir: ConfigDir,
    args: ListArgs,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(config_dir: ConfigDir, args: ListArgs) -> Self {
        Self { config_dir, args }
    }

    /// Print the inventory to stdout.
    pub fn execute(&self, theme: &ReportTheme) -> Result<CommandResult> {
        let projects = self.config_dir.list_projects()?;
        let profiles = self.config_dir.load_profiles()?;
        let defaults = self.config_dir.load_defaults()?;

        if self.args.json {
            let doc = json!({
                "projects": projects,
                "profiles": profiles.keys().collect::<Vec<_>>(),
                "default_groups": defaults.groups.keys().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&doc).map_err(|e| {
                crate::PreflightError::Other(anyhow::anyhow!(e))
            })?);
            return Ok(CommandResult::success());
        }

        println!("{}", theme.highlight.apply_to("Projects:"));
        if projects.is_empty() {
            println!("  {}", theme.dim.apply_to("(none configured)"));
        }
        for name in &projects {
            println!("  {name}");
        }

        println!("{}", theme.highlight.apply_to("Profiles:"));
        if profiles.is_empty() {
            println!("  {}", theme.dim.apply_to("(none configured)"));
        }
        for (name, profile) in &profiles {
            match &profile.description {
                Some(desc) => println!("  {name} {}", theme.dim.apply_to(desc)),
                None => println!("  {name}"),
            }
        }

        println!("{}", theme.highlight.apply_to("Default groups:"));
        for (key, group) in &defaults.groups {
            let category = group.category.as_deref().unwrap_or("general");
            println!(
                "  {key} {}",
                theme.dim.apply_to(format!(
                    "({category}, {} targets)",
                    group.targets.len()
                ))
            );
        }

        Ok(CommandResult::success())
    }
}
