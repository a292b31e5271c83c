//! Preflight CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use preflight::cli::{Cli, Commands, ListCommand, RunCommand};
use preflight::config::ConfigDir;
use preflight::report::{should_use_colors, ReportTheme};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is WARN, keeping report output clean
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("preflight=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("preflight=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config_dir = ConfigDir::new(
        cli.config_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".preflight")),
    );

    let theme = if cli.no_color || !should_use_colors() {
        ReportTheme::plain()
    } else {
        ReportTheme::new()
    };

    let result = match cli.command {
        Some(Commands::Run(args)) => RunCommand::new(config_dir, args, cli.quiet).execute(&theme),
        Some(Commands::List(args)) => ListCommand::new(config_dir, args).execute(&theme),
        None => RunCommand::new(config_dir, Default::default(), cli.quiet).execute(&theme),
    };

    match result {
        Ok(outcome) => ExitCode::from(outcome.exit_code),
        Err(err) => {
            eprintln!("{}", theme.error.apply_to(format!("error: {err}")));
            ExitCode::from(2)
        }
    }
}
