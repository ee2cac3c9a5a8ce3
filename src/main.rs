mod cli;
mod commands;
mod metrics;
mod model;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, LogFormat};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref(), cli.log_format);

    if let Err(err) = run(cli.command) {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Evaluate(args) => commands::evaluate::run(args),
        Commands::Metadata(args) => commands::metadata::run(args),
        Commands::Leaderboard(args) => commands::leaderboard::run(args),
        Commands::Info => commands::info::run(),
    }
}

fn init_tracing(log_level: Option<&str>, format: LogFormat) {
    let env_filter = log_level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Full => builder.init(),
        LogFormat::Compact => builder.compact().init(),
    }
}
