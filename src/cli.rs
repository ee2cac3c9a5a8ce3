use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "rankeval",
    version,
    about = "Validate and score ranked retrieval submissions"
)]
pub struct Cli {
    /// Log filter directive; falls back to RUST_LOG, then "info"
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Full)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    Full,
    Compact,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a submission's structure and query coverage
    Validate(ValidateArgs),
    /// Score a validated submission against relevance labels
    Evaluate(EvaluateArgs),
    /// Write the run sidecar read by the leaderboard
    Metadata(MetadataArgs),
    /// Aggregate scored runs into leaderboard JSON and markdown
    Leaderboard(LeaderboardArgs),
    /// Print tool and environment details
    Info,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long)]
    pub submission: PathBuf,

    #[arg(long)]
    pub products: PathBuf,

    #[arg(long)]
    pub queries_synth: PathBuf,

    #[arg(long)]
    pub queries_real: Option<PathBuf>,

    #[arg(long)]
    pub team: String,

    #[arg(long, default_value = "validation_report.json")]
    pub out: PathBuf,

    #[arg(long, default_value_t = 1)]
    pub max_team_dirs: usize,

    /// Path changed by the submission; repeat for each path
    #[arg(long = "changed-path")]
    pub changed_paths: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub submission: PathBuf,

    #[arg(long)]
    pub labels_synth: PathBuf,

    #[arg(long)]
    pub labels_real: Option<PathBuf>,

    #[arg(long)]
    pub team: String,

    #[arg(long, default_value = "score_report.json")]
    pub out: PathBuf,

    #[arg(long, default_value_t = 0.7)]
    pub w_real: f64,

    #[arg(long, default_value_t = 0.3)]
    pub w_synth: f64,
}

#[derive(Args, Debug, Clone)]
pub struct MetadataArgs {
    #[arg(long)]
    pub team: String,

    #[arg(long)]
    pub submission: Option<PathBuf>,

    /// Defaults to $CI_PIPELINE_ID
    #[arg(long)]
    pub pipeline_id: Option<String>,

    /// Defaults to $CI_COMMIT_SHA
    #[arg(long)]
    pub commit_sha: Option<String>,

    #[arg(long, default_value = "metadata.json")]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct LeaderboardArgs {
    #[arg(long, default_value = "leaderboard/runs")]
    pub runs_dir: PathBuf,

    #[arg(long, default_value = "leaderboard/leaderboard.json")]
    pub out_json: PathBuf,

    #[arg(long, default_value = "leaderboard/leaderboard.md")]
    pub out_md: PathBuf,

    #[arg(long, default_value = "Leaderboard")]
    pub title: String,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands, LogFormat};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn validate_defaults_to_single_team_directory() {
        let cli = Cli::try_parse_from([
            "rankeval",
            "validate",
            "--submission",
            "teams/alpha/submission.json",
            "--products",
            "data/products.json",
            "--queries-synth",
            "data/queries_synth.json",
            "--team",
            "alpha",
        ])
        .expect("validate args should parse");

        assert_eq!(cli.log_format, LogFormat::Full);
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.max_team_dirs, 1);
                assert!(args.queries_real.is_none());
                assert!(args.changed_paths.is_empty());
                assert_eq!(args.out.to_str(), Some("validation_report.json"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn evaluate_defaults_to_seventy_thirty_weights() {
        let cli = Cli::try_parse_from([
            "rankeval",
            "--log-level",
            "debug",
            "evaluate",
            "--submission",
            "s.json",
            "--labels-synth",
            "l.json",
            "--team",
            "alpha",
        ])
        .expect("evaluate args should parse");

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Evaluate(args) => {
                assert_eq!(args.w_real, 0.7);
                assert_eq!(args.w_synth, 0.3);
                assert!(args.labels_real.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
