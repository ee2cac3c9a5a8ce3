use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::America::Chicago;
use tracing::{info, warn};

use crate::cli::LeaderboardArgs;
use crate::model::{LeaderboardManifest, LeaderboardRow, RunMetadata, ScoreReport};
use crate::util::{ensure_directory, parse_ci_timestamp, read_json, write_json_pretty, write_text};


const SCORE_REPORT_FILE: &str = "score_report.json";
const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone)]
pub struct TeamRun {
    pub timestamp: Option<DateTime<Utc>>,
    pub score: ScoreReport,
    pub metadata: RunMetadata,
}

pub fn run(args: LeaderboardArgs) -> Result<()> {
    ensure_directory(&args.runs_dir)?;

    let runs = load_runs(&args.runs_dir)?;
    let rows = pick_latest_per_team(runs);

    let manifest = LeaderboardManifest { rows };
    write_json_pretty(&args.out_json, &manifest)?;
    write_text(&args.out_md, &render_markdown(&args.title, &manifest.rows))?;

    info!(
        teams = manifest.rows.len(),
        json = %args.out_json.display(),
        markdown = %args.out_md.display(),
        "leaderboard written"
    );
    Ok(())
}

/// Loads every `<team>/<run>/` directory holding both a score report and its
/// metadata sidecar. Unreadable runs are skipped.
pub fn load_runs(runs_dir: &Path) -> Result<Vec<(String, Vec<TeamRun>)>> {
    let mut teams = Vec::new();
    for team_dir in sorted_subdirectories(runs_dir)? {
        let Some(team) = team_dir.file_name().and_then(|name| name.to_str()) else {
            warn!(path = %team_dir.display(), "skipping team directory with non UTF-8 name");
            continue;
        };

        let mut runs = Vec::new();
        for run_dir in sorted_subdirectories(&team_dir)? {
            let score_path = run_dir.join(SCORE_REPORT_FILE);
            let metadata_path = run_dir.join(METADATA_FILE);
            if !score_path.exists() || !metadata_path.exists() {
                continue;
            }

            match load_run(&score_path, &metadata_path) {
                Ok(run) => runs.push(run),
                Err(err) => warn!(path = %run_dir.display(), error = %err, "skipping unreadable run"),
            }
        }

        if !runs.is_empty() {
            teams.push((team.to_string(), runs));
        }
    }

    Ok(teams)
}

fn load_run(score_path: &Path, metadata_path: &Path) -> Result<TeamRun> {
    let score: ScoreReport = read_json(score_path)?;
    let metadata: RunMetadata = read_json(metadata_path)?;
    let timestamp = metadata.timestamp_utc.as_deref().and_then(parse_ci_timestamp);

    Ok(TeamRun {
        timestamp,
        score,
        metadata,
    })
}

fn sorted_subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        if entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_dir()
        {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Keeps the most recent run per team and orders teams by final score.
/// Runs without a usable timestamp count as the oldest.
pub fn pick_latest_per_team(teams: Vec<(String, Vec<TeamRun>)>) -> Vec<LeaderboardRow> {
    let mut rows = teams
        .into_iter()
        .filter_map(|(team, runs)| {
            runs.into_iter()
                .max_by_key(|run| run.timestamp)
                .map(|run| leaderboard_row(team, run))
        })
        .collect::<Vec<LeaderboardRow>>();

    rows.sort_by(|left, right| {
        right
            .weighted_final
            .total_cmp(&left.weighted_final)
            .then_with(|| left.team.cmp(&right.team))
    });
    rows
}

fn leaderboard_row(team: String, run: TeamRun) -> LeaderboardRow {
    let TeamRun {
        timestamp,
        score,
        metadata,
    } = run;
    let real = score.real.as_ref();
    let synthetic = &score.synthetic;

    LeaderboardRow {
        team,
        weighted_final: score.combined.weighted_final,
        real_ndcg_at_10: real.map(|metrics| metrics.ndcg_at_10),
        real_ap_at_20: real.map(|metrics| metrics.ap_at_20),
        real_precision_at_10: real.map(|metrics| metrics.precision_at_10),
        real_recall_at_30: real.map(|metrics| metrics.recall_at_30),
        real_composite: real.map(|metrics| metrics.composite),
        synth_ndcg_at_10: synthetic.ndcg_at_10,
        synth_ap_at_20: synthetic.ap_at_20,
        synth_precision_at_10: synthetic.precision_at_10,
        synth_recall_at_30: synthetic.recall_at_30,
        synth_composite: synthetic.composite,
        queries_scored_real: real.map(|metrics| metrics.queries_scored),
        queries_scored_synth: synthetic.queries_scored,
        pipeline_id: metadata.pipeline_id,
        commit_sha: metadata.commit_sha,
        timestamp_cst: timestamp.map(format_us_central),
        timestamp_utc: metadata.timestamp_utc,
    }
}

pub fn render_markdown(title: &str, rows: &[LeaderboardRow]) -> String {
    let mut lines = vec![
        format!("# :trophy: {title}\n"),
        "| Rank | Team | Final | Real nDCG@10 | Real AP@20 | Real P@10 | Real R@30 | Real Composite | Synth nDCG@10 | Synth AP@20 | Synth P@10 | Synth R@30 | Synth Composite | Pipeline | Timestamp (US Central) |".to_string(),
        "|---:|---|---:|---:|---:|---:|---:|---:|---:|---:|---:|---:|---:|---|---|".to_string(),
    ];

    for (index, row) in rows.iter().enumerate() {
        let timestamp = row
            .timestamp_cst
            .as_deref()
            .or(row.timestamp_utc.as_deref())
            .unwrap_or("N/A");
        lines.push(format!(
            "| {} | {} | {:.3} | {} | {} | {} | {} | {} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} | {} | {} |",
            index + 1,
            row.team,
            row.weighted_final,
            format_optional(row.real_ndcg_at_10),
            format_optional(row.real_ap_at_20),
            format_optional(row.real_precision_at_10),
            format_optional(row.real_recall_at_30),
            format_optional(row.real_composite),
            row.synth_ndcg_at_10,
            row.synth_ap_at_20,
            row.synth_precision_at_10,
            row.synth_recall_at_30,
            row.synth_composite,
            row.pipeline_id.as_deref().unwrap_or("N/A"),
            timestamp,
        ));
    }

    lines.join("\n") + "\n"
}

fn format_optional(value: Option<f64>) -> String {
    value
        .map(|value| format!("{value:.3}"))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Renders a UTC instant in America/Chicago wall time, labelled CST or CDT.
pub fn format_us_central(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Chicago)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}
