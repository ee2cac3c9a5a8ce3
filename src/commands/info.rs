use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

const REPORTED_ENV_VARS: [&str; 5] = [
    "TEAM_NAME",
    "TEAM_DIR",
    "SUBMISSION_FILE",
    "CI",
    "CI_PIPELINE_ID",
];

#[derive(Debug, Serialize)]
struct ToolInfo {
    version: &'static str,
    os: &'static str,
    arch: &'static str,
    cwd: String,
    env: BTreeMap<&'static str, Option<String>>,
}

pub fn run() -> Result<()> {
    let info = collect_info()?;
    let rendered = serde_json::to_string_pretty(&info).context("failed to serialize tool info")?;
    println!("{rendered}");
    Ok(())
}

fn collect_info() -> Result<ToolInfo> {
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;

    Ok(ToolInfo {
        version: env!("CARGO_PKG_VERSION"),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        cwd: cwd.display().to_string(),
        env: REPORTED_ENV_VARS
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect(),
    })
}
