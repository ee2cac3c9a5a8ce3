use std::collections::BTreeSet;

use anyhow::{Context, Result};
use regex::Regex;

/// Distinct `teams/<name>/` directories among the given repository paths.
/// Paths outside `teams/` are ignored.
pub fn count_team_directories(paths: &[String]) -> Result<BTreeSet<String>> {
    let pattern =
        Regex::new(r"^(?:\./)?teams/([^/]+)/").context("failed to compile team directory regex")?;

    let teams = paths
        .iter()
        .map(|path| path.trim().replace('\\', "/"))
        .filter_map(|path| {
            pattern
                .captures(&path)
                .and_then(|captures| captures.get(1))
                .map(|name| name.as_str().to_string())
        })
        .collect();

    Ok(teams)
}
