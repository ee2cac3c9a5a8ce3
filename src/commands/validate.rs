use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, info_span, warn};

use crate::cli::ValidateArgs;
use crate::model::{
    ProductCatalogFile, QueryDescriptor, RawSubmissionRow, ReportWarning, ValidationReport,
    ValidationStatus,
};
use crate::util::{read_json, round_to, write_json_pretty};

mod team_dirs;

use self::team_dirs::count_team_directories;

const MIN_RESULTS_PER_QUERY: usize = 30;
const DUPLICATE_SAMPLE_LIMIT: usize = 10;
const MISSING_QUERY_SAMPLE_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct ValidationInputs<'a> {
    pub submission: &'a Path,
    pub products: &'a Path,
    pub queries_real: Option<&'a Path>,
    pub queries_synth: &'a Path,
}

#[derive(Debug, Clone, Default)]
pub struct TeamDirPolicy<'a> {
    pub max_team_dirs: usize,
    pub changed_paths: &'a [String],
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let inputs = ValidationInputs {
        submission: &args.submission,
        products: &args.products,
        queries_real: args.queries_real.as_deref(),
        queries_synth: &args.queries_synth,
    };
    let policy = TeamDirPolicy {
        max_team_dirs: args.max_team_dirs,
        changed_paths: &args.changed_paths,
    };

    let report = validate_submission(inputs, &args.team, &policy)?;
    write_json_pretty(&args.out, &report)?;

    if report.passed() {
        info!(
            team = %report.team,
            queries_checked = report.queries_checked,
            avg_depth = report.avg_depth.unwrap_or_default(),
            path = %args.out.display(),
            "validation passed"
        );
        return Ok(());
    }

    for message in &report.errors {
        error!(team = %report.team, "{message}");
    }
    bail!(
        "validation failed for team {} with {} error(s); see {}",
        report.team,
        report.errors.len(),
        args.out.display()
    )
}

/// Checks a submission against the catalog and query sets.
///
/// Team defects are collected into the report; only reference inputs that
/// cannot be loaded come back as `Err`.
pub fn validate_submission(
    inputs: ValidationInputs<'_>,
    team: &str,
    policy: &TeamDirPolicy<'_>,
) -> Result<ValidationReport> {
    let _span = info_span!("validate", team = %team).entered();
    let mut report = ValidationReport::new(team);

    if !inputs.submission.exists() {
        report.errors.push(format!(
            "submission file not found: {}",
            inputs.submission.display()
        ));
        return Ok(report);
    }
    info!(path = %inputs.submission.display(), "validating submission");

    let valid_products = load_product_catalog(inputs.products)?;
    let required_queries = load_required_queries(inputs.queries_real, inputs.queries_synth)?;
    debug!(
        products = valid_products.len(),
        required_queries = required_queries.len(),
        "loaded reference data"
    );

    let rows = match load_submission_rows(inputs.submission) {
        Ok(rows) => rows,
        Err(message) => {
            report.errors.push(message);
            return Ok(report);
        }
    };

    check_team_directories(&mut report, policy)?;

    let per_query = collect_rows(&mut report, &rows, &valid_products);
    check_coverage(&mut report, &required_queries, &per_query.groups);
    check_query_structure(&mut report, &per_query.groups);

    if !per_query.duplicates.is_empty() {
        let sample = per_query
            .duplicates
            .iter()
            .take(DUPLICATE_SAMPLE_LIMIT)
            .map(|(query_id, product_id)| format!("({query_id}, {product_id})"))
            .collect::<Vec<String>>()
            .join(", ");
        report.errors.push(format!(
            "found {} duplicate (query_id, product_id) pairs: [{sample}]",
            per_query.duplicates.len()
        ));
    }

    report.status = if report.errors.is_empty() {
        ValidationStatus::Passed
    } else {
        ValidationStatus::Failed
    };
    info!(
        status = report.status.as_str(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validation finished"
    );

    Ok(report)
}

fn load_product_catalog(path: &Path) -> Result<HashSet<String>> {
    info!(path = %path.display(), "loading product catalog");
    let catalog: ProductCatalogFile = read_json(path)?;
    let ids = match catalog {
        ProductCatalogFile::Ids(ids) => ids.into_iter().collect(),
        ProductCatalogFile::Records(records) => records
            .into_iter()
            .filter_map(|record| record.product_id)
            .filter(|product_id| !product_id.is_empty())
            .collect(),
    };
    Ok(ids)
}

fn load_required_queries(
    queries_real: Option<&Path>,
    queries_synth: &Path,
) -> Result<BTreeSet<String>> {
    let mut required = BTreeSet::new();

    match queries_real {
        Some(path) => {
            info!(path = %path.display(), "loading real queries");
            let queries: Vec<QueryDescriptor> = read_json(path)?;
            required.extend(queries.into_iter().map(|query| query.query_id));
        }
        None => info!("no real queries provided, validating synthetic queries only"),
    }

    info!(path = %queries_synth.display(), "loading synthetic queries");
    let queries: Vec<QueryDescriptor> = read_json(queries_synth)?;
    required.extend(queries.into_iter().map(|query| query.query_id));

    Ok(required)
}

/// Reads the submission as a JSON array. Failures become the single fatal
/// report message rather than an error.
fn load_submission_rows(path: &Path) -> std::result::Result<Vec<Value>, String> {
    let raw = fs::read(path)
        .with_context(|| format!("failed to read submission: {}", path.display()))
        .map_err(|err| format!("{err:#}"))?;
    let value: Value = serde_json::from_slice(&raw)
        .map_err(|err| format!("submission is not valid JSON: {err}"))?;

    match value {
        Value::Array(rows) => Ok(rows),
        _ => Err("submission must be a JSON array of objects".to_string()),
    }
}

fn check_team_directories(
    report: &mut ValidationReport,
    policy: &TeamDirPolicy<'_>,
) -> Result<()> {
    if policy.changed_paths.is_empty() {
        return Ok(());
    }

    let team_dirs = count_team_directories(policy.changed_paths)?;
    if team_dirs.len() > policy.max_team_dirs {
        report.errors.push(format!(
            "submission touches {} team directories ({}), at most {} allowed",
            team_dirs.len(),
            team_dirs.into_iter().collect::<Vec<String>>().join(", "),
            policy.max_team_dirs
        ));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct CollectedRows {
    groups: Vec<(String, Vec<i64>)>,
    duplicates: Vec<(String, String)>,
}

fn collect_rows(
    report: &mut ValidationReport,
    rows: &[Value],
    valid_products: &HashSet<String>,
) -> CollectedRows {
    let mut collected = CollectedRows::default();
    let mut positions = HashMap::<String, usize>::new();
    let mut seen_pairs = HashSet::<(String, String)>::new();

    for (index, value) in rows.iter().enumerate() {
        if !value.is_object() {
            report
                .errors
                .push(format!("row {index}: submission rows must be objects, got: {value}"));
            continue;
        }

        let row = match RawSubmissionRow::deserialize(value) {
            Ok(row) => row,
            Err(err) => {
                report
                    .errors
                    .push(format!("row {index} has invalid field type(s): {err}: {value}"));
                continue;
            }
        };

        let (query_id, rank, product_id) = match (row.query_id, row.rank, row.product_id) {
            (Some(query_id), Some(rank), Some(product_id)) => (query_id, rank, product_id),
            (query_id, rank, product_id) => {
                let missing = [
                    ("query_id", query_id.is_none()),
                    ("rank", rank.is_none()),
                    ("product_id", product_id.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name)
                .collect::<Vec<&str>>();
                report.errors.push(format!(
                    "row {index} missing field(s) {}: {value}",
                    missing.join(", ")
                ));
                continue;
            }
        };

        let pair = (query_id.clone(), product_id.clone());
        if !seen_pairs.insert(pair.clone()) {
            collected.duplicates.push(pair);
        }

        if !valid_products.contains(&product_id) {
            report.errors.push(format!(
                "unknown product_id '{product_id}' for query_id '{query_id}'"
            ));
        }

        let position = match positions.get(&query_id) {
            Some(position) => *position,
            None => {
                positions.insert(query_id.clone(), collected.groups.len());
                collected.groups.push((query_id, Vec::new()));
                collected.groups.len() - 1
            }
        };
        collected.groups[position].1.push(rank);
    }

    collected
}

fn check_coverage(
    report: &mut ValidationReport,
    required_queries: &BTreeSet<String>,
    groups: &[(String, Vec<i64>)],
) {
    let submitted = groups
        .iter()
        .map(|(query_id, _)| query_id.as_str())
        .collect::<HashSet<&str>>();
    let missing = required_queries
        .iter()
        .filter(|query_id| !submitted.contains(query_id.as_str()))
        .cloned()
        .collect::<Vec<String>>();

    let unexpected = submitted
        .iter()
        .filter(|query_id| !required_queries.contains(**query_id))
        .count();
    if unexpected > 0 {
        report.warnings.push(ReportWarning::Message(format!(
            "submission contains {unexpected} queries outside the query sets"
        )));
    }

    if missing.is_empty() {
        return;
    }

    warn!(missing = missing.len(), "required queries missing from submission");
    report
        .errors
        .push(format!("missing {} queries from submission", missing.len()));
    report.warnings.push(ReportWarning::MissingQueriesSample {
        missing_queries_sample: missing
            .into_iter()
            .take(MISSING_QUERY_SAMPLE_LIMIT)
            .collect(),
    });
}

fn check_query_structure(report: &mut ValidationReport, groups: &[(String, Vec<i64>)]) {
    let mut total_depth = 0_usize;

    for (query_id, ranks) in groups {
        let mut ranks = ranks.clone();
        ranks.sort_unstable();
        total_depth += ranks.len();

        if ranks.len() < MIN_RESULTS_PER_QUERY {
            report.errors.push(format!(
                "query '{query_id}' has only {} results, need at least {MIN_RESULTS_PER_QUERY}",
                ranks.len()
            ));
        }

        if let Some((expected, found)) = first_rank_gap(&ranks) {
            report.errors.push(format!(
                "query '{query_id}' ranks must be continuous starting at 1. found {found}, expected {expected}"
            ));
        }
    }

    report.queries_checked = groups.len();
    report.avg_depth = Some(if groups.is_empty() {
        0.0
    } else {
        round_to(total_depth as f64 / groups.len() as f64, 2)
    });
}

/// First position where sorted ranks stop matching 1, 2, 3, ...
fn first_rank_gap(sorted_ranks: &[i64]) -> Option<(i64, i64)> {
    sorted_ranks
        .iter()
        .zip(1_i64..)
        .find(|(rank, expected)| **rank != *expected)
        .map(|(rank, expected)| (expected, *rank))
}
