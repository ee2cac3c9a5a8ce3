use std::collections::HashMap;
use std::path::Path;

use anyhow::{Result, bail};
use tracing::{info, info_span, warn};

use crate::cli::EvaluateArgs;
use crate::metrics::{average_precision, binary_relevance, ndcg_at_k, precision_at_k, recall_at_k};
use crate::model::{
    CombinedScore, CombinedWeights, LabelRow, ScoreMetrics, ScoreReport, SubmissionRow,
};
use crate::util::{read_json, round_to, write_json_pretty};


const NDCG_CUTOFF: usize = 10;
const AP_CUTOFF: usize = 20;
const PRECISION_CUTOFF: usize = 10;
const RECALL_CUTOFF: usize = 30;

const COMPOSITE_NDCG_WEIGHT: f64 = 0.30;
const COMPOSITE_AP_WEIGHT: f64 = 0.30;
const COMPOSITE_RECALL_WEIGHT: f64 = 0.25;
const COMPOSITE_PRECISION_WEIGHT: f64 = 0.15;

const SCORE_DECIMALS: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationWeights {
    pub real: f64,
    pub synthetic: f64,
}

impl Default for EvaluationWeights {
    fn default() -> Self {
        Self {
            real: 0.7,
            synthetic: 0.3,
        }
    }
}

impl EvaluationWeights {
    pub fn new(real: f64, synthetic: f64) -> Result<Self> {
        for (name, value) in [("real", real), ("synthetic", synthetic)] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} weight must be a finite non-negative number, got {value}");
            }
        }
        Ok(Self { real, synthetic })
    }
}

pub fn run(args: EvaluateArgs) -> Result<()> {
    let weights = EvaluationWeights::new(args.w_real, args.w_synth)?;
    let report = full_evaluation(
        &args.submission,
        args.labels_real.as_deref(),
        &args.labels_synth,
        &args.team,
        weights,
    )?;

    write_json_pretty(&args.out, &report)?;
    info!(
        team = %report.team,
        weighted_final = report.combined.weighted_final,
        path = %args.out.display(),
        "evaluation completed"
    );

    Ok(())
}

/// Scores a submission against the synthetic labels and, when present, the
/// real labels, then blends the two composites into the leaderboard score.
pub fn full_evaluation(
    submission_path: &Path,
    labels_real_path: Option<&Path>,
    labels_synth_path: &Path,
    team: &str,
    weights: EvaluationWeights,
) -> Result<ScoreReport> {
    let _span = info_span!("evaluate", team = %team).entered();

    let submission: Vec<SubmissionRow> = read_json(submission_path)?;
    let labels_synth: Vec<LabelRow> = read_json(labels_synth_path)?;
    let labels_real = match labels_real_path {
        Some(path) => Some(read_json::<Vec<LabelRow>>(path)?),
        None => {
            info!("no real labels provided, scoring synthetic labels only");
            None
        }
    };

    Ok(combine_scores(
        &submission,
        labels_real.as_deref(),
        &labels_synth,
        team,
        weights,
    ))
}

pub fn combine_scores(
    submission: &[SubmissionRow],
    labels_real: Option<&[LabelRow]>,
    labels_synth: &[LabelRow],
    team: &str,
    weights: EvaluationWeights,
) -> ScoreReport {
    let synthetic = evaluate_submission(submission, labels_synth);

    let Some(labels_real) = labels_real else {
        return ScoreReport {
            team: team.to_string(),
            real: None,
            combined: CombinedScore {
                weighted_final: synthetic.composite,
                weights: CombinedWeights {
                    real: None,
                    synthetic: 1.0,
                },
            },
            synthetic,
        };
    };

    let real = evaluate_submission(submission, labels_real);
    let weighted_final = round_to(
        weights.real * real.composite + weights.synthetic * synthetic.composite,
        SCORE_DECIMALS,
    );

    ScoreReport {
        team: team.to_string(),
        real: Some(real),
        synthetic,
        combined: CombinedScore {
            weighted_final,
            weights: CombinedWeights {
                real: Some(weights.real),
                synthetic: weights.synthetic,
            },
        },
    }
}

#[derive(Debug, Default)]
struct LabelLookup<'a> {
    grades: HashMap<&'a str, HashMap<&'a str, u32>>,
    relevant_counts: HashMap<&'a str, usize>,
}

impl<'a> LabelLookup<'a> {
    fn build(labels: &'a [LabelRow]) -> Self {
        let mut lookup = Self::default();
        for row in labels {
            lookup
                .grades
                .entry(row.query_id.as_str())
                .or_default()
                .insert(row.product_id.as_str(), row.relevance);
            if row.relevance >= 1 {
                *lookup
                    .relevant_counts
                    .entry(row.query_id.as_str())
                    .or_default() += 1;
            }
        }
        lookup
    }

    fn grade(&self, query_id: &str, product_id: &str) -> u32 {
        self.grades
            .get(query_id)
            .and_then(|products| products.get(product_id))
            .copied()
            .unwrap_or(0)
    }

    fn relevant_count(&self, query_id: &str) -> usize {
        self.relevant_counts.get(query_id).copied().unwrap_or(0)
    }

    fn is_labeled(&self, query_id: &str) -> bool {
        self.grades.contains_key(query_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct QueryScore {
    ndcg_at_10: f64,
    ap_at_20: f64,
    precision_at_10: f64,
    recall_at_30: f64,
    composite: f64,
}

/// Averages per-query metrics over every query that appears in the submission.
/// Queries that only appear in the labels are not scored.
pub fn evaluate_submission(submission: &[SubmissionRow], labels: &[LabelRow]) -> ScoreMetrics {
    let lookup = LabelLookup::build(labels);
    let groups = group_by_query(submission);

    let mut unlabeled_queries = 0_usize;
    let mut scores = Vec::with_capacity(groups.len());
    for (query_id, mut rows) in groups {
        if !lookup.is_labeled(query_id) {
            unlabeled_queries += 1;
        }
        rows.sort_by_key(|row| row.rank);

        let rels = rows
            .iter()
            .map(|row| lookup.grade(query_id, &row.product_id))
            .collect::<Vec<u32>>();
        scores.push(score_query(&rels, lookup.relevant_count(query_id)));
    }

    if unlabeled_queries > 0 {
        warn!(
            unlabeled_queries,
            "submitted queries without any labels scored as zero"
        );
    }

    let queries_scored = scores.len();
    let average = |select: fn(&QueryScore) -> f64| -> f64 {
        if scores.is_empty() {
            return 0.0;
        }
        let total = scores.iter().map(select).sum::<f64>();
        round_to(total / scores.len() as f64, SCORE_DECIMALS)
    };

    ScoreMetrics {
        ndcg_at_10: average(|score| score.ndcg_at_10),
        ap_at_20: average(|score| score.ap_at_20),
        precision_at_10: average(|score| score.precision_at_10),
        recall_at_30: average(|score| score.recall_at_30),
        composite: average(|score| score.composite),
        queries_scored,
    }
}

fn score_query(rels: &[u32], total_relevant: usize) -> QueryScore {
    let bin_rels = binary_relevance(rels);

    let ndcg_at_10 = ndcg_at_k(rels, NDCG_CUTOFF);
    let ap_at_20 = average_precision(&bin_rels, total_relevant, AP_CUTOFF);
    let precision_at_10 = precision_at_k(&bin_rels, PRECISION_CUTOFF);
    let recall_at_30 = recall_at_k(&bin_rels, total_relevant, RECALL_CUTOFF);

    QueryScore {
        ndcg_at_10,
        ap_at_20,
        precision_at_10,
        recall_at_30,
        composite: COMPOSITE_NDCG_WEIGHT * ndcg_at_10
            + COMPOSITE_AP_WEIGHT * ap_at_20
            + COMPOSITE_RECALL_WEIGHT * recall_at_30
            + COMPOSITE_PRECISION_WEIGHT * precision_at_10,
    }
}

/// Groups rows by query id, preserving the order in which queries first appear.
fn group_by_query(submission: &[SubmissionRow]) -> Vec<(&str, Vec<&SubmissionRow>)> {
    let mut positions = HashMap::<&str, usize>::new();
    let mut groups = Vec::<(&str, Vec<&SubmissionRow>)>::new();
    for row in submission {
        let query_id = row.query_id.as_str();
        let index = *positions.entry(query_id).or_insert_with(|| {
            groups.push((query_id, Vec::new()));
            groups.len() - 1
        });
        groups[index].1.push(row);
    }
    groups
}
