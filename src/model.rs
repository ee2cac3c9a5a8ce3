use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRow {
    pub query_id: String,
    pub rank: u32,
    pub product_id: String,
}

/// Submission row as the validator sees it: every field may be absent so that
/// missing fields can be reported per row instead of failing the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubmissionRow {
    #[serde(default)]
    pub query_id: Option<String>,
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRow {
    pub query_id: String,
    pub product_id: String,
    pub relevance: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryDescriptor {
    pub query_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProductCatalogFile {
    Ids(Vec<String>),
    Records(Vec<ProductRecord>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Passed,
    Failed,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportWarning {
    Message(String),
    MissingQueriesSample { missing_queries_sample: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub team: String,
    pub status: ValidationStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<ReportWarning>,
    pub queries_checked: usize,
    pub avg_depth: Option<f64>,
}

impl ValidationReport {
    pub fn new(team: &str) -> Self {
        Self {
            team: team.to_string(),
            status: ValidationStatus::Failed,
            errors: Vec::new(),
            warnings: Vec::new(),
            queries_checked: 0,
            avg_depth: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Passed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetrics {
    #[serde(rename = "nDCG@10")]
    pub ndcg_at_10: f64,
    #[serde(rename = "AP@20")]
    pub ap_at_20: f64,
    #[serde(rename = "P@10")]
    pub precision_at_10: f64,
    #[serde(rename = "R@30")]
    pub recall_at_30: f64,
    pub composite: f64,
    pub queries_scored: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedWeights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real: Option<f64>,
    pub synthetic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedScore {
    pub weighted_final: f64,
    pub weights: CombinedWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real: Option<ScoreMetrics>,
    pub synthetic: ScoreMetrics,
    pub combined: CombinedScore,
}

/// Sidecar written next to a score report by CI; read back by the leaderboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub commit_sha: Option<String>,
    #[serde(default)]
    pub timestamp_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    pub team: String,
    pub weighted_final: f64,
    #[serde(rename = "real_nDCG@10")]
    pub real_ndcg_at_10: Option<f64>,
    #[serde(rename = "real_AP@20")]
    pub real_ap_at_20: Option<f64>,
    #[serde(rename = "real_P@10")]
    pub real_precision_at_10: Option<f64>,
    #[serde(rename = "real_R@30")]
    pub real_recall_at_30: Option<f64>,
    pub real_composite: Option<f64>,
    #[serde(rename = "synth_nDCG@10")]
    pub synth_ndcg_at_10: f64,
    #[serde(rename = "synth_AP@20")]
    pub synth_ap_at_20: f64,
    #[serde(rename = "synth_P@10")]
    pub synth_precision_at_10: f64,
    #[serde(rename = "synth_R@30")]
    pub synth_recall_at_30: f64,
    pub synth_composite: f64,
    pub queries_scored_real: Option<usize>,
    pub queries_scored_synth: usize,
    pub pipeline_id: Option<String>,
    pub commit_sha: Option<String>,
    pub timestamp_utc: Option<String>,
    pub timestamp_cst: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardManifest {
    pub rows: Vec<LeaderboardRow>,
}
