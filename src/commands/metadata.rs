use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::MetadataArgs;
use crate::model::RunMetadata;
use crate::util::{ci_timestamp_string, sha256_file, write_json_pretty};

const PIPELINE_ID_ENV: &str = "CI_PIPELINE_ID";
const COMMIT_SHA_ENV: &str = "CI_COMMIT_SHA";

pub fn run(args: MetadataArgs) -> Result<()> {
    let metadata = build_metadata(&args, |name| std::env::var(name).ok())?;
    write_json_pretty(&args.out, &metadata)?;

    info!(
        team = %args.team,
        pipeline_id = %metadata.pipeline_id.as_deref().unwrap_or_default(),
        path = %args.out.display(),
        "wrote run metadata"
    );
    Ok(())
}

fn build_metadata(
    args: &MetadataArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<RunMetadata> {
    let pipeline_id = args.pipeline_id.clone().or_else(|| env(PIPELINE_ID_ENV));
    let commit_sha = args.commit_sha.clone().or_else(|| env(COMMIT_SHA_ENV));
    if pipeline_id.is_none() {
        warn!("no pipeline id given and {PIPELINE_ID_ENV} is unset");
    }

    let submission_sha256 = match &args.submission {
        Some(path) => Some(sha256_file(path)?),
        None => None,
    };

    Ok(RunMetadata {
        team: Some(args.team.clone()),
        pipeline_id,
        commit_sha,
        timestamp_utc: Some(ci_timestamp_string(Utc::now())),
        submission_sha256,
    })
}
