//! Run one analysis in the foreground and print the final job record as JSON.
//!
//! Usage: seo-optimizer-analyze <target_url> <query...>

use anyhow::{bail, Context};
use seo_optimizer::config::{log_filter, Config};
use seo_optimizer::entities::{JobStatus, ReportStatusResponse};
use seo_optimizer::jobs::{AnalysisRequest, InMemoryJobStore, Orchestrator};
use std::env;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some((target_url, query_words)) = args.split_first() else {
        bail!("usage: seo-optimizer-analyze <target_url> <query...>");
    };
    if query_words.is_empty() {
        bail!("usage: seo-optimizer-analyze <target_url> <query...>");
    }
    let request = AnalysisRequest::validate(target_url, &query_words.join(" "))?;

    let config = Config::from_env();
    let orchestrator = Orchestrator::from_config(&config, Arc::new(InMemoryJobStore::new()))?;

    let job = orchestrator.create_job(&request)?;
    info!("Running analysis job {}", job.job_id);

    let finished = orchestrator
        .run(&job.job_id, &request)
        .await
        .context("job disappeared from the store")?;
    let status = finished.status();

    let output = serde_json::to_string_pretty(&ReportStatusResponse::from(finished))?;
    println!("{}", output);

    if status == JobStatus::Failed {
        error!("Analysis failed");
        std::process::exit(1);
    }
    Ok(())
}
