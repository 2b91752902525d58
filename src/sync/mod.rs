//! The usage-to-billing reconciliation pipeline.
//!
//! Fully sequential: one project at a time, one page at a time, one job
//! record at a time. Every operation is idempotent per job id, so a run
//! may be safely re-executed after a partial or aborted one.

pub mod project_start;
pub mod upsert;

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{info, warn};

use crate::core::RunContext;
use crate::errors::{RecordError, SyncResult};
use crate::ledger::models::Project;
use crate::ledger::LedgerClient;
use crate::pricing::PartitionPrices;
use crate::slurm::record::JobRecord;
use crate::slurm::sacct;

pub use upsert::{UpsertFailure, UpsertSummary};

/// Counts for the operator-facing completion report.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub projects: usize,
    pub parsed: usize,
    pub parse_failures: usize,
    pub pushed: usize,
    pub push_failures: usize,
}

/// Normalization outcome for a batch of raw accounting lines. Records are
/// keyed by job id; a duplicate id across source lines overwrites
/// (job ids are globally unique per scheduler, last write wins).
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub records: BTreeMap<String, JobRecord>,
    pub failures: Vec<ParseFailure>,
}

#[derive(Debug)]
pub struct ParseFailure {
    pub job_id: String,
    pub reason: RecordError,
}

/// Run the whole pipeline: gather projects, resolve start timestamps,
/// extract accounting lines, normalize, upsert.
pub async fn run(ctx: &RunContext) -> SyncResult<RunSummary> {
    let client = LedgerClient::new(ctx);

    println!("gathering projects from the ledger...");
    info!("gathering projects from the ledger...");
    let projects: Vec<Project> = client.paginated_get("projects/", &[]).await;

    let default_start = project_start::fiscal_year_start(Utc::now());

    println!("gathering jobs from the scheduler...");
    info!("gathering jobs from the scheduler...");
    let mut raw_lines: Vec<String> = Vec::new();
    let progress_step = (projects.len() / 10).max(1);
    for (index, project) in projects.iter().enumerate() {
        let start = project_start::resolve(&client, &ctx.resource, &project.name)
            .await
            .unwrap_or_else(|| default_start.clone());

        raw_lines.extend(sacct::project_jobs(&ctx.sacct_bin, &project.name, &start).await);

        if index % progress_step == 0 {
            println!("\tprogress: {}/{}", index, projects.len());
        }
    }

    println!("parsing jobs...");
    info!("parsing jobs...");
    let batch = normalize(raw_lines.iter().map(String::as_str), &ctx.prices);

    if ctx.dry_run {
        println!("DEBUG: collected {} jobs to update in the ledger...", batch.records.len());
        info!("DEBUG: collected {} jobs to update in the ledger...", batch.records.len());
    } else {
        println!("updating ledger with {} jobs...", batch.records.len());
        info!("updating ledger with {} jobs...", batch.records.len());
    }

    let upserted = upsert::push_all(&client, ctx.dry_run, &batch.records).await;

    Ok(RunSummary {
        projects: projects.len(),
        parsed: batch.records.len(),
        parse_failures: batch.failures.len(),
        pushed: upserted.pushed,
        push_failures: upserted.failures.len(),
    })
}

/// Normalize a batch of raw accounting lines. A failed line is logged with
/// its job id and skipped; the rest of the batch is unaffected.
pub fn normalize<'a, I>(lines: I, prices: &PartitionPrices) -> NormalizedBatch
where
    I: IntoIterator<Item = &'a str>,
{
    let mut batch = NormalizedBatch::default();

    for line in lines {
        match JobRecord::parse(line, prices) {
            Ok(record) => {
                batch.records.insert(record.job_id.clone(), record);
            }
            Err(reason) => {
                let job_id = line.split('|').next().unwrap_or("").to_string();
                warn!("ERROR occured for jobid: {} REASON: {}", job_id, reason);
                batch.failures.push(ParseFailure { job_id, reason });
            }
        }
    }

    batch
}
