//! Reconciliation upserter: replay the normalized job table into the
//! remote ledger, one idempotent replace per job id.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::ledger::LedgerClient;
use crate::slurm::record::JobRecord;

/// Outcome of one upsert pass. Failures are per record and typed, so a
/// caller can aggregate or report them without scraping logs.
#[derive(Debug, Default)]
pub struct UpsertSummary {
    pub attempted: usize,
    pub pushed: usize,
    pub failures: Vec<UpsertFailure>,
}

#[derive(Debug)]
pub struct UpsertFailure {
    pub job_id: String,
    pub reason: String,
}

/// Push every record in job-id order. A failed record is logged, recorded
/// in the summary, and never stops the loop — each run attempts the whole
/// table. In dry-run mode everything happens except the network write.
pub async fn push_all(
    client: &LedgerClient,
    dry_run: bool,
    records: &BTreeMap<String, JobRecord>,
) -> UpsertSummary {
    let total = records.len();
    let progress_step = (total / 10).max(1);

    let mut summary = UpsertSummary::default();

    for (counter, (job_id, record)) in records.iter().enumerate() {
        summary.attempted += 1;

        if dry_run {
            info!("{} collected (dry-run, not pushed)", job_id);
        } else {
            match client.put_job(record).await {
                Ok(()) => summary.pushed += 1,
                Err(e) => {
                    warn!("ERROR occured for jobid: {} REASON: {}", job_id, e);
                    summary.failures.push(UpsertFailure {
                        job_id: job_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if (counter + 1) % progress_step == 0 {
            println!("\tprogress: {}/{}", counter + 1, total);
        }
    }

    summary
}
