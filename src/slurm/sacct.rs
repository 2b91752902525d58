//! Accounting extractor backed by the scheduler's `sacct` query tool.

use tokio::process::Command;
use tracing::warn;

/// Field order of the accounting query. [`crate::slurm::record::JobRecord::parse`]
/// consumes lines in exactly this layout.
pub const SACCT_FORMAT: &str = "JobId,Submit,Start,End,UID,Account,State,Partition,QOS,NodeList,AllocCPUS,ReqNodes,AllocNodes,CPUTimeRAW,CPUTime";

/// Number of pipe-delimited fields per line under [`SACCT_FORMAT`].
pub const SACCT_FIELDS: usize = 15;

/// Raw accounting lines for one project since the given start timestamp.
///
/// Runs `sacct -A <project> -S <start> --format=<fields> -naPX`: no
/// header, parsable pipe-delimited output, no truncation, top-level jobs
/// only. A failed invocation yields zero lines — the project simply
/// contributes nothing downstream this run.
pub async fn project_jobs(sacct_bin: &str, project: &str, start: &str) -> Vec<String> {
    let output = Command::new(sacct_bin)
        .args([
            "-A",
            project,
            "-S",
            start,
            &format!("--format={}", SACCT_FORMAT),
            "-naPX",
        ])
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            warn!("failed to invoke {} for project {}: {}", sacct_bin, project, e);
            return Vec::new();
        }
    };

    if !output.status.success() {
        warn!(
            "{} exited with {} for project {}",
            sacct_bin, output.status, project
        );
        return Vec::new();
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
