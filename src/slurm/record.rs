//! Normalization of raw accounting lines into priced job records.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::errors::RecordError;
use crate::pricing::PartitionPrices;
use crate::slurm::sacct::SACCT_FIELDS;

const TIMESTAMP_FORMAT_COMPLETE: &str = "%Y-%m-%dT%H:%M:%S";
const TIMESTAMP_FORMAT_MINIMAL: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT_WIRE: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Width node indices are zero-padded to when expanding compressed ranges.
const NODE_INDEX_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
}

/// One normalized, priced unit of scheduler work, keyed by job id. Built
/// fresh each run from a raw accounting line and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: String,
    pub submit_time: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub user_id: String,
    pub account_id: String,
    pub job_status: String,
    pub partition: String,
    pub qos: String,
    pub node_list: Vec<Node>,
    pub num_cpus: u32,
    pub num_req_nodes: u32,
    pub num_alloc_nodes: u32,
    /// Wall-clock duration in hours.
    pub raw_time: f64,
    /// CPU-hours: wall-clock hours times allocated CPUs.
    pub cpu_time: f64,
    /// Monetary cost, rounded to 2 decimals:
    /// `price_per_hour(partition) * num_cpus * raw_time`.
    pub amount: f64,
}

/// Form-encoded upsert body in the field names the ledger expects. The
/// node list is the one non-scalar field and travels as its JSON
/// serialization.
#[derive(Debug, Serialize)]
pub struct WireJob {
    pub jobslurmid: String,
    pub submitdate: String,
    pub startdate: String,
    pub enddate: String,
    pub userid: String,
    pub accountid: String,
    pub amount: String,
    pub jobstatus: String,
    pub partition: String,
    pub qos: String,
    pub nodes: String,
    pub num_cpus: u32,
    pub num_req_nodes: u32,
    pub num_alloc_nodes: u32,
    pub raw_time: f64,
    pub cpu_time: f64,
}

impl JobRecord {
    /// Parse one pipe-delimited accounting line in the
    /// [`crate::slurm::sacct::SACCT_FORMAT`] layout.
    ///
    /// Fails for this line alone; the caller skips it and continues with
    /// the rest of the batch. The sacct-reported CPUTimeRAW/CPUTime fields
    /// are present in the layout but recomputed from the normalized
    /// instants rather than trusted.
    pub fn parse(line: &str, prices: &PartitionPrices) -> Result<JobRecord, RecordError> {
        let fields: Vec<&str> = line.split('|').collect();
        let [job_id, submit, start, end, user_id, account_id, job_status, partition, qos, node_list, alloc_cpus, req_nodes, alloc_nodes, _cpu_time_raw, _cpu_time] =
            fields[..]
        else {
            return Err(RecordError::FieldCount {
                expected: SACCT_FIELDS,
                got: fields.len(),
            });
        };

        let submit_time = parse_timestamp(submit)?;
        let start_time = parse_timestamp(start)?;
        let end_time = parse_timestamp(end)?;

        let num_cpus = parse_count("AllocCPUS", alloc_cpus)?;
        let num_req_nodes = parse_count("ReqNodes", req_nodes)?;
        let num_alloc_nodes = parse_count("AllocNodes", alloc_nodes)?;

        let node_list = expand_node_list(node_list)?;

        // Both timestamp formats normalize into UTC instants above, so the
        // wall-clock duration is computed once from the typed values.
        let raw_time = (end_time - start_time).num_seconds() as f64 / 3600.0;
        let cpu_time = raw_time * f64::from(num_cpus);
        let amount = round2(prices.price_per_hour(partition) * f64::from(num_cpus) * raw_time);

        Ok(JobRecord {
            job_id: job_id.to_string(),
            submit_time,
            start_time,
            end_time,
            user_id: user_id.to_string(),
            account_id: account_id.to_string(),
            job_status: job_status.to_string(),
            partition: partition.to_string(),
            qos: qos.to_string(),
            node_list,
            num_cpus,
            num_req_nodes,
            num_alloc_nodes,
            raw_time,
            cpu_time,
            amount,
        })
    }

    /// The form-encoded body for the ledger upsert.
    pub fn wire(&self) -> WireJob {
        WireJob {
            jobslurmid: self.job_id.clone(),
            submitdate: self.submit_time.format(TIMESTAMP_FORMAT_WIRE).to_string(),
            startdate: self.start_time.format(TIMESTAMP_FORMAT_WIRE).to_string(),
            enddate: self.end_time.format(TIMESTAMP_FORMAT_WIRE).to_string(),
            userid: self.user_id.clone(),
            accountid: self.account_id.clone(),
            amount: format!("{:.2}", self.amount),
            jobstatus: self.job_status.clone(),
            partition: self.partition.clone(),
            qos: self.qos.clone(),
            nodes: serde_json::to_string(&self.node_list).unwrap_or_default(),
            num_cpus: self.num_cpus,
            num_req_nodes: self.num_req_nodes,
            num_alloc_nodes: self.num_alloc_nodes,
            raw_time: self.raw_time,
            cpu_time: self.cpu_time,
        }
    }
}

/// Parse a scheduler timestamp as UTC. The complete format is tried first,
/// then the date-only fallback (midnight).
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RecordError> {
    let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT_COMPLETE).or_else(|_| {
        NaiveDate::parse_from_str(value, TIMESTAMP_FORMAT_MINIMAL).map(|d| d.and_time(NaiveTime::MIN))
    });

    match naive {
        Ok(naive) => Ok(Utc.from_utc_datetime(&naive)),
        Err(_) => Err(RecordError::Timestamp {
            value: value.to_string(),
        }),
    }
}

fn parse_count(field: &'static str, value: &str) -> Result<u32, RecordError> {
    value.parse().map_err(|_| RecordError::Number {
        field,
        value: value.to_string(),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Expand a scheduler node list into one [`Node`] per machine.
///
/// The list is comma-separated at the top level; commas inside brackets
/// belong to the compressed range notation. Each token is either a bare
/// node name, emitted verbatim, or `prefix[items]suffix` where `items` is
/// a comma-separated list of single indices and inclusive `start-end`
/// ranges. Indices are zero-padded to four digits. Anything else in
/// bracket position is a [`RecordError::NodeRange`] — a malformed range
/// fails the line instead of misparsing it.
///
/// `n[0001-0003].hpc` expands to `n0001.hpc`, `n0002.hpc`, `n0003.hpc`.
pub fn expand_node_list(raw: &str) -> Result<Vec<Node>, RecordError> {
    let mut nodes = Vec::new();

    for token in split_outside_brackets(raw) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token.contains('[') || token.contains(']') {
            expand_range_token(token, &mut nodes)?;
        } else {
            nodes.push(Node {
                name: token.to_string(),
            });
        }
    }

    Ok(nodes)
}

fn expand_range_token(token: &str, nodes: &mut Vec<Node>) -> Result<(), RecordError> {
    let malformed = || RecordError::NodeRange {
        token: token.to_string(),
    };

    let (open, close) = match (token.find('['), token.find(']')) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => return Err(malformed()),
    };
    let prefix = &token[..open];
    let suffix = &token[close + 1..];
    if suffix.contains('[') || suffix.contains(']') {
        return Err(malformed());
    }

    for item in token[open + 1..close].split(',') {
        let (lo, hi) = match item.split_once('-') {
            Some((lo, hi)) => (parse_index(token, lo)?, parse_index(token, hi)?),
            None => {
                let index = parse_index(token, item)?;
                (index, index)
            }
        };
        if lo > hi {
            return Err(malformed());
        }
        for current in lo..=hi {
            nodes.push(Node {
                name: format!("{}{:0width$}{}", prefix, current, suffix, width = NODE_INDEX_WIDTH),
            });
        }
    }

    Ok(())
}

fn parse_index(token: &str, value: &str) -> Result<u64, RecordError> {
    value.trim().parse().map_err(|_| RecordError::NodeRange {
        token: token.to_string(),
    })
}

/// Split on commas that sit outside bracket notation.
fn split_outside_brackets(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in raw.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);

    parts
}
