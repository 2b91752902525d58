//! Partition price table.
//!
//! The cluster bank config is a line-oriented file with named sections. The
//! `[PartitionPrice]` section maps partition names to a price per CPU-hour:
//!
//! ```text
//! [PartitionPrice]
//! # partition    price
//! savio2         0.75
//! savio2_htc     1.00
//! ```
//!
//! The table is parsed once per run into a map and queried by exact
//! partition name. Cost attribution must never fail outright because of
//! missing pricing data: an unreadable file, a missing section, or an
//! unknown partition all resolve to [`DEFAULT_PRICE_PER_HOUR`].

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

pub const PARTITION_PRICE_SECTION: &str = "[PartitionPrice]";
pub const DEFAULT_PRICE_PER_HOUR: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct PartitionPrices {
    prices: HashMap<String, f64>,
}

impl PartitionPrices {
    /// Load the price table from the bank config file. An unreadable file
    /// yields an empty table, so every partition prices at the default.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) => {
                warn!("failed to read price file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse the `[PartitionPrice]` section: entries run until the next
    /// section header or end of file. Comment lines start with '#'. Each
    /// entry is `<partition> <price>`; the first entry for a partition
    /// wins. Non-positive or non-numeric prices are treated as missing.
    pub fn parse(contents: &str) -> Self {
        let mut prices = HashMap::new();
        let mut in_section = false;

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !in_section {
                in_section = line == PARTITION_PRICE_SECTION;
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                break;
            }

            let mut tokens = line.split_whitespace();
            let (Some(partition), Some(price)) = (tokens.next(), tokens.next_back()) else {
                continue;
            };
            let price: f64 = match price.parse() {
                Ok(p) if p > 0.0 => p,
                _ => {
                    warn!("ignoring unusable price for partition {}: {}", partition, price);
                    continue;
                }
            };
            prices.entry(partition.to_string()).or_insert(price);
        }

        Self { prices }
    }

    /// Price per CPU-hour for a partition, defaulting to
    /// [`DEFAULT_PRICE_PER_HOUR`] when the partition is not configured.
    pub fn price_per_hour(&self, partition: &str) -> f64 {
        self.prices
            .get(partition)
            .copied()
            .unwrap_or(DEFAULT_PRICE_PER_HOUR)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
