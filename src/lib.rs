pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod ledger;
pub mod pricing;
pub mod slurm;
pub mod sync;

// Re-exports
pub use crate::config::Settings;
pub use crate::core::RunContext;
pub use crate::errors::{RecordError, SyncError, SyncResult};
pub use crate::ledger::LedgerClient;
pub use crate::pricing::PartitionPrices;
pub use crate::slurm::record::JobRecord;
