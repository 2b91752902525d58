pub mod client;
pub mod models;

pub use client::LedgerClient;
pub use models::{Allocation, Page, Project};
