use serde::Deserialize;

/// One page of a list endpoint. Every list response carries the collected
/// results plus a cursor to the next page, or null on the last page.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub next: Option<String>,
}

/// A billing project as returned by `projects/`. The remote side sends more
/// fields; only the name is consumed here.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub name: String,
}

/// An allocation record from `allocations/`; only the start date matters
/// for resolving how far back to collect jobs.
#[derive(Debug, Clone, Deserialize)]
pub struct Allocation {
    pub start_date: Option<String>,
}
