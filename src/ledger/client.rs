use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::core::RunContext;
use crate::ledger::models::Page;
use crate::slurm::record::JobRecord;

/// Follow-up pages fetched per collection before giving up and asking the
/// operator to re-run. Eventual consistency beats an unbounded crawl.
pub const MAX_PAGES: u32 = 50;
const PAGE_PROGRESS_EVERY: u32 = 5;

/// Client for the remote billing ledger API. Read operations degrade to
/// empty results on transport failure; only the job upsert reports errors
/// to the caller, one record at a time.
pub struct LedgerClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl LedgerClient {
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            client: ctx.client.clone(),
            base_url: ctx.base_url.clone(),
            token: ctx.auth_token.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch the full collection behind a paginated list endpoint.
    ///
    /// The first request goes out unpaged; while the response carries a
    /// `next` cursor, an explicit page counter advances and the request is
    /// re-issued with `page=<counter>`. Iteration stops at [`MAX_PAGES`]
    /// with a warning — the collected prefix is kept and a follow-up run
    /// picks up the rest. A transport failure on a later page keeps the
    /// partial collection; on the first page it yields an empty one.
    pub async fn paginated_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Vec<T> {
        let url = self.endpoint(path);
        let params: Vec<(String, String)> =
            params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();

        let first: Page<T> = match self.fetch_page(&url, &params).await {
            Ok(page) => page,
            Err(e) => {
                warn!("[paginated_get({})] failed: {}", url, e);
                return Vec::new();
            }
        };

        let mut results = first.results;
        let mut next = first.next;
        let mut current_page = 0u32;

        while next.is_some() {
            current_page += 1;
            if current_page > MAX_PAGES {
                println!("too many pages to sync at once, rerun script after this run completes...");
                warn!("too many pages to sync at once, rerun script after this run completes...");
                break;
            }

            let mut page_params = params.clone();
            page_params.push(("page".to_string(), current_page.to_string()));

            match self.fetch_page::<T>(&url, &page_params).await {
                Ok(page) => {
                    results.extend(page.results);
                    next = page.next;

                    if current_page % PAGE_PROGRESS_EVERY == 0 {
                        println!("\tgetting page: {}", current_page);
                    }
                }
                Err(e) => {
                    warn!("[paginated_get({})] page {} failed: {}", url, current_page, e);
                    break;
                }
            }
        }

        results
    }

    /// One-shot list lookup. Any failure resolves to `None`; the caller
    /// decides what "no data" means for it.
    pub async fn single_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Option<Vec<T>> {
        let url = self.endpoint(path);
        let params: Vec<(String, String)> =
            params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();

        match self.fetch_page(&url, &params).await {
            Ok(page) => Some(page.results),
            Err(e) => {
                debug!("[single_get({})] failed: {}", url, e);
                None
            }
        }
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<Page<T>, reqwest::Error> {
        self.client
            .get(url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Idempotent full-field replace of one job record, keyed by job id.
    /// Re-running with identical input converges to the same remote state.
    pub async fn put_job(&self, record: &JobRecord) -> Result<(), reqwest::Error> {
        let url = self.endpoint(&format!("jobs/{}/", record.job_id));
        self.client
            .put(&url)
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .form(&record.wire())
            .send()
            .await?
            .error_for_status()?;

        info!("{} PUSHED/UPDATED", record.job_id);
        Ok(())
    }
}
