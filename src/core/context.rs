use std::time::Duration;

use tracing::info;

use crate::config::Settings;
use crate::errors::SyncResult;
use crate::pricing::PartitionPrices;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a run needs, built once per invocation and passed by
/// reference — no process-wide state.
pub struct RunContext {
    /// Remote ledger root, always with a trailing '/'.
    pub base_url: String,
    pub auth_token: String,
    pub dry_run: bool,
    /// Resource name used to filter allocation lookups.
    pub resource: String,
    pub sacct_bin: String,
    pub prices: PartitionPrices,
    pub client: reqwest::Client,
}

impl RunContext {
    /// Assemble the context for one run. Returns `Ok(None)` when the token
    /// file does not exist — the tool is not configured yet, and the run
    /// exits cleanly without doing any work.
    pub fn build(
        settings: &Settings,
        target: Option<String>,
        dry_run: bool,
    ) -> SyncResult<Option<Self>> {
        let token_path = &settings.auth.token_file;
        if !token_path.exists() {
            return Ok(None);
        }
        let auth_token = std::fs::read_to_string(token_path)?.trim().to_string();

        let mut base_url = target.unwrap_or_else(|| settings.api.base_url.clone());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let prices = PartitionPrices::load(&settings.pricing.price_file);
        info!(
            "loaded {} partition prices from {}",
            prices.len(),
            settings.pricing.price_file.display()
        );

        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Some(Self {
            base_url,
            auth_token,
            dry_run,
            resource: settings.api.resource.clone(),
            sacct_bin: settings.slurm.sacct_bin.clone(),
            prices,
            client,
        }))
    }
}
