use slurm_ledger_sync::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}
