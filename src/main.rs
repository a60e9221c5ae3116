use anyhow::Result;
use linkwatch::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run_cli().await
}
