//! Run a single manual ingestion tick against the configured providers and
//! print the tick report as JSON. Budgets follow `manual_runs_consume_budget`.

use news_ingest::ingest::config::load_config_default;
use news_ingest::Trigger;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    news_ingest::init_tracing();

    let cfg = load_config_default()?;
    let scheduler = news_ingest::build_default_scheduler(&cfg)?;
    let report = scheduler.run_tick(Trigger::Manual).await;
    scheduler.flush_broadcasts(Duration::from_secs(30)).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    let status = scheduler.status().await;
    println!("{}", serde_json::to_string_pretty(&status.daily)?);
    Ok(())
}
