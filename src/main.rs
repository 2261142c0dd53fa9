use anyhow::Context;
use database::Database;
use discovery::{run_discovery_cycle, CycleOptions};
use prospect_core::AppConfig;
use reddit_client::RedditClient;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "prospect=info,discovery=info,reddit_client=info,database=info",
                )
            }),
        )
        .init();

    tracing::info!("Starting Prospect - Reddit keyword discovery");

    let config = AppConfig::load().context("loading configuration")?;

    let mut db = Database::new(config.database_url.clone());
    db.connect().await.context("connecting to database")?;
    db.run_migrations().await.context("running migrations")?;

    let client = RedditClient::new(config.user_agent.clone()).with_chunk_size(config.chunk_size);
    let options = CycleOptions::background(&config);

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.poll_interval_minutes * 60));
    tracing::info!(
        "Polling every {} minutes, probing {} ids per stream",
        config.poll_interval_minutes,
        options.range_size
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match run_discovery_cycle(&client, &db, &options).await {
                    Ok(summary) => tracing::info!(
                        "Cycle finished: {} candidates, {} new matches{}",
                        summary.candidates_processed,
                        summary.new_matches,
                        summary
                            .message
                            .map(|m| format!(" ({m})"))
                            .unwrap_or_default()
                    ),
                    // The cursor was not advanced; the next tick retries
                    Err(e) => tracing::error!("Discovery cycle failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    Ok(())
}
