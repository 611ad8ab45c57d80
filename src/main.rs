use std::sync::Arc;

use dealfeed::config::Config;
use dealfeed::db::Repository;
use dealfeed::error::Result;
use dealfeed::scrape::{Orchestrator, PassOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Check for --once flag (single headless pass)
    let run_once = args.len() >= 2 && args[1] == "--once";

    let config = Config::load()?;
    let repository = Arc::new(Repository::new(&config.db_path).await?);
    let orchestrator = Orchestrator::new(config.clone(), Arc::clone(&repository));

    if run_once {
        match orchestrator.run_pass(true).await? {
            PassOutcome::Completed(summary) => {
                println!(
                    "scraped {} new articles across {} sites",
                    summary.total_new,
                    summary.new_by_site.len()
                );
            }
            PassOutcome::Skipped(reason) => {
                println!("pass skipped: {:?}", reason);
            }
        }
        return Ok(());
    }

    tracing::info!(
        "starting scrape daemon, {} sites, every {} minutes, db at {}",
        config.sites.len(),
        config.scrape_interval_minutes,
        config.db_path
    );

    tokio::select! {
        result = orchestrator.run_timer() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    Ok(())
}
