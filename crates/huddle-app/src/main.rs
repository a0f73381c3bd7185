// Huddle entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open the snapshot store and prune stale rows
// 4. Build the provider and narrative client
// 5. Load the snapshot and build the report
// 6. Write report files and print a summary
//
// Any command-line arguments are team names forced to win this week; they
// replace `multiverse.forced_winners` from analysis.toml.

use std::path::Path;

use anyhow::Context;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use huddle_app::app::{build_provider, Dashboard};
use huddle_app::report;
use huddle_core::config;
use huddle_core::db::SnapshotStore;
use huddle_llm::client::LlmClient;

/// Stored snapshots older than this are deleted at startup.
const SNAPSHOT_RETENTION_DAYS: i64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Huddle starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={} ({}), season {}, {} teams",
        config.league.name, config.league.league_id, config.league.season, config.league.num_teams
    );

    let store = SnapshotStore::open(&config.db_path).context("failed to open database")?;
    let now = Utc::now();
    match store.prune_before(now - Duration::days(SNAPSHOT_RETENTION_DAYS)) {
        Ok(0) => {}
        Ok(n) => info!("Pruned {} stale snapshots", n),
        Err(e) => warn!("Snapshot pruning failed: {:#}", e),
    }

    let provider = build_provider(&config)?;
    let llm = LlmClient::from_config(&config.analysis.llm, &config.credentials);
    match &llm {
        LlmClient::Active(_) => info!("LLM client initialized"),
        LlmClient::Disabled(reason) => info!("LLM client disabled: {}", reason),
    }

    let cli_winners: Vec<String> = std::env::args().skip(1).collect();
    let forced_winners = if cli_winners.is_empty() {
        config.analysis.multiverse.forced_winners.clone()
    } else {
        cli_winners
    };
    let report_dir = config.report_dir.clone();

    let mut dashboard = Dashboard::new(config, store, provider, Box::new(llm));
    dashboard
        .load_snapshot(now)
        .await
        .context("failed to load league snapshot")?;

    let report = report::build_report(&dashboard, &forced_winners, now).await?;
    let written = report::write_report(&report, Path::new(&report_dir))?;

    println!("{}", report::summary_text(&report));
    for path in &written {
        println!("wrote {}", path.display());
    }

    info!("Huddle finished");
    Ok(())
}

/// Initialize tracing to log to `logs/huddle.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("huddle.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("huddle=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
