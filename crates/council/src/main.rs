use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use council::{
    AdvisorRegistry, DebateEngine, HttpSessionClient, SessionWatcher, Settings, WatcherSet,
};

/// Advisor council: debates a watched session's turns and posts guidance.
#[derive(Parser, Debug)]
#[command(name = "council", version, about)]
struct Cli {
    /// Path to the settings file.
    #[arg(long, default_value = "council.toml")]
    config: PathBuf,

    /// Explicit session id to watch (default: discover the first session).
    #[arg(long)]
    session: Option<String>,

    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load_or_default(&cli.config)?;

    let registry = Arc::new(AdvisorRegistry::from_configs(&settings.advisors));
    info!(
        session_url = %settings.session_url,
        configured = registry.len(),
        available = registry.available().len(),
        rounds = settings.rounds,
        threshold = settings.threshold,
        "advisor council starting"
    );

    let client = Arc::new(HttpSessionClient::new(&settings.session_url));

    if cli.once {
        let mut watcher = SessionWatcher::new(
            "cli",
            cli.session,
            client,
            registry,
            DebateEngine::new(settings.debate_config()),
            settings.watcher_config(),
        );
        watcher.tick().await?;
        return Ok(());
    }

    let set = WatcherSet::new(
        client,
        registry,
        settings.debate_config(),
        settings.watcher_config(),
    );
    set.watch("primary", cli.session).await;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    set.shutdown().await;

    Ok(())
}
