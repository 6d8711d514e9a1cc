use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wordcard::config::AppConfig;
use wordcard::ui::{self, ViewerState};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordcard=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting word card viewer");

    let config = AppConfig::load_or_default()?;
    info!(
        "Deck {} with {} units, speech backend {:?}",
        config.deck_path.display(),
        config.unit_count,
        config.speech.backend
    );

    // Playback sessions run on this runtime while eframe owns the main thread
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();
    let state = ViewerState::initialize(&config, runtime.handle().clone());

    ui::run(state).map_err(|e| anyhow!("viewer failed: {}", e))?;

    info!("Word card viewer exited");
    Ok(())
}
