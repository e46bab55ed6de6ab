// Committee admin console entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Ensure config files exist, then load config
// 3. Build the API client
// 4. Create mpsc channels
// 5. Spawn the app orchestrator task
// 6. Run the TUI event loop (blocking until the user quits)
// 7. Cleanup on exit

use std::sync::Arc;

use committee_assistant::api::ApiClient;
use committee_assistant::app;
use committee_assistant::committee::{CommitSink, Speaker, SystemSpeaker};
use committee_assistant::config;
use committee_assistant::tui;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Committee console starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: backend={}, settle={}ms, reveal={}s",
        config.api.base_url, config.editing.settle_millis, config.draw.reveal_duration_secs
    );

    // 3. Build the API client. It doubles as the commit sink for amount edits.
    let client = Arc::new(ApiClient::new(&config.api.base_url, config.request_timeout()));
    let sink: Arc<dyn CommitSink> = Arc::clone(&client) as Arc<dyn CommitSink>;
    let speaker: Arc<dyn Speaker> = Arc::new(SystemSpeaker);

    // 4. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (core_tx, core_rx) = mpsc::channel(256);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let app_state = app::AppState::new(config, Arc::clone(&client), sink, speaker, core_tx);

    // 5. Spawn the orchestrator task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, core_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 6. Run the TUI event loop (blocking until the user quits).
    //    The TUI consumes ui_rx and sends commands through cmd_tx.
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    // 7. Cleanup: wait for the orchestrator to drain (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Committee console shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("samiti.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("committee_assistant=info,warn")),
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
