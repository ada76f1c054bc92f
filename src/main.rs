//! News chat terminal client.
//!
//! Entry point: loads configuration, restores the last session and runs
//! the interactive shell.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

use newschat::api::Client;
use newschat::chat::ChatController;
use newschat::config::AppConfig;
use newschat::session::{FileKvStore, KeyValueStore, MemoryKvStore, SessionStore};
use newschat::{telemetry, ui};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(
        name: "app.starting",
        backend = %config.backend.base_url,
        store = %config.storage.path.display(),
        ephemeral = config.storage.ephemeral,
        "Starting news chat"
    );

    let backend = Client::with_request_timeout(
        &config.backend.base_url,
        config.backend.request_timeout(),
    )
    .context("Invalid backend URL")?;

    let kv: Box<dyn KeyValueStore> = if config.storage.ephemeral {
        Box::new(MemoryKvStore::new())
    } else {
        Box::new(
            FileKvStore::open(&config.storage.path)
                .with_context(|| format!("Failed to open {}", config.storage.path.display()))?,
        )
    };
    let sessions = SessionStore::load(kv, config.chat.title_rules())?;

    let (mut app, mut events) = ChatController::new(
        Arc::new(backend),
        sessions,
        config.chat.stream_idle_timeout(),
    );

    // Without a session there is nothing to chat in.
    app.start()
        .await
        .context("Could not start a chat session; is the backend running?")?;

    ui::chat::run(&mut app, &mut events, config.chat.reveal_interval()).await?;
    Ok(())
}
