use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::chat::DEFAULT_IDLE_TIMEOUT;
use crate::session::TitleRules;

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Base URL of the news assistant backend
    #[arg(long, env = "NEWSCHAT_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Path of the local session store
    #[arg(long, env = "NEWSCHAT_STORE")]
    pub store: Option<PathBuf>,

    /// Keep sessions in memory only
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    /// Bound on session and history calls, and on connecting for chat streams.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub ephemeral: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub stream_idle_timeout_secs: u64,
    pub reveal_interval_ms: u64,
    pub title_max_chars: usize,
    pub default_title: String,
}

impl BackendConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ChatConfig {
    #[must_use]
    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }

    #[must_use]
    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms.max(1))
    }

    #[must_use]
    pub fn title_rules(&self) -> TitleRules {
        TitleRules {
            default_title: self.default_title.clone(),
            max_chars: self.title_max_chars,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        // 1. Defaults
        let mut builder = Config::builder()
            .set_default("backend.base_url", "http://localhost:3000")?
            .set_default("backend.request_timeout_secs", 30)?
            .set_default("storage.path", "newschat-store.json")?
            .set_default("storage.ephemeral", false)?
            .set_default("chat.stream_idle_timeout_secs", DEFAULT_IDLE_TIMEOUT.as_secs())?
            .set_default("chat.reveal_interval_ms", 20)?
            .set_default("chat.title_max_chars", 50)?
            .set_default("chat.default_title", "New Chat")?;

        // 2. Config file: explicit path is required, ./config.yaml is optional
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        // 3. Environment variables, e.g. NEWSCHAT_BACKEND__BASE_URL=http://host:8080
        builder = builder.add_source(
            Environment::with_prefix("NEWSCHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags (and their env fallbacks via clap) win
        if let Some(url) = cli.backend_url {
            builder = builder.set_override("backend.base_url", url)?;
        }
        if let Some(path) = cli.store {
            builder = builder.set_override("storage.path", path.to_string_lossy().into_owned())?;
        }
        if cli.ephemeral {
            builder = builder.set_override("storage.ephemeral", true)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
