use std::path::PathBuf;

/// Core error type for the scraper.
///
/// Adapter crates map their library errors into this type. Most variants are
/// per-item failures that the pipeline logs and skips; none of them stop a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid seen-id file: {path}: {reason}")]
    SeenFile { path: PathBuf, reason: String },

    #[error("channel error: {0}")]
    Channel(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out loading {0}")]
    Timeout(String),

    #[error("bot-detection page served for {0}")]
    BotDetected(String),

    #[error("no target link on {0}")]
    NoTargetLink(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
