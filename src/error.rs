use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown listing site: {0}")]
    UnknownSite(String),

    #[error("Retrieval timed out after {secs:.1}s")]
    Timeout { secs: f64 },

    #[error("Retrieval cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ScraperError>;
