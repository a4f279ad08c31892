use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_USER_AGENT,
    MTGGOLDFISH_SITE,
};
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub collector: CollectorConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Unbounded when absent
    pub max_concurrency: Option<usize>,
    pub source_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when RUST_LOG is not set
    pub filter: String,
    /// Directory for daily-rotated JSON logs; console only when absent
    pub json_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "card_scraper=info,warn".to_string(),
            json_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Regular,
    Foil,
}

impl Variant {
    pub fn is_foil(self) -> bool {
        matches!(self, Variant::Foil)
    }
}

/// One listing to collect, e.g. the regular and foil index of a set
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_site")]
    pub site: String,
    pub set: String,
    #[serde(default = "default_variants")]
    pub variants: Vec<Variant>,
    /// Overrides the site's default base URL
    pub base_url: Option<String>,
}

fn default_site() -> String {
    MTGGOLDFISH_SITE.to_string()
}

fn default_variants() -> Vec<Variant> {
    vec![Variant::Regular, Variant::Foil]
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `$CARD_SCRAPER_CONFIG`, then `card_scraper.toml`, else defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::load(path);
        }
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Self::load(DEFAULT_CONFIG_PATH);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.collector.max_concurrency == Some(0) {
            return Err(ScraperError::Config(
                "collector.max_concurrency must be at least 1".into(),
            ));
        }
        for target in &self.targets {
            if target.set.trim().is_empty() {
                return Err(ScraperError::Config("target set code is empty".into()));
            }
            if target.variants.is_empty() {
                return Err(ScraperError::Config(format!(
                    "target '{}' lists no variants",
                    target.set
                )));
            }
        }
        Ok(())
    }
}
