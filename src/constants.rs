/// Listing site identifiers used in configuration and by the source factory
pub const MTGGOLDFISH_SITE: &str = "mtggoldfish";

pub const MTGGOLDFISH_BASE_URL: &str = "https://www.mtggoldfish.com";

/// Appended to an MTGGoldfish set code to select the foil index
pub const MTGGOLDFISH_FOIL_SUFFIX: &str = "_F";

/// MTGGoldfish index pages list paper prices in US dollars
pub const MTGGOLDFISH_CURRENCY: &str = "USD";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_CONFIG_PATH: &str = "card_scraper.toml";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "CARD_SCRAPER_CONFIG";
