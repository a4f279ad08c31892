use crate::apis::base::{build_client, FileSource, HttpSource, ListingParser};
use crate::apis::parsers::{MtgGoldfishListing, MtgGoldfishParser};
use crate::config::Config;
use crate::constants::MTGGOLDFISH_SITE;
use crate::error::{Result, ScraperError};
use crate::types::CardSource;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    MtgGoldfish,
}

impl FromStr for Site {
    type Err = ScraperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            MTGGOLDFISH_SITE => Ok(Site::MtgGoldfish),
            other => Err(ScraperError::UnknownSite(other.to_string())),
        }
    }
}

/// Everything needed to build one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTarget {
    pub site: Site,
    pub set: String,
    pub foil: bool,
    /// Site default when absent
    pub base_url: Option<String>,
}

impl ListingTarget {
    pub fn mtggoldfish(set: impl Into<String>, foil: bool) -> Self {
        Self {
            site: Site::MtgGoldfish,
            set: set.into(),
            foil,
            base_url: None,
        }
    }

    fn goldfish_listing(&self) -> MtgGoldfishListing {
        let listing = MtgGoldfishListing::new(self.set.clone(), self.foil);
        match &self.base_url {
            Some(url) => listing.with_base_url(url.clone()),
            None => listing,
        }
    }

    pub fn url(&self) -> String {
        match self.site {
            Site::MtgGoldfish => self.goldfish_listing().url(),
        }
    }
}

/// Factory function to create the parser bound to a target
pub fn create_parser(target: &ListingTarget) -> Box<dyn ListingParser> {
    match target.site {
        Site::MtgGoldfish => Box::new(MtgGoldfishParser::new(target.goldfish_listing())),
    }
}

/// Factory function to create an HTTP source for a target
pub fn create_source(target: &ListingTarget, client: &reqwest::Client) -> Arc<dyn CardSource> {
    Arc::new(HttpSource::new(
        client.clone(),
        target.url(),
        create_parser(target),
    ))
}

/// Source reading a saved copy of the target's listing page
pub fn create_file_source(target: &ListingTarget, path: impl AsRef<Path>) -> Arc<dyn CardSource> {
    Arc::new(FileSource::new(path.as_ref(), create_parser(target)))
}

/// The regular and foil MTGGoldfish sources for a set
pub fn sources_for_set(set: &str, client: &reqwest::Client) -> Vec<Arc<dyn CardSource>> {
    [false, true]
        .into_iter()
        .map(|foil| create_source(&ListingTarget::mtggoldfish(set, foil), client))
        .collect()
}

/// Build one source per configured target and variant
pub fn sources_from_config(config: &Config) -> Result<Vec<Arc<dyn CardSource>>> {
    let client = build_client(&config.http)?;
    let mut sources = Vec::new();

    for target_config in &config.targets {
        let site = Site::from_str(&target_config.site)?;
        for variant in &target_config.variants {
            let target = ListingTarget {
                site,
                set: target_config.set.clone(),
                foil: variant.is_foil(),
                base_url: target_config.base_url.clone(),
            };
            sources.push(create_source(&target, &client));
        }
    }

    info!("Built {} sources from {} targets", sources.len(), config.targets.len());
    Ok(sources)
}
