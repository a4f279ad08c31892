use crate::apis::base::ListingParser;
use crate::constants::{
    MTGGOLDFISH_BASE_URL, MTGGOLDFISH_CURRENCY, MTGGOLDFISH_FOIL_SUFFIX, MTGGOLDFISH_SITE,
};
use crate::types::{Card, Document, Price};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use tracing::debug;

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".index-price-table tr").unwrap());
static NAME_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(".card a").unwrap());
static RARITY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td:nth-child(3)").unwrap());
static PRICE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td:nth-child(4)").unwrap());

/// One MTGGoldfish set index: the regular or the foil price table of a set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtgGoldfishListing {
    /// Set code as given by the caller; recorded on every card
    pub set: String,
    pub foil: bool,
    pub base_url: String,
}

impl MtgGoldfishListing {
    pub fn new(set: impl Into<String>, foil: bool) -> Self {
        Self {
            set: set.into(),
            foil,
            base_url: MTGGOLDFISH_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Upper-cased set code, with the foil suffix for foil listings
    pub fn index_code(&self) -> String {
        let code = self.set.to_uppercase();
        if self.foil {
            format!("{code}{MTGGOLDFISH_FOIL_SUFFIX}")
        } else {
            code
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{}/index/{}#paper",
            self.base_url.trim_end_matches('/'),
            self.index_code()
        )
    }
}

pub struct MtgGoldfishParser {
    listing: MtgGoldfishListing,
}

impl MtgGoldfishParser {
    pub fn new(listing: MtgGoldfishListing) -> Self {
        Self { listing }
    }

    fn parse_row(&self, row: &ElementRef) -> Option<Card> {
        let name = selection_text(row, &NAME_SELECTOR);
        if name.is_empty() {
            return None;
        }
        let rarity = selection_text(row, &RARITY_SELECTOR);
        let value = parse_price(&selection_text(row, &PRICE_SELECTOR))?;

        Some(Card::new(
            name,
            self.listing.set.clone(),
            rarity,
            Price::new(value, MTGGOLDFISH_CURRENCY),
            self.listing.foil,
        ))
    }
}

impl ListingParser for MtgGoldfishParser {
    fn listing_name(&self) -> String {
        format!("{}:{}", MTGGOLDFISH_SITE, self.listing.index_code())
    }

    fn extract_cards(&self, document: &Document, emit: &mut dyn FnMut(Card)) {
        let html = document.html();
        let mut emitted = 0usize;
        let mut skipped = 0usize;

        for row in html.select(&ROW_SELECTOR) {
            match self.parse_row(&row) {
                Some(card) => {
                    emit(card);
                    emitted += 1;
                }
                None => skipped += 1,
            }
        }

        debug!(
            listing = %self.listing.index_code(),
            emitted,
            skipped,
            "Parsed MTGGoldfish price table"
        );
    }
}

/// Trimmed text of every element matching `selector` under `row`
fn selection_text(row: &ElementRef, selector: &Selector) -> String {
    row.select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse a price cell such as `1.23`.
///
/// Returns `None` for anything that is not a plain finite decimal.
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
