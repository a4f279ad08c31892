use crate::error::Result;
use scraper::Html;
use serde::{Deserialize, Serialize};

/// A listed price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub value: f64,
    pub currency: String,
}

impl Price {
    pub fn new(value: f64, currency: impl Into<String>) -> Self {
        Self {
            value,
            currency: currency.into(),
        }
    }
}

/// One extracted price entry for a card.
///
/// Cards are immutable once built; equality is structural and duplicates
/// are kept as-is by the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    name: String,
    set: String,
    rarity: String,
    price: Price,
    foil: bool,
}

impl Card {
    pub fn new(
        name: impl Into<String>,
        set: impl Into<String>,
        rarity: impl Into<String>,
        price: Price,
        foil: bool,
    ) -> Self {
        Self {
            name: name.into(),
            set: set.into(),
            rarity: rarity.into(),
            price,
            foil,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set code the listing was collected for
    pub fn set(&self) -> &str {
        &self.set
    }

    pub fn rarity(&self) -> &str {
        &self.rarity
    }

    pub fn price(&self) -> &Price {
        &self.price
    }

    pub fn foil(&self) -> bool {
        self.foil
    }
}

/// A retrieved listing page.
///
/// The collector treats documents as opaque; extraction parses the body
/// into an HTML tree with [`Document::html`].
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    body: String,
}

impl Document {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Core trait that every card price source must implement
#[async_trait::async_trait]
pub trait CardSource: Send + Sync {
    /// Identifier used in logs and run reports
    fn name(&self) -> &str;

    /// Fetch the listing page. Must not emit cards.
    async fn retrieve(&self) -> Result<Document>;

    /// Emit one card per recognizable entry in `document`.
    ///
    /// Entries that cannot be read (missing name, unparsable price) are
    /// skipped without failing the rest of the document.
    fn extract(&self, document: &Document, emit: &mut dyn FnMut(Card));
}
