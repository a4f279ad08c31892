use crate::config::HttpConfig;
use crate::error::{Result, ScraperError};
use crate::types::{Card, CardSource, Document};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Site-specific markup extraction
pub trait ListingParser: Send + Sync {
    /// Identifier for the listing this parser is bound to, e.g. `mtggoldfish:RIX_F`
    fn listing_name(&self) -> String;

    /// Walk the document and emit a card for every readable entry
    fn extract_cards(&self, document: &Document, emit: &mut dyn FnMut(Card));
}

/// Build the shared HTTP client used by every remote source
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Source that downloads a listing page over HTTP
pub struct HttpSource {
    client: reqwest::Client,
    name: String,
    url: String,
    parser: Box<dyn ListingParser>,
}

impl HttpSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>, parser: Box<dyn ListingParser>) -> Self {
        Self {
            client,
            name: parser.listing_name(),
            url: url.into(),
            parser,
        }
    }
}

#[async_trait::async_trait]
impl CardSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(source = %self.name))]
    async fn retrieve(&self) -> Result<Document> {
        info!("Downloading: {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), "Downloaded listing page");
        Ok(Document::new(self.url.clone(), body))
    }

    fn extract(&self, document: &Document, emit: &mut dyn FnMut(Card)) {
        self.parser.extract_cards(document, emit)
    }
}

/// Source that reads a saved listing page from disk
pub struct FileSource {
    name: String,
    path: PathBuf,
    parser: Box<dyn ListingParser>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, parser: Box<dyn ListingParser>) -> Self {
        Self {
            name: parser.listing_name(),
            path: path.into(),
            parser,
        }
    }
}

#[async_trait::async_trait]
impl CardSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(source = %self.name))]
    async fn retrieve(&self) -> Result<Document> {
        info!("Reading: {}", self.path.display());
        let body = tokio::fs::read_to_string(&self.path).await?;
        Ok(Document::new(format!("file://{}", self.path.display()), body))
    }

    fn extract(&self, document: &Document, emit: &mut dyn FnMut(Card)) {
        self.parser.extract_cards(document, emit)
    }
}
