pub mod apis;
pub mod collector;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod logging;
pub mod metrics;
pub mod types;

pub use collector::{collect, CollectionRun, Collector, CollectorSettings, SourceOutcome, SourceStatus};
pub use error::{Result, ScraperError};
pub use types::{Card, CardSource, Document, Price};
