//! Collector metrics
//!
//! Counters and histograms for collection runs, recorded through the
//! `metrics` facade. Nothing is exported unless the embedding application
//! installs a recorder.

use crate::collector::SourceStatus;

pub const SOURCES_TOTAL: &str = "card_scraper_sources_total";
pub const CARDS_EMITTED_TOTAL: &str = "card_scraper_cards_emitted_total";
pub const RETRIEVE_DURATION_SECONDS: &str = "card_scraper_retrieve_duration_seconds";
pub const RUN_DURATION_SECONDS: &str = "card_scraper_run_duration_seconds";

/// Metrics recorded by the collector
pub struct CollectorMetrics;

impl CollectorMetrics {
    /// Record the final status of one source
    pub fn record_source_outcome(status: &SourceStatus) {
        ::metrics::counter!(SOURCES_TOTAL, "outcome" => status.label()).increment(1);
    }

    pub fn record_cards_emitted(count: usize) {
        ::metrics::counter!(CARDS_EMITTED_TOTAL).increment(count as u64);
    }

    pub fn record_retrieve_duration(duration_secs: f64) {
        ::metrics::histogram!(RETRIEVE_DURATION_SECONDS).record(duration_secs);
    }

    pub fn record_run_duration(duration_secs: f64) {
        ::metrics::histogram!(RUN_DURATION_SECONDS).record(duration_secs);
    }
}
