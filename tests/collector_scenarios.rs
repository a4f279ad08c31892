use anyhow::Result;
use card_scraper::apis::factory::{create_file_source, ListingTarget};
use card_scraper::filter::{filter, price_above, rarity_is};
use card_scraper::{
    collect, Card, CardSource, Collector, CollectorSettings, Document, Price, ScraperError, SourceStatus,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn rix_source(foil: bool) -> Arc<dyn CardSource> {
    create_file_source(&ListingTarget::mtggoldfish("rix", foil), fixture("rix_index.html"))
}

fn card(name: &str, price: f64) -> Card {
    Card::new(name, "tst", "Rare", Price::new(price, "USD"), false)
}

/// Sort into a canonical order so runs can be compared as multisets
fn sorted(mut cards: Vec<Card>) -> Vec<Card> {
    cards.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then(a.set().cmp(b.set()))
            .then(a.rarity().cmp(b.rarity()))
            .then(a.foil().cmp(&b.foil()))
            .then(a.price().value.total_cmp(&b.price().value))
    });
    cards
}

struct ListSource {
    name: String,
    cards: Vec<Card>,
}

impl ListSource {
    fn new(name: &str, cards: Vec<Card>) -> Arc<dyn CardSource> {
        Arc::new(Self {
            name: name.to_string(),
            cards,
        })
    }
}

#[async_trait::async_trait]
impl CardSource for ListSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve(&self) -> card_scraper::Result<Document> {
        tokio::task::yield_now().await;
        Ok(Document::new(format!("list://{}", self.name), ""))
    }

    fn extract(&self, _document: &Document, emit: &mut dyn FnMut(Card)) {
        for card in &self.cards {
            emit(card.clone());
        }
    }
}

struct FailingSource {
    extract_calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl CardSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn retrieve(&self) -> card_scraper::Result<Document> {
        Err(ScraperError::Status {
            url: "https://www.mtggoldfish.com/index/RIX".to_string(),
            status: 503,
        })
    }

    fn extract(&self, _document: &Document, emit: &mut dyn FnMut(Card)) {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        emit(card("garbage", 0.0));
    }
}

/// Sleeps during retrieval while tracking how many sources are in flight
struct SlowSource {
    name: String,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl CardSource for SlowSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve(&self) -> card_scraper::Result<Document> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Document::new(format!("slow://{}", self.name), ""))
    }

    fn extract(&self, _document: &Document, emit: &mut dyn FnMut(Card)) {
        emit(card(&self.name, 1.0));
    }
}

struct PanickingSource;

#[async_trait::async_trait]
impl CardSource for PanickingSource {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn retrieve(&self) -> card_scraper::Result<Document> {
        panic!("listing layout changed");
    }

    fn extract(&self, _document: &Document, _emit: &mut dyn FnMut(Card)) {}
}

/// Emits a few cards, then panics partway through the listing
struct HalfParsedSource;

#[async_trait::async_trait]
impl CardSource for HalfParsedSource {
    fn name(&self) -> &str {
        "half-parsed"
    }

    async fn retrieve(&self) -> card_scraper::Result<Document> {
        Ok(Document::new("list://half-parsed", ""))
    }

    fn extract(&self, _document: &Document, emit: &mut dyn FnMut(Card)) {
        emit(card("Azor's Gateway", 4.2));
        emit(card("Rekindling Phoenix", 12.5));
        panic!("unexpected row layout");
    }
}

/// Counts retrievals that ran to completion
struct TrackedSource {
    name: String,
    delay: Duration,
    finished: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl CardSource for TrackedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve(&self) -> card_scraper::Result<Document> {
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(Document::new(format!("tracked://{}", self.name), ""))
    }

    fn extract(&self, _document: &Document, emit: &mut dyn FnMut(Card)) {
        emit(card(&self.name, 1.0));
    }
}

fn slow_sources(
    count: usize,
    delay: Duration,
) -> (Vec<Arc<dyn CardSource>>, Arc<AtomicUsize>) {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let sources = (0..count)
        .map(|i| {
            Arc::new(SlowSource {
                name: format!("slow-{i}"),
                delay,
                in_flight: in_flight.clone(),
                peak: peak.clone(),
            }) as Arc<dyn CardSource>
        })
        .collect();
    (sources, peak)
}

#[tokio::test]
async fn test_scenario_a_single_listing_yields_every_entry() -> Result<()> {
    let cards = collect(vec![rix_source(false)]).await;
    assert_eq!(cards.len(), 31);
    assert!(cards.iter().all(|c| c.set() == "rix" && !c.foil()));
    assert!(cards.iter().all(|c| c.price().currency == "USD"));
    Ok(())
}

#[tokio::test]
async fn test_scenario_b_filter_counts() -> Result<()> {
    let cards = Collector::new(vec![rix_source(false)]).run().await;

    let above_one = price_above(1.0);
    assert_eq!(filter(&cards, &[&above_one]).len(), 16);

    let mut total = 0;
    for (rarity, expected) in [("Common", 2), ("Uncommon", 19), ("Rare", 9), ("Mythic", 1)] {
        let predicate = rarity_is(rarity);
        let count = filter(&cards, &[&predicate]).len();
        assert_eq!(count, expected, "rarity {rarity}");
        total += count;
    }
    assert_eq!(total, 31);
    Ok(())
}

#[tokio::test]
async fn test_scenario_c_failed_source_contributes_nothing() -> Result<()> {
    let extract_calls = Arc::new(AtomicUsize::new(0));
    let five: Vec<Card> = (1..=5).map(|i| card(&format!("card {i}"), i as f64)).collect();

    let run = Collector::new(vec![
        Arc::new(FailingSource {
            extract_calls: extract_calls.clone(),
        }) as Arc<dyn CardSource>,
        ListSource::new("five", five.clone()),
    ])
    .run_with_report()
    .await;

    assert_eq!(sorted(run.cards), sorted(five));
    assert_eq!(extract_calls.load(Ordering::SeqCst), 0);
    assert!(matches!(run.outcomes[0].status, SourceStatus::Failed(_)));
    assert_eq!(run.outcomes[1].status, SourceStatus::Succeeded);
    assert_eq!(run.outcomes[1].cards, 5);
    Ok(())
}

#[tokio::test]
async fn test_scenario_d_empty_document_yields_no_cards() -> Result<()> {
    let run = Collector::new(vec![create_file_source(
        &ListingTarget::mtggoldfish("rix", false),
        fixture("empty_index.html"),
    )])
    .run_with_report()
    .await;

    assert!(run.cards.is_empty());
    assert_eq!(run.outcomes[0].status, SourceStatus::Succeeded);
    assert!(!run.all_failed());
    Ok(())
}

#[tokio::test]
async fn test_regular_and_foil_sources_merge() -> Result<()> {
    let cards = Collector::new(vec![rix_source(false), rix_source(true)]).run().await;
    assert_eq!(cards.len(), 62);
    assert_eq!(cards.iter().filter(|c| c.foil()).count(), 31);
    Ok(())
}

#[tokio::test]
async fn test_permuted_sources_yield_same_multiset() -> Result<()> {
    let a = vec![card("Blood Sun", 2.1), card("Blood Sun", 2.1)];
    let b = vec![card("Warkite Marauder", 3.4)];

    let forward = Collector::new(vec![
        rix_source(false),
        ListSource::new("a", a.clone()),
        ListSource::new("b", b.clone()),
    ])
    .run()
    .await;
    let reversed = Collector::new(vec![
        ListSource::new("b", b),
        ListSource::new("a", a),
        rix_source(false),
    ])
    .run()
    .await;

    assert_eq!(forward.len(), 34);
    assert_eq!(sorted(forward), sorted(reversed));
    Ok(())
}

#[tokio::test]
async fn test_sources_run_concurrently_by_default() -> Result<()> {
    let (sources, peak) = slow_sources(6, Duration::from_millis(50));
    let cards = Collector::new(sources).run().await;
    assert_eq!(cards.len(), 6);
    assert_eq!(peak.load(Ordering::SeqCst), 6);
    Ok(())
}

#[tokio::test]
async fn test_max_concurrency_bounds_in_flight_sources() -> Result<()> {
    let (sources, peak) = slow_sources(6, Duration::from_millis(20));
    let settings = CollectorSettings {
        max_concurrency: Some(2),
        ..CollectorSettings::default()
    };
    let cards = Collector::with_settings(sources, settings).run().await;
    assert_eq!(cards.len(), 6);
    assert!(peak.load(Ordering::SeqCst) <= 2);
    Ok(())
}

#[tokio::test]
async fn test_timed_out_source_is_dropped() -> Result<()> {
    let (mut sources, _) = slow_sources(1, Duration::from_secs(30));
    sources.push(ListSource::new("fast", vec![card("Blood Sun", 2.1)]));
    let settings = CollectorSettings {
        source_timeout: Some(Duration::from_millis(50)),
        ..CollectorSettings::default()
    };

    let run = Collector::with_settings(sources, settings)
        .run_with_report()
        .await;

    assert_eq!(run.cards.len(), 1);
    assert_eq!(run.cards[0].name(), "Blood Sun");
    assert_eq!(run.outcomes[0].status, SourceStatus::TimedOut);
    assert_eq!(run.outcomes[0].cards, 0);
    Ok(())
}

#[tokio::test]
async fn test_cancellation_stops_pending_retrievals() -> Result<()> {
    let (sources, _) = slow_sources(3, Duration::from_secs(30));
    let cancel = CancellationToken::new();
    let settings = CollectorSettings {
        cancel: Some(cancel.clone()),
        ..CollectorSettings::default()
    };

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let run = Collector::with_settings(sources, settings)
        .run_with_report()
        .await;
    trigger.await?;

    assert!(run.cards.is_empty());
    assert!(run
        .outcomes
        .iter()
        .all(|o| o.status == SourceStatus::Cancelled));
    assert!(run.all_failed());
    Ok(())
}

#[tokio::test]
async fn test_panicking_source_does_not_affect_siblings() -> Result<()> {
    let run = Collector::new(vec![Arc::new(PanickingSource) as Arc<dyn CardSource>, rix_source(false)])
        .run_with_report()
        .await;

    assert_eq!(run.cards.len(), 31);
    assert_eq!(run.outcomes[0].source, "panicking");
    assert_eq!(run.outcomes[0].status, SourceStatus::Panicked);
    assert_eq!(run.outcomes[1].cards, 31);
    Ok(())
}

#[tokio::test]
async fn test_missing_fixture_is_reported_as_failure() -> Result<()> {
    let run = Collector::new(vec![create_file_source(
        &ListingTarget::mtggoldfish("rix", false),
        fixture("does_not_exist.html"),
    )])
    .run_with_report()
    .await;

    assert!(run.cards.is_empty());
    assert!(run.all_failed());
    let report = serde_json::to_value(&run.outcomes)?;
    assert_eq!(report[0]["status"]["status"], "failed");
    Ok(())
}

#[tokio::test]
async fn test_cards_emitted_before_extract_panic_are_kept() -> Result<()> {
    let run = Collector::new(vec![Arc::new(HalfParsedSource) as Arc<dyn CardSource>, rix_source(false)])
        .run_with_report()
        .await;

    assert_eq!(run.cards.len(), 33);
    assert!(run.cards.iter().any(|c| c.name() == "Rekindling Phoenix"));
    assert_eq!(run.outcomes[0].status, SourceStatus::Panicked);
    assert_eq!(run.outcomes[0].cards, 2);
    assert_eq!(run.outcomes[1].status, SourceStatus::Succeeded);
    Ok(())
}

#[tokio::test]
async fn test_dropping_a_run_stops_its_sources() -> Result<()> {
    let finished = Arc::new(AtomicUsize::new(0));
    let sources: Vec<Arc<dyn CardSource>> = (0..3)
        .map(|i| {
            Arc::new(TrackedSource {
                name: format!("tracked-{i}"),
                delay: Duration::from_millis(200),
                finished: finished.clone(),
            }) as Arc<dyn CardSource>
        })
        .collect();

    let result = tokio::time::timeout(Duration::from_millis(20), Collector::new(sources).run()).await;
    assert!(result.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 0);
    Ok(())
}
