//! Concurrent collection of cards from many sources.
//!
//! Every source runs as its own tokio task. Extraction pushes cards into one
//! unbounded merge channel shared by all tasks, and a coordinating task owns
//! both the task set and the original sender. Once the last task has been
//! joined the coordinator drops that sender, which closes the channel exactly
//! once and lets the caller's drain loop finish.

use crate::config::CollectorConfig;
use crate::error::{Result, ScraperError};
use crate::metrics::CollectorMetrics;
use crate::types::{Card, CardSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Optional limits applied to a collection run
#[derive(Debug, Clone, Default)]
pub struct CollectorSettings {
    /// Maximum number of sources retrieving or extracting at once
    pub max_concurrency: Option<usize>,
    /// Upper bound on a single source's retrieval
    pub source_timeout: Option<Duration>,
    /// Stops pending retrievals when cancelled
    pub cancel: Option<CancellationToken>,
}

impl From<&CollectorConfig> for CollectorSettings {
    fn from(config: &CollectorConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            source_timeout: config.source_timeout_secs.map(Duration::from_secs),
            cancel: None,
        }
    }
}

/// Final state of one source after a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SourceStatus {
    Succeeded,
    Failed(String),
    TimedOut,
    Cancelled,
    Panicked,
}

impl SourceStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SourceStatus::Succeeded)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceStatus::Succeeded => "succeeded",
            SourceStatus::Failed(_) => "failed",
            SourceStatus::TimedOut => "timed_out",
            SourceStatus::Cancelled => "cancelled",
            SourceStatus::Panicked => "panicked",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    pub status: SourceStatus,
    /// Cards this source emitted
    pub cards: usize,
    pub elapsed: Duration,
}

impl SourceOutcome {
    fn new(source: String, status: SourceStatus, cards: usize, elapsed: Duration) -> Self {
        Self {
            source,
            status,
            cards,
            elapsed,
        }
    }
}

/// Result of a complete collection run.
///
/// `outcomes` follows the order the sources were given in; `cards` is in
/// arrival order, which depends on scheduling and carries no meaning.
#[derive(Debug, Serialize)]
pub struct CollectionRun {
    pub cards: Vec<Card>,
    pub outcomes: Vec<SourceOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CollectionRun {
    pub fn failed(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_success())
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_success()).count()
    }

    /// True when there was at least one source and none of them succeeded.
    ///
    /// Distinguishes "nothing could be retrieved" from "no entries listed".
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded_count() == 0
    }
}

/// Runs a fixed set of sources once and gathers every card they emit
pub struct Collector {
    sources: Vec<Arc<dyn CardSource>>,
    settings: CollectorSettings,
}

impl Collector {
    pub fn new(sources: Vec<Arc<dyn CardSource>>) -> Self {
        Self::with_settings(sources, CollectorSettings::default())
    }

    pub fn with_settings(sources: Vec<Arc<dyn CardSource>>, settings: CollectorSettings) -> Self {
        Self { sources, settings }
    }

    pub fn push(mut self, source: impl CardSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Run every source and return all emitted cards.
    ///
    /// Failed sources contribute nothing and are not reported; use
    /// [`Collector::run_with_report`] to see per-source outcomes.
    pub async fn run(self) -> Vec<Card> {
        self.run_with_report().await.cards
    }

    /// Blocking variant of [`Collector::run`] for synchronous callers.
    ///
    /// Builds its own multi-thread runtime, so it must not be called from
    /// inside an async context.
    pub fn run_blocking(self) -> Result<Vec<Card>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run()))
    }

    #[instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn run_with_report(self) -> CollectionRun {
        let started_at = Utc::now();
        let clock = Instant::now();
        let source_count = self.sources.len();
        let names: Vec<String> = self.sources.iter().map(|s| s.name().to_string()).collect();

        info!(
            max_concurrency = ?self.settings.max_concurrency,
            source_timeout = ?self.settings.source_timeout,
            "Starting collection run"
        );

        let (tx, rx) = mpsc::unbounded_channel::<Card>();
        let limiter = self
            .settings
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        // Child token so dropping this run never cancels the caller's token
        let cancel = self
            .settings
            .cancel
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default();
        let timeout = self.settings.source_timeout;

        let mut tasks = JoinSet::new();
        for (index, source) in self.sources.into_iter().enumerate() {
            let task = run_source(source, tx.clone(), limiter.clone(), timeout, cancel.clone());
            tasks.spawn(async move { (index, task.await) });
        }

        let coordinator = tokio::spawn(async move {
            let mut slots: Vec<Option<SourceOutcome>> = vec![None; source_count];
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, outcome)) => slots[index] = Some(outcome),
                    Err(e) => error!(error = %e, "Source task ended abnormally"),
                }
            }
            // All producers are done; this is the last sender.
            drop(tx);
            slots
        });
        let guard = RunGuard {
            cancel: cancel.clone(),
            coordinator: coordinator.abort_handle(),
            armed: true,
        };

        let cards = drain(rx).await;

        let slots = match coordinator.await {
            Ok(slots) => slots,
            Err(e) => {
                error!(error = %e, "Collection coordinator failed");
                vec![None; source_count]
            }
        };
        guard.disarm();

        let outcomes: Vec<SourceOutcome> = slots
            .into_iter()
            .zip(names)
            .map(|(slot, name)| {
                slot.unwrap_or_else(|| {
                    SourceOutcome::new(name, SourceStatus::Panicked, 0, Duration::ZERO)
                })
            })
            .collect();

        for outcome in &outcomes {
            CollectorMetrics::record_source_outcome(&outcome.status);
        }
        CollectorMetrics::record_cards_emitted(cards.len());
        CollectorMetrics::record_run_duration(clock.elapsed().as_secs_f64());

        let failed = outcomes.iter().filter(|o| !o.status.is_success()).count();
        info!(
            cards = cards.len(),
            failed_sources = failed,
            elapsed_ms = clock.elapsed().as_millis() as u64,
            "Collection run finished"
        );
        if failed > 0 && failed == outcomes.len() {
            warn!("Every source failed; the card list is empty because nothing was retrieved");
        }

        CollectionRun {
            cards,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Stops a run's sources when the run future is dropped before completing.
///
/// Aborting the coordinator drops its `JoinSet`, which aborts every source task.
struct RunGuard {
    cancel: CancellationToken,
    coordinator: AbortHandle,
    armed: bool,
}

impl RunGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!("Collection run dropped before completion; stopping sources");
        self.cancel.cancel();
        self.coordinator.abort();
    }
}

/// Shorthand for `Collector::new(sources).run()`
pub async fn collect(sources: Vec<Arc<dyn CardSource>>) -> Vec<Card> {
    Collector::new(sources).run().await
}

/// Receive everything from `receiver` until all senders are gone
pub async fn drain<T>(mut receiver: UnboundedReceiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Some(item) = receiver.recv().await {
        items.push(item);
    }
    items
}

async fn run_source(
    source: Arc<dyn CardSource>,
    tx: UnboundedSender<Card>,
    limiter: Option<Arc<Semaphore>>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
) -> SourceOutcome {
    let started = Instant::now();
    let name = source.name().to_string();

    // Held until extraction finishes
    let _permit = match limiter {
        Some(sem) => tokio::select! {
            permit = sem.acquire_owned() => permit.ok(),
            _ = cancel.cancelled() => {
                debug!(source = %name, "Cancelled while waiting for a worker slot");
                return SourceOutcome::new(name, SourceStatus::Cancelled, 0, started.elapsed());
            }
        },
        None => None,
    };

    let retrieval = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, source.retrieve()).await {
                Ok(result) => result,
                Err(_) => Err(ScraperError::Timeout {
                    secs: limit.as_secs_f64(),
                }),
            },
            None => source.retrieve().await,
        }
    };

    let result = tokio::select! {
        result = retrieval => result,
        _ = cancel.cancelled() => Err(ScraperError::Cancelled),
    };
    CollectorMetrics::record_retrieve_duration(started.elapsed().as_secs_f64());

    let document = match result {
        Ok(document) => document,
        Err(e) => {
            warn!(source = %name, error = %e, "Retrieval failed; source contributes no cards");
            let status = match e {
                ScraperError::Timeout { .. } => SourceStatus::TimedOut,
                ScraperError::Cancelled => SourceStatus::Cancelled,
                other => SourceStatus::Failed(other.to_string()),
            };
            return SourceOutcome::new(name, status, 0, started.elapsed());
        }
    };

    // Parsing is CPU-bound; keep it off the async workers
    let emitted = Arc::new(AtomicUsize::new(0));
    let counter = emitted.clone();
    let url = document.url().to_string();
    let extraction = tokio::task::spawn_blocking(move || {
        source.extract(&document, &mut |card| {
            if tx.send(card).is_ok() {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });
    });
    let joined = extraction.await;
    let emitted = emitted.load(Ordering::Relaxed);

    match joined {
        Ok(()) => {
            debug!(source = %name, url = %url, cards = emitted, "Extraction finished");
            SourceOutcome::new(name, SourceStatus::Succeeded, emitted, started.elapsed())
        }
        Err(e) => {
            error!(source = %name, url = %url, cards = emitted, error = %e, "Extraction panicked");
            SourceOutcome::new(name, SourceStatus::Panicked, emitted, started.elapsed())
        }
    }
}
