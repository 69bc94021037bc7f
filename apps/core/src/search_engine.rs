//! Debounced, cancellable search orchestration.
//!
//! Every query takes a ticket from a monotonic counter. A query only
//! publishes if its ticket is still the latest one, checked after the debounce
//! wait, after each awaited step, and under the publication lock. Submitting a
//! new query also aborts the previous task, so superseded work is dropped
//! rather than partially applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::action_registry::built_in_commands;
use crate::aggregate::{aggregate, GroupedResults};
use crate::clipboard_history::{now_epoch_secs, search_history, ClipboardProvider};
use crate::config::ConfigProvider;
use crate::currency::CurrencyService;
use crate::discovery::DiscoveryProvider;
use crate::dispatch::{classify, evaluate, DispatchContext};
use crate::fuzzy::{match_built_ins, match_commands, match_items};
use crate::model::{SearchItem, Warning};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub query_id: u64,
    pub query: String,
    pub results: GroupedResults,
    pub warnings: Vec<Warning>,
}

/// Collaborators consulted by every query.
#[derive(Clone)]
pub struct SearchSources {
    pub config: Arc<dyn ConfigProvider>,
    pub currency: Arc<CurrencyService>,
    pub providers: Vec<Arc<dyn DiscoveryProvider>>,
    pub clipboard: Option<Arc<dyn ClipboardProvider>>,
}

impl SearchSources {
    pub fn new(config: Arc<dyn ConfigProvider>, currency: Arc<CurrencyService>) -> Self {
        Self {
            config,
            currency,
            providers: Vec::new(),
            clipboard: None,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn DiscoveryProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardProvider>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }
}

struct Shared {
    sources: SearchSources,
    latest_id: AtomicU64,
    published: Mutex<Option<SearchOutcome>>,
    updates: mpsc::UnboundedSender<SearchOutcome>,
}

impl Shared {
    fn is_current(&self, ticket: u64) -> bool {
        self.latest_id.load(Ordering::SeqCst) == ticket
    }

    fn next_ticket(&self) -> u64 {
        self.latest_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Stores the outcome as the visible state if it is still current.
    fn publish(&self, outcome: &SearchOutcome, notify: bool) -> bool {
        let Ok(mut published) = self.published.lock() else {
            return false;
        };
        if !self.is_current(outcome.query_id) {
            debug!(query_id = outcome.query_id, "dropping superseded results");
            return false;
        }
        *published = Some(outcome.clone());
        if notify && self.updates.send(outcome.clone()).is_err() {
            debug!("search update receiver dropped");
        }
        true
    }

    async fn run(&self, query: &str, ticket: u64) -> Option<SearchOutcome> {
        let config = self.sources.config.snapshot();
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Some(SearchOutcome {
                query_id: ticket,
                query: query.to_string(),
                results: GroupedResults::default(),
                warnings: Vec::new(),
            });
        }

        let ctx = DispatchContext {
            config: &config,
            currency: &self.sources.currency,
        };
        let intent = classify(trimmed);
        let (dispatched, discovered) =
            futures::join!(evaluate(&intent, &ctx), self.discover_items());
        if !self.is_current(ticket) {
            return None;
        }

        let mut streams = vec![
            dispatched.results,
            match_commands(trimmed, &config),
            match_built_ins(trimmed, built_in_commands()),
            match_items(trimmed, &discovered),
        ];
        if config.clipboard_enabled {
            if let Some(clipboard) = self.sources.clipboard.as_ref() {
                streams.push(search_history(clipboard.as_ref(), trimmed, now_epoch_secs()));
            }
        }

        let results = aggregate(streams, usize::from(config.max_results));
        debug!(query_id = ticket, results = results.len(), "search pipeline finished");
        Some(SearchOutcome {
            query_id: ticket,
            query: query.to_string(),
            results,
            warnings: dispatched.warnings,
        })
    }

    /// Runs every provider off the async threads; a failing provider
    /// contributes nothing.
    async fn discover_items(&self) -> Vec<SearchItem> {
        let scans = self.sources.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let name = provider.provider_name();
            async move {
                match tokio::task::spawn_blocking(move || provider.discover()).await {
                    Ok(Ok(items)) => items,
                    Ok(Err(error)) => {
                        warn!(provider = name, %error, "discovery provider failed");
                        Vec::new()
                    }
                    Err(error) => {
                        warn!(provider = name, %error, "discovery task failed");
                        Vec::new()
                    }
                }
            }
        });
        join_all(scans).await.into_iter().flatten().collect()
    }
}

pub struct SearchEngine {
    shared: Arc<Shared>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchEngine {
    pub fn new(sources: SearchSources) -> (Self, mpsc::UnboundedReceiver<SearchOutcome>) {
        let (updates, receiver) = mpsc::unbounded_channel();
        let engine = Self {
            shared: Arc::new(Shared {
                sources,
                latest_id: AtomicU64::new(0),
                published: Mutex::new(None),
                updates,
            }),
            pending: Mutex::new(None),
        };
        (engine, receiver)
    }

    pub fn latest_query_id(&self) -> u64 {
        self.shared.latest_id.load(Ordering::SeqCst)
    }

    /// Most recently published outcome.
    pub fn current(&self) -> Option<SearchOutcome> {
        self.shared
            .published
            .lock()
            .ok()
            .and_then(|published| published.clone())
    }

    /// Runs the pipeline now, superseding any pending submission. Returns
    /// `None` if a newer query started while this one was running.
    pub async fn search(&self, query: &str) -> Option<SearchOutcome> {
        let ticket = self.shared.next_ticket();
        self.abort_pending();
        let outcome = self.shared.run(query, ticket).await?;
        self.shared.publish(&outcome, false).then_some(outcome)
    }

    /// Schedules a debounced search and returns its query id. The outcome is
    /// delivered on the update channel unless a newer query supersedes it.
    pub fn submit(&self, query: &str) -> u64 {
        let ticket = self.shared.next_ticket();
        let debounce = Duration::from_millis(self.shared.sources.config.snapshot().debounce_ms);
        let shared = Arc::clone(&self.shared);
        let query = query.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if !shared.is_current(ticket) {
                return;
            }
            if let Some(outcome) = shared.run(&query, ticket).await {
                shared.publish(&outcome, true);
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.replace(handle) {
                previous.abort();
            }
        }
        ticket
    }

    fn abort_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.take() {
                previous.abort();
            }
        }
    }
}

impl Drop for SearchEngine {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
