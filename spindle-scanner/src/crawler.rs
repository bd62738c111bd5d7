use crate::error::{Result, ScanError};
use crate::extract::extract_page_data;
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::normalize::{host_key, normalize_url};
use crate::result::{CrawlOutcome, PageRecord};
use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};
use url::Url;

pub const DEFAULT_MAX_CONCURRENCY: usize = 5;
pub const DEFAULT_MAX_PAGES: usize = 20;

/// Called with the running admitted count and the address each time a page
/// is admitted.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Result of trying to claim a normalized key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Claimed; carries the admitted count including this key.
    Admitted(usize),
    Duplicate,
    OverBudget,
}

#[derive(Debug)]
enum Visit {
    InFlight,
    Extracted(PageRecord),
    Failed,
}

/// Visited set plus budget flag. Only ever touched under the traversal mutex.
#[derive(Debug, Default)]
struct Frontier {
    visits: HashMap<String, Visit>,
    limit_reached: bool,
}

/// Shared state for one crawl. Every branch holds an `Arc` to it.
///
/// Reaching the page budget closes the frontier (no new admissions, no new
/// children) but lets admitted fetches drain. Only `shutdown` aborts fetches
/// that are already in flight.
struct Traversal {
    fetcher: Arc<dyn PageFetcher>,
    seed_host: String,
    max_pages: usize,
    frontier: Mutex<Frontier>,
    gate: Semaphore,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    frontier_closed: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

impl Traversal {
    fn spawn_branch(self: &Arc<Self>, url: String) {
        let traversal = Arc::clone(self);
        self.tracker.spawn(traversal.visit(url));
    }

    /// One branch: scope check, key, admission, fetch/extract, expansion.
    fn visit(self: Arc<Self>, url: String) -> BoxFuture<'static, ()> {
        async move {
            if self.frontier_closed.is_cancelled() {
                trace!("Frontier closed, dropping {}", url);
                return;
            }

            let key = match self.in_scope_key(&url) {
                Ok(Some(key)) => key,
                Ok(None) => {
                    trace!("Out of scope: {}", url);
                    return;
                }
                Err(e) => {
                    warn!("Crawl error for {}: {}", url, e);
                    return;
                }
            };

            match self.admit(&key).await {
                Admission::Admitted(count) => {
                    debug!("Admitted [{}/{}] {}", count, self.max_pages, url);
                    if let Some(ref callback) = self.progress_callback {
                        callback(count, url.clone());
                    }
                }
                Admission::Duplicate => {
                    trace!("Already visited: {}", key);
                    return;
                }
                Admission::OverBudget => {
                    debug!("Page budget reached, rejecting {}", url);
                    return;
                }
            }

            match self.fetch_and_extract(&url).await {
                Ok(record) => {
                    let links = record.outgoing_links.clone();
                    self.complete(&key, Visit::Extracted(record)).await;

                    if self.frontier_closed.is_cancelled() {
                        return;
                    }
                    for link in links {
                        self.spawn_branch(link);
                    }
                }
                Err(e) if e.is_cancelled() => {
                    debug!("{}", e);
                    self.complete(&key, Visit::Failed).await;
                }
                Err(e) => {
                    warn!("Crawl error for {}: {}", url, e);
                    self.complete(&key, Visit::Failed).await;
                }
            }
        }
        .boxed()
    }

    /// `Ok(None)` when the address is on another host or has none.
    fn in_scope_key(&self, url: &str) -> Result<Option<String>> {
        let parsed = Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Ok(None);
        }
        if host_key(&parsed).as_deref() != Some(self.seed_host.as_str()) {
            return Ok(None);
        }
        normalize_url(url).map(Some)
    }

    /// Claims `key` and bumps the admitted count in one critical section.
    async fn admit(&self, key: &str) -> Admission {
        let mut frontier = self.frontier.lock().await;

        if frontier.visits.contains_key(key) {
            return Admission::Duplicate;
        }
        if frontier.limit_reached {
            return Admission::OverBudget;
        }

        frontier.visits.insert(key.to_string(), Visit::InFlight);
        let admitted = frontier.visits.len();
        if admitted >= self.max_pages {
            frontier.limit_reached = true;
            self.frontier_closed.cancel();
            info!("Page budget of {} reached", self.max_pages);
        }

        Admission::Admitted(admitted)
    }

    /// Fetches under a gate permit, then extracts against the address the
    /// page was finally served from. A redirect off the seed host fails the
    /// branch.
    async fn fetch_and_extract(&self, url: &str) -> Result<PageRecord> {
        let page = {
            let _permit = tokio::select! {
                permit = self.gate.acquire() => {
                    permit.map_err(|_| ScanError::Cancelled(url.to_string()))?
                }
                _ = self.shutdown.cancelled() => {
                    return Err(ScanError::Cancelled(url.to_string()));
                }
            };
            self.fetcher.fetch(url, &self.shutdown).await?
        };

        if page.url != url && !matches!(self.in_scope_key(&page.url), Ok(Some(_))) {
            return Err(ScanError::OffHostRedirect {
                url: url.to_string(),
                location: page.url,
            });
        }

        let mut record = extract_page_data(&page.body, &page.url);
        record.url = url.to_string();
        Ok(record)
    }

    async fn complete(&self, key: &str, visit: Visit) {
        let mut frontier = self.frontier.lock().await;
        if let Some(slot) = frontier.visits.get_mut(key) {
            *slot = visit;
        }
    }

    async fn into_outcome(&self, seed: &str) -> CrawlOutcome {
        let mut frontier = self.frontier.lock().await;
        let admitted = frontier.visits.len();
        let limit_reached = frontier.limit_reached;

        let mut pages = BTreeMap::new();
        let mut failed = Vec::new();
        for (key, visit) in frontier.visits.drain() {
            match visit {
                Visit::Extracted(record) => {
                    pages.insert(key, record);
                }
                // a branch that never finished (panicked) counts as failed
                Visit::Failed | Visit::InFlight => failed.push(key),
            }
        }
        failed.sort();

        CrawlOutcome {
            seed: seed.to_string(),
            pages,
            failed,
            admitted,
            limit_reached,
        }
    }
}

pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    max_concurrency: usize,
    max_pages: usize,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    /// Crawler backed by a real HTTP client.
    pub fn new() -> Result<Self> {
        Ok(Self::with_fetcher(Arc::new(HttpFetcher::new()?)))
    }

    pub fn with_fetcher(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_pages: DEFAULT_MAX_PAGES,
            progress_callback: None,
        }
    }

    /// Maximum simultaneous fetches; clamped to at least 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Maximum distinct pages ever admitted; clamped to at least 1.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub async fn crawl(&self, seed: &str) -> Result<CrawlOutcome> {
        self.crawl_with_cancellation(seed, CancellationToken::new())
            .await
    }

    /// Crawls from `seed` until the frontier is exhausted, the page budget is
    /// reached, or `shutdown` is cancelled. Returns once every spawned branch
    /// has finished.
    pub async fn crawl_with_cancellation(
        &self,
        seed: &str,
        shutdown: CancellationToken,
    ) -> Result<CrawlOutcome> {
        info!(
            "Starting crawl of {} (max {} concurrent, max {} pages)",
            seed, self.max_concurrency, self.max_pages
        );

        let parsed = Url::parse(seed)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", seed, e)))?;
        let seed_host = host_key(&parsed)
            .ok_or_else(|| ScanError::InvalidUrl(format!("{}: no host", seed)))?;

        let traversal = Arc::new(Traversal {
            fetcher: Arc::clone(&self.fetcher),
            seed_host,
            max_pages: self.max_pages,
            frontier: Mutex::new(Frontier::default()),
            gate: Semaphore::new(self.max_concurrency),
            tracker: TaskTracker::new(),
            frontier_closed: shutdown.child_token(),
            shutdown,
            progress_callback: self.progress_callback.clone(),
        });

        traversal.spawn_branch(seed.to_string());

        // Branches keep spawning onto the tracker after close(); wait()
        // returns only when the tracked count drops to zero.
        traversal.tracker.close();
        traversal.tracker.wait().await;

        let outcome = traversal.into_outcome(seed).await;
        info!(
            "Crawl complete. Extracted {} of {} admitted pages",
            outcome.pages.len(),
            outcome.admitted
        );
        Ok(outcome)
    }
}
