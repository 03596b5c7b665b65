//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the two-phase crawl loop:
//! - Harvesting detail links from the listing pages
//! - Fetching each detail page and extracting its record
//! - Re-fetching pages whose content fails validation (blocked proxies)
//! - Tracking a consecutive-failure budget per phase and aborting the run
//!   once the network looks dead
//! - Handing the finished batch to the sink exactly once

use crate::config::{Config, CrawlConfig, SiteConfig};
use crate::crawler::fetcher::{FetchEngine, FetchOutcome};
use crate::crawler::parser::{parse_listing, ListingPage};
use crate::crawler::transport::{ReqwestTransport, RequestSpec};
use crate::extract::{count_structural_anchors, Record, RecordExtractor, EXPECTED_ANCHORS};
use crate::output::{build_sinks, BatchSink, CrawlStatistics};
use crate::proxy::{HttpProvisioningClient, ProxyPool};
use crate::state::{BudgetVerdict, CrawlPhase, FailureBudget, PositionState};
use crate::HarvestError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    engine: FetchEngine,
    extractor: RecordExtractor,
    sink: Box<dyn BatchSink>,
    site: SiteConfig,
    crawl: CrawlConfig,
    mismatch_limit: Option<u32>,
    stats: CrawlStatistics,
}

impl Coordinator {
    /// Creates a coordinator around an existing engine and sink
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `engine` - Fetch engine (owning the proxy pool)
    /// * `sink` - Receiver of the finished record batch
    pub fn new(config: &Config, engine: FetchEngine, sink: Box<dyn BatchSink>) -> Self {
        Self {
            engine,
            extractor: RecordExtractor::new(&config.site, &config.crawl),
            sink,
            site: config.site.clone(),
            crawl: config.crawl.clone(),
            mismatch_limit: config.fetch.max_validation_retries,
            stats: CrawlStatistics::new(),
        }
    }

    /// Wires up the HTTP provisioning client, reqwest transport and configured sinks
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run; the pool fills on first use
    /// * `Err(HarvestError)` - A client could not be built or a sink could not be opened
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let connect_timeout = Duration::from_secs(config.fetch.connect_timeout_secs);
        let read_timeout = Duration::from_secs(config.fetch.read_timeout_secs);

        let provisioning =
            HttpProvisioningClient::new(&config.proxy, connect_timeout, read_timeout)?;
        let pool = ProxyPool::new(config.proxy.clone(), Arc::new(provisioning));
        let transport = ReqwestTransport::new(&config.fetch);
        let engine = FetchEngine::new(pool, Arc::new(transport), config.fetch.clone());
        let sinks = build_sinks(&config.output)?;

        Ok(Self::new(config, engine, Box::new(sinks)))
    }

    /// Runs both crawl phases and flushes the batch
    ///
    /// On a fatal condition (failure budget exceeded, provisioning exhausted)
    /// the gathered records are discarded unless `flush-on-abort` is set, and
    /// the error is returned either way.
    pub async fn run(&mut self) -> Result<CrawlStatistics, HarvestError> {
        let started = Instant::now();
        let mut records = Vec::new();

        tracing::info!(
            area = %self.site.area_name,
            start_page = self.site.start_page,
            end_page = self.site.end_page,
            "Starting crawl"
        );
        if self.mismatch_limit.is_none() {
            tracing::warn!("Content validation mismatches are retried without bound");
        }

        let outcome = self.crawl_phases(&mut records).await;
        self.collect_statistics(records.len(), started.elapsed());

        match outcome {
            Ok(()) => {
                self.flush(&records)?;
                tracing::info!(
                    links = self.stats.links_harvested,
                    records = records.len(),
                    elapsed = ?self.stats.elapsed,
                    "Crawl completed"
                );
                Ok(self.stats.clone())
            }
            Err(e) => {
                tracing::error!(error = %e, records = records.len(), "Crawl aborted");
                if self.crawl.flush_on_abort {
                    if let Err(flush_error) = self.flush(&records) {
                        tracing::error!(error = %flush_error, "Failed to flush partial batch");
                    }
                } else {
                    tracing::warn!(records = records.len(), "Discarding partial batch");
                }
                Err(e)
            }
        }
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.stats
    }

    async fn crawl_phases(&mut self, records: &mut Vec<Record>) -> Result<(), HarvestError> {
        let links = self.harvest_links().await?;
        self.extract_records(&links, records).await
    }

    /// Phase A: walks the listing pages and collects marked detail links
    async fn harvest_links(&mut self) -> Result<Vec<String>, HarvestError> {
        let base_url = Url::parse(&self.site.listing_url)?;
        let marker = self.site.link_marker.clone();
        let expected = self.site.items_per_page;
        let mut budget = FailureBudget::new(self.crawl.failure_threshold);
        let mut links = Vec::new();

        for page in self.site.start_page..=self.site.end_page {
            let position = page as usize;
            let request = RequestSpec::get(self.site.listing_url.as_str())
                .query("p", page)
                .query("q", &self.site.area_name);

            let validate = |body: &str| -> Option<ListingPage> {
                let listing = parse_listing(body, &base_url, &marker);
                (listing.anchor_count == expected).then_some(listing)
            };

            match self
                .fetch_validated(&request, CrawlPhase::Listing, validate)
                .await?
            {
                Some(listing) => {
                    budget.record_success(position);
                    self.stats.listing_pages_fetched += 1;
                    self.stats.links_harvested += listing.links.len() as u64;
                    tracing::info!(page, links = listing.links.len(), "Listing page harvested");
                    links.extend(listing.links);
                }
                None => {
                    self.stats.listing_pages_failed += 1;
                    charge_failure(&mut budget, CrawlPhase::Listing, position)?;
                }
            }
        }

        tracing::info!(links = links.len(), "Link harvesting finished");
        Ok(links)
    }

    /// Phase B: fetches every harvested link and extracts its record
    async fn extract_records(
        &mut self,
        links: &[String],
        records: &mut Vec<Record>,
    ) -> Result<(), HarvestError> {
        let mut budget = FailureBudget::new(self.crawl.failure_threshold);

        for (position, link) in links.iter().enumerate() {
            let request = RequestSpec::get(link.as_str());
            let validate = |body: &str| {
                (count_structural_anchors(body) == EXPECTED_ANCHORS).then(|| body.to_string())
            };

            match self
                .fetch_validated(&request, CrawlPhase::Detail, validate)
                .await?
            {
                Some(body) => {
                    budget.record_success(position);
                    self.stats.detail_pages_fetched += 1;
                    let record = self.extractor.extract(&mut self.engine, &body).await?;
                    records.push(record);
                }
                None => {
                    self.stats.detail_pages_failed += 1;
                    charge_failure(&mut budget, CrawlPhase::Detail, position)?;
                }
            }
        }

        Ok(())
    }

    /// Fetches one crawl position until its content validates or it fails terminally
    ///
    /// # State Transitions
    ///
    /// | Event | From | To |
    /// |-------|------|----|
    /// | Body validates | Pending / Retrying | Succeeded |
    /// | Body fails validation | Pending / Retrying | Retrying, or FailedTerminal past the mismatch limit |
    /// | Fetch engine gives up | Pending / Retrying | FailedTerminal |
    ///
    /// A validation mismatch is blamed on the proxy that served the body, which
    /// is punished before the re-fetch.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(T))` - The validated content
    /// * `Ok(None)` - The position failed terminally
    /// * `Err(HarvestError)` - The proxy pool could not be refilled
    async fn fetch_validated<T>(
        &mut self,
        request: &RequestSpec,
        phase: CrawlPhase,
        validate: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, HarvestError> {
        let mut state = PositionState::Pending;
        let mut content = None;

        while !state.is_terminal() {
            match self.engine.fetch(request).await? {
                FetchOutcome::Success {
                    body,
                    final_address,
                } => match validate(&body) {
                    Some(value) => {
                        content = Some(value);
                        state = state.on_success();
                    }
                    None => {
                        state = state.on_mismatch(self.mismatch_limit);
                        self.stats.validation_retries += 1;
                        self.engine.penalize(&final_address).await;
                        tracing::warn!(
                            %phase,
                            url = %request,
                            proxy = %final_address,
                            mismatches = state.mismatches(),
                            "Unexpected page content; re-fetching through another proxy"
                        );
                    }
                },
                FetchOutcome::Failure {
                    kind,
                    attempts_made,
                } => {
                    state = state.on_failure();
                    tracing::warn!(
                        %phase,
                        url = %request,
                        attempts = attempts_made,
                        reason = %kind,
                        "Giving up on page"
                    );
                }
            }
        }

        tracing::debug!(%phase, url = %request, state = %state, "Position settled");
        Ok(content)
    }

    fn flush(&mut self, records: &[Record]) -> Result<(), HarvestError> {
        self.sink.write_batch(records)?;
        tracing::info!(sink = self.sink.name(), records = records.len(), "Batch flushed");
        Ok(())
    }

    fn collect_statistics(&mut self, records: usize, elapsed: Duration) {
        let engine = self.engine.stats();
        let pool = self.engine.pool().stats();

        self.stats.records_extracted = records as u64;
        self.stats.geocode_failures = self.extractor.geocode_failures() as u64;
        self.stats.fetch_attempts = engine.attempts;
        self.stats.fetches_succeeded = engine.successes;
        self.stats.fetches_abandoned = engine.failures;
        self.stats.proxies_evicted = pool.evictions as u64;
        self.stats.pool_refills = pool.refills as u64;
        self.stats.elapsed = elapsed;
    }
}

/// Charges a terminal failure, turning an exceeded budget into a fatal error
fn charge_failure(
    budget: &mut FailureBudget,
    phase: CrawlPhase,
    position: usize,
) -> Result<(), HarvestError> {
    match budget.record_failure(position) {
        BudgetVerdict::Within { streak } => {
            tracing::warn!(%phase, position, streak, "Position failed");
            Ok(())
        }
        BudgetVerdict::Exceeded { streak } => Err(HarvestError::NetworkUnavailable {
            phase,
            position,
            streak,
        }),
    }
}

/// Runs a complete crawl from configuration
///
/// # Example
///
/// ```no_run
/// use poi_harvest::config::load_config;
/// use poi_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let stats = run_crawl(&config).await?;
/// println!("{} records", stats.records_extracted);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<CrawlStatistics, HarvestError> {
    let mut coordinator = Coordinator::from_config(config)?;
    coordinator.run().await
}
