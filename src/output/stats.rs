//! Crawl run statistics
//!
//! Counters gathered while a crawl runs, printed as a summary at the end.

use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Listing pages whose content validated
    pub listing_pages_fetched: u64,

    /// Listing pages given up on
    pub listing_pages_failed: u64,

    /// Detail links harvested from the listing pages
    pub links_harvested: u64,

    /// Detail pages whose content validated
    pub detail_pages_fetched: u64,

    /// Detail pages given up on
    pub detail_pages_failed: u64,

    /// Records handed to the sinks (or gathered before an abort)
    pub records_extracted: u64,

    /// Re-fetches caused by a page failing content validation
    pub validation_retries: u64,

    /// Records left without coordinates
    pub geocode_failures: u64,

    /// Underlying HTTP attempts across every fetch
    pub fetch_attempts: u64,

    /// Logical fetches that returned a body
    pub fetches_succeeded: u64,

    /// Logical fetches the engine gave up on
    pub fetches_abandoned: u64,

    /// Proxies evicted for running out of credits
    pub proxies_evicted: u64,

    /// Times the proxy pool was refilled
    pub pool_refills: u64,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal failures across both phases
    pub fn total_failures(&self) -> u64 {
        self.listing_pages_failed + self.detail_pages_failed
    }

    /// Share of detail pages that produced a record, as a percentage
    pub fn detail_success_rate(&self) -> f64 {
        let total = self.detail_pages_fetched + self.detail_pages_failed;
        if total == 0 {
            return 0.0;
        }
        (self.detail_pages_fetched as f64 / total as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Listing:");
    println!("  Pages fetched: {}", stats.listing_pages_fetched);
    println!("  Pages failed: {}", stats.listing_pages_failed);
    println!("  Links harvested: {}", stats.links_harvested);
    println!();

    println!("Details:");
    println!("  Pages fetched: {}", stats.detail_pages_fetched);
    println!("  Pages failed: {}", stats.detail_pages_failed);
    println!("  Success rate: {:.1}%", stats.detail_success_rate());
    println!("  Records extracted: {}", stats.records_extracted);
    println!("  Without coordinates: {}", stats.geocode_failures);
    println!();

    println!("Network:");
    println!("  HTTP attempts: {}", stats.fetch_attempts);
    println!(
        "  Fetches: {} succeeded, {} abandoned",
        stats.fetches_succeeded, stats.fetches_abandoned
    );
    println!("  Validation retries: {}", stats.validation_retries);
    println!("  Proxies evicted: {}", stats.proxies_evicted);
    println!("  Pool refills: {}", stats.pool_refills);
    println!();

    println!("Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
}
