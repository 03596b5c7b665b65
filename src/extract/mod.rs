//! Record extraction from detail pages
//!
//! This module turns a validated detail page body into a `Record`:
//! - Parsing the page's own fields (see `detail`)
//! - Resolving the embedded geocode identifier to coordinates through the
//!   fetch engine, with a bounded number of lookups

mod detail;
mod geocode;
mod record;

pub use detail::{count_structural_anchors, parse_detail, ParsedDetail, EXPECTED_ANCHORS};
pub use geocode::parse_coordinates;
pub use record::{Record, TIMESTAMP_FORMAT};

use crate::config::{CrawlConfig, SiteConfig};
use crate::crawler::{FetchEngine, FetchOutcome, RequestSpec};
use crate::ProvisioningError;
use chrono::Local;

/// Builds records from detail pages, geocoding through a fetch engine
pub struct RecordExtractor {
    location_api: String,
    source_tag: String,
    max_geocode_attempts: u32,
    geocode_failures: u32,
}

impl RecordExtractor {
    pub fn new(site: &SiteConfig, crawl: &CrawlConfig) -> Self {
        Self {
            location_api: site.location_api.clone(),
            source_tag: site.source_tag.clone(),
            max_geocode_attempts: crawl.geocode_max_attempts,
            geocode_failures: 0,
        }
    }

    /// Extracts a record from a detail page body
    ///
    /// A page without a geocode identifier, or whose lookups all fail, yields
    /// a record with null coordinates.
    ///
    /// # Returns
    ///
    /// * `Ok(Record)` - The record, possibly partial
    /// * `Err(ProvisioningError)` - The proxy pool could not be refilled
    pub async fn extract(
        &mut self,
        engine: &mut FetchEngine,
        body: &str,
    ) -> Result<Record, ProvisioningError> {
        let ParsedDetail {
            mut record,
            geocode_params,
        } = parse_detail(body, &self.source_tag, Local::now());

        if let Some(params) = geocode_params {
            match self.resolve_coordinates(engine, &params).await? {
                Some((lat, lng)) => {
                    record.lat = Some(lat);
                    record.lng = Some(lng);
                }
                None => self.geocode_failures += 1,
            }
        }

        tracing::info!(
            name = record.resort_name.as_deref().unwrap_or("<unnamed>"),
            poi_id = ?record.poi_id,
            geocoded = record.has_coordinates(),
            "Record extracted"
        );

        Ok(record)
    }

    /// Number of records whose coordinates could not be resolved
    pub fn geocode_failures(&self) -> u32 {
        self.geocode_failures
    }

    /// Looks up coordinates, giving up after the configured number of lookups
    ///
    /// A 2xx body without coordinates is treated as a block page and the proxy
    /// that served it is punished.
    async fn resolve_coordinates(
        &self,
        engine: &mut FetchEngine,
        params: &str,
    ) -> Result<Option<(f64, f64)>, ProvisioningError> {
        let request = RequestSpec::get(self.location_api.as_str()).query("params", params);

        for attempt in 1..=self.max_geocode_attempts {
            match engine.fetch(&request).await? {
                FetchOutcome::Success {
                    body,
                    final_address,
                } => {
                    if let Some(coordinates) = parse_coordinates(&body) {
                        return Ok(Some(coordinates));
                    }
                    tracing::debug!(attempt, proxy = %final_address, "Location response without coordinates");
                    engine.penalize(&final_address).await;
                }
                FetchOutcome::Failure { kind, .. } => {
                    tracing::debug!(attempt, reason = %kind, "Location lookup failed");
                }
            }
        }

        tracing::warn!(
            params,
            attempts = self.max_geocode_attempts,
            "Giving up on location lookup; coordinates left null"
        );
        Ok(None)
    }
}
