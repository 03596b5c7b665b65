//! Crawler module for proxy-rotating page fetching
//!
//! This module contains the core crawling logic, including:
//! - The transport issuing one HTTP request through one proxy
//! - The fetch engine with proxy-scoped retries and penalties
//! - Listing-page parsing for link harvesting
//! - Overall crawl coordination and the failure budget

mod coordinator;
mod fetcher;
mod parser;
mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{EngineStats, FailureKind, FetchEngine, FetchOutcome};
pub use parser::{parse_listing, ListingPage};
pub use transport::{
    build_proxied_client, ReqwestTransport, RequestSpec, Transport, TransportError,
    TransportResponse,
};
