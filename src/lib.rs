//! POI-Harvest: a proxy-rotating point-of-interest harvester
//!
//! This crate walks a paginated listing site and its per-record detail pages
//! through a pool of proxy endpoints, penalizing and evicting endpoints that
//! the target site blacklists, and hands the extracted records to a batch sink.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod proxy;
pub mod state;

use thiserror::Error;

/// Main error type for POI-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Proxy provisioning error: {0}")]
    Provisioning(#[from] ProvisioningError),

    #[error("Network unavailable: {streak} consecutive {phase} failures ending at position {position}")]
    NetworkUnavailable {
        phase: state::CrawlPhase,
        position: usize,
        streak: u32,
    },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while talking to the proxy provisioning service
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Provisioning request timed out")]
    Timeout,

    #[error("Provisioning request failed: {0}")]
    Http(String),

    #[error("Malformed provisioning response: {0}")]
    Decode(String),

    #[error("Provisioning exhausted after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Result type alias for POI-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, FetchEngine, FetchOutcome};
pub use extract::Record;
pub use proxy::{ProxyPool, ProxyRecord};
