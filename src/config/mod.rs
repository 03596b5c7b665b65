//! Configuration module for POI-Harvest
//!
//! A harvest is described by one TOML file with `[site]`, `[fetch]`, `[proxy]`,
//! `[crawl]` and `[output]` sections. Everything except the endpoints and the
//! JSON output path has a default.
//!
//! # Example
//!
//! ```no_run
//! use poi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting pages {}..={}", config.site.start_page, config.site.end_page);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlConfig, FetchConfig, OutputConfig, ProxyConfig, SiteConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
