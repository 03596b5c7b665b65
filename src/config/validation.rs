use crate::config::types::{Config, CrawlConfig, FetchConfig, OutputConfig, ProxyConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_fetch_config(&config.fetch)?;
    validate_proxy_config(&config.proxy, &config.fetch)?;
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the target site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("listing-url", &config.listing_url)?;
    validate_http_url("location-api", &config.location_api)?;

    if config.area_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "area-name cannot be empty".to_string(),
        ));
    }

    if config.start_page < 1 {
        return Err(ConfigError::Validation(format!(
            "start-page must be >= 1, got {}",
            config.start_page
        )));
    }

    if config.start_page > config.end_page {
        return Err(ConfigError::Validation(format!(
            "start-page ({}) must not exceed end-page ({})",
            config.start_page, config.end_page
        )));
    }

    if config.items_per_page == 0 {
        return Err(ConfigError::Validation(
            "items-per-page must be >= 1".to_string(),
        ));
    }

    if config.link_marker.is_empty() {
        return Err(ConfigError::Validation(
            "link-marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the per-request fetch policy
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.connect_timeout_secs == 0 || config.read_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs and read-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.punish < 1 {
        return Err(ConfigError::Validation(format!(
            "punish must be >= 1, got {}",
            config.punish
        )));
    }

    if config.use_cost < 0 {
        return Err(ConfigError::Validation(format!(
            "use-cost cannot be negative, got {}",
            config.use_cost
        )));
    }

    if config.user_agents.iter().all(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one non-empty entry".to_string(),
        ));
    }

    Ok(())
}

/// Validates the proxy section against the fetch policy it has to survive
fn validate_proxy_config(config: &ProxyConfig, fetch: &FetchConfig) -> Result<(), ConfigError> {
    validate_http_url("api-url", &config.api_url)?;

    if config.pool_size == 0 {
        return Err(ConfigError::Validation(
            "pool-size must be >= 1".to_string(),
        ));
    }

    // A proxy must survive at least one punishment
    if config.max_credits <= fetch.punish {
        return Err(ConfigError::Validation(format!(
            "max-credits ({}) must exceed punish ({})",
            config.max_credits, fetch.punish
        )));
    }

    if config.type_buckets.is_empty() {
        return Err(ConfigError::Validation(
            "type-buckets must list at least one proxy type".to_string(),
        ));
    }

    if config.max_api_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-api-attempts must be >= 1, got {}",
            config.max_api_attempts
        )));
    }

    Ok(())
}

/// Validates crawl-level policy
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.failure_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "failure-threshold must be >= 1, got {}",
            config.failure_threshold
        )));
    }

    if config.geocode_max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "geocode-max-attempts must be >= 1, got {}",
            config.geocode_max_attempts
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.json_path.is_empty() {
        return Err(ConfigError::Validation(
            "json-path cannot be empty".to_string(),
        ));
    }

    if matches!(config.database_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "database-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a URL parses and uses an HTTP(S) scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, other
        ))),
    }
}
