use serde::Deserialize;

/// Main configuration structure for POI-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
}

/// Target site layout and query parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Paginated listing endpoint (page number and area query are appended)
    pub listing_url: String,

    /// Auxiliary endpoint resolving a geocode identifier to coordinates
    pub location_api: String,

    /// Free-text area/region query
    #[serde(default = "default_area_name")]
    pub area_name: String,

    /// First listing page to harvest (inclusive)
    #[serde(default = "default_start_page")]
    pub start_page: u32,

    /// Last listing page to harvest (inclusive)
    #[serde(default = "default_end_page")]
    pub end_page: u32,

    /// Number of items the listing layout always renders per page
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,

    /// Word an anchor text must contain for its link to be harvested
    #[serde(default = "default_link_marker")]
    pub link_marker: String,

    /// Source tag stamped on every record
    #[serde(default = "default_source_tag")]
    pub source_tag: String,
}

/// Per-request fetch policy
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Connect timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Read timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Maximum underlying HTTP attempts per logical fetch
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Credits deducted from a proxy on a failed attempt
    #[serde(default = "default_punish")]
    pub punish: i64,

    /// Credits deducted from a proxy on every attempt
    #[serde(default = "default_use_cost")]
    pub use_cost: i64,

    /// User agents drawn at random for each request
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Bound on content-validation re-fetches for a single position.
    /// Absent means unbounded.
    #[serde(default)]
    pub max_validation_retries: Option<u32>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_timeout_secs(),
            read_timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            punish: default_punish(),
            use_cost: default_use_cost(),
            user_agents: default_user_agents(),
            max_validation_retries: None,
        }
    }
}

/// Proxy pool and provisioning service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyConfig {
    /// Base URL of the provisioning API (eviction uses `{api-url}delete`)
    pub api_url: String,

    /// Target number of proxies per refill
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Credits a freshly provisioned proxy starts with
    #[serde(default = "default_max_credits")]
    pub max_credits: i64,

    /// Region filter passed to the provisioning service
    #[serde(default = "default_region")]
    pub region: String,

    /// Proxy type buckets requested in order during a refill
    #[serde(default = "default_type_buckets")]
    pub type_buckets: Vec<u32>,

    /// Timeout retry ceiling for a single provisioning call
    #[serde(default = "default_max_attempts")]
    pub max_api_attempts: u32,
}

/// Crawl-level policy
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Consecutive terminal failures tolerated before the crawl aborts
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Logical fetches spent resolving one geocode before giving up
    #[serde(default = "default_max_attempts")]
    pub geocode_max_attempts: u32,

    /// Hand records gathered so far to the sink when the crawl aborts
    #[serde(default)]
    pub flush_on_abort: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            geocode_max_attempts: default_max_attempts(),
            flush_on_abort: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the JSON array written at crawl completion
    pub json_path: String,

    /// Optional SQLite database receiving the same batch
    #[serde(default)]
    pub database_path: Option<String>,
}

fn default_area_name() -> String {
    "海南".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_end_page() -> u32 {
    50
}

fn default_items_per_page() -> usize {
    15
}

fn default_link_marker() -> String {
    "景点".to_string()
}

fn default_source_tag() -> String {
    "mafengwo".to_string()
}

fn default_timeout_secs() -> u64 {
    6
}

fn default_max_attempts() -> u32 {
    10
}

fn default_punish() -> i64 {
    5
}

fn default_use_cost() -> i64 {
    1
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15".to_string(),
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
    ]
}

fn default_pool_size() -> usize {
    20
}

fn default_max_credits() -> i64 {
    20
}

fn default_region() -> String {
    "国内".to_string()
}

fn default_type_buckets() -> Vec<u32> {
    vec![0, 1]
}

fn default_failure_threshold() -> u32 {
    10
}
