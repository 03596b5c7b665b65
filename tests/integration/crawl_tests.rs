//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the proxy provisioning service
//! and a scripted transport to stand in for the target site, and drive the
//! full crawl cycle end-to-end.

use async_trait::async_trait;
use poi_harvest::config::{
    Config, CrawlConfig, FetchConfig, OutputConfig, ProxyConfig, SiteConfig,
};
use poi_harvest::crawler::{
    Coordinator, FetchEngine, RequestSpec, Transport, TransportError, TransportResponse,
};
use poi_harvest::output::JsonFileSink;
use poi_harvest::proxy::{HttpProvisioningClient, ProvisioningClient, ProxyPool};
use poi_harvest::state::CrawlPhase;
use poi_harvest::{HarvestError, ProvisioningError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_URL: &str = "http://www.site.test/search/s.php?t=poi&kt=1";
const LOCATION_API: &str = "http://pagelet.site.test/poi/pagelet/poiLocationApi";

/// Creates a test configuration against a provisioning API and output file
fn create_test_config(api_url: &str, json_path: &str, end_page: u32) -> Config {
    Config {
        site: SiteConfig {
            listing_url: LISTING_URL.to_string(),
            location_api: LOCATION_API.to_string(),
            area_name: "海南".to_string(),
            start_page: 1,
            end_page,
            items_per_page: 15,
            link_marker: "景点".to_string(),
            source_tag: "mafengwo".to_string(),
        },
        fetch: FetchConfig::default(),
        proxy: ProxyConfig {
            api_url: api_url.to_string(),
            pool_size: 4,
            max_credits: 20,
            region: "国内".to_string(),
            type_buckets: vec![0, 1],
            max_api_attempts: 3,
        },
        crawl: CrawlConfig::default(),
        output: OutputConfig {
            json_path: json_path.to_string(),
            database_path: None,
        },
    }
}

/// Target-site stand-in answering from a routing function and logging proxies
struct SiteTransport {
    route: fn(&RequestSpec) -> Result<TransportResponse, TransportError>,
    proxies: Mutex<Vec<String>>,
}

impl SiteTransport {
    fn new(route: fn(&RequestSpec) -> Result<TransportResponse, TransportError>) -> Self {
        Self {
            route,
            proxies: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for SiteTransport {
    async fn execute(
        &self,
        proxy: &str,
        request: &RequestSpec,
        _user_agent: &str,
    ) -> Result<TransportResponse, TransportError> {
        self.proxies.lock().unwrap().push(proxy.to_string());
        (self.route)(request)
    }
}

fn html(body: String) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse {
        status: 200,
        body,
    })
}

fn query_value<'a>(request: &'a RequestSpec, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// 15 result anchors, the first three of which are marked
fn listing_page(page: &str) -> String {
    let mut html = String::from(r#"<html><body><div class="att-list"><ul>"#);
    for i in 0..15 {
        let text = if i < 3 { "景点 - 景区" } else { "餐厅 - 小吃" };
        html.push_str(&format!(
            r#"<li><div class="clearfix"><div class="flt1"></div><div class="ct-text"><h3><a href="/poi/{}{:02}.html">{}</a></h3></div></div></li>"#,
            page, i, text
        ));
    }
    html.push_str("</ul></div></body></html>");
    html
}

fn detail_page(poi_id: &str) -> String {
    format!(
        r#"<html><body>
        <div class="row row-top">
          <div class="drop"><span><a href="/travel-scenic-spot/mafengwo/10030.html">三亚</a></span></div>
          <div class="title"><h1>景区{id}</h1></div>
        </div>
        <div data-anchor="overview">
          <div class="mod mod-detail">
            <dl><dt>交通</dt><dd>公交 {id} 路</dd></dl>
          </div>
          <div class="mod mod-location">
            <p class="sub">三亚市</p>
            <div data-api="/poi/pagelet/poiLocationApi" data-params='{{"poi_id":"{id}"}}'></div>
          </div>
        </div>
        </body></html>"#,
        id = poi_id
    )
}

/// Routes the listing, detail and location endpoints of a healthy site
fn healthy_site(request: &RequestSpec) -> Result<TransportResponse, TransportError> {
    if let Some(page) = query_value(request, "p") {
        return html(listing_page(page));
    }
    if request.url == LOCATION_API {
        return html(
            r#"{"data":{"controller_data":{"poi":{"lat":18.25,"lng":109.5}}}}"#.to_string(),
        );
    }
    let poi_id = request
        .url
        .rsplit('/')
        .next()
        .and_then(|file| file.strip_suffix(".html"))
        .unwrap_or("0")
        .to_string();
    html(detail_page(&poi_id))
}

fn dead_network(_: &RequestSpec) -> Result<TransportResponse, TransportError> {
    Err(TransportError::Timeout("operation timed out".to_string()))
}

/// Mounts a provisioning service that hands out the same four proxies
async fn mount_provisioning(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[["10.9.0.1", 8080, 10], ["10.9.0.2", 8080, 10], ["10.9.0.3", "3128", 9], ["10.9.0.4", 80, 8]]"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/delete"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(server)
        .await;
}

fn build_engine(config: &Config, transport: Arc<SiteTransport>) -> FetchEngine {
    let provisioning =
        HttpProvisioningClient::new(&config.proxy, Duration::from_secs(2), Duration::from_secs(2))
            .expect("Failed to build provisioning client");
    let pool = ProxyPool::new(config.proxy.clone(), Arc::new(provisioning));
    FetchEngine::new(pool, transport, config.fetch.clone())
}

#[tokio::test]
async fn test_full_crawl_writes_json_batch() {
    let server = MockServer::start().await;
    mount_provisioning(&server).await;

    let dir = TempDir::new().unwrap();
    let json_path = dir.path().join("out").join("resorts.json");
    let config = create_test_config(
        &format!("{}/", server.uri()),
        json_path.to_str().unwrap(),
        2,
    );

    let transport = Arc::new(SiteTransport::new(healthy_site));
    let engine = build_engine(&config, transport.clone());
    let sink = JsonFileSink::new(&config.output.json_path);
    let mut coordinator = Coordinator::new(&config, engine, Box::new(sink));

    let stats = coordinator.run().await.expect("Crawl failed");

    assert_eq!(stats.links_harvested, 6);
    assert_eq!(stats.records_extracted, 6);
    assert_eq!(stats.geocode_failures, 0);
    assert_eq!(stats.pool_refills, 1);

    // Every request went through a provisioned proxy
    let provisioned: HashSet<&str> = [
        "10.9.0.1:8080",
        "10.9.0.2:8080",
        "10.9.0.3:3128",
        "10.9.0.4:80",
    ]
    .into_iter()
    .collect();
    for proxy in transport.proxies.lock().unwrap().iter() {
        assert!(provisioned.contains(proxy.as_str()), "unexpected proxy {}", proxy);
    }

    let content = std::fs::read_to_string(&json_path).expect("JSON output missing");
    let records: serde_json::Value = serde_json::from_str(&content).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 6);

    let first = &records[0];
    assert_eq!(first["resortName"], "景区100");
    assert_eq!(first["poi_id"], 100);
    assert_eq!(first["areaName"], "三亚");
    assert_eq!(first["areaId"], 10030);
    assert_eq!(first["transInfo"], "公交 100 路");
    assert_eq!(first["lat"], 18.25);
    assert_eq!(first["lng"], 109.5);
    assert_eq!(first["source"], "mafengwo");
    assert!(first["ticketsInfo"].is_null());
    assert_eq!(records[5]["resortName"], "景区202");
}

#[tokio::test]
async fn test_dead_network_aborts_without_output() {
    let server = MockServer::start().await;
    mount_provisioning(&server).await;

    let dir = TempDir::new().unwrap();
    let json_path = dir.path().join("resorts.json");
    let config = create_test_config(
        &format!("{}/", server.uri()),
        json_path.to_str().unwrap(),
        50,
    );

    let transport = Arc::new(SiteTransport::new(dead_network));
    let engine = build_engine(&config, transport.clone());
    let sink = JsonFileSink::new(&config.output.json_path);
    let mut coordinator = Coordinator::new(&config, engine, Box::new(sink));

    let error = coordinator.run().await.unwrap_err();

    match error {
        HarvestError::NetworkUnavailable {
            phase,
            position,
            streak,
        } => {
            assert_eq!(phase, CrawlPhase::Listing);
            assert_eq!(position, 11);
            assert_eq!(streak, 11);
        }
        other => panic!("unexpected error: {}", other),
    }

    // Eleven pages, ten attempts each
    assert_eq!(transport.proxies.lock().unwrap().len(), 110);
    assert!(coordinator.statistics().proxies_evicted > 0);
    assert!(!json_path.exists());
}

#[tokio::test]
async fn test_provisioning_select_sends_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("types", "1"))
        .and(query_param("count", "5"))
        .and(query_param("country", "国内"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[["10.1.1.1", 8080, 10], ["10.1.1.2", "3128", 9]]"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&format!("{}/", server.uri()), "unused.json", 1);
    let client =
        HttpProvisioningClient::new(&config.proxy, Duration::from_secs(2), Duration::from_secs(2))
            .unwrap();

    let endpoints = client.select(1, 5, "国内").await.unwrap();

    let addresses: Vec<String> = endpoints.iter().map(|e| e.address()).collect();
    assert_eq!(addresses, vec!["10.1.1.1:8080", "10.1.1.2:3128"]);
}

#[tokio::test]
async fn test_provisioning_delete_by_host() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/delete"))
        .and(query_param("ip", "10.1.1.1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&format!("{}/", server.uri()), "unused.json", 1);
    let client =
        HttpProvisioningClient::new(&config.proxy, Duration::from_secs(2), Duration::from_secs(2))
            .unwrap();

    client.delete("10.1.1.1").await.unwrap();
}

#[tokio::test]
async fn test_provisioning_timeouts_are_retried_then_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_secs(2)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&format!("{}/", server.uri()), "unused.json", 1);
    let client = HttpProvisioningClient::new(
        &config.proxy,
        Duration::from_millis(200),
        Duration::from_millis(100),
    )
    .unwrap();

    let result = client.select(0, 5, "国内").await;

    assert!(matches!(
        result,
        Err(ProvisioningError::Exhausted { attempts: 3 })
    ));
}

#[tokio::test]
async fn test_provisioning_server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&format!("{}/", server.uri()), "unused.json", 1);
    let client =
        HttpProvisioningClient::new(&config.proxy, Duration::from_secs(2), Duration::from_secs(2))
            .unwrap();

    let result = client.select(0, 5, "国内").await;

    assert!(matches!(result, Err(ProvisioningError::Http(_))));
}

#[tokio::test]
async fn test_pool_refill_asks_each_bucket_for_the_shortfall() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("types", "0"))
        .and(query_param("count", "4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[["10.2.0.1", 8080], ["10.2.0.2", 8080]]"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("types", "1"))
        .and(query_param("count", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[["10.3.0.1", 8080], ["10.3.0.2", 8080]]"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&format!("{}/", server.uri()), "unused.json", 1);
    let client =
        HttpProvisioningClient::new(&config.proxy, Duration::from_secs(2), Duration::from_secs(2))
            .unwrap();
    let mut pool = ProxyPool::new(config.proxy.clone(), Arc::new(client));

    let address = pool.acquire().await.unwrap();

    assert_eq!(pool.len(), 4);
    assert_eq!(pool.credits(&address), Some(20));
    assert_eq!(pool.stats().refills, 1);
}
