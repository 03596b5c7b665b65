//! Proxy provisioning client
//!
//! The provisioning service hands out batches of proxy endpoints and accepts
//! eviction notices for endpoints the harvester has given up on.

use crate::config::ProxyConfig;
use crate::ProvisioningError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

/// A proxy endpoint as returned by the provisioning service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the `host:port` address used as the pool key
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Capability the proxy pool depends on for fresh endpoints
#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    /// Requests up to `count` endpoints of the given type bucket in `region`
    ///
    /// A partial batch is a valid answer.
    async fn select(
        &self,
        proxy_type: u32,
        count: usize,
        region: &str,
    ) -> Result<Vec<ProxyEndpoint>, ProvisioningError>;

    /// Tells the service that every endpoint on `host` should be dropped
    async fn delete(&self, host: &str) -> Result<(), ProvisioningError>;
}

/// Provisioning client for an IPProxyPool-style HTTP API
///
/// `select` is `GET {api}?types=T&count=N&country=R` returning a JSON array
/// of `[host, port, ...]` tuples; `delete` is `GET {api}delete?ip=H`.
pub struct HttpProvisioningClient {
    client: Client,
    api_url: Url,
    delete_url: Url,
    max_attempts: u32,
}

impl HttpProvisioningClient {
    /// Creates a client from the proxy configuration
    ///
    /// Provisioning calls use the same connect/read timeout pair as page fetches.
    pub fn new(
        config: &ProxyConfig,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, crate::HarvestError> {
        let api_url = Url::parse(&config.api_url)?;
        let delete_url = api_url.join("delete")?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(connect_timeout + read_timeout)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            api_url,
            delete_url,
            max_attempts: config.max_api_attempts,
        })
    }

    /// Sends a provisioning request, retrying timeouts only
    ///
    /// Timeouts are retried up to `max_attempts` times with no delay; any
    /// other failure is returned immediately.
    async fn request_api(
        &self,
        url: &Url,
        params: &[(&str, String)],
    ) -> Result<String, ProvisioningError> {
        let mut attempt = 1;

        loop {
            let result = self.client.get(url.clone()).query(params).send().await;

            let error = match result {
                Ok(response) => match response.error_for_status() {
                    Ok(response) => {
                        return response
                            .text()
                            .await
                            .map_err(|e| ProvisioningError::Decode(e.to_string()));
                    }
                    Err(e) => e,
                },
                Err(e) => e,
            };

            if !error.is_timeout() {
                return Err(ProvisioningError::Http(error.to_string()));
            }

            tracing::warn!(attempt, url = %url, "Provisioning request timed out");
            if attempt >= self.max_attempts {
                return Err(ProvisioningError::Exhausted { attempts: attempt });
            }
            attempt += 1;
        }
    }
}

#[async_trait]
impl ProvisioningClient for HttpProvisioningClient {
    async fn select(
        &self,
        proxy_type: u32,
        count: usize,
        region: &str,
    ) -> Result<Vec<ProxyEndpoint>, ProvisioningError> {
        let params = [
            ("types", proxy_type.to_string()),
            ("count", count.to_string()),
            ("country", region.to_string()),
        ];

        let body = self.request_api(&self.api_url, &params).await?;
        parse_endpoints(&body)
    }

    async fn delete(&self, host: &str) -> Result<(), ProvisioningError> {
        let params = [("ip", host.to_string())];
        self.request_api(&self.delete_url, &params).await?;
        Ok(())
    }
}

/// Parses a `[[host, port, ...], ...]` payload
///
/// Ports may arrive as numbers or numeric strings. Trailing tuple members
/// (scores, speeds) are ignored.
pub(crate) fn parse_endpoints(body: &str) -> Result<Vec<ProxyEndpoint>, ProvisioningError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ProvisioningError::Decode(e.to_string()))?;

    let entries = value
        .as_array()
        .ok_or_else(|| ProvisioningError::Decode("expected a JSON array".to_string()))?;

    entries
        .iter()
        .map(|entry| {
            let host = entry
                .get(0)
                .and_then(Value::as_str)
                .ok_or_else(|| ProvisioningError::Decode(format!("missing host in {}", entry)))?;

            let port = match entry.get(1) {
                Some(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
                Some(Value::String(s)) => s.trim().parse::<u16>().ok(),
                _ => None,
            }
            .ok_or_else(|| ProvisioningError::Decode(format!("invalid port in {}", entry)))?;

            Ok(ProxyEndpoint::new(host, port))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoints() {
        let body = r#"[["10.0.0.1", 8080, 10], ["10.0.0.2", "3128", 7]]"#;
        let endpoints = parse_endpoints(body).unwrap();

        assert_eq!(
            endpoints,
            vec![
                ProxyEndpoint::new("10.0.0.1", 8080),
                ProxyEndpoint::new("10.0.0.2", 3128),
            ]
        );
    }

    #[test]
    fn test_parse_empty_batch() {
        assert!(parse_endpoints("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_payloads() {
        assert!(matches!(
            parse_endpoints(r#"{"error": "nope"}"#),
            Err(ProvisioningError::Decode(_))
        ));
        assert!(parse_endpoints(r#"[["10.0.0.1", 99999]]"#).is_err());
        assert!(parse_endpoints(r#"[[8080, "10.0.0.1"]]"#).is_err());
        assert!(parse_endpoints("not json").is_err());
    }

    #[test]
    fn test_endpoint_address() {
        let endpoint = ProxyEndpoint::new("10.0.0.1", 8080);
        assert_eq!(endpoint.address(), "10.0.0.1:8080");
        assert_eq!(endpoint.to_string(), "10.0.0.1:8080");
    }

    #[test]
    fn test_delete_url_is_relative_to_api() {
        let config = ProxyConfig {
            api_url: "http://127.0.0.1:8000/".to_string(),
            pool_size: 5,
            max_credits: 20,
            region: "国内".to_string(),
            type_buckets: vec![0, 1],
            max_api_attempts: 10,
        };
        let client =
            HttpProvisioningClient::new(&config, Duration::from_secs(1), Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.delete_url.as_str(), "http://127.0.0.1:8000/delete");
    }
}
