//! In-memory fakes for the fetch engine's collaborators

use crate::config::{FetchConfig, ProxyConfig};
use crate::crawler::fetcher::FetchEngine;
use crate::crawler::transport::{RequestSpec, Transport, TransportError, TransportResponse};
use crate::proxy::{ProvisioningClient, ProxyEndpoint, ProxyPool};
use crate::ProvisioningError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Provisioning service that always has fresh proxies
#[derive(Default)]
pub(crate) struct EndlessProvisioning {
    next: AtomicU32,
    pub selects: AtomicU32,
    pub deletes: Mutex<Vec<String>>,
}

#[async_trait]
impl ProvisioningClient for EndlessProvisioning {
    async fn select(
        &self,
        _proxy_type: u32,
        count: usize,
        _region: &str,
    ) -> Result<Vec<ProxyEndpoint>, ProvisioningError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        Ok((0..count)
            .map(|_| {
                let n = self.next.fetch_add(1, Ordering::SeqCst);
                ProxyEndpoint::new(format!("10.{}.{}.{}", n >> 16, (n >> 8) & 0xff, n & 0xff), 8080)
            })
            .collect())
    }

    async fn delete(&self, host: &str) -> Result<(), ProvisioningError> {
        self.deletes.lock().unwrap().push(host.to_string());
        Ok(())
    }
}

type Handler =
    dyn Fn(&RequestSpec, usize) -> Result<TransportResponse, TransportError> + Send + Sync;

/// Transport answering every request from a closure
///
/// The closure receives the request and the zero-based index of the call.
pub(crate) struct FnTransport {
    handler: Box<Handler>,
    pub calls: Mutex<Vec<(String, RequestSpec)>>,
    pub forgotten: Mutex<Vec<String>>,
}

impl FnTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&RequestSpec, usize) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            forgotten: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn proxies_used(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(proxy, _)| proxy.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for FnTransport {
    async fn execute(
        &self,
        proxy: &str,
        request: &RequestSpec,
        _user_agent: &str,
    ) -> Result<TransportResponse, TransportError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((proxy.to_string(), request.clone()));
            calls.len() - 1
        };
        (self.handler)(request, index)
    }

    fn forget(&self, proxy: &str) {
        self.forgotten.lock().unwrap().push(proxy.to_string());
    }
}

pub(crate) fn ok(body: &str) -> Result<TransportResponse, TransportError> {
    status(200, body)
}

pub(crate) fn status(code: u16, body: &str) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse {
        status: code,
        body: body.to_string(),
    })
}

pub(crate) fn proxy_config(pool_size: usize) -> ProxyConfig {
    ProxyConfig {
        api_url: "http://127.0.0.1:8000/".to_string(),
        pool_size,
        max_credits: 20,
        region: "国内".to_string(),
        type_buckets: vec![0, 1],
        max_api_attempts: 10,
    }
}

pub(crate) fn engine_with(
    transport: Arc<FnTransport>,
    provisioning: Arc<EndlessProvisioning>,
    pool_size: usize,
) -> FetchEngine {
    let pool = ProxyPool::new(proxy_config(pool_size), provisioning).with_seed(7);
    FetchEngine::new(pool, transport, FetchConfig::default())
}
