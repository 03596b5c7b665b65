//! Credit-tracking proxy pool
//!
//! Every held proxy carries a credit allowance. Credits are spent on use and on
//! failure; a proxy whose credits reach zero is evicted and reported to the
//! provisioning service. An empty pool refills itself before handing anything out.

use crate::config::ProxyConfig;
use crate::proxy::provisioning::ProvisioningClient;
use crate::ProvisioningError;
use std::collections::HashMap;
use std::sync::Arc;

/// A proxy endpoint held by the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRecord {
    /// `host:port`
    pub address: String,

    /// Remaining credit allowance (always positive while held)
    pub credits: i64,
}

/// Outcome of charging a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Penalty {
    /// Credits were deducted and the proxy stays in the pool
    Charged { remaining: i64 },

    /// Credits ran out and the proxy was evicted
    Evicted,

    /// The address is not held (already evicted)
    Unknown,
}

/// Lifetime counters for a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub refills: u32,
    pub provisioned: u32,
    pub evictions: u32,
}

/// Pool of proxy endpoints with per-endpoint credits
///
/// The pool is owned by a single fetch engine and mutated through `&mut self`
/// only, so decrement-and-evict is never interleaved.
pub struct ProxyPool {
    records: Vec<ProxyRecord>,
    index: HashMap<String, usize>,
    provisioning: Arc<dyn ProvisioningClient>,
    config: ProxyConfig,
    rng: fastrand::Rng,
    stats: PoolStats,
}

impl ProxyPool {
    /// Creates an empty pool; the first `acquire` triggers a refill
    pub fn new(config: ProxyConfig, provisioning: Arc<dyn ProvisioningClient>) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            provisioning,
            config,
            rng: fastrand::Rng::new(),
            stats: PoolStats::default(),
        }
    }

    /// Seeds proxy selection, for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Returns a proxy address chosen uniformly at random
    ///
    /// Refills first if the pool is empty. Does not charge credits.
    pub async fn acquire(&mut self) -> Result<String, ProvisioningError> {
        if self.records.is_empty() {
            self.refill().await?;
        }

        let pick = self.rng.usize(..self.records.len());
        Ok(self.records[pick].address.clone())
    }

    /// Deducts `amount` credits from `address`, evicting it at zero or below
    ///
    /// The eviction notice is best effort: a provisioning failure is logged and
    /// never surfaces to the caller.
    pub async fn penalize(&mut self, address: &str, amount: i64) -> Penalty {
        let Some(&slot) = self.index.get(address) else {
            return Penalty::Unknown;
        };

        let record = &mut self.records[slot];
        record.credits -= amount;
        let remaining = record.credits;

        if remaining > 0 {
            tracing::debug!(proxy = address, amount, remaining, "Proxy charged");
            return Penalty::Charged { remaining };
        }

        self.remove(slot);
        self.stats.evictions += 1;
        tracing::info!(proxy = address, pool_size = self.records.len(), "Proxy evicted");

        let host = host_of(address);
        if let Err(e) = self.provisioning.delete(host).await {
            tracing::warn!(proxy = address, error = %e, "Failed to send eviction notice");
        }

        Penalty::Evicted
    }

    /// Requests fresh proxies until the configured pool size is met
    ///
    /// Type buckets are asked in turn, each for the shortfall left so far, and
    /// the walk repeats until the pool is full or `max-api-attempts` requests
    /// have been made. Only then is a partial pool accepted; ending up with no
    /// proxies at all is fatal.
    pub async fn refill(&mut self) -> Result<usize, ProvisioningError> {
        let target = self.config.pool_size;
        let max_requests = self.config.max_api_attempts;
        let buckets = self.config.type_buckets.clone();
        let mut acquired = 0;
        let mut requests = 0;

        tracing::debug!(target, "Refilling proxy pool");

        for &bucket in buckets.iter().cycle() {
            if acquired >= target || requests >= max_requests {
                break;
            }

            let wanted = target - acquired;
            let batch = self
                .provisioning
                .select(bucket, wanted, &self.config.region)
                .await?;
            requests += 1;

            tracing::debug!(bucket, requested = wanted, received = batch.len(), "Provisioning batch");

            for endpoint in batch {
                if acquired >= target {
                    break;
                }
                if self.insert(endpoint.address()) {
                    acquired += 1;
                }
            }
        }

        self.stats.refills += 1;
        self.stats.provisioned += acquired as u32;

        if self.records.is_empty() {
            return Err(ProvisioningError::Exhausted { attempts: requests });
        }

        if acquired < target {
            tracing::warn!(acquired, target, requests, "Proxy pool refilled with a partial batch");
        } else {
            tracing::info!(acquired, requests, "Proxy pool refilled");
        }

        Ok(acquired)
    }

    /// Returns the held record for an address
    pub fn get(&self, address: &str) -> Option<&ProxyRecord> {
        self.index.get(address).map(|&slot| &self.records[slot])
    }

    /// Returns the credits held by an address
    pub fn credits(&self, address: &str) -> Option<i64> {
        self.get(address).map(|record| record.credits)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    fn insert(&mut self, address: String) -> bool {
        if self.index.contains_key(&address) {
            return false;
        }

        self.index.insert(address.clone(), self.records.len());
        self.records.push(ProxyRecord {
            address,
            credits: self.config.max_credits,
        });
        true
    }

    fn remove(&mut self, slot: usize) {
        let removed = self.records.swap_remove(slot);
        self.index.remove(&removed.address);

        // swap_remove moved the last record into `slot`
        if let Some(moved) = self.records.get(slot) {
            self.index.insert(moved.address.clone(), slot);
        }
    }
}

fn host_of(address: &str) -> &str {
    address.rsplit_once(':').map_or(address, |(host, _)| host)
}
