//! Proxy-rotating fetch engine
//!
//! This module issues one logical request at a time:
//! - Acquiring a proxy from the pool for every attempt
//! - Charging the proxy a usage cost, plus a punishment when the attempt fails
//! - Retrying recoverable failures through a freshly acquired proxy
//! - Giving up after a bounded number of attempts or on a terminal error

use crate::config::FetchConfig;
use crate::crawler::transport::{RequestSpec, Transport, TransportError};
use crate::proxy::{Penalty, ProxyPool};
use crate::ProvisioningError;
use std::fmt;
use std::sync::Arc;

/// Result of a logical fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// A 2xx response with a decodable body
    Success {
        /// Page body
        body: String,
        /// Proxy the successful attempt went through
        final_address: String,
    },

    /// The fetch engine gave up on this request
    Failure {
        /// Why the engine gave up
        kind: FailureKind,
        /// Underlying HTTP attempts made
        attempts_made: u32,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Why a logical fetch ended without a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Every allowed attempt hit a recoverable failure
    RetriesExhausted { last_error: String },

    /// A request-level error outside the recoverable set
    NonRecoverable(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetriesExhausted { last_error } => {
                write!(f, "retries exhausted (last error: {})", last_error)
            }
            Self::NonRecoverable(error) => write!(f, "non-recoverable: {}", error),
        }
    }
}

/// Attempt counters across the engine's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

/// Issues requests through a proxy pool with proxy-scoped retries
pub struct FetchEngine {
    pool: ProxyPool,
    transport: Arc<dyn Transport>,
    config: FetchConfig,
    rng: fastrand::Rng,
    stats: EngineStats,
}

impl FetchEngine {
    pub fn new(pool: ProxyPool, transport: Arc<dyn Transport>, config: FetchConfig) -> Self {
        Self {
            pool,
            transport,
            config,
            rng: fastrand::Rng::new(),
            stats: EngineStats::default(),
        }
    }

    /// Fetches a request, retrying recoverable failures through new proxies
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx, body decodable | Success |
    /// | Non-2xx status | Punish proxy, retry |
    /// | Timeout / proxy error / redirect loop | Punish proxy, retry |
    /// | Attempts exhausted | Failure |
    /// | Any other request error | Punish proxy, Failure |
    ///
    /// # Returns
    ///
    /// * `Ok(FetchOutcome)` - The request succeeded or was given up on
    /// * `Err(ProvisioningError)` - The pool could not be refilled; the crawl cannot proceed
    pub async fn fetch(&mut self, request: &RequestSpec) -> Result<FetchOutcome, ProvisioningError> {
        let mut attempts_made = 0;

        loop {
            let address = self.pool.acquire().await?;
            let user_agent = self.pick_user_agent();
            attempts_made += 1;
            self.stats.attempts += 1;

            let error = match self.transport.execute(&address, request, &user_agent).await {
                Ok(response) if response.is_success() => {
                    self.charge(&address, self.config.use_cost).await;
                    self.stats.successes += 1;
                    tracing::debug!(
                        url = %request,
                        proxy = %address,
                        attempt = attempts_made,
                        "Page fetched"
                    );
                    return Ok(FetchOutcome::Success {
                        body: response.body,
                        final_address: address,
                    });
                }
                Ok(response) => TransportError::Status(response.status),
                Err(e) => e,
            };

            self.charge(&address, self.config.use_cost + self.config.punish)
                .await;

            if !error.is_recoverable() {
                self.stats.failures += 1;
                tracing::warn!(url = %request, proxy = %address, error = %error, "Non-recoverable fetch error");
                return Ok(FetchOutcome::Failure {
                    kind: FailureKind::NonRecoverable(error.to_string()),
                    attempts_made,
                });
            }

            tracing::debug!(
                url = %request,
                proxy = %address,
                attempt = attempts_made,
                error = %error,
                "Recoverable fetch error"
            );

            if attempts_made >= self.config.max_attempts {
                self.stats.failures += 1;
                tracing::warn!(url = %request, attempts = attempts_made, "Exceeded maximum retry attempts");
                return Ok(FetchOutcome::Failure {
                    kind: FailureKind::RetriesExhausted {
                        last_error: error.to_string(),
                    },
                    attempts_made,
                });
            }
        }
    }

    /// Punishes a proxy whose response the caller rejected
    pub async fn penalize(&mut self, address: &str) -> Penalty {
        self.charge(address, self.config.punish).await
    }

    pub fn pool(&self) -> &ProxyPool {
        &self.pool
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    async fn charge(&mut self, address: &str, amount: i64) -> Penalty {
        if amount <= 0 {
            return match self.pool.credits(address) {
                Some(remaining) => Penalty::Charged { remaining },
                None => Penalty::Unknown,
            };
        }

        let penalty = self.pool.penalize(address, amount).await;
        if penalty == Penalty::Evicted {
            self.transport.forget(address);
        }
        penalty
    }

    fn pick_user_agent(&mut self) -> String {
        let agents: Vec<&String> = self
            .config
            .user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect();

        if agents.is_empty() {
            return String::new();
        }
        agents[self.rng.usize(..agents.len())].clone()
    }
}
