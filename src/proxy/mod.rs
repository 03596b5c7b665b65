//! Proxy module for endpoint lifecycle management
//!
//! This module contains:
//! - The credit-tracking proxy pool handed to the fetch engine
//! - The provisioning client capability the pool refills from
//! - An HTTP implementation of that capability for IPProxyPool-style services

mod pool;
mod provisioning;

pub use pool::{Penalty, PoolStats, ProxyPool, ProxyRecord};
pub use provisioning::{HttpProvisioningClient, ProvisioningClient, ProxyEndpoint};
