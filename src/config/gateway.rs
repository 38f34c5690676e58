//! Gateway configuration types
//!
//! Defines the on-disk configuration of the gateway.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Port appended to endpoints that do not name one
pub const DEFAULT_PORT: u16 = 8080;

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_proxy_status() -> String {
    "enable".to_string()
}

/// Default dial timeout in seconds
fn default_timeout() -> u64 {
    crate::helper::DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_buffer_size() -> usize {
    crate::pool::DEFAULT_BUFFER_SIZE
}

fn default_direct_locations() -> Vec<String> {
    vec!["CN".to_string()]
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Gateway configuration
    pub gateway: GatewayConfig,
}

/// Gateway configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Comma-separated local endpoints to accept clients on
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Remote relay endpoint
    pub relay: String,

    /// `enable` or `smart`, in any letter case
    #[serde(default = "default_proxy_status")]
    pub proxy_status: String,

    /// Dial timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Size class of the request buffer pool
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Locations reached without the relay in smart mode
    #[serde(default = "default_direct_locations")]
    pub direct_locations: Vec<String>,
}

/// Append [`DEFAULT_PORT`] to an endpoint that has none.
///
/// Only a bare IPv4 literal (`192.168.0.1`) or a bracketed IPv6 literal
/// (`[::1]`) gains a port. Everything else is returned unchanged; a bare
/// IPv6 literal is ambiguous (`::1:9000`) and is left for the socket-address
/// parser to reject.
pub fn complete_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    let bracketed = endpoint
        .strip_prefix('[')
        .and_then(|e| e.strip_suffix(']'))
        .map_or(false, |inner| inner.parse::<Ipv6Addr>().is_ok());
    if bracketed || endpoint.parse::<Ipv4Addr>().is_ok() {
        format!("{}:{}", endpoint, DEFAULT_PORT)
    } else {
        endpoint.to_string()
    }
}

impl GatewayConfig {
    /// Listen endpoints with ports completed
    pub fn listen_endpoints(&self) -> Vec<String> {
        self.listen
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(complete_endpoint)
            .collect()
    }

    /// Relay endpoint with port completed
    pub fn relay_endpoint(&self) -> String {
        complete_endpoint(&self.relay)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_endpoints().is_empty() {
            return Err("no listen endpoint configured".to_string());
        }
        if self.relay.trim().is_empty() {
            return Err("relay endpoint is empty".to_string());
        }
        if self.buffer_size == 0 {
            return Err("buffer_size must be greater than zero".to_string());
        }
        if self.timeout == 0 {
            return Err("timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}
