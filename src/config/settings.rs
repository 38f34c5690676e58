//! Runtime settings
//!
//! [`Settings`] is built once at startup from [`GatewayConfig`] and shared
//! read-only with every connection.

use super::GatewayConfig;
use crate::helper::duration_from_secs;
use crate::protocols::et::ProxyStatus;
use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

/// Validated, parsed gateway settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Addresses to accept clients on
    pub listen: Vec<SocketAddr>,
    /// Relay endpoint
    pub relay: String,
    /// Tunnel every request or decide per destination
    pub proxy_status: ProxyStatus,
    /// Dial timeout
    pub timeout: Duration,
    /// Size class of the request buffer pool
    pub buffer_size: usize,
    /// Locations reached without the relay in smart mode
    pub direct_locations: Vec<String>,
}

impl Settings {
    /// Build settings from the configuration file contents
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let proxy_status = ProxyStatus::parse(&config.proxy_status);
        if proxy_status == ProxyStatus::Error {
            bail!("invalid proxy_status: {:?}", config.proxy_status);
        }

        let listen = config
            .listen_endpoints()
            .iter()
            .map(|e| {
                e.parse::<SocketAddr>()
                    .with_context(|| format!("invalid listen endpoint: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Settings {
            listen,
            relay: config.relay_endpoint(),
            proxy_status,
            timeout: duration_from_secs(config.timeout),
            buffer_size: config.buffer_size,
            direct_locations: config.direct_locations.clone(),
        })
    }

    /// Whether `location` is reached without the relay
    pub fn is_direct_location(&self, location: &str) -> bool {
        self.direct_locations
            .iter()
            .any(|l| l.eq_ignore_ascii_case(location))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listen: vec![SocketAddr::from(([127, 0, 0, 1], super::DEFAULT_PORT))],
            relay: format!("127.0.0.1:{}", super::DEFAULT_PORT + 1),
            proxy_status: ProxyStatus::Enable,
            timeout: duration_from_secs(crate::helper::DEFAULT_CONNECT_TIMEOUT_SECS),
            buffer_size: crate::pool::DEFAULT_BUFFER_SIZE,
            direct_locations: vec!["CN".to_string()],
        }
    }
}
