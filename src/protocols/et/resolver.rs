//! Destination location lookup for the smart proxy

use super::netarg::NetArg;
use super::relay::Relay;
use super::types::EtType;
use crate::error::GatewayError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Finds out where a destination is located
#[async_trait]
pub trait LocationResolver: Send + Sync + Debug {
    /// Location code (for example `CN`) of the destination of `arg`
    async fn locate(&self, arg: &NetArg) -> Result<String, GatewayError>;
}

/// Resolver that asks the relay with DNS and LOCATION requests
#[derive(Debug, Clone)]
pub struct RelayResolver {
    relay: Relay,
    cache: Arc<Mutex<HashMap<IpAddr, String>>>,
}

impl RelayResolver {
    /// Create a resolver backed by `relay`
    pub fn new(relay: Relay) -> Self {
        RelayResolver {
            relay,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolve `domain` through the relay (`the_type` is DNS or DNS6)
    pub async fn resolve(&self, domain: &str, the_type: EtType) -> Result<IpAddr, GatewayError> {
        let reply = self
            .relay
            .ask(&NetArg::for_domain(the_type, domain))
            .await?;
        reply.parse().map_err(|_| {
            GatewayError::Relay(format!("{} {} answered {:?}", the_type, domain, reply))
        })
    }

    fn cached(&self, ip: &IpAddr) -> Option<String> {
        self.cache.lock().ok()?.get(ip).cloned()
    }

    fn remember(&self, ip: IpAddr, location: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(ip, location.to_string());
        }
    }
}

#[async_trait]
impl LocationResolver for RelayResolver {
    async fn locate(&self, arg: &NetArg) -> Result<String, GatewayError> {
        let ip = match (arg.ip, arg.domain.as_deref()) {
            (Some(ip), _) => ip,
            (None, Some(domain)) => self.resolve(domain, EtType::Dns).await?,
            (None, None) => {
                return Err(GatewayError::Translation(
                    "nothing to locate".to_string(),
                ))
            }
        };
        if let Some(location) = self.cached(&ip) {
            return Ok(location);
        }

        let location = self
            .relay
            .ask(&NetArg::for_ip(EtType::Location, ip))
            .await?;
        if location.is_empty() {
            return Err(GatewayError::Relay(format!("no location for {}", ip)));
        }
        debug!("Location of {} is {}", ip, location);
        self.remember(ip, &location);
        Ok(location)
    }
}
