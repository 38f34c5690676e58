//! Front-end protocols
//!
//! Every protocol the gateway accepts implements [`Protocol`]. The server
//! reads the first message of a connection and offers it to each registered
//! protocol in turn; the first one that recognizes it handles the
//! connection.
//!
//! # Adding a New Protocol
//!
//! 1. Create a new directory under `src/protocols/your_protocol/`
//! 2. Implement the [`Protocol`] trait
//! 3. Register it in [`crate::server::build_protocols`]

pub mod et;
pub mod socks5;

use crate::error::GatewayError;
use crate::net::Arg;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

pub use socks5::Socks5;

/// Trait that all front-end protocols must implement.
#[async_trait]
pub trait Protocol: Send + Sync + Debug {
    /// Human-readable name of this protocol
    fn name(&self) -> &str;

    /// Whether `first_msg` starts a conversation in this protocol.
    ///
    /// Must only look at the bytes: another protocol may get them next.
    fn matches(&self, first_msg: &[u8]) -> bool;

    /// Handle the connection carried by `arg`
    async fn handle(&self, arg: Arg) -> Result<(), GatewayError>;
}

/// Ordered set of protocols tried against each new connection
#[derive(Debug, Default, Clone)]
pub struct ProtocolRegistry {
    protocols: Vec<Arc<dyn Protocol>>,
}

impl ProtocolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            protocols: Vec::new(),
        }
    }

    /// Append a protocol; earlier registrations win ties
    pub fn register(&mut self, protocol: Arc<dyn Protocol>) {
        self.protocols.push(protocol);
    }

    /// First protocol that recognizes `first_msg`
    pub fn find(&self, first_msg: &[u8]) -> Option<Arc<dyn Protocol>> {
        self.protocols
            .iter()
            .find(|p| p.matches(first_msg))
            .cloned()
    }

    /// Names of the registered protocols, in order
    pub fn names(&self) -> Vec<&str> {
        self.protocols.iter().map(|p| p.name()).collect()
    }

    /// Number of registered protocols
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    /// Whether no protocol is registered
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Prefix(&'static str, u8);

    #[async_trait]
    impl Protocol for Prefix {
        fn name(&self) -> &str {
            self.0
        }

        fn matches(&self, first_msg: &[u8]) -> bool {
            first_msg.first() == Some(&self.1)
        }

        async fn handle(&self, _arg: Arg) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_new() {
        let registry = ProtocolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.find(&[5]).is_none());
    }

    #[test]
    fn test_registry_find_first_match() {
        let mut registry = ProtocolRegistry::new();
        registry.register(Arc::new(Prefix("first", 5)));
        registry.register(Arc::new(Prefix("second", 5)));
        registry.register(Arc::new(Prefix("http", b'G')));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["first", "second", "http"]);
        assert_eq!(registry.find(&[5, 1]).unwrap().name(), "first");
        assert_eq!(registry.find(b"GET /").unwrap().name(), "http");
        assert!(registry.find(&[4]).is_none());
        assert!(registry.find(&[]).is_none());
    }
}
