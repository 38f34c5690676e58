//! SOCKS5 commands
//!
//! Each command byte maps to a [`Command`] registered in a
//! [`CommandRegistry`]. The handler looks the byte up and runs whatever is
//! registered, so new commands only need a new registration.

mod bind;
mod connect;
mod reply;

pub use bind::Bind;
pub use connect::Connect;
pub use reply::{build_reply, send_failure, send_reply};

use crate::error::GatewayError;
use crate::net::Sender;
use crate::protocols::socks5::consts::{SOCKS5_CMD_TCP_BIND, SOCKS5_CMD_TCP_CONNECT};
use crate::tunnel::Tunnel;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Everything a command needs besides the request bytes
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Connection the request arrived on
    pub tunnel: Arc<Tunnel>,
    /// Executes the resulting network operation
    pub sender: Arc<dyn Sender>,
}

/// A SOCKS5 command implementation
#[async_trait]
pub trait Command: Send + Sync + Debug {
    /// Name for logs
    fn name(&self) -> &'static str;

    /// Run the command for the full `request` (starting at the version byte)
    async fn execute(&self, request: &[u8], ctx: &CommandContext) -> Result<(), GatewayError>;
}

/// Maps command bytes to their implementations
#[derive(Debug, Default, Clone)]
pub struct CommandRegistry {
    commands: HashMap<u8, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Registry with CONNECT and BIND
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SOCKS5_CMD_TCP_CONNECT, Arc::new(Connect));
        registry.register(SOCKS5_CMD_TCP_BIND, Arc::new(Bind));
        registry
    }

    /// Register `command` under `code`, replacing any previous one
    pub fn register(&mut self, code: u8, command: Arc<dyn Command>) {
        self.commands.insert(code, command);
    }

    /// Look up the command for `code`
    pub fn get(&self, code: u8) -> Option<Arc<dyn Command>> {
        self.commands.get(&code).cloned()
    }

    /// Registered command bytes
    pub fn codes(&self) -> Vec<u8> {
        let mut codes: Vec<u8> = self.commands.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Noop;

    #[async_trait]
    impl Command for Noop {
        fn name(&self) -> &'static str {
            "NOOP"
        }

        async fn execute(&self, _request: &[u8], _ctx: &CommandContext) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_new() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get(1).is_none());
    }

    #[test]
    fn test_registry_defaults() {
        let registry = CommandRegistry::with_defaults();
        assert_eq!(registry.codes(), vec![1, 2]);
        assert_eq!(registry.get(1).unwrap().name(), "CONNECT");
        assert_eq!(registry.get(2).unwrap().name(), "BIND");
        assert!(registry.get(3).is_none());
    }

    #[test]
    fn test_registry_extend_and_overwrite() {
        let mut registry = CommandRegistry::with_defaults();
        registry.register(0x03, Arc::new(Noop));
        assert_eq!(registry.len(), 3);
        registry.register(0x01, Arc::new(Noop));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get(1).unwrap().name(), "NOOP");
    }
}
