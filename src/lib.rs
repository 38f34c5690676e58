//! # Etgate - SOCKS5 Front-End for an ET Relay
//!
//! Etgate accepts SOCKS5 clients on local or private addresses and hands each
//! CONNECT or BIND request to a sender. The ET sender either dials the
//! destination itself or asks a remote ET relay to do it, depending on the
//! configured proxy status and, in smart mode, on where the destination lives.
//!
//! ## Features
//!
//! - **Protocol Sniffing**: the first message of a connection selects the protocol
//! - **SOCKS5 CONNECT and BIND**: no authentication, IPv4, IPv6 and domain targets
//! - **Source Policy**: only loopback and private-network clients are served
//! - **Smart Routing**: per-destination choice between direct dialing and the relay
//!
//! ## Usage
//!
//! ```rust,ignore
//! use etgate::config::{load_config, Settings};
//! use etgate::server::run_gateway;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let settings = Settings::from_config(&config.gateway)?;
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     run_gateway(settings, shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Etgate -> ET Relay -> Target
//!                        \-> Target (direct)
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod helper;
pub mod net;
pub mod pool;
pub mod protocols;
pub mod server;
pub mod tunnel;

// Re-export commonly used items
pub use config::{load_config, Config, Settings};
pub use error::{ErrorKind, GatewayError, Socks5Error};
pub use net::{Arg, NetOp, Sender};
pub use server::run_gateway;
pub use tunnel::Tunnel;

/// Version of the Etgate library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
