//! ET protocol module for etgate
//!
//! ET is the protocol spoken with the remote relay. This module holds its
//! vocabulary, the translation from generic operations to ET requests, and
//! the senders that execute those requests.

mod direct;
mod netarg;
pub mod relay;
mod resolver;
mod sender;
mod types;

pub use direct::DirectSender;
pub use netarg::{et_type_of, NetArg};
pub use relay::Relay;
pub use resolver::{LocationResolver, RelayResolver};
pub use sender::EtSender;
pub use types::{EtType, ProxyStatus};
