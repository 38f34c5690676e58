//! SOCKS5 front-end for etgate
//!
//! Accepts SOCKS5 clients on the local network, decodes their requests and
//! hands the resulting operations to a [`Sender`](crate::net::Sender).
//! Authentication is not negotiated: the handshake always answers
//! "no authentication".

pub mod address;
pub mod command;
mod consts;
mod handler;

pub use address::{get_host, get_host_and_port, get_port};
pub use command::{Bind, Command, CommandContext, CommandRegistry, Connect};
pub use consts::*;
pub use handler::Socks5;
