//! Main SOCKS5 handler
//!
//! Runs the per-connection state machine: source check, version check and
//! handshake reply, request read, command dispatch. Every stage failure is
//! returned with the stage name prefixed; the caller closes the tunnel.

use super::command::{Command, CommandContext, CommandRegistry};
use super::consts::*;
use crate::error::{GatewayError, Socks5Error};
use crate::helper::is_allowed_source;
use crate::net::{Arg, Sender};
use crate::pool::BufferPool;
use crate::protocols::Protocol;
use crate::tunnel::Tunnel;
use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use tracing::debug;

const STAGE_HANDSHAKE: &str = "socks5 handshake";
const STAGE_READ: &str = "socks5 read";
const STAGE_DISPATCH: &str = "socks5 dispatch";

/// SOCKS5 front-end
#[derive(Debug, Clone)]
pub struct Socks5 {
    commands: Arc<CommandRegistry>,
    sender: Arc<dyn Sender>,
    pool: BufferPool,
}

impl Socks5 {
    /// Create a handler dispatching to `commands` and executing through `sender`
    pub fn new(commands: Arc<CommandRegistry>, sender: Arc<dyn Sender>, pool: BufferPool) -> Self {
        Socks5 {
            commands,
            sender,
            pool,
        }
    }

    /// Handler with the default CONNECT and BIND commands
    pub fn with_default_commands(sender: Arc<dyn Sender>, pool: BufferPool) -> Self {
        Self::new(Arc::new(CommandRegistry::with_defaults()), sender, pool)
    }

    fn get_command(&self, request: &[u8]) -> Result<Arc<dyn Command>, GatewayError> {
        let code = *request
            .get(CMD_OFFSET)
            .ok_or(Socks5Error::RequestTooShort {
                need: CMD_OFFSET + 1,
                got: request.len(),
            })?;
        self.commands
            .get(code)
            .ok_or_else(|| Socks5Error::InvalidCommand(code).into())
    }
}

/// Reject missing tunnels and clients outside the local network
fn check_tunnel(tunnel: Option<&Arc<Tunnel>>) -> Result<&Arc<Tunnel>, GatewayError> {
    let tunnel = tunnel.ok_or_else(|| GatewayError::Policy("tunnel is absent".to_string()))?;
    let source = tunnel.remote_address_of_client_side().ip();
    if !is_allowed_source(source) {
        return Err(GatewayError::Policy(format!(
            "invalid source IP type: public {}",
            source
        )));
    }
    Ok(tunnel)
}

/// Check the version byte of the first message and send the handshake reply
async fn check_version(first_msg: &[u8], tunnel: &Tunnel) -> Result<(), GatewayError> {
    let version = *first_msg
        .first()
        .ok_or(Socks5Error::RequestTooShort { need: 1, got: 0 })?;
    if version != SOCKS5_VERSION {
        return Err(Socks5Error::InvalidVersion(version).into());
    }
    let n = tunnel.write_to_client_side(&SOCKS5_HANDSHAKE_REPLY).await?;
    if n < SOCKS5_HANDSHAKE_REPLY.len() {
        return Err(io::Error::new(io::ErrorKind::WriteZero, "fail to reply").into());
    }
    Ok(())
}

/// Read the request into a pooled buffer and copy it out
async fn read_request(tunnel: &Tunnel, pool: &BufferPool) -> Result<Vec<u8>, GatewayError> {
    let mut buf = pool.acquire();
    let n = tunnel.read_from_client_side(&mut buf).await?;
    if n == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no request").into());
    }
    Ok(buf.to_vec(n))
}

#[async_trait]
impl Protocol for Socks5 {
    fn name(&self) -> &str {
        "SOCKS"
    }

    fn matches(&self, first_msg: &[u8]) -> bool {
        first_msg.first() == Some(&SOCKS5_VERSION)
    }

    async fn handle(&self, arg: Arg) -> Result<(), GatewayError> {
        let tunnel = check_tunnel(arg.tunnel.as_ref())
            .map_err(|e| e.at(STAGE_HANDSHAKE))?
            .clone();
        check_version(&arg.msg, &tunnel)
            .await
            .map_err(|e| e.at(STAGE_HANDSHAKE))?;

        let request = read_request(&tunnel, &self.pool)
            .await
            .map_err(|e| e.at(STAGE_READ))?;

        let command = self
            .get_command(&request)
            .map_err(|e| e.at(STAGE_DISPATCH))?;
        debug!(
            "SOCKS5 {} from {}",
            command.name(),
            tunnel.remote_address_of_client_side()
        );

        let ctx = CommandContext {
            tunnel,
            sender: self.sender.clone(),
        };
        command
            .execute(&request, &ctx)
            .await
            .map_err(|e| e.at(STAGE_DISPATCH))
    }
}
