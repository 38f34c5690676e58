//! SOCKS5 CONNECT

use super::reply::{send_failure, send_reply};
use super::{Command, CommandContext};
use crate::error::{GatewayError, Socks5ReplyCode};
use crate::helper::join_host_port;
use crate::net::{Arg, NetOp};
use crate::protocols::socks5::address::get_host_and_port;
use async_trait::async_trait;
use tracing::{debug, info};

/// CONNECT: open a stream to the destination
#[derive(Debug, Clone, Copy, Default)]
pub struct Connect;

#[async_trait]
impl Command for Connect {
    fn name(&self) -> &'static str {
        "CONNECT"
    }

    async fn execute(&self, request: &[u8], ctx: &CommandContext) -> Result<(), GatewayError> {
        let (host, port) = get_host_and_port(request)?;
        let dest = join_host_port(&host, port);
        info!("SOCKS5 CONNECT to {} via {}", dest, ctx.sender.name());

        let arg = Arg::new(NetOp::Connect, dest, ctx.tunnel.clone());
        if let Err(e) = ctx.sender.send(arg).await {
            if let Err(reply_err) = send_failure(&ctx.tunnel, &e).await {
                debug!("Failed to report CONNECT failure: {}", reply_err);
            }
            return Err(e.at("connect"));
        }

        send_reply(&ctx.tunnel, Socks5ReplyCode::Succeeded, None).await
    }
}
