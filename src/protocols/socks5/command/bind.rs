//! SOCKS5 BIND
//!
//! BIND answers twice, both times through delegates run by the sender: once
//! when the listening side is ready (carrying its address), and once when
//! an inbound peer is accepted (carrying the peer address).

use super::reply::{build_reply, send_failure};
use super::{Command, CommandContext};
use crate::error::{GatewayError, Socks5ReplyCode};
use crate::helper::join_host_port;
use crate::net::{bind_delegate, Arg, BindDelegate, NetOp};
use crate::protocols::socks5::address::get_host_and_port;
use async_trait::async_trait;
use tracing::{debug, info};

/// Delegate writing a success reply that carries the address it is given
fn success_reply(ctx: &CommandContext) -> BindDelegate {
    let tunnel = ctx.tunnel.clone();
    bind_delegate(move |addr| async move {
        let reply = build_reply(Socks5ReplyCode::Succeeded, addr);
        tunnel.write_to_client_side(&reply).await.map(|_| ())
    })
}

/// BIND: accept one inbound stream for the client
#[derive(Debug, Clone, Copy, Default)]
pub struct Bind;

#[async_trait]
impl Command for Bind {
    fn name(&self) -> &'static str {
        "BIND"
    }

    async fn execute(&self, request: &[u8], ctx: &CommandContext) -> Result<(), GatewayError> {
        let (host, port) = get_host_and_port(request)?;
        let dest = join_host_port(&host, port);
        info!("SOCKS5 BIND for {} via {}", dest, ctx.sender.name());

        let arg = Arg::new(NetOp::Bind, dest, ctx.tunnel.clone())
            .with_bound_delegate(success_reply(ctx))
            .with_bind_delegate(success_reply(ctx));
        if let Err(e) = ctx.sender.send(arg).await {
            if let Err(reply_err) = send_failure(&ctx.tunnel, &e).await {
                debug!("Failed to report BIND failure: {}", reply_err);
            }
            return Err(e.at("bind"));
        }
        Ok(())
    }
}
