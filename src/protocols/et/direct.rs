//! Direct (untunneled) execution of ET requests
//!
//! Used for destinations the smart proxy decides not to tunnel, and as a
//! stand-alone [`Sender`] when no relay is involved.

use super::netarg::NetArg;
use super::types::EtType;
use crate::error::GatewayError;
use crate::helper::join_host_port;
use crate::net::{Arg, Sender};
use crate::tunnel::Tunnel;
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

fn no_tunnel() -> GatewayError {
    io::Error::new(io::ErrorKind::NotConnected, "request has no tunnel").into()
}

fn timed_out(what: String) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, what)
}

/// Sender that reaches destinations from this host
#[derive(Debug, Clone)]
pub struct DirectSender {
    timeout: Duration,
}

impl DirectSender {
    /// Create a direct sender with the given dial/accept timeout
    pub fn new(timeout: Duration) -> Self {
        DirectSender { timeout }
    }

    /// Execute an already translated request
    pub async fn dispatch(&self, arg: NetArg) -> Result<(), GatewayError> {
        match arg.the_type {
            EtType::Tcp => self.connect(arg).await,
            EtType::Bind => self.bind(arg).await,
            other => Err(GatewayError::Translation(format!(
                "{} cannot be sent directly",
                other
            ))),
        }
    }

    async fn connect(&self, arg: NetArg) -> Result<(), GatewayError> {
        let tunnel = arg.tunnel.clone().ok_or_else(no_tunnel)?;
        let port = arg.port_number()?;
        let dest = arg
            .destination()
            .ok_or_else(|| GatewayError::Translation("TCP request without destination".into()))?;
        let addr = join_host_port(&dest, port);

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| timed_out(format!("timeout connecting to {}", addr)))??;
        stream.set_nodelay(true)?;

        debug!("Direct connection established to {}", addr);
        tunnel.set_right(stream).await;
        Ok(())
    }

    async fn bind(&self, mut arg: NetArg) -> Result<(), GatewayError> {
        let tunnel: Arc<Tunnel> = arg.tunnel.clone().ok_or_else(no_tunnel)?;
        let listen_ip = tunnel
            .local_address_of_client_side()
            .map(|local| local.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let listener = TcpListener::bind(SocketAddr::new(listen_ip, 0)).await?;
        let bound = listener.local_addr()?;
        info!("BIND listening on {}", bound);

        if let Some(delegate) = arg.bound_delegate.take() {
            delegate(Some(bound)).await?;
        }

        let expected = arg.ip.filter(|ip| !ip.is_unspecified());
        let (stream, peer) = tokio::time::timeout(self.timeout, accept_from(&listener, expected))
            .await
            .map_err(|_| timed_out("timeout waiting for BIND peer".to_string()))??;
        debug!("BIND on {} accepted {}", bound, peer);

        if let Some(delegate) = arg.bind_delegate.take() {
            delegate(Some(peer)).await?;
        }
        tunnel.set_right(stream).await;
        Ok(())
    }
}

/// Accept the first peer whose address is `expected`, or any peer when unset
async fn accept_from(
    listener: &TcpListener,
    expected: Option<IpAddr>,
) -> io::Result<(TcpStream, SocketAddr)> {
    loop {
        let (stream, peer) = listener.accept().await?;
        match expected {
            Some(ip) if !same_host(ip, peer.ip()) => {
                warn!("BIND dropped unexpected peer {}, waiting for {}", peer, ip);
            }
            _ => return Ok((stream, peer)),
        }
    }
}

fn same_host(a: IpAddr, b: IpAddr) -> bool {
    let canonical = |ip: IpAddr| match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        v4 => v4,
    };
    canonical(a) == canonical(b)
}

#[async_trait]
impl Sender for DirectSender {
    fn name(&self) -> &str {
        "direct"
    }

    async fn send(&self, arg: Arg) -> Result<(), GatewayError> {
        self.dispatch(NetArg::from(arg)).await
    }
}
