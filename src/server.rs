//! Gateway server
//!
//! Accepts client connections on every listen endpoint, sniffs the protocol
//! from the first message and hands the connection to it. Once the protocol
//! has attached a destination, the tunnel relays until either side ends.

use crate::config::Settings;
use crate::error::{ErrorKind, GatewayError};
use crate::net::{Arg, Sender};
use crate::pool::BufferPool;
use crate::protocols::et::EtSender;
use crate::protocols::{ProtocolRegistry, Socks5};
use crate::tunnel::Tunnel;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Build the protocol set served on every listener
pub fn build_protocols(sender: Arc<dyn Sender>, pool: &BufferPool) -> ProtocolRegistry {
    let mut registry = ProtocolRegistry::new();
    registry.register(Arc::new(Socks5::with_default_commands(sender, pool.clone())));
    registry
}

/// Run the gateway until a shutdown signal is received
pub async fn run_gateway(settings: Settings, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
    let settings = Arc::new(settings);
    let pool = BufferPool::new(settings.buffer_size);

    let sender = Arc::new(EtSender::new(settings.clone()));
    info!(
        "Proxy status {}, relay {}",
        sender.status(),
        settings.relay
    );
    let checker = sender.clone();
    tokio::spawn(async move {
        match checker.check().await {
            Ok(()) => debug!("Relay passed CHECK"),
            Err(e) => warn!("Relay did not pass CHECK: {}", e),
        }
    });

    let protocols = Arc::new(build_protocols(sender, &pool));
    info!("Serving protocols: {}", protocols.names().join(", "));

    let mut listeners = Vec::with_capacity(settings.listen.len());
    for addr in &settings.listen {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to listen on {}", addr))?;
        info!("Listening on {}", addr);
        listeners.push(listener);
    }

    let loops = listeners.into_iter().map(|listener| {
        accept_loop(
            listener,
            protocols.clone(),
            pool.clone(),
            shutdown_rx.resubscribe(),
        )
    });
    futures::future::join_all(loops).await;

    info!("Gateway stopped");
    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    protocols: Arc<ProtocolRegistry>,
    pool: BufferPool,
    mut shutdown_rx: broadcast::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let protocols = protocols.clone();
                    let pool = pool.clone();
                    tokio::spawn(async move {
                        serve(stream, addr, &protocols, &pool).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
            _ = shutdown_rx.recv() => {
                debug!("Accept loop stopping");
                break;
            }
        }
    }
}

async fn serve(stream: TcpStream, addr: SocketAddr, protocols: &ProtocolRegistry, pool: &BufferPool) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
    }
    let local = stream.local_addr();
    let mut tunnel = Tunnel::new(stream, addr);
    match local {
        Ok(local) => tunnel = tunnel.with_local_address(local),
        Err(e) => debug!("Failed to read local address for {}: {}", addr, e),
    }
    let tunnel = Arc::new(tunnel);

    match handle_connection(tunnel.clone(), protocols, pool).await {
        Ok(()) => debug!("Connection from {} finished", addr),
        Err(e) if e.kind() == ErrorKind::TransportFailure => {
            debug!("Connection from {} ended: {}", addr, e)
        }
        Err(e) => warn!("Connection from {} failed: {}", addr, e),
    }
    tunnel.close();
}

/// Sniff, handle and relay one connection. The caller closes the tunnel.
pub async fn handle_connection(
    tunnel: Arc<Tunnel>,
    protocols: &ProtocolRegistry,
    pool: &BufferPool,
) -> Result<(), GatewayError> {
    let first_msg = {
        let mut buf = pool.acquire();
        let n = tunnel.read_from_client_side(&mut buf).await?;
        buf.to_vec(n)
    };
    let Some(&first_byte) = first_msg.first() else {
        return Ok(());
    };

    let protocol = protocols
        .find(&first_msg)
        .ok_or(GatewayError::UnknownProtocol(first_byte))?;
    debug!(
        "{} connection from {}",
        protocol.name(),
        tunnel.remote_address_of_client_side()
    );

    protocol
        .handle(Arg::first_message(tunnel.clone(), first_msg))
        .await?;

    if tunnel.has_right().await {
        tunnel
            .flow()
            .await
            .map_err(|e| GatewayError::from(e).at("tunnel flow"))?;
    }
    Ok(())
}
