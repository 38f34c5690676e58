//! ET sender
//!
//! Carries generic operations to their destination, through the relay or
//! directly, as the configured [`ProxyStatus`] dictates.

use super::direct::DirectSender;
use super::netarg::NetArg;
use super::relay::{expect_ok, read_line, Relay};
use super::resolver::{LocationResolver, RelayResolver};
use super::types::{EtType, ProxyStatus};
use crate::config::Settings;
use crate::error::GatewayError;
use crate::net::{Arg, Sender};
use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sender speaking the ET protocol to the relay
#[derive(Debug)]
pub struct EtSender {
    settings: Arc<Settings>,
    relay: Relay,
    direct: DirectSender,
    resolver: Arc<dyn LocationResolver>,
}

impl EtSender {
    /// Create a sender for the relay named in `settings`
    pub fn new(settings: Arc<Settings>) -> Self {
        let relay = Relay::new(settings.relay.clone(), settings.timeout);
        EtSender {
            direct: DirectSender::new(settings.timeout),
            resolver: Arc::new(RelayResolver::new(relay.clone())),
            relay,
            settings,
        }
    }

    /// Replace the smart-proxy location resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn LocationResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Configured proxy status
    pub fn status(&self) -> ProxyStatus {
        self.settings.proxy_status
    }

    /// Ask the relay whether it is alive
    pub async fn check(&self) -> Result<(), GatewayError> {
        let reply = self.relay.ask(&NetArg::bare(EtType::Check)).await?;
        expect_ok(&reply, EtType::Check.as_str())
    }

    /// Fill in the location of `arg` and tell whether to skip the relay
    async fn goes_direct(&self, arg: &mut NetArg) -> bool {
        match self.resolver.locate(arg).await {
            Ok(location) => {
                let direct = self.settings.is_direct_location(&location);
                debug!(
                    "{} is located in {}, direct: {}",
                    arg.destination().unwrap_or_default(),
                    location,
                    direct
                );
                arg.location = Some(location);
                direct
            }
            Err(e) => {
                warn!("Failed to locate destination, using relay: {}", e);
                false
            }
        }
    }

    async fn via_relay(&self, mut arg: NetArg) -> Result<(), GatewayError> {
        let tunnel = arg.tunnel.clone().ok_or_else(|| {
            GatewayError::from(io::Error::new(
                io::ErrorKind::NotConnected,
                "request has no tunnel",
            ))
        })?;

        let (mut stream, reply) = self.relay.open(&arg).await?;
        expect_ok(&reply, arg.the_type.as_str())?;

        if arg.the_type == EtType::Bind {
            if let Some(delegate) = arg.bound_delegate.take() {
                delegate(None).await?;
            }
            let wait = tokio::time::timeout(self.settings.timeout, read_line(&mut stream));
            let accepted = tokio::select! {
                line = wait => line.map_err(|_| {
                    io::Error::new(io::ErrorKind::TimedOut, "timeout waiting for BIND peer")
                })??,
                _ = tunnel.closed() => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionAborted,
                        "tunnel closed while waiting for BIND peer",
                    )
                    .into())
                }
            };
            expect_ok(&accepted, "BIND accept")?;
            if let Some(delegate) = arg.bind_delegate.take() {
                delegate(None).await?;
            }
        }

        info!(
            "{} {}:{} through relay {}",
            arg.the_type,
            arg.destination().unwrap_or_default(),
            arg.port,
            self.relay.addr()
        );
        tunnel.set_right(stream).await;
        Ok(())
    }
}

#[async_trait]
impl Sender for EtSender {
    fn name(&self) -> &str {
        "ET"
    }

    async fn send(&self, arg: Arg) -> Result<(), GatewayError> {
        let mut arg = NetArg::from(arg);
        arg.port_number()?;

        match self.settings.proxy_status {
            ProxyStatus::Enable => self.via_relay(arg).await,
            ProxyStatus::Smart => {
                if self.goes_direct(&mut arg).await {
                    self.direct.dispatch(arg).await
                } else {
                    self.via_relay(arg).await
                }
            }
            ProxyStatus::Error => Err(GatewayError::Config(format!(
                "proxy status is {}",
                ProxyStatus::Error
            ))),
        }
    }
}
