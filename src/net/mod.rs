//! Transport-agnostic network operation model
//!
//! Front-end protocols turn client requests into an [`Arg`] and hand it to a
//! [`Sender`], which knows how to carry the operation to its destination.

use crate::error::GatewayError;
use crate::tunnel::Tunnel;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

/// Kind of network operation requested by a front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetOp {
    /// Not yet decided (no protocol has parsed the connection)
    Unknown,
    /// Open a stream to the destination
    Connect,
    /// Accept one inbound stream on behalf of the client
    Bind,
}

impl fmt::Display for NetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetOp::Unknown => write!(f, "UNKNOWN"),
            NetOp::Connect => write!(f, "CONNECT"),
            NetOp::Bind => write!(f, "BIND"),
        }
    }
}

/// Callback run at one of the two BIND milestones.
///
/// Receives the listening address (first milestone) or the accepted peer
/// address (second milestone) when the sender knows it.
pub type BindDelegate =
    Box<dyn FnOnce(Option<SocketAddr>) -> BoxFuture<'static, io::Result<()>> + Send + Sync>;

/// Wrap an async closure as a [`BindDelegate`]
pub fn bind_delegate<F, Fut>(f: F) -> BindDelegate
where
    F: FnOnce(Option<SocketAddr>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = io::Result<()>> + Send + 'static,
{
    Box::new(move |peer| f(peer).boxed())
}

/// Generic operation argument
pub struct Arg {
    /// Operation kind
    pub op: NetOp,
    /// Destination as `host:port` (`[v6]:port` for IPv6 literals)
    pub host: String,
    /// The connection this operation belongs to
    pub tunnel: Option<Arc<Tunnel>>,
    /// Bytes consumed while sniffing the protocol
    pub msg: Vec<u8>,
    /// BIND callback run once the listening side is ready
    pub bound_delegate: Option<BindDelegate>,
    /// BIND callback run once a peer is accepted
    pub bind_delegate: Option<BindDelegate>,
}

impl Arg {
    /// Create an argument for `op` towards `host`
    pub fn new(op: NetOp, host: impl Into<String>, tunnel: Arc<Tunnel>) -> Self {
        Arg {
            op,
            host: host.into(),
            tunnel: Some(tunnel),
            msg: Vec::new(),
            bound_delegate: None,
            bind_delegate: None,
        }
    }

    /// Argument for a fresh connection whose protocol is still unknown
    pub fn first_message(tunnel: Arc<Tunnel>, msg: Vec<u8>) -> Self {
        Arg {
            msg,
            ..Arg::new(NetOp::Unknown, String::new(), tunnel)
        }
    }

    /// Attach the callback told where a BIND listens
    pub fn with_bound_delegate(mut self, delegate: BindDelegate) -> Self {
        self.bound_delegate = Some(delegate);
        self
    }

    /// Attach a BIND acceptance callback
    pub fn with_bind_delegate(mut self, delegate: BindDelegate) -> Self {
        self.bind_delegate = Some(delegate);
        self
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg")
            .field("op", &self.op)
            .field("host", &self.host)
            .field("tunnel", &self.tunnel.is_some())
            .field("msg_len", &self.msg.len())
            .field("bound_delegate", &self.bound_delegate.is_some())
            .field("bind_delegate", &self.bind_delegate.is_some())
            .finish()
    }
}

/// Executes a network operation on behalf of a front-end.
///
/// On success the sender has attached the destination stream as the
/// tunnel's right side; the caller is responsible for relaying.
#[async_trait]
pub trait Sender: Send + Sync + fmt::Debug {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Carry out `arg`
    async fn send(&self, arg: Arg) -> Result<(), GatewayError>;
}
