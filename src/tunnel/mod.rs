//! Tunnel abstraction
//!
//! A [`Tunnel`] joins the client-facing (left) stream accepted by the gateway
//! with a relay-facing (right) stream opened by a sender. Every blocking
//! operation races against [`Tunnel::close`], which is the only way to
//! cancel work in progress on a connection.

use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A dynamic stream trait for tunnel endpoints.
///
/// Lets the tunnel carry TCP sockets, in-memory pipes in tests, or anything
/// else that reads and writes bytes.
pub trait StreamDyn: AsyncRead + AsyncWrite + Unpin + Send + Debug {}

/// Blanket implementation: any type implementing the required traits is a StreamDyn.
impl<T: AsyncRead + AsyncWrite + Unpin + Send + Debug> StreamDyn for T {}

/// Boxed tunnel endpoint
pub type BoxStream = Box<dyn StreamDyn>;

fn aborted() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "tunnel closed")
}

/// Bidirectional tunnel between a client and its destination
#[derive(Debug)]
pub struct Tunnel {
    left_reader: Mutex<ReadHalf<BoxStream>>,
    left_writer: Mutex<WriteHalf<BoxStream>>,
    left_remote: SocketAddr,
    left_local: Option<SocketAddr>,
    right: Mutex<Option<BoxStream>>,
    closed: CancellationToken,
}

impl Tunnel {
    /// Create a tunnel around an accepted client stream
    pub fn new<S>(left: S, left_remote: SocketAddr) -> Self
    where
        S: StreamDyn + 'static,
    {
        let (reader, writer) = tokio::io::split(Box::new(left) as BoxStream);
        Tunnel {
            left_reader: Mutex::new(reader),
            left_writer: Mutex::new(writer),
            left_remote,
            left_local: None,
            right: Mutex::new(None),
            closed: CancellationToken::new(),
        }
    }

    /// Create a tunnel from an accepted TCP connection
    pub fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        let remote = stream.peer_addr()?;
        let local = stream.local_addr()?;
        Ok(Self::new(stream, remote).with_local_address(local))
    }

    /// Record the local address the client connected to
    pub fn with_local_address(mut self, local: SocketAddr) -> Self {
        self.left_local = Some(local);
        self
    }

    /// Remote address of the client-facing side
    pub fn remote_address_of_client_side(&self) -> SocketAddr {
        self.left_remote
    }

    /// Local address of the client-facing side, when known
    pub fn local_address_of_client_side(&self) -> Option<SocketAddr> {
        self.left_local
    }

    /// Read one message from the client side, bounded by `buf`
    pub async fn read_from_client_side(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(aborted());
        }
        let mut reader = self.left_reader.lock().await;
        tokio::select! {
            res = reader.read(buf) => res,
            _ = self.closed.cancelled() => Err(aborted()),
        }
    }

    /// Write all of `data` to the client side
    pub async fn write_to_client_side(&self, data: &[u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(aborted());
        }
        let mut writer = self.left_writer.lock().await;
        let write = async {
            writer.write_all(data).await?;
            writer.flush().await?;
            Ok(data.len())
        };
        tokio::select! {
            res = write => res,
            _ = self.closed.cancelled() => Err(aborted()),
        }
    }

    /// Attach the relay-facing stream
    pub async fn set_right<S>(&self, right: S)
    where
        S: StreamDyn + 'static,
    {
        *self.right.lock().await = Some(Box::new(right));
    }

    /// Whether a relay-facing stream is attached
    pub async fn has_right(&self) -> bool {
        self.right.lock().await.is_some()
    }

    /// Relay bytes between both sides until each direction reaches EOF.
    ///
    /// Returns the byte counts (client to relay, relay to client).
    pub async fn flow(&self) -> io::Result<(u64, u64)> {
        let right = self.right.lock().await.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "tunnel has no right side")
        })?;
        let (mut right_reader, mut right_writer) = tokio::io::split(right);
        let mut left_reader = self.left_reader.lock().await;
        let mut left_writer = self.left_writer.lock().await;

        let upstream = async {
            let n = tokio::io::copy(&mut *left_reader, &mut right_writer).await?;
            right_writer.shutdown().await?;
            Ok::<_, io::Error>(n)
        };
        let downstream = async {
            let n = tokio::io::copy(&mut right_reader, &mut *left_writer).await?;
            left_writer.shutdown().await?;
            Ok::<_, io::Error>(n)
        };

        let counts = tokio::select! {
            res = async { tokio::try_join!(upstream, downstream) } => res?,
            _ = self.closed.cancelled() => return Err(aborted()),
        };
        debug!(
            "Tunnel {} finished: {} bytes up, {} bytes down",
            self.left_remote, counts.0, counts.1
        );
        Ok(counts)
    }

    /// Close the tunnel, aborting every pending operation on it
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Whether [`Tunnel::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the tunnel is closed
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }
}
