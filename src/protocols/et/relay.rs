//! Relay-facing ET request encoding and exchange
//!
//! # Request Format
//!
//! Each request and each reply is one `\n`-terminated line. A request is the
//! ET type token followed by its space-separated fields:
//!
//! ```text
//! TCP <ip-or-domain> <port>
//! BIND <ip-or-domain> <port>
//! LOCATION <ip>
//! DNS <domain>
//! DNS6 <domain>
//! CHECK
//! ```
//!
//! TCP, BIND and CHECK succeed when the relay answers `ok`. A BIND is
//! followed by a second `ok` once the relay has accepted a peer.

use super::netarg::NetArg;
use super::types::EtType;
use crate::error::GatewayError;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Reply signalling success
pub const ET_OK: &str = "ok";

/// Longest reply line accepted from the relay
pub const MAX_LINE_LEN: usize = 512;

/// Encode the request line for `arg`
pub fn request_line(arg: &NetArg) -> Result<String, GatewayError> {
    let missing = |what: &str| {
        GatewayError::Translation(format!("{} request without {}", arg.the_type, what))
    };
    let line = match arg.the_type {
        EtType::Tcp | EtType::Bind => {
            let dest = arg.destination().ok_or_else(|| missing("destination"))?;
            let port = arg.port_number()?;
            format!("{} {} {}", arg.the_type, dest, port)
        }
        EtType::Location => {
            let ip = arg.ip.ok_or_else(|| missing("ip"))?;
            format!("{} {}", arg.the_type, ip)
        }
        EtType::Dns | EtType::Dns6 => {
            let domain = arg.domain.as_deref().ok_or_else(|| missing("domain"))?;
            format!("{} {}", arg.the_type, domain)
        }
        EtType::Check => arg.the_type.to_string(),
        EtType::Unknown => {
            return Err(GatewayError::Translation(
                "cannot encode an UNKNOWN request".to_string(),
            ))
        }
    };
    Ok(line)
}

/// Write one line
pub async fn write_line<S>(stream: &mut S, line: &str) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut data = Vec::with_capacity(line.len() + 1);
    data.extend_from_slice(line.as_bytes());
    data.push(b'\n');
    stream.write_all(&data).await?;
    stream.flush().await
}

/// Read one line, without buffering past its terminator
pub async fn read_line<S>(stream: &mut S) -> Result<String, GatewayError>
where
    S: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        let byte = stream.read_u8().await?;
        if byte == b'\n' {
            break;
        }
        if line.len() == MAX_LINE_LEN {
            return Err(GatewayError::Relay(format!(
                "reply longer than {} bytes",
                MAX_LINE_LEN
            )));
        }
        line.push(byte);
    }
    let line = String::from_utf8(line)
        .map_err(|_| GatewayError::Relay("reply is not valid UTF-8".to_string()))?;
    Ok(line.trim_end_matches('\r').to_string())
}

/// Fail unless `reply` is [`ET_OK`]
pub fn expect_ok(reply: &str, what: &str) -> Result<(), GatewayError> {
    if reply == ET_OK {
        Ok(())
    } else {
        Err(GatewayError::Relay(format!(
            "{} refused by relay: {:?}",
            what, reply
        )))
    }
}

/// Address and dial policy of the remote relay
#[derive(Debug, Clone)]
pub struct Relay {
    addr: String,
    timeout: Duration,
}

impl Relay {
    /// Create a relay handle
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Relay {
            addr: addr.into(),
            timeout,
        }
    }

    /// Relay endpoint
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Open a fresh connection to the relay
    pub async fn dial(&self) -> io::Result<TcpStream> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("timeout connecting to relay {}", self.addr),
                )
            })??;
        stream.set_nodelay(true)?;
        debug!("Connected to relay {}", self.addr);
        Ok(stream)
    }

    /// Send `arg` on a new connection and return the stream with the first reply
    pub async fn open(&self, arg: &NetArg) -> Result<(TcpStream, String), GatewayError> {
        let line = request_line(arg)?;
        let mut stream = self.dial().await?;
        write_line(&mut stream, &line).await?;
        let reply = tokio::time::timeout(self.timeout, read_line(&mut stream))
            .await
            .map_err(|_| {
                io::Error::new(io::ErrorKind::TimedOut, format!("no reply to {}", line))
            })??;
        debug!("Relay answered {:?} to {:?}", reply, line);
        Ok((stream, reply))
    }

    /// One request, one reply, then hang up
    pub async fn ask(&self, arg: &NetArg) -> Result<String, GatewayError> {
        let (_stream, reply) = self.open(arg).await?;
        Ok(reply)
    }
}
