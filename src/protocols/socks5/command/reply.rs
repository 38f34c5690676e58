//! SOCKS5 reply builder
//!
//! Constructs SOCKS5 reply messages.

use crate::error::{GatewayError, Socks5ReplyCode};
use crate::protocols::socks5::consts::*;
use crate::tunnel::Tunnel;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Build a SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// `bind_addr` defaults to `0.0.0.0:0`.
pub fn build_reply(reply_code: Socks5ReplyCode, bind_addr: Option<SocketAddr>) -> Vec<u8> {
    let bind_addr =
        bind_addr.unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0));

    let mut reply = vec![SOCKS5_VERSION, reply_code.into(), SOCKS5_RESERVED];

    match bind_addr {
        SocketAddr::V4(addr) => {
            reply.push(SOCKS5_ADDR_TYPE_IPV4);
            reply.extend_from_slice(&addr.ip().octets());
            reply.extend_from_slice(&addr.port().to_be_bytes());
        }
        SocketAddr::V6(addr) => {
            reply.push(SOCKS5_ADDR_TYPE_IPV6);
            reply.extend_from_slice(&addr.ip().octets());
            reply.extend_from_slice(&addr.port().to_be_bytes());
        }
    }

    reply
}

/// Write a complete reply to the client side of `tunnel`
pub async fn send_reply(
    tunnel: &Tunnel,
    reply_code: Socks5ReplyCode,
    bind_addr: Option<SocketAddr>,
) -> Result<(), GatewayError> {
    let reply = build_reply(reply_code, bind_addr);
    let n = tunnel.write_to_client_side(&reply).await?;
    if n < reply.len() {
        return Err(io::Error::new(io::ErrorKind::WriteZero, "fail to reply").into());
    }
    Ok(())
}

/// Write the failure reply matching `err`
pub async fn send_failure(tunnel: &Tunnel, err: &GatewayError) -> Result<(), GatewayError> {
    send_reply(tunnel, Socks5ReplyCode::from(err), None).await
}
