//! Destination decoding for SOCKS5 requests
//!
//! # SOCKS5 Request Format
//!
//! ```text
//! +----+-----+-------+------+----------+----------+
//! |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
//! +----+-----+-------+------+----------+----------+
//! | 1  |  1  | X'00' |  1   | Variable |    2     |
//! +----+-----+-------+------+----------+----------+
//! ```
//!
//! The request is decoded in place; nothing is copied out besides the host
//! string.

use super::consts::*;
use crate::error::{GatewayError, Socks5Error};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::ops::Range;

fn need(request: &[u8], len: usize) -> Result<(), Socks5Error> {
    if request.len() < len {
        return Err(Socks5Error::RequestTooShort {
            need: len,
            got: request.len(),
        });
    }
    Ok(())
}

/// Address type byte and the byte range of the address it selects
fn address_span(request: &[u8]) -> Result<(u8, Range<usize>), Socks5Error> {
    need(request, ATYP_OFFSET + 1)?;
    let atyp = request[ATYP_OFFSET];
    let span = match atyp {
        SOCKS5_ADDR_TYPE_IPV4 => ADDR_OFFSET..ADDR_OFFSET + 4,
        SOCKS5_ADDR_TYPE_DOMAIN => {
            need(request, ADDR_OFFSET + 1)?;
            let len = request[ADDR_OFFSET] as usize;
            ADDR_OFFSET + 1..ADDR_OFFSET + 1 + len
        }
        SOCKS5_ADDR_TYPE_IPV6 => ADDR_OFFSET..ADDR_OFFSET + 16,
        other => return Err(Socks5Error::InvalidAddressType(other)),
    };
    need(request, span.end)?;
    Ok((atyp, span))
}

/// Decode the destination host of a request
pub fn get_host(request: &[u8]) -> Result<String, Socks5Error> {
    let (atyp, span) = address_span(request)?;
    let bytes = &request[span];
    let host = match atyp {
        SOCKS5_ADDR_TYPE_IPV4 => {
            let octets: [u8; 4] = bytes.try_into().unwrap_or_default();
            Ipv4Addr::from(octets).to_string()
        }
        SOCKS5_ADDR_TYPE_IPV6 => {
            let octets: [u8; 16] = bytes.try_into().unwrap_or_default();
            Ipv6Addr::from(octets).to_string()
        }
        _ => {
            let domain = std::str::from_utf8(bytes)
                .map_err(|_| Socks5Error::InvalidDomain(String::from_utf8_lossy(bytes).into()))?;
            if domain.is_empty() {
                return Err(Socks5Error::InvalidDomain(String::new()));
            }
            domain.to_string()
        }
    };
    Ok(host)
}

/// Decode the big-endian destination port following the address
pub fn get_port(request: &[u8]) -> Result<u16, Socks5Error> {
    let (_, span) = address_span(request)?;
    need(request, span.end + 2)?;
    Ok(u16::from_be_bytes([request[span.end], request[span.end + 1]]))
}

/// Decode host and port together
pub fn get_host_and_port(request: &[u8]) -> Result<(String, u16), GatewayError> {
    get_host(request)
        .and_then(|host| Ok((host, get_port(request)?)))
        .map_err(|e| GatewayError::from(e).at("host and port"))
}
