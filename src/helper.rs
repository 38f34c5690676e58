//! Helper utilities for etgate
//!
//! Address classification and small formatting helpers shared by the
//! protocol handlers and senders.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Whether an IPv4 address belongs to a LAN or to this host
pub fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    match ip.octets() {
        [10, _, _, _] => true,
        [172, b, _, _] if (16..=31).contains(&b) => true,
        [192, 168, _, _] => true,
        [127, _, _, _] => true,
        [169, 254, _, _] => true, // link-local
        _ => false,
    }
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(v4);
    }
    ip.is_loopback()
        || (first & 0xfe00) == 0xfc00 // fc00::/7 unique local
        || (first & 0xffc0) == 0xfe80 // fe80::/10 link-local
}

/// Whether a client at `ip` may use the proxy
pub fn is_allowed_source(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

/// Join a host and port, bracketing IPv6 literals
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Parse duration from seconds
pub fn duration_from_secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_ipv4_ranges() {
        for ip in ["10.1.2.3", "172.16.0.1", "172.31.255.255", "192.168.0.1", "127.0.0.1"] {
            assert!(is_private_ipv4(ip.parse().unwrap()), "{}", ip);
        }
        for ip in ["8.8.8.8", "172.32.0.1", "172.15.0.1", "1.1.1.1", "192.169.0.1"] {
            assert!(!is_private_ipv4(ip.parse().unwrap()), "{}", ip);
        }
    }

    #[test]
    fn test_allowed_source_ipv6() {
        assert!(is_allowed_source("::1".parse().unwrap()));
        assert!(is_allowed_source("fd00::1".parse().unwrap()));
        assert!(is_allowed_source("fe80::1".parse().unwrap()));
        assert!(is_allowed_source("::ffff:192.168.1.1".parse().unwrap()));
        assert!(!is_allowed_source("::ffff:8.8.8.8".parse().unwrap()));
        assert!(!is_allowed_source("2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_join_host_port() {
        assert_eq!(join_host_port("192.168.0.1", 8080), "192.168.0.1:8080");
        assert_eq!(join_host_port("example.com", 443), "example.com:443");
        assert_eq!(join_host_port("::1", 80), "[::1]:80");
    }

    #[test]
    fn test_duration_from_secs() {
        assert_eq!(duration_from_secs(5), Duration::from_secs(5));
        assert_eq!(duration_from_secs(0), Duration::from_secs(0));
    }
}
