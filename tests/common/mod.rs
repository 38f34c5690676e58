//! Test utilities for Etgate
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use etgate::protocols::et::relay::{read_line, write_line};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// A port that was free a moment ago
pub async fn free_port() -> u16 {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr.port()
}

/// Echo everything received on one accepted connection
pub async fn spawn_echo_target() -> (SocketAddr, JoinHandle<()>) {
    let (listener, addr) = create_test_listener().await;
    let task = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        echo(&mut stream).await;
    });
    (addr, task)
}

/// Relay that answers every request with `ok`, then echoes the tunnel payload.
///
/// Request lines are forwarded to the returned receiver as they arrive.
pub async fn spawn_echo_relay() -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let (listener, addr) = create_test_listener().await;
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let request = match read_line(&mut stream).await {
                    Ok(line) => line,
                    Err(_) => return,
                };
                let _ = tx.send(request);
                if write_line(&mut stream, "ok").await.is_ok() {
                    echo(&mut stream).await;
                }
            });
        }
    });
    (addr, rx)
}

/// Connect to `addr`, retrying while the gateway starts up
pub async fn connect_with_retry(addr: SocketAddr) -> TcpStream {
    for _ in 0..50 {
        if let Ok(stream) = TcpStream::connect(addr).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("gateway did not start listening on {}", addr);
}

async fn echo(stream: &mut TcpStream) {
    let mut buf = [0u8; 1024];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if stream.write_all(&buf[..n]).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// SOCKS5 request bytes
pub mod socks5_mock {
    use etgate::protocols::socks5::*;

    /// Create a no-auth method selection request
    pub fn create_auth_request_no_auth() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    /// Create a connect command to IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut cmd = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV4,
        ];
        cmd.extend_from_slice(&ip);
        cmd.extend_from_slice(&port.to_be_bytes());
        cmd
    }

    /// Create a bind command for an IPv4 peer
    pub fn create_bind_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut cmd = create_connect_ipv4(ip, port);
        cmd[1] = SOCKS5_CMD_TCP_BIND;
        cmd
    }

    /// Create a connect command to domain
    pub fn create_connect_domain(domain: &str, port: u16) -> Vec<u8> {
        let mut cmd = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_DOMAIN,
            domain.len() as u8,
        ];
        cmd.extend_from_slice(domain.as_bytes());
        cmd.extend_from_slice(&port.to_be_bytes());
        cmd
    }
}
