//! End-to-end tests of the gateway: SOCKS5 in front, relay or target behind

mod common;

use async_trait::async_trait;
use common::socks5_mock::*;
use common::*;
use etgate::config::Settings;
use etgate::error::{ErrorKind, GatewayError};
use etgate::pool::BufferPool;
use etgate::protocols::et::{DirectSender, EtSender, LocationResolver, NetArg, ProxyStatus};
use etgate::server::{build_protocols, handle_connection, run_gateway};
use etgate::tunnel::Tunnel;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

fn settings(relay: SocketAddr, status: ProxyStatus) -> Settings {
    Settings {
        relay: relay.to_string(),
        proxy_status: status,
        timeout: Duration::from_secs(2),
        ..Settings::default()
    }
}

/// Read one IPv4-form reply: code and carried address
async fn read_reply<S>(client: &mut S) -> (u8, SocketAddr)
where
    S: AsyncRead + Unpin,
{
    let mut reply = [0u8; 10];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply[0], 5);
    assert_eq!(reply[3], 1);
    let ip = [reply[4], reply[5], reply[6], reply[7]];
    let port = u16::from_be_bytes([reply[8], reply[9]]);
    (reply[1], SocketAddr::from((ip, port)))
}

/// Handshake, send `request`, return the first reply
async fn socks5_exchange<S>(client: &mut S, request: &[u8]) -> (u8, SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    client
        .write_all(&create_auth_request_no_auth())
        .await
        .unwrap();
    let mut handshake = [0u8; 2];
    client.read_exact(&mut handshake).await.unwrap();
    assert_eq!(handshake, [5, 0]);

    client.write_all(request).await.unwrap();
    read_reply(client).await
}

/// Handshake, send `request`, return the reply code
async fn socks5_request<S>(client: &mut S, request: &[u8]) -> u8
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    socks5_exchange(client, request).await.0
}

async fn assert_echo<S>(client: &mut S, payload: &[u8])
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    client.write_all(payload).await.unwrap();
    let mut buf = vec![0u8; payload.len()];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf, payload);
}

#[derive(Debug)]
struct FixedResolver(&'static str);

#[async_trait]
impl LocationResolver for FixedResolver {
    async fn locate(&self, _arg: &NetArg) -> Result<String, GatewayError> {
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn test_connect_through_relay() {
    let (relay, mut requests) = spawn_echo_relay().await;
    let port = free_port().await;
    let gateway_addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();

    let mut settings = settings(relay, ProxyStatus::Enable);
    settings.listen = vec![gateway_addr];
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let gateway = tokio::spawn(run_gateway(settings, shutdown_rx));

    let mut client = connect_with_retry(gateway_addr).await;
    let code = socks5_request(&mut client, &create_connect_domain("example.com", 443)).await;
    assert_eq!(code, 0x00);
    assert_echo(&mut client, b"through the relay").await;

    let mut seen = Vec::new();
    while let Ok(line) = requests.try_recv() {
        seen.push(line);
    }
    assert!(seen.contains(&"TCP example.com 443".to_string()));

    shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), gateway)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_smart_mode_direct_location() {
    let (target, _echo) = spawn_echo_target().await;
    let (relay, _requests) = spawn_echo_relay().await;

    let settings = Arc::new(settings(relay, ProxyStatus::Smart));
    let sender = EtSender::new(settings).with_resolver(Arc::new(FixedResolver("CN")));
    let pool = BufferPool::new(64);
    let protocols = build_protocols(Arc::new(sender), &pool);

    let (mut client, server) = duplex(4096);
    let tunnel = Arc::new(Tunnel::new(server, "192.168.1.20:5000".parse().unwrap()));
    let handling = tokio::spawn(async move { handle_connection(tunnel, &protocols, &pool).await });

    let code = socks5_request(&mut client, &create_connect_ipv4([127, 0, 0, 1], target.port())).await;
    assert_eq!(code, 0x00);
    assert_echo(&mut client, b"direct").await;

    drop(client);
    let _ = tokio::time::timeout(Duration::from_secs(2), handling).await.unwrap();
}

#[tokio::test]
async fn test_relay_refusal_is_reported_to_client() {
    let (listener, relay) = create_test_listener().await;
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let _ = etgate::protocols::et::relay::read_line(&mut stream).await;
            let _ = etgate::protocols::et::relay::write_line(&mut stream, "refused").await;
        }
    });

    let sender = EtSender::new(Arc::new(settings(relay, ProxyStatus::Enable)));
    let pool = BufferPool::new(64);
    let protocols = build_protocols(Arc::new(sender), &pool);

    let (mut client, server) = duplex(4096);
    let tunnel = Arc::new(Tunnel::new(server, "127.0.0.1:5000".parse().unwrap()));
    let handling = tokio::spawn(async move { handle_connection(tunnel, &protocols, &pool).await });

    let code = socks5_request(&mut client, &create_connect_ipv4([10, 1, 2, 3], 22)).await;
    assert_eq!(code, 0x01);

    let err = handling.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RelayFailure);
}

#[tokio::test]
async fn test_public_source_gets_nothing() {
    let (relay, _requests) = spawn_echo_relay().await;
    let sender = EtSender::new(Arc::new(settings(relay, ProxyStatus::Enable)));
    let pool = BufferPool::new(64);
    let protocols = build_protocols(Arc::new(sender), &pool);

    let (mut client, server) = duplex(4096);
    let tunnel = Arc::new(Tunnel::new(server, "8.8.8.8:5000".parse().unwrap()));
    client
        .write_all(&create_auth_request_no_auth())
        .await
        .unwrap();

    let err = handle_connection(tunnel.clone(), &protocols, &pool)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    drop(tunnel);

    let mut buf = [0u8; 2];
    assert_eq!(client.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn test_direct_bind_end_to_end() {
    let pool = BufferPool::new(64);
    let protocols = build_protocols(Arc::new(DirectSender::new(Duration::from_secs(2))), &pool);

    let (mut client, server) = duplex(4096);
    let tunnel = Tunnel::new(server, "127.0.0.1:5000".parse().unwrap())
        .with_local_address("127.0.0.1:1080".parse().unwrap());
    let tunnel = Arc::new(tunnel);
    let handling = tokio::spawn(async move { handle_connection(tunnel, &protocols, &pool).await });

    let (code, bound) = socks5_exchange(&mut client, &create_bind_ipv4([127, 0, 0, 1], 21)).await;
    assert_eq!(code, 0x00);
    assert_eq!(bound.ip().to_string(), "127.0.0.1");
    assert_ne!(bound.port(), 0);

    let mut peer = TcpStream::connect(bound).await.unwrap();
    let (code, accepted) = read_reply(&mut client).await;
    assert_eq!(code, 0x00);
    assert_eq!(accepted, peer.local_addr().unwrap());

    peer.write_all(b"inbound").await.unwrap();
    let mut buf = [0u8; 7];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"inbound");

    client.write_all(b"back").await.unwrap();
    let mut buf = [0u8; 4];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"back");

    drop(client);
    drop(peer);
    let result = tokio::time::timeout(Duration::from_secs(2), handling)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_relay_bind_ends_when_relay_stays_silent() {
    let (listener, relay) = create_test_listener().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = etgate::protocols::et::relay::read_line(&mut stream).await;
        let _ = etgate::protocols::et::relay::write_line(&mut stream, "ok").await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(stream);
    });

    let mut settings = settings(relay, ProxyStatus::Enable);
    settings.timeout = Duration::from_millis(200);
    let sender = EtSender::new(Arc::new(settings));
    let pool = BufferPool::new(64);
    let protocols = build_protocols(Arc::new(sender), &pool);

    let (mut client, server) = duplex(4096);
    let tunnel = Arc::new(Tunnel::new(server, "127.0.0.1:5000".parse().unwrap()));
    let handling = tokio::spawn(async move { handle_connection(tunnel, &protocols, &pool).await });

    let (code, _) = socks5_exchange(&mut client, &create_bind_ipv4([10, 1, 2, 3], 21)).await;
    assert_eq!(code, 0x00);
    drop(client);

    let result = tokio::time::timeout(Duration::from_secs(2), handling)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.unwrap_err().kind(), ErrorKind::TransportFailure);
}
