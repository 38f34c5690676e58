//! Error types for etgate
//!
//! This module defines all custom error types used throughout the gateway.

use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Client-facing source is not allowed to use the proxy
    #[error("Policy violation: {0}")]
    Policy(String),

    /// Malformed or unsupported SOCKS5 traffic
    #[error("SOCKS5 error: {0}")]
    Protocol(#[from] Socks5Error),

    /// Read/write failure on the tunnel
    #[error("IO error: {0}")]
    Transport(#[from] io::Error),

    /// No registered protocol recognized the first message
    #[error("Unrecognized protocol, first byte {0:#04x}")]
    UnknownProtocol(u8),

    /// Host-and-port could not be split into a usable destination
    #[error("Translation error: {0}")]
    Translation(String),

    /// The relay answered with something other than what was asked for
    #[error("Relay error: {0}")]
    Relay(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error surfaced from a named stage of connection handling
    #[error("{stage} -> {source}")]
    Stage {
        /// Short fixed name of the failing stage
        stage: &'static str,
        /// Underlying error
        #[source]
        source: Box<GatewayError>,
    },
}

/// Coarse classification of a [`GatewayError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Public-sourced client
    PolicyViolation,
    /// Bad version, command, address type or length
    ProtocolViolation,
    /// Tunnel read/write failure
    TransportFailure,
    /// Host-and-port without a parseable port
    TranslationAmbiguity,
    /// Unexpected relay reply
    RelayFailure,
    /// Invalid settings
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::PolicyViolation => "policy violation",
            ErrorKind::ProtocolViolation => "protocol violation",
            ErrorKind::TransportFailure => "transport failure",
            ErrorKind::TranslationAmbiguity => "translation ambiguity",
            ErrorKind::RelayFailure => "relay failure",
            ErrorKind::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

impl GatewayError {
    /// Wrap this error with the name of the stage that produced it
    pub fn at(self, stage: &'static str) -> Self {
        GatewayError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The kind of the innermost error, ignoring stage wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Policy(_) => ErrorKind::PolicyViolation,
            GatewayError::Protocol(_) | GatewayError::UnknownProtocol(_) => {
                ErrorKind::ProtocolViolation
            }
            GatewayError::Transport(_) => ErrorKind::TransportFailure,
            GatewayError::Translation(_) => ErrorKind::TranslationAmbiguity,
            GatewayError::Relay(_) => ErrorKind::RelayFailure,
            GatewayError::Config(_) => ErrorKind::Configuration,
            GatewayError::Stage { source, .. } => source.kind(),
        }
    }

    /// The innermost error, ignoring stage wrappers
    pub fn root(&self) -> &GatewayError {
        match self {
            GatewayError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// SOCKS5 specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Socks5Error {
    /// First byte was not the SOCKS5 version marker
    #[error("invalid socks version: {0}")]
    InvalidVersion(u8),

    /// Command byte with no registered handler
    #[error("invalid request command: {0}")]
    InvalidCommand(u8),

    /// Unknown destination address type
    #[error("invalid socks req des type: {0}")]
    InvalidAddressType(u8),

    /// Request ended before all fields were present
    #[error("request too short: need {need} bytes, got {got}")]
    RequestTooShort {
        /// Bytes required by the layout
        need: usize,
        /// Bytes actually received
        got: usize,
    },

    /// Domain bytes are not valid UTF-8 or empty
    #[error("invalid domain name: {0}")]
    InvalidDomain(String),
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

impl From<&io::Error> for Socks5ReplyCode {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Socks5ReplyCode::ConnectionRefused,
            io::ErrorKind::TimedOut => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::AddrNotAvailable => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::PermissionDenied => Socks5ReplyCode::ConnectionNotAllowed,
            _ => Socks5ReplyCode::GeneralFailure,
        }
    }
}

impl From<&GatewayError> for Socks5ReplyCode {
    fn from(err: &GatewayError) -> Self {
        match err.root() {
            GatewayError::Transport(e) => Socks5ReplyCode::from(e),
            GatewayError::Policy(_) | GatewayError::Config(_) => {
                Socks5ReplyCode::ConnectionNotAllowed
            }
            GatewayError::Protocol(Socks5Error::InvalidAddressType(_)) => {
                Socks5ReplyCode::AddressTypeNotSupported
            }
            GatewayError::Translation(_) => Socks5ReplyCode::HostUnreachable,
            _ => Socks5ReplyCode::GeneralFailure,
        }
    }
}
