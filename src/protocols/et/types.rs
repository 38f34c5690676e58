//! ET vocabulary
//!
//! Request types and proxy status values, with their string forms. Parsing
//! never fails: unrecognized input maps to [`EtType::Unknown`] or
//! [`ProxyStatus::Error`] and callers must check for those values.

use std::fmt;

/// ET request type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EtType {
    /// Unrecognized or unset
    #[default]
    Unknown,
    /// TCP connect through the relay
    Tcp,
    /// IPv4 DNS lookup
    Dns,
    /// IPv6 DNS lookup
    Dns6,
    /// Location probe for an IP
    Location,
    /// Relay liveness check
    Check,
    /// Inbound connection through the relay
    Bind,
}

impl EtType {
    /// Parse an exact, case-sensitive ET type token
    pub fn parse(src: &str) -> Self {
        match src {
            "DNS" => EtType::Dns,
            "DNS6" => EtType::Dns6,
            "TCP" => EtType::Tcp,
            "LOCATION" => EtType::Location,
            "CHECK" => EtType::Check,
            "BIND" => EtType::Bind,
            _ => EtType::Unknown,
        }
    }

    /// Token used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EtType::Dns => "DNS",
            EtType::Dns6 => "DNS6",
            EtType::Tcp => "TCP",
            EtType::Location => "LOCATION",
            EtType::Check => "CHECK",
            EtType::Bind => "BIND",
            EtType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether and how requests are tunneled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyStatus {
    /// Tunnel every request
    Enable,
    /// Decide per destination from its location
    Smart,
    /// Configuration value was not recognized
    Error,
}

impl ProxyStatus {
    /// Parse a status name in any letter case
    pub fn parse(status: &str) -> Self {
        if status.eq_ignore_ascii_case("smart") {
            ProxyStatus::Smart
        } else if status.eq_ignore_ascii_case("enable") {
            ProxyStatus::Enable
        } else {
            ProxyStatus::Error
        }
    }

    /// Canonical uppercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyStatus::Enable => "ENABLE",
            ProxyStatus::Smart => "SMART",
            ProxyStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ProxyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
