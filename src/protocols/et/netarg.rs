//! ET request descriptor and its translation from the generic [`Arg`].

use super::types::EtType;
use crate::error::GatewayError;
use crate::net::{Arg, BindDelegate, NetOp};
use crate::tunnel::Tunnel;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Map a generic operation onto the ET request type carrying it
pub fn et_type_of(op: NetOp) -> EtType {
    match op {
        NetOp::Connect => EtType::Tcp,
        NetOp::Bind => EtType::Bind,
        _ => EtType::Unknown,
    }
}

/// Parameters of one ET request
#[derive(Default)]
pub struct NetArg {
    /// Request type
    pub the_type: EtType,
    /// Destination host name, if the destination is not a literal address
    pub domain: Option<String>,
    /// Destination address, if the destination is a literal address
    pub ip: Option<IpAddr>,
    /// Destination port, empty when the host string carried none
    pub port: String,
    /// Destination location, filled in by the smart-proxy resolver
    pub location: Option<String>,
    /// Called once the BIND listening side is ready
    pub bound_delegate: Option<BindDelegate>,
    /// Called when an accepted BIND peer is reported
    pub bind_delegate: Option<BindDelegate>,
    /// Connection this request belongs to
    pub tunnel: Option<Arc<Tunnel>>,
}

impl NetArg {
    /// Build a request that carries no destination (CHECK)
    pub fn bare(the_type: EtType) -> Self {
        NetArg {
            the_type,
            ..Default::default()
        }
    }

    /// Build a request towards a literal address
    pub fn for_ip(the_type: EtType, ip: IpAddr) -> Self {
        NetArg {
            the_type,
            ip: Some(ip),
            ..Default::default()
        }
    }

    /// Build a request towards a host name
    pub fn for_domain(the_type: EtType, domain: impl Into<String>) -> Self {
        NetArg {
            the_type,
            domain: Some(domain.into()),
            ..Default::default()
        }
    }

    /// Destination as text: the address or the domain
    pub fn destination(&self) -> Option<String> {
        match (&self.ip, &self.domain) {
            (Some(ip), _) => Some(ip.to_string()),
            (None, Some(domain)) => Some(domain.clone()),
            (None, None) => None,
        }
    }

    /// The port as a number; an empty or malformed port is a translation error
    pub fn port_number(&self) -> Result<u16, GatewayError> {
        self.port.parse().map_err(|_| {
            GatewayError::Translation(format!(
                "no usable port for {}: {:?}",
                self.destination().unwrap_or_default(),
                self.port
            ))
        })
    }
}

impl From<Arg> for NetArg {
    fn from(arg: Arg) -> Self {
        let (host, port) = match arg.host.rsplit_once(':') {
            Some((host, port)) => (host, port.to_string()),
            None => (arg.host.as_str(), String::new()),
        };
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        let (ip, domain) = match host.parse::<IpAddr>() {
            Ok(ip) => (Some(ip), None),
            Err(_) if host.is_empty() => (None, None),
            Err(_) => (None, Some(host.to_string())),
        };

        NetArg {
            the_type: et_type_of(arg.op),
            domain,
            ip,
            port,
            location: None,
            bound_delegate: arg.bound_delegate,
            bind_delegate: arg.bind_delegate,
            tunnel: arg.tunnel,
        }
    }
}

impl fmt::Debug for NetArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetArg")
            .field("the_type", &self.the_type)
            .field("domain", &self.domain)
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("location", &self.location)
            .field("bound_delegate", &self.bound_delegate.is_some())
            .field("bind_delegate", &self.bind_delegate.is_some())
            .field("tunnel", &self.tunnel.is_some())
            .finish()
    }
}
