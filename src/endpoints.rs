//! Out-of-band endpoint metadata for a recorded tunnel.
//!
//! Addresses stay textual until a frame is synthesized; [`Endpoints::resolve`]
//! turns them into a family-consistent pair of socket addresses.

use std::fmt;
use std::net::{IpAddr, SocketAddr, SocketAddrV4, SocketAddrV6};

use crate::error::Error;

/// Source and destination of a tunnel, as supplied by whoever set it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub source_host: String,
    pub source_port: u32,
    pub destination_host: String,
    pub destination_port: u32,
}

/// Endpoints after address-family dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    V4(SocketAddrV4, SocketAddrV4),
    V6(SocketAddrV6, SocketAddrV6),
}

impl Endpoints {
    pub fn new(
        source_host: impl Into<String>,
        source_port: u32,
        destination_host: impl Into<String>,
        destination_port: u32,
    ) -> Self {
        Self {
            source_host: source_host.into(),
            source_port,
            destination_host: destination_host.into(),
            destination_port,
        }
    }

    pub fn from_sockets(source: SocketAddr, destination: SocketAddr) -> Self {
        Self::new(
            source.ip().to_string(),
            source.port().into(),
            destination.ip().to_string(),
            destination.port().into(),
        )
    }

    /// Parses both addresses and validates both ports.
    ///
    /// Only address literals are accepted; anything else (host names, mixed
    /// families, garbage) leaves the family indeterminate.
    pub fn resolve(&self) -> Result<Resolved, Error> {
        let source = self.source_host.parse::<IpAddr>().ok();
        let destination = self.destination_host.parse::<IpAddr>().ok();

        match (source, destination) {
            (Some(IpAddr::V4(src)), Some(IpAddr::V4(dst))) => Ok(Resolved::V4(
                SocketAddrV4::new(src, port(self.source_port)?),
                SocketAddrV4::new(dst, port(self.destination_port)?),
            )),
            (Some(IpAddr::V6(src)), Some(IpAddr::V6(dst))) => Ok(Resolved::V6(
                SocketAddrV6::new(src, port(self.source_port)?, 0, 0),
                SocketAddrV6::new(dst, port(self.destination_port)?, 0, 0),
            )),
            _ => Err(Error::AddressFamily {
                src: self.source_host.clone(),
                dst: self.destination_host.clone(),
            }),
        }
    }
}

impl fmt::Display for Endpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.source_host, self.source_port, self.destination_host, self.destination_port
        )
    }
}

impl Resolved {
    pub fn is_ipv6(&self) -> bool {
        matches!(self, Resolved::V6(..))
    }
}

fn port(value: u32) -> Result<u16, Error> {
    u16::try_from(value).map_err(|_| Error::PortOutOfRange(value))
}
