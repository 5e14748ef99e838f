use std::fmt;
use std::net::{IpAddr, SocketAddr};

use pnet::packet::{
    ip::IpNextHeaderProtocols, ipv4::Ipv4Packet, ipv6::Ipv6Packet, tcp::TcpPacket, Packet,
};

/// What a raw IP/TCP frame carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    pub source: SocketAddr,
    pub destination: SocketAddr,
    pub payload: Vec<u8>,
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = if self.source.is_ipv6() { "IPv6" } else { "IPv4" };
        write!(
            f,
            "{family} {} -> {} TCP {} bytes",
            self.source,
            self.destination,
            self.payload.len()
        )
    }
}

/// Parses a frame that starts at the IP header (no link layer).
///
/// Returns `None` for anything that is not TCP over IPv4/IPv6.
pub fn summarize(frame: &[u8]) -> Option<FrameSummary> {
    match frame.first()? >> 4 {
        4 => {
            let ip = Ipv4Packet::new(frame)?;
            if ip.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
                return None;
            }
            // the payload slice is bounded by total length, not the buffer
            let tcp = TcpPacket::new(ip.payload())?;
            Some(summary(ip.get_source().into(), ip.get_destination().into(), &tcp))
        }
        6 => {
            let ip = Ipv6Packet::new(frame)?;
            if ip.get_next_header() != IpNextHeaderProtocols::Tcp {
                return None;
            }
            let tcp = TcpPacket::new(ip.payload())?;
            Some(summary(ip.get_source().into(), ip.get_destination().into(), &tcp))
        }
        _ => None,
    }
}

fn summary(source: IpAddr, destination: IpAddr, tcp: &TcpPacket) -> FrameSummary {
    FrameSummary {
        source: SocketAddr::new(source, tcp.get_source()),
        destination: SocketAddr::new(destination, tcp.get_destination()),
        payload: tcp.payload().to_vec(),
    }
}
