//! Builds raw IP + TCP frames around tunnel payloads.
//!
//! The TCP header is a placeholder: ports are real, sequence numbers, flags
//! and window are zero. Lengths and checksums are filled in so dissectors
//! accept the frame.

use std::net::{SocketAddrV4, SocketAddrV6};

use pnet::packet::{
    ip::IpNextHeaderProtocols,
    ipv4::{self, MutableIpv4Packet},
    ipv6::MutableIpv6Packet,
    tcp::{self, MutableTcpPacket},
};

use crate::endpoints::{Endpoints, Resolved};
use crate::error::Error;

pub const IPV4_HEADER_LEN: usize = 20;
pub const IPV6_HEADER_LEN: usize = 40;
pub const TCP_HEADER_LEN: usize = 20;

const TTL: u8 = 64;

/// Wraps `payload` in a frame addressed according to `endpoints`.
///
/// The network layer is IPv4 or IPv6 depending on what both addresses
/// resolve to; anything else is an [`Error::AddressFamily`].
pub fn synthesize(payload: &[u8], endpoints: &Endpoints) -> Result<Vec<u8>, Error> {
    match endpoints.resolve()? {
        Resolved::V4(src, dst) => ipv4_frame(src, dst, payload),
        Resolved::V6(src, dst) => ipv6_frame(src, dst, payload),
    }
}

fn ipv4_frame(src: SocketAddrV4, dst: SocketAddrV4, payload: &[u8]) -> Result<Vec<u8>, Error> {
    let len = IPV4_HEADER_LEN + TCP_HEADER_LEN + payload.len();
    // total length covers the whole datagram
    let total_length = u16::try_from(len).map_err(|_| Error::PayloadTooLarge {
        len: payload.len(),
        max: usize::from(u16::MAX) - IPV4_HEADER_LEN - TCP_HEADER_LEN,
    })?;

    let mut frame = vec![0u8; len];
    // both halves are at least as long as pnet's minimum packet sizes, so the
    // `Serialization` results below only guard that invariant
    let (header, segment) = frame.split_at_mut(IPV4_HEADER_LEN);

    let mut tcp = tcp_segment(segment, src.port(), dst.port(), payload)?;
    let checksum = tcp::ipv4_checksum(&tcp.to_immutable(), src.ip(), dst.ip());
    tcp.set_checksum(checksum);

    let mut ip = MutableIpv4Packet::new(header).ok_or(Error::Serialization("short IPv4 header"))?;
    ip.set_version(4);
    ip.set_header_length((IPV4_HEADER_LEN / 4) as u8);
    ip.set_total_length(total_length);
    ip.set_ttl(TTL);
    ip.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
    ip.set_source(*src.ip());
    ip.set_destination(*dst.ip());
    let checksum = ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(checksum);

    Ok(frame)
}

fn ipv6_frame(src: SocketAddrV6, dst: SocketAddrV6, payload: &[u8]) -> Result<Vec<u8>, Error> {
    // unlike IPv4, the payload length excludes the fixed header
    let payload_length =
        u16::try_from(TCP_HEADER_LEN + payload.len()).map_err(|_| Error::PayloadTooLarge {
            len: payload.len(),
            max: usize::from(u16::MAX) - TCP_HEADER_LEN,
        })?;

    let mut frame = vec![0u8; IPV6_HEADER_LEN + TCP_HEADER_LEN + payload.len()];
    let (header, segment) = frame.split_at_mut(IPV6_HEADER_LEN);

    let mut tcp = tcp_segment(segment, src.port(), dst.port(), payload)?;
    let checksum = tcp::ipv6_checksum(&tcp.to_immutable(), src.ip(), dst.ip());
    tcp.set_checksum(checksum);

    let mut ip = MutableIpv6Packet::new(header).ok_or(Error::Serialization("short IPv6 header"))?;
    ip.set_version(6);
    ip.set_payload_length(payload_length);
    ip.set_next_header(IpNextHeaderProtocols::Tcp);
    ip.set_hop_limit(TTL);
    ip.set_source(*src.ip());
    ip.set_destination(*dst.ip());

    Ok(frame)
}

fn tcp_segment<'a>(
    segment: &'a mut [u8],
    source: u16,
    destination: u16,
    payload: &[u8],
) -> Result<MutableTcpPacket<'a>, Error> {
    let mut tcp = MutableTcpPacket::new(segment).ok_or(Error::Serialization("short TCP header"))?;
    tcp.set_source(source);
    tcp.set_destination(destination);
    tcp.set_data_offset((TCP_HEADER_LEN / 4) as u8);
    tcp.set_payload(payload);
    Ok(tcp)
}
