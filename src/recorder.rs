//! Mirrors every write on a tunnel channel into a pcap capture.

use std::io::{self, Read, Write};
use std::mem;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use byteorder::NativeEndian;
use pcap_file::pcap::{PcapHeader, PcapPacket};
use pcap_file::{DataLink, Endianness, TsResolution};
use tracing::{debug, warn};

use crate::channel::{Channel, Sink};
use crate::endpoints::Endpoints;
use crate::error::Error;
use crate::synth;

/// Snapshot length declared in the capture header. Large enough for any
/// synthesized frame.
pub const SNAPLEN: u32 = 262_144;

enum State<C, S> {
    Open { channel: C, sink: S },
    Closed,
}

/// Wraps a tunnel channel so that every write is also appended to a capture
/// as a synthesized IP/TCP packet.
///
/// Reads pass through untouched. A recorder is meant to be owned by the one
/// thread driving its tunnel; records appear in the order of `forward` calls.
pub struct Recorder<C: Channel, S: Sink> {
    endpoints: Endpoints,
    link_type: DataLink,
    state: State<C, S>,
    last_timestamp: Duration,
    records: u64,
}

impl<C: Channel, S: Sink> Recorder<C, S> {
    /// Writes the capture header to `sink` and returns an open recorder.
    ///
    /// The header's link type follows the endpoints: IPv6 when they already
    /// resolve to IPv6, IPv4 otherwise.
    pub fn new(channel: C, mut sink: S, endpoints: Endpoints) -> Result<Self, Error> {
        let link_type = match endpoints.resolve() {
            Ok(resolved) if resolved.is_ipv6() => DataLink::IPV6,
            _ => DataLink::IPV4,
        };
        let header = PcapHeader {
            snaplen: SNAPLEN,
            datalink: link_type,
            ts_resolution: TsResolution::MicroSecond,
            // must agree with the `NativeEndian` record writes in `forward`
            endianness: Endianness::native(),
            ..Default::default()
        };
        header.write_to(&mut sink)?;
        debug!(%endpoints, ?link_type, "capture started");

        Ok(Self {
            endpoints,
            link_type,
            state: State::Open { channel, sink },
            last_timestamp: Duration::ZERO,
            records: 0,
        })
    }

    /// Records `data` as one packet, then writes it unchanged to the channel.
    ///
    /// Nothing is recorded or forwarded when the frame cannot be built.
    pub fn forward(&mut self, data: &[u8]) -> Result<usize, Error> {
        let State::Open { channel, sink } = &mut self.state else {
            return Err(Error::Closed);
        };

        let frame = synth::synthesize(data, &self.endpoints)?;
        let timestamp = next_timestamp(&mut self.last_timestamp);
        // frames are bounded by the 16-bit IP length fields
        let packet = PcapPacket::new(timestamp, frame.len() as u32, &frame);
        packet.write_to::<_, NativeEndian>(sink, TsResolution::MicroSecond, SNAPLEN)?;
        self.records += 1;
        debug!(record = self.records, frame_len = frame.len(), "recorded write");

        channel.write_all(data)?;
        Ok(data.len())
    }

    /// Closes the capture sink and then the channel.
    ///
    /// Both are always attempted. A channel failure takes precedence over a
    /// sink failure in the returned error.
    pub fn close(&mut self) -> Result<(), Error> {
        let State::Open {
            mut channel,
            mut sink,
        } = mem::replace(&mut self.state, State::Closed)
        else {
            return Err(Error::Closed);
        };

        let sink_result = sink.close();
        let channel_result = channel.close();
        debug!(records = self.records, "capture closed");

        match (channel_result, sink_result) {
            (Err(err), sink_result) => {
                if let Err(sink_err) = sink_result {
                    warn!(%sink_err, "capture sink failed to close");
                }
                Err(err.into())
            }
            (Ok(()), Err(err)) => Err(err.into()),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Number of records appended so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn link_type(&self) -> DataLink {
        self.link_type
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }
}

impl<C: Channel, S: Sink> Read for Recorder<C, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.state {
            State::Open { channel, .. } => channel.read(buf),
            State::Closed => Err(Error::Closed.into()),
        }
    }
}

impl<C: Channel, S: Sink> Write for Recorder<C, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.forward(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.state {
            State::Open { channel, sink } => {
                sink.flush()?;
                channel.flush()
            }
            State::Closed => Err(Error::Closed.into()),
        }
    }
}

/// Wall-clock time since the epoch, never earlier than the previous record.
fn next_timestamp(last: &mut Duration) -> Duration {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    *last = now.max(*last);
    *last
}
