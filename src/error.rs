use std::io;

/// Errors produced while synthesizing, recording or relaying tunnel traffic.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The endpoints do not resolve to one address family (both IPv4 or both IPv6).
    #[error("cannot determine address family for tunnel {src} -> {dst}")]
    AddressFamily { src: String, dst: String },
    #[error("port {0} does not fit in 16 bits")]
    PortOutOfRange(u32),
    #[error("payload of {len} bytes exceeds the {max} byte limit of the frame")]
    PayloadTooLarge { len: usize, max: usize },
    /// A header buffer was shorter than pnet requires. Frames are sized
    /// before serialization, so this is a guard rather than an expected path.
    #[error("frame serialization failed: {0}")]
    Serialization(&'static str),
    #[error("capture sink error: {0}")]
    Capture(#[from] pcap_file::PcapError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("recorder is closed")]
    Closed,
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            Error::Capture(pcap_file::PcapError::IoError(err)) => err,
            Error::Closed => io::Error::new(io::ErrorKind::NotConnected, Error::Closed),
            err @ (Error::AddressFamily { .. }
            | Error::PortOutOfRange(_)
            | Error::PayloadTooLarge { .. }) => io::Error::new(io::ErrorKind::InvalidInput, err),
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}
