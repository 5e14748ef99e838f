//! Records tunneled TCP streams as pcap captures.
//!
//! A [`Recorder`] wraps the channel of one tunnel. Each write on it is
//! wrapped in a synthesized IPv4 or IPv6 + TCP header built from the
//! tunnel's [`Endpoints`], appended to a pcap sink, and then forwarded to
//! the channel unchanged.

pub mod channel;
pub mod deframe;
pub mod endpoints;
pub mod error;
pub mod recorder;
pub mod relay;
pub mod synth;

pub use channel::{Channel, Sink};
pub use endpoints::{Endpoints, Resolved};
pub use error::Error;
pub use recorder::Recorder;
