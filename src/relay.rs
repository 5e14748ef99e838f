//! Plain TCP relay that records the client-to-upstream direction.

use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::thread;

use tracing::{debug, info, warn};

use crate::channel::Sink;
use crate::endpoints::Endpoints;
use crate::error::Error;
use crate::recorder::Recorder;

const RELAY_BUFFER: usize = 16 * 1024;

/// Byte counts of a finished relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub outbound_bytes: u64,
    pub inbound_bytes: u64,
    pub records: u64,
}

/// Relays `client` to `upstream` until the client stops sending.
///
/// Every chunk read from the client passes through a [`Recorder`] wrapping
/// `upstream`, producing one capture record in `sink`. Upstream replies are
/// copied back without recording. The recorder is closed once both
/// directions are done.
pub fn relay<S: Sink>(
    client: TcpStream,
    upstream: TcpStream,
    endpoints: Endpoints,
    sink: S,
) -> Result<RelayStats, Error> {
    let mut client_reader = client.try_clone()?;
    let mut upstream_reader = upstream.try_clone()?;
    let upstream_control = upstream.try_clone()?;
    let mut recorder = Recorder::new(upstream, sink, endpoints)?;
    info!(endpoints = %recorder.endpoints(), "relay started");

    let mut client_writer = client;
    let inbound = thread::spawn(move || {
        let copied = io::copy(&mut upstream_reader, &mut client_writer);
        let _ = client_writer.shutdown(Shutdown::Write);
        copied
    });

    let mut outbound_bytes = 0u64;
    let mut buf = vec![0u8; RELAY_BUFFER];
    let outbound = loop {
        let n = match client_reader.read(&mut buf) {
            Ok(0) => break Ok(()),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => break Err(Error::Io(err)),
        };
        if let Err(err) = recorder.forward(&buf[..n]) {
            break Err(err);
        }
        outbound_bytes += n as u64;
    };
    debug!(outbound_bytes, "client finished sending");

    // let upstream see EOF but keep reading its reply
    if let Err(err) = upstream_control.shutdown(Shutdown::Write) {
        debug!(%err, "upstream write shutdown failed");
    }
    if outbound.is_err() {
        // nothing more will be forwarded, unblock the reply copy too
        let _ = upstream_control.shutdown(Shutdown::Read);
    }

    let inbound_bytes = match inbound.join() {
        Ok(Ok(n)) => n,
        Ok(Err(err)) => {
            warn!(%err, "upstream to client copy failed");
            0
        }
        Err(_) => {
            warn!("upstream to client copy panicked");
            0
        }
    };

    let records = recorder.records();
    let closed = match recorder.close() {
        // the write half is already shut down
        Err(Error::Io(err)) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
        other => other,
    };
    outbound?;
    closed?;

    let stats = RelayStats {
        outbound_bytes,
        inbound_bytes,
        records,
    };
    info!(?stats, "relay finished");
    Ok(stats)
}
