#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use pcap_file::pcap::{PcapHeader, PcapReader};
use tunnel_pcap::{Channel, Sink};

pub fn init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub written: Vec<u8>,
    pub writes: usize,
    pub inbound: VecDeque<u8>,
    pub reads: usize,
    pub flushes: usize,
    pub closes: usize,
    pub fail_write: Option<io::ErrorKind>,
    pub fail_close: Option<io::ErrorKind>,
}

/// In-memory channel or sink whose state stays inspectable after the
/// recorder takes ownership of it.
#[derive(Debug, Clone, Default)]
pub struct Fake {
    state: Arc<Mutex<FakeState>>,
}

impl Fake {
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_inbound(data: &[u8]) -> Self {
        let fake = Fake::default();
        fake.state().inbound.extend(data);
        fake
    }
}

impl Read for Fake {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        state.reads += 1;
        let n = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for Fake {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if let Some(kind) = state.fail_write {
            return Err(io::Error::new(kind, "injected write failure"));
        }
        state.writes += 1;
        state.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state().flushes += 1;
        Ok(())
    }
}

fn fake_close(fake: &Fake) -> io::Result<()> {
    let mut state = fake.state();
    state.closes += 1;
    match state.fail_close {
        Some(kind) => Err(io::Error::new(kind, "injected close failure")),
        None => Ok(()),
    }
}

impl Channel for Fake {
    fn close(&mut self) -> io::Result<()> {
        fake_close(self)
    }
}

impl Sink for Fake {
    fn close(&mut self) -> io::Result<()> {
        fake_close(self)
    }
}

pub struct Record {
    pub timestamp: Duration,
    pub orig_len: u32,
    pub data: Vec<u8>,
}

/// Parses a complete pcap capture.
pub fn read_capture(bytes: &[u8]) -> (PcapHeader, Vec<Record>) {
    let mut reader = PcapReader::new(bytes).expect("capture header");
    let header = reader.header();
    let mut records = Vec::new();
    while let Some(packet) = reader.next_packet() {
        let packet = packet.expect("capture record");
        records.push(Record {
            timestamp: packet.timestamp,
            orig_len: packet.orig_len,
            data: packet.data.into_owned(),
        });
    }
    (header, records)
}
