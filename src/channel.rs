//! Collaborators of a [`Recorder`](crate::recorder::Recorder): the tunnel
//! channel it wraps and the sink its capture is written to.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream};

/// A bidirectional byte stream carrying tunnel traffic.
pub trait Channel: Read + Write {
    fn close(&mut self) -> io::Result<()>;
}

/// Append-only destination for capture bytes.
pub trait Sink: Write {
    fn close(&mut self) -> io::Result<()>;
}

impl Channel for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

impl<T: Channel + ?Sized> Channel for Box<T> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl Sink for File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

impl<W: Sink> Sink for BufWriter<W> {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().close()
    }
}

impl Sink for Vec<u8> {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Sink + ?Sized> Sink for Box<T> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
