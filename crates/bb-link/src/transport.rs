//! Byte transports underneath the link
//!
//! The transport is the hardware/host collaborator: it buffers bytes on its
//! own and the link only drains what is already there.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use tracing::{debug, info};

/// Raw byte transport between the two endpoints
pub trait LinkTransport {
    /// Whether the underlying channel is still usable
    fn is_open(&self) -> bool;

    /// Copy already-available bytes into `buf` without blocking.
    /// Returns 0 when nothing is pending.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write and flush one complete packet
    fn write_packet(&mut self, data: &[u8]) -> io::Result<()>;
}

/// TCP transport, as used by the desktop build (peer relay on `localhost:0x32B1`)
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        info!("Link connected to {}:{}", host, port);
        Self::from_stream(stream)
    }

    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream: Some(stream),
        })
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("Link TCP stream closed");
        }
    }
}

impl LinkTransport for TcpTransport {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };

        match stream.read(buf) {
            Ok(0) => {
                self.close();
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                Ok(0)
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    fn write_packet(&mut self, data: &[u8]) -> io::Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "link stream closed"));
        };

        // packets must not be split by a WouldBlock halfway through
        let result = stream
            .set_nonblocking(false)
            .and_then(|_| stream.write_all(data))
            .and_then(|_| stream.flush())
            .and_then(|_| stream.set_nonblocking(true));

        if result.is_err() {
            self.close();
        }
        result
    }
}

#[derive(Debug, Default)]
struct LoopbackShared {
    queues: [VecDeque<u8>; 2],
    open: bool,
}

/// In-process transport pair; bytes written on one end are read on the other
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    shared: Arc<Mutex<LoopbackShared>>,
    side: usize,
}

impl LoopbackTransport {
    pub fn pair() -> (Self, Self) {
        let shared = Arc::new(Mutex::new(LoopbackShared {
            open: true,
            ..Default::default()
        }));
        (
            Self {
                shared: Arc::clone(&shared),
                side: 0,
            },
            Self { shared, side: 1 },
        )
    }

    /// Close both ends
    pub fn close(&self) {
        self.shared.lock().open = false;
    }

    /// Bytes waiting to be read by this end
    pub fn pending(&self) -> usize {
        self.shared.lock().queues[self.side].len()
    }

    /// Take every byte waiting for this end
    pub fn drain(&self) -> Vec<u8> {
        self.shared.lock().queues[self.side].drain(..).collect()
    }
}

impl LinkTransport for LoopbackTransport {
    fn is_open(&self) -> bool {
        self.shared.lock().open
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut shared = self.shared.lock();
        let queue = &mut shared.queues[self.side];
        let n = queue.len().min(buf.len());
        for (dst, src) in buf.iter_mut().zip(queue.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write_packet(&mut self, data: &[u8]) -> io::Result<()> {
        let mut shared = self.shared.lock();
        if !shared.open {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "loopback closed"));
        }
        shared.queues[1 - self.side].extend(data.iter().copied());
        Ok(())
    }
}
