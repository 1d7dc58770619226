//! Byte transports between the host and the peer device.
//!
//! A transport is a duplex byte stream with non-blocking reads plus an
//! out-of-band signal line. The endpoint is single-threaded and holds the
//! transport by `&mut`, so a signal pulse can never interleave with other use
//! of the same line.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace, warn};

/// Out-of-band lines toward the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalLine {
    /// Resource created or changed; the peer fetches the pending record and
    /// fans changes out to subscribers.
    ResourceEvent,
    /// Attention/wake line used while the peer sleeps.
    CoapEvent,
}

impl SignalLine {
    /// Byte used to encode a pulse on a stream-based signal channel.
    pub fn code(&self) -> u8 {
        match self {
            SignalLine::ResourceEvent => b'R',
            SignalLine::CoapEvent => b'C',
        }
    }
}

/// Duplex byte stream to the peer device.
pub trait Transport {
    /// Number of bytes that can be read without blocking.
    fn available(&mut self) -> usize;

    /// Read one byte, or `None` if nothing is buffered.
    fn read_byte(&mut self) -> Option<u8>;

    /// Look at the next byte without consuming it.
    fn peek_byte(&mut self) -> Option<u8>;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Pulse an out-of-band line.
    fn signal(&mut self, line: SignalLine) -> io::Result<()>;

    /// Drop all unread input. Returns the number of bytes discarded.
    fn flush_input(&mut self) -> usize {
        let mut dropped = 0;
        while self.read_byte().is_some() {
            dropped += 1;
        }
        dropped
    }
}

// ============================================================================
// In-memory Transport
// ============================================================================

/// Scripted in-memory peer.
///
/// Bytes fed with [`feed`](Self::feed) are readable immediately. Replies queued
/// with [`queue_reply`](Self::queue_reply) become readable one per completed
/// outbound line, the way a peer answers each record it receives.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
    signals: Vec<SignalLine>,
    writes: usize,
}

impl MemoryTransport {
    /// Create an idle transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `data` readable now.
    pub fn feed(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }

    /// Deliver `reply` after the next complete line is written.
    pub fn queue_reply(&mut self, reply: &[u8]) {
        self.replies.push_back(reply.to_vec());
    }

    /// Number of scripted replies not yet delivered.
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }

    /// Unread input bytes.
    pub fn pending_input(&self) -> usize {
        self.rx.len()
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    /// Written data split into lines.
    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.tx)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Number of `write` calls.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Signals pulsed so far, in order.
    pub fn signals(&self) -> &[SignalLine] {
        &self.signals
    }

    /// Forget recorded output and signals.
    pub fn clear_output(&mut self) {
        self.tx.clear();
        self.signals.clear();
        self.writes = 0;
    }
}

impl Transport for MemoryTransport {
    fn available(&mut self) -> usize {
        self.rx.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn peek_byte(&mut self) -> Option<u8> {
        self.rx.front().copied()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.tx.extend_from_slice(data);
        self.writes += 1;
        if data.last() == Some(&b'\n') {
            if let Some(reply) = self.replies.pop_front() {
                self.rx.extend(reply);
            }
        }
        Ok(())
    }

    fn signal(&mut self, line: SignalLine) -> io::Result<()> {
        self.signals.push(line);
        Ok(())
    }
}

// ============================================================================
// TCP Transport
// ============================================================================

/// Transport over a TCP connection, e.g. a serial-to-TCP bridge.
///
/// Signals travel on an optional second connection as one byte per pulse
/// (see [`SignalLine::code`]). Without it, pulses are only logged.
pub struct TcpTransport {
    stream: TcpStream,
    signal: Option<TcpStream>,
    rx: VecDeque<u8>,
    closed: bool,
}

impl TcpTransport {
    /// Connect the data stream and, if given, the signal stream.
    pub fn connect(
        addr: impl ToSocketAddrs,
        signal_addr: Option<&str>,
    ) -> io::Result<TcpTransport> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;

        let signal = match signal_addr {
            Some(addr) => {
                let s = TcpStream::connect(addr)?;
                s.set_nodelay(true)?;
                Some(s)
            }
            None => None,
        };

        debug!("connected to peer at {:?}", stream.peer_addr().ok());
        Ok(TcpTransport {
            stream,
            signal,
            rx: VecDeque::new(),
            closed: false,
        })
    }

    /// Whether the peer closed the data stream.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Move whatever the socket holds into the receive buffer.
    fn fill(&mut self) {
        if self.closed {
            return;
        }
        let mut buf = [0u8; 256];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    warn!("peer closed the connection");
                    self.closed = true;
                    return;
                }
                Ok(n) => {
                    trace!("received {} bytes", n);
                    self.rx.extend(&buf[..n]);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("read from peer failed: {}", e);
                    self.closed = true;
                    return;
                }
            }
        }
    }
}

impl Transport for TcpTransport {
    fn available(&mut self) -> usize {
        self.fill();
        self.rx.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.rx.is_empty() {
            self.fill();
        }
        self.rx.pop_front()
    }

    fn peek_byte(&mut self) -> Option<u8> {
        if self.rx.is_empty() {
            self.fill();
        }
        self.rx.front().copied()
    }

    fn write(&mut self, mut data: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(ErrorKind::NotConnected, "peer closed the connection"));
        }
        while !data.is_empty() {
            match self.stream.write(data) {
                Ok(0) => return Err(ErrorKind::WriteZero.into()),
                Ok(n) => data = &data[n..],
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn signal(&mut self, line: SignalLine) -> io::Result<()> {
        match self.signal.as_mut() {
            Some(stream) => stream.write_all(&[line.code()]),
            None => {
                debug!("no signal channel, dropping {:?} pulse", line);
                Ok(())
            }
        }
    }

    fn flush_input(&mut self) -> usize {
        self.fill();
        let dropped = self.rx.len();
        self.rx.clear();
        dropped
    }
}
