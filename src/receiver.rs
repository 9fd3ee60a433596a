//! Datagram receiver
//!
//! Reads datagrams into a reused buffer, copies each into an owned `Datagram`
//! and enqueues it without blocking. A full queue drops the datagram and
//! reports it; the read loop never waits on the processor.

use crate::error::FeedError;
use crate::queue::{Datagram, EnqueueError, PacketSender};
use crate::session::ShutdownSignal;
use crate::sink::EventSink;
use crate::stats::ReceiverStats;
use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use std::io;
use std::net::UdpSocket;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Pause after a hard read error so a broken socket does not spin the thread
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Where a session's datagrams come from.
///
/// `recv_datagram` must return within a bounded time: a `WouldBlock` or
/// `TimedOut` error means "nothing yet" and lets the receiver observe shutdown.
pub trait DatagramSource: Send + 'static {
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Expects a read timeout to be set on the socket
impl DatagramSource for UdpSocket {
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf)
    }
}

/// In-process source fed through a channel; for simulators and replays
pub struct ChannelSource {
    rx: crossbeam_channel::Receiver<Vec<u8>>,
    poll_interval: Duration,
}

impl ChannelSource {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

    pub fn new(rx: crossbeam_channel::Receiver<Vec<u8>>, poll_interval: Duration) -> Self {
        ChannelSource { rx, poll_interval }
    }

    pub fn pair() -> (Sender<Vec<u8>>, Self) {
        let (tx, rx) = unbounded();
        (tx, ChannelSource::new(rx, Self::DEFAULT_POLL_INTERVAL))
    }
}

impl DatagramSource for ChannelSource {
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.rx.recv_timeout(self.poll_interval) {
            Ok(packet) => {
                // same truncation a UDP read applies
                let len = packet.len().min(buf.len());
                buf[..len].copy_from_slice(&packet[..len]);
                Ok(len)
            }
            Err(RecvTimeoutError::Timeout) => Err(io::ErrorKind::WouldBlock.into()),
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(self.poll_interval);
                Err(io::ErrorKind::WouldBlock.into())
            }
        }
    }
}

fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

pub(crate) struct Receiver<S, D> {
    source: D,
    queue: PacketSender,
    sink: Arc<S>,
    shutdown: ShutdownSignal,
    buf: Vec<u8>,
    stats: ReceiverStats,
}

impl<S: EventSink, D: DatagramSource> Receiver<S, D> {
    pub(crate) fn new(
        source: D,
        queue: PacketSender,
        sink: Arc<S>,
        shutdown: ShutdownSignal,
        max_datagram_size: usize,
    ) -> Self {
        Receiver {
            source,
            queue,
            sink,
            shutdown,
            buf: vec![0u8; max_datagram_size],
            stats: ReceiverStats::default(),
        }
    }

    pub(crate) fn run(mut self) -> ReceiverStats {
        debug!(queue_capacity = self.queue.capacity(), "receiver started");
        while !self.shutdown.is_raised() {
            match self.source.recv_datagram(&mut self.buf) {
                // a read woken by disconnect carries nothing
                Ok(_) if self.shutdown.is_raised() => break,
                Ok(len) => self.enqueue(len),
                Err(e) if is_idle(&e) => {}
                Err(e) => self.read_failed(e),
            }
        }
        debug!(datagrams = self.stats.datagrams, dropped = self.stats.dropped, "receiver stopped");
        self.stats
    }

    fn enqueue(&mut self, len: usize) {
        self.stats.datagrams += 1;
        self.stats.bytes += len as u64;

        let datagram = Datagram::copy_from(&self.buf[..len]);
        match self.queue.try_enqueue(datagram) {
            Ok(()) => trace!(len, "datagram queued"),
            Err(EnqueueError::Full(datagram)) => {
                self.stats.dropped += 1;
                warn!(len, dropped = self.stats.dropped, "packet queue full, dropping datagram");
                self.sink.on_error(FeedError::QueueFull { len: datagram.len() });
            }
            Err(EnqueueError::Closed(_)) => {
                // processor already gone; only happens while shutting down
                self.stats.dropped += 1;
                debug!(len, "processor stopped, discarding datagram");
            }
        }
    }

    fn read_failed(&mut self, e: io::Error) {
        self.stats.read_errors += 1;
        warn!(error = %e, "datagram read failed");
        self.sink.on_error(FeedError::Read(e));
        thread::sleep(READ_ERROR_BACKOFF);
    }
}
