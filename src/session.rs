//! Feed session lifecycle
//!
//! A session joins the multicast group and runs two threads: the receiver,
//! which only reads and enqueues, and the processor, which decodes and calls
//! the sink. They share one bounded queue and one shutdown signal.
//!
//! States: Idle -> Connected -> Disconnecting -> Idle.

use crate::config::SessionConfig;
use crate::error::{FeedError, Result};
use crate::processor::{DeliveryFilter, Processor};
use crate::queue::packet_queue;
use crate::receiver::{DatagramSource, Receiver};
use crate::sink::EventSink;
use crate::stats::{ProcessorStats, ReceiverStats, SessionStats};
use crossbeam_channel::{bounded, Sender};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Shutdown, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connected,
    Disconnecting,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connected => "connected",
            SessionState::Disconnecting => "disconnecting",
        }
    }
}

/// Shutdown as seen by the workers: a flag for polling loops and a channel
/// that disconnects when raised, for blocking `select!`s.
#[derive(Debug, Clone)]
pub(crate) struct ShutdownSignal {
    raised: Arc<AtomicBool>,
    rx: crossbeam_channel::Receiver<()>,
}

impl ShutdownSignal {
    pub(crate) fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    pub(crate) fn channel(&self) -> &crossbeam_channel::Receiver<()> {
        &self.rx
    }
}

#[derive(Debug)]
pub(crate) struct ShutdownTrigger {
    raised: Arc<AtomicBool>,
    tx: Option<Sender<()>>,
}

impl ShutdownTrigger {
    pub(crate) fn raise(&mut self) {
        self.raised.store(true, Ordering::Release);
        self.tx.take();
    }
}

pub(crate) fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let raised = Arc::new(AtomicBool::new(false));
    let (tx, rx) = bounded(0);
    (
        ShutdownTrigger {
            raised: raised.clone(),
            tx: Some(tx),
        },
        ShutdownSignal { raised, rx },
    )
}

struct Workers {
    trigger: ShutdownTrigger,
    receiver: JoinHandle<ReceiverStats>,
    processor: JoinHandle<ProcessorStats>,
    // second handle on the receiver's socket, used to cut a blocked read short
    socket: Option<Socket>,
    started: Instant,
}

impl Workers {
    /// Raise shutdown and wait for both threads to exit
    fn stop(mut self) -> SessionStats {
        self.trigger.raise();
        if let Some(socket) = self.socket.take() {
            wake_receiver(&socket);
        }
        let receiver = self.receiver.join().unwrap_or_else(|_| {
            error!("receiver thread panicked");
            ReceiverStats::default()
        });
        let processor = self.processor.join().unwrap_or_else(|_| {
            error!("processor thread panicked");
            ProcessorStats::default()
        });
        SessionStats {
            receiver,
            processor,
            elapsed: self.started.elapsed(),
        }
    }
}

pub struct Session<S: EventSink> {
    config: SessionConfig,
    sink: Arc<S>,
    state: SessionState,
    workers: Option<Workers>,
}

impl<S: EventSink> Session<S> {
    pub fn new(config: SessionConfig, sink: S) -> Self {
        Self::with_shared_sink(config, Arc::new(sink))
    }

    /// Use a sink the caller keeps a handle to
    pub fn with_shared_sink(config: SessionConfig, sink: Arc<S>) -> Self {
        Session {
            config,
            sink,
            state: SessionState::Idle,
            workers: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Join the multicast group and start the receiver and processor.
    ///
    /// On error nothing is left running and the session stays idle.
    pub fn connect(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.config.validate()?;
        let socket = open_multicast_socket(&self.config)?;
        let handle = socket
            .try_clone()
            .map_err(|e| FeedError::setup("duplicate socket handle", e))?;
        self.start(UdpSocket::from(socket), Some(handle))
    }

    /// Run the pipeline over any datagram source instead of the multicast socket
    pub fn connect_source<D: DatagramSource>(&mut self, source: D) -> Result<()> {
        self.ensure_idle()?;
        self.config.validate()?;
        self.start(source, None)
    }

    /// Stop both workers and wait for them. Returns `None` if not connected.
    ///
    /// The socket's read side is shut down first so the receiver does not sit
    /// out its read timeout. No sink callback runs after this returns.
    pub fn disconnect(&mut self) -> Option<SessionStats> {
        let workers = self.workers.take()?;
        self.state = SessionState::Disconnecting;
        let stats = workers.stop();
        self.state = SessionState::Idle;

        info!(
            service = %self.config.service,
            channel = %self.config.channel,
            "market data session disconnected"
        );
        stats.log_summary();
        Some(stats)
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state {
            SessionState::Idle => Ok(()),
            other => Err(FeedError::InvalidState(other.name())),
        }
    }

    fn start<D: DatagramSource>(&mut self, source: D, socket: Option<Socket>) -> Result<()> {
        let config = &self.config;
        let (tx, rx) = packet_queue(config.tuning.queue_capacity);
        let (mut trigger, signal) = shutdown_channel();

        let receiver = Receiver::new(
            source,
            tx,
            self.sink.clone(),
            signal.clone(),
            config.tuning.max_datagram_size,
        );
        let processor = Processor::new(
            rx,
            config.header_layout(),
            DeliveryFilter::from_config(config),
            self.sink.clone(),
            signal,
        );

        let receiver = thread::Builder::new()
            .name(format!("mdi-rx-{}-{}", config.service, config.channel))
            .spawn(move || receiver.run())
            .map_err(|e| FeedError::setup("spawn receiver thread", e))?;

        let processor = match thread::Builder::new()
            .name(format!("mdi-proc-{}-{}", config.service, config.channel))
            .spawn(move || processor.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                trigger.raise();
                let _ = receiver.join();
                return Err(FeedError::setup("spawn processor thread", e));
            }
        };

        info!(
            service = %config.service,
            channel = %config.channel,
            group = %config.group(),
            interface = %config.interface,
            emdi = config.is_emdi,
            "connected to market data feed"
        );

        self.workers = Some(Workers {
            trigger,
            receiver,
            processor,
            socket,
            started: Instant::now(),
        });
        self.state = SessionState::Connected;
        Ok(())
    }
}

impl<S: EventSink> Drop for Session<S> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Shut down the read side so a receiver blocked in `recv` returns at once.
///
/// Linux reports ENOTCONN for an unconnected UDP socket but still wakes the
/// reader. Elsewhere the read timeout remains the bound.
fn wake_receiver(socket: &Socket) {
    if let Err(e) = socket.shutdown(Shutdown::Read) {
        debug!(error = %e, "socket read shutdown");
    }
}

/// Bind the group port, size the receive buffer and join the group
fn open_multicast_socket(config: &SessionConfig) -> Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| FeedError::setup("create UDP socket", e))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| FeedError::setup("set SO_REUSEADDR", e))?;

    let requested = config.tuning.recv_buffer_bytes;
    match socket.set_recv_buffer_size(requested) {
        Ok(()) => {
            if let Ok(actual) = socket.recv_buffer_size() {
                if actual < requested {
                    warn!(requested, actual, "receive buffer capped by the kernel (net.core.rmem_max)");
                } else {
                    debug!(actual, "receive buffer size");
                }
            }
        }
        Err(e) => warn!(error = %e, requested, "could not set receive buffer size"),
    }

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port);
    socket
        .bind(&bind_addr.into())
        .map_err(|e| FeedError::setup(format!("bind {bind_addr}"), e))?;
    socket
        .join_multicast_v4(&config.address, &config.interface)
        .map_err(|e| FeedError::setup(format!("join {} on {}", config.address, config.interface), e))?;
    socket
        .set_read_timeout(Some(config.read_timeout()))
        .map_err(|e| FeedError::setup("set read timeout", e))?;

    Ok(socket)
}
