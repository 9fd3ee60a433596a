//! MDI/EMDI market data feed session
//!
//! Joins a FAST-encoded UDP multicast feed and delivers decoded messages to
//! an application-provided sink:
//! - Stop-bit integer codec and FAST decimals
//! - Packet header (MDI or EMDI) and reset handling
//! - Static template registry for depth, state and statistics messages
//! - Non-blocking receive path with a bounded packet queue
//! - Snapshot/incremental delivery filtering
//! - Sequence gap accounting and per-worker statistics
//!
//! ```no_run
//! use mdi_feed::{EventSink, FeedError, PacketHeader, FunctionalBeacon, Session, SessionConfig};
//!
//! struct Printer;
//!
//! impl EventSink for Printer {
//!     fn on_functional_beacon(&self, header: &PacketHeader, beacon: FunctionalBeacon) {
//!         println!("seq {} beacon {:?}", header.sequence, beacon);
//!     }
//!
//!     fn on_error(&self, error: FeedError) {
//!         eprintln!("{error}");
//!     }
//! }
//!
//! let config = SessionConfig::load("feed.toml")?;
//! let mut session = Session::new(config, Printer);
//! session.connect()?;
//! // ...
//! session.disconnect();
//! # Ok::<(), FeedError>(())
//! ```

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod receiver;
pub mod sequence;
pub mod session;
pub mod sink;
pub mod stats;
pub mod templates;
pub mod varint;

mod processor;

#[cfg(test)]
mod testing;

pub use config::{Service, SessionConfig, Tuning};
pub use decoder::{DecodeError, DecodedPacket, FrameDecoder, PacketSummary};
pub use encoder::PacketWriter;
pub use error::{ErrorKind, FeedError, Result};
pub use protocol::*;
pub use queue::{packet_queue, Datagram, EnqueueError, PacketReceiver, PacketSender};
pub use receiver::{ChannelSource, DatagramSource};
pub use sequence::{SequenceCheck, SequenceTracker};
pub use session::{Session, SessionState};
pub use sink::EventSink;
pub use stats::{LatencyStats, ProcessorStats, ReceiverStats, SessionStats};
