//! Packet processor
//!
//! Sole consumer of the packet queue. Decodes each datagram and hands the
//! events to the sink synchronously, in message order. A decode error
//! abandons the rest of that packet only.

use crate::config::SessionConfig;
use crate::decoder::FrameDecoder;
use crate::error::FeedError;
use crate::protocol::{HeaderLayout, MessageKind};
use crate::queue::{Datagram, PacketReceiver};
use crate::sequence::{SequenceCheck, SequenceTracker};
use crate::session::ShutdownSignal;
use crate::sink::{self, EventSink};
use crate::stats::ProcessorStats;
use crossbeam_channel::select;
use std::sync::Arc;
use tracing::{debug, trace};

/// Which depth variants reach the sink. Other variants always do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeliveryFilter {
    snapshots: bool,
    increments: bool,
}

impl DeliveryFilter {
    pub(crate) fn new(snapshots: bool, increments: bool) -> Self {
        DeliveryFilter { snapshots, increments }
    }

    #[cfg(test)]
    pub(crate) fn all() -> Self {
        Self::new(true, true)
    }

    pub(crate) fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.snapshot_enabled, config.incremental_enabled)
    }

    pub(crate) fn allows(&self, kind: MessageKind) -> bool {
        match kind {
            MessageKind::DepthSnapshot => self.snapshots,
            MessageKind::DepthIncremental => self.increments,
            _ => true,
        }
    }
}

pub(crate) struct Processor<S> {
    queue: PacketReceiver,
    decoder: FrameDecoder,
    filter: DeliveryFilter,
    sink: Arc<S>,
    shutdown: ShutdownSignal,
    sequence: SequenceTracker,
    stats: ProcessorStats,
}

impl<S: EventSink> Processor<S> {
    pub(crate) fn new(
        queue: PacketReceiver,
        layout: HeaderLayout,
        filter: DeliveryFilter,
        sink: Arc<S>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Processor {
            queue,
            decoder: FrameDecoder::new(layout),
            filter,
            sink,
            shutdown,
            sequence: SequenceTracker::new(),
            stats: ProcessorStats::default(),
        }
    }

    pub(crate) fn run(mut self) -> ProcessorStats {
        debug!(layout = ?self.decoder.layout(), "processor started");
        let packets = self.queue.channel().clone();
        let shutdown = self.shutdown.channel().clone();

        loop {
            let next = select! {
                recv(shutdown) -> _ => None,
                recv(packets) -> msg => msg.ok(),
            };
            match next {
                // both may be ready at once; shutdown wins
                Some(datagram) if !self.shutdown.is_raised() => self.process(datagram),
                _ => break,
            }
        }

        debug!(
            packets = self.stats.packets,
            sequence_gaps = self.sequence.gap_count(),
            "processor stopped"
        );
        self.finish()
    }

    fn process(&mut self, datagram: Datagram) {
        self.stats.packets += 1;

        let filter = self.filter;
        let sink = &*self.sink;
        let stats = &mut self.stats;
        let result = self.decoder.decode_packet_with(&datagram.payload, |header, event| {
            if filter.allows(event.kind()) {
                sink::dispatch(sink, header, event);
                stats.events_delivered += 1;
            } else {
                stats.events_filtered += 1;
            }
        });

        match result {
            Ok(summary) => {
                trace!(seq = summary.header.sequence, messages = summary.messages, "packet decoded");
                self.track_sequence(summary.header.sequence);
            }
            Err(e) => {
                // a packet with a readable header still counts for sequencing
                if let Ok((header, _)) = FrameDecoder::decode_header(&datagram.payload, self.decoder.layout()) {
                    self.track_sequence(header.sequence);
                }
                self.stats.record_decode_error(e.kind());
                debug!(error = %e, len = datagram.len(), "dropping undecodable packet");
                self.sink.on_error(FeedError::Decode(e));
            }
        }

        let micros = u64::try_from(datagram.received_at.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.stats.latency.record(micros);
    }

    fn track_sequence(&mut self, seq: u32) {
        match self.sequence.observe(seq) {
            SequenceCheck::Gap { start, end } => debug!(start, end, "packet sequence gap"),
            SequenceCheck::Duplicate => trace!(seq, "duplicate packet sequence"),
            SequenceCheck::First | SequenceCheck::InOrder => {}
        }
    }

    fn finish(mut self) -> ProcessorStats {
        self.stats.sequence_gaps = self.sequence.missing();
        self.stats.duplicates = self.sequence.duplicates();
        self.stats
    }

    /// Drain whatever is queued without waiting; returns the number of datagrams processed
    #[cfg(test)]
    pub(crate) fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Some(datagram) = self.queue.try_dequeue() {
            self.process(datagram);
            processed += 1;
        }
        processed
    }
}
