//! Shared fixtures for unit tests

use crate::encoder::PacketWriter;
use crate::error::{ErrorKind, FeedError};
use crate::protocol::*;
use crate::sink::EventSink;
use parking_lot::Mutex;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Delivered {
    pub kind: MessageKind,
    pub sequence: u32,
}

/// Records every callback in arrival order
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<Delivered>>,
    errors: Mutex<Vec<ErrorKind>>,
}

impl RecordingSink {
    fn record(&self, header: &PacketHeader, kind: MessageKind) {
        self.events.lock().push(Delivered {
            kind,
            sequence: header.sequence,
        });
    }

    pub(crate) fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    pub(crate) fn kinds(&self) -> Vec<MessageKind> {
        self.events.lock().iter().map(|d| d.kind).collect()
    }

    pub(crate) fn sequences(&self) -> Vec<u32> {
        self.events.lock().iter().map(|d| d.sequence).collect()
    }

    pub(crate) fn error_kinds(&self) -> Vec<ErrorKind> {
        self.errors.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn on_depth_snapshot(&self, header: &PacketHeader, _: DepthSnapshot) {
        self.record(header, MessageKind::DepthSnapshot);
    }

    fn on_depth_incremental(&self, header: &PacketHeader, _: DepthIncremental) {
        self.record(header, MessageKind::DepthIncremental);
    }

    fn on_product_state_change(&self, header: &PacketHeader, _: ProductStateChange) {
        self.record(header, MessageKind::ProductStateChange);
    }

    fn on_instrument_state_change(&self, header: &PacketHeader, _: InstrumentStateChange) {
        self.record(header, MessageKind::InstrumentStateChange);
    }

    fn on_mass_instrument_state(&self, header: &PacketHeader, _: MassInstrumentState) {
        self.record(header, MessageKind::MassInstrumentState);
    }

    fn on_index_stats(&self, header: &PacketHeader, _: IndexStats) {
        self.record(header, MessageKind::IndexStats);
    }

    fn on_functional_beacon(&self, header: &PacketHeader, _: FunctionalBeacon) {
        self.record(header, MessageKind::FunctionalBeacon);
    }

    fn on_error(&self, error: FeedError) {
        self.errors.lock().push(error.kind());
    }
}

fn header(seq: u32) -> PacketHeader {
    PacketHeader {
        sequence: seq,
        sending_time: 1_700_000_000_000_000_000,
        sender_comp_id: 7,
        partition_id: Some(1),
        performance_indicator: Some(0),
    }
}

/// EMDI packet with a single functional beacon
pub(crate) fn beacon_packet(seq: u32) -> Vec<u8> {
    let mut writer = PacketWriter::new(HeaderLayout::Emdi, &header(seq));
    writer.push(&MarketEvent::FunctionalBeacon(FunctionalBeacon {
        market_segment_id: 5,
        last_msg_seq_num: seq,
        transact_time: 1_700_000_000_000_000_000,
    }));
    writer.finish()
}

/// EMDI packet with a snapshot followed by an incremental
pub(crate) fn depth_packet(seq: u32) -> Vec<u8> {
    let level = PriceLevel {
        side: Side::Bid,
        level: 1,
        price: Decimal::new(10125, -2),
        size: 40,
        order_count: 3,
    };
    let mut writer = PacketWriter::new(HeaderLayout::Emdi, &header(seq));
    writer
        .push(&MarketEvent::DepthSnapshot(DepthSnapshot {
            security_id: 1001,
            rpt_seq: 10,
            levels: vec![level],
        }))
        .push(&MarketEvent::DepthIncremental(DepthIncremental {
            updates: vec![DepthUpdate {
                action: UpdateAction::Change,
                security_id: 1001,
                rpt_seq: 11,
                entry: PriceLevel { size: 55, ..level },
            }],
        }));
    writer.finish()
}

/// Poll `cond` until it holds or five seconds pass
pub(crate) fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
