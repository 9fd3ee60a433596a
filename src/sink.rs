//! Event sink capability implemented by the consuming application
//!
//! Event callbacks run synchronously on the processor thread, in message
//! order. `on_error` may also be called from the receiver thread (read errors,
//! dropped datagrams), hence `Sync`. Callbacks must not block indefinitely:
//! a slow sink throttles decoding.

use crate::error::FeedError;
use crate::protocol::*;

#[allow(unused_variables)]
pub trait EventSink: Send + Sync + 'static {
    fn on_depth_snapshot(&self, header: &PacketHeader, snapshot: DepthSnapshot) {}

    fn on_depth_incremental(&self, header: &PacketHeader, incremental: DepthIncremental) {}

    fn on_product_state_change(&self, header: &PacketHeader, change: ProductStateChange) {}

    fn on_instrument_state_change(&self, header: &PacketHeader, change: InstrumentStateChange) {}

    fn on_mass_instrument_state(&self, header: &PacketHeader, state: MassInstrumentState) {}

    fn on_index_stats(&self, header: &PacketHeader, stats: IndexStats) {}

    fn on_functional_beacon(&self, header: &PacketHeader, beacon: FunctionalBeacon) {}

    fn on_error(&self, error: FeedError);
}

/// Hand an event to the callback matching its variant
pub fn dispatch<S: EventSink + ?Sized>(sink: &S, header: &PacketHeader, event: MarketEvent) {
    match event {
        MarketEvent::DepthSnapshot(m) => sink.on_depth_snapshot(header, m),
        MarketEvent::DepthIncremental(m) => sink.on_depth_incremental(header, m),
        MarketEvent::ProductStateChange(m) => sink.on_product_state_change(header, m),
        MarketEvent::InstrumentStateChange(m) => sink.on_instrument_state_change(header, m),
        MarketEvent::MassInstrumentState(m) => sink.on_mass_instrument_state(header, m),
        MarketEvent::IndexStats(m) => sink.on_index_stats(header, m),
        MarketEvent::FunctionalBeacon(m) => sink.on_functional_beacon(header, m),
    }
}
