//! Synthetic feed simulator
//!
//! Generates a random EMDI depth feed, runs it through a session and prints
//! what the sink saw. Every tenth packet skips a sequence number to exercise
//! gap accounting.
//!
//! Usage: feed_simulator [packet_count] [config.toml]

use mdi_feed::*;
use rand::Rng;
use std::env;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct Counters {
    snapshots: AtomicU64,
    increments: AtomicU64,
    beacons: AtomicU64,
    errors: AtomicU64,
}

impl EventSink for Counters {
    fn on_depth_snapshot(&self, _: &PacketHeader, _: DepthSnapshot) {
        self.snapshots.fetch_add(1, Ordering::Relaxed);
    }

    fn on_depth_incremental(&self, _: &PacketHeader, incremental: DepthIncremental) {
        self.increments.fetch_add(incremental.updates.len() as u64, Ordering::Relaxed);
    }

    fn on_functional_beacon(&self, _: &PacketHeader, _: FunctionalBeacon) {
        self.beacons.fetch_add(1, Ordering::Relaxed);
    }

    fn on_error(&self, error: FeedError) {
        tracing::warn!(%error, "feed error");
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

fn random_level(rng: &mut impl Rng, side: Side, level: u32) -> PriceLevel {
    let offset = i64::from(level) * 25;
    let mantissa = match side {
        Side::Bid => 100_000 - offset,
        Side::Ask => 100_000 + offset,
    };
    PriceLevel {
        side,
        level,
        price: Decimal::new(mantissa, -2),
        size: rng.gen_range(1..1_000),
        order_count: rng.gen_range(1..20),
    }
}

fn random_event(rng: &mut impl Rng, security_id: u64, rpt_seq: &mut u32) -> MarketEvent {
    *rpt_seq += 1;
    match rng.gen_range(0..100) {
        0..=4 => MarketEvent::DepthSnapshot(DepthSnapshot {
            security_id,
            rpt_seq: *rpt_seq,
            levels: (1..=5)
                .flat_map(|level| [Side::Bid, Side::Ask].map(|side| (side, level)))
                .map(|(side, level)| random_level(rng, side, level))
                .collect(),
        }),
        5..=7 => MarketEvent::FunctionalBeacon(FunctionalBeacon {
            market_segment_id: 1,
            last_msg_seq_num: *rpt_seq,
            transact_time: 0,
        }),
        _ => {
            let side = if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
            let level = rng.gen_range(1..=5);
            MarketEvent::DepthIncremental(DepthIncremental {
                updates: vec![DepthUpdate {
                    action: UpdateAction::Change,
                    security_id,
                    rpt_seq: *rpt_seq,
                    entry: random_level(rng, side, level),
                }],
            })
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let packet_count: u32 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10_000);
    let config = match args.get(2) {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::new(Ipv4Addr::new(239, 195, 1, 1), 40_001, Service::A, "sim"),
    };
    let layout = config.header_layout();

    let counters = Arc::new(Counters::default());
    let mut session = Session::with_shared_sink(config, counters.clone());
    let (tx, source) = ChannelSource::pair();
    session.connect_source(source)?;

    let mut rng = rand::thread_rng();
    let mut rpt_seq = 0u32;
    let mut seq = 1u32;
    for i in 0..packet_count {
        if i % 10 == 9 {
            seq += 1;
        }
        let header = PacketHeader {
            sequence: seq,
            sending_time: u64::from(i) * 1_000,
            sender_comp_id: 1,
            partition_id: Some(1),
            performance_indicator: Some(0),
        };
        let mut writer = PacketWriter::new(layout, &header);
        for _ in 0..rng.gen_range(1..8) {
            let security_id = 1_000 + rng.gen_range(0..4);
            let event = random_event(&mut rng, security_id, &mut rpt_seq);
            writer.push(&event);
        }
        if tx.send(writer.finish()).is_err() {
            break;
        }
        seq += 1;
    }

    // let the processor drain before stopping
    thread::sleep(Duration::from_millis(500));
    let stats = session.disconnect().unwrap_or_default();

    println!("packets:      {}", stats.processor.packets);
    println!("snapshots:    {}", counters.snapshots.load(Ordering::Relaxed));
    println!("increments:   {}", counters.increments.load(Ordering::Relaxed));
    println!("beacons:      {}", counters.beacons.load(Ordering::Relaxed));
    println!("errors:       {}", counters.errors.load(Ordering::Relaxed));
    println!("dropped:      {}", stats.receiver.dropped);
    println!("seq gaps:     {}", stats.processor.sequence_gaps);
    if let Some(latency) = stats.processor.latency.stats() {
        println!("latency p50:  {}us", latency.p50_us);
        println!("latency p99:  {}us", latency.p99_us);
    }
    Ok(())
}
