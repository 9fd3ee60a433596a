//! Template registry
//!
//! Static table from template id to the event variant it produces and the
//! routine decoding its body. Body decoders are pure and report how many bytes
//! they consumed; the frame decoder advances by exactly that amount.

use crate::decoder::{DecodeError, DecodeResult};
use crate::protocol::*;
use crate::varint::{FieldReader, FieldWriter};

pub type BodyDecoder = fn(&[u8]) -> DecodeResult<(MarketEvent, usize)>;

#[derive(Clone, Copy)]
pub struct Template {
    pub id: u32,
    pub kind: MessageKind,
    pub decode: BodyDecoder,
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

static TEMPLATES: [Template; 9] = [
    Template { id: TID_DEPTH_SNAPSHOT_EMDI, kind: MessageKind::DepthSnapshot, decode: decode_depth_snapshot },
    Template { id: TID_DEPTH_SNAPSHOT_MDI, kind: MessageKind::DepthSnapshot, decode: decode_depth_snapshot },
    Template { id: TID_DEPTH_INCREMENTAL_EMDI, kind: MessageKind::DepthIncremental, decode: decode_depth_incremental },
    Template { id: TID_DEPTH_INCREMENTAL_MDI, kind: MessageKind::DepthIncremental, decode: decode_depth_incremental },
    Template { id: TID_PRODUCT_STATE_CHANGE, kind: MessageKind::ProductStateChange, decode: decode_product_state_change },
    Template { id: TID_INSTRUMENT_STATE_CHANGE, kind: MessageKind::InstrumentStateChange, decode: decode_instrument_state_change },
    Template { id: TID_MASS_INSTRUMENT_STATE, kind: MessageKind::MassInstrumentState, decode: decode_mass_instrument_state },
    Template { id: TID_INDEX_STATS, kind: MessageKind::IndexStats, decode: decode_index_stats },
    Template { id: TID_FUNCTIONAL_BEACON, kind: MessageKind::FunctionalBeacon, decode: decode_functional_beacon },
];

/// Look up a template. The reset template is framing, not a message, and is not registered.
pub fn lookup(id: u32) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// Template id a variant is sent under for the given header layout
pub fn template_id(kind: MessageKind, layout: HeaderLayout) -> u32 {
    match (kind, layout) {
        (MessageKind::DepthSnapshot, HeaderLayout::Emdi) => TID_DEPTH_SNAPSHOT_EMDI,
        (MessageKind::DepthSnapshot, HeaderLayout::Mdi) => TID_DEPTH_SNAPSHOT_MDI,
        (MessageKind::DepthIncremental, HeaderLayout::Emdi) => TID_DEPTH_INCREMENTAL_EMDI,
        (MessageKind::DepthIncremental, HeaderLayout::Mdi) => TID_DEPTH_INCREMENTAL_MDI,
        (MessageKind::ProductStateChange, _) => TID_PRODUCT_STATE_CHANGE,
        (MessageKind::InstrumentStateChange, _) => TID_INSTRUMENT_STATE_CHANGE,
        (MessageKind::MassInstrumentState, _) => TID_MASS_INSTRUMENT_STATE,
        (MessageKind::IndexStats, _) => TID_INDEX_STATS,
        (MessageKind::FunctionalBeacon, _) => TID_FUNCTIONAL_BEACON,
    }
}

fn side(r: &mut FieldReader) -> DecodeResult<Side> {
    let code = r.u32()?;
    Side::from_code(code).ok_or(DecodeError::InvalidField {
        field: "side",
        value: i64::from(code),
    })
}

fn price_level(r: &mut FieldReader) -> DecodeResult<PriceLevel> {
    Ok(PriceLevel {
        side: side(r)?,
        level: r.u32()?,
        price: r.decimal()?,
        size: r.u64()?,
        order_count: r.u32()?,
    })
}

fn decode_depth_snapshot(body: &[u8]) -> DecodeResult<(MarketEvent, usize)> {
    let mut r = FieldReader::new(body);
    let security_id = r.u64()?;
    let rpt_seq = r.u32()?;
    let count = r.group_len()?;
    let mut levels = Vec::with_capacity(count);
    for _ in 0..count {
        levels.push(price_level(&mut r)?);
    }
    let snapshot = DepthSnapshot {
        security_id,
        rpt_seq,
        levels,
    };
    Ok((MarketEvent::DepthSnapshot(snapshot), r.position()))
}

fn decode_depth_incremental(body: &[u8]) -> DecodeResult<(MarketEvent, usize)> {
    let mut r = FieldReader::new(body);
    let count = r.group_len()?;
    let mut updates = Vec::with_capacity(count);
    for _ in 0..count {
        let code = r.u32()?;
        let action = UpdateAction::from_code(code).ok_or(DecodeError::InvalidField {
            field: "update action",
            value: i64::from(code),
        })?;
        updates.push(DepthUpdate {
            action,
            security_id: r.u64()?,
            rpt_seq: r.u32()?,
            entry: price_level(&mut r)?,
        });
    }
    Ok((MarketEvent::DepthIncremental(DepthIncremental { updates }), r.position()))
}

fn decode_product_state_change(body: &[u8]) -> DecodeResult<(MarketEvent, usize)> {
    let mut r = FieldReader::new(body);
    let msg = ProductStateChange {
        market_segment_id: r.u32()?,
        trading_session_id: r.u32()?,
        trading_session_sub_id: r.u32()?,
        trad_ses_status: r.u32()?,
        fast_market: r.flag("fast market indicator")?,
        transact_time: r.u64()?,
    };
    Ok((MarketEvent::ProductStateChange(msg), r.position()))
}

fn decode_instrument_state_change(body: &[u8]) -> DecodeResult<(MarketEvent, usize)> {
    let mut r = FieldReader::new(body);
    let msg = InstrumentStateChange {
        security_id: r.u64()?,
        security_status: r.u32()?,
        trading_status: r.u32()?,
        fast_market: r.flag("fast market indicator")?,
        transact_time: r.u64()?,
    };
    Ok((MarketEvent::InstrumentStateChange(msg), r.position()))
}

fn decode_mass_instrument_state(body: &[u8]) -> DecodeResult<(MarketEvent, usize)> {
    let mut r = FieldReader::new(body);
    let market_segment_id = r.u32()?;
    let security_status = r.u32()?;
    let trading_status = r.u32()?;
    let transact_time = r.u64()?;
    let count = r.group_len()?;
    let mut exceptions = Vec::with_capacity(count);
    for _ in 0..count {
        exceptions.push(InstrumentStatus {
            security_id: r.u64()?,
            security_status: r.u32()?,
            trading_status: r.u32()?,
        });
    }
    let msg = MassInstrumentState {
        market_segment_id,
        security_status,
        trading_status,
        transact_time,
        exceptions,
    };
    Ok((MarketEvent::MassInstrumentState(msg), r.position()))
}

fn decode_index_stats(body: &[u8]) -> DecodeResult<(MarketEvent, usize)> {
    let mut r = FieldReader::new(body);
    let security_id = r.u64()?;
    let transact_time = r.u64()?;
    let count = r.group_len()?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let code = r.u32()?;
        let kind = IndexStatKind::from_code(code).ok_or(DecodeError::InvalidField {
            field: "index stat kind",
            value: i64::from(code),
        })?;
        entries.push(IndexStatEntry {
            kind,
            value: r.decimal()?,
        });
    }
    let msg = IndexStats {
        security_id,
        transact_time,
        entries,
    };
    Ok((MarketEvent::IndexStats(msg), r.position()))
}

fn decode_functional_beacon(body: &[u8]) -> DecodeResult<(MarketEvent, usize)> {
    let mut r = FieldReader::new(body);
    let msg = FunctionalBeacon {
        market_segment_id: r.u32()?,
        last_msg_seq_num: r.u32()?,
        transact_time: r.u64()?,
    };
    Ok((MarketEvent::FunctionalBeacon(msg), r.position()))
}

fn write_price_level(w: &mut FieldWriter, level: &PriceLevel) {
    w.u32(level.side.code())
        .u32(level.level)
        .decimal(level.price)
        .u64(level.size)
        .u32(level.order_count);
}

/// Encode the body of `event` (without its template id)
pub fn encode_body(event: &MarketEvent, w: &mut FieldWriter) {
    match event {
        MarketEvent::DepthSnapshot(m) => {
            w.u64(m.security_id).u32(m.rpt_seq).u64(m.levels.len() as u64);
            for level in &m.levels {
                write_price_level(w, level);
            }
        }
        MarketEvent::DepthIncremental(m) => {
            w.u64(m.updates.len() as u64);
            for update in &m.updates {
                w.u32(update.action.code())
                    .u64(update.security_id)
                    .u32(update.rpt_seq);
                write_price_level(w, &update.entry);
            }
        }
        MarketEvent::ProductStateChange(m) => {
            w.u32(m.market_segment_id)
                .u32(m.trading_session_id)
                .u32(m.trading_session_sub_id)
                .u32(m.trad_ses_status)
                .flag(m.fast_market)
                .u64(m.transact_time);
        }
        MarketEvent::InstrumentStateChange(m) => {
            w.u64(m.security_id)
                .u32(m.security_status)
                .u32(m.trading_status)
                .flag(m.fast_market)
                .u64(m.transact_time);
        }
        MarketEvent::MassInstrumentState(m) => {
            w.u32(m.market_segment_id)
                .u32(m.security_status)
                .u32(m.trading_status)
                .u64(m.transact_time)
                .u64(m.exceptions.len() as u64);
            for status in &m.exceptions {
                w.u64(status.security_id)
                    .u32(status.security_status)
                    .u32(status.trading_status);
            }
        }
        MarketEvent::IndexStats(m) => {
            w.u64(m.security_id)
                .u64(m.transact_time)
                .u64(m.entries.len() as u64);
            for entry in &m.entries {
                w.u32(entry.kind.code()).decimal(entry.value);
            }
        }
        MarketEvent::FunctionalBeacon(m) => {
            w.u32(m.market_segment_id)
                .u32(m.last_msg_seq_num)
                .u64(m.transact_time);
        }
    }
}
