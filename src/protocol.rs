//! MDI/EMDI wire model
//!
//! Packet layout: [header][reset, tid 120][message]*
//!
//! Fixed header, little-endian:
//!   - sequence: u32 (4 bytes)
//!   - sending_time: u64 (8 bytes) - exchange time, nanoseconds
//!   - sender_comp_id: u32 (4 bytes)
//!   - partition_id: u32 (4 bytes) - EMDI only
//!   - performance_indicator: u16 (2 bytes) - EMDI only
//!
//! Every message is a stop-bit template id followed by a stop-bit encoded body.

pub const TID_RESET: u32 = 120;
pub const TID_DEPTH_SNAPSHOT_EMDI: u32 = 93;
pub const TID_DEPTH_SNAPSHOT_MDI: u32 = 101;
pub const TID_DEPTH_INCREMENTAL_EMDI: u32 = 94;
pub const TID_DEPTH_INCREMENTAL_MDI: u32 = 102;
pub const TID_PRODUCT_STATE_CHANGE: u32 = 97;
pub const TID_INSTRUMENT_STATE_CHANGE: u32 = 98;
pub const TID_MASS_INSTRUMENT_STATE: u32 = 99;
pub const TID_INDEX_STATS: u32 = 50;
pub const TID_FUNCTIONAL_BEACON: u32 = 109;

pub const MDI_HEADER_SIZE: usize = 16;
/// partition_id (4) + performance_indicator (2)
pub const EMDI_EXTENSION_SIZE: usize = 6;
pub const EMDI_HEADER_SIZE: usize = MDI_HEADER_SIZE + EMDI_EXTENSION_SIZE;

/// Header variant of the feed. Selects the header width and the depth template ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderLayout {
    Emdi,
    Mdi,
}

impl HeaderLayout {
    pub fn from_emdi_flag(is_emdi: bool) -> Self {
        if is_emdi {
            HeaderLayout::Emdi
        } else {
            HeaderLayout::Mdi
        }
    }

    /// Byte width of the packet header, i.e. the offset of the reset message
    pub const fn header_size(self) -> usize {
        match self {
            HeaderLayout::Emdi => EMDI_HEADER_SIZE,
            HeaderLayout::Mdi => MDI_HEADER_SIZE,
        }
    }

    pub fn is_emdi(self) -> bool {
        self == HeaderLayout::Emdi
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    pub sequence: u32,
    pub sending_time: u64,
    pub sender_comp_id: u32,
    pub partition_id: Option<u32>,
    pub performance_indicator: Option<u16>,
}

/// FAST decimal: mantissa * 10^exponent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    pub mantissa: i64,
    pub exponent: i32,
}

impl Decimal {
    pub const MIN_EXPONENT: i32 = -63;
    pub const MAX_EXPONENT: i32 = 63;

    pub const fn new(mantissa: i64, exponent: i32) -> Self {
        Decimal { mantissa, exponent }
    }

    pub fn to_f64(self) -> f64 {
        self.mantissa as f64 * 10f64.powi(self.exponent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn from_code(v: u32) -> Option<Self> {
        match v {
            0 => Some(Side::Bid),
            1 => Some(Side::Ask),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Side::Bid => 0,
            Side::Ask => 1,
        }
    }
}

/// MDUpdateAction of an incremental depth entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateAction {
    New,
    Change,
    Delete,
    DeleteThru,
    DeleteFrom,
    Overlay,
}

impl UpdateAction {
    pub fn from_code(v: u32) -> Option<Self> {
        match v {
            0 => Some(UpdateAction::New),
            1 => Some(UpdateAction::Change),
            2 => Some(UpdateAction::Delete),
            3 => Some(UpdateAction::DeleteThru),
            4 => Some(UpdateAction::DeleteFrom),
            5 => Some(UpdateAction::Overlay),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            UpdateAction::New => 0,
            UpdateAction::Change => 1,
            UpdateAction::Delete => 2,
            UpdateAction::DeleteThru => 3,
            UpdateAction::DeleteFrom => 4,
            UpdateAction::Overlay => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexStatKind {
    Value,
    Open,
    High,
    Low,
    Close,
    Settlement,
}

impl IndexStatKind {
    pub fn from_code(v: u32) -> Option<Self> {
        match v {
            0 => Some(IndexStatKind::Value),
            1 => Some(IndexStatKind::Open),
            2 => Some(IndexStatKind::High),
            3 => Some(IndexStatKind::Low),
            4 => Some(IndexStatKind::Close),
            5 => Some(IndexStatKind::Settlement),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            IndexStatKind::Value => 0,
            IndexStatKind::Open => 1,
            IndexStatKind::High => 2,
            IndexStatKind::Low => 3,
            IndexStatKind::Close => 4,
            IndexStatKind::Settlement => 5,
        }
    }
}

/// One price level of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub side: Side,
    /// 1-based depth position
    pub level: u32,
    pub price: Decimal,
    pub size: u64,
    pub order_count: u32,
}

/// Full depth of one instrument, levels in wire order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthSnapshot {
    pub security_id: u64,
    pub rpt_seq: u32,
    pub levels: Vec<PriceLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthUpdate {
    pub action: UpdateAction,
    pub security_id: u64,
    pub rpt_seq: u32,
    pub entry: PriceLevel,
}

/// Ordered depth deltas, possibly spanning several instruments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthIncremental {
    pub updates: Vec<DepthUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductStateChange {
    pub market_segment_id: u32,
    pub trading_session_id: u32,
    pub trading_session_sub_id: u32,
    pub trad_ses_status: u32,
    pub fast_market: bool,
    pub transact_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentStateChange {
    pub security_id: u64,
    pub security_status: u32,
    pub trading_status: u32,
    pub fast_market: bool,
    pub transact_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentStatus {
    pub security_id: u64,
    pub security_status: u32,
    pub trading_status: u32,
}

/// Segment-wide state plus the instruments deviating from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MassInstrumentState {
    pub market_segment_id: u32,
    pub security_status: u32,
    pub trading_status: u32,
    pub transact_time: u64,
    pub exceptions: Vec<InstrumentStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStatEntry {
    pub kind: IndexStatKind,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub security_id: u64,
    pub transact_time: u64,
    pub entries: Vec<IndexStatEntry>,
}

/// Heartbeat carrying the last sequence number sent on the segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionalBeacon {
    pub market_segment_id: u32,
    pub last_msg_seq_num: u32,
    pub transact_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    DepthSnapshot,
    DepthIncremental,
    ProductStateChange,
    InstrumentStateChange,
    MassInstrumentState,
    IndexStats,
    FunctionalBeacon,
}

impl MessageKind {
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::DepthSnapshot => "DepthSnapshot",
            MessageKind::DepthIncremental => "DepthIncremental",
            MessageKind::ProductStateChange => "ProductStateChange",
            MessageKind::InstrumentStateChange => "InstrumentStateChange",
            MessageKind::MassInstrumentState => "MassInstrumentState",
            MessageKind::IndexStats => "IndexStats",
            MessageKind::FunctionalBeacon => "FunctionalBeacon",
        }
    }
}

/// A decoded message. The template id selects exactly one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketEvent {
    DepthSnapshot(DepthSnapshot),
    DepthIncremental(DepthIncremental),
    ProductStateChange(ProductStateChange),
    InstrumentStateChange(InstrumentStateChange),
    MassInstrumentState(MassInstrumentState),
    IndexStats(IndexStats),
    FunctionalBeacon(FunctionalBeacon),
}

impl MarketEvent {
    pub fn kind(&self) -> MessageKind {
        match self {
            MarketEvent::DepthSnapshot(_) => MessageKind::DepthSnapshot,
            MarketEvent::DepthIncremental(_) => MessageKind::DepthIncremental,
            MarketEvent::ProductStateChange(_) => MessageKind::ProductStateChange,
            MarketEvent::InstrumentStateChange(_) => MessageKind::InstrumentStateChange,
            MarketEvent::MassInstrumentState(_) => MessageKind::MassInstrumentState,
            MarketEvent::IndexStats(_) => MessageKind::IndexStats,
            MarketEvent::FunctionalBeacon(_) => MessageKind::FunctionalBeacon,
        }
    }
}
