//! Packet framing and template conformance tests

use mdi_feed::varint::FieldWriter;
use mdi_feed::*;
use proptest::prelude::*;

fn header(seq: u32) -> PacketHeader {
    PacketHeader {
        sequence: seq,
        sending_time: 1_700_000_000_123_456_789,
        sender_comp_id: 11,
        partition_id: Some(4),
        performance_indicator: Some(2),
    }
}

fn level(side: Side, level: u32, mantissa: i64, size: u64) -> PriceLevel {
    PriceLevel {
        side,
        level,
        price: Decimal::new(mantissa, -2),
        size,
        order_count: 1,
    }
}

fn snapshot() -> MarketEvent {
    MarketEvent::DepthSnapshot(DepthSnapshot {
        security_id: 2_000_001,
        rpt_seq: 88,
        levels: vec![
            level(Side::Bid, 1, 99_75, 10),
            level(Side::Bid, 2, 99_50, 25),
            level(Side::Ask, 1, 100_00, 7),
        ],
    })
}

fn incremental() -> MarketEvent {
    MarketEvent::DepthIncremental(DepthIncremental {
        updates: vec![
            DepthUpdate {
                action: UpdateAction::Delete,
                security_id: 2_000_001,
                rpt_seq: 89,
                entry: level(Side::Bid, 2, 99_50, 0),
            },
            DepthUpdate {
                action: UpdateAction::New,
                security_id: 2_000_001,
                rpt_seq: 90,
                entry: level(Side::Ask, 2, 100_25, 3),
            },
        ],
    })
}

fn every_variant() -> Vec<MarketEvent> {
    vec![
        snapshot(),
        incremental(),
        MarketEvent::ProductStateChange(ProductStateChange {
            market_segment_id: 3,
            trading_session_id: 1,
            trading_session_sub_id: 3,
            trad_ses_status: 2,
            fast_market: true,
            transact_time: 1_700_000_000_000_000_001,
        }),
        MarketEvent::InstrumentStateChange(InstrumentStateChange {
            security_id: 2_000_001,
            security_status: 1,
            trading_status: 17,
            fast_market: false,
            transact_time: 1_700_000_000_000_000_002,
        }),
        MarketEvent::MassInstrumentState(MassInstrumentState {
            market_segment_id: 3,
            security_status: 1,
            trading_status: 17,
            transact_time: 1_700_000_000_000_000_003,
            exceptions: vec![InstrumentStatus {
                security_id: 2_000_009,
                security_status: 2,
                trading_status: 18,
            }],
        }),
        MarketEvent::IndexStats(IndexStats {
            security_id: 900,
            transact_time: 1_700_000_000_000_000_004,
            entries: vec![
                IndexStatEntry {
                    kind: IndexStatKind::Value,
                    value: Decimal::new(-123_456, -3),
                },
                IndexStatEntry {
                    kind: IndexStatKind::Settlement,
                    value: Decimal::new(5, 2),
                },
            ],
        }),
        MarketEvent::FunctionalBeacon(FunctionalBeacon {
            market_segment_id: 3,
            last_msg_seq_num: 1234,
            transact_time: 1_700_000_000_000_000_005,
        }),
    ]
}

fn packet(layout: HeaderLayout, seq: u32, events: &[MarketEvent]) -> Vec<u8> {
    let mut writer = PacketWriter::new(layout, &header(seq));
    for event in events {
        writer.push(event);
    }
    writer.finish()
}

#[test]
fn test_snapshot_then_incremental_in_order() {
    let bytes = packet(HeaderLayout::Emdi, 5, &[snapshot(), incremental()]);
    let decoded = FrameDecoder::new(HeaderLayout::Emdi).decode_packet(&bytes).unwrap();

    assert_eq!(decoded.header, header(5));
    assert_eq!(decoded.events, vec![snapshot(), incremental()]);
}

#[test]
fn test_every_variant_both_layouts() {
    for layout in [HeaderLayout::Emdi, HeaderLayout::Mdi] {
        let bytes = packet(layout, 1, &every_variant());
        let mut kinds = Vec::new();
        let summary = FrameDecoder::new(layout)
            .decode_packet_with(&bytes, |_, event| kinds.push(event.kind()))
            .unwrap();

        assert_eq!(summary.messages, 7);
        assert_eq!(summary.consumed, bytes.len());
        assert_eq!(
            kinds,
            every_variant().iter().map(MarketEvent::kind).collect::<Vec<_>>()
        );
    }
}

#[test]
fn test_mdi_header_drops_emdi_fields() {
    let bytes = packet(HeaderLayout::Mdi, 9, &[]);
    let decoded = FrameDecoder::new(HeaderLayout::Mdi).decode_packet(&bytes).unwrap();
    assert_eq!(decoded.header.sequence, 9);
    assert_eq!(decoded.header.partition_id, None);
    assert_eq!(decoded.header.performance_indicator, None);
}

#[test]
fn test_depth_ids_accepted_under_either_layout() {
    // an MDI-numbered snapshot inside an EMDI packet still decodes
    let mut body = FieldWriter::new();
    body.u64(1).u32(2).u64(0);
    let mut writer = PacketWriter::new(HeaderLayout::Emdi, &header(1));
    writer.push_raw(TID_DEPTH_SNAPSHOT_MDI, body.as_slice());
    let decoded = FrameDecoder::new(HeaderLayout::Emdi).decode_packet(&writer.finish()).unwrap();

    assert_eq!(
        decoded.events,
        vec![MarketEvent::DepthSnapshot(DepthSnapshot {
            security_id: 1,
            rpt_seq: 2,
            levels: Vec::new(),
        })]
    );
}

#[test]
fn test_wrong_reset_id_is_protocol_violation() {
    let mut bytes = packet(HeaderLayout::Emdi, 1, &[snapshot()]);
    bytes[EMDI_HEADER_SIZE] = 0x80 | 93;

    let mut events = 0;
    let err = FrameDecoder::new(HeaderLayout::Emdi)
        .decode_packet_with(&bytes, |_, _| events += 1)
        .unwrap_err();
    assert_eq!(events, 0);
    assert_eq!(err, DecodeError::MissingReset { found: 93 });
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
}

#[test]
fn test_layout_mismatch_is_detected() {
    // an MDI packet read as EMDI sees body bytes where the reset should be
    let bytes = packet(HeaderLayout::Mdi, 1, &every_variant());
    let result = FrameDecoder::new(HeaderLayout::Emdi).decode_packet(&bytes);
    assert!(result.is_err());
}

#[test]
fn test_unknown_template_abandons_packet() {
    let mut writer = PacketWriter::new(HeaderLayout::Emdi, &header(1));
    writer.push(&snapshot()).push_raw(31, &[0x81, 0x82]).push(&incremental());
    let bytes = writer.finish();

    let mut kinds = Vec::new();
    let err = FrameDecoder::new(HeaderLayout::Emdi)
        .decode_packet_with(&bytes, |_, event| kinds.push(event.kind()))
        .unwrap_err();
    assert_eq!(err, DecodeError::UnknownTemplate(31));
    assert_eq!(kinds, vec![MessageKind::DepthSnapshot]);
}

#[test]
fn test_truncated_body_at_every_cut() {
    let bytes = packet(HeaderLayout::Emdi, 1, &[incremental()]);
    let decoder = FrameDecoder::new(HeaderLayout::Emdi);
    // from the template id onwards, every shorter prefix must fail as truncated
    for cut in (EMDI_HEADER_SIZE + 2)..bytes.len() {
        let err = decoder.decode_packet(&bytes[..cut]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated, "cut at {cut}");
    }
}

#[test]
fn test_bad_enum_code_is_protocol_violation() {
    let mut body = FieldWriter::new();
    // one update with action code 9
    body.u64(1).u32(9).u64(1).u32(1);
    let mut writer = PacketWriter::new(HeaderLayout::Mdi, &header(1));
    writer.push_raw(TID_DEPTH_INCREMENTAL_MDI, body.as_slice());

    let err = FrameDecoder::new(HeaderLayout::Mdi).decode_packet(&writer.finish()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert!(matches!(err.root(), DecodeError::InvalidField { .. }));
}

proptest! {
    #[test]
    fn emdi_offset_is_mdi_offset_plus_extension(raw in proptest::collection::vec(any::<u8>(), EMDI_HEADER_SIZE)) {
        let (mdi, mdi_offset) = FrameDecoder::decode_header(&raw, HeaderLayout::Mdi).unwrap();
        let (emdi, emdi_offset) = FrameDecoder::decode_header(&raw, HeaderLayout::Emdi).unwrap();

        prop_assert_eq!(emdi_offset, mdi_offset + EMDI_EXTENSION_SIZE);
        prop_assert_eq!(mdi.sequence, emdi.sequence);
        prop_assert_eq!(mdi.sending_time, emdi.sending_time);
        prop_assert!(emdi.partition_id.is_some());
    }

    #[test]
    fn decode_consumes_exactly_what_was_written(seq in any::<u32>(), count in 0usize..6, emdi in any::<bool>()) {
        let layout = HeaderLayout::from_emdi_flag(emdi);
        let events: Vec<MarketEvent> = every_variant().into_iter().cycle().take(count * 3).collect();
        let bytes = packet(layout, seq, &events);

        let summary = FrameDecoder::new(layout).decode_packet_with(&bytes, |_, _| {}).unwrap();
        prop_assert_eq!(summary.consumed, bytes.len());
        prop_assert_eq!(summary.messages, events.len());
        prop_assert_eq!(summary.header.sequence, seq);
    }
}
