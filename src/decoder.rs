//! Packet frame decoder
//!
//! Splits one datagram into its header, the mandatory reset message and the
//! template-tagged messages that follow. Every packet is decoded on its own:
//! the reset clears the value dictionary, so nothing carries over between packets.

use crate::error::ErrorKind;
use crate::protocol::*;
use crate::templates;
use crate::varint;
use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("stop-bit integer overflows {bits} bits")]
    Overflow { bits: u32 },

    #[error("expected reset template 120 after header, found {found}")]
    MissingReset { found: u32 },

    #[error("no reset template after header ({remaining} bytes remain)")]
    NoReset { remaining: usize },

    #[error("unexpected reset template at offset {offset}")]
    UnexpectedReset { offset: usize },

    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: i64 },

    #[error("unknown template id {0}")]
    UnknownTemplate(u32),

    #[error("message at offset {offset} (template {template_id}): {source}")]
    Message {
        template_id: u32,
        offset: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::Truncated { .. } => ErrorKind::Truncated,
            DecodeError::Overflow { .. }
            | DecodeError::MissingReset { .. }
            | DecodeError::NoReset { .. }
            | DecodeError::UnexpectedReset { .. }
            | DecodeError::InvalidField { .. } => ErrorKind::ProtocolViolation,
            DecodeError::UnknownTemplate(_) => ErrorKind::UnknownTemplate,
            DecodeError::Message { source, .. } => source.kind(),
        }
    }

    /// Innermost error, without message context
    pub fn root(&self) -> &DecodeError {
        match self {
            DecodeError::Message { source, .. } => source.root(),
            other => other,
        }
    }

    fn in_message(self, template_id: u32, offset: usize) -> Self {
        DecodeError::Message {
            template_id,
            offset,
            source: Box::new(self),
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Outcome of a fully decoded packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketSummary {
    pub header: PacketHeader,
    pub messages: usize,
    /// Always equals the packet length on success
    pub consumed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    pub header: PacketHeader,
    pub events: Vec<MarketEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecoder {
    layout: HeaderLayout,
}

const SEQUENCE: std::ops::Range<usize> = 0..4;
const SENDING_TIME: std::ops::Range<usize> = 4..12;
const SENDER_COMP_ID: std::ops::Range<usize> = 12..16;
const PARTITION_ID: std::ops::Range<usize> = 16..20;
const PERFORMANCE_INDICATOR: std::ops::Range<usize> = 20..22;

impl FrameDecoder {
    pub fn new(layout: HeaderLayout) -> Self {
        FrameDecoder { layout }
    }

    pub fn layout(&self) -> HeaderLayout {
        self.layout
    }

    /// Parse the fixed header. Returns the header and the offset of the reset message.
    pub fn decode_header(packet: &[u8], layout: HeaderLayout) -> DecodeResult<(PacketHeader, usize)> {
        let size = layout.header_size();
        if packet.len() < size {
            return Err(DecodeError::Truncated {
                need: size,
                have: packet.len(),
            });
        }

        let mut header = PacketHeader {
            sequence: LittleEndian::read_u32(&packet[SEQUENCE]),
            sending_time: LittleEndian::read_u64(&packet[SENDING_TIME]),
            sender_comp_id: LittleEndian::read_u32(&packet[SENDER_COMP_ID]),
            partition_id: None,
            performance_indicator: None,
        };
        if layout.is_emdi() {
            header.partition_id = Some(LittleEndian::read_u32(&packet[PARTITION_ID]));
            header.performance_indicator = Some(LittleEndian::read_u16(&packet[PERFORMANCE_INDICATOR]));
        }

        Ok((header, size))
    }

    /// Decode a packet, handing each event to `on_event` in message order.
    ///
    /// On error the rest of the packet is abandoned; events already handed out stay delivered.
    pub fn decode_packet_with<F>(&self, packet: &[u8], mut on_event: F) -> DecodeResult<PacketSummary>
    where
        F: FnMut(&PacketHeader, MarketEvent),
    {
        let (header, mut offset) = Self::decode_header(packet, self.layout)?;

        let (reset, consumed) = match varint::decode_u64(&packet[offset..]) {
            Ok(decoded) => decoded,
            Err(DecodeError::Truncated { .. }) => {
                return Err(DecodeError::NoReset {
                    remaining: packet.len() - offset,
                })
            }
            Err(e) => return Err(e),
        };
        if reset != u64::from(TID_RESET) {
            return Err(DecodeError::MissingReset {
                found: u32::try_from(reset).unwrap_or(u32::MAX),
            });
        }
        offset += consumed;

        let mut messages = 0;
        while offset < packet.len() {
            let start = offset;
            let (tid, consumed) = varint::decode_u64(&packet[offset..])?;
            let template_id = u32::try_from(tid).map_err(|_| DecodeError::Overflow { bits: 32 })?;
            offset += consumed;

            if template_id == TID_RESET {
                return Err(DecodeError::UnexpectedReset { offset: start });
            }
            let template = templates::lookup(template_id).ok_or(DecodeError::UnknownTemplate(template_id))?;

            let (event, consumed) =
                (template.decode)(&packet[offset..]).map_err(|e| e.in_message(template_id, start))?;
            offset += consumed;
            if offset > packet.len() {
                return Err(DecodeError::Truncated {
                    need: offset,
                    have: packet.len(),
                }
                .in_message(template_id, start));
            }

            on_event(&header, event);
            messages += 1;
        }

        Ok(PacketSummary {
            header,
            messages,
            consumed: offset,
        })
    }

    /// Decode a whole packet into owned events; all or nothing
    pub fn decode_packet(&self, packet: &[u8]) -> DecodeResult<DecodedPacket> {
        let mut events = Vec::new();
        let summary = self.decode_packet_with(packet, |_, event| events.push(event))?;
        Ok(DecodedPacket {
            header: summary.header,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::PacketWriter;
    use proptest::prelude::*;

    fn beacon(seq: u32) -> MarketEvent {
        MarketEvent::FunctionalBeacon(FunctionalBeacon {
            market_segment_id: 7,
            last_msg_seq_num: seq,
            transact_time: 1_700_000_000_000_000_000,
        })
    }

    #[test]
    fn test_decode_mdi_header() {
        let header = PacketHeader {
            sequence: 42,
            sending_time: 99,
            sender_comp_id: 3,
            ..Default::default()
        };
        let packet = PacketWriter::new(HeaderLayout::Mdi, &header).finish();
        let (decoded, offset) = FrameDecoder::decode_header(&packet, HeaderLayout::Mdi).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(offset, MDI_HEADER_SIZE);
    }

    #[test]
    fn test_header_too_small() {
        let result = FrameDecoder::decode_header(&[0u8; 20], HeaderLayout::Emdi);
        assert!(matches!(result, Err(DecodeError::Truncated { need: 22, have: 20 })));
    }

    #[test]
    fn test_header_only_packet_has_no_reset() {
        let packet = vec![0u8; MDI_HEADER_SIZE];
        let err = FrameDecoder::new(HeaderLayout::Mdi).decode_packet(&packet).unwrap_err();
        assert_eq!(err, DecodeError::NoReset { remaining: 0 });
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn test_unterminated_reset_is_violation() {
        let mut packet = vec![0u8; EMDI_HEADER_SIZE];
        packet.push(0x00);
        let err = FrameDecoder::new(HeaderLayout::Emdi).decode_packet(&packet).unwrap_err();
        assert_eq!(err, DecodeError::NoReset { remaining: 1 });
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn test_reset_only_packet_is_empty() {
        let packet = PacketWriter::new(HeaderLayout::Emdi, &PacketHeader::default()).finish();
        let decoded = FrameDecoder::new(HeaderLayout::Emdi).decode_packet(&packet).unwrap();
        assert!(decoded.events.is_empty());
    }

    #[test]
    fn test_second_reset_is_violation() {
        let mut writer = PacketWriter::new(HeaderLayout::Mdi, &PacketHeader::default());
        writer.push(&beacon(1)).push_raw(TID_RESET, &[]);
        let packet = writer.finish();
        let err = FrameDecoder::new(HeaderLayout::Mdi).decode_packet(&packet).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
        assert!(matches!(err, DecodeError::UnexpectedReset { .. }));
    }

    #[test]
    fn test_streaming_keeps_events_before_error() {
        let mut writer = PacketWriter::new(HeaderLayout::Mdi, &PacketHeader::default());
        writer.push(&beacon(1)).push(&beacon(2)).push_raw(77, &[0x80]);
        let packet = writer.finish();

        let mut seen = Vec::new();
        let result = FrameDecoder::new(HeaderLayout::Mdi).decode_packet_with(&packet, |_, e| seen.push(e));
        assert!(matches!(result, Err(DecodeError::UnknownTemplate(77))));
        assert_eq!(seen, vec![beacon(1), beacon(2)]);
    }

    #[test]
    fn test_body_error_carries_message_context() {
        let mut writer = PacketWriter::new(HeaderLayout::Mdi, &PacketHeader::default());
        // beacon body cut short after its first field
        writer.push_raw(TID_FUNCTIONAL_BEACON, &[0x87]);
        let packet = writer.finish();
        let err = FrameDecoder::new(HeaderLayout::Mdi).decode_packet(&packet).unwrap_err();
        match &err {
            DecodeError::Message { template_id, offset, .. } => {
                assert_eq!(*template_id, TID_FUNCTIONAL_BEACON);
                assert_eq!(*offset, MDI_HEADER_SIZE + 1);
            }
            other => panic!("expected message context, got {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Truncated);
        assert!(matches!(err.root(), DecodeError::Truncated { .. }));
    }

    proptest! {
        #[test]
        fn decode_random_input_does_not_panic(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            for layout in [HeaderLayout::Emdi, HeaderLayout::Mdi] {
                if let Ok(summary) = FrameDecoder::new(layout).decode_packet_with(&payload, |_, _| {}) {
                    prop_assert_eq!(summary.consumed, payload.len());
                }
            }
        }
    }
}
