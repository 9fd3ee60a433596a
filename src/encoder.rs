//! Packet writer
//!
//! Builds wire packets: header, reset, then messages. Used to drive simulated
//! feeds, replay fixtures and benchmarks.

use crate::protocol::*;
use crate::templates;
use crate::varint::{self, FieldWriter};
use byteorder::{ByteOrder, LittleEndian};

/// Write the fixed header for `layout`. EMDI fields missing from `header` are written as zero.
pub fn encode_header(header: &PacketHeader, layout: HeaderLayout, out: &mut Vec<u8>) {
    let start = out.len();
    out.resize(start + layout.header_size(), 0);
    let buf = &mut out[start..];
    LittleEndian::write_u32(&mut buf[0..4], header.sequence);
    LittleEndian::write_u64(&mut buf[4..12], header.sending_time);
    LittleEndian::write_u32(&mut buf[12..16], header.sender_comp_id);
    if layout.is_emdi() {
        LittleEndian::write_u32(&mut buf[16..20], header.partition_id.unwrap_or(0));
        LittleEndian::write_u16(&mut buf[20..22], header.performance_indicator.unwrap_or(0));
    }
}

pub struct PacketWriter {
    layout: HeaderLayout,
    body: FieldWriter,
    messages: usize,
}

impl PacketWriter {
    /// Start a packet: header followed by the reset message
    pub fn new(layout: HeaderLayout, header: &PacketHeader) -> Self {
        let mut buf = Vec::with_capacity(1500);
        encode_header(header, layout, &mut buf);
        varint::encode_u64_into(u64::from(TID_RESET), &mut buf);
        PacketWriter {
            layout,
            body: FieldWriter::with_buffer(buf),
            messages: 0,
        }
    }

    /// Append a message under the template id its variant uses for this layout
    pub fn push(&mut self, event: &MarketEvent) -> &mut Self {
        let tid = templates::template_id(event.kind(), self.layout);
        self.body.u32(tid);
        templates::encode_body(event, &mut self.body);
        self.messages += 1;
        self
    }

    /// Append a template id followed by a pre-encoded body
    pub fn push_raw(&mut self, template_id: u32, body: &[u8]) -> &mut Self {
        self.body.u32(template_id).raw(body);
        self.messages += 1;
        self
    }

    pub fn messages(&self) -> usize {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.body.into_inner()
    }
}
