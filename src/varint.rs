//! FAST stop-bit integer codec
//!
//! Each byte carries 7 value bits, most significant group first. The high bit
//! of a byte is set on the last byte of the field. Signed integers are two's
//! complement with the sign in bit 6 of the first byte.

use crate::decoder::{DecodeError, DecodeResult};
use crate::protocol::Decimal;

pub const STOP_BIT: u8 = 0x80;
const VALUE_MASK: u8 = 0x7F;
const SIGN_BIT: u8 = 0x40;

/// Longest minimal encoding of a 64-bit value
pub const MAX_ENCODED_LEN: usize = 10;

/// Decode an unsigned stop-bit integer. Returns the value and the bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> DecodeResult<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if value > u64::MAX >> 7 {
            return Err(DecodeError::Overflow { bits: 64 });
        }
        value = (value << 7) | u64::from(byte & VALUE_MASK);
        if byte & STOP_BIT != 0 {
            return Ok((value, i + 1));
        }
    }
    Err(DecodeError::Truncated {
        need: bytes.len() + 1,
        have: bytes.len(),
    })
}

/// Decode a signed stop-bit integer
pub fn decode_i64(bytes: &[u8]) -> DecodeResult<(i64, usize)> {
    let first = match bytes.first() {
        Some(&b) => b,
        None => return Err(DecodeError::Truncated { need: 1, have: 0 }),
    };
    let mut value: i64 = if first & SIGN_BIT != 0 { -1 } else { 0 };
    for (i, &byte) in bytes.iter().enumerate() {
        if value > i64::MAX >> 7 || value < i64::MIN >> 7 {
            return Err(DecodeError::Overflow { bits: 64 });
        }
        value = (value << 7) | i64::from(byte & VALUE_MASK);
        if byte & STOP_BIT != 0 {
            return Ok((value, i + 1));
        }
    }
    Err(DecodeError::Truncated {
        need: bytes.len() + 1,
        have: bytes.len(),
    })
}

/// Append the minimal encoding of `value`, returning the number of bytes written
pub fn encode_u64_into(value: u64, out: &mut Vec<u8>) -> usize {
    let mut groups = [0u8; MAX_ENCODED_LEN];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v as u8) & VALUE_MASK;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    push_groups(&groups[..n], out);
    n
}

pub fn encode_i64_into(value: i64, out: &mut Vec<u8>) -> usize {
    let mut groups = [0u8; MAX_ENCODED_LEN];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v as u8) & VALUE_MASK;
        n += 1;
        // done once the remaining bits are pure sign extension of bit 6
        let done = v >> 6 == 0 || v >> 6 == -1;
        v >>= 7;
        if done {
            break;
        }
    }
    push_groups(&groups[..n], out);
    n
}

pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_ENCODED_LEN);
    encode_u64_into(value, &mut out);
    out
}

pub fn encode_i64(value: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_ENCODED_LEN);
    encode_i64_into(value, &mut out);
    out
}

// groups are least significant first
fn push_groups(groups: &[u8], out: &mut Vec<u8>) {
    for (i, &group) in groups.iter().enumerate().rev() {
        if i == 0 {
            out.push(group | STOP_BIT);
        } else {
            out.push(group);
        }
    }
}

/// Cursor over a message body
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        FieldReader { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn u64(&mut self) -> DecodeResult<u64> {
        let (value, consumed) = decode_u64(&self.buf[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    pub fn u32(&mut self) -> DecodeResult<u32> {
        let value = self.u64()?;
        u32::try_from(value).map_err(|_| DecodeError::Overflow { bits: 32 })
    }

    pub fn i64(&mut self) -> DecodeResult<i64> {
        let (value, consumed) = decode_i64(&self.buf[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    pub fn i32(&mut self) -> DecodeResult<i32> {
        let value = self.i64()?;
        i32::try_from(value).map_err(|_| DecodeError::Overflow { bits: 32 })
    }

    /// Exponent then mantissa
    pub fn decimal(&mut self) -> DecodeResult<Decimal> {
        let exponent = self.i32()?;
        if !(Decimal::MIN_EXPONENT..=Decimal::MAX_EXPONENT).contains(&exponent) {
            return Err(DecodeError::InvalidField {
                field: "decimal exponent",
                value: i64::from(exponent),
            });
        }
        let mantissa = self.i64()?;
        Ok(Decimal { mantissa, exponent })
    }

    /// 0/1 flag
    pub fn flag(&mut self, field: &'static str) -> DecodeResult<bool> {
        match self.u64()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidField {
                field,
                value: other as i64,
            }),
        }
    }

    /// Repeating group length. Bounded by the bytes left since every entry takes at least one.
    pub fn group_len(&mut self) -> DecodeResult<usize> {
        let count = self.u64()?;
        let remaining = self.remaining() as u64;
        if count > remaining {
            return Err(DecodeError::Truncated {
                need: usize::try_from(count).unwrap_or(usize::MAX),
                have: self.remaining(),
            });
        }
        Ok(count as usize)
    }
}

/// Body builder, the inverse of `FieldReader`
#[derive(Debug, Default, Clone)]
pub struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buf: Vec<u8>) -> Self {
        FieldWriter { buf }
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        encode_u64_into(value, &mut self.buf);
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.u64(u64::from(value))
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        encode_i64_into(value, &mut self.buf);
        self
    }

    pub fn decimal(&mut self, value: Decimal) -> &mut Self {
        self.i64(i64::from(value.exponent));
        self.i64(value.mantissa)
    }

    pub fn flag(&mut self, value: bool) -> &mut Self {
        self.u64(u64::from(value))
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
