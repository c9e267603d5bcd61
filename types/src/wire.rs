// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Minimal protobuf wire primitives.
//!
//! The content addressing of the DAG is defined over the protobuf encoding of
//! its nodes, and invocation signatures cover a deterministic protobuf
//! encoding of the invocation. Only wire types 0 (varint) and 2
//! (length-delimited) exist in either encoding; anything else is a hard
//! protocol error.

use thiserror::Error;

const WIRE_VARINT: u8 = 0;
const WIRE_LEN_DELIMITED: u8 = 2;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("varint overruns the buffer")]
    TruncatedVarint,
    #[error("varint exceeds 64 bits")]
    OversizedVarint,
    #[error("field {field} overruns the buffer")]
    TruncatedField { field: u64 },
    #[error("unsupported wire type {wire_type} for field {field}")]
    UnsupportedWireType { field: u64, wire_type: u8 },
}

pub fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

pub fn put_varint_field(buf: &mut Vec<u8>, field: u64, value: u64) {
    put_varint(buf, field << 3 | WIRE_VARINT as u64);
    put_varint(buf, value);
}

pub fn put_bytes_field(buf: &mut Vec<u8>, field: u64, bytes: &[u8]) {
    put_varint(buf, field << 3 | WIRE_LEN_DELIMITED as u64);
    put_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

pub fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, WireError> {
    let mut value: u64 = 0;
    let mut shift = 0;
    loop {
        let byte = *buf.get(*pos).ok_or(WireError::TruncatedVarint)?;
        *pos += 1;
        if shift >= 64 {
            return Err(WireError::OversizedVarint);
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// A decoded field value. Varints carry their integer; length-delimited
/// fields borrow their payload from the input buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireValue<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
}

/// Walks the fields of a wire-encoded message in order.
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_field(&mut self) -> Result<(u64, WireValue<'a>), WireError> {
        let key = read_varint(self.buf, &mut self.pos)?;
        let field = key >> 3;
        let wire_type = (key & 0x7) as u8;
        match wire_type {
            WIRE_VARINT => {
                let value = read_varint(self.buf, &mut self.pos)
                    .map_err(|_| WireError::TruncatedField { field })?;
                Ok((field, WireValue::Varint(value)))
            },
            WIRE_LEN_DELIMITED => {
                let len = read_varint(self.buf, &mut self.pos)
                    .map_err(|_| WireError::TruncatedField { field })?
                    as usize;
                let end = self
                    .pos
                    .checked_add(len)
                    .filter(|end| *end <= self.buf.len())
                    .ok_or(WireError::TruncatedField { field })?;
                let bytes = &self.buf[self.pos..end];
                self.pos = end;
                Ok((field, WireValue::Bytes(bytes)))
            },
            wire_type => Err(WireError::UnsupportedWireType { field, wire_type }),
        }
    }
}

impl<'a> Iterator for FieldReader<'a> {
    type Item = Result<(u64, WireValue<'a>), WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        Some(self.read_field())
    }
}
