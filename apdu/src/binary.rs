// Copyright (c) 2026 The Chip Auth Authors

//! READ BINARY / UPDATE BINARY APDUs for the selected file
//!
//! Both commands address the file by a 15-bit offset carried in `P1`/`P2`
//! and move at most [MAX_CHUNK] bytes per command, callers are responsible
//! for splitting larger transfers.

use encdec::Encode;

use super::{ApduError, ApduHeader, ApduReq, Instruction, MAX_CHUNK};

/// Largest addressable offset (`P1` bit 7 is reserved)
pub const MAX_OFFSET: u16 = 0x7FFF;

/// Read `len` bytes from `offset` in the selected file
///
/// ## Encoding:
/// ```text
/// +------+------+----------+----------+--------+
/// | 0x00 | 0xB0 | OFFSET_H | OFFSET_L | LE=LEN |
/// +------+------+----------+----------+--------+
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReadBinaryReq {
    pub offset: u16,
    pub len: u8,
}

impl ReadBinaryReq {
    /// Create a new [ReadBinaryReq], `len` must be in `1..=MAX_CHUNK`
    pub fn new(offset: u16, len: usize) -> Result<Self, ApduError> {
        if len == 0 || len > MAX_CHUNK || offset > MAX_OFFSET {
            return Err(ApduError::InvalidLength);
        }

        Ok(Self {
            offset,
            len: len as u8,
        })
    }
}

impl ApduReq for ReadBinaryReq {
    fn header(&self) -> ApduHeader {
        let [hi, lo] = self.offset.to_be_bytes();
        ApduHeader::new(Instruction::ReadBinary, hi, lo)
    }

    fn le(&self) -> Option<u8> {
        Some(self.len)
    }
}

impl Encode for ReadBinaryReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, ApduError> {
        Ok(0)
    }
}

/// Write `data` at `offset` in the selected file
///
/// ## Encoding:
/// ```text
/// +------+------+----------+----------+--------+------------------+
/// | 0x00 | 0xD6 | OFFSET_H | OFFSET_L | LC=LEN |   DATA (LEN)     |
/// +------+------+----------+----------+--------+------------------+
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UpdateBinaryReq<'a> {
    pub offset: u16,
    pub data: &'a [u8],
}

impl<'a> UpdateBinaryReq<'a> {
    /// Create a new [UpdateBinaryReq], `data` must be `1..=MAX_CHUNK` bytes
    pub fn new(offset: u16, data: &'a [u8]) -> Result<Self, ApduError> {
        if data.is_empty() || data.len() > MAX_CHUNK || offset > MAX_OFFSET {
            return Err(ApduError::InvalidLength);
        }

        Ok(Self { offset, data })
    }
}

impl<'a> ApduReq for UpdateBinaryReq<'a> {
    fn header(&self) -> ApduHeader {
        let [hi, lo] = self.offset.to_be_bytes();
        ApduHeader::new(Instruction::UpdateBinary, hi, lo)
    }
}

impl<'a> Encode for UpdateBinaryReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.data.len() {
            return Err(ApduError::InvalidLength);
        }

        buff[..self.data.len()].copy_from_slice(self.data);

        Ok(self.data.len())
    }
}
