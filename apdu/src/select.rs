// Copyright (c) 2026 The Chip Auth Authors

//! SELECT APDUs, for choosing the active application or file

use encdec::Encode;

use super::{ApduError, ApduHeader, ApduReq, Instruction};

/// SELECT target
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SelectKind {
    /// Select application by identifier (`P1 = 0x04`)
    Application,
    /// Select elementary file by identifier (`P1 = 0x00`, no FCI returned)
    File,
}

/// Select an application or file by identifier
///
/// ## Encoding:
/// ```text
/// +------+------+------+------+------+---------------------+
/// | 0x00 | 0xA4 |  P1  |  P2  |  Lc  |  IDENTIFIER (Lc)    |
/// +------+------+------+------+------+---------------------+
/// ```
///
/// Applications use `P1 = 0x04, P2 = 0x00`, files use `P1 = 0x00, P2 = 0x0C`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SelectReq<'a> {
    pub kind: SelectKind,
    pub id: &'a [u8],
}

impl<'a> SelectReq<'a> {
    /// Select an application by AID
    pub fn application(aid: &'a [u8]) -> Self {
        Self {
            kind: SelectKind::Application,
            id: aid,
        }
    }

    /// Select a file by file identifier
    pub fn file(fid: &'a [u8; 2]) -> Self {
        Self {
            kind: SelectKind::File,
            id: &fid[..],
        }
    }
}

impl<'a> ApduReq for SelectReq<'a> {
    fn header(&self) -> ApduHeader {
        match self.kind {
            SelectKind::Application => ApduHeader::new(Instruction::Select, 0x04, 0x00),
            SelectKind::File => ApduHeader::new(Instruction::Select, 0x00, 0x0C),
        }
    }
}

impl<'a> Encode for SelectReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.id.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if self.id.is_empty() || buff.len() < self.id.len() {
            return Err(ApduError::InvalidLength);
        }

        buff[..self.id.len()].copy_from_slice(self.id);

        Ok(self.id.len())
    }
}
