// Copyright (c) 2026 The Chip Auth Authors

//! Chip-side command parsing, maps a raw command APDU back to request objects

use super::{
    binary::{ReadBinaryReq, UpdateBinaryReq},
    key_info::KeyInfoReq,
    select::{SelectKind, SelectReq},
    sign::{SignReq, DIGEST_LEN},
    ApduError, ApduHeader, Instruction, CHIP_APDU_CLA,
};

/// Parsed command APDU
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command<'a> {
    Select(SelectReq<'a>),
    ReadBinary(ReadBinaryReq),
    UpdateBinary(UpdateBinaryReq<'a>),
    KeyInfo(KeyInfoReq),
    Sign(SignReq<'a>),
}

impl<'a> Command<'a> {
    /// Parse a raw short command APDU
    pub fn parse(buff: &'a [u8]) -> Result<Self, ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        let h = ApduHeader {
            cla: buff[0],
            ins: buff[1],
            p1: buff[2],
            p2: buff[3],
        };
        if h.cla != CHIP_APDU_CLA {
            return Err(ApduError::InvalidEncoding);
        }

        let ins = Instruction::try_from(h.ins)
            .map_err(|_| ApduError::UnsupportedInstruction(h.ins))?;
        let offset = u16::from_be_bytes([h.p1, h.p2]);
        let rest = &buff[4..];

        let c = match ins {
            Instruction::Select => {
                let id = body(rest)?;
                let kind = match (h.p1, h.p2) {
                    (0x04, 0x00) => SelectKind::Application,
                    (0x00, 0x0C) => SelectKind::File,
                    _ => return Err(ApduError::InvalidEncoding),
                };
                Command::Select(SelectReq { kind, id })
            }
            Instruction::ReadBinary => {
                if rest.len() != 1 {
                    return Err(ApduError::InvalidLength);
                }
                Command::ReadBinary(ReadBinaryReq::new(offset, rest[0] as usize)?)
            }
            Instruction::UpdateBinary => {
                Command::UpdateBinary(UpdateBinaryReq::new(offset, body(rest)?)?)
            }
            Instruction::GetKeyInfo => Command::KeyInfo(KeyInfoReq::new(h.p1)),
            Instruction::GenerateSignature => {
                let digest: &[u8; DIGEST_LEN] = body(rest)?
                    .try_into()
                    .map_err(|_| ApduError::InvalidLength)?;
                Command::Sign(SignReq::new(h.p1, digest))
            }
        };

        Ok(c)
    }
}

/// Fetch an `Lc` prefixed body, ignoring a trailing `Le`
fn body(buff: &[u8]) -> Result<&[u8], ApduError> {
    let lc = *buff.first().ok_or(ApduError::InvalidLength)? as usize;
    if lc == 0 || buff.len() < 1 + lc || buff.len() > 2 + lc {
        return Err(ApduError::InvalidLength);
    }

    Ok(&buff[1..][..lc])
}
