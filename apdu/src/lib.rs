// Copyright (c) 2026 The Chip Auth Authors

//! Protocol / APDU definitions for authentication chip communication
//!
//! This module provides the ISO 7816 command set used to talk to the
//! signing chip, along with the NDEF URI record codec used for the small
//! reference record stored in the chip's NDEF file.
//!
//! Commands are split into a 4-byte header (`CLA INS P1 P2`) provided by
//! [ApduReq::header], an optional body encoded via [encdec::Encode] and
//! prefixed with `Lc`, and an optional expected response length (`Le`).
//! Every response ends in a 2-byte [StatusWord][status::StatusWord].
//!
//! All multi-byte fields are big-endian as defined by ISO 7816.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod binary;
pub mod command;
pub mod key_info;
pub mod ndef;
pub mod prelude;
pub mod select;
pub mod sign;
pub mod status;

/// Interindustry APDU class used for all chip commands
pub const CHIP_APDU_CLA: u8 = 0x00;

/// Maximum payload moved by a single READ / UPDATE BINARY command
pub const MAX_CHUNK: usize = 253;

/// NFC Forum Type 4 Tag NDEF application identifier
pub const NDEF_AID: [u8; 7] = [0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];

/// NDEF file identifier within the NDEF application
pub const NDEF_FILE_ID: [u8; 2] = [0xE1, 0x04];

/// Signing application identifier
pub const SIGNER_AID: [u8; 13] = [
    0xD2, 0x76, 0x00, 0x00, 0x04, 0x15, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
];

/// Chip APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, strum::Display, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Select an application or file
    Select = 0xA4,

    /// Read from the selected file
    ReadBinary = 0xB0,

    /// Write to the selected file
    UpdateBinary = 0xD6,

    /// Fetch counters and public key for a key slot
    GetKeyInfo = 0x16,

    /// Sign a 32-byte digest with a key slot
    GenerateSignature = 0x18,
}

/// APDU command header
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ApduHeader {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
}

impl ApduHeader {
    /// Create a new header for the provided instruction
    pub const fn new(ins: Instruction, p1: u8, p2: u8) -> Self {
        Self {
            cla: CHIP_APDU_CLA,
            ins: ins as u8,
            p1,
            p2,
        }
    }
}

/// Chip request APDU, provides the header and optional `Le` for a request
/// body encoded via [encdec::Encode]
pub trait ApduReq: encdec::Encode<Error = ApduError> {
    /// Command header
    fn header(&self) -> ApduHeader;

    /// Expected response length (`Le`), if the command carries one
    fn le(&self) -> Option<u8> {
        None
    }
}

/// Encode a complete command APDU (header, `Lc` + body, `Le`) into the
/// provided buffer, returning the encoded length
pub fn encode_apdu<R: ApduReq>(req: &R, buff: &mut [u8]) -> Result<usize, ApduError> {
    let body_len = req.encode_len()?;
    if body_len > u8::MAX as usize {
        return Err(ApduError::InvalidLength);
    }

    let total = 4 + if body_len > 0 { 1 + body_len } else { 0 } + req.le().map_or(0, |_| 1);
    if buff.len() < total {
        return Err(ApduError::InvalidLength);
    }

    let h = req.header();
    buff[..4].copy_from_slice(&[h.cla, h.ins, h.p1, h.p2]);
    let mut index = 4;

    // Write Lc and body
    if body_len > 0 {
        buff[index] = body_len as u8;
        index += 1;
        index += req.encode(&mut buff[index..])?;
    }

    // Write Le
    if let Some(le) = req.le() {
        buff[index] = le;
        index += 1;
    }

    Ok(index)
}

/// APDU encoding / decoding errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum ApduError {
    /// Buffer or field length invalid
    #[cfg_attr(feature = "thiserror", error("invalid length"))]
    InvalidLength,

    /// Field encoding invalid
    #[cfg_attr(feature = "thiserror", error("invalid encoding"))]
    InvalidEncoding,

    /// Public key is not an uncompressed point
    #[cfg_attr(feature = "thiserror", error("public key missing uncompressed point marker"))]
    InvalidKey,

    /// Response shorter than the status word
    #[cfg_attr(feature = "thiserror", error("response truncated"))]
    Truncated,

    /// Instruction not supported by this protocol
    #[cfg_attr(feature = "thiserror", error("unsupported instruction 0x{0:02x}"))]
    UnsupportedInstruction(u8),
}

impl From<encdec::Error> for ApduError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => ApduError::InvalidLength,
            #[allow(unreachable_patterns)]
            _ => ApduError::InvalidEncoding,
        }
    }
}
