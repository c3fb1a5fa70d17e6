// Copyright (c) 2026 The Chip Auth Authors

//! ISO 7816 status words

use num_enum::TryFromPrimitive;

use super::ApduError;

/// Status word returned as the final two bytes of every response
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct StatusWord(pub u16);

impl StatusWord {
    /// Command completed successfully
    pub const SUCCESS: StatusWord = StatusWord(0x9000);

    /// Check whether this status indicates success
    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    /// Fetch a well-known description for this status, if any
    pub fn known(&self) -> Option<KnownStatus> {
        KnownStatus::try_from(self.0).ok()
    }
}

impl From<KnownStatus> for StatusWord {
    fn from(s: KnownStatus) -> Self {
        Self(s as u16)
    }
}

impl core::fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl core::fmt::Display for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.known() {
            Some(k) => write!(f, "0x{:04x} ({})", self.0, k),
            None => write!(f, "0x{:04x}", self.0),
        }
    }
}

/// Status words reported by the chip
#[derive(Copy, Clone, Debug, PartialEq, strum::Display, TryFromPrimitive)]
#[repr(u16)]
pub enum KnownStatus {
    #[strum(serialize = "success")]
    Success = 0x9000,
    #[strum(serialize = "wrong length")]
    WrongLength = 0x6700,
    #[strum(serialize = "security status not satisfied")]
    SecurityNotSatisfied = 0x6982,
    #[strum(serialize = "conditions of use not satisfied")]
    ConditionsNotSatisfied = 0x6985,
    #[strum(serialize = "incorrect data")]
    IncorrectData = 0x6A80,
    #[strum(serialize = "file or application not found")]
    FileNotFound = 0x6A82,
    #[strum(serialize = "incorrect P1/P2")]
    IncorrectP1P2 = 0x6A86,
    #[strum(serialize = "referenced data not found")]
    DataNotFound = 0x6A88,
    #[strum(serialize = "wrong parameters (offset outside file)")]
    WrongParameters = 0x6B00,
    #[strum(serialize = "instruction not supported")]
    InsNotSupported = 0x6D00,
    #[strum(serialize = "class not supported")]
    ClaNotSupported = 0x6E00,
    #[strum(serialize = "unknown error")]
    Unknown = 0x6F00,
}

/// Split a raw response into payload and trailing status word
pub fn split_response(resp: &[u8]) -> Result<(&[u8], StatusWord), ApduError> {
    if resp.len() < 2 {
        return Err(ApduError::Truncated);
    }

    let (data, sw) = resp.split_at(resp.len() - 2);

    Ok((data, StatusWord(u16::from_be_bytes([sw[0], sw[1]]))))
}
