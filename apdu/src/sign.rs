// Copyright (c) 2026 The Chip Auth Authors

//! Signature APDUs, for signing a 32-byte digest with a chip key slot

use byteorder::{BigEndian, ByteOrder};
use encdec::{Decode, Encode};

use super::{ApduError, ApduHeader, ApduReq, Instruction};

/// Length of the digest accepted for signing
pub const DIGEST_LEN: usize = 32;

/// Signature request APDU
///
/// ## Encoding:
/// ```text
/// +------+------+-----------+------+---------+-------------+---------+
/// | 0x00 | 0x18 | KEY_INDEX | 0x00 | LC=0x20 | DIGEST (32) | LE=0x00 |
/// +------+------+-----------+------+---------+-------------+---------+
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SignReq<'a> {
    /// Key slot index
    pub key_index: u8,
    /// Digest to be signed
    pub digest: &'a [u8; DIGEST_LEN],
}

impl<'a> SignReq<'a> {
    /// Create a new [SignReq] APDU
    pub fn new(key_index: u8, digest: &'a [u8; DIGEST_LEN]) -> Self {
        Self { key_index, digest }
    }
}

impl<'a> ApduReq for SignReq<'a> {
    fn header(&self) -> ApduHeader {
        ApduHeader::new(Instruction::GenerateSignature, self.key_index, 0x00)
    }

    fn le(&self) -> Option<u8> {
        Some(0x00)
    }
}

impl<'a> Encode for SignReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(DIGEST_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < DIGEST_LEN {
            return Err(ApduError::InvalidLength);
        }

        buff[..DIGEST_LEN].copy_from_slice(self.digest);

        Ok(DIGEST_LEN)
    }
}

/// Signature response APDU, the signature is DER encoded and variable length
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                   GLOBAL_COUNTER (u32, BE)                    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     KEY_COUNTER (u32, BE)                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                 DER SIGNATURE (variable length)               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SignResp<'a> {
    /// Remaining signatures for the chip
    pub global_counter: u32,
    /// Remaining signatures for this key slot
    pub key_counter: u32,
    /// DER encoded signature envelope
    pub signature: &'a [u8],
}

impl<'a> SignResp<'a> {
    /// Create a new [SignResp] APDU
    pub fn new(global_counter: u32, key_counter: u32, signature: &'a [u8]) -> Self {
        Self {
            global_counter,
            key_counter,
            signature,
        }
    }
}

impl<'a> Encode for SignResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(8 + self.signature.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = 8 + self.signature.len();
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u32(&mut buff[0..], self.global_counter);
        BigEndian::write_u32(&mut buff[4..], self.key_counter);
        buff[8..n].copy_from_slice(self.signature);

        Ok(n)
    }
}

impl<'a> Decode<'a> for SignResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        // Counters must be present, signature validity is left to the caller
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }

        Ok((
            Self {
                global_counter: BigEndian::read_u32(&buff[0..]),
                key_counter: BigEndian::read_u32(&buff[4..]),
                signature: &buff[8..],
            },
            buff.len(),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_req;

    #[test]
    fn sign_req_apdu() {
        let digest = [0x5Au8; DIGEST_LEN];

        let mut buff = [0u8; 64];
        let n = encode_req(&mut buff, &SignReq::new(1, &digest));

        assert_eq!(n, 4 + 1 + DIGEST_LEN + 1);
        assert_eq!(&buff[..5], &[0x00, 0x18, 0x01, 0x00, 0x20]);
        assert_eq!(&buff[5..][..DIGEST_LEN], &digest[..]);
        assert_eq!(buff[n - 1], 0x00);
    }

    #[test]
    fn sign_resp_strips_counters() {
        let buff = [0, 0, 0, 9, 0, 0, 0, 7, 0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01];

        let (resp, n) = SignResp::decode(&buff).unwrap();

        assert_eq!(n, buff.len());
        assert_eq!(resp.global_counter, 9);
        assert_eq!(resp.key_counter, 7);
        assert_eq!(resp.signature, &buff[8..]);
    }

    #[test]
    fn sign_resp_short() {
        assert_eq!(
            SignResp::decode(&[0u8; 7]),
            Err(ApduError::InvalidLength)
        );
    }
}
