// Copyright (c) 2026 The Chip Auth Authors

//! Key information APDUs, for fetching signature counters and the public key
//! held in a chip key slot

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};

use super::{ApduError, ApduHeader, ApduReq, Instruction};

/// Length of an uncompressed secp256k1 public key
pub const PUBLIC_KEY_LEN: usize = 65;

/// Uncompressed point marker
pub const UNCOMPRESSED_MARKER: u8 = 0x04;

/// Key information request APDU
///
/// ## Encoding:
/// ```text
/// +------+------+-----------+------+---------+
/// | 0x00 | 0x16 | KEY_INDEX | 0x00 | LE=0x00 |
/// +------+------+-----------+------+---------+
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KeyInfoReq {
    /// Key slot index
    pub key_index: u8,
}

impl KeyInfoReq {
    /// Create a new [KeyInfoReq] APDU
    pub fn new(key_index: u8) -> Self {
        Self { key_index }
    }
}

impl ApduReq for KeyInfoReq {
    fn header(&self) -> ApduHeader {
        ApduHeader::new(Instruction::GetKeyInfo, self.key_index, 0x00)
    }

    fn le(&self) -> Option<u8> {
        Some(0x00)
    }
}

impl Encode for KeyInfoReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, ApduError> {
        Ok(0)
    }
}

/// Key information response APDU
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
/// |      0x04     |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// /                   PUBLIC_KEY_POINT (64 bytes)                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KeyInfoResp {
    /// Remaining signatures for the chip
    pub global_counter: u32,
    /// Remaining signatures for this key slot
    pub key_counter: u32,
    /// Uncompressed public key
    pub public_key: [u8; PUBLIC_KEY_LEN],
}

impl KeyInfoResp {
    /// Create a new [KeyInfoResp] APDU
    pub fn new(global_counter: u32, key_counter: u32, public_key: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self {
            global_counter,
            key_counter,
            public_key,
        }
    }
}

impl Encode for KeyInfoResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(8 + PUBLIC_KEY_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 8 + PUBLIC_KEY_LEN {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u32(&mut buff[0..], self.global_counter);
        BigEndian::write_u32(&mut buff[4..], self.key_counter);
        buff[8..][..PUBLIC_KEY_LEN].copy_from_slice(&self.public_key);

        Ok(8 + PUBLIC_KEY_LEN)
    }
}

impl DecodeOwned for KeyInfoResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self, usize), ApduError> {
        // Check length prior to slicing
        if buff.len() < 8 + PUBLIC_KEY_LEN {
            return Err(ApduError::InvalidLength);
        }

        let global_counter = BigEndian::read_u32(&buff[0..]);
        let key_counter = BigEndian::read_u32(&buff[4..]);

        if buff[8] != UNCOMPRESSED_MARKER {
            return Err(ApduError::InvalidKey);
        }

        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(&buff[8..][..PUBLIC_KEY_LEN]);

        Ok((
            Self {
                global_counter,
                key_counter,
                public_key,
            },
            8 + PUBLIC_KEY_LEN,
        ))
    }
}

#[cfg(test)]
mod test {
    use rand::random;

    use super::*;
    use crate::test::encode_req;

    #[test]
    fn key_info_req_apdu() {
        let mut buff = [0u8; 16];
        let n = encode_req(&mut buff, &KeyInfoReq::new(1));

        assert_eq!(&buff[..n], &[0x00, 0x16, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn key_info_resp_apdu() {
        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key[0] = UNCOMPRESSED_MARKER;
        for b in public_key[1..].iter_mut() {
            *b = random();
        }

        let resp = KeyInfoResp::new(random(), random(), public_key);

        let mut buff = [0u8; 128];
        let n = resp.encode(&mut buff).unwrap();
        let (decoded, m) = KeyInfoResp::decode_owned(&buff[..n]).unwrap();

        assert_eq!(resp, decoded);
        assert_eq!(n, m);
    }

    #[test]
    fn key_info_resp_short() {
        let buff = [0u8; 72];
        assert_eq!(
            KeyInfoResp::decode_owned(&buff),
            Err(ApduError::InvalidLength)
        );
    }

    #[test]
    fn key_info_resp_compressed_key() {
        let mut buff = [0u8; 73];
        buff[8] = 0x02;
        assert_eq!(KeyInfoResp::decode_owned(&buff), Err(ApduError::InvalidKey));
    }
}
