// Copyright (c) 2026 The Chip Auth Authors

//! XDR encodings for the contract values carried in auth messages and contract
//! invocations.
//!
//! XDR is big-endian with every item padded to a 4-byte boundary. Each
//! [ScVal] is prefixed by a 4-byte type discriminant:
//!
//! ```text
//! +-----------------+----------------------------------------+
//! | TYPE (u32, BE)  |  VALUE (type specific, 4-byte aligned) |
//! +-----------------+----------------------------------------+
//! ```

use alloc::vec::Vec;

use byteorder::{BigEndian, ByteOrder};
use encdec::Encode;

/// `u32` value discriminant
pub const SCV_U32: u32 = 3;
/// `u64` value discriminant
pub const SCV_U64: u32 = 5;
/// Variable length bytes discriminant
pub const SCV_BYTES: u32 = 13;
/// Address discriminant
pub const SCV_ADDRESS: u32 = 18;

/// Account address discriminant
pub const SC_ADDRESS_ACCOUNT: u32 = 0;
/// Contract address discriminant
pub const SC_ADDRESS_CONTRACT: u32 = 1;

/// ed25519 public key type for account addresses
pub const PUBLIC_KEY_TYPE_ED25519: u32 = 0;

/// Contract or account address
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScAddress {
    /// ed25519 account public key
    Account([u8; 32]),
    /// Contract hash
    Contract([u8; 32]),
}

impl Encode for ScAddress {
    type Error = XdrError;

    fn encode_len(&self) -> Result<usize, XdrError> {
        match self {
            ScAddress::Account(_) => Ok(4 + 4 + 32),
            ScAddress::Contract(_) => Ok(4 + 32),
        }
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, XdrError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(XdrError::BufferLength);
        }

        match self {
            ScAddress::Account(k) => {
                BigEndian::write_u32(&mut buff[0..], SC_ADDRESS_ACCOUNT);
                BigEndian::write_u32(&mut buff[4..], PUBLIC_KEY_TYPE_ED25519);
                buff[8..][..32].copy_from_slice(k);
            }
            ScAddress::Contract(c) => {
                BigEndian::write_u32(&mut buff[0..], SC_ADDRESS_CONTRACT);
                buff[4..][..32].copy_from_slice(c);
            }
        }

        Ok(n)
    }
}

/// Contract value, limited to the types used by chip authorised calls.
///
/// Fixed length byte arrays (`BytesN<N>`) share the [ScVal::Bytes] encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScVal {
    U32(u32),
    U64(u64),
    Bytes(Vec<u8>),
    Address(ScAddress),
}

impl ScVal {
    /// Fetch the type discriminant for this value
    pub fn discriminant(&self) -> u32 {
        match self {
            ScVal::U32(_) => SCV_U32,
            ScVal::U64(_) => SCV_U64,
            ScVal::Bytes(_) => SCV_BYTES,
            ScVal::Address(_) => SCV_ADDRESS,
        }
    }

    /// Fetch a `u64` value, if this is one
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ScVal::U64(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<ScAddress> for ScVal {
    fn from(a: ScAddress) -> Self {
        ScVal::Address(a)
    }
}

impl From<&[u8]> for ScVal {
    fn from(b: &[u8]) -> Self {
        ScVal::Bytes(b.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for ScVal {
    fn from(b: [u8; N]) -> Self {
        ScVal::Bytes(b.to_vec())
    }
}

impl Encode for ScVal {
    type Error = XdrError;

    fn encode_len(&self) -> Result<usize, XdrError> {
        let n = match self {
            ScVal::U32(_) => 4,
            ScVal::U64(_) => 8,
            ScVal::Bytes(b) => opaque_len(b.len())?,
            ScVal::Address(a) => a.encode_len()?,
        };
        Ok(4 + n)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, XdrError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(XdrError::BufferLength);
        }

        BigEndian::write_u32(&mut buff[0..], self.discriminant());

        let mut index = 4;
        index += match self {
            ScVal::U32(v) => {
                BigEndian::write_u32(&mut buff[index..], *v);
                4
            }
            ScVal::U64(v) => {
                BigEndian::write_u64(&mut buff[index..], *v);
                8
            }
            ScVal::Bytes(b) => encode_opaque(b, &mut buff[index..])?,
            ScVal::Address(a) => a.encode(&mut buff[index..])?,
        };

        Ok(index)
    }
}

/// Round a length up to the 4-byte XDR boundary
pub const fn padded_len(n: usize) -> usize {
    (n + 3) & !3
}

/// Encoded length of variable length opaque data (length prefix + padded body)
pub fn opaque_len(n: usize) -> Result<usize, XdrError> {
    if n > u32::MAX as usize {
        return Err(XdrError::TooLong(n));
    }
    Ok(4 + padded_len(n))
}

/// Encode variable length opaque data (also used for strings and symbols)
pub fn encode_opaque(data: &[u8], buff: &mut [u8]) -> Result<usize, XdrError> {
    let n = opaque_len(data.len())?;
    if buff.len() < n {
        return Err(XdrError::BufferLength);
    }

    BigEndian::write_u32(&mut buff[0..], data.len() as u32);
    buff[4..][..data.len()].copy_from_slice(data);
    buff[4 + data.len()..n].fill(0);

    Ok(n)
}

/// Encode an object to a newly allocated buffer
pub fn to_xdr<E: Encode>(v: &E) -> Result<Vec<u8>, E::Error> {
    let mut buff = alloc::vec![0u8; v.encode_len()?];
    let n = v.encode(&mut buff)?;
    buff.truncate(n);
    Ok(buff)
}

/// XDR encoding errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum XdrError {
    /// Output buffer too small
    #[cfg_attr(feature = "thiserror", error("output buffer too short"))]
    BufferLength,

    /// Value too long for a 32-bit length prefix
    #[cfg_attr(feature = "thiserror", error("value of {0} bytes too long to encode"))]
    TooLong(usize),
}

impl From<encdec::Error> for XdrError {
    fn from(_: encdec::Error) -> Self {
        XdrError::BufferLength
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_integers() {
        assert_eq!(to_xdr(&ScVal::U32(7)).unwrap(), vec![0, 0, 0, 3, 0, 0, 0, 7]);
        assert_eq!(
            to_xdr(&ScVal::U64(0x0102_0304_0506_0708)).unwrap(),
            vec![0, 0, 0, 5, 1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn encode_bytes_padded() {
        assert_eq!(
            to_xdr(&ScVal::Bytes(vec![0xaa, 0xbb, 0xcc, 0xdd, 0xee])).unwrap(),
            vec![0, 0, 0, 13, 0, 0, 0, 5, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0, 0, 0]
        );

        // Public keys are 65 bytes, padded to 68
        let v = to_xdr(&ScVal::from([0x04u8; 65])).unwrap();
        assert_eq!(v.len(), 4 + 4 + 68);
        assert_eq!(&v[4..8], &[0, 0, 0, 65]);
        assert_eq!(&v[v.len() - 3..], &[0, 0, 0]);

        // Empty bytes carry only the length
        assert_eq!(to_xdr(&ScVal::Bytes(vec![])).unwrap(), vec![0, 0, 0, 13, 0, 0, 0, 0]);
    }

    #[test]
    fn encode_addresses() {
        let a = to_xdr(&ScVal::from(ScAddress::Account([0x11; 32]))).unwrap();
        assert_eq!(&a[..12], &[0, 0, 0, 18, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&a[12..], &[0x11; 32]);

        let c = to_xdr(&ScVal::from(ScAddress::Contract([0x22; 32]))).unwrap();
        assert_eq!(&c[..8], &[0, 0, 0, 18, 0, 0, 0, 1]);
        assert_eq!(&c[8..], &[0x22; 32]);
    }

    #[test]
    fn encode_short_buffer() {
        let mut buff = [0u8; 7];
        assert_eq!(ScVal::U32(1).encode(&mut buff), Err(XdrError::BufferLength));
    }
}
