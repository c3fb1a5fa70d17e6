// Copyright (c) 2026 The Chip Auth Authors

//! Signature codec, parses the chip's DER signature envelope and canonicalises
//! the `s` component to the lower half of the secp256k1 group order.
//!
//! ## Envelope:
//! ```text
//! +------+-----+------+------+-----------+------+------+-----------+
//! | 0x30 | LEN | 0x02 | RLEN | R (RLEN)  | 0x02 | SLEN | S (SLEN)  |
//! +------+-----+------+------+-----------+------+------+-----------+
//! ```
//!
//! Integers are big-endian and may carry a leading zero byte to clear the
//! sign bit, chips are not consistent about this so any number of leading
//! zeros is accepted and stripped.

use alloc::vec::Vec;

/// DER sequence tag
pub const DER_SEQUENCE: u8 = 0x30;

/// DER integer tag
pub const DER_INTEGER: u8 = 0x02;

/// Length of a signature scalar
pub const SCALAR_LEN: usize = 32;

/// secp256k1 group order
pub const ORDER: [u8; SCALAR_LEN] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// Half the secp256k1 group order (rounded down)
pub const HALF_ORDER: [u8; SCALAR_LEN] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Signature components, big-endian and left-padded to 32 bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignatureComponents {
    pub r: [u8; SCALAR_LEN],
    pub s: [u8; SCALAR_LEN],
}

impl SignatureComponents {
    /// Parse components from a DER signature envelope
    pub fn parse(der: &[u8]) -> Result<Self, SignatureError> {
        if der.len() < 2 || der[0] != DER_SEQUENCE {
            return Err(SignatureError::InvalidSequence);
        }

        // Short-form length only, must cover the remainder exactly
        let len = der[1] as usize;
        if len & 0x80 != 0 {
            return Err(SignatureError::InvalidLength);
        }
        match der.len() - 2 {
            n if n < len => return Err(SignatureError::InvalidLength),
            n if n > len => return Err(SignatureError::TrailingBytes),
            _ => (),
        }

        let (r, rest) = parse_integer(&der[2..])?;
        let (s, rest) = parse_integer(rest)?;

        if !rest.is_empty() {
            return Err(SignatureError::TrailingBytes);
        }

        if r >= ORDER || s >= ORDER {
            return Err(SignatureError::ScalarOutOfRange);
        }

        Ok(Self { r, s })
    }

    /// Build components from a 64-byte `r ∥ s` signature
    pub fn from_bytes(b: &[u8; 2 * SCALAR_LEN]) -> Self {
        let mut r = [0u8; SCALAR_LEN];
        let mut s = [0u8; SCALAR_LEN];

        r.copy_from_slice(&b[..SCALAR_LEN]);
        s.copy_from_slice(&b[SCALAR_LEN..]);

        Self { r, s }
    }

    /// Replace `s` with `order - s` if `s` is in the upper half of the order
    pub fn normalize(&self) -> Self {
        Self {
            r: self.r,
            s: normalize_s(&self.s),
        }
    }

    /// Check whether `s` is already in low-s form
    pub fn is_low_s(&self) -> bool {
        self.s <= HALF_ORDER
    }

    /// Concatenate to the 64-byte `r ∥ s` form accepted by the verifier
    pub fn concat(&self) -> [u8; 2 * SCALAR_LEN] {
        let mut b = [0u8; 2 * SCALAR_LEN];

        b[..SCALAR_LEN].copy_from_slice(&self.r);
        b[SCALAR_LEN..].copy_from_slice(&self.s);

        b
    }

    /// Encode to a minimal DER envelope
    pub fn to_der(&self) -> Vec<u8> {
        let r = der_integer(&self.r);
        let s = der_integer(&self.s);

        let mut b = Vec::with_capacity(2 + 4 + r.len() + s.len());
        b.push(DER_SEQUENCE);
        b.push((4 + r.len() + s.len()) as u8);

        for i in [r, s] {
            b.push(DER_INTEGER);
            b.push(i.len() as u8);
            b.extend_from_slice(&i);
        }

        b
    }
}

/// Canonicalise `s` to the lower half of the group order, reducing values at
/// or above the order first
pub fn normalize_s(s: &[u8; SCALAR_LEN]) -> [u8; SCALAR_LEN] {
    let s = reduce(s);

    // Big-endian arrays compare lexicographically in numeric order
    if s > HALF_ORDER {
        complement(&s)
    } else {
        s
    }
}

/// Compute `order - s` for `s` below the order
pub fn complement(s: &[u8; SCALAR_LEN]) -> [u8; SCALAR_LEN] {
    sub(&ORDER, s)
}

/// Reduce `s` modulo the order, 2^256 < 2 * order so one subtraction suffices
pub fn reduce(s: &[u8; SCALAR_LEN]) -> [u8; SCALAR_LEN] {
    if *s >= ORDER {
        sub(s, &ORDER)
    } else {
        *s
    }
}

/// Big-endian subtraction with borrow, `a` must not be less than `b`
fn sub(a: &[u8; SCALAR_LEN], b: &[u8; SCALAR_LEN]) -> [u8; SCALAR_LEN] {
    let mut out = [0u8; SCALAR_LEN];
    let mut borrow = 0u16;

    for i in (0..SCALAR_LEN).rev() {
        let sub = b[i] as u16 + borrow;
        let v = a[i] as u16;

        if v >= sub {
            out[i] = (v - sub) as u8;
            borrow = 0;
        } else {
            out[i] = (0x100 + v - sub) as u8;
            borrow = 1;
        }
    }

    out
}

/// Parse a DER integer, returning the left-padded value and remaining buffer
fn parse_integer(buff: &[u8]) -> Result<([u8; SCALAR_LEN], &[u8]), SignatureError> {
    if buff.len() < 2 || buff[0] != DER_INTEGER {
        return Err(SignatureError::InvalidInteger);
    }

    let len = buff[1] as usize;
    if len & 0x80 != 0 || buff.len() < 2 + len {
        return Err(SignatureError::InvalidLength);
    }

    let (v, rest) = buff[2..].split_at(len);

    // Strip sign padding
    let start = v.iter().position(|b| *b != 0).unwrap_or(v.len());
    let v = &v[start..];

    if v.is_empty() || v.len() > SCALAR_LEN {
        return Err(SignatureError::InvalidInteger);
    }

    let mut out = [0u8; SCALAR_LEN];
    out[SCALAR_LEN - v.len()..].copy_from_slice(v);

    Ok((out, rest))
}

/// Minimal DER integer body for a big-endian scalar
fn der_integer(v: &[u8; SCALAR_LEN]) -> Vec<u8> {
    let start = v.iter().position(|b| *b != 0).unwrap_or(SCALAR_LEN - 1);

    let mut b = Vec::with_capacity(SCALAR_LEN + 1);
    if v[start] & 0x80 != 0 {
        b.push(0x00);
    }
    b.extend_from_slice(&v[start..]);

    b
}

/// Signature parsing errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum SignatureError {
    /// Envelope is not a DER sequence
    #[cfg_attr(feature = "thiserror", error("signature is not a DER sequence"))]
    InvalidSequence,

    /// Length field invalid or inconsistent with the envelope
    #[cfg_attr(feature = "thiserror", error("invalid DER length"))]
    InvalidLength,

    /// Integer missing, empty or wider than 32 bytes
    #[cfg_attr(feature = "thiserror", error("invalid DER integer"))]
    InvalidInteger,

    /// Data following the encoded integers
    #[cfg_attr(feature = "thiserror", error("trailing bytes after signature"))]
    TrailingBytes,

    /// Integer not below the group order
    #[cfg_attr(feature = "thiserror", error("signature scalar not below group order"))]
    ScalarOutOfRange,
}

#[cfg(test)]
mod test {
    use k256::ecdsa::{Signature, SigningKey};
    use rand::random;

    use super::*;

    fn h32(s: &str) -> [u8; 32] {
        let mut b = [0u8; 32];
        hex::decode_to_slice(s, &mut b).unwrap();
        b
    }

    fn random_scalar() -> [u8; 32] {
        let mut s: [u8; 32] = random();
        // Keep below the order
        s[0] &= 0x7F;
        s
    }

    #[test]
    fn parse_padding_styles() {
        let r = h32("8adf4042f3483136c9449aca2a5df38ec95874382d56472553cdc6cbbd3c0633");
        let s = h32("24686b1fa8b80c0013050b705e4c41f69ae3ec895fc31e0c359bf9fe28891945");

        // Canonical DER, r sign padded
        let mut canonical = vec![0x30, 0x45, 0x02, 0x21, 0x00];
        canonical.extend_from_slice(&r);
        canonical.extend_from_slice(&[0x02, 0x20]);
        canonical.extend_from_slice(&s);

        // Unpadded r
        let mut unpadded = vec![0x30, 0x44, 0x02, 0x20];
        unpadded.extend_from_slice(&r);
        unpadded.extend_from_slice(&[0x02, 0x20]);
        unpadded.extend_from_slice(&s);

        // Superfluous padding on s
        let mut overpadded = vec![0x30, 0x46, 0x02, 0x21, 0x00];
        overpadded.extend_from_slice(&r);
        overpadded.extend_from_slice(&[0x02, 0x21, 0x00]);
        overpadded.extend_from_slice(&s);

        let expected = SignatureComponents { r, s };

        for der in [&canonical, &unpadded, &overpadded] {
            let c = SignatureComponents::parse(der).unwrap();
            assert_eq!(c, expected);
            assert_eq!(&c.concat()[..32], &r);
            assert_eq!(&c.concat()[32..], &s);
        }

        assert_eq!(expected.to_der(), canonical);
    }

    #[test]
    fn parse_short_integer() {
        // 31-byte r is left padded
        let mut der = vec![0x30, 0x43, 0x02, 0x1f];
        der.extend_from_slice(&[0x11; 31]);
        der.extend_from_slice(&[0x02, 0x20]);
        der.extend_from_slice(&[0x22; 32]);

        let c = SignatureComponents::parse(&der).unwrap();

        assert_eq!(c.r[0], 0x00);
        assert_eq!(&c.r[1..], &[0x11; 31]);
        assert_eq!(c.s, [0x22; 32]);
        assert_eq!(c.to_der(), der);
    }

    #[test]
    fn parse_errors() {
        let valid = SignatureComponents {
            r: [0x11; 32],
            s: [0x22; 32],
        }
        .to_der();

        // Wrong tag
        let mut d = valid.clone();
        d[0] = 0x31;
        assert_eq!(SignatureComponents::parse(&d), Err(SignatureError::InvalidSequence));

        // Trailing bytes
        let mut d = valid.clone();
        d.push(0x00);
        assert_eq!(SignatureComponents::parse(&d), Err(SignatureError::TrailingBytes));

        // Truncated
        assert_eq!(
            SignatureComponents::parse(&valid[..valid.len() - 1]),
            Err(SignatureError::InvalidLength)
        );

        // Long-form length
        assert_eq!(
            SignatureComponents::parse(&[0x30, 0x81, 0x44]),
            Err(SignatureError::InvalidLength)
        );

        // Empty integer
        assert_eq!(
            SignatureComponents::parse(&[0x30, 0x05, 0x02, 0x00, 0x02, 0x01, 0x01]),
            Err(SignatureError::InvalidInteger)
        );

        // Integer wider than 32 bytes after stripping
        let mut d = vec![0x30, 0x45, 0x02, 0x21, 0x01];
        d.extend_from_slice(&[0x11; 32]);
        d.extend_from_slice(&[0x02, 0x20]);
        d.extend_from_slice(&[0x22; 32]);
        assert_eq!(SignatureComponents::parse(&d), Err(SignatureError::InvalidInteger));

        // Sequence length covers more than the integers
        let mut d = valid.clone();
        d[1] += 2;
        d.extend_from_slice(&[0x05, 0x00]);
        assert_eq!(SignatureComponents::parse(&d), Err(SignatureError::TrailingBytes));

        assert_eq!(SignatureComponents::parse(&[]), Err(SignatureError::InvalidSequence));
    }

    #[test]
    fn normalize_vectors() {
        // High s from chip signature, normalised form checked against order - s
        let s = h32("b261f893a6b61472128d46ddf74234ae0815a568ef78a6226807a0e44cc224f6");
        let n = normalize_s(&s);

        assert!(n <= HALF_ORDER);
        assert_eq!(
            n,
            h32("4d9e076c5949eb8ded72b92208bdcb50b299377dbfcffa1957cabda883741c4b")
        );

        // Half order is unchanged, half order + 1 flips to half order
        assert_eq!(normalize_s(&HALF_ORDER), HALF_ORDER);
        let mut above = HALF_ORDER;
        above[31] += 1;
        assert_eq!(normalize_s(&above), HALF_ORDER);

        // Low s unchanged
        let low = h32("24686b1fa8b80c0013050b705e4c41f69ae3ec895fc31e0c359bf9fe28891945");
        assert_eq!(normalize_s(&low), low);
    }

    #[test]
    fn scalars_at_or_above_order() {
        let mut order_plus_one = ORDER;
        order_plus_one[31] += 1;
        let max = [0xFF; 32];

        // Reduced then canonicalised
        assert_eq!(normalize_s(&ORDER), [0u8; 32]);

        let mut one = [0u8; 32];
        one[31] = 1;
        assert_eq!(normalize_s(&order_plus_one), one);

        // 2^256 - 1 - order = 0x01_4551231950b75fc4402da1732fc9bebe
        let n = normalize_s(&max);
        assert_eq!(
            n,
            h32("000000000000000000000000000000014551231950b75fc4402da1732fc9bebe")
        );

        for s in [ORDER, order_plus_one, max] {
            let n = normalize_s(&s);
            assert!(n <= HALF_ORDER);
            assert_eq!(normalize_s(&n), n);

            // Rejected on parse, for both components
            let valid = h32("24686b1fa8b80c0013050b705e4c41f69ae3ec895fc31e0c359bf9fe28891945");
            for (r, s) in [(valid, s), (s, valid)] {
                let der = SignatureComponents { r, s }.to_der();
                assert_eq!(
                    SignatureComponents::parse(&der),
                    Err(SignatureError::ScalarOutOfRange)
                );
            }
        }
    }

    #[test]
    fn normalize_idempotent() {
        for _ in 0..100 {
            let s: [u8; 32] = random();
            let n = normalize_s(&s);

            assert!(n <= HALF_ORDER);
            assert_eq!(normalize_s(&n), n);
        }
    }

    #[test]
    fn normalize_matches_k256() {
        for _ in 0..32 {
            let key = SigningKey::from_slice(&random_scalar()).unwrap();
            let digest: [u8; 32] = random();

            // k256 signatures are already low-s
            let (sig, _) = key.sign_prehash_recoverable(&digest).unwrap();
            let (r, s) = sig.split_bytes();

            let low = SignatureComponents {
                r: r.into(),
                s: s.into(),
            };
            assert!(low.is_low_s());

            // Flip to high-s and check both sides agree on the normalised form
            let high = SignatureComponents {
                r: low.r,
                s: complement(&low.s),
            };
            assert!(!high.is_low_s());

            let k = Signature::from_scalars(high.r, high.s)
                .unwrap()
                .normalize_s()
                .unwrap();
            let (_, ks) = k.split_bytes();

            assert_eq!(high.normalize().s, <[u8; 32]>::from(ks));
            assert_eq!(high.normalize(), low);
        }
    }
}
