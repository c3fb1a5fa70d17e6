// Copyright (c) 2026 The Chip Auth Authors

//! NDEF URI record codec, for the contract / token reference stored on chip
//!
//! Only the short-record well-known URI form is supported:
//!
//! ```text
//! +-------+----------+-------------+------+---------+-------------------+
//! | FLAGS | TYPE_LEN | PAYLOAD_LEN | 0x55 | ID_CODE |  URI (LEN - 1)    |
//! +-------+----------+-------------+------+---------+-------------------+
//! ```
//!
//! `ID_CODE` selects a well-known prefix from [URI_PREFIXES] that is
//! prepended to the remaining URI bytes.

use encdec::Encode;

/// Message begin flag
pub const FLAG_MB: u8 = 0x80;
/// Message end flag
pub const FLAG_ME: u8 = 0x40;
/// Chunk flag
pub const FLAG_CF: u8 = 0x20;
/// Short record flag
pub const FLAG_SR: u8 = 0x10;
/// ID length present flag
pub const FLAG_IL: u8 = 0x08;
/// Type name format mask
pub const TNF_MASK: u8 = 0x07;
/// Well-known type name format
pub const TNF_WELL_KNOWN: u8 = 0x01;

/// URI record type
pub const URI_TYPE: u8 = 0x55;

/// Header for a single short well-known record
pub const URI_RECORD_HEADER: u8 = FLAG_MB | FLAG_ME | FLAG_SR | TNF_WELL_KNOWN;

/// Maximum URI bytes that fit a short record (payload includes the ID code)
pub const MAX_URI_LEN: usize = 254;

/// Well-known URI identifier code prefixes
pub const URI_PREFIXES: [&str; 36] = [
    "",
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "tel:",
    "mailto:",
    "ftp://anonymous:anonymous@",
    "ftp://ftp.",
    "ftps://",
    "sftp://",
    "smb://",
    "nfs://",
    "ftp://",
    "dav://",
    "news:",
    "telnet://",
    "imap:",
    "rtsp://",
    "urn:",
    "pop:",
    "sip:",
    "sips:",
    "tftp:",
    "btspp://",
    "btl2cap://",
    "btgoep://",
    "tcpobex://",
    "irdaobex://",
    "file://",
    "urn:epc:id:",
    "urn:epc:tag:",
    "urn:epc:pat:",
    "urn:epc:raw:",
    "urn:epc:",
    "urn:nfc:",
];

/// URI record, borrowing the URI body from the encoded / source buffer
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UriRecord<'a> {
    /// Identifier code (index into [URI_PREFIXES])
    pub code: u8,
    /// URI body following the prefix
    pub body: &'a str,
}

impl<'a> UriRecord<'a> {
    /// Create a new record holding `uri` verbatim (no prefix abbreviation)
    pub fn new(uri: &'a str) -> Self {
        Self { code: 0x00, body: uri }
    }

    /// Fetch the well-known prefix for this record
    pub fn prefix(&self) -> &'static str {
        URI_PREFIXES.get(self.code as usize).copied().unwrap_or("")
    }

    /// Decode a URI record from an NDEF message
    ///
    /// Returns `Ok(None)` for an empty message (no stored reference).
    pub fn decode(buff: &'a [u8]) -> Result<Option<Self>, RecordError> {
        if buff.is_empty() {
            return Ok(None);
        }

        // Header, type length and payload length
        if buff.len() < 3 {
            return Err(RecordError::Truncated);
        }
        let (flags, type_len, payload_len) = (buff[0], buff[1] as usize, buff[2] as usize);

        if flags & FLAG_SR == 0 {
            return Err(RecordError::LongRecord);
        }
        if flags & (FLAG_CF | FLAG_IL) != 0 {
            return Err(RecordError::Malformed);
        }
        if flags & TNF_MASK != TNF_WELL_KNOWN || type_len != 1 {
            return Err(RecordError::NotUri);
        }

        // Type byte then payload
        if buff.len() < 3 + type_len + payload_len {
            return Err(RecordError::Truncated);
        }
        if buff[3] != URI_TYPE {
            return Err(RecordError::NotUri);
        }

        let payload = &buff[4..][..payload_len];
        let (code, body) = match payload.split_first() {
            Some((c, b)) => (*c, b),
            None => return Err(RecordError::Truncated),
        };

        if code as usize >= URI_PREFIXES.len() {
            return Err(RecordError::UnknownPrefix(code));
        }

        let body = core::str::from_utf8(body).map_err(|_| RecordError::InvalidUtf8)?;

        Ok(Some(Self { code, body }))
    }
}

/// Display the full URI (prefix + body)
impl<'a> core::fmt::Display for UriRecord<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", self.prefix(), self.body)
    }
}

impl<'a> Encode for UriRecord<'a> {
    type Error = RecordError;

    fn encode_len(&self) -> Result<usize, RecordError> {
        if self.body.len() > MAX_URI_LEN {
            return Err(RecordError::TooLong(self.body.len()));
        }

        Ok(5 + self.body.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, RecordError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(RecordError::BufferLength);
        }

        let d = self.body.as_bytes();

        buff[0] = URI_RECORD_HEADER;
        buff[1] = 1;
        buff[2] = (1 + d.len()) as u8;
        buff[3] = URI_TYPE;
        buff[4] = self.code;
        buff[5..n].copy_from_slice(d);

        Ok(n)
    }
}

/// NDEF record errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum RecordError {
    /// Record shorter than its declared lengths
    #[cfg_attr(feature = "thiserror", error("record truncated"))]
    Truncated,

    /// Long-record form (4-byte payload length) is not supported
    #[cfg_attr(feature = "thiserror", error("long-form records are not supported"))]
    LongRecord,

    /// Chunked records or records with an ID field are not supported
    #[cfg_attr(feature = "thiserror", error("malformed record header"))]
    Malformed,

    /// Record is not a well-known URI record
    #[cfg_attr(feature = "thiserror", error("record is not a URI record"))]
    NotUri,

    /// Identifier code outside the well-known prefix table
    #[cfg_attr(feature = "thiserror", error("unknown URI identifier code 0x{0:02x}"))]
    UnknownPrefix(u8),

    /// URI body is not valid UTF-8
    #[cfg_attr(feature = "thiserror", error("URI is not valid UTF-8"))]
    InvalidUtf8,

    /// URI exceeds the short-record payload limit
    #[cfg_attr(feature = "thiserror", error("URI of {0} bytes exceeds 254 byte record limit"))]
    TooLong(usize),

    /// Output buffer too small
    #[cfg_attr(feature = "thiserror", error("output buffer too short"))]
    BufferLength,
}

impl From<encdec::Error> for RecordError {
    fn from(_: encdec::Error) -> Self {
        RecordError::BufferLength
    }
}

#[cfg(test)]
mod test {
    use rand::random;

    use super::*;

    #[test]
    fn encode_reference_record() {
        let mut buff = [0u8; 64];
        let n = UriRecord::new("ab").encode(&mut buff).unwrap();

        assert_eq!(&buff[..n], &[0xD1, 0x01, 0x03, 0x55, 0x00, b'a', b'b']);
    }

    #[test]
    fn decode_empty() {
        assert_eq!(UriRecord::decode(&[]), Ok(None));
    }

    #[test]
    fn decode_prefixed() {
        let mut buff = [0u8; 32];
        let b = b"example.com/x";
        buff[..5].copy_from_slice(&[0xD1, 0x01, 1 + b.len() as u8, 0x55, 0x04]);
        buff[5..][..b.len()].copy_from_slice(b);

        let r = UriRecord::decode(&buff[..5 + b.len()]).unwrap().unwrap();

        assert_eq!(r.prefix(), "https://");
        assert_eq!(r.body, "example.com/x");
    }

    #[test]
    fn round_trip_lengths() {
        let mut src = [b'a'; MAX_URI_LEN];
        let mut buff = [0u8; MAX_URI_LEN + 5];

        for len in [0, 1, 2, 127, 128, 253, MAX_URI_LEN] {
            for b in src[..len].iter_mut() {
                *b = b'a' + random::<u8>() % 26;
            }
            let uri = core::str::from_utf8(&src[..len]).unwrap();

            let n = UriRecord::new(uri).encode(&mut buff).unwrap();
            let r = UriRecord::decode(&buff[..n]).unwrap().unwrap();

            assert_eq!(r.code, 0);
            assert_eq!(r.body, uri);
        }
    }

    #[test]
    fn encode_too_long() {
        let src = [b'a'; MAX_URI_LEN + 1];
        let uri = core::str::from_utf8(&src).unwrap();
        let mut buff = [0u8; 512];

        assert_eq!(
            UriRecord::new(uri).encode(&mut buff),
            Err(RecordError::TooLong(MAX_URI_LEN + 1))
        );
    }

    #[test]
    fn decode_errors() {
        // Long record form
        assert_eq!(
            UriRecord::decode(&[0xC1, 0x01, 0x00, 0x00, 0x00, 0x02, 0x55, 0x00, b'a']),
            Err(RecordError::LongRecord)
        );
        // Text record
        assert_eq!(
            UriRecord::decode(&[0xD1, 0x01, 0x02, 0x54, 0x00, b'a']),
            Err(RecordError::NotUri)
        );
        // MIME type name format
        assert_eq!(
            UriRecord::decode(&[0xD2, 0x01, 0x02, 0x55, 0x00, b'a']),
            Err(RecordError::NotUri)
        );
        // Truncated payload
        assert_eq!(
            UriRecord::decode(&[0xD1, 0x01, 0x05, 0x55, 0x00, b'a']),
            Err(RecordError::Truncated)
        );
        // Header only
        assert_eq!(UriRecord::decode(&[0xD1, 0x01]), Err(RecordError::Truncated));
        // Empty payload
        assert_eq!(
            UriRecord::decode(&[0xD1, 0x01, 0x00, 0x55]),
            Err(RecordError::Truncated)
        );
        // Unknown identifier code
        assert_eq!(
            UriRecord::decode(&[0xD1, 0x01, 0x02, 0x55, 0x24, b'a']),
            Err(RecordError::UnknownPrefix(0x24))
        );
        // Invalid UTF-8
        assert_eq!(
            UriRecord::decode(&[0xD1, 0x01, 0x02, 0x55, 0x00, 0xFF]),
            Err(RecordError::InvalidUtf8)
        );
    }
}
