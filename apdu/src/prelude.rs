//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    binary::{ReadBinaryReq, UpdateBinaryReq},
    command::Command,
    encode_apdu,
    key_info::{KeyInfoReq, KeyInfoResp, PUBLIC_KEY_LEN},
    ndef::{RecordError, UriRecord},
    select::{SelectKind, SelectReq},
    sign::{SignReq, SignResp, DIGEST_LEN},
    status::{split_response, KnownStatus, StatusWord},
    ApduError, ApduReq, MAX_CHUNK, NDEF_AID, NDEF_FILE_ID, SIGNER_AID,
};
