// Copyright (c) 2026 The Chip Auth Authors

//! Handle for connected chips
//!
//! This provides methods for interacting with the chip and is generic over
//! [Exchange] transports. Each method holds the transport lock for the whole
//! command sequence so selects and reads from concurrent callers cannot
//! interleave.

use std::{sync::Arc, time::Duration};

use log::{debug, warn};
use tokio::sync::{Mutex, MutexGuard};

use chip_auth_apdu::{
    binary::{ReadBinaryReq, UpdateBinaryReq},
    encode_apdu,
    key_info::{KeyInfoReq, KeyInfoResp},
    ndef::UriRecord,
    select::SelectReq,
    sign::{SignReq, SignResp, DIGEST_LEN},
    status::split_response,
    ApduError, ApduReq, MAX_CHUNK, NDEF_AID, NDEF_FILE_ID, SIGNER_AID,
};
use encdec::{Decode, DecodeOwned, Encode};

use crate::{transport::Exchange, Error};

/// Offset of the record length within the NDEF file
const RECORD_LEN_OFFSET: u16 = 0;

/// Offset of the record within the NDEF file
const RECORD_OFFSET: u16 = 2;

/// Handle for a connected chip [Exchange].
pub struct ChipHandle<T: Exchange> {
    /// Transport for communication
    t: Arc<Mutex<T>>,
    /// Timeout for APDU requests
    request_timeout: Duration,
}

impl<T: Exchange> Clone for ChipHandle<T> {
    fn clone(&self) -> Self {
        Self {
            t: self.t.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

/// Create a [ChipHandle] wrapper from a type implementing [Exchange]
impl<T: Exchange> From<T> for ChipHandle<T> {
    fn from(t: T) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
            request_timeout: Duration::from_secs(2),
        }
    }
}

/// Signature response with counters
#[derive(Clone, Debug, PartialEq)]
pub struct ChipSignature {
    /// Remaining signatures for the chip
    pub global_counter: u32,
    /// Remaining signatures for the key slot
    pub key_counter: u32,
    /// DER encoded signature
    pub der: Vec<u8>,
}

impl<T: Exchange + Send + Sync> ChipHandle<T> {
    /// Set the timeout applied to each command
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Fetch counters and public key for a key slot
    pub async fn key_info(&self, key_index: u8) -> Result<KeyInfoResp, Error> {
        let t = self.t.lock().await;

        debug!("Requesting key info for slot {}", key_index);

        self.command(&t, &SelectReq::application(&SIGNER_AID)).await?;
        let resp = self.command(&t, &KeyInfoReq::new(key_index)).await?;

        let (info, _) = KeyInfoResp::decode_owned(&resp)?;

        debug!(
            "Key slot {}: {} (counters: {} / {})",
            key_index,
            hex::encode(info.public_key),
            info.global_counter,
            info.key_counter
        );

        Ok(info)
    }

    /// Sign a 32-byte digest with a key slot
    pub async fn sign(
        &self,
        key_index: u8,
        digest: &[u8; DIGEST_LEN],
    ) -> Result<ChipSignature, Error> {
        let t = self.t.lock().await;

        debug!("Requesting signature from slot {} for {}", key_index, hex::encode(digest));

        self.command(&t, &SelectReq::application(&SIGNER_AID)).await?;
        let resp = self.command(&t, &SignReq::new(key_index, digest)).await?;

        let (r, _) = SignResp::decode(&resp)?;

        Ok(ChipSignature {
            global_counter: r.global_counter,
            key_counter: r.key_counter,
            der: r.signature.to_vec(),
        })
    }

    /// Read the stored URI record, returning `None` where no record is stored
    pub async fn read_record(&self) -> Result<Option<String>, Error> {
        let t = self.t.lock().await;

        self.select_ndef(&t).await?;

        let len = self.read_binary_locked(&t, RECORD_LEN_OFFSET, 2).await?;
        let len = u16::from_be_bytes([len[0], len[1]]) as usize;
        if len == 0 {
            debug!("No stored record");
            return Ok(None);
        }

        let data = self.read_binary_locked(&t, RECORD_OFFSET, len).await?;
        let record = UriRecord::decode(&data)?;

        Ok(record.map(|r| r.to_string()))
    }

    /// Write a URI record, the length is written before the record body
    pub async fn write_record(&self, uri: &str) -> Result<(), Error> {
        let record = UriRecord::new(uri);
        let mut data = vec![0u8; record.encode_len()?];
        let n = record.encode(&mut data)?;

        let t = self.t.lock().await;

        debug!("Writing {} byte record: {}", n, uri);

        self.select_ndef(&t).await?;
        self.update_binary_locked(&t, RECORD_LEN_OFFSET, &(n as u16).to_be_bytes())
            .await?;
        self.update_binary_locked(&t, RECORD_OFFSET, &data[..n])
            .await?;

        Ok(())
    }

    /// Read `len` bytes from the selected file at `offset`
    pub async fn read_binary(&self, offset: u16, len: usize) -> Result<Vec<u8>, Error> {
        let t = self.t.lock().await;
        self.read_binary_locked(&t, offset, len).await
    }

    /// Write `data` to the selected file at `offset`
    pub async fn update_binary(&self, offset: u16, data: &[u8]) -> Result<(), Error> {
        let t = self.t.lock().await;
        self.update_binary_locked(&t, offset, data).await
    }

    /// Select an application by identifier
    pub async fn select_application(&self, aid: &[u8]) -> Result<(), Error> {
        let t = self.t.lock().await;
        self.command(&t, &SelectReq::application(aid)).await?;
        Ok(())
    }

    /// Select a file within the current application
    pub async fn select_file(&self, id: &[u8; 2]) -> Result<(), Error> {
        let t = self.t.lock().await;
        self.command(&t, &SelectReq::file(id)).await?;
        Ok(())
    }

    async fn select_ndef(&self, t: &MutexGuard<'_, T>) -> Result<(), Error> {
        self.command(t, &SelectReq::application(&NDEF_AID)).await?;
        self.command(t, &SelectReq::file(&NDEF_FILE_ID)).await?;
        Ok(())
    }

    /// Chunked read, advancing by the bytes returned for each command
    async fn read_binary_locked(
        &self,
        t: &MutexGuard<'_, T>,
        offset: u16,
        len: usize,
    ) -> Result<Vec<u8>, Error> {
        let mut data = Vec::with_capacity(len);

        while data.len() < len {
            let chunk = (len - data.len()).min(MAX_CHUNK);
            let o = chunk_offset(offset, data.len())?;

            let resp = self.command(t, &ReadBinaryReq::new(o, chunk)?).await?;
            if resp.is_empty() {
                warn!("Empty read at offset {} ({} of {} bytes)", o, data.len(), len);
                return Err(Error::Apdu(ApduError::Truncated));
            }

            let n = resp.len().min(chunk);
            data.extend_from_slice(&resp[..n]);
        }

        Ok(data)
    }

    /// Chunked write, each chunk is status checked before the next
    async fn update_binary_locked(
        &self,
        t: &MutexGuard<'_, T>,
        offset: u16,
        data: &[u8],
    ) -> Result<(), Error> {
        for (i, c) in data.chunks(MAX_CHUNK).enumerate() {
            let o = chunk_offset(offset, i * MAX_CHUNK)?;
            self.command(t, &UpdateBinaryReq::new(o, c)?).await?;
        }

        Ok(())
    }

    /// Issue a single command, returning the response data on success
    async fn command<R: ApduReq>(&self, t: &MutexGuard<'_, T>, req: &R) -> Result<Vec<u8>, Error> {
        let mut buff = [0u8; 4 + 1 + 255 + 1];
        let n = encode_apdu(req, &mut buff)?;

        let resp = tokio::time::timeout(self.request_timeout, t.exchange(&buff[..n]))
            .await?
            .map_err(|e| Error::ChipTransport(e.to_string()))?;

        let (data, sw) = split_response(&resp)?;
        if !sw.is_success() {
            debug!("Command {:02x?} failed: {}", &buff[..4], sw);
            return Err(Error::ChipStatus(sw));
        }

        Ok(data.to_vec())
    }
}

/// Compute a chunk offset, checking it fits the offset field
fn chunk_offset(base: u16, index: usize) -> Result<u16, Error> {
    u16::try_from(base as usize + index).map_err(|_| Error::Apdu(ApduError::InvalidLength))
}

#[cfg(test)]
mod test {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use chip_auth_apdu::command::Command;

    use super::*;

    /// Scripted chip, answers reads from a backing file and records commands
    #[derive(Default)]
    struct MockChip {
        file: Vec<u8>,
        /// Status to return for the nth command
        fail_at: Option<(usize, u16)>,
        /// Return short reads of at most this length
        max_read: Option<usize>,
        log: StdMutex<Vec<Vec<u8>>>,
    }

    impl MockChip {
        fn commands(&self) -> Vec<Vec<u8>> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Exchange for MockChip {
        type Error = String;

        async fn exchange(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
            let index = {
                let mut l = self.log.lock().unwrap();
                l.push(command.to_vec());
                l.len() - 1
            };

            if let Some((i, sw)) = self.fail_at {
                if i == index {
                    return Ok(sw.to_be_bytes().to_vec());
                }
            }

            let mut resp = match Command::parse(command).map_err(|e| e.to_string())? {
                Command::ReadBinary(r) => {
                    let start = (r.offset as usize).min(self.file.len());
                    let mut n = (r.len as usize).min(self.file.len() - start);
                    if let Some(m) = self.max_read {
                        n = n.min(m);
                    }
                    self.file[start..][..n].to_vec()
                }
                _ => vec![],
            };

            resp.extend_from_slice(&[0x90, 0x00]);
            Ok(resp)
        }
    }

    fn read_offsets(cmds: &[Vec<u8>]) -> Vec<(u16, u8)> {
        cmds.iter()
            .filter_map(|c| match Command::parse(c).unwrap() {
                Command::ReadBinary(r) => Some((r.offset, r.len)),
                _ => None,
            })
            .collect()
    }

    fn write_offsets(cmds: &[Vec<u8>]) -> Vec<(u16, usize)> {
        cmds.iter()
            .filter_map(|c| match Command::parse(c).unwrap() {
                Command::UpdateBinary(u) => Some((u.offset, u.data.len())),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn read_600_bytes() {
        let file: Vec<u8> = (0..700).map(|i| i as u8).collect();
        let chip = Arc::new(MockChip {
            file: file.clone(),
            ..Default::default()
        });
        let h = ChipHandle::from(chip.clone());

        let data = h.read_binary(2, 600).await.unwrap();

        assert_eq!(data, &file[2..602]);
        assert_eq!(
            read_offsets(&chip.commands()),
            vec![(2, 253), (255, 253), (508, 94)]
        );
    }

    #[tokio::test]
    async fn read_boundary_lengths() {
        for (len, trips) in [(0, 0), (1, 1), (252, 1), (253, 1), (254, 2)] {
            let chip = Arc::new(MockChip {
                file: vec![0xab; 512],
                ..Default::default()
            });
            let h = ChipHandle::from(chip.clone());

            let data = h.read_binary(0, len).await.unwrap();

            assert_eq!(data.len(), len);
            assert_eq!(chip.commands().len(), trips, "len {}", len);
        }
    }

    #[tokio::test]
    async fn write_boundary_lengths() {
        let cases: [(usize, &[(u16, usize)]); 5] = [
            (0, &[]),
            (1, &[(2, 1)]),
            (252, &[(2, 252)]),
            (253, &[(2, 253)]),
            (254, &[(2, 253), (255, 1)]),
        ];

        for (len, expected) in cases {
            let chip = Arc::new(MockChip::default());
            let h = ChipHandle::from(chip.clone());

            h.update_binary(2, &vec![0xcd; len]).await.unwrap();

            let cmds = chip.commands();
            assert_eq!(cmds.len(), (len + MAX_CHUNK - 1) / MAX_CHUNK, "len {}", len);
            assert_eq!(write_offsets(&cmds), expected, "len {}", len);
        }
    }

    #[tokio::test]
    async fn write_status_aborts_loop() {
        let chip = Arc::new(MockChip {
            fail_at: Some((1, 0x6A80)),
            ..Default::default()
        });
        let h = ChipHandle::from(chip.clone());

        let r = h.update_binary(0, &[0u8; 600]).await;

        match r {
            Err(Error::ChipStatus(sw)) => assert_eq!(sw.0, 0x6A80),
            _ => panic!("unexpected result: {:?}", r),
        }
        assert_eq!(write_offsets(&chip.commands()), vec![(0, 253), (253, 253)]);
    }

    #[tokio::test]
    async fn read_short_chunks() {
        let file: Vec<u8> = (0..300).map(|i| i as u8).collect();
        let chip = Arc::new(MockChip {
            file: file.clone(),
            max_read: Some(100),
            ..Default::default()
        });
        let h = ChipHandle::from(chip.clone());

        let data = h.read_binary(0, 250).await.unwrap();

        assert_eq!(data, &file[..250]);
        assert_eq!(
            read_offsets(&chip.commands()),
            vec![(0, 250), (100, 150), (200, 50)]
        );
    }

    #[tokio::test]
    async fn read_empty_chunk_fails() {
        let chip = Arc::new(MockChip {
            file: vec![0u8; 10],
            ..Default::default()
        });
        let h = ChipHandle::from(chip.clone());

        let r = h.read_binary(0, 20).await;

        assert!(matches!(r, Err(Error::Apdu(ApduError::Truncated))));
        assert_eq!(chip.commands().len(), 2);
    }

    #[tokio::test]
    async fn status_aborts_loop() {
        let chip = Arc::new(MockChip {
            file: vec![0u8; 1024],
            fail_at: Some((1, 0x6B00)),
            ..Default::default()
        });
        let h = ChipHandle::from(chip.clone());

        let r = h.read_binary(0, 600).await;

        match r {
            Err(Error::ChipStatus(sw)) => assert_eq!(sw.0, 0x6B00),
            _ => panic!("unexpected result: {:?}", r),
        }
        assert_eq!(chip.commands().len(), 2);
    }

    #[tokio::test]
    async fn write_record_sequence() {
        let chip = Arc::new(MockChip::default());
        let h = ChipHandle::from(chip.clone());

        // 5 byte header + 5 byte URI makes a 10 byte record
        h.write_record("a/b/1").await.unwrap();

        let cmds = chip.commands();
        assert_eq!(cmds.len(), 4);

        assert_eq!(
            Command::parse(&cmds[0]).unwrap(),
            Command::Select(SelectReq::application(&NDEF_AID))
        );
        assert_eq!(
            Command::parse(&cmds[1]).unwrap(),
            Command::Select(SelectReq::file(&NDEF_FILE_ID))
        );

        // Length then payload
        assert_eq!(
            Command::parse(&cmds[2]).unwrap(),
            Command::UpdateBinary(UpdateBinaryReq::new(0, &[0x00, 0x0a]).unwrap())
        );
        match Command::parse(&cmds[3]).unwrap() {
            Command::UpdateBinary(u) => {
                assert_eq!(u.offset, 2);
                assert_eq!(u.data.len(), 10);
                assert_eq!(&u.data[5..], b"a/b/1");
            }
            c => panic!("unexpected command: {:?}", c),
        }
    }

    #[tokio::test]
    async fn write_length_failure_stops() {
        let chip = Arc::new(MockChip {
            fail_at: Some((2, 0x6982)),
            ..Default::default()
        });
        let h = ChipHandle::from(chip.clone());

        let r = h.write_record("a/b/1").await;

        assert!(matches!(r, Err(Error::ChipStatus(_))));
        assert_eq!(chip.commands().len(), 3);
    }

    #[tokio::test]
    async fn read_stored_record() {
        let mut file = vec![0x00, 0x0a, 0xD1, 0x01, 0x06, 0x55, 0x04];
        file.extend_from_slice(b"x.io/");

        let chip = Arc::new(MockChip {
            file,
            ..Default::default()
        });
        let h = ChipHandle::from(chip.clone());

        assert_eq!(h.read_record().await.unwrap().as_deref(), Some("https://x.io/"));
    }

    #[tokio::test]
    async fn read_missing_record() {
        let chip = Arc::new(MockChip {
            file: vec![0x00, 0x00],
            ..Default::default()
        });
        let h = ChipHandle::from(chip.clone());

        assert_eq!(h.read_record().await.unwrap(), None);
    }

    #[tokio::test]
    async fn truncated_response() {
        struct Short;

        #[async_trait]
        impl Exchange for Short {
            type Error = String;

            async fn exchange(&self, _command: &[u8]) -> Result<Vec<u8>, Self::Error> {
                Ok(vec![0x90])
            }
        }

        let h = ChipHandle::from(Short);
        let r = h.select_application(&NDEF_AID).await;

        assert!(matches!(r, Err(Error::Apdu(ApduError::Truncated))));
    }

    #[tokio::test(start_paused = true)]
    async fn command_timeout() {
        struct Stalled;

        #[async_trait]
        impl Exchange for Stalled {
            type Error = String;

            async fn exchange(&self, _command: &[u8]) -> Result<Vec<u8>, Self::Error> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(vec![0x90, 0x00])
            }
        }

        let h = ChipHandle::from(Stalled).with_timeout(Duration::from_millis(500));
        let r = h.select_application(&NDEF_AID).await;

        assert!(matches!(r, Err(Error::ChipTimeout)));
    }
}
