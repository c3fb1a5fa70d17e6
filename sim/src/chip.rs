// Copyright (c) 2026 The Chip Auth Authors

//! Software authentication chip
//!
//! Answers the chip command set from in-memory state: an NDEF file holding
//! the URI record and secp256k1 key slots for signing. Signatures are DER
//! encoded and randomly high-s or low-s, as returned by hardware.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use encdec::Encode;
use k256::ecdsa::SigningKey;
use log::{debug, trace};

use chip_auth::Exchange;
use chip_auth_apdu::{
    command::Command,
    key_info::KeyInfoResp,
    ndef::UriRecord,
    select::SelectKind,
    sign::SignResp,
    status::{KnownStatus, StatusWord},
    ApduError, Instruction, NDEF_AID, NDEF_FILE_ID, SIGNER_AID,
};
use chip_auth_core::{
    signature::{complement, SignatureComponents},
    ChipPublicKey,
};

/// NDEF file size
pub const NDEF_FILE_LEN: usize = 1024;

/// Default signature counter for new key slots
pub const DEFAULT_COUNTER: u32 = 100_000;

/// Form of the `s` component for generated signatures
#[derive(Copy, Clone, Debug, PartialEq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum SignatureForm {
    /// Randomly high-s or low-s
    #[default]
    Random,
    /// Always low-s
    Low,
    /// Always high-s
    High,
}

/// Software chip, clones share chip state
#[derive(Clone)]
pub struct SimChip {
    state: Arc<Mutex<ChipState>>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Selected {
    None,
    Ndef,
    NdefFile,
    Signer,
}

struct Slot {
    key: SigningKey,
    counter: u32,
}

struct ChipState {
    selected: Selected,
    ndef: Vec<u8>,
    slots: BTreeMap<u8, Slot>,
    global_counter: u32,
    form: SignatureForm,
    faults: Vec<(Instruction, StatusWord)>,
    disconnected: bool,
    log: Vec<Vec<u8>>,
}

/// Simulated transport failure
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("chip disconnected")]
    Disconnected,
}

impl SimChip {
    /// Create a chip with `key` in slot 1
    pub fn new(key: SigningKey) -> Self {
        let mut slots = BTreeMap::new();
        slots.insert(
            1,
            Slot {
                key,
                counter: DEFAULT_COUNTER,
            },
        );

        Self {
            state: Arc::new(Mutex::new(ChipState {
                selected: Selected::None,
                ndef: vec![0u8; NDEF_FILE_LEN],
                slots,
                global_counter: DEFAULT_COUNTER,
                form: SignatureForm::Random,
                faults: vec![],
                disconnected: false,
                log: vec![],
            })),
        }
    }

    /// Create a chip with a random key in slot 1
    pub fn random() -> Self {
        Self::new(SigningKey::random(&mut rand::thread_rng()))
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ChipState> {
        // Poisoning only follows a panic in another test thread
        match self.state.lock() {
            Ok(s) => s,
            Err(e) => e.into_inner(),
        }
    }

    /// Add or replace a key slot
    pub fn set_key(&self, index: u8, key: SigningKey) {
        self.state().slots.insert(
            index,
            Slot {
                key,
                counter: DEFAULT_COUNTER,
            },
        );
    }

    /// Fetch the uncompressed public key for a slot
    pub fn public_key(&self, index: u8) -> Option<ChipPublicKey> {
        self.state()
            .slots
            .get(&index)
            .map(|s| encode_public_key(&s.key))
    }

    /// Set the form of generated signatures
    pub fn set_signature_form(&self, form: SignatureForm) {
        self.state().form = form;
    }

    /// Respond to every command with `ins` using status `sw`
    pub fn fail(&self, ins: Instruction, sw: u16) {
        self.state().faults.push((ins, StatusWord(sw)));
    }

    /// Remove injected faults
    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    /// Fail every exchange at the transport level
    pub fn set_disconnected(&self, disconnected: bool) {
        self.state().disconnected = disconnected;
    }

    /// Fetch all commands received
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.state().log.clone()
    }

    /// Count commands received with the provided instruction
    pub fn count(&self, ins: Instruction) -> usize {
        self.state()
            .log
            .iter()
            .filter(|c| c.get(1) == Some(&(ins as u8)))
            .count()
    }

    /// Decode the stored URI record directly from chip storage
    pub fn record(&self) -> Result<Option<String>, chip_auth_apdu::ndef::RecordError> {
        let s = self.state();
        let len = u16::from_be_bytes([s.ndef[0], s.ndef[1]]) as usize;
        let data = &s.ndef[2..][..len.min(NDEF_FILE_LEN - 2)];

        UriRecord::decode(data).map(|r| r.map(|r| r.to_string()))
    }
}

#[async_trait]
impl Exchange for SimChip {
    type Error = SimError;

    async fn exchange(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let mut s = self.state();

        s.log.push(command.to_vec());

        if s.disconnected {
            return Err(SimError::Disconnected);
        }

        let (mut data, sw) = match s.handle(command) {
            Ok(data) => (data, StatusWord::SUCCESS),
            Err(sw) => (vec![], sw),
        };

        trace!("chip command: {:02x?} -> {}", command, sw);

        data.extend_from_slice(&sw.0.to_be_bytes());
        Ok(data)
    }
}

impl ChipState {
    fn handle(&mut self, command: &[u8]) -> Result<Vec<u8>, StatusWord> {
        let c = match Command::parse(command) {
            Ok(c) => c,
            Err(ApduError::UnsupportedInstruction(_)) => {
                return Err(KnownStatus::InsNotSupported.into())
            }
            Err(ApduError::InvalidLength) => return Err(KnownStatus::WrongLength.into()),
            Err(_) => return Err(KnownStatus::IncorrectP1P2.into()),
        };

        let ins = match &c {
            Command::Select(_) => Instruction::Select,
            Command::ReadBinary(_) => Instruction::ReadBinary,
            Command::UpdateBinary(_) => Instruction::UpdateBinary,
            Command::KeyInfo(_) => Instruction::GetKeyInfo,
            Command::Sign(_) => Instruction::GenerateSignature,
        };
        if let Some((_, sw)) = self.faults.iter().find(|(i, _)| *i == ins) {
            return Err(*sw);
        }

        match c {
            Command::Select(r) => {
                self.selected = match (r.kind, r.id) {
                    (SelectKind::Application, id) if id == &NDEF_AID[..] => Selected::Ndef,
                    (SelectKind::Application, id) if id == &SIGNER_AID[..] => Selected::Signer,
                    (SelectKind::File, id)
                        if id == &NDEF_FILE_ID[..]
                            && matches!(self.selected, Selected::Ndef | Selected::NdefFile) =>
                    {
                        Selected::NdefFile
                    }
                    _ => return Err(KnownStatus::FileNotFound.into()),
                };
                Ok(vec![])
            }
            Command::ReadBinary(r) => {
                self.require(Selected::NdefFile)?;

                let start = r.offset as usize;
                if start >= NDEF_FILE_LEN {
                    return Err(KnownStatus::WrongParameters.into());
                }
                let end = (start + r.len as usize).min(NDEF_FILE_LEN);

                Ok(self.ndef[start..end].to_vec())
            }
            Command::UpdateBinary(r) => {
                self.require(Selected::NdefFile)?;

                let start = r.offset as usize;
                if start + r.data.len() > NDEF_FILE_LEN {
                    return Err(KnownStatus::WrongParameters.into());
                }
                self.ndef[start..][..r.data.len()].copy_from_slice(r.data);

                Ok(vec![])
            }
            Command::KeyInfo(r) => {
                self.require(Selected::Signer)?;

                let global_counter = self.global_counter;
                let slot = self
                    .slots
                    .get(&r.key_index)
                    .ok_or(StatusWord::from(KnownStatus::DataNotFound))?;

                let resp = KeyInfoResp::new(
                    global_counter,
                    slot.counter,
                    encode_public_key(&slot.key),
                );

                encode(&resp)
            }
            Command::Sign(r) => {
                self.require(Selected::Signer)?;

                if self.global_counter == 0 {
                    return Err(KnownStatus::ConditionsNotSatisfied.into());
                }

                let form = self.form;
                let slot = self
                    .slots
                    .get_mut(&r.key_index)
                    .ok_or(StatusWord::from(KnownStatus::DataNotFound))?;
                if slot.counter == 0 {
                    return Err(KnownStatus::ConditionsNotSatisfied.into());
                }

                let der = sign(&slot.key, r.digest, form)?;

                slot.counter -= 1;
                let key_counter = slot.counter;
                self.global_counter -= 1;

                debug!(
                    "signed {} with slot {} ({} byte signature)",
                    hex::encode(r.digest),
                    r.key_index,
                    der.len()
                );

                encode(&SignResp::new(self.global_counter, key_counter, &der))
            }
        }
    }

    fn require(&self, selected: Selected) -> Result<(), StatusWord> {
        match self.selected == selected {
            true => Ok(()),
            false => Err(KnownStatus::ConditionsNotSatisfied.into()),
        }
    }
}

fn encode<E: Encode<Error = ApduError>>(v: &E) -> Result<Vec<u8>, StatusWord> {
    let mut buff = vec![0u8; v.encode_len().map_err(|_| KnownStatus::IncorrectData)?];
    let n = v.encode(&mut buff).map_err(|_| KnownStatus::IncorrectData)?;
    buff.truncate(n);
    Ok(buff)
}

/// Sign a digest, returning a DER signature with `s` in the requested form
fn sign(key: &SigningKey, digest: &[u8; 32], form: SignatureForm) -> Result<Vec<u8>, StatusWord> {
    let (sig, _id) = key
        .sign_prehash_recoverable(digest)
        .map_err(|_| StatusWord::from(KnownStatus::IncorrectData))?;

    let mut b = [0u8; 64];
    b.copy_from_slice(&sig.to_bytes());
    let mut c = SignatureComponents::from_bytes(&b);

    let high = match form {
        SignatureForm::Random => rand::random(),
        SignatureForm::Low => false,
        SignatureForm::High => true,
    };
    if high == c.is_low_s() {
        c.s = complement(&c.s);
    }

    Ok(c.to_der())
}

/// Encode a public key as an uncompressed point
pub fn encode_public_key(key: &SigningKey) -> ChipPublicKey {
    let p = key.verifying_key().to_encoded_point(false);

    let mut b = [0u8; 65];
    b.copy_from_slice(p.as_bytes());
    b
}
