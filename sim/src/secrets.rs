// Copyright (c) 2026 The Chip Auth Authors

//! In-memory credential store

use ed25519_dalek::SigningKey;
use zeroize::Zeroizing;

use chip_auth::{ledger::SecretStore, tx::AccountId, Error};

/// [SecretStore] holding an ed25519 secret key in memory
pub struct MemorySecretStore {
    secret: Zeroizing<[u8; 32]>,
    locked: bool,
}

impl MemorySecretStore {
    /// Create a store for the provided secret key
    pub fn new(secret: [u8; 32]) -> Self {
        Self {
            secret: Zeroizing::new(secret),
            locked: false,
        }
    }

    /// Create a store with a random secret key
    pub fn random() -> Self {
        Self::new(rand::random())
    }

    /// Fetch the account id for the stored key
    pub fn account(&self) -> AccountId {
        SigningKey::from_bytes(&self.secret).verifying_key().to_bytes()
    }

    /// Refuse access to the stored key
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }
}

impl SecretStore for MemorySecretStore {
    fn with_signing_key<R, F>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&[u8; 32]) -> R,
    {
        if self.locked {
            return Err(Error::Credential("secret store locked".to_string()));
        }

        // Callers receive a scoped copy, cleared on return
        let secret = Zeroizing::new(*self.secret);

        Ok(f(&secret))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scoped_access() {
        let mut s = MemorySecretStore::new([7u8; 32]);

        let pk = s
            .with_signing_key(|k| SigningKey::from_bytes(k).verifying_key().to_bytes())
            .unwrap();
        assert_eq!(pk, s.account());

        s.set_locked(true);
        assert!(matches!(
            s.with_signing_key(|_| ()),
            Err(Error::Credential(_))
        ));
    }
}
