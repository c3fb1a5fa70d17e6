// Copyright (c) 2026 The Chip Auth Authors

//! Raw APDU exchange abstraction, implemented by reader transports and the
//! software chip.

use std::{fmt::Display, sync::Arc};

use async_trait::async_trait;

/// Exchange a single encoded command APDU for a raw response (data + status word)
#[async_trait]
pub trait Exchange {
    type Error: Display + Send;

    /// Issue a command and await the raw response
    async fn exchange(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

/// Shared transports exchange via the inner transport
#[async_trait]
impl<T: Exchange + Send + Sync> Exchange for Arc<T> {
    type Error = T::Error;

    async fn exchange(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        self.as_ref().exchange(command).await
    }
}
