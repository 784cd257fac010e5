//! Abstract remote-backup interface.
//!
//! Concrete backends (Arweave, Nostr relays, IPFS pinning, a local
//! directory) live outside the core; the contract here is that `put`
//! accepts the exact vault envelope bytes unchanged and `get(latest())`
//! returns the most recently stored envelope.

use serde::{Deserialize, Serialize};

use keyforge_crypto::Result;

/// Which backend a store writes to; selects the metadata slot the vault
/// records its backup handles in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Arweave,
    Nostr,
    Ipfs,
    Local,
}

/// Price quote for storing a blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub size: u64,
    pub price_minor_units: u64,
    pub currency: String,
    pub fx_rate: f64,
}

/// Funds available to a paying backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Balance {
    pub confirmed: u64,
    pub unconfirmed: u64,
    pub total: u64,
}

pub trait BlobStore {
    fn kind(&self) -> BackupKind;

    /// Store a blob, returning an opaque handle.
    ///
    /// # Errors
    /// Backend-specific; `InsufficientFunds` when the upload cannot be
    /// paid for.
    fn put(&self, bytes: &[u8]) -> Result<String>;

    /// Fetch a blob by handle.
    ///
    /// # Errors
    /// `NotFound` for an unknown handle.
    fn get(&self, handle: &str) -> Result<Vec<u8>>;

    /// Handle of the most recently stored blob, if any.
    ///
    /// # Errors
    /// Backend-specific I/O failures.
    fn latest(&self) -> Result<Option<String>>;

    /// Price a prospective upload.
    ///
    /// # Errors
    /// Backend-specific I/O failures.
    fn quote(&self, bytes: &[u8]) -> Result<Quote>;

    /// Current backend balance.
    ///
    /// # Errors
    /// Backend-specific I/O failures.
    fn balance(&self) -> Result<Balance>;
}
