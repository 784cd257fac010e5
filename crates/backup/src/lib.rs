//! Backup backends for the Keyforge vault.
//!
//! The abstract `BlobStore` contract lives in `keyforge-vault`; this crate
//! provides the local directory backend with retention. Network backends
//! (Arweave, Nostr, IPFS) plug in through the same trait.

mod config;
mod local;

pub use config::BackupConfig;
pub use local::LocalBlobStore;
