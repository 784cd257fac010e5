//! Keyforge cryptographic core: primitives, master-seed derivation, and
//! domain-separated key expansion.
//!
//! Everything downstream (SSH keys, GPG keys, wallets, TOTP secrets, the
//! vault key) is a pure function of the master seed through this crate, so
//! byte-for-byte determinism here is the recovery guarantee of the whole
//! system.

pub mod domain;
pub mod error;
pub mod master;
pub mod primitives;

pub use domain::{
    derive_key, derive_multiple, domains, hostname_to_index, service_to_index,
    totp_service_to_index, MAX_DERIVED_LEN,
};
pub use error::{KeyforgeError, Result};
pub use master::{
    derive_master_seed, derive_master_seed_with_iterations, MasterSeed, DEFAULT_USER_LABEL,
    DEFAULT_VERSION, MASTER_ITERATIONS, MASTER_SEED_LEN,
};
