//! The Keyforge vault: record models, the encrypted on-disk container,
//! and the store that ties them together.
//!
//! A vault is one JSON document, compressed with raw DEFLATE and sealed
//! with ChaCha20-Poly1305 under a key derived from the session's master
//! seed. The store exposes CRUD over passwords, notes, and issued-service
//! records, persisting atomically after every mutation.

pub mod blobstore;
pub mod codec;
pub mod models;
pub mod store;

pub use blobstore::{BackupKind, Balance, BlobStore, Quote};
pub use codec::{SealedVault, VaultKey};
pub use models::{
    Attachment, Backups, GpgEntry, NewNote, NewPassword, Note, NotePatch, PasswordEntry,
    PasswordHistoryEntry, PasswordPatch, PasswordQuery, ServicesConfig, SshEntry, TotpEntry,
    Vault, VaultConfig, VaultMetadata, WalletEntry, VAULT_VERSION,
};
pub use store::{config_dir, default_vault_path, VaultStore, CONFIG_DIR_ENV, VAULT_FILE_NAME};
