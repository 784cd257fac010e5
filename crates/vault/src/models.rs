//! Vault record types.
//!
//! The aggregate serializes to one JSON document; field declaration order
//! plus the `BTreeMap` site index make that serialization canonical, and
//! the metadata checksum is SHA-256 over it with the checksum field
//! blanked.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use keyforge_crypto::primitives;

/// Current vault document version.
pub const VAULT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordHistoryEntry {
    pub password: String,
    #[serde(with = "time::serde::rfc3339")]
    pub changed: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordEntry {
    pub id: Uuid,
    /// Unique key within the vault.
    pub site: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified: OffsetDateTime,
    /// Previous passwords, most recent first.
    #[serde(default)]
    pub history: Vec<PasswordHistoryEntry>,
}

/// Input for a new password record; the store assigns id and timestamps.
#[derive(Debug, Clone, Default)]
pub struct NewPassword {
    pub site: String,
    pub username: String,
    pub password: String,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

/// Partial update for a password record. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PasswordPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Search criteria; all given fields must match. `site` and `username`
/// match as case-insensitive substrings, `tags` must all be present.
#[derive(Debug, Clone, Default)]
pub struct PasswordQuery {
    pub tags: Option<Vec<String>>,
    pub site: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    pub size: u64,
    /// Base64 content; may be absent when only metadata was imported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Public record of an issued SSH key. Never holds private material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SshEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub public_key: String,
    pub fingerprint: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GpgEntry {
    pub name: String,
    pub email: String,
    pub key_id: String,
    pub fingerprint: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub bitcoin_address: String,
    pub ethereum_address: String,
    pub xpub: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

/// TOTP registration. The shared secret lives in the vault plaintext
/// (base64); acceptable because the vault as a whole is encrypted at rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotpEntry {
    pub service: String,
    pub secret: String,
    pub algorithm: String,
    pub digits: u32,
    pub period: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ServicesConfig {
    #[serde(default)]
    pub ssh: Vec<SshEntry>,
    #[serde(default)]
    pub gpg: Vec<GpgEntry>,
    #[serde(default)]
    pub wallets: Vec<WalletEntry>,
    #[serde(default)]
    pub totp: Vec<TotpEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VaultConfig {
    #[serde(default)]
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Backups {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arweave: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nostr: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VaultMetadata {
    /// SHA-256 hex over the canonical JSON with this field set to "".
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub backups: Backups,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vault {
    pub version: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
    #[serde(default)]
    pub config: VaultConfig,
    /// Keyed by `site`; BTreeMap keeps serialization order stable.
    #[serde(default)]
    pub passwords: BTreeMap<String, PasswordEntry>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub metadata: VaultMetadata,
}

impl Vault {
    #[must_use]
    pub fn new() -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            version: VAULT_VERSION,
            created: now,
            updated: now,
            config: VaultConfig::default(),
            passwords: BTreeMap::new(),
            notes: Vec::new(),
            metadata: VaultMetadata::default(),
        }
    }

    /// SHA-256 hex over the canonical JSON serialization with
    /// `metadata.checksum` blanked. Pure; does not modify the vault.
    ///
    /// # Panics
    /// Never: the vault model always serializes.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn calculate_checksum(&self) -> String {
        let mut copy = self.clone();
        copy.metadata.checksum = String::new();
        let json = serde_json::to_string(&copy).expect("vault model always serializes");
        hex::encode(primitives::sha256(json.as_bytes()))
    }

    /// Whether the stored checksum matches the current contents.
    #[must_use]
    pub fn validate_integrity(&self) -> bool {
        primitives::ct_equal(
            self.metadata.checksum.as_bytes(),
            self.calculate_checksum().as_bytes(),
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
            && self.notes.is_empty()
            && self.config.services.ssh.is_empty()
            && self.config.services.gpg.is_empty()
            && self.config.services.wallets.is_empty()
            && self.config.services.totp.is_empty()
    }
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordEntry {
    /// True when the entry satisfies every populated query field.
    #[must_use]
    pub fn matches(&self, query: &PasswordQuery) -> bool {
        if let Some(site) = &query.site {
            if !self.site.to_lowercase().contains(&site.to_lowercase()) {
                return false;
            }
        }
        if let Some(username) = &query.username {
            if !self.username.to_lowercase().contains(&username.to_lowercase()) {
                return false;
            }
        }
        if let Some(tags) = &query.tags {
            if !tags.iter().all(|t| self.tags.contains(t)) {
                return false;
            }
        }
        true
    }
}
