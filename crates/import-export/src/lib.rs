//! Vault export containers and import with format detection.
//!
//! Three JSON container formats, all UTF-8 on disk:
//!
//! - `json`: the vault in the clear, under an `exportInfo` header.
//! - `encrypted`: the vault run through the regular codec pipeline
//!   (DEFLATE + ChaCha20-Poly1305), nonce/tag/data base64.
//! - `backup`: like `encrypted`, but the sealed payload is
//!   `{ vault, metadata }` and the container self-describes its cipher.
//!
//! Import looks at the top-level `format` field when present and falls
//! back to treating the document as a `json` container.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use keyforge_crypto::{KeyforgeError, Result};
use keyforge_vault::codec::{self, SealedVault, NONCE_LEN, TAG_LEN};
use keyforge_vault::{Vault, VaultKey};

/// Container format version stamped into every export.
pub const EXPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Encrypted,
    Backup,
}

impl FromStr for ExportFormat {
    type Err = KeyforgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "encrypted" => Ok(ExportFormat::Encrypted),
            "backup" | "keyforge-backup" => Ok(ExportFormat::Backup),
            _ => Err(KeyforgeError::InvalidFormat(format!(
                "unsupported format: {s}. Supported formats: json, encrypted, backup"
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportInfo {
    pub version: String,
    pub exported: String,
    pub format: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonContainer {
    #[serde(rename = "exportInfo")]
    export_info: ExportInfo,
    vault: Vault,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncryptedContainer {
    version: String,
    format: String,
    exported: String,
    nonce: String,
    tag: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BackupContainer {
    format: String,
    version: String,
    exported: String,
    encryption: String,
    nonce: String,
    tag: String,
    data: String,
}

/// Counts stored alongside the vault inside a `backup` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupMetadata {
    pub passwords: usize,
    pub notes: usize,
    pub services: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct BackupPayload {
    vault: Vault,
    metadata: BackupMetadata,
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Serialize a vault into the chosen container.
///
/// # Errors
/// Codec errors for the encrypted formats; serialization itself cannot
/// fail.
#[allow(clippy::expect_used)]
pub fn export_to_string(vault: &Vault, format: ExportFormat, key: &VaultKey) -> Result<String> {
    let container = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&JsonContainer {
            export_info: ExportInfo {
                version: EXPORT_VERSION.to_string(),
                exported: now_rfc3339(),
                format: "json".to_string(),
            },
            vault: vault.clone(),
        }),
        ExportFormat::Encrypted => {
            let sealed = codec::encrypt(vault, key, None)?;
            serde_json::to_string_pretty(&EncryptedContainer {
                version: EXPORT_VERSION.to_string(),
                format: "encrypted".to_string(),
                exported: now_rfc3339(),
                nonce: STANDARD.encode(sealed.nonce),
                tag: STANDARD.encode(sealed.tag),
                data: STANDARD.encode(&sealed.ciphertext),
            })
        }
        ExportFormat::Backup => {
            let payload = BackupPayload {
                metadata: BackupMetadata {
                    passwords: vault.passwords.len(),
                    notes: vault.notes.len(),
                    services: vault.config.services.ssh.len()
                        + vault.config.services.gpg.len()
                        + vault.config.services.wallets.len()
                        + vault.config.services.totp.len(),
                },
                vault: vault.clone(),
            };
            let json = serde_json::to_vec(&payload).expect("payload always serializes");
            let sealed = codec::encrypt_bytes(&json, key, None)?;
            serde_json::to_string_pretty(&BackupContainer {
                format: "keyforge-backup".to_string(),
                version: EXPORT_VERSION.to_string(),
                exported: now_rfc3339(),
                encryption: "ChaCha20-Poly1305".to_string(),
                nonce: STANDARD.encode(sealed.nonce),
                tag: STANDARD.encode(sealed.tag),
                data: STANDARD.encode(&sealed.ciphertext),
            })
        }
    };
    container.map_err(|e| KeyforgeError::InvalidFormat(format!("serialize export: {e}")))
}

/// Export a vault to `output`, creating parent directories as needed.
///
/// # Errors
/// See [`export_to_string`], plus filesystem errors.
pub fn export_vault(
    vault: &Vault,
    format: ExportFormat,
    key: &VaultKey,
    output: &Path,
) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = export_to_string(vault, format, key)?;
    fs::write(output, content)?;
    Ok(())
}

/// Identify the container format of an export document from its
/// top-level `format` field; absent or unrecognised means `json`.
#[must_use]
pub fn detect_format(content: &str) -> ExportFormat {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        return ExportFormat::Json;
    };
    match value.get("format").and_then(|f| f.as_str()) {
        Some("encrypted") => ExportFormat::Encrypted,
        Some("keyforge-backup") => ExportFormat::Backup,
        _ => ExportFormat::Json,
    }
}

/// Parse any of the three container formats back into a vault.
///
/// # Errors
/// `InvalidFormat` for documents that are not a known container;
/// `VaultCorrupt` when an encrypted payload does not open under `key`.
pub fn import_from_str(content: &str, key: &VaultKey) -> Result<Vault> {
    match detect_format(content) {
        ExportFormat::Json => {
            let container: JsonContainer = serde_json::from_str(content)
                .map_err(|e| KeyforgeError::InvalidFormat(format!("json export: {e}")))?;
            Ok(container.vault)
        }
        ExportFormat::Encrypted => {
            let container: EncryptedContainer = serde_json::from_str(content)
                .map_err(|e| KeyforgeError::InvalidFormat(format!("encrypted export: {e}")))?;
            let sealed = sealed_from_fields(&container.nonce, &container.tag, &container.data)?;
            codec::decrypt(&sealed, key)
        }
        ExportFormat::Backup => {
            let container: BackupContainer = serde_json::from_str(content)
                .map_err(|e| KeyforgeError::InvalidFormat(format!("backup export: {e}")))?;
            let sealed = sealed_from_fields(&container.nonce, &container.tag, &container.data)?;
            let json = codec::decrypt_bytes(&sealed, key)?;
            let payload: BackupPayload =
                serde_json::from_slice(&json).map_err(|_| KeyforgeError::VaultCorrupt)?;
            Ok(payload.vault)
        }
    }
}

/// Read and import an export file.
///
/// # Errors
/// See [`import_from_str`], plus filesystem errors.
pub fn import_vault(input: &Path, key: &VaultKey) -> Result<Vault> {
    let content = fs::read_to_string(input)?;
    import_from_str(&content, key)
}

fn sealed_from_fields(nonce: &str, tag: &str, data: &str) -> Result<SealedVault> {
    let nonce_bytes = STANDARD
        .decode(nonce)
        .map_err(|_| KeyforgeError::VaultCorrupt)?;
    let tag_bytes = STANDARD
        .decode(tag)
        .map_err(|_| KeyforgeError::VaultCorrupt)?;
    let ciphertext = STANDARD
        .decode(data)
        .map_err(|_| KeyforgeError::VaultCorrupt)?;
    if nonce_bytes.len() != NONCE_LEN || tag_bytes.len() != TAG_LEN {
        return Err(KeyforgeError::VaultCorrupt);
    }
    let mut sealed = SealedVault {
        nonce: [0u8; NONCE_LEN],
        tag: [0u8; TAG_LEN],
        ciphertext,
    };
    sealed.nonce.copy_from_slice(&nonce_bytes);
    sealed.tag.copy_from_slice(&tag_bytes);
    Ok(sealed)
}
