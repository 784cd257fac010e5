//! Directory-backed blob store.
//!
//! Each `put` writes one timestamped file and prunes old blobs past the
//! retention limit. Handles are the blob file names; `latest` picks the
//! newest by the sortable timestamp embedded in the name.

use std::fs;
use std::path::PathBuf;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use keyforge_crypto::{KeyforgeError, Result};
use keyforge_vault::{BackupKind, Balance, BlobStore, Quote};

use crate::config::BackupConfig;

const BLOB_PREFIX: &str = "keyforge_vault_";
const BLOB_EXT: &str = "enc";

pub struct LocalBlobStore {
    config: BackupConfig,
}

impl LocalBlobStore {
    #[must_use]
    pub const fn new(config: BackupConfig) -> Self {
        Self { config }
    }

    /// Store under the default configuration
    /// (`<config_dir>/backups`, retention 7).
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(BackupConfig::default())
    }

    fn blob_name() -> String {
        let now = OffsetDateTime::now_utc();
        let date = now
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string())
            .replace(':', "-")
            .replace('T', "_");
        format!(
            "{BLOB_PREFIX}{date}_{}.{BLOB_EXT}",
            now.unix_timestamp_nanos()
        )
    }

    /// Nanosecond timestamp embedded in a blob name, for ordering.
    fn blob_timestamp(name: &str) -> Option<i128> {
        name.strip_suffix(&format!(".{BLOB_EXT}"))?
            .rsplit('_')
            .next()?
            .parse()
            .ok()
    }

    /// Blob file names, oldest first by embedded timestamp.
    fn list_blobs(&self) -> Result<Vec<String>> {
        if !self.config.backup_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config.backup_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(BLOB_PREFIX) && name.ends_with(&format!(".{BLOB_EXT}")) {
                names.push(name);
            }
        }
        names.sort_by_key(|name| Self::blob_timestamp(name).unwrap_or_default());
        Ok(names)
    }

    fn blob_path(&self, handle: &str) -> PathBuf {
        self.config.backup_dir.join(handle)
    }

    fn prune(&self) -> Result<()> {
        let names = self.list_blobs()?;
        if names.len() <= self.config.max_backups {
            return Ok(());
        }
        let excess = names.len() - self.config.max_backups;
        for name in &names[..excess] {
            fs::remove_file(self.blob_path(name))?;
            debug!(blob = %name, "pruned old backup");
        }
        Ok(())
    }
}

impl BlobStore for LocalBlobStore {
    fn kind(&self) -> BackupKind {
        BackupKind::Local
    }

    fn put(&self, bytes: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.config.backup_dir)?;
        let handle = Self::blob_name();
        let path = self.blob_path(&handle);
        fs::write(&path, bytes)?;

        if self.config.verify_after_write {
            let written = fs::read(&path)?;
            if written != bytes {
                return Err(KeyforgeError::Io(std::io::Error::other(format!(
                    "backup verification failed for {}",
                    path.display()
                ))));
            }
        }

        self.prune()?;
        debug!(blob = %handle, bytes = bytes.len(), "backup stored");
        Ok(handle)
    }

    fn get(&self, handle: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(handle);
        if !path.exists() {
            return Err(KeyforgeError::NotFound(format!("backup blob '{handle}'")));
        }
        Ok(fs::read(path)?)
    }

    fn latest(&self) -> Result<Option<String>> {
        Ok(self.list_blobs()?.pop())
    }

    fn quote(&self, bytes: &[u8]) -> Result<Quote> {
        // Local disk is free; the quote still reports the size so callers
        // can show it.
        Ok(Quote {
            size: bytes.len() as u64,
            price_minor_units: 0,
            currency: "sat".to_string(),
            fx_rate: 1.0,
        })
    }

    fn balance(&self) -> Result<Balance> {
        Ok(Balance {
            confirmed: 0,
            unconfirmed: 0,
            total: 0,
        })
    }
}
