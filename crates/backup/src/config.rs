use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for the local backup directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory blob files are written to.
    pub backup_dir: PathBuf,

    /// Maximum number of blobs to retain; older ones are pruned on `put`.
    pub max_backups: usize,

    /// Read each blob back after writing and compare.
    pub verify_after_write: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: keyforge_vault::config_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("backups"),
            max_backups: 7,
            verify_after_write: true,
        }
    }
}
