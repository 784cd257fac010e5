//! Session handling: passphrase prompt, master-seed derivation, store
//! opening.
//!
//! The CLI owns the session; the core crates never see the passphrase,
//! only the derived seed, and the seed scrubs itself when the session
//! drops at process exit.

use std::path::PathBuf;

use anyhow::{bail, Result};
use keyforge_crypto::{derive_master_seed, MasterSeed};
use keyforge_vault::VaultStore;

pub struct Session {
    pub seed: MasterSeed,
    pub label: String,
    pub version: u32,
}

impl Session {
    /// Prompt for the passphrase and derive the session seed.
    ///
    /// # Errors
    /// Terminal I/O errors from the prompt.
    pub fn unlock(label: &str, version: u32) -> Result<Self> {
        let passphrase = prompt_secret("Enter passphrase: ")?;
        Ok(Self::from_passphrase(&passphrase, label, version))
    }

    /// Prompt twice (create + confirm) for first-time setup.
    ///
    /// # Errors
    /// Mismatched confirmation, or terminal I/O errors.
    pub fn unlock_new(label: &str, version: u32) -> Result<Self> {
        let passphrase = prompt_secret("Create passphrase: ")?;
        let confirm = prompt_secret("Confirm passphrase: ")?;
        if passphrase != confirm {
            bail!("passphrases do not match");
        }
        Ok(Self::from_passphrase(&passphrase, label, version))
    }

    fn from_passphrase(passphrase: &str, label: &str, version: u32) -> Self {
        eprintln!("Deriving master seed…");
        let seed = derive_master_seed(passphrase, label, version);
        Self {
            seed,
            label: label.to_string(),
            version,
        }
    }

    /// Open the vault store for this session.
    ///
    /// # Errors
    /// Path resolution or key-derivation failures.
    pub fn store(&self, path: Option<PathBuf>) -> Result<VaultStore> {
        Ok(VaultStore::open(&self.seed, path)?)
    }
}

pub fn prompt_secret(prompt: &str) -> Result<String> {
    use std::io::{stdout, Write};
    print!("{prompt}");
    stdout().flush()?;
    let pass = rpassword::prompt_password("")?;
    Ok(pass)
}
