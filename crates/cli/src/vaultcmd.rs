//! `keyforge vault ...`: status, sync, and backup/restore.

use anyhow::{bail, Result};
use clap::Subcommand;
use keyforge_backup::LocalBlobStore;
use keyforge_vault::{codec, BlobStore, VaultStore};

use crate::session::Session;

#[derive(Subcommand, Debug)]
pub enum VaultCommand {
    /// Show vault location, record counts, and integrity
    Status,
    /// Persist and push to the configured backup store
    Sync,
    /// List record names without values
    List,
    /// Force a backup to the local blob store
    Backup,
    /// Restore the vault from the most recent backup blob
    Restore,
}

pub fn handle_vault(cmd: VaultCommand, session: &Session, store: &mut VaultStore) -> Result<()> {
    match cmd {
        VaultCommand::Status => {
            let vault = store.vault();
            println!("Vault:      {}", store.path().display());
            println!("Version:    {}", vault.version);
            println!("Updated:    {}", vault.updated);
            println!("Passwords:  {}", vault.passwords.len());
            println!("Notes:      {}", vault.notes.len());
            println!(
                "Services:   {} ssh, {} gpg, {} wallets, {} totp",
                vault.config.services.ssh.len(),
                vault.config.services.gpg.len(),
                vault.config.services.wallets.len(),
                vault.config.services.totp.len()
            );
            println!(
                "Integrity:  {}",
                if vault.metadata.checksum.is_empty() {
                    "unsaved"
                } else if store.validate_integrity() {
                    "ok"
                } else {
                    "CHECKSUM MISMATCH"
                }
            );
            if let Some(local) = &vault.metadata.backups.local {
                println!("Backup:     {local}");
            }
        }
        VaultCommand::Sync | VaultCommand::Backup => {
            let blobs = LocalBlobStore::with_defaults();
            let handle = store.sync(Some(&blobs as &dyn BlobStore))?;
            match handle {
                Some(handle) => println!("Backed up as {handle}"),
                None => println!("Vault saved"),
            }
        }
        VaultCommand::List => {
            for entry in store.list_passwords() {
                println!("- {} [password]", entry.site);
            }
            for note in store.list_notes() {
                println!("- {} [note]", note.title);
            }
            for entry in store.totp_entries() {
                println!("- {} [totp]", entry.service);
            }
        }
        VaultCommand::Restore => {
            let blobs = LocalBlobStore::with_defaults();
            let Some(handle) = blobs.latest()? else {
                bail!("no backup blobs found");
            };
            let envelope = blobs.get(&handle)?;
            let key = codec::VaultKey::derive(&session.seed)?;
            let vault = codec::open_from_bytes(&envelope, &key)?;
            store.replace_vault(vault)?;
            println!(
                "Restored {} passwords, {} notes from {handle}",
                store.vault().passwords.len(),
                store.vault().notes.len()
            );
        }
    }
    Ok(())
}
