//! `keyforge export` / `keyforge import`: vault transfer containers.

use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use keyforge_import_export::{export_vault, import_vault, ExportFormat};
use keyforge_vault::{VaultKey, VaultStore};

use crate::session::Session;

pub fn handle_export(
    session: &Session,
    store: &VaultStore,
    output: &Path,
    format: &str,
) -> Result<()> {
    let format = ExportFormat::from_str(format)?;
    let key = VaultKey::derive(&session.seed)?;
    export_vault(store.vault(), format, &key, output)?;
    println!(
        "Exported {} passwords, {} notes to {}",
        store.vault().passwords.len(),
        store.vault().notes.len(),
        output.display()
    );
    Ok(())
}

/// Replace-mode import: the imported record set becomes the vault.
pub fn handle_import(session: &Session, store: &mut VaultStore, input: &Path) -> Result<()> {
    let key = VaultKey::derive(&session.seed)?;
    let vault = import_vault(input, &key)?;
    let passwords = vault.passwords.len();
    let notes = vault.notes.len();
    store.replace_vault(vault)?;
    println!("Imported {passwords} passwords, {notes} notes from {}", input.display());
    Ok(())
}
