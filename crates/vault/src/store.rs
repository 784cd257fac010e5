//! The vault store: in-memory record set plus its encrypted file.
//!
//! One store owns one vault file. Construction derives the vault key from
//! the session's master seed and best-effort loads whatever is on disk; a
//! missing or undecryptable file just means starting from an empty vault.
//! Every mutation is prepared on a copy, persisted atomically
//! (tmp + fsync + rename), and only then committed to memory, so neither
//! the file nor the in-memory vault can be half-updated.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use keyforge_crypto::{KeyforgeError, MasterSeed, Result};

use crate::blobstore::{BackupKind, BlobStore};
use crate::codec::{self, VaultKey};
use crate::models::{
    GpgEntry, NewNote, NewPassword, Note, NotePatch, PasswordEntry, PasswordHistoryEntry,
    PasswordPatch, PasswordQuery, SshEntry, TotpEntry, Vault, WalletEntry,
};

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "KEYFORGE_CONFIG_DIR";

/// Vault file name inside the configuration directory.
pub const VAULT_FILE_NAME: &str = "vault.enc";

/// Resolve the Keyforge configuration directory: `$KEYFORGE_CONFIG_DIR`
/// if set, else `$HOME/.keyforge`. The directory is not created here.
///
/// # Errors
/// `NotFound` when neither the override nor a home directory exists.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".keyforge"))
        .ok_or_else(|| KeyforgeError::NotFound("home directory".into()))
}

/// Default vault path: `<config_dir>/vault.enc`.
///
/// # Errors
/// Propagates from [`config_dir`].
pub fn default_vault_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(VAULT_FILE_NAME))
}

pub struct VaultStore {
    vault: Vault,
    path: PathBuf,
    key: VaultKey,
}

impl VaultStore {
    /// Open the store at `path` (or the default location), loading any
    /// existing vault. Load failures are swallowed: a fresh install and a
    /// corrupt file both yield an empty vault here, and the old file is
    /// left untouched until the first save.
    ///
    /// # Errors
    /// Only from key derivation or default-path resolution; never from
    /// the state of the vault file itself.
    pub fn open(seed: &MasterSeed, path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => default_vault_path()?,
        };
        let key = VaultKey::derive(seed)?;
        let mut store = Self {
            vault: Vault::new(),
            path,
            key,
        };
        store.load();
        Ok(store)
    }

    /// [`Self::open`] at the default location.
    ///
    /// # Errors
    /// See [`Self::open`].
    pub fn open_default(seed: &MasterSeed) -> Result<Self> {
        Self::open(seed, None)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn vault(&self) -> &Vault {
        &self.vault
    }

    // ── passwords ──────────────────────────────────────────────────────

    /// Add a password record.
    ///
    /// # Errors
    /// `AlreadyExists` for a duplicate site; persistence errors from save.
    pub fn add_password(&mut self, new: NewPassword) -> Result<()> {
        self.commit(move |vault| {
            if vault.passwords.contains_key(&new.site) {
                return Err(KeyforgeError::AlreadyExists(format!(
                    "password for '{}'",
                    new.site
                )));
            }
            let now = OffsetDateTime::now_utc();
            let entry = PasswordEntry {
                id: Uuid::new_v4(),
                site: new.site.clone(),
                username: new.username,
                password: new.password,
                notes: new.notes,
                tags: new.tags,
                created: now,
                modified: now,
                history: Vec::new(),
            };
            vault.passwords.insert(new.site, entry);
            Ok(())
        })
    }

    #[must_use]
    pub fn get_password(&self, site: &str) -> Option<&PasswordEntry> {
        self.vault.passwords.get(site)
    }

    /// All password records, in site order.
    #[must_use]
    pub fn list_passwords(&self) -> Vec<&PasswordEntry> {
        self.vault.passwords.values().collect()
    }

    /// Apply a patch to an existing record. The previous password is
    /// prepended to `history` only when the password field actually
    /// changes.
    ///
    /// # Errors
    /// `NotFound` for an unknown site; persistence errors from save.
    pub fn update_password(&mut self, site: &str, patch: PasswordPatch) -> Result<()> {
        let site = site.to_owned();
        self.commit(move |vault| {
            let entry = vault
                .passwords
                .get_mut(&site)
                .ok_or_else(|| KeyforgeError::NotFound(format!("password for '{site}'")))?;
            let now = OffsetDateTime::now_utc();

            if let Some(password) = patch.password {
                if password != entry.password {
                    let previous = std::mem::replace(&mut entry.password, password);
                    entry.history.insert(
                        0,
                        PasswordHistoryEntry {
                            password: previous,
                            changed: now,
                        },
                    );
                }
            }
            if let Some(username) = patch.username {
                entry.username = username;
            }
            if let Some(notes) = patch.notes {
                entry.notes = Some(notes);
            }
            if let Some(tags) = patch.tags {
                entry.tags = tags;
            }
            entry.modified = now;
            Ok(())
        })
    }

    /// Remove a password record.
    ///
    /// # Errors
    /// `NotFound` for an unknown site; persistence errors from save.
    pub fn delete_password(&mut self, site: &str) -> Result<()> {
        let site = site.to_owned();
        self.commit(move |vault| {
            vault
                .passwords
                .remove(&site)
                .map(|_| ())
                .ok_or_else(|| KeyforgeError::NotFound(format!("password for '{site}'")))
        })
    }

    /// Records matching every populated query field, in site order.
    #[must_use]
    pub fn search_passwords(&self, query: &PasswordQuery) -> Vec<&PasswordEntry> {
        self.vault
            .passwords
            .values()
            .filter(|entry| entry.matches(query))
            .collect()
    }

    // ── notes ──────────────────────────────────────────────────────────

    /// Add a note, returning its generated id.
    ///
    /// # Errors
    /// Persistence errors from save.
    pub fn add_note(&mut self, new: NewNote) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.commit(move |vault| {
            let now = OffsetDateTime::now_utc();
            vault.notes.push(Note {
                id,
                title: new.title,
                content: new.content,
                attachments: new.attachments,
                created: now,
                modified: now,
            });
            Ok(())
        })?;
        Ok(id)
    }

    #[must_use]
    pub fn get_note(&self, id: Uuid) -> Option<&Note> {
        self.vault.notes.iter().find(|note| note.id == id)
    }

    #[must_use]
    pub fn list_notes(&self) -> &[Note] {
        &self.vault.notes
    }

    /// Apply a patch to a note.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; persistence errors from save.
    pub fn update_note(&mut self, id: Uuid, patch: NotePatch) -> Result<()> {
        self.commit(move |vault| {
            let note = vault
                .notes
                .iter_mut()
                .find(|note| note.id == id)
                .ok_or_else(|| KeyforgeError::NotFound(format!("note {id}")))?;
            if let Some(title) = patch.title {
                note.title = title;
            }
            if let Some(content) = patch.content {
                note.content = content;
            }
            note.modified = OffsetDateTime::now_utc();
            Ok(())
        })
    }

    /// Remove a note.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; persistence errors from save.
    pub fn delete_note(&mut self, id: Uuid) -> Result<()> {
        self.commit(move |vault| {
            let before = vault.notes.len();
            vault.notes.retain(|note| note.id != id);
            if vault.notes.len() == before {
                return Err(KeyforgeError::NotFound(format!("note {id}")));
            }
            Ok(())
        })
    }

    // ── issued-service config ──────────────────────────────────────────

    /// Record an issued SSH key (public parts only).
    ///
    /// # Errors
    /// Persistence errors from save.
    pub fn add_ssh_entry(&mut self, entry: SshEntry) -> Result<()> {
        self.commit(move |vault| {
            vault.config.services.ssh.push(entry);
            Ok(())
        })
    }

    /// Record an issued GPG key.
    ///
    /// # Errors
    /// Persistence errors from save.
    pub fn add_gpg_entry(&mut self, entry: GpgEntry) -> Result<()> {
        self.commit(move |vault| {
            vault.config.services.gpg.push(entry);
            Ok(())
        })
    }

    /// Record an issued wallet.
    ///
    /// # Errors
    /// Persistence errors from save.
    pub fn add_wallet_entry(&mut self, entry: WalletEntry) -> Result<()> {
        self.commit(move |vault| {
            vault.config.services.wallets.push(entry);
            Ok(())
        })
    }

    /// Record a TOTP registration.
    ///
    /// # Errors
    /// Persistence errors from save.
    pub fn add_totp_entry(&mut self, entry: TotpEntry) -> Result<()> {
        self.commit(move |vault| {
            vault.config.services.totp.push(entry);
            Ok(())
        })
    }

    #[must_use]
    pub fn ssh_entries(&self) -> &[SshEntry] {
        &self.vault.config.services.ssh
    }

    #[must_use]
    pub fn gpg_entries(&self) -> &[GpgEntry] {
        &self.vault.config.services.gpg
    }

    #[must_use]
    pub fn wallet_entries(&self) -> &[WalletEntry] {
        &self.vault.config.services.wallets
    }

    #[must_use]
    pub fn totp_entries(&self) -> &[TotpEntry] {
        &self.vault.config.services.totp
    }

    // ── persistence ────────────────────────────────────────────────────

    /// Persist the current vault: recompute the checksum, seal, and write
    /// atomically (`vault.enc.tmp`, fsync, rename). A crashed or
    /// cancelled save leaves the previous file intact; a stale tmp file
    /// is simply overwritten by the next save.
    ///
    /// # Errors
    /// `Io` from the filesystem; `AeadFailure` from sealing.
    pub fn save(&mut self) -> Result<()> {
        let mut vault = std::mem::take(&mut self.vault);
        let result = self.persist(&mut vault);
        self.vault = vault;
        result
    }

    fn persist(&self, vault: &mut Vault) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        vault.metadata.checksum = String::new();
        vault.metadata.checksum = vault.calculate_checksum();

        let bytes = codec::seal_to_bytes(vault, &self.key)?;
        let tmp = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "vault saved");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| VAULT_FILE_NAME.into(), |n| n.to_os_string());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Reload from disk. Any failure (missing file, bad framing, wrong
    /// key, parse error) resets to an empty vault; the error is logged,
    /// never surfaced.
    pub fn load(&mut self) {
        self.vault = Vault::new();
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no vault file; starting empty");
                return;
            }
        };
        match codec::open_from_bytes(&bytes, &self.key) {
            Ok(vault) => {
                debug!(path = %self.path.display(), "vault loaded");
                self.vault = vault;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "vault undecryptable; starting empty");
            }
        }
    }

    /// Prepare a mutation on a copy, persist it, then commit to memory.
    /// On any error the in-memory vault and the file both keep their
    /// previous state.
    fn commit<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Vault) -> Result<()>,
    {
        let mut next = self.vault.clone();
        mutate(&mut next)?;
        next.updated = OffsetDateTime::now_utc();
        self.persist(&mut next)?;
        self.vault = next;
        Ok(())
    }

    /// Replace the whole record set (import/restore) and persist.
    ///
    /// # Errors
    /// Persistence errors from save.
    pub fn replace_vault(&mut self, vault: Vault) -> Result<()> {
        self.commit(move |current| {
            *current = vault;
            Ok(())
        })
    }

    /// Reset to an empty vault and persist the empty state.
    ///
    /// # Errors
    /// Persistence errors from save.
    pub fn clear(&mut self) -> Result<()> {
        self.replace_vault(Vault::new())
    }

    /// Pure checksum over the current contents; see
    /// [`Vault::calculate_checksum`].
    #[must_use]
    pub fn calculate_checksum(&self) -> String {
        self.vault.calculate_checksum()
    }

    /// Whether the stored checksum matches the current contents.
    #[must_use]
    pub fn validate_integrity(&self) -> bool {
        self.vault.validate_integrity()
    }

    /// Touch the vault, persist locally, then push the exact envelope to
    /// the remote store if one is given. Local persistence always happens
    /// first; a remote failure surfaces after the local save succeeded.
    /// On success the returned handle is recorded under
    /// `metadata.backups`.
    ///
    /// # Errors
    /// Local save errors, then remote `put` errors.
    pub fn sync(&mut self, remote: Option<&dyn BlobStore>) -> Result<Option<String>> {
        self.commit(|_| Ok(()))?;

        let Some(store) = remote else {
            return Ok(None);
        };

        let envelope = fs::read(&self.path)?;
        let handle = store.put(&envelope).inspect_err(
            |e| warn!(error = %e, "remote backup failed; local vault is saved"),
        )?;

        let kind = store.kind();
        let recorded = handle.clone();
        self.commit(move |vault| {
            match kind {
                BackupKind::Arweave => vault.metadata.backups.arweave = Some(recorded),
                BackupKind::Ipfs => vault.metadata.backups.ipfs = Some(recorded),
                BackupKind::Local => vault.metadata.backups.local = Some(recorded),
                BackupKind::Nostr => vault
                    .metadata
                    .backups
                    .nostr
                    .get_or_insert_with(Vec::new)
                    .push(recorded),
            }
            Ok(())
        })?;
        Ok(Some(handle))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tempfile::tempdir;

    fn test_seed() -> MasterSeed {
        MasterSeed::from_bytes([0x11; 64])
    }

    fn store_at(dir: &Path) -> VaultStore {
        VaultStore::open(&test_seed(), Some(dir.join(VAULT_FILE_NAME))).unwrap()
    }

    fn sample_password(site: &str) -> NewPassword {
        NewPassword {
            site: site.into(),
            username: "alice".into(),
            password: "s1".into(),
            notes: None,
            tags: vec!["work".into()],
        }
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        assert!(store.vault().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_password_crud_and_persistence() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());

        store.add_password(sample_password("example.com")).unwrap();
        store.add_password(sample_password("other.com")).unwrap();
        assert!(store.path().exists());

        let entry = store.get_password("example.com").unwrap();
        assert_eq!(entry.username, "alice");
        assert_eq!(store.list_passwords().len(), 2);
        // BTreeMap ordering by site.
        assert_eq!(store.list_passwords()[0].site, "example.com");

        store.delete_password("other.com").unwrap();
        assert!(store.get_password("other.com").is_none());

        // Reopen from disk with the same seed.
        let reopened = store_at(dir.path());
        assert_eq!(reopened.list_passwords().len(), 1);
        assert_eq!(reopened.vault(), store.vault());
    }

    #[test]
    fn test_duplicate_site_is_already_exists() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());
        store.add_password(sample_password("example.com")).unwrap();
        let err = store.add_password(sample_password("example.com")).unwrap_err();
        assert!(matches!(err, KeyforgeError::AlreadyExists(_)));
        // The failed add must not have touched anything.
        assert_eq!(store.list_passwords().len(), 1);
    }

    #[test]
    fn test_update_preserves_history_only_on_password_change() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());
        store.add_password(sample_password("example.com")).unwrap();

        // Username-only update: no history entry.
        store
            .update_password(
                "example.com",
                PasswordPatch {
                    username: Some("bob".into()),
                    ..PasswordPatch::default()
                },
            )
            .unwrap();
        assert!(store.get_password("example.com").unwrap().history.is_empty());

        // Same-password update: still no history entry.
        store
            .update_password(
                "example.com",
                PasswordPatch {
                    password: Some("s1".into()),
                    ..PasswordPatch::default()
                },
            )
            .unwrap();
        assert!(store.get_password("example.com").unwrap().history.is_empty());

        // Real change: previous password prepended.
        store
            .update_password(
                "example.com",
                PasswordPatch {
                    password: Some("s2".into()),
                    ..PasswordPatch::default()
                },
            )
            .unwrap();
        let entry = store.get_password("example.com").unwrap();
        assert_eq!(entry.password, "s2");
        assert_eq!(entry.history.len(), 1);
        assert_eq!(entry.history[0].password, "s1");

        store
            .update_password(
                "example.com",
                PasswordPatch {
                    password: Some("s3".into()),
                    ..PasswordPatch::default()
                },
            )
            .unwrap();
        let entry = store.get_password("example.com").unwrap();
        // Most recent previous password first.
        assert_eq!(entry.history[0].password, "s2");
        assert_eq!(entry.history[1].password, "s1");
    }

    #[test]
    fn test_update_and_delete_missing_are_not_found() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());
        assert!(matches!(
            store.update_password("nope", PasswordPatch::default()),
            Err(KeyforgeError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_password("nope"),
            Err(KeyforgeError::NotFound(_))
        ));
        assert!(matches!(
            store.update_note(Uuid::new_v4(), NotePatch::default()),
            Err(KeyforgeError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_note(Uuid::new_v4()),
            Err(KeyforgeError::NotFound(_))
        ));
    }

    #[test]
    fn test_search_passwords() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());
        store.add_password(sample_password("example.com")).unwrap();
        store
            .add_password(NewPassword {
                site: "bank.example.org".into(),
                username: "bob".into(),
                password: "p".into(),
                notes: None,
                tags: vec!["finance".into()],
            })
            .unwrap();

        let by_site = store.search_passwords(&PasswordQuery {
            site: Some("bank".into()),
            ..PasswordQuery::default()
        });
        assert_eq!(by_site.len(), 1);
        assert_eq!(by_site[0].site, "bank.example.org");

        let by_tag = store.search_passwords(&PasswordQuery {
            tags: Some(vec!["work".into()]),
            ..PasswordQuery::default()
        });
        assert_eq!(by_tag.len(), 1);

        let by_user = store.search_passwords(&PasswordQuery {
            username: Some("ALICE".into()),
            ..PasswordQuery::default()
        });
        assert_eq!(by_user.len(), 1);

        assert_eq!(store.search_passwords(&PasswordQuery::default()).len(), 2);
    }

    #[test]
    fn test_notes_crud() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());
        let id = store
            .add_note(NewNote {
                title: "recovery".into(),
                content: "top secret".into(),
                attachments: vec![],
            })
            .unwrap();

        assert_eq!(store.list_notes().len(), 1);
        assert_eq!(store.get_note(id).unwrap().title, "recovery");

        store
            .update_note(
                id,
                NotePatch {
                    content: Some("rotated".into()),
                    ..NotePatch::default()
                },
            )
            .unwrap();
        let note = store.get_note(id).unwrap();
        assert_eq!(note.content, "rotated");
        assert!(note.modified >= note.created);

        store.delete_note(id).unwrap();
        assert!(store.list_notes().is_empty());
    }

    #[test]
    fn test_checksum_holds_after_every_mutation() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());

        store.add_password(sample_password("a.com")).unwrap();
        assert!(store.validate_integrity());

        store
            .update_password(
                "a.com",
                PasswordPatch {
                    password: Some("s2".into()),
                    ..PasswordPatch::default()
                },
            )
            .unwrap();
        assert!(store.validate_integrity());
        assert_eq!(store.vault().metadata.checksum, store.calculate_checksum());

        store.delete_password("a.com").unwrap();
        assert!(store.validate_integrity());
    }

    #[test]
    fn test_updated_timestamp_moves_forward() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());
        let created = store.vault().created;
        store.add_password(sample_password("a.com")).unwrap();
        let vault = store.vault();
        assert!(vault.updated >= created);
        assert!(vault.updated >= vault.passwords["a.com"].modified);
    }

    #[test]
    fn test_wrong_seed_load_resets_to_empty_without_clobbering() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());
        store.add_password(sample_password("example.com")).unwrap();

        // Different passphrase: vault is undecryptable, starts empty.
        let other_seed = MasterSeed::from_bytes([0x22; 64]);
        let other = VaultStore::open(&other_seed, Some(dir.path().join(VAULT_FILE_NAME))).unwrap();
        assert!(other.vault().is_empty());

        // But the file on disk is untouched until a save happens.
        let original = store_at(dir.path());
        assert_eq!(original.list_passwords().len(), 1);
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(VAULT_FILE_NAME);
        fs::write(&path, b"definitely not an envelope").unwrap();
        let store = VaultStore::open(&test_seed(), Some(path)).unwrap();
        assert!(store.vault().is_empty());
    }

    #[test]
    fn test_clear_persists_empty_vault() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());
        store.add_password(sample_password("example.com")).unwrap();
        store.clear().unwrap();
        assert!(store.vault().is_empty());

        let reopened = store_at(dir.path());
        assert!(reopened.vault().is_empty());
    }

    #[test]
    fn test_save_leaves_no_tmp_file() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());
        store.add_password(sample_password("example.com")).unwrap();
        assert!(store.path().exists());
        let tmp = dir.path().join(format!("{VAULT_FILE_NAME}.tmp"));
        assert!(!tmp.exists());
    }

    #[test]
    fn test_service_entries_append_and_list() {
        let dir = tempdir().unwrap();
        let mut store = store_at(dir.path());
        let now = OffsetDateTime::now_utc();

        store
            .add_ssh_entry(SshEntry {
                hostname: Some("github.com".into()),
                public_key: "ssh-ed25519 AAAA keyforge@github.com".into(),
                fingerprint: "SHA256:abc".into(),
                created: now,
            })
            .unwrap();
        store
            .add_totp_entry(TotpEntry {
                service: "github.com".into(),
                secret: "c2VjcmV0".into(),
                algorithm: "SHA1".into(),
                digits: 6,
                period: 30,
                created: now,
            })
            .unwrap();

        assert_eq!(store.ssh_entries().len(), 1);
        assert_eq!(store.totp_entries().len(), 1);
        assert!(store.gpg_entries().is_empty());
        assert!(store.wallet_entries().is_empty());

        let reopened = store_at(dir.path());
        assert_eq!(reopened.ssh_entries()[0].hostname.as_deref(), Some("github.com"));
    }
}
