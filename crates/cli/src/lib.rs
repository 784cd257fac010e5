//! Keyforge command surface.
//!
//! Thin orchestration only: every command prompts for the passphrase,
//! derives the session seed, and calls into the core crates. Nothing
//! here touches key material beyond moving outputs to stdout.

mod keys;
mod pass;
mod passgen;
mod session;
mod transfer;
mod vaultcmd;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use time::OffsetDateTime;

use keyforge_backup::{BackupConfig, LocalBlobStore};
use keyforge_keygen::totp::{self, TotpAlgorithm, TotpParams};
use keyforge_keygen::{gpg, ssh, wallet, GpgOptions};
use keyforge_vault::{BlobStore, TotpEntry, VaultStore};

pub use keys::GenerateCommand;
pub use pass::PassCommand;
pub use session::Session;
pub use vaultcmd::VaultCommand;

#[derive(Parser, Debug)]
#[command(
    name = "keyforge",
    about = "Deterministic key factory with an encrypted local vault",
    long_about = "Keyforge derives all of your key material from a single passphrase: \
                  SSH keys, GPG signing keys, HD wallets, TOTP secrets, and the key that \
                  encrypts the local vault. Nothing secret is stored that cannot be \
                  re-derived from the passphrase plus a public label and version.\n\n\
                  Quick start:\n\
                  1. keyforge init                     # create the vault\n\
                  2. keyforge generate ssh --hostname github.com\n\
                  3. keyforge pass add example.com -u alice --generate\n\
                  4. keyforge vault status"
)]
pub struct Cli {
    /// User label mixed into the derivation salt
    #[arg(long, global = true, default_value = "default")]
    pub label: String,

    /// Derivation version (bump to rotate every derived key)
    #[arg(long, global = true, default_value_t = 1)]
    pub version: u32,

    /// Vault file path (defaults to $KEYFORGE_CONFIG_DIR or ~/.keyforge)
    #[arg(long, global = true)]
    pub vault_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the vault for a passphrase
    Init,

    /// Derive keys (ssh, gpg, wallet)
    #[command(subcommand)]
    Generate(GenerateCommand),

    /// Vault status and maintenance
    #[command(subcommand)]
    Vault(VaultCommand),

    /// Password records
    #[command(subcommand)]
    Pass(PassCommand),

    /// Print the current TOTP code for a service
    Totp {
        service: String,
        /// Record the service in the vault so its parameters stick
        #[arg(long)]
        register: bool,
        /// Print the code without the display space
        #[arg(long)]
        raw: bool,
    },

    /// Export the vault to a container file
    Export {
        #[arg(short, long)]
        output: PathBuf,
        /// json, encrypted, or backup
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Import a container file, replacing the record set
    Import {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Re-derive everything from the passphrase and restore the vault
    Recover,

    /// Show or edit configuration
    Config {
        /// Open the config file in $VISUAL / $EDITOR
        #[arg(long)]
        edit: bool,
    },
}

/// Dispatch a parsed command line.
///
/// # Errors
/// Any error from the core crates; the binary maps these to exit code 1.
pub fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => {
            let session = Session::unlock_new(&cli.label, cli.version)?;
            let mut store = session.store(cli.vault_path)?;
            if store.vault().is_empty() && !store.path().exists() {
                store.save()?;
                println!("Initialized vault at {}", store.path().display());
            } else {
                println!("Vault already exists at {}", store.path().display());
            }
        }

        Commands::Generate(cmd) => {
            let session = Session::unlock(&cli.label, cli.version)?;
            let mut store = session.store(cli.vault_path)?;
            keys::handle_generate(cmd, &session, &mut store)?;
        }

        Commands::Vault(cmd) => {
            let session = Session::unlock(&cli.label, cli.version)?;
            let mut store = session.store(cli.vault_path)?;
            vaultcmd::handle_vault(cmd, &session, &mut store)?;
        }

        // Password generation needs no passphrase.
        Commands::Pass(PassCommand::Generate {
            length,
            simple,
            complex,
            memorable,
            count,
        }) => pass::print_generated(length, simple, complex, memorable, count)?,

        Commands::Pass(cmd) => {
            let session = Session::unlock(&cli.label, cli.version)?;
            let mut store = session.store(cli.vault_path)?;
            pass::handle_pass(cmd, &mut store)?;
        }

        Commands::Totp {
            service,
            register,
            raw,
        } => {
            let session = Session::unlock(&cli.label, cli.version)?;
            let mut store = session.store(cli.vault_path)?;
            handle_totp(&session, &mut store, &service, register, raw)?;
        }

        Commands::Export { output, format } => {
            let session = Session::unlock(&cli.label, cli.version)?;
            let store = session.store(cli.vault_path)?;
            transfer::handle_export(&session, &store, &output, &format)?;
        }

        Commands::Import { input } => {
            let session = Session::unlock(&cli.label, cli.version)?;
            let mut store = session.store(cli.vault_path)?;
            transfer::handle_import(&session, &mut store, &input)?;
        }

        Commands::Recover => {
            let session = Session::unlock(&cli.label, cli.version)?;
            let mut store = session.store(cli.vault_path)?;
            handle_recover(&session, &mut store)?;
        }

        Commands::Config { edit } => handle_config(edit)?,
    }
    Ok(())
}

fn handle_totp(
    session: &Session,
    store: &mut VaultStore,
    service: &str,
    register: bool,
    raw: bool,
) -> Result<()> {
    let secret = totp::derive_secret(&session.seed, service)?;

    let params = store
        .totp_entries()
        .iter()
        .find(|entry| entry.service == service)
        .map_or_else(TotpParams::default, |entry| TotpParams {
            algorithm: match entry.algorithm.as_str() {
                "SHA256" => TotpAlgorithm::Sha256,
                "SHA512" => TotpAlgorithm::Sha512,
                _ => TotpAlgorithm::Sha1,
            },
            digits: entry.digits,
            period: entry.period,
        });

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before the unix epoch")?
        .as_secs();
    let code = totp::code(&secret, now, &params)?;
    if raw {
        println!("{code}");
    } else {
        println!("{}", totp::format_code(&code));
    }

    let already_registered = store
        .totp_entries()
        .iter()
        .any(|entry| entry.service == service);
    if register && !already_registered {
        store.add_totp_entry(TotpEntry {
            service: service.to_string(),
            secret: STANDARD.encode(secret.as_slice()),
            algorithm: "SHA1".to_string(),
            digits: params.digits,
            period: params.period,
            created: OffsetDateTime::now_utc(),
        })?;
        println!("Registered {service} in the vault");
    }
    Ok(())
}

/// Recovery from passphrase alone: restore the vault from the newest
/// local backup when the file is gone, then show the identities the seed
/// reproduces so the user can confirm they typed the right passphrase.
fn handle_recover(session: &Session, store: &mut VaultStore) -> Result<()> {
    if store.vault().is_empty() {
        let blobs = LocalBlobStore::with_defaults();
        if let Some(handle) = blobs.latest()? {
            let envelope = blobs.get(&handle)?;
            let key = keyforge_vault::VaultKey::derive(&session.seed)?;
            match keyforge_vault::codec::open_from_bytes(&envelope, &key) {
                Ok(vault) => {
                    store.replace_vault(vault)?;
                    println!("Restored vault from backup {handle}");
                }
                Err(_) => println!("Backup {handle} does not open with this passphrase"),
            }
        }
    }

    let ssh_key = ssh::generate(&session.seed, None)?;
    let gpg_key = gpg::generate(&session.seed, &GpgOptions::default())?;
    let main_wallet = wallet::generate(&session.seed, None)?;

    println!();
    println!("Derived identities for label '{}', v{}:", session.label, session.version);
    println!("  SSH:      {}", ssh_key.fingerprint);
    println!("  GPG:      {}", gpg_key.key_id);
    println!("  Bitcoin:  {}", main_wallet.bitcoin.address);
    println!("  Ethereum: {}", main_wallet.ethereum.address);
    println!(
        "Vault: {} passwords, {} notes",
        store.vault().passwords.len(),
        store.vault().notes.len()
    );
    Ok(())
}

fn handle_config(edit: bool) -> Result<()> {
    let dir = keyforge_vault::config_dir()?;
    let config_path = dir.join("config.json");

    if edit {
        if !config_path.exists() {
            std::fs::create_dir_all(&dir)?;
            let defaults = serde_json::to_string_pretty(&BackupConfig::default())?;
            std::fs::write(&config_path, defaults)?;
        }
        let editor = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .unwrap_or_else(|_| "vi".to_string());
        let status = std::process::Command::new(&editor)
            .arg(&config_path)
            .status()
            .with_context(|| format!("failed to launch editor '{editor}'"))?;
        if !status.success() {
            anyhow::bail!("editor exited with {status}");
        }
        return Ok(());
    }

    println!("Config dir: {}", dir.display());
    println!("Vault file: {}", keyforge_vault::default_vault_path()?.display());
    if config_path.exists() {
        println!("Config:     {}", config_path.display());
        let content = std::fs::read_to_string(&config_path)?;
        let config: BackupConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config at {}", config_path.display()))?;
        println!("Backups:    {} (keep {})", config.backup_dir.display(), config.max_backups);
    } else {
        println!("Config:     (defaults; run with --edit to create)");
    }
    Ok(())
}
