//! `keyforge generate ...`: derive keys and record their public parts.

use anyhow::Result;
use clap::Subcommand;
use keyforge_keygen::{gpg, ssh, wallet, GpgOptions};
use keyforge_vault::{GpgEntry, SshEntry, VaultStore, WalletEntry};
use time::OffsetDateTime;

use crate::session::Session;

#[derive(Subcommand, Debug)]
pub enum GenerateCommand {
    /// Derive the Ed25519 SSH keypair for a host
    Ssh {
        /// Host the key is for; omitted means the default key
        #[arg(long)]
        hostname: Option<String>,
        /// Print the private key file instead of the public parts
        #[arg(long)]
        private: bool,
    },
    /// Derive a GPG-framed signing key
    Gpg {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        comment: Option<String>,
        /// Scope the key to a service instead of the default identity key
        #[arg(long)]
        service: Option<String>,
        /// Print the private armor instead of the public parts
        #[arg(long)]
        private: bool,
    },
    /// Derive the HD wallet (Bitcoin P2WPKH + Ethereum)
    Wallet {
        /// Scope the wallet to a service
        #[arg(long)]
        service: Option<String>,
        /// Print the BIP-39 recovery mnemonic
        #[arg(long)]
        show_mnemonic: bool,
        /// Derive the payment wallet (Lightning identifiers) instead
        #[arg(long)]
        payment: bool,
    },
}

pub fn handle_generate(
    cmd: GenerateCommand,
    session: &Session,
    store: &mut VaultStore,
) -> Result<()> {
    let now = OffsetDateTime::now_utc();
    match cmd {
        GenerateCommand::Ssh { hostname, private } => {
            let key = ssh::generate(&session.seed, hostname.as_deref())?;
            if private {
                print!("{}", key.private_key);
            } else {
                println!("{}", key.public_key);
                println!("{}", key.fingerprint);
            }
            store.add_ssh_entry(SshEntry {
                hostname,
                public_key: key.public_key,
                fingerprint: key.fingerprint,
                created: now,
            })?;
        }
        GenerateCommand::Gpg {
            name,
            email,
            comment,
            service,
            private,
        } => {
            let key = gpg::generate(
                &session.seed,
                &GpgOptions {
                    name,
                    email,
                    comment,
                    service,
                },
            )?;
            if private {
                print!("{}", key.private_key);
            } else {
                println!("Key ID:      {}", key.key_id);
                println!("Fingerprint: {}", key.fingerprint);
                print!("{}", key.public_key);
            }
            store.add_gpg_entry(GpgEntry {
                name: key.user.name.clone(),
                email: key.user.email.clone(),
                key_id: key.key_id,
                fingerprint: key.fingerprint,
                created: now,
            })?;
        }
        GenerateCommand::Wallet {
            service,
            show_mnemonic,
            payment,
        } => {
            if payment {
                let pay = wallet::generate_payment_wallet(&session.seed)?;
                println!("Bitcoin:            {}", pay.bitcoin.address);
                println!("Lightning node id:  {}", pay.lightning.node_id);
                return Ok(());
            }
            let w = wallet::generate(&session.seed, service.as_deref())?;
            println!("Bitcoin:  {}", w.bitcoin.address);
            println!("Ethereum: {}", w.ethereum.address);
            println!("xpub:     {}", w.bitcoin.xpub);
            if show_mnemonic {
                println!("Mnemonic: {}", w.mnemonic);
            }
            store.add_wallet_entry(WalletEntry {
                service,
                bitcoin_address: w.bitcoin.address,
                ethereum_address: w.ethereum.address,
                xpub: w.bitcoin.xpub,
                created: now,
            })?;
        }
    }
    Ok(())
}
