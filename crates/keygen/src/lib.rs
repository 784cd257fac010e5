//! Deterministic per-domain key generators.
//!
//! Every generator is a pure function of the master seed plus public
//! inputs (hostname, service name, identity), so the same passphrase
//! reproduces the same SSH keys, GPG keys, wallets, and TOTP secrets on
//! any machine.

pub mod gpg;
pub mod ssh;
pub mod totp;
pub mod wallet;

pub use gpg::{GpgKey, GpgOptions, GpgUser};
pub use ssh::SshKey;
pub use totp::{TotpAlgorithm, TotpParams};
pub use wallet::{BitcoinWallet, EthereumWallet, LightningInfo, PaymentWallet, Wallet};
