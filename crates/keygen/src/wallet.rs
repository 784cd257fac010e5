//! HD cryptocurrency wallets from domain-derived entropy.
//!
//! The main wallet path is BIP-39 → BIP-32: 32 bytes of domain entropy
//! become a 24-word mnemonic, the mnemonic seed (empty passphrase) becomes
//! the BIP-32 root, and Bitcoin/Ethereum keys come off the standard
//! `m/84'/0'/0'/0/0` and `m/44'/60'/0'/0/0` paths. The payment wallet
//! skips BIP-39 and feeds a domain key straight into BIP-32.
//!
//! Ethereum addresses use Keccak-256 as Ethereum specifies. Vaults written
//! by pre-1.0 Keyforge clients hashed with SHA-3-256 instead and will show
//! different addresses here.

use bech32::{u5, Variant};
use bip32::{DerivationPath, Prefix, XPrv};
use bip39::Mnemonic;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use keyforge_crypto::{
    derive_key, domains, primitives, service_to_index, KeyforgeError, MasterSeed, Result,
};

/// BIP-84 native-SegWit path for the first Bitcoin key.
const BITCOIN_PATH: &str = "m/84'/0'/0'/0/0";
/// BIP-44 path for the first Ethereum key.
const ETHEREUM_PATH: &str = "m/44'/60'/0'/0/0";
/// Human-readable part for mainnet Bitcoin addresses.
const BITCOIN_HRP: &str = "bc";

#[derive(Debug, Clone)]
pub struct BitcoinWallet {
    /// P2WPKH address, `bc1…`.
    pub address: String,
    pub xpub: String,
    pub xpriv: String,
}

#[derive(Debug, Clone)]
pub struct EthereumWallet {
    /// `0x` + 40 lowercase hex chars. No EIP-55 checksum casing.
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct Wallet {
    /// 24-word BIP-39 English mnemonic.
    pub mnemonic: String,
    pub bitcoin: BitcoinWallet,
    pub ethereum: EthereumWallet,
}

/// Opaque Lightning identifiers for the payment wallet. These are
/// deterministic identifiers only; they do not correspond to a running
/// Lightning node.
#[derive(Debug, Clone)]
pub struct LightningInfo {
    pub node_id: String,
    pub seed: String,
}

#[derive(Debug, Clone)]
pub struct PaymentWallet {
    pub bitcoin: BitcoinWallet,
    pub lightning: LightningInfo,
}

/// Generate the HD wallet for `service` (or the default index-0 wallet).
///
/// # Errors
/// `BadLength` from derivation; `InvalidFormat` if BIP-39/BIP-32
/// construction rejects the material (cannot happen for 32-byte entropy).
pub fn generate(seed: &MasterSeed, service: Option<&str>) -> Result<Wallet> {
    let index = service.map_or(0, service_to_index);
    let entropy = derive_key(seed, domains::WALLET_BIP39, index, 32)?;

    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| KeyforgeError::InvalidFormat(format!("bip39: {e}")))?;
    let bip39_seed = mnemonic.to_seed("");

    let bitcoin = bitcoin_from_seed(&bip39_seed)?;
    let ethereum = ethereum_from_seed(&bip39_seed)?;

    Ok(Wallet {
        mnemonic: mnemonic.to_string(),
        bitcoin,
        ethereum,
    })
}

/// Generate the payment wallet: a BIP-32 tree keyed directly from the
/// payment domain (no mnemonic), plus Lightning identifiers.
///
/// # Errors
/// `BadLength` from derivation; `InvalidFormat` from BIP-32.
pub fn generate_payment_wallet(seed: &MasterSeed) -> Result<PaymentWallet> {
    let master = derive_key(seed, domains::WALLET_PAYMENT, 0, 32)?;
    let bitcoin = bitcoin_from_seed(master.as_slice())?;

    let node_key = XPrv::derive_from_path(master.as_slice(), &parse_path(BITCOIN_PATH)?)
        .map_err(|e| KeyforgeError::InvalidFormat(format!("bip32: {e}")))?;
    let node_id = hex::encode(
        node_key
            .public_key()
            .public_key()
            .to_encoded_point(true)
            .as_bytes(),
    );

    let lightning_seed = derive_key(seed, domains::WALLET_PAYMENT, 1, 32)?;

    Ok(PaymentWallet {
        bitcoin,
        lightning: LightningInfo {
            node_id,
            seed: hex::encode(lightning_seed.as_slice()),
        },
    })
}

fn parse_path(path: &str) -> Result<DerivationPath> {
    path.parse()
        .map_err(|e| KeyforgeError::InvalidFormat(format!("derivation path: {e}")))
}

fn bitcoin_from_seed(seed: &[u8]) -> Result<BitcoinWallet> {
    let xprv = XPrv::derive_from_path(seed, &parse_path(BITCOIN_PATH)?)
        .map_err(|e| KeyforgeError::InvalidFormat(format!("bip32: {e}")))?;
    let xpub = xprv.public_key();

    let compressed = xpub.public_key().to_encoded_point(true);
    let hash160 = primitives::ripemd160(&primitives::sha256(compressed.as_bytes()));
    let address = segwit_v0_address(BITCOIN_HRP, &hash160)?;

    Ok(BitcoinWallet {
        address,
        xpub: xpub.to_string(Prefix::XPUB),
        xpriv: xprv.to_string(Prefix::XPRV).to_string(),
    })
}

fn ethereum_from_seed(seed: &[u8]) -> Result<EthereumWallet> {
    let xprv = XPrv::derive_from_path(seed, &parse_path(ETHEREUM_PATH)?)
        .map_err(|e| KeyforgeError::InvalidFormat(format!("bip32: {e}")))?;
    let uncompressed = xprv.public_key().public_key().to_encoded_point(false);
    Ok(EthereumWallet {
        address: eth_address(uncompressed.as_bytes()),
    })
}

/// Ethereum address from an uncompressed SEC1 public key (0x04-tagged,
/// 65 bytes): Keccak-256 over the 64 coordinate bytes, last 20 bytes.
fn eth_address(sec1_uncompressed: &[u8]) -> String {
    let digest = primitives::keccak256(&sec1_uncompressed[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Native-SegWit v0 address: witness version 0 plus the 5-bit regrouped
/// pubkey hash, bech32-encoded under `hrp`.
fn segwit_v0_address(hrp: &str, program: &[u8; 20]) -> Result<String> {
    let mut data = Vec::with_capacity(33);
    data.push(u5::try_from_u8(0).map_err(|e| KeyforgeError::InvalidFormat(format!("bech32: {e}")))?);
    let grouped = bech32::convert_bits(program, 8, 5, true)
        .map_err(|e| KeyforgeError::InvalidFormat(format!("bech32: {e}")))?;
    for value in grouped {
        data.push(
            u5::try_from_u8(value).map_err(|e| KeyforgeError::InvalidFormat(format!("bech32: {e}")))?,
        );
    }
    bech32::encode(hrp, data, Variant::Bech32)
        .map_err(|e| KeyforgeError::InvalidFormat(format!("bech32: {e}")))
}
