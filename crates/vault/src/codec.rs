//! The on-disk vault envelope: JSON → raw DEFLATE → ChaCha20-Poly1305.
//!
//! Layout, all lengths fixed:
//!
//! ```text
//! byte 0       nonce_len  (always 12)
//! bytes 1..13  nonce
//! byte 13      tag_len    (always 16)
//! bytes 14..30 tag
//! bytes 30..   ciphertext (deflated JSON)
//! ```
//!
//! There is no magic; a foreign or corrupted file is detected by
//! decryption failure. Compression is raw DEFLATE (no zlib wrapper) in
//! both directions. Every decode failure collapses to `VaultCorrupt` so
//! callers cannot distinguish tampering from truncation.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use keyforge_crypto::{
    derive_key, domains, primitives, KeyforgeError, MasterSeed, Result,
};

use crate::models::Vault;

pub use keyforge_crypto::primitives::{NONCE_LEN, TAG_LEN};

/// Minimum envelope size: framing plus an empty ciphertext.
const HEADER_LEN: usize = 1 + NONCE_LEN + 1 + TAG_LEN;

/// The 32-byte vault encryption key, scrubbed on drop.
pub struct VaultKey([u8; 32]);

impl VaultKey {
    /// Derive the vault key from the master seed
    /// (`keyforge:vault:encrypt:v1`, index 0).
    ///
    /// # Errors
    /// Propagates `BadLength` from derivation.
    pub fn derive(seed: &MasterSeed) -> Result<Self> {
        let okm = derive_key(seed, domains::VAULT_ENCRYPT, 0, 32)?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&okm);
        Ok(Self(key))
    }

    #[cfg(test)]
    pub(crate) const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Drop for VaultKey {
    fn drop(&mut self) {
        primitives::scrub(&mut self.0);
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(..)")
    }
}

/// An encrypted vault before framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedVault {
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

/// Compress and encrypt arbitrary plaintext with the vault pipeline. A
/// fresh random nonce is drawn unless one is supplied (tests pin nonces
/// for reproducible envelopes).
///
/// # Errors
/// `AeadFailure` from the cipher; `Io` from the compressor.
#[allow(clippy::expect_used)]
pub fn encrypt_bytes(
    plaintext: &[u8],
    key: &VaultKey,
    nonce: Option<[u8; NONCE_LEN]>,
) -> Result<SealedVault> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(plaintext)?;
    let compressed = encoder.finish()?;

    let nonce = nonce.unwrap_or_else(|| {
        let mut n = [0u8; NONCE_LEN];
        getrandom::fill(&mut n).expect("Failed to get random bytes");
        n
    });

    let (ciphertext, tag) = primitives::chacha20poly1305_seal(&key.0, &nonce, &compressed)?;
    Ok(SealedVault {
        nonce,
        tag,
        ciphertext,
    })
}

/// Decrypt and inflate sealed bytes.
///
/// # Errors
/// `VaultCorrupt` on tag mismatch or inflate failure.
pub fn decrypt_bytes(sealed: &SealedVault, key: &VaultKey) -> Result<Vec<u8>> {
    let compressed =
        primitives::chacha20poly1305_open(&key.0, &sealed.nonce, &sealed.ciphertext, &sealed.tag)
            .map_err(|_| KeyforgeError::VaultCorrupt)?;

    let mut plaintext = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .read_to_end(&mut plaintext)
        .map_err(|_| KeyforgeError::VaultCorrupt)?;
    Ok(plaintext)
}

/// Compress and encrypt a vault.
///
/// # Errors
/// See [`encrypt_bytes`]; serialization cannot fail.
#[allow(clippy::expect_used)]
pub fn encrypt(vault: &Vault, key: &VaultKey, nonce: Option<[u8; NONCE_LEN]>) -> Result<SealedVault> {
    let json = serde_json::to_vec(vault).expect("vault model always serializes");
    encrypt_bytes(&json, key, nonce)
}

/// Decrypt, inflate, and parse a sealed vault.
///
/// # Errors
/// `VaultCorrupt` on tag mismatch, inflate failure, JSON failure, or an
/// unknown vault document version.
pub fn decrypt(sealed: &SealedVault, key: &VaultKey) -> Result<Vault> {
    let json = decrypt_bytes(sealed, key)?;
    let vault: Vault =
        serde_json::from_slice(&json).map_err(|_| KeyforgeError::VaultCorrupt)?;
    if vault.version != crate::models::VAULT_VERSION {
        return Err(KeyforgeError::VaultCorrupt);
    }
    Ok(vault)
}

/// Frame a sealed vault into the on-disk envelope.
#[must_use]
pub fn encode(sealed: &SealedVault) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + sealed.ciphertext.len());
    #[allow(clippy::cast_possible_truncation)]
    out.push(NONCE_LEN as u8);
    out.extend_from_slice(&sealed.nonce);
    #[allow(clippy::cast_possible_truncation)]
    out.push(TAG_LEN as u8);
    out.extend_from_slice(&sealed.tag);
    out.extend_from_slice(&sealed.ciphertext);
    out
}

/// Parse the on-disk envelope.
///
/// # Errors
/// `VaultCorrupt` when the framing is truncated or the declared lengths
/// are not 12/16.
pub fn decode(bytes: &[u8]) -> Result<SealedVault> {
    if bytes.len() < HEADER_LEN {
        return Err(KeyforgeError::VaultCorrupt);
    }
    if bytes[0] as usize != NONCE_LEN || bytes[1 + NONCE_LEN] as usize != TAG_LEN {
        return Err(KeyforgeError::VaultCorrupt);
    }
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&bytes[1..1 + NONCE_LEN]);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&bytes[2 + NONCE_LEN..HEADER_LEN]);
    Ok(SealedVault {
        nonce,
        tag,
        ciphertext: bytes[HEADER_LEN..].to_vec(),
    })
}

/// Encrypt straight to envelope bytes.
///
/// # Errors
/// See [`encrypt`].
pub fn seal_to_bytes(vault: &Vault, key: &VaultKey) -> Result<Vec<u8>> {
    Ok(encode(&encrypt(vault, key, None)?))
}

/// Decrypt straight from envelope bytes.
///
/// # Errors
/// `VaultCorrupt` on any framing or decryption failure.
pub fn open_from_bytes(bytes: &[u8], key: &VaultKey) -> Result<Vault> {
    decrypt(&decode(bytes)?, key)
}
