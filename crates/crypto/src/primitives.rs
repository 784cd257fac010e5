//! Thin wrappers over the hash, MAC, AEAD, and CSPRNG primitives.
//!
//! Everything in this module is pure and silent: no logging, no global
//! state. Higher layers decide what to do with failures.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use sha3::Keccak256;

use crate::error::{KeyforgeError, Result};

pub type HmacSha256 = Hmac<Sha256>;
pub type HmacSha512 = Hmac<Sha512>;

/// ChaCha20-Poly1305 nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// Poly1305 tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Fill a fresh buffer with `n` cryptographically secure random bytes.
///
/// # Panics
/// Panics if the operating system RNG is unavailable; there is no sane
/// way to continue generating key material without it.
#[allow(clippy::expect_used)]
#[must_use]
pub fn random(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    getrandom::fill(&mut buf).expect("Failed to get random bytes");
    buf
}

/// Constant-time equality. Returns `false` when the lengths differ.
#[must_use]
pub fn ct_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Overwrite a buffer with random bytes, then 0xFF, then 0x00.
///
/// Used on teardown of long-lived secrets (master seed, vault key) so the
/// final memory state carries nothing derived from them.
#[allow(clippy::expect_used)]
pub fn scrub(buf: &mut [u8]) {
    use zeroize::Zeroize;
    getrandom::fill(buf).expect("Failed to get random bytes");
    buf.fill(0xFF);
    // zeroize's final pass carries a compiler fence, so the whole
    // sequence cannot be elided as dead stores.
    buf.zeroize();
}

/// PBKDF2-HMAC-SHA512.
#[must_use]
pub fn pbkdf2_sha512(password: &[u8], salt: &[u8], iterations: u32, out_len: usize) -> Vec<u8> {
    let mut out = vec![0u8; out_len];
    pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, iterations, &mut out);
    out
}

/// HMAC-SHA256 of `msg` under `key`.
///
/// # Panics
/// Never: HMAC accepts keys of any length.
#[allow(clippy::expect_used)]
#[must_use]
pub fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; 32] {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}

/// HMAC-SHA512 of `msg` under `key`.
///
/// # Panics
/// Never: HMAC accepts keys of any length.
#[allow(clippy::expect_used)]
#[must_use]
pub fn hmac_sha512(key: &[u8], msg: &[u8]) -> [u8; 64] {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

#[must_use]
pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[must_use]
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Keccak-256 (the pre-NIST padding Ethereum uses, not SHA-3-256).
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encrypt with ChaCha20-Poly1305, empty AAD.
///
/// Returns the ciphertext and the 16-byte Poly1305 tag separately; the
/// vault envelope stores them in distinct fields.
///
/// # Errors
/// Returns `AeadFailure` if the underlying cipher rejects the input.
pub fn chacha20poly1305_seal(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
    let aead = ChaCha20Poly1305::new(Key::from_slice(key));
    let mut combined = aead
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad: &[],
            },
        )
        .map_err(|_| KeyforgeError::AeadFailure)?;
    // RustCrypto AEADs append the tag to the ciphertext.
    let split = combined.len() - TAG_LEN;
    let tag_bytes = combined.split_off(split);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&tag_bytes);
    Ok((combined, tag))
}

/// Decrypt with ChaCha20-Poly1305, empty AAD.
///
/// # Errors
/// Returns `AeadFailure` on any tag mismatch.
pub fn chacha20poly1305_open(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Result<Vec<u8>> {
    let aead = ChaCha20Poly1305::new(Key::from_slice(key));
    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);
    aead.decrypt(
        Nonce::from_slice(nonce),
        Payload {
            msg: &combined,
            aad: &[],
        },
    )
    .map_err(|_| KeyforgeError::AeadFailure)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_random_length_and_variation() {
        let a = random(32);
        let b = random(32);
        assert_eq!(a.len(), 32);
        assert_eq!(b.len(), 32);
        assert_ne!(a, b);
        assert!(random(0).is_empty());
    }

    #[test]
    fn test_ct_equal() {
        assert!(ct_equal(b"same bytes", b"same bytes"));
        assert!(!ct_equal(b"same bytes", b"same byteZ"));
        assert!(!ct_equal(b"short", b"longer input"));
        assert!(ct_equal(b"", b""));
    }

    #[test]
    fn test_scrub_leaves_zeros() {
        let mut buf = vec![0xAB; 64];
        scrub(&mut buf);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sha256_empty_vector() {
        // FIPS 180-4 test vector for the empty message.
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha1_abc_vector() {
        assert_eq!(
            hex::encode(sha1(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_ripemd160_abc_vector() {
        assert_eq!(
            hex::encode(ripemd160(b"abc")),
            "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
        );
    }

    #[test]
    fn test_keccak256_empty_vector() {
        // Keccak-256(""), distinct from SHA-3-256("").
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_pbkdf2_sha512_deterministic() {
        let a = pbkdf2_sha512(b"password", b"salt", 1000, 64);
        let b = pbkdf2_sha512(b"password", b"salt", 1000, 64);
        let c = pbkdf2_sha512(b"password", b"pepper", 1000, 64);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hmac_outputs_differ_by_key_and_message() {
        let a = hmac_sha512(b"k1", b"msg");
        let b = hmac_sha512(b"k2", b"msg");
        let c = hmac_sha512(b"k1", b"other");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(hmac_sha256(b"k1", b"msg")[..], a[..32]);
    }

    #[test]
    fn test_aead_seal_open_roundtrip() {
        let key = [7u8; 32];
        let nonce = [9u8; NONCE_LEN];
        let (ct, tag) = chacha20poly1305_seal(&key, &nonce, b"vault plaintext").unwrap();
        assert_eq!(tag.len(), TAG_LEN);
        assert_ne!(ct, b"vault plaintext");
        let pt = chacha20poly1305_open(&key, &nonce, &ct, &tag).unwrap();
        assert_eq!(pt, b"vault plaintext");
    }

    #[test]
    fn test_aead_tamper_detection() {
        let key = [7u8; 32];
        let nonce = [9u8; NONCE_LEN];
        let (mut ct, tag) = chacha20poly1305_seal(&key, &nonce, b"payload").unwrap();

        ct[0] ^= 0x01;
        assert!(matches!(
            chacha20poly1305_open(&key, &nonce, &ct, &tag),
            Err(KeyforgeError::AeadFailure)
        ));

        ct[0] ^= 0x01;
        let mut bad_tag = tag;
        bad_tag[15] ^= 0x80;
        assert!(matches!(
            chacha20poly1305_open(&key, &nonce, &ct, &bad_tag),
            Err(KeyforgeError::AeadFailure)
        ));

        let mut bad_nonce = nonce;
        bad_nonce[0] ^= 0x01;
        assert!(matches!(
            chacha20poly1305_open(&key, &bad_nonce, &ct, &tag),
            Err(KeyforgeError::AeadFailure)
        ));

        // Untouched inputs still decrypt.
        assert!(chacha20poly1305_open(&key, &nonce, &ct, &tag).is_ok());
    }

    #[test]
    fn test_aead_wrong_key_fails() {
        let nonce = [0u8; NONCE_LEN];
        let (ct, tag) = chacha20poly1305_seal(&[1u8; 32], &nonce, b"data").unwrap();
        assert!(chacha20poly1305_open(&[2u8; 32], &nonce, &ct, &tag).is_err());
    }
}
