//! Domain-separated key expansion over the master seed.
//!
//! HKDF-style, but not RFC 5869: for output lengths up to one hash block
//! the expansion is a single `HMAC-SHA512(PRK, info)` with no counter
//! byte. That quirk is load-bearing: existing vaults and issued keys were
//! derived with it, so it must never be "fixed".

use zeroize::Zeroizing;

use crate::error::{KeyforgeError, Result};
use crate::master::MasterSeed;
use crate::primitives::{hmac_sha256, hmac_sha512, sha256};

/// HMAC key for extracting the PRK from the master seed.
const EXPAND_KEY: &[u8] = b"keyforge-expand";

/// SHA-512 output length; one expansion block.
const BLOCK_LEN: usize = 64;

/// Maximum derivable length: 255 blocks of 64 bytes.
pub const MAX_DERIVED_LEN: usize = 255 * BLOCK_LEN;

/// Domain tags. Exact ASCII strings; any change re-keys that domain.
pub mod domains {
    pub const SSH: &str = "keyforge:ssh:v1";
    pub const GPG: &str = "keyforge:gpg:v1";
    pub const AGE: &str = "keyforge:age:v1";
    pub const WALLET_BIP39: &str = "keyforge:wallet:bip39:v1";
    pub const WALLET_PAYMENT: &str = "keyforge:wallet:payment:v1";
    pub const WALLET_MONERO: &str = "keyforge:wallet:monero:v1";
    pub const VAULT_ENCRYPT: &str = "keyforge:vault:encrypt:v1";
    pub const VAULT_HMAC: &str = "keyforge:vault:hmac:v1";
    pub const VAULT_IPNS: &str = "keyforge:vault:ipns:v1";
    pub const SERVICE_TOTP: &str = "keyforge:service:totp:v1";
    pub const SERVICE_API: &str = "keyforge:service:api:v1";
    pub const SERVICE_WEBAUTHN: &str = "keyforge:service:webauthn:v1";
    pub const NOSTR: &str = "keyforge:nostr:v1";
    pub const SHAMIR: &str = "keyforge:shamir:v1";
    pub const CANARY: &str = "keyforge:canary:v1";
}

/// Derive `len` bytes for `(domain, index)` from the master seed.
///
/// `PRK = HMAC-SHA512("keyforge-expand", seed)`, `info =
/// "<domain>:<index>:<len>"`. Lengths ≤ 64 take the leading bytes of a
/// single `HMAC-SHA512(PRK, info)`; longer outputs are chained as
/// `T_i = HMAC-SHA512(PRK, T_{i-1} ‖ info ‖ byte(i))`.
///
/// # Errors
/// `BadLength` when `len` is 0 or exceeds [`MAX_DERIVED_LEN`].
pub fn derive_key(
    seed: &MasterSeed,
    domain: &str,
    index: u32,
    len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if len == 0 || len > MAX_DERIVED_LEN {
        return Err(KeyforgeError::BadLength(format!(
            "derived length must be 1..={MAX_DERIVED_LEN}, got {len}"
        )));
    }

    let prk = hmac_sha512(EXPAND_KEY, seed.as_bytes());
    let info = format!("{domain}:{index}:{len}");

    if len <= BLOCK_LEN {
        let block = hmac_sha512(&prk, info.as_bytes());
        return Ok(Zeroizing::new(block[..len].to_vec()));
    }

    let blocks = len.div_ceil(BLOCK_LEN);
    let mut okm = Zeroizing::new(Vec::with_capacity(blocks * BLOCK_LEN));
    let mut previous: Vec<u8> = Vec::new();
    for i in 1..=blocks {
        let mut msg = Vec::with_capacity(previous.len() + info.len() + 1);
        msg.extend_from_slice(&previous);
        msg.extend_from_slice(info.as_bytes());
        #[allow(clippy::cast_possible_truncation)]
        msg.push(i as u8);
        let block = hmac_sha512(&prk, &msg);
        okm.extend_from_slice(&block);
        previous = block.to_vec();
    }
    okm.truncate(len);
    Ok(okm)
}

/// Derive `count` keys at consecutive indices `0..count`.
///
/// # Errors
/// Propagates `BadLength` from [`derive_key`].
pub fn derive_multiple(
    seed: &MasterSeed,
    domain: &str,
    count: u32,
    len: usize,
) -> Result<Vec<Zeroizing<Vec<u8>>>> {
    (0..count).map(|i| derive_key(seed, domain, i, len)).collect()
}

/// Map a service name to a derivation index: the first four bytes of
/// `SHA-256(service)`, read little-endian.
///
/// Collisions just mean two services share a key; accepted trade-off.
#[must_use]
pub fn service_to_index(service: &str) -> u32 {
    let digest = sha256(service.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Same mapping rule as [`service_to_index`], for hostnames.
#[must_use]
pub fn hostname_to_index(hostname: &str) -> u32 {
    service_to_index(hostname)
}

/// TOTP index rule: first four bytes of `HMAC-SHA256(key=service, msg=∅)`,
/// little-endian. Intentionally different from [`service_to_index`].
#[must_use]
pub fn totp_service_to_index(service: &str) -> u32 {
    let digest = hmac_sha256(service.as_bytes(), &[]);
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn zero_seed() -> MasterSeed {
        MasterSeed::from_bytes([0u8; 64])
    }

    #[test]
    fn test_deterministic() {
        let seed = zero_seed();
        let a = derive_key(&seed, domains::SSH, 0, 32).unwrap();
        let b = derive_key(&seed, domains::SSH, 0, 32).unwrap();
        assert_eq!(*a, *b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_domain_separation() {
        let seed = zero_seed();
        let ssh = derive_key(&seed, domains::SSH, 0, 32).unwrap();
        let gpg = derive_key(&seed, domains::GPG, 0, 32).unwrap();
        assert_ne!(*ssh, *gpg);
        assert_eq!(ssh.len(), 32);
        assert_eq!(gpg.len(), 32);
    }

    #[test]
    fn test_index_separation() {
        let seed = zero_seed();
        let k0 = derive_key(&seed, domains::SSH, 0, 32).unwrap();
        let k1 = derive_key(&seed, domains::SSH, 1, 32).unwrap();
        assert_ne!(*k0, *k1);
    }

    #[test]
    fn test_length_is_part_of_the_info_string() {
        // Requesting 16 bytes is NOT a prefix of requesting 32: len is
        // baked into the info string.
        let seed = zero_seed();
        let short = derive_key(&seed, domains::SSH, 0, 16).unwrap();
        let long = derive_key(&seed, domains::SSH, 0, 32).unwrap();
        assert_ne!(*short, long[..16]);
    }

    #[test]
    fn test_single_shot_path_omits_counter_byte() {
        // For len ≤ 64 the output must be HMAC-SHA512(PRK, info) with no
        // trailing counter byte appended.
        let seed = zero_seed();
        let prk = hmac_sha512(EXPAND_KEY, seed.as_bytes());
        let info = format!("{}:{}:{}", domains::SSH, 0, 64);
        let expected = hmac_sha512(&prk, info.as_bytes());
        let got = derive_key(&seed, domains::SSH, 0, 64).unwrap();
        assert_eq!(*got, expected.to_vec());
    }

    #[test]
    fn test_chained_expansion_matches_construction() {
        let seed = zero_seed();
        let prk = hmac_sha512(EXPAND_KEY, seed.as_bytes());
        let info = format!("{}:{}:{}", domains::SHAMIR, 3, 100);

        let mut msg1 = info.clone().into_bytes();
        msg1.push(1);
        let t1 = hmac_sha512(&prk, &msg1);
        let mut msg2 = t1.to_vec();
        msg2.extend_from_slice(info.as_bytes());
        msg2.push(2);
        let t2 = hmac_sha512(&prk, &msg2);

        let mut expected = t1.to_vec();
        expected.extend_from_slice(&t2);
        expected.truncate(100);

        let got = derive_key(&seed, domains::SHAMIR, 3, 100).unwrap();
        assert_eq!(*got, expected);
    }

    #[test]
    fn test_length_bounds() {
        let seed = zero_seed();
        assert!(matches!(
            derive_key(&seed, domains::SSH, 0, 0),
            Err(KeyforgeError::BadLength(_))
        ));
        assert!(matches!(
            derive_key(&seed, domains::SSH, 0, MAX_DERIVED_LEN + 1),
            Err(KeyforgeError::BadLength(_))
        ));
        let max = derive_key(&seed, domains::SSH, 0, MAX_DERIVED_LEN).unwrap();
        assert_eq!(max.len(), MAX_DERIVED_LEN);
    }

    #[test]
    fn test_derive_multiple_matches_individual_calls() {
        let seed = zero_seed();
        let many = derive_multiple(&seed, domains::SERVICE_API, 4, 32).unwrap();
        assert_eq!(many.len(), 4);
        for (i, key) in many.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let single = derive_key(&seed, domains::SERVICE_API, i as u32, 32).unwrap();
            assert_eq!(**key, *single);
        }
    }

    #[test]
    fn test_service_index_rules_are_distinct() {
        // SSH/wallet call sites hash with plain SHA-256; the TOTP call
        // site keys an HMAC with the service name. Same input, different
        // index.
        assert_eq!(service_to_index("github.com"), hostname_to_index("github.com"));
        assert_ne!(service_to_index("github.com"), totp_service_to_index("github.com"));
        // Stable across calls.
        assert_eq!(service_to_index("github.com"), service_to_index("github.com"));
        assert_ne!(service_to_index("github.com"), service_to_index("gitlab.com"));
    }

    #[test]
    fn test_seed_sensitivity() {
        let a = derive_key(&zero_seed(), domains::SSH, 0, 32).unwrap();
        let b = derive_key(&MasterSeed::from_bytes([1u8; 64]), domains::SSH, 0, 32).unwrap();
        assert_ne!(*a, *b);
    }
}
