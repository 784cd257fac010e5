//! TOTP secrets and RFC 6238 code generation.
//!
//! Per-service secrets are 20 bytes of domain-derived material; the index
//! rule here keys an HMAC with the service name (unlike the plain-hash
//! rule SSH and wallets use) and both rules are frozen.

use hmac::{Hmac, Mac};
use keyforge_crypto::{
    derive_key, domains, totp_service_to_index, KeyforgeError, MasterSeed, Result,
};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

/// Length of a derived TOTP shared secret.
pub const SECRET_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotpAlgorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

/// Code parameters. Defaults match the authenticator-app mainstream:
/// SHA-1, 6 digits, 30-second period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotpParams {
    pub algorithm: TotpAlgorithm,
    pub digits: u32,
    pub period: u64,
}

impl Default for TotpParams {
    fn default() -> Self {
        Self {
            algorithm: TotpAlgorithm::Sha1,
            digits: 6,
            period: 30,
        }
    }
}

/// Derive the 20-byte shared secret for `service`.
///
/// # Errors
/// Propagates `BadLength` from derivation.
pub fn derive_secret(seed: &MasterSeed, service: &str) -> Result<Zeroizing<Vec<u8>>> {
    let index = totp_service_to_index(service);
    derive_key(seed, domains::SERVICE_TOTP, index, SECRET_LEN)
}

/// RFC 6238 code for `secret` at `now_unix`.
///
/// # Errors
/// `InvalidFormat` when digits is not 6 or 8, or period is not 30 or 60.
pub fn code(secret: &[u8], now_unix: u64, params: &TotpParams) -> Result<String> {
    if params.digits != 6 && params.digits != 8 {
        return Err(KeyforgeError::InvalidFormat(format!(
            "digits must be 6 or 8, got {}",
            params.digits
        )));
    }
    if params.period != 30 && params.period != 60 {
        return Err(KeyforgeError::InvalidFormat(format!(
            "period must be 30 or 60 seconds, got {}",
            params.period
        )));
    }

    let counter = (now_unix / params.period).to_be_bytes();
    let digest = match params.algorithm {
        TotpAlgorithm::Sha1 => hmac_sha1(secret, &counter),
        TotpAlgorithm::Sha256 => hmac_sha256(secret, &counter),
        TotpAlgorithm::Sha512 => hmac_sha512(secret, &counter),
    };

    // RFC 4226 dynamic truncation.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    let value = binary % 10u32.pow(params.digits);
    Ok(format!("{value:0width$}", width = params.digits as usize))
}

#[allow(clippy::expect_used)]
fn hmac_sha1(key: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

#[allow(clippy::expect_used)]
fn hmac_sha256(key: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

#[allow(clippy::expect_used)]
fn hmac_sha512(key: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut mac = <Hmac<Sha512> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

/// Insert a space at the midpoint for display: `123456` → `123 456`.
#[must_use]
pub fn format_code(code: &str) -> String {
    let mid = code.len() / 2;
    format!("{} {}", &code[..mid], &code[mid..])
}

/// RFC 4648 Base32 with `=` padding to a multiple of eight characters.
#[must_use]
pub fn base32_encode(data: &[u8]) -> String {
    base32::encode(base32::Alphabet::RFC4648 { padding: true }, data)
}

/// Decode RFC 4648 Base32 (padding optional on input).
///
/// # Errors
/// `InvalidFormat` on characters outside the alphabet.
pub fn base32_decode(encoded: &str) -> Result<Vec<u8>> {
    base32::decode(base32::Alphabet::RFC4648 { padding: true }, encoded)
        .ok_or_else(|| KeyforgeError::InvalidFormat("invalid base32 input".into()))
}
