//! Password generation for `pass add --generate` and `pass generate`.

use anyhow::{bail, Result};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{rng, Rng};

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()-_=+[]{};:,.<>?";
const AMBIGUOUS: &str = "0O1lI|`'\"";

/// Words for memorable passwords; short and unambiguous on purpose.
const WORDS: &[&str] = &[
    "anchor", "basalt", "cedar", "delta", "ember", "falcon", "garnet", "harbor", "indigo",
    "juniper", "kestrel", "lantern", "meadow", "nectar", "onyx", "pebble", "quartz", "raven",
    "sable", "tundra", "umber", "velvet", "willow", "zephyr",
];

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub length: usize,
    pub include_uppercase: bool,
    pub include_lowercase: bool,
    pub include_digits: bool,
    pub include_symbols: bool,
    pub exclude_ambiguous: bool,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            length: 16,
            include_uppercase: true,
            include_lowercase: true,
            include_digits: true,
            include_symbols: true,
            exclude_ambiguous: true,
        }
    }
}

impl PasswordConfig {
    fn character_sets(&self) -> Vec<String> {
        let mut sets = Vec::new();
        let filter = |set: &str| -> String {
            if self.exclude_ambiguous {
                set.chars().filter(|c| !AMBIGUOUS.contains(*c)).collect()
            } else {
                set.to_string()
            }
        };
        if self.include_lowercase {
            sets.push(filter(LOWERCASE));
        }
        if self.include_uppercase {
            sets.push(filter(UPPERCASE));
        }
        if self.include_digits {
            sets.push(filter(DIGITS));
        }
        if self.include_symbols {
            sets.push(filter(SYMBOLS));
        }
        sets
    }
}

/// Generate a password with at least one character from every enabled set.
///
/// # Errors
/// When no character set is enabled or the length cannot hold one
/// character per set.
pub fn generate_password(config: &PasswordConfig) -> Result<String> {
    let sets = config.character_sets();
    if sets.is_empty() {
        bail!("at least one character set must be enabled");
    }
    if config.length < sets.len() {
        bail!(
            "length {} is too short for {} required character sets",
            config.length,
            sets.len()
        );
    }

    let mut rng = rng();
    let mut chars: Vec<char> = Vec::with_capacity(config.length);

    // One guaranteed character per enabled set, then fill from the union.
    for set in &sets {
        let set_chars: Vec<char> = set.chars().collect();
        if let Some(c) = set_chars.choose(&mut rng) {
            chars.push(*c);
        }
    }
    let union: Vec<char> = sets.concat().chars().collect();
    while chars.len() < config.length {
        if let Some(c) = union.choose(&mut rng) {
            chars.push(*c);
        }
    }
    chars.shuffle(&mut rng);
    Ok(chars.into_iter().collect())
}

/// Alphanumeric only.
///
/// # Errors
/// See [`generate_password`].
pub fn generate_simple(length: usize) -> Result<String> {
    generate_password(&PasswordConfig {
        length,
        include_symbols: false,
        ..PasswordConfig::default()
    })
}

/// All character classes.
///
/// # Errors
/// See [`generate_password`].
pub fn generate_complex(length: usize) -> Result<String> {
    generate_password(&PasswordConfig {
        length,
        ..PasswordConfig::default()
    })
}

/// Hyphenated words plus a numeric suffix, e.g. `cedar-raven-tundra-42`.
#[must_use]
pub fn generate_memorable(words: usize) -> String {
    let mut rng = rng();
    let count = words.clamp(2, 8);
    let picked: Vec<&str> = (0..count)
        .filter_map(|_| WORDS.choose(&mut rng).copied())
        .collect();
    format!("{}-{}", picked.join("-"), rng.random_range(10..100))
}
