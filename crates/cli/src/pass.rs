//! `keyforge pass ...`: password records in the vault.

use anyhow::{bail, Result};
use clap::Subcommand;
use keyforge_vault::{NewPassword, PasswordPatch, PasswordQuery, VaultStore};

use crate::passgen::{self, PasswordConfig};
use crate::session::prompt_secret;

#[derive(Subcommand, Debug)]
pub enum PassCommand {
    /// Store a password for a site
    Add {
        site: String,
        #[arg(short, long)]
        username: String,
        /// Value to store; prompted when neither this nor --generate is given
        #[arg(short, long)]
        password: Option<String>,
        /// Generate the password instead of typing it
        #[arg(long)]
        generate: bool,
        #[arg(long, default_value_t = 16)]
        length: usize,
        #[arg(long)]
        tags: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show the password for a site
    Get {
        site: String,
        /// Include previous passwords
        #[arg(long)]
        history: bool,
    },
    /// List records, optionally filtered
    List {
        #[arg(long)]
        site: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        tag: Vec<String>,
    },
    /// Update fields of a record
    Update {
        site: String,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
        /// Generate a fresh password
        #[arg(long)]
        generate: bool,
        #[arg(long, default_value_t = 16)]
        length: usize,
    },
    /// Delete a record
    Delete { site: String },
    /// Generate passwords without touching the vault
    Generate {
        #[arg(short, long, default_value_t = 16)]
        length: usize,
        /// Alphanumeric only
        #[arg(long)]
        simple: bool,
        /// All character classes
        #[arg(long)]
        complex: bool,
        /// Hyphenated words
        #[arg(long)]
        memorable: bool,
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
}

fn pick_password(
    password: Option<String>,
    generate: bool,
    length: usize,
    prompt: &str,
) -> Result<String> {
    if let Some(password) = password {
        if generate {
            bail!("--password and --generate are mutually exclusive");
        }
        return Ok(password);
    }
    if generate {
        return passgen::generate_password(&PasswordConfig {
            length,
            ..PasswordConfig::default()
        });
    }
    prompt_secret(prompt)
}

pub fn handle_pass(cmd: PassCommand, store: &mut VaultStore) -> Result<()> {
    match cmd {
        PassCommand::Add {
            site,
            username,
            password,
            generate,
            length,
            tags,
            notes,
        } => {
            let password = pick_password(password, generate, length, "Password to store: ")?;
            store.add_password(NewPassword {
                site: site.clone(),
                username,
                password,
                notes,
                tags,
            })?;
            println!("Stored password for {site}");
        }
        PassCommand::Get { site, history } => {
            let Some(entry) = store.get_password(&site) else {
                bail!("no password stored for '{site}'");
            };
            println!("site:     {}", entry.site);
            println!("username: {}", entry.username);
            println!("password: {}", entry.password);
            if let Some(notes) = &entry.notes {
                println!("notes:    {notes}");
            }
            if !entry.tags.is_empty() {
                println!("tags:     {}", entry.tags.join(", "));
            }
            if history {
                for (i, old) in entry.history.iter().enumerate() {
                    println!("history[{i}]: {}", old.password);
                }
            }
        }
        PassCommand::List {
            site,
            username,
            tag,
        } => {
            let query = PasswordQuery {
                site,
                username,
                tags: if tag.is_empty() { None } else { Some(tag) },
            };
            for entry in store.search_passwords(&query) {
                println!("- {} [{}]", entry.site, entry.username);
            }
        }
        PassCommand::Update {
            site,
            username,
            password,
            generate,
            length,
        } => {
            let password = match (password, generate) {
                (Some(_), true) => bail!("--password and --generate are mutually exclusive"),
                (Some(p), false) => Some(p),
                (None, true) => Some(passgen::generate_password(&PasswordConfig {
                    length,
                    ..PasswordConfig::default()
                })?),
                (None, false) => None,
            };
            store.update_password(
                &site,
                PasswordPatch {
                    username,
                    password,
                    ..PasswordPatch::default()
                },
            )?;
            println!("Updated {site}");
        }
        PassCommand::Delete { site } => {
            store.delete_password(&site)?;
            println!("Deleted {site}");
        }
        PassCommand::Generate {
            length,
            simple,
            complex,
            memorable,
            count,
        } => print_generated(length, simple, complex, memorable, count)?,
    }
    Ok(())
}

/// `pass generate` touches no vault state, so it also runs without a
/// session.
pub fn print_generated(
    length: usize,
    simple: bool,
    complex: bool,
    memorable: bool,
    count: usize,
) -> Result<()> {
    for i in 0..count.max(1) {
        let password = if memorable {
            passgen::generate_memorable(4)
        } else if simple {
            passgen::generate_simple(length)?
        } else if complex {
            passgen::generate_complex(length)?
        } else {
            passgen::generate_password(&PasswordConfig {
                length,
                ..PasswordConfig::default()
            })?
        };
        if count > 1 {
            println!("{}: {password}", i + 1);
        } else {
            println!("{password}");
        }
    }
    Ok(())
}
