// User-managed whitelist with JSON persistence.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{info, warn};

/// Domains the user has exempted from page analysis. Entries match
/// exactly and cover their subdomains; a leading `*.` is accepted and
/// normalized to the bare domain.
pub struct Whitelist {
    path: PathBuf,
    entries: BTreeSet<String>,
}

impl Whitelist {
    /// Loads the whitelist from `path`. A missing file is an empty
    /// whitelist, not an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let entries = match fs::read_to_string(path) {
            Ok(raw) => {
                let listed: Vec<String> = serde_json::from_str(&raw)
                    .with_context(|| format!("invalid whitelist file {}", path.display()))?;
                listed.into_iter().map(|e| normalize(&e)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read whitelist {}", path.display()))
            }
        };
        info!("Loaded {} whitelist entries", entries.len());
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// True if `host` equals a whitelisted domain or is a subdomain of one.
    pub fn contains(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.entries
            .iter()
            .any(|entry| host == *entry || host.ends_with(&format!(".{entry}")))
    }

    /// Adds a domain and persists. Returns false if it was already listed.
    /// The in-memory entry always takes effect; a failed write is logged
    /// and retried on the next mutation.
    pub fn add(&mut self, domain: &str) -> bool {
        let added = self.entries.insert(normalize(domain));
        if added {
            if let Err(e) = self.persist() {
                warn!("whitelist not persisted: {e:#}");
            }
        }
        added
    }

    /// Removes a domain and persists. Returns false if it was not listed.
    pub fn remove(&mut self, domain: &str) -> bool {
        let removed = self.entries.remove(&normalize(domain));
        if removed {
            if let Err(e) = self.persist() {
                warn!("whitelist not persisted: {e:#}");
            }
        }
        removed
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let entries: Vec<&str> = self.entries.iter().map(String::as_str).collect();
        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write whitelist {}", self.path.display()))
    }
}

fn normalize(entry: &str) -> String {
    entry
        .trim()
        .trim_start_matches("*.")
        .to_ascii_lowercase()
}
