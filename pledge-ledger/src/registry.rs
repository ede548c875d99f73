//! Name registry
//!
//! Holds the set of valid subject names for the current period plus an alias
//! table mapping nicknames and alternate spellings to canonical names.
//! Injected into the parser; never a process-wide singleton.

use crate::config::{LedgerConfig, RegistryConfig};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Valid subject names plus alias table
///
/// Lookups are keyed by the title-cased form of a name; results are always
/// the spelling given in configuration, so `McDonald` stays `McDonald`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameRegistry {
    /// title-cased key -> configured name
    valid: BTreeMap<String, String>,
    /// title-cased alias -> configured name
    aliases: HashMap<String, String>,
}

impl NameRegistry {
    /// Build a registry
    ///
    /// Two valid names that only differ in case, or an alias pointing at
    /// anything but a valid name, are configuration errors.
    pub fn new<N, A>(valid_names: N, aliases: A) -> Result<Self>
    where
        N: IntoIterator,
        N::Item: AsRef<str>,
        A: IntoIterator<Item = (String, String)>,
    {
        let mut valid = BTreeMap::new();
        for name in valid_names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if let Some(existing) = valid.insert(title_case(name), name.to_string()) {
                if existing != name {
                    return Err(Error::Config(format!(
                        "valid names '{}' and '{}' differ only in case",
                        existing, name
                    )));
                }
            }
        }

        let mut table = HashMap::new();
        for (alias, target) in aliases {
            let canonical = valid.get(&title_case(target.trim())).ok_or_else(|| {
                Error::Config(format!(
                    "alias '{}' points at '{}', which is not a valid name",
                    alias, target
                ))
            })?;
            table.insert(title_case(alias.trim()), canonical.clone());
        }

        Ok(Self {
            valid,
            aliases: table,
        })
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Self::new(
            &config.valid_names,
            config
                .aliases
                .iter()
                .map(|(alias, target)| (alias.clone(), target.clone())),
        )
    }

    /// Load the registry section of a TOML config file
    ///
    /// Call again and swap the result in to pick up a new period's names.
    pub fn load(path: &Path) -> Result<Self> {
        LedgerConfig::load(path)?.name_registry()
    }

    /// Title-case then apply alias substitution
    ///
    /// A known name or alias comes back in its configured spelling; anything
    /// else comes back title-cased.
    pub fn normalize(&self, raw: &str) -> String {
        let key = title_case(raw.trim());
        self.aliases
            .get(&key)
            .or_else(|| self.valid.get(&key))
            .cloned()
            .unwrap_or(key)
    }

    /// Canonical name for `raw`, or `None` if it is not a valid subject
    pub fn validate(&self, raw: &str) -> Option<String> {
        let key = title_case(raw.trim());
        self.aliases
            .get(&key)
            .or_else(|| self.valid.get(&key))
            .cloned()
    }

    /// Whether `canonical` is a configured name, spelled exactly as configured
    pub fn is_valid(&self, canonical: &str) -> bool {
        self.valid
            .get(&title_case(canonical))
            .is_some_and(|name| name == canonical)
    }

    /// Configured names, ordered by their title-cased form
    pub fn valid_names(&self) -> impl Iterator<Item = &str> {
        self.valid.values().map(String::as_str)
    }

    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }
}

/// Word-wise title case: a letter following a non-letter is upper-cased,
/// every other letter is lower-cased. "o'brien" becomes "O'Brien".
fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_is_letter = false;
    for ch in raw.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}
