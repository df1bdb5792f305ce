//! Catalog records and the runtime registry
//!
//! The catalog starts from the builtin table and can grow during a session.
//! Entries registered through the console carry no decay constant; decay
//! correction for them fails explicitly rather than being skipped.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::builtin::BUILTIN_ISOTOPES;

/// A calibration channel entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Isotope {
    /// Display name (e.g. "Tc-99m")
    pub name: String,
    /// Full channel-select command (e.g. "!F236")
    pub channel: String,
    /// Per-minute decay constant; absent for manually added channels
    pub decay_per_min: Option<f64>,
}

impl Isotope {
    /// Builtin entry with a known decay constant
    pub fn builtin(name: &str, channel: &str, decay_per_min: f64) -> Self {
        Self {
            name: name.to_string(),
            channel: channel.to_string(),
            decay_per_min: Some(decay_per_min),
        }
    }
}

/// Rejected catalog mutations
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    /// Console input that does not carry the `*!F` channel prefix
    #[error("not a channel registration: {0:?}")]
    NotAChannel(String),
}

/// On-disk extension file: a list of `[[isotope]]` tables
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    isotope: Vec<Isotope>,
}

/// Runtime isotope registry
///
/// Names are unique; re-registering a name replaces its entry. Listing
/// order is registration order, matching the selector the console shows.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<Isotope>,
}

impl Catalog {
    /// Catalog seeded with the builtin table
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_ISOTOPES.clone(),
        }
    }

    /// Look up an entry by name
    pub fn get(&self, name: &str) -> Option<&Isotope> {
        self.entries.iter().find(|i| i.name == name)
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|i| i.name.as_str()).collect()
    }

    /// All entries in registration order
    pub fn entries(&self) -> &[Isotope] {
        &self.entries
    }

    /// Insert an entry, replacing any existing entry with the same name
    pub fn insert(&mut self, isotope: Isotope) {
        if let Some(existing) = self.entries.iter_mut().find(|i| i.name == isotope.name) {
            *existing = isotope;
        } else {
            self.entries.push(isotope);
        }
    }

    /// Register a channel from the console's `*!F<code>` form
    ///
    /// The display name is the full input; the channel command is the input
    /// minus its leading `*`. No decay constant is recorded.
    pub fn add_manual(&mut self, input: &str) -> Result<Isotope, CatalogError> {
        if !input.starts_with("*!F") {
            return Err(CatalogError::NotAChannel(input.to_string()));
        }

        let isotope = Isotope {
            name: input.to_string(),
            channel: input[1..].to_string(),
            decay_per_min: None,
        };
        self.insert(isotope.clone());

        Ok(isotope)
    }

    /// Merge entries from a TOML extension file over the current catalog
    pub fn merge_file(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        let file: CatalogFile = toml::from_str(&text)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?;

        let count = file.isotope.len();
        for isotope in file.isotope {
            self.insert(isotope);
        }

        Ok(count)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_lookup() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.get("Tc-99m").unwrap().channel, "!F236");
        assert_eq!(catalog.get("F-18").unwrap().channel, "!F762");
        assert!(catalog.get("Ra-226").is_none());
    }

    #[test]
    fn test_add_manual_channel() {
        let mut catalog = Catalog::builtin();
        let entry = catalog.add_manual("*!F1234").unwrap();

        assert_eq!(entry.name, "*!F1234");
        assert_eq!(entry.channel, "!F1234");
        assert_eq!(entry.decay_per_min, None);
        assert!(catalog.names().contains(&"*!F1234"));
    }

    #[test]
    fn test_add_manual_rejects_other_input() {
        let mut catalog = Catalog::builtin();
        assert_eq!(
            catalog.add_manual("!F1234"),
            Err(CatalogError::NotAChannel("!F1234".to_string()))
        );
    }

    #[test]
    fn test_insert_replaces_by_name() {
        let mut catalog = Catalog::builtin();
        let before = catalog.names().len();

        catalog.insert(Isotope::builtin("Tc-99m", "!F999", 0.001917));

        assert_eq!(catalog.names().len(), before);
        assert_eq!(catalog.get("Tc-99m").unwrap().channel, "!F999");
    }

    #[test]
    fn test_merge_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[isotope]]\nname = \"Lu-177\"\nchannel = \"!F345\"\ndecay_per_min = 0.0000725\n\n\
             [[isotope]]\nname = \"*!F777\"\nchannel = \"!F777\"\n"
        )
        .unwrap();

        let mut catalog = Catalog::builtin();
        let merged = catalog.merge_file(file.path()).unwrap();

        assert_eq!(merged, 2);
        assert_eq!(catalog.get("Lu-177").unwrap().decay_per_min, Some(0.0000725));
        assert_eq!(catalog.get("*!F777").unwrap().decay_per_min, None);
    }

    #[test]
    fn test_merge_file_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[isotope]]\nname = 42\n").unwrap();

        let mut catalog = Catalog::builtin();
        assert!(catalog.merge_file(file.path()).is_err());
    }
}
