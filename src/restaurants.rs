//! # Restaurant Directory Module
//!
//! Static alias lookup loaded once at startup. The directory file is a JSON
//! array of alias groups; the first alias in each group is the canonical
//! name used as the order partition key:
//!
//! ```json
//! [["mizu", "mizu sushi"], ["chipotle", "chipotle mexican grill"]]
//! ```

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Sentinel category for restaurants the directory does not know
pub const MISCELLANEOUS: &str = "miscellaneous";

/// Lowercased alias -> canonical restaurant name
#[derive(Debug, Clone, Default)]
pub struct RestaurantDirectory {
    aliases: HashMap<String, String>,
    canonical: Vec<String>,
}

impl RestaurantDirectory {
    /// Build a directory from alias groups, first alias of each group canonical
    pub fn from_groups(groups: Vec<Vec<String>>) -> Self {
        let mut directory = Self::default();

        for group in groups {
            let mut names = group
                .iter()
                .map(|alias| alias.trim().to_lowercase())
                .filter(|alias| !alias.is_empty());

            let Some(canonical) = names.next() else {
                continue;
            };

            for alias in std::iter::once(canonical.clone()).chain(names) {
                match directory.aliases.get(&alias) {
                    Some(existing) if existing != &canonical => {
                        warn!(
                            alias = %alias,
                            kept = %existing,
                            ignored = %canonical,
                            "Alias listed under two restaurants"
                        );
                    }
                    Some(_) => {}
                    None => {
                        directory.aliases.insert(alias, canonical.clone());
                    }
                }
            }

            if !directory.canonical.contains(&canonical) {
                directory.canonical.push(canonical);
            }
        }

        directory
    }

    /// Parse a directory from the JSON alias-group format
    pub fn from_json(json: &str) -> Result<Self> {
        let groups: Vec<Vec<String>> =
            serde_json::from_str(json).context("Restaurant list must be an array of alias arrays")?;
        Ok(Self::from_groups(groups))
    }

    /// Load the directory file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read restaurant list {}", path.display()))?;
        let directory = Self::from_json(&json)?;
        info!(
            restaurants = directory.canonical.len(),
            aliases = directory.aliases.len(),
            path = %path.display(),
            "Restaurant directory loaded"
        );
        Ok(directory)
    }

    /// Canonical name for an alias, case-insensitive
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.aliases
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Canonical names in file order
    pub fn restaurants(&self) -> &[String] {
        &self.canonical
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}
