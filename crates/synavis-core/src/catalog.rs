//! Spawnable assets and built-in classes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What an asset loads as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Mesh,
    Material,
}

/// Asset registered at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCatalogEntry {
    /// Path handed to the loader
    pub source_path: String,
    pub kind: AssetKind,
}

/// Name → asset lookup, read-only once built
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    entries: BTreeMap<String, AssetCatalogEntry>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, AssetCatalogEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&AssetCatalogEntry> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parameter a built-in class accepts at spawn time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl SpawnParameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Engine class that can be instantiated synchronously
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub name: String,
    /// Empty when the class declares no parameter list
    #[serde(default)]
    pub parameters: Vec<SpawnParameter>,
}

impl ClassEntry {
    /// Whether a parameter may be applied; classes without a list accept any
    pub fn accepts(&self, parameter: &str) -> bool {
        self.parameters.is_empty() || self.parameters.iter().any(|p| p.name == parameter)
    }
}

/// Name → built-in class lookup, in registration order
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: Vec<ClassEntry>,
}

impl ClassTable {
    pub fn new(classes: Vec<ClassEntry>) -> Self {
        Self { classes }
    }

    pub fn lookup(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Everything `spawn` can resolve a name against
#[derive(Debug, Clone, Default)]
pub struct SpawnCatalog {
    pub assets: AssetCatalog,
    pub classes: ClassTable,
}

impl SpawnCatalog {
    /// Asset names first, then class names
    pub fn spawnable_names(&self) -> Vec<String> {
        self.assets
            .names()
            .chain(self.classes.names())
            .map(str::to_string)
            .collect()
    }
}
