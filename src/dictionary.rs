use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::DictionaryError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    categories: Map<String, Value>,
}

impl Dictionary {
    pub fn load(path: &Path) -> Result<Self, DictionaryError> {
        let value = read_json(path)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DictionaryError> {
        let Value::Object(categories) = value else {
            return Err(DictionaryError::StructureInvalid(
                "top-level value is not an object".to_string(),
            ));
        };
        if categories.is_empty() {
            return Err(DictionaryError::StructureInvalid(
                "dictionary has no categories".to_string(),
            ));
        }
        for (name, entries) in &categories {
            if !entries.is_object() {
                return Err(DictionaryError::StructureInvalid(format!(
                    "category '{}' is not an object",
                    name
                )));
            }
        }
        Ok(Self { categories })
    }

    pub fn save(&self, path: &Path) -> Result<(), DictionaryError> {
        write_json(path, &self.to_value())
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.categories.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.categories)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
        self.categories
            .iter()
            .filter_map(|(name, entries)| entries.as_object().map(|map| (name.as_str(), map)))
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn entry_count(&self) -> usize {
        self.categories()
            .map(|(_, entries)| entries.values().filter(|value| value.is_string()).count())
            .sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    #[default]
    LastWins,
    Strict,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastWins => "last-wins",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last-wins" | "last_wins" | "permissive" => Ok(Self::LastWins),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown merge policy '{}' (expected last-wins or strict)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlatDictionary {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
    warnings: Vec<String>,
}

impl FlatDictionary {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut flat = Self::default();
        for (key, value) in pairs {
            flat.insert(key.into(), value.into());
        }
        flat
    }

    /// Inserts or overwrites an entry. An overwritten key keeps its original
    /// position.
    pub fn insert(&mut self, key: String, value: String) -> Option<String> {
        if let Some(&position) = self.index.get(&key) {
            let slot = &mut self.entries[position].1;
            return Some(std::mem::replace(slot, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

pub fn flatten(
    dictionary: &Dictionary,
    policy: MergePolicy,
) -> Result<FlatDictionary, DictionaryError> {
    let mut flat = FlatDictionary::default();
    let mut owners: HashMap<String, String> = HashMap::new();

    for (category, entries) in dictionary.categories() {
        for (key, value) in entries {
            let translated = match value.as_str() {
                Some(text) if !text.trim().is_empty() => text,
                _ => {
                    let message = format!(
                        "skipped '{}' in '{}': empty or non-string value",
                        key, category
                    );
                    warn!("{}", message);
                    flat.warnings.push(message);
                    continue;
                }
            };

            if let Some(previous) = flat.get(key) {
                if previous != translated {
                    let first = owners.get(key).cloned().unwrap_or_default();
                    if policy == MergePolicy::Strict {
                        return Err(DictionaryError::Collision {
                            key: key.clone(),
                            first,
                            second: category.to_string(),
                        });
                    }
                    debug!("'{}' from '{}' overrides '{}'", key, category, first);
                }
            }
            flat.insert(key.clone(), translated.to_string());
            owners.insert(key.clone(), category.to_string());
        }
    }

    Ok(flat)
}

pub(crate) fn read_json(path: &Path) -> Result<Value, DictionaryError> {
    let content = fs::read_to_string(path).map_err(|err| io_error(path, err))?;
    serde_json::from_str(&content).map_err(|source| DictionaryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_json(path: &Path, value: &Value) -> Result<(), DictionaryError> {
    let mut content = serde_json::to_string_pretty(value).map_err(|source| {
        DictionaryError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    content.push('\n');
    fs::write(path, content).map_err(|source| DictionaryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn io_error(path: &Path, err: std::io::Error) -> DictionaryError {
    if err.kind() == ErrorKind::NotFound {
        DictionaryError::NotFound(PathBuf::from(path))
    } else {
        DictionaryError::Io {
            path: path.to_path_buf(),
            source: err,
        }
    }
}
