use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use time::{format_description, OffsetDateTime};

use crate::dictionary::{Dictionary, FlatDictionary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownTerm {
    pub term: &'static str,
    pub category: &'static str,
}

const fn term(term: &'static str, category: &'static str) -> KnownTerm {
    KnownTerm { term, category }
}

pub const BASIC: &str = "basic";
pub const UI: &str = "ui";
pub const MENU: &str = "menu";

pub const KNOWN_TERMS: &[KnownTerm] = &[
    term("OK", BASIC),
    term("Cancel", BASIC),
    term("Yes", BASIC),
    term("No", BASIC),
    term("Close", BASIC),
    term("Apply", BASIC),
    term("Save", BASIC),
    term("Delete", BASIC),
    term("Error", BASIC),
    term("Warning", BASIC),
    term("Loading...", BASIC),
    term("Settings", UI),
    term("Preferences", UI),
    term("Search", UI),
    term("Back", UI),
    term("Next", UI),
    term("Done", UI),
    term("Reset", UI),
    term("Learn More", UI),
    term("Show Details", UI),
    term("File", MENU),
    term("Edit", MENU),
    term("View", MENU),
    term("Window", MENU),
    term("Help", MENU),
    term("Undo", MENU),
    term("Redo", MENU),
    term("Cut", MENU),
    term("Copy", MENU),
    term("Paste", MENU),
    term("Select All", MENU),
    term("Quit", MENU),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UntranslatedTerm {
    pub term: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageBucket {
    pub name: String,
    pub percent: f64,
}

pub fn detect(dictionary: &FlatDictionary, known: &[KnownTerm]) -> Vec<UntranslatedTerm> {
    known
        .iter()
        .filter(|known| !dictionary.contains_key(known.term))
        .map(|known| UntranslatedTerm {
            term: known.term.to_string(),
            category: known.category.to_string(),
        })
        .collect()
}

pub fn coverage(words: &[&str], dictionary: &FlatDictionary) -> f64 {
    if words.is_empty() {
        return 1.0;
    }
    let present = words
        .iter()
        .filter(|word| dictionary.contains_key(word))
        .count();
    present as f64 / words.len() as f64
}

pub fn coverage_buckets(dictionary: &FlatDictionary) -> Vec<CoverageBucket> {
    [BASIC, UI, MENU]
        .into_iter()
        .map(|bucket| {
            let words = KNOWN_TERMS
                .iter()
                .filter(|known| known.category == bucket)
                .map(|known| known.term)
                .collect::<Vec<_>>();
            CoverageBucket {
                name: bucket.to_string(),
                percent: (coverage(&words, dictionary) * 1000.0).round() / 10.0,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct UntranslatedReport {
    pub metadata: ReportMetadata,
    pub translations: Map<String, Value>,
    pub statistics: ReportStatistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub created_at: String,
    pub source_file: String,
    pub missing_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportStatistics {
    pub total_missing: usize,
    pub total_entries: usize,
    pub total_categories: usize,
    pub per_category: BTreeMap<String, usize>,
    pub coverage: BTreeMap<String, f64>,
}

pub fn build_report(
    dictionary: &Dictionary,
    flat: &FlatDictionary,
    source_name: &str,
) -> UntranslatedReport {
    let mut translations = Map::new();
    let mut per_category = BTreeMap::new();

    for (category, entries) in dictionary.categories() {
        for (key, value) in entries {
            let unresolved = match value.as_str() {
                Some(text) => text.trim().is_empty() || text == key,
                None => true,
            };
            if unresolved {
                add_missing(&mut translations, &mut per_category, category, key);
            }
        }
    }
    for missing in detect(flat, KNOWN_TERMS) {
        add_missing(
            &mut translations,
            &mut per_category,
            &missing.category,
            &missing.term,
        );
    }

    let total_missing = per_category.values().sum();
    let coverage = coverage_buckets(flat)
        .into_iter()
        .map(|bucket| (bucket.name, bucket.percent))
        .collect();
    let created_at = OffsetDateTime::now_utc()
        .format(&format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    UntranslatedReport {
        metadata: ReportMetadata {
            created_at,
            source_file: source_name.to_string(),
            missing_count: total_missing,
        },
        translations,
        statistics: ReportStatistics {
            total_missing,
            total_entries: dictionary.entry_count(),
            total_categories: dictionary.category_count(),
            per_category,
            coverage,
        },
    }
}

fn add_missing(
    translations: &mut Map<String, Value>,
    per_category: &mut BTreeMap<String, usize>,
    category: &str,
    key: &str,
) {
    let bucket = translations
        .entry(category.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(bucket) = bucket.as_object_mut() else {
        return;
    };
    if bucket
        .insert(key.to_string(), Value::String(String::new()))
        .is_none()
    {
        *per_category.entry(category.to_string()).or_insert(0) += 1;
    }
}

pub fn write_report(path: &Path, report: &UntranslatedReport) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create report dir: {}", dir.display()))?;
    }
    let mut content = serde_json::to_string_pretty(report)?;
    content.push('\n');
    fs::write(path, content)
        .with_context(|| format!("failed to write report: {}", path.display()))?;
    Ok(())
}
