use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

pub const DEFAULT_MIN_ENTRIES: usize = 10;
pub const DEFAULT_MAX_TRANSLATION_LEN: usize = 500;

const ESCAPE_SEQUENCES: [&str; 3] = ["\\n", "\\t", "\\r"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    pub min_entries: usize,
    pub max_translation_len: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            min_entries: DEFAULT_MIN_ENTRIES,
            max_translation_len: DEFAULT_MAX_TRANSLATION_LEN,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub total_groups: usize,
    pub total_entries: usize,
    pub empty_entries: usize,
    pub duplicate_keys: usize,
    pub long_translations: usize,
    pub special_chars: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<String>,
    pub stats: ValidationStats,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Duplicate keys are only visible to [`validate_source`].
pub fn validate(value: &Value, options: &ValidationOptions) -> ValidationReport {
    validate_with_pairs(value, &[], options)
}

pub fn validate_source(content: &str, options: &ValidationOptions) -> ValidationReport {
    let value = match serde_json::from_str::<Value>(content) {
        Ok(value) => value,
        Err(err) => {
            return ValidationReport {
                issues: vec![format!("invalid JSON: {}", err)],
                stats: ValidationStats::default(),
            };
        }
    };
    let pairs = serde_json::from_str::<KeyScan>(content)
        .map(|scan| scan.pairs)
        .unwrap_or_default();
    validate_with_pairs(&value, &pairs, options)
}

fn validate_with_pairs(
    value: &Value,
    raw_pairs: &[(String, String)],
    options: &ValidationOptions,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let Some(categories) = value.as_object() else {
        report
            .issues
            .push("top-level value is not an object".to_string());
        return report;
    };
    if categories.is_empty() {
        report.issues.push("dictionary has no categories".to_string());
        return report;
    }

    for (category, entries) in categories {
        let Some(entries) = entries.as_object() else {
            report
                .issues
                .push(format!("category '{}' is not an object", category));
            continue;
        };
        report.stats.total_groups += 1;
        for (key, value) in entries {
            report.stats.total_entries += 1;
            check_entry(category, key, value, options, &mut report);
        }
    }

    let mut seen = HashSet::new();
    for (category, key) in raw_pairs {
        if !seen.insert((category.as_str(), key.as_str())) {
            report.stats.duplicate_keys += 1;
        }
    }
    if report.stats.duplicate_keys > 0 {
        report.issues.push(format!(
            "found {} duplicate keys within the same category",
            report.stats.duplicate_keys
        ));
    }

    if report.stats.total_entries < options.min_entries {
        report.issues.push(format!(
            "too few translations: {} (minimum {})",
            report.stats.total_entries, options.min_entries
        ));
    }

    report
}

fn check_entry(
    category: &str,
    key: &str,
    value: &Value,
    options: &ValidationOptions,
    report: &mut ValidationReport,
) {
    if key.trim().is_empty() {
        report.issues.push(format!("[{}] empty key", category));
        report.stats.empty_entries += 1;
    }

    let text = match value.as_str() {
        Some(text) if !text.trim().is_empty() => text,
        _ => {
            report.issues.push(format!(
                "[{}] \"{}\" has an empty or non-string translation",
                category, key
            ));
            report.stats.empty_entries += 1;
            return;
        }
    };

    if text.chars().count() > options.max_translation_len {
        report.issues.push(format!(
            "[{}] \"{}\" translation exceeds {} characters",
            category, key, options.max_translation_len
        ));
        report.stats.long_translations += 1;
    }

    if contains_escape_sequence(text) {
        report.issues.push(format!(
            "[{}] \"{}\" translation contains a literal escape sequence",
            category, key
        ));
        report.stats.special_chars += 1;
    }
}

fn contains_escape_sequence(text: &str) -> bool {
    ESCAPE_SEQUENCES.iter().any(|seq| text.contains(seq))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixStats {
    pub trimmed: usize,
    pub removed_entries: usize,
    pub escapes_replaced: usize,
    pub removed_categories: usize,
}

impl FixStats {
    pub fn total(&self) -> usize {
        self.trimmed + self.removed_entries + self.escapes_replaced + self.removed_categories
    }
}

#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub dictionary: Value,
    pub changes: FixStats,
    pub report: ValidationReport,
}

pub fn fix(value: &Value, options: &ValidationOptions) -> FixOutcome {
    let mut changes = FixStats::default();
    let mut fixed = Map::new();

    if let Some(categories) = value.as_object() {
        for (category, entries) in categories {
            let Some(entries) = entries.as_object() else {
                changes.removed_categories += 1;
                continue;
            };
            let mut kept = Map::new();
            for (key, value) in entries {
                let trimmed_key = key.trim();
                let Some(text) = value.as_str() else {
                    changes.removed_entries += 1;
                    continue;
                };
                if trimmed_key.is_empty() || text.trim().is_empty() {
                    changes.removed_entries += 1;
                    continue;
                }

                let mut repaired = text.to_string();
                if contains_escape_sequence(&repaired) {
                    for seq in ESCAPE_SEQUENCES {
                        repaired = repaired.replace(seq, " ");
                    }
                    changes.escapes_replaced += 1;
                }
                let trimmed = repaired.trim();
                if trimmed_key != key.as_str() || trimmed != repaired {
                    changes.trimmed += 1;
                }
                if kept
                    .insert(trimmed_key.to_string(), Value::String(trimmed.to_string()))
                    .is_some()
                {
                    warn!(
                        "[{}] \"{}\" collapsed onto an existing key after trimming",
                        category, trimmed_key
                    );
                    changes.removed_entries += 1;
                }
            }
            if kept.is_empty() {
                changes.removed_categories += 1;
                continue;
            }
            fixed.insert(category.clone(), Value::Object(kept));
        }
    }

    let dictionary = Value::Object(fixed);
    let report = validate(&dictionary, options);
    FixOutcome {
        dictionary,
        changes,
        report,
    }
}

struct KeyScan {
    pairs: Vec<(String, String)>,
}

struct CategoryKeys(Vec<String>);

macro_rules! ignore_scalars {
    ($de:lifetime, $empty:expr) => {
        fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
            Ok($empty)
        }
        fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
            Ok($empty)
        }
        fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
            Ok($empty)
        }
        fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
            Ok($empty)
        }
        fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
            Ok($empty)
        }
        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok($empty)
        }
        fn visit_seq<A: SeqAccess<$de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok($empty)
        }
    };
}

impl<'de> Deserialize<'de> for KeyScan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KeyScanVisitor)
    }
}

struct KeyScanVisitor;

impl<'de> Visitor<'de> for KeyScanVisitor {
    type Value = KeyScan;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a translation dictionary")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut pairs = Vec::new();
        while let Some(category) = map.next_key::<String>()? {
            let CategoryKeys(keys) = map.next_value()?;
            pairs.extend(keys.into_iter().map(|key| (category.clone(), key)));
        }
        Ok(KeyScan { pairs })
    }

    ignore_scalars!('de, KeyScan { pairs: Vec::new() });
}

impl<'de> Deserialize<'de> for CategoryKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CategoryKeysVisitor)
    }
}

struct CategoryKeysVisitor;

impl<'de> Visitor<'de> for CategoryKeysVisitor {
    type Value = CategoryKeys;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a category object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut keys = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            map.next_value::<IgnoredAny>()?;
            keys.push(key);
        }
        Ok(CategoryKeys(keys))
    }

    ignore_scalars!('de, CategoryKeys(Vec::new()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn relaxed() -> ValidationOptions {
        ValidationOptions {
            min_entries: 0,
            ..ValidationOptions::default()
        }
    }

    #[test]
    fn structural_problems_are_invalid() {
        let options = ValidationOptions::default();
        for value in [json!({}), json!({"menu": ["File"]}), json!([1, 2])] {
            let report = validate(&value, &options);
            assert!(!report.is_valid());
            assert!(!report.issues.is_empty());
        }
    }

    #[test]
    fn entry_problems_are_counted() {
        let long = "x".repeat(501);
        let value = json!({
            "menu": {
                "": "空",
                "File": "",
                "Edit": 5,
                "View": long,
                "Help": "帮助\\n说明"
            }
        });
        let report = validate(&value, &relaxed());
        assert_eq!(report.stats.total_groups, 1);
        assert_eq!(report.stats.total_entries, 5);
        assert_eq!(report.stats.empty_entries, 3);
        assert_eq!(report.stats.long_translations, 1);
        assert_eq!(report.stats.special_chars, 1);
        assert_eq!(report.issues.len(), 5);
    }

    #[test]
    fn same_key_in_different_categories_is_not_a_duplicate() {
        let source = r#"{"dialog": {"OK": "好"}, "buttons": {"OK": "确定"}}"#;
        let report = validate_source(source, &relaxed());
        assert_eq!(report.stats.duplicate_keys, 0);
        assert!(report.is_valid());
    }

    #[test]
    fn duplicate_keys_in_one_category_are_reported_once() {
        let source = r#"{"menu": {"File": "文件", "File": "档案", "Edit": "编辑", "Edit": "编"}}"#;
        let report = validate_source(source, &relaxed());
        assert_eq!(report.stats.duplicate_keys, 2);
        let duplicate_issues = report
            .issues
            .iter()
            .filter(|issue| issue.contains("duplicate"))
            .count();
        assert_eq!(duplicate_issues, 1);
    }

    #[test]
    fn coverage_minimum_is_enforced() {
        let value = json!({"menu": {"File": "文件"}});
        let report = validate(&value, &ValidationOptions::default());
        assert!(!report.is_valid());
        assert!(report.issues[0].contains("too few translations"));
    }

    #[test]
    fn malformed_source_is_a_single_issue() {
        let report = validate_source("{\"menu\":", &relaxed());
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].starts_with("invalid JSON"));
    }

    #[test]
    fn fix_repairs_mechanical_problems() {
        let value = json!({
            "menu": {" File ": " 文件 ", "Edit": "", "Help": "帮助\\n说明", "Quit": 1},
            "broken": "nope",
            "empty": {"": "x"}
        });
        let outcome = fix(&value, &relaxed());
        assert_eq!(
            outcome.dictionary,
            json!({"menu": {"File": "文件", "Help": "帮助 说明"}})
        );
        assert_eq!(outcome.changes.trimmed, 1);
        assert_eq!(outcome.changes.removed_entries, 3);
        assert_eq!(outcome.changes.escapes_replaced, 1);
        assert_eq!(outcome.changes.removed_categories, 2);
        assert!(outcome.report.is_valid());
    }

    #[test]
    fn fix_counts_keys_that_collapse_after_trimming() {
        let value = json!({"menu": {" File ": "文件", "File": "档案", "Edit": "编辑"}});
        let outcome = fix(&value, &relaxed());
        assert_eq!(
            outcome.dictionary,
            json!({"menu": {"File": "档案", "Edit": "编辑"}})
        );
        assert_eq!(outcome.changes.removed_entries, 1);
        assert_eq!(outcome.changes.trimmed, 1);
    }
}
