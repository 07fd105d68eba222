use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::backup;
use crate::dictionary::{read_json, write_json};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntryStats {
    pub total_entries: usize,
    pub total_categories: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeConflict {
    pub path: String,
    pub previous: &'static str,
    pub incoming: &'static str,
}

#[derive(Debug, Clone)]
pub enum MergeOutcome {
    Skipped {
        addition: PathBuf,
    },
    Unchanged {
        addition: PathBuf,
        entries: EntryStats,
    },
    Merged {
        before: EntryStats,
        after: EntryStats,
        added: i64,
        backup: PathBuf,
        conflicts: Vec<MergeConflict>,
    },
}

pub fn deep_merge(primary: Value, addition: &Value) -> (Value, Vec<MergeConflict>) {
    let mut conflicts = Vec::new();
    let merged = merge_value(primary, addition, "", &mut conflicts);
    (merged, conflicts)
}

fn merge_value(
    primary: Value,
    addition: &Value,
    path: &str,
    conflicts: &mut Vec<MergeConflict>,
) -> Value {
    match (primary, addition) {
        (Value::Object(mut base), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                match base.get_mut(key) {
                    Some(slot) => {
                        let existing = slot.take();
                        *slot = merge_value(existing, value, &child_path, conflicts);
                    }
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(base)
        }
        (existing, incoming) => {
            if existing.is_object() != incoming.is_object() {
                let conflict = MergeConflict {
                    path: path.to_string(),
                    previous: type_name(&existing),
                    incoming: type_name(incoming),
                };
                warn!(
                    "merge replaces {} with {} at '{}'",
                    conflict.previous, conflict.incoming, conflict.path
                );
                conflicts.push(conflict);
            }
            incoming.clone()
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn count_entries(value: &Value) -> EntryStats {
    let total_categories = value
        .as_object()
        .map(|map| map.values().filter(|child| child.is_object()).count())
        .unwrap_or(0);
    EntryStats {
        total_entries: count_string_leaves(value),
        total_categories,
    }
}

fn count_string_leaves(value: &Value) -> usize {
    match value {
        Value::String(_) => 1,
        Value::Object(map) => map.values().map(count_string_leaves).sum(),
        Value::Array(items) => items.iter().map(count_string_leaves).sum(),
        _ => 0,
    }
}

/// A merge that changes nothing leaves both the primary and its backup untouched.
pub fn merge_files(primary: &Path, addition: &Path, backup_suffix: &str) -> Result<MergeOutcome> {
    if !addition.is_file() {
        info!("no pending additions at {}", addition.display());
        return Ok(MergeOutcome::Skipped {
            addition: addition.to_path_buf(),
        });
    }

    let base = read_json(primary)?;
    let incoming = read_json(addition)?;

    let before = count_entries(&base);
    let (merged, conflicts) = deep_merge(base.clone(), &incoming);
    if merged == base {
        info!(
            "{} already contains everything in {}",
            primary.display(),
            addition.display()
        );
        return Ok(MergeOutcome::Unchanged {
            addition: addition.to_path_buf(),
            entries: before,
        });
    }
    let after = count_entries(&merged);

    let backup = backup::backup_path_for(primary, backup_suffix);
    fs::copy(primary, &backup).with_context(|| {
        format!(
            "failed to back up {} to {}",
            primary.display(),
            backup.display()
        )
    })?;
    write_json(primary, &merged)?;

    let added = after.total_entries as i64 - before.total_entries as i64;
    info!(
        "merged {} into {} ({:+} entries)",
        addition.display(),
        primary.display(),
        added
    );
    Ok(MergeOutcome::Merged {
        before,
        after,
        added,
        backup,
        conflicts,
    })
}
