use anyhow::{anyhow, Result};
use globset::GlobBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::paths;

/// Picks the file to patch: an explicit path, then the configured target,
/// then the first candidate that exists. A candidate's final component may be
/// a glob matched against the files of its directory.
pub fn resolve_target(
    explicit: Option<&Path>,
    configured: Option<&Path>,
    candidates: &[String],
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!("target file not found: {}", path.display()));
    }
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        debug!("configured target missing: {}", path.display());
    }

    for raw in candidates {
        if let Some(found) = match_candidate(raw)? {
            debug!("target candidate '{}' matched {}", raw, found.display());
            return Ok(found);
        }
    }

    let mut tried = Vec::new();
    if let Some(path) = configured {
        tried.push(path.display().to_string());
    }
    tried.extend(candidates.iter().cloned());
    if tried.is_empty() {
        return Err(anyhow!(
            "no target file given; pass --target or set paths.target"
        ));
    }
    Err(anyhow!("target file not found (tried: {})", tried.join(", ")))
}

fn match_candidate(raw: &str) -> Result<Option<PathBuf>> {
    let Some(path) = paths::expand_path(raw) else {
        return Ok(None);
    };
    let Some(name) = path.file_name().and_then(|value| value.to_str()) else {
        return Ok(None);
    };
    if !is_glob(name) {
        return Ok(path.is_file().then_some(path));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let matcher = GlobBuilder::new(name)
        .literal_separator(true)
        .build()
        .map_err(|err| anyhow!("invalid target pattern '{}': {}", raw, err))?
        .compile_matcher();

    let Ok(entries) = fs::read_dir(&dir) else {
        return Ok(None);
    };
    let mut matches = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|candidate| candidate.is_file())
        .filter(|candidate| {
            candidate
                .file_name()
                .and_then(|value| value.to_str())
                .map(|file_name| matcher.is_match(file_name))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();
    matches.sort();
    Ok(matches.into_iter().next())
}

fn is_glob(value: &str) -> bool {
    value.contains(['*', '?', '[', '{'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn explicit_target_must_exist() {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("main.js");
        assert!(resolve_target(Some(&target), None, &[]).is_err());
        fs::write(&target, "const a = 1;").expect("write");
        assert_eq!(resolve_target(Some(&target), None, &[]).expect("resolve"), target);
    }

    #[test]
    fn glob_candidate_matches_first_file_by_name() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("b.js"), "const b = 1;").expect("write");
        fs::write(dir.path().join("a.js"), "const a = 1;").expect("write");
        fs::write(dir.path().join("a.js.backup"), "const a = 1;").expect("write");

        let pattern = format!("{}/*.js", dir.path().display());
        let missing = dir.path().join("nope.js");
        let found = resolve_target(None, Some(&missing), &[pattern]).expect("resolve");
        assert_eq!(found, dir.path().join("a.js"));
    }

    #[test]
    fn nothing_found_lists_what_was_tried() {
        let dir = tempdir().expect("tempdir");
        let pattern = format!("{}/*.mjs", dir.path().display());
        let err = resolve_target(None, None, &[pattern.clone()]).expect_err("missing");
        assert!(err.to_string().contains(&pattern));
        assert!(resolve_target(None, None, &[]).is_err());
    }
}
