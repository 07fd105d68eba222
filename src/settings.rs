use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backup;
use crate::dictionary::MergePolicy;
use crate::paths;
use crate::substitute::SubstitutionMode;
use crate::validate::ValidationOptions;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub dictionary_path: PathBuf,
    pub pending_path: PathBuf,
    pub report_path: PathBuf,
    pub target: Option<PathBuf>,
    pub target_candidates: Vec<String>,
    pub backup_suffix: String,
    pub merge_backup_suffix: String,
    pub mode: SubstitutionMode,
    pub fallback: bool,
    pub merge_policy: MergePolicy,
    pub validation: ValidationOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dictionary_path: PathBuf::from("translations.json"),
            pending_path: PathBuf::from("pending_translations.json"),
            report_path: PathBuf::from("untranslated.json"),
            target: None,
            target_candidates: Vec::new(),
            backup_suffix: backup::DEFAULT_SUFFIX.to_string(),
            merge_backup_suffix: ".bak".to_string(),
            mode: SubstitutionMode::Direct,
            fallback: true,
            merge_policy: MergePolicy::LastWins,
            validation: ValidationOptions::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    paths: Option<PathSettings>,
    backup: Option<BackupSettings>,
    apply: Option<ApplySettings>,
    validation: Option<ValidationSettings>,
    merge: Option<MergeSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct PathSettings {
    dictionary: Option<String>,
    pending: Option<String>,
    report: Option<String>,
    target: Option<String>,
    target_candidates: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct BackupSettings {
    suffix: Option<String>,
    merge_suffix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApplySettings {
    mode: Option<String>,
    fallback: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ValidationSettings {
    min_entries: Option<usize>,
    max_translation_len: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct MergeSettings {
    policy: Option<String>,
}

/// Layers, later wins: built-in defaults, `./settings.toml`,
/// `./settings.local.toml`, the per-user settings, then `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults)?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = paths::settings_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.is_file() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings
                .merge(parsed)
                .with_context(|| format!("invalid settings in {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(paths_section) = incoming.paths {
            if let Some(path) = paths_section.dictionary.as_deref().and_then(paths::expand_path) {
                self.dictionary_path = path;
            }
            if let Some(path) = paths_section.pending.as_deref().and_then(paths::expand_path) {
                self.pending_path = path;
            }
            if let Some(path) = paths_section.report.as_deref().and_then(paths::expand_path) {
                self.report_path = path;
            }
            if let Some(path) = paths_section.target.as_deref().and_then(paths::expand_path) {
                self.target = Some(path);
            }
            if let Some(candidates) = paths_section.target_candidates {
                self.target_candidates = candidates
                    .into_iter()
                    .filter(|candidate| !candidate.trim().is_empty())
                    .collect();
            }
        }
        if let Some(backup) = incoming.backup {
            if let Some(suffix) = backup.suffix {
                if !suffix.trim().is_empty() {
                    self.backup_suffix = suffix;
                }
            }
            if let Some(suffix) = backup.merge_suffix {
                if !suffix.trim().is_empty() {
                    self.merge_backup_suffix = suffix;
                }
            }
        }
        if let Some(apply) = incoming.apply {
            if let Some(mode) = apply.mode {
                self.mode = mode.parse().map_err(|err: String| anyhow!(err))?;
            }
            if let Some(fallback) = apply.fallback {
                self.fallback = fallback;
            }
        }
        if let Some(validation) = incoming.validation {
            if let Some(min) = validation.min_entries {
                self.validation.min_entries = min;
            }
            if let Some(max) = validation.max_translation_len {
                if max > 0 {
                    self.validation.max_translation_len = max;
                }
            }
        }
        if let Some(merge) = incoming.merge {
            if let Some(policy) = merge.policy {
                self.merge_policy = policy.parse().map_err(|err: String| anyhow!(err))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_come_from_embedded_settings() {
        let mut settings = Settings::default();
        let parsed: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML).expect("parse");
        settings.merge(parsed).expect("merge");
        assert_eq!(settings.dictionary_path, PathBuf::from("translations.json"));
        assert_eq!(settings.backup_suffix, ".backup");
        assert_eq!(settings.mode, SubstitutionMode::Direct);
        assert_eq!(settings.validation.min_entries, 10);
        assert_eq!(settings.target_candidates.len(), 2);
    }

    #[test]
    fn extra_settings_file_overrides_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[paths]
dictionary = "dict/zh.json"
target = "app/main.js"

[apply]
mode = "bilingual"
fallback = false

[merge]
policy = "strict"

[validation]
min_entries = 3
"#,
        )
        .expect("write settings");

        let settings = load_settings(Some(&path)).expect("load");
        assert_eq!(settings.dictionary_path, PathBuf::from("dict/zh.json"));
        assert_eq!(settings.target, Some(PathBuf::from("app/main.js")));
        assert_eq!(settings.mode, SubstitutionMode::Bilingual);
        assert!(!settings.fallback);
        assert_eq!(settings.merge_policy, MergePolicy::Strict);
        assert_eq!(settings.validation.min_entries, 3);
        assert_eq!(settings.validation.max_translation_len, 500);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[apply]\nmode = \"sideways\"\n").expect("write settings");
        assert!(load_settings(Some(&path)).is_err());
        assert!(load_settings(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
