use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub mod backup;
pub mod detect;
pub mod dictionary;
pub mod error;
mod fallback;
pub mod locate;
pub mod logging;
pub mod merge;
pub mod patcher;
mod paths;
pub mod sanity;
pub mod settings;
pub mod substitute;
pub mod validate;

pub use dictionary::{Dictionary, FlatDictionary, MergePolicy};
pub use error::DictionaryError;
pub use merge::MergeOutcome;
pub use patcher::{PatchOptions, PatchSummary};
pub use substitute::{SubstitutionMode, SubstitutionReport};
pub use validate::{ValidationOptions, ValidationReport};

const MAX_LISTED: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub dictionary: Option<String>,
    pub pending: Option<String>,
    pub settings_path: Option<String>,
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub enum Command {
    Apply {
        mode: Option<SubstitutionMode>,
        target: Option<String>,
        policy: Option<MergePolicy>,
        no_merge: bool,
        no_fallback: bool,
    },
    Restore {
        target: Option<String>,
    },
    Validate,
    Fix,
    Merge,
    Detect {
        out: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub text: String,
    pub success: bool,
}

impl Output {
    fn ok(text: String) -> Self {
        Self {
            text,
            success: true,
        }
    }

    fn failed(text: String) -> Self {
        Self {
            text,
            success: false,
        }
    }
}

pub fn run(config: Config, command: Command) -> Result<Output> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let dictionary_path = config
        .dictionary
        .as_deref()
        .and_then(paths::expand_path)
        .unwrap_or_else(|| settings.dictionary_path.clone());
    let pending_path = config
        .pending
        .as_deref()
        .and_then(paths::expand_path)
        .unwrap_or_else(|| settings.pending_path.clone());

    match command {
        Command::Apply {
            mode,
            target,
            policy,
            no_merge,
            no_fallback,
        } => {
            let target = resolve_target(target.as_deref(), &settings)?;
            let options = PatchOptions {
                target,
                dictionary: dictionary_path,
                pending: (!no_merge).then_some(pending_path),
                mode: mode.unwrap_or(settings.mode),
                policy: policy.unwrap_or(settings.merge_policy),
                fallback: settings.fallback && !no_fallback,
                backup_suffix: settings.backup_suffix.clone(),
                merge_backup_suffix: settings.merge_backup_suffix.clone(),
            };
            let summary = patcher::apply_patch(&options)?;
            Ok(Output::ok(format_patch_summary(&summary, &config)))
        }
        Command::Restore { target } => {
            let target = resolve_target(target.as_deref(), &settings)?;
            let backup = patcher::restore_target(&target, &settings.backup_suffix)?;
            Ok(Output::ok(format!(
                "restored {} from {} (backup removed)",
                target.display(),
                backup.display()
            )))
        }
        Command::Validate => {
            let content = read_dictionary_source(&dictionary_path)?;
            let report = validate::validate_source(&content, &settings.validation);
            let text = format_validation(&dictionary_path, &report, &config);
            Ok(if report.is_valid() {
                Output::ok(text)
            } else {
                Output::failed(text)
            })
        }
        Command::Fix => run_fix(&dictionary_path, &settings, &config),
        Command::Merge => {
            let outcome = merge::merge_files(
                &dictionary_path,
                &pending_path,
                &settings.merge_backup_suffix,
            )?;
            Ok(Output::ok(format_merge(&outcome, &config)))
        }
        Command::Detect { out } => {
            let dictionary = Dictionary::load(&dictionary_path)?;
            let flat = dictionary::flatten(&dictionary, settings.merge_policy)?;
            let source_name = dictionary_path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| dictionary_path.display().to_string());
            let report = detect::build_report(&dictionary, &flat, &source_name);
            let out_path = out
                .as_deref()
                .and_then(paths::expand_path)
                .unwrap_or_else(|| settings.report_path.clone());
            detect::write_report(&out_path, &report)?;
            Ok(Output::ok(format_detect(&report, &out_path, &config)))
        }
    }
}

fn resolve_target(explicit: Option<&str>, settings: &settings::Settings) -> Result<PathBuf> {
    let explicit = explicit.and_then(paths::expand_path);
    locate::resolve_target(
        explicit.as_deref(),
        settings.target.as_deref(),
        &settings.target_candidates,
    )
}

fn read_dictionary_source(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(DictionaryError::NotFound(path.to_path_buf()).into());
    }
    fs::read_to_string(path)
        .with_context(|| format!("failed to read dictionary: {}", path.display()))
}

fn run_fix(path: &Path, settings: &settings::Settings, config: &Config) -> Result<Output> {
    let content = read_dictionary_source(path)?;
    let before = validate::validate_source(&content, &settings.validation);
    let value: serde_json::Value = serde_json::from_str(&content).map_err(|source| {
        DictionaryError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let outcome = validate::fix(&value, &settings.validation);

    let mut lines = vec![format!(
        "{}: {} issues before fixing",
        path.display(),
        before.issues.len()
    )];
    if outcome.changes.total() > 0 || before.stats.duplicate_keys > 0 {
        if outcome.dictionary.as_object().is_none_or(|map| map.is_empty()) {
            return Err(anyhow!(
                "fixing {} would leave no translations; file left unchanged",
                path.display()
            ));
        }
        let backup = backup::backup_path_for(path, &settings.merge_backup_suffix);
        fs::copy(path, &backup)
            .with_context(|| format!("failed to back up {}", path.display()))?;
        dictionary::write_json(path, &outcome.dictionary)?;
        let changes = &outcome.changes;
        lines.push(format!(
            "fixed: {} trimmed, {} entries removed, {} escapes replaced, {} categories removed",
            changes.trimmed,
            changes.removed_entries,
            changes.escapes_replaced,
            changes.removed_categories
        ));
        lines.push(format!("backup: {}", backup.display()));
    } else {
        lines.push("nothing to fix".to_string());
    }
    lines.push(format_validation(path, &outcome.report, config));

    let text = lines.join("\n");
    Ok(if outcome.report.is_valid() {
        Output::ok(text)
    } else {
        Output::failed(text)
    })
}

pub fn format_patch_summary(summary: &PatchSummary, config: &Config) -> String {
    let report = &summary.report;
    let mut lines = Vec::new();
    if let Some(merge) = summary.merge.as_ref() {
        lines.push(format_merge(merge, config));
    }
    lines.push(format!(
        "patched {} ({} mode)",
        summary.target.display(),
        summary.mode.as_str()
    ));
    let backup_state = if summary.backup_created {
        "created"
    } else {
        "reused"
    };
    lines.push(format!(
        "backup: {} ({})",
        summary.backup.display(),
        backup_state
    ));
    if report.used_fallback {
        lines.push(format!(
            "replaced: 0 of {} keys",
            report.misses.len() + report.errors.len()
        ));
        lines.push(format!(
            "warning: dictionary ({} entries) matched nothing; {} built-in terms were used",
            summary.dictionary_entries, report.hits
        ));
    } else {
        lines.push(format!(
            "replaced: {} of {} keys",
            report.hits,
            report.hits + report.misses.len() + report.errors.len()
        ));
    }
    if summary.skipped_entries > 0 {
        lines.push(format!(
            "skipped {} empty dictionary entries",
            summary.skipped_entries
        ));
    }
    if !config.quiet {
        push_listed(&mut lines, "not found", &report.misses, config.verbose);
        push_listed(&mut lines, "errors", &report.errors, true);
    }
    lines.join("\n")
}

pub fn format_validation(path: &Path, report: &ValidationReport, config: &Config) -> String {
    let stats = &report.stats;
    let mut lines = vec![
        format!(
            "{}: {}",
            path.display(),
            if report.is_valid() { "valid" } else { "invalid" }
        ),
        format!(
            "groups: {}, entries: {}, empty: {}, duplicates: {}, long: {}, escapes: {}",
            stats.total_groups,
            stats.total_entries,
            stats.empty_entries,
            stats.duplicate_keys,
            stats.long_translations,
            stats.special_chars
        ),
    ];
    if !config.quiet {
        push_listed(&mut lines, "issues", &report.issues, config.verbose);
    }
    lines.join("\n")
}

pub fn format_merge(outcome: &MergeOutcome, config: &Config) -> String {
    match outcome {
        MergeOutcome::Skipped { addition } => {
            format!("merge skipped: {} not found", addition.display())
        }
        MergeOutcome::Unchanged { addition, entries } => format!(
            "merge skipped: {} adds nothing ({} entries, {} categories)",
            addition.display(),
            entries.total_entries,
            entries.total_categories
        ),
        MergeOutcome::Merged {
            before,
            after,
            added,
            backup,
            conflicts,
        } => {
            let mut lines = vec![
                format!(
                    "merged: {} -> {} entries ({:+}), {} -> {} categories",
                    before.total_entries,
                    after.total_entries,
                    added,
                    before.total_categories,
                    after.total_categories
                ),
                format!("backup: {}", backup.display()),
            ];
            if !conflicts.is_empty() && !config.quiet {
                let described = conflicts
                    .iter()
                    .map(|conflict| {
                        format!(
                            "{} ({} -> {})",
                            conflict.path, conflict.previous, conflict.incoming
                        )
                    })
                    .collect::<Vec<_>>();
                push_listed(&mut lines, "type changes", &described, true);
            }
            lines.join("\n")
        }
    }
}

pub fn format_detect(report: &detect::UntranslatedReport, out: &Path, config: &Config) -> String {
    let mut lines = vec![format!(
        "untranslated: {} (report written to {})",
        report.statistics.total_missing,
        out.display()
    )];
    for (category, count) in &report.statistics.per_category {
        lines.push(format!("  {}: {}", category, count));
    }
    let coverage = report
        .statistics
        .coverage
        .iter()
        .map(|(bucket, percent)| format!("{} {:.1}%", bucket, percent))
        .collect::<Vec<_>>();
    lines.push(format!("coverage: {}", coverage.join(", ")));
    if config.verbose {
        for (category, entries) in &report.translations {
            if let Some(entries) = entries.as_object() {
                let keys = entries.keys().cloned().collect::<Vec<_>>();
                push_listed(&mut lines, category, &keys, true);
            }
        }
    }
    lines.join("\n")
}

fn push_listed(lines: &mut Vec<String>, label: &str, items: &[String], show_all: bool) {
    if items.is_empty() {
        return;
    }
    lines.push(format!("{} ({}):", label, items.len()));
    let limit = if show_all { items.len() } else { MAX_LISTED };
    for item in items.iter().take(limit) {
        lines.push(format!("  - {}", item));
    }
    if items.len() > limit {
        lines.push(format!("  ... {} more (use --verbose)", items.len() - limit));
    }
}
