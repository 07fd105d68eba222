use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::backup;
use crate::dictionary::{flatten, Dictionary, MergePolicy};
use crate::merge::{self, MergeOutcome};
use crate::sanity::{check_target, TargetKind};
use crate::substitute::{apply_with_fallback, SubstitutionMode, SubstitutionReport};

#[derive(Debug, Clone)]
pub struct PatchOptions {
    pub target: PathBuf,
    pub dictionary: PathBuf,
    pub pending: Option<PathBuf>,
    pub mode: SubstitutionMode,
    pub policy: MergePolicy,
    pub fallback: bool,
    pub backup_suffix: String,
    pub merge_backup_suffix: String,
}

#[derive(Debug, Clone)]
pub struct PatchSummary {
    pub target: PathBuf,
    pub backup: PathBuf,
    pub backup_created: bool,
    pub merge: Option<MergeOutcome>,
    pub dictionary_entries: usize,
    pub skipped_entries: usize,
    pub mode: SubstitutionMode,
    pub report: SubstitutionReport,
}

/// Patches the target from its pristine backup, creating it on the first run.
pub fn apply_patch(options: &PatchOptions) -> Result<PatchSummary> {
    let merge = match options.pending.as_deref() {
        Some(pending) => Some(merge::merge_files(
            &options.dictionary,
            pending,
            &options.merge_backup_suffix,
        )?),
        None => None,
    };

    let dictionary = Dictionary::load(&options.dictionary)?;
    let flat = flatten(&dictionary, options.policy)?;
    info!(
        "loaded {} entries from {}",
        flat.len(),
        options.dictionary.display()
    );

    let target = options.target.as_path();
    let backup_path = backup::backup_path_for(target, &options.backup_suffix);
    let kind = TargetKind::from_path(target);
    if !backup_path.exists() {
        let current = fs::read_to_string(target)
            .with_context(|| format!("failed to read target: {}", target.display()))?;
        check_target(&current, kind)
            .map_err(|reason| anyhow!("{} rejected: {}", target.display(), reason))?;
    }
    let backup_created = backup::ensure_backup(target, &backup_path)?;
    let pristine = backup::read_pristine(&backup_path)?;
    check_target(&pristine, kind)
        .map_err(|reason| anyhow!("backup {} rejected: {}", backup_path.display(), reason))?;

    let report = apply_with_fallback(&pristine, &flat, options.mode, options.fallback);
    if !report.is_success() {
        return Err(anyhow!(
            "no dictionary entry matched a quoted string in {} ({} keys tried)",
            target.display(),
            report.misses.len()
        ));
    }
    if report.used_fallback {
        warn!("patched with built-in terms only; check the dictionary");
    }

    commit(target, &backup_path, &report.text, kind)?;
    info!("patched {} ({} hits)", target.display(), report.hits);

    Ok(PatchSummary {
        target: target.to_path_buf(),
        backup: backup_path,
        backup_created,
        merge,
        dictionary_entries: flat.len(),
        skipped_entries: flat.warnings().len(),
        mode: options.mode,
        report,
    })
}

fn commit(target: &Path, backup_path: &Path, content: &str, kind: TargetKind) -> Result<()> {
    let outcome = backup::write_result(target, content).and_then(|_| {
        let written = fs::read_to_string(target)
            .with_context(|| format!("failed to re-read {}", target.display()))?;
        if written != content {
            return Err(anyhow!("written content differs from the patched text"));
        }
        check_target(&written, kind).map_err(|reason| anyhow!(reason))
    });

    let Err(err) = outcome else {
        return Ok(());
    };
    error!("write-back failed: {:#}", err);
    match backup::restore(target, backup_path) {
        Ok(()) => Err(err.context(format!(
            "patch of {} failed; original restored",
            target.display()
        ))),
        Err(restore_err) => Err(err.context(format!(
            "patch of {} failed and restore also failed: {:#}",
            target.display(),
            restore_err
        ))),
    }
}

pub fn restore_target(target: &Path, backup_suffix: &str) -> Result<PathBuf> {
    let backup_path = backup::backup_path_for(target, backup_suffix);
    backup::restore(target, &backup_path)?;
    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        options: PatchOptions,
    }

    fn fixture(script: &str, dictionary: &str) -> Fixture {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("main.js");
        let dictionary_path = dir.path().join("translations.json");
        fs::write(&target, script).expect("write target");
        fs::write(&dictionary_path, dictionary).expect("write dictionary");
        let options = PatchOptions {
            target,
            dictionary: dictionary_path,
            pending: None,
            mode: SubstitutionMode::Direct,
            policy: MergePolicy::LastWins,
            fallback: true,
            backup_suffix: backup::DEFAULT_SUFFIX.to_string(),
            merge_backup_suffix: ".bak".to_string(),
        };
        Fixture { _dir: dir, options }
    }

    const SCRIPT: &str = r#"var a = "File"; var b = "Edit";"#;
    const MENU: &str = r#"{"menu": {"File": "文件", "Edit": "编辑"}}"#;

    #[test]
    fn apply_patches_and_keeps_pristine_backup() {
        let fixture = fixture(SCRIPT, MENU);
        let summary = apply_patch(&fixture.options).expect("apply");
        assert!(summary.backup_created);
        assert_eq!(summary.report.hits, 2);
        assert_eq!(
            fs::read_to_string(&fixture.options.target).expect("read"),
            r#"var a = "文件"; var b = "编辑";"#
        );
        assert_eq!(fs::read_to_string(&summary.backup).expect("backup"), SCRIPT);
    }

    #[test]
    fn reapplying_replays_from_the_backup() {
        let mut fixture = fixture(SCRIPT, MENU);
        apply_patch(&fixture.options).expect("direct");

        fixture.options.mode = SubstitutionMode::Bilingual;
        let summary = apply_patch(&fixture.options).expect("bilingual");
        assert!(!summary.backup_created);
        assert_eq!(
            fs::read_to_string(&fixture.options.target).expect("read"),
            r#"var a = "File\n文件"; var b = "Edit\n编辑";"#
        );

        fixture.options.mode = SubstitutionMode::Direct;
        apply_patch(&fixture.options).expect("direct again");
        let first = fs::read_to_string(&fixture.options.target).expect("read");
        apply_patch(&fixture.options).expect("direct once more");
        let second = fs::read_to_string(&fixture.options.target).expect("read");
        assert_eq!(first, second);
    }

    #[test]
    fn pending_additions_are_merged_before_patching() {
        let mut fixture = fixture(SCRIPT, r#"{"menu": {"File": "文件"}}"#);
        let pending = fixture.options.dictionary.with_file_name("pending.json");
        fs::write(&pending, r#"{"menu": {"Edit": "编辑"}}"#).expect("write pending");
        fixture.options.pending = Some(pending);

        let summary = apply_patch(&fixture.options).expect("apply");
        assert!(matches!(
            summary.merge,
            Some(MergeOutcome::Merged { added: 1, .. })
        ));
        assert_eq!(summary.report.hits, 2);
    }

    #[test]
    fn no_match_fails_without_touching_target() {
        let mut fixture = fixture("const x = 1;", MENU);
        fixture.options.fallback = false;
        assert!(apply_patch(&fixture.options).is_err());
        assert_eq!(
            fs::read_to_string(&fixture.options.target).expect("read"),
            "const x = 1;"
        );
    }

    #[test]
    fn non_script_target_is_rejected_before_backup() {
        let fixture = fixture("just some words", MENU);
        assert!(apply_patch(&fixture.options).is_err());
        let backup =
            backup::backup_path_for(&fixture.options.target, &fixture.options.backup_suffix);
        assert!(!backup.exists());
    }

    #[test]
    fn failed_post_write_check_restores_the_original() {
        let pristine = r#"x(["var "])"#;
        let fixture = fixture(pristine, r#"{"k": {"var ": "变量"}}"#);
        let err = apply_patch(&fixture.options).expect_err("patched text is not a script");
        assert!(format!("{:#}", err).contains("original restored"));
        assert_eq!(
            fs::read_to_string(&fixture.options.target).expect("read"),
            pristine
        );
        let backup =
            backup::backup_path_for(&fixture.options.target, &fixture.options.backup_suffix);
        assert!(!backup.exists());
    }

    #[test]
    fn restore_target_brings_back_the_original() {
        let fixture = fixture(SCRIPT, MENU);
        apply_patch(&fixture.options).expect("apply");
        let backup = restore_target(&fixture.options.target, backup::DEFAULT_SUFFIX)
            .expect("restore");
        assert!(!backup.exists());
        assert_eq!(
            fs::read_to_string(&fixture.options.target).expect("read"),
            SCRIPT
        );
    }
}
