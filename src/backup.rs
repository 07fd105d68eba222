use anyhow::{anyhow, Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

pub const DEFAULT_SUFFIX: &str = ".backup";

pub fn backup_path_for(target: &Path, suffix: &str) -> PathBuf {
    let suffix = if suffix.is_empty() { DEFAULT_SUFFIX } else { suffix };
    let mut name = OsString::from(target.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Returns `true` when a new backup was written; an existing one is never overwritten.
pub fn ensure_backup(target: &Path, backup: &Path) -> Result<bool> {
    if backup.exists() {
        return Ok(false);
    }
    let metadata = fs::metadata(target)
        .with_context(|| format!("failed to read file metadata: {}", target.display()))?;
    if !metadata.is_file() {
        return Err(anyhow!("backup source is not a file: {}", target.display()));
    }
    fs::copy(target, backup).with_context(|| {
        format!(
            "failed to copy backup from {} to {}",
            target.display(),
            backup.display()
        )
    })?;
    info!("created backup {}", backup.display());
    Ok(true)
}

pub fn write_result(target: &Path, content: &str) -> Result<()> {
    let dir = target
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("failed to write temp file for {}", target.display()))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("failed to flush temp file for {}", target.display()))?;
    if let Ok(metadata) = fs::metadata(target) {
        let _ = fs::set_permissions(temp.path(), metadata.permissions());
    }
    temp.persist(target)
        .map_err(|err| anyhow!("failed to replace {}: {}", target.display(), err.error))?;
    Ok(())
}

pub fn restore(target: &Path, backup: &Path) -> Result<()> {
    if !backup.is_file() {
        return Err(anyhow!("no backup found at {}", backup.display()));
    }
    fs::copy(backup, target).with_context(|| {
        format!(
            "failed to restore {} from {}",
            target.display(),
            backup.display()
        )
    })?;
    fs::remove_file(backup)
        .with_context(|| format!("failed to remove backup: {}", backup.display()))?;
    info!("restored {} from backup", target.display());
    Ok(())
}

pub fn read_pristine(backup: &Path) -> Result<String> {
    fs::read_to_string(backup)
        .with_context(|| format!("failed to read backup: {}", backup.display()))
}
