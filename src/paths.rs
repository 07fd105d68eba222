use std::path::{Path, PathBuf};

const BASE_DIR_ENV: &str = "BUNDLE_LOCALIZER_DIR";

pub(crate) fn settings_dir() -> Option<PathBuf> {
    if let Some(dir) = base_dir_override() {
        return Some(dir);
    }
    env_home().map(|home| Path::new(&home).join(".bundle-localizer"))
}

pub(crate) fn expand_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(normalize_path(PathBuf::from(expand_tilde(trimmed))))
}

fn base_dir_override() -> Option<PathBuf> {
    std::env::var(BASE_DIR_ENV)
        .ok()
        .and_then(|value| expand_path(&value))
}

fn normalize_path(path: PathBuf) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        normalized.push(component.as_os_str());
    }
    normalized
}

fn expand_tilde(value: &str) -> String {
    if value == "~" {
        return env_home().unwrap_or_else(|| value.to_string());
    }
    if let Some(stripped) = value.strip_prefix("~/") {
        if let Some(home) = env_home() {
            return Path::new(&home).join(stripped).to_string_lossy().to_string();
        }
    }
    value.to_string()
}

fn env_home() -> Option<String> {
    for name in ["HOME", "USERPROFILE"] {
        if let Ok(home) = std::env::var(name) {
            let home = home.trim();
            if !home.is_empty() {
                return Some(home.to_string());
            }
        }
    }
    None
}
