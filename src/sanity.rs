use std::path::Path;

const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];
const SCRIPT_MARKERS: &[&str] = &[
    "function",
    "var ",
    "const ",
    "let ",
    "=>",
    "module.exports",
    "require(",
    "export ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Script,
    Text,
}

impl TargetKind {
    pub fn from_path(path: &Path) -> Self {
        let is_script = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                SCRIPT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);
        if is_script { Self::Script } else { Self::Text }
    }
}

pub fn check_target(content: &str, kind: TargetKind) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("file is empty".to_string());
    }
    if kind == TargetKind::Script && !SCRIPT_MARKERS.iter().any(|marker| content.contains(marker))
    {
        return Err("file does not look like a script".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_extension() {
        assert_eq!(TargetKind::from_path(Path::new("app/main.JS")), TargetKind::Script);
        assert_eq!(TargetKind::from_path(Path::new("bundle.cjs")), TargetKind::Script);
        assert_eq!(TargetKind::from_path(Path::new("strings.txt")), TargetKind::Text);
        assert_eq!(TargetKind::from_path(Path::new("README")), TargetKind::Text);
    }

    #[test]
    fn scripts_need_a_marker() {
        assert!(check_target("const a = 1;", TargetKind::Script).is_ok());
        assert!(check_target("x => x", TargetKind::Script).is_ok());
        assert!(check_target("plain words", TargetKind::Script).is_err());
        assert!(check_target("plain words", TargetKind::Text).is_ok());
        assert!(check_target("  \n", TargetKind::Text).is_err());
    }
}
