use regex::{Captures, Regex};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::dictionary::FlatDictionary;
use crate::fallback;

pub const BILINGUAL_SEPARATOR: &str = "\\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubstitutionMode {
    #[default]
    Direct,
    Bilingual,
}

impl SubstitutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Bilingual => "bilingual",
        }
    }
}

impl FromStr for SubstitutionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct" | "replace" => Ok(Self::Direct),
            "bilingual" | "dual" => Ok(Self::Bilingual),
            other => Err(format!(
                "unknown mode '{}' (expected direct or bilingual)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubstitutionReport {
    pub text: String,
    pub hits: usize,
    pub misses: Vec<String>,
    pub errors: Vec<String>,
    pub used_fallback: bool,
}

impl SubstitutionReport {
    pub fn is_success(&self) -> bool {
        self.hits > 0
    }
}

/// Replaces every quoted literal whose content equals a dictionary key.
///
/// Keys are tried longest first. A key matches only a whole `"..."` or
/// `'...'` literal, and the quote character is kept.
pub fn apply(
    text: &str,
    dictionary: &FlatDictionary,
    mode: SubstitutionMode,
) -> SubstitutionReport {
    let mut entries = dictionary.iter().collect::<Vec<_>>();
    entries.sort_by_key(|(original, _)| std::cmp::Reverse(original.chars().count()));

    let mut report = SubstitutionReport {
        text: text.to_string(),
        ..SubstitutionReport::default()
    };
    for (original, translated) in entries {
        match substitute_literal(&report.text, original, translated, mode) {
            Ok(Some(next)) => {
                report.hits += 1;
                report.text = next;
            }
            Ok(None) => report.misses.push(original.to_string()),
            Err(err) => {
                debug!("substitution failed for '{}': {}", original, err);
                report.errors.push(format!("{}: {}", original, err));
            }
        }
    }
    report
}

/// Runs [`apply`] and, when nothing matched, retries with the built-in
/// fallback dictionary. `misses` always lists the caller's dictionary keys;
/// `hits` counts whichever run produced the text.
pub fn apply_with_fallback(
    text: &str,
    dictionary: &FlatDictionary,
    mode: SubstitutionMode,
    allow_fallback: bool,
) -> SubstitutionReport {
    let report = apply(text, dictionary, mode);
    if report.is_success() || !allow_fallback {
        return report;
    }

    warn!(
        "no dictionary entry matched ({} keys); retrying with {} built-in terms",
        dictionary.len(),
        fallback::TERMS.len()
    );
    let mut retry = apply(text, &fallback::dictionary(), mode);
    let mut errors = report.errors;
    errors.append(&mut retry.errors);
    SubstitutionReport {
        text: retry.text,
        hits: retry.hits,
        misses: report.misses,
        errors,
        used_fallback: true,
    }
}

fn substitute_literal(
    text: &str,
    original: &str,
    translated: &str,
    mode: SubstitutionMode,
) -> Result<Option<String>, String> {
    if original.is_empty() {
        return Err("empty key".to_string());
    }
    let escaped = regex::escape(original);
    let pattern =
        Regex::new(&format!(r#""{escaped}"|'{escaped}'"#)).map_err(|err| err.to_string())?;

    let inner = match mode {
        SubstitutionMode::Direct => translated.to_string(),
        SubstitutionMode::Bilingual => format!("{original}{BILINGUAL_SEPARATOR}{translated}"),
    };
    // A closure replacer takes `inner` verbatim, so `$` is never expanded.
    let replaced = pattern.replace_all(text, |caps: &Captures<'_>| {
        let quote = caps[0].chars().next().unwrap_or('"');
        format!("{quote}{inner}{quote}")
    });

    if replaced == text {
        Ok(None)
    } else {
        Ok(Some(replaced.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> FlatDictionary {
        FlatDictionary::from_pairs([("File", "文件"), ("Edit", "编辑")])
    }

    #[test]
    fn direct_mode_replaces_quoted_literals() {
        let report = apply(
            r#"var a = "File"; var b = "Edit";"#,
            &menu(),
            SubstitutionMode::Direct,
        );
        assert_eq!(report.text, r#"var a = "文件"; var b = "编辑";"#);
        assert_eq!(report.hits, 2);
        assert!(report.misses.is_empty());
        assert!(report.errors.is_empty());
    }

    #[test]
    fn bilingual_mode_keeps_original_and_separator() {
        let report = apply(
            r#"var a = "File"; var b = "Edit";"#,
            &menu(),
            SubstitutionMode::Bilingual,
        );
        assert_eq!(report.text, r#"var a = "File\n文件"; var b = "Edit\n编辑";"#);
        assert_eq!(report.hits, 2);
    }

    #[test]
    fn single_quotes_are_preserved_and_mixed_quotes_ignored() {
        let report = apply(
            r#"a('File'); b("File'); c(`File`); d("Filer");"#,
            &menu(),
            SubstitutionMode::Direct,
        );
        assert_eq!(report.text, r#"a('文件'); b("File'); c(`File`); d("Filer");"#);
        assert_eq!(report.hits, 1);
        assert_eq!(report.misses, vec!["Edit".to_string()]);
    }

    #[test]
    fn longer_keys_are_applied_first() {
        let dictionary = FlatDictionary::from_pairs([("Save", "保存"), ("Save As", "另存为")]);
        let report = apply(
            r#"["Save As", "Save"]"#,
            &dictionary,
            SubstitutionMode::Bilingual,
        );
        assert_eq!(report.text, r#"["Save As\n另存为", "Save\n保存"]"#);
    }

    #[test]
    fn metacharacters_and_dollar_signs_are_literal() {
        let dictionary = FlatDictionary::from_pairs([("Cost ($1.00)?", "价格 $1")]);
        let text = r#"x = "Cost ($1.00)?"; y = "Cost (X1.00)";"#;

        let direct = apply(text, &dictionary, SubstitutionMode::Direct);
        assert_eq!(direct.text, r#"x = "价格 $1"; y = "Cost (X1.00)";"#);

        let bilingual = apply(text, &dictionary, SubstitutionMode::Bilingual);
        assert_eq!(
            bilingual.text,
            r#"x = "Cost ($1.00)?\n价格 $1"; y = "Cost (X1.00)";"#
        );
    }

    #[test]
    fn replaying_on_pristine_text_is_deterministic() {
        let pristine = r#"menu("File", 'Edit', "Help")"#;
        let first = apply(pristine, &menu(), SubstitutionMode::Direct);
        let second = apply(pristine, &menu(), SubstitutionMode::Direct);
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn no_match_reports_every_key_as_missed() {
        let report = apply("let x = 1;", &menu(), SubstitutionMode::Direct);
        assert_eq!(report.hits, 0);
        assert_eq!(report.misses.len(), 2);
        assert!(!report.is_success());
        assert_eq!(report.text, "let x = 1;");
    }

    #[test]
    fn empty_key_is_an_isolated_error() {
        let dictionary = FlatDictionary::from_pairs([("", "空"), ("File", "文件")]);
        let report = apply(r#""" + "File""#, &dictionary, SubstitutionMode::Direct);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.hits, 1);
        assert_eq!(report.text, r#""" + "文件""#);
    }

    #[test]
    fn fallback_runs_only_when_nothing_matched() {
        let unrelated = FlatDictionary::from_pairs([("Frobnicate", "弄")]);
        let text = r#"button("Cancel")"#;

        let report = apply_with_fallback(text, &unrelated, SubstitutionMode::Direct, true);
        assert!(report.used_fallback);
        assert!(report.is_success());
        assert_eq!(report.text, r#"button("取消")"#);
        assert_eq!(report.misses, vec!["Frobnicate".to_string()]);

        let disabled = apply_with_fallback(text, &unrelated, SubstitutionMode::Direct, false);
        assert!(!disabled.used_fallback);
        assert_eq!(disabled.hits, 0);

        let direct = apply_with_fallback(
            r#"x("File")"#,
            &menu(),
            SubstitutionMode::Direct,
            true,
        );
        assert!(!direct.used_fallback);
    }
}
