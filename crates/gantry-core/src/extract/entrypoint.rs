//! Entry point detection: language-specific bootstrap-file heuristics.
//!
//! Failure yields `EntryPoint::Unresolved`, never an error.

use crate::domain::{EntryPoint, Language};
use crate::scanner::ScanResult;

/// Bootstrap file candidates per language, most conventional first.
fn candidates(language: Language) -> &'static [&'static str] {
    match language {
        Language::JavaScript | Language::TypeScript => {
            &["server.js", "index.js", "app.js", "src/index.js", "src/server.js"]
        }
        Language::Python => &["main.py", "app.py", "manage.py", "src/main.py"],
        Language::Rust => &["src/main.rs"],
        Language::Go => &["main.go", "cmd/main.go"],
        Language::Java => &[],
        Language::Php => &["public/index.php", "index.php"],
        Language::Ruby => &["config.ru", "app.rb"],
    }
}

/// Detect the entry point for the primary language.
///
/// A manifest hint (package.json `main`) wins when the hinted file exists
/// in the tree; otherwise the conventional candidates are probed in order.
pub fn detect_entry_point(
    scan: &ScanResult,
    primary_language: Option<Language>,
    manifest_hint: Option<&str>,
) -> EntryPoint {
    let exists = |rel: &str| scan.files().any(|e| e.path.to_string_lossy() == rel);

    if let Some(hint) = manifest_hint {
        let hint = hint.trim_start_matches("./");
        if exists(hint) {
            return EntryPoint::Resolved {
                path: hint.to_string(),
            };
        }
    }

    if let Some(language) = primary_language {
        for candidate in candidates(language) {
            if exists(candidate) {
                return EntryPoint::Resolved {
                    path: (*candidate).to_string(),
                };
            }
        }
    }

    EntryPoint::Unresolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{PathKind, ScanEntry};
    use std::path::PathBuf;

    fn scan_of(paths: &[&str]) -> ScanResult {
        ScanResult {
            root: PathBuf::from("/repo"),
            entries: paths
                .iter()
                .map(|p| ScanEntry {
                    path: PathBuf::from(p),
                    size: 1,
                    kind: PathKind::File,
                })
                .collect(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn manifest_hint_wins_when_present() {
        let scan = scan_of(&["server.js", "boot.js"]);
        let entry = detect_entry_point(&scan, Some(Language::JavaScript), Some("./boot.js"));
        assert_eq!(
            entry,
            EntryPoint::Resolved {
                path: "boot.js".to_string()
            }
        );
    }

    #[test]
    fn stale_hint_falls_back_to_candidates() {
        let scan = scan_of(&["index.js"]);
        let entry = detect_entry_point(&scan, Some(Language::JavaScript), Some("dist/gone.js"));
        assert_eq!(
            entry,
            EntryPoint::Resolved {
                path: "index.js".to_string()
            }
        );
    }

    #[test]
    fn python_candidates_probe_in_order() {
        let scan = scan_of(&["app.py", "main.py"]);
        let entry = detect_entry_point(&scan, Some(Language::Python), None);
        assert_eq!(
            entry,
            EntryPoint::Resolved {
                path: "main.py".to_string()
            }
        );
    }

    #[test]
    fn no_candidate_yields_unresolved_not_error() {
        let scan = scan_of(&["lib.rs"]);
        assert_eq!(
            detect_entry_point(&scan, Some(Language::Rust), None),
            EntryPoint::Unresolved
        );
        assert_eq!(detect_entry_point(&scan, None, None), EntryPoint::Unresolved);
    }
}
