//! Repository file tree scanner.
//!
//! Walks a materialized tree and returns typed path/size metadata, skipping
//! ignorable subtrees (VCS internals, dependency caches). The walk is
//! hand-recursive rather than `walkdir`-based so symlink cycles can be
//! detected through a canonicalized-path visited set and skipped with a
//! recorded warning instead of looping.
//!
//! Error policy: a missing root is fatal; permission failures below the root
//! degrade to warnings and the scan continues on siblings.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ScanError;

/// Directory names excluded by default: VCS internals, dependency caches,
/// build output, editor state.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    "vendor",
    "dist",
    "build",
    ".idea",
    ".vscode",
];

/// What a scanned path is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    File,
    Dir,
    Symlink,
}

/// One scanned path, relative to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub size: u64,
    pub kind: PathKind,
}

impl ScanEntry {
    /// Final path component as UTF-8, empty when not representable.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Result of a full tree walk.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Absolute root the relative entry paths hang off.
    pub root: PathBuf,

    /// All surviving entries, ordered lexicographically by path.
    pub entries: Vec<ScanEntry>,

    /// Skipped subtrees and cycles, for downstream diagnostics.
    pub warnings: Vec<String>,
}

impl ScanResult {
    /// Files only (no dirs, no symlinks).
    pub fn files(&self) -> impl Iterator<Item = &ScanEntry> {
        self.entries.iter().filter(|e| e.kind == PathKind::File)
    }

    /// Absolute path for an entry.
    pub fn absolute(&self, entry: &ScanEntry) -> PathBuf {
        self.root.join(&entry.path)
    }
}

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Ignore patterns. A bare name (no `/` or glob metacharacters) matches
    /// that directory or file name anywhere in the tree; anything else is
    /// treated as a glob over root-relative paths.
    pub ignore: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            ignore: DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Walks repository trees.
pub struct RepositoryScanner {
    ignore: GlobSet,
}

impl RepositoryScanner {
    /// Build a scanner from config. Fails only on malformed glob patterns.
    pub fn new(config: &ScannerConfig) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore {
            let expanded: Vec<String> =
                if pattern.contains('/') || pattern.contains('*') || pattern.contains('?') {
                    vec![pattern.clone()]
                } else {
                    // Bare name: match at the root and at any depth.
                    vec![pattern.clone(), format!("**/{pattern}")]
                };
            for glob in expanded {
                builder.add(Glob::new(&glob).map_err(|e| ScanError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?);
            }
        }
        let ignore = builder.build().map_err(|e| ScanError::InvalidPattern {
            pattern: "<combined>".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { ignore })
    }

    /// Scanner with the default ignore set.
    pub fn with_defaults() -> Self {
        Self::new(&ScannerConfig::default()).expect("default ignore patterns are valid globs")
    }

    /// Walk `root` and return ordered entries plus warnings.
    pub fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        if !root.exists() {
            return Err(ScanError::NotFound {
                path: root.to_path_buf(),
            });
        }
        let root = root.canonicalize().map_err(|source| ScanError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let mut entries = Vec::new();
        let mut warnings = Vec::new();
        let mut visited: HashSet<PathBuf> = HashSet::new();
        visited.insert(root.clone());

        self.walk_dir(&root, &root, &mut visited, &mut entries, &mut warnings);

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(
            root = %root.display(),
            entries = entries.len(),
            warnings = warnings.len(),
            "scan complete"
        );
        Ok(ScanResult {
            root,
            entries,
            warnings,
        })
    }

    fn walk_dir(
        &self,
        dir: &Path,
        root: &Path,
        visited: &mut HashSet<PathBuf>,
        entries: &mut Vec<ScanEntry>,
        warnings: &mut Vec<String>,
    ) {
        let read = match fs::read_dir(dir) {
            Ok(read) => read,
            Err(e) => {
                // Permission denied (or any transient failure) on a subtree:
                // record and continue on siblings.
                warnings.push(format!("skipped {}: {}", dir.display(), e));
                return;
            }
        };

        for child in read {
            let child = match child {
                Ok(c) => c,
                Err(e) => {
                    warnings.push(format!("skipped entry under {}: {}", dir.display(), e));
                    continue;
                }
            };
            let path = child.path();
            let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

            if self.ignore.is_match(&rel) {
                continue;
            }

            let meta = match fs::symlink_metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    warnings.push(format!("skipped {}: {}", path.display(), e));
                    continue;
                }
            };

            if meta.file_type().is_symlink() {
                entries.push(ScanEntry {
                    path: rel,
                    size: 0,
                    kind: PathKind::Symlink,
                });
                // Follow directory symlinks only if the target is new.
                match path.canonicalize() {
                    Ok(target) if target.is_dir() => {
                        if visited.insert(target) {
                            self.walk_dir(&path, root, visited, entries, warnings);
                        } else {
                            warnings.push(format!(
                                "symlink cycle at {}: target already visited",
                                path.display()
                            ));
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warnings.push(format!("broken symlink {}: {}", path.display(), e));
                    }
                }
                continue;
            }

            if meta.is_dir() {
                if let Ok(canonical) = path.canonicalize() {
                    if !visited.insert(canonical) {
                        warnings.push(format!(
                            "directory cycle at {}: already visited",
                            path.display()
                        ));
                        continue;
                    }
                }
                entries.push(ScanEntry {
                    path: rel,
                    size: 0,
                    kind: PathKind::Dir,
                });
                self.walk_dir(&path, root, visited, entries, warnings);
            } else {
                entries.push(ScanEntry {
                    path: rel,
                    size: meta.len(),
                    kind: PathKind::File,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn missing_root_is_fatal() {
        let scanner = RepositoryScanner::with_defaults();
        let err = scanner.scan(Path::new("/nonexistent/gantry-test")).unwrap_err();
        assert!(matches!(err, ScanError::NotFound { .. }));
    }

    #[test]
    fn ignores_dependency_caches_and_vcs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "console.log('hi')");
        write(dir.path(), "node_modules/express/index.js", "x");
        write(dir.path(), ".git/HEAD", "ref: refs/heads/main");
        write(dir.path(), "package.json", "{}");

        let scanner = RepositoryScanner::with_defaults();
        let result = scanner.scan(dir.path()).unwrap();

        let names: Vec<String> = result
            .entries
            .iter()
            .map(|e| e.path.to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"package.json".to_string()));
        assert!(names.contains(&"src/index.js".to_string()));
        assert!(!names.iter().any(|n| n.contains("node_modules")));
        assert!(!names.iter().any(|n| n.contains(".git")));
    }

    #[test]
    fn entries_are_ordered_and_sized() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.py", "print('b')");
        write(dir.path(), "a.py", "print('a')!!");

        let scanner = RepositoryScanner::with_defaults();
        let result = scanner.scan(dir.path()).unwrap();

        let files: Vec<&ScanEntry> = result.files().collect();
        assert_eq!(files[0].file_name(), "a.py");
        assert_eq!(files[1].file_name(), "b.py");
        assert_eq!(files[0].size, 12);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_is_skipped_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/main.py", "print('x')");
        // app/loop -> app creates a cycle
        std::os::unix::fs::symlink(dir.path().join("app"), dir.path().join("app/loop")).unwrap();

        let scanner = RepositoryScanner::with_defaults();
        let result = scanner.scan(dir.path()).unwrap();

        assert!(result.warnings.iter().any(|w| w.contains("cycle")));
        // main.py appears exactly once despite the cycle
        let count = result
            .files()
            .filter(|e| e.file_name() == "main.py")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn custom_glob_patterns_apply() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.tmp", "x");
        write(dir.path(), "main.go", "package main");

        let config = ScannerConfig {
            ignore: vec!["*.tmp".to_string()],
        };
        let scanner = RepositoryScanner::new(&config).unwrap();
        let result = scanner.scan(dir.path()).unwrap();

        assert_eq!(result.files().count(), 1);
        assert_eq!(result.files().next().unwrap().file_name(), "main.go");
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let config = ScannerConfig {
            ignore: vec!["[invalid".to_string()],
        };
        assert!(matches!(
            RepositoryScanner::new(&config),
            Err(ScanError::InvalidPattern { .. })
        ));
    }
}
