//! Size-weighted language inference.

use std::collections::HashMap;

use crate::domain::{Language, LanguageStat};
use crate::scanner::ScanEntry;

/// Source extensions attributed to each language.
const EXTENSIONS: &[(&str, Language)] = &[
    ("js", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("cjs", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("ts", Language::TypeScript),
    ("tsx", Language::TypeScript),
    ("py", Language::Python),
    ("rs", Language::Rust),
    ("go", Language::Go),
    ("java", Language::Java),
    ("php", Language::Php),
    ("rb", Language::Ruby),
];

/// Language for a file extension, if recognized.
pub fn language_for_extension(ext: &str) -> Option<Language> {
    EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

/// Build the histogram from scanned files, weighted by cumulative byte
/// size per extension rather than file count, so many small incidental
/// files do not skew the result. Sorted largest first; equal sizes break
/// by language identifier for determinism.
pub fn histogram<'a>(files: impl Iterator<Item = &'a ScanEntry>) -> Vec<LanguageStat> {
    let mut acc: HashMap<Language, (u64, usize)> = HashMap::new();
    for entry in files {
        let ext = entry
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if let Some(lang) = language_for_extension(ext) {
            let slot = acc.entry(lang).or_insert((0, 0));
            slot.0 += entry.size;
            slot.1 += 1;
        }
    }
    let mut stats: Vec<LanguageStat> = acc
        .into_iter()
        .map(|(language, (bytes, files))| LanguageStat {
            language,
            bytes,
            files,
        })
        .collect();
    stats.sort_by(|a, b| {
        b.bytes
            .cmp(&a.bytes)
            .then_with(|| a.language.as_str().cmp(b.language.as_str()))
    });
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::PathKind;
    use std::path::PathBuf;

    fn file(path: &str, size: u64) -> ScanEntry {
        ScanEntry {
            path: PathBuf::from(path),
            size,
            kind: PathKind::File,
        }
    }

    #[test]
    fn size_outweighs_file_count() {
        // One big Python file vs many tiny JS files
        let entries = vec![
            file("app.py", 50_000),
            file("a.js", 100),
            file("b.js", 100),
            file("c.js", 100),
            file("d.js", 100),
        ];
        let stats = histogram(entries.iter());
        assert_eq!(stats[0].language, Language::Python);
        assert_eq!(stats[1].language, Language::JavaScript);
        assert_eq!(stats[1].files, 4);
    }

    #[test]
    fn unknown_extensions_are_ignored() {
        let entries = vec![file("README.md", 10_000), file("main.go", 200)];
        let stats = histogram(entries.iter());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].language, Language::Go);
    }

    #[test]
    fn equal_sizes_break_by_language_id() {
        let entries = vec![file("x.rb", 500), file("y.go", 500)];
        let stats = histogram(entries.iter());
        assert_eq!(stats[0].language, Language::Go);
    }
}
