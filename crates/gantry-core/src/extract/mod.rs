//! Feature extraction: scan results in, `FeatureSet` out.
//!
//! Extraction is structured as fork/join over an accumulator: any partition
//! of the scanned files can be accumulated independently and merged, with
//! no shared mutable state outside the merge point.

pub mod entrypoint;
pub mod framework;
pub mod language;
pub mod manifest;
pub mod service;

use tracing::debug;

use crate::domain::{BuildTool, ConfidenceTier, DependencyDecl, FeatureSet, Language};
use crate::scanner::{ScanEntry, ScanResult};

pub use manifest::{ManifestParser, ManifestSummary, ParserRegistry};

/// Limits for the low-confidence source-text service scan.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Maximum number of source files sampled.
    pub sample_limit: usize,
    /// Files larger than this are not sampled.
    pub sample_max_bytes: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            sample_limit: 20,
            sample_max_bytes: 64 * 1024,
        }
    }
}

/// Partial extraction state for one partition of the scanned files.
///
/// `merge` is the join point: merging two accumulators is order-insensitive
/// up to manifest priority, which is resolved at finish time.
#[derive(Debug, Default)]
pub struct FeatureAccumulator {
    /// `(registry priority, summary, language, build tool)` per parsed manifest.
    manifests: Vec<(usize, ManifestSummary, Language, BuildTool)>,

    /// Soft parse failures.
    warnings: Vec<String>,
}

impl FeatureAccumulator {
    /// Merge another partition's state into this one.
    pub fn merge(&mut self, other: FeatureAccumulator) {
        self.manifests.extend(other.manifests);
        self.warnings.extend(other.warnings);
    }
}

/// Derives a [`FeatureSet`] from scan results plus manifest contents.
pub struct FeatureExtractor {
    registry: ParserRegistry,
    config: ExtractorConfig,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            registry: ParserRegistry::new(),
            config: ExtractorConfig::default(),
        }
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        Self {
            registry: ParserRegistry::new(),
            config,
        }
    }

    /// Extract features from a completed scan.
    pub fn extract(&self, scan: &ScanResult) -> FeatureSet {
        let mut acc = FeatureAccumulator::default();
        for entry in scan.files() {
            self.accumulate(scan, entry, &mut acc);
        }
        self.finish(scan, acc)
    }

    /// Process one file into the accumulator. Only root-level manifests are
    /// recognized; nested manifests belong to vendored or workspace-member
    /// code the top-level deployment does not describe.
    pub fn accumulate(&self, scan: &ScanResult, entry: &ScanEntry, acc: &mut FeatureAccumulator) {
        if entry.path.parent() != Some(std::path::Path::new("")) {
            return;
        }
        let Some(registry_entry) = self.registry.lookup(entry.file_name()) else {
            return;
        };
        let priority = self
            .registry
            .priority(entry.file_name())
            .unwrap_or(usize::MAX);

        let bytes = match std::fs::read(scan.absolute(entry)) {
            Ok(b) => b,
            Err(e) => {
                acc.warnings
                    .push(format!("could not read {}: {e}", entry.path.display()));
                return;
            }
        };
        match registry_entry.parse(&bytes) {
            Ok(summary) => {
                acc.manifests.push((
                    priority,
                    summary,
                    registry_entry.language,
                    registry_entry.build_tool,
                ));
            }
            Err(message) => acc.warnings.push(format!("manifest parse failed: {message}")),
        }
    }

    /// Join point: fold the accumulator into the final immutable `FeatureSet`.
    pub fn finish(&self, scan: &ScanResult, mut acc: FeatureAccumulator) -> FeatureSet {
        acc.manifests.sort_by_key(|(priority, ..)| *priority);

        let languages = language::histogram(scan.files());
        let primary_language = languages
            .first()
            .map(|s| s.language)
            .or_else(|| acc.manifests.first().map(|(_, _, lang, _)| *lang));

        let dependencies: Vec<DependencyDecl> = acc
            .manifests
            .iter()
            .flat_map(|(_, summary, ..)| summary.dependencies.iter().cloned())
            .collect();

        let frameworks = framework::detect_frameworks(&dependencies);

        let samples = self.sample_sources(scan, primary_language);
        let services = service::detect_services(&dependencies, samples.iter().map(String::as_str));

        let entry_hint = acc
            .manifests
            .iter()
            .find_map(|(_, summary, ..)| summary.entry_hint.as_deref());
        let entry_point = entrypoint::detect_entry_point(scan, primary_language, entry_hint);

        let build_tool = acc.manifests.first().map(|(.., tool)| *tool);
        let app_name = acc
            .manifests
            .iter()
            .find_map(|(_, summary, ..)| summary.app_name.as_deref())
            .and_then(sanitize_app_name);

        // No recognized manifest: a valid, explicitly representable state.
        let confidence = if acc.manifests.is_empty() {
            ConfidenceTier::Indeterminate
        } else if frameworks.is_empty() {
            ConfidenceTier::Low
        } else {
            ConfidenceTier::High
        };

        let mut warnings = scan.warnings.clone();
        warnings.extend(acc.warnings);

        let features = FeatureSet {
            languages,
            dependencies,
            frameworks,
            services,
            build_tool,
            entry_point,
            confidence,
            app_name,
            warnings,
        };
        debug!(
            signature = %features.signature().short(),
            confidence = ?features.confidence,
            frameworks = features.frameworks.len(),
            "extraction complete"
        );
        features
    }

    fn sample_sources(&self, scan: &ScanResult, language: Option<Language>) -> Vec<String> {
        let Some(language) = language else {
            return Vec::new();
        };
        let mut samples = Vec::new();
        for entry in scan.files() {
            if samples.len() >= self.config.sample_limit {
                break;
            }
            if entry.size == 0 || entry.size > self.config.sample_max_bytes {
                continue;
            }
            let ext = entry
                .path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default();
            if language::language_for_extension(ext).map(|l| l.template_family())
                != Some(language.template_family())
            {
                continue;
            }
            if let Ok(bytes) = std::fs::read(scan.absolute(entry)) {
                samples.push(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
        samples
    }
}

/// Sanitize an app name to a DNS-label-safe form for image/manifest naming.
fn sanitize_app_name(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    // Scoped npm/composer names: keep the part after the slash
    let raw = raw.rsplit('/').next().unwrap_or(raw);
    for c in raw.to_ascii_lowercase().chars() {
        match c {
            'a'..='z' | '0'..='9' => out.push(c),
            '_' | ' ' | '.' | '-' => out.push('-'),
            _ => {}
        }
    }
    let out = out.trim_matches('-').to_string();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Framework, HintConfidence, ServiceKind};
    use crate::scanner::RepositoryScanner;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn extract(root: &Path) -> FeatureSet {
        let scan = RepositoryScanner::with_defaults().scan(root).unwrap();
        FeatureExtractor::new().extract(&scan)
    }

    #[test]
    fn node_web_app_extracts_high_confidence() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "package.json",
            r#"{ "name": "Shop_API", "main": "server.js",
                "dependencies": { "express": "^4.18.0", "pg": "^8.11.0" } }"#,
        );
        write(dir.path(), "server.js", "require('express')");

        let features = extract(dir.path());
        assert_eq!(features.confidence, ConfidenceTier::High);
        assert_eq!(features.primary_framework(), Some(Framework::Express));
        assert_eq!(
            features.has_service(ServiceKind::Postgres),
            Some(HintConfidence::High)
        );
        assert_eq!(features.app_name.as_deref(), Some("shop-api"));
        assert_eq!(features.entry_point.as_option(), Some("server.js"));
        assert_eq!(features.build_tool, Some(BuildTool::Npm));
    }

    #[test]
    fn no_manifest_yields_indeterminate_not_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "script.py", "print('hello')");

        let features = extract(dir.path());
        assert_eq!(features.confidence, ConfidenceTier::Indeterminate);
        assert_eq!(features.primary_language(), Some(Language::Python));
        assert!(features.dependencies.is_empty());
    }

    #[test]
    fn manifest_without_framework_is_low_confidence() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "requirements.txt",
            "requests==2.31.0\nnumpy==1.26.0\n",
        );
        write(dir.path(), "main.py", "import requests");

        let features = extract(dir.path());
        assert_eq!(features.confidence, ConfidenceTier::Low);
        assert!(features.frameworks.is_empty());
        assert_eq!(features.entry_point.as_option(), Some("main.py"));
    }

    #[test]
    fn nested_manifests_are_not_recognized() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "frontend/package.json",
            r#"{ "dependencies": { "react": "^18.0.0" } }"#,
        );
        write(dir.path(), "main.py", "print('backend')");

        let features = extract(dir.path());
        assert_eq!(features.confidence, ConfidenceTier::Indeterminate);
    }

    #[test]
    fn malformed_manifest_degrades_to_warning() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "package.json", "{ not json at all");

        let features = extract(dir.path());
        assert_eq!(features.confidence, ConfidenceTier::Indeterminate);
        assert!(features
            .warnings
            .iter()
            .any(|w| w.contains("manifest parse failed")));
    }

    #[test]
    fn scan_warnings_flow_into_the_feature_set() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.py", "print('x')");
        let mut scan = RepositoryScanner::with_defaults().scan(dir.path()).unwrap();
        scan.warnings
            .push("skipped /repo/private: permission denied".to_string());

        let features = FeatureExtractor::new().extract(&scan);
        assert!(features.warnings.iter().any(|w| w.contains("permission denied")));
        // Degraded, not fatal: features still extracted from accessible files
        assert_eq!(features.primary_language(), Some(Language::Python));
    }

    #[test]
    fn connection_string_in_source_is_low_confidence_hint() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "package.json",
            r#"{ "dependencies": { "express": "*" } }"#,
        );
        write(
            dir.path(),
            "db.js",
            "const conn = 'redis://cache:6379';",
        );

        let features = extract(dir.path());
        assert_eq!(
            features.has_service(ServiceKind::Redis),
            Some(HintConfidence::Low)
        );
    }

    #[test]
    fn accumulator_merge_joins_partitions() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "package.json",
            r#"{ "name": "a", "dependencies": { "express": "*" } }"#,
        );
        write(dir.path(), "requirements.txt", "flask==2.3.0\n");
        write(dir.path(), "index.js", "x");

        let extractor = FeatureExtractor::new();
        let scan = RepositoryScanner::with_defaults().scan(dir.path()).unwrap();

        // Fork: each file processed into its own accumulator
        let mut left = FeatureAccumulator::default();
        let mut right = FeatureAccumulator::default();
        let files: Vec<_> = scan.files().collect();
        extractor.accumulate(&scan, files[0], &mut left);
        for entry in &files[1..] {
            extractor.accumulate(&scan, entry, &mut right);
        }

        // Join
        left.merge(right);
        let merged = extractor.finish(&scan, left);
        let whole = extractor.extract(&scan);
        assert_eq!(merged.signature(), whole.signature());
        assert_eq!(merged.dependencies.len(), whole.dependencies.len());
    }

    #[test]
    fn sanitize_app_name_is_dns_label_safe() {
        assert_eq!(sanitize_app_name("Shop API"), Some("shop-api".to_string()));
        assert_eq!(
            sanitize_app_name("@acme/Billing_Svc"),
            Some("billing-svc".to_string())
        );
        assert_eq!(sanitize_app_name("日本語"), None);
    }
}
