//! Structured observability hooks for the gantry pipeline lifecycle.
//!
//! This module provides:
//! - Request-scoped tracing spans via the `RequestSpan` RAII guard
//! - Emission functions for key lifecycle events: scan, extraction,
//!   generation, validation, feedback, corpus folds
//!
//! Events are emitted at `info!` level. For JSON output, pass `--json` to
//! the CLI or call `init_tracing(true, _)`.

use tracing::info;

use crate::domain::{ArtifactKind, FeatureSet, FeedbackRecord, GeneratedArtifact, Provenance};
use crate::scanner::ScanResult;

/// RAII guard that enters a request-scoped tracing span.
///
/// All tracing calls made while the guard lives are associated with the
/// request id.
pub struct RequestSpan {
    _span: tracing::span::EnteredSpan,
}

impl RequestSpan {
    pub fn enter(request_id: &str) -> Self {
        let span = tracing::info_span!("gantry.request", request_id = %request_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: repository scan finished.
pub fn emit_scan_complete(scan: &ScanResult) {
    info!(
        event = "scan.complete",
        root = %scan.root.display(),
        entries = scan.entries.len(),
        warnings = scan.warnings.len(),
    );
}

/// Emit event: feature extraction finished.
pub fn emit_features_extracted(features: &FeatureSet) {
    info!(
        event = "extract.complete",
        signature = %features.signature().short(),
        languages = features.languages.len(),
        frameworks = features.frameworks.len(),
        dependencies = features.dependencies.len(),
        confidence = ?features.confidence,
    );
}

/// Emit event: one artifact generated, with its tier.
pub fn emit_artifact_generated(artifact: &GeneratedArtifact) {
    let tier = match &artifact.provenance {
        Provenance::Template { .. } => "template",
        Provenance::Generative { .. } => "generative",
        Provenance::TemplateFallback { .. } => "template_fallback",
    };
    info!(
        event = "generate.artifact",
        artifact_id = %artifact.id,
        kind = %artifact.kind,
        tier = tier,
        confidence = artifact.confidence,
        needs_review = artifact.needs_review,
    );
}

/// Emit event: validation failed for an artifact (warning level).
pub fn emit_validation_failed(kind: ArtifactKind, message: &str, repairing: bool) {
    tracing::warn!(
        event = "validate.failed",
        kind = %kind,
        message = %message,
        repairing = repairing,
    );
}

/// Emit event: feedback recorded against an artifact.
pub fn emit_feedback_recorded(record: &FeedbackRecord) {
    info!(
        event = "feedback.recorded",
        feedback_id = %record.id,
        artifact_id = %record.artifact_id,
        outcome = ?record.outcome,
    );
}

/// Emit event: a feedback batch was folded into the corpus.
pub fn emit_corpus_folded(folded: usize, corpus_len: usize) {
    info!(
        event = "corpus.folded",
        folded = folded,
        corpus_len = corpus_len,
    );
}
