//! Error taxonomy for the gantry core pipeline.
//!
//! Policy: scan and extraction issues degrade gracefully and flow forward as
//! warnings inside the `FeatureSet`; generative failures fall back to
//! templates whenever one exists; validation failures surface only after the
//! single bounded repair attempt. Every degraded path records which fallback
//! fired in the artifact's diagnostic trail.

use std::path::PathBuf;

use gantry_store::{ArtifactKind, Signature, StoreError};

/// Errors from walking a repository file tree.
///
/// Permission failures on subtrees are deliberately absent here: they
/// degrade to recorded warnings while the scan continues on siblings.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("repository root not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid ignore pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the external text-generation capability.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider call timed out")]
    Timeout,

    #[error("provider rate limited")]
    RateLimited,

    #[error("provider returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("provider transport error: {0}")]
    Transport(String),
}

/// Failures of the generation stage after retry and fallback policy ran.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("provider timed out after {attempts} attempts generating {kind} (features {})", signature.short())]
    ProviderTimeout {
        kind: ArtifactKind,
        attempts: u32,
        signature: Signature,
    },

    #[error("provider rate limited after {attempts} attempts generating {kind} (features {})", signature.short())]
    ProviderRateLimited {
        kind: ArtifactKind,
        attempts: u32,
        signature: Signature,
    },

    /// Retry budget exhausted and no template exists for the feature set.
    /// Carries the feature signature for diagnosis.
    #[error("generation exhausted with no template fallback for {kind} (features {})", signature.short())]
    ExhaustedNoFallback {
        kind: ArtifactKind,
        signature: Signature,
        #[source]
        last_error: Option<ProviderError>,
    },

    #[error("generation cancelled")]
    Cancelled,
}

/// Validation failures surfaced after the bounded repair attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("{kind} violates its schema: {message}")]
    SchemaViolation { kind: ArtifactKind, message: String },
}

/// Umbrella error for the pipeline facade.
#[derive(Debug, thiserror::Error)]
pub enum GantryError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("artifact {0} is unknown to this session")]
    UnknownArtifact(uuid::Uuid),

    #[error("feedback outcome accepted_with_edits requires edited content")]
    MissingEditedContent,
}

/// Result type for gantry core operations.
pub type Result<T> = std::result::Result<T, GantryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_error_names_the_signature() {
        let signature = Signature::from_parts(["python"]);
        let short = signature.short().to_string();
        let err = GenerationError::ExhaustedNoFallback {
            kind: ArtifactKind::Dockerfile,
            signature,
            last_error: Some(ProviderError::Timeout),
        };
        assert!(err.to_string().contains(&short));
    }

    #[test]
    fn store_errors_convert_into_gantry_errors() {
        let id = uuid::Uuid::new_v4();
        let err: GantryError = StoreError::FeedbackNotFound { id }.into();
        assert!(matches!(err, GantryError::Store(_)));
    }
}
