//! Record types shared by the storage traits.
//!
//! These are the persisted shapes: what an accepted example looks like in
//! the corpus, and what a single user feedback action looks like in the
//! ledger. The core crate's richer domain types flatten into these at the
//! storage boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Stable key derived from a feature set's defining fields (SHA-256 hex).
///
/// The inner field is private so the string is always valid lowercase hex
/// produced by [`Signature::from_parts`] or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(String);

impl Signature {
    /// Compute a signature over ordered, NUL-delimited string parts.
    ///
    /// Part ordering is the caller's contract: the same logical feature set
    /// must always flatten to the same part sequence.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_ref().as_bytes());
            hasher.update(b"\0");
        }
        Signature(hex::encode(hasher.finalize()))
    }

    /// Full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars), for logs and filenames.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for Signature {
    type Error = StoreError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::InvalidSignature { given: s });
        }
        Ok(Signature(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

/// The deployment artifact families gantry generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Container build file.
    Dockerfile,
    /// Kubernetes orchestration manifests.
    KubernetesManifest,
    /// CI/CD pipeline definition.
    CiPipeline,
}

impl ArtifactKind {
    /// Stable lowercase identifier, used in storage keys and filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Dockerfile => "dockerfile",
            ArtifactKind::KubernetesManifest => "kubernetes_manifest",
            ArtifactKind::CiPipeline => "ci_pipeline",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StoredExample
// ---------------------------------------------------------------------------

/// Flattened feature facets kept with each corpus entry so retrieval can
/// score similarity without re-deriving the original feature set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalFacets {
    /// Detected framework identifiers.
    pub frameworks: Vec<String>,
    /// Detected external service identifiers.
    pub services: Vec<String>,
    /// Declared dependency names.
    pub dependencies: Vec<String>,
}

/// One accepted example in the corpus.
///
/// Entries are only ever created from accepted feedback; the most recent
/// entry per `(signature, kind)` supersedes older ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredExample {
    /// Feature-set signature of the repository this example was generated for.
    pub signature: Signature,

    /// Artifact family.
    pub kind: ArtifactKind,

    /// Ground-truth artifact text (the user-edited content when edits were made).
    pub content: String,

    /// Facets for similarity retrieval.
    pub facets: RetrievalFacets,

    /// When the underlying feedback was recorded.
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// FeedbackRecord
// ---------------------------------------------------------------------------

/// User verdict on a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// Used as generated.
    Accepted,
    /// Used after manual edits; the edited content is the ground truth.
    AcceptedWithEdits,
    /// Discarded. Never enters the corpus.
    Rejected,
}

/// One accept/edit/reject action against a generated artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Ledger record id.
    pub id: Uuid,

    /// The generated artifact this feedback refers to.
    pub artifact_id: Uuid,

    /// Artifact family.
    pub kind: ArtifactKind,

    /// Feature-set signature of the originating analysis.
    pub signature: Signature,

    /// Artifact content as generated.
    pub original_content: String,

    /// User-edited content, present only for [`FeedbackOutcome::AcceptedWithEdits`].
    pub edited_content: Option<String>,

    /// The verdict.
    pub outcome: FeedbackOutcome,

    /// Facets for similarity retrieval, carried into the corpus on fold.
    pub facets: RetrievalFacets,

    /// When the feedback was recorded.
    pub recorded_at: DateTime<Utc>,

    /// Whether the updater has already folded this record into the corpus.
    pub folded: bool,
}

impl FeedbackRecord {
    /// The content that should enter the corpus, if any.
    ///
    /// Accepted → original, accepted-with-edits → edited, rejected → none.
    pub fn ground_truth(&self) -> Option<&str> {
        match self.outcome {
            FeedbackOutcome::Accepted => Some(&self.original_content),
            FeedbackOutcome::AcceptedWithEdits => self.edited_content.as_deref(),
            FeedbackOutcome::Rejected => None,
        }
    }

    /// Convert to a corpus entry. Returns `None` for rejected feedback or
    /// an edits outcome missing its edited content.
    pub fn to_example(&self) -> Option<StoredExample> {
        let content = self.ground_truth()?;
        Some(StoredExample {
            signature: self.signature.clone(),
            kind: self.kind,
            content: content.to_string(),
            facets: self.facets.clone(),
            recorded_at: self.recorded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: FeedbackOutcome, edited: Option<&str>) -> FeedbackRecord {
        FeedbackRecord {
            id: Uuid::new_v4(),
            artifact_id: Uuid::new_v4(),
            kind: ArtifactKind::Dockerfile,
            signature: Signature::from_parts(["node", "express"]),
            original_content: "FROM node:20".to_string(),
            edited_content: edited.map(String::from),
            outcome,
            facets: RetrievalFacets::default(),
            recorded_at: Utc::now(),
            folded: false,
        }
    }

    #[test]
    fn signature_is_deterministic() {
        let a = Signature::from_parts(["node", "express", "postgres"]);
        let b = Signature::from_parts(["node", "express", "postgres"]);
        assert_eq!(a, b);
    }

    #[test]
    fn signature_part_boundaries_matter() {
        // "ab" + "c" must not collide with "a" + "bc"
        let a = Signature::from_parts(["ab", "c"]);
        let b = Signature::from_parts(["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn signature_rejects_malformed_strings() {
        assert!(Signature::try_from("not-hex".to_string()).is_err());
        assert!(Signature::try_from("abcd".to_string()).is_err());

        let valid = Signature::from_parts(["x"]).as_str().to_string();
        assert!(Signature::try_from(valid).is_ok());
    }

    #[test]
    fn accepted_ground_truth_is_original() {
        let r = record(FeedbackOutcome::Accepted, None);
        assert_eq!(r.ground_truth(), Some("FROM node:20"));
    }

    #[test]
    fn edited_ground_truth_is_edit() {
        let r = record(FeedbackOutcome::AcceptedWithEdits, Some("FROM node:22"));
        assert_eq!(r.ground_truth(), Some("FROM node:22"));
        assert_eq!(r.to_example().unwrap().content, "FROM node:22");
    }

    #[test]
    fn rejected_never_becomes_example() {
        let r = record(FeedbackOutcome::Rejected, None);
        assert!(r.to_example().is_none());
    }

    #[test]
    fn artifact_kind_identifiers_are_stable() {
        assert_eq!(ArtifactKind::Dockerfile.as_str(), "dockerfile");
        assert_eq!(
            ArtifactKind::KubernetesManifest.as_str(),
            "kubernetes_manifest"
        );
        assert_eq!(ArtifactKind::CiPipeline.as_str(), "ci_pipeline");
    }
}
