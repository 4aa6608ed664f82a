//! Domain models for gantry.
//!
//! Canonical definitions for the core entities:
//! - `FeatureSet`: structured inference of a repository's tech stack
//! - `GeneratedArtifact`: one produced deployment artifact with provenance
//! - Error taxonomy for scan, generation, and validation failures

pub mod artifact;
pub mod error;
pub mod feature_set;
pub mod repo;

pub use artifact::{
    ArtifactRequest, GeneratedArtifact, PipelineFlavor, Provenance, TEMPLATE_VERSION,
};
pub use error::{GantryError, GenerationError, ProviderError, Result, ScanError, ValidationError};
pub use feature_set::{
    BuildTool, ConfidenceTier, DependencyDecl, Ecosystem, EntryPoint, Framework, FeatureSet,
    HintConfidence, Language, LanguageStat, ServiceHint, ServiceKind,
};
pub use repo::RepositoryDescriptor;

// The storage crate owns the persisted shapes; re-export the ones that are
// part of the domain vocabulary.
pub use gantry_store::{ArtifactKind, FeedbackOutcome, FeedbackRecord, Signature, StoredExample};
