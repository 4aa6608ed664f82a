//! Gantry Core Library
//!
//! Re-exports the pipeline components for programmatic access: repository
//! scanning, feature extraction, two-tier artifact generation, validation,
//! and feedback-driven corpus learning.

pub mod cancel;
pub mod domain;
pub mod extract;
pub mod feedback;
pub mod generate;
pub mod obs;
pub mod pipeline;
pub mod scanner;
pub mod telemetry;
pub mod validate;

pub use cancel::CancelToken;

pub use domain::{
    ArtifactKind, ArtifactRequest, BuildTool, ConfidenceTier, DependencyDecl, Ecosystem,
    EntryPoint, FeatureSet, FeedbackOutcome, FeedbackRecord, Framework, GantryError,
    GeneratedArtifact, GenerationError, HintConfidence, Language, LanguageStat, PipelineFlavor,
    Provenance, ProviderError, RepositoryDescriptor, Result, ScanError, ServiceHint, ServiceKind,
    Signature, StoredExample, ValidationError, TEMPLATE_VERSION,
};

pub use gantry_store::{
    CorpusStore, FeedbackLedger, FsCorpusStore, FsFeedbackLedger, MemoryCorpusStore,
    MemoryFeedbackLedger, RetrievalFacets, StoreError,
};

pub use extract::{ExtractorConfig, FeatureExtractor};
pub use feedback::{record_feedback, ModelUpdater};
pub use generate::{
    ArtifactGenerator, GenerationContext, GeneratorConfig, RetryPolicy, TextGenerator,
};
pub use pipeline::{GantryPipeline, GenerationReport, PipelineConfig};
pub use scanner::{RepositoryScanner, ScanResult, ScannerConfig};
pub use validate::validate;

pub use obs::{
    emit_artifact_generated, emit_corpus_folded, emit_features_extracted, emit_feedback_recorded,
    emit_scan_complete, emit_validation_failed, RequestSpan,
};
pub use telemetry::init_tracing;

/// Gantry version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
