//! The pipeline facade: analyze, generate, feedback.
//!
//! Generation and validation are fused here so no partially-validated
//! artifact ever leaves the pipeline: a generative artifact that fails
//! validation gets exactly one repair regeneration, and if that fails too
//! the whole request errors. Template output failing validation is a
//! catalog regression and errors immediately.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use gantry_store::{CorpusStore, FeedbackLedger, RetrievalFacets};

use crate::cancel::CancelToken;
use crate::domain::{
    ArtifactRequest, FeatureSet, FeedbackOutcome, FeedbackRecord, GantryError, GeneratedArtifact,
    Provenance, RepositoryDescriptor, Result, ValidationError,
};
use crate::extract::{ExtractorConfig, FeatureExtractor};
use crate::feedback::{self, ModelUpdater};
use crate::generate::{self, ArtifactGenerator, GenerationContext, GeneratorConfig, TextGenerator};
use crate::obs;
use crate::scanner::{RepositoryScanner, ScannerConfig};
use crate::validate;

/// Tuning for the whole pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub scanner: ScannerConfig,
    pub extractor: ExtractorConfig,
    pub generator: GeneratorConfig,
}

/// The result of one generation request.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub features: FeatureSet,
    pub artifacts: Vec<GeneratedArtifact>,
}

struct SessionArtifact {
    artifact: GeneratedArtifact,
    facets: RetrievalFacets,
}

/// End-to-end pipeline: scan, extract, generate, validate, feedback.
pub struct GantryPipeline {
    scanner: RepositoryScanner,
    extractor: FeatureExtractor,
    generator: ArtifactGenerator,
    corpus: Arc<dyn CorpusStore>,
    ledger: Arc<dyn FeedbackLedger>,
    // Artifacts generated this session, kept so feedback can reference them
    // by id alone.
    session: RwLock<HashMap<Uuid, SessionArtifact>>,
}

impl GantryPipeline {
    pub fn new(
        provider: Arc<dyn TextGenerator>,
        corpus: Arc<dyn CorpusStore>,
        ledger: Arc<dyn FeedbackLedger>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let scanner = RepositoryScanner::new(&config.scanner)?;
        let extractor = FeatureExtractor::with_config(config.extractor);
        let generator = ArtifactGenerator::new(provider, corpus.clone(), config.generator);
        Ok(Self {
            scanner,
            extractor,
            generator,
            corpus,
            ledger,
            session: RwLock::new(HashMap::new()),
        })
    }

    /// Scan a repository and extract its feature set.
    pub async fn analyze(&self, repo: &RepositoryDescriptor) -> Result<FeatureSet> {
        let scan = self.scanner.scan(&repo.root)?;
        obs::emit_scan_complete(&scan);
        let features = self.extractor.extract(&scan);
        obs::emit_features_extracted(&features);
        Ok(features)
    }

    /// Analyze a repository and generate the requested artifacts.
    ///
    /// Every returned artifact passed validation; a validation failure after
    /// the single repair attempt fails the whole request.
    pub async fn generate(
        &self,
        repo: &RepositoryDescriptor,
        requests: &[ArtifactRequest],
        cancel: &CancelToken,
    ) -> Result<GenerationReport> {
        let features = self.analyze(repo).await?;
        let facets = features.facets();

        let mut ctx = GenerationContext::seed(&features);
        let mut artifacts = Vec::with_capacity(requests.len());
        for request in generate::ordered(requests) {
            let artifact = self
                .generate_validated(&features, &mut ctx, &request, cancel)
                .await?;
            artifacts.push(artifact);
        }

        let mut session = self.session.write().await;
        for artifact in &artifacts {
            session.insert(
                artifact.id,
                SessionArtifact {
                    artifact: artifact.clone(),
                    facets: facets.clone(),
                },
            );
        }

        Ok(GenerationReport {
            features,
            artifacts,
        })
    }

    async fn generate_validated(
        &self,
        features: &FeatureSet,
        ctx: &mut GenerationContext,
        request: &ArtifactRequest,
        cancel: &CancelToken,
    ) -> Result<GeneratedArtifact> {
        let artifact = self
            .generator
            .generate_one(features, ctx, request, cancel, None)
            .await?;

        let verdict = validate::validate(request.kind, &artifact.content, request.platform);
        let Err(err) = verdict else {
            return Ok(artifact);
        };
        let ValidationError::SchemaViolation { message, .. } = &err;

        if !matches!(artifact.provenance, Provenance::Generative { .. }) {
            obs::emit_validation_failed(request.kind, message, false);
            return Err(err.into());
        }

        // One bounded repair: regenerate with the violation in the prompt.
        obs::emit_validation_failed(request.kind, message, true);
        let mut repaired = self
            .generator
            .generate_one(features, ctx, request, cancel, Some(message))
            .await?;
        if let Err(second) = validate::validate(request.kind, &repaired.content, request.platform) {
            let ValidationError::SchemaViolation { message, .. } = &second;
            obs::emit_validation_failed(request.kind, message, false);
            return Err(second.into());
        }
        repaired.record(format!("repaired after validation failure: {message}"));
        Ok(repaired)
    }

    /// Record feedback against an artifact generated this session.
    pub async fn record_feedback(
        &self,
        artifact_id: Uuid,
        outcome: FeedbackOutcome,
        edited_content: Option<String>,
    ) -> Result<FeedbackRecord> {
        let session = self.session.read().await;
        let entry = session
            .get(&artifact_id)
            .ok_or(GantryError::UnknownArtifact(artifact_id))?;
        feedback::record_feedback(
            self.ledger.as_ref(),
            &entry.artifact,
            entry.facets.clone(),
            outcome,
            edited_content,
        )
        .await
    }

    /// A corpus updater wired to this pipeline's ledger and corpus.
    pub fn updater(&self, interval: Duration) -> ModelUpdater {
        ModelUpdater::new(self.ledger.clone(), self.corpus.clone(), interval)
    }
}
