//! Two-tier artifact generation.
//!
//! Tier one is the deterministic template catalog: high-confidence feature
//! sets with a catalog hit never touch the provider. Everything else goes
//! through the generative tier, which retrieves similar accepted examples
//! from the corpus, prompts the provider under a bounded retry budget, and
//! degrades back to a template when the budget runs out.
//!
//! Artifacts within one request are generated in a fixed order (Dockerfile,
//! then Kubernetes manifests, then CI pipeline) and share one
//! [`GenerationContext`], so the port exposed by the Dockerfile is the port
//! the Service targets. Provider calls across concurrent requests are capped
//! by a semaphore.

pub mod context;
pub mod prompt;
pub mod provider;
pub mod template;

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info};

use gantry_store::{ArtifactKind, CorpusStore};

use crate::cancel::CancelToken;
use crate::domain::{
    ArtifactRequest, ConfidenceTier, FeatureSet, GantryError, GeneratedArtifact, GenerationError,
    Provenance, ProviderError, Result, TEMPLATE_VERSION,
};
use crate::obs;

pub use context::GenerationContext;
pub use provider::{RetryOutcome, RetryPolicy, TextGenerator};
pub use template::template_for;

const TEMPLATE_CONFIDENCE: f32 = 0.9;
const GENERATIVE_CONFIDENCE_HIGH: f32 = 0.75;
const GENERATIVE_CONFIDENCE_LOW: f32 = 0.5;
const FALLBACK_CONFIDENCE: f32 = 0.4;

/// Tuning for the generation stage.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub retry: RetryPolicy,

    /// Cap on provider calls in flight across concurrent requests.
    pub max_inflight: usize,

    /// How many similar corpus examples to embed in a prompt.
    pub top_k: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_inflight: 2,
            top_k: 3,
        }
    }
}

/// The generation stage: template catalog plus retrying generative tier.
pub struct ArtifactGenerator {
    provider: Arc<dyn TextGenerator>,
    corpus: Arc<dyn CorpusStore>,
    config: GeneratorConfig,
    permits: Arc<Semaphore>,
}

fn kind_rank(kind: ArtifactKind) -> u8 {
    match kind {
        ArtifactKind::Dockerfile => 0,
        ArtifactKind::KubernetesManifest => 1,
        ArtifactKind::CiPipeline => 2,
    }
}

/// Fixed generation order: Dockerfile first, then manifests, then pipeline,
/// so later artifacts see the context the Dockerfile established.
pub fn ordered(requests: &[ArtifactRequest]) -> Vec<ArtifactRequest> {
    let mut ordered = requests.to_vec();
    ordered.sort_by_key(|r| kind_rank(r.kind));
    ordered
}

impl ArtifactGenerator {
    pub fn new(
        provider: Arc<dyn TextGenerator>,
        corpus: Arc<dyn CorpusStore>,
        config: GeneratorConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_inflight.max(1)));
        Self {
            provider,
            corpus,
            config,
            permits,
        }
    }

    /// Generate all requested artifacts for one feature set.
    ///
    /// Requests are reordered so the Dockerfile is produced first and later
    /// artifacts see the context it established.
    pub async fn generate_all(
        &self,
        features: &FeatureSet,
        requests: &[ArtifactRequest],
        cancel: &CancelToken,
    ) -> Result<Vec<GeneratedArtifact>> {
        let ordered = ordered(requests);
        let mut ctx = GenerationContext::seed(features);
        let mut artifacts = Vec::with_capacity(ordered.len());
        for request in &ordered {
            let artifact = self.generate_one(features, &mut ctx, request, cancel, None).await?;
            artifacts.push(artifact);
        }
        Ok(artifacts)
    }

    /// Generate one artifact, choosing the tier.
    pub(crate) async fn generate_one(
        &self,
        features: &FeatureSet,
        ctx: &mut GenerationContext,
        request: &ArtifactRequest,
        cancel: &CancelToken,
        repair_context: Option<&str>,
    ) -> Result<GeneratedArtifact> {
        // The template tier only serves fresh generations. Repairs always
        // re-enter the generative tier: template output is schema-valid by
        // construction and never reaches the repair path. A request can also
        // opt out of the catalog outright.
        if repair_context.is_none()
            && !request.force_generative
            && matches!(features.confidence, ConfidenceTier::High)
        {
            if let Some(tpl) = template_for(features, request.kind, request.platform) {
                let content = tpl.render(ctx);
                ctx.establish();
                let mut artifact = GeneratedArtifact::from_generation(
                    features,
                    request,
                    content,
                    Provenance::Template {
                        version: TEMPLATE_VERSION,
                    },
                    TEMPLATE_CONFIDENCE,
                );
                artifact.record("template tier: catalog hit, provider skipped");
                obs::emit_artifact_generated(&artifact);
                return Ok(artifact);
            }
        }

        self.generate_generative(features, ctx, request, cancel, repair_context)
            .await
    }

    async fn generate_generative(
        &self,
        features: &FeatureSet,
        ctx: &mut GenerationContext,
        request: &ArtifactRequest,
        cancel: &CancelToken,
        repair_context: Option<&str>,
    ) -> Result<GeneratedArtifact> {
        let entries = self.corpus.entries(request.kind).await.map_err(GantryError::Store)?;
        let examples = prompt::top_k_examples(entries, &features.facets(), self.config.top_k);
        debug!(
            event = "generate.retrieval",
            kind = %request.kind,
            examples = examples.len(),
        );
        let text = prompt::build_prompt(
            features,
            ctx,
            request.kind,
            request.platform,
            &examples,
            repair_context,
        );

        let outcome = {
            // The semaphore is owned by this generator and never closed.
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| GenerationError::Cancelled)?;
            provider::generate_with_retry(self.provider.as_ref(), &text, &self.config.retry, cancel)
                .await
        };

        match outcome {
            RetryOutcome::Succeeded { response, attempts } => {
                let content = prompt::clean_response(request.kind, &response);
                ctx.establish();
                let confidence = if matches!(features.confidence, ConfidenceTier::High) {
                    GENERATIVE_CONFIDENCE_HIGH
                } else {
                    GENERATIVE_CONFIDENCE_LOW
                };
                let mut artifact = GeneratedArtifact::from_generation(
                    features,
                    request,
                    content,
                    Provenance::Generative {
                        model: self.provider.model_name().to_string(),
                    },
                    confidence,
                );
                artifact.record(format!(
                    "generative tier: {} succeeded on attempt {attempts}",
                    self.provider.model_name()
                ));
                if let Some(failure) = repair_context {
                    artifact.record(format!("repair regeneration after: {failure}"));
                }
                obs::emit_artifact_generated(&artifact);
                Ok(artifact)
            }
            RetryOutcome::Exhausted { last_error, attempts } => {
                self.fall_back(features, ctx, request, last_error, attempts)
            }
            RetryOutcome::Cancelled => Err(GenerationError::Cancelled.into()),
        }
    }

    /// Retry budget ran out: serve a template if the catalog has one.
    fn fall_back(
        &self,
        features: &FeatureSet,
        ctx: &mut GenerationContext,
        request: &ArtifactRequest,
        last_error: ProviderError,
        attempts: u32,
    ) -> Result<GeneratedArtifact> {
        if let Some(tpl) = template_for(features, request.kind, request.platform) {
            let content = tpl.render(ctx);
            ctx.establish();
            info!(
                event = "generate.fallback",
                kind = %request.kind,
                attempts,
                error = %last_error,
            );
            let mut artifact = GeneratedArtifact::from_generation(
                features,
                request,
                content,
                Provenance::TemplateFallback {
                    version: TEMPLATE_VERSION,
                    reason: last_error.to_string(),
                },
                FALLBACK_CONFIDENCE,
            );
            artifact.record(format!(
                "fallback: provider exhausted after {attempts} attempts ({last_error})"
            ));
            obs::emit_artifact_generated(&artifact);
            return Ok(artifact);
        }

        let err = match last_error {
            ProviderError::Timeout => GenerationError::ProviderTimeout {
                kind: request.kind,
                attempts,
                signature: features.signature(),
            },
            ProviderError::RateLimited => GenerationError::ProviderRateLimited {
                kind: request.kind,
                attempts,
                signature: features.signature(),
            },
            other => GenerationError::ExhaustedNoFallback {
                kind: request.kind,
                signature: features.signature(),
                last_error: Some(other),
            },
        };
        Err(err.into())
    }
}
