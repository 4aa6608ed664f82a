//! Generated artifacts, requests, and provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gantry_store::{ArtifactKind, Signature};

use super::feature_set::{ConfidenceTier, FeatureSet};

/// Version of the built-in template catalog. Bumped whenever any template
/// body changes, so template provenance stays reproducible.
pub const TEMPLATE_VERSION: u32 = 3;

/// CI/CD pipeline dialects gantry can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineFlavor {
    GithubActions,
    GitlabCi,
}

impl PipelineFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineFlavor::GithubActions => "github_actions",
            PipelineFlavor::GitlabCi => "gitlab_ci",
        }
    }

    /// Conventional file name for this flavor.
    pub fn file_name(&self) -> &'static str {
        match self {
            PipelineFlavor::GithubActions => "ci.yml",
            PipelineFlavor::GitlabCi => ".gitlab-ci.yml",
        }
    }
}

/// A request for one artifact of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRequest {
    pub kind: ArtifactKind,

    /// Target pipeline dialect; only meaningful for `CiPipeline` requests.
    pub platform: Option<PipelineFlavor>,

    /// Skip the template tier even when the catalog has a hit, forcing the
    /// generative path for repository-tailored output.
    #[serde(default)]
    pub force_generative: bool,
}

impl ArtifactRequest {
    pub fn new(kind: ArtifactKind) -> Self {
        Self {
            kind,
            platform: None,
            force_generative: false,
        }
    }

    /// Same request with the template tier bypassed.
    pub fn generative(mut self) -> Self {
        self.force_generative = true;
        self
    }

    pub fn pipeline(flavor: PipelineFlavor) -> Self {
        Self {
            kind: ArtifactKind::CiPipeline,
            platform: Some(flavor),
            force_generative: false,
        }
    }
}

/// Which tier produced an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum Provenance {
    /// Deterministic catalog substitution.
    Template { version: u32 },

    /// External text-generation capability.
    Generative { model: String },

    /// Generative tier exhausted its retry budget; template output served
    /// as the degraded-but-valid fallback.
    TemplateFallback { version: u32, reason: String },
}

impl Provenance {
    /// Whether the content came out of the template catalog (directly or
    /// as a fallback).
    pub fn is_template(&self) -> bool {
        !matches!(self, Provenance::Generative { .. })
    }
}

/// One entry in an artifact's diagnostic trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailEntry {
    pub at: DateTime<Utc>,
    pub note: String,
}

/// One generated deployment artifact.
///
/// Only constructible through [`GeneratedArtifact::from_generation`], which
/// takes the originating feature set and request: no artifact exists without
/// that upstream pair, and every artifact carries the feature signature that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub id: Uuid,
    pub kind: ArtifactKind,

    /// The artifact text.
    pub content: String,

    /// Generation confidence in `[0, 1]`.
    pub confidence: f32,

    pub provenance: Provenance,

    /// Low-confidence generative output must be reviewed before any
    /// downstream consumer treats it as accepted.
    pub needs_review: bool,

    /// Signature of the feature set this artifact was generated from.
    pub feature_signature: Signature,

    /// Diagnostic trail: tier decisions, retries, fallbacks, repairs.
    pub trail: Vec<TrailEntry>,
}

impl GeneratedArtifact {
    /// Construct an artifact from its originating `(FeatureSet, ArtifactRequest)`.
    pub fn from_generation(
        features: &FeatureSet,
        request: &ArtifactRequest,
        content: String,
        provenance: Provenance,
        confidence: f32,
    ) -> Self {
        let needs_review = !provenance.is_template()
            && !matches!(features.confidence, ConfidenceTier::High);
        Self {
            id: Uuid::new_v4(),
            kind: request.kind,
            content,
            confidence,
            provenance,
            needs_review,
            feature_signature: features.signature(),
            trail: Vec::new(),
        }
    }

    /// Append a diagnostic note.
    pub fn record(&mut self, note: impl Into<String>) {
        self.trail.push(TrailEntry {
            at: Utc::now(),
            note: note.into(),
        });
    }

    /// Conventional output file name for this artifact.
    pub fn file_name(&self, flavor: Option<PipelineFlavor>) -> String {
        match self.kind {
            ArtifactKind::Dockerfile => "Dockerfile".to_string(),
            ArtifactKind::KubernetesManifest => "k8s-manifests.yaml".to_string(),
            ArtifactKind::CiPipeline => flavor
                .unwrap_or(PipelineFlavor::GithubActions)
                .file_name()
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feature_set::{
        BuildTool, DependencyDecl, Ecosystem, EntryPoint, Framework, Language, LanguageStat,
    };

    fn features(confidence: ConfidenceTier) -> FeatureSet {
        FeatureSet {
            languages: vec![LanguageStat {
                language: Language::Python,
                bytes: 2048,
                files: 2,
            }],
            dependencies: vec![DependencyDecl {
                name: "flask".to_string(),
                version: None,
                ecosystem: Ecosystem::Pip,
            }],
            frameworks: vec![Framework::Flask],
            services: Vec::new(),
            build_tool: Some(BuildTool::Pip),
            entry_point: EntryPoint::Resolved {
                path: "app.py".to_string(),
            },
            confidence,
            app_name: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn artifact_carries_feature_signature() {
        let fs = features(ConfidenceTier::High);
        let artifact = GeneratedArtifact::from_generation(
            &fs,
            &ArtifactRequest::new(ArtifactKind::Dockerfile),
            "FROM python:3.12-slim".to_string(),
            Provenance::Template {
                version: TEMPLATE_VERSION,
            },
            0.9,
        );
        assert_eq!(artifact.feature_signature, fs.signature());
    }

    #[test]
    fn low_confidence_generative_output_needs_review() {
        let fs = features(ConfidenceTier::Low);
        let artifact = GeneratedArtifact::from_generation(
            &fs,
            &ArtifactRequest::new(ArtifactKind::Dockerfile),
            "FROM python:3.12-slim".to_string(),
            Provenance::Generative {
                model: "codellama".to_string(),
            },
            0.5,
        );
        assert!(artifact.needs_review);
    }

    #[test]
    fn template_output_never_needs_review() {
        let fs = features(ConfidenceTier::Indeterminate);
        let artifact = GeneratedArtifact::from_generation(
            &fs,
            &ArtifactRequest::new(ArtifactKind::Dockerfile),
            "FROM python:3.12-slim".to_string(),
            Provenance::TemplateFallback {
                version: TEMPLATE_VERSION,
                reason: "provider timeout".to_string(),
            },
            0.4,
        );
        assert!(!artifact.needs_review);
    }

    #[test]
    fn pipeline_file_names_follow_flavor() {
        let fs = features(ConfidenceTier::High);
        let artifact = GeneratedArtifact::from_generation(
            &fs,
            &ArtifactRequest::pipeline(PipelineFlavor::GitlabCi),
            "stages: [build]".to_string(),
            Provenance::Template {
                version: TEMPLATE_VERSION,
            },
            0.9,
        );
        assert_eq!(
            artifact.file_name(Some(PipelineFlavor::GitlabCi)),
            ".gitlab-ci.yml"
        );
    }
}
