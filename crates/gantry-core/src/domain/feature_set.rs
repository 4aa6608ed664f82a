//! The `FeatureSet`: structured inference of a repository's tech stack.
//!
//! A `FeatureSet` is computed once per snapshot and never mutated afterwards.
//! Its [`FeatureSet::signature`] flattens the defining fields into a stable
//! key used for corpus lookup and artifact traceability.

use serde::{Deserialize, Serialize};

use gantry_store::{RetrievalFacets, Signature};

// ---------------------------------------------------------------------------
// Languages and ecosystems
// ---------------------------------------------------------------------------

/// Programming languages gantry recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Rust,
    Go,
    Java,
    Php,
    Ruby,
}

impl Language {
    /// Stable lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
            Language::Php => "php",
            Language::Ruby => "ruby",
        }
    }

    /// The language family used for template lookup: TypeScript collapses
    /// onto JavaScript since both deploy through the Node toolchain.
    pub fn template_family(&self) -> Language {
        match self {
            Language::TypeScript => Language::JavaScript,
            other => *other,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dependency ecosystems (one per manifest family).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ecosystem {
    Npm,
    Pip,
    Cargo,
    GoModules,
    Maven,
    Gradle,
    Composer,
}

impl Ecosystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::Pip => "pip",
            Ecosystem::Cargo => "cargo",
            Ecosystem::GoModules => "go_modules",
            Ecosystem::Maven => "maven",
            Ecosystem::Gradle => "gradle",
            Ecosystem::Composer => "composer",
        }
    }
}

/// One declared dependency from a recognized manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDecl {
    /// Package name as declared.
    pub name: String,

    /// Declared version constraint, when present.
    pub version: Option<String>,

    /// Ecosystem the declaration came from.
    pub ecosystem: Ecosystem,
}

/// Size-weighted language histogram entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageStat {
    pub language: Language,

    /// Cumulative byte size of source files. Sizes, not file counts,
    /// so many small incidental files do not skew the histogram.
    pub bytes: u64,

    /// Number of source files.
    pub files: usize,
}

// ---------------------------------------------------------------------------
// Frameworks and services
// ---------------------------------------------------------------------------

/// Web frameworks with known deployment conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    Express,
    Fastify,
    Koa,
    NextJs,
    React,
    Flask,
    Django,
    FastApi,
    Rails,
    SpringBoot,
    ActixWeb,
    Axum,
    Gin,
    Laravel,
}

impl Framework {
    /// Stable lowercase identifier; also the tie-break sort key when
    /// several equally specific signatures match.
    pub fn id(&self) -> &'static str {
        match self {
            Framework::Express => "express",
            Framework::Fastify => "fastify",
            Framework::Koa => "koa",
            Framework::NextJs => "nextjs",
            Framework::React => "react",
            Framework::Flask => "flask",
            Framework::Django => "django",
            Framework::FastApi => "fastapi",
            Framework::Rails => "rails",
            Framework::SpringBoot => "spring_boot",
            Framework::ActixWeb => "actix_web",
            Framework::Axum => "axum",
            Framework::Gin => "gin",
            Framework::Laravel => "laravel",
        }
    }

    /// Conventional listen port for the framework's default setup.
    pub fn default_port(&self) -> u16 {
        match self {
            Framework::Express
            | Framework::Fastify
            | Framework::Koa
            | Framework::NextJs
            | Framework::React
            | Framework::Rails
            | Framework::Axum => 3000,
            Framework::Flask => 5000,
            Framework::Django | Framework::FastApi | Framework::Laravel => 8000,
            Framework::SpringBoot | Framework::ActixWeb | Framework::Gin => 8080,
        }
    }

    /// Language this framework belongs to.
    pub fn language(&self) -> Language {
        match self {
            Framework::Express
            | Framework::Fastify
            | Framework::Koa
            | Framework::NextJs
            | Framework::React => Language::JavaScript,
            Framework::Flask | Framework::Django | Framework::FastApi => Language::Python,
            Framework::Rails => Language::Ruby,
            Framework::SpringBoot => Language::Java,
            Framework::ActixWeb | Framework::Axum => Language::Rust,
            Framework::Gin => Language::Go,
            Framework::Laravel => Language::Php,
        }
    }
}

/// External services a repository appears to depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Postgres,
    Mysql,
    Redis,
    MongoDb,
    Elasticsearch,
    RabbitMq,
    Kafka,
}

impl ServiceKind {
    pub fn id(&self) -> &'static str {
        match self {
            ServiceKind::Postgres => "postgres",
            ServiceKind::Mysql => "mysql",
            ServiceKind::Redis => "redis",
            ServiceKind::MongoDb => "mongodb",
            ServiceKind::Elasticsearch => "elasticsearch",
            ServiceKind::RabbitMq => "rabbitmq",
            ServiceKind::Kafka => "kafka",
        }
    }
}

/// How strongly a service was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintConfidence {
    /// Substring/heuristic match in source text.
    Low,
    /// Exact dependency-name match.
    High,
}

/// A detected service with its detection confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHint {
    pub service: ServiceKind,
    pub confidence: HintConfidence,
}

// ---------------------------------------------------------------------------
// Build tools and entry points
// ---------------------------------------------------------------------------

/// Detected build/package tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildTool {
    Npm,
    Pip,
    Cargo,
    GoTool,
    Maven,
    Gradle,
    Composer,
}

impl BuildTool {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTool::Npm => "npm",
            BuildTool::Pip => "pip",
            BuildTool::Cargo => "cargo",
            BuildTool::GoTool => "go",
            BuildTool::Maven => "maven",
            BuildTool::Gradle => "gradle",
            BuildTool::Composer => "composer",
        }
    }
}

/// Application entry point. Detection failure is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EntryPoint {
    Resolved { path: String },
    Unresolved,
}

impl EntryPoint {
    pub fn as_option(&self) -> Option<&str> {
        match self {
            EntryPoint::Resolved { path } => Some(path),
            EntryPoint::Unresolved => None,
        }
    }
}

/// Overall confidence in the extracted feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    /// Manifest parsed and a framework identified: template tier eligible.
    High,
    /// Manifest parsed but the stack is only partially understood.
    Low,
    /// No manifest recognized for any language. A valid output state that
    /// downstream stages branch on, never an error.
    Indeterminate,
}

// ---------------------------------------------------------------------------
// FeatureSet
// ---------------------------------------------------------------------------

/// Structured inference of a repository's tech stack.
///
/// Immutable once computed for a given commit; there is no mutating API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Size-weighted language histogram, largest first.
    pub languages: Vec<LanguageStat>,

    /// All dependency declarations from recognized manifests.
    pub dependencies: Vec<DependencyDecl>,

    /// Detected frameworks, tie-break ordered (lexical by id).
    pub frameworks: Vec<Framework>,

    /// Confidence-weighted set of detected external services.
    pub services: Vec<ServiceHint>,

    /// Detected build tool, when a manifest implies one.
    pub build_tool: Option<BuildTool>,

    /// Detected application entry point.
    pub entry_point: EntryPoint,

    /// Overall confidence tier.
    pub confidence: ConfidenceTier,

    /// Application name recovered from the primary manifest, sanitized to a
    /// DNS-label-safe form for image and manifest naming.
    pub app_name: Option<String>,

    /// Warnings carried forward from scanning and extraction.
    pub warnings: Vec<String>,
}

impl FeatureSet {
    /// The dominant language by cumulative source size.
    pub fn primary_language(&self) -> Option<Language> {
        self.languages.first().map(|s| s.language)
    }

    /// The tie-break winner among detected frameworks.
    pub fn primary_framework(&self) -> Option<Framework> {
        self.frameworks.first().copied()
    }

    /// Whether any service was detected at the given confidence or higher.
    pub fn has_service(&self, service: ServiceKind) -> Option<HintConfidence> {
        self.services
            .iter()
            .filter(|h| h.service == service)
            .map(|h| h.confidence)
            .max()
    }

    /// Stable signature over the defining fields, used as the corpus key.
    ///
    /// Field order is fixed: languages, frameworks, services, build tool,
    /// entry point. Dependency names are deliberately excluded so version
    /// bumps and incidental additions do not fragment the corpus.
    pub fn signature(&self) -> Signature {
        let mut parts: Vec<String> = Vec::new();
        for stat in &self.languages {
            parts.push(format!("lang:{}", stat.language.as_str()));
        }
        for fw in &self.frameworks {
            parts.push(format!("fw:{}", fw.id()));
        }
        let mut service_ids: Vec<String> = self
            .services
            .iter()
            .map(|h| format!("svc:{}", h.service.id()))
            .collect();
        service_ids.sort();
        service_ids.dedup();
        parts.extend(service_ids);
        if let Some(tool) = self.build_tool {
            parts.push(format!("build:{}", tool.as_str()));
        }
        if let Some(entry) = self.entry_point.as_option() {
            parts.push(format!("entry:{entry}"));
        }
        Signature::from_parts(parts)
    }

    /// Facets persisted with corpus entries for similarity retrieval.
    pub fn facets(&self) -> RetrievalFacets {
        let mut dependencies: Vec<String> =
            self.dependencies.iter().map(|d| d.name.clone()).collect();
        dependencies.sort();
        dependencies.dedup();
        let mut services: Vec<String> = self.services.iter().map(|h| h.service.id().to_string()).collect();
        services.sort();
        services.dedup();
        RetrievalFacets {
            frameworks: self.frameworks.iter().map(|f| f.id().to_string()).collect(),
            services,
            dependencies,
        }
    }
}
