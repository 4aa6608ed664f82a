//! Shared generation context for cross-artifact consistency.
//!
//! When several artifact kinds are generated for one request, the first
//! generated artifact establishes the deployment parameters (image name,
//! port, build command) and later artifacts reuse them through this
//! context instead of re-deriving them — the orchestration manifest's
//! target port can never disagree with the build file's exposed port.

use crate::domain::{BuildTool, FeatureSet, Framework, Language};

/// Fallback port when no framework convention applies.
pub const DEFAULT_PORT: u16 = 3000;

/// Parameters shared across the artifacts of one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    /// DNS-label-safe application name.
    pub app_name: String,

    /// Port the application listens on.
    pub port: u16,

    /// Container image reference later artifacts must use.
    pub image: String,

    /// Base image for the build file.
    pub base_image: String,

    /// Dependency install command.
    pub install_command: String,

    /// Process start command.
    pub run_command: String,

    /// Set once the first artifact has been generated; later artifacts
    /// reuse rather than re-derive.
    pub established: bool,
}

impl GenerationContext {
    /// Seed the context from a feature set. Everything here is a pure
    /// derivation; `established` flips when the first artifact lands.
    pub fn seed(features: &FeatureSet) -> Self {
        let app_name = features
            .app_name
            .clone()
            .unwrap_or_else(|| "app".to_string());
        let port = features
            .primary_framework()
            .map(|f| f.default_port())
            .unwrap_or(DEFAULT_PORT);
        let language = features
            .primary_language()
            .map(|l| l.template_family())
            .or_else(|| features.primary_framework().map(|f| f.language()));
        let entry = features.entry_point.as_option();

        let base_image = match language {
            Some(Language::JavaScript) => "node:20-alpine",
            Some(Language::Python) => "python:3.12-slim",
            Some(Language::Rust) => "rust:1.75-slim",
            Some(Language::Go) => "golang:1.21-alpine",
            Some(Language::Java) => "eclipse-temurin:21-jre-alpine",
            Some(Language::Php) => "php:8.3-apache",
            Some(Language::Ruby) => "ruby:3.3-slim",
            Some(Language::TypeScript) | None => "alpine:3.19",
        }
        .to_string();

        let install_command = match features.build_tool {
            Some(BuildTool::Npm) => "npm ci --omit=dev",
            Some(BuildTool::Pip) => "pip install --no-cache-dir -r requirements.txt",
            Some(BuildTool::Cargo) => "cargo build --release",
            Some(BuildTool::GoTool) => "go build -o /bin/app .",
            Some(BuildTool::Maven) => "mvn -q package -DskipTests",
            Some(BuildTool::Gradle) => "gradle build -x test",
            Some(BuildTool::Composer) => "composer install --no-dev",
            None => "true",
        }
        .to_string();

        let run_command = match (language, features.primary_framework(), entry) {
            (_, Some(Framework::Django), _) => {
                format!("python manage.py runserver 0.0.0.0:{port}")
            }
            (_, Some(Framework::FastApi), Some(entry)) => {
                let module = entry.trim_end_matches(".py").replace('/', ".");
                format!("uvicorn {module}:app --host 0.0.0.0 --port {port}")
            }
            (Some(Language::JavaScript), _, Some(entry)) => format!("node {entry}"),
            (Some(Language::Python), _, Some(entry)) => format!("python {entry}"),
            (Some(Language::Go), ..) => "/bin/app".to_string(),
            (Some(Language::Rust), ..) => format!("/usr/local/bin/{app_name}"),
            (Some(Language::Php), ..) => "apache2-foreground".to_string(),
            (Some(Language::JavaScript), _, None) => "node index.js".to_string(),
            _ => format!("./{app_name}"),
        };

        Self {
            image: format!("{app_name}:latest"),
            app_name,
            port,
            base_image,
            install_command,
            run_command,
            established: false,
        }
    }

    /// Mark the parameters as established by a generated artifact.
    pub fn establish(&mut self) {
        self.established = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConfidenceTier, DependencyDecl, Ecosystem, EntryPoint, LanguageStat,
    };

    fn express_features() -> FeatureSet {
        FeatureSet {
            languages: vec![LanguageStat {
                language: Language::JavaScript,
                bytes: 1000,
                files: 2,
            }],
            dependencies: vec![DependencyDecl {
                name: "express".to_string(),
                version: None,
                ecosystem: Ecosystem::Npm,
            }],
            frameworks: vec![Framework::Express],
            services: Vec::new(),
            build_tool: Some(BuildTool::Npm),
            entry_point: EntryPoint::Resolved {
                path: "server.js".to_string(),
            },
            confidence: ConfidenceTier::High,
            app_name: Some("shop-api".to_string()),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn seed_uses_framework_conventions() {
        let ctx = GenerationContext::seed(&express_features());
        assert_eq!(ctx.port, 3000);
        assert_eq!(ctx.image, "shop-api:latest");
        assert_eq!(ctx.base_image, "node:20-alpine");
        assert_eq!(ctx.run_command, "node server.js");
    }

    #[test]
    fn seed_without_framework_uses_default_port() {
        let mut features = express_features();
        features.frameworks.clear();
        let ctx = GenerationContext::seed(&features);
        assert_eq!(ctx.port, DEFAULT_PORT);
    }

    #[test]
    fn fastapi_run_command_targets_the_module() {
        let mut features = express_features();
        features.frameworks = vec![Framework::FastApi];
        features.entry_point = EntryPoint::Resolved {
            path: "src/main.py".to_string(),
        };
        let ctx = GenerationContext::seed(&features);
        assert_eq!(
            ctx.run_command,
            "uvicorn src.main:app --host 0.0.0.0 --port 8000"
        );
    }
}
