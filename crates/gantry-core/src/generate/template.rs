//! Deterministic template tier.
//!
//! A catalog keyed by `(language family, artifact kind, pipeline flavor)`
//! whose entries are parameterized by the shared [`GenerationContext`].
//! Rendering is a pure function of `(context, TEMPLATE_VERSION)`: identical
//! inputs always produce byte-identical output.

use crate::domain::{ArtifactKind, FeatureSet, Language, PipelineFlavor};

use super::context::GenerationContext;

/// One catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    body: &'static str,
}

impl Template {
    /// Substitute context parameters into the template body.
    pub fn render(&self, ctx: &GenerationContext) -> String {
        self.body
            .replace("{{app_name}}", &ctx.app_name)
            .replace("{{image}}", &ctx.image)
            .replace("{{base_image}}", &ctx.base_image)
            .replace("{{port}}", &ctx.port.to_string())
            .replace("{{install}}", &ctx.install_command)
            .replace("{{run}}", &ctx.run_command)
    }
}

/// Look up the template for a feature set and artifact kind.
///
/// Dockerfiles are per-language; manifests are language-agnostic (the
/// context carries everything they need); pipelines are per-flavor and
/// per-language.
pub fn template_for(
    features: &FeatureSet,
    kind: ArtifactKind,
    flavor: Option<PipelineFlavor>,
) -> Option<Template> {
    let language = features
        .primary_language()
        .map(|l| l.template_family())
        .or_else(|| features.primary_framework().map(|f| f.language()))?;

    let body = match kind {
        ArtifactKind::Dockerfile => dockerfile_body(language)?,
        ArtifactKind::KubernetesManifest => K8S_MANIFESTS,
        ArtifactKind::CiPipeline => {
            pipeline_body(language, flavor.unwrap_or(PipelineFlavor::GithubActions))?
        }
    };
    Some(Template { body })
}

fn dockerfile_body(language: Language) -> Option<&'static str> {
    match language {
        Language::JavaScript | Language::TypeScript => Some(DOCKERFILE_NODE),
        Language::Python => Some(DOCKERFILE_PYTHON),
        Language::Rust => Some(DOCKERFILE_RUST),
        Language::Go => Some(DOCKERFILE_GO),
        Language::Java | Language::Php | Language::Ruby => None,
    }
}

fn pipeline_body(language: Language, flavor: PipelineFlavor) -> Option<&'static str> {
    match (language, flavor) {
        (Language::JavaScript | Language::TypeScript, PipelineFlavor::GithubActions) => {
            Some(GHA_NODE)
        }
        (Language::Python, PipelineFlavor::GithubActions) => Some(GHA_PYTHON),
        (Language::Rust, PipelineFlavor::GithubActions) => Some(GHA_RUST),
        (Language::Go, PipelineFlavor::GithubActions) => Some(GHA_GO),
        (Language::JavaScript | Language::TypeScript | Language::Python, PipelineFlavor::GitlabCi) => {
            Some(GITLAB_GENERIC)
        }
        (Language::Rust | Language::Go, PipelineFlavor::GitlabCi) => Some(GITLAB_GENERIC),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Dockerfiles
// ---------------------------------------------------------------------------

const DOCKERFILE_NODE: &str = r#"# syntax=docker/dockerfile:1
FROM {{base_image}} AS deps
WORKDIR /app
COPY package*.json ./
RUN {{install}}

FROM {{base_image}}
WORKDIR /app
RUN addgroup -S app && adduser -S app -G app
COPY --from=deps /app/node_modules ./node_modules
COPY . .
USER app
ENV NODE_ENV=production
EXPOSE {{port}}
CMD ["sh", "-c", "{{run}}"]
"#;

const DOCKERFILE_PYTHON: &str = r#"# syntax=docker/dockerfile:1
FROM {{base_image}}
WORKDIR /app
RUN useradd --create-home app
COPY requirements.txt ./
RUN {{install}}
COPY . .
USER app
ENV PYTHONUNBUFFERED=1
EXPOSE {{port}}
CMD ["sh", "-c", "{{run}}"]
"#;

const DOCKERFILE_RUST: &str = r#"# syntax=docker/dockerfile:1
FROM {{base_image}} AS builder
WORKDIR /build
COPY . .
RUN {{install}}

FROM debian:bookworm-slim
RUN useradd --create-home app
COPY --from=builder /build/target/release/{{app_name}} /usr/local/bin/{{app_name}}
USER app
EXPOSE {{port}}
CMD ["{{run}}"]
"#;

const DOCKERFILE_GO: &str = r#"# syntax=docker/dockerfile:1
FROM {{base_image}} AS builder
WORKDIR /build
COPY go.* ./
RUN go mod download
COPY . .
RUN {{install}}

FROM alpine:3.19
RUN adduser -S app
COPY --from=builder /bin/app /bin/app
USER app
EXPOSE {{port}}
CMD ["{{run}}"]
"#;

// ---------------------------------------------------------------------------
// Kubernetes manifests
// ---------------------------------------------------------------------------

const K8S_MANIFESTS: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: {{app_name}}
  labels:
    app: {{app_name}}
spec:
  replicas: 3
  selector:
    matchLabels:
      app: {{app_name}}
  template:
    metadata:
      labels:
        app: {{app_name}}
    spec:
      containers:
        - name: {{app_name}}
          image: {{image}}
          ports:
            - containerPort: {{port}}
          envFrom:
            - configMapRef:
                name: {{app_name}}-config
          resources:
            requests:
              cpu: 100m
              memory: 128Mi
            limits:
              cpu: 500m
              memory: 512Mi
          livenessProbe:
            tcpSocket:
              port: {{port}}
            initialDelaySeconds: 10
          readinessProbe:
            tcpSocket:
              port: {{port}}
            initialDelaySeconds: 5
---
apiVersion: v1
kind: Service
metadata:
  name: {{app_name}}
spec:
  selector:
    app: {{app_name}}
  ports:
    - port: 80
      targetPort: {{port}}
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: {{app_name}}-config
data:
  PORT: "{{port}}"
"#;

// ---------------------------------------------------------------------------
// CI pipelines
// ---------------------------------------------------------------------------

const GHA_NODE: &str = r#"name: ci
on:
  push:
    branches: [main]
  pull_request: {}
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - uses: actions/setup-node@v4
        with:
          node-version: 20
      - run: npm ci
      - run: npm test --if-present
      - run: docker build -t {{image}} .
"#;

const GHA_PYTHON: &str = r#"name: ci
on:
  push:
    branches: [main]
  pull_request: {}
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - uses: actions/setup-python@v5
        with:
          python-version: "3.12"
      - run: {{install}}
      - run: python -m pytest || test ! -d tests
      - run: docker build -t {{image}} .
"#;

const GHA_RUST: &str = r#"name: ci
on:
  push:
    branches: [main]
  pull_request: {}
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - uses: dtolnay/rust-toolchain@stable
      - run: cargo test --all-features
      - run: docker build -t {{image}} .
"#;

const GHA_GO: &str = r#"name: ci
on:
  push:
    branches: [main]
  pull_request: {}
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - uses: actions/setup-go@v5
        with:
          go-version: "1.21"
      - run: go test ./...
      - run: docker build -t {{image}} .
"#;

const GITLAB_GENERIC: &str = r#"stages:
  - test
  - build

test:
  stage: test
  image: {{base_image}}
  script:
    - {{install}}

build-image:
  stage: build
  image: docker:24
  services:
    - docker:24-dind
  script:
    - docker build -t {{image}} .
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BuildTool, ConfidenceTier, EntryPoint, Framework, LanguageStat,
    };

    fn features(language: Language, framework: Option<Framework>) -> FeatureSet {
        FeatureSet {
            languages: vec![LanguageStat {
                language,
                bytes: 100,
                files: 1,
            }],
            dependencies: Vec::new(),
            frameworks: framework.into_iter().collect(),
            services: Vec::new(),
            build_tool: Some(BuildTool::Npm),
            entry_point: EntryPoint::Resolved {
                path: "server.js".to_string(),
            },
            confidence: ConfidenceTier::High,
            app_name: Some("web".to_string()),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn rendering_is_pure() {
        let fs = features(Language::JavaScript, Some(Framework::Express));
        let ctx = GenerationContext::seed(&fs);
        let template = template_for(&fs, ArtifactKind::Dockerfile, None).unwrap();
        assert_eq!(template.render(&ctx), template.render(&ctx));
    }

    #[test]
    fn rendered_dockerfile_exposes_the_context_port() {
        let fs = features(Language::JavaScript, Some(Framework::Express));
        let ctx = GenerationContext::seed(&fs);
        let rendered = template_for(&fs, ArtifactKind::Dockerfile, None)
            .unwrap()
            .render(&ctx);
        assert!(rendered.contains("EXPOSE 3000"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn manifest_and_dockerfile_share_the_port() {
        let fs = features(Language::Python, Some(Framework::Flask));
        let ctx = GenerationContext::seed(&fs);
        let dockerfile = template_for(&fs, ArtifactKind::Dockerfile, None)
            .unwrap()
            .render(&ctx);
        let manifest = template_for(&fs, ArtifactKind::KubernetesManifest, None)
            .unwrap()
            .render(&ctx);
        assert!(dockerfile.contains("EXPOSE 5000"));
        assert!(manifest.contains("targetPort: 5000"));
        assert!(manifest.contains("containerPort: 5000"));
    }

    #[test]
    fn no_template_for_unsupported_language_dockerfile() {
        let fs = features(Language::Ruby, None);
        assert!(template_for(&fs, ArtifactKind::Dockerfile, None).is_none());
    }

    #[test]
    fn pipeline_flavor_selects_the_dialect() {
        let fs = features(Language::Go, Some(Framework::Gin));
        let ctx = GenerationContext::seed(&fs);
        let gha = template_for(&fs, ArtifactKind::CiPipeline, Some(PipelineFlavor::GithubActions))
            .unwrap()
            .render(&ctx);
        let gitlab = template_for(&fs, ArtifactKind::CiPipeline, Some(PipelineFlavor::GitlabCi))
            .unwrap()
            .render(&ctx);
        assert!(gha.contains("runs-on: ubuntu-latest"));
        assert!(gitlab.contains("stages:"));
    }
}
