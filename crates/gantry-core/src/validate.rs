//! Schema validation for generated artifacts.
//!
//! Validation is pure and synchronous: it judges content, never provenance.
//! Template output passes by construction but is validated anyway, so a
//! catalog regression is caught the same way a bad model response is.

use serde::Deserialize;
use serde_yaml::Value;

use crate::domain::{ArtifactKind, PipelineFlavor, ValidationError};

const DOCKERFILE_INSTRUCTIONS: &[&str] = &[
    "FROM",
    "RUN",
    "CMD",
    "LABEL",
    "EXPOSE",
    "ENV",
    "ADD",
    "COPY",
    "ENTRYPOINT",
    "VOLUME",
    "USER",
    "WORKDIR",
    "ARG",
    "ONBUILD",
    "STOPSIGNAL",
    "HEALTHCHECK",
    "SHELL",
    "MAINTAINER",
];

fn violation(kind: ArtifactKind, message: impl Into<String>) -> ValidationError {
    ValidationError::SchemaViolation {
        kind,
        message: message.into(),
    }
}

/// Validate one artifact's content against its kind's schema.
pub fn validate(
    kind: ArtifactKind,
    content: &str,
    flavor: Option<PipelineFlavor>,
) -> Result<(), ValidationError> {
    match kind {
        ArtifactKind::Dockerfile => validate_dockerfile(content),
        ArtifactKind::KubernetesManifest => validate_k8s(content),
        ArtifactKind::CiPipeline => match flavor.unwrap_or(PipelineFlavor::GithubActions) {
            PipelineFlavor::GithubActions => validate_github_actions(content),
            PipelineFlavor::GitlabCi => validate_gitlab_ci(content),
        },
    }
}

/// Instruction-level Dockerfile check: known instructions only, an `ARG`
/// prologue at most before the first `FROM`, and at least one `FROM`.
fn validate_dockerfile(content: &str) -> Result<(), ValidationError> {
    let kind = ArtifactKind::Dockerfile;
    let mut instructions: Vec<String> = Vec::new();
    let mut continuation = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if continuation {
            continuation = trimmed.ends_with('\\');
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        continuation = trimmed.ends_with('\\');
        let word = trimmed
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        instructions.push(word);
    }

    let Some(first) = instructions.first() else {
        return Err(violation(kind, "empty Dockerfile"));
    };
    if first != "FROM" && first != "ARG" {
        return Err(violation(
            kind,
            format!("first instruction is {first}, expected FROM or ARG"),
        ));
    }
    if !instructions.iter().any(|i| i == "FROM") {
        return Err(violation(kind, "no FROM instruction"));
    }
    for instruction in &instructions {
        if !DOCKERFILE_INSTRUCTIONS.contains(&instruction.as_str()) {
            return Err(violation(
                kind,
                format!("unknown instruction {instruction}"),
            ));
        }
    }
    Ok(())
}

/// Every YAML document must carry `apiVersion`, `kind`, and `metadata.name`.
fn validate_k8s(content: &str) -> Result<(), ValidationError> {
    let kind = ArtifactKind::KubernetesManifest;
    let mut documents = 0usize;
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)
            .map_err(|e| violation(kind, format!("invalid YAML: {e}")))?;
        if value.is_null() {
            continue;
        }
        documents += 1;
        let mapping = value
            .as_mapping()
            .ok_or_else(|| violation(kind, "document is not a mapping"))?;
        for field in ["apiVersion", "kind"] {
            let present = mapping
                .get(&Value::from(field))
                .and_then(Value::as_str)
                .is_some();
            if !present {
                return Err(violation(kind, format!("document missing {field}")));
            }
        }
        let name = mapping
            .get(&Value::from("metadata"))
            .and_then(Value::as_mapping)
            .and_then(|m| m.get(&Value::from("name")))
            .and_then(Value::as_str);
        if name.is_none() {
            return Err(violation(kind, "document missing metadata.name"));
        }
    }
    if documents == 0 {
        return Err(violation(kind, "no YAML documents"));
    }
    Ok(())
}

fn parse_yaml_mapping(content: &str, kind: ArtifactKind) -> Result<Value, ValidationError> {
    let value: Value = serde_yaml::from_str(content)
        .map_err(|e| violation(kind, format!("invalid YAML: {e}")))?;
    if !value.is_mapping() {
        return Err(violation(kind, "document is not a mapping"));
    }
    Ok(value)
}

/// GitHub Actions: a trigger, and every job has `runs-on` and `steps`.
fn validate_github_actions(content: &str) -> Result<(), ValidationError> {
    let kind = ArtifactKind::CiPipeline;
    let value = parse_yaml_mapping(content, kind)?;
    // Some YAML 1.1 parsers resolve a plain `on` key to boolean true.
    let trigger = value
        .get("on")
        .or_else(|| value.get(Value::Bool(true)))
        .is_some();
    if !trigger {
        return Err(violation(kind, "workflow has no `on` trigger"));
    }
    let jobs = value
        .get("jobs")
        .and_then(Value::as_mapping)
        .ok_or_else(|| violation(kind, "workflow has no jobs"))?;
    if jobs.is_empty() {
        return Err(violation(kind, "workflow has no jobs"));
    }
    for (name, job) in jobs {
        let name = name.as_str().unwrap_or("<non-string>");
        let job = job
            .as_mapping()
            .ok_or_else(|| violation(kind, format!("job {name} is not a mapping")))?;
        if job.get(&Value::from("runs-on")).is_none() {
            return Err(violation(kind, format!("job {name} missing runs-on")));
        }
        let steps = job.get(&Value::from("steps")).and_then(Value::as_sequence);
        if steps.map(|s| s.is_empty()).unwrap_or(true) {
            return Err(violation(kind, format!("job {name} has no steps")));
        }
    }
    Ok(())
}

const GITLAB_RESERVED: &[&str] = &[
    "stages",
    "variables",
    "image",
    "services",
    "before_script",
    "after_script",
    "default",
    "include",
    "workflow",
    "cache",
];

/// GitLab CI: at least one job, and every job has a `script`.
fn validate_gitlab_ci(content: &str) -> Result<(), ValidationError> {
    let kind = ArtifactKind::CiPipeline;
    let value = parse_yaml_mapping(content, kind)?;
    let mapping = value.as_mapping().ok_or_else(|| violation(kind, "not a mapping"))?;
    let mut jobs = 0usize;
    for (name, body) in mapping {
        let Some(name) = name.as_str() else { continue };
        if GITLAB_RESERVED.contains(&name) || name.starts_with('.') {
            continue;
        }
        jobs += 1;
        let has_script = body
            .as_mapping()
            .map(|m| m.get(&Value::from("script")).is_some())
            .unwrap_or(false);
        if !has_script {
            return Err(violation(kind, format!("job {name} missing script")));
        }
    }
    if jobs == 0 {
        return Err(violation(kind, "pipeline defines no jobs"));
    }
    Ok(())
}
