//! Prompt assembly and response cleanup for the generative tier.
//!
//! Prompts embed a structured summary of the feature set plus the most
//! similar accepted examples retrieved from the corpus. Similarity is a
//! weighted Jaccard over the framework/service/dependency facets
//! (frameworks x3, services x2, dependencies x1).

use std::collections::HashSet;

use gantry_store::{ArtifactKind, RetrievalFacets, StoredExample};

use crate::domain::{FeatureSet, PipelineFlavor};

use super::context::GenerationContext;

/// Weighted Jaccard similarity between two facet sets, in `[0, 1]`.
pub fn similarity(a: &RetrievalFacets, b: &RetrievalFacets) -> f64 {
    let score = |xs: &[String], ys: &[String]| -> (f64, f64) {
        let xs: HashSet<&str> = xs.iter().map(String::as_str).collect();
        let ys: HashSet<&str> = ys.iter().map(String::as_str).collect();
        let inter = xs.intersection(&ys).count() as f64;
        let union = xs.union(&ys).count() as f64;
        (inter, union)
    };

    let weights = [3.0, 2.0, 1.0];
    let pairs = [
        score(&a.frameworks, &b.frameworks),
        score(&a.services, &b.services),
        score(&a.dependencies, &b.dependencies),
    ];

    let mut num = 0.0;
    let mut den = 0.0;
    for (w, (inter, union)) in weights.iter().zip(pairs) {
        num += w * inter;
        den += w * union;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// The `k` corpus examples most similar to `facets`, best first.
/// Zero-similarity entries are never returned.
pub fn top_k_examples(
    mut entries: Vec<StoredExample>,
    facets: &RetrievalFacets,
    k: usize,
) -> Vec<StoredExample> {
    entries.retain(|e| similarity(&e.facets, facets) > 0.0);
    entries.sort_by(|a, b| {
        similarity(&b.facets, facets)
            .partial_cmp(&similarity(&a.facets, facets))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.signature.as_str().cmp(b.signature.as_str()))
    });
    entries.truncate(k);
    entries
}

fn kind_description(kind: ArtifactKind, flavor: Option<PipelineFlavor>) -> &'static str {
    match kind {
        ArtifactKind::Dockerfile => "an optimized, production-ready Dockerfile",
        ArtifactKind::KubernetesManifest => {
            "production-ready Kubernetes manifests (Deployment, Service, ConfigMap)"
        }
        ArtifactKind::CiPipeline => match flavor {
            Some(PipelineFlavor::GitlabCi) => "a GitLab CI pipeline definition (.gitlab-ci.yml)",
            _ => "a GitHub Actions workflow definition",
        },
    }
}

/// Build the structured generation prompt.
///
/// `repair_context` carries a validation failure from the bounded repair
/// cycle; when present the prompt asks for a corrected artifact.
pub fn build_prompt(
    features: &FeatureSet,
    ctx: &GenerationContext,
    kind: ArtifactKind,
    flavor: Option<PipelineFlavor>,
    examples: &[StoredExample],
    repair_context: Option<&str>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "You are an expert DevOps engineer. Create {}.\n\n",
        kind_description(kind, flavor)
    ));

    prompt.push_str("Repository analysis:\n");
    prompt.push_str(&format!("- App name: {}\n", ctx.app_name));
    let languages: Vec<String> = features
        .languages
        .iter()
        .map(|s| format!("{} ({} bytes)", s.language, s.bytes))
        .collect();
    prompt.push_str(&format!(
        "- Languages: {}\n",
        if languages.is_empty() {
            "unknown".to_string()
        } else {
            languages.join(", ")
        }
    ));
    let frameworks: Vec<&str> = features.frameworks.iter().map(|f| f.id()).collect();
    prompt.push_str(&format!(
        "- Frameworks: {}\n",
        if frameworks.is_empty() {
            "none detected".to_string()
        } else {
            frameworks.join(", ")
        }
    ));
    let services: Vec<String> = features
        .services
        .iter()
        .map(|h| format!("{} ({:?} confidence)", h.service.id(), h.confidence))
        .collect();
    if !services.is_empty() {
        prompt.push_str(&format!("- External services: {}\n", services.join(", ")));
    }
    let deps: Vec<&str> = features
        .dependencies
        .iter()
        .take(30)
        .map(|d| d.name.as_str())
        .collect();
    if !deps.is_empty() {
        prompt.push_str(&format!("- Dependencies: {}\n", deps.join(", ")));
    }
    prompt.push_str(&format!(
        "- Entry point: {}\n",
        features.entry_point.as_option().unwrap_or("unresolved")
    ));
    prompt.push_str(&format!("- Listen port: {}\n", ctx.port));
    prompt.push_str(&format!("- Container image: {}\n", ctx.image));

    if !examples.is_empty() {
        prompt.push_str("\nAccepted examples from similar repositories:\n");
        for (i, example) in examples.iter().enumerate() {
            prompt.push_str(&format!("--- example {} ---\n{}\n", i + 1, example.content));
        }
    }

    prompt.push_str("\nRequirements:\n");
    match kind {
        ArtifactKind::Dockerfile => {
            prompt.push_str(
                "1. Use a multi-stage build where it reduces image size\n\
                 2. Run as a non-root user on a minimal base image\n\
                 3. Copy dependency manifests before source for layer caching\n",
            );
            prompt.push_str(&format!("4. EXPOSE port {}\n", ctx.port));
        }
        ArtifactKind::KubernetesManifest => {
            prompt.push_str(&format!(
                "1. Generate Deployment, Service, and ConfigMap manifests separated by '---'\n\
                 2. Use image '{}'\n\
                 3. Set replicas to 3 and include resource requests and limits\n\
                 4. Target container port {}\n\
                 5. Add liveness and readiness probes\n",
                ctx.image, ctx.port
            ));
        }
        ArtifactKind::CiPipeline => {
            prompt.push_str(&format!(
                "1. Run the test suite, then build the container image '{}'\n\
                 2. Trigger on pushes to the default branch and on merge/pull requests\n",
                ctx.image
            ));
        }
    }

    if let Some(failure) = repair_context {
        prompt.push_str(&format!(
            "\nA previous attempt failed validation with: {failure}\nGenerate a corrected artifact.\n"
        ));
    }

    prompt.push_str("\nGenerate ONLY the file content, no explanations or additional text:");
    prompt
}

/// Clean a raw model response into usable artifact text.
///
/// Strips markdown code fences and, for YAML artifacts, drops any leading
/// prose before the first document marker.
pub fn clean_response(kind: ArtifactKind, raw: &str) -> String {
    let mut lines: Vec<&str> = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect();

    match kind {
        ArtifactKind::Dockerfile => {
            // Drop leading prose such as "Here is your Dockerfile:"
            let start = lines
                .iter()
                .position(|l| {
                    let t = l.trim_start();
                    t.starts_with('#') || t.starts_with("FROM") || t.starts_with("ARG")
                })
                .unwrap_or(0);
            lines.drain(..start);
        }
        ArtifactKind::KubernetesManifest => {
            let start = lines
                .iter()
                .position(|l| {
                    let t = l.trim_start();
                    t.starts_with("apiVersion:") || t.starts_with("---")
                })
                .unwrap_or(0);
            lines.drain(..start);
        }
        ArtifactKind::CiPipeline => {
            let start = lines
                .iter()
                .position(|l| {
                    let t = l.trim();
                    !t.is_empty() && !t.starts_with("Here") && !t.starts_with("This")
                })
                .unwrap_or(0);
            lines.drain(..start);
        }
    }

    let mut out = lines.join("\n").trim().to_string();
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gantry_store::Signature;

    fn facets(frameworks: &[&str], services: &[&str], deps: &[&str]) -> RetrievalFacets {
        RetrievalFacets {
            frameworks: frameworks.iter().map(|s| s.to_string()).collect(),
            services: services.iter().map(|s| s.to_string()).collect(),
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn example(facets: RetrievalFacets, content: &str) -> StoredExample {
        StoredExample {
            signature: Signature::from_parts([content]),
            kind: ArtifactKind::Dockerfile,
            content: content.to_string(),
            facets,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn identical_facets_score_one() {
        let f = facets(&["express"], &["postgres"], &["express", "pg"]);
        assert!((similarity(&f, &f) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn framework_overlap_outweighs_dependency_overlap() {
        let query = facets(&["express"], &[], &["left-pad"]);
        let framework_match = facets(&["express"], &[], &["other"]);
        let dep_match = facets(&["koa"], &[], &["left-pad"]);
        assert!(similarity(&query, &framework_match) > similarity(&query, &dep_match));
    }

    #[test]
    fn top_k_drops_zero_similarity_entries() {
        let query = facets(&["flask"], &[], &["flask"]);
        let entries = vec![
            example(facets(&["flask"], &[], &["flask"]), "match"),
            example(facets(&["gin"], &[], &["gin"]), "unrelated"),
        ];
        let top = top_k_examples(entries, &query, 3);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].content, "match");
    }

    #[test]
    fn clean_strips_fences_and_prose() {
        let raw = "Here is your Dockerfile:\n```dockerfile\nFROM node:20\nEXPOSE 3000\n```";
        let cleaned = clean_response(ArtifactKind::Dockerfile, raw);
        assert_eq!(cleaned, "FROM node:20\nEXPOSE 3000\n");
    }

    #[test]
    fn clean_drops_prose_before_yaml() {
        let raw = "Sure! The manifests are below.\napiVersion: apps/v1\nkind: Deployment";
        let cleaned = clean_response(ArtifactKind::KubernetesManifest, raw);
        assert!(cleaned.starts_with("apiVersion: apps/v1"));
    }
}
