//! Framework detection from dependency names.

use crate::domain::{DependencyDecl, Framework};

/// Signature table: dependency name → framework. All rows are exact-name
/// matches and therefore equally specific.
const SIGNATURES: &[(&str, Framework)] = &[
    ("express", Framework::Express),
    ("fastify", Framework::Fastify),
    ("koa", Framework::Koa),
    ("next", Framework::NextJs),
    ("react", Framework::React),
    ("flask", Framework::Flask),
    ("django", Framework::Django),
    ("fastapi", Framework::FastApi),
    ("rails", Framework::Rails),
    ("spring-boot-starter-web", Framework::SpringBoot),
    ("spring-boot-starter", Framework::SpringBoot),
    ("actix-web", Framework::ActixWeb),
    ("axum", Framework::Axum),
    ("github.com/gin-gonic/gin", Framework::Gin),
    ("laravel/framework", Framework::Laravel),
];

/// Detect frameworks from declared dependencies.
///
/// Tie-break rule: all signature rows are exact matches of equal
/// specificity, so when several match the result is ordered by the lexical
/// sort of the framework identifiers ([`Framework::id`]). The first entry
/// is the primary framework. The rule is arbitrary but deterministic and
/// documented; callers must not rely on declaration order in the manifest.
pub fn detect_frameworks(dependencies: &[DependencyDecl]) -> Vec<Framework> {
    let mut found: Vec<Framework> = Vec::new();
    for dep in dependencies {
        let name = dep.name.to_ascii_lowercase();
        for (signature, framework) in SIGNATURES {
            if name == *signature && !found.contains(framework) {
                found.push(*framework);
            }
        }
    }
    found.sort_by(|a, b| a.id().cmp(b.id()));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Ecosystem;

    fn dep(name: &str) -> DependencyDecl {
        DependencyDecl {
            name: name.to_string(),
            version: None,
            ecosystem: Ecosystem::Npm,
        }
    }

    #[test]
    fn detects_single_framework() {
        let found = detect_frameworks(&[dep("express"), dep("pg")]);
        assert_eq!(found, vec![Framework::Express]);
    }

    #[test]
    fn tie_break_is_lexical_by_id_not_declaration_order() {
        // koa declared before express, but "express" < "koa" lexically
        let found = detect_frameworks(&[dep("koa"), dep("express")]);
        assert_eq!(found, vec![Framework::Express, Framework::Koa]);
    }

    #[test]
    fn match_is_case_insensitive_and_exact() {
        assert_eq!(detect_frameworks(&[dep("Flask")]), vec![Framework::Flask]);
        // substring of a signature must not match
        assert!(detect_frameworks(&[dep("express-session")]).is_empty());
    }

    #[test]
    fn duplicate_signatures_collapse() {
        let found = detect_frameworks(&[
            dep("spring-boot-starter-web"),
            dep("spring-boot-starter"),
        ]);
        assert_eq!(found, vec![Framework::SpringBoot]);
    }
}
