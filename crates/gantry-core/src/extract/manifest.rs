//! Manifest recognition and per-ecosystem dependency parsing.
//!
//! A priority-ordered registry maps manifest filenames to parsers, each
//! exposing the single capability the extractor needs: turn raw bytes into
//! dependency declarations (plus the app-name and entry hints some manifest
//! formats carry). The registry is built once; no runtime type inspection.

use regex::Regex;
use serde_json::Value;

use crate::domain::{BuildTool, DependencyDecl, Ecosystem, Language};

/// What one manifest parse yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestSummary {
    pub dependencies: Vec<DependencyDecl>,

    /// Application name declared in the manifest, when the format has one.
    pub app_name: Option<String>,

    /// Entry file hinted by the manifest (e.g. package.json `main`).
    pub entry_hint: Option<String>,
}

/// Single parsing capability every ecosystem parser implements.
pub trait ManifestParser: Send + Sync {
    /// Parse manifest bytes. Errors are soft: the extractor records them as
    /// warnings and continues with the features it has.
    fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String>;
}

/// One registry row: filename, ecosystem identity, and the parser.
pub struct RegistryEntry {
    pub filename: &'static str,
    pub ecosystem: Ecosystem,
    pub language: Language,
    pub build_tool: BuildTool,
    parser: Box<dyn ManifestParser>,
}

impl RegistryEntry {
    pub fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String> {
        self.parser.parse(bytes)
    }
}

/// Priority-ordered manifest registry, built once at startup.
///
/// Order decides which manifest supplies the app name when several are
/// present; more specific/structured formats come first.
pub struct ParserRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    pub fn new() -> Self {
        let entries = vec![
            RegistryEntry {
                filename: "package.json",
                ecosystem: Ecosystem::Npm,
                language: Language::JavaScript,
                build_tool: BuildTool::Npm,
                parser: Box::new(PackageJsonParser),
            },
            RegistryEntry {
                filename: "Cargo.toml",
                ecosystem: Ecosystem::Cargo,
                language: Language::Rust,
                build_tool: BuildTool::Cargo,
                parser: Box::new(CargoTomlParser),
            },
            RegistryEntry {
                filename: "go.mod",
                ecosystem: Ecosystem::GoModules,
                language: Language::Go,
                build_tool: BuildTool::GoTool,
                parser: Box::new(GoModParser),
            },
            RegistryEntry {
                filename: "pyproject.toml",
                ecosystem: Ecosystem::Pip,
                language: Language::Python,
                build_tool: BuildTool::Pip,
                parser: Box::new(PyprojectParser),
            },
            RegistryEntry {
                filename: "requirements.txt",
                ecosystem: Ecosystem::Pip,
                language: Language::Python,
                build_tool: BuildTool::Pip,
                parser: Box::new(RequirementsTxtParser),
            },
            RegistryEntry {
                filename: "Pipfile",
                ecosystem: Ecosystem::Pip,
                language: Language::Python,
                build_tool: BuildTool::Pip,
                parser: Box::new(PipfileParser),
            },
            RegistryEntry {
                filename: "pom.xml",
                ecosystem: Ecosystem::Maven,
                language: Language::Java,
                build_tool: BuildTool::Maven,
                parser: Box::new(PomXmlParser::new()),
            },
            RegistryEntry {
                filename: "build.gradle",
                ecosystem: Ecosystem::Gradle,
                language: Language::Java,
                build_tool: BuildTool::Gradle,
                parser: Box::new(GradleParser::new()),
            },
            RegistryEntry {
                filename: "composer.json",
                ecosystem: Ecosystem::Composer,
                language: Language::Php,
                build_tool: BuildTool::Composer,
                parser: Box::new(ComposerJsonParser),
            },
        ];
        Self { entries }
    }

    /// Registry row matching a file name, if any.
    pub fn lookup(&self, filename: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.filename == filename)
    }

    /// Priority rank of a filename (lower = higher priority).
    pub fn priority(&self, filename: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.filename == filename)
    }
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

struct PackageJsonParser;

impl ManifestParser for PackageJsonParser {
    fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| format!("package.json: {e}"))?;
        let mut dependencies = Vec::new();
        for key in ["dependencies", "devDependencies"] {
            if let Some(map) = value.get(key).and_then(Value::as_object) {
                for (name, version) in map {
                    dependencies.push(DependencyDecl {
                        name: name.clone(),
                        version: version.as_str().map(String::from),
                        ecosystem: Ecosystem::Npm,
                    });
                }
            }
        }
        Ok(ManifestSummary {
            dependencies,
            app_name: value.get("name").and_then(Value::as_str).map(String::from),
            entry_hint: value.get("main").and_then(Value::as_str).map(String::from),
        })
    }
}

struct RequirementsTxtParser;

impl ManifestParser for RequirementsTxtParser {
    fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("requirements.txt: {e}"))?;
        let mut dependencies = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
                continue;
            }
            // name[extras]==version ; markers
            let spec = line.split(';').next().unwrap_or(line).trim();
            let (name, version) = split_python_spec(spec);
            if !name.is_empty() {
                dependencies.push(DependencyDecl {
                    name,
                    version,
                    ecosystem: Ecosystem::Pip,
                });
            }
        }
        Ok(ManifestSummary {
            dependencies,
            ..Default::default()
        })
    }
}

fn split_python_spec(spec: &str) -> (String, Option<String>) {
    for op in ["==", ">=", "<=", "~=", "!=", ">", "<"] {
        if let Some(idx) = spec.find(op) {
            let name = spec[..idx].trim();
            let name = name.split('[').next().unwrap_or(name);
            return (
                name.to_ascii_lowercase(),
                Some(spec[idx + op.len()..].trim().to_string()),
            );
        }
    }
    let name = spec.split('[').next().unwrap_or(spec).trim();
    (name.to_ascii_lowercase(), None)
}

struct PipfileParser;

impl ManifestParser for PipfileParser {
    fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("Pipfile: {e}"))?;
        let value: toml::Value = text.parse().map_err(|e| format!("Pipfile: {e}"))?;
        let mut dependencies = Vec::new();
        for key in ["packages", "dev-packages"] {
            if let Some(table) = value.get(key).and_then(toml::Value::as_table) {
                for (name, version) in table {
                    dependencies.push(DependencyDecl {
                        name: name.to_ascii_lowercase(),
                        version: version.as_str().map(String::from),
                        ecosystem: Ecosystem::Pip,
                    });
                }
            }
        }
        Ok(ManifestSummary {
            dependencies,
            ..Default::default()
        })
    }
}

struct PyprojectParser;

impl ManifestParser for PyprojectParser {
    fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("pyproject.toml: {e}"))?;
        let value: toml::Value = text.parse().map_err(|e| format!("pyproject.toml: {e}"))?;
        let mut dependencies = Vec::new();

        // PEP 621 list form
        if let Some(list) = value
            .get("project")
            .and_then(|p| p.get("dependencies"))
            .and_then(toml::Value::as_array)
        {
            for item in list {
                if let Some(spec) = item.as_str() {
                    let (name, version) = split_python_spec(spec);
                    dependencies.push(DependencyDecl {
                        name,
                        version,
                        ecosystem: Ecosystem::Pip,
                    });
                }
            }
        }

        // Poetry table form
        if let Some(table) = value
            .get("tool")
            .and_then(|t| t.get("poetry"))
            .and_then(|p| p.get("dependencies"))
            .and_then(toml::Value::as_table)
        {
            for (name, version) in table {
                if name == "python" {
                    continue;
                }
                dependencies.push(DependencyDecl {
                    name: name.to_ascii_lowercase(),
                    version: version.as_str().map(String::from),
                    ecosystem: Ecosystem::Pip,
                });
            }
        }

        let app_name = value
            .get("project")
            .and_then(|p| p.get("name"))
            .or_else(|| {
                value
                    .get("tool")
                    .and_then(|t| t.get("poetry"))
                    .and_then(|p| p.get("name"))
            })
            .and_then(toml::Value::as_str)
            .map(String::from);

        Ok(ManifestSummary {
            dependencies,
            app_name,
            entry_hint: None,
        })
    }
}

struct CargoTomlParser;

impl ManifestParser for CargoTomlParser {
    fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("Cargo.toml: {e}"))?;
        let value: toml::Value = text.parse().map_err(|e| format!("Cargo.toml: {e}"))?;
        let mut dependencies = Vec::new();
        for key in ["dependencies", "dev-dependencies"] {
            if let Some(table) = value.get(key).and_then(toml::Value::as_table) {
                for (name, spec) in table {
                    let version = match spec {
                        toml::Value::String(v) => Some(v.clone()),
                        toml::Value::Table(t) => {
                            t.get("version").and_then(toml::Value::as_str).map(String::from)
                        }
                        _ => None,
                    };
                    dependencies.push(DependencyDecl {
                        name: name.clone(),
                        version,
                        ecosystem: Ecosystem::Cargo,
                    });
                }
            }
        }
        let app_name = value
            .get("package")
            .and_then(|p| p.get("name"))
            .and_then(toml::Value::as_str)
            .map(String::from);
        Ok(ManifestSummary {
            dependencies,
            app_name,
            entry_hint: None,
        })
    }
}

struct GoModParser;

impl ManifestParser for GoModParser {
    fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("go.mod: {e}"))?;
        let mut dependencies = Vec::new();
        let mut app_name = None;
        let mut in_require = false;
        for line in text.lines() {
            let line = line.trim();
            if let Some(module) = line.strip_prefix("module ") {
                // Last path segment names the app
                app_name = module.trim().rsplit('/').next().map(String::from);
            } else if line.starts_with("require (") {
                in_require = true;
            } else if in_require && line == ")" {
                in_require = false;
            } else if in_require || line.starts_with("require ") {
                let spec = line.strip_prefix("require ").unwrap_or(line);
                let mut fields = spec.split_whitespace();
                if let Some(name) = fields.next() {
                    if name != "(" {
                        dependencies.push(DependencyDecl {
                            name: name.to_string(),
                            version: fields.next().map(String::from),
                            ecosystem: Ecosystem::GoModules,
                        });
                    }
                }
            }
        }
        Ok(ManifestSummary {
            dependencies,
            app_name,
            entry_hint: None,
        })
    }
}

/// Loose regex scrape; Maven POMs in the wild vary too much for a strict
/// schema to pay off here.
struct PomXmlParser {
    artifact_re: Regex,
}

impl PomXmlParser {
    fn new() -> Self {
        Self {
            artifact_re: Regex::new(r"<artifactId>\s*([^<\s]+)\s*</artifactId>")
                .expect("static regex"),
        }
    }
}

impl ManifestParser for PomXmlParser {
    fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("pom.xml: {e}"))?;
        let mut dependencies = Vec::new();
        let mut ids = self.artifact_re.captures_iter(text);
        // First artifactId is the project itself
        let app_name = ids.next().map(|c| c[1].to_string());
        for cap in ids {
            dependencies.push(DependencyDecl {
                name: cap[1].to_string(),
                version: None,
                ecosystem: Ecosystem::Maven,
            });
        }
        Ok(ManifestSummary {
            dependencies,
            app_name,
            entry_hint: None,
        })
    }
}

struct GradleParser {
    dep_re: Regex,
}

impl GradleParser {
    fn new() -> Self {
        // implementation 'group:artifact:version' and friends
        Self {
            dep_re: Regex::new(
                r#"(?m)^\s*(?:implementation|api|compile|runtimeOnly|testImplementation)\s*[('"]+([\w.\-]+):([\w.\-]+)(?::([\w.\-]+))?"#,
            )
            .expect("static regex"),
        }
    }
}

impl ManifestParser for GradleParser {
    fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("build.gradle: {e}"))?;
        let mut dependencies = Vec::new();
        for cap in self.dep_re.captures_iter(text) {
            dependencies.push(DependencyDecl {
                name: cap[2].to_string(),
                version: cap.get(3).map(|m| m.as_str().to_string()),
                ecosystem: Ecosystem::Gradle,
            });
        }
        Ok(ManifestSummary {
            dependencies,
            ..Default::default()
        })
    }
}

struct ComposerJsonParser;

impl ManifestParser for ComposerJsonParser {
    fn parse(&self, bytes: &[u8]) -> Result<ManifestSummary, String> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| format!("composer.json: {e}"))?;
        let mut dependencies = Vec::new();
        for key in ["require", "require-dev"] {
            if let Some(map) = value.get(key).and_then(Value::as_object) {
                for (name, version) in map {
                    if name == "php" || name.starts_with("ext-") {
                        continue;
                    }
                    dependencies.push(DependencyDecl {
                        name: name.clone(),
                        version: version.as_str().map(String::from),
                        ecosystem: Ecosystem::Composer,
                    });
                }
            }
        }
        Ok(ManifestSummary {
            dependencies,
            app_name: value.get("name").and_then(Value::as_str).map(String::from),
            entry_hint: None,
        })
    }
}
