//! gantry - repository analysis and deployment artifact generation
//!
//! ## Commands
//!
//! - `analyze`: Scan a repository and print its inferred feature set
//! - `generate`: Generate Dockerfile, Kubernetes manifests, and CI pipelines
//! - `feedback`: Record accept/edit/reject verdicts on generated artifacts
//! - `sync`: Fold accepted feedback into the example corpus
//! - `check`: Verify the Ollama provider is reachable

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use gantry_core::{
    ArtifactKind, ArtifactRequest, CancelToken, CorpusStore, FeatureSet, FeedbackOutcome,
    GantryPipeline,
    GeneratedArtifact, PipelineConfig, PipelineFlavor, RepositoryDescriptor, RequestSpan,
    RetrievalFacets, TextGenerator,
};
use gantry_store::{FsCorpusStore, FsFeedbackLedger};
use gantry_ollama::OllamaProvider;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Repository analysis and deployment artifact generation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Data directory for the corpus and feedback ledger
    #[arg(long, global = true, env = "GANTRY_HOME", default_value = ".gantry")]
    home: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a repository and print its inferred feature set
    Analyze {
        /// Path to the repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Generate deployment artifacts for a repository
    Generate {
        /// Path to the repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Which artifacts to generate
        #[arg(short, long, value_enum, default_value = "all")]
        artifact: ArtifactChoice,

        /// CI platform for pipeline generation
        #[arg(short, long, value_enum, default_value = "github")]
        platform: PlatformChoice,

        /// Directory to write artifacts into
        #[arg(
            short,
            long,
            env = "GANTRY_OUTPUT_DIR",
            default_value = "./generated"
        )]
        output_dir: PathBuf,

        /// Always use the model, even when a template would match
        #[arg(long)]
        generative: bool,
    },

    /// Record feedback on a previously generated artifact
    Feedback {
        /// Artifact id, as printed by `generate`
        artifact_id: Uuid,

        /// The verdict
        #[arg(short = 'O', long, value_enum)]
        outcome: OutcomeChoice,

        /// Edited artifact file, required for the `edited` outcome
        #[arg(short, long)]
        edited_file: Option<PathBuf>,

        /// Directory the artifact was generated into
        #[arg(
            long,
            env = "GANTRY_OUTPUT_DIR",
            default_value = "./generated"
        )]
        output_dir: PathBuf,
    },

    /// Fold pending accepted feedback into the example corpus
    Sync,

    /// Verify the configured Ollama server is reachable
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ArtifactChoice {
    Dockerfile,
    K8s,
    Pipeline,
    All,
}

impl ArtifactChoice {
    fn requests(self, flavor: PipelineFlavor, generative: bool) -> Vec<ArtifactRequest> {
        let mut requests = match self {
            ArtifactChoice::Dockerfile => vec![ArtifactRequest::new(ArtifactKind::Dockerfile)],
            ArtifactChoice::K8s => vec![ArtifactRequest::new(ArtifactKind::KubernetesManifest)],
            ArtifactChoice::Pipeline => vec![ArtifactRequest::pipeline(flavor)],
            ArtifactChoice::All => vec![
                ArtifactRequest::new(ArtifactKind::Dockerfile),
                ArtifactRequest::new(ArtifactKind::KubernetesManifest),
                ArtifactRequest::pipeline(flavor),
            ],
        };
        if generative {
            for request in &mut requests {
                request.force_generative = true;
            }
        }
        requests
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PlatformChoice {
    Github,
    Gitlab,
}

impl From<PlatformChoice> for PipelineFlavor {
    fn from(choice: PlatformChoice) -> Self {
        match choice {
            PlatformChoice::Github => PipelineFlavor::GithubActions,
            PlatformChoice::Gitlab => PipelineFlavor::GitlabCi,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutcomeChoice {
    Accepted,
    Edited,
    Rejected,
}

impl From<OutcomeChoice> for FeedbackOutcome {
    fn from(choice: OutcomeChoice) -> Self {
        match choice {
            OutcomeChoice::Accepted => FeedbackOutcome::Accepted,
            OutcomeChoice::Edited => FeedbackOutcome::AcceptedWithEdits,
            OutcomeChoice::Rejected => FeedbackOutcome::Rejected,
        }
    }
}

/// Artifact metadata persisted next to generated output so `feedback` can
/// reference artifacts across CLI invocations.
#[derive(Serialize, Deserialize)]
struct ArtifactMeta {
    artifact: GeneratedArtifact,
    facets: RetrievalFacets,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    gantry_core::init_tracing(cli.json, cli.verbose);

    match cli.command {
        Commands::Analyze { path, format } => cmd_analyze(&cli.home, &path, format).await,
        Commands::Generate {
            path,
            artifact,
            platform,
            output_dir,
            generative,
        } => {
            cmd_generate(
                &cli.home,
                &path,
                artifact,
                platform.into(),
                &output_dir,
                generative,
            )
            .await
        }
        Commands::Feedback {
            artifact_id,
            outcome,
            edited_file,
            output_dir,
        } => {
            cmd_feedback(
                &cli.home,
                artifact_id,
                outcome.into(),
                edited_file.as_deref(),
                &output_dir,
            )
            .await
        }
        Commands::Sync => cmd_sync(&cli.home).await,
        Commands::Check => cmd_check().await,
    }
}

fn open_stores(home: &Path) -> Result<(Arc<FsCorpusStore>, Arc<FsFeedbackLedger>)> {
    let corpus = FsCorpusStore::new(home).context("Failed to open corpus store")?;
    let ledger = FsFeedbackLedger::new(home).context("Failed to open feedback ledger")?;
    Ok((Arc::new(corpus), Arc::new(ledger)))
}

fn build_pipeline(home: &Path) -> Result<GantryPipeline> {
    let (corpus, ledger) = open_stores(home)?;
    let provider: Arc<dyn TextGenerator> =
        Arc::new(OllamaProvider::from_env().context("Failed to construct Ollama provider")?);
    GantryPipeline::new(provider, corpus, ledger, PipelineConfig::default())
        .context("Failed to build pipeline")
}

async fn cmd_analyze(home: &Path, path: &Path, format: OutputFormat) -> Result<()> {
    let pipeline = build_pipeline(home)?;
    let features = pipeline
        .analyze(&RepositoryDescriptor::local(path))
        .await
        .context("Analysis failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&features)?),
        OutputFormat::Text => print_features(&features),
    }
    Ok(())
}

fn print_features(features: &FeatureSet) {
    println!("Feature set {}", features.signature().short());
    if let Some(name) = &features.app_name {
        println!("  app:          {name}");
    }
    for stat in &features.languages {
        println!(
            "  language:     {} ({} files, {} bytes)",
            stat.language, stat.files, stat.bytes
        );
    }
    for framework in &features.frameworks {
        println!("  framework:    {}", framework.id());
    }
    for hint in &features.services {
        println!(
            "  service:      {} ({:?} confidence)",
            hint.service.id(),
            hint.confidence
        );
    }
    if let Some(tool) = features.build_tool {
        println!("  build tool:   {}", tool.as_str());
    }
    if let Some(entry) = features.entry_point.as_option() {
        println!("  entry point:  {entry}");
    }
    println!("  dependencies: {}", features.dependencies.len());
    println!("  confidence:   {:?}", features.confidence);
    for warning in &features.warnings {
        println!("  warning:      {warning}");
    }
}

async fn cmd_generate(
    home: &Path,
    path: &Path,
    artifact: ArtifactChoice,
    flavor: PipelineFlavor,
    output_dir: &Path,
    generative: bool,
) -> Result<()> {
    let request_id = Uuid::new_v4().to_string();
    let _span = RequestSpan::enter(&request_id);

    let pipeline = build_pipeline(home)?;
    let requests = artifact.requests(flavor, generative);
    let report = pipeline
        .generate(&RepositoryDescriptor::local(path), &requests, &CancelToken::new())
        .await
        .context("Generation failed")?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let meta_dir = output_dir.join(".gantry");
    fs::create_dir_all(&meta_dir)?;

    let facets = report.features.facets();
    for artifact in &report.artifacts {
        let file_name = artifact.file_name(Some(flavor));
        let target = output_dir.join(&file_name);
        fs::write(&target, &artifact.content)
            .with_context(|| format!("Failed to write {}", target.display()))?;

        let meta = ArtifactMeta {
            artifact: artifact.clone(),
            facets: facets.clone(),
        };
        let meta_path = meta_dir.join(format!("{}.json", artifact.id));
        fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?)
            .with_context(|| format!("Failed to write {}", meta_path.display()))?;

        let review = if artifact.needs_review {
            "  [needs review]"
        } else {
            ""
        };
        println!(
            "{}  {}  ({:?}){}",
            artifact.id, file_name, artifact.provenance, review
        );
    }
    println!(
        "\nwrote {} artifact(s) to {}",
        report.artifacts.len(),
        output_dir.display()
    );
    println!("record feedback with: gantry feedback <artifact-id> --outcome <accepted|edited|rejected>");
    Ok(())
}

fn load_meta(output_dir: &Path, artifact_id: Uuid) -> Result<ArtifactMeta> {
    let meta_path = output_dir
        .join(".gantry")
        .join(format!("{artifact_id}.json"));
    let bytes = fs::read(&meta_path).with_context(|| {
        format!(
            "No metadata for artifact {artifact_id} under {}",
            output_dir.display()
        )
    })?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("Corrupt metadata at {}", meta_path.display()))
}

async fn cmd_feedback(
    home: &Path,
    artifact_id: Uuid,
    outcome: FeedbackOutcome,
    edited_file: Option<&Path>,
    output_dir: &Path,
) -> Result<()> {
    let meta = load_meta(output_dir, artifact_id)?;

    let edited_content = match (outcome, edited_file) {
        (FeedbackOutcome::AcceptedWithEdits, Some(path)) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        (FeedbackOutcome::AcceptedWithEdits, None) => {
            bail!("--edited-file is required for the edited outcome")
        }
        _ => None,
    };

    let (_, ledger) = open_stores(home)?;
    let record = gantry_core::record_feedback(
        ledger.as_ref(),
        &meta.artifact,
        meta.facets,
        outcome,
        edited_content,
    )
    .await
    .context("Failed to record feedback")?;

    println!("recorded feedback {} ({:?})", record.id, record.outcome);
    println!("run `gantry sync` to fold accepted feedback into the corpus");
    Ok(())
}

async fn cmd_sync(home: &Path) -> Result<()> {
    let (corpus, ledger) = open_stores(home)?;
    let updater = gantry_core::ModelUpdater::new(ledger, corpus.clone(), Duration::from_secs(60));
    let folded = updater.fold_once().await.context("Corpus fold failed")?;
    let total = corpus.len().await.context("Failed to read corpus size")?;
    println!("folded {folded} feedback record(s); corpus now holds {total} example(s)");
    Ok(())
}

async fn cmd_check() -> Result<()> {
    let provider = OllamaProvider::from_env().context("Failed to construct Ollama provider")?;
    let config = provider.config();
    match provider.check_connection().await {
        Ok(()) => {
            println!("ok: {} serving {}", config.host, config.model);
            Ok(())
        }
        Err(err) => {
            warn!(event = "cli.check_failed", error = %err);
            bail!(
                "cannot reach {} with model {}: {err}\n\
                 generation will fall back to templates where possible",
                config.host,
                config.model
            )
        }
    }
}
