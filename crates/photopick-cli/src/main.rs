mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use photopick_core::{load_targets, FirstMatchMatcher, MatchEngine, OnnxFaceEncoder, PhotoCandidate, TargetRegistry};
use photopick_gallery::{
    load_credentials, ConsolePrompt, GalleryWalk, HttpPhotoFetcher, PhotoFetcher, WalkSummary, WebDriverGallery,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photopick", about = "Mark gallery photos that show registered faces")]
struct Cli {
    /// Credentials JSON file (overrides PHOTOPICK_CREDENTIALS)
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,
    /// Reference photo directory (overrides PHOTOPICK_TARGET_DIR)
    #[arg(long, global = true)]
    target_dir: Option<PathBuf>,
    /// ONNX model directory (overrides PHOTOPICK_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
    /// Match tolerance, max Euclidean distance (overrides PHOTOPICK_TOLERANCE)
    #[arg(long, global = true)]
    tolerance: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, pick a room and folder, and mark every photo showing a target
    Run,
    /// Build the target registry and list it
    Targets,
    /// Check one local image or URL against the targets
    Check {
        /// File path or http(s) URL
        source: String,
    },
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(path) = &self.credentials {
            config.credentials_path = path.clone();
        }
        if let Some(dir) = &self.target_dir {
            config.target_dir = dir.clone();
        }
        if let Some(dir) = &self.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command {
        Commands::Run => run(&config).await,
        Commands::Targets => list_targets(&config),
        Commands::Check { source } => check(&config, &source).await,
    }
}

async fn run(config: &Config) -> Result<()> {
    let credentials = load_credentials(&config.credentials_path)
        .with_context(|| format!("loading credentials from {}", config.credentials_path.display()))?;
    let matcher = FirstMatchMatcher::new(config.tolerance)?;
    let (mut encoder, registry) = load_registry(config)?;
    let engine = MatchEngine::with_matcher(&registry, matcher);

    let fetcher = HttpPhotoFetcher::new(config.fetch_timeout())?;
    let mut site = WebDriverGallery::connect(&config.webdriver_url, config.portal())
        .await
        .with_context(|| format!("starting browser session via {}", config.webdriver_url))?;
    let mut chooser = ConsolePrompt::stdio();

    let summary = GalleryWalk::new(&fetcher, &mut encoder, &engine)
        .with_pacing(config.pacing())
        .run_and_release(&mut site, &mut chooser, &credentials)
        .await?;

    print_summary(&summary);
    Ok(())
}

fn list_targets(config: &Config) -> Result<()> {
    let (_, registry) = load_registry(config)?;
    println!("{} target(s) in {}:", registry.len(), config.target_dir.display());
    for (i, target) in registry.iter().enumerate() {
        println!("  {:>3}. {}  (dim {})", i + 1, target.label, target.vector.dim());
    }
    Ok(())
}

async fn check(config: &Config, source: &str) -> Result<()> {
    let matcher = FirstMatchMatcher::new(config.tolerance)?;
    let (mut encoder, registry) = load_registry(config)?;
    let engine = MatchEngine::with_matcher(&registry, matcher);

    let photo = if source.starts_with("http://") || source.starts_with("https://") {
        HttpPhotoFetcher::new(config.fetch_timeout())?.fetch(source).await?
    } else {
        let image = image::open(source)
            .with_context(|| format!("reading image {source}"))?
            .to_rgb8();
        PhotoCandidate { source_url: source.to_string(), image }
    };

    let verdict = engine.evaluate(&photo, &mut encoder)?;
    match (&verdict.matched_label, verdict.distance) {
        (Some(label), Some(distance)) => println!("match: {label} (distance {distance:.4})"),
        (Some(label), None) => println!("match: {label}"),
        _ => println!("no target face in {source}"),
    }
    Ok(())
}

fn load_registry(config: &Config) -> Result<(OnnxFaceEncoder, TargetRegistry)> {
    let mut encoder = OnnxFaceEncoder::load(&config.model_dir)
        .with_context(|| format!("loading face models from {}", config.model_dir.display()))?;
    let registry = load_targets(&config.target_dir, &mut encoder)
        .with_context(|| format!("registering targets from {}", config.target_dir.display()))?;
    Ok((encoder, registry))
}

fn print_summary(summary: &WalkSummary) {
    println!();
    println!("Photos processed: {}", summary.total);
    println!("  matched:   {}", summary.matched);
    println!("  marked:    {}", summary.marked);
    println!("  no match:  {}", summary.unmatched);
    println!("  failed:    {}", summary.failed);
}
