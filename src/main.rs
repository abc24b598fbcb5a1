use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use craft_ingest::config::{Overrides, Settings};
use craft_ingest::dispatch::validate_batch;
use craft_ingest::ingest::{decode_batch, GcsClient, ObjectStore};
use craft_ingest::logging;
use craft_ingest::metrics::init_metrics;
use craft_ingest::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "craft_ingest")]
#[command(about = "Validate craft telemetry CSV files from a storage bucket and write one CSV per craft type")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML config file (defaults to ./craft_ingest.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, validate and write every craft file in the bucket
    Run {
        #[arg(long)]
        bucket: Option<String>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Stop listing after this many objects
        #[arg(long)]
        max_results: Option<usize>,
        /// Worker pool size for fetching and validating
        #[arg(long)]
        workers: Option<usize>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List object names in the bucket
    List {
        #[arg(long)]
        bucket: Option<String>,
        #[arg(long)]
        max_results: Option<usize>,
    },
    /// Validate local CSV files without writing output
    Validate {
        /// Files to check; the craft type comes from each file name
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print every accepted record as a JSON line
        #[arg(long)]
        json: bool,
    },
}

fn load_settings(config: Option<&PathBuf>) -> anyhow::Result<Settings> {
    Settings::load(config.map(PathBuf::as_path)).context("Failed to load configuration")
}

async fn run(settings: Settings, json: bool) -> anyhow::Result<()> {
    if let Some(port) = settings.metrics_port {
        init_metrics(port);
    }

    let store: Arc<dyn ObjectStore> = Arc::new(GcsClient::new(&settings.storage_endpoint)?);
    let pipeline = Pipeline::new(store, settings);

    if !json {
        println!("🚀 Running craft ingestion for bucket {}...", pipeline.settings().bucket);
    }
    let result = pipeline.run().await.map_err(|e| {
        error!(error = %e, "Pipeline failed");
        e
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("\n📊 Pipeline Results:");
    println!("   Objects listed: {}", result.objects_listed);
    println!("   Fetch failures: {}", result.fetch_failures);
    println!("   Rows decoded: {}", result.rows_decoded);
    println!("   Records validated: {}", result.records_validated);
    println!("   Rows rejected: {}", result.rows_rejected);
    println!("   Unrecognized files: {}", result.unrecognized_batches);
    for name in &result.unrecognized_files {
        println!("     - {}", name);
    }
    for file in &result.files_written {
        println!("   Output file: {}", file.display());
    }
    Ok(())
}

async fn list(settings: Settings) -> anyhow::Result<()> {
    let store = GcsClient::new(&settings.storage_endpoint)?;
    let objects = store
        .list_objects(&settings.bucket, settings.max_results)
        .await
        .with_context(|| format!("Failed to list bucket '{}'", settings.bucket))?;

    for object in &objects {
        match object.size {
            Some(size) => println!("{}\t{}", object.name, size),
            None => println!("{}", object.name),
        }
    }
    info!(bucket = %settings.bucket, count = objects.len(), "Listed objects");
    Ok(())
}

fn validate(files: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let mut accepted = 0;
    let mut rejected = 0;

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let batch = match decode_batch(&name, bytes) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(file_name = %name, error = %e, "Failed to parse file");
                println!("❌ {}: {}", name, e);
                continue;
            }
        };

        let parsed = validate_batch(&batch);
        match parsed.kind {
            Some(kind) => println!(
                "✅ {} ({}): {} accepted, {} rejected",
                name,
                kind,
                parsed.records.len(),
                parsed.rejected
            ),
            None => println!("⚠️  {}: file name matches no craft type", name),
        }
        if json {
            for record in &parsed.records {
                println!("{}", serde_json::to_string(record)?);
            }
        }
        accepted += parsed.records.len();
        rejected += parsed.rejected;
    }

    println!("\n📊 {} accepted, {} rejected", accepted, rejected);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { bucket, output_dir, max_results, workers, json } => {
            let mut settings = load_settings(cli.config.as_ref())?;
            settings.apply_overrides(Overrides { bucket, output_dir, max_results, workers })?;
            run(settings, json).await?;
        }
        Commands::List { bucket, max_results } => {
            let mut settings = load_settings(cli.config.as_ref())?;
            settings.apply_overrides(Overrides { bucket, max_results, ..Overrides::default() })?;
            list(settings).await?;
        }
        Commands::Validate { files, json } => {
            validate(&files, json)?;
        }
    }
    Ok(())
}
