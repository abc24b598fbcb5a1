use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use crate::config::Settings;
use crate::constants::PROGRESS_EVERY;
use crate::dispatch::{validate_batch, ParsedBatch};
use crate::error::Result;
use crate::ingest::{fetch_batch_or_empty, Batch, ObjectInfo, ObjectStore};
use crate::metrics as pipeline_metrics;
use crate::output;

/// Totals for one pipeline run
#[derive(Debug, Default, Clone, Serialize)]
pub struct PipelineResult {
    pub objects_listed: usize,
    pub fetch_failures: usize,
    pub rows_decoded: usize,
    pub records_validated: usize,
    pub rows_rejected: usize,
    pub unrecognized_batches: usize,
    /// Names of the objects that matched no craft type.
    pub unrecognized_files: Vec<String>,
    pub files_written: Vec<PathBuf>,
}

/// Fetch, validate and write every craft object in the configured bucket.
///
/// Fetching and validating each fan out over a pool of `settings.workers`
/// tasks and come back in completion order; the output step sorts before
/// writing.
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    settings: Settings,
}

fn log_progress(stage: &str, done: usize, total: usize) {
    if done % PROGRESS_EVERY == 0 || done == total {
        debug!(stage, done, total, "Progress");
    }
}

impl Pipeline {
    pub fn new(store: Arc<dyn ObjectStore>, settings: Settings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the complete pipeline. Only listing the bucket or writing output
    /// can fail the run; per-object and per-row problems are logged and skipped.
    #[instrument(skip(self), fields(bucket = %self.settings.bucket))]
    pub async fn run(&self) -> Result<PipelineResult> {
        let t_run = Instant::now();
        let objects = self
            .store
            .list_objects(&self.settings.bucket, self.settings.max_results)
            .await?;
        info!("📡 Found {} objects", objects.len());

        let mut result = PipelineResult {
            objects_listed: objects.len(),
            ..PipelineResult::default()
        };

        let t_fetch = Instant::now();
        let (batches, failures) = self.fetch_all(objects).await;
        pipeline_metrics::stage_duration("fetch", t_fetch.elapsed().as_secs_f64());
        result.fetch_failures = failures;
        result.rows_decoded = batches.iter().map(|b| b.rows.len()).sum();
        info!("✅ Downloaded {} batches ({} rows, {} failures)", batches.len(), result.rows_decoded, failures);

        let t_validate = Instant::now();
        let parsed = self.validate_all(batches).await;
        pipeline_metrics::stage_duration("validate", t_validate.elapsed().as_secs_f64());

        let mut records = Vec::new();
        for batch in parsed {
            result.rows_rejected += batch.rejected;
            match batch.kind {
                Some(kind) => pipeline_metrics::rows_validated(kind, batch.records.len(), batch.rejected),
                None => {
                    result.unrecognized_batches += 1;
                    result.unrecognized_files.push(batch.source_name);
                    pipeline_metrics::batch_unrecognized();
                }
            }
            records.extend(batch.records);
        }
        result.unrecognized_files.sort();
        result.records_validated = records.len();
        info!(
            "🔧 Validated {} records ({} rejected, {} unrecognized files)",
            result.records_validated, result.rows_rejected, result.unrecognized_batches
        );

        let output_dir = self.settings.output_dir.clone();
        let t_write = Instant::now();
        result.files_written = tokio::task::spawn_blocking(move || output::write_groups(records, &output_dir))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
        pipeline_metrics::stage_duration("write", t_write.elapsed().as_secs_f64());
        pipeline_metrics::stage_duration("total", t_run.elapsed().as_secs_f64());

        info!("💾 Wrote {} files to {}", result.files_written.len(), self.settings.output_dir.display());
        Ok(result)
    }

    /// Download and decode every object. Failed objects come back as empty
    /// batches and are counted.
    async fn fetch_all(&self, objects: Vec<ObjectInfo>) -> (Vec<Batch>, usize) {
        let total = objects.len();
        let semaphore = Arc::new(Semaphore::new(self.settings.workers));
        let mut tasks = JoinSet::new();

        for object in objects {
            let permit = Arc::clone(&semaphore).acquire_owned().await.ok();
            let store = Arc::clone(&self.store);
            let bucket = self.settings.bucket.clone();
            tasks.spawn(async move {
                let fetched = fetch_batch_or_empty(store.as_ref(), &bucket, &object.name).await;
                drop(permit);
                fetched
            });
        }

        let mut batches = Vec::with_capacity(total);
        let mut failures = 0;
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            done += 1;
            match joined {
                Ok((batch, true)) => {
                    pipeline_metrics::object_fetched();
                    batches.push(batch);
                }
                Ok((batch, false)) => {
                    pipeline_metrics::fetch_failed();
                    failures += 1;
                    batches.push(batch);
                }
                Err(e) => {
                    pipeline_metrics::fetch_failed();
                    failures += 1;
                    error!(error = %e, "Download task did not complete");
                }
            }
            log_progress("Downloading data", done, total);
        }
        (batches, failures)
    }

    /// Validate every batch on the blocking pool, bounded by the worker count.
    async fn validate_all(&self, batches: Vec<Batch>) -> Vec<ParsedBatch> {
        let total = batches.len();
        let semaphore = Arc::new(Semaphore::new(self.settings.workers));
        let mut tasks = JoinSet::new();

        for batch in batches {
            let permit = Arc::clone(&semaphore).acquire_owned().await.ok();
            tasks.spawn_blocking(move || {
                let parsed = validate_batch(&batch);
                drop(permit);
                parsed
            });
        }

        let mut parsed = Vec::with_capacity(total);
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            done += 1;
            match joined {
                Ok(batch) => parsed.push(batch),
                Err(e) => error!(error = %e, "Parsing task did not complete"),
            }
            log_progress("Parsing data", done, total);
        }
        parsed
    }
}
