pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod output;
pub mod pipeline;

pub use config::Settings;
pub use dispatch::{parse_batch, select_kind, validate_batch, ParsedBatch};
pub use error::{IngestError, Result};
pub use ingest::{decode_batch, Batch, GcsClient, InMemoryObjectStore, ObjectInfo, ObjectStore};
pub use models::{CraftKind, CraftRecord, RawRow};
pub use output::{crafts_to_csv, write_groups};
pub use pipeline::{Pipeline, PipelineResult};
