//! Object store access and CSV decoding of fetched objects.

pub mod gcs;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{IngestError, Result};
use crate::models::RawRow;

pub use gcs::GcsClient;
pub use memory::InMemoryObjectStore;

/// A listed object in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl ObjectInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), size: None }
    }
}

/// All rows decoded from one source object, tagged with the object's name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub source_name: String,
    pub rows: Vec<RawRow>,
}

impl Batch {
    pub fn empty(source_name: impl Into<String>) -> Self {
        Self { source_name: source_name.into(), rows: Vec::new() }
    }
}

/// Read-only access to a bucket of CSV objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects, stopping after `max_results` when given.
    async fn list_objects(&self, bucket: &str, max_results: Option<usize>) -> Result<Vec<ObjectInfo>>;

    /// Download the full contents of one object.
    async fn fetch(&self, bucket: &str, name: &str) -> Result<Vec<u8>>;
}

/// Decode CSV bytes into string-keyed rows using the first line as header.
///
/// Short rows simply lack the trailing keys. Cells beyond the header are kept
/// under `column_<n>` (1-based) so strict validation can reject them.
pub fn decode_batch(source_name: &str, bytes: Vec<u8>) -> Result<Batch> {
    let text = String::from_utf8(bytes)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = record
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let key = headers
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("column_{}", i + 1));
                (key, cell.to_string())
            })
            .collect();
        rows.push(row);
    }

    Ok(Batch { source_name: source_name.to_string(), rows })
}

/// Fetch one object and decode it.
pub async fn fetch_batch(store: &dyn ObjectStore, bucket: &str, name: &str) -> Result<Batch> {
    let bytes = store.fetch(bucket, name).await?;
    debug!(file_name = %name, bytes = bytes.len(), "Downloaded blob");
    decode_batch(name, bytes)
}

/// [`fetch_batch`], with failures logged and turned into an empty batch.
pub async fn fetch_batch_or_empty(store: &dyn ObjectStore, bucket: &str, name: &str) -> (Batch, bool) {
    match fetch_batch(store, bucket, name).await {
        Ok(batch) => (batch, true),
        Err(e @ (IngestError::Csv(_) | IngestError::Utf8(_))) => {
            error!(file_name = %name, error = %e, "Failed to parse blob data");
            (Batch::empty(name), false)
        }
        Err(e) => {
            error!(file_name = %name, error = %e, "Failed to download blob");
            (Batch::empty(name), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rows_keyed_by_header() {
        let csv = b"id,size,SPEED\nabc,10,1.5\ndef,20,2.5\n".to_vec();
        let batch = decode_batch("lander_saturn_20210301_013306.csv", csv).unwrap();
        assert_eq!(batch.source_name, "lander_saturn_20210301_013306.csv");
        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.rows[0]["SPEED"], "1.5");
        assert_eq!(batch.rows[1]["id"], "def");
    }

    #[test]
    fn test_decode_quoted_newline_cell() {
        let csv = b"a,b\n\"x\ny\",z\n".to_vec();
        let batch = decode_batch("f.csv", csv).unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0]["a"], "x\ny");
    }

    #[test]
    fn test_decode_ragged_rows() {
        let csv = b"a,b\n1\n1,2,3\n".to_vec();
        let batch = decode_batch("f.csv", csv).unwrap();
        assert_eq!(batch.rows[0].len(), 1);
        assert_eq!(batch.rows[1]["column_3"], "3");
    }

    #[test]
    fn test_decode_empty_object() {
        let batch = decode_batch("f.csv", Vec::new()).unwrap();
        assert!(batch.rows.is_empty());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = decode_batch("f.csv", vec![0xff, 0xfe, b'a']).unwrap_err();
        assert!(matches!(err, IngestError::Utf8(_)));
    }
}
