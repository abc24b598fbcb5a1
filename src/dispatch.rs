//! Picks a craft schema for a batch from its source name and validates its rows.

use tracing::{debug, error, warn};

use crate::constants::{
    LANDER_SATURN_PATTERN, LANDER_VENUS_PATTERN, ROCKET_SATURN_PATTERN, ROCKET_VENUS_PATTERN,
};
use crate::error::IngestError;
use crate::ingest::Batch;
use crate::models::{CraftKind, CraftRecord};

/// Source-name patterns in priority order; the first contained pattern wins.
pub const SOURCE_PATTERNS: [(&str, CraftKind); 4] = [
    (LANDER_SATURN_PATTERN, CraftKind::LanderSaturn),
    (LANDER_VENUS_PATTERN, CraftKind::LanderVenus),
    (ROCKET_SATURN_PATTERN, CraftKind::RocketSaturn),
    (ROCKET_VENUS_PATTERN, CraftKind::RocketVenus),
];

/// Outcome of validating one batch.
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub source_name: String,
    /// `None` when the source name matched no pattern.
    pub kind: Option<CraftKind>,
    pub records: Vec<CraftRecord>,
    pub rejected: usize,
}

pub fn select_kind(source_name: &str) -> Option<CraftKind> {
    SOURCE_PATTERNS
        .iter()
        .find(|(pattern, _)| source_name.contains(pattern))
        .map(|(_, kind)| *kind)
}

/// Like [`select_kind`] but reports an unrecognized name as an error.
pub fn require_kind(source_name: &str) -> Result<CraftKind, IngestError> {
    select_kind(source_name).ok_or_else(|| IngestError::UnrecognizedSource {
        source_name: source_name.to_string(),
    })
}

/// Validate every row of `batch` against the schema its name selects.
///
/// An unrecognized name yields no records at all. Within a recognized batch
/// each row stands alone: failures are logged and dropped.
pub fn validate_batch(batch: &Batch) -> ParsedBatch {
    let kind = match require_kind(&batch.source_name) {
        Ok(kind) => kind,
        Err(_) => {
            error!(file_name = %batch.source_name, "File not parsed");
            return ParsedBatch {
                source_name: batch.source_name.clone(),
                ..ParsedBatch::default()
            };
        }
    };

    let mut records = Vec::with_capacity(batch.rows.len());
    let mut rejected = 0;
    for (index, row) in batch.rows.iter().enumerate() {
        match kind.validate(row, &batch.source_name) {
            Ok(record) => records.push(record),
            Err(e) => {
                rejected += 1;
                warn!(
                    file_name = %batch.source_name,
                    row = index,
                    model = e.model,
                    error = %e,
                    "Dropping invalid row"
                );
            }
        }
    }

    debug!(
        file_name = %batch.source_name,
        kind = %kind,
        accepted = records.len(),
        rejected,
        "Batch validated"
    );

    ParsedBatch {
        source_name: batch.source_name.clone(),
        kind: Some(kind),
        records,
        rejected,
    }
}

/// Records only; see [`validate_batch`].
pub fn parse_batch(batch: &Batch) -> Vec<CraftRecord> {
    validate_batch(batch).records
}
