//! Attributes and normalization rules shared by every craft.

use std::fmt;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use super::validation::{FieldSpec, FieldType};
use crate::constants::SOURCE_TIMESTAMP_FORMAT;

pub const ID: FieldSpec = FieldSpec::new("id", FieldType::ShortId);
pub const MAGNITUDE: FieldSpec = FieldSpec::aliased("magnitude", "size", FieldType::Magnitude);
pub const TIMESTAMP: FieldSpec = FieldSpec::new("timestamp", FieldType::Timestamp);

/// Base columns, in the order they are written.
pub const BASE_FIELDS: [FieldSpec; 3] = [ID, MAGNITUDE, TIMESTAMP];

// Trailing `yyyyMMdd_HHmmss`, optionally followed by one file extension.
static SOURCE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{8}_\d{6})(?:\.[A-Za-z0-9]+)?$").expect("source timestamp pattern is valid")
});

/// Categorical size bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Magnitude {
    #[serde(rename = "massive")]
    Massive,
    #[serde(rename = "big")]
    Big,
    /// Declared for completeness; no size maps to it.
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "tiny")]
    Tiny,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl Magnitude {
    pub fn as_str(&self) -> &'static str {
        match self {
            Magnitude::Massive => "massive",
            Magnitude::Big => "big",
            Magnitude::Medium => "medium",
            Magnitude::Small => "small",
            Magnitude::Tiny => "tiny",
            Magnitude::NotAvailable => "N/A",
        }
    }

    /// Bucket an integer size. Zero, negatives and anything from 1000 up are `N/A`.
    pub fn from_value(size: i64) -> Self {
        match size {
            500..=999 => Magnitude::Massive,
            100..=499 => Magnitude::Big,
            50..=99 => Magnitude::Small,
            1..=49 => Magnitude::Tiny,
            _ => Magnitude::NotAvailable,
        }
    }

    /// Bucket a raw size string; anything that is not an integer is `N/A`.
    pub fn from_size(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map(Self::from_value)
            .unwrap_or(Magnitude::NotAvailable)
    }
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields common to all crafts, stored identically in each variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseFields {
    pub id: String,
    pub magnitude: Magnitude,
    pub timestamp: NaiveDateTime,
}

/// Short id: the UUID's `time_hi_and_version` field as four lowercase hex digits.
pub fn derive_short_id(uuid: &Uuid) -> String {
    let (_, _, time_hi_and_version, _) = uuid.as_fields();
    format!("{:04x}", time_hi_and_version)
}

pub fn derive_short_id_str(raw: &str) -> Result<String, String> {
    Uuid::parse_str(raw.trim())
        .map(|uuid| derive_short_id(&uuid))
        .map_err(|e| format!("value is not a valid uuid: {}", e))
}

/// The `yyyyMMdd_HHmmss` suffix of a source identifier, or `""` when absent.
pub fn extract_source_timestamp(source: &str) -> &str {
    SOURCE_TIMESTAMP
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or("")
}

pub fn parse_source_timestamp(source: &str) -> Result<NaiveDateTime, String> {
    let stamp = extract_source_timestamp(source);
    NaiveDateTime::parse_from_str(stamp, SOURCE_TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid datetime format: {}", e))
}
