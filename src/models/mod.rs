//! Craft record schemas and the rules that build them from raw CSV rows.

pub mod base;
pub mod crafts;
pub mod validation;

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

pub use base::{BaseFields, Magnitude};
pub use crafts::{Craft, LanderSaturn, LanderVenus, RocketSaturn, RocketVenus};
pub use validation::{FieldError, FieldErrorKind, FieldSpec, FieldType, ValidationError};

/// One decoded CSV row: header name to cell text.
pub type RawRow = BTreeMap<String, String>;

/// A typed attribute value, ready to be encoded for output.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

/// Tag for the four craft schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CraftKind {
    LanderSaturn,
    LanderVenus,
    RocketSaturn,
    RocketVenus,
}

impl CraftKind {
    pub const ALL: [CraftKind; 4] = [
        CraftKind::LanderSaturn,
        CraftKind::LanderVenus,
        CraftKind::RocketSaturn,
        CraftKind::RocketVenus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CraftKind::LanderSaturn => LanderSaturn::NAME,
            CraftKind::LanderVenus => LanderVenus::NAME,
            CraftKind::RocketSaturn => RocketSaturn::NAME,
            CraftKind::RocketVenus => RocketVenus::NAME,
        }
    }

    /// Variant-specific attributes in declaration order.
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            CraftKind::LanderSaturn => LanderSaturn::FIELDS,
            CraftKind::LanderVenus => LanderVenus::FIELDS,
            CraftKind::RocketSaturn => RocketSaturn::FIELDS,
            CraftKind::RocketVenus => RocketVenus::FIELDS,
        }
    }

    /// Output column names: base attributes first, then the variant's own.
    pub fn columns(&self) -> Vec<&'static str> {
        base::BASE_FIELDS
            .iter()
            .chain(self.fields())
            .map(|spec| spec.name)
            .collect()
    }

    /// Validate one raw row against this schema.
    pub fn validate(&self, row: &RawRow, source_name: &str) -> Result<CraftRecord, ValidationError> {
        match self {
            CraftKind::LanderSaturn => LanderSaturn::validate(row, source_name).map(CraftRecord::LanderSaturn),
            CraftKind::LanderVenus => LanderVenus::validate(row, source_name).map(CraftRecord::LanderVenus),
            CraftKind::RocketSaturn => RocketSaturn::validate(row, source_name).map(CraftRecord::RocketSaturn),
            CraftKind::RocketVenus => RocketVenus::validate(row, source_name).map(CraftRecord::RocketVenus),
        }
    }
}

impl fmt::Display for CraftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated craft of any schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CraftRecord {
    LanderSaturn(LanderSaturn),
    LanderVenus(LanderVenus),
    RocketSaturn(RocketSaturn),
    RocketVenus(RocketVenus),
}

impl CraftRecord {
    pub fn kind(&self) -> CraftKind {
        match self {
            CraftRecord::LanderSaturn(_) => CraftKind::LanderSaturn,
            CraftRecord::LanderVenus(_) => CraftKind::LanderVenus,
            CraftRecord::RocketSaturn(_) => CraftKind::RocketSaturn,
            CraftRecord::RocketVenus(_) => CraftKind::RocketVenus,
        }
    }

    pub fn base(&self) -> &BaseFields {
        match self {
            CraftRecord::LanderSaturn(c) => c.base(),
            CraftRecord::LanderVenus(c) => c.base(),
            CraftRecord::RocketSaturn(c) => c.base(),
            CraftRecord::RocketVenus(c) => c.base(),
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.base().timestamp
    }

    /// All attribute values in column order (see [`CraftKind::columns`]).
    pub fn values(&self) -> Vec<FieldValue> {
        let base = self.base();
        let mut values = vec![
            FieldValue::Text(base.id.clone()),
            FieldValue::Text(base.magnitude.to_string()),
            FieldValue::DateTime(base.timestamp),
        ];
        values.extend(match self {
            CraftRecord::LanderSaturn(c) => c.field_values(),
            CraftRecord::LanderVenus(c) => c.field_values(),
            CraftRecord::RocketSaturn(c) => c.field_values(),
            CraftRecord::RocketVenus(c) => c.field_values(),
        });
        values
    }
}
