use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::base::{self, BaseFields, Magnitude};
use super::RawRow;

/// Declared type of a craft attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    ShortId,
    Magnitude,
    Timestamp,
    Float,
    Int,
    Bool,
}

/// A declared attribute: canonical name plus the raw key it may arrive under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub alias: Option<&'static str>,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, alias: None, ty }
    }

    pub const fn aliased(name: &'static str, alias: &'static str, ty: FieldType) -> Self {
        Self { name, alias: Some(alias), ty }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    Missing,
    Unexpected,
    Invalid { value: String, reason: String },
}

/// One failed rule, attributed to the field that broke it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn missing(field: &str) -> Self {
        Self { field: field.to_string(), kind: FieldErrorKind::Missing }
    }

    pub fn unexpected(field: &str) -> Self {
        Self { field: field.to_string(), kind: FieldErrorKind::Unexpected }
    }

    pub fn invalid(field: &str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind: FieldErrorKind::Invalid { value: value.to_string(), reason: reason.into() },
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FieldErrorKind::Missing => write!(f, "{}: field required", self.field),
            FieldErrorKind::Unexpected => write!(f, "{}: extra fields not permitted", self.field),
            FieldErrorKind::Invalid { value, reason } => {
                write!(f, "{}: {} (got {:?})", self.field, reason, value)
            }
        }
    }
}

/// A raw row that could not be turned into a craft record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} validation error(s) for {model}: {}", .errors.len(), render(.errors))]
pub struct ValidationError {
    pub model: &'static str,
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Whether any recorded error concerns `field`.
    pub fn concerns(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

fn render(errors: &[FieldError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Reads typed attributes out of a raw row, remembering which keys were used
/// and every rule that failed along the way.
///
/// Accessors return a placeholder value on failure so a whole record can be
/// read in one pass; `finish` then refuses the record if anything was wrong.
pub struct FieldReader<'a> {
    model: &'static str,
    row: &'a RawRow,
    source_name: &'a str,
    used: BTreeSet<&'a str>,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    pub fn new(model: &'static str, row: &'a RawRow, source_name: &'a str) -> Self {
        Self { model, row, source_name, used: BTreeSet::new(), errors: Vec::new() }
    }

    /// Look up `name`, preferring `alias` when both keys are present.
    /// Both keys count as recognized either way.
    fn lookup(&mut self, name: &str, alias: Option<&str>) -> Option<&'a str> {
        let row: &'a RawRow = self.row;
        let by_name = row.get_key_value(name);
        let by_alias = alias.and_then(|a| row.get_key_value(a));

        if let Some((key, _)) = by_name {
            self.used.insert(key.as_str());
        }
        if let Some((key, _)) = by_alias {
            self.used.insert(key.as_str());
        }

        by_alias.or(by_name).map(|(_, value)| value.as_str())
    }

    fn required(&mut self, name: &str, alias: Option<&str>) -> Option<&'a str> {
        let value = self.lookup(name, alias);
        if value.is_none() {
            self.errors.push(FieldError::missing(alias.unwrap_or(name)));
        }
        value
    }

    pub fn float(&mut self, spec: &FieldSpec) -> f64 {
        let Some(raw) = self.required(spec.name, spec.alias) else {
            return 0.0;
        };
        match coerce_float(raw) {
            Some(v) => v,
            None => {
                self.errors.push(FieldError::invalid(spec.name, raw, "value is not a valid float"));
                0.0
            }
        }
    }

    pub fn int(&mut self, spec: &FieldSpec) -> i64 {
        let Some(raw) = self.required(spec.name, spec.alias) else {
            return 0;
        };
        match coerce_int(raw) {
            Some(v) => v,
            None => {
                self.errors.push(FieldError::invalid(spec.name, raw, "value is not a valid integer"));
                0
            }
        }
    }

    pub fn bool(&mut self, spec: &FieldSpec) -> bool {
        let Some(raw) = self.required(spec.name, spec.alias) else {
            return false;
        };
        match coerce_bool(raw) {
            Some(v) => v,
            None => {
                self.errors.push(FieldError::invalid(spec.name, raw, "value could not be parsed to a boolean"));
                false
            }
        }
    }

    /// Read the attributes every craft shares.
    ///
    /// `timestamp` comes from the row when the row carries it, otherwise from
    /// the name of the object the row was decoded from.
    pub fn base(&mut self) -> BaseFields {
        let id = match self.required(base::ID.name, base::ID.alias) {
            Some(raw) => match base::derive_short_id_str(raw) {
                Ok(id) => id,
                Err(reason) => {
                    self.errors.push(FieldError::invalid(base::ID.name, raw, reason));
                    String::new()
                }
            },
            None => String::new(),
        };

        let magnitude = match self.required(base::MAGNITUDE.name, base::MAGNITUDE.alias) {
            Some(raw) => Magnitude::from_size(raw),
            None => Magnitude::NotAvailable,
        };

        let source = self
            .lookup(base::TIMESTAMP.name, base::TIMESTAMP.alias)
            .unwrap_or(self.source_name);
        let timestamp = match base::parse_source_timestamp(source) {
            Ok(ts) => ts,
            Err(reason) => {
                self.errors.push(FieldError::invalid(base::TIMESTAMP.name, source, reason));
                NaiveDateTime::MIN
            }
        };

        BaseFields { id, magnitude, timestamp }
    }

    /// Reject unknown keys and surface every error collected so far.
    pub fn finish(mut self) -> Result<(), ValidationError> {
        for key in self.row.keys() {
            if !self.used.contains(key.as_str()) {
                self.errors.push(FieldError::unexpected(key));
            }
        }
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { model: self.model, errors: self.errors })
        }
    }
}

pub fn coerce_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

pub fn coerce_int(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

pub fn coerce_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
