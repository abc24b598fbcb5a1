//! Grouping, ordering and CSV serialization of validated crafts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::constants::{OUTPUT_EXTENSION, OUTPUT_TIMESTAMP_FORMAT};
use crate::error::{IngestError, Result};
use crate::models::{CraftKind, CraftRecord, FieldValue};

/// Float text in the shortest round-trip form, the way Python's `repr` writes
/// it: positional with a decimal point (`2.0`) for exponents in `-4..16`,
/// otherwise scientific with a signed two-digit exponent (`1e+16`, `1e-07`).
/// Non-finite values are `nan` / `inf` / `-inf`.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return (if v > 0.0 { "inf" } else { "-inf" }).to_string();
    }

    // `{:e}` gives the shortest digits, e.g. `1.2345678901234568e17`
    let sci = format!("{:e}", v);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if (-4..16).contains(&exponent) {
        let positional = format!("{}", v);
        if positional.contains('.') {
            positional
        } else {
            format!("{}.0", positional)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// Keep every record on one line.
fn escape_newlines(s: &str) -> String {
    s.replace('\r', "\\r").replace('\n', "\\n")
}

pub fn encode_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => escape_newlines(s),
        FieldValue::Float(v) => format_float(*v),
        FieldValue::Int(v) => v.to_string(),
        FieldValue::Bool(v) => v.to_string(),
        FieldValue::DateTime(ts) => ts.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
    }
}

pub fn encode_record(record: &CraftRecord) -> Vec<String> {
    record.values().iter().map(encode_value).collect()
}

/// Sort ascending by timestamp. Equal timestamps fall back to the encoded row
/// so the result does not depend on arrival order.
pub fn sort_records(records: &mut [CraftRecord]) {
    records.sort_by_cached_key(|r| (r.timestamp(), encode_record(r)));
}

/// Bucket records by craft kind, each bucket sorted.
pub fn group_records(records: impl IntoIterator<Item = CraftRecord>) -> BTreeMap<CraftKind, Vec<CraftRecord>> {
    let mut groups: BTreeMap<CraftKind, Vec<CraftRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.kind()).or_default().push(record);
    }
    for group in groups.values_mut() {
        sort_records(group);
    }
    groups
}

pub fn output_path(output_dir: &Path, kind: CraftKind) -> PathBuf {
    output_dir.join(format!("{}.{}", kind.name(), OUTPUT_EXTENSION))
}

/// Write one craft kind's records to `out_file`, header first.
///
/// Returns `Ok(false)` without touching the filesystem when there is nothing
/// to write. All records must share a kind.
pub fn crafts_to_csv(records: &[CraftRecord], out_file: &Path) -> Result<bool> {
    let Some(first) = records.first() else {
        warn!(file = %out_file.display(), "No data to output");
        return Ok(false);
    };
    let kind = first.kind();
    if let Some(other) = records.iter().find(|r| r.kind() != kind) {
        return Err(IngestError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("cannot write {} records into a {} file", other.kind(), kind),
        )));
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(out_file)?;
    writer.write_record(kind.columns())?;
    for record in records {
        writer.write_record(encode_record(record))?;
    }
    writer.flush()?;

    Ok(true)
}

/// Group, sort and write every kind into `output_dir/<Kind>.csv`.
///
/// Each of the four kinds is visited; a kind without records gets a warning
/// and no file. Returns the files written.
pub fn write_groups(records: impl IntoIterator<Item = CraftRecord>, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut groups = group_records(records);

    let mut written = Vec::new();
    for kind in CraftKind::ALL {
        let crafts = groups.remove(&kind).unwrap_or_default();
        let path = output_path(output_dir, kind);
        if crafts_to_csv(&crafts, &path)? {
            info!(kind = %kind, records = crafts.len(), file = %path.display(), "Wrote craft output");
            metrics::counter!("craft_files_written_total", "kind" => kind.name()).increment(1);
            written.push(path);
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRow;
    use tempfile::tempdir;

    fn rocket_venus(stamp: &str, speed: &str) -> CraftRecord {
        let row: RawRow = [
            ("id", "f0388371-7285-449c-be70-277db541ac86"),
            ("size", "75"),
            ("speed", speed),
            ("axis_ANGLE", "0.5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        CraftKind::RocketVenus
            .validate(&row, &format!("rocket_venus_{}.csv", stamp))
            .unwrap()
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(-0.25), "-0.25");
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_float(-0.0), "-0.0");
    }

    #[test]
    fn test_format_float_exponent_window() {
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.2345678901234568e17), "1.2345678901234568e+17");
        assert_eq!(format_float(1e300), "1e+300");
        assert_eq!(format_float(-2.5e20), "-2.5e+20");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(1e-7), "1e-07");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(0.0), "0.0");
    }

    #[test]
    fn test_encode_values() {
        assert_eq!(encode_value(&FieldValue::Bool(true)), "true");
        assert_eq!(encode_value(&FieldValue::Int(-3)), "-3");
        assert_eq!(encode_value(&FieldValue::Text("a\nb\r".into())), "a\\nb\\r");
        let record = rocket_venus("20210308_035720", "1");
        assert_eq!(
            encode_record(&record),
            vec!["449c", "small", "2021-03-08 03:57:20", "1.0", "0.5"]
        );
    }

    #[test]
    fn test_written_in_timestamp_order() {
        let dir = tempdir().unwrap();
        let t1 = rocket_venus("20210101_000000", "1");
        let t2 = rocket_venus("20210102_000000", "2");
        let t3 = rocket_venus("20210103_000000", "3");

        let written = write_groups(vec![t2, t1, t3], dir.path()).unwrap();
        assert_eq!(written, vec![dir.path().join("RocketVenus.csv")]);

        let content = fs::read_to_string(&written[0]).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id,magnitude,timestamp,speed,axis_angle");
        assert_eq!(lines[1], "449c,small,2021-01-01 00:00:00,1.0,0.5");
        assert_eq!(lines[2], "449c,small,2021-01-02 00:00:00,2.0,0.5");
        assert_eq!(lines[3], "449c,small,2021-01-03 00:00:00,3.0,0.5");
    }

    #[test]
    fn test_empty_list_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("LanderSaturn.csv");
        assert!(!crafts_to_csv(&[], &path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_mixed_kinds_rejected() {
        let dir = tempdir().unwrap();
        let row: RawRow = [
            ("id", "f0388371-7285-449c-be70-277db541ac86"),
            ("size", "75"),
            ("Mass", "1"),
            ("gravity", "1"),
            ("temperature", "1"),
            ("life", "yes"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let saturn = CraftKind::RocketSaturn
            .validate(&row, "rocket_saturn_20210301_121033.csv")
            .unwrap();
        let venus = rocket_venus("20210101_000000", "1");
        assert!(crafts_to_csv(&[saturn, venus], &dir.path().join("x.csv")).is_err());
    }

    #[test]
    fn test_group_records_buckets_by_kind() {
        let groups = group_records(vec![
            rocket_venus("20210102_000000", "1"),
            rocket_venus("20210101_000000", "1"),
        ]);
        assert_eq!(groups.len(), 1);
        let venus = &groups[&CraftKind::RocketVenus];
        assert!(venus[0].timestamp() < venus[1].timestamp());
    }
}
