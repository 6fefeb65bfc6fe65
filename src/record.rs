use crate::error::AnalysisError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One untyped input row: column name -> raw cell text.
pub type RawRow = BTreeMap<String, String>;

// Column lookups, canonical name first.
pub const ID_KEYS: &[&str] = &["video_id", "id"];
pub const TITLE_KEYS: &[&str] = &["titulo", "title"];
pub const CHANNEL_KEYS: &[&str] = &["nombre_canal", "channel"];
pub const PUBLISHED_KEYS: &[&str] = &["fecha_publicacion", "published_at"];
pub const VIEWS_KEYS: &[&str] = &["vistas", "views"];
pub const LIKES_KEYS: &[&str] = &["likes"];
pub const COMMENTS_KEYS: &[&str] = &["comentarios", "comments"];
pub const DURATION_KEYS: &[&str] = &["duracion_segundos", "duration_seconds"];
pub const THUMBNAIL_KEYS: &[&str] = &["url_miniatura", "thumbnail_url"];
pub const AGE_KEYS: &[&str] = &["horas_desde_pub", "age_hours"];
pub const RATE_KEYS: &[&str] = &["vph"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FormatClass {
    Short,
    Long,
}

/// Durations strictly below this many seconds are Shorts.
pub const SHORT_MAX_SECONDS: f64 = 180.0;

impl FormatClass {
    pub fn from_duration(duration_seconds: f64) -> Self {
        if duration_seconds < SHORT_MAX_SECONDS {
            FormatClass::Short
        } else {
            FormatClass::Long
        }
    }
}

/// A fully normalized video record. Built once by [`crate::normalize`] and
/// never mutated afterwards.
///
/// `normalized_views` and `composite_score` are relative to the batch the
/// record was loaded with: the same video scores differently next to other
/// videos, so composite scores from different runs are not comparable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub published_at: DateTime<Utc>,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub duration_seconds: f64,
    pub thumbnail_url: String,
    pub age_hours: f64,
    pub rate_score: f64,
    pub format_class: FormatClass,
    pub connection_index: f64,
    pub normalized_views: f64,
    pub composite_score: f64,
    pub topic_bucket: String,
}

/// Rows read from JSON input, plus the lines that were not JSON objects.
#[derive(Debug, Default)]
pub struct RowSet {
    pub rows: Vec<RawRow>,
    pub rejected: Vec<AnalysisError>,
}

/// Read JSON Lines, or a single JSON array of objects.
pub fn read_rows(input: &str) -> Result<RowSet, AnalysisError> {
    let mut out = RowSet::default();
    if input.trim_start().starts_with('[') {
        let v: Value = serde_json::from_str(input)?;
        if let Value::Array(items) = v {
            for (idx, item) in items.iter().enumerate() {
                match item {
                    Value::Object(_) => out.rows.push(flatten_row(item)),
                    _ => out.rejected.push(AnalysisError::MalformedRecord {
                        row: idx + 1,
                        reason: "not a JSON object".into(),
                    }),
                }
            }
        }
        return Ok(out);
    }
    for (idx, line) in input.lines().enumerate() {
        if line.trim().is_empty() { continue; }
        match parse_row(line, idx + 1) {
            Ok(row) => out.rows.push(row),
            Err(e) => out.rejected.push(e),
        }
    }
    Ok(out)
}

pub fn parse_row(line: &str, row: usize) -> Result<RawRow, AnalysisError> {
    let malformed = |reason: String| AnalysisError::MalformedRecord { row, reason };
    match serde_json::from_str::<Value>(line) {
        Ok(v @ Value::Object(_)) => Ok(flatten_row(&v)),
        Ok(_) => Err(malformed("not a JSON object".into())),
        Err(e) => Err(malformed(e.to_string())),
    }
}

fn flatten_row(v: &Value) -> RawRow {
    let mut flat = BTreeMap::new();
    flatten_json("", v, &mut flat);
    flat
}

fn flatten_json(prefix: &str, v: &Value, out: &mut RawRow) {
    match v {
        Value::Object(map) => {
            for (k, v) in map.iter() {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_json(&key, v, out);
            }
        }
        Value::Array(arr) => {
            for (idx, item) in arr.iter().enumerate() {
                let key = if prefix.is_empty() {
                    idx.to_string()
                } else {
                    format!("{prefix}.{idx}")
                };
                flatten_json(&key, item, out);
            }
        }
        Value::Null => {
            out.insert(prefix.to_string(), String::new());
        }
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
    }
}

/// First non-blank column among `keys`.
pub fn field<'a>(row: &'a RawRow, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .map(|s| s.as_str())
        .find(|s| !s.trim().is_empty())
}

/// Lenient numeric coercion: anything unparseable or non-finite reads as 0.
pub fn coerce_number(s: Option<&str>) -> f64 {
    s.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|x| x.is_finite())
        .unwrap_or(0.0)
}

/// Like [`coerce_number`], clamped to a non-negative count.
pub fn coerce_count(s: Option<&str>) -> u64 {
    let x = coerce_number(s);
    if x <= 0.0 { 0 } else { x as u64 }
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() { return None; }
    parse_ts_string(s).or_else(|| parse_ts_number_string(s))
}

fn parse_ts_string(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let zoned = [
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S%z",
        "%Y-%m-%dT%H:%M:%S%z",
    ];
    for f in zoned.iter() {
        if let Ok(dt) = DateTime::parse_from_str(s, f) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    let naive = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for f in naive.iter() {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, f) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    for f in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, f) {
            return d.and_hms_opt(0, 0, 0).map(|ndt| Utc.from_utc_datetime(&ndt));
        }
    }
    None
}

fn parse_ts_number_string(s: &str) -> Option<DateTime<Utc>> {
    let digits_only = s.chars().all(|c| c.is_ascii_digit());
    if !digits_only { return None; }
    let n = s.parse::<i64>().ok()?;
    match s.len() {
        10 => DateTime::<Utc>::from_timestamp(n, 0),
        13 => DateTime::<Utc>::from_timestamp_millis(n),
        16 => DateTime::<Utc>::from_timestamp_micros(n),
        _ => None,
    }
}
