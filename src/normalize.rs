//! Two-phase record normalization.
//!
//! Phase 1 derives the row-local fields of each raw row using only that row and the
//! run's reference time. Phase 2 runs once every row is known, computing the
//! batch statistics and the fields that depend on them (`normalized_views`,
//! `composite_score`). Phase 2 must not start before phase 1 has seen the
//! whole batch.

use crate::error::AnalysisError;
use crate::record::{self, FormatClass, RawRow, Record};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

/// Guard added to every denominator.
pub const EPSILON: f64 = 0.001;

/// Ordered topic rules: first substring found in the lower-cased title wins.
pub const TOPIC_RULES: &[(&str, &str)] = &[
    ("productividad", "Productivity"),
    ("finanzas", "Finance"),
    ("negocios", "Business"),
    ("tutorial", "Tutorial"),
];
pub const DEFAULT_TOPIC: &str = "General";

const RATE_WEIGHT: f64 = 0.5;
const CONNECTION_WEIGHT: f64 = 0.3;
const VIEWS_WEIGHT: f64 = 0.2;

/// Everything a run shares. Captured once so every record in a batch is aged
/// against the same instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunContext {
    pub reference_time: DateTime<Utc>,
}

impl RunContext {
    pub fn new(reference_time: DateTime<Utc>) -> Self {
        Self { reference_time }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchStats {
    pub min_views: u64,
    pub max_views: u64,
}

/// Output of a normalization run.
#[derive(Debug)]
pub struct NormalizedBatch {
    pub context: RunContext,
    pub stats: Option<BatchStats>,
    pub records: Vec<Record>,
    /// Rows dropped for an unusable timestamp.
    pub rejected: Vec<AnalysisError>,
}

/// Row-local fields (phase 1).
#[derive(Debug, Clone)]
struct RowMetrics {
    video_id: String,
    title: String,
    channel: String,
    published_at: DateTime<Utc>,
    views: u64,
    likes: u64,
    comments: u64,
    duration_seconds: f64,
    thumbnail_url: String,
    age_hours: f64,
    rate_score: f64,
    format_class: FormatClass,
    connection_index: f64,
    topic_bucket: String,
}

pub fn normalize_rows(rows: &[RawRow], ctx: RunContext) -> NormalizedBatch {
    // Phase 1
    let mut pending = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        match row_metrics(row, idx + 1, &ctx) {
            Ok(m) => pending.push(m),
            Err(e) => {
                warn!("dropping row: {e}");
                rejected.push(e);
            }
        }
    }

    // Phase 2
    let stats = batch_stats(&pending);
    let records: Vec<Record> = match stats {
        Some(stats) => pending.into_iter().map(|m| finish(m, &stats)).collect(),
        None => Vec::new(),
    };
    debug!(
        "normalized {} of {} rows (min_views={:?}, max_views={:?})",
        records.len(),
        rows.len(),
        stats.map(|s| s.min_views),
        stats.map(|s| s.max_views)
    );
    NormalizedBatch { context: ctx, stats, records, rejected }
}

fn row_metrics(row: &RawRow, row_number: usize, ctx: &RunContext) -> Result<RowMetrics, AnalysisError> {
    let published_at = match record::field(row, record::PUBLISHED_KEYS) {
        None => {
            return Err(AnalysisError::MalformedRecord {
                row: row_number,
                reason: "missing publish timestamp".into(),
            })
        }
        Some(raw) => record::parse_timestamp(raw).ok_or_else(|| AnalysisError::MalformedRecord {
            row: row_number,
            reason: format!("unparseable publish timestamp {raw:?}"),
        })?,
    };

    let text = |keys: &[&str]| record::field(row, keys).unwrap_or_default().to_string();
    let views = record::coerce_count(record::field(row, record::VIEWS_KEYS));
    let likes = record::coerce_count(record::field(row, record::LIKES_KEYS));
    let comments = record::coerce_count(record::field(row, record::COMMENTS_KEYS));
    let duration_seconds = record::coerce_number(record::field(row, record::DURATION_KEYS)).max(0.0);

    let age_hours = match record::field(row, record::AGE_KEYS) {
        Some(raw) => record::coerce_number(Some(raw)),
        None => age_in_hours(published_at, ctx.reference_time),
    }
    .max(0.0);
    let rate = match record::field(row, record::RATE_KEYS) {
        Some(raw) => record::coerce_number(Some(raw)).max(0.0),
        None => rate_score(views, age_hours),
    };
    let title = text(record::TITLE_KEYS);
    let topic_bucket = topic_bucket(&title).to_string();

    Ok(RowMetrics {
        video_id: text(record::ID_KEYS),
        channel: text(record::CHANNEL_KEYS),
        thumbnail_url: text(record::THUMBNAIL_KEYS),
        published_at,
        views,
        likes,
        comments,
        duration_seconds,
        age_hours,
        rate_score: rate,
        format_class: FormatClass::from_duration(duration_seconds),
        connection_index: connection_index(likes, comments, views),
        topic_bucket,
        title,
    })
}

fn batch_stats(rows: &[RowMetrics]) -> Option<BatchStats> {
    let min_views = rows.iter().map(|m| m.views).min()?;
    let max_views = rows.iter().map(|m| m.views).max()?;
    Some(BatchStats { min_views, max_views })
}

fn finish(m: RowMetrics, stats: &BatchStats) -> Record {
    let normalized_views = normalized_views(m.views, stats);
    let composite_score = composite_score(m.rate_score, m.connection_index, normalized_views);
    Record {
        video_id: m.video_id,
        title: m.title,
        channel: m.channel,
        published_at: m.published_at,
        views: m.views,
        likes: m.likes,
        comments: m.comments,
        duration_seconds: m.duration_seconds,
        thumbnail_url: m.thumbnail_url,
        age_hours: m.age_hours,
        rate_score: m.rate_score,
        format_class: m.format_class,
        connection_index: m.connection_index,
        normalized_views,
        composite_score,
        topic_bucket: m.topic_bucket,
    }
}

/// Hours between publication and the reference time. Future timestamps read as 0.
pub fn age_in_hours(published_at: DateTime<Utc>, reference_time: DateTime<Utc>) -> f64 {
    let secs = (reference_time - published_at).num_milliseconds() as f64 / 1000.0;
    (secs / 3600.0).max(0.0)
}

/// Views per hour (VPH).
pub fn rate_score(views: u64, age_hours: f64) -> f64 {
    views as f64 / (age_hours.max(0.0) + EPSILON)
}

pub fn connection_index(likes: u64, comments: u64, views: u64) -> f64 {
    (likes as f64 + 2.0 * comments as f64) / (views as f64 + EPSILON) * 100.0
}

pub fn normalized_views(views: u64, stats: &BatchStats) -> f64 {
    let span = stats.max_views.saturating_sub(stats.min_views) as f64;
    views.saturating_sub(stats.min_views) as f64 / (span + EPSILON)
}

/// CLARA blend. Not rescaled, so `rate_score` dominates in practice.
pub fn composite_score(rate_score: f64, connection_index: f64, normalized_views: f64) -> f64 {
    RATE_WEIGHT * rate_score + CONNECTION_WEIGHT * connection_index + VIEWS_WEIGHT * normalized_views
}

pub fn topic_bucket(title: &str) -> &'static str {
    let lower = title.to_lowercase();
    TOPIC_RULES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, label)| *label)
        .unwrap_or(DEFAULT_TOPIC)
}
