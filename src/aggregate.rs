use crate::record::{FormatClass, Record};
use chrono::{Datelike, Timelike, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

/// Numeric record fields that can be aggregated or ranked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Views,
    Likes,
    Comments,
    DurationSeconds,
    AgeHours,
    RateScore,
    ConnectionIndex,
    NormalizedViews,
    CompositeScore,
}

impl Metric {
    pub fn value(self, r: &Record) -> f64 {
        match self {
            Metric::Views => r.views as f64,
            Metric::Likes => r.likes as f64,
            Metric::Comments => r.comments as f64,
            Metric::DurationSeconds => r.duration_seconds,
            Metric::AgeHours => r.age_hours,
            Metric::RateScore => r.rate_score,
            Metric::ConnectionIndex => r.connection_index,
            Metric::NormalizedViews => r.normalized_views,
            Metric::CompositeScore => r.composite_score,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Views => "views",
            Metric::Likes => "likes",
            Metric::Comments => "comments",
            Metric::DurationSeconds => "duration_seconds",
            Metric::AgeHours => "age_hours",
            Metric::RateScore => "rate_score",
            Metric::ConnectionIndex => "connection_index",
            Metric::NormalizedViews => "normalized_views",
            Metric::CompositeScore => "composite_score",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FieldStats {
    pub sum: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupSummary {
    pub count: usize,
    pub fields: BTreeMap<Metric, FieldStats>,
}

impl GroupSummary {
    pub fn mean(&self, metric: Metric) -> Option<f64> {
        self.fields.get(&metric).map(|s| s.mean)
    }

    pub fn sum(&self, metric: Metric) -> Option<f64> {
        self.fields.get(&metric).map(|s| s.sum)
    }
}

/// Summarize a whole population. An empty population still carries every
/// requested field, with zero sum and mean.
pub fn summarize<'a, I>(records: I, metrics: &[Metric]) -> GroupSummary
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut acc = Accumulator::new(metrics);
    for r in records {
        acc.push(r);
    }
    acc.finish()
}

/// Group records by `key` and summarize each group. Records for which `key`
/// returns `None` are skipped; groups never have a zero count.
pub fn group_by<'a, I, K, F>(records: I, key: F, metrics: &[Metric]) -> BTreeMap<K, GroupSummary>
where
    I: IntoIterator<Item = &'a Record>,
    K: Ord,
    F: Fn(&Record) -> Option<K>,
{
    let mut groups: BTreeMap<K, Accumulator> = BTreeMap::new();
    for r in records {
        if let Some(k) = key(r) {
            groups.entry(k).or_insert_with(|| Accumulator::new(metrics)).push(r);
        }
    }
    groups.into_iter().map(|(k, acc)| (k, acc.finish())).collect()
}

struct Accumulator {
    count: usize,
    sums: BTreeMap<Metric, f64>,
}

impl Accumulator {
    fn new(metrics: &[Metric]) -> Self {
        Self { count: 0, sums: metrics.iter().map(|m| (*m, 0.0)).collect() }
    }

    fn push(&mut self, r: &Record) {
        self.count += 1;
        for (metric, sum) in self.sums.iter_mut() {
            *sum += metric.value(r);
        }
    }

    fn finish(self) -> GroupSummary {
        let n = self.count;
        let fields = self
            .sums
            .into_iter()
            .map(|(m, sum)| {
                let mean = if n > 0 { sum / n as f64 } else { 0.0 };
                (m, FieldStats { sum, mean })
            })
            .collect();
        GroupSummary { count: n, fields }
    }
}

pub fn by_channel<'a, I>(records: I, metrics: &[Metric]) -> BTreeMap<String, GroupSummary>
where
    I: IntoIterator<Item = &'a Record>,
{
    group_by(records, |r| Some(r.channel.clone()), metrics)
}

pub fn by_format<'a, I>(records: I, metrics: &[Metric]) -> BTreeMap<FormatClass, GroupSummary>
where
    I: IntoIterator<Item = &'a Record>,
{
    group_by(records, |r| Some(r.format_class), metrics)
}

pub fn by_topic<'a, I>(records: I, metrics: &[Metric]) -> BTreeMap<String, GroupSummary>
where
    I: IntoIterator<Item = &'a Record>,
{
    group_by(records, |r| Some(r.topic_bucket.clone()), metrics)
}

/// Calendar month of publication, as `YYYY-MM`.
pub fn by_month<'a, I>(records: I, metrics: &[Metric]) -> BTreeMap<String, GroupSummary>
where
    I: IntoIterator<Item = &'a Record>,
{
    group_by(records, |r| Some(r.published_at.format("%Y-%m").to_string()), metrics)
}

/// Hour of day (UTC) of publication.
pub fn by_hour<'a, I>(records: I, metrics: &[Metric]) -> BTreeMap<u32, GroupSummary>
where
    I: IntoIterator<Item = &'a Record>,
{
    group_by(records, |r| Some(r.published_at.hour()), metrics)
}

pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// One weekday slot. `summary` is `None` when nothing was published that day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdaySlot {
    pub day: Weekday,
    pub summary: Option<GroupSummary>,
}

/// Weekday aggregation in fixed Monday..Sunday order.
pub fn by_weekday<'a, I>(records: I, metrics: &[Metric]) -> Vec<WeekdaySlot>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut groups = group_by(records, |r| Some(r.published_at.weekday().num_days_from_monday()), metrics);
    WEEK.iter()
        .map(|day| WeekdaySlot { day: *day, summary: groups.remove(&day.num_days_from_monday()) })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DurationBucket {
    #[serde(rename = "<1min")]
    UnderOneMinute,
    #[serde(rename = "1-3min")]
    OneToThree,
    #[serde(rename = "3-5min")]
    ThreeToFive,
    #[serde(rename = "5-10min")]
    FiveToTen,
    #[serde(rename = "10-20min")]
    TenToTwenty,
    #[serde(rename = ">20min")]
    OverTwenty,
}

/// Lower bound (seconds, inclusive) of each bucket, in order. The last bucket
/// is unbounded above.
const DURATION_BOUNDS: [(f64, DurationBucket); 6] = [
    (0.0, DurationBucket::UnderOneMinute),
    (60.0, DurationBucket::OneToThree),
    (180.0, DurationBucket::ThreeToFive),
    (300.0, DurationBucket::FiveToTen),
    (600.0, DurationBucket::TenToTwenty),
    (1200.0, DurationBucket::OverTwenty),
];

impl DurationBucket {
    pub fn for_seconds(seconds: f64) -> Self {
        DURATION_BOUNDS
            .iter()
            .rev()
            .find(|(lower, _)| seconds >= *lower)
            .map(|(_, b)| *b)
            .unwrap_or(DurationBucket::UnderOneMinute)
    }

    pub fn label(self) -> &'static str {
        match self {
            DurationBucket::UnderOneMinute => "<1min",
            DurationBucket::OneToThree => "1-3min",
            DurationBucket::ThreeToFive => "3-5min",
            DurationBucket::FiveToTen => "5-10min",
            DurationBucket::TenToTwenty => "10-20min",
            DurationBucket::OverTwenty => ">20min",
        }
    }
}

pub fn by_duration_bucket<'a, I>(records: I, metrics: &[Metric]) -> BTreeMap<DurationBucket, GroupSummary>
where
    I: IntoIterator<Item = &'a Record>,
{
    group_by(records, |r| Some(DurationBucket::for_seconds(r.duration_seconds)), metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_bounds_are_half_open() {
        assert_eq!(DurationBucket::for_seconds(0.0), DurationBucket::UnderOneMinute);
        assert_eq!(DurationBucket::for_seconds(59.9), DurationBucket::UnderOneMinute);
        assert_eq!(DurationBucket::for_seconds(60.0), DurationBucket::OneToThree);
        assert_eq!(DurationBucket::for_seconds(179.0), DurationBucket::OneToThree);
        assert_eq!(DurationBucket::for_seconds(180.0), DurationBucket::ThreeToFive);
        assert_eq!(DurationBucket::for_seconds(1199.0), DurationBucket::TenToTwenty);
        assert_eq!(DurationBucket::for_seconds(1200.0), DurationBucket::OverTwenty);
        assert_eq!(DurationBucket::for_seconds(86_400.0), DurationBucket::OverTwenty);
    }

    #[test]
    fn labels_match_serialized_names() {
        for (_, b) in DURATION_BOUNDS.iter() {
            let json = serde_json::to_string(b).unwrap();
            assert_eq!(json, format!("\"{}\"", b.label()));
        }
    }
}
