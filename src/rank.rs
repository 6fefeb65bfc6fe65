use crate::aggregate::{GroupSummary, Metric, WeekdaySlot};
use crate::error::AnalysisError;
use crate::record::Record;
use chrono::Weekday;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// First `n` records ordered by `metric`. The sort is stable, so records with
/// equal values keep their input order.
pub fn top_n<'a, I>(records: I, metric: Metric, order: SortOrder, n: usize) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut v: Vec<&Record> = records.into_iter().collect();
    v.sort_by(|a, b| compare(metric.value(a), metric.value(b), order));
    v.truncate(n);
    v
}

fn compare(a: f64, b: f64, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Ascending => a.total_cmp(&b),
        SortOrder::Descending => b.total_cmp(&a),
    }
}

/// Key of the group with the highest mean `metric`. On equal means the first
/// group in iteration order wins.
pub fn arg_max_by<'a, K, I>(groups: I, metric: Metric) -> Result<K, AnalysisError>
where
    K: Clone + 'a,
    I: IntoIterator<Item = (&'a K, &'a GroupSummary)>,
{
    let mut best: Option<(K, f64)> = None;
    for (key, summary) in groups {
        let mean = summary.mean(metric).ok_or_else(|| {
            AnalysisError::Configuration(format!("field {} was not aggregated", metric.name()))
        })?;
        match &best {
            Some((_, m)) if mean <= *m => {}
            _ => best = Some((key.clone(), mean)),
        }
    }
    best.map(|(k, _)| k).ok_or(AnalysisError::EmptyInput)
}

pub fn arg_max<K: Clone>(groups: &BTreeMap<K, GroupSummary>, metric: Metric) -> Result<K, AnalysisError> {
    arg_max_by(groups.iter(), metric)
}

/// Best weekday; days without data never win.
pub fn best_weekday(slots: &[WeekdaySlot], metric: Metric) -> Result<Weekday, AnalysisError> {
    arg_max_by(
        slots.iter().filter_map(|s| s.summary.as_ref().map(|g| (&s.day, g))),
        metric,
    )
}
