use crate::aggregate::{self, GroupSummary, Metric};
use crate::error::AnalysisError;
use crate::record::Record;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fields used for the channel-vs-peers benchmark.
pub const CHANNEL_METRICS: &[Metric] = &[
    Metric::Views,
    Metric::RateScore,
    Metric::DurationSeconds,
    Metric::Likes,
    Metric::Comments,
    Metric::ConnectionIndex,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub subject: f64,
    pub peer: f64,
    pub delta: f64,
}

impl Delta {
    pub fn new(subject: f64, peer: f64) -> Self {
        Self { subject, peer, delta: subject - peer }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldDelta {
    pub mean: Delta,
    pub sum: Delta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub count: Delta,
    pub fields: BTreeMap<Metric, FieldDelta>,
}

/// Pair two summaries field by field. Both must carry the same field set.
pub fn compare(subject: &GroupSummary, peer: &GroupSummary) -> Result<Comparison, AnalysisError> {
    if !subject.fields.keys().eq(peer.fields.keys()) {
        let names = |g: &GroupSummary| g.fields.keys().map(|m| m.name()).collect::<Vec<_>>().join(",");
        return Err(AnalysisError::Configuration(format!(
            "field sets differ: subject [{}] vs peer [{}]",
            names(subject),
            names(peer)
        )));
    }
    let fields = subject
        .fields
        .iter()
        .zip(peer.fields.values())
        .map(|((metric, s), p)| {
            (*metric, FieldDelta { mean: Delta::new(s.mean, p.mean), sum: Delta::new(s.sum, p.sum) })
        })
        .collect();
    Ok(Comparison { count: Delta::new(subject.count as f64, peer.count as f64), fields })
}

/// Benchmark a channel's records against its peers on [`CHANNEL_METRICS`].
/// An empty peer population compares as all zeros.
pub fn channel_performance(subject: &[&Record], peers: &[&Record]) -> Result<Comparison, AnalysisError> {
    let s = aggregate::summarize(subject.iter().copied(), CHANNEL_METRICS);
    let p = aggregate::summarize(peers.iter().copied(), CHANNEL_METRICS);
    compare(&s, &p)
}
