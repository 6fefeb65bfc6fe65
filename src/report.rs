use crate::aggregate::{self, DurationBucket, GroupSummary, Metric, WeekdaySlot};
use crate::compare::{self, Comparison};
use crate::error::AnalysisError;
use crate::normalize::{self, NormalizedBatch, RunContext};
use crate::rank::{self, SortOrder};
use crate::record::{self, FormatClass, Record};
use crate::titles::{self, TitleInsights, TitleOpts};
use chrono::{DateTime, SecondsFormat, Utc, Weekday};
use itertools::Itertools;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct ChannelReport {
    pub summary: Summary,
    pub performance: Comparison,
    pub content_strategy: ContentStrategy,
    pub monthly_trends: Vec<MonthRow>,
    pub topics: Vec<TopicRow>,
    pub top_videos: Vec<TopVideo>,
    pub duration: DurationReport,
    pub schedule: ScheduleReport,
    pub seo: TitleInsights,
    pub niche: NicheReport,
    pub errors: ErrorsOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub reference_time: String,
    pub total_records: usize,
    pub channels: Vec<String>,
    /// `None` means every channel is the subject.
    pub subject_channel: Option<String>,
    pub subject_videos: usize,
    pub peer_videos: usize,
    pub min_views: Option<u64>,
    pub max_views: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FormatStats {
    pub count: usize,
    pub mean_rate_score: f64,
    pub mean_views: f64,
    pub total_views: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContentStrategy {
    pub short: FormatStats,
    pub long: FormatStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRow {
    pub month: String,
    pub total_views: f64,
    pub mean_rate_score: f64,
    pub videos: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicRow {
    pub topic: String,
    pub mean_rate_score: f64,
    pub mean_views: f64,
    pub mean_connection_index: f64,
    pub videos: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopVideo {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub format: FormatClass,
    pub rate_score: f64,
    pub views: u64,
    pub duration_seconds: f64,
    pub duration_label: String,
    pub published_at: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DurationReport {
    pub buckets: BTreeMap<DurationBucket, GroupSummary>,
    pub optimal: Option<DurationBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleReport {
    pub by_weekday: Vec<WeekdaySlot>,
    pub by_hour: BTreeMap<u32, GroupSummary>,
    pub best_weekday: Option<Weekday>,
    pub best_hour: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountItem {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NicheFormat {
    pub videos: Vec<TopVideo>,
    pub mean_rate_score: f64,
    pub mean_views: f64,
    pub top_channels: Vec<CountItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NicheReport {
    pub short: NicheFormat,
    pub long: NicheFormat,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorsOut {
    pub total: usize,
    pub samples: Vec<ErrorSample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorSample {
    pub message: String,
}

const MAX_ERROR_SAMPLES: usize = 10;

impl ErrorsOut {
    pub fn from_errors<'a, I>(errors: I) -> Self
    where
        I: IntoIterator<Item = &'a AnalysisError>,
    {
        let mut out = ErrorsOut::default();
        for e in errors {
            out.total += 1;
            if out.samples.len() < MAX_ERROR_SAMPLES {
                out.samples.push(ErrorSample { message: e.to_string() });
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOpts {
    /// Fixed reference time; defaults to the wall clock at run start.
    pub reference_time: Option<DateTime<Utc>>,
    pub top_videos: usize,
    pub niche_top: usize,
    pub niche_top_channels: usize,
    pub titles: TitleOpts,
}

impl Default for AnalysisOpts {
    fn default() -> Self {
        Self {
            reference_time: None,
            top_videos: 10,
            niche_top: 200,
            niche_top_channels: 3,
            titles: TitleOpts::default(),
        }
    }
}

impl AnalysisOpts {
    pub fn run_context(&self) -> RunContext {
        self.reference_time.map(RunContext::new).unwrap_or_else(RunContext::now)
    }
}

/// Records of the chosen channel and of every other channel.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub subject: Vec<&'a Record>,
    pub peers: Vec<&'a Record>,
}

/// Split a batch into subject and peers. Without a channel, the whole batch is
/// both.
pub fn select_channel<'a>(records: &'a [Record], channel: Option<&str>) -> Selection<'a> {
    match channel {
        Some(name) => {
            let (subject, peers): (Vec<&Record>, Vec<&Record>) =
                records.iter().partition(|r| r.channel == name);
            Selection { subject, peers }
        }
        None => Selection { subject: records.iter().collect(), peers: records.iter().collect() },
    }
}

pub fn list_channels(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.channel.clone()).collect::<BTreeSet<_>>().into_iter().collect()
}

/// Channels with the most records, ties by name.
pub fn top_channels_by_count(records: &[&Record], n: usize) -> Vec<CountItem> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in records {
        *counts.entry(r.channel.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .take(n)
        .map(|(name, count)| CountItem { name: name.to_string(), count })
        .collect()
}

pub fn content_strategy(records: &[&Record]) -> ContentStrategy {
    let groups = aggregate::by_format(records.iter().copied(), &[Metric::RateScore, Metric::Views]);
    let stats = |f: FormatClass| {
        groups
            .get(&f)
            .map(|g| FormatStats {
                count: g.count,
                mean_rate_score: g.mean(Metric::RateScore).unwrap_or_default(),
                mean_views: g.mean(Metric::Views).unwrap_or_default(),
                total_views: g.sum(Metric::Views).unwrap_or_default(),
            })
            .unwrap_or_default()
    };
    ContentStrategy { short: stats(FormatClass::Short), long: stats(FormatClass::Long) }
}

pub fn monthly_trends(records: &[&Record]) -> Vec<MonthRow> {
    aggregate::by_month(records.iter().copied(), &[Metric::Views, Metric::RateScore])
        .into_iter()
        .map(|(month, g)| MonthRow {
            total_views: g.sum(Metric::Views).unwrap_or_default(),
            mean_rate_score: g.mean(Metric::RateScore).unwrap_or_default(),
            videos: g.count,
            month,
        })
        .collect()
}

/// Topic buckets ordered by mean rate score, best first.
pub fn topic_performance(records: &[&Record]) -> Vec<TopicRow> {
    let metrics = [Metric::RateScore, Metric::Views, Metric::ConnectionIndex];
    let mut rows: Vec<TopicRow> = aggregate::by_topic(records.iter().copied(), &metrics)
        .into_iter()
        .map(|(topic, g)| TopicRow {
            mean_rate_score: g.mean(Metric::RateScore).unwrap_or_default(),
            mean_views: g.mean(Metric::Views).unwrap_or_default(),
            mean_connection_index: g.mean(Metric::ConnectionIndex).unwrap_or_default(),
            videos: g.count,
            topic,
        })
        .collect();
    rows.sort_by(|a, b| b.mean_rate_score.total_cmp(&a.mean_rate_score));
    rows
}

/// `m:ss` from one minute up, plain seconds below.
pub fn format_duration(seconds: f64) -> String {
    let secs = seconds.max(0.0) as u64;
    if seconds >= 60.0 {
        format!("{}:{:02}", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

fn top_video(r: &Record) -> TopVideo {
    TopVideo {
        video_id: r.video_id.clone(),
        title: r.title.clone(),
        channel: r.channel.clone(),
        format: r.format_class,
        rate_score: r.rate_score,
        views: r.views,
        duration_seconds: r.duration_seconds,
        duration_label: format_duration(r.duration_seconds),
        published_at: r.published_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        thumbnail_url: r.thumbnail_url.clone(),
    }
}

pub fn top_videos(records: &[&Record], n: usize) -> Vec<TopVideo> {
    rank::top_n(records.iter().copied(), Metric::RateScore, SortOrder::Descending, n)
        .into_iter()
        .map(top_video)
        .collect()
}

pub fn optimal_duration(records: &[&Record]) -> DurationReport {
    let buckets = aggregate::by_duration_bucket(records.iter().copied(), &[Metric::RateScore, Metric::Views]);
    let optimal = rank::arg_max(&buckets, Metric::RateScore).ok();
    DurationReport { buckets, optimal }
}

pub fn publishing_schedule(records: &[&Record]) -> ScheduleReport {
    let metrics = [Metric::RateScore, Metric::Views];
    let by_weekday = aggregate::by_weekday(records.iter().copied(), &metrics);
    let by_hour = aggregate::by_hour(records.iter().copied(), &metrics);
    ScheduleReport {
        best_weekday: rank::best_weekday(&by_weekday, Metric::RateScore).ok(),
        best_hour: rank::arg_max(&by_hour, Metric::RateScore).ok(),
        by_weekday,
        by_hour,
    }
}

fn niche_format(records: &[Record], format: FormatClass, opts: &AnalysisOpts) -> NicheFormat {
    let top = rank::top_n(
        records.iter().filter(|r| r.format_class == format),
        Metric::RateScore,
        SortOrder::Descending,
        opts.niche_top,
    );
    let g = aggregate::summarize(top.iter().copied(), &[Metric::RateScore, Metric::Views]);
    NicheFormat {
        mean_rate_score: g.mean(Metric::RateScore).unwrap_or_default(),
        mean_views: g.mean(Metric::Views).unwrap_or_default(),
        top_channels: top_channels_by_count(&top, opts.niche_top_channels),
        videos: top.into_iter().map(top_video).collect(),
    }
}

/// Top videos of the whole dataset, per format.
pub fn niche_report(records: &[Record], opts: &AnalysisOpts) -> NicheReport {
    NicheReport {
        short: niche_format(records, FormatClass::Short, opts),
        long: niche_format(records, FormatClass::Long, opts),
    }
}

pub fn build_report(
    batch: &NormalizedBatch,
    channel: Option<&str>,
    opts: &AnalysisOpts,
) -> Result<ChannelReport, AnalysisError> {
    let sel = select_channel(&batch.records, channel);
    info!(
        "building report: channel={:?} subject={} peers={}",
        channel,
        sel.subject.len(),
        sel.peers.len()
    );
    let performance = compare::channel_performance(&sel.subject, &sel.peers)?;
    let summary = Summary {
        reference_time: batch.context.reference_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        total_records: batch.records.len(),
        channels: list_channels(&batch.records),
        subject_channel: channel.map(str::to_string),
        subject_videos: sel.subject.len(),
        peer_videos: sel.peers.len(),
        min_views: batch.stats.map(|s| s.min_views),
        max_views: batch.stats.map(|s| s.max_views),
    };
    let duration = optimal_duration(&sel.subject);
    let schedule = publishing_schedule(&sel.subject);
    debug!(
        "optimal duration={:?} best weekday={:?} best hour={:?}",
        duration.optimal, schedule.best_weekday, schedule.best_hour
    );
    Ok(ChannelReport {
        summary,
        performance,
        content_strategy: content_strategy(&sel.subject),
        monthly_trends: monthly_trends(&sel.subject),
        topics: topic_performance(&sel.subject),
        top_videos: top_videos(&sel.subject, opts.top_videos),
        duration,
        schedule,
        seo: titles::seo_recommendations(sel.subject.iter().copied(), &opts.titles),
        niche: niche_report(&batch.records, opts),
        errors: ErrorsOut::from_errors(&batch.rejected),
    })
}

/// Read, normalize and report in one go. Rows that fail to read are reported
/// alongside rows dropped during normalization.
pub fn analyze_input(input: &str, channel: Option<&str>, opts: &AnalysisOpts) -> Result<ChannelReport, AnalysisError> {
    let rows = record::read_rows(input)?;
    let batch = normalize::normalize_rows(&rows.rows, opts.run_context());
    let mut report = build_report(&batch, channel, opts)?;
    report.errors = ErrorsOut::from_errors(rows.rejected.iter().chain(batch.rejected.iter()));
    Ok(report)
}
