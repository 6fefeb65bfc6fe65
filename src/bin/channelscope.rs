use anyhow::Context;
use channelscope::compare::Comparison;
use channelscope::report::{self, AnalysisOpts, ErrorsOut};
use channelscope::{normalize, record};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "channelscope", version, about = "Engagement analytics for video channel datasets")]
struct Cli {
    /// Input files with JSON rows (`-` for stdin). May be repeated.
    #[arg(required = false)]
    input: Vec<String>,

    /// Channel to benchmark against the rest (default: all channels)
    #[arg(long = "channel")]
    channel: Option<String>,

    /// Reference time (RFC3339) used to age every record
    #[arg(long = "now")]
    now: Option<String>,

    /// Print only one section: summary | records | performance | strategy | trends |
    /// topics | top | duration | schedule | seo | niche | errors
    #[arg(long = "only")]
    only: Option<String>,

    /// Number of top videos for the subject channel
    #[arg(long = "top", default_value_t = 10)]
    top: usize,

    /// Records ranked for title analysis
    #[arg(long = "title-sample", default_value_t = 20)]
    title_sample: usize,

    /// Minimum keyword length in characters
    #[arg(long = "min-keyword-len", default_value_t = 3)]
    min_keyword_len: usize,

    /// Top videos per format for the niche view
    #[arg(long = "niche-top", default_value_t = 200)]
    niche_top: usize,

    /// Output format for the performance section: json | table
    #[arg(long = "format", default_value = "json")]
    format: String,
}

/// Read every source into one row set. Sources are parsed separately so JSON
/// arrays and JSON Lines files can be mixed.
fn read_all_rows(paths: &[String]) -> anyhow::Result<record::RowSet> {
    let mut out = record::RowSet::default();
    let sources: Vec<String> = if paths.is_empty() { vec!["-".to_string()] } else { paths.to_vec() };
    for p in &sources {
        let text = if p == "-" {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            fs::read_to_string(p).with_context(|| format!("reading {p}"))?
        };
        let rows = record::read_rows(&text).with_context(|| format!("parsing {p}"))?;
        out.rows.extend(rows.rows);
        out.rejected.extend(rows.rejected);
    }
    Ok(out)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let reference_time = match cli.now.as_deref() {
        Some(s) => Some(
            DateTime::parse_from_rfc3339(s)
                .with_context(|| format!("--now is not RFC3339: {s}"))?
                .with_timezone(&Utc),
        ),
        None => None,
    };
    let mut opts = AnalysisOpts { reference_time, top_videos: cli.top, niche_top: cli.niche_top, ..Default::default() };
    opts.titles.top_records = cli.title_sample;
    opts.titles.min_keyword_len = cli.min_keyword_len;

    let rows = read_all_rows(&cli.input)?;
    let batch = normalize::normalize_rows(&rows.rows, opts.run_context());
    info!("loaded {} records ({} rows rejected)", batch.records.len(), rows.rejected.len() + batch.rejected.len());

    if matches!(cli.only.as_deref(), Some("records")) {
        for r in &batch.records {
            println!("{}", serde_json::to_string(r)?);
        }
        return Ok(());
    }

    let mut out = report::build_report(&batch, cli.channel.as_deref(), &opts)?;
    out.errors = ErrorsOut::from_errors(rows.rejected.iter().chain(batch.rejected.iter()));

    let section = match cli.only.as_deref() {
        None => serde_json::to_value(&out)?,
        Some("summary") => serde_json::to_value(&out.summary)?,
        Some("performance") => {
            if cli.format == "table" {
                print_comparison_table(&out.performance);
                return Ok(());
            }
            serde_json::to_value(&out.performance)?
        }
        Some("strategy") => serde_json::to_value(out.content_strategy)?,
        Some("trends") => serde_json::to_value(&out.monthly_trends)?,
        Some("topics") => serde_json::to_value(&out.topics)?,
        Some("top") => serde_json::to_value(&out.top_videos)?,
        Some("duration") => serde_json::to_value(&out.duration)?,
        Some("schedule") => serde_json::to_value(&out.schedule)?,
        Some("seo") => serde_json::to_value(&out.seo)?,
        Some("niche") => serde_json::to_value(&out.niche)?,
        Some("errors") => serde_json::to_value(&out.errors)?,
        Some(other) => anyhow::bail!("unknown section {other:?}"),
    };
    println!("{}", serde_json::to_string_pretty(&section)?);
    Ok(())
}

fn print_comparison_table(c: &Comparison) {
    println!("{:<18} {:>14} {:>14} {:>14}", "Metric", "Channel", "Peers", "Delta");
    println!("{:<18} {:>14.0} {:>14.0} {:>14.0}", "videos", c.count.subject, c.count.peer, c.count.delta);
    for (metric, d) in &c.fields {
        println!(
            "{:<18} {:>14.2} {:>14.2} {:>14.2}",
            format!("avg {}", metric.name()),
            d.mean.subject,
            d.mean.peer,
            d.mean.delta
        );
    }
    if let Some(views) = c.fields.get(&channelscope::aggregate::Metric::Views) {
        println!("{:<18} {:>14.0} {:>14.0} {:>14.0}", "total views", views.sum.subject, views.sum.peer, views.sum.delta);
    }
}
