use channelscope::aggregate::{self, Metric};
use channelscope::compare::{self, CHANNEL_METRICS};
use channelscope::normalize::{normalize_rows, RunContext};
use channelscope::record::{RawRow, Record};
use channelscope::AnalysisError;
use chrono::{TimeZone, Utc};

fn channel_records(specs: &[(&str, u64, u64, u64)]) -> Vec<Record> {
    let rows: Vec<RawRow> = specs
        .iter()
        .enumerate()
        .map(|(i, (channel, views, likes, comments))| {
            [
                ("video_id", format!("v{i}")),
                ("titulo", "Video".to_string()),
                ("nombre_canal", channel.to_string()),
                ("fecha_publicacion", "2024-06-01T00:00:00Z".to_string()),
                ("vistas", views.to_string()),
                ("likes", likes.to_string()),
                ("comentarios", comments.to_string()),
                ("duracion_segundos", "240".to_string()),
                ("horas_desde_pub", "10".to_string()),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
        })
        .collect();
    let ctx = RunContext::new(Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap());
    normalize_rows(&rows, ctx).records
}

#[test]
fn delta_is_exact_difference() {
    let recs = channel_records(&[
        ("Mine", 1000, 50, 10),
        ("Mine", 3000, 70, 30),
        ("Other", 500, 5, 1),
        ("Other", 700, 9, 3),
        ("Other", 900, 10, 2),
    ]);
    let (mine, other): (Vec<&Record>, Vec<&Record>) = recs.iter().partition(|r| r.channel == "Mine");
    let c = compare::channel_performance(&mine, &other).unwrap();

    assert_eq!(c.count.subject, 2.0);
    assert_eq!(c.count.peer, 3.0);
    assert_eq!(c.count.delta, -1.0);
    let views = c.fields[&Metric::Views];
    assert_eq!(views.mean.subject, 2000.0);
    assert_eq!(views.mean.peer, 700.0);
    assert_eq!(views.mean.delta, 1300.0);
    assert_eq!(views.sum.delta, 4000.0 - 2100.0);
    for d in c.fields.values() {
        assert_eq!(d.mean.delta, d.mean.subject - d.mean.peer);
        assert_eq!(d.sum.delta, d.sum.subject - d.sum.peer);
    }
    let keys: Vec<Metric> = c.fields.keys().copied().collect();
    let mut want = CHANNEL_METRICS.to_vec();
    want.sort();
    assert_eq!(keys, want);
}

#[test]
fn empty_peers_compare_as_zero() {
    let recs = channel_records(&[("Solo", 1000, 50, 10), ("Solo", 200, 4, 0)]);
    let subject: Vec<&Record> = recs.iter().collect();
    let c = compare::channel_performance(&subject, &[]).unwrap();
    assert_eq!(c.count.peer, 0.0);
    assert_eq!(c.count.delta, 2.0);
    for d in c.fields.values() {
        assert_eq!(d.mean.peer, 0.0);
        assert_eq!(d.sum.peer, 0.0);
        assert_eq!(d.mean.delta, d.mean.subject);
        assert_eq!(d.sum.delta, d.sum.subject);
    }
}

#[test]
fn mismatched_field_sets_are_rejected() {
    let recs = channel_records(&[("A", 10, 1, 1)]);
    let a = aggregate::summarize(&recs, &[Metric::Views, Metric::Likes]);
    let b = aggregate::summarize(&recs, &[Metric::Views]);
    let err = compare::compare(&a, &b).unwrap_err();
    assert!(matches!(err, AnalysisError::Configuration(_)));
}

#[test]
fn comparison_serializes_metric_names() {
    let recs = channel_records(&[("A", 10, 1, 1)]);
    let all: Vec<&Record> = recs.iter().collect();
    let c = compare::channel_performance(&all, &all).unwrap();
    let v = serde_json::to_value(&c).unwrap();
    assert!(v["fields"]["views"]["mean"]["delta"].is_number());
    assert_eq!(v["fields"]["rate_score"]["mean"]["delta"], 0.0);
}
