use channelscope::aggregate::{self, DurationBucket, Metric};
use channelscope::normalize::{normalize_rows, RunContext};
use channelscope::record::{FormatClass, RawRow, Record};
use chrono::{TimeZone, Utc, Weekday};

fn records(specs: &[(&str, &str, u64, f64, &str)]) -> Vec<Record> {
    let rows: Vec<RawRow> = specs
        .iter()
        .map(|(id, channel, views, duration, published)| {
            [
                ("video_id", id.to_string()),
                ("titulo", format!("Video {id}")),
                ("nombre_canal", channel.to_string()),
                ("fecha_publicacion", published.to_string()),
                ("vistas", views.to_string()),
                ("duracion_segundos", duration.to_string()),
                ("horas_desde_pub", "1".to_string()),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
        })
        .collect();
    let ctx = RunContext::new(Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap());
    let batch = normalize_rows(&rows, ctx);
    assert_eq!(batch.records.len(), specs.len());
    batch.records
}

#[test]
fn empty_input_gives_empty_groups() {
    let none: Vec<Record> = Vec::new();
    assert!(aggregate::by_channel(&none, &[Metric::Views]).is_empty());
    assert!(aggregate::by_duration_bucket(&none, &[Metric::Views]).is_empty());
    assert!(aggregate::by_hour(&none, &[Metric::Views]).is_empty());

    let week = aggregate::by_weekday(&none, &[Metric::Views]);
    assert_eq!(week.len(), 7);
    assert!(week.iter().all(|s| s.summary.is_none()));
}

#[test]
fn summarize_empty_keeps_requested_fields() {
    let none: Vec<Record> = Vec::new();
    let g = aggregate::summarize(&none, &[Metric::Views, Metric::RateScore]);
    assert_eq!(g.count, 0);
    assert_eq!(g.fields.len(), 2);
    assert_eq!(g.mean(Metric::Views), Some(0.0));
    assert_eq!(g.sum(Metric::RateScore), Some(0.0));
    assert_eq!(g.mean(Metric::Likes), None);
}

#[test]
fn groups_carry_count_sum_and_mean() {
    let recs = records(&[
        ("a", "Alpha", 100, 30.0, "2024-06-03T10:00:00Z"),
        ("b", "Beta", 40, 30.0, "2024-06-03T10:00:00Z"),
        ("c", "Alpha", 300, 30.0, "2024-06-04T10:00:00Z"),
    ]);
    let groups = aggregate::by_channel(&recs, &[Metric::Views]);
    let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Alpha", "Beta"]);
    let alpha = &groups["Alpha"];
    assert_eq!(alpha.count, 2);
    assert_eq!(alpha.sum(Metric::Views), Some(400.0));
    assert_eq!(alpha.mean(Metric::Views), Some(200.0));
    assert_eq!(groups["Beta"].count, 1);
}

#[test]
fn weekday_slots_are_monday_first_with_gaps() {
    // 2024-06-03 is a Monday, 2024-06-05 a Wednesday.
    let recs = records(&[
        ("a", "A", 10, 30.0, "2024-06-03T08:00:00Z"),
        ("b", "A", 20, 30.0, "2024-06-05T08:00:00Z"),
        ("c", "A", 30, 30.0, "2024-06-05T09:00:00Z"),
    ]);
    let week = aggregate::by_weekday(&recs, &[Metric::Views]);
    let days: Vec<Weekday> = week.iter().map(|s| s.day).collect();
    assert_eq!(days, aggregate::WEEK.to_vec());
    assert_eq!(week[0].summary.as_ref().map(|g| g.count), Some(1));
    assert!(week[1].summary.is_none());
    let wed = week[2].summary.as_ref().expect("wednesday");
    assert_eq!(wed.count, 2);
    assert_eq!(wed.mean(Metric::Views), Some(25.0));
    assert!(week[3..].iter().all(|s| s.summary.is_none()));
}

#[test]
fn duration_buckets_place_boundary_values() {
    let recs = records(&[
        ("a", "A", 1, 45.0, "2024-06-03T08:00:00Z"),
        ("b", "A", 1, 61.0, "2024-06-03T08:00:00Z"),
        ("c", "A", 1, 180.0, "2024-06-03T08:00:00Z"),
        ("d", "A", 1, 1500.0, "2024-06-03T08:00:00Z"),
    ]);
    let buckets = aggregate::by_duration_bucket(&recs, &[Metric::Views]);
    let keys: Vec<DurationBucket> = buckets.keys().copied().collect();
    assert_eq!(
        keys,
        vec![
            DurationBucket::UnderOneMinute,
            DurationBucket::OneToThree,
            DurationBucket::ThreeToFive,
            DurationBucket::OverTwenty,
        ]
    );
    assert!(buckets.values().all(|g| g.count == 1));
}

#[test]
fn duration_buckets_cover_every_range() {
    let recs = records(&[
        ("a", "A", 1, 50.0, "2024-06-03T08:00:00Z"),
        ("b", "A", 1, 150.0, "2024-06-03T08:00:00Z"),
        ("c", "A", 1, 250.0, "2024-06-03T08:00:00Z"),
        ("d", "A", 1, 700.0, "2024-06-03T08:00:00Z"),
        ("e", "A", 1, 1500.0, "2024-06-03T08:00:00Z"),
    ]);
    let got: Vec<&str> = recs.iter().map(|r| DurationBucket::for_seconds(r.duration_seconds).label()).collect();
    assert_eq!(got, vec!["<1min", "1-3min", "3-5min", "10-20min", ">20min"]);
}

#[test]
fn format_and_month_groupings() {
    let recs = records(&[
        ("a", "A", 10, 30.0, "2024-05-31T23:00:00Z"),
        ("b", "A", 20, 600.0, "2024-06-01T00:30:00Z"),
        ("c", "A", 30, 600.0, "2024-06-15T12:00:00Z"),
    ]);
    let formats = aggregate::by_format(&recs, &[Metric::Views]);
    assert_eq!(formats[&FormatClass::Short].count, 1);
    assert_eq!(formats[&FormatClass::Long].count, 2);

    let months = aggregate::by_month(&recs, &[Metric::Views]);
    let keys: Vec<&str> = months.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["2024-05", "2024-06"]);
    assert_eq!(months["2024-06"].sum(Metric::Views), Some(50.0));

    let hours = aggregate::by_hour(&recs, &[Metric::Views]);
    let keys: Vec<u32> = hours.keys().copied().collect();
    assert_eq!(keys, vec![0, 12, 23]);
}

#[test]
fn aggregation_output_is_stable() {
    let recs = records(&[
        ("a", "Zeta", 10, 30.0, "2024-06-03T08:00:00Z"),
        ("b", "Alpha", 20, 300.0, "2024-06-04T08:00:00Z"),
        ("c", "Mid", 30, 900.0, "2024-06-05T08:00:00Z"),
    ]);
    let metrics = [Metric::Views, Metric::RateScore];
    let one = serde_json::to_string(&aggregate::by_channel(&recs, &metrics)).unwrap();
    let two = serde_json::to_string(&aggregate::by_channel(&recs, &metrics)).unwrap();
    assert_eq!(one, two);
    let week = serde_json::to_string(&aggregate::by_weekday(&recs, &metrics)).unwrap();
    assert_eq!(week, serde_json::to_string(&aggregate::by_weekday(&recs, &metrics)).unwrap());
}
