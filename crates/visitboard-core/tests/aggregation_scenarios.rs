//! End-to-end aggregation over raw input, checked through the JSON contract

use serde_json::Value;
use visitboard_core::models::{sanitize_records, RawDailyRecord};
use visitboard_core::AggregatedVisitorData;

fn raw(date: &str, visitors: f64) -> RawDailyRecord {
    RawDailyRecord {
        date: date.to_string(),
        visitors: Some(visitors),
        pageviews: Some(visitors * 3.0),
        sessions: Some(visitors * 1.2),
        new_users: Some(visitors * 0.5),
        bounce_rate: Some(40.0),
        avg_duration: Some(200.0),
    }
}

fn aggregate(rows: Vec<RawDailyRecord>) -> Value {
    let sanitized = sanitize_records(rows);
    serde_json::to_value(AggregatedVisitorData::compute(sanitized.records)).unwrap()
}

#[test]
fn test_single_week_contract() {
    let rows = (15..=21).map(|d| raw(&format!("2025-12-{}", d), 100.0)).collect();
    let value = aggregate(rows);

    let weekly = value["weekly"].as_array().unwrap();
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0]["week_label"], "W51");
    assert_eq!(weekly[0]["week_start"], "2025-12-15");
    assert_eq!(weekly[0]["week_end"], "2025-12-21");
    assert_eq!(weekly[0]["visitors"], 700);
    assert_eq!(weekly[0]["pageviews"], 2100);
    assert_eq!(weekly[0]["bounceRate"], 40.0);
    assert!(weekly[0].get("visitors_change").is_none());

    let monthly = value["monthly"].as_array().unwrap();
    assert_eq!(monthly.len(), 1);
    assert_eq!(monthly[0]["month"], "2025-12");
    assert_eq!(monthly[0]["weeks"].as_array().unwrap().len(), 1);

    assert_eq!(value["summary"]["total_visitors"], 700);
    assert_eq!(value["summary"]["date_range"]["start"], "2025-12-15");
    assert_eq!(value["summary"]["date_range"]["end"], "2025-12-21");
    assert_eq!(value["daily"][0]["date"], "2025-12-21");
}

#[test]
fn test_dirty_input_is_cleaned_before_aggregation() {
    let mut rows = vec![
        raw("2025-12-01", 100.0),
        raw("2025-12-01", 5000.0),
        raw("yesterday", 1.0),
        raw("20251202", 50.0),
    ];
    let mut negative = raw("2025-12-03", -10.0);
    negative.bounce_rate = Some(f64::NAN);
    rows.push(negative);

    let value = aggregate(rows);

    // Duplicate keeps first, bad date dropped, compact date accepted
    assert_eq!(value["daily"].as_array().unwrap().len(), 3);
    assert_eq!(value["summary"]["total_visitors"], 150);
    assert_eq!(value["summary"]["date_range"]["start"], "2025-12-01");
    assert_eq!(value["summary"]["date_range"]["end"], "2025-12-03");
}

#[test]
fn test_month_change_through_contract() {
    let value = aggregate(vec![raw("2025-11-10", 1000.0), raw("2025-12-10", 1200.0)]);

    let monthly = value["monthly"].as_array().unwrap();
    assert_eq!(monthly[0]["month"], "2025-12");
    assert_eq!(monthly[0]["month_label"], "Dec 2025");
    let change = monthly[0]["visitors_change"].as_f64().unwrap();
    assert!((change - 20.0).abs() < 1e-9);
    assert!(monthly[1].get("visitors_change").is_none());
}

#[test]
fn test_empty_contract() {
    let value = aggregate(Vec::new());
    assert_eq!(value["daily"], serde_json::json!([]));
    assert_eq!(value["weekly"], serde_json::json!([]));
    assert_eq!(value["monthly"], serde_json::json!([]));
    assert_eq!(value["summary"]["total_visitors"], 0);
    assert_eq!(value["summary"]["avg_bounce_rate"], 0.0);
    assert_eq!(value["summary"]["date_range"]["start"], "");
}
