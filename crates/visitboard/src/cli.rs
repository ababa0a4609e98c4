//! Terminal output for the aggregate, compare and collect commands
//!
//! Tables via comfy-table; every formatter also has a JSON path.

use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use serde::Serialize;
use visitboard_core::analytics::{MonthlyBucket, PeriodComparison, Summary, WeeklyBucket};
use visitboard_core::{CollectionReport, DailyRecord, Origin};

// ============================================================================
// View selection
// ============================================================================

/// Which slice of the aggregate to print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum View {
    Daily,
    #[default]
    Weekly,
    Monthly,
    Summary,
}

// ============================================================================
// Tables
// ============================================================================

fn new_table(headers: &[&str], no_color: bool) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    if no_color {
        table.set_header(headers.to_vec());
    } else {
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }

    table
}

fn change_cell(change: Option<f64>, no_color: bool) -> Cell {
    let text = format_change(change);
    match change {
        Some(c) if !no_color && c > 0.0 => Cell::new(text).fg(Color::Green),
        Some(c) if !no_color && c < 0.0 => Cell::new(text).fg(Color::Red),
        _ => Cell::new(text),
    }
}

pub fn format_daily_table(daily: &[DailyRecord], no_color: bool) -> String {
    if daily.is_empty() {
        return "No daily data.".to_string();
    }

    let mut table = new_table(
        &["Date", "Visitors", "Pageviews", "Sessions", "New", "Bounce", "Avg time"],
        no_color,
    );

    for day in daily {
        let m = &day.metrics;
        table.add_row(Row::from(vec![
            day.date.format("%Y-%m-%d (%a)").to_string(),
            format_count(m.visitors),
            format_count(m.pageviews),
            format_count(m.sessions),
            format_count(m.new_users),
            format!("{:.1}%", m.bounce_rate),
            format_duration(m.avg_duration),
        ]));
    }

    table.to_string()
}

pub fn format_weekly_table(weeks: &[WeeklyBucket], no_color: bool) -> String {
    if weeks.is_empty() {
        return "No weekly data.".to_string();
    }

    let mut table = new_table(
        &["Week", "Range", "Days", "Visitors", "Δ", "Pageviews", "Δ", "Bounce", "Avg time"],
        no_color,
    );

    for week in weeks {
        let m = &week.metrics;
        table.add_row(vec![
            Cell::new(&week.week_label),
            Cell::new(format!(
                "{} ~ {}",
                week.week_start.format("%m/%d"),
                week.week_end.format("%m/%d")
            )),
            Cell::new(week.day_count),
            Cell::new(format_count(m.visitors)),
            change_cell(week.changes.visitors_change, no_color),
            Cell::new(format_count(m.pageviews)),
            change_cell(week.changes.pageviews_change, no_color),
            Cell::new(format!("{:.1}%", m.bounce_rate)),
            Cell::new(format_duration(m.avg_duration)),
        ]);
    }

    table.to_string()
}

pub fn format_monthly_table(months: &[MonthlyBucket], no_color: bool) -> String {
    if months.is_empty() {
        return "No monthly data.".to_string();
    }

    let mut table = new_table(
        &["Month", "Days", "Weeks", "Visitors", "Δ", "Sessions", "Δ", "Bounce"],
        no_color,
    );

    for month in months {
        let m = &month.metrics;
        table.add_row(vec![
            Cell::new(&month.month_label),
            Cell::new(month.day_count),
            Cell::new(month.weeks.len()),
            Cell::new(format_count(m.visitors)),
            change_cell(month.changes.visitors_change, no_color),
            Cell::new(format_count(m.sessions)),
            change_cell(month.changes.sessions_change, no_color),
            Cell::new(format!("{:.1}%", m.bounce_rate)),
        ]);
    }

    table.to_string()
}

pub fn format_summary(summary: &Summary, origin: Origin) -> String {
    if summary.date_range.is_empty() {
        return format!("No data available (origin: {}).", origin);
    }

    let mut lines = vec![];
    lines.push(format!(
        "Range:            {} ~ {}",
        summary.date_range.start, summary.date_range.end
    ));
    lines.push(format!("Origin:           {}", origin));
    lines.push(format!("Visitors:         {}", format_count(summary.total_visitors)));
    lines.push(format!("Pageviews:        {}", format_count(summary.total_pageviews)));
    lines.push(format!("Sessions:         {}", format_count(summary.total_sessions)));
    lines.push(format!("Avg bounce rate:  {:.1}%", summary.avg_bounce_rate));
    lines.push(format!(
        "Avg session:      {}",
        format_duration(summary.avg_session_duration)
    ));
    lines.join("\n")
}

pub fn format_comparison(cmp: &PeriodComparison, no_color: bool) -> String {
    let mut table = new_table(&["Metric", "Current", "Previous", "Change"], no_color);
    let (cur, prev, ch) = (&cmp.current, &cmp.previous, &cmp.changes);

    let rows: [(&str, String, String, f64); 6] = [
        ("Visitors", format_count(cur.visitors), format_count(prev.visitors), ch.visitors_percent),
        ("Pageviews", format_count(cur.pageviews), format_count(prev.pageviews), ch.pageviews_percent),
        ("Sessions", format_count(cur.sessions), format_count(prev.sessions), ch.sessions_percent),
        ("New users", format_count(cur.new_users), format_count(prev.new_users), ch.new_users_percent),
        (
            "Bounce rate",
            format!("{:.1}%", cur.bounce_rate),
            format!("{:.1}%", prev.bounce_rate),
            ch.bounce_rate_percent,
        ),
        (
            "Avg time",
            format_duration(cur.avg_duration),
            format_duration(prev.avg_duration),
            ch.avg_duration_percent,
        ),
    ];

    for (label, current, previous, change) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(current),
            Cell::new(previous),
            change_cell(Some(change), no_color),
        ]);
    }

    format!(
        "Current:  {} ~ {} ({} days with data)\nPrevious: {} ~ {} ({} days with data)\n{}",
        cur.start_date, cur.end_date, cur.day_count, prev.start_date, prev.end_date, prev.day_count, table
    )
}

pub fn format_collection_report(report: &CollectionReport) -> String {
    let mut lines = vec![format!(
        "Collection at {}: {}",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        if report.success { "ok" } else { "failed" }
    )];

    for (key, outcome) in &report.collections {
        let detail = match (&outcome.count, &outcome.error) {
            (_, Some(error)) => format!("error: {}", error),
            (Some(count), None) => format!("{} records", count),
            (None, None) => "-".to_string(),
        };
        lines.push(format!("  {:<18} {:<8} {}", key, outcome.status, detail));
    }

    lines.join("\n")
}

/// Pretty JSON, `{}` if serialization fails
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

// ============================================================================
// Utilities
// ============================================================================

fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 10_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn format_change(change: Option<f64>) -> String {
    match change {
        Some(c) if c > 0.0 => format!("+{:.1}%", c),
        Some(c) => format!("{:.1}%", c),
        None => "-".to_string(),
    }
}

/// Seconds as `Mm SSs`
fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}m {:02}s", total / 60, total % 60)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::collections::BTreeMap;
    use visitboard_core::analytics::DateRange;
    use visitboard_core::cache::CacheStatus;
    use visitboard_core::{AggregatedVisitorData, CollectionOutcome, TrafficMetrics};

    fn sample() -> AggregatedVisitorData {
        let start = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let daily = (0..21)
            .map(|i| {
                DailyRecord::new(
                    start + chrono::Duration::days(i),
                    TrafficMetrics {
                        visitors: 100 + i as u64,
                        pageviews: 300,
                        sessions: 120,
                        new_users: 50,
                        bounce_rate: 40.0,
                        avg_duration: 200.0,
                    },
                )
            })
            .collect();
        AggregatedVisitorData::compute(daily)
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(9_999), "9999");
        assert_eq!(format_count(12_345), "12.3K");
        assert_eq!(format_count(2_500_000), "2.5M");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(Some(20.0)), "+20.0%");
        assert_eq!(format_change(Some(-5.25)), "-5.2%");
        assert_eq!(format_change(Some(0.0)), "0.0%");
        assert_eq!(format_change(None), "-");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(200.0), "3m 20s");
        assert_eq!(format_duration(59.6), "1m 00s");
        assert_eq!(format_duration(-3.0), "0m 00s");
    }

    #[test]
    fn test_tables_render() {
        let data = sample();
        let weekly = format_weekly_table(&data.weekly, true);
        assert!(weekly.contains("W51"));
        assert!(weekly.contains("12/15 ~ 12/21"));

        let monthly = format_monthly_table(&data.monthly, true);
        assert!(monthly.contains("Dec 2025"));

        let daily = format_daily_table(&data.daily, true);
        assert!(daily.contains("2025-12-21 (Sun)"));
    }

    #[test]
    fn test_empty_tables() {
        assert_eq!(format_weekly_table(&[], true), "No weekly data.");
        assert_eq!(format_monthly_table(&[], false), "No monthly data.");
        assert_eq!(format_daily_table(&[], false), "No daily data.");
    }

    #[test]
    fn test_format_summary() {
        let data = sample();
        let text = format_summary(&data.summary, Origin::Live);
        assert!(text.contains("2025-12-01 ~ 2025-12-21"));
        assert!(text.contains("live"));

        let empty = Summary {
            date_range: DateRange::default(),
            ..Default::default()
        };
        assert_eq!(
            format_summary(&empty, Origin::Empty),
            "No data available (origin: empty)."
        );
    }

    #[test]
    fn test_format_collection_report() {
        let mut collections = BTreeMap::new();
        collections.insert(
            "daily_analytics".to_string(),
            CollectionOutcome {
                status: CacheStatus::Error,
                count: None,
                error: Some("quota exceeded".to_string()),
            },
        );
        let report = CollectionReport {
            timestamp: Utc.with_ymd_and_hms(2025, 12, 21, 3, 0, 0).unwrap(),
            success: false,
            collections,
        };

        let text = format_collection_report(&report);
        assert!(text.contains("failed"));
        assert!(text.contains("error: quota exceeded"));
    }

    #[test]
    fn test_to_json() {
        let data = sample();
        let json = to_json(&data.summary);
        assert!(json.contains("\"total_visitors\""));
    }
}
