use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::duration::effective_minutes;
use crate::grouping::Timesheet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodRollup {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: usize,
    pub minutes: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MonthSummary {
    pub total_minutes: i64,
    pub days_worked: usize,
    pub record_count: usize,
    pub by_client: Vec<Bucket>,
    pub by_role: Vec<Bucket>,
    pub weekly: Vec<PeriodRollup>,
}

pub fn summarize(sheet: &Timesheet, catalog: &Catalog) -> MonthSummary {
    let mut clients: HashMap<String, i64> = HashMap::new();
    let mut roles: HashMap<String, i64> = HashMap::new();
    let mut record_count = 0;

    for record in sheet.days.iter().flat_map(|day| &day.records) {
        let minutes = effective_minutes(record);
        *clients
            .entry(catalog.client_name(record.client_id.as_deref()))
            .or_insert(0) += minutes;
        *roles.entry(catalog.role_label(record)).or_insert(0) += minutes;
        record_count += 1;
    }

    MonthSummary {
        total_minutes: sheet.total_minutes,
        days_worked: sheet.days.iter().filter(|day| !day.is_empty()).count(),
        record_count,
        by_client: into_buckets(clients),
        by_role: into_buckets(roles),
        weekly: build_weekly_rollups(sheet),
    }
}

fn into_buckets(totals: HashMap<String, i64>) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = totals
        .into_iter()
        .map(|(label, minutes)| Bucket { label, minutes })
        .collect();
    buckets.sort_by(|a, b| b.minutes.cmp(&a.minutes).then_with(|| a.label.cmp(&b.label)));
    buckets
}

/// Monday-based weeks, clipped to the month, in calendar order.
fn build_weekly_rollups(sheet: &Timesheet) -> Vec<PeriodRollup> {
    let mut rollups = Vec::new();
    let mut current_key: Option<NaiveDate> = None;
    let mut current_rollup: Option<PeriodRollup> = None;

    for day in sheet.days.iter().rev() {
        let key = start_of_week(day.date);
        if current_key.map(|value| value != key).unwrap_or(true) {
            if let Some(rollup) = current_rollup.take() {
                rollups.push(rollup);
            }
            current_key = Some(key);
            current_rollup = Some(PeriodRollup {
                label: String::new(),
                start: day.date,
                end: day.date,
                days: 0,
                minutes: 0,
            });
        }

        if let Some(rollup) = current_rollup.as_mut() {
            rollup.end = day.date;
            rollup.days += 1;
            rollup.minutes += day.total_minutes;
        }
    }

    if let Some(rollup) = current_rollup {
        rollups.push(rollup);
    }

    for rollup in &mut rollups {
        let week = rollup.start.iso_week();
        rollup.label = format!(
            "W{:02} {} ({} → {})",
            week.week(),
            week.year(),
            rollup.start.format("%d/%m"),
            rollup.end.format("%d/%m")
        );
    }

    rollups
}

fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}
