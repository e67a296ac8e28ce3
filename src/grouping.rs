use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use crate::dates::{MonthWindow, parse_record_date};
use crate::duration::{format_daily_total, parse_clock, sum_minutes};
use crate::models::TimeRecord;

#[derive(Debug, Clone)]
pub struct TimesheetDay {
    pub date: NaiveDate,
    pub label: String,
    pub records: Vec<TimeRecord>,
    pub total_minutes: i64,
    pub total_label: String,
}

impl TimesheetDay {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Timesheet {
    pub window: MonthWindow,
    pub days: Vec<TimesheetDay>,
    pub total_minutes: i64,
}

impl Timesheet {
    pub fn day(&self, date: NaiveDate) -> Option<&TimesheetDay> {
        self.days.iter().find(|day| day.date == date)
    }

    pub fn record_count(&self) -> usize {
        self.days.iter().map(|day| day.records.len()).sum()
    }
}

pub fn records_in_month(records: &[TimeRecord], month: u32, year: i32) -> Vec<TimeRecord> {
    records
        .iter()
        .filter(|record| match parse_record_date(&record.date) {
            Some(date) => date.month() == month && date.year() == year,
            None => {
                tracing::warn!(record_id = %record.id, date = %record.date, "Skipping record with unparsable date");
                false
            }
        })
        .cloned()
        .collect()
}

/// Groups by the exact date string; each day is ordered by start time.
pub fn group_by_date(records: &[TimeRecord]) -> HashMap<String, Vec<TimeRecord>> {
    let mut grouped: HashMap<String, Vec<TimeRecord>> = HashMap::new();
    for record in records {
        grouped
            .entry(record.date.clone())
            .or_default()
            .push(record.clone());
    }

    for day in grouped.values_mut() {
        sort_by_start(day);
    }

    grouped
}

fn group_by_day(records: &[TimeRecord]) -> HashMap<NaiveDate, Vec<TimeRecord>> {
    let mut grouped: HashMap<NaiveDate, Vec<TimeRecord>> = HashMap::new();
    for record in records {
        if let Some(date) = parse_record_date(&record.date) {
            grouped.entry(date).or_default().push(record.clone());
        }
    }

    for day in grouped.values_mut() {
        sort_by_start(day);
    }

    grouped
}

pub fn sort_by_start(records: &mut [TimeRecord]) {
    records.sort_by(|a, b| {
        let left = parse_clock(&a.start_time);
        let right = parse_clock(&b.start_time);
        match (left, right) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.start_time.cmp(&b.start_time),
        }
    });
}

/// Day-grouped month view. Every calendar day is present, most recent first,
/// including days without records.
/// Days are matched on the parsed date, so `2024-04-05` and `5/4/2024` land
/// on the same day as `05/04/2024`.
pub fn build_timesheet(records: &[TimeRecord], window: MonthWindow) -> Timesheet {
    let in_month = records_in_month(records, window.month(), window.year());
    let mut grouped = group_by_day(&in_month);

    let days: Vec<TimesheetDay> = window
        .days()
        .into_iter()
        .map(|descriptor| {
            let records = grouped.remove(&descriptor.date).unwrap_or_default();
            let total_minutes = sum_minutes(&records);
            let total_label = format_daily_total(&records);
            TimesheetDay {
                date: descriptor.date,
                label: descriptor.label,
                records,
                total_minutes,
                total_label,
            }
        })
        .collect();

    let total_minutes = days.iter().map(|day| day.total_minutes).sum();
    tracing::debug!(month = %window.label(), total_minutes, "Built timesheet");

    Timesheet {
        window,
        days,
        total_minutes,
    }
}
