use chrono::{Datelike, Local, NaiveDate};

use crate::error::ValidationError;

pub const RECORD_DATE_FORMAT: &str = "%d/%m/%Y";

/// One calendar day of a timesheet month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayDescriptor {
    pub date: NaiveDate,
    pub label: String,
}

/// A selected (month, year) window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    month: u32,
    year: i32,
}

impl MonthWindow {
    pub fn new(month: u32, year: i32) -> Result<Self, ValidationError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ValidationError::InvalidMonth { month, year });
        }
        Ok(Self { month, year })
    }

    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            month: today.month(),
            year: today.year(),
        }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            year: date.year(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.year() == self.year
    }

    pub fn label(&self) -> String {
        format!("{:02}/{}", self.month, self.year)
    }

    pub fn days(&self) -> Vec<DayDescriptor> {
        days_in_month(self.month, self.year)
    }
}

/// Parses a stored record date. Accepts the canonical DD/MM/YYYY form and the
/// ISO form produced by date inputs.
pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, RECORD_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    parse_record_date(value).ok_or_else(|| ValidationError::InvalidDate {
        value: value.to_string(),
    })
}

pub fn format_record_date(date: NaiveDate) -> String {
    date.format(RECORD_DATE_FORMAT).to_string()
}

/// Every day of the month, most recent first. Empty for an invalid month.
pub fn days_in_month(month: u32, year: i32) -> Vec<DayDescriptor> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };

    let mut days = Vec::with_capacity(31);
    let mut current = first;
    while current.month() == month {
        days.push(DayDescriptor {
            date: current,
            label: format_record_date(current),
        });
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    days.reverse();
    days
}
