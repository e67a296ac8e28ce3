use chrono::{NaiveDate, NaiveTime};
use serde_json::Map;
use std::collections::BTreeSet;

use crate::catalog::Catalog;
use crate::dates::{format_record_date, parse_date, parse_record_date};
use crate::duration::{parse_clock, recompute_total};
use crate::error::{TimesheetError, ValidationError};
use crate::models::{
    Employee, Remark, STATUS_CLOCKED, STATUS_IN_PROGRESS, STATUS_MANUAL, TimeRecord,
};

/// Working copy behind the inline edit, inline add and modal add forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub client_id: String,
    pub funcao_id: String,
    pub note: String,
    pub custom_role: String,
}

impl RecordDraft {
    pub fn from_record(record: &TimeRecord) -> Self {
        Self {
            date: record.date.clone(),
            start_time: record.start_time.clone(),
            end_time: record.end_time.clone().unwrap_or_default(),
            client_id: record.client_id.clone().unwrap_or_default(),
            funcao_id: record.funcao_id.clone().unwrap_or_default(),
            note: record.note().unwrap_or_default().to_string(),
            custom_role: record.custom_role().unwrap_or_default().to_string(),
        }
    }

    /// Blank draft preselecting the employee's default client and role when
    /// those are still selectable.
    pub fn seeded(date: Option<NaiveDate>, employee: &Employee, catalog: &Catalog) -> Self {
        let client_id = employee
            .default_client_id
            .as_deref()
            .filter(|id| catalog.selectable_client(id).is_some())
            .unwrap_or_default()
            .to_string();
        let funcao_id = employee
            .default_funcao_id
            .as_deref()
            .filter(|id| catalog.selectable_role(id).is_some())
            .unwrap_or_default()
            .to_string();

        Self {
            date: date.map(format_record_date).unwrap_or_default(),
            client_id,
            funcao_id,
            ..Self::default()
        }
    }

    /// Whether the form shows the custom role field instead of the comment.
    pub fn wants_custom_role(&self, catalog: &Catalog) -> bool {
        catalog.is_custom_role(self.funcao_id.trim())
    }
}

/// A draft that passed every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEntry {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub client_id: String,
    pub funcao_id: String,
    pub remark: Option<Remark>,
}

pub fn validate_draft(draft: &RecordDraft, catalog: &Catalog) -> Result<ValidEntry, ValidationError> {
    let date = required(&draft.date, "Date")?;
    let start_raw = required(&draft.start_time, "Start time")?;
    let end_raw = required(&draft.end_time, "End time")?;
    let client_id = required(&draft.client_id, "Client")?;
    let funcao_id = required(&draft.funcao_id, "Role")?;

    let date = parse_date(date)?;
    let (start, end) = validate_range(start_raw, end_raw)?;

    if catalog.selectable_client(client_id).is_none() {
        return Err(ValidationError::UnknownClient {
            id: client_id.to_string(),
        });
    }
    let role = catalog
        .selectable_role(funcao_id)
        .ok_or_else(|| ValidationError::UnknownRole {
            id: funcao_id.to_string(),
        })?;

    let remark = if role.is_custom_role() {
        let custom = draft.custom_role.trim();
        if custom.is_empty() {
            return Err(ValidationError::MissingCustomRole {
                role: role.name.clone(),
            });
        }
        Some(Remark::CustomRole(custom.to_string()))
    } else {
        non_empty(&draft.note).map(Remark::Note)
    };

    Ok(ValidEntry {
        date,
        start,
        end,
        client_id: client_id.to_string(),
        funcao_id: funcao_id.to_string(),
        remark,
    })
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(value)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn validate_range(start: &str, end: &str) -> Result<(NaiveTime, NaiveTime), ValidationError> {
    let start_time = parse_clock(start).ok_or_else(|| ValidationError::InvalidTime {
        field: "Start time",
        value: start.to_string(),
    })?;
    let end_time = parse_clock(end).ok_or_else(|| ValidationError::InvalidTime {
        field: "End time",
        value: end.to_string(),
    })?;
    if end_time <= start_time {
        return Err(ValidationError::InvertedRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok((start_time, end_time))
}

fn clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn is_clock_status(status: &str) -> bool {
    status == STATUS_CLOCKED || status == STATUS_IN_PROGRESS
}

pub fn create_record(entry: &ValidEntry, id: String, user_id: &str) -> TimeRecord {
    let mut record = TimeRecord {
        id,
        user_id: user_id.to_string(),
        date: format_record_date(entry.date),
        start_time: clock(entry.start),
        end_time: Some(clock(entry.end)),
        total_work_time: None,
        client_id: Some(entry.client_id.clone()),
        funcao_id: Some(entry.funcao_id.clone()),
        status: STATUS_MANUAL.to_string(),
        remark: entry.remark.clone(),
        used_entry_tolerance: false,
        used_exit_tolerance: false,
        extra: Map::new(),
    };
    recompute_total(&mut record);
    record
}

pub fn insert_record(records: &[TimeRecord], record: TimeRecord) -> Vec<TimeRecord> {
    let mut next = records.to_vec();
    next.push(record);
    next
}

/// Merges `entry` into the record with `id`. Records from the clock flow keep
/// their status; everything else becomes manual.
pub fn update_record(
    records: &[TimeRecord],
    id: &str,
    entry: &ValidEntry,
) -> Result<Vec<TimeRecord>, TimesheetError> {
    let mut next = records.to_vec();
    let record = next
        .iter_mut()
        .find(|record| record.id == id)
        .ok_or_else(|| TimesheetError::RecordNotFound { id: id.to_string() })?;

    record.date = format_record_date(entry.date);
    record.start_time = clock(entry.start);
    record.end_time = Some(clock(entry.end));
    record.client_id = Some(entry.client_id.clone());
    record.funcao_id = Some(entry.funcao_id.clone());
    record.remark = entry.remark.clone();
    if !is_clock_status(&record.status) {
        record.status = STATUS_MANUAL.to_string();
    }
    recompute_total(record);

    Ok(next)
}

pub fn remove_record(records: &[TimeRecord], id: &str) -> Result<Vec<TimeRecord>, TimesheetError> {
    if !records.iter().any(|record| record.id == id) {
        return Err(TimesheetError::RecordNotFound { id: id.to_string() });
    }
    Ok(records
        .iter()
        .filter(|record| record.id != id)
        .cloned()
        .collect())
}

/// Bulk edit form. Every field is an optional override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDraft {
    pub start_time: String,
    pub end_time: String,
    pub client_id: String,
    pub funcao_id: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOverrides {
    pub range: Option<(NaiveTime, NaiveTime)>,
    pub client_id: Option<String>,
    pub funcao_id: Option<String>,
    pub comment: Option<String>,
}

impl BulkOverrides {
    /// Empty days only get a record when the override fully describes one.
    pub fn can_synthesize(&self) -> bool {
        self.range.is_some() && self.client_id.is_some() && self.funcao_id.is_some()
    }
}

pub fn validate_bulk(
    draft: &BulkDraft,
    selected: &BTreeSet<NaiveDate>,
    catalog: &Catalog,
) -> Result<BulkOverrides, ValidationError> {
    if selected.is_empty() {
        return Err(ValidationError::EmptySelection);
    }

    let range = match (non_empty(&draft.start_time), non_empty(&draft.end_time)) {
        (Some(start), Some(end)) => Some(validate_range(&start, &end)?),
        (None, None) => None,
        _ => return Err(ValidationError::PartialTimeRange),
    };

    let client_id = non_empty(&draft.client_id);
    if let Some(id) = client_id.as_deref() {
        if catalog.selectable_client(id).is_none() {
            return Err(ValidationError::UnknownClient { id: id.to_string() });
        }
    }

    let funcao_id = non_empty(&draft.funcao_id);
    let comment = non_empty(&draft.comment);
    if let Some(id) = funcao_id.as_deref() {
        let role = catalog
            .selectable_role(id)
            .ok_or_else(|| ValidationError::UnknownRole { id: id.to_string() })?;
        if role.is_custom_role() && comment.is_none() {
            return Err(ValidationError::MissingCustomRole {
                role: role.name.clone(),
            });
        }
    }

    Ok(BulkOverrides {
        range,
        client_id,
        funcao_id,
        comment,
    })
}

#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub records: Vec<TimeRecord>,
    pub updated: usize,
    pub created: usize,
    pub skipped: Vec<NaiveDate>,
}

/// Applies the overrides to every record on each selected day, and fills
/// selected empty days with one record when the overrides allow it.
pub fn apply_bulk(
    records: &[TimeRecord],
    user_id: &str,
    selected: &BTreeSet<NaiveDate>,
    overrides: &BulkOverrides,
    catalog: &Catalog,
    mut next_id: impl FnMut() -> String,
) -> BulkOutcome {
    let mut outcome = BulkOutcome {
        records: records.to_vec(),
        ..BulkOutcome::default()
    };

    for &day in selected {
        let mut touched = 0;
        for record in outcome
            .records
            .iter_mut()
            .filter(|record| parse_record_date(&record.date) == Some(day))
        {
            override_record(record, overrides, catalog);
            touched += 1;
        }
        outcome.updated += touched;

        if touched > 0 {
            continue;
        }

        match (&overrides.range, &overrides.client_id, &overrides.funcao_id) {
            (Some((start, end)), Some(client_id), Some(funcao_id)) => {
                let entry = ValidEntry {
                    date: day,
                    start: *start,
                    end: *end,
                    client_id: client_id.clone(),
                    funcao_id: funcao_id.clone(),
                    remark: overrides
                        .comment
                        .clone()
                        .map(|text| classify(text, catalog.is_custom_role(funcao_id))),
                };
                outcome
                    .records
                    .push(create_record(&entry, next_id(), user_id));
                outcome.created += 1;
            }
            _ => outcome.skipped.push(day),
        }
    }

    outcome
}

fn override_record(record: &mut TimeRecord, overrides: &BulkOverrides, catalog: &Catalog) {
    if let Some(date) = parse_record_date(&record.date) {
        record.date = format_record_date(date);
    }
    if let Some((start, end)) = overrides.range {
        record.start_time = clock(start);
        record.end_time = Some(clock(end));
    }
    if let Some(client_id) = &overrides.client_id {
        record.client_id = Some(client_id.clone());
    }
    if let Some(funcao_id) = &overrides.funcao_id {
        record.funcao_id = Some(funcao_id.clone());
    }

    let custom = record
        .funcao_id
        .as_deref()
        .map(|id| catalog.is_custom_role(id))
        .unwrap_or(false);
    let text = overrides
        .comment
        .clone()
        .or_else(|| record.comment().map(str::to_string));
    record.remark = text.map(|text| classify(text, custom));

    recompute_total(record);
}

fn classify(text: String, custom: bool) -> Remark {
    if custom {
        Remark::CustomRole(text)
    } else {
        Remark::Note(text)
    }
}
