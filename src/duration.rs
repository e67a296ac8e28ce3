use chrono::NaiveTime;

use crate::models::TimeRecord;

pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Whole minutes from `start` to `end` on the same day. Unparsable input and
/// non-increasing ranges yield 0 so totals stay well defined.
pub fn minutes_between(start: &str, end: &str) -> i64 {
    match (parse_clock(start), parse_clock(end)) {
        (Some(start), Some(end)) if end > start => (end - start).num_minutes(),
        _ => 0,
    }
}

/// Duration derived from the record's clock strings; open sessions count as 0.
pub fn record_minutes(record: &TimeRecord) -> i64 {
    record
        .end_time
        .as_deref()
        .map(|end| minutes_between(&record.start_time, end))
        .unwrap_or(0)
}

/// Open sessions have no total yet.
pub fn recompute_total(record: &mut TimeRecord) {
    record.total_work_time = match record.end_time {
        Some(_) => Some(record_minutes(record)),
        None => None,
    };
}

/// Stored total when present, otherwise derived from the clock strings.
pub fn effective_minutes(record: &TimeRecord) -> i64 {
    record
        .total_work_time
        .unwrap_or_else(|| record_minutes(record))
}

pub fn sum_minutes<'a>(records: impl IntoIterator<Item = &'a TimeRecord>) -> i64 {
    records.into_iter().map(effective_minutes).sum()
}

/// "2h 5m", "1h", "45m", "0m".
pub fn format_minutes(minutes: i64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if rest > 0 || hours == 0 {
        parts.push(format!("{rest}m"));
    }
    parts.join(" ")
}

/// Badge shown next to a day header; empty when the day adds up to nothing.
pub fn format_daily_total(records: &[TimeRecord]) -> String {
    let total = sum_minutes(records);
    if total <= 0 {
        return String::new();
    }
    format!("[Total: {}]", format_minutes(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STATUS_MANUAL;
    use serde_json::Map;

    fn record(start: &str, end: Option<&str>, total: Option<i64>) -> TimeRecord {
        TimeRecord {
            id: "REC-1".to_string(),
            user_id: "EMP001".to_string(),
            date: "20/04/2024".to_string(),
            start_time: start.to_string(),
            end_time: end.map(str::to_string),
            total_work_time: total,
            client_id: None,
            funcao_id: None,
            status: STATUS_MANUAL.to_string(),
            remark: None,
            used_entry_tolerance: false,
            used_exit_tolerance: false,
            extra: Map::new(),
        }
    }

    #[test]
    fn minutes_between_valid_range() {
        assert_eq!(minutes_between("08:00", "12:30"), 270);
        assert_eq!(minutes_between("8:05", "08:06"), 1);
    }

    #[test]
    fn minutes_between_rejects_inverted_and_garbage() {
        assert_eq!(minutes_between("17:00", "08:00"), 0);
        assert_eq!(minutes_between("08:00", "08:00"), 0);
        assert_eq!(minutes_between("soon", "08:00"), 0);
        assert_eq!(minutes_between("08:00", "25:00"), 0);
    }

    #[test]
    fn recompute_total_is_idempotent() {
        let mut first = record("09:15", Some("17:45"), Some(3));
        recompute_total(&mut first);
        let mut second = first.clone();
        recompute_total(&mut second);
        assert_eq!(first.total_work_time, Some(510));
        assert_eq!(first, second);
    }

    #[test]
    fn open_record_has_no_total() {
        let mut open = record("08:00", None, Some(30));
        recompute_total(&mut open);
        assert_eq!(open.total_work_time, None);
        assert_eq!(effective_minutes(&open), 0);
    }

    #[test]
    fn effective_minutes_falls_back_to_clock_strings() {
        assert_eq!(effective_minutes(&record("08:00", Some("09:00"), None)), 60);
        assert_eq!(effective_minutes(&record("08:00", Some("09:00"), Some(45))), 45);
        assert_eq!(effective_minutes(&record("08:00", None, None)), 0);
    }

    #[test]
    fn daily_total_badge_table() {
        let cases = [
            (0, ""),
            (65, "[Total: 1h 5m]"),
            (60, "[Total: 1h]"),
            (45, "[Total: 45m]"),
            (125, "[Total: 2h 5m]"),
        ];
        for (minutes, expected) in cases {
            let records = vec![record("08:00", Some("08:00"), Some(minutes))];
            assert_eq!(format_daily_total(&records), expected, "{minutes} minutes");
        }
    }

    #[test]
    fn daily_total_sums_the_whole_day() {
        let records = vec![
            record("08:00", Some("12:00"), None),
            record("13:00", Some("14:05"), None),
        ];
        assert_eq!(format_daily_total(&records), "[Total: 5h 5m]");
        assert_eq!(format_daily_total(&[]), "");
    }

    #[test]
    fn format_minutes_zero() {
        assert_eq!(format_minutes(0), "0m");
    }
}
