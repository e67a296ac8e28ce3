use chrono::Utc;
use uuid::Uuid;

pub const CLIENT_PREFIX: &str = "CLI";
pub const FUNCAO_PREFIX: &str = "FUNC";
pub const EMPLOYEE_PREFIX: &str = "EMP";

/// Next sequential code for `prefix`: highest numeric suffix among
/// `existing` plus one, zero-padded to three digits.
pub fn next_code<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{:03}", highest + 1)
}

/// Time records are created from several sessions, so ids mix a timestamp
/// with a random token.
pub fn new_record_id() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("REC-{}-{}", Utc::now().timestamp_millis(), &token[..8])
}
