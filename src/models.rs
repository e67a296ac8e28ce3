use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Role name that turns the record comment into a custom role description.
pub const CUSTOM_ROLE_NAME: &str = "Outra";

pub const STATUS_MANUAL: &str = "Manual";
pub const STATUS_CLOCKED: &str = "Completo (Cron.)";
pub const STATUS_IN_PROGRESS: &str = "Em Andamento";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Client {
    pub fn is_active(&self) -> bool {
        self.status == EntityStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Funcao {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Funcao {
    pub fn is_active(&self) -> bool {
        self.status == EntityStatus::Active
    }

    pub fn is_custom_role(&self) -> bool {
        self.name.trim().eq_ignore_ascii_case(CUSTOM_ROLE_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub assigned_client_ids: Vec<String>,
    #[serde(default)]
    pub assigned_funcao_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_funcao_id: Option<String>,
    #[serde(default)]
    pub time_records: Vec<StoredRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `comment` column carries one of two meanings depending on the role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remark {
    Note(String),
    CustomRole(String),
}

impl Remark {
    pub fn text(&self) -> &str {
        match self {
            Remark::Note(text) | Remark::CustomRole(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeRecord {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub total_work_time: Option<i64>,
    pub client_id: Option<String>,
    pub funcao_id: Option<String>,
    pub status: String,
    pub remark: Option<Remark>,
    pub used_entry_tolerance: bool,
    pub used_exit_tolerance: bool,
    /// Stored fields this crate does not interpret, written back unchanged.
    pub extra: Map<String, Value>,
}

impl TimeRecord {
    pub fn comment(&self) -> Option<&str> {
        self.remark.as_ref().map(Remark::text)
    }

    pub fn custom_role(&self) -> Option<&str> {
        match &self.remark {
            Some(Remark::CustomRole(text)) => Some(text),
            _ => None,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match &self.remark {
            Some(Remark::Note(text)) => Some(text),
            _ => None,
        }
    }
}

/// Row shape of a time record inside the persisted employee collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: String,
    pub date: String,
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_work_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funcao_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub used_entry_tolerance: bool,
    #[serde(default)]
    pub used_exit_tolerance: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredRecord {
    /// Splits `comment` into a note or a custom role description by resolving
    /// the record's role against `roles`.
    pub fn into_record(self, roles: &[Funcao]) -> TimeRecord {
        let custom = self
            .funcao_id
            .as_deref()
            .and_then(|id| roles.iter().find(|role| role.id == id))
            .map(Funcao::is_custom_role)
            .unwrap_or(false);
        let remark = self
            .comment
            .filter(|text| !text.trim().is_empty())
            .map(|text| {
                if custom {
                    Remark::CustomRole(text)
                } else {
                    Remark::Note(text)
                }
            });

        TimeRecord {
            id: self.id,
            user_id: self.user_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            total_work_time: self.total_work_time,
            client_id: self.client_id,
            funcao_id: self.funcao_id,
            status: self.status,
            remark,
            used_entry_tolerance: self.used_entry_tolerance,
            used_exit_tolerance: self.used_exit_tolerance,
            extra: self.extra,
        }
    }
}

impl From<&TimeRecord> for StoredRecord {
    fn from(record: &TimeRecord) -> Self {
        StoredRecord {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            date: record.date.clone(),
            start_time: record.start_time.clone(),
            end_time: record.end_time.clone(),
            total_work_time: record.total_work_time,
            client_id: record.client_id.clone(),
            funcao_id: record.funcao_id.clone(),
            status: record.status.clone(),
            comment: record.comment().map(str::to_string),
            used_entry_tolerance: record.used_entry_tolerance,
            used_exit_tolerance: record.used_exit_tolerance,
            extra: record.extra.clone(),
        }
    }
}

// Older rows were written with numeric ids.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: &str, name: &str) -> Funcao {
        Funcao {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            status: EntityStatus::Active,
            extra: Map::new(),
        }
    }

    #[test]
    fn custom_role_name_is_case_insensitive() {
        assert!(role("FUNC001", "Outra").is_custom_role());
        assert!(role("FUNC001", " outra ").is_custom_role());
        assert!(!role("FUNC002", "Outras tarefas").is_custom_role());
    }

    #[test]
    fn comment_becomes_custom_role_for_outra() {
        let roles = vec![role("FUNC001", "Desenvolvimento"), role("FUNC009", "Outra")];
        let row: StoredRecord = serde_json::from_value(serde_json::json!({
            "id": "REC-1",
            "userId": "EMP001",
            "date": "20/04/2024",
            "startTime": "08:00",
            "endTime": "12:00",
            "funcaoId": "FUNC009",
            "status": "Manual",
            "comment": "Auditoria"
        }))
        .unwrap();

        let record = row.into_record(&roles);
        assert_eq!(record.remark, Some(Remark::CustomRole("Auditoria".to_string())));
        assert_eq!(record.note(), None);
        assert!(!record.used_entry_tolerance);
    }

    #[test]
    fn comment_stays_a_note_for_regular_roles() {
        let roles = vec![role("FUNC001", "Desenvolvimento")];
        let row = StoredRecord {
            id: "REC-2".to_string(),
            user_id: "EMP001".to_string(),
            date: "20/04/2024".to_string(),
            start_time: "13:00".to_string(),
            end_time: Some("17:00".to_string()),
            total_work_time: None,
            client_id: None,
            funcao_id: Some("FUNC001".to_string()),
            status: STATUS_MANUAL.to_string(),
            comment: Some("Code review".to_string()),
            used_entry_tolerance: false,
            used_exit_tolerance: false,
            extra: Map::new(),
        };

        let record = row.clone().into_record(&roles);
        assert_eq!(record.note(), Some("Code review"));
        assert_eq!(StoredRecord::from(&record), row);
    }

    #[test]
    fn numeric_ids_and_unknown_fields_survive() {
        let employee: Employee = serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Ana",
            "email": "ana@example.com",
            "timeRecords": []
        }))
        .unwrap();
        assert_eq!(employee.id, "7");
        assert_eq!(employee.extra.get("email"), Some(&Value::from("ana@example.com")));

        let encoded = serde_json::to_value(&employee).unwrap();
        assert_eq!(encoded["email"], "ana@example.com");
    }
}
