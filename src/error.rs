use thiserror::Error;

/// Rejections raised before any mutation takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required.")]
    MissingField { field: &'static str },
    #[error("Invalid {field}: '{value}'. Use HH:MM.")]
    InvalidTime { field: &'static str, value: String },
    #[error("Invalid date '{value}'. Use DD/MM/YYYY.")]
    InvalidDate { value: String },
    #[error("Invalid month {month}/{year}.")]
    InvalidMonth { month: u32, year: i32 },
    #[error("End time ({end}) must be after start time ({start}).")]
    InvertedRange { start: String, end: String },
    #[error("Describe the custom role when selecting '{role}'.")]
    MissingCustomRole { role: String },
    #[error("Client '{id}' is not available for this employee.")]
    UnknownClient { id: String },
    #[error("Role '{id}' is not available for this employee.")]
    UnknownRole { id: String },
    #[error("Provide both start and end time, or leave both empty.")]
    PartialTimeRange,
    #[error("Select at least one day.")]
    EmptySelection,
    #[error("An active entry named '{name}' already exists.")]
    DuplicateName { name: String },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum TimesheetError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Time record '{id}' no longer exists.")]
    RecordNotFound { id: String },
    #[error("Employee '{id}' was not found.")]
    EmployeeNotFound { id: String },
    #[error("{kind} '{id}' was not found.")]
    ReferenceNotFound { kind: &'static str, id: String },
    #[error("Nothing is being edited.")]
    NotEditing,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T, E = TimesheetError> = std::result::Result<T, E>;
