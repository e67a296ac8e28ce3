//! Monthly timesheet engine: groups an employee's time records by day,
//! derives durations and daily totals, and applies inline, modal and bulk
//! edits before committing the full record list back to a key-value store.

pub mod admin;
pub mod catalog;
pub mod config;
pub mod dates;
pub mod duration;
pub mod editor;
pub mod error;
pub mod grouping;
pub mod ids;
pub mod models;
pub mod persistence;
pub mod reconcile;
pub mod rollups;
pub mod session;
pub mod storage;

pub use error::{Result, StorageError, TimesheetError, ValidationError};
pub use session::{Session, SessionUser, Submitted};
