use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::error::ValidationError;
use crate::models::TimeRecord;
use crate::reconcile::{BulkDraft, RecordDraft};

/// Which form is open. At most one at a time; opening a form replaces
/// whatever was open before.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditorState {
    #[default]
    Idle,
    InlineEdit {
        record_id: String,
        draft: RecordDraft,
    },
    InlineAdd {
        date: NaiveDate,
        draft: RecordDraft,
    },
    ModalAdd {
        draft: RecordDraft,
    },
    BulkEdit {
        dates: BTreeSet<NaiveDate>,
        draft: BulkDraft,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Idle,
    InlineEdit,
    InlineAdd,
    ModalAdd,
    BulkEdit,
}

#[derive(Debug, Clone, Default)]
pub struct Editor {
    state: EditorState,
    selection: BTreeSet<NaiveDate>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn mode(&self) -> EditorMode {
        match self.state {
            EditorState::Idle => EditorMode::Idle,
            EditorState::InlineEdit { .. } => EditorMode::InlineEdit,
            EditorState::InlineAdd { .. } => EditorMode::InlineAdd,
            EditorState::ModalAdd { .. } => EditorMode::ModalAdd,
            EditorState::BulkEdit { .. } => EditorMode::BulkEdit,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == EditorState::Idle
    }

    pub fn begin_inline_edit(&mut self, record: &TimeRecord) {
        self.transition(EditorState::InlineEdit {
            record_id: record.id.clone(),
            draft: RecordDraft::from_record(record),
        });
    }

    pub fn begin_inline_add(&mut self, date: NaiveDate, draft: RecordDraft) {
        self.transition(EditorState::InlineAdd { date, draft });
    }

    pub fn begin_modal_add(&mut self, draft: RecordDraft) {
        self.transition(EditorState::ModalAdd { draft });
    }

    /// Opens the bulk form over a snapshot of the current day selection.
    pub fn begin_bulk_edit(&mut self) -> Result<(), ValidationError> {
        if self.selection.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        let dates = self.selection.clone();
        self.transition(EditorState::BulkEdit {
            dates,
            draft: BulkDraft::default(),
        });
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.transition(EditorState::Idle);
    }

    /// Returns to idle after a successful submit. Bulk submits also clear the
    /// day selection.
    pub fn complete(&mut self) {
        if matches!(self.state, EditorState::BulkEdit { .. }) {
            self.selection.clear();
        }
        self.transition(EditorState::Idle);
    }

    pub fn draft_mut(&mut self) -> Option<&mut RecordDraft> {
        match &mut self.state {
            EditorState::InlineEdit { draft, .. }
            | EditorState::InlineAdd { draft, .. }
            | EditorState::ModalAdd { draft } => Some(draft),
            EditorState::Idle | EditorState::BulkEdit { .. } => None,
        }
    }

    pub fn bulk_draft_mut(&mut self) -> Option<&mut BulkDraft> {
        match &mut self.state {
            EditorState::BulkEdit { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn selection(&self) -> &BTreeSet<NaiveDate> {
        &self.selection
    }

    /// Flips a day checkbox; returns whether the day is now selected.
    pub fn toggle_day(&mut self, date: NaiveDate) -> bool {
        if self.selection.remove(&date) {
            false
        } else {
            self.selection.insert(date);
            true
        }
    }

    pub fn select_days(&mut self, dates: impl IntoIterator<Item = NaiveDate>) {
        self.selection.extend(dates);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn transition(&mut self, next: EditorState) {
        if self.state != EditorState::Idle && next != EditorState::Idle {
            tracing::debug!(from = ?self.mode(), "Discarding open form");
        }
        self.state = next;
    }
}
