use chrono::NaiveDate;

use crate::catalog::Catalog;
use crate::dates::{MonthWindow, format_record_date};
use crate::editor::{Editor, EditorState};
use crate::error::{Result, TimesheetError};
use crate::grouping::{Timesheet, build_timesheet};
use crate::ids::new_record_id;
use crate::models::{Employee, TimeRecord};
use crate::persistence::Repository;
use crate::reconcile::{
    BulkDraft, RecordDraft, apply_bulk, create_record, insert_record, remove_record,
    update_record, validate_bulk, validate_draft,
};
use crate::rollups::{MonthSummary, summarize};
use crate::storage::RecordStore;

/// Who is logged in. Administrators may log against any active client/role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub employee_id: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submitted {
    Created(TimeRecord),
    Updated(TimeRecord),
    Bulk {
        updated: usize,
        created: usize,
        skipped: Vec<NaiveDate>,
    },
}

/// One employee's timesheet while it is being viewed and edited.
pub struct Session<S: RecordStore> {
    user: SessionUser,
    repo: Repository<S>,
    employee: Employee,
    records: Vec<TimeRecord>,
    catalog: Catalog,
    editor: Editor,
    window: MonthWindow,
    pub status: Option<String>,
}

impl<S: RecordStore> Session<S> {
    pub fn start(repo: Repository<S>, user: SessionUser, window: MonthWindow) -> Result<Self> {
        let loaded = repo.open(&user.employee_id, user.is_admin)?;
        tracing::debug!(
            employee_id = %user.employee_id,
            records = loaded.records.len(),
            "Session started"
        );

        Ok(Session {
            user,
            repo,
            employee: loaded.employee,
            records: loaded.records,
            catalog: loaded.catalog,
            editor: Editor::new(),
            window,
            status: None,
        })
    }

    /// Ends the session; any open form is discarded.
    pub fn end(self) -> Repository<S> {
        if !self.editor.is_idle() {
            tracing::debug!(mode = ?self.editor.mode(), "Session ended with an open form");
        }
        self.repo
    }

    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    pub fn employee(&self) -> &Employee {
        &self.employee
    }

    pub fn records(&self) -> &[TimeRecord] {
        &self.records
    }

    pub fn record(&self, id: &str) -> Option<&TimeRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn window(&self) -> MonthWindow {
        self.window
    }

    pub fn set_window(&mut self, window: MonthWindow) {
        self.window = window;
    }

    pub fn timesheet(&self) -> Timesheet {
        build_timesheet(&self.records, self.window)
    }

    pub fn summary(&self) -> MonthSummary {
        summarize(&self.timesheet(), &self.catalog)
    }

    pub fn edit_record(&mut self, id: &str) -> Result<&mut RecordDraft> {
        let record = self
            .records
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| TimesheetError::RecordNotFound { id: id.to_string() })?;
        self.editor.begin_inline_edit(record);
        self.draft_mut()
    }

    pub fn add_to_day(&mut self, date: NaiveDate) -> Result<&mut RecordDraft> {
        let draft = RecordDraft::seeded(Some(date), &self.employee, &self.catalog);
        self.editor.begin_inline_add(date, draft);
        self.draft_mut()
    }

    pub fn open_add_dialog(&mut self) -> Result<&mut RecordDraft> {
        let draft = RecordDraft::seeded(None, &self.employee, &self.catalog);
        self.editor.begin_modal_add(draft);
        self.draft_mut()
    }

    pub fn toggle_day(&mut self, date: NaiveDate) -> bool {
        self.editor.toggle_day(date)
    }

    pub fn select_days(&mut self, dates: impl IntoIterator<Item = NaiveDate>) {
        self.editor.select_days(dates);
    }

    pub fn select_whole_month(&mut self) {
        let days = self.window.days().into_iter().map(|day| day.date);
        self.editor.select_days(days);
    }

    pub fn clear_selection(&mut self) {
        self.editor.clear_selection();
    }

    pub fn open_bulk_edit(&mut self) -> Result<&mut BulkDraft> {
        if let Err(err) = self.editor.begin_bulk_edit() {
            self.status = Some(err.to_string());
            return Err(err.into());
        }
        self.editor
            .bulk_draft_mut()
            .ok_or(TimesheetError::NotEditing)
    }

    pub fn draft_mut(&mut self) -> Result<&mut RecordDraft> {
        self.editor.draft_mut().ok_or(TimesheetError::NotEditing)
    }

    pub fn bulk_draft_mut(&mut self) -> Result<&mut BulkDraft> {
        self.editor.bulk_draft_mut().ok_or(TimesheetError::NotEditing)
    }

    pub fn cancel(&mut self) {
        self.editor.cancel();
        self.status = None;
    }

    /// Validates the open form, computes the next record list and commits it.
    /// On failure nothing is written and the form stays open.
    pub fn submit(&mut self) -> Result<Submitted> {
        match self.try_submit() {
            Ok(submitted) => {
                self.editor.complete();
                self.status = Some(describe(&submitted));
                Ok(submitted)
            }
            Err(err) => {
                if matches!(err, TimesheetError::RecordNotFound { .. }) {
                    self.editor.cancel();
                }
                self.status = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn try_submit(&mut self) -> Result<Submitted> {
        let user_id = self.user.employee_id.clone();
        match self.editor.state().clone() {
            EditorState::Idle => Err(TimesheetError::NotEditing),
            EditorState::InlineEdit { record_id, draft } => {
                let entry = validate_draft(&draft, &self.catalog)?;
                let next = update_record(&self.records, &record_id, &entry)?;
                self.commit(next)?;
                self.record(&record_id)
                    .cloned()
                    .map(Submitted::Updated)
                    .ok_or(TimesheetError::RecordNotFound { id: record_id })
            }
            EditorState::InlineAdd { date, mut draft } => {
                if draft.date.trim().is_empty() {
                    draft.date = format_record_date(date);
                }
                self.create(&user_id, &draft)
            }
            EditorState::ModalAdd { draft } => self.create(&user_id, &draft),
            EditorState::BulkEdit { dates, draft } => {
                let overrides = validate_bulk(&draft, &dates, &self.catalog)?;
                let outcome = apply_bulk(
                    &self.records,
                    &user_id,
                    &dates,
                    &overrides,
                    &self.catalog,
                    new_record_id,
                );
                self.commit(outcome.records)?;
                Ok(Submitted::Bulk {
                    updated: outcome.updated,
                    created: outcome.created,
                    skipped: outcome.skipped,
                })
            }
        }
    }

    fn create(&mut self, user_id: &str, draft: &RecordDraft) -> Result<Submitted> {
        let entry = validate_draft(draft, &self.catalog)?;
        let record = create_record(&entry, new_record_id(), user_id);
        let id = record.id.clone();
        self.commit(insert_record(&self.records, record))?;
        self.record(&id)
            .cloned()
            .map(Submitted::Created)
            .ok_or(TimesheetError::RecordNotFound { id })
    }

    pub fn delete_record(&mut self, id: &str) -> Result<()> {
        let result = remove_record(&self.records, id).and_then(|next| self.commit(next));
        match result {
            Ok(()) => {
                if matches!(self.editor.state(), EditorState::InlineEdit { record_id, .. } if record_id == id)
                {
                    self.editor.cancel();
                }
                self.status = Some("Record deleted.".to_string());
                Ok(())
            }
            Err(err) => {
                self.status = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn commit(&mut self, next: Vec<TimeRecord>) -> Result<()> {
        self.records = self.repo.commit(&self.user.employee_id, &next)?;
        Ok(())
    }
}

fn describe(submitted: &Submitted) -> String {
    match submitted {
        Submitted::Created(record) => format!("Record added on {}.", record.date),
        Submitted::Updated(record) => format!("Record on {} updated.", record.date),
        Submitted::Bulk {
            updated,
            created,
            skipped,
        } => format!(
            "Bulk edit applied: {updated} updated, {created} created, {} days skipped.",
            skipped.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorMode;
    use crate::error::ValidationError;
    use crate::models::STATUS_MANUAL;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .save(
                "ponto.employees",
                &json!([
                    {"id": "EMP001", "name": "Ana", "defaultClientId": "CLI001",
                     "defaultFuncaoId": "FUNC001", "timeRecords": [
                        {"id": "REC-1", "userId": "EMP001", "date": "19/04/2024",
                         "startTime": "08:00", "endTime": "12:00", "clientId": "CLI001",
                         "funcaoId": "FUNC001", "status": "Manual"},
                        {"id": "REC-2", "userId": "EMP001", "date": "20/04/2024",
                         "startTime": "08:00", "endTime": "12:00", "clientId": "CLI001",
                         "funcaoId": "FUNC001", "status": "Completo (Cron.)"},
                        {"id": "REC-3", "userId": "EMP001", "date": "20/04/2024",
                         "startTime": "13:00", "endTime": "17:00", "clientId": "CLI001",
                         "funcaoId": "FUNC001", "status": "Manual"}
                    ]}
                ])
                .to_string(),
            )
            .unwrap();
        store
            .save(
                "ponto.clients",
                &json!([
                    {"id": "CLI001", "name": "Acme"},
                    {"id": "CLI002", "name": "Globex"}
                ])
                .to_string(),
            )
            .unwrap();
        store
            .save(
                "ponto.funcoes",
                &json!([
                    {"id": "FUNC001", "name": "Dev"},
                    {"id": "FUNC002", "name": "Outra"}
                ])
                .to_string(),
            )
            .unwrap();
        store
    }

    fn session() -> Session<MemoryStore> {
        let user = SessionUser {
            employee_id: "EMP001".to_string(),
            is_admin: false,
        };
        Session::start(
            Repository::new(store(), "ponto"),
            user,
            MonthWindow::new(4, 2024).unwrap(),
        )
        .unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn stored_records(session: Session<MemoryStore>) -> Vec<TimeRecord> {
        session.end().load_records("EMP001").unwrap()
    }

    #[test]
    fn inline_add_uses_defaults_and_persists() {
        let mut session = session();
        let draft = session.add_to_day(day(1)).unwrap();
        assert_eq!(draft.client_id, "CLI001");
        draft.start_time = "09:00".to_string();
        draft.end_time = "10:30".to_string();

        let Submitted::Created(record) = session.submit().unwrap() else {
            panic!("expected a created record");
        };
        assert_eq!(record.date, "01/04/2024");
        assert_eq!(record.total_work_time, Some(90));
        assert_eq!(record.status, STATUS_MANUAL);
        assert!(session.editor().is_idle());

        let sheet = session.timesheet();
        assert_eq!(sheet.day(day(1)).unwrap().total_label, "[Total: 1h 30m]");
        assert_eq!(stored_records(session).len(), 4);
    }

    #[test]
    fn inverted_range_leaves_records_untouched() {
        let mut session = session();
        let draft = session.edit_record("REC-1").unwrap();
        draft.start_time = "17:00".to_string();
        draft.end_time = "08:00".to_string();

        let err = session.submit().unwrap_err();
        assert!(matches!(
            err,
            TimesheetError::Validation(ValidationError::InvertedRange { .. })
        ));
        assert_eq!(session.editor().mode(), EditorMode::InlineEdit);
        assert!(session.status.is_some());
        assert_eq!(session.record("REC-1").unwrap().start_time, "08:00");
        assert_eq!(stored_records(session)[0].start_time, "08:00");
    }

    #[test]
    fn outra_role_needs_custom_text_then_stores_it_as_comment() {
        let mut session = session();
        let draft = session.open_add_dialog().unwrap();
        draft.date = "2024-04-05".to_string();
        draft.start_time = "08:00".to_string();
        draft.end_time = "09:00".to_string();
        draft.funcao_id = "FUNC002".to_string();
        assert!(session.submit().is_err());
        assert_eq!(session.records().len(), 3);

        session.draft_mut().unwrap().custom_role = "Mentoria".to_string();
        let Submitted::Created(record) = session.submit().unwrap() else {
            panic!("expected a created record");
        };
        assert_eq!(record.custom_role(), Some("Mentoria"));

        let stored = session.end();
        let raw = stored.store().raw("ponto.employees").unwrap();
        assert!(raw.contains("\"comment\": \"Mentoria\""));
    }

    #[test]
    fn editing_a_custom_role_record_prefills_the_custom_field() {
        let mut session = session();
        let draft = session.edit_record("REC-3").unwrap();
        draft.funcao_id = "FUNC002".to_string();
        draft.custom_role = "Suporte".to_string();
        session.submit().unwrap();

        let draft = session.edit_record("REC-3").unwrap();
        assert_eq!(draft.custom_role, "Suporte");
        assert_eq!(draft.note, "");
    }

    #[test]
    fn bulk_edit_overrides_and_synthesizes() {
        let mut session = session();
        assert!(session.open_bulk_edit().is_err());

        session.select_days([day(19), day(20), day(21)]);
        let bulk = session.open_bulk_edit().unwrap();
        bulk.start_time = "09:00".to_string();
        bulk.end_time = "17:00".to_string();
        bulk.client_id = "CLI002".to_string();
        bulk.funcao_id = "FUNC001".to_string();

        let submitted = session.submit().unwrap();
        assert_eq!(
            submitted,
            Submitted::Bulk {
                updated: 3,
                created: 1,
                skipped: Vec::new()
            }
        );
        assert!(session.editor().selection().is_empty());

        let sheet = session.timesheet();
        assert_eq!(sheet.day(day(21)).unwrap().records.len(), 1);
        for record in session.records() {
            assert_eq!(record.client_id.as_deref(), Some("CLI002"));
            assert_eq!(record.total_work_time, Some(480));
        }
        // Clock-flow status survives a bulk edit.
        assert_eq!(session.record("REC-2").unwrap().status, "Completo (Cron.)");
        assert_eq!(stored_records(session).len(), 4);
    }

    #[test]
    fn rejected_bulk_submit_writes_nothing() {
        let before = stored_records(session());
        let mut session = session();
        session.select_days([day(19), day(21)]);
        let bulk = session.open_bulk_edit().unwrap();
        bulk.start_time = "09:00".to_string();
        bulk.client_id = "CLI002".to_string();

        let err = session.submit().unwrap_err();
        assert!(matches!(
            err,
            TimesheetError::Validation(ValidationError::PartialTimeRange)
        ));
        assert_eq!(session.editor().mode(), EditorMode::BulkEdit);
        assert_eq!(session.editor().selection().len(), 2);
        assert_eq!(session.records(), before.as_slice());
        assert_eq!(stored_records(session), before);
    }

    #[test]
    fn delete_and_missing_ids() {
        let mut session = session();
        session.edit_record("REC-1").unwrap();
        session.delete_record("REC-1").unwrap();
        assert!(session.editor().is_idle());
        assert!(session.record("REC-1").is_none());
        assert!(matches!(
            session.delete_record("REC-1"),
            Err(TimesheetError::RecordNotFound { .. })
        ));
        assert!(matches!(
            session.edit_record("REC-1"),
            Err(TimesheetError::RecordNotFound { .. })
        ));
        assert_eq!(stored_records(session).len(), 2);
    }

    #[test]
    fn submit_while_idle_is_rejected() {
        let mut session = session();
        assert!(matches!(session.submit(), Err(TimesheetError::NotEditing)));
    }

    #[test]
    fn summary_reflects_current_month() {
        let mut session = session();
        let summary = session.summary();
        assert_eq!(summary.total_minutes, 720);
        assert_eq!(summary.days_worked, 2);

        session.set_window(MonthWindow::new(5, 2024).unwrap());
        assert_eq!(session.summary().total_minutes, 0);
    }

    #[test]
    fn unknown_employee_cannot_start() {
        let user = SessionUser {
            employee_id: "EMP404".to_string(),
            is_admin: true,
        };
        let result = Session::start(
            Repository::new(store(), "ponto"),
            user,
            MonthWindow::new(4, 2024).unwrap(),
        );
        assert!(matches!(result, Err(TimesheetError::EmployeeNotFound { .. })));
    }
}
