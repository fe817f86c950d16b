use crate::error::StoreError;
use crate::models::{next_id, JobRecord, RecordEdit, RecordForm};
use crate::notify::Notifier;
use crate::session::{Backend, Session};
use crate::sort::{sort_records, SortMethod};
use crate::store::RecordStore;
use crate::sync::DocumentClient;

const SIZE_WARNING: &str = "Warning: Your data is taking up a lot of storage space.";

/// Handlers behind every command: read through the active store, order the
/// result, write changes back and tell the user what happened. Failures are
/// reported through the notifier and never escape as errors.
pub struct Tracker<'a> {
    store: Box<dyn RecordStore + 'a>,
    notifier: &'a dyn Notifier,
    session: Session,
}

impl<'a> Tracker<'a> {
    pub fn new(store: Box<dyn RecordStore + 'a>, notifier: &'a dyn Notifier, session: Session) -> Self {
        Self {
            store,
            notifier,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store_label(&self) -> &'static str {
        self.store.label()
    }

    /// The current user's records in display order; empty when they cannot
    /// be read.
    pub fn load(&self) -> Vec<JobRecord> {
        match self.store.get_records() {
            Ok(records) => sort_records(&records, self.session.sort),
            Err(err) => {
                self.report(&err);
                Vec::new()
            }
        }
    }

    pub fn set_sort(&mut self, method: SortMethod) -> Vec<JobRecord> {
        self.session.sort = method;
        self.load()
    }

    pub fn find(&self, id: i64) -> Option<JobRecord> {
        match self.store.get_records() {
            Ok(records) => records.into_iter().find(|r| r.id == id),
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    pub fn add(&mut self, form: RecordForm, now_ms: i64) -> Option<JobRecord> {
        let mut records = self.records_for_write()?;
        let record = JobRecord::from_form(form, next_id(&records, now_ms));
        records.push(record.clone());
        if !self.save(&records) {
            return None;
        }
        tracing::info!(id = record.id, backend = self.store.label(), "application added");
        self.notifier.notify("Job application added successfully!");
        Some(record)
    }

    /// Marks `id` as the record under edit and returns its current state.
    pub fn begin_edit(&mut self, id: i64) -> Option<JobRecord> {
        let record = self.find_or_notify(id)?;
        self.session.editing = Some(id);
        Some(record)
    }

    pub fn cancel_edit(&mut self) {
        self.session.editing = None;
    }

    /// Applies `edit` to the record picked by `begin_edit`. On a failed save
    /// the edit stays open so it can be retried.
    pub fn save_edit(&mut self, edit: &RecordEdit) -> Option<JobRecord> {
        let Some(id) = self.session.editing else {
            self.notifier.notify("No application is being edited.");
            return None;
        };
        let mut records = match self.store.get_records() {
            Ok(records) => records,
            Err(err) => {
                self.report(&err);
                return None;
            }
        };
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            self.session.editing = None;
            self.notifier.notify("Job not found.");
            return None;
        };
        edit.apply(record);
        let updated = record.clone();
        if !self.save(&records) {
            return None;
        }
        self.session.editing = None;
        tracing::info!(id, backend = self.store.label(), "application updated");
        self.notifier.notify("Job updated successfully!");
        Some(updated)
    }

    pub fn delete(&mut self, id: i64) -> bool {
        match self.store.delete_record(id) {
            Ok(true) => {
                if self.session.editing == Some(id) {
                    self.session.editing = None;
                }
                tracing::info!(id, backend = self.store.label(), "application deleted");
                self.notifier.notify("Job application deleted.");
                true
            }
            Ok(false) => {
                self.notifier.notify("Job not found.");
                false
            }
            Err(err) => {
                self.report(&err);
                false
            }
        }
    }

    pub fn clear_all(&mut self) -> bool {
        match self.store.clear_all() {
            Ok(()) => {
                self.session.editing = None;
                tracing::info!(backend = self.store.label(), "all applications cleared");
                self.notifier.notify("All job applications cleared.");
                true
            }
            Err(err) => {
                self.report(&err);
                false
            }
        }
    }

    fn find_or_notify(&self, id: i64) -> Option<JobRecord> {
        let records = match self.store.get_records() {
            Ok(records) => records,
            Err(err) => {
                self.report(&err);
                return None;
            }
        };
        let found = records.into_iter().find(|r| r.id == id);
        if found.is_none() {
            self.notifier.notify("Job not found.");
        }
        found
    }

    // A corrupt local blob reads as empty and gets overwritten by the next
    // save; any other read failure aborts the write.
    fn records_for_write(&self) -> Option<Vec<JobRecord>> {
        match self.store.get_records() {
            Ok(records) => Some(records),
            Err(err @ StoreError::Corrupt(_)) => {
                self.report(&err);
                Some(Vec::new())
            }
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    fn save(&self, records: &[JobRecord]) -> bool {
        match self.store.put_records(records) {
            Ok(report) => {
                if report.size_warning {
                    self.notifier.notify(SIZE_WARNING);
                }
                true
            }
            Err(err) => {
                self.report(&err);
                false
            }
        }
    }

    fn report(&self, err: &StoreError) {
        match err {
            StoreError::NotSignedIn => {
                tracing::warn!(backend = self.store.label(), "operation needs a signed-in user")
            }
            _ => tracing::error!(backend = self.store.label(), error = ?err, "record store failure"),
        }
        self.notifier.notify(err.user_message());
    }
}

/// Decides the backend once per run. A failed probe falls back to local
/// storage and is not retried.
pub fn probe_backend(client: Option<&dyn DocumentClient>) -> Backend {
    let Some(client) = client else {
        return Backend::Local;
    };
    match client.probe() {
        Ok(()) => {
            tracing::info!("cloud storage available");
            Backend::Remote
        }
        Err(err) => {
            tracing::warn!(error = %err, "cloud storage unavailable; falling back to local storage");
            Backend::Local
        }
    }
}
