use crate::config::DEFAULT_SIZE_WARNING_CHARS;
use crate::db::Database;
use crate::error::StoreError;
use crate::models::JobRecord;
use crate::sync::{self, DocumentClient, SyncPlan};

/// What a successful save did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub records: usize,
    /// The payload was over the warning threshold; it was still written.
    pub size_warning: bool,
}

/// The current user's list of applications, wherever it lives.
pub trait RecordStore {
    fn label(&self) -> &'static str;

    fn get_records(&self) -> Result<Vec<JobRecord>, StoreError>;

    /// Replaces the whole set.
    fn put_records(&self, records: &[JobRecord]) -> Result<SaveReport, StoreError>;

    /// Removes one record. Returns false when no record had that id.
    fn delete_record(&self, id: i64) -> Result<bool, StoreError>;

    fn clear_all(&self) -> Result<(), StoreError>;
}

/// JSON blob under a single key in the local database.
pub struct LocalStore<'a> {
    db: &'a Database,
    key: String,
    size_warning_chars: usize,
}

impl<'a> LocalStore<'a> {
    pub fn new(db: &'a Database, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
            size_warning_chars: DEFAULT_SIZE_WARNING_CHARS,
        }
    }

    pub fn with_size_warning(mut self, chars: usize) -> Self {
        self.size_warning_chars = chars;
        self
    }
}

impl RecordStore for LocalStore<'_> {
    fn label(&self) -> &'static str {
        "local"
    }

    fn get_records(&self) -> Result<Vec<JobRecord>, StoreError> {
        let Some(raw) = self.db.get(&self.key).map_err(StoreError::Read)? else {
            return Ok(Vec::new());
        };
        // Only an unparseable blob is corrupt; a bad entry inside it is not.
        let items: Vec<serde_json::Value> = serde_json::from_str(&raw).map_err(StoreError::Corrupt)?;
        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<JobRecord>(item) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(key = %self.key, index, error = %e, "skipping unreadable record"),
            }
        }
        Ok(records)
    }

    fn put_records(&self, records: &[JobRecord]) -> Result<SaveReport, StoreError> {
        let data = serde_json::to_string(records).map_err(StoreError::Encode)?;
        let size = data.chars().count();
        let size_warning = size > self.size_warning_chars;
        if size_warning {
            tracing::warn!(
                key = %self.key,
                size,
                threshold = self.size_warning_chars,
                "stored applications are getting large"
            );
        }
        self.db.set(&self.key, &data).map_err(StoreError::from_write)?;
        tracing::debug!(key = %self.key, records = records.len(), "saved applications");
        Ok(SaveReport {
            records: records.len(),
            size_warning,
        })
    }

    fn delete_record(&self, id: i64) -> Result<bool, StoreError> {
        let records = self.get_records()?;
        let before = records.len();
        let kept: Vec<JobRecord> = records.into_iter().filter(|r| r.id != id).collect();
        if kept.len() == before {
            return Ok(false);
        }
        self.put_records(&kept)?;
        Ok(true)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        self.put_records(&[])?;
        Ok(())
    }
}

/// Per-user document collection. Reads go straight to the remote side;
/// writes go through the reconciler as one atomic batch.
pub struct RemoteStore<'a> {
    client: &'a dyn DocumentClient,
    uid: Option<String>,
}

impl<'a> RemoteStore<'a> {
    pub fn new(client: &'a dyn DocumentClient, uid: Option<String>) -> Self {
        Self { client, uid }
    }

    fn uid(&self) -> Result<&str, StoreError> {
        self.uid.as_deref().ok_or(StoreError::NotSignedIn)
    }
}

impl RecordStore for RemoteStore<'_> {
    fn label(&self) -> &'static str {
        "cloud"
    }

    fn get_records(&self) -> Result<Vec<JobRecord>, StoreError> {
        let uid = self.uid()?;
        let documents = self.client.list(uid)?;
        let mut records = Vec::with_capacity(documents.len());
        for doc in documents {
            match doc.decode() {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(uid, key = %doc.key, error = %e, "skipping unreadable document"),
            }
        }
        Ok(records)
    }

    fn put_records(&self, records: &[JobRecord]) -> Result<SaveReport, StoreError> {
        let uid = self.uid()?;
        sync::reconcile(self.client, uid, records)?;
        Ok(SaveReport {
            records: records.len(),
            size_warning: false,
        })
    }

    fn delete_record(&self, id: i64) -> Result<bool, StoreError> {
        let uid = self.uid()?;
        let key = id.to_string();
        let exists = self.client.list(uid)?.iter().any(|doc| doc.key == key);
        if !exists {
            return Ok(false);
        }
        let plan = SyncPlan {
            upserts: Vec::new(),
            deletions: vec![key],
        };
        self.client.apply_batch(uid, &plan)?;
        Ok(true)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let uid = self.uid()?;
        sync::reconcile(self.client, uid, &[])?;
        Ok(())
    }
}
