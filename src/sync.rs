use serde::Deserialize;
use std::collections::HashSet;

use crate::error::RemoteError;
use crate::models::JobRecord;

/// A document in a user's remote collection. `fields` holds the plain JSON
/// form of the record; decoding into a `JobRecord` is left to the caller so a
/// malformed document can still be deleted by key.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub key: String,
    pub fields: serde_json::Value,
}

impl RemoteDocument {
    pub fn decode(&self) -> Result<JobRecord, serde_json::Error> {
        JobRecord::deserialize(&self.fields)
    }
}

/// Per-user document collection keyed by record id.
pub trait DocumentClient {
    /// Cheap availability check run once at startup.
    fn probe(&self) -> Result<(), RemoteError>;

    fn list(&self, uid: &str) -> Result<Vec<RemoteDocument>, RemoteError>;

    /// Commits every upsert and deletion in `plan` atomically.
    fn apply_batch(&self, uid: &str, plan: &SyncPlan) -> Result<(), RemoteError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub upserts: Vec<JobRecord>,
    pub deletions: Vec<String>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.upserts.len() + self.deletions.len()
    }
}

pub fn document_key(record: &JobRecord) -> String {
    record.id.to_string()
}

/// Upserts every desired record and deletes every existing key that is no
/// longer desired.
pub fn plan<'a, I>(desired: &[JobRecord], existing_keys: I) -> SyncPlan
where
    I: IntoIterator<Item = &'a str>,
{
    let keep: HashSet<String> = desired.iter().map(document_key).collect();
    let mut deletions: Vec<String> = existing_keys
        .into_iter()
        .filter(|key| !keep.contains(*key))
        .map(str::to_string)
        .collect();
    deletions.sort();
    deletions.dedup();

    SyncPlan {
        upserts: desired.to_vec(),
        deletions,
    }
}

/// Makes the remote collection equal to `desired` in one atomic batch. On
/// failure the remote side is untouched; the caller's local copy is not
/// rolled back.
pub fn reconcile(
    client: &dyn DocumentClient,
    uid: &str,
    desired: &[JobRecord],
) -> Result<SyncPlan, RemoteError> {
    let existing = client.list(uid)?;
    // Documents that do not decode were never shown to the user, so they
    // cannot have been removed on purpose.
    let (readable, unreadable): (Vec<&RemoteDocument>, Vec<&RemoteDocument>) =
        existing.iter().partition(|doc| doc.decode().is_ok());
    if !unreadable.is_empty() {
        tracing::warn!(uid, kept = unreadable.len(), "leaving unreadable documents in place");
    }
    let plan = plan(desired, readable.iter().map(|doc| doc.key.as_str()));
    if plan.is_empty() {
        tracing::debug!(uid, "remote collection already empty, nothing to commit");
        return Ok(plan);
    }
    client.apply_batch(uid, &plan).inspect_err(|err| {
        tracing::error!(uid, writes = plan.len(), error = %err, "batch commit failed");
    })?;
    tracing::info!(
        uid,
        upserts = plan.upserts.len(),
        deletions = plan.deletions.len(),
        "remote collection reconciled"
    );
    Ok(plan)
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, HashMap};

    use super::*;

    /// In-process collection store with an atomic batch and failure switches.
    #[derive(Default)]
    pub struct MemoryDocuments {
        pub users: RefCell<HashMap<String, BTreeMap<String, serde_json::Value>>>,
        pub fail_probe: Cell<bool>,
        pub fail_commit: Cell<bool>,
        pub commits: Cell<usize>,
    }

    impl MemoryDocuments {
        pub fn keys(&self, uid: &str) -> Vec<String> {
            self.users
                .borrow()
                .get(uid)
                .map(|docs| docs.keys().cloned().collect())
                .unwrap_or_default()
        }

        pub fn insert_raw(&self, uid: &str, key: &str, fields: serde_json::Value) {
            self.users
                .borrow_mut()
                .entry(uid.to_string())
                .or_default()
                .insert(key.to_string(), fields);
        }
    }

    fn unavailable() -> RemoteError {
        RemoteError::Status {
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    impl DocumentClient for MemoryDocuments {
        fn probe(&self) -> Result<(), RemoteError> {
            if self.fail_probe.get() {
                return Err(unavailable());
            }
            Ok(())
        }

        fn list(&self, uid: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
            Ok(self
                .users
                .borrow()
                .get(uid)
                .map(|docs| {
                    docs.iter()
                        .map(|(key, fields)| RemoteDocument {
                            key: key.clone(),
                            fields: fields.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default())
        }

        fn apply_batch(&self, uid: &str, plan: &SyncPlan) -> Result<(), RemoteError> {
            if self.fail_commit.get() {
                return Err(unavailable());
            }
            let mut staged = self.users.borrow().get(uid).cloned().unwrap_or_default();
            for record in &plan.upserts {
                let fields = serde_json::to_value(record)
                    .map_err(|e| RemoteError::Decode(e.to_string()))?;
                staged.insert(document_key(record), fields);
            }
            for key in &plan.deletions {
                staged.remove(key);
            }
            self.users.borrow_mut().insert(uid.to_string(), staged);
            self.commits.set(self.commits.get() + 1);
            Ok(())
        }
    }
}
