//! JSON-file-backed document store for single-device deployments.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{
    memory::{MemoryStore, StoreState},
    CollectionRef, Document, DocumentStore, SnapshotCallback, StoreError, StoreResult, WriteBatch,
};
use crate::utils::{
    listeners::Subscription,
    persistence::{load_json, save_json_atomic},
};

pub const STORE_SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    schema_version: u32,
    #[serde(flatten)]
    state: StoreState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreFileRef<'a> {
    schema_version: u32,
    #[serde(flatten)]
    state: &'a StoreState,
}

/// [`DocumentStore`] that keeps its state in memory and rewrites one JSON file atomically
/// after every successful batch. A failed write rejects the batch.
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = match load_json::<StoreFile>(&path)? {
            Some(file) if file.schema_version > STORE_SCHEMA_VERSION => {
                return Err(StoreError::Persistence(format!(
                    "`{}` uses schema v{} which is newer than supported v{}",
                    path.display(),
                    file.schema_version,
                    STORE_SCHEMA_VERSION
                )));
            }
            Some(file) => file.state,
            None => StoreState::default(),
        };
        info!(
            path = %path.display(),
            documents = state.document_count(),
            "opened ledger store"
        );

        let target = path.clone();
        let inner = MemoryStore::with_state(state).with_persistence(move |state| {
            let file = StoreFileRef {
                schema_version: STORE_SCHEMA_VERSION,
                state,
            };
            save_json_atomic(&file, &target).map_err(StoreError::from)
        });
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> StoreState {
        self.inner.snapshot()
    }
}

impl DocumentStore for JsonFileStore {
    fn commit(&self, batch: WriteBatch) -> StoreResult<Vec<String>> {
        self.inner.commit(batch)
    }

    fn query_where(
        &self,
        collection: &CollectionRef,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>> {
        self.inner.query_where(collection, field, value)
    }

    fn subscribe(
        &self,
        collection: &CollectionRef,
        callback: SnapshotCallback,
    ) -> StoreResult<Subscription> {
        self.inner.subscribe(collection, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountId;
    use crate::storage::to_fields;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn people() -> CollectionRef {
        CollectionRef::people(&AccountId::new("local"))
    }

    #[test]
    fn committed_documents_survive_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ledger.json");

        let store = JsonFileStore::open(&path).unwrap();
        let id = store
            .create_doc(&people(), to_fields(&json!({"name": "Alice"})).unwrap())
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        let docs = reopened.query_where(&people(), "name", &json!("Alice")).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
    }

    #[test]
    fn file_carries_schema_version() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ledger.json");
        let store = JsonFileStore::open(&path).unwrap();
        store
            .create_doc(&people(), to_fields(&json!({"name": "Bob"})).unwrap())
            .unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["schemaVersion"], STORE_SCHEMA_VERSION);
        assert!(raw["collections"]["users/local/people"].is_array());
    }

    #[test]
    fn rejects_future_schema_versions() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ledger.json");
        fs::write(&path, r#"{"schemaVersion": 99, "collections": {}}"#).unwrap();

        match JsonFileStore::open(&path) {
            Err(StoreError::Persistence(message)) => assert!(message.contains("newer")),
            Err(other) => panic!("expected persistence error, got {other:?}"),
            Ok(_) => panic!("future schema must be rejected"),
        }
    }

    #[test]
    fn missing_file_opens_empty() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::open(temp.path().join("fresh.json")).unwrap();
        assert_eq!(store.snapshot().document_count(), 0);
        assert!(!store.path().exists());
    }
}
