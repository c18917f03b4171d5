//! Document store contract and its implementations.
//!
//! The core talks to storage only through [`DocumentStore`]: account-scoped collections of
//! JSON documents with partial updates, atomic batches and push subscriptions that deliver
//! the full result set on every change.

pub mod json_backend;
pub mod memory;

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{domain::AccountId, utils::listeners::Subscription, utils::persistence::PersistenceError};

pub use json_backend::JsonFileStore;
pub use memory::MemoryStore;

pub type Fields = serde_json::Map<String, Value>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type SnapshotCallback = Box<dyn Fn(&[Document]) + Send + Sync>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("document not found: {0}")]
    MissingDocument(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        StoreError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Encoding(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    People,
    Transactions,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::People => "people",
            Collection::Transactions => "transactions",
        }
    }
}

/// Account-scoped collection: `users/{account}/{collection}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionRef {
    account: AccountId,
    collection: Collection,
}

impl CollectionRef {
    pub fn new(account: &AccountId, collection: Collection) -> Self {
        Self {
            account: account.clone(),
            collection,
        }
    }

    pub fn people(account: &AccountId) -> Self {
        Self::new(account, Collection::People)
    }

    pub fn transactions(account: &AccountId) -> Self {
        Self::new(account, Collection::Transactions)
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn path(&self) -> String {
        format!("users/{}/{}", self.account, self.collection.as_str())
    }

    pub fn doc(&self, id: impl Into<String>) -> DocRef {
        DocRef {
            collection: self.clone(),
            id: id.into(),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    collection: CollectionRef,
    id: String,
}

impl DocRef {
    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.collection.path(), self.id)
    }
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// A stored document: its id plus its JSON fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Create {
        collection: CollectionRef,
        fields: Fields,
    },
    Update {
        doc: DocRef,
        fields: Fields,
    },
    Delete {
        doc: DocRef,
    },
    /// Deletes every document of `collection` whose `field` equals `value`, matched against
    /// the state the batch commits on.
    DeleteWhere {
        collection: CollectionRef,
        field: String,
        value: Value,
    },
}

impl BatchOp {
    pub fn collection(&self) -> &CollectionRef {
        match self {
            BatchOp::Create { collection, .. } | BatchOp::DeleteWhere { collection, .. } => {
                collection
            }
            BatchOp::Update { doc, .. } | BatchOp::Delete { doc } => doc.collection(),
        }
    }
}

/// Group of writes committed atomically: either every operation applies or none does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, collection: &CollectionRef, fields: Fields) -> &mut Self {
        self.ops.push(BatchOp::Create {
            collection: collection.clone(),
            fields,
        });
        self
    }

    pub fn update(&mut self, doc: &DocRef, fields: Fields) -> &mut Self {
        self.ops.push(BatchOp::Update {
            doc: doc.clone(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, doc: &DocRef) -> &mut Self {
        self.ops.push(BatchOp::Delete { doc: doc.clone() });
        self
    }

    pub fn delete_where(
        &mut self,
        collection: &CollectionRef,
        field: &str,
        value: Value,
    ) -> &mut Self {
        self.ops.push(BatchOp::DeleteWhere {
            collection: collection.clone(),
            field: field.to_string(),
            value,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Abstraction over document stores that push change notifications.
pub trait DocumentStore: Send + Sync {
    /// Applies every operation of `batch` atomically and returns the ids assigned to its
    /// `Create` operations, in order.
    fn commit(&self, batch: WriteBatch) -> StoreResult<Vec<String>>;

    /// Documents of `collection` whose `field` equals `value`.
    fn query_where(
        &self,
        collection: &CollectionRef,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>>;

    /// Registers `callback` for the full result set of `collection`. The callback fires
    /// once immediately (even when the collection is empty) and again after every change.
    fn subscribe(
        &self,
        collection: &CollectionRef,
        callback: SnapshotCallback,
    ) -> StoreResult<Subscription>;

    fn batch(&self) -> WriteBatch {
        WriteBatch::new()
    }

    fn create_doc(&self, collection: &CollectionRef, fields: Fields) -> StoreResult<String> {
        let mut batch = self.batch();
        batch.create(collection, fields);
        self.commit(batch)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Unavailable("store did not assign an id".into()))
    }

    /// Merges `fields` into an existing document.
    fn update_doc(&self, doc: &DocRef, fields: Fields) -> StoreResult<()> {
        let mut batch = self.batch();
        batch.update(doc, fields);
        self.commit(batch).map(|_| ())
    }

    fn delete_doc(&self, doc: &DocRef) -> StoreResult<()> {
        let mut batch = self.batch();
        batch.delete(doc);
        self.commit(batch).map(|_| ())
    }
}

/// Encodes a serializable record as document fields.
pub fn to_fields<T: Serialize>(value: &T) -> StoreResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Encoding(format!(
            "expected an object, got `{other}`"
        ))),
    }
}
