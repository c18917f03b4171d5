//! In-process document store.
//!
//! Writes are applied to a copy of the state and swapped in only when every operation of
//! the batch succeeded (and the optional persistence hook accepted the new state), so a
//! failed batch leaves nothing behind. Subscribers are called after the lock is released,
//! one snapshot at a time and in commit order.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{
    BatchOp, CollectionRef, Document, DocumentStore, SnapshotCallback, StoreError, StoreResult,
    WriteBatch,
};
use crate::utils::listeners::Subscription;

type SharedCallback = Arc<dyn Fn(&[Document]) + Send + Sync>;
type PersistHook = Box<dyn Fn(&StoreState) -> StoreResult<()> + Send + Sync>;

/// Every collection keyed by its path, documents in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<Document>>,
}

impl StoreState {
    pub fn documents(&self, path: &str) -> &[Document] {
        self.collections.get(path).map_or(&[], Vec::as_slice)
    }

    pub fn document_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    fn apply(&mut self, op: BatchOp, created: &mut Vec<String>) -> StoreResult<()> {
        match op {
            BatchOp::Create { collection, fields } => {
                let id = new_document_id();
                self.collections
                    .entry(collection.path())
                    .or_default()
                    .push(Document {
                        id: id.clone(),
                        fields,
                    });
                created.push(id);
            }
            BatchOp::Update { doc, fields } => {
                let target = self
                    .collections
                    .get_mut(&doc.collection().path())
                    .and_then(|docs| docs.iter_mut().find(|d| d.id == doc.id()))
                    .ok_or_else(|| StoreError::MissingDocument(doc.path()))?;
                for (key, value) in fields {
                    target.fields.insert(key, value);
                }
            }
            BatchOp::Delete { doc } => {
                if let Some(docs) = self.collections.get_mut(&doc.collection().path()) {
                    docs.retain(|d| d.id != doc.id());
                }
            }
            BatchOp::DeleteWhere {
                collection,
                field,
                value,
            } => {
                if let Some(docs) = self.collections.get_mut(&collection.path()) {
                    docs.retain(|d| d.get(&field) != Some(&value));
                }
            }
        }
        Ok(())
    }
}

/// Snapshots queued for one subscriber.
///
/// Commits enqueue under the store lock, so the queue order is the commit order. Whichever
/// thread finds the mailbox idle drains it; a callback that writes to the store only
/// enqueues, and the drain already running on that thread delivers the new snapshot next.
struct Mailbox {
    callback: SharedCallback,
    state: Mutex<MailboxState>,
}

#[derive(Default)]
struct MailboxState {
    queue: VecDeque<Arc<[Document]>>,
    draining: bool,
    closed: bool,
}

impl Mailbox {
    fn new(callback: SharedCallback) -> Self {
        Self {
            callback,
            state: Mutex::new(MailboxState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, docs: Arc<[Document]>) {
        let mut state = self.lock();
        if !state.closed {
            state.queue.push_back(docs);
        }
    }

    fn drain(&self) {
        {
            let mut state = self.lock();
            if state.draining {
                return;
            }
            state.draining = true;
        }
        loop {
            let next = {
                let mut state = self.lock();
                match state.queue.pop_front() {
                    Some(docs) if !state.closed => docs,
                    _ => {
                        state.queue.clear();
                        state.draining = false;
                        return;
                    }
                }
            };
            (self.callback)(&next);
        }
    }

    fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.queue.clear();
    }
}

struct Subscriber {
    id: u64,
    path: String,
    mailbox: Arc<Mailbox>,
}

struct Inner {
    state: StoreState,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    outage: Option<String>,
}

impl Inner {
    fn ensure_available(&self) -> StoreResult<()> {
        match &self.outage {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    /// Queues the current contents of every touched collection for its subscribers.
    fn enqueue(&self, paths: &BTreeSet<String>) -> Vec<Arc<Mailbox>> {
        let mut snapshots: HashMap<&str, Arc<[Document]>> = HashMap::new();
        self.subscribers
            .iter()
            .filter(|subscriber| paths.contains(&subscriber.path))
            .map(|subscriber| {
                let docs = snapshots
                    .entry(subscriber.path.as_str())
                    .or_insert_with(|| self.state.documents(&subscriber.path).into())
                    .clone();
                subscriber.mailbox.push(docs);
                Arc::clone(&subscriber.mailbox)
            })
            .collect()
    }
}

/// Thread-safe in-memory [`DocumentStore`]. Share it between sessions with `Arc`.
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    persist: Option<PersistHook>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_state(StoreState::default())
    }

    pub fn with_state(state: StoreState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                subscribers: Vec::new(),
                next_subscriber: 0,
                outage: None,
            })),
            persist: None,
        }
    }

    /// Installs a hook that must accept every new state before it becomes visible.
    pub fn with_persistence<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StoreState) -> StoreResult<()> + Send + Sync + 'static,
    {
        self.persist = Some(Box::new(hook));
        self
    }

    /// Simulates a backend outage: while set, reads and writes fail with `Unavailable`.
    pub fn set_outage(&self, reason: Option<&str>) {
        self.lock().outage = reason.map(str::to_string);
    }

    pub fn snapshot(&self) -> StoreState {
        self.lock().state.clone()
    }

    pub fn documents(&self, collection: &CollectionRef) -> Vec<Document> {
        self.lock().state.documents(&collection.path()).to_vec()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for MemoryStore {
    fn commit(&self, batch: WriteBatch) -> StoreResult<Vec<String>> {
        let (created, mailboxes) = {
            let mut inner = self.lock();
            inner.ensure_available()?;

            let mut next = inner.state.clone();
            let mut touched = BTreeSet::new();
            let mut created = Vec::new();
            for op in batch.into_ops() {
                touched.insert(op.collection().path());
                next.apply(op, &mut created)?;
            }
            if let Some(persist) = &self.persist {
                persist(&next)?;
            }
            inner.state = next;
            (created, inner.enqueue(&touched))
        };

        debug!(
            created = created.len(),
            notified = mailboxes.len(),
            "batch committed"
        );
        for mailbox in mailboxes {
            mailbox.drain();
        }
        Ok(created)
    }

    fn query_where(
        &self,
        collection: &CollectionRef,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>> {
        let inner = self.lock();
        inner.ensure_available()?;
        Ok(inner
            .state
            .documents(&collection.path())
            .iter()
            .filter(|doc| doc.get(field) == Some(value))
            .cloned()
            .collect())
    }

    fn subscribe(
        &self,
        collection: &CollectionRef,
        callback: SnapshotCallback,
    ) -> StoreResult<Subscription> {
        let path = collection.path();
        let mailbox = Arc::new(Mailbox::new(Arc::from(callback)));
        let id = {
            let mut inner = self.lock();
            let id = inner.next_subscriber;
            inner.next_subscriber += 1;
            mailbox.push(inner.state.documents(&path).into());
            inner.subscribers.push(Subscriber {
                id,
                path: path.clone(),
                mailbox: Arc::clone(&mailbox),
            });
            id
        };
        debug!(%path, subscriber = id, "subscribed");
        mailbox.drain();

        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            mailbox.close();
            if let Some(inner) = weak.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .subscribers
                    .retain(|subscriber| subscriber.id != id);
            }
        }))
    }
}

fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}
