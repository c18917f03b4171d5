//! Bridges store change streams into in-memory snapshots.
//!
//! A [`SyncLayer`] owns the people and transaction caches of one signed-in account. Every
//! upstream snapshot replaces the whole cache and is then republished, synchronously and in
//! registration order, to every listener. Readers never see a partially patched cache.

use std::{
    cmp::Ordering,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use tracing::{debug, info, warn};

use crate::{
    domain::{
        person, transaction, AccountId, Person, PersonFields, PersonId, Transaction,
        TransactionFields, TransactionId,
    },
    storage::{Collection, CollectionRef, Document, DocumentStore, StoreResult},
    utils::listeners::{ListenerSet, Subscription},
};

/// Records kept in sync with a store collection.
pub trait SyncRecord: Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn decode(doc: &Document) -> Result<Self, serde_json::Error>;

    /// Order in which the cache holds records.
    fn cache_order(a: &Self, b: &Self) -> Ordering;
}

impl SyncRecord for Person {
    const COLLECTION: Collection = Collection::People;

    fn decode(doc: &Document) -> Result<Self, serde_json::Error> {
        let fields: PersonFields = doc.decode()?;
        Ok(Person::from_fields(PersonId::new(doc.id.clone()), fields))
    }

    fn cache_order(a: &Self, b: &Self) -> Ordering {
        person::creation_order(a, b)
    }
}

impl SyncRecord for Transaction {
    const COLLECTION: Collection = Collection::Transactions;

    fn decode(doc: &Document) -> Result<Self, serde_json::Error> {
        let fields: TransactionFields = doc.decode()?;
        Ok(Transaction::from_fields(
            TransactionId::new(doc.id.clone()),
            fields,
        ))
    }

    fn cache_order(a: &Self, b: &Self) -> Ordering {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

struct Slot<T> {
    items: Arc<[T]>,
    synced: bool,
    generation: u64,
}

/// One synchronized collection: its cache plus its listeners.
struct Channel<T: SyncRecord> {
    slot: Arc<RwLock<Slot<T>>>,
    listeners: ListenerSet<[T]>,
}

impl<T: SyncRecord> Channel<T> {
    fn new() -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot {
                items: Vec::new().into(),
                synced: false,
                generation: 0,
            })),
            listeners: ListenerSet::new(),
        }
    }

    fn items(&self) -> Arc<[T]> {
        Arc::clone(&self.slot.read().unwrap_or_else(PoisonError::into_inner).items)
    }

    fn synced(&self) -> bool {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).synced
    }

    /// Invalidates in-flight callbacks and empties the cache; returns the new generation.
    fn reset(&self) -> u64 {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.items = Vec::new().into();
        slot.synced = false;
        slot.generation
    }

    fn attach(
        &self,
        store: &dyn DocumentStore,
        account: &AccountId,
        generation: u64,
    ) -> StoreResult<Subscription> {
        let collection = CollectionRef::new(account, T::COLLECTION);
        let slot = Arc::clone(&self.slot);
        let listeners = self.listeners.clone();
        store.subscribe(
            &collection,
            Box::new(move |docs: &[Document]| apply_snapshot(&slot, &listeners, generation, docs)),
        )
    }

    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        let listener = Arc::new(listener);
        let registered = Arc::clone(&listener);
        let subscription = self.listeners.add(move |items: &[T]| registered(items));
        listener(&self.items()[..]);
        subscription
    }
}

fn apply_snapshot<T: SyncRecord>(
    slot: &RwLock<Slot<T>>,
    listeners: &ListenerSet<[T]>,
    generation: u64,
    docs: &[Document],
) {
    let mut items: Vec<T> = docs
        .iter()
        .filter_map(|doc| match T::decode(doc) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(
                    collection = T::COLLECTION.as_str(),
                    id = %doc.id,
                    error = %err,
                    "skipping malformed document"
                );
                None
            }
        })
        .collect();
    items.sort_by(T::cache_order);
    let items: Arc<[T]> = items.into();

    {
        let mut slot = slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.generation != generation {
            debug!(
                collection = T::COLLECTION.as_str(),
                "ignoring snapshot from a previous subscription"
            );
            return;
        }
        slot.items = Arc::clone(&items);
        slot.synced = true;
    }

    debug!(
        collection = T::COLLECTION.as_str(),
        count = items.len(),
        "snapshot applied"
    );
    listeners.notify(&items[..]);
}

/// Whether each collection has received its first snapshot since `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub people: bool,
    pub transactions: bool,
}

impl SyncStatus {
    pub fn is_ready(&self) -> bool {
        self.people && self.transactions
    }
}

pub struct SyncLayer {
    store: Arc<dyn DocumentStore>,
    account: RwLock<Option<AccountId>>,
    people: Channel<Person>,
    transactions: Channel<Transaction>,
    upstream: Mutex<Vec<Subscription>>,
}

impl SyncLayer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            account: RwLock::new(None),
            people: Channel::new(),
            transactions: Channel::new(),
            upstream: Mutex::new(Vec::new()),
        }
    }

    /// Subscribes to both collections of `account`, replacing any previous subscriptions.
    pub fn start(&self, account: &AccountId) -> StoreResult<()> {
        self.teardown();
        *self.account.write().unwrap_or_else(PoisonError::into_inner) = Some(account.clone());

        let people_generation = self.people.reset();
        let transactions_generation = self.transactions.reset();
        let attached = self
            .people
            .attach(self.store.as_ref(), account, people_generation)
            .and_then(|people| {
                self.transactions
                    .attach(self.store.as_ref(), account, transactions_generation)
                    .map(|transactions| vec![people, transactions])
            });

        match attached {
            Ok(subscriptions) => {
                *self.upstream.lock().unwrap_or_else(PoisonError::into_inner) = subscriptions;
                info!(account = %account, "sync started");
                Ok(())
            }
            Err(err) => {
                warn!(account = %account, error = %err, "sync failed to start");
                self.stop();
                Err(err)
            }
        }
    }

    /// Drops upstream subscriptions, clears both caches and tells listeners.
    pub fn stop(&self) {
        let was_running = self.teardown();
        let previous = self
            .account
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.people.reset();
        self.transactions.reset();
        if was_running || previous.is_some() {
            info!("sync stopped");
            self.people.listeners.notify(&[]);
            self.transactions.listeners.notify(&[]);
        }
    }

    fn teardown(&self) -> bool {
        let subscriptions =
            std::mem::take(&mut *self.upstream.lock().unwrap_or_else(PoisonError::into_inner));
        let was_running = !subscriptions.is_empty();
        drop(subscriptions);
        was_running
    }

    pub fn account(&self) -> Option<AccountId> {
        self.account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            people: self.people.synced(),
            transactions: self.transactions.synced(),
        }
    }

    /// People in creation order.
    pub fn people(&self) -> Arc<[Person]> {
        self.people.items()
    }

    pub fn transactions(&self) -> Arc<[Transaction]> {
        self.transactions.items()
    }

    pub fn person(&self, id: &PersonId) -> Option<Person> {
        self.people().iter().find(|p| &p.id == id).cloned()
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<Transaction> {
        self.transactions().iter().find(|t| &t.id == id).cloned()
    }

    /// Transactions of one person, in display order.
    pub fn transactions_for(&self, person_id: &PersonId) -> Vec<Transaction> {
        let mut items: Vec<Transaction> = self
            .transactions()
            .iter()
            .filter(|t| &t.person_id == person_id)
            .cloned()
            .collect();
        transaction::sort_for_display(&mut items);
        items
    }

    /// Registers a people listener; it is invoked immediately with the current cache.
    pub fn subscribe_people<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Person]) + Send + Sync + 'static,
    {
        self.people.subscribe(listener)
    }

    /// Registers a transaction listener; it is invoked immediately with the current cache.
    pub fn subscribe_transactions<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Transaction]) + Send + Sync + 'static,
    {
        self.transactions.subscribe(listener)
    }
}
