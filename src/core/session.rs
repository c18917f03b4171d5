//! UI-facing facade over the registries, the balance engine and the sync layer.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{error, info};

use crate::{
    core::{
        clock::{Clock, SystemClock},
        identity::IdentityContext,
        services::{
            ActiveSelector, BalanceService, BalanceStatus, PeopleService, PersonSummary,
            ServiceContext, TransactionDraft, TransactionPatch, TransactionService,
            DEFAULT_MAX_PEOPLE,
        },
    },
    domain::{AccountId, Amount, Person, PersonId, Transaction, TransactionId},
    errors::{LedgerError, LedgerResult},
    storage::DocumentStore,
    sync::{SyncLayer, SyncStatus},
    utils::listeners::Subscription,
};

/// One client's view of a ledger account.
///
/// Reads are served from the synchronized caches and never fail: while signed out they
/// return empty collections. Mutations validate against the caches, then write through
/// the store; the resulting snapshot reaches every session sharing that store.
pub struct LedgerSession {
    store: Arc<dyn DocumentStore>,
    sync: SyncLayer,
    clock: Arc<dyn Clock>,
    selector: ActiveSelector,
    max_people: usize,
    identity: Mutex<Option<Subscription>>,
}

impl LedgerSession {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            sync: SyncLayer::new(Arc::clone(&store)),
            store,
            clock: Arc::new(SystemClock),
            selector: ActiveSelector::new(),
            max_people: DEFAULT_MAX_PEOPLE,
            identity: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_people(mut self, max_people: usize) -> Self {
        self.max_people = max_people;
        self
    }

    /// Binds the session to `account`, replacing any previous binding.
    pub fn sign_in(&self, account: &AccountId) -> LedgerResult<()> {
        if self.sync.account().as_ref() != Some(account) {
            self.selector.clear();
        }
        self.sync.start(account).map_err(|err| {
            error!(account = %account, error = %err, "could not start sync");
            LedgerError::from(err)
        })?;
        info!(account = %account, "session signed in");
        Ok(())
    }

    /// Drops the account binding, clearing caches and the active person.
    pub fn sign_out(&self) {
        self.sync.stop();
        self.selector.clear();
    }

    /// Keeps the session signed in to whatever account `identity` reports.
    pub fn follow(self: &Arc<Self>, identity: &IdentityContext) {
        let session: Weak<Self> = Arc::downgrade(self);
        let subscription = identity.subscribe(move |account| {
            let Some(session) = session.upgrade() else {
                return;
            };
            match account {
                Some(account) => {
                    if let Err(err) = session.sign_in(account) {
                        error!(account = %account, error = %err, "failed to follow sign-in");
                    }
                }
                None => session.sign_out(),
            }
        });
        *self.identity.lock().unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    pub fn account(&self) -> Option<AccountId> {
        self.sync.account()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn max_people(&self) -> usize {
        self.max_people
    }

    /// People in listing order. Empty while signed out.
    pub fn list_people(&self) -> Vec<Person> {
        self.with_context(|ctx| Ok(PeopleService::list(ctx)))
            .unwrap_or_default()
    }

    /// People in creation order.
    pub fn people_by_creation(&self) -> Vec<Person> {
        self.sync.people().to_vec()
    }

    /// `count/max` line shown above people listings.
    pub fn people_meta(&self) -> String {
        format!("{}/{}", self.sync.people().len(), self.max_people)
    }

    pub fn person(&self, id: &PersonId) -> Option<Person> {
        self.sync.person(id)
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<Transaction> {
        self.sync.transaction(id)
    }

    pub fn list_transactions(&self, person_id: &PersonId) -> Vec<Transaction> {
        self.sync.transactions_for(person_id)
    }

    pub fn get_balance(&self, person_id: &PersonId) -> Amount {
        BalanceService::balance(&self.sync.transactions(), person_id)
    }

    pub fn get_status(&self, person_id: &PersonId) -> BalanceStatus {
        BalanceService::status(&self.sync.transactions(), person_id)
    }

    pub fn summaries(&self) -> Vec<PersonSummary> {
        BalanceService::summaries(&self.sync.people(), &self.sync.transactions())
    }

    pub fn net_total(&self) -> Amount {
        BalanceService::net_total(&self.sync.transactions())
    }

    pub fn get_active_person(&self) -> Option<Person> {
        self.selector.resolve(&self.sync.people())
    }

    pub fn set_active_person(&self, id: &PersonId) -> LedgerResult<Person> {
        self.with_context(|ctx| PeopleService::set_active(ctx, id))
    }

    pub fn clear_active_person(&self) {
        self.selector.clear();
    }

    pub fn add_person(&self, name: &str) -> LedgerResult<Person> {
        self.with_context(|ctx| PeopleService::add(ctx, name))
    }

    pub fn rename_person(&self, id: &PersonId, name: &str) -> LedgerResult<Person> {
        self.with_context(|ctx| PeopleService::rename(ctx, id, name))
    }

    pub fn remove_person(&self, id: &PersonId) -> LedgerResult<()> {
        self.with_context(|ctx| PeopleService::remove(ctx, id))
    }

    pub fn add_transaction(&self, draft: TransactionDraft) -> LedgerResult<Transaction> {
        self.with_context(|ctx| TransactionService::add(ctx, draft))
    }

    pub fn update_transaction(
        &self,
        id: &TransactionId,
        patch: TransactionPatch,
    ) -> LedgerResult<Transaction> {
        self.with_context(|ctx| TransactionService::update(ctx, id, patch))
    }

    pub fn remove_transaction(&self, id: &TransactionId) -> LedgerResult<()> {
        self.with_context(|ctx| TransactionService::remove(ctx, id))
    }

    /// Registers a people listener; it receives the current snapshot right away.
    pub fn subscribe_people<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Person]) + Send + Sync + 'static,
    {
        self.sync.subscribe_people(listener)
    }

    /// Registers a transaction listener; it receives the current snapshot right away.
    pub fn subscribe_transactions<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Transaction]) + Send + Sync + 'static,
    {
        self.sync.subscribe_transactions(listener)
    }

    fn with_context<T>(
        &self,
        operation: impl FnOnce(&ServiceContext<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let account = self.sync.account().ok_or(LedgerError::SignedOut)?;
        let ctx = ServiceContext {
            account: &account,
            store: self.store.as_ref(),
            sync: &self.sync,
            clock: self.clock.as_ref(),
            selector: &self.selector,
            max_people: self.max_people,
        };
        operation(&ctx)
    }
}
