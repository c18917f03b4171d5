#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use people_ledger::{
    core::{services::TransactionDraft, SteppingClock},
    domain::{AccountId, Person, Transaction},
    storage::{DocumentStore, MemoryStore},
    LedgerSession,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub const ACCOUNT: &str = "tester";

/// Creates a unique directory that outlives the calling test.
pub fn temp_home() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn account() -> AccountId {
    AccountId::new(ACCOUNT)
}

/// Session over `store` with a deterministic clock, signed in to [`ACCOUNT`].
pub fn signed_in_session(store: Arc<dyn DocumentStore>) -> LedgerSession {
    let clock = SteppingClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    let session = LedgerSession::new(store).with_clock(Arc::new(clock));
    session.sign_in(&account()).expect("sign in");
    session
}

pub fn memory_session() -> (Arc<MemoryStore>, LedgerSession) {
    let store = Arc::new(MemoryStore::new());
    let session = signed_in_session(store.clone());
    (store, session)
}

pub fn record(
    session: &LedgerSession,
    person: &Person,
    amount: &str,
    date: &str,
    kind: &str,
) -> Transaction {
    session
        .add_transaction(TransactionDraft::new(person.id.clone(), amount, date, kind))
        .expect("record transaction")
}
