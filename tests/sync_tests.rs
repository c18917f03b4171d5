mod common;

use std::sync::{Arc, Mutex};

use common::{memory_session, record, signed_in_session};
use people_ledger::{
    domain::{AccountId, Amount},
    storage::{CollectionRef, DocumentStore, MemoryStore},
    IdentityContext, LedgerError, LedgerSession,
};
use serde_json::json;

#[test]
fn sessions_sharing_a_store_see_each_others_writes() {
    let store = Arc::new(MemoryStore::new());
    let phone = signed_in_session(store.clone());
    let laptop = signed_in_session(store.clone());

    let alice = phone.add_person("Alice").unwrap();
    record(&laptop, &alice, "25", "2024-02-01", "GIVEN");

    assert_eq!(laptop.list_people().len(), 1);
    assert_eq!(phone.get_balance(&alice.id), Amount::from_cents(2_500));
    assert_eq!(
        laptop.add_person("ALICE"),
        Err(LedgerError::DuplicateName("ALICE".into()))
    );
}

#[test]
fn concurrent_renames_end_with_last_write() {
    let store = Arc::new(MemoryStore::new());
    let first = Arc::new(signed_in_session(store.clone()));
    let second = Arc::new(signed_in_session(store.clone()));
    let alice = first.add_person("Alice").unwrap();

    let handles: Vec<_> = [(first.clone(), "Alicia"), (second.clone(), "Ally")]
        .into_iter()
        .map(|(session, name)| {
            let id = alice.id.clone();
            std::thread::spawn(move || session.rename_person(&id, name).map(|p| p.name))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let docs = store.documents(&CollectionRef::people(&common::account()));
    assert_eq!(docs.len(), 1);
    let stored = docs[0].get("name").unwrap().as_str().unwrap().to_string();
    assert!(stored == "Alicia" || stored == "Ally", "unexpected {stored}");
    assert_eq!(first.list_people()[0].name, stored);
    assert_eq!(second.list_people()[0].name, stored);
}

#[test]
fn listeners_get_current_snapshot_then_every_change() {
    let (_store, session) = memory_session();
    session.add_person("Alice").unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let subscription = {
        let seen = Arc::clone(&seen);
        session.subscribe_people(move |people| {
            seen.lock()
                .unwrap()
                .push(people.iter().map(|p| p.name.clone()).collect::<Vec<_>>())
        })
    };
    session.add_person("Bob").unwrap();
    subscription.unsubscribe();
    session.add_person("Carol").unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![vec!["Alice".to_string()], vec!["Alice".into(), "Bob".into()]]
    );
}

#[test]
fn listeners_may_read_the_session_reentrantly() {
    let (_store, session) = memory_session();
    let session = Arc::new(session);
    let alice = session.add_person("Alice").unwrap();

    let balances = Arc::new(Mutex::new(Vec::new()));
    let _subscription = {
        let weak = Arc::downgrade(&session);
        let balances = Arc::clone(&balances);
        let id = alice.id.clone();
        session.subscribe_transactions(move |_| {
            if let Some(session) = weak.upgrade() {
                balances.lock().unwrap().push(session.get_balance(&id));
            }
        })
    };
    record(&session, &alice, "10", "2024-01-01", "GIVEN");

    assert_eq!(
        *balances.lock().unwrap(),
        vec![Amount::ZERO, Amount::from_cents(1_000)]
    );
}

#[test]
fn malformed_documents_do_not_hide_valid_ones() {
    let (store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();
    store
        .create_doc(
            &CollectionRef::transactions(&common::account()),
            json!({"personId": alice.id.as_str(), "amount": "lots"})
                .as_object()
                .unwrap()
                .clone(),
        )
        .unwrap();
    record(&session, &alice, "5", "2024-01-01", "GIVEN");

    assert_eq!(session.list_transactions(&alice.id).len(), 1);
    assert_eq!(session.get_balance(&alice.id), Amount::from_cents(500));
}

#[test]
fn outage_reports_storage_unavailable_and_applies_nothing() {
    let (store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();
    record(&session, &alice, "10", "2024-01-01", "GIVEN");

    store.set_outage(Some("backend offline"));
    let err = session.remove_person(&alice.id).unwrap_err();
    assert_eq!(
        err,
        LedgerError::StorageUnavailable("store unavailable: backend offline".into())
    );
    let err = session.add_person("Bob").unwrap_err();
    assert!(matches!(err, LedgerError::StorageUnavailable(_)));
    store.set_outage(None);

    assert_eq!(session.list_people().len(), 1);
    assert_eq!(session.list_transactions(&alice.id).len(), 1);
}

#[test]
fn validation_errors_win_over_outages() {
    let (store, session) = memory_session();
    session.add_person("Alice").unwrap();
    store.set_outage(Some("down"));

    assert_eq!(session.add_person(" "), Err(LedgerError::EmptyName));
    assert_eq!(
        session.add_person("alice"),
        Err(LedgerError::DuplicateName("alice".into()))
    );
}

#[test]
fn accounts_are_isolated() {
    let store = Arc::new(MemoryStore::new());
    let session = signed_in_session(store.clone());
    session.add_person("Alice").unwrap();

    session.sign_in(&AccountId::new("someone-else")).unwrap();
    assert!(session.list_people().is_empty());
    session.add_person("Alice").unwrap();

    assert_eq!(
        store
            .documents(&CollectionRef::people(&AccountId::new("someone-else")))
            .len(),
        1
    );
    assert_eq!(store.subscriber_count(), 2);
}

#[test]
fn following_identity_signs_in_and_out() {
    let store = Arc::new(MemoryStore::new());
    let identity = IdentityContext::new();
    let session = Arc::new(LedgerSession::new(store.clone()));
    session.follow(&identity);

    assert_eq!(session.add_person("Alice"), Err(LedgerError::SignedOut));

    identity.sign_in("alice-account");
    let person = session.add_person("Alice").unwrap();
    session.set_active_person(&person.id).unwrap();
    assert!(session.sync_status().is_ready());

    identity.sign_out();
    assert!(session.list_people().is_empty());
    assert!(session.get_active_person().is_none());
    assert_eq!(store.subscriber_count(), 0);

    identity.sign_in("alice-account");
    assert_eq!(session.list_people().len(), 1);
}
