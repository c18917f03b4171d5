mod common;

use common::{memory_session, record};
use people_ledger::{
    core::services::{BalanceStatus, TransactionDraft, TransactionPatch},
    domain::{dates, Amount},
    storage::{CollectionRef, DocumentStore},
    LedgerError,
};

#[test]
fn duplicate_names_are_case_insensitive() {
    let (_store, session) = memory_session();
    session.add_person("Alice").unwrap();

    for name in ["alice", "ALICE", "  aLiCe  "] {
        assert_eq!(
            session.add_person(name),
            Err(LedgerError::DuplicateName(name.trim().to_string()))
        );
    }
    assert_eq!(session.list_people().len(), 1);
}

#[test]
fn alice_scenario() {
    let (_store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();
    record(&session, &alice, "100.00", "2024-01-01", "GIVEN");
    record(&session, &alice, "40.00", "2024-01-02", "RECEIVED");

    assert_eq!(session.get_balance(&alice.id), Amount::from_cents(6_000));
    assert_eq!(session.get_balance(&alice.id).to_string(), "60.00");
    assert_eq!(session.get_status(&alice.id), BalanceStatus::WillReceive);
    assert_eq!(session.get_status(&alice.id).to_string(), "will receive");
}

#[test]
fn balance_ignores_insertion_order() {
    let entries = [
        ("12.345", "2024-01-03", "GIVEN"),
        ("0.01", "2024-01-01", "RECEIVED"),
        ("99.99", "2024-01-02", "GIVEN"),
        ("50", "2024-01-05", "RECEIVED"),
    ];

    let (_store, forward) = memory_session();
    let a = forward.add_person("Alice").unwrap();
    for (amount, date, kind) in entries {
        record(&forward, &a, amount, date, kind);
    }

    let (_store, backward) = memory_session();
    let b = backward.add_person("Alice").unwrap();
    for (amount, date, kind) in entries.iter().rev() {
        record(&backward, &b, amount, date, kind);
    }

    let expected = Amount::from_cents(1_235 - 1 + 9_999 - 5_000);
    assert_eq!(forward.get_balance(&a.id), expected);
    assert_eq!(backward.get_balance(&b.id), expected);
}

#[test]
fn rounding_is_consistent_in_sums() {
    let (_store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();
    let first = record(&session, &alice, "12.345", "2024-01-01", "GIVEN");
    record(&session, &alice, "12.345", "2024-01-02", "GIVEN");

    assert_eq!(first.amount.to_string(), "12.35");
    assert_eq!(session.get_balance(&alice.id).to_string(), "24.70");
}

#[test]
fn zero_and_negative_amounts_are_rejected() {
    let (_store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();

    for amount in ["0", "0.00", "-1", "abc", ""] {
        let err = session
            .add_transaction(TransactionDraft::new(
                alice.id.clone(),
                amount,
                "2024-01-01",
                "GIVEN",
            ))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)), "{amount}: {err:?}");
    }
    assert!(session.list_transactions(&alice.id).is_empty());
}

#[test]
fn dates_round_trip_between_forms() {
    let canonical = dates::display_to_canonical("05-03-2024").unwrap();
    assert_eq!(canonical, "2024-03-05");
    assert_eq!(dates::canonical_to_display(&canonical).unwrap(), "05-03-2024");

    let (store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();
    let txn = record(&session, &alice, "1", "05-03-2024", "GIVEN");

    let docs = store.documents(&CollectionRef::transactions(&common::account()));
    assert_eq!(docs[0].get("date").unwrap(), "2024-03-05");
    assert_eq!(txn.display_date(), "05-03-2024");
}

#[test]
fn impossible_dates_are_rejected() {
    let (_store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();
    for date in ["31-02-2024", "2023-02-29", "5-3-2024", "2024/03/05"] {
        let err = session
            .add_transaction(TransactionDraft::new(alice.id.clone(), "1", date, "GIVEN"))
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidDate(date.to_string()));
    }
}

#[test]
fn deleting_a_person_cascades() {
    let (store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();
    let bob = session.add_person("Bob").unwrap();
    record(&session, &alice, "10", "2024-01-01", "GIVEN");
    record(&session, &alice, "5", "2024-01-02", "RECEIVED");
    record(&session, &bob, "7", "2024-01-02", "GIVEN");

    session.remove_person(&alice.id).unwrap();

    assert!(session.list_transactions(&alice.id).is_empty());
    assert_eq!(session.get_balance(&alice.id), Amount::ZERO);
    assert_eq!(session.get_status(&alice.id), BalanceStatus::Settled);
    assert_eq!(session.list_transactions(&bob.id).len(), 1);
    let remaining = store.documents(&CollectionRef::transactions(&common::account()));
    assert_eq!(remaining.len(), 1);
    assert!(matches!(
        session.remove_person(&alice.id),
        Err(LedgerError::NotFound { .. })
    ));
}

#[test]
fn fifty_first_person_is_rejected() {
    let (_store, session) = memory_session();
    for i in 0..50 {
        session.add_person(&format!("Person {i:02}")).unwrap();
    }
    let before = session.list_people();

    assert_eq!(session.add_person("One Too Many"), Err(LedgerError::LimitReached(50)));
    assert_eq!(session.list_people(), before);
    assert_eq!(session.people_meta(), "50/50");
}

#[test]
fn transactions_list_newest_first() {
    let (_store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();
    let jan = record(&session, &alice, "1", "2024-01-01", "GIVEN");
    let mar_a = record(&session, &alice, "2", "2024-03-01", "GIVEN");
    let mar_b = record(&session, &alice, "3", "2024-03-01", "RECEIVED");

    let ids: Vec<_> = session
        .list_transactions(&alice.id)
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, [mar_b.id, mar_a.id, jan.id]);
}

#[test]
fn updates_can_move_a_transaction_to_another_person() {
    let (_store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();
    let bob = session.add_person("Bob").unwrap();
    let txn = record(&session, &alice, "30", "2024-01-01", "GIVEN");

    session
        .update_transaction(
            &txn.id,
            TransactionPatch {
                person_id: Some(bob.id.clone()),
                kind: Some("received".into()),
                ..TransactionPatch::default()
            },
        )
        .unwrap();

    assert_eq!(session.get_balance(&alice.id), Amount::ZERO);
    assert_eq!(session.get_balance(&bob.id), Amount::from_cents(-3_000));
    assert_eq!(session.get_status(&bob.id), BalanceStatus::Owes);
}

#[test]
fn active_person_follows_removal() {
    let (_store, session) = memory_session();
    let alice = session.add_person("Alice").unwrap();
    let bob = session.add_person("Bob").unwrap();
    session.set_active_person(&alice.id).unwrap();

    session.remove_person(&alice.id).unwrap();

    assert_eq!(session.get_active_person().map(|p| p.id), Some(bob.id));
}
