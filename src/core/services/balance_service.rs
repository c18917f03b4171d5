use std::{collections::HashMap, fmt};

use serde::Serialize;

use crate::domain::{person, Amount, Person, PersonId, Transaction};

/// Direction of a person's balance from the account owner's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    WillReceive,
    Owes,
    Settled,
}

impl BalanceStatus {
    pub fn from_balance(balance: Amount) -> Self {
        if balance.is_positive() {
            BalanceStatus::WillReceive
        } else if balance.is_negative() {
            BalanceStatus::Owes
        } else {
            BalanceStatus::Settled
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BalanceStatus::WillReceive => "will receive",
            BalanceStatus::Owes => "owes",
            BalanceStatus::Settled => "settled",
        }
    }
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonSummary {
    pub person: Person,
    pub balance: Amount,
    pub status: BalanceStatus,
    pub transaction_count: usize,
}

/// Pure balance derivation over a transaction set. Nothing here is stored.
pub struct BalanceService;

impl BalanceService {
    /// `Σ GIVEN − Σ RECEIVED` over the person's transactions; zero for unknown people.
    pub fn balance(transactions: &[Transaction], person_id: &PersonId) -> Amount {
        transactions
            .iter()
            .filter(|t| &t.person_id == person_id)
            .map(Transaction::signed_amount)
            .sum()
    }

    pub fn status(transactions: &[Transaction], person_id: &PersonId) -> BalanceStatus {
        BalanceStatus::from_balance(Self::balance(transactions, person_id))
    }

    /// One summary per person, in listing order.
    pub fn summaries(people: &[Person], transactions: &[Transaction]) -> Vec<PersonSummary> {
        let mut totals: HashMap<&PersonId, (Amount, usize)> = HashMap::new();
        for transaction in transactions {
            let entry = totals
                .entry(&transaction.person_id)
                .or_insert((Amount::ZERO, 0));
            entry.0 = entry.0.saturating_add(transaction.signed_amount());
            entry.1 += 1;
        }

        let mut ordered: Vec<&Person> = people.iter().collect();
        ordered.sort_by(|a, b| person::display_order(a, b));
        ordered
            .into_iter()
            .map(|p| {
                let (balance, transaction_count) =
                    totals.get(&p.id).copied().unwrap_or((Amount::ZERO, 0));
                PersonSummary {
                    person: p.clone(),
                    balance,
                    status: BalanceStatus::from_balance(balance),
                    transaction_count,
                }
            })
            .collect()
    }

    /// Sum of every person's balance.
    pub fn net_total(transactions: &[Transaction]) -> Amount {
        transactions.iter().map(Transaction::signed_amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TransactionId, TransactionKind};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn txn(id: &str, person: &str, cents: i64, kind: TransactionKind, day: u32) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            person_id: PersonId::new(person),
            amount: Amount::from_cents(cents),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            kind,
            note: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    fn person(id: &str, name: &str) -> Person {
        Person {
            id: PersonId::new(id),
            name: name.into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn given_minus_received() {
        let transactions = vec![
            txn("t1", "alice", 10_000, TransactionKind::Given, 1),
            txn("t2", "alice", 4_000, TransactionKind::Received, 2),
            txn("t3", "bob", 999, TransactionKind::Received, 3),
        ];
        let alice = PersonId::new("alice");

        assert_eq!(
            BalanceService::balance(&transactions, &alice),
            Amount::from_cents(6_000)
        );
        assert_eq!(
            BalanceService::status(&transactions, &alice),
            BalanceStatus::WillReceive
        );
        assert_eq!(
            BalanceService::status(&transactions, &PersonId::new("bob")),
            BalanceStatus::Owes
        );
    }

    #[test]
    fn order_does_not_change_the_balance() {
        let mut transactions = vec![
            txn("t1", "alice", 1_235, TransactionKind::Given, 1),
            txn("t2", "alice", 1_235, TransactionKind::Given, 2),
            txn("t3", "alice", 2_470, TransactionKind::Received, 3),
        ];
        let alice = PersonId::new("alice");
        let forward = BalanceService::balance(&transactions, &alice);
        transactions.reverse();

        assert_eq!(forward, Amount::ZERO);
        assert_eq!(BalanceService::balance(&transactions, &alice), forward);
        assert_eq!(
            BalanceService::status(&transactions, &alice),
            BalanceStatus::Settled
        );
    }

    #[test]
    fn unknown_person_is_settled() {
        let transactions = vec![txn("t1", "alice", 100, TransactionKind::Given, 1)];
        let ghost = PersonId::new("ghost");
        assert_eq!(BalanceService::balance(&transactions, &ghost), Amount::ZERO);
        assert_eq!(
            BalanceService::status(&transactions, &ghost).to_string(),
            "settled"
        );
    }

    #[test]
    fn summaries_follow_listing_order() {
        let people = vec![person("p1", "carol"), person("p2", "Alice")];
        let transactions = vec![
            txn("t1", "p1", 500, TransactionKind::Received, 1),
            txn("t2", "p1", 200, TransactionKind::Given, 2),
        ];

        let summaries = BalanceService::summaries(&people, &transactions);

        assert_eq!(summaries[0].person.name, "Alice");
        assert_eq!(summaries[0].status, BalanceStatus::Settled);
        assert_eq!(summaries[1].balance, Amount::from_cents(-300));
        assert_eq!(summaries[1].transaction_count, 2);
        assert_eq!(
            BalanceService::net_total(&transactions),
            Amount::from_cents(-300)
        );
    }
}
