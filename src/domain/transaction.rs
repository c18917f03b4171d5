use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{amount::Amount, dates, PersonId, TransactionId};

/// Direction of a transaction from the account owner's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Money the owner gave to the person; raises the balance.
    Given,
    /// Money the owner received from the person; lowers the balance.
    Received,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Given => "GIVEN",
            TransactionKind::Received => "RECEIVED",
        }
    }

    /// Accepts `GIVEN`/`RECEIVED`, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("GIVEN") {
            Some(TransactionKind::Given)
        } else if trimmed.eq_ignore_ascii_case("RECEIVED") {
            Some(TransactionKind::Received)
        } else {
            None
        }
    }

    pub fn apply(self, amount: Amount) -> Amount {
        match self {
            TransactionKind::Given => amount,
            TransactionKind::Received => -amount,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionKind::parse(s).ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub person_id: PersonId,
    pub amount: Amount,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted field layout of a transaction document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFields {
    pub person_id: PersonId,
    pub amount: Amount,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn from_fields(id: TransactionId, fields: TransactionFields) -> Self {
        Self {
            id,
            person_id: fields.person_id,
            amount: fields.amount,
            date: fields.date,
            kind: fields.kind,
            note: fields.note,
            created_at: fields.created_at,
        }
    }

    /// Contribution of this transaction to the person's balance.
    pub fn signed_amount(&self) -> Amount {
        self.kind.apply(self.amount)
    }

    pub fn display_date(&self) -> String {
        dates::to_display(self.date)
    }
}

/// Display order: newest date first, then newest created first, then id descending.
pub fn display_order(a: &Transaction, b: &Transaction) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

pub fn sort_for_display(transactions: &mut [Transaction]) {
    transactions.sort_by(display_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn txn(id: &str, date: (i32, u32, u32), created_second: u32) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            person_id: PersonId::new("p1"),
            amount: Amount::from_cents(1_000),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            kind: TransactionKind::Given,
            note: String::new(),
            created_at: Utc
                .with_ymd_and_hms(2024, 6, 1, 12, 0, created_second)
                .unwrap(),
        }
    }

    #[test]
    fn kind_parsing_is_closed() {
        assert_eq!(TransactionKind::parse("GIVEN"), Some(TransactionKind::Given));
        assert_eq!(
            TransactionKind::parse(" received "),
            Some(TransactionKind::Received)
        );
        assert_eq!(TransactionKind::parse("LOANED"), None);
        assert_eq!(TransactionKind::parse(""), None);
    }

    #[test]
    fn display_order_uses_date_then_creation_time() {
        let mut items = vec![
            txn("a", (2024, 1, 1), 0),
            txn("b", (2024, 1, 2), 0),
            txn("c", (2024, 1, 1), 5),
        ];
        sort_for_display(&mut items);
        let ids: Vec<_> = items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn fields_use_wire_layout() {
        let item = txn("t1", (2024, 3, 5), 0);
        let fields = TransactionFields {
            person_id: item.person_id,
            amount: item.amount,
            date: item.date,
            kind: TransactionKind::Received,
            note: item.note,
            created_at: item.created_at,
        };
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["personId"], "p1");
        assert_eq!(json["amount"], 10.0);
        assert_eq!(json["date"], "2024-03-05");
        assert_eq!(json["type"], "RECEIVED");
        assert_eq!(json["note"], "");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn received_amounts_count_against_the_balance() {
        let mut item = txn("t1", (2024, 3, 5), 0);
        assert_eq!(item.signed_amount(), Amount::from_cents(1_000));
        item.kind = TransactionKind::Received;
        assert_eq!(item.signed_amount(), Amount::from_cents(-1_000));
    }
}
