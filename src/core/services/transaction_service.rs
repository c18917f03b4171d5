//! Business logic helpers for recording money given to and received from people.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    domain::{dates, Amount, PersonId, Transaction, TransactionFields, TransactionId, TransactionKind},
    errors::{LedgerError, LedgerResult},
    storage::{to_fields, CollectionRef, StoreError},
};

use super::{write_failed, ServiceContext};

/// Raw input for a new transaction, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub person_id: PersonId,
    pub amount: String,
    pub date: String,
    pub kind: String,
    pub note: Option<String>,
}

impl TransactionDraft {
    pub fn new(
        person_id: impl Into<PersonId>,
        amount: impl Into<String>,
        date: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            person_id: person_id.into(),
            amount: amount.into(),
            date: date.into(),
            kind: kind.into(),
            note: None,
        }
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Fields to change on an existing transaction; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    pub person_id: Option<PersonId>,
    pub amount: Option<String>,
    pub date: Option<String>,
    pub kind: Option<String>,
    pub note: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.person_id.is_none()
            && self.amount.is_none()
            && self.date.is_none()
            && self.kind.is_none()
            && self.note.is_none()
    }
}

/// Validated subset of fields written by an update.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    person_id: Option<PersonId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<TransactionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl TransactionChanges {
    fn apply_to(&self, transaction: &mut Transaction) {
        if let Some(person_id) = &self.person_id {
            transaction.person_id = person_id.clone();
        }
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if let Some(date) = self.date {
            transaction.date = date;
        }
        if let Some(kind) = self.kind {
            transaction.kind = kind;
        }
        if let Some(note) = &self.note {
            transaction.note = note.clone();
        }
    }
}

/// Provides validated CRUD helpers for ledger transactions.
pub struct TransactionService;

impl TransactionService {
    /// Validates and stores a new transaction, returning it with its assigned id.
    ///
    /// Checks run in order: person, amount, date, type.
    pub fn add(ctx: &ServiceContext<'_>, draft: TransactionDraft) -> LedgerResult<Transaction> {
        let validated = Self::validate_person(ctx, &draft.person_id)
            .and_then(|()| {
                Ok((
                    parse_amount(&draft.amount)?,
                    parse_date(&draft.date)?,
                    parse_kind(&draft.kind)?,
                ))
            })
            .inspect_err(Self::rejected)?;
        let (amount, date, kind) = validated;

        let fields = TransactionFields {
            person_id: draft.person_id,
            amount,
            date,
            kind,
            note: normalize_note(draft.note.as_deref()),
            created_at: ctx.clock.now(),
        };
        let id = ctx
            .store
            .create_doc(
                &CollectionRef::transactions(ctx.account),
                to_fields(&fields)?,
            )
            .map_err(write_failed("add transaction"))?;
        let transaction = Transaction::from_fields(TransactionId::new(id), fields);
        info!(
            transaction = %transaction.id,
            person = %transaction.person_id,
            kind = %transaction.kind,
            amount = %transaction.amount,
            "transaction added"
        );
        Ok(transaction)
    }

    /// Applies a partial update. Only the supplied fields are validated and written.
    pub fn update(
        ctx: &ServiceContext<'_>,
        id: &TransactionId,
        patch: TransactionPatch,
    ) -> LedgerResult<Transaction> {
        let mut transaction = ctx
            .sync
            .transaction(id)
            .ok_or_else(|| LedgerError::transaction_not_found(id.as_str()))
            .inspect_err(Self::rejected)?;
        let changes = Self::validate_patch(ctx, &patch).inspect_err(Self::rejected)?;
        if patch.is_empty() {
            return Ok(transaction);
        }

        let doc = CollectionRef::transactions(ctx.account).doc(id.as_str());
        ctx.store
            .update_doc(&doc, to_fields(&changes)?)
            .map_err(|err| match err {
                StoreError::MissingDocument(_) => LedgerError::transaction_not_found(id.as_str()),
                other => write_failed("update transaction")(other),
            })?;

        changes.apply_to(&mut transaction);
        info!(transaction = %id, "transaction updated");
        Ok(transaction)
    }

    pub fn remove(ctx: &ServiceContext<'_>, id: &TransactionId) -> LedgerResult<()> {
        if ctx.sync.transaction(id).is_none() {
            let err = LedgerError::transaction_not_found(id.as_str());
            Self::rejected(&err);
            return Err(err);
        }
        ctx.store
            .delete_doc(&CollectionRef::transactions(ctx.account).doc(id.as_str()))
            .map_err(write_failed("remove transaction"))?;
        info!(transaction = %id, "transaction removed");
        Ok(())
    }

    /// Transactions of one person, newest first.
    pub fn list_by_person(ctx: &ServiceContext<'_>, person_id: &PersonId) -> Vec<Transaction> {
        ctx.sync.transactions_for(person_id)
    }

    fn validate_person(ctx: &ServiceContext<'_>, person_id: &PersonId) -> LedgerResult<()> {
        if ctx.sync.person(person_id).is_some() {
            Ok(())
        } else {
            Err(LedgerError::PersonNotFound(person_id.to_string()))
        }
    }

    fn validate_patch(
        ctx: &ServiceContext<'_>,
        patch: &TransactionPatch,
    ) -> LedgerResult<TransactionChanges> {
        if let Some(person_id) = &patch.person_id {
            Self::validate_person(ctx, person_id)?;
        }
        Ok(TransactionChanges {
            person_id: patch.person_id.clone(),
            amount: patch.amount.as_deref().map(parse_amount).transpose()?,
            date: patch.date.as_deref().map(parse_date).transpose()?,
            kind: patch.kind.as_deref().map(parse_kind).transpose()?,
            note: patch.note.as_deref().map(|note| normalize_note(Some(note))),
        })
    }

    fn rejected(err: &LedgerError) {
        warn!(error = %err, "transaction change rejected");
    }
}

/// Parses an amount and requires it to be positive after rounding to cents.
pub fn parse_amount(raw: &str) -> LedgerResult<Amount> {
    Amount::parse(raw)
        .filter(|amount| amount.is_positive())
        .ok_or_else(|| LedgerError::InvalidAmount(raw.trim().to_string()))
}

pub fn parse_date(raw: &str) -> LedgerResult<NaiveDate> {
    dates::parse_date(raw).ok_or_else(|| LedgerError::InvalidDate(raw.trim().to_string()))
}

pub fn parse_kind(raw: &str) -> LedgerResult<TransactionKind> {
    TransactionKind::parse(raw).ok_or_else(|| LedgerError::InvalidType(raw.trim().to_string()))
}

fn normalize_note(note: Option<&str>) -> String {
    note.map(str::trim).unwrap_or_default().to_string()
}
