pub mod balance_service;
pub mod people_service;
pub mod transaction_service;

pub use balance_service::{BalanceService, BalanceStatus, PersonSummary};
pub use people_service::{ActiveSelector, PeopleService};
pub use transaction_service::{TransactionDraft, TransactionPatch, TransactionService};

use tracing::error;

use crate::{
    core::clock::Clock,
    domain::AccountId,
    errors::LedgerError,
    storage::{DocumentStore, StoreError},
    sync::SyncLayer,
};

/// Maximum number of people per account unless configured otherwise.
pub const DEFAULT_MAX_PEOPLE: usize = 50;

/// Everything a service call needs: the signed-in account, the store it writes to and the
/// synchronized caches it validates against.
pub struct ServiceContext<'a> {
    pub account: &'a AccountId,
    pub store: &'a dyn DocumentStore,
    pub sync: &'a SyncLayer,
    pub clock: &'a dyn Clock,
    pub selector: &'a ActiveSelector,
    pub max_people: usize,
}

/// Converts a failed store write into `StorageUnavailable`, logging it on the way.
fn write_failed(operation: &'static str) -> impl FnOnce(StoreError) -> LedgerError {
    move |err| {
        error!(operation, error = %err, "store write failed");
        LedgerError::from(err)
    }
}
