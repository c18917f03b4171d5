#![doc(test(attr(deny(warnings))))]

//! People Ledger tracks money given to and received from a set of people and derives a
//! running balance per person, kept in sync across every session sharing a document store.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod storage;
pub mod sync;
pub mod utils;

pub use crate::core::{IdentityContext, LedgerSession};
pub use errors::{LedgerError, LedgerResult};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing (honoring the configured `log_filter`) and emits a startup log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        let filter = config::ConfigManager::new()
            .load()
            .ok()
            .and_then(|config| config.log_filter);
        utils::init_tracing(filter.as_deref());
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "People Ledger initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
