//! Ledger domain models: people, transactions, money and calendar dates.

pub mod amount;
pub mod dates;
pub mod person;
pub mod transaction;

pub use amount::Amount;
pub use person::{Person, PersonFields};
pub use transaction::{Transaction, TransactionFields, TransactionKind};

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(
    /// Store-assigned identifier of a person document.
    PersonId
);
opaque_id!(
    /// Store-assigned identifier of a transaction document.
    TransactionId
);
opaque_id!(
    /// Opaque account identifier supplied by the identity context; scopes every collection.
    AccountId
);
