use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PersonId;

/// A counterparty the account owner exchanges money with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Persisted field layout of a person document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonFields {
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Person {
    pub fn from_fields(id: PersonId, fields: PersonFields) -> Self {
        Self {
            id,
            name: fields.name,
            created_at: fields.created_at,
            updated_at: fields.updated_at,
        }
    }

    /// Key used for duplicate detection.
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    pub fn matches_name(&self, candidate: &str) -> bool {
        self.name_key() == name_key(candidate)
    }
}

pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_string()
}

/// Case-insensitive comparison key (full Unicode lowercase mapping).
pub fn name_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Listing order: case-insensitive name, exact name, creation time, id.
pub fn display_order(a: &Person, b: &Person) -> Ordering {
    a.name_key()
        .cmp(&b.name_key())
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Storage order: creation time ascending, then id.
pub fn creation_order(a: &Person, b: &Person) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}
