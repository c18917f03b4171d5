//! Person registry: creation, renames, cascading removal and the active-person selector.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    domain::{
        person::{self, normalize_name},
        Person, PersonFields, PersonId,
    },
    errors::{LedgerError, LedgerResult},
    storage::{to_fields, CollectionRef},
};

use super::{write_failed, ServiceContext};

/// Per-session pointer at the person the user is working with.
#[derive(Debug, Default)]
pub struct ActiveSelector {
    current: Mutex<Option<PersonId>>,
}

impl ActiveSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<PersonId> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, id: Option<PersonId>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = id;
    }

    pub fn clear(&self) {
        self.set(None);
    }

    /// Resolves the selection against `people`, clearing it when the person is gone.
    pub fn resolve(&self, people: &[Person]) -> Option<Person> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let id = current.as_ref()?;
        match people.iter().find(|p| &p.id == id) {
            Some(found) => Some(found.clone()),
            None => {
                debug!(person = %id, "clearing stale active person");
                *current = None;
                None
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenameFields<'a> {
    name: &'a str,
    updated_at: DateTime<Utc>,
}

pub struct PeopleService;

impl PeopleService {
    pub fn add(ctx: &ServiceContext<'_>, name: &str) -> LedgerResult<Person> {
        let name = normalize_name(name);
        let people = ctx.sync.people();
        Self::require_name(&name).inspect_err(Self::rejected)?;
        if people.len() >= ctx.max_people {
            warn!(max = ctx.max_people, "person limit reached");
            return Err(LedgerError::LimitReached(ctx.max_people));
        }
        Self::reject_duplicate(&people, None, &name).inspect_err(Self::rejected)?;

        let fields = PersonFields {
            name,
            created_at: ctx.clock.now(),
            updated_at: None,
        };
        let id = ctx
            .store
            .create_doc(&CollectionRef::people(ctx.account), to_fields(&fields)?)
            .map_err(write_failed("add person"))?;
        let person = Person::from_fields(PersonId::new(id), fields);
        info!(person = %person.id, name = %person.name, "person added");
        Ok(person)
    }

    /// Renames a person. Checks run in order: existence, empty name, duplicate name.
    pub fn rename(ctx: &ServiceContext<'_>, id: &PersonId, name: &str) -> LedgerResult<Person> {
        let people = ctx.sync.people();
        let existing = people
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| LedgerError::person_not_found(id.as_str()))
            .inspect_err(Self::rejected)?;
        let name = normalize_name(name);
        Self::require_name(&name)
            .and_then(|()| Self::reject_duplicate(&people, Some(id), &name))
            .inspect_err(Self::rejected)?;

        let updated_at = ctx.clock.now();
        let fields = to_fields(&RenameFields {
            name: &name,
            updated_at,
        })?;
        ctx.store
            .update_doc(&CollectionRef::people(ctx.account).doc(id.as_str()), fields)
            .map_err(write_failed("rename person"))?;

        info!(person = %id, name = %name, "person renamed");
        Ok(Person {
            name,
            updated_at: Some(updated_at),
            ..existing.clone()
        })
    }

    /// Deletes a person and every transaction pointing at it in one atomic batch.
    pub fn remove(ctx: &ServiceContext<'_>, id: &PersonId) -> LedgerResult<()> {
        let people = ctx.sync.people();
        if !people.iter().any(|p| &p.id == id) {
            let err = LedgerError::person_not_found(id.as_str());
            Self::rejected(&err);
            return Err(err);
        }

        // Linked transactions are matched at commit time, so one written by another client
        // after this call started is removed too.
        let mut batch = ctx.store.batch();
        batch
            .delete_where(
                &CollectionRef::transactions(ctx.account),
                "personId",
                Value::String(id.as_str().to_string()),
            )
            .delete(&CollectionRef::people(ctx.account).doc(id.as_str()));
        ctx.store
            .commit(batch)
            .map_err(write_failed("remove person"))?;

        if ctx.selector.get().as_ref() == Some(id) {
            let next = people.iter().find(|p| &p.id != id).map(|p| p.id.clone());
            debug!(next = ?next, "moving active person after removal");
            ctx.selector.set(next);
        }
        info!(person = %id, "person and linked transactions removed");
        Ok(())
    }

    pub fn get_active(ctx: &ServiceContext<'_>) -> Option<Person> {
        ctx.selector.resolve(&ctx.sync.people())
    }

    pub fn set_active(ctx: &ServiceContext<'_>, id: &PersonId) -> LedgerResult<Person> {
        match ctx.sync.person(id) {
            Some(found) => {
                ctx.selector.set(Some(found.id.clone()));
                debug!(person = %id, "active person set");
                Ok(found)
            }
            None => {
                ctx.selector.clear();
                let err = LedgerError::person_not_found(id.as_str());
                Self::rejected(&err);
                Err(err)
            }
        }
    }

    /// People in listing order.
    pub fn list(ctx: &ServiceContext<'_>) -> Vec<Person> {
        let mut people = ctx.sync.people().to_vec();
        people.sort_by(person::display_order);
        people
    }

    fn require_name(candidate: &str) -> LedgerResult<()> {
        if candidate.is_empty() {
            Err(LedgerError::EmptyName)
        } else {
            Ok(())
        }
    }

    fn reject_duplicate(
        people: &[Person],
        exclude: Option<&PersonId>,
        candidate: &str,
    ) -> LedgerResult<()> {
        let duplicate = people
            .iter()
            .any(|p| p.matches_name(candidate) && exclude.map_or(true, |id| &p.id != id));
        if duplicate {
            Err(LedgerError::DuplicateName(candidate.to_string()))
        } else {
            Ok(())
        }
    }

    fn rejected(err: &LedgerError) {
        warn!(error = %err, "person change rejected");
    }
}
