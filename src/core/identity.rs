//! Observable source of the signed-in account.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::{
    domain::AccountId,
    utils::listeners::{ListenerSet, Subscription},
};

/// Holds the current account (or none) and notifies observers when it changes.
///
/// Clones share state, so a clone handed to a session observes the same sign-ins.
#[derive(Clone, Default)]
pub struct IdentityContext {
    current: Arc<RwLock<Option<AccountId>>>,
    listeners: ListenerSet<Option<AccountId>>,
}

impl IdentityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(account: impl Into<AccountId>) -> Self {
        let identity = Self::new();
        identity.sign_in(account);
        identity
    }

    pub fn current(&self) -> Option<AccountId> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sign_in(&self, account: impl Into<AccountId>) {
        self.set(Some(account.into()));
    }

    pub fn sign_out(&self) {
        self.set(None);
    }

    /// Registers `listener` and invokes it immediately with the current account.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&AccountId>) + Send + Sync + 'static,
    {
        let listener = Arc::new(listener);
        let registered = Arc::clone(&listener);
        let subscription = self
            .listeners
            .add(move |account: &Option<AccountId>| registered(account.as_ref()));
        listener(self.current().as_ref());
        subscription
    }

    fn set(&self, account: Option<AccountId>) {
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            if *current == account {
                return;
            }
            current.clone_from(&account);
        }
        match &account {
            Some(id) => info!(account = %id, "signed in"),
            None => info!("signed out"),
        }
        self.listeners.notify(&account);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn subscribers_see_current_account_then_changes() {
        let identity = IdentityContext::signed_in("alice");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _subscription = {
            let seen = Arc::clone(&seen);
            identity.subscribe(move |account| {
                seen.lock()
                    .unwrap()
                    .push(account.map(|id| id.as_str().to_string()))
            })
        };

        identity.sign_in("bob");
        identity.sign_out();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("alice".to_string()), Some("bob".to_string()), None]
        );
    }

    #[test]
    fn repeated_sign_in_does_not_notify() {
        let identity = IdentityContext::signed_in("alice");
        let calls = Arc::new(Mutex::new(0));
        let _subscription = {
            let calls = Arc::clone(&calls);
            identity.subscribe(move |_| *calls.lock().unwrap() += 1)
        };

        identity.sign_in("alice");

        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
