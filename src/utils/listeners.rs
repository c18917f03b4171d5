//! Callback registries with deterministic unsubscribe.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Handle for a registered callback. Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Explicitly tears the subscription down. Equivalent to dropping it.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

struct Registry<A: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Callback<A>)>,
}

/// Ordered set of listeners notified synchronously in registration order.
///
/// The internal lock is released before any callback runs, so listeners may register,
/// unsubscribe or trigger further notifications from inside a callback.
pub struct ListenerSet<A: ?Sized> {
    inner: Arc<Mutex<Registry<A>>>,
}

impl<A: ?Sized> Clone for ListenerSet<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: ?Sized + 'static> Default for ListenerSet<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> ListenerSet<A> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub fn add<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, Arc::new(listener)));
            id
        };
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entries
                    .retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    pub fn notify(&self, value: &A) {
        for callback in self.callbacks() {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn callbacks(&self) -> Vec<Callback<A>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }
}
