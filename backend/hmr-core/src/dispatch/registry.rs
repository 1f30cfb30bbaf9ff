//! Module path -> update callback mapping.
//!
//! Consumers register with [`CallbackRegistry::accept`] while their module
//! initialises; the dispatcher only reads. Entries are never removed: a full
//! reload throws the whole client (and its registry) away instead.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

/// Invoked with the freshly loaded module.
pub type UpdateCallback<M> = Arc<dyn Fn(M) + Send + Sync>;

/// Shared registry handle. All clones see the same entries.
pub struct CallbackRegistry<M> {
    callbacks: Arc<RwLock<HashMap<String, UpdateCallback<M>>>>,
}

impl<M> CallbackRegistry<M> {
    pub fn new() -> Self {
        Self {
            callbacks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers `callback` for updates to `path`.
    ///
    /// The path is not validated. Registering the same path again replaces
    /// the earlier callback.
    pub fn accept<F>(&self, path: impl Into<String>, callback: F)
    where
        F: Fn(M) + Send + Sync + 'static,
    {
        let path = path.into();
        let mut callbacks = self
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if callbacks.insert(path.clone(), Arc::new(callback)).is_some() {
            debug!("Replaced update callback for {path}");
        } else {
            debug!("Accepted updates for {path}");
        }
    }

    /// Callback registered for `path`, cloned out so no lock is held while it runs.
    pub fn get(&self, path: &str) -> Option<UpdateCallback<M>> {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<M> Clone for CallbackRegistry<M> {
    fn clone(&self) -> Self {
        Self {
            callbacks: Arc::clone(&self.callbacks),
        }
    }
}

impl<M> Default for CallbackRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}
