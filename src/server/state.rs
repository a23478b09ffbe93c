// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Shared handler state

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{BabError, Result};
use crate::manager::ModelManager;
use crate::storage::{PreferencesStore, RecordKind, RecordStore, Stores};

/// Cloned into every handler; all fields are shared.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ModelManager>,
    saved: Arc<Mutex<RecordStore>>,
    history: Arc<Mutex<RecordStore>>,
    preferences: Arc<Mutex<PreferencesStore>>,
}

impl AppState {
    pub fn new(manager: Arc<ModelManager>, stores: Stores) -> Self {
        Self {
            manager,
            saved: Arc::new(Mutex::new(stores.saved)),
            history: Arc::new(Mutex::new(stores.history)),
            preferences: Arc::new(Mutex::new(stores.preferences)),
        }
    }

    /// Run `f` against a record store on the blocking pool.
    pub async fn with_records<T, F>(&self, kind: RecordKind, f: F) -> Result<T>
    where
        F: FnOnce(&RecordStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = match kind {
            RecordKind::Saved => Arc::clone(&self.saved),
            RecordKind::History => Arc::clone(&self.history),
        };
        run_blocking(store, f).await
    }

    /// Run `f` against the preferences store on the blocking pool.
    pub async fn with_preferences<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&PreferencesStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(Arc::clone(&self.preferences), f).await
    }
}

async fn run_blocking<S, T, F>(store: Arc<Mutex<S>>, f: F) -> Result<T>
where
    S: Send + 'static,
    F: FnOnce(&S) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let guard = store.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    })
    .await
    .map_err(|e| BabError::Storage(format!("storage task failed: {}", e)))?
}
