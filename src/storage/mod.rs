// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Local SQLite stores
//!
//! - `saved_translations.db`: translations the user chose to keep
//! - `history.db`: every successful translation, plus user preferences

pub mod preferences;
pub mod records;

pub use preferences::PreferencesStore;
pub use records::{HistoryStore, RecordKind, RecordStore, SavedTranslationStore, TranslationRecord};

use crate::config::Settings;
use crate::error::Result;

/// The three stores at their default locations.
pub struct Stores {
    pub saved: SavedTranslationStore,
    pub history: HistoryStore,
    pub preferences: PreferencesStore,
}

impl Stores {
    pub fn open_default() -> Result<Self> {
        Ok(Self {
            saved: RecordStore::open(Settings::saved_db_path(), RecordKind::Saved)?,
            history: RecordStore::open(Settings::history_db_path(), RecordKind::History)?,
            preferences: PreferencesStore::open(Settings::history_db_path())?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            saved: RecordStore::open_in_memory(RecordKind::Saved)?,
            history: RecordStore::open_in_memory(RecordKind::History)?,
            preferences: PreferencesStore::open_in_memory()?,
        })
    }
}
