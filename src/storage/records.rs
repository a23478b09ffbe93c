// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Saved translations and translation history
//!
//! Both stores share one schema and differ only in table name and file.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BabError, Result};

/// A stored translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: String,
    pub source_text: String,
    pub translated_text: String,
    pub source_lang: String,
    pub target_lang: String,
    /// ISO 8601, UTC
    pub timestamp: String,
}

impl TranslationRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source_text: row.get(1)?,
            translated_text: row.get(2)?,
            source_lang: row.get(3)?,
            target_lang: row.get(4)?,
            timestamp: row.get(5)?,
        })
    }
}

/// Which collection a store holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Saved,
    History,
}

impl RecordKind {
    fn table(&self) -> &'static str {
        match self {
            RecordKind::Saved => "saved_translations",
            RecordKind::History => "history",
        }
    }
}

/// SQLite-backed translation record store
pub struct RecordStore {
    conn: Connection,
    kind: RecordKind,
}

pub type SavedTranslationStore = RecordStore;
pub type HistoryStore = RecordStore;

const COLUMNS: &str = "id, source_text, translated_text, source_lang, target_lang, timestamp";

impl RecordStore {
    /// Open or create a store at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P, kind: RecordKind) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| {
            BabError::Storage(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Self::with_connection(conn, kind)
    }

    pub fn open_in_memory(kind: RecordKind) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, kind)
    }

    fn with_connection(conn: Connection, kind: RecordKind) -> Result<Self> {
        let store = Self { conn, kind };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let table = self.kind.table();
        self.conn
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        id TEXT PRIMARY KEY,
                        source_text TEXT NOT NULL,
                        translated_text TEXT NOT NULL,
                        source_lang TEXT NOT NULL,
                        target_lang TEXT NOT NULL,
                        timestamp TEXT NOT NULL
                    )"
                ),
                [],
            )
            .map_err(|e| BabError::Storage(format!("Failed to create {}: {}", table, e)))?;
        Ok(())
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn create(
        &self,
        source_text: &str,
        translated_text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationRecord> {
        let record = TranslationRecord {
            id: Uuid::new_v4().to_string(),
            source_text: source_text.to_string(),
            translated_text: translated_text.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        };

        self.conn.execute(
            &format!(
                "INSERT INTO {} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                self.kind.table()
            ),
            params![
                record.id,
                record.source_text,
                record.translated_text,
                record.source_lang,
                record.target_lang,
                record.timestamp
            ],
        )?;
        Ok(record)
    }

    /// Record with the same text and language pair, if any.
    pub fn find_by_content(
        &self,
        source_text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Option<TranslationRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM {}
                     WHERE source_text = ?1 AND source_lang = ?2 AND target_lang = ?3",
                    self.kind.table()
                ),
                params![source_text, source_lang, target_lang],
                TranslationRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// The record with the same text and language pair, created if absent.
    pub fn find_or_create(
        &self,
        source_text: &str,
        translated_text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationRecord> {
        if let Some(existing) = self.find_by_content(source_text, source_lang, target_lang)? {
            return Ok(existing);
        }
        self.create(source_text, translated_text, source_lang, target_lang)
    }

    /// All records, newest first.
    pub fn list_all(&self) -> Result<Vec<TranslationRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM {} ORDER BY timestamp DESC, rowid DESC",
            self.kind.table()
        ))?;
        let records = stmt
            .query_map([], TranslationRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// True if a record was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.kind.table()),
            params![id],
        )?;
        Ok(removed > 0)
    }

    /// Remove everything, returning the number of records removed.
    pub fn clear_all(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {}", self.kind.table()), [])?;
        Ok(removed)
    }
}
