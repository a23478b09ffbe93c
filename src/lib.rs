// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! bab - local machine translation with downloadable models.
//!
//! This crate exposes the shared runtime used by:
//! - the `bab` CLI and interactive session (`src/main.rs`)
//! - the JSON HTTP API (`server`)
//!
//! Architecture highlights:
//! - `models`: static model registry, language tables, hub downloader
//! - `runtime`: tokenizer and generator seams, candle implementations
//! - `backend`: per-model lifecycle (download, load, translate, unload, delete)
//! - `manager`: the shared cache directory and one backend per model id
//! - `storage`: saved translations, history and preferences in SQLite

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod runtime;
pub mod server;
pub mod storage;

pub use error::{BabError, Result};
pub use manager::{ModelManager, ModelStatus};
