// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model registry, language tables and artifact download
//!
//! The registry and language tables are static data. Every entry point
//! validates model ids and language codes against them before reaching a
//! backend.

pub mod download;
pub mod languages;
pub mod registry;

pub use download::{ArtifactFetcher, HubDownloader};
pub use languages::{get_language_codes, language_name, LanguageTable};
pub use registry::{
    available_models, get_model_info, is_known_model, model_ids, ModelDescriptor, ModelFamily,
    DEFAULT_MODEL_ID,
};
