// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model manager
//!
//! The single entry point to backends. Owns the shared cache directory and
//! the `model_id → Backend` map; backends are created on first request and
//! live as long as the manager. The manager is constructed by the
//! application and passed to every consumer behind an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use walkdir::WalkDir;

use crate::backend::Backend;
use crate::config::Settings;
use crate::error::{BabError, Result};
use crate::models::download::{ArtifactFetcher, HubDownloader};
use crate::models::languages::{get_language_codes, LanguageTable};
use crate::models::registry::{available_models, get_model_info, ModelDescriptor, DEFAULT_MODEL_ID};
use crate::runtime::{default_runtime, InferenceRuntime};

/// Snapshot of one model's lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelStatus {
    pub model_id: String,
    /// Remote repository id
    pub model_name: String,
    pub cache_dir: PathBuf,
    pub model_path: PathBuf,
    pub is_downloaded: bool,
    pub is_loaded: bool,
}

pub struct ModelManager {
    cache_dir: RwLock<PathBuf>,
    backends: Mutex<HashMap<String, Arc<Backend>>>,
    fetcher: Arc<dyn ArtifactFetcher>,
    runtime: Arc<dyn InferenceRuntime>,
    default_model: String,
    auto_download: bool,
}

impl ModelManager {
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        fetcher: Arc<dyn ArtifactFetcher>,
        runtime: Arc<dyn InferenceRuntime>,
    ) -> Self {
        Self {
            cache_dir: RwLock::new(cache_dir.into()),
            backends: Mutex::new(HashMap::new()),
            fetcher,
            runtime,
            default_model: DEFAULT_MODEL_ID.to_string(),
            auto_download: true,
        }
    }

    /// Hub downloader and default runtime configured from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        get_model_info(&settings.models.default_model)?;
        let fetcher = Arc::new(HubDownloader::new(&settings.hub));
        let runtime = default_runtime(&settings.runtime)?;
        Ok(Self::new(settings.cache_dir(), fetcher, runtime)
            .with_default_model(settings.models.default_model.clone())
            .with_auto_download(settings.models.auto_download))
    }

    pub fn with_default_model(mut self, model_id: impl Into<String>) -> Self {
        self.default_model = model_id.into();
        self
    }

    /// Whether `load_model` may fetch missing artifacts.
    pub fn with_auto_download(mut self, enabled: bool) -> Self {
        self.auto_download = enabled;
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn runtime_name(&self) -> &'static str {
        self.runtime.name()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Change the cache root for the manager and every existing backend.
    /// Files under the old root are left alone.
    pub fn set_cache_dir(&self, cache_dir: impl Into<PathBuf>) {
        let cache_dir = cache_dir.into();
        let backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        *self.cache_dir.write().unwrap_or_else(PoisonError::into_inner) = cache_dir.clone();
        for backend in backends.values() {
            backend.set_cache_dir(cache_dir.clone());
        }
        tracing::info!("Model cache directory set to {}", cache_dir.display());
    }

    /// Existing backend for `model_id` (default model if `None`), created on
    /// first request. Unknown ids fail before anything is constructed.
    pub fn get_backend(&self, model_id: Option<&str>) -> Result<Arc<Backend>> {
        let model_id = model_id.unwrap_or(&self.default_model);
        let descriptor = get_model_info(model_id)?;

        let mut backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(backend) = backends.get(model_id) {
            return Ok(Arc::clone(backend));
        }

        tracing::debug!("Creating {} backend for {}", descriptor.family, model_id);
        let backend = Arc::new(Backend::new(
            descriptor,
            self.cache_dir(),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.runtime),
            self.auto_download,
        ));
        backends.insert(model_id.to_string(), Arc::clone(&backend));
        Ok(backend)
    }

    /// Number of constructed backends.
    pub fn backend_count(&self) -> usize {
        self.backends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn available_models(&self) -> &'static [ModelDescriptor] {
        available_models()
    }

    pub async fn download_model(&self, model_id: Option<&str>, force: bool) -> Result<PathBuf> {
        self.get_backend(model_id)?.download_model(force).await
    }

    pub async fn load_model(&self, model_id: Option<&str>) -> Result<()> {
        self.get_backend(model_id)?.load_model().await
    }

    pub async fn unload_model(&self, model_id: Option<&str>) -> Result<()> {
        self.get_backend(model_id)?.unload_model().await;
        Ok(())
    }

    /// Unload every constructed backend that holds a model.
    pub async fn unload_all(&self) {
        let backends: Vec<_> = self
            .backends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for backend in backends.iter().filter(|b| b.is_loaded()) {
            backend.unload_model().await;
        }
    }

    pub async fn delete_model(&self, model_id: Option<&str>) -> Result<()> {
        self.get_backend(model_id)?.delete_model().await
    }

    pub async fn translate(
        &self,
        model_id: Option<&str>,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        self.get_backend(model_id)?
            .translate(text, source_lang, target_lang)
            .await
    }

    pub fn verify_model_files(&self, model_id: Option<&str>) -> Result<BTreeMap<String, bool>> {
        Ok(self.get_backend(model_id)?.verify_model_files())
    }

    pub fn get_language_codes(&self, model_id: Option<&str>) -> Result<LanguageTable> {
        get_language_codes(model_id.unwrap_or(&self.default_model))
    }

    /// Check both codes against the model's table.
    pub fn validate_languages(
        &self,
        model_id: Option<&str>,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<()> {
        let model_id = model_id.unwrap_or(&self.default_model);
        let table = get_language_codes(model_id)?;
        for code in [source_lang, target_lang] {
            if !table.contains_code(code) {
                return Err(BabError::UnsupportedLanguage {
                    model_id: model_id.to_string(),
                    code: code.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn model_status(&self, model_id: Option<&str>) -> Result<ModelStatus> {
        let backend = self.get_backend(model_id)?;
        Ok(ModelStatus {
            model_id: backend.model_id().to_string(),
            model_name: backend.descriptor().repo_id.to_string(),
            cache_dir: backend.cache_dir(),
            model_path: backend.model_path(),
            is_downloaded: backend.is_downloaded(),
            is_loaded: backend.is_loaded(),
        })
    }

    /// Status of every registered model, in registry order.
    pub fn all_statuses(&self) -> Result<Vec<ModelStatus>> {
        available_models()
            .iter()
            .map(|m| self.model_status(Some(m.model_id)))
            .collect()
    }

    /// Total bytes under the model directory (0 when absent).
    pub fn model_size_bytes(&self, model_id: Option<&str>) -> Result<u64> {
        Ok(directory_size(&self.get_backend(model_id)?.model_path()))
    }
}

fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
