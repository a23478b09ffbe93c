// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Translation backends
//!
//! One backend per model id. A backend owns the model's on-disk location,
//! its download/load/unload/delete lifecycle and the translation protocol of
//! its family.
//!
//! ## States
//!
//! - **Absent**: nothing under `model_path`
//! - **Downloaded**: marker files present, nothing in memory
//! - **Loaded**: on disk and in memory
//!
//! Lifecycle transitions are serialized by a per-backend async mutex.
//! Translations only clone the loaded handle pair, so they run concurrently
//! and an unload never frees handles a running translation still uses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{BabError, Result};
use crate::models::download::ArtifactFetcher;
use crate::models::languages::{get_language_codes, LanguageTable};
use crate::models::registry::{ModelDescriptor, ModelFamily};
use crate::runtime::InferenceRuntime;

pub mod chat;
pub mod seq2seq;

pub use chat::{ChatBackend, TranslateGemmaTemplate};
pub use seq2seq::Seq2SeqBackend;

/// Marker files whose presence means "downloaded"
pub const MARKER_FILES: &[&str] = &["config.json", "tokenizer_config.json"];

/// Generation cap shared by both protocols
pub const MAX_GENERATED_TOKENS: usize = 512;

/// In-memory handle pair of one model family
pub trait ModelHandles: Send + Sync + Sized + 'static {
    /// Files the family needs, checked by `verify_model_files`
    const REQUIRED_FILES: &'static [&'static str];

    /// Key of the composite weights check in the verify report
    const WEIGHTS_CHECK: &'static str;

    fn weights_present(model_path: &Path) -> bool;

    /// Blocking load through the runtime.
    fn load(runtime: &dyn InferenceRuntime, model_path: &Path) -> Result<Self>;
}

/// True if any file directly under `dir` has extension `ext`.
pub(crate) fn has_file_with_extension(dir: &Path, ext: &str) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                e.path().is_file() && e.path().extension().is_some_and(|x| x == ext)
            })
        })
        .unwrap_or(false)
}

/// Family-independent backend state and lifecycle
pub struct BackendCore<H> {
    descriptor: &'static ModelDescriptor,
    cache_dir: RwLock<PathBuf>,
    handles: RwLock<Option<Arc<H>>>,
    lifecycle: Mutex<()>,
    fetcher: Arc<dyn ArtifactFetcher>,
    runtime: Arc<dyn InferenceRuntime>,
    auto_download: bool,
}

impl<H: ModelHandles> BackendCore<H> {
    pub fn new(
        descriptor: &'static ModelDescriptor,
        cache_dir: PathBuf,
        fetcher: Arc<dyn ArtifactFetcher>,
        runtime: Arc<dyn InferenceRuntime>,
        auto_download: bool,
    ) -> Self {
        Self {
            descriptor,
            cache_dir: RwLock::new(cache_dir),
            handles: RwLock::new(None),
            lifecycle: Mutex::new(()),
            fetcher,
            runtime,
            auto_download,
        }
    }

    pub fn descriptor(&self) -> &'static ModelDescriptor {
        self.descriptor
    }

    pub fn model_id(&self) -> &'static str {
        self.descriptor.model_id
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_cache_dir(&self, cache_dir: PathBuf) {
        *self.cache_dir.write().unwrap_or_else(PoisonError::into_inner) = cache_dir;
    }

    /// `<cache_dir>/<repo_id with "/" → "--">`, recomputed on every call.
    pub fn model_path(&self) -> PathBuf {
        self.cache_dir().join(self.descriptor.cache_dir_name())
    }

    /// Cheap marker-file probe, not a completeness check.
    pub fn is_downloaded(&self) -> bool {
        let path = self.model_path();
        MARKER_FILES.iter().all(|f| path.join(f).exists())
    }

    pub fn is_loaded(&self) -> bool {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn loaded_handles(&self) -> Option<Arc<H>> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_handles(&self, handles: Option<Arc<H>>) {
        *self.handles.write().unwrap_or_else(PoisonError::into_inner) = handles;
    }

    /// Fetch the repository into `model_path`. No-op when already downloaded
    /// unless `force` is set.
    pub async fn download_model(&self, force: bool) -> Result<PathBuf> {
        let _guard = self.lifecycle.lock().await;
        self.download_locked(force).await
    }

    async fn download_locked(&self, force: bool) -> Result<PathBuf> {
        let path = self.model_path();
        if self.is_downloaded() && !force {
            debug!("{} already downloaded at {}", self.model_id(), path.display());
            return Ok(path);
        }

        info!(
            "Downloading {} ({}) to {}",
            self.model_id(),
            self.descriptor.repo_id,
            path.display()
        );
        let path = self
            .fetcher
            .fetch(self.descriptor.repo_id, &path)
            .await
            .map_err(|e| {
                if e.is_download_error() {
                    e
                } else {
                    BabError::Download {
                        repo_id: self.descriptor.repo_id.to_string(),
                        message: format!("{} ({})", e, path.display()),
                    }
                }
            })?;
        info!("Downloaded {} to {}", self.model_id(), path.display());
        Ok(path)
    }

    /// Return the loaded handles, loading (and downloading) first if needed.
    pub async fn load_model(&self) -> Result<Arc<H>> {
        if let Some(handles) = self.loaded_handles() {
            return Ok(handles);
        }

        let _guard = self.lifecycle.lock().await;
        if let Some(handles) = self.loaded_handles() {
            return Ok(handles);
        }

        let path = self.model_path();
        if !self.is_downloaded() {
            if !self.auto_download {
                return Err(BabError::Load {
                    path,
                    message: format!("model '{}' is not downloaded", self.model_id()),
                });
            }
            self.download_locked(false).await?;
        }

        info!("Loading {} from {}", self.model_id(), path.display());
        let runtime = Arc::clone(&self.runtime);
        let load_path = path.clone();
        let loaded = tokio::task::spawn_blocking(move || H::load(runtime.as_ref(), &load_path))
            .await
            .map_err(|e| BabError::Runtime(format!("load task failed: {}", e)))
            .and_then(|r| r);

        match loaded {
            Ok(handles) => {
                let handles = Arc::new(handles);
                self.set_handles(Some(Arc::clone(&handles)));
                info!("Loaded {}", self.model_id());
                Ok(handles)
            }
            Err(e) => {
                self.set_handles(None);
                warn!("Failed to load {}: {}", self.model_id(), e);
                Err(BabError::Load {
                    path,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Release the handle pair. Never fails.
    pub async fn unload_model(&self) {
        let _guard = self.lifecycle.lock().await;
        self.unload_locked();
    }

    fn unload_locked(&self) {
        if self.is_loaded() {
            info!("Unloading {}", self.model_id());
        }
        self.set_handles(None);
    }

    /// Unload, then remove `model_path` if it exists.
    pub async fn delete_model(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;
        self.unload_locked();

        let path = self.model_path();
        if !path.exists() {
            debug!("{} not on disk, nothing to delete", self.model_id());
            return Ok(());
        }

        tokio::fs::remove_dir_all(&path)
            .await
            .map_err(|e| BabError::Deletion {
                path: path.clone(),
                message: e.to_string(),
            })?;
        info!("Deleted {} at {}", self.model_id(), path.display());
        Ok(())
    }

    /// Presence of each required file plus the composite weights check.
    pub fn verify_model_files(&self) -> BTreeMap<String, bool> {
        let path = self.model_path();
        let mut report: BTreeMap<String, bool> = H::REQUIRED_FILES
            .iter()
            .map(|f| (f.to_string(), path.join(f).exists()))
            .collect();
        report.insert(H::WEIGHTS_CHECK.to_string(), H::weights_present(&path));
        report
    }

    pub fn get_language_codes(&self) -> Result<LanguageTable> {
        get_language_codes(self.model_id())
    }

    /// Run a blocking protocol against the loaded handles.
    pub(crate) async fn run_translation<F>(&self, protocol: F) -> Result<String>
    where
        F: FnOnce(&H) -> Result<String> + Send + 'static,
    {
        let handles = self.load_model().await?;
        let model_id = self.model_id();
        tokio::task::spawn_blocking(move || protocol(handles.as_ref()))
            .await
            .map_err(|e| BabError::Translation {
                model_id: model_id.to_string(),
                message: e.to_string(),
            })?
            .map_err(|e| match e {
                BabError::Translation { .. } => e,
                other => BabError::Translation {
                    model_id: model_id.to_string(),
                    message: other.to_string(),
                },
            })
    }
}

/// Backend for one registered model, dispatched on its family
pub enum Backend {
    Seq2Seq(Seq2SeqBackend),
    Chat(ChatBackend),
}

macro_rules! delegate {
    ($self:ident, $b:ident => $e:expr) => {
        match $self {
            Backend::Seq2Seq($b) => $e,
            Backend::Chat($b) => $e,
        }
    };
}

impl Backend {
    pub fn new(
        descriptor: &'static ModelDescriptor,
        cache_dir: PathBuf,
        fetcher: Arc<dyn ArtifactFetcher>,
        runtime: Arc<dyn InferenceRuntime>,
        auto_download: bool,
    ) -> Self {
        match descriptor.family {
            ModelFamily::Seq2Seq => Backend::Seq2Seq(Seq2SeqBackend::new(
                descriptor,
                cache_dir,
                fetcher,
                runtime,
                auto_download,
            )),
            ModelFamily::ChatGeneration => Backend::Chat(ChatBackend::new(
                descriptor,
                cache_dir,
                fetcher,
                runtime,
                auto_download,
            )),
        }
    }

    pub fn descriptor(&self) -> &'static ModelDescriptor {
        delegate!(self, b => b.core().descriptor())
    }

    pub fn model_id(&self) -> &'static str {
        self.descriptor().model_id
    }

    pub fn cache_dir(&self) -> PathBuf {
        delegate!(self, b => b.core().cache_dir())
    }

    pub fn set_cache_dir(&self, cache_dir: PathBuf) {
        delegate!(self, b => b.core().set_cache_dir(cache_dir))
    }

    pub fn model_path(&self) -> PathBuf {
        delegate!(self, b => b.core().model_path())
    }

    pub fn is_downloaded(&self) -> bool {
        delegate!(self, b => b.core().is_downloaded())
    }

    pub fn is_loaded(&self) -> bool {
        delegate!(self, b => b.core().is_loaded())
    }

    pub async fn download_model(&self, force: bool) -> Result<PathBuf> {
        delegate!(self, b => b.core().download_model(force).await)
    }

    /// Bring the model into memory. Cheap once loaded.
    pub async fn load_model(&self) -> Result<()> {
        delegate!(self, b => b.core().load_model().await.map(|_| ()))
    }

    pub async fn unload_model(&self) {
        delegate!(self, b => b.core().unload_model().await)
    }

    pub async fn delete_model(&self) -> Result<()> {
        delegate!(self, b => b.core().delete_model().await)
    }

    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        delegate!(self, b => b.translate(text, source_lang, target_lang).await)
    }

    pub fn verify_model_files(&self) -> BTreeMap<String, bool> {
        delegate!(self, b => b.core().verify_model_files())
    }

    pub fn get_language_codes(&self) -> Result<LanguageTable> {
        get_language_codes(self.model_id())
    }
}
