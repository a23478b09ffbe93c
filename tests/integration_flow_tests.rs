// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! End-to-end model lifecycle: a mock hub serves artifacts to the real
//! downloader, and a word-level runtime stands in for the neural models.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bab::config::HubSettings;
use bab::error::{BabError, Result};
use bab::manager::ModelManager;
use bab::models::HubDownloader;
use bab::runtime::{
    ChatGenerator, ChatHandles, InferenceRuntime, Seq2SeqGenerator, Seq2SeqHandles,
    TextTokenizer,
};

const NLLB_REPO: &str = "facebook/nllb-200-distilled-600M";
const GEMMA_REPO: &str = "google/translategemma-4b-it";

const VOCAB: &[&str] = &["</s>", "<start>", "eng_Latn", "fra_Latn", "<unk>", "hello", "world"];
const EOS: u32 = 0;
const START: u32 = 1;
const UNK: u32 = 4;

struct WordTokenizer;

impl TextTokenizer for WordTokenizer {
    fn encode(&self, text: &str, _add_special_tokens: bool) -> Result<Vec<u32>> {
        Ok(text
            .split_whitespace()
            .map(|w| self.token_to_id(&w.to_lowercase()).unwrap_or(UNK))
            .collect())
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String> {
        let words: Vec<&str> = ids
            .iter()
            .filter(|&&id| !skip_special_tokens || id > UNK)
            .map(|&id| VOCAB[id as usize])
            .collect();
        Ok(words.join(" "))
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        VOCAB.iter().position(|t| *t == token).map(|i| i as u32)
    }
}

/// Echoes the source body back after the forced language token.
struct EchoGenerator;

impl Seq2SeqGenerator for EchoGenerator {
    fn generate(&self, input_ids: &[u32], forced: u32, max_length: usize) -> Result<Vec<u32>> {
        let body = &input_ids[1..input_ids.len() - 1];
        let mut out = vec![START, forced];
        out.extend_from_slice(body);
        out.push(EOS);
        out.truncate(max_length);
        Ok(out)
    }

    fn eos_token_id(&self) -> u32 {
        EOS
    }

    fn max_source_positions(&self) -> usize {
        1024
    }
}

struct SilentChat;

impl ChatGenerator for SilentChat {
    fn generate(&self, prompt_ids: &[u32], _max_new_tokens: usize) -> Result<Vec<u32>> {
        Ok(prompt_ids.to_vec())
    }
}

#[derive(Default)]
struct WordRuntime {
    loads: AtomicUsize,
}

impl InferenceRuntime for WordRuntime {
    fn name(&self) -> &'static str {
        "word"
    }

    fn load_seq2seq(&self, model_dir: &Path) -> Result<Seq2SeqHandles> {
        if !model_dir.join("model.safetensors").exists() {
            return Err(BabError::Runtime("No model weights".to_string()));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Seq2SeqHandles {
            model: Box::new(EchoGenerator),
            tokenizer: Box::new(WordTokenizer),
        })
    }

    fn load_chat(&self, _model_dir: &Path) -> Result<ChatHandles> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(ChatHandles {
            model: Box::new(SilentChat),
            tokenizer: Box::new(WordTokenizer),
        })
    }
}

const NLLB_FILES: &[&str] = &[
    "config.json",
    "generation_config.json",
    "sentencepiece.bpe.model",
    "special_tokens_map.json",
    "tokenizer_config.json",
    "tokenizer.json",
    "model.safetensors",
];

async fn mock_hub() -> MockServer {
    let server = MockServer::start().await;
    let siblings: Vec<_> = NLLB_FILES
        .iter()
        .map(|f| serde_json::json!({ "rfilename": f }))
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/api/models/{}/revision/main", NLLB_REPO)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "siblings": siblings })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(format!("^/{}/resolve/main/.+$", NLLB_REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"{}".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/models/{}/revision/main", GEMMA_REPO)))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    server
}

fn manager(server: &MockServer, cache_dir: &Path, runtime: Arc<WordRuntime>) -> ModelManager {
    let hub = HubSettings {
        endpoint: server.uri(),
        revision: "main".to_string(),
        token_env: "BAB_FLOW_TEST_TOKEN_UNSET".to_string(),
    };
    ModelManager::new(cache_dir, Arc::new(HubDownloader::new(&hub)), runtime)
}

#[tokio::test]
async fn test_download_translate_delete() {
    let server = mock_hub().await;
    let cache = TempDir::new().unwrap();
    let runtime = Arc::new(WordRuntime::default());
    let manager = manager(&server, cache.path(), Arc::clone(&runtime));

    assert!(!manager.model_status(None).unwrap().is_downloaded);

    let path = manager.download_model(None, false).await.unwrap();
    assert_eq!(path, cache.path().join("facebook--nllb-200-distilled-600M"));
    assert!(manager.model_status(None).unwrap().is_downloaded);
    assert!(manager
        .verify_model_files(None)
        .unwrap()
        .values()
        .all(|present| *present));
    assert!(manager.model_size_bytes(None).unwrap() > 0);

    let translated = manager
        .translate(None, "Hello world", "eng_Latn", "fra_Latn")
        .await
        .unwrap();
    assert_eq!(translated, "hello world");
    assert!(manager.model_status(None).unwrap().is_loaded);

    manager
        .translate(None, "world", "eng_Latn", "fra_Latn")
        .await
        .unwrap();
    assert_eq!(runtime.loads.load(Ordering::SeqCst), 1);

    manager.delete_model(None).await.unwrap();
    let status = manager.model_status(None).unwrap();
    assert!(!status.is_downloaded);
    assert!(!status.is_loaded);
    assert!(!status.model_path.exists());
}

#[tokio::test]
async fn test_translate_downloads_lazily() {
    let server = mock_hub().await;
    let cache = TempDir::new().unwrap();
    let manager = manager(&server, cache.path(), Arc::new(WordRuntime::default()));

    let translated = manager
        .translate(Some("nllb"), "hello", "eng_Latn", "fra_Latn")
        .await
        .unwrap();
    assert_eq!(translated, "hello");
    assert!(manager.model_status(Some("nllb")).unwrap().is_downloaded);
}

#[tokio::test]
async fn test_gated_model_reports_access_denied() {
    let server = mock_hub().await;
    let cache = TempDir::new().unwrap();
    let runtime = Arc::new(WordRuntime::default());
    let manager = manager(&server, cache.path(), Arc::clone(&runtime));

    let err = manager
        .load_model(Some("translategemma"))
        .await
        .unwrap_err();
    assert!(matches!(err, BabError::AccessDenied { .. }));
    assert!(err.is_download_error());
    let message = err.to_string();
    assert!(message.contains("https://huggingface.co/google/translategemma-4b-it"));
    assert!(message.contains("BAB_FLOW_TEST_TOKEN_UNSET"));

    let status = manager.model_status(Some("translategemma")).unwrap();
    assert!(!status.is_loaded);
    assert!(!status.is_downloaded);
    assert_eq!(runtime.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_load_without_auto_download_never_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cache = TempDir::new().unwrap();
    let manager =
        manager(&server, cache.path(), Arc::new(WordRuntime::default())).with_auto_download(false);

    let err = manager.load_model(None).await.unwrap_err();
    assert!(matches!(err, BabError::Load { .. }));
    assert!(err.to_string().contains("not downloaded"));
}

#[tokio::test]
async fn test_load_failure_leaves_model_unloaded() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let manager = manager(&server, cache.path(), Arc::new(WordRuntime::default()));

    // Markers present but no weights: downloaded, yet unloadable.
    let model_path = manager.model_status(None).unwrap().model_path;
    std::fs::create_dir_all(&model_path).unwrap();
    std::fs::write(model_path.join("config.json"), "{}").unwrap();
    std::fs::write(model_path.join("tokenizer_config.json"), "{}").unwrap();

    let err = manager.load_model(None).await.unwrap_err();
    match err {
        BabError::Load { path, message } => {
            assert_eq!(path, model_path);
            assert!(message.contains("No model weights"));
        }
        other => panic!("expected load error, got {:?}", other),
    }
    assert!(!manager.model_status(None).unwrap().is_loaded);

    let report = manager.verify_model_files(None).unwrap();
    assert_eq!(report.get("config.json"), Some(&true));
    assert_eq!(report.get("tokenizer.json"), Some(&false));
}

#[tokio::test]
async fn test_concurrent_translations_share_one_load() {
    let server = mock_hub().await;
    let cache = TempDir::new().unwrap();
    let runtime = Arc::new(WordRuntime::default());
    let manager = Arc::new(manager(&server, cache.path(), Arc::clone(&runtime)));
    manager.download_model(None, false).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                manager
                    .translate(None, "hello world", "eng_Latn", "fra_Latn")
                    .await
            })
        })
        .collect();
    for task in futures::future::join_all(tasks).await {
        assert_eq!(task.unwrap().unwrap(), "hello world");
    }
    assert_eq!(runtime.loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_model_rejected_before_any_work() {
    let cache = TempDir::new().unwrap();
    let hub = HubSettings::default();
    let runtime = Arc::new(WordRuntime::default());
    let manager = ModelManager::new(
        cache.path(),
        Arc::new(HubDownloader::new(&hub)),
        runtime.clone(),
    );

    let err = tokio_test::block_on(manager.download_model(Some("bogus"), false)).unwrap_err();
    assert!(matches!(err, BabError::UnknownModel { .. }));
    assert!(err.to_string().contains("[\"nllb\", \"translategemma\"]"));
    assert_eq!(manager.backend_count(), 0);
    assert_eq!(runtime.loads.load(Ordering::SeqCst), 0);
}
