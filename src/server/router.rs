// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Router assembly

use axum::{http::HeaderValue, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use super::state::AppState;

/// Build the full API router.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health))
        .merge(routes::model::router())
        .merge(routes::languages::router())
        .merge(routes::translate::router())
        .merge(routes::records::saved_router())
        .merge(routes::records::history_router())
        .merge(routes::preferences::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            }
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "Babelo API" }))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use super::*;
    use crate::backend::testing::{FakeFetcher, FakeRuntime};
    use crate::manager::ModelManager;
    use crate::storage::Stores;

    struct TestServer {
        base: String,
        client: reqwest::Client,
        manager: Arc<ModelManager>,
        _cache: TempDir,
    }

    impl TestServer {
        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base, path)
        }

        async fn get(&self, path: &str) -> (StatusCode, Value) {
            let response = self.client.get(self.url(path)).send().await.unwrap();
            let status = response.status();
            (status, response.json().await.unwrap())
        }

        async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
            let response = self
                .client
                .post(self.url(path))
                .json(&body)
                .send()
                .await
                .unwrap();
            let status = response.status();
            (status, response.json().await.unwrap())
        }

        async fn delete(&self, path: &str) -> (StatusCode, Value) {
            let response = self.client.delete(self.url(path)).send().await.unwrap();
            let status = response.status();
            (status, response.json().await.unwrap())
        }
    }

    fn manager(cache_dir: &Path) -> ModelManager {
        ModelManager::new(
            cache_dir,
            Arc::new(FakeFetcher::default()),
            Arc::new(FakeRuntime::default()),
        )
    }

    async fn spawn_server() -> TestServer {
        let cache = TempDir::new().unwrap();
        let manager = Arc::new(manager(cache.path()));
        let state = AppState::new(Arc::clone(&manager), Stores::open_in_memory().unwrap());
        let app = create_router(state, &["http://localhost:5173".to_string()]);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            manager,
            _cache: cache,
        }
    }

    #[tokio::test]
    async fn test_health() {
        let server = spawn_server().await;
        let (status, body) = server.get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "service": "Babelo API" }));
    }

    #[tokio::test]
    async fn test_model_list() {
        let server = spawn_server().await;
        let (status, body) = server.get("/model/list").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default_model_id"], "nllb");
        assert_eq!(body["models"][0]["model_id"], "nllb");
        assert_eq!(body["models"][1]["model_type"], "chat_generation");
    }

    #[tokio::test]
    async fn test_unknown_model_is_400() {
        let server = spawn_server().await;
        let (status, body) = server.get("/model/status?model_id=bogus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Unknown model_id: bogus"));
        assert_eq!(server.manager.backend_count(), 0);
    }

    #[tokio::test]
    async fn test_download_verify_remove() {
        let server = spawn_server().await;

        let (status, body) = server.get("/model/verify").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["detail"],
            "Model directory does not exist. Run download first."
        );

        let (status, body) = server.post("/model/download", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Model downloaded successfully.");
        assert_eq!(body["model_id"], "nllb");

        let (_, body) = server.post("/model/download", json!({})).await;
        assert_eq!(
            body["message"],
            "Model already downloaded. Use force=true to re-download."
        );

        let (status, body) = server.get("/model/verify?model_id=nllb").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files"]["config.json"], true);

        let (_, body) = server.get("/model/list/status").await;
        assert_eq!(body["models"][0]["is_downloaded"], true);
        assert_eq!(body["models"][1]["is_downloaded"], false);

        let (_, body) = server.post("/model/remove", json!({})).await;
        assert_eq!(body["message"], "Model removed successfully.");
        let (_, body) = server.post("/model/remove", json!({})).await;
        assert_eq!(body["message"], "Model not downloaded, nothing to remove.");
    }

    #[tokio::test]
    async fn test_remove_partial_download() {
        let server = spawn_server().await;
        let backend = server.manager.get_backend(Some("translategemma")).unwrap();
        let model_path = backend.model_path();
        std::fs::create_dir_all(&model_path).unwrap();
        std::fs::write(model_path.join("config.json"), "{}").unwrap();
        std::fs::write(model_path.join("model-00001-of-00002.safetensors"), "").unwrap();
        assert!(!backend.is_downloaded());

        let (status, body) = server
            .post("/model/remove?model_id=translategemma", json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Model removed successfully.");
        assert!(!model_path.exists());
    }

    #[tokio::test]
    async fn test_download_failure_is_500() {
        let cache = TempDir::new().unwrap();
        let fetcher = FakeFetcher {
            fail_with_status: Some(403),
            ..Default::default()
        };
        let manager = Arc::new(ModelManager::new(
            cache.path(),
            Arc::new(fetcher),
            Arc::new(FakeRuntime::default()),
        ));
        let state = AppState::new(manager, Stores::open_in_memory().unwrap());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state, &[])).await.unwrap();
        });

        let response = reqwest::Client::new()
            .post(format!("http://{}/model/download?model_id=translategemma", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Download failed:"));
    }

    #[tokio::test]
    async fn test_languages() {
        let server = spawn_server().await;
        let (_, body) = server.get("/languages").await;
        assert_eq!(body["model_id"], "nllb");
        assert_eq!(body["languages"]["English"], "eng_Latn");

        let (_, body) = server.get("/languages?model_id=translategemma").await;
        assert_eq!(body["languages"]["German (Germany)"], "de-DE");

        let (status, _) = server.get("/languages?model_id=bogus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_translate_requires_download() {
        let server = spawn_server().await;
        let request = json!({
            "text": "Hello",
            "source_language_code": "eng_Latn",
            "target_language_code": "fra_Latn",
        });

        let (status, body) = server.post("/translate", request.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["detail"],
            "Model 'nllb' not downloaded. Please call POST /model/download?model_id=nllb first."
        );
        assert!(!server.manager.model_status(None).unwrap().is_loaded);

        server.manager.download_model(None, false).await.unwrap();
        let (status, body) = server.post("/translate", request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["translated_text"], "Bonjour");
        assert_eq!(body["original_text"], "Hello");
        assert_eq!(body["model_id"], "nllb");
    }

    #[tokio::test]
    async fn test_translate_rejects_bad_codes() {
        let server = spawn_server().await;
        server.manager.download_model(None, false).await.unwrap();

        let (status, body) = server
            .post(
                "/translate",
                json!({
                    "text": "Hello",
                    "source_language_code": "en",
                    "target_language_code": "fra_Latn",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Unsupported source language code for nllb: 'en'."));

        let (status, body) = server
            .post(
                "/translate",
                json!({
                    "text": "Hello",
                    "source_language_code": "eng_Latn",
                    "target_language_code": "xx_Fake",
                    "model_id": "nllb",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .contains("target language code"));
        assert!(!server.manager.model_status(None).unwrap().is_loaded);
    }

    #[tokio::test]
    async fn test_saved_crud() {
        let server = spawn_server().await;
        let item = json!({
            "source_text": "Hello",
            "translated_text": "Bonjour",
            "source_lang": "eng_Latn",
            "target_lang": "fra_Latn",
        });

        let (_, first) = server.post("/saved", item.clone()).await;
        let (_, second) = server.post("/saved", item).await;
        assert_eq!(first["id"], second["id"]);

        let (_, list) = server.get("/saved").await;
        assert_eq!(list["items"].as_array().unwrap().len(), 1);

        let (_, check) = server
            .get("/saved/check?source_text=Hello&source_lang=eng_Latn&target_lang=fra_Latn")
            .await;
        assert_eq!(check["exists"], true);
        assert_eq!(check["id"], first["id"]);

        let id = first["id"].as_str().unwrap();
        let (status, body) = server.delete(&format!("/saved/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Saved translation deleted");

        let (status, body) = server.delete(&format!("/saved/{}", id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Saved translation not found");

        let (_, check) = server
            .get("/saved/check?source_text=Hello&source_lang=eng_Latn&target_lang=fra_Latn")
            .await;
        assert_eq!(check["exists"], false);
    }

    #[tokio::test]
    async fn test_history_clear() {
        let server = spawn_server().await;
        for text in ["one", "two"] {
            server
                .post(
                    "/history",
                    json!({
                        "source_text": text,
                        "translated_text": text,
                        "source_lang": "en",
                        "target_lang": "fr",
                    }),
                )
                .await;
        }

        let (_, list) = server.get("/history").await;
        assert_eq!(list["items"][0]["source_text"], "two");

        let (_, body) = server.delete("/history").await;
        assert_eq!(body["message"], "Deleted 2 history items");

        let (_, saved) = server.get("/saved").await;
        assert!(saved["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preferences() {
        let server = spawn_server().await;

        let (status, body) = server.get("/preferences/theme").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Preference not found");

        let response = server
            .client
            .put(server.url("/preferences/theme"))
            .json(&json!({ "value": "dark" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (_, body) = server.get("/preferences/theme").await;
        assert_eq!(body, json!({ "key": "theme", "value": "dark" }));

        let (_, body) = server.delete("/preferences/theme").await;
        assert_eq!(body["message"], "Preference deleted");
        let (status, _) = server.delete("/preferences/theme").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let server = spawn_server().await;
        let response = server
            .client
            .get(server.url("/"))
            .header("Origin", "http://localhost:5173")
            .send()
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "http://localhost:5173"
        );
    }
}
