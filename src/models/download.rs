// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Remote artifact download
//!
//! Fetches a whole model repository from a Hugging Face compatible hub into a
//! local directory.
//!
//! # Protocol
//!
//! 1. `GET {endpoint}/api/models/{repo}/revision/{rev}?blobs=true` lists the
//!    repository files (`siblings[].rfilename`, plus `lfs.sha256` for large files).
//! 2. Each file is streamed from `{endpoint}/{repo}/resolve/{rev}/{file}` into
//!    `<file>.part` and renamed into place once complete.
//! 3. LFS files are verified against the listed SHA256.
//!
//! A 401/403 status from the hub is reported as [`BabError::AccessDenied`] so
//! callers can tell the user to accept the license and export a token.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::config::HubSettings;
use crate::error::{BabError, Result};

/// Fetches a named repository into a local directory.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Download every file of `repo_id` into `dest`, returning `dest`.
    async fn fetch(&self, repo_id: &str, dest: &Path) -> Result<PathBuf>;
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    #[serde(default)]
    siblings: Vec<RepoSibling>,
}

#[derive(Debug, Clone, Deserialize)]
struct RepoSibling {
    rfilename: String,
    #[serde(default)]
    lfs: Option<LfsInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct LfsInfo {
    sha256: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Hugging Face hub downloader
pub struct HubDownloader {
    /// HTTP client
    client: Client,
    /// Hub base URL, without trailing slash
    endpoint: String,
    /// Branch, tag or commit
    revision: String,
    /// Environment variable holding the access token
    token_env: String,
    /// Explicit token, takes precedence over the environment
    token: Option<String>,
}

impl HubDownloader {
    pub fn new(settings: &HubSettings) -> Self {
        Self {
            client: Client::new(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            revision: settings.revision.clone(),
            token_env: settings.token_env.clone(),
            token: None,
        }
    }

    /// Use an explicit token instead of reading the environment.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var(&self.token_env).ok())
            .filter(|t| !t.trim().is_empty())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a failure onto the download error taxonomy. The structured status
    /// decides when present; the message is only inspected when there is none.
    fn classify(&self, repo_id: &str, status: Option<StatusCode>, message: String) -> BabError {
        let denied = match status {
            Some(status) => status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN,
            None => message.contains("401") || message.contains("403"),
        };
        if denied {
            BabError::AccessDenied {
                repo_id: repo_id.to_string(),
                token_env: self.token_env.clone(),
            }
        } else {
            BabError::Download {
                repo_id: repo_id.to_string(),
                message,
            }
        }
    }

    fn request_error(&self, repo_id: &str, err: reqwest::Error) -> BabError {
        self.classify(repo_id, err.status(), err.to_string())
    }

    async fn list_files(&self, repo_id: &str) -> Result<Vec<RepoSibling>> {
        let url = format!(
            "{}/api/models/{}/revision/{}",
            self.endpoint, repo_id, self.revision
        );
        tracing::debug!("Listing repository files: {}", url);

        let response = self
            .authorize(self.client.get(&url).query(&[("blobs", "true")]))
            .send()
            .await
            .map_err(|e| self.request_error(repo_id, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.classify(
                repo_id,
                Some(status),
                format!("listing failed with status: {}", status),
            ));
        }

        let info: RepoInfo = response
            .json()
            .await
            .map_err(|e| self.request_error(repo_id, e))?;

        if info.siblings.is_empty() {
            return Err(BabError::Download {
                repo_id: repo_id.to_string(),
                message: "repository lists no files".to_string(),
            });
        }
        Ok(info.siblings)
    }

    async fn download_file(&self, repo_id: &str, file: &RepoSibling, dest: &Path) -> Result<()> {
        let relative = safe_relative_path(&file.rfilename).ok_or_else(|| BabError::Download {
            repo_id: repo_id.to_string(),
            message: format!("refusing unsafe file name: {}", file.rfilename),
        })?;
        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = part_path(&target);

        let url = format!(
            "{}/{}/resolve/{}/{}",
            self.endpoint, repo_id, self.revision, file.rfilename
        );
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| self.request_error(repo_id, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.classify(
                repo_id,
                Some(status),
                format!("{} failed with status: {}", file.rfilename, status),
            ));
        }

        if let Err(e) = self
            .stream_to_part(repo_id, file, response, &temp_path, &target)
            .await
        {
            tokio::fs::remove_file(&temp_path).await.ok();
            return Err(e);
        }
        tracing::debug!("Downloaded {}", target.display());
        Ok(())
    }

    /// Stream the body into `temp_path`, verify it and rename it onto `target`.
    /// The caller removes `temp_path` on error.
    async fn stream_to_part(
        &self,
        repo_id: &str,
        file: &RepoSibling,
        response: reqwest::Response,
        temp_path: &Path,
        target: &Path,
    ) -> Result<()> {
        let total = file
            .lfs
            .as_ref()
            .and_then(|lfs| lfs.size)
            .or(response.content_length());

        let mut out = tokio::fs::File::create(temp_path).await?;
        let mut hasher = Sha256::new();
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.request_error(repo_id, e))?;
            out.write_all(&chunk).await?;
            hasher.update(&chunk);

            downloaded += chunk.len() as u64;
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                // Log every ~50MB
                match total {
                    Some(total) if total > 0 => tracing::info!(
                        "{}: {}%",
                        file.rfilename,
                        (downloaded as f64 / total as f64 * 100.0) as u8
                    ),
                    _ => tracing::info!("{}: {} MB", file.rfilename, downloaded / (1024 * 1024)),
                }
            }
        }
        out.flush().await?;
        drop(out);

        if let Some(lfs) = &file.lfs {
            let hash = format!("{:x}", hasher.finalize());
            if !hash.eq_ignore_ascii_case(&lfs.sha256) {
                return Err(BabError::Download {
                    repo_id: repo_id.to_string(),
                    message: format!(
                        "SHA256 verification failed for {}. Expected: {}, Got: {}",
                        file.rfilename, lfs.sha256, hash
                    ),
                });
            }
        }

        tokio::fs::rename(temp_path, target).await?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactFetcher for HubDownloader {
    async fn fetch(&self, repo_id: &str, dest: &Path) -> Result<PathBuf> {
        tracing::info!("Downloading {} to {}", repo_id, dest.display());
        tokio::fs::create_dir_all(dest).await?;

        let files = self.list_files(repo_id).await?;
        tracing::info!("{} files to fetch for {}", files.len(), repo_id);

        for file in &files {
            self.download_file(repo_id, file, dest).await?;
        }

        tracing::info!("Download complete: {}", dest.display());
        Ok(dest.to_path_buf())
    }
}

/// Reject absolute paths and parent-directory components in hub file names.
fn safe_relative_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if name.is_empty() || path.is_absolute() {
        return None;
    }
    if path
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        Some(path.to_path_buf())
    } else {
        None
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REPO: &str = "org/tiny-model";

    fn downloader_for(server: &MockServer) -> HubDownloader {
        let settings = HubSettings {
            endpoint: server.uri(),
            revision: "main".to_string(),
            token_env: "BAB_TEST_TOKEN_UNSET".to_string(),
        };
        HubDownloader::new(&settings)
    }

    fn sha256_hex(bytes: &[u8]) -> String {
        format!("{:x}", Sha256::digest(bytes))
    }

    async fn mount_listing(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api/models/{}/revision/main", REPO)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_file(server: &MockServer, name: &str, status: u16, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/resolve/main/{}", REPO, name)))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(body.to_vec()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fetch_downloads_all_files() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            serde_json::json!({
                "siblings": [
                    {"rfilename": "config.json"},
                    {"rfilename": "model.safetensors",
                     "lfs": {"sha256": sha256_hex(b"weights"), "size": 7}},
                    {"rfilename": "nested/tokenizer.json"}
                ]
            }),
        )
        .await;
        mount_file(&server, "config.json", 200, b"{}").await;
        mount_file(&server, "model.safetensors", 200, b"weights").await;
        mount_file(&server, "nested/tokenizer.json", 200, b"{\"v\":1}").await;

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("org--tiny-model");
        let downloader = downloader_for(&server);

        let result = downloader.fetch(REPO, &dest).await.unwrap();
        assert_eq!(result, dest);
        assert_eq!(std::fs::read(dest.join("config.json")).unwrap(), b"{}");
        assert_eq!(std::fs::read(dest.join("model.safetensors")).unwrap(), b"weights");
        assert!(dest.join("nested").join("tokenizer.json").exists());
        assert!(!dest.join("model.safetensors.part").exists());
    }

    #[tokio::test]
    async fn test_listing_unauthorized_is_access_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/models/{}/revision/main", REPO)))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let err = downloader_for(&server)
            .fetch(REPO, temp_dir.path())
            .await
            .unwrap_err();
        match err {
            BabError::AccessDenied { repo_id, token_env } => {
                assert_eq!(repo_id, REPO);
                assert_eq!(token_env, "BAB_TEST_TOKEN_UNSET");
            }
            other => panic!("expected AccessDenied, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_file_forbidden_is_access_denied() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            serde_json::json!({"siblings": [{"rfilename": "config.json"}]}),
        )
        .await;
        mount_file(&server, "config.json", 403, b"").await;

        let temp_dir = TempDir::new().unwrap();
        let err = downloader_for(&server)
            .fetch(REPO, temp_dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, BabError::AccessDenied { .. }));
        assert!(err.to_string().contains("https://huggingface.co/org/tiny-model"));
    }

    #[tokio::test]
    async fn test_server_error_is_generic_download_error() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            serde_json::json!({"siblings": [{"rfilename": "config.json"}]}),
        )
        .await;
        mount_file(&server, "config.json", 500, b"").await;

        let temp_dir = TempDir::new().unwrap();
        let err = downloader_for(&server)
            .fetch(REPO, temp_dir.path())
            .await
            .unwrap_err();
        match err {
            BabError::Download { message, .. } => assert!(message.contains("500")),
            other => panic!("expected Download, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sha_mismatch_removes_partial_file() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            serde_json::json!({
                "siblings": [{"rfilename": "model.safetensors",
                              "lfs": {"sha256": sha256_hex(b"expected")}}]
            }),
        )
        .await;
        mount_file(&server, "model.safetensors", 200, b"corrupted").await;

        let temp_dir = TempDir::new().unwrap();
        let err = downloader_for(&server)
            .fetch(REPO, temp_dir.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SHA256 verification failed"));
        assert!(!temp_dir.path().join("model.safetensors").exists());
        assert!(!temp_dir.path().join("model.safetensors.part").exists());
    }

    #[tokio::test]
    async fn test_local_write_failure_removes_partial_file() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            serde_json::json!({"siblings": [{"rfilename": "config.json"}]}),
        )
        .await;
        mount_file(&server, "config.json", 200, b"{}").await;

        // a non-empty directory where the file should land makes the rename fail
        let temp_dir = TempDir::new().unwrap();
        let occupied = temp_dir.path().join("config.json");
        std::fs::create_dir_all(&occupied).unwrap();
        std::fs::write(occupied.join("keep"), "").unwrap();

        let err = downloader_for(&server)
            .fetch(REPO, temp_dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, BabError::Io(_)));
        assert!(!temp_dir.path().join("config.json.part").exists());
        assert!(occupied.join("keep").exists());
    }

    #[tokio::test]
    async fn test_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/models/{}/revision/main", REPO)))
            .and(header("authorization", "Bearer hf_secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"siblings": [{"rfilename": "a.txt"}]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{}/resolve/main/a.txt", REPO)))
            .and(header("authorization", "Bearer hf_secret"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"a".to_vec()))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        downloader_for(&server)
            .with_token("hf_secret")
            .fetch(REPO, temp_dir.path())
            .await
            .unwrap();
        assert!(temp_dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_empty_listing_fails() {
        let server = MockServer::start().await;
        mount_listing(&server, serde_json::json!({"siblings": []})).await;

        let temp_dir = TempDir::new().unwrap();
        let err = downloader_for(&server)
            .fetch(REPO, temp_dir.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("lists no files"));
    }

    #[test]
    fn test_classify_prefers_status_over_message() {
        let downloader = HubDownloader::new(&HubSettings::default());
        let err = downloader.classify(
            REPO,
            Some(StatusCode::NOT_FOUND),
            "mentions 403 somewhere".to_string(),
        );
        assert!(matches!(err, BabError::Download { .. }));
    }

    #[test]
    fn test_classify_falls_back_to_message() {
        let downloader = HubDownloader::new(&HubSettings::default());
        let err = downloader.classify(REPO, None, "HTTP status client error (403)".to_string());
        assert!(matches!(err, BabError::AccessDenied { .. }));

        let err = downloader.classify(REPO, None, "connection refused".to_string());
        assert!(matches!(err, BabError::Download { .. }));
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(
            safe_relative_path("a/b.json"),
            Some(PathBuf::from("a/b.json"))
        );
        assert_eq!(safe_relative_path("../escape"), None);
        assert_eq!(safe_relative_path("/etc/passwd"), None);
        assert_eq!(safe_relative_path(""), None);
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/m/model.safetensors")),
            PathBuf::from("/m/model.safetensors.part")
        );
    }
}
