//! Retrying asset downloader.
//!
//! Best-effort byte fetches with bounded retries and linear backoff, plus
//! atomic file writes through a `.part` temp file so interrupted downloads
//! never leave truncated assets behind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::DownloadConfig;

/// Download handler with retry logic and a shared HTTP client.
pub struct Downloader {
    client: reqwest::Client,
    config: DownloadConfig,
}

impl Downloader {
    /// Build a downloader with the configured user agent and timeout.
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Fetch a URL with retries; `None` when every attempt failed.
    pub async fn fetch_with_retries(&self, url: &str) -> Option<Vec<u8>> {
        let mut attempt = 0;
        while attempt < self.config.retry_count {
            match self.fetch_once(url).await {
                Ok(bytes) => return Some(bytes),
                Err(e) => {
                    attempt += 1;
                    let backoff =
                        Duration::from_millis(self.config.retry_backoff_ms * attempt);
                    log::warn!(
                        "Fetch failed ({}), attempt {}/{}: {} (backoff {:?})",
                        url,
                        attempt,
                        self.config.retry_count,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
        log::error!(
            "Failed to fetch {} after {} attempts",
            url,
            self.config.retry_count
        );
        None
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Download a URL to `dest`; returns the written path or `None`.
    pub async fn download(&self, url: &str, dest: &Path) -> Option<PathBuf> {
        let bytes = self.fetch_with_retries(url).await?;
        match write_atomic(dest, &bytes).await {
            Ok(()) => Some(dest.to_path_buf()),
            Err(e) => {
                log::error!("Error saving file {:?}: {}", dest, e);
                None
            }
        }
    }

    /// Download several assets with bounded concurrency; returns the
    /// number of successful downloads.
    pub async fn download_many(&self, jobs: Vec<(String, PathBuf)>) -> usize {
        stream::iter(jobs)
            .map(|(url, dest)| async move { self.download(&url, &dest).await.is_some() })
            .buffer_unordered(self.config.concurrent.max(1))
            .filter(|ok| futures::future::ready(*ok))
            .count()
            .await
    }
}

/// Write bytes via a `.part` temp file, then rename into place.
async fn write_atomic(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = dest.with_extension(part_extension(dest));
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, dest).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

fn part_extension(dest: &Path) -> String {
    match dest.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{ext}.part"),
        None => "part".to_string(),
    }
}
