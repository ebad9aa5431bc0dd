//! HttpBackupFetcher - 外部システムのバックアップを HTTP で取得

use std::path::Path;

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::StatusCode;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::app::archive::partial_path;
use crate::config::ExternalBackupConfig;
use crate::domain::FetchError;
use crate::ports::BackupSource;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Export request body: the exported backup is not password protected.
#[derive(Debug, Serialize)]
struct ExportRequest<'a> {
    password: &'a str,
}

pub struct HttpBackupFetcher {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpBackupFetcher {
    pub fn new(config: &ExternalBackupConfig) -> reqwest::Result<Self> {
        if !config.verify_tls {
            warn!(
                "TLS certificate verification is disabled for [{}]",
                config.url
            );
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn download(
        &self,
        mut response: reqwest::Response,
        partial: &Path,
    ) -> Result<u64, FetchError> {
        let write_error = |source| FetchError::Write {
            path: partial.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(partial).await.map_err(write_error)?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            file.write_all(&chunk).await.map_err(write_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;
        Ok(written)
    }
}

fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e.to_string())
    }
}

#[async_trait]
impl BackupSource for HttpBackupFetcher {
    async fn fetch(&self, destination: &Path) -> Result<(), FetchError> {
        debug!("Requesting external backup from: [{}]", self.url);

        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&ExportRequest { password: "" })
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let partial = partial_path(destination);
        let result = match self.download(response, &partial).await {
            Ok(written) => tokio::fs::rename(&partial, destination)
                .await
                .map(|()| written)
                .map_err(|source| FetchError::Write {
                    path: destination.to_path_buf(),
                    source,
                }),
            Err(e) => Err(e),
        };

        match result {
            Ok(written) => {
                debug!(
                    "External backup saved to: [{}] ({} bytes)",
                    destination.display(),
                    written
                );
                Ok(())
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&partial).await
                    && rm.kind() != std::io::ErrorKind::NotFound
                {
                    error!(
                        "Cannot remove partial download [{}]: {}",
                        partial.display(),
                        rm
                    );
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_http::serve_once;
    use std::time::Duration;

    fn fetcher_for(url: String) -> HttpBackupFetcher {
        HttpBackupFetcher::new(&ExternalBackupConfig {
            url,
            api_key: "k-123".to_string(),
            verify_tls: true,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn ok_response_body_is_written_to_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("external-backup.bin");
        let (base, server) = serve_once(200, "BLOB-CONTENTS").await;

        fetcher_for(format!("{base}/api/backup")).fetch(&dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"BLOB-CONTENTS");
        assert!(!partial_path(&dest).exists());

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /api/backup HTTP/1.1"));
        assert!(lower.contains("x-api-key: k-123"));
        assert!(request.contains(r#"{"password":""}"#));
    }

    #[tokio::test]
    async fn server_error_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("external-backup.bin");
        let (base, _server) = serve_once(500, r#"{"error":"boom"}"#).await;

        let err = fetcher_for(base).fetch(&dest).await.unwrap_err();

        assert!(matches!(err, FetchError::Status(500)));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn non_200_success_is_still_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("external-backup.bin");
        let (base, _server) = serve_once(204, "").await;

        let err = fetcher_for(base).fetch(&dest).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(204)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn unwritable_destination_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing-dir").join("external-backup.bin");
        let (base, _server) = serve_once(200, "BLOB").await;

        let err = fetcher_for(base).fetch(&dest).await.unwrap_err();
        assert!(matches!(err, FetchError::Write { .. }));
    }

    #[test]
    fn relaxed_tls_still_builds() {
        let fetcher = HttpBackupFetcher::new(&ExternalBackupConfig {
            url: "https://nas.local/api/backup".to_string(),
            api_key: "k".to_string(),
            verify_tls: false,
            timeout: Duration::from_secs(1),
        });
        assert!(fetcher.is_ok());
    }
}
