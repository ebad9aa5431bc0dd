//! TelegramSink - Bot API を使った配送先
//!
//! Messages go through `sendMessage`, files through a multipart
//! `sendDocument` upload streamed from disk. The bot token is part of every
//! request URL, so URLs are stripped from all reported errors.

use std::path::Path;

use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::config::SinkConfig;
use crate::domain::DeliveryError;
use crate::ports::DeliverySink;

/// Reply envelope shared by every Bot API method.
#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

pub struct TelegramSink {
    client: reqwest::Client,
    base_url: String,
    chat_id: i64,
}

impl TelegramSink {
    /// Build a sink from its config. Every request is bounded by `config.timeout`.
    pub fn new(config: &SinkConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.api_url, config.bot_token),
            chat_id: config.chat_id,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn read_reply(response: reqwest::Response) -> Result<(), DeliveryError> {
        let status = response.status();
        let reply = response.json::<ApiReply>().await;

        match reply {
            Ok(reply) if status.is_success() && reply.ok => Ok(()),
            Ok(reply) => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: reply
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            }),
            Err(e) => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: format!("unreadable reply: {}", e.without_url()),
            }),
        }
    }
}

fn transport_error(e: reqwest::Error) -> DeliveryError {
    if e.is_timeout() {
        DeliveryError::Timeout
    } else {
        DeliveryError::Transport(e.without_url().to_string())
    }
}

#[async_trait]
impl DeliverySink for TelegramSink {
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
            })
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_reply(response).await
    }

    async fn send_file(&self, path: &Path) -> Result<(), DeliveryError> {
        let open_error = |source| DeliveryError::OpenFile {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(open_error)?;
        let len = file.metadata().await.map_err(open_error)?.len();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        debug!("Uploading: [{}] ({} bytes)", path.display(), len);

        let document =
            Part::stream_with_length(reqwest::Body::from(file), len).file_name(file_name);
        let form = Form::new()
            .text("chat_id", self.chat_id.to_string())
            .part("document", document);

        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_reply(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_http::serve_once;
    use std::time::Duration;

    fn sink_for(base: &str) -> TelegramSink {
        TelegramSink::new(&SinkConfig {
            bot_token: "123:abc".to_string(),
            chat_id: -42,
            api_url: base.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn message_posts_json_to_send_message() {
        let (base, server) = serve_once(200, r#"{"ok":true,"result":{}}"#).await;

        sink_for(&base).send_message("Backup started").await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /bot123:abc/sendMessage HTTP/1.1"));
        assert!(request.contains(r#""chat_id":-42"#));
        assert!(request.contains(r#""text":"Backup started""#));
    }

    #[tokio::test]
    async fn file_is_uploaded_as_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grafana-20240101_120000.tar.gz");
        std::fs::write(&path, b"archive-bytes").unwrap();
        let (base, server) = serve_once(200, r#"{"ok":true,"result":{}}"#).await;

        sink_for(&base).send_file(&path).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /bot123:abc/sendDocument HTTP/1.1"));
        assert!(request.contains(r#"name="document"; filename="grafana-20240101_120000.tar.gz""#));
        assert!(request.contains("archive-bytes"));
        assert_eq!(std::fs::read(&path).unwrap(), b"archive-bytes");
    }

    #[tokio::test]
    async fn api_refusal_is_rejected_with_description() {
        let (base, _server) = serve_once(
            413,
            r#"{"ok":false,"error_code":413,"description":"Request Entity Too Large"}"#,
        )
        .await;

        let err = sink_for(&base).send_message("hi").await.unwrap_err();
        match err {
            DeliveryError::Rejected {
                status,
                description,
            } => {
                assert_eq!(status, 413);
                assert_eq!(description, "Request Entity Too Large");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_for("http://127.0.0.1:9");
        let err = sink
            .send_file(&dir.path().join("missing.tar.gz"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::OpenFile { .. }));
    }

    #[tokio::test]
    async fn unreachable_destination_hides_token() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = sink_for(&format!("http://{addr}"))
            .send_message("hi")
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Transport(_)));
        assert!(!err.to_string().contains("123:abc"));
    }
}
