//! Posting text messages to a Matrix room.

use crate::config::MatrixConfig;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Request timeout for a single send.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum SendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Matrix send failed with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Something that can deliver one text message.
pub trait MessageSink {
    fn send(&self, body: &str) -> impl Future<Output = Result<(), SendError>> + Send;
}

/// Client-server API client bound to one room.
#[derive(Debug, Clone)]
pub struct MatrixClient {
    http: reqwest::Client,
    config: MatrixConfig,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    event_id: String,
}

impl MatrixClient {
    pub fn new(config: MatrixConfig) -> Result<Self, SendError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    /// `PUT` target for an `m.room.message` event with transaction `txn_id`.
    pub fn send_url(&self, txn_id: &str) -> String {
        format!(
            "{}/_matrix/client/v3/rooms/{}/send/m.room.message/{}",
            self.config.homeserver.trim_end_matches('/'),
            urlencoding::encode(&self.config.room_id),
            urlencoding::encode(txn_id),
        )
    }
}

impl MessageSink for MatrixClient {
    async fn send(&self, body: &str) -> Result<(), SendError> {
        let content = json!({
            "msgtype": "m.text",
            "body": body,
        });
        info!(
            room_id = %self.config.room_id,
            user_id = self.config.user_id.as_deref().unwrap_or("-"),
            %content,
            "request: room_send"
        );

        let response = self
            .http
            .put(self.send_url(&transaction_id()))
            .bearer_auth(&self.config.access_token)
            .json(&content)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: SendResponse = response.json().await?;
        info!(event_id = %reply.event_id, room_id = %self.config.room_id, "response");
        Ok(())
    }
}

/// Transaction ids only need to be unique per access token.
fn transaction_id() -> String {
    let now = chrono::Utc::now();
    format!(
        "agent-smith-{}-{}",
        now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros()),
        std::process::id()
    )
}
