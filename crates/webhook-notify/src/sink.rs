//! Webhook delivery.
//!
//! Wraps `reqwest` with webhook-specific error handling. The sink is invoked
//! at most once per run and does not retry; re-running the whole process is
//! the external retry mechanism.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::message::{Message, WebhookPayload};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("stockwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("webhook transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("webhook endpoint returned status {status}")]
    Status { status: u16 },
}

pub struct WebhookSink {
    client: Client,
    endpoint: Url,
}

impl WebhookSink {
    pub fn new(endpoint: Url) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// POST the message as a Discord-style embed payload.
    pub async fn send(&self, message: &Message) -> Result<(), NotifyError> {
        let payload = WebhookPayload::from(message);
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }

        info!(target: "webhook-notify", %status, "webhook delivered");
        Ok(())
    }
}
