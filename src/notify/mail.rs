//! Mail transport: best-effort send of a message to a list of recipients

use async_trait::async_trait;
use serde_json::json;

use super::NotifyError;

/// Mail transport contract. One call per message; no batching guarantee.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// HTTP mail gateway client.
///
/// Posts the message as JSON to a configured gateway endpoint; the gateway
/// owns SMTP delivery.
pub struct GatewayMailer {
    client: reqwest::Client,
    gateway_url: String,
    from: String,
}

impl GatewayMailer {
    pub fn new(gateway_url: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url,
            from,
        }
    }
}

#[async_trait]
impl MailTransport for GatewayMailer {
    async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "from": self.from,
            "to": to,
            "subject": subject,
            "html": body,
        });

        self.client
            .post(&self.gateway_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Fallback transport that only logs; used when no gateway is configured.
#[derive(Default)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, to: &[String], subject: &str, _body: &str) -> Result<(), NotifyError> {
        tracing::info!(recipients = ?to, subject = %subject, "mail gateway not configured, logging instead of sending");
        Ok(())
    }
}
