//! Agreement notification: mail transport, email template and the
//! asynchronous publish pipeline.

mod mail;
mod pipeline;
pub mod template;

pub use mail::{GatewayMailer, LogMailer, MailTransport};
pub use pipeline::{AgreementNotifier, AgreementPublisher, NotificationJob};

use thiserror::Error;

/// Notification failure. These never propagate to the investor whose
/// request completed funding; they surface in logs for operators.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail transport failure: {0}")]
    Transport(String),

    #[error("notification queue is full")]
    QueueFull,

    #[error("notification worker is no longer running")]
    WorkerGone,
}
