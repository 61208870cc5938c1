//! Agreement publish pipeline
//!
//! Fired at most once per loan, by the investment that completed funding.
//! Jobs go through a bounded queue into a dedicated worker task, so the
//! investor's request never waits on document rendering or mail delivery,
//! and cancelling that request cannot cancel the pipeline. Render or
//! storage failure aborts the trigger and is logged at error level for an
//! operational follow-up; a failed send to one investor is logged and
//! skipped without affecting the others.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::files::FileStore;
use crate::ledger::LedgerStore;
use crate::notify::{template, MailTransport, NotifyError};
use crate::report::{AgreementReport, DocumentRenderer};

/// One queued trigger.
#[derive(Debug)]
pub struct NotificationJob {
    pub loan_id: Uuid,
}

/// Executes the pipeline steps for a single trigger.
pub struct AgreementPublisher {
    ledger: Arc<dyn LedgerStore>,
    files: Arc<dyn FileStore>,
    renderer: Arc<dyn DocumentRenderer>,
    mailer: Arc<dyn MailTransport>,
    public_base_url: String,
}

impl AgreementPublisher {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        files: Arc<dyn FileStore>,
        renderer: Arc<dyn DocumentRenderer>,
        mailer: Arc<dyn MailTransport>,
        public_base_url: String,
    ) -> Self {
        Self {
            ledger,
            files,
            renderer,
            mailer,
            public_base_url,
        }
    }

    fn document_link(&self, file_id: Uuid) -> String {
        format!(
            "{}/api/files/{}",
            self.public_base_url.trim_end_matches('/'),
            file_id
        )
    }

    /// Render the agreement letter, store it, record it on the loan, and
    /// email each investor a link.
    pub async fn publish(&self, loan_id: Uuid) -> anyhow::Result<()> {
        let emails = self
            .ledger
            .investor_emails(loan_id)
            .await
            .context("listing investor emails")?;

        let detail = self
            .ledger
            .loan_detail(loan_id)
            .await
            .context("loading loan detail")?;
        let rate = detail
            .rate
            .context("fully funded loan has no rate recorded")?;

        let report = AgreementReport::from_detail(&detail, rate, emails.len());
        let document = self
            .renderer
            .render(&report)
            .context("rendering agreement document")?;

        let label = format!("{}{}", loan_id, document.file_ext);
        let record = self
            .files
            .create(&label, document.content_type, document.bytes)
            .await
            .context("storing agreement document")?;

        self.ledger
            .record_agreement_file(loan_id, record.file_id)
            .await
            .context("recording agreement document on loan")?;

        let link = self.document_link(record.file_id);
        for email in &emails {
            let body = template::agreement_email(email, loan_id, &link);
            if let Err(e) = self
                .mailer
                .send(std::slice::from_ref(email), "Investment Agreement", &body)
                .await
            {
                // One failed delivery must not block the rest.
                tracing::warn!(
                    loan_id = %loan_id,
                    investor = %email,
                    error = %e,
                    "agreement email delivery failed, skipping recipient"
                );
            }
        }

        tracing::info!(loan_id = %loan_id, investors = emails.len(), "agreement letter published");
        Ok(())
    }
}

/// Handle used by the workflow to schedule pipeline runs.
#[derive(Clone)]
pub struct AgreementNotifier {
    tx: mpsc::Sender<NotificationJob>,
}

impl AgreementNotifier {
    /// Start the worker task and return the queue handle alongside the
    /// worker's join handle (kept for shutdown observation).
    pub fn spawn(publisher: AgreementPublisher, queue_depth: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<NotificationJob>(queue_depth);

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                tracing::info!(loan_id = %job.loan_id, "processing agreement notification");
                if let Err(e) = publisher.publish(job.loan_id).await {
                    // Not auto-retried: the funding transaction stands and an
                    // operator has to re-publish the letter.
                    tracing::error!(
                        loan_id = %job.loan_id,
                        error = %e,
                        "agreement pipeline failed, operator follow-up required"
                    );
                }
            }
            tracing::info!("agreement notification worker stopped");
        });

        (Self { tx }, handle)
    }

    /// Queue a trigger without waiting for it to run.
    pub fn enqueue(&self, job: NotificationJob) -> Result<(), NotifyError> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotifyError::WorkerGone,
        })
    }
}
