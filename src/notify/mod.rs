// Notify module - packaging rendered reports into one mail

mod smtp;

pub use smtp::SmtpMailer;

use crate::error::{ReportError, Result};
use crate::report::Attachment;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// MIME type of every attached report
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A file carried by an outgoing mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Message content handed to a transport. Addressing is the transport's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub attachments: Vec<MailAttachment>,
}

/// Something that can deliver a mail.
///
/// Built once at startup and passed into the pipeline, so tests can swap in
/// an in-memory implementation.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Subject line for the reports of `date`
pub fn subject_for(date: NaiveDate) -> String {
    format!("Apache logs {}", date.format("%Y-%m-%d"))
}

/// Plain-text body for `count` reports of `date`
pub fn body_for(date: NaiveDate, count: usize) -> String {
    let noun = if count == 1 { "report" } else { "reports" };
    format!(
        "Attached are {} Apache log {} (PDF) for {}.",
        count,
        noun,
        date.format("%Y-%m-%d")
    )
}

/// Sends rendered reports through a mail transport
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn MailTransport>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Send one mail carrying every attachment.
    ///
    /// An attachment file that cannot be read fails the whole send; nothing is
    /// delivered and nothing is retried.
    ///
    /// # Arguments
    /// * `attachments` - Rendered reports
    /// * `subject` - Mail subject
    /// * `body` - Plain-text body
    pub async fn send(&self, attachments: &[Attachment], subject: &str, body: &str) -> Result<()> {
        if attachments.is_empty() {
            tracing::info!("No reports to send");
            return Ok(());
        }

        let mut parts = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let bytes = tokio::fs::read(&attachment.path).await.map_err(|e| {
                ReportError::TransportFailure(format!(
                    "cannot attach {}: {}",
                    attachment.path.display(),
                    e
                ))
            })?;
            parts.push(MailAttachment {
                filename: attachment.filename.clone(),
                content_type: PDF_CONTENT_TYPE.to_string(),
                bytes,
            });
        }

        let mail = OutgoingMail {
            subject: subject.to_string(),
            body: body.to_string(),
            attachments: parts,
        };

        self.transport.deliver(&mail).await?;
        tracing::info!("Mail sent with {} report(s)", attachments.len());
        Ok(())
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}
