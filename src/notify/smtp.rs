use super::{MailTransport, OutgoingMail};
use crate::config::SmtpConfig;
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    /// Build the transport from configuration.
    ///
    /// No connection is made here. Addresses are parsed up front so a bad
    /// address fails at startup, not at send time.
    pub fn new(config: &SmtpConfig, sender_name: &str) -> Result<Self> {
        let from_address: Address = config
            .from_address
            .parse()
            .map_err(|e| ReportError::InvalidAddress(config.from_address.clone(), format!("{}", e)))?;
        let to: Mailbox = config
            .to_address
            .parse()
            .map_err(|e| ReportError::InvalidAddress(config.to_address.clone(), format!("{}", e)))?;

        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| ReportError::ConfigError(format!("Invalid SMTP host {}: {}", config.host, e)))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: Mailbox::new(Some(sender_name.to_string()), from_address),
            to,
        })
    }

    /// Assemble the MIME message: a plain-text part followed by every attachment
    pub fn build_message(&self, mail: &OutgoingMail) -> Result<Message> {
        let mut body = MultiPart::mixed().singlepart(SinglePart::plain(mail.body.clone()));

        for attachment in &mail.attachments {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                ReportError::MessageError(format!(
                    "bad content type {}: {}",
                    attachment.content_type, e
                ))
            })?;
            body = body.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.bytes.clone(), content_type),
            );
        }

        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(mail.subject.clone())
            .multipart(body)
            .map_err(|e| ReportError::MessageError(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<()> {
        let message = self.build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| ReportError::TransportFailure(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{MailAttachment, PDF_CONTENT_TYPE};

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 465,
            username: "reports".to_string(),
            password: "hunter2".to_string(),
            secure: true,
            from_address: "reports@example.com".to_string(),
            to_address: "ops@example.com".to_string(),
        }
    }

    // the pooled transport must be dropped inside a runtime
    #[tokio::test]
    async fn test_build_message_headers_and_attachment() {
        let mailer = SmtpMailer::new(&config(), "Apache log report").unwrap();
        let mail = OutgoingMail {
            subject: "Apache logs 2024-05-01".to_string(),
            body: "Attached are 1 Apache log report (PDF) for 2024-05-01.".to_string(),
            attachments: vec![MailAttachment {
                filename: "apache-combined-2024-05-01.pdf".to_string(),
                content_type: PDF_CONTENT_TYPE.to_string(),
                bytes: b"%PDF-1.3".to_vec(),
            }],
        };

        let message = mailer.build_message(&mail).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(formatted.contains("Subject: Apache logs 2024-05-01"));
        assert!(formatted.contains("Apache log report"));
        assert!(formatted.contains("<reports@example.com>"));
        assert!(formatted.contains("ops@example.com"));
        assert!(formatted.contains("application/pdf"));
        assert!(formatted.contains("apache-combined-2024-05-01.pdf"));
    }

    #[tokio::test]
    async fn test_starttls_transport_builds() {
        let config = SmtpConfig {
            secure: false,
            port: 587,
            ..config()
        };
        assert!(SmtpMailer::new(&config, "Apache log report").is_ok());
    }

    #[test]
    fn test_bad_recipient_is_rejected() {
        let config = SmtpConfig {
            to_address: "ops@@example".to_string(),
            ..config()
        };
        let result = SmtpMailer::new(&config, "Apache log report");
        assert!(matches!(result, Err(ReportError::InvalidAddress(_, _))));
    }
}
