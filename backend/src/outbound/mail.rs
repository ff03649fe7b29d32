//! Mail sender that writes outgoing messages to the log.
//!
//! Bodies carry single-use links, so they are only logged when
//! `reveal_bodies` is set (local development).

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::ports::{MailError, MailMessage, MailSender};

#[derive(Debug, Clone)]
pub struct LoggingMailSender {
    from: String,
    reveal_bodies: bool,
}

impl LoggingMailSender {
    pub fn new(from: impl Into<String>, reveal_bodies: bool) -> Self {
        Self {
            from: from.into(),
            reveal_bodies,
        }
    }
}

#[async_trait]
impl MailSender for LoggingMailSender {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if message.to.trim().is_empty() {
            return Err(MailError::delivery("recipient is empty"));
        }
        info!(from = %self.from, to = %message.to, subject = %message.subject, "mail sent");
        if self.reveal_bodies {
            debug!(to = %message.to, body = %message.html, "mail body");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn message(to: &str) -> MailMessage {
        MailMessage {
            to: to.to_owned(),
            subject: "Verify your email".to_owned(),
            html: "<a href=\"x\">verify</a>".to_owned(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn accepts_addressed_messages() {
        let sender = LoggingMailSender::new("noreply@campsite.test", false);
        sender.send(&message("ada@example.com")).await.expect("sent");
    }

    #[rstest]
    #[tokio::test]
    async fn rejects_blank_recipients() {
        let sender = LoggingMailSender::new("noreply@campsite.test", true);
        let err = sender.send(&message("  ")).await.expect_err("no recipient");
        assert!(matches!(err, MailError::Delivery { .. }));
    }
}
