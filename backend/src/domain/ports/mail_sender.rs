//! Port for outbound email.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by mail adapters.
    pub enum MailError {
        /// The message could not be handed to the transport.
        Delivery { message: String } => "mail delivery failed: {message}",
    }
}

/// Outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}
