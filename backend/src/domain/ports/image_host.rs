//! Port for image hosting.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by image host adapters.
    pub enum ImageHostError {
        /// Transport failure or timeout.
        Transport { message: String } => "image host transport failed: {message}",
        /// The host refused the upload.
        Rejected { status: u16, message: String } => "image host rejected upload ({status}): {message}",
        /// The host is not configured.
        Disabled => "image uploads are not configured",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload the image and return its public URL.
    async fn upload(&self, bytes: Vec<u8>) -> Result<String, ImageHostError>;
}

/// Image host used when no upload target is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn upload(&self, _bytes: Vec<u8>) -> Result<String, ImageHostError> {
        Err(ImageHostError::disabled())
    }
}
