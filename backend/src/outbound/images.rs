//! Cloudinary unsigned-upload image host.
//!
//! Posts the image as a base64 data URI together with an unsigned upload
//! preset and returns the `secure_url` of the stored asset.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::http_support::{body_preview, build_client};
use crate::domain::ports::{ImageHost, ImageHostError};

const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1/";

pub struct CloudinaryImageHost {
    client: Client,
    upload_url: Url,
    upload_preset: String,
}

impl CloudinaryImageHost {
    /// # Errors
    ///
    /// Returns [`ImageHostError::Transport`] when the cloud name does not
    /// form a valid URL or the client cannot be built.
    pub fn new(
        cloud_name: &str,
        upload_preset: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ImageHostError> {
        let upload_url = Url::parse(CLOUDINARY_API)
            .and_then(|api| api.join(&format!("{cloud_name}/image/upload")))
            .map_err(|err| ImageHostError::transport(format!("invalid cloud name: {err}")))?;
        let client =
            build_client(timeout).map_err(|err| ImageHostError::transport(err.to_string()))?;
        Ok(Self {
            client,
            upload_url,
            upload_preset: upload_preset.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponseDto {
    secure_url: String,
}

#[async_trait]
impl ImageHost for CloudinaryImageHost {
    async fn upload(&self, bytes: Vec<u8>) -> Result<String, ImageHostError> {
        let file = data_uri(&bytes);
        let response = self
            .client
            .post(self.upload_url.clone())
            .form(&[
                ("file", file.as_str()),
                ("upload_preset", self.upload_preset.as_str()),
            ])
            .send()
            .await
            .map_err(|err| ImageHostError::transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ImageHostError::transport(err.to_string()))?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        let decoded: UploadResponseDto = serde_json::from_slice(&body).map_err(|err| {
            ImageHostError::rejected(status.as_u16(), format!("unexpected upload response: {err}"))
        })?;
        Ok(decoded.secure_url)
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ImageHostError {
    if status.is_client_error() {
        ImageHostError::rejected(status.as_u16(), body_preview(body))
    } else {
        ImageHostError::transport(format!("status {}: {}", status.as_u16(), body_preview(body)))
    }
}

/// Sniff the media type from magic bytes; unknown content is sent as
/// octet-stream and left for the host to reject.
fn media_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "application/octet-stream",
    }
}

fn data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type(bytes), STANDARD.encode(bytes))
}
