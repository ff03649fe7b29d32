//! Small helpers shared by the reqwest-backed adapters.

use std::time::Duration;

use reqwest::Client;

const USER_AGENT: &str = concat!("campsite-backend/", env!("CARGO_PKG_VERSION"));

/// Client with a request timeout and the service user agent.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Whitespace-collapsed, truncated view of an error body for log messages.
pub(crate) fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"  {\"error\":\n  \"bad\"} ", "{\"error\": \"bad\"}")]
    #[case(b"", "")]
    fn preview_collapses_whitespace(#[case] body: &[u8], #[case] expected: &str) {
        assert_eq!(body_preview(body), expected);
    }

    #[rstest]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(400);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.len(), 163);
        assert!(preview.ends_with("..."));
    }
}
