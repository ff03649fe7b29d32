//! Reqwest-backed Nominatim geocoder.
//!
//! Sends `GET {base}/search?format=json&limit=1&q=<address>` and takes the
//! first hit. Nominatim returns coordinates as decimal strings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::http_support::{body_preview, build_client};
use crate::domain::Coordinates;
use crate::domain::ports::{Geocoder, GeocoderError};

pub struct NominatimGeocoder {
    client: Client,
    search_url: Url,
    user_agent: Option<String>,
}

impl NominatimGeocoder {
    /// # Errors
    ///
    /// Returns an error when the base URL cannot be joined with `search` or
    /// the client cannot be built.
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, GeocoderError> {
        let search_url = base
            .join("search")
            .map_err(|err| GeocoderError::transport(format!("invalid Nominatim URL: {err}")))?;
        let client = build_client(timeout).map_err(|err| GeocoderError::transport(err.to_string()))?;
        Ok(Self {
            client,
            search_url,
            user_agent: None,
        })
    }

    /// Identify requests with `user_agent` instead of the service default.
    /// Public Nominatim instances require a contactable agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct PlaceDto {
    lat: String,
    lon: String,
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn coordinates(&self, address: &str) -> Result<Option<Coordinates>, GeocoderError> {
        let mut request = self
            .client
            .get(self.search_url.clone())
            .query(&[("format", "json"), ("limit", "1"), ("q", address)])
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(user_agent) = &self.user_agent {
            request = request.header(reqwest::header::USER_AGENT, user_agent.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|err| GeocoderError::transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| GeocoderError::transport(err.to_string()))?;
        if !status.is_success() {
            return Err(GeocoderError::transport(format!(
                "status {}: {}",
                status.as_u16(),
                body_preview(&body)
            )));
        }
        parse_first_place(&body)
    }
}

fn parse_first_place(body: &[u8]) -> Result<Option<Coordinates>, GeocoderError> {
    let places: Vec<PlaceDto> = serde_json::from_slice(body)
        .map_err(|err| GeocoderError::invalid_response(format!("invalid JSON: {err}")))?;
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };
    let latitude = place
        .lat
        .parse::<f64>()
        .map_err(|_| GeocoderError::invalid_response(format!("latitude {:?}", place.lat)))?;
    let longitude = place
        .lon
        .parse::<f64>()
        .map_err(|_| GeocoderError::invalid_response(format!("longitude {:?}", place.lon)))?;
    Coordinates::try_new(latitude, longitude)
        .map(Some)
        .map_err(|err| GeocoderError::invalid_response(err.message().to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn takes_the_first_hit() {
        let body = br#"[{"lat":"47.3769","lon":"8.5417","display_name":"Zurich"},
                        {"lat":"1","lon":"2"}]"#;
        let coordinates = parse_first_place(body).expect("parse").expect("hit");
        assert!((coordinates.latitude - 47.3769).abs() < 1e-9);
        assert!((coordinates.longitude - 8.5417).abs() < 1e-9);
    }

    #[rstest]
    fn empty_results_mean_no_match() {
        assert_eq!(parse_first_place(b"[]").expect("parse"), None);
    }

    #[rstest]
    #[case(br#"{"error":"nope"}"#.as_slice())]
    #[case(br#"[{"lat":"north","lon":"8"}]"#.as_slice())]
    #[case(br#"[{"lat":"95","lon":"8"}]"#.as_slice())]
    fn unusable_payloads_are_invalid_responses(#[case] body: &[u8]) {
        let err = parse_first_place(body).expect_err("invalid");
        assert!(matches!(err, GeocoderError::InvalidResponse { .. }));
    }

    #[rstest]
    fn search_path_is_joined_onto_the_base() {
        let base = Url::parse("https://nominatim.openstreetmap.org/").expect("url");
        let geocoder = NominatimGeocoder::new(&base, Duration::from_secs(5)).expect("geocoder");
        assert_eq!(
            geocoder.search_url.as_str(),
            "https://nominatim.openstreetmap.org/search"
        );
    }
}
