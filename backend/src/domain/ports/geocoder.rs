//! Port for address lookup.

use async_trait::async_trait;

use crate::domain::Coordinates;

use super::define_port_error;

define_port_error! {
    /// Errors raised by geocoding adapters.
    pub enum GeocoderError {
        /// Transport failure or timeout.
        Transport { message: String } => "geocoder transport failed: {message}",
        /// The upstream answered with something unusable.
        InvalidResponse { message: String } => "geocoder returned an invalid response: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Coordinates of the best match for `address`, or `None` when nothing
    /// matched.
    async fn coordinates(&self, address: &str) -> Result<Option<Coordinates>, GeocoderError>;
}

/// Geocoder that never finds anything; used when lookups are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureGeocoder;

#[async_trait]
impl Geocoder for FixtureGeocoder {
    async fn coordinates(&self, _address: &str) -> Result<Option<Coordinates>, GeocoderError> {
        Ok(None)
    }
}
