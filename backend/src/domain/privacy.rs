//! Street-address redaction for placemark reads.

use super::policy::is_privileged_viewer;
use super::{Identity, Placemark};

/// Value substituted for the street of a redacted placemark.
pub const HIDDEN_STREET: &str = "[HIDDEN]";

/// Redact the exact address unless the viewer is the owner or an admin.
pub fn scrub(viewer: Option<&Identity>, mut placemark: Placemark) -> Placemark {
    if !is_privileged_viewer(viewer, placemark.owner_id) {
        HIDDEN_STREET.clone_into(&mut placemark.address.street);
        placemark.address.house_number.clear();
    }
    placemark
}
