//! UUID-backed identifiers for the stored aggregates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_uuid_id!(
    /// Stable user identifier.
    UserId
);
define_uuid_id!(CategoryId);
define_uuid_id!(PlacemarkId);
define_uuid_id!(ReviewId);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn ids_parse_and_serialize_as_plain_strings() {
        let raw = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
        let id: UserId = raw.parse().expect("valid uuid");
        assert_eq!(
            serde_json::to_value(id).expect("serializes"),
            serde_json::json!(raw)
        );
    }

    #[rstest]
    #[case("")]
    #[case("not-a-uuid")]
    fn invalid_ids_are_rejected(#[case] raw: &str) {
        assert!(raw.parse::<PlacemarkId>().is_err());
    }
}
