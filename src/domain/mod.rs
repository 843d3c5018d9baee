//! Domain types for the ad platform with strong typing.
//!
//! Entity identifiers are newtypes so an ad id can never be passed where a
//! company id is expected. Status-like columns are enums stored as
//! snake_case strings.

pub mod ad;
pub mod role;

pub use ad::{AdStatus, AdType, Platform};
pub use role::UserRole;

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Returns the underlying i32 value.
            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self::new(id)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for an Ad.
    ///
    /// ```rust
    /// use eventaic::domain::AdId;
    ///
    /// let id = AdId::new(42);
    /// assert_eq!(id.value(), 42);
    /// assert_eq!(id.to_string(), "42");
    /// ```
    AdId
);

entity_id!(
    /// Unique identifier for a Company (tenant).
    CompanyId
);

entity_id!(
    /// Unique identifier for a User.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&AdId::new(7)).unwrap();
        assert_eq!(json, "7");

        let id: CompanyId = serde_json::from_str("12").unwrap();
        assert_eq!(id, CompanyId::new(12));
        assert_eq!(i32::from(UserId::from(3)), 3);
    }
}
