use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role. Super admins have no company and bypass tenant scoping on
/// the admin routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Company,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Company => "company",
        }
    }

    /// Unknown stored values fall back to the least privileged role.
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "super_admin" => Self::SuperAdmin,
            _ => Self::Company,
        }
    }

    #[must_use]
    pub const fn is_super_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
