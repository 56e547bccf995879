//! Share role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role carried by a grant.
///
/// Ordered by privilege: Admin > Editor > Viewer. Checks always use
/// "at least" semantics through [`ShareRole::has_at_least`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShareRole {
    /// Read-only access.
    Viewer,
    /// Can create, rename, and delete content.
    Editor,
    /// Full control including sharing and deleting the resource.
    Admin,
}

impl ShareRole {
    /// Return the privilege level (higher = more privileged).
    pub fn privilege_level(&self) -> u8 {
        match self {
            Self::Viewer => 1,
            Self::Editor => 2,
            Self::Admin => 3,
        }
    }

    /// Check if this role grants at least the given level.
    pub fn has_at_least(&self, required: ShareRole) -> bool {
        self.privilege_level() >= required.privilege_level()
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for ShareRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ShareRole {
    type Err = phynix_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            _ => Err(phynix_core::AppError::validation(format!(
                "Invalid role: '{s}'"
            ))),
        }
    }
}
