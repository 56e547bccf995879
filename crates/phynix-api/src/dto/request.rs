//! Query-string DTOs.

use serde::{Deserialize, Serialize};

use phynix_core::error::AppError;
use phynix_entity::permission::ResourceType;

/// `?type=file|folder`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeQuery {
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
}

impl TypeQuery {
    /// The parsed filter, if one was given.
    pub fn filter(&self) -> Result<Option<ResourceType>, AppError> {
        self.resource_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .transpose()
    }

    /// The parsed type; required.
    pub fn required(&self) -> Result<ResourceType, AppError> {
        self.filter()?
            .ok_or_else(|| AppError::validation("Query parameter 'type' is required"))
    }
}

/// `?limit=`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<u64>,
}

/// `?days=&limit=` for recent files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentQuery {
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub limit: Option<u64>,
}
