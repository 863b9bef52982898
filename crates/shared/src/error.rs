use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Upstream,
    NotFound,
    Decode,
}

/// Failure reported by a catalog collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(String),
    #[error("catalog service returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("item {0} not found")]
    NotFound(ItemId),
    #[error("malformed catalog response: {0}")]
    Decode(String),
}

impl CatalogError {
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Network(_) => ErrorKind::Network,
            CatalogError::Upstream { .. } => ErrorKind::Upstream,
            CatalogError::NotFound(_) => ErrorKind::NotFound,
            CatalogError::Decode(_) => ErrorKind::Decode,
        }
    }
}

/// Error body shape some catalog deployments return alongside a failure status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamErrorBody {
    #[serde(default, alias = "error")]
    pub message: String,
}
