//! Provider types and traits

use thiserror::Error;

use crate::coord::TileIndex;

/// Errors that can occur while fetching a tile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport failure (connection refused, timeout, truncated body, ...)
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// The server answered with a non-success status code
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    /// The URL template could not be expanded or parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ProviderError {
    /// Returns the HTTP status code for status errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Source of tile payloads.
///
/// Implementors map a [`TileIndex`] to a request against their server and
/// return the raw response body.
pub trait Provider: Send + Sync {
    /// Returns the URL used to fetch the given tile.
    fn tile_url(&self, tile: &TileIndex) -> String;

    /// Downloads the payload for the given tile.
    ///
    /// The body is returned as-is; it is not decoded or checked for a content type.
    fn fetch_tile(&self, tile: &TileIndex) -> Result<Vec<u8>, ProviderError>;

    /// Returns the provider's name for logging and identification.
    fn name(&self) -> &str;
}
