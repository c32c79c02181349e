//! Persistent tile storage.
//!
//! Tiles are kept in a single SQLite table keyed by `(zoom, tilex, tiley)`:
//!
//! ```text
//! maps (zoom INTEGER, tilex INTEGER, tiley INTEGER, pixbuf BLOB,
//!       PRIMARY KEY (zoom, tilex, tiley))
//! ```
//!
//! # Batching
//!
//! Writes go into an open transaction that is committed by
//! [`TileStore::flush`]. Anything written after the last flush is lost if the
//! process dies, but committed batches are never affected.

mod sqlite;

pub use sqlite::SqliteTileStore;

use std::path::PathBuf;

use thiserror::Error;

use crate::coord::TileIndex;

/// Errors that can occur while reading or writing the tile store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open the database file.
    #[error("Failed to open tile store {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to create the `maps` table.
    #[error("Failed to create tile schema: {0}")]
    Schema(#[source] rusqlite::Error),

    /// A query or write against the store failed.
    #[error("Tile store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Keyed store of tile payloads.
pub trait TileStore {
    /// Returns true if a payload is stored for the tile.
    fn exists(&self, tile: &TileIndex) -> Result<bool, StoreError>;

    /// Stores a payload, replacing any existing one with the same key.
    fn put(&mut self, tile: &TileIndex, payload: &[u8]) -> Result<(), StoreError>;

    /// Returns the stored payload for a tile.
    fn get(&self, tile: &TileIndex) -> Result<Option<Vec<u8>>, StoreError>;

    /// Number of stored tiles, optionally restricted to one zoom level.
    fn count(&self, zoom: Option<u8>) -> Result<u64, StoreError>;

    /// Makes all writes so far durable.
    fn flush(&mut self) -> Result<(), StoreError>;
}
