//! SQLite-backed tile store.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{StoreError, TileStore};
use crate::coord::TileIndex;

const CREATE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS maps (
    zoom INTEGER,
    tilex INTEGER,
    tiley INTEGER,
    pixbuf BLOB,
    PRIMARY KEY (zoom, tilex, tiley)
);";

/// Tile store backed by a SQLite database.
///
/// The `maps` table is created on open if it does not exist yet. Writes are
/// batched in a transaction until [`TileStore::flush`] or [`close`](Self::close).
/// Dropping the store without closing it discards the pending batch.
///
/// # Example
///
/// ```no_run
/// use getmaps::coord::TileIndex;
/// use getmaps::store::{SqliteTileStore, TileStore};
///
/// let mut store = SqliteTileStore::open("maps.db").unwrap();
/// let tile = TileIndex::new(5, 10, 20);
/// if !store.exists(&tile).unwrap() {
///     store.put(&tile, b"payload").unwrap();
/// }
/// store.close().unwrap();
/// ```
pub struct SqliteTileStore {
    conn: Connection,
    pending: u64,
}

impl SqliteTileStore {
    /// Opens (or creates) a tile database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Opened tile store");
        Self::bootstrap(conn)
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: ":memory:".into(),
            source,
        })?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(CREATE_SCHEMA)
            .map_err(StoreError::Schema)?;
        let store = Self { conn, pending: 0 };
        store.begin()?;
        Ok(store)
    }

    fn begin(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    /// Number of writes since the last flush.
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Commits the pending batch and closes the database.
    pub fn close(self) -> Result<(), StoreError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        debug!(written = self.pending, "Closing tile store");
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}

impl TileStore for SqliteTileStore {
    fn exists(&self, tile: &TileIndex) -> Result<bool, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT 1 FROM maps WHERE zoom = ?1 AND tilex = ?2 AND tiley = ?3",
        )?;
        Ok(stmt.exists(params![tile.zoom, tile.x, tile.y])?)
    }

    fn put(&mut self, tile: &TileIndex, payload: &[u8]) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT OR REPLACE INTO maps (pixbuf, zoom, tilex, tiley) VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(params![payload, tile.zoom, tile.x, tile.y])?;
        self.pending += 1;
        Ok(())
    }

    fn get(&self, tile: &TileIndex) -> Result<Option<Vec<u8>>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT pixbuf FROM maps WHERE zoom = ?1 AND tilex = ?2 AND tiley = ?3",
        )?;
        Ok(stmt
            .query_row(params![tile.zoom, tile.x, tile.y], |row| row.get(0))
            .optional()?)
    }

    fn count(&self, zoom: Option<u8>) -> Result<u64, StoreError> {
        let count: i64 = match zoom {
            Some(zoom) => self.conn.query_row(
                "SELECT COUNT(*) FROM maps WHERE zoom = ?1",
                params![zoom],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM maps", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        debug!(written = self.pending, "Committed tile batch");
        self.pending = 0;
        self.begin()
    }
}
