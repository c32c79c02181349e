//! Progress reporting hooks for the fetch loop.

use crate::coord::TileIndex;
use crate::provider::ProviderError;

use super::TileOutcome;

/// Position of the fetch loop within the whole run.
///
/// `current` counts every tile visited so far, cached or not; `total` is the
/// number of tiles over all requested zoom levels, known before the first
/// download starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    current: u64,
    total: u64,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Self { current: 0, total }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn advance(&mut self) {
        self.current += 1;
    }
}

/// Receives events from the fetch loop.
///
/// All methods default to doing nothing, so observers only implement what
/// they display.
pub trait FetchObserver {
    /// Called once before any tile is visited.
    fn on_plan(&mut self, _total: u64) {}

    /// Called when the loop starts on a zoom level.
    fn on_zoom_start(&mut self, _zoom: u8, _tiles: u64) {}

    /// Called before the first network attempt for a tile.
    fn on_download_start(&mut self, _progress: &Progress, _tile: &TileIndex, _url: &str) {}

    /// Called after a failed attempt that will be retried.
    fn on_retry(&mut self, _tile: &TileIndex, _url: &str, _attempt: u32, _error: &ProviderError) {
    }

    /// Called when a tile reaches its final state.
    fn on_tile_done(&mut self, _progress: &Progress, _tile: &TileIndex, _outcome: &TileOutcome) {}
}

/// Observer that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {}
