//! Download session: drives the fetch loop over a whole plan.
//!
//! Zoom levels are processed in plan order, tiles within a zoom level in
//! x-major order. The store is flushed every `flush_interval` visited tiles
//! and once more at the end, so an interrupted run loses at most one batch.

use std::fmt;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DownloadConfig;
use crate::fetch::{FetchError, FetchObserver, FetchStats, Progress, TileFetcher};
use crate::plan::DownloadPlan;
use crate::provider::{HttpClient, Provider, ProviderError, ReqwestClient, TemplateProvider};
use crate::store::{SqliteTileStore, StoreError, TileStore};

/// Errors that end a download session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] ProviderError),
}

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tiles in the plan.
    pub requested: u64,
    /// Tiles fetched from the server.
    pub downloaded: u64,
    /// Tiles that were already stored.
    pub skipped: u64,
    /// Network attempts, including retries.
    pub attempts: u64,
    /// Payload bytes written.
    pub bytes: u64,
}

impl RunSummary {
    fn from_stats(requested: u64, stats: &FetchStats) -> Self {
        Self {
            requested,
            downloaded: stats.downloaded,
            skipped: stats.cached,
            attempts: stats.attempts,
            bytes: stats.bytes,
        }
    }

    /// Attempts beyond the first one per downloaded tile.
    pub fn retries(&self) -> u64 {
        self.attempts.saturating_sub(self.downloaded)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles: {} downloaded ({} bytes, {} retries), {} already stored",
            self.requested,
            self.downloaded,
            self.bytes,
            self.retries(),
            self.skipped
        )
    }
}

/// Runs a [`DownloadPlan`] against a tile store.
pub struct DownloadSession<P: Provider> {
    fetcher: TileFetcher<P>,
    flush_interval: u64,
}

impl<P: Provider> DownloadSession<P> {
    pub fn new(fetcher: TileFetcher<P>, flush_interval: u64) -> Self {
        Self {
            fetcher,
            flush_interval: flush_interval.max(1),
        }
    }

    /// Builds a session using the retry and flush settings of `config`.
    pub fn from_config(provider: P, config: &DownloadConfig) -> Self {
        Self::new(
            TileFetcher::with_retry(provider, config.retry_strategy()),
            config.flush_interval(),
        )
    }

    pub fn fetcher(&self) -> &TileFetcher<P> {
        &self.fetcher
    }

    pub fn flush_interval(&self) -> u64 {
        self.flush_interval
    }

    /// Visits every tile of the plan, downloading the missing ones.
    ///
    /// If a tile cannot be fetched, the tiles stored before it are flushed
    /// before the error is returned.
    pub fn run<S: TileStore + ?Sized>(
        &self,
        store: &mut S,
        plan: &DownloadPlan,
        observer: &mut dyn FetchObserver,
    ) -> Result<RunSummary, SessionError> {
        let total = plan.total();
        observer.on_plan(total);
        info!(
            total,
            zooms = ?plan.zoom_levels(),
            bbox = %plan.bbox(),
            server = self.fetcher.provider().name(),
            "Starting download"
        );

        let mut progress = Progress::new(total);
        let mut stats = FetchStats::default();
        let mut since_flush: u64 = 0;

        for range in plan.ranges() {
            observer.on_zoom_start(range.zoom(), range.len());
            let (north_west, south_east) = plan.extent(range);
            info!(
                zoom = range.zoom(),
                tiles = range.len(),
                x = ?range.x_range(),
                y = ?range.y_range(),
                north = north_west.lat,
                west = north_west.lon,
                south = south_east.lat,
                east = south_east.lon,
                "Processing zoom level"
            );

            let mut zoom_stats = FetchStats::default();
            for tile in range {
                let result = self
                    .fetcher
                    .process_tile(store, &tile, &mut progress, observer);
                let outcome = match result {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        if !matches!(e, FetchError::Store { .. }) {
                            salvage(store);
                        }
                        return Err(e.into());
                    }
                };
                zoom_stats.record(&outcome);

                since_flush += 1;
                if since_flush >= self.flush_interval {
                    store.flush()?;
                    since_flush = 0;
                }
            }

            debug!(
                zoom = range.zoom(),
                downloaded = zoom_stats.downloaded,
                cached = zoom_stats.cached,
                "Zoom level complete"
            );
            stats.merge(&zoom_stats);
        }

        store.flush()?;

        let summary = RunSummary::from_stats(total, &stats);
        info!(
            requested = summary.requested,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            attempts = summary.attempts,
            bytes = summary.bytes,
            "Download complete"
        );
        Ok(summary)
    }
}

fn salvage<S: TileStore + ?Sized>(store: &mut S) {
    if let Err(e) = store.flush() {
        warn!(error = %e, "Failed to commit tiles before aborting");
    }
}

/// Downloads `plan` into the SQLite database at `db_path`.
///
/// Creates the database and its `maps` table if needed.
pub fn run_to_path(
    config: &DownloadConfig,
    db_path: &Path,
    plan: &DownloadPlan,
    observer: &mut dyn FetchObserver,
) -> Result<RunSummary, SessionError> {
    let client = ReqwestClient::with_timeout(config.timeout()).map_err(SessionError::Client)?;
    run_to_path_with_client(config, client, db_path, plan, observer)
}

/// Like [`run_to_path`], with a caller-supplied HTTP client.
pub fn run_to_path_with_client<C: HttpClient>(
    config: &DownloadConfig,
    client: C,
    db_path: &Path,
    plan: &DownloadPlan,
    observer: &mut dyn FetchObserver,
) -> Result<RunSummary, SessionError> {
    let provider = TemplateProvider::new(
        client,
        config.url_template().clone(),
        config.zoom_offset(),
    );
    let session = DownloadSession::from_config(provider, config);

    let mut store = SqliteTileStore::open(db_path)?;
    let summary = session.run(&mut store, plan, observer)?;
    store.close()?;
    Ok(summary)
}
