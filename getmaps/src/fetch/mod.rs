//! Fetch-or-skip loop.
//!
//! For every tile of a [`TileRange`] the [`TileFetcher`] checks the store,
//! downloads the tile if it is missing, and stores the payload:
//!
//! ```text
//! PENDING ──exists──► CACHED
//!    │
//!    └──missing──► FETCHING ──ok──► CACHED
//!                    ▲   │
//!                    └───┘ error (per RetryStrategy)
//! ```
//!
//! A tile that is already stored never causes a network request, so running
//! the same download twice against the same store performs no requests the
//! second time.

mod observer;
mod retry;

pub use observer::{FetchObserver, NoopObserver, Progress};
pub use retry::{
    classify_all_transient, classify_by_status, ErrorClass, ErrorClassifier, RetryDecision,
    RetryPolicy, RetryStrategy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS,
    DEFAULT_MAX_DELAY_SECS,
};

use std::thread;

use thiserror::Error;
use tracing::{debug, warn};

use crate::coord::{TileIndex, TileRange};
use crate::provider::{Provider, ProviderError};
use crate::store::{StoreError, TileStore};

/// Errors that stop the fetch loop.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Writing to or reading from the store failed.
    #[error("Tile store failed at tile {tile}: {source}")]
    Store {
        tile: TileIndex,
        #[source]
        source: StoreError,
    },

    /// The retry policy ran out of attempts.
    #[error("Giving up on tile {tile} after {attempts} attempts: {source}")]
    RetriesExhausted {
        tile: TileIndex,
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// The error was classified as permanent.
    #[error("Permanent error for tile {tile}: {source}")]
    Permanent {
        tile: TileIndex,
        #[source]
        source: ProviderError,
    },
}

/// Final state of a visited tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Already in the store; nothing was requested.
    Cached,
    /// Downloaded and stored.
    Downloaded {
        /// Number of network attempts, including the successful one.
        attempts: u32,
        /// Payload size.
        bytes: u64,
    },
}

/// Counters for a batch of visited tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub visited: u64,
    pub cached: u64,
    pub downloaded: u64,
    pub attempts: u64,
    pub bytes: u64,
}

impl FetchStats {
    pub fn record(&mut self, outcome: &TileOutcome) {
        self.visited += 1;
        match outcome {
            TileOutcome::Cached => self.cached += 1,
            TileOutcome::Downloaded { attempts, bytes } => {
                self.downloaded += 1;
                self.attempts += *attempts as u64;
                self.bytes += bytes;
            }
        }
    }

    pub fn merge(&mut self, other: &FetchStats) {
        self.visited += other.visited;
        self.cached += other.cached;
        self.downloaded += other.downloaded;
        self.attempts += other.attempts;
        self.bytes += other.bytes;
    }
}

/// Downloads missing tiles into a store, one at a time.
pub struct TileFetcher<P: Provider> {
    provider: P,
    retry: RetryStrategy,
}

impl<P: Provider> TileFetcher<P> {
    /// Creates a fetcher with the default strategy (retry forever, no delay).
    pub fn new(provider: P) -> Self {
        Self::with_retry(provider, RetryStrategy::default())
    }

    pub fn with_retry(provider: P, retry: RetryStrategy) -> Self {
        Self { provider, retry }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn retry(&self) -> &RetryStrategy {
        &self.retry
    }

    /// Visits every tile of `range` in x-major order.
    pub fn fetch_range<S: TileStore + ?Sized>(
        &self,
        store: &mut S,
        range: &TileRange,
        progress: &mut Progress,
        observer: &mut dyn FetchObserver,
    ) -> Result<FetchStats, FetchError> {
        let mut stats = FetchStats::default();
        for tile in range {
            let outcome = self.process_tile(store, &tile, progress, observer)?;
            stats.record(&outcome);
        }
        Ok(stats)
    }

    /// Brings one tile into the store unless it is already there.
    pub fn process_tile<S: TileStore + ?Sized>(
        &self,
        store: &mut S,
        tile: &TileIndex,
        progress: &mut Progress,
        observer: &mut dyn FetchObserver,
    ) -> Result<TileOutcome, FetchError> {
        progress.advance();

        let stored = store.exists(tile).map_err(|source| FetchError::Store {
            tile: *tile,
            source,
        })?;
        if stored {
            debug!(%tile, "Tile already cached");
            let outcome = TileOutcome::Cached;
            observer.on_tile_done(progress, tile, &outcome);
            return Ok(outcome);
        }

        let url = self.provider.tile_url(tile);
        observer.on_download_start(progress, tile, &url);

        let (payload, attempts) = self.download(tile, &url, observer)?;
        store
            .put(tile, &payload)
            .map_err(|source| FetchError::Store {
                tile: *tile,
                source,
            })?;

        let outcome = TileOutcome::Downloaded {
            attempts,
            bytes: payload.len() as u64,
        };
        debug!(%tile, attempts, bytes = payload.len(), "Tile stored");
        observer.on_tile_done(progress, tile, &outcome);
        Ok(outcome)
    }

    fn download(
        &self,
        tile: &TileIndex,
        url: &str,
        observer: &mut dyn FetchObserver,
    ) -> Result<(Vec<u8>, u32), FetchError> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let error = match self.provider.fetch_tile(tile) {
                Ok(payload) => return Ok((payload, attempt)),
                Err(error) => error,
            };

            warn!(%url, attempt, error = %error, "Tile download failed");

            match self.retry.decide(attempt, &error) {
                RetryDecision::RetryAfter(delay) => {
                    observer.on_retry(tile, url, attempt, &error);
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                RetryDecision::Exhausted => {
                    return Err(FetchError::RetriesExhausted {
                        tile: *tile,
                        attempts: attempt,
                        source: error,
                    })
                }
                RetryDecision::Permanent => {
                    return Err(FetchError::Permanent {
                        tile: *tile,
                        source: error,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{BoundingBox, Projection};
    use crate::provider::{ScriptedHttpClient, TemplateProvider, UrlTemplate};
    use crate::store::SqliteTileStore;
    use std::time::Duration;

    fn fetcher(client: ScriptedHttpClient) -> TileFetcher<TemplateProvider<ScriptedHttpClient>> {
        TileFetcher::new(TemplateProvider::new(client, UrlTemplate::default(), 4))
    }

    fn requests(fetcher: &TileFetcher<TemplateProvider<ScriptedHttpClient>>) -> usize {
        fetcher.provider().http_client().requests().len()
    }

    fn range(bbox: BoundingBox, zoom: u8) -> TileRange {
        TileRange::for_bounds(&Projection::default(), &bbox, zoom).unwrap()
    }

    fn http_error() -> ProviderError {
        ProviderError::HttpError("connection reset".to_string())
    }

    #[derive(Default)]
    struct RecordingObserver {
        started: Vec<(u64, u64, String)>,
        retries: Vec<u32>,
        done: Vec<TileOutcome>,
    }

    impl FetchObserver for RecordingObserver {
        fn on_download_start(&mut self, progress: &Progress, _tile: &TileIndex, url: &str) {
            self.started
                .push((progress.current(), progress.total(), url.to_string()));
        }

        fn on_retry(&mut self, _tile: &TileIndex, _url: &str, attempt: u32, _error: &ProviderError) {
            self.retries.push(attempt);
        }

        fn on_tile_done(&mut self, _progress: &Progress, _tile: &TileIndex, outcome: &TileOutcome) {
            self.done.push(*outcome);
        }
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    impl TileStore for ReadOnlyStore {
        fn exists(&self, _tile: &TileIndex) -> Result<bool, StoreError> {
            Ok(false)
        }

        fn put(&mut self, _tile: &TileIndex, _payload: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }

        fn get(&self, _tile: &TileIndex) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(None)
        }

        fn count(&self, _zoom: Option<u8>) -> Result<u64, StoreError> {
            Ok(0)
        }

        fn flush(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn test_small_box_populates_every_tile() {
        let bbox = BoundingBox::new(0.0, 1.0, 0.0, 1.0).unwrap();
        let r = range(bbox, 5);
        let fetcher = fetcher(ScriptedHttpClient::always_ok(vec![0xFF, 0xD8]));
        let mut store = SqliteTileStore::in_memory().unwrap();
        let mut progress = Progress::new(r.len());

        let stats = fetcher
            .fetch_range(&mut store, &r, &mut progress, &mut NoopObserver)
            .unwrap();

        assert_eq!(stats.downloaded, r.len());
        assert_eq!(stats.cached, 0);
        assert_eq!(requests(&fetcher) as u64, r.len());
        assert_eq!(store.count(Some(5)).unwrap(), r.len());
        for x in r.x_range() {
            for y in r.y_range() {
                assert!(store.exists(&TileIndex::new(5, x, y)).unwrap());
            }
        }
    }

    #[test]
    fn test_second_run_makes_no_requests() {
        let bbox = BoundingBox::new(48.0, 48.5, 11.0, 11.5).unwrap();
        let r = range(bbox, 8);
        let fetcher = fetcher(ScriptedHttpClient::always_ok(vec![1]));
        let mut store = SqliteTileStore::in_memory().unwrap();

        let first = fetcher
            .fetch_range(&mut store, &r, &mut Progress::new(r.len()), &mut NoopObserver)
            .unwrap();
        let after_first = requests(&fetcher);

        let second = fetcher
            .fetch_range(&mut store, &r, &mut Progress::new(r.len()), &mut NoopObserver)
            .unwrap();

        assert_eq!(first.downloaded, r.len());
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.cached, r.len());
        assert_eq!(requests(&fetcher), after_first);
    }

    #[test]
    fn test_fails_twice_then_succeeds() {
        let client = ScriptedHttpClient::new(vec![Err(http_error()), Err(http_error())], vec![7]);
        let fetcher = fetcher(client);
        let mut store = SqliteTileStore::in_memory().unwrap();
        let mut observer = RecordingObserver::default();
        let tile = TileIndex::new(5, 100, 200);

        let outcome = fetcher
            .process_tile(&mut store, &tile, &mut Progress::new(1), &mut observer)
            .unwrap();

        assert_eq!(outcome, TileOutcome::Downloaded { attempts: 3, bytes: 1 });
        assert_eq!(requests(&fetcher), 3);
        assert_eq!(store.count(None).unwrap(), 1);
        assert_eq!(store.get(&tile).unwrap(), Some(vec![7]));
        assert_eq!(observer.retries, vec![1, 2]);
    }

    #[test]
    fn test_retries_use_same_url() {
        let client = ScriptedHttpClient::new(vec![Err(http_error())], vec![7]);
        let fetcher = fetcher(client);
        let mut store = SqliteTileStore::in_memory().unwrap();

        fetcher
            .process_tile(
                &mut store,
                &TileIndex::new(6, 1, 2),
                &mut Progress::new(1),
                &mut NoopObserver,
            )
            .unwrap();

        let urls = fetcher.provider().http_client().requests();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], urls[1]);
        assert!(urls[0].ends_with("x=1&y=2&zoom=2"));
    }

    #[test]
    fn test_bounded_policy_gives_up() {
        let client = ScriptedHttpClient::new(vec![Err(http_error()); 5], vec![7]);
        let provider = TemplateProvider::new(client, UrlTemplate::default(), 4);
        let fetcher = TileFetcher::with_retry(
            provider,
            RetryStrategy::new(RetryPolicy::fixed(3, Duration::ZERO)),
        );
        let mut store = SqliteTileStore::in_memory().unwrap();
        let tile = TileIndex::new(5, 0, 0);

        let result = fetcher.process_tile(&mut store, &tile, &mut Progress::new(1), &mut NoopObserver);

        assert!(matches!(
            result,
            Err(FetchError::RetriesExhausted { attempts: 3, .. })
        ));
        assert!(!store.exists(&tile).unwrap());
    }

    #[test]
    fn test_permanent_error_stops_immediately() {
        let not_found = ProviderError::Status {
            status: 404,
            url: "http://example.com".to_string(),
        };
        let client = ScriptedHttpClient::new(vec![Err(not_found)], vec![7]);
        let provider = TemplateProvider::new(client, UrlTemplate::default(), 4);
        let fetcher = TileFetcher::with_retry(
            provider,
            RetryStrategy::default().with_classifier(classify_by_status),
        );
        let mut store = SqliteTileStore::in_memory().unwrap();

        let result = fetcher.process_tile(
            &mut store,
            &TileIndex::new(5, 0, 0),
            &mut Progress::new(1),
            &mut NoopObserver,
        );

        assert!(matches!(result, Err(FetchError::Permanent { .. })));
        assert_eq!(requests(&fetcher), 1);
    }

    #[test]
    fn test_store_failure_is_fatal() {
        let fetcher = fetcher(ScriptedHttpClient::always_ok(vec![1]));
        let result = fetcher.process_tile(
            &mut ReadOnlyStore,
            &TileIndex::new(5, 0, 0),
            &mut Progress::new(1),
            &mut NoopObserver,
        );

        assert!(matches!(result, Err(FetchError::Store { .. })));
    }

    #[test]
    fn test_progress_counts_cached_tiles() {
        let bbox = BoundingBox::new(0.0, 0.2, 0.0, 0.2).unwrap();
        let r = range(bbox, 8);
        assert!(r.len() > 1);

        let fetcher = fetcher(ScriptedHttpClient::always_ok(vec![1]));
        let mut store = SqliteTileStore::in_memory().unwrap();
        let first = r.iter().next().unwrap();
        store.put(&first, &[0]).unwrap();

        let mut observer = RecordingObserver::default();
        let mut progress = Progress::new(r.len());
        fetcher
            .fetch_range(&mut store, &r, &mut progress, &mut observer)
            .unwrap();

        // The cached first tile is counted but not announced
        assert_eq!(progress.current(), r.len());
        assert_eq!(observer.started.len() as u64, r.len() - 1);
        assert_eq!(observer.started[0].0, 2);
        assert_eq!(observer.started[0].1, r.len());
        assert_eq!(observer.done[0], TileOutcome::Cached);
    }

    #[test]
    fn test_stats_merge() {
        let mut a = FetchStats::default();
        a.record(&TileOutcome::Cached);
        let mut b = FetchStats::default();
        b.record(&TileOutcome::Downloaded {
            attempts: 2,
            bytes: 10,
        });

        a.merge(&b);
        assert_eq!(
            a,
            FetchStats {
                visited: 2,
                cached: 1,
                downloaded: 1,
                attempts: 2,
                bytes: 10,
            }
        );
    }
}
