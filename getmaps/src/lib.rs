//! getmaps - bulk map tile downloader
//!
//! Downloads every map tile covering a latitude/longitude rectangle at one or
//! more zoom levels and stores the payloads in a SQLite tile cache (table
//! `maps`, keyed by zoom and tile column/row). Tiles already in the cache are
//! never requested again, so an interrupted run can simply be restarted.
//!
//! # Modules
//!
//! - [`coord`]: projection into the 2^26 unit space and tile ranges
//! - [`provider`]: URL templates and the HTTP client
//! - [`store`]: the SQLite tile store
//! - [`fetch`]: fetch-or-skip loop and retry strategy
//! - [`plan`] / [`session`]: driving a whole run
//! - [`config`] / [`logging`]: ambient setup used by the CLI
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use getmaps::config::DownloadConfig;
//! use getmaps::coord::BoundingBox;
//! use getmaps::fetch::NoopObserver;
//! use getmaps::plan::DownloadPlan;
//! use getmaps::session;
//!
//! let config = DownloadConfig::default();
//! let bbox = BoundingBox::new(52.52, 52.50, 13.37, 13.42)?;
//! let plan = DownloadPlan::new(config.projection(), &bbox, &[10, 12])?;
//!
//! let summary = session::run_to_path(&config, Path::new("berlin.db"), &plan, &mut NoopObserver)?;
//! println!("{}", summary);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod coord;
pub mod fetch;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod session;
pub mod store;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
