//! Progress lines on stdout.

use std::io::{self, Write};

use getmaps::coord::TileIndex;
use getmaps::fetch::{FetchObserver, Progress};
use getmaps::provider::ProviderError;
use getmaps::session::RunSummary;

/// Prints the plan size, each download and each retry.
///
/// Cached tiles are counted but not printed, so the numbering of the
/// "Downloading tile" lines has gaps when resuming a run.
pub struct ConsoleObserver<W: Write> {
    out: W,
}

impl ConsoleObserver<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints the totals of a finished run.
    pub fn done(&mut self, summary: &RunSummary) {
        self.line(format_args!("Done: {}", summary));
    }

    // Broken pipes must not abort the download.
    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(args);
        let _ = self.out.write_all(b"\n");
        let _ = self.out.flush();
    }
}

impl<W: Write> FetchObserver for ConsoleObserver<W> {
    fn on_plan(&mut self, total: u64) {
        self.line(format_args!("You asked for {} tiles", total));
    }

    fn on_download_start(&mut self, progress: &Progress, _tile: &TileIndex, _url: &str) {
        self.line(format_args!(
            "Downloading tile {} of {}",
            progress.current(),
            progress.total()
        ));
    }

    fn on_retry(&mut self, _tile: &TileIndex, url: &str, _attempt: u32, error: &ProviderError) {
        self.line(format_args!(
            "Oops! something went wrong downloading '{}': {}",
            url, error
        ));
        self.line(format_args!("Trying again..."));
    }
}
