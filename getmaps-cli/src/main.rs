//! getmaps CLI - Command-line interface
//!
//! Downloads the map tiles covering a bounding box into a SQLite tile cache.
//!
//! ```text
//! getmaps -t 52.55 -l 13.30 -b 52.45 -r 13.50 -z 10 -z 12 berlin.db
//! ```

mod error;
mod output;

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use getmaps::config::{retry_policy, ConfigFile, DownloadConfig};
use getmaps::coord::BoundingBox;
use getmaps::logging;
use getmaps::plan::DownloadPlan;
use getmaps::provider::UrlTemplate;
use getmaps::session;
use tracing::info;

use error::CliError;
use output::ConsoleObserver;

#[derive(Debug, Parser)]
#[command(name = "getmaps", version)]
#[command(
    about = "Download map tiles for a bounding box into a SQLite tile cache",
    long_about = None
)]
struct Args {
    /// Latitude of the first corner, in decimal degrees
    #[arg(short = 't', long = "start-lat", allow_negative_numbers = true)]
    start_lat: f64,

    /// Longitude of the first corner, in decimal degrees
    #[arg(short = 'l', long = "start-long", allow_negative_numbers = true)]
    start_long: f64,

    /// Latitude of the opposite corner, in decimal degrees
    #[arg(short = 'b', long = "end-lat", allow_negative_numbers = true)]
    end_lat: f64,

    /// Longitude of the opposite corner, in decimal degrees
    #[arg(short = 'r', long = "end-long", allow_negative_numbers = true)]
    end_long: f64,

    /// Zoom level; repeat or separate with commas for several levels
    #[arg(
        short = 'z',
        long = "zoom",
        required = true,
        action = ArgAction::Append,
        value_delimiter = ','
    )]
    zoom: Vec<u8>,

    /// Tile URL template with {x}, {y}, {zoom} or {quadkey} placeholders
    #[arg(long)]
    url: Option<String>,

    /// Subtracted from the zoom level before it is sent to the server
    #[arg(long, allow_negative_numbers = true)]
    zoom_offset: Option<i32>,

    /// Request timeout in seconds (at least 1)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Commit the database after this many tiles
    #[arg(long)]
    flush_interval: Option<u64>,

    /// Give up on a tile after this many attempts (0 = never give up)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Wait between attempts, in milliseconds
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Configuration file (default: ~/.config/getmaps/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// SQLite database file; created if missing
    dbfile: PathBuf,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        e.exit();
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let bbox = BoundingBox::new(args.start_lat, args.end_lat, args.start_long, args.end_long)
        .map_err(|e| CliError::Usage(e.to_string()))?;
    let config = build_config(&args)?;
    let plan = DownloadPlan::new(config.projection(), &bbox, &args.zoom)
        .map_err(|e| CliError::Usage(e.to_string()))?;

    let _guard =
        logging::init_logging(args.verbose, args.log_file.as_deref()).map_err(CliError::LoggingInit)?;

    info!(
        version = getmaps::VERSION,
        db = %args.dbfile.display(),
        url = config.url_template().as_str(),
        zoom_offset = config.zoom_offset(),
        bbox = %bbox,
        "Starting getmaps"
    );

    let mut observer = ConsoleObserver::stdout();
    let summary = session::run_to_path(&config, &args.dbfile, &plan, &mut observer)?;

    observer.done(&summary);
    Ok(())
}

/// Merges defaults, the config file and command-line flags, in that order.
fn build_config(args: &Args) -> Result<DownloadConfig, CliError> {
    let file = match &args.config {
        Some(path) if !path.exists() => {
            return Err(CliError::Usage(format!(
                "Config file '{}' does not exist",
                path.display()
            )))
        }
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let mut config = file.apply(DownloadConfig::default())?;

    if let Some(url) = &args.url {
        let template = UrlTemplate::parse(url).map_err(|e| CliError::Usage(e.to_string()))?;
        config = config.with_url_template(template);
    }
    if let Some(offset) = args.zoom_offset {
        config = config.with_zoom_offset(offset);
    }
    if let Some(timeout) = args.timeout {
        config = config.with_timeout_secs(timeout);
    }
    if let Some(interval) = args.flush_interval {
        config = config.with_flush_interval(interval);
    }
    if args.max_attempts.is_some() || args.retry_delay_ms.is_some() {
        let max_attempts = args.max_attempts.or(file.max_attempts).unwrap_or(0);
        let delay_ms = args.retry_delay_ms.or(file.delay_ms).unwrap_or(0);
        config = config.with_retry(retry_policy(max_attempts, delay_ms));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use getmaps::fetch::RetryPolicy;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const BBOX: [&str; 8] = ["-t", "0", "-l", "0", "-b", "1", "-r", "1"];

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["getmaps"];
        argv.extend_from_slice(&BBOX);
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    /// Writes a config file and points `--config` at it, keeping the user's
    /// own config out of the test.
    fn with_config(dir: &TempDir, content: &str, extra: &[&str]) -> Args {
        let path = dir.path().join("config.ini");
        fs::write(&path, content).unwrap();
        let path = path.to_str().unwrap().to_string();

        let mut args: Vec<&str> = vec!["--config", &path];
        args.extend_from_slice(extra);
        parse(&args).unwrap()
    }

    #[test]
    fn test_parse_minimal() {
        let args = parse(&["-z", "5", "maps.db"]).unwrap();
        assert_eq!(args.zoom, vec![5]);
        assert_eq!(args.dbfile, PathBuf::from("maps.db"));
        assert_eq!(args.start_lat, 0.0);
        assert_eq!(args.end_long, 1.0);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_parse_repeated_and_comma_zooms() {
        let args = parse(&["-z", "5", "-z", "7,9", "maps.db"]).unwrap();
        assert_eq!(args.zoom, vec![5, 7, 9]);
    }

    #[test]
    fn test_parse_negative_coordinates() {
        let args = Args::try_parse_from([
            "getmaps", "-t", "-33.8", "-l", "151.1", "-b", "-34.0", "-r", "151.3", "-z", "10",
            "sydney.db",
        ])
        .unwrap();
        assert_eq!(args.start_lat, -33.8);
        assert_eq!(args.end_lat, -34.0);
    }

    #[test]
    fn test_zoom_required() {
        let err = parse(&["maps.db"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_dbfile_required() {
        assert!(parse(&["-z", "5"]).is_err());
    }

    #[test]
    fn test_malformed_number_rejected() {
        let err = Args::try_parse_from([
            "getmaps", "-t", "north", "-l", "0", "-b", "1", "-r", "1", "-z", "5", "maps.db",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = parse(&["--timeout", "0", "-z", "5", "maps.db"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let args = parse(&["--timeout", "1", "-z", "5", "maps.db"]).unwrap();
        assert_eq!(args.timeout, Some(1));
    }

    #[test]
    fn test_zero_timeout_in_config_file_rejected() {
        let dir = TempDir::new().unwrap();
        let args = with_config(&dir, "[server]\ntimeout = 0\n", &["-z", "5", "maps.db"]);

        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn test_verbose_count() {
        let args = parse(&["-vv", "-z", "5", "maps.db"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_config_defaults() {
        let dir = TempDir::new().unwrap();
        let args = with_config(&dir, "", &["-z", "5", "maps.db"]);

        let config = build_config(&args).unwrap();
        assert_eq!(config, DownloadConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let args = with_config(
            &dir,
            "[server]\nzoom_offset = 2\ntimeout = 5\n[store]\nflush_interval = 50\n",
            &["--zoom-offset", "0", "-z", "5", "maps.db"],
        );

        let config = build_config(&args).unwrap();
        assert_eq!(config.zoom_offset(), 0);
        assert_eq!(config.timeout_secs(), 5);
        assert_eq!(config.flush_interval(), 50);
    }

    #[test]
    fn test_retry_flags_combine_with_file() {
        let dir = TempDir::new().unwrap();
        let args = with_config(
            &dir,
            "[retry]\ndelay_ms = 250\n",
            &["--max-attempts", "4", "-z", "5", "maps.db"],
        );

        let config = build_config(&args).unwrap();
        assert_eq!(
            config.retry(),
            &RetryPolicy::fixed(4, Duration::from_millis(250))
        );
    }

    #[test]
    fn test_invalid_url_flag_is_usage_error() {
        let dir = TempDir::new().unwrap();
        let args = with_config(&dir, "", &["--url", "http://example.com/tile", "-z", "5", "m.db"]);

        let err = build_config(&args).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_config_file_is_usage_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.ini");
        let args = parse(&["--config", missing.to_str().unwrap(), "-z", "5", "m.db"]).unwrap();

        assert!(matches!(build_config(&args), Err(CliError::Usage(_))));
    }
}
