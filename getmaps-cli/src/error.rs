//! CLI error handling with user-friendly messages.

use std::fmt;
use std::io;
use std::process;

use getmaps::config::ConfigFileError;
use getmaps::fetch::FetchError;
use getmaps::session::SessionError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Invalid arguments that clap cannot check (bounding box, zoom range, URL)
    Usage(String),
    /// Failed to initialize logging
    LoggingInit(io::Error),
    /// Configuration file error
    Config(ConfigFileError),
    /// The download stopped
    Session(SessionError),
}

impl CliError {
    /// Process exit code; usage errors match clap's.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Usage(_) => {
                eprintln!();
                eprintln!("For more information, try '--help'.");
            }
            CliError::Session(SessionError::Fetch(FetchError::RetriesExhausted { .. })) => {
                eprintln!();
                eprintln!("The server kept failing. Tiles stored so far are kept;");
                eprintln!("rerun the same command to continue where it stopped.");
                eprintln!("Use --max-attempts 0 to retry without limit.");
            }
            CliError::Session(SessionError::Fetch(FetchError::Permanent { .. })) => {
                eprintln!();
                eprintln!("The server rejected the request. Check the --url template");
                eprintln!("and the --zoom-offset for this server.");
            }
            CliError::Session(SessionError::Store(_))
            | CliError::Session(SessionError::Fetch(FetchError::Store { .. })) => {
                eprintln!();
                eprintln!("Check that the database directory exists and is writable,");
                eprintln!("and that the file is a SQLite database.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Session(e) => write!(f, "Download failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::Usage(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}
