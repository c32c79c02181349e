//! Retry policy for tile downloads.
//!
//! A [`RetryStrategy`] combines a [`RetryPolicy`], which decides how often and
//! how fast to retry, with an error classifier, which decides whether an error
//! is worth retrying at all. The fetch loop only asks the strategy for a
//! [`RetryDecision`] after each failure.
//!
//! The default strategy retries every error forever without delay: an
//! unattended bulk download never gives up on a tile. Against a server that
//! is unreachable or keeps answering 404 this means the run hangs until it is
//! interrupted.
//!
//! # Example
//!
//! ```
//! use getmaps::fetch::{classify_by_status, RetryPolicy, RetryStrategy};
//!
//! // Give up after five attempts and stop early on 4xx responses
//! let strategy = RetryStrategy::new(RetryPolicy::exponential(5))
//!     .with_classifier(classify_by_status);
//! assert_eq!(strategy.policy().max_attempts(), Some(5));
//!
//! // Default: retry everything, forever
//! let forever = RetryStrategy::default();
//! assert_eq!(forever.policy().max_attempts(), None);
//! ```

use std::fmt;
use std::time::Duration;

use crate::provider::ProviderError;

/// Default initial delay for exponential backoff (100ms).
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;

/// Default maximum delay for exponential backoff (30 seconds).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// How a download handles failures.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// No retries - fail immediately on error.
    None,

    /// Retry indefinitely with a constant delay (possibly zero).
    Forever {
        /// Delay between attempts.
        delay: Duration,
    },

    /// Fixed number of attempts with constant delay between them.
    Fixed {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Delay between retry attempts.
        delay: Duration,
    },

    /// Exponential backoff with configurable parameters.
    ///
    /// The delay is multiplied after each failed attempt, up to a maximum delay.
    ExponentialBackoff {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Initial delay after the first failure.
        initial_delay: Duration,
        /// Maximum delay cap (delay won't exceed this).
        max_delay: Duration,
        /// Multiplier applied to delay after each failure (typically 2.0).
        multiplier: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Forever {
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Creates an exponential backoff policy with the default delays.
    pub fn exponential(max_attempts: u32) -> Self {
        Self::ExponentialBackoff {
            max_attempts,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Creates a fixed retry policy.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::Fixed {
            max_attempts,
            delay,
        }
    }

    /// Creates an unbounded policy with a constant delay.
    pub fn forever(delay: Duration) -> Self {
        Self::Forever { delay }
    }

    /// Calculates the delay before the next attempt.
    ///
    /// # Arguments
    ///
    /// * `attempt` - Number of attempts made so far (1 after the first failure)
    ///
    /// # Returns
    ///
    /// The delay to wait before retrying, or `None` if no more attempts are allowed.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Forever { delay } => Some(*delay),
            Self::Fixed {
                max_attempts,
                delay,
            } => (attempt < *max_attempts).then_some(*delay),
            Self::ExponentialBackoff {
                max_attempts,
                initial_delay,
                max_delay,
                multiplier,
            } => {
                if attempt >= *max_attempts {
                    return None;
                }
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                let delay_ms = initial_delay.as_millis() as f64 * factor;
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                Some(Duration::from_millis(capped as u64))
            }
        }
    }

    /// Returns the maximum number of attempts, or `None` when unbounded.
    pub fn max_attempts(&self) -> Option<u32> {
        match self {
            Self::None => Some(1),
            Self::Forever { .. } => None,
            Self::Fixed { max_attempts, .. } => Some(*max_attempts),
            Self::ExponentialBackoff { max_attempts, .. } => Some(*max_attempts),
        }
    }
}

/// Whether a failure is worth retrying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// May succeed on a later attempt.
    Transient,
    /// Will not succeed no matter how often it is retried.
    Permanent,
}

/// Classifies a provider error.
pub type ErrorClassifier = fn(&ProviderError) -> ErrorClass;

/// Treats every error as transient.
pub fn classify_all_transient(_error: &ProviderError) -> ErrorClass {
    ErrorClass::Transient
}

/// Treats client errors (4xx other than 408 and 429) and invalid URLs as
/// permanent, everything else as transient.
pub fn classify_by_status(error: &ProviderError) -> ErrorClass {
    match error {
        ProviderError::InvalidUrl(_) => ErrorClass::Permanent,
        ProviderError::Status { status, .. }
            if (400..500).contains(status) && *status != 408 && *status != 429 =>
        {
            ErrorClass::Permanent
        }
        _ => ErrorClass::Transient,
    }
}

/// What to do after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the given delay.
    RetryAfter(Duration),
    /// The policy allows no more attempts.
    Exhausted,
    /// The error was classified as permanent.
    Permanent,
}

/// Retry policy paired with an error classifier.
#[derive(Clone)]
pub struct RetryStrategy {
    policy: RetryPolicy,
    classifier: ErrorClassifier,
}

impl fmt::Debug for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStrategy")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryStrategy {
    /// Creates a strategy that treats every error as transient.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            classifier: classify_all_transient,
        }
    }

    /// Replaces the error classifier.
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Decides whether to retry after `attempt` failed attempts.
    pub fn decide(&self, attempt: u32, error: &ProviderError) -> RetryDecision {
        if (self.classifier)(error) == ErrorClass::Permanent {
            return RetryDecision::Permanent;
        }
        match self.policy.delay_for_attempt(attempt) {
            Some(delay) => RetryDecision::RetryAfter(delay),
            None => RetryDecision::Exhausted,
        }
    }
}
