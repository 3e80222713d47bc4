//! Error taxonomy for provider calls and the race.

use std::fmt;

use thiserror::Error;

use crate::provider::ProviderId;

/// Why a single provider call failed.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A required credential or setting is missing. Raised before any network call.
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream call could not be completed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The upstream response could not be parsed.
    #[error("decode error: {0}")]
    Decode(String),

    /// The shared context was cancelled or its deadline passed.
    #[error("cancelled before the provider responded")]
    Cancelled,
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Config(_) => ErrorKind::Config,
            ProviderError::Transport(_) => ErrorKind::Transport,
            ProviderError::Decode(_) => ErrorKind::Decode,
            ProviderError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Transport,
    Decode,
    Cancelled,
    /// The provider task panicked.
    Panicked,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Transport => "transport",
            ErrorKind::Decode => "decode",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Panicked => "panicked",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider's failure, as collected by the race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.provider, self.kind, self.message)
    }
}

/// Terminal outcome of a race in which no provider succeeded.
#[derive(Debug, Error)]
pub enum RaceError {
    #[error("no weather providers were supplied")]
    NoProviders,

    #[error("all weather providers failed: {}", list(.failures))]
    AllFailed { failures: Vec<ProviderFailure> },

    #[error("cancelled before any weather provider succeeded (failed so far: {})", list(.failures))]
    Cancelled { failures: Vec<ProviderFailure> },
}

impl RaceError {
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            RaceError::NoProviders => &[],
            RaceError::AllFailed { failures } | RaceError::Cancelled { failures } => failures,
        }
    }
}

fn list(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "none".to_string();
    }
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// An invalid coordinate query.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("{name} '{value}' is not a number")]
    NotANumber { name: &'static str, value: String },

    #[error("{name} '{value}' is outside -{limit}..={limit}")]
    OutOfRange { name: &'static str, value: String, limit: f64 },
}
