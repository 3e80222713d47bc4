//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - The canonical weather report model every provider maps into
//! - Normalization rules (units, fractions, omission of empty values)
//! - Abstraction over weather providers, plus the OpenWeather and WeatherAPI adapters
//! - The first-success race that queries all providers concurrently
//! - Configuration & credentials handling
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod race;

pub use config::{Config, ProviderConfig};
pub use context::{CancelHandle, QueryContext};
pub use error::{ErrorKind, ProviderError, ProviderFailure, QueryError, RaceError};
pub use model::{WeatherAlert, WeatherDataBlock, WeatherDataPoint, WeatherQuery, WeatherReport};
pub use provider::{ProviderId, WeatherProvider, providers_from_config};
pub use race::first_report;
