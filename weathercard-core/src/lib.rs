//! Core library for the `weathercard` dashboard widget.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The CWA open-data client behind the [`WeatherSource`] abstraction
//! - The [`WeatherAggregator`] that merges observation and forecast into one view state
//! - Weather-code classification and the day/night theme decision
//!
//! It is used by `weathercard-cli`, but can also back other presentation layers.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod theme;
pub mod weather_code;

pub use aggregator::WeatherAggregator;
pub use config::{Config, Datasets};
pub use error::WeatherError;
pub use model::{CurrentObservation, ForecastSummary, SunTimes, ThemeMode, WeatherState};
pub use provider::{WeatherSource, cwa::CwaClient};
pub use weather_code::{WeatherKind, classify};
