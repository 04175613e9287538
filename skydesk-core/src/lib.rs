//! Core library for the `skydesk` weather dashboard.
//!
//! This crate defines:
//! - Configuration handling
//! - The forecast lookup that turns cached forecast series into a per-day summary
//! - An OpenWeather client behind the `WeatherSource` trait, and the fetch flows over it
//! - Calendar events, favorites and settings persisted as one JSON document
//! - Export of fetched data and display helpers
//!
//! It is used by `skydesk-cli`, but can also be reused by other front-ends.

pub mod calendar;
pub mod config;
pub mod describe;
pub mod error;
pub mod export;
pub mod fetch;
pub mod forecast;
pub mod model;
pub mod provider;
pub mod store;

pub use calendar::{CalendarEvent, EventForecast};
pub use config::{Config, Units};
pub use error::StoreError;
pub use fetch::{LocationDetails, Settled, WeatherBundle};
pub use model::{Coordinates, ForecastCache, ForecastSource, ForecastSummary};
pub use provider::WeatherSource;
pub use store::Store;
