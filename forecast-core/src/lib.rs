//! Core library for the `forecast` app.
//!
//! This crate defines:
//! - Durable user preferences (city, theme, fetch-by-location)
//! - The device location seam
//! - The OpenWeather forecast client
//! - The refresh controller that keeps one forecast request in flight per input change
//!
//! It is used by `forecast-cli`, but is meant to be embedded by any host UI.

pub mod config;
pub mod controller;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod settings;
pub mod store;
pub mod updates;

pub use config::Config;
pub use controller::{Advisory, ForecastController, ForecastState, QueryKey, Snapshot};
pub use error::{FetchError, StorageError};
pub use location::{DeviceLocation, LocationProvider, LocationStatus};
pub use model::{Coordinates, ForecastEntry, ForecastResponse, Preferences};
pub use provider::{ForecastClient, ForecastQuery};
pub use store::PreferenceStore;
pub use updates::Updates;
