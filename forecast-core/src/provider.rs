use crate::{
    Config, ForecastResponse,
    error::FetchError,
    model::Coordinates,
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// What to ask the provider for.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastQuery {
    City(String),
    Coordinates(Coordinates),
}

impl std::fmt::Display for ForecastQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastQuery::City(name) => write!(f, "city '{name}'"),
            ForecastQuery::Coordinates(c) => write!(f, "coordinates ({c})"),
        }
    }
}

/// A single request/response round trip to a forecast provider.
#[async_trait]
pub trait ForecastClient: Send + Sync + Debug {
    async fn fetch(&self, query: &ForecastQuery) -> Result<ForecastResponse, FetchError>;
}

/// Construct the OpenWeather client from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<Box<dyn ForecastClient>> {
    let api_key = config.api_key()?;
    let client = OpenWeatherClient::builder(api_key)
        .base_url(config.base_url.clone())
        .units(config.units.clone())
        .timeout(config.request_timeout())
        .build()?;

    Ok(Box::new(client))
}
